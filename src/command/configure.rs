use anyhow::Result;
use tracing::info;

use super::print_exports;
use crate::cli::{OutputFormat, ReleaseArgs};
use crate::release::ConfigureOutcome;

pub async fn run_configure(
    release: ReleaseArgs,
    format: OutputFormat,
    require_cookie: bool,
) -> Result<()> {
    let mut ctx = release.context()?;

    let mut config = match ctx.configure().await? {
        ConfigureOutcome::Configured(config) => config,
        ConfigureOutcome::AlreadyConfiguring => {
            info!("Called from a configure hook, nothing to do");
            return Ok(());
        }
    };

    if require_cookie && config.cookie.as_ref().map_or(true, |c| c.value.is_empty()) {
        let vm_args = config.vm_args.effective().to_path_buf();
        config.cookie = Some(ctx.require_cookie(&vm_args, &config.node).await?);
    }

    print_exports(&config.exports(), format)
}
