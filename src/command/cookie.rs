use anyhow::Result;
use tracing::warn;

use super::print_exports;
use crate::cli::{OutputFormat, ReleaseArgs};
use crate::release::{push_cookie_export, Exports};

pub async fn run_cookie(release: ReleaseArgs, format: OutputFormat, require: bool) -> Result<()> {
    let mut ctx = release.context()?;
    let vm_args = ctx.vm_args_path();
    let node = ctx.resolve_node(&vm_args).await?;

    let cookie = if require {
        Some(ctx.require_cookie(&vm_args, &node).await?)
    } else {
        let cookie = ctx.resolve_cookie(&vm_args, &node).await?;
        if cookie.as_ref().map_or(true, |c| c.value.is_empty()) {
            warn!(
                "⚠️  No cookie found in {} or {}",
                vm_args.display(),
                ctx.options().cookie_file.display()
            );
        }
        cookie
    };

    let mut exports = Exports::default();
    push_cookie_export(&mut exports, cookie.as_ref());
    print_exports(&exports, format)
}
