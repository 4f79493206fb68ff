use anyhow::Result;

use super::print_exports;
use crate::cli::{OutputFormat, ReleaseArgs};
use crate::release::{push_node_exports, Exports};

pub async fn run_node_name(release: ReleaseArgs, format: OutputFormat) -> Result<()> {
    let mut ctx = release.context()?;
    let vm_args = ctx.vm_args_path();
    let node = ctx.resolve_node(&vm_args).await?;

    let mut exports = Exports::default();
    push_node_exports(&mut exports, &node);
    print_exports(&exports, format)
}
