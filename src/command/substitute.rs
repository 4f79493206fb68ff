use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

use crate::release::{substitute_file, EnvSnapshot, Expansion};

pub async fn run_substitute(file: PathBuf, single_pass: bool) -> Result<()> {
    let expansion = if single_pass {
        Expansion::SinglePass
    } else {
        Expansion::Recursive
    };

    substitute_file(&file, &EnvSnapshot::capture(), expansion)
        .with_context(|| format!("Failed to replace variables in {}", file.display()))?;

    info!("✅ Replaced environment variables in {}", file.display());
    Ok(())
}
