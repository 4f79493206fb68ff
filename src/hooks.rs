//! Release hook points.
//!
//! A hook point is a directory `<rel_dir>/hooks/<point>.d/`; every regular
//! file in it is run with `sh`, in file-name order, from the release dir.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::release::{ConfigureError, ConfigureResult, EnvSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPoint {
    PreConfigure,
    PostConfigure,
}

impl HookPoint {
    pub fn as_str(self) -> &'static str {
        match self {
            HookPoint::PreConfigure => "pre_configure",
            HookPoint::PostConfigure => "post_configure",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HookRunner {
    hooks_dir: PathBuf,
    working_dir: PathBuf,
}

impl HookRunner {
    pub fn for_release(rel_dir: &Path) -> Self {
        Self {
            hooks_dir: rel_dir.join("hooks"),
            working_dir: rel_dir.to_path_buf(),
        }
    }

    /// Scripts registered for `point`, sorted by file name.
    pub fn scripts(&self, point: HookPoint) -> ConfigureResult<Vec<PathBuf>> {
        let dir = self.hooks_dir.join(format!("{}.d", point.as_str()));
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries = std::fs::read_dir(&dir).map_err(|e| ConfigureError::io(&dir, e))?;
        let mut scripts = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ConfigureError::io(&dir, e))?;
            let path = entry.path();
            if path.is_file() {
                scripts.push(path);
            }
        }
        scripts.sort();
        Ok(scripts)
    }

    /// Run every script of `point` to completion. Returns how many ran.
    pub async fn run(&self, point: HookPoint, env: &EnvSnapshot) -> ConfigureResult<usize> {
        let scripts = self.scripts(point)?;
        if scripts.is_empty() {
            debug!("No {} hooks", point.as_str());
            return Ok(0);
        }

        info!("🪝 Running {} {} hook(s)", scripts.len(), point.as_str());
        for script in &scripts {
            debug!("Running hook {}", script.display());
            let hook_failed = |reason: String| ConfigureError::HookFailed {
                point: point.as_str().to_string(),
                script: script.clone(),
                reason,
            };

            let status = Command::new("sh")
                .arg(script)
                .current_dir(&self.working_dir)
                .env_clear()
                .envs(env.iter())
                .stdin(Stdio::null())
                .status()
                .await
                .map_err(|e| hook_failed(e.to_string()))?;

            if !status.success() {
                return Err(hook_failed(format!("exited with {}", status)));
            }
        }
        Ok(scripts.len())
    }
}
