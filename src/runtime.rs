//! Short-lived boots of the release's `erl` runtime.
//!
//! The configuration pass needs the runtime three times, always as a
//! blocking one-shot that halts on its own:
//!
//! - running the config providers against `sys.config`
//! - asking the distribution layer which host part a node name gets
//! - forcing the runtime to write a default `~/.erlang.cookie`
//!
//! Every boot gets the configuration snapshot as its whole environment, so
//! the runtime sees the freshly published `SYS_CONFIG_PATH`, `VMARGS_PATH`
//! and friends.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::release::{ConfigureError, ConfigureResult, EnvSnapshot, NameType, NodeIdentity};

/// Expression printing the host part of the running node's name.
const HOST_PROBE_EVAL: &str =
    "[_, Host] = string:split(atom_to_list(node()), \"@\"), io:format(\"~s~n\", [Host]), halt().";

/// Handle on the runtime executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErlRuntime {
    executable: PathBuf,
}

impl ErlRuntime {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// `$BINDIR/erl` when a bin dir is known, otherwise `erl` from `PATH`.
    pub fn locate(bindir: Option<&Path>) -> Self {
        match bindir {
            Some(dir) => Self::new(dir.join("erl")),
            None => Self::new("erl"),
        }
    }

    #[allow(dead_code)]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn command(&self, env: &EnvSnapshot) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.env_clear().envs(env.iter()).stdin(Stdio::null());
        cmd
    }

    /// Boot with the `config` boot script so config providers can rewrite
    /// `sys.config`, then halt. Any failure here aborts configuration.
    pub async fn run_config_providers(
        &self,
        rel_dir: &Path,
        erts_lib_dir: Option<&Path>,
        env: &EnvSnapshot,
    ) -> ConfigureResult<()> {
        let mut cmd = self.command(env);
        cmd.arg("-noshell").arg("-boot").arg(rel_dir.join("config"));
        if let Some(lib_dir) = erts_lib_dir {
            cmd.arg("-boot_var").arg("ERTS_LIB_DIR").arg(lib_dir);
        }
        cmd.args(["-kernel", "logger_level", "warning", "-s", "erlang", "halt"]);
        debug!("Running config providers: {:?}", cmd.as_std());

        let status = cmd.status().await.map_err(|e| {
            ConfigureError::ProvisioningFailed(format!(
                "could not start {}: {}",
                self.executable.display(),
                e
            ))
        })?;

        if !status.success() {
            return Err(ConfigureError::ProvisioningFailed(format!(
                "{} exited with {}",
                self.executable.display(),
                status
            )));
        }
        Ok(())
    }

    /// Boot a throwaway node and report which host the runtime would pair
    /// with `name`. `None` if the runtime could not answer.
    pub async fn probe_hostname(
        &self,
        name_type: NameType,
        name: &str,
        env: &EnvSnapshot,
    ) -> Option<String> {
        let probe_name = format!("longname{}-{}", uuid::Uuid::new_v4().simple(), name);
        let mut cmd = self.command(env);
        cmd.args(["-noshell", "-boot", "start_clean", "-eval", HOST_PROBE_EVAL])
            .arg(name_type.as_flag())
            .arg(&probe_name)
            .stderr(Stdio::null());
        debug!("Probing hostname with node {}", probe_name);

        let output = match cmd.output().await {
            Ok(output) => output,
            Err(e) => {
                warn!("Could not start {} to probe hostname: {}", self.executable.display(), e);
                return None;
            }
        };
        if !output.status.success() {
            warn!("Hostname probe exited with {}", output.status);
            return None;
        }

        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(str::to_string)
    }

    /// Start and immediately halt the node so the runtime creates its
    /// default cookie file. Returns whether the boot succeeded.
    pub async fn bootstrap_cookie(&self, node: &NodeIdentity, env: &EnvSnapshot) -> bool {
        let mut cmd = self.command(env);
        cmd.arg("-noshell")
            .arg(node.name_type.as_flag())
            .arg(&node.name)
            .args(["-s", "erlang", "halt"])
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        debug!("Booting {} to generate a cookie", node.name);

        match cmd.status().await {
            Ok(status) => status.success(),
            Err(e) => {
                debug!("Could not start {}: {}", self.executable.display(), e);
                false
            }
        }
    }
}
