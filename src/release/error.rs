//! Fatal conditions raised while configuring a release.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigureError {
    /// vm.args has no `-name`/`-sname` directive (or the directive has no value)
    #[error("vm.args needs to have either -name or -sname parameter.")]
    MissingNodeName,

    /// No cookie could be determined but one is required
    #[error(
        "a secret cookie must be provided in one of the following ways:\n  \
         - with vm.args using the -setcookie parameter,\n  or\n  \
         by writing the cookie to '{}', with permissions set to 0400",
        .cookie_file.display()
    )]
    MissingCookie { cookie_file: PathBuf },

    /// The config-provider boot could not be started or exited non-zero
    #[error("config provider boot failed: {0}")]
    ProvisioningFailed(String),

    /// A hook script could not be started or exited non-zero
    #[error("{point} hook {script} failed: {reason}")]
    HookFailed {
        point: String,
        script: PathBuf,
        reason: String,
    },

    #[error("unable to determine a hostname for node {0}")]
    HostnameUnavailable(String),

    /// Recursive `${VAR}` expansion did not settle
    #[error("variable substitution in {} did not terminate on line {line}", .path.display())]
    SubstitutionLoop { path: PathBuf, line: usize },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigureError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigureError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type ConfigureResult<T> = std::result::Result<T, ConfigureError>;
