//! Pre-boot configuration of a release.
//!
//! The pipeline (see [`ConfigureContext::configure`]) runs once per
//! invocation:
//!
//! 1. `pre_configure` hooks
//! 2. vm.args: resolve, copy to the mutable dir, replace `${VAR}`s
//! 3. sys.config: same
//! 4. config providers
//! 5. `post_configure` hooks
//! 6. node name from vm.args
//! 7. distribution cookie
//!
//! Stages hand results to each other through [`ReleaseConfiguration`] and
//! the owned [`EnvSnapshot`], never through the process environment.

mod cookie;
mod env;
mod error;
mod exports;
mod node;
mod paths;
mod pipeline;
mod substitute;
#[cfg(test)]
mod tests;

use std::path::PathBuf;

pub use cookie::default_cookie_file;
pub use env::EnvSnapshot;
pub use error::{ConfigureError, ConfigureResult};
pub use exports::Exports;
pub use node::{NameType, NodeIdentity};
pub use pipeline::{ConfigureContext, ConfigureOptions, ConfigureOutcome};
pub(crate) use pipeline::{push_cookie_export, push_node_exports};
pub use substitute::{substitute_file, Expansion};

/// Directories and mode flags describing an unpacked release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseLayout {
    /// `releases/<vsn>` inside the release root (`REL_DIR`)
    pub rel_dir: PathBuf,
    /// Where operators keep their own vm.args/sys.config (`RELEASE_CONFIG_DIR`)
    pub config_dir: PathBuf,
    /// Writable location for generated files (`RELEASE_MUTABLE_DIR`)
    pub mutable_dir: PathBuf,
    /// Never generate or rewrite files (`RELEASE_READ_ONLY`)
    pub read_only: bool,
    /// Replace `${VAR}` in generated files (`REPLACE_OS_VARS`)
    pub replace_os_vars: bool,
}
