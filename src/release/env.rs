//! Owned snapshot of the environment shared by the configuration stages.
//!
//! The snapshot is captured once from the process environment and then
//! updated as stages publish their results (`VMARGS_PATH`, `NAME`, `COOKIE`,
//! ...). Later `${VAR}` substitutions, hook scripts and runtime subprocesses
//! all see the updated values. The process environment itself is never
//! written.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::Path;

/// Re-entrancy guard exported to hook processes.
pub const PRECONFIGURE_GUARD_ENV: &str = "DISTILLERY_PRECONFIGURE";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    vars: BTreeMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the current process environment. Non-UTF-8 entries are
    /// converted lossily.
    pub fn capture() -> Self {
        std::env::vars_os()
            .map(|(k, v)| (k.to_string_lossy().into_owned(), v.to_string_lossy().into_owned()))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Value of `key`, or an empty string when unset.
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    /// Shell-style flag test: set means present and non-empty.
    pub fn is_set(&self, key: &str) -> bool {
        !self.get_or_empty(key).is_empty()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn set_path(&mut self, key: impl Into<String>, value: &Path) {
        self.set(key, value.to_string_lossy().into_owned());
    }

    pub fn remove(&mut self, key: &str) {
        self.vars.remove(key);
    }

    /// Iterate over all variables, for handing to a child process.
    pub fn iter(&self) -> impl Iterator<Item = (&OsStr, &OsStr)> {
        self.vars
            .iter()
            .map(|(k, v)| (OsStr::new(k.as_str()), OsStr::new(v.as_str())))
    }
}

impl<K, V> FromIterator<(K, V)> for EnvSnapshot
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
