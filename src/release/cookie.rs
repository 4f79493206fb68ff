//! Distribution cookie resolution.
//!
//! Lookup order:
//! 1. `COOKIE` already present in the snapshot (a previous resolution)
//! 2. `-setcookie` in vm.args
//! 3. the default cookie file, `~/.erlang.cookie`
//! 4. booting the node once so the runtime generates that file

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::env::EnvSnapshot;
use super::error::{ConfigureError, ConfigureResult};
use super::node::{parse_cookie_directive, NodeIdentity};
use crate::runtime::ErlRuntime;

pub const COOKIE_ENV: &str = "COOKIE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CookieSource {
    Environment,
    VmArgs,
    CookieFile,
    Generated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub value: String,
    pub source: CookieSource,
}

pub fn default_cookie_file(home: &Path) -> PathBuf {
    home.join(".erlang.cookie")
}

/// Contents of the cookie file without trailing newlines; `None` only when
/// the file is missing. A blank file still counts as present.
pub fn read_cookie_file(path: &Path) -> ConfigureResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents.trim_end_matches(['\r', '\n']).to_string())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ConfigureError::io(path, e)),
    }
}

/// Resolve the cookie without failing when none can be found.
pub async fn resolve_cookie(
    env: &EnvSnapshot,
    vm_args: &Path,
    cookie_file: &Path,
    node: &NodeIdentity,
    runtime: &ErlRuntime,
) -> ConfigureResult<Option<Cookie>> {
    if env.is_set(COOKIE_ENV) {
        debug!("Cookie already resolved");
        return Ok(Some(Cookie {
            value: env.get_or_empty(COOKIE_ENV).to_string(),
            source: CookieSource::Environment,
        }));
    }

    let contents = fs::read_to_string(vm_args).map_err(|e| ConfigureError::io(vm_args, e))?;
    if let Some(value) = parse_cookie_directive(&contents) {
        debug!("Cookie taken from {}", vm_args.display());
        return Ok(Some(Cookie {
            value,
            source: CookieSource::VmArgs,
        }));
    }

    if let Some(value) = read_cookie_file(cookie_file)? {
        debug!("Cookie taken from {}", cookie_file.display());
        return Ok(Some(Cookie {
            value,
            source: CookieSource::CookieFile,
        }));
    }

    info!("🍪 No cookie configured, booting {} to generate one", node.name);
    if !runtime.bootstrap_cookie(node, env).await {
        warn!("Runtime did not start, no cookie generated");
        return Ok(None);
    }

    Ok(read_cookie_file(cookie_file)?.map(|value| Cookie {
        value,
        source: CookieSource::Generated,
    }))
}

/// Fail unless a non-empty cookie was resolved.
pub fn require_cookie(cookie: Option<Cookie>, cookie_file: &Path) -> ConfigureResult<Cookie> {
    cookie.filter(|c| !c.value.is_empty()).ok_or_else(|| ConfigureError::MissingCookie {
        cookie_file: cookie_file.to_path_buf(),
    })
}
