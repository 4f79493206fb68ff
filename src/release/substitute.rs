//! `${VAR}` replacement in generated config files.

use std::borrow::Cow;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::OnceLock;

use regex::{Captures, Regex};
use tempfile::NamedTempFile;
use tracing::debug;

use super::env::EnvSnapshot;
use super::error::{ConfigureError, ConfigureResult};

/// Upper bound on re-scans of a single line in recursive mode.
pub const MAX_EXPANSION_PASSES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expansion {
    /// Re-scan replaced text until no `${...}` token remains
    #[default]
    Recursive,
    /// Replace the tokens present in the original text once
    SinglePass,
}

fn token_pattern() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\$\{([^}\n]*)\}").expect("valid token regex"))
}

/// Expand one line. Returns `None` when recursive expansion does not settle.
pub fn expand_line<'a>(line: &'a str, env: &EnvSnapshot, mode: Expansion) -> Option<Cow<'a, str>> {
    let token = token_pattern();
    // The closure returns the value itself, so `$`, `&` and `\` in it stay literal.
    let lookup = |caps: &Captures<'_>| env.get_or_empty(&caps[1]).to_string();

    match mode {
        Expansion::SinglePass => Some(token.replace_all(line, lookup)),
        Expansion::Recursive => {
            let mut current = Cow::Borrowed(line);
            for _ in 0..MAX_EXPANSION_PASSES {
                if !token.is_match(&current) {
                    return Some(current);
                }
                current = Cow::Owned(token.replace_all(&current, lookup).into_owned());
            }
            if token.is_match(&current) {
                None
            } else {
                Some(current)
            }
        }
    }
}

/// Expand every line of `contents`; on failure returns the 1-based line number.
pub fn expand_text(contents: &str, env: &EnvSnapshot, mode: Expansion) -> Result<String, usize> {
    let mut out = String::with_capacity(contents.len());
    for (idx, line) in contents.split_inclusive('\n').enumerate() {
        let expanded = expand_line(line, env, mode).ok_or(idx + 1)?;
        out.push_str(&expanded);
    }
    Ok(out)
}

/// Rewrite `path` in place with all `${VAR}` tokens expanded.
///
/// The new content goes to a temporary file in the same directory which
/// takes over the original's permissions (and owner on Unix) and is then
/// renamed over it.
pub fn substitute_file(path: &Path, env: &EnvSnapshot, mode: Expansion) -> ConfigureResult<()> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigureError::io(path, e))?;
    let expanded = expand_text(&contents, env, mode).map_err(|line| ConfigureError::SubstitutionLoop {
        path: path.to_path_buf(),
        line,
    })?;

    if expanded == contents {
        debug!("No variables to replace in {}", path.display());
        return Ok(());
    }

    let metadata = fs::metadata(path).map_err(|e| ConfigureError::io(path, e))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| ConfigureError::io(dir, e))?;
    tmp.write_all(expanded.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| ConfigureError::io(tmp.path(), e))?;
    fs::set_permissions(tmp.path(), metadata.permissions())
        .map_err(|e| ConfigureError::io(tmp.path(), e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        if let Err(e) = std::os::unix::fs::chown(tmp.path(), Some(metadata.uid()), Some(metadata.gid())) {
            debug!("Could not carry ownership over to {}: {}", path.display(), e);
        }
    }

    tmp.persist(path)
        .map_err(|e| ConfigureError::io(path, e.error))?;
    debug!("Replaced variables in {}", path.display());
    Ok(())
}
