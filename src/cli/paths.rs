use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Release root for a `releases/<vsn>` directory.
pub fn release_root(rel_dir: &Path) -> PathBuf {
    rel_dir
        .parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| rel_dir.to_path_buf())
}

/// Resolve the home directory holding `.erlang.cookie`.
pub fn resolve_home(home: Option<PathBuf>) -> Result<PathBuf> {
    match home {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(dir),
        _ => dirs::home_dir().context("Could not determine home directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_root() {
        assert_eq!(
            release_root(Path::new("/srv/app/releases/1.0.0")),
            PathBuf::from("/srv/app")
        );
        assert_eq!(release_root(Path::new("rel")), PathBuf::from("rel"));
    }

    #[test]
    fn test_explicit_home_wins() {
        let home = resolve_home(Some(PathBuf::from("/home/app"))).unwrap();
        assert_eq!(home, PathBuf::from("/home/app"));
    }
}
