//! Source/destination resolution for vm.args and sys.config.
//!
//! Source files are never modified. A mutable copy, headed by a banner
//! pointing operators back at the file they should edit, is written to the
//! release's mutable directory unless the release is read-only.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::error::{ConfigureError, ConfigureResult};
use super::ReleaseLayout;

/// The two config files a release boots with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    VmArgs,
    SysConfig,
}

impl ConfigKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ConfigKind::VmArgs => "vm.args",
            ConfigKind::SysConfig => "sys.config",
        }
    }

    /// Comment leader understood by the file's consumer.
    fn comment(self) -> &'static str {
        match self {
            ConfigKind::VmArgs => "####",
            ConfigKind::SysConfig => "%%",
        }
    }

    pub fn banner(self, config_dir: &Path) -> String {
        format!(
            "{} Generated - edit/create {} instead.",
            self.comment(),
            config_dir.join(self.file_name()).display()
        )
    }

    pub fn src_env(self) -> &'static str {
        match self {
            ConfigKind::VmArgs => "SRC_VMARGS_PATH",
            ConfigKind::SysConfig => "SRC_SYS_CONFIG_PATH",
        }
    }

    pub fn dest_env(self) -> &'static str {
        match self {
            ConfigKind::VmArgs => "DEST_VMARGS_PATH",
            ConfigKind::SysConfig => "DEST_SYS_CONFIG_PATH",
        }
    }

    pub fn path_env(self) -> &'static str {
        match self {
            ConfigKind::VmArgs => "VMARGS_PATH",
            ConfigKind::SysConfig => "SYS_CONFIG_PATH",
        }
    }
}

/// Where a config file was read from and, if one was generated, its copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigPaths {
    pub source: PathBuf,
    /// The generated copy in the mutable directory, if one was written
    pub destination: Option<PathBuf>,
}

impl ConfigPaths {
    /// The path later stages and the runtime should use.
    pub fn effective(&self) -> &Path {
        self.destination.as_deref().unwrap_or(&self.source)
    }
}

/// Pick the source file: explicit override, then the config dir, then the
/// release dir. Existence is not validated.
pub fn resolve_source(kind: ConfigKind, override_path: Option<&Path>, layout: &ReleaseLayout) -> PathBuf {
    if let Some(path) = override_path {
        return path.to_path_buf();
    }
    let in_config_dir = layout.config_dir.join(kind.file_name());
    if in_config_dir.is_file() {
        in_config_dir
    } else {
        layout.rel_dir.join(kind.file_name())
    }
}

/// Resolve a config file and, outside read-only mode, write its mutable copy.
pub fn prepare_config(
    kind: ConfigKind,
    override_path: Option<&Path>,
    layout: &ReleaseLayout,
) -> ConfigureResult<ConfigPaths> {
    let source = resolve_source(kind, override_path, layout);
    let target = layout.mutable_dir.join(kind.file_name());
    debug!("{} source: {}", kind.file_name(), source.display());

    if source == target {
        debug!("{} already lives in the mutable dir, using as-is", kind.file_name());
        return Ok(ConfigPaths {
            source,
            destination: None,
        });
    }

    if layout.read_only {
        debug!("Read-only release, not generating {}", target.display());
        return Ok(ConfigPaths {
            source,
            destination: None,
        });
    }

    write_generated_copy(kind, &source, &target, &layout.config_dir)?;
    info!("📝 Generated {}", target.display());

    Ok(ConfigPaths {
        source,
        destination: Some(target),
    })
}

fn write_generated_copy(
    kind: ConfigKind,
    source: &Path,
    target: &Path,
    config_dir: &Path,
) -> ConfigureResult<()> {
    let contents = fs::read(source).map_err(|e| ConfigureError::io(source, e))?;

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigureError::io(parent, e))?;
    }

    let mut generated = kind.banner(config_dir).into_bytes();
    generated.push(b'\n');
    generated.extend_from_slice(&contents);

    fs::write(target, generated).map_err(|e| ConfigureError::io(target, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout(root: &Path, read_only: bool) -> ReleaseLayout {
        ReleaseLayout {
            rel_dir: root.join("releases/0.1.0"),
            config_dir: root.join("etc"),
            mutable_dir: root.join("var"),
            read_only,
            replace_os_vars: false,
        }
    }

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_source_prefers_override_then_config_dir() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(tmp.path(), false);

        assert_eq!(
            resolve_source(ConfigKind::VmArgs, None, &layout),
            layout.rel_dir.join("vm.args")
        );

        write(&layout.config_dir.join("vm.args"), "-sname a\n");
        assert_eq!(
            resolve_source(ConfigKind::VmArgs, None, &layout),
            layout.config_dir.join("vm.args")
        );

        let custom = tmp.path().join("custom.args");
        assert_eq!(
            resolve_source(ConfigKind::VmArgs, Some(&custom), &layout),
            custom
        );
    }

    #[test]
    fn test_generated_copy_has_banner_and_leaves_source_alone() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(tmp.path(), false);
        let src = layout.rel_dir.join("sys.config");
        write(&src, "[{app, [{port, 4000}]}].\n");

        let paths = prepare_config(ConfigKind::SysConfig, None, &layout).unwrap();
        let dest = layout.mutable_dir.join("sys.config");
        assert_eq!(paths.source, src);
        assert_eq!(paths.destination.as_deref(), Some(dest.as_path()));
        assert_eq!(paths.effective(), dest.as_path());

        let generated = fs::read_to_string(&dest).unwrap();
        let expected = format!(
            "%% Generated - edit/create {} instead.\n[{{app, [{{port, 4000}}]}}].\n",
            layout.config_dir.join("sys.config").display()
        );
        assert_eq!(generated, expected);
        assert_eq!(fs::read_to_string(&src).unwrap(), "[{app, [{port, 4000}]}].\n");
    }

    #[test]
    fn test_vm_args_banner_uses_hash_comment() {
        let banner = ConfigKind::VmArgs.banner(Path::new("/srv/app/etc"));
        assert_eq!(banner, "#### Generated - edit/create /srv/app/etc/vm.args instead.");
    }

    #[test]
    fn test_read_only_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(tmp.path(), true);
        let src = layout.rel_dir.join("vm.args");
        write(&src, "-sname app\n");

        let paths = prepare_config(ConfigKind::VmArgs, None, &layout).unwrap();
        assert_eq!(paths.destination, None);
        assert_eq!(paths.effective(), src.as_path());
        assert!(!layout.mutable_dir.join("vm.args").exists());
    }

    #[test]
    fn test_source_in_mutable_dir_is_used_as_is() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(tmp.path(), false);
        let existing = layout.mutable_dir.join("vm.args");
        write(&existing, "-sname app\n");

        let paths = prepare_config(ConfigKind::VmArgs, Some(&existing), &layout).unwrap();
        assert_eq!(paths.destination, None);
        assert_eq!(fs::read_to_string(&existing).unwrap(), "-sname app\n");
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(tmp.path(), false);
        let err = prepare_config(ConfigKind::VmArgs, None, &layout).unwrap_err();
        assert!(matches!(err, ConfigureError::Io { .. }));
    }
}
