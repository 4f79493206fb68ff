//! End-to-end tests for the configure pipeline.
//!
//! A fake `erl` shell script stands in for the runtime: it appends its
//! arguments to a log file and answers hostname probes with `fakehost`.

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use tempfile::TempDir;

    use crate::release::cookie::CookieSource;
    use crate::release::env::PRECONFIGURE_GUARD_ENV;
    use crate::release::{
        default_cookie_file, ConfigureContext, ConfigureError, ConfigureOptions, ConfigureOutcome,
        EnvSnapshot, Expansion, NameType, ReleaseLayout,
    };
    use crate::runtime::ErlRuntime;

    struct Release {
        tmp: TempDir,
        layout: ReleaseLayout,
        erl_log: PathBuf,
    }

    impl Release {
        fn new(read_only: bool, replace_os_vars: bool) -> Self {
            let tmp = TempDir::new().unwrap();
            let root = tmp.path();
            let layout = ReleaseLayout {
                rel_dir: root.join("releases/1.0.0"),
                config_dir: root.join("etc"),
                mutable_dir: root.join("var"),
                read_only,
                replace_os_vars,
            };
            fs::create_dir_all(&layout.rel_dir).unwrap();
            fs::create_dir_all(&layout.config_dir).unwrap();
            let erl_log = root.join("erl.log");
            Self {
                tmp,
                layout,
                erl_log,
            }
        }

        fn home(&self) -> &Path {
            self.tmp.path()
        }

        fn write_erl(&self, exit_code: u8) -> ErlRuntime {
            let erl = self.tmp.path().join("erl");
            let script = format!(
                "#!/bin/sh\necho \"$@\" >> '{}'\ncase \"$*\" in\n  *-eval*) echo fakehost ;;\nesac\nexit {}\n",
                self.erl_log.display(),
                exit_code
            );
            fs::write(&erl, script).unwrap();
            fs::set_permissions(&erl, fs::Permissions::from_mode(0o755)).unwrap();
            ErlRuntime::new(erl)
        }

        fn add_hook(&self, point: &str, body: &str) {
            let dir = self.layout.rel_dir.join("hooks").join(format!("{}.d", point));
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("00_hook.sh"), body).unwrap();
        }

        fn options(&self) -> ConfigureOptions {
            ConfigureOptions {
                layout: self.layout.clone(),
                vm_args: None,
                sys_config: None,
                expansion: Expansion::Recursive,
                erts_lib_dir: None,
                hostname: None,
                cookie_file: default_cookie_file(self.home()),
            }
        }

        fn erl_calls(&self) -> Vec<String> {
            fs::read_to_string(&self.erl_log)
                .map(|log| log.lines().map(str::to_string).collect())
                .unwrap_or_default()
        }
    }

    fn env(pairs: &[(&str, &str)]) -> EnvSnapshot {
        pairs.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_full_configure_generates_and_substitutes() {
        let release = Release::new(false, true);
        let vm_src = release.layout.config_dir.join("vm.args");
        fs::write(&vm_src, "-sname ${APP_NAME}\n-setcookie ${APP_COOKIE}\n").unwrap();
        let sys_src = release.layout.rel_dir.join("sys.config");
        fs::write(&sys_src, "[{app, [{port, ${PORT}}]}].\n").unwrap();
        let runtime = release.write_erl(0);

        let snapshot = env(&[("APP_NAME", "web"), ("APP_COOKIE", "c&k"), ("PORT", "4000")]);
        let mut ctx = ConfigureContext::new(release.options(), snapshot, runtime);
        let outcome = ctx.configure().await.unwrap();

        let ConfigureOutcome::Configured(config) = outcome else {
            panic!("expected a configured release");
        };

        let vm_dest = release.layout.mutable_dir.join("vm.args");
        let sys_dest = release.layout.mutable_dir.join("sys.config");
        assert_eq!(config.vm_args.source, vm_src);
        assert_eq!(config.vm_args.destination.as_deref(), Some(vm_dest.as_path()));
        assert_eq!(config.sys_config.source, sys_src);

        let vm_generated = fs::read_to_string(&vm_dest).unwrap();
        assert!(vm_generated.starts_with("#### Generated - edit/create "));
        assert!(vm_generated.ends_with("-sname web\n-setcookie c&k\n"));
        let sys_generated = fs::read_to_string(&sys_dest).unwrap();
        assert!(sys_generated.starts_with("%% Generated - edit/create "));
        assert!(sys_generated.ends_with("[{app, [{port, 4000}]}].\n"));

        // Sources stay untouched
        assert_eq!(
            fs::read_to_string(&vm_src).unwrap(),
            "-sname ${APP_NAME}\n-setcookie ${APP_COOKIE}\n"
        );

        assert_eq!(config.node.name, "web@fakehost");
        assert_eq!(config.node.name_type, NameType::Short);
        let cookie = config.cookie.clone().unwrap();
        assert_eq!(cookie.value, "c&k");
        assert_eq!(cookie.source, CookieSource::VmArgs);

        let calls = release.erl_calls();
        let config_boot = release.layout.rel_dir.join("config");
        assert!(calls.iter().any(|c| c.starts_with(&format!(
            "-noshell -boot {} -kernel logger_level warning",
            config_boot.display()
        ))));

        let exports = config.exports();
        assert_eq!(exports.get("VMARGS_PATH"), Some(&*vm_dest.to_string_lossy()));
        assert_eq!(exports.get("SYS_CONFIG_PATH"), Some(&*sys_dest.to_string_lossy()));
        assert_eq!(exports.get("NAME"), Some("web@fakehost"));
        assert_eq!(exports.get("NAME_TYPE"), Some("-sname"));
        assert_eq!(exports.get("COOKIE"), Some("c&k"));

        assert_eq!(ctx.env().get("NAME"), Some("web@fakehost"));
        assert_eq!(ctx.env().get(PRECONFIGURE_GUARD_ENV), None);
    }

    #[tokio::test]
    async fn test_variables_left_alone_without_replace_os_vars() {
        let release = Release::new(false, false);
        fs::write(
            release.layout.rel_dir.join("vm.args"),
            "-name app@${HOST}\n-setcookie x\n",
        )
        .unwrap();
        fs::write(release.layout.rel_dir.join("sys.config"), "[].\n").unwrap();
        let runtime = release.write_erl(0);

        let mut ctx = ConfigureContext::new(release.options(), env(&[("HOST", "h")]), runtime);
        let ConfigureOutcome::Configured(config) = ctx.configure().await.unwrap() else {
            panic!("expected a configured release");
        };

        assert_eq!(config.node.name, "app@${HOST}");
        let generated = fs::read_to_string(release.layout.mutable_dir.join("vm.args")).unwrap();
        assert!(generated.contains("-name app@${HOST}"));
    }

    #[tokio::test]
    async fn test_read_only_generates_nothing_and_skips_providers() {
        let release = Release::new(true, true);
        let vm_src = release.layout.rel_dir.join("vm.args");
        let vm_contents = "-name app@db.example.com\n-setcookie ro\n-kernel inet_dist_listen_min ${PORT}\n";
        fs::write(&vm_src, vm_contents).unwrap();
        let sys_src = release.layout.rel_dir.join("sys.config");
        fs::write(&sys_src, "[{app, [{host, \"${HOST}\"}]}].\n").unwrap();
        let runtime = release.write_erl(0);

        let snapshot = env(&[("HOST", "db1"), ("PORT", "9100")]);
        let mut ctx = ConfigureContext::new(release.options(), snapshot, runtime);
        let ConfigureOutcome::Configured(config) = ctx.configure().await.unwrap() else {
            panic!("expected a configured release");
        };

        assert!(!release.layout.mutable_dir.exists());
        assert_eq!(config.vm_args.effective(), vm_src.as_path());
        assert_eq!(config.sys_config.effective(), sys_src.as_path());
        assert_eq!(config.node.name, "app@db.example.com");
        assert!(release.erl_calls().is_empty());
        assert_eq!(fs::read_to_string(&vm_src).unwrap(), vm_contents);
        assert_eq!(
            fs::read_to_string(&sys_src).unwrap(),
            "[{app, [{host, \"${HOST}\"}]}].\n"
        );

        let exports = config.exports();
        assert_eq!(exports.get("DEST_VMARGS_PATH"), None);
        assert_eq!(exports.get("VMARGS_PATH"), Some(&*vm_src.to_string_lossy()));
    }

    #[tokio::test]
    async fn test_source_in_mutable_dir_is_used_without_substitution() {
        let release = Release::new(false, true);
        fs::create_dir_all(&release.layout.mutable_dir).unwrap();
        let vm_args = release.layout.mutable_dir.join("vm.args");
        let vm_contents = "-sname app\n-setcookie k\n-env PORT ${X}\n";
        fs::write(&vm_args, vm_contents).unwrap();
        fs::write(release.layout.rel_dir.join("sys.config"), "[].\n").unwrap();
        let runtime = release.write_erl(0);

        let mut options = release.options();
        options.vm_args = Some(vm_args.clone());
        options.hostname = Some("static".to_string());
        let mut ctx = ConfigureContext::new(options, env(&[("X", "4000")]), runtime);
        let ConfigureOutcome::Configured(config) = ctx.configure().await.unwrap() else {
            panic!("expected a configured release");
        };

        assert_eq!(config.vm_args.destination, None);
        assert_eq!(config.vm_args.effective(), vm_args.as_path());
        assert_eq!(fs::read_to_string(&vm_args).unwrap(), vm_contents);
        assert_eq!(ctx.env().get("DEST_VMARGS_PATH"), None);
    }

    #[tokio::test]
    async fn test_short_name_falls_back_to_os_hostname() {
        let release = Release::new(true, false);
        let vm_args = release.layout.rel_dir.join("vm.args");
        fs::write(&vm_args, "-sname app\n").unwrap();

        let runtime = ErlRuntime::new(release.tmp.path().join("no-such-erl"));
        let mut ctx = ConfigureContext::new(release.options(), EnvSnapshot::default(), runtime);
        let node = ctx.resolve_node(&vm_args).await.unwrap();

        let os_host = hostname::get().unwrap().into_string().unwrap();
        assert_eq!(node.name, format!("app@{}", os_host.trim()));
        assert_eq!(node.name_arg, "-sname app");
    }

    #[tokio::test]
    async fn test_nested_invocation_returns_immediately() {
        let release = Release::new(false, true);
        fs::write(release.layout.rel_dir.join("vm.args"), "-sname app\n").unwrap();
        let marker = release.tmp.path().join("hook-ran");
        release.add_hook("pre_configure", &format!("touch '{}'\n", marker.display()));
        let runtime = release.write_erl(0);

        let snapshot = env(&[(PRECONFIGURE_GUARD_ENV, "true")]);
        let mut ctx = ConfigureContext::new(release.options(), snapshot, runtime);
        let outcome = ctx.configure().await.unwrap();

        assert_eq!(outcome, ConfigureOutcome::AlreadyConfiguring);
        assert!(!marker.exists());
        assert!(!release.layout.mutable_dir.exists());
        assert!(release.erl_calls().is_empty());
    }

    #[tokio::test]
    async fn test_hooks_see_guard_and_published_paths() {
        let release = Release::new(false, false);
        fs::write(release.layout.rel_dir.join("vm.args"), "-sname app\n-setcookie k\n").unwrap();
        fs::write(release.layout.rel_dir.join("sys.config"), "[].\n").unwrap();
        let seen = release.tmp.path().join("seen");
        release.add_hook(
            "post_configure",
            &format!(
                "echo \"$DISTILLERY_PRECONFIGURE $VMARGS_PATH\" > '{}'\n",
                seen.display()
            ),
        );
        let runtime = release.write_erl(0);

        let mut options = release.options();
        options.hostname = Some("static".to_string());
        let mut ctx = ConfigureContext::new(options, EnvSnapshot::default(), runtime);
        ctx.configure().await.unwrap();

        let vm_dest = release.layout.mutable_dir.join("vm.args");
        assert_eq!(
            fs::read_to_string(&seen).unwrap(),
            format!("true {}\n", vm_dest.display())
        );
        assert_eq!(ctx.env().get(PRECONFIGURE_GUARD_ENV), None);
        assert_eq!(ctx.env().get("NAME"), Some("app@static"));

        // Hooks leave no guard behind, so the same context configures again
        let outcome = ctx.configure().await.unwrap();
        assert!(matches!(outcome, ConfigureOutcome::Configured(_)));
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_before_post_hooks() {
        let release = Release::new(false, false);
        fs::write(release.layout.rel_dir.join("vm.args"), "-sname app\n").unwrap();
        fs::write(release.layout.rel_dir.join("sys.config"), "[].\n").unwrap();
        let marker = release.tmp.path().join("post-ran");
        release.add_hook("post_configure", &format!("touch '{}'\n", marker.display()));
        let runtime = release.write_erl(1);

        let mut ctx = ConfigureContext::new(release.options(), EnvSnapshot::default(), runtime);
        let err = ctx.configure().await.unwrap_err();

        assert!(matches!(err, ConfigureError::ProvisioningFailed(_)));
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_missing_name_directive_is_fatal() {
        let release = Release::new(false, false);
        fs::write(release.layout.rel_dir.join("vm.args"), "+K true\n").unwrap();
        fs::write(release.layout.rel_dir.join("sys.config"), "[].\n").unwrap();
        let runtime = release.write_erl(0);

        let mut ctx = ConfigureContext::new(release.options(), EnvSnapshot::default(), runtime);
        let err = ctx.configure().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "vm.args needs to have either -name or -sname parameter."
        );
    }

    #[tokio::test]
    async fn test_require_cookie_without_any_source() {
        let release = Release::new(true, false);
        let vm_args = release.layout.rel_dir.join("vm.args");
        fs::write(&vm_args, "-sname app\n").unwrap();

        let mut options = release.options();
        options.hostname = Some("localhost".to_string());
        let runtime = ErlRuntime::new(release.tmp.path().join("no-such-erl"));
        let mut ctx = ConfigureContext::new(options, EnvSnapshot::default(), runtime);

        let node = ctx.resolve_node(&vm_args).await.unwrap();
        assert_eq!(node.name, "app@localhost");
        assert_eq!(ctx.resolve_cookie(&vm_args, &node).await.unwrap(), None);

        let err = ctx.require_cookie(&vm_args, &node).await.unwrap_err();
        assert!(matches!(err, ConfigureError::MissingCookie { .. }));
        assert!(err.to_string().contains(".erlang.cookie"));
    }
}
