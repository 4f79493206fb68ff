//! The configure pipeline.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::cookie::{self, Cookie, COOKIE_ENV};
use super::env::{EnvSnapshot, PRECONFIGURE_GUARD_ENV};
use super::error::{ConfigureError, ConfigureResult};
use super::exports::Exports;
use super::node::{read_name_directive, NameDirective, NodeIdentity};
use super::paths::{self, ConfigKind, ConfigPaths};
use super::substitute::{substitute_file, Expansion};
use super::ReleaseLayout;
use crate::hooks::{HookPoint, HookRunner};
use crate::runtime::ErlRuntime;

/// Everything the pipeline needs besides the environment snapshot.
#[derive(Debug, Clone)]
pub struct ConfigureOptions {
    pub layout: ReleaseLayout,
    /// Explicit vm.args source (`VMARGS_PATH`)
    pub vm_args: Option<PathBuf>,
    /// Explicit sys.config source (`SYS_CONFIG_PATH`)
    pub sys_config: Option<PathBuf>,
    pub expansion: Expansion,
    pub erts_lib_dir: Option<PathBuf>,
    /// Host part for unqualified node names, skipping the runtime probe
    pub hostname: Option<String>,
    pub cookie_file: PathBuf,
}

/// Result of a full configure run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseConfiguration {
    pub vm_args: ConfigPaths,
    pub sys_config: ConfigPaths,
    pub node: NodeIdentity,
    pub cookie: Option<Cookie>,
}

impl ReleaseConfiguration {
    pub fn exports(&self) -> Exports {
        let mut exports = Exports::default();
        push_config_exports(&mut exports, ConfigKind::VmArgs, &self.vm_args);
        push_config_exports(&mut exports, ConfigKind::SysConfig, &self.sys_config);
        push_node_exports(&mut exports, &self.node);
        push_cookie_export(&mut exports, self.cookie.as_ref());
        exports
    }
}

fn push_config_exports(exports: &mut Exports, kind: ConfigKind, paths: &ConfigPaths) {
    exports.push(kind.src_env(), paths.source.to_string_lossy());
    if let Some(dest) = &paths.destination {
        exports.push(kind.dest_env(), dest.to_string_lossy());
    }
    exports.push(kind.path_env(), paths.effective().to_string_lossy());
}

pub(crate) fn push_node_exports(exports: &mut Exports, node: &NodeIdentity) {
    exports.push("NAME_ARG", node.name_arg.clone());
    exports.push("NAME_TYPE", node.name_type.as_flag());
    exports.push("NAME", node.name.clone());
}

pub(crate) fn push_cookie_export(exports: &mut Exports, cookie: Option<&Cookie>) {
    exports.push(COOKIE_ENV, cookie.map(|c| c.value.clone()).unwrap_or_default());
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigureOutcome {
    /// Invoked from inside a configure hook; nothing was done
    AlreadyConfiguring,
    Configured(ReleaseConfiguration),
}

/// Drives the configure stages over one environment snapshot.
///
/// # Example
/// ```ignore
/// let mut ctx = ConfigureContext::new(options, EnvSnapshot::capture(), runtime);
/// match ctx.configure().await? {
///     ConfigureOutcome::Configured(config) => print!("{}", config.exports().to_shell()),
///     ConfigureOutcome::AlreadyConfiguring => {}
/// }
/// ```
pub struct ConfigureContext {
    options: ConfigureOptions,
    env: EnvSnapshot,
    runtime: ErlRuntime,
    hooks: HookRunner,
    already_configuring: bool,
}

impl ConfigureContext {
    pub fn new(options: ConfigureOptions, env: EnvSnapshot, runtime: ErlRuntime) -> Self {
        let already_configuring = env.is_set(PRECONFIGURE_GUARD_ENV);
        let hooks = HookRunner::for_release(&options.layout.rel_dir);
        Self {
            options,
            env,
            runtime,
            hooks,
            already_configuring,
        }
    }

    #[allow(dead_code)]
    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    pub fn options(&self) -> &ConfigureOptions {
        &self.options
    }

    /// Run every stage and return what was resolved.
    pub async fn configure(&mut self) -> ConfigureResult<ConfigureOutcome> {
        // A hook calling back into configure must not start the cycle again
        if self.already_configuring {
            info!("Configuration already in progress, skipping");
            return Ok(ConfigureOutcome::AlreadyConfiguring);
        }

        self.run_hooks(HookPoint::PreConfigure).await?;

        let vm_args = self.prepare_config(ConfigKind::VmArgs)?;
        let sys_config = self.prepare_config(ConfigKind::SysConfig)?;

        if self.options.layout.read_only {
            debug!("Read-only release, skipping config providers");
        } else {
            self.run_config_providers().await?;
        }

        self.run_hooks(HookPoint::PostConfigure).await?;

        let node = self.resolve_node(vm_args.effective()).await?;
        let cookie = self.resolve_cookie(vm_args.effective(), &node).await?;

        info!("✅ Release configured as {}", node.name);
        Ok(ConfigureOutcome::Configured(ReleaseConfiguration {
            vm_args,
            sys_config,
            node,
            cookie,
        }))
    }

    /// Run a hook point with the re-entrancy guard exported to the hooks.
    /// Hooks are child processes, so a nested configure sees the guard in
    /// its captured environment and stops in its own constructor check.
    async fn run_hooks(&mut self, point: HookPoint) -> ConfigureResult<()> {
        self.env.set(PRECONFIGURE_GUARD_ENV, "true");
        let result = self.hooks.run(point, &self.env).await;
        self.env.remove(PRECONFIGURE_GUARD_ENV);
        result.map(|_| ())
    }

    fn prepare_config(&mut self, kind: ConfigKind) -> ConfigureResult<ConfigPaths> {
        let override_path = match kind {
            ConfigKind::VmArgs => self.options.vm_args.clone(),
            ConfigKind::SysConfig => self.options.sys_config.clone(),
        };
        let paths = paths::prepare_config(kind, override_path.as_deref(), &self.options.layout)?;

        self.env.set_path(kind.src_env(), &paths.source);
        match &paths.destination {
            Some(dest) => {
                self.env.set_path(kind.dest_env(), dest);
                if self.options.layout.replace_os_vars {
                    info!("🔁 Replacing environment variables in {}", dest.display());
                    substitute_file(dest, &self.env, self.options.expansion)?;
                }
            }
            None => self.env.remove(kind.dest_env()),
        }
        self.env.set_path(kind.path_env(), paths.effective());

        Ok(paths)
    }

    async fn run_config_providers(&self) -> ConfigureResult<()> {
        info!("⚙️  Running config providers");
        self.runtime
            .run_config_providers(
                &self.options.layout.rel_dir,
                self.options.erts_lib_dir.as_deref(),
                &self.env,
            )
            .await
            .inspect_err(|e| error!("❌ {}", e))
    }

    /// vm.args to read node settings from when the pipeline has not run.
    pub fn vm_args_path(&self) -> PathBuf {
        paths::resolve_source(
            ConfigKind::VmArgs,
            self.options.vm_args.as_deref(),
            &self.options.layout,
        )
    }

    /// Read the node name from `vm_args` and qualify it with a host.
    pub async fn resolve_node(&mut self, vm_args: &Path) -> ConfigureResult<NodeIdentity> {
        let directive = read_name_directive(vm_args).inspect_err(|e| error!("❌ {}", e))?;
        let host = if directive.needs_host() {
            Some(self.generate_hostname(&directive).await?)
        } else {
            None
        };
        let node = directive.qualify(host.as_deref());

        self.env.set("NAME_ARG", node.name_arg.clone());
        self.env.set("NAME_TYPE", node.name_type.as_flag());
        self.env.set("NAME", node.name.clone());
        debug!("Node name: {}", node.name);
        Ok(node)
    }

    async fn generate_hostname(&self, directive: &NameDirective) -> ConfigureResult<String> {
        if let Some(host) = &self.options.hostname {
            return Ok(host.clone());
        }

        if let Some(host) = self
            .runtime
            .probe_hostname(directive.name_type, &directive.name, &self.env)
            .await
        {
            return Ok(host);
        }

        warn!("Runtime could not report a hostname, falling back to the system hostname");
        system_hostname().ok_or_else(|| ConfigureError::HostnameUnavailable(directive.name.clone()))
    }

    /// Resolve the cookie, publishing it when found. Missing is not an error here.
    pub async fn resolve_cookie(
        &mut self,
        vm_args: &Path,
        node: &NodeIdentity,
    ) -> ConfigureResult<Option<Cookie>> {
        let cookie = cookie::resolve_cookie(
            &self.env,
            vm_args,
            &self.options.cookie_file,
            node,
            &self.runtime,
        )
        .await?;

        if let Some(cookie) = &cookie {
            debug!("Cookie resolved from {:?}", cookie.source);
            self.env.set(COOKIE_ENV, cookie.value.clone());
        }
        Ok(cookie)
    }

    /// Resolve the cookie and fail if there is none.
    pub async fn require_cookie(
        &mut self,
        vm_args: &Path,
        node: &NodeIdentity,
    ) -> ConfigureResult<Cookie> {
        let cookie = self.resolve_cookie(vm_args, node).await?;
        cookie::require_cookie(cookie, &self.options.cookie_file).inspect_err(|e| error!("❌ {}", e))
    }
}

fn system_hostname() -> Option<String> {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
}
