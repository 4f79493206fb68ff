mod args;
mod paths;

pub use args::{Cli, Commands, OutputFormat, ReleaseArgs};

use std::path::Path;

use anyhow::Result;

use crate::release::{
    default_cookie_file, ConfigureContext, ConfigureOptions, EnvSnapshot, Expansion, ReleaseLayout,
};
use crate::runtime::ErlRuntime;

impl ReleaseArgs {
    pub fn layout(&self) -> ReleaseLayout {
        let root = paths::release_root(&self.rel_dir);
        ReleaseLayout {
            rel_dir: self.rel_dir.clone(),
            config_dir: self.config_dir.clone().unwrap_or_else(|| root.clone()),
            mutable_dir: self.mutable_dir.clone().unwrap_or_else(|| root.join("var")),
            read_only: is_set(&self.read_only),
            replace_os_vars: is_set(&self.replace_os_vars),
        }
    }

    pub fn expansion(&self) -> Expansion {
        if self.single_pass {
            Expansion::SinglePass
        } else {
            Expansion::Recursive
        }
    }

    pub fn runtime(&self) -> ErlRuntime {
        match &self.erl {
            Some(erl) => ErlRuntime::new(erl),
            None => ErlRuntime::locate(self.bindir.as_deref()),
        }
    }

    pub fn options(&self, home: &Path) -> ConfigureOptions {
        ConfigureOptions {
            layout: self.layout(),
            vm_args: self.vm_args.clone(),
            sys_config: self.sys_config.clone(),
            expansion: self.expansion(),
            erts_lib_dir: self.erts_lib_dir.clone(),
            hostname: self.hostname.clone(),
            cookie_file: default_cookie_file(home),
        }
    }

    /// Build a pipeline over the current process environment, overlaid with
    /// the parsed options so hooks and runtime boots see the same values.
    pub fn context(&self) -> Result<ConfigureContext> {
        let home = paths::resolve_home(self.home.clone())?;
        let options = self.options(&home);
        let mut env = EnvSnapshot::capture();
        self.publish(&mut env, &options.layout, &home);
        Ok(ConfigureContext::new(options, env, self.runtime()))
    }

    fn publish(&self, env: &mut EnvSnapshot, layout: &ReleaseLayout, home: &Path) {
        env.set_path("REL_DIR", &layout.rel_dir);
        env.set_path("RELEASE_CONFIG_DIR", &layout.config_dir);
        env.set_path("RELEASE_MUTABLE_DIR", &layout.mutable_dir);
        env.set_path("HOME", home);

        for (key, flag) in [
            ("RELEASE_READ_ONLY", &self.read_only),
            ("REPLACE_OS_VARS", &self.replace_os_vars),
        ] {
            match flag.as_deref().filter(|value| !value.is_empty()) {
                Some(value) => env.set(key, value),
                None => env.remove(key),
            }
        }
        if let Some(bindir) = &self.bindir {
            env.set_path("BINDIR", bindir);
        }
        if let Some(lib_dir) = &self.erts_lib_dir {
            env.set_path("ERTS_LIB_DIR", lib_dir);
        }
    }
}

fn is_set(flag: &Option<String>) -> bool {
    flag.as_deref().is_some_and(|value| !value.is_empty())
}
