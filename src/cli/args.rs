use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// relconf - prepare vm.args, sys.config, node name and cookie before a release boots
#[derive(Parser)]
#[command(name = "relconf")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate config files, run config providers and resolve node name and cookie
    Configure {
        #[command(flatten)]
        release: ReleaseArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Fail if no distribution cookie can be determined
        #[arg(long)]
        require_cookie: bool,
    },
    /// Print the node name derived from vm.args
    NodeName {
        #[command(flatten)]
        release: ReleaseArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Print the distribution cookie
    Cookie {
        #[command(flatten)]
        release: ReleaseArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Fail if no cookie can be determined
        #[arg(long)]
        require: bool,
    },
    /// Replace ${VAR} occurrences in a file with environment values, in place
    Substitute {
        /// File to rewrite
        file: PathBuf,

        /// Do not expand variables that appear inside substituted values
        #[arg(long)]
        single_pass: bool,
    },
}

/// Release location and mode. Every option can also come from the
/// environment variable the run-control script already exports.
#[derive(Args, Debug, Clone)]
pub struct ReleaseArgs {
    /// Release version directory (releases/<vsn>)
    #[arg(long, env = "REL_DIR")]
    pub rel_dir: PathBuf,

    /// Directory with operator-provided vm.args/sys.config. Defaults to the release root
    #[arg(long, env = "RELEASE_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Writable directory for generated files. Defaults to <release root>/var
    #[arg(long, env = "RELEASE_MUTABLE_DIR")]
    pub mutable_dir: Option<PathBuf>,

    /// Never generate or rewrite files (any non-empty value enables it)
    #[arg(long, env = "RELEASE_READ_ONLY", num_args = 0..=1, default_missing_value = "true")]
    pub read_only: Option<String>,

    /// Replace ${VAR} in generated files (any non-empty value enables it)
    #[arg(long, env = "REPLACE_OS_VARS", num_args = 0..=1, default_missing_value = "true")]
    pub replace_os_vars: Option<String>,

    /// vm.args to use instead of the default lookup
    #[arg(long, env = "VMARGS_PATH")]
    pub vm_args: Option<PathBuf>,

    /// sys.config to use instead of the default lookup
    #[arg(long, env = "SYS_CONFIG_PATH")]
    pub sys_config: Option<PathBuf>,

    /// ERTS bin directory containing erl
    #[arg(long, env = "BINDIR")]
    pub bindir: Option<PathBuf>,

    /// Passed to the config provider boot as the ERTS_LIB_DIR boot variable
    #[arg(long, env = "ERTS_LIB_DIR")]
    pub erts_lib_dir: Option<PathBuf>,

    /// Runtime executable, overriding BINDIR lookup
    #[arg(long)]
    pub erl: Option<PathBuf>,

    /// Host part for node names without one, instead of asking the runtime
    #[arg(long)]
    pub hostname: Option<String>,

    /// Home directory holding .erlang.cookie
    #[arg(long, env = "HOME")]
    pub home: Option<PathBuf>,

    /// Do not expand variables that appear inside substituted values
    #[arg(long)]
    pub single_pass: bool,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct OutputArgs {
    /// How to print resolved variables
    #[arg(long, value_enum, default_value_t = OutputFormat::Shell)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// `export KEY='value'` lines for eval
    Shell,
    /// A single JSON object
    Json,
}
