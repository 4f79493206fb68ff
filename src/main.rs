use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod cli;
mod command;
mod hooks;
mod release;
mod runtime;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is reserved for the exported variables
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Configure {
            release,
            output,
            require_cookie,
        } => command::run_configure(release, output.format, require_cookie).await,
        Commands::NodeName { release, output } => {
            command::run_node_name(release, output.format).await
        }
        Commands::Cookie {
            release,
            output,
            require,
        } => command::run_cookie(release, output.format, require).await,
        Commands::Substitute { file, single_pass } => {
            command::run_substitute(file, single_pass).await
        }
    }
}
