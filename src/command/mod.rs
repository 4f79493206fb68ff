mod configure;
mod cookie;
mod node_name;
mod substitute;

pub use configure::run_configure;
pub use cookie::run_cookie;
pub use node_name::run_node_name;
pub use substitute::run_substitute;

use anyhow::Result;

use crate::cli::OutputFormat;
use crate::release::Exports;

/// Write resolved variables to stdout; logs go to stderr.
fn print_exports(exports: &Exports, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Shell => print!("{}", exports.to_shell()),
        OutputFormat::Json => println!("{}", exports.to_json()?),
    }
    Ok(())
}
