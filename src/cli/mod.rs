// CLI module
// Command-line interface and argument parsing

mod args;

pub use args::{CliArgs, Command, JobKind, SeedArgs};

use clap::Parser;

/// Parse command-line arguments, exiting with usage on error
pub fn parse_args() -> CliArgs {
    CliArgs::parse()
}
