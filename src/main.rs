mod cli;
mod execute;

use std::process::ExitCode;
use clap::Parser;
use crate::cli::CLI;

fn main() -> ExitCode {
    let cli = CLI::parse();
    execute::execute(cli)
}
