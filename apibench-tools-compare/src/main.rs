use anyhow::Result;
use clap::Parser;

use apibench_tools_compare::cli::Cli;

fn main() -> Result<()> {
    apibench_tools_compare::app::run(Cli::parse())
}
