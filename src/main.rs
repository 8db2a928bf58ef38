use anyhow::Result;

mod cli;
mod commands;
mod enums;
mod errors;
mod formatters;
mod logging;
mod parsers;
mod types;

use cli::Cli;

fn main() -> Result<()> {
    Cli::run()
}
