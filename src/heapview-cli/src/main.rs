mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump { input } => {
            commands::dump::handle(&input)?;
        }

        Commands::Owned { input } => {
            commands::owned::handle(&input)?;
        }
    }

    Ok(())
}
