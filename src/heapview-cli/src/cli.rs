//! CLI argument definitions for heapview

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "heapview")]
#[command(about = "Inspect Go heap dump files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print every record of a heap dump as newline-delimited JSON
    #[command(visible_alias = "d")]
    Dump {
        /// Path to heap dump file
        input: PathBuf,
    },

    /// Show objects rooted in stack frames together with owned-size statistics
    #[command(visible_alias = "o")]
    Owned {
        /// Path to heap dump file
        input: PathBuf,
    },
}
