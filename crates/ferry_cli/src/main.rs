//! Ferry CLI
//!
//! Command-line tools for inspecting ferry sync sessions.
//!
//! # Commands
//!
//! - `replay` - Run a JSON scenario through a session and print each batch
//! - `version` - Show version information

mod commands;
mod scenario;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Ferry sync session tools.
#[derive(Parser)]
#[command(name = "ferry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file and print every popped batch as JSON
    Replay {
        /// Path to the scenario file
        scenario: PathBuf,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Replay { scenario, pretty } => {
            commands::replay::run(&scenario, pretty)?;
        }
        Commands::Version => {
            println!("Ferry CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
