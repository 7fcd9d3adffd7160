use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;

use commands::seed::CatalogueKind;

/// challenge-admin - catalogue and lifecycle tooling for challenge-store
#[derive(Parser)]
#[command(name = "challenge-admin")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to the standard search path)
    #[arg(long, short, global = true, value_name = "FILE", env = "CHALLENGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed a catalogue from a JSON array of records
    Seed {
        /// Which entity the records describe
        #[arg(value_enum)]
        kind: CatalogueKind,

        /// JSON file holding an array of records
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Check every record without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Check a challenge status transition against the lifecycle table
    StatusCheck {
        /// Current status
        from: String,

        /// Proposed status
        to: String,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Seed {
            kind,
            file,
            dry_run,
        } => commands::seed::execute(cli.config.as_deref(), kind, &file, dry_run).await,
        Commands::StatusCheck { from, to } => commands::status::execute(&from, &to),
        Commands::Config => commands::config::execute(cli.config.as_deref()),
    };

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);

            if let Some(source) = e.source() {
                eprintln!("\n{} {}", "Caused by:".yellow(), source);
            }

            std::process::exit(1);
        }
    }
}
