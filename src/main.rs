//! Database admin tool
//!
//! Provides CLI interface for checking, clearing and resetting a project database

// dbassist/src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

use dbassist::check::format_listing;
use dbassist::reset::RecreateOutcome;
use dbassist::utils::logging::{self, LogLevel};
use dbassist::{AssistOptions, ResetOptions, check_database, clear_database, reset_database};

#[derive(Parser, Debug)]
#[command(name = "dbassist", version, about = "Inspect, clear and reset the project database")]
struct Cli {
    /// Path to the config file. Searched upward from the current directory when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// How much to log.
    #[arg(short, long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the tables in the public schema
    Check,
    /// Truncate every table declared in the schema file
    Clear,
    /// Drop every table in the public schema and push the schema again
    Reset {
        /// Only drop the tables
        #[arg(short, long)]
        skip_schema_recreation: bool,
    },
}

/// Main entry point for the admin tool
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.log_level);

    match run_app(cli).await {
        Ok(_) => {
            info!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_app(cli: Cli) -> Result<()> {
    let options = AssistOptions {
        config_path: cli.config,
        start_dir: None,
    };

    match cli.command {
        Command::Check => {
            let tables = check_database(&options).await.context("Check process failed")?;
            if !tables.is_empty() {
                println!("{}", format_listing(&tables));
            }
        }
        Command::Clear => {
            clear_database(&options).await.context("Clear process failed")?;
        }
        Command::Reset {
            skip_schema_recreation,
        } => {
            warn!("☢️ Resetting the database: every table in the public schema will be dropped.");
            let report = reset_database(
                &options,
                ResetOptions {
                    skip_schema_recreation,
                },
            )
            .await
            .context("Reset process failed")?;
            if let RecreateOutcome::Failed(e) = &report.recreate {
                warn!("Schema was not recreated: {}", e);
            }
        }
    }
    Ok(())
}
