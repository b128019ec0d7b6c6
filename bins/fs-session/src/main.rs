//! Foodshare session CLI
//!
//! Inspect and drive the device session that the mobile clients persist:
//! sign in, force a token refresh, sign out, and check API health.

use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process::ExitCode;

mod commands;
mod context;

use commands::{health, refresh, sign_in, sign_out, status};

/// Session management CLI for the Foodshare API
#[derive(Parser)]
#[command(name = "fs-session")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json)
    #[arg(short, long, global = true, default_value = "text")]
    format: String,

    /// Directory holding the persisted session (defaults to the platform data dir)
    #[arg(long, global = true, value_name = "DIR")]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the session stored on this device
    Status,

    /// Sign in and persist the issued token pair
    SignIn {
        /// Account email
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },

    /// Force a token refresh round trip
    Refresh,

    /// Sign out and clear the stored session
    SignOut,

    /// Check API health
    Health,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("fs_session=debug,foodshare_api_client=debug,foodshare_auth=debug")
            .init();
    }

    let store_dir = cli.store_dir.as_deref();
    let result = match cli.command {
        Commands::Status => status::run(store_dir, &cli.format).await,

        Commands::SignIn { email, password } => {
            sign_in::run(&email, &password, store_dir, &cli.format).await
        }

        Commands::Refresh => refresh::run(store_dir, &cli.format).await,

        Commands::SignOut => sign_out::run(store_dir, &cli.format).await,

        Commands::Health => health::run(store_dir, &cli.format).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
