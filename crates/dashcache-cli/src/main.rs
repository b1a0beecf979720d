//! dashcache - browse dashboard users and products from the terminal.
//!
//! A thin front end over `dashcache-core`: every subcommand builds the
//! `Dashboard`, drives one of its stores and prints the snapshot.

mod cli;
mod commands;

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dashcache_core::{Config, Dashboard};

use cli::{Cli, Command};

/// Log file name prefix inside `log_dir`
const LOG_FILE_PREFIX: &str = "dashcache.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr, and additionally to a daily rolling file when the config
/// names a `log_dir`. The returned guard must live until exit so the file
/// writer flushes.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    let _guard = init_tracing(&config);
    info!("dashcache starting");

    let dashboard = Dashboard::new(&config)?;

    match cli.command {
        Command::Login(args) => commands::login(&dashboard, &mut config, args).await,
        Command::Logout => {
            commands::logout(&dashboard);
            Ok(())
        }
        Command::Whoami => {
            commands::whoami(&dashboard);
            Ok(())
        }
        Command::Stats => commands::stats(&dashboard).await,
        Command::Users(args) => commands::users(&dashboard, args).await,
        Command::User { id } => commands::user(&dashboard, id).await,
        Command::Products(args) => commands::products(&dashboard, args).await,
        Command::Product { id } => commands::product(&dashboard, id).await,
        Command::Categories => commands::categories(&dashboard).await,
    }
}
