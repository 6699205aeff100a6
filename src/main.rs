//! viewpump - scriptable embedded web view.
//!
//! Main entry point for the viewpump CLI.

mod cli;
mod cmd_config;
mod cmd_load;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use viewpump_config::{ConfigLoader, LoggingConfig};

use cli::{Cli, Commands};
use cmd_config::handle_config_command;
use cmd_load::handle_load_command;

/// Get the viewpump home directory (~/.viewpump).
fn viewpump_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".viewpump"))
        .unwrap_or_else(|| PathBuf::from(".viewpump"))
}

/// Initialize tracing with console output and a daily rolling log file.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<()> {
    let log_dir = match &logging.dir {
        Some(dir) => PathBuf::from(ConfigLoader::expand_path(dir)),
        None => viewpump_dir().join("logs"),
    };
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("viewpump")
        .filename_suffix("log")
        .max_log_files(14)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keeps the background writer alive for the program duration
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    // Console output goes to stderr so stdout stays clean for extracted content
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(ConfigLoader::default_path);
    let config = ConfigLoader::load_or_default(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    init_tracing(&config.logging)?;

    match cli.command {
        Commands::Load(args) => handle_load_command(args, config).await,
        Commands::Config { action } => handle_config_command(action, &config_path, &config),
    }
}
