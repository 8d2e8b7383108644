//! crosspost-server - HTTP server for the crosspost publishing pipeline
//!
//! Serves the cron batch trigger, the manual publish endpoint, and a
//! health probe on top of the shared publishing pipeline.

mod app;
mod error;
mod routes;

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use libcrosspost::logging::{LogFormat, LoggingConfig};
use libcrosspost::{Config, Result};

use crate::app::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "crosspost-server")]
#[command(version)]
#[command(about = "HTTP server for the crosspost publishing pipeline")]
#[command(long_about = "\
crosspost-server - HTTP server for the crosspost publishing pipeline

DESCRIPTION:
    Serves three endpoints on top of the shared publishing pipeline:

    GET|POST /cron/publish   Batch dispatch of due and retryable posts,
                             guarded by the shared cron secret.
    POST     /publish        Publish a single post on behalf of an
                             authenticated session.
    GET      /health         Liveness probe (database connectivity).

USAGE:
    # Run with the default config location
    crosspost-server

    # Run against an explicit config file
    crosspost-server --config /etc/crosspost/config.toml

    # Override the bind address
    crosspost-server --bind 0.0.0.0:8080

CONFIGURATION:
    Configuration file: ~/.config/crosspost/config.toml
    (override with CROSSPOST_CONFIG)

    [server]
    bind = \"127.0.0.1:8080\"
    cron_secret = \"...\"     # required for /cron/publish

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime error
    2 - Configuration error
")]
struct Cli {
    /// Path to the config file (overrides CROSSPOST_CONFIG)
    #[arg(long, value_name = "FILE", env = "CROSSPOST_CONFIG")]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Log format: text, json, or pretty
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    LoggingConfig::new(cli.log_format, "info".to_string(), cli.verbose).init();

    let config = load_config(&cli)?;
    let bind = cli.bind.unwrap_or_else(|| config.server.bind.clone());

    let state = AppState::from_config(&config).await?;
    let router = build_router(state);

    info!(%bind, "crosspost-server starting");
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("crosspost-server stopped");
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    match &cli.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
