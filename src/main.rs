// kinsync - Bulk record sync for kintone
// Copyright (c) 2025 kinsync Contributors
// Licensed under the MIT License

use clap::Parser;
use kinsync::cli::commands::{EXIT_CONFIG, EXIT_FATAL};
use kinsync::cli::{Cli, Commands};
use kinsync::config::{load_config, LoggingConfig};
use kinsync::logging::init_logging;
use std::process;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    // This is optional - if .env doesn't exist, it's silently ignored
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // File logging follows the config file when it loads; otherwise console only
    let (config_level, logging_config) = match load_config(&cli.config) {
        Ok(config) => (Some(config.application.log_level), config.logging),
        Err(_) => (None, LoggingConfig::default()),
    };
    let log_level = cli
        .log_level
        .clone()
        .or(config_level)
        .unwrap_or_else(|| "info".to_string());

    let guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(EXIT_CONFIG);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "kinsync - Bulk record sync for kintone"
    );

    // Cancelling the root token stops every in-flight bulk operation
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => s,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create SIGTERM handler");
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT (Ctrl+C), cancelling operations...");
                    eprintln!("\n⚠️  Shutdown signal received, cancelling in-flight requests...");
                    signal_cancel.cancel();
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, cancelling operations...");
                    eprintln!("\n⚠️  Shutdown signal received, cancelling in-flight requests...");
                    signal_cancel.cancel();
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            } else {
                tracing::info!("Received SIGINT (Ctrl+C), cancelling operations...");
                eprintln!("\n⚠️  Shutdown signal received, cancelling in-flight requests...");
                signal_cancel.cancel();
            }
        }
    });

    let exit_code = match execute_command(&cli, &cancel).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            EXIT_FATAL
        }
    };

    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, cancel: &CancellationToken) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Read(args) => args.execute(&cli.config, cancel).await,
        Commands::Upsert(args) => args.execute(&cli.config, cancel).await,
        Commands::Delete(args) => args.execute(&cli.config, cancel).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
    }
}
