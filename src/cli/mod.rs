//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for kinsync using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// kinsync - Bulk record sync for kintone
#[derive(Parser, Debug)]
#[command(name = "kinsync")]
#[command(version, about, long_about = None)]
#[command(author = "kinsync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "kinsync.toml", env = "KINSYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "KINSYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read every record matching a query as JSON
    Read(commands::read::ReadArgs),

    /// Create or update records from a JSON file
    Upsert(commands::upsert::UpsertArgs),

    /// Delete records by id or by query
    Delete(commands::delete::DeleteArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),
}
