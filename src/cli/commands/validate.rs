//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the kinsync configuration file.

use super::EXIT_CONFIG;
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded successfully");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        match config.validate() {
            Ok(_) => {
                println!("✅ Configuration is valid");
                println!();
                println!("Configuration Summary:");
                println!("  Log Level: {}", config.application.log_level);
                println!("  kintone Endpoint: {}", config.kintone.endpoint_base());
                println!("  Username: {}", config.kintone.username);
                println!(
                    "  Basic Auth: {}",
                    if config.kintone.basic_auth_user.is_some() {
                        "enabled"
                    } else {
                        "disabled"
                    }
                );
                println!("  Timeout: {}s", config.kintone.timeout_seconds);
                println!("  Max Concurrent Requests: {}", config.bulk.max_concurrent);
                println!(
                    "  Retries: {} every {}ms (on {})",
                    config.bulk.max_retries, config.bulk.retry_interval_ms, config.bulk.retry_on
                );
                println!("  Write Chunk Size: {}", config.bulk.write_chunk_size);
                println!("  Read Page Size: {}", config.bulk.read_page_size);
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                println!();
                Ok(EXIT_CONFIG)
            }
        }
    }
}
