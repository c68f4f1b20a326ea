//! Upsert command implementation
//!
//! This module implements the `upsert` command, which creates or updates the
//! records of a JSON file keyed by record id or by a unique field.

use super::{open_repository, report_failure, EXIT_CONFIG};
use crate::domain::{AppId, KeySelector, Record};
use anyhow::Context;
use clap::Args;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Arguments for the upsert command
#[derive(Args, Debug)]
pub struct UpsertArgs {
    /// App to write to
    #[arg(long)]
    pub app: AppId,

    /// Unique field code used as the key (defaults to the record id)
    #[arg(short, long)]
    pub key: Option<String>,

    /// JSON file holding an array of typed records
    #[arg(short, long)]
    pub input: PathBuf,
}

impl UpsertArgs {
    pub fn key_selector(&self) -> KeySelector {
        KeySelector::from(self.key.as_deref())
    }

    /// Execute the upsert command
    pub async fn execute(
        &self,
        config_path: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<i32> {
        let key = self.key_selector();
        tracing::info!(
            app_id = self.app.get(),
            key = %key,
            input = %self.input.display(),
            "Starting upsert command"
        );

        let records = match load_records(&self.input) {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read input records");
                eprintln!("Failed to read input records: {e:#}");
                return Ok(EXIT_CONFIG);
            }
        };

        let repository = match open_repository(config_path) {
            Ok(r) => r,
            Err(code) => return Ok(code),
        };

        println!("🚀 Upserting {} records into app {}...", records.len(), self.app);

        let summary = match repository.upsert_many(cancel, self.app, &key, &records).await {
            Ok(summary) => summary,
            Err(e) => return Ok(report_failure("Upsert", &e)),
        };

        println!();
        println!("📊 Upsert Summary:");
        println!("  Created: {}", summary.created.len());
        println!("  Updated: {}", summary.updated);
        println!();

        Ok(0)
    }
}

/// Reads a JSON array of typed records
pub fn load_records(path: &Path) -> anyhow::Result<Vec<Record>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let records = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("{} is not a JSON array of records", path.display()))?;
    Ok(records)
}
