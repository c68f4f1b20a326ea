//! Read command implementation
//!
//! This module implements the `read` command, which reads every record
//! matching a query and writes them as a JSON array of typed records.

use super::{open_repository, report_failure};
use crate::domain::{AppId, Query, Record};
use clap::Args;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

/// Arguments for the read command
#[derive(Args, Debug)]
pub struct ReadArgs {
    /// App to read from
    #[arg(long)]
    pub app: AppId,

    /// Query condition, e.g. `status = "open"`
    #[arg(short, long)]
    pub query: Option<String>,

    /// Order clause, e.g. `$id asc`
    #[arg(long)]
    pub order_by: Option<String>,

    /// Field codes to return (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Read through a server-side cursor instead of offset pages
    #[arg(long)]
    pub cursor: bool,

    /// Write records to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ReadArgs {
    /// Build the query described by the arguments
    pub fn query(&self) -> Query {
        let mut query = Query::new(self.app).fields(self.fields.iter().cloned());
        if let Some(condition) = &self.query {
            query = query.condition(condition.clone());
        }
        if let Some(order_by) = &self.order_by {
            query = query.order_by(order_by.clone());
        }
        query
    }

    /// Execute the read command
    pub async fn execute(
        &self,
        config_path: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<i32> {
        tracing::info!(app_id = self.app.get(), cursor = self.cursor, "Starting read command");

        let repository = match open_repository(config_path) {
            Ok(r) => r,
            Err(code) => return Ok(code),
        };

        let query = self.query();
        let result = if self.cursor {
            repository.read_all_via_cursor(cancel, &query).await
        } else {
            repository.read_all(cancel, &query).await
        };

        let records = match result {
            Ok(records) => records,
            Err(e) => return Ok(report_failure("Read", &e)),
        };

        match &self.output {
            Some(path) => {
                write_records(BufWriter::new(File::create(path)?), &records)?;
                println!("📄 Read {} records into {}", records.len(), path.display());
            }
            None => write_records(io::stdout().lock(), &records)?,
        }

        Ok(0)
    }
}

fn write_records<W: Write>(mut writer: W, records: &[Record]) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
