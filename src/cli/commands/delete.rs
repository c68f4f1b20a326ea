//! Delete command implementation
//!
//! This module implements the `delete` command, which deletes records by id
//! or every record matching a query.

use super::{open_repository, report_failure};
use crate::core::Repository;
use crate::domain::{AppId, KeySelector, Query, RecordId, Result};
use clap::Args;
use std::io::{self, Write};
use tokio_util::sync::CancellationToken;

/// Arguments for the delete command
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// App to delete from
    #[arg(long)]
    pub app: AppId,

    /// Record ids to delete (comma-separated)
    #[arg(
        long,
        value_delimiter = ',',
        required_unless_present = "query",
        conflicts_with = "query"
    )]
    pub ids: Vec<RecordId>,

    /// Delete every record matching this condition
    #[arg(short, long)]
    pub query: Option<String>,

    /// Skip confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

impl DeleteArgs {
    /// Execute the delete command
    pub async fn execute(
        &self,
        config_path: &str,
        cancel: &CancellationToken,
    ) -> anyhow::Result<i32> {
        tracing::info!(app_id = self.app.get(), "Starting delete command");

        let repository = match open_repository(config_path) {
            Ok(r) => r,
            Err(code) => return Ok(code),
        };

        let ids = match self.target_ids(&repository, cancel).await {
            Ok(ids) => ids,
            Err(e) => return Ok(report_failure("Delete", &e)),
        };

        if ids.is_empty() {
            println!("No records to delete.");
            return Ok(0);
        }

        if !self.yes {
            print!("Delete {} records from app {}? [y/N]: ", ids.len(), self.app);
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;

            if !input.trim().eq_ignore_ascii_case("y") {
                println!("Delete cancelled.");
                return Ok(0);
            }
        }

        match repository.delete_many(cancel, self.app, &ids).await {
            Ok(deleted) => {
                println!("🗑️  Deleted {deleted} records from app {}", self.app);
                Ok(0)
            }
            Err(e) => Ok(report_failure("Delete", &e)),
        }
    }

    /// Ids given on the command line, or those of the records matching the query
    async fn target_ids(
        &self,
        repository: &Repository,
        cancel: &CancellationToken,
    ) -> Result<Vec<RecordId>> {
        let Some(condition) = &self.query else {
            return Ok(self.ids.clone());
        };

        let query = Query::new(self.app)
            .condition(condition.clone())
            .fields([KeySelector::ID_FIELD]);
        let records = repository.read_all_via_cursor(cancel, &query).await?;
        Ok(records.into_iter().filter_map(|record| record.id).collect())
    }
}
