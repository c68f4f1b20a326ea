//! Cursor reads
//!
//! A server-side cursor is opened for the query and drained one page at a
//! time until the store reports no further pages. Draining is sequential;
//! each page call still takes a permit from the repository gate.

use crate::adapters::kintone::models::{
    CreateCursorRequest, CreateCursorResponse, CursorIdRequest, CursorPageResponse,
};
use crate::adapters::kintone::Endpoint;
use crate::core::bulk::executor::decode;
use crate::core::bulk::{BatchExecutor, Method};
use crate::domain::{Query, Record, Result};
use std::num::NonZeroU32;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Upper bound on the cleanup call made after a failed drain
const CLOSE_TIMEOUT: Duration = Duration::from_secs(30);

/// Reads every record matching a query through a server-side cursor
#[derive(Clone)]
pub struct CursorReader {
    executor: BatchExecutor,
    page_size: NonZeroU32,
}

impl CursorReader {
    pub fn new(executor: BatchExecutor, page_size: NonZeroU32) -> Self {
        Self {
            executor,
            page_size,
        }
    }

    /// Opens a cursor for `query` and drains it. Pages are appended in the
    /// order the store returns them.
    pub async fn read_all(&self, cancel: &CancellationToken, query: &Query) -> Result<Vec<Record>> {
        let cursor = self.open(cancel, query).await?;
        tracing::debug!(
            app_id = query.app().get(),
            cursor_id = %cursor.id,
            total = cursor.total_count,
            "Cursor opened"
        );

        match self.drain(cancel, &cursor).await {
            Ok(records) => Ok(records),
            Err(err) => {
                self.close(&cursor.id).await;
                Err(err)
            }
        }
    }

    async fn open(
        &self,
        cancel: &CancellationToken,
        query: &Query,
    ) -> Result<CreateCursorResponse> {
        let request = CreateCursorRequest {
            app: query.app().get(),
            fields: query.field_list(),
            query: query.query_string(),
            size: self.page_size.get(),
        };
        let body = serde_json::to_value(&request)?;
        let response = self
            .executor
            .call(cancel, Method::Post, Endpoint::RecordsCursor, &body)
            .await?;
        decode(&response)
    }

    async fn drain(
        &self,
        cancel: &CancellationToken,
        cursor: &CreateCursorResponse,
    ) -> Result<Vec<Record>> {
        let body = serde_json::to_value(CursorIdRequest { id: &cursor.id })?;
        // totalCount is only a hint from the store; reserve at most one page
        let hint = cursor
            .total_count
            .unwrap_or(0)
            .min(u64::from(self.page_size.get()));
        let mut records = Vec::with_capacity(hint as usize);

        let mut page_number = 0u32;
        loop {
            let response = self
                .executor
                .call(cancel, Method::Get, Endpoint::RecordsCursor, &body)
                .await?;
            let page: CursorPageResponse = decode(&response)?;
            page_number += 1;
            tracing::debug!(
                cursor_id = %cursor.id,
                page = page_number,
                records = page.records.len(),
                next = page.next,
                "Cursor page received"
            );

            records.extend(page.records);
            if !page.next {
                return Ok(records);
            }
        }
    }

    /// Deletes an abandoned cursor. Failures are logged and otherwise ignored.
    async fn close(&self, cursor_id: &str) {
        let body = match serde_json::to_value(CursorIdRequest { id: cursor_id }) {
            Ok(body) => body,
            Err(_) => return,
        };

        let cleanup = CancellationToken::new();
        let delete = self
            .executor
            .call(&cleanup, Method::Delete, Endpoint::RecordsCursor, &body);

        match tokio::time::timeout(CLOSE_TIMEOUT, delete).await {
            Ok(Ok(_)) => tracing::debug!(cursor_id, "Abandoned cursor deleted"),
            Ok(Err(err)) => {
                tracing::warn!(cursor_id, error = %err, "Failed to delete abandoned cursor")
            }
            Err(_) => tracing::warn!(cursor_id, "Timed out deleting abandoned cursor"),
        }
    }
}
