//! Offset-paged reads
//!
//! A count-only query sizes the result, then every page is fetched
//! concurrently through the repository gate. Pages are collected by a single
//! loop as they complete, so the result order follows completion order rather
//! than the store's order.

use crate::core::bulk::BatchExecutor;
use crate::domain::{Query, Record, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::num::NonZeroU32;
use tokio_util::sync::CancellationToken;

/// The store refuses offsets beyond this
pub const MAX_OFFSET: u64 = 10_000;

/// Reads every record matching a query with concurrent offset pages
#[derive(Clone)]
pub struct PageReader {
    executor: BatchExecutor,
    page_size: NonZeroU32,
}

impl PageReader {
    pub fn new(executor: BatchExecutor, page_size: NonZeroU32) -> Self {
        Self {
            executor,
            page_size,
        }
    }

    /// Offsets of every page needed to cover `total` records
    pub fn page_offsets(&self, total: u64) -> Vec<u64> {
        (0..total)
            .step_by(self.page_size.get() as usize)
            .collect()
    }

    /// Reads all records matching `query`.
    ///
    /// The first failing page cancels the others and its error is returned.
    pub async fn read_all(&self, cancel: &CancellationToken, query: &Query) -> Result<Vec<Record>> {
        let total = self.executor.fetch_total_count(cancel, query).await?;
        if total == 0 {
            return Ok(Vec::new());
        }
        if total > MAX_OFFSET {
            tracing::warn!(
                app_id = query.app().get(),
                total,
                max_offset = MAX_OFFSET,
                "Result exceeds the offset limit, pages past it will fail; use a cursor read"
            );
        }

        let offsets = self.page_offsets(total);
        tracing::debug!(
            app_id = query.app().get(),
            total,
            pages = offsets.len(),
            "Reading pages"
        );

        let scope = cancel.child_token();
        let _cancel_on_exit = scope.clone().drop_guard();
        let scope = &scope;
        let limit = self.page_size.get();

        let mut pending: FuturesUnordered<_> = offsets
            .into_iter()
            .map(|offset| {
                let page = query.with_page(offset, limit);
                async move {
                    let records = self.executor.fetch_page(scope, &page).await;
                    (offset, records)
                }
            })
            .collect();

        let mut records = Vec::with_capacity(total.min(MAX_OFFSET) as usize);
        while let Some((offset, page)) = pending.next().await {
            match page {
                Ok(page) => {
                    tracing::debug!(offset, records = page.len(), "Page received");
                    records.extend(page);
                }
                Err(err) => {
                    tracing::debug!(offset, error = %err, "Page failed");
                    return Err(err);
                }
            }
        }

        Ok(records)
    }
}
