// kinsync - Bulk record sync for kintone
// Copyright (c) 2025 kinsync Contributors
// Licensed under the MIT License

//! # kinsync - Bulk record sync for kintone
//!
//! kinsync moves large record sets in and out of kintone apps. The store caps
//! every call at 100 written or 500 read records; kinsync splits work into
//! calls of that size, runs them concurrently within a configured bound, and
//! retries failed calls.
//!
//! ## Overview
//!
//! This library provides:
//! - **Bulk writes**: add, update and delete any number of records
//! - **Bulk reads**: concurrent offset pages or a server-side cursor
//! - **Upsert**: create-or-update keyed by record id or a unique field
//! - **Cancellation**: every operation stops promptly when its token is cancelled
//!
//! ## Architecture
//!
//! kinsync follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Bulk engine (chunking, gate, retry, readers, upsert)
//! - [`adapters`] - The kintone REST transport
//! - [`domain`] - Records, field values, queries and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kinsync::config::load_config;
//! use kinsync::core::Repository;
//! use kinsync::domain::{AppId, FieldValue, Record};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("kinsync.toml")?;
//!     let repository = Repository::from_config(&config)?;
//!
//!     let records: Vec<Record> = (0..250)
//!         .map(|n| Record::new().field("qty", FieldValue::number(n as f64)))
//!         .collect();
//!
//!     // Three calls of 100, 100 and 50 records
//!     let cancel = CancellationToken::new();
//!     let ids = repository.add_many(&cancel, AppId::new(12)?, &records).await?;
//!
//!     println!("Added {} records", ids.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Concurrency
//!
//! A [`core::Repository`] owns one concurrency gate. Every call it makes,
//! from any operation, takes a permit first, so `bulk.max_concurrent`
//! bounds the requests in flight against the store.
//!
//! ## Error Handling
//!
//! kinsync uses the [`domain::SyncError`] type for all errors:
//!
//! ```rust,no_run
//! use kinsync::domain::SyncError;
//!
//! fn example() -> Result<(), SyncError> {
//!     // Errors are automatically converted using the ? operator
//!     let config = kinsync::config::load_config("kinsync.toml")?;
//!     config.validate().map_err(SyncError::Configuration)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Logging
//!
//! kinsync uses structured logging with the `tracing` crate. Each bulk
//! operation runs in its own span carrying an `operation_id`.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
