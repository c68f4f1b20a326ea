//! External system integrations for kinsync.
//!
//! - [`kintone`] - kintone REST API transport and wire models
//!
//! The bulk engine only sees the [`kintone::Transport`] trait, so tests run it
//! against an in-memory store instead of HTTP.
//!
//! ```rust,no_run
//! use kinsync::adapters::kintone::KintoneClient;
//! use kinsync::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("kinsync.toml")?;
//! let client = KintoneClient::new(&config.kintone)?;
//! # Ok(())
//! # }
//! ```

pub mod kintone;
