//! kintone REST adapter
//!
//! - [`transport`] - the [`Transport`] seam and endpoint list
//! - [`client`] - reqwest implementation
//! - [`models`] - request and response bodies

pub mod client;
pub mod models;
pub mod transport;

pub use client::KintoneClient;
pub use transport::{Endpoint, Transport};
