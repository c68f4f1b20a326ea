//! Bulk reads
//!
//! - [`paged`] - concurrent offset pages sized by a count query
//! - [`cursor`] - sequential drain of a server-side cursor

pub mod cursor;
pub mod paged;

pub use cursor::CursorReader;
pub use paged::{PageReader, MAX_OFFSET};
