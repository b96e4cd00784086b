//! Append-only note log for Noted.
//!
//! This crate is the pure core of the store. It provides:
//! - [`NoteIndex`] -- flat, replay-derived note records plus an id→offset map
//! - [`ReplayEngine`] -- deterministic fold of log entries into an index
//! - Page chunking -- grouping of entries into 1024-entry pages stored
//!   under numerically ordered `log:<n>` keys
//!
//! Nothing here performs I/O except the page helpers that read and write a
//! [`KvStore`](noted_kv::KvStore) partition.

pub mod error;
pub mod index;
pub mod page;
pub mod replay;

pub use error::{LogError, LogResult};
pub use index::{NoteIndex, NoteRecord};
pub use page::{
    chunk, decode_page, encode_page, read_pages, sort_page_keys, write_pages, PageCursor,
    PageKey, PAGE_CAPACITY,
};
pub use replay::{Applied, ReplayEngine, ReplayResult, SkipReason};
