//! Partitioned key-value storage for Noted.
//!
//! Every durable byte Noted keeps on the client side lives in a
//! [`KvStore`] partition: log pages under `log:<n>` keys and content blobs
//! under their version ids. A [`KvDatabase`] groups the named partitions a
//! backend needs ("content" + "logs" locally, "content-cache" +
//! "logs-cache" for the remote mirror).
//!
//! # Storage Backends
//!
//! - [`InMemoryKv`] -- `BTreeMap`-based store for tests and embedding
//! - [`FsKv`] -- one file per key, written atomically and CRC-checked on read
//!
//! # Design Rules
//!
//! 1. `add` never overwrites: it fails with [`KvError::AlreadyExists`].
//! 2. `keys` returns keys in byte order; callers impose any other ordering.
//! 3. The store never interprets values.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod database;
pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use database::KvDatabase;
pub use error::{KvError, KvResult};
pub use fs::FsKv;
pub use memory::InMemoryKv;
pub use traits::KvStore;
