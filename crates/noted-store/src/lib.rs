//! Note store for Noted.
//!
//! A [`NoteStore`] owns exactly one backend and exposes note-level
//! operations on top of it. Backends persist the append-only note log and
//! the content blobs it references:
//!
//! - [`LocalLogStore`] -- durable, single-writer store on a local
//!   [`KvDatabase`](noted_kv::KvDatabase) ("content" + "logs")
//! - [`RemoteLogStore`] -- mirror of a [`RemoteEndpoint`] with a local page
//!   cache and content cache ("content-cache" + "logs-cache")
//!
//! Both follow the same append contract: an entry is applied to the
//! in-memory index only after it has been persisted (local) or accepted by
//! the remote (remote).

pub mod backend;
pub mod config;
pub mod content;
pub mod endpoint;
pub mod error;
pub mod facade;
pub mod http;
pub mod local;
pub mod lookup;
pub mod remote;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::NoteBackend;
pub use config::{RemoteConfig, StoreConfig, StoreMode};
pub use content::ContentStore;
pub use endpoint::{RemoteEndpoint, RemoteError, RemoteResult};
pub use error::{StoreError, StoreResult};
pub use facade::NoteStore;
pub use http::HttpEndpoint;
pub use local::LocalLogStore;
pub use lookup::{encode_title, parse_encoded_title};
pub use remote::{ReconcileReport, RemoteLogStore};
