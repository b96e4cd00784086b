//! HTTP server for Noted.
//!
//! Hosts the single authoritative note log and its content blobs behind the
//! store API that remote-mode clients mirror:
//!
//! - `GET  /api/store/getLogs?start=<n>` -- entries from offset `n`
//! - `POST /api/store/appendLog` -- append one JSON log entry
//! - `GET  /api/store/getContent?id=<id>` -- raw content bytes
//! - `POST /api/store/setContent?id=<id>` -- store raw content bytes

pub mod config;
pub mod error;
pub mod handler;
pub mod log;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use log::ServerLog;
pub use server::NotedServer;
