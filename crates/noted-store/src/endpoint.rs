use async_trait::async_trait;
use bytes::Bytes;
use noted_types::{LogEntry, VersionId};

/// Errors talking to the remote authority.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{method} {path} returned HTTP {status}: {body}")]
    Status {
        method: &'static str,
        path: &'static str,
        status: u16,
        body: String,
    },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("append rejected by remote")]
    Rejected,

    #[error("invalid endpoint configuration: {0}")]
    Config(String),
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// The remote log authority.
///
/// The remote keeps one ordered log and one blob store. Log offsets are
/// positions in that single sequence, so `get_logs(n)` returns every entry
/// appended after the first `n`.
#[async_trait]
pub trait RemoteEndpoint: Send + Sync {
    /// Entries at offset `start` and later.
    async fn get_logs(&self, start: usize) -> RemoteResult<Vec<LogEntry>>;

    /// Append one entry to the remote log.
    async fn append_log(&self, entry: &LogEntry) -> RemoteResult<()>;

    /// Fetch a content blob. `None` if the remote has no such version.
    async fn get_content(&self, version: &VersionId) -> RemoteResult<Option<Bytes>>;

    /// Upload a content blob.
    async fn set_content(&self, version: &VersionId, content: Bytes) -> RemoteResult<()>;
}
