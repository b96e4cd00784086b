use noted_kv::KvError;
use noted_log::LogError;
use noted_types::{NoteId, VersionId};

use crate::endpoint::RemoteError;

/// Errors surfaced by the note store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Kv(#[from] KvError),

    #[error("log error: {0}")]
    Log(#[from] LogError),

    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("note not found: {0}")]
    NoteNotFound(NoteId),

    #[error("content not found: {0}")]
    ContentMissing(VersionId),

    #[error("content {0} is not valid UTF-8")]
    InvalidUtf8(VersionId),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type StoreResult<T> = Result<T, StoreError>;
