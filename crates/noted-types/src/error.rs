use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("unknown log op code: {0}")]
    UnknownOp(u64),

    #[error("malformed log entry: {0}")]
    MalformedEntry(String),

    #[error("invalid note id: {0:?}")]
    InvalidNoteId(String),

    #[error("invalid version id: {0:?}")]
    InvalidVersionId(String),
}
