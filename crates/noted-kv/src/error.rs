use std::io;

/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    /// `add` was called for a key that already holds a value.
    #[error("key already exists: {0}")]
    AlreadyExists(String),

    /// A stored value failed its integrity check.
    #[error("corrupt value for key {key}: {reason}")]
    Corrupt { key: String, reason: String },

    /// The database was asked for a partition it was not opened with.
    #[error("unknown partition: {0}")]
    UnknownPartition(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A lock guarding in-memory state was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    Poisoned(String),

    /// A blocking storage task failed to complete.
    #[error("storage task failed: {0}")]
    Task(String),
}

impl KvError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists(_))
    }
}

/// Result alias for key-value operations.
pub type KvResult<T> = Result<T, KvError>;
