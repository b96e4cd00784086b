use noted_kv::KvError;

/// Errors produced by log page operations.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("invalid page key: {0:?}")]
    InvalidPageKey(String),

    #[error("failed to decode page {key}: {reason}")]
    Decode { key: String, reason: String },

    #[error("failed to encode page: {0}")]
    Encode(String),

    #[error("storage error: {0}")]
    Kv(#[from] KvError),
}

/// Result alias for log operations.
pub type LogResult<T> = Result<T, LogError>;
