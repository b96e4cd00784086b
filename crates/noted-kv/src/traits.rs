use async_trait::async_trait;
use bytes::Bytes;

use crate::error::KvResult;

/// One named partition of a durable key-value database.
///
/// All implementations must satisfy these invariants:
/// - `set` replaces any existing value; `add` refuses to.
/// - A value read back is byte-identical to the value written.
/// - Operations on distinct keys are independent; there are no transactions.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    async fn get(&self, key: &str) -> KvResult<Option<Bytes>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Bytes) -> KvResult<()>;

    /// Store `value` under `key` only if the key is absent.
    ///
    /// Fails with [`KvError::AlreadyExists`](crate::KvError::AlreadyExists)
    /// otherwise.
    async fn add(&self, key: &str, value: Bytes) -> KvResult<()>;

    /// Delete `key`. Returns `true` if it existed.
    async fn delete(&self, key: &str) -> KvResult<bool>;

    /// Remove every key in the partition.
    async fn clear(&self) -> KvResult<()>;

    /// All keys, in byte order.
    async fn keys(&self) -> KvResult<Vec<String>>;

    /// Check whether `key` holds a value.
    async fn contains(&self, key: &str) -> KvResult<bool> {
        Ok(self.get(key).await?.is_some())
    }
}
