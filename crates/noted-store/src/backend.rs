use async_trait::async_trait;
use bytes::Bytes;
use noted_log::NoteIndex;
use noted_types::{LogEntry, VersionId};

use crate::config::StoreMode;
use crate::error::StoreResult;

/// A persistence backend for the note log.
///
/// A backend owns the log, the content blobs, and the index replayed from
/// the log. Entries are applied to the index only after the backend has
/// made them durable.
#[async_trait]
pub trait NoteBackend: Send + Sync {
    fn mode(&self) -> StoreMode;

    /// The index, or `None` until the first successful [`load`](Self::load).
    fn index(&self) -> Option<&NoteIndex>;

    fn is_loaded(&self) -> bool {
        self.index().is_some()
    }

    /// Load and replay the log. Idempotent: once loaded, returns the cached
    /// index without touching storage.
    async fn load(&mut self) -> StoreResult<&NoteIndex>;

    /// Persist `entry`, then apply it to the index.
    async fn append(&mut self, entry: LogEntry) -> StoreResult<()>;

    /// Store `content` as `version`, then append `entry` (the matching
    /// content change).
    async fn append_content(
        &mut self,
        version: &VersionId,
        content: Bytes,
        entry: LogEntry,
    ) -> StoreResult<()>;

    /// Read a content blob.
    async fn content(&self, version: &VersionId) -> StoreResult<Option<Bytes>>;

    /// Drop any locally cached state. Backends without a cache do nothing.
    async fn clear_cache(&mut self) -> StoreResult<()> {
        Ok(())
    }
}
