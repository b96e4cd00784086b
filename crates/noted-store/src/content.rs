use std::sync::Arc;

use bytes::Bytes;
use noted_kv::KvStore;
use noted_types::VersionId;
use tracing::{debug, warn};

use crate::error::StoreResult;

/// Content blobs keyed by version id.
///
/// Blobs are immutable: writing an id that already exists keeps the stored
/// bytes and is not an error.
#[derive(Clone)]
pub struct ContentStore {
    kv: Arc<dyn KvStore>,
}

impl ContentStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub async fn put(&self, version: &VersionId, content: Bytes) -> StoreResult<()> {
        match self.kv.add(version.as_str(), content).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_already_exists() => {
                debug!(version = %version, "content already stored");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, version: &VersionId) -> StoreResult<Option<Bytes>> {
        Ok(self.kv.get(version.as_str()).await?)
    }

    pub async fn contains(&self, version: &VersionId) -> StoreResult<bool> {
        Ok(self.kv.contains(version.as_str()).await?)
    }

    pub async fn delete(&self, version: &VersionId) -> StoreResult<bool> {
        Ok(self.kv.delete(version.as_str()).await?)
    }

    /// Every stored version id, in byte order.
    pub async fn ids(&self) -> StoreResult<Vec<VersionId>> {
        let keys = self.kv.keys().await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| match VersionId::parse(key.as_str()) {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(key = %key, "ignoring invalid content key");
                    None
                }
            })
            .collect())
    }

    pub async fn clear(&self) -> StoreResult<()> {
        Ok(self.kv.clear().await?)
    }
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore").finish_non_exhaustive()
    }
}
