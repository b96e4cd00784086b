use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use noted_kv::{InMemoryKv, KvDatabase, KvError, KvStore};
use noted_log::{read_pages, write_pages, NoteIndex, ReplayEngine};
use noted_types::{LogEntry, VersionId};
use tracing::{debug, info, warn};

use crate::backend::NoteBackend;
use crate::config::StoreMode;
use crate::content::ContentStore;
use crate::endpoint::RemoteEndpoint;
use crate::error::{StoreError, StoreResult};

pub const CONTENT_CACHE_PARTITION: &str = "content-cache";
pub const LOGS_CACHE_PARTITION: &str = "logs-cache";

/// Maximum content fetches in flight during reconciliation.
pub const FETCH_CONCURRENCY: usize = 8;

/// Outcome of reconciling the content cache against the index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Cached blobs no live note references any more.
    pub evicted: Vec<VersionId>,
    /// Referenced blobs fetched from the remote into the cache.
    pub fetched: Vec<VersionId>,
    /// Referenced blobs the remote does not have.
    pub missing: Vec<VersionId>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.evicted.is_empty() && self.fetched.is_empty() && self.missing.is_empty()
    }
}

/// Note log mirrored from a [`RemoteEndpoint`].
///
/// The remote is the authority. Log pages and content blobs are cached
/// locally so a cold start only fetches entries the cache has not seen.
pub struct RemoteLogStore {
    endpoint: Arc<dyn RemoteEndpoint>,
    content_cache: ContentStore,
    logs_cache: Arc<dyn KvStore>,
    index: Option<NoteIndex>,
    log_len: usize,
    last_reconcile: Option<ReconcileReport>,
}

impl RemoteLogStore {
    /// Use the "content-cache" and "logs-cache" partitions of `db`.
    pub fn new(endpoint: Arc<dyn RemoteEndpoint>, db: &KvDatabase) -> StoreResult<Self> {
        Ok(Self::from_partitions(
            endpoint,
            db.partition(CONTENT_CACHE_PARTITION)?,
            db.partition(LOGS_CACHE_PARTITION)?,
        ))
    }

    pub fn from_partitions(
        endpoint: Arc<dyn RemoteEndpoint>,
        content_cache: Arc<dyn KvStore>,
        logs_cache: Arc<dyn KvStore>,
    ) -> Self {
        Self {
            endpoint,
            content_cache: ContentStore::new(content_cache),
            logs_cache,
            index: None,
            log_len: 0,
            last_reconcile: None,
        }
    }

    /// Mirror with throwaway in-memory caches.
    pub fn in_memory(endpoint: Arc<dyn RemoteEndpoint>) -> Self {
        Self::from_partitions(endpoint, Arc::new(InMemoryKv::new()), Arc::new(InMemoryKv::new()))
    }

    /// Open the file-backed cache database under `data_dir`.
    pub async fn open(endpoint: Arc<dyn RemoteEndpoint>, data_dir: &Path) -> StoreResult<Self> {
        let db = KvDatabase::open_dir(
            data_dir,
            StoreMode::Remote.database_name(),
            &[CONTENT_CACHE_PARTITION, LOGS_CACHE_PARTITION],
        )
        .await?;
        Self::new(endpoint, &db)
    }

    pub fn content_cache(&self) -> &ContentStore {
        &self.content_cache
    }

    /// Entries known to this mirror: cached, fetched, and appended.
    pub fn log_len(&self) -> usize {
        self.log_len
    }

    /// Report from the reconciliation that followed the last full load.
    pub fn last_reconcile(&self) -> Option<&ReconcileReport> {
        self.last_reconcile.as_ref()
    }

    /// Reconcile the content cache against the current index, loading it
    /// first if needed.
    pub async fn reconcile(&mut self) -> StoreResult<ReconcileReport> {
        let referenced = self.loaded().await?.referenced_versions();
        let report = self.reconcile_cache(&referenced).await?;
        self.last_reconcile = Some(report.clone());
        Ok(report)
    }

    async fn loaded(&mut self) -> StoreResult<&mut NoteIndex> {
        let index = match self.index.take() {
            Some(index) => index,
            None => self.bootstrap().await?,
        };
        Ok(self.index.insert(index))
    }

    /// Cached prefix plus fetched suffix, replayed in order.
    async fn bootstrap(&mut self) -> StoreResult<NoteIndex> {
        let started = Instant::now();
        let mut entries: Vec<LogEntry> = read_pages(self.logs_cache.as_ref())
            .await?
            .into_iter()
            .flat_map(|(_, page)| page)
            .collect();
        let cached = entries.len();

        let fetched = self.endpoint.get_logs(cached).await?;
        let fetched_len = fetched.len();
        if !fetched.is_empty() {
            entries.extend(fetched);
            write_pages(self.logs_cache.as_ref(), &entries).await?;
        }

        let result = ReplayEngine::replay(&entries);
        self.log_len = entries.len();
        debug!(
            cached,
            fetched = fetched_len,
            applied = result.applied,
            skipped = result.skipped,
            notes = result.index.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "remote log loaded"
        );

        let report = self.reconcile_cache(&result.index.referenced_versions()).await?;
        self.last_reconcile = Some(report);
        Ok(result.index)
    }

    /// Evict cached blobs nothing references and fetch referenced blobs the
    /// cache lacks.
    async fn reconcile_cache(&self, referenced: &BTreeSet<VersionId>) -> StoreResult<ReconcileReport> {
        let cached: BTreeSet<VersionId> = self.content_cache.ids().await?.into_iter().collect();
        let mut report = ReconcileReport::default();

        for stale in cached.difference(referenced) {
            self.content_cache.delete(stale).await?;
            report.evicted.push(stale.clone());
        }

        let wanted: Vec<&VersionId> = referenced.difference(&cached).collect();
        let endpoint = self.endpoint.as_ref();
        let fetches: Vec<_> = wanted.iter().map(|version| endpoint.get_content(version)).collect();
        let blobs: Vec<Option<Bytes>> = stream::iter(fetches)
            .buffered(FETCH_CONCURRENCY)
            .try_collect()
            .await?;
        for (version, blob) in wanted.into_iter().zip(blobs) {
            match blob {
                Some(content) => {
                    self.content_cache.put(version, content).await?;
                    report.fetched.push(version.clone());
                }
                None => {
                    warn!(version = %version, "referenced content missing on remote");
                    report.missing.push(version.clone());
                }
            }
        }

        info!(
            evicted = report.evicted.len(),
            fetched = report.fetched.len(),
            missing = report.missing.len(),
            "content cache reconciled"
        );
        Ok(report)
    }
}

#[async_trait]
impl NoteBackend for RemoteLogStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Remote
    }

    fn index(&self) -> Option<&NoteIndex> {
        self.index.as_ref()
    }

    async fn load(&mut self) -> StoreResult<&NoteIndex> {
        Ok(&*self.loaded().await?)
    }

    async fn append(&mut self, entry: LogEntry) -> StoreResult<()> {
        let endpoint = Arc::clone(&self.endpoint);
        let index = self.loaded().await?;
        endpoint.append_log(&entry).await?;
        let applied = ReplayEngine::apply(index, &entry);
        self.log_len += 1;
        debug!(op = entry.op_code().name(), note = %entry.note, ?applied, "entry accepted by remote");
        Ok(())
    }

    async fn append_content(
        &mut self,
        version: &VersionId,
        content: Bytes,
        entry: LogEntry,
    ) -> StoreResult<()> {
        self.endpoint.set_content(version, content.clone()).await?;
        self.append(entry).await?;
        if let Err(e) = self.content_cache.put(version, content).await {
            warn!(version = %version, error = %e, "failed to cache uploaded content");
        }
        Ok(())
    }

    async fn content(&self, version: &VersionId) -> StoreResult<Option<Bytes>> {
        match self.content_cache.get(version).await {
            Ok(Some(content)) => return Ok(Some(content)),
            Ok(None) => {}
            Err(StoreError::Kv(e @ KvError::Corrupt { .. })) => {
                warn!(version = %version, error = %e, "evicting corrupt cached content");
                self.content_cache.delete(version).await?;
            }
            Err(e) => return Err(e),
        }
        let Some(content) = self.endpoint.get_content(version).await? else {
            return Ok(None);
        };
        if let Err(e) = self.content_cache.put(version, content.clone()).await {
            warn!(version = %version, error = %e, "failed to cache fetched content");
        }
        Ok(Some(content))
    }

    async fn clear_cache(&mut self) -> StoreResult<()> {
        self.logs_cache.clear().await?;
        self.content_cache.clear().await?;
        self.index = None;
        self.log_len = 0;
        self.last_reconcile = None;
        info!("remote caches cleared");
        Ok(())
    }
}
