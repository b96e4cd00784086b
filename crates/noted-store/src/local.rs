use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use noted_kv::{InMemoryKv, KvDatabase, KvStore};
use noted_log::{read_pages, NoteIndex, PageCursor, ReplayEngine};
use noted_types::{LogEntry, VersionId};
use tracing::debug;

use crate::backend::NoteBackend;
use crate::config::StoreMode;
use crate::content::ContentStore;
use crate::error::StoreResult;

pub const CONTENT_PARTITION: &str = "content";
pub const LOGS_PARTITION: &str = "logs";

/// Durable single-writer note log on a local key-value database.
pub struct LocalLogStore {
    content: ContentStore,
    logs: Arc<dyn KvStore>,
    state: Option<LoadedLog>,
}

struct LoadedLog {
    index: NoteIndex,
    cursor: PageCursor,
}

impl LoadedLog {
    async fn read(logs: &dyn KvStore) -> StoreResult<Self> {
        let started = Instant::now();
        let pages = read_pages(logs).await?;
        let cursor = PageCursor::resume(&pages);
        let result = ReplayEngine::replay(pages.iter().flat_map(|(_, entries)| entries));
        debug!(
            pages = pages.len(),
            applied = result.applied,
            skipped = result.skipped,
            notes = result.index.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "local log loaded"
        );
        Ok(Self {
            index: result.index,
            cursor,
        })
    }
}

impl LocalLogStore {
    /// Use the "content" and "logs" partitions of `db`.
    pub fn new(db: &KvDatabase) -> StoreResult<Self> {
        Ok(Self::from_partitions(
            db.partition(CONTENT_PARTITION)?,
            db.partition(LOGS_PARTITION)?,
        ))
    }

    pub fn from_partitions(content: Arc<dyn KvStore>, logs: Arc<dyn KvStore>) -> Self {
        Self {
            content: ContentStore::new(content),
            logs,
            state: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_partitions(Arc::new(InMemoryKv::new()), Arc::new(InMemoryKv::new()))
    }

    /// Open the file-backed database under `data_dir`.
    pub async fn open(data_dir: &Path) -> StoreResult<Self> {
        let db = KvDatabase::open_dir(
            data_dir,
            StoreMode::Local.database_name(),
            &[CONTENT_PARTITION, LOGS_PARTITION],
        )
        .await?;
        Self::new(&db)
    }

    pub fn content_store(&self) -> &ContentStore {
        &self.content
    }

    async fn loaded(&mut self) -> StoreResult<&mut LoadedLog> {
        let state = match self.state.take() {
            Some(state) => state,
            None => LoadedLog::read(self.logs.as_ref()).await?,
        };
        Ok(self.state.insert(state))
    }
}

#[async_trait]
impl NoteBackend for LocalLogStore {
    fn mode(&self) -> StoreMode {
        StoreMode::Local
    }

    fn index(&self) -> Option<&NoteIndex> {
        self.state.as_ref().map(|s| &s.index)
    }

    async fn load(&mut self) -> StoreResult<&NoteIndex> {
        Ok(&self.loaded().await?.index)
    }

    async fn append(&mut self, entry: LogEntry) -> StoreResult<()> {
        let logs = Arc::clone(&self.logs);
        let state = self.loaded().await?;

        let (key, page) = state.cursor.stage(&entry)?;
        logs.set(&key.to_string(), page).await?;

        let applied = ReplayEngine::apply(&mut state.index, &entry);
        debug!(page = %key, op = entry.op_code().name(), note = %entry.note, ?applied, "entry appended");
        if let Some(next) = state.cursor.commit(entry) {
            debug!(page = %next, "log page full; opened next page");
        }
        Ok(())
    }

    async fn append_content(
        &mut self,
        version: &VersionId,
        content: Bytes,
        entry: LogEntry,
    ) -> StoreResult<()> {
        self.content.put(version, content).await?;
        self.append(entry).await
    }

    async fn content(&self, version: &VersionId) -> StoreResult<Option<Bytes>> {
        self.content.get(version).await
    }
}
