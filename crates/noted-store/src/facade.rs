use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use noted_log::{NoteIndex, NoteRecord};
use noted_types::{LogEntry, NoteId, Timestamp, VersionId};
use tracing::{debug, info};

use crate::backend::NoteBackend;
use crate::config::{StoreConfig, StoreMode};
use crate::error::{StoreError, StoreResult};
use crate::http::HttpEndpoint;
use crate::local::LocalLogStore;
use crate::lookup;
use crate::remote::RemoteLogStore;

/// Note-level API over exactly one backend.
///
/// Every operation loads the backend on first use. Mutations take
/// `&mut self`, so a store has a single writer. To switch between local and
/// remote mode, build a new `NoteStore`; the old one and its index are
/// dropped with it.
pub struct NoteStore {
    backend: Box<dyn NoteBackend>,
}

impl NoteStore {
    pub fn new(backend: Box<dyn NoteBackend>) -> Self {
        Self { backend }
    }

    pub fn local(store: LocalLogStore) -> Self {
        Self::new(Box::new(store))
    }

    pub fn remote(store: RemoteLogStore) -> Self {
        Self::new(Box::new(store))
    }

    /// Build the backend described by `config` on the file system.
    pub async fn open(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let store = match config.mode {
            StoreMode::Local => Self::local(LocalLogStore::open(&config.data_dir).await?),
            StoreMode::Remote => {
                let remote = config.remote.as_ref().ok_or_else(|| {
                    StoreError::Config("remote mode without [remote] section".into())
                })?;
                let endpoint =
                    HttpEndpoint::new(&remote.base_url, Duration::from_millis(remote.timeout_ms))?;
                Self::remote(RemoteLogStore::open(Arc::new(endpoint), &config.data_dir).await?)
            }
        };
        info!(mode = %config.mode, data_dir = %config.data_dir.display(), "note store opened");
        Ok(store)
    }

    pub fn mode(&self) -> StoreMode {
        self.backend.mode()
    }

    pub fn is_loaded(&self) -> bool {
        self.backend.is_loaded()
    }

    /// Load the backend now instead of on first use.
    pub async fn load(&mut self) -> StoreResult<usize> {
        Ok(self.backend.load().await?.len())
    }

    async fn index(&mut self) -> StoreResult<&NoteIndex> {
        self.backend.load().await
    }

    async fn record(&mut self, note: &NoteId) -> StoreResult<&NoteRecord> {
        self.index()
            .await?
            .get(note)
            .ok_or_else(|| StoreError::NoteNotFound(note.clone()))
    }

    // ---- Notes ----

    /// All live notes in creation order.
    pub async fn get_notes(&mut self) -> StoreResult<Vec<NoteId>> {
        Ok(self.index().await?.note_ids())
    }

    pub async fn new_note(&mut self, title: &str, kind: &str) -> StoreResult<NoteId> {
        self.create(title, kind, false).await
    }

    pub async fn new_daily_note(&mut self, title: &str, kind: &str) -> StoreResult<NoteId> {
        self.create(title, kind, true).await
    }

    async fn create(&mut self, title: &str, kind: &str, is_daily: bool) -> StoreResult<NoteId> {
        let index = self.index().await?;
        let mut note = NoteId::generate();
        while index.contains(&note) {
            note = NoteId::generate();
        }
        self.backend
            .append(LogEntry::create_note(note.clone(), title, kind, is_daily))
            .await?;
        debug!(note = %note, is_daily, "note created");
        Ok(note)
    }

    /// Rename a note. Returns `false` without appending when the title is
    /// unchanged.
    pub async fn set_title(&mut self, note: &NoteId, title: &str) -> StoreResult<bool> {
        if self.record(note).await?.title == title {
            return Ok(false);
        }
        self.backend
            .append(LogEntry::change_title(note.clone(), title))
            .await?;
        Ok(true)
    }

    /// Change a note's content type. Returns `false` when unchanged.
    pub async fn set_kind(&mut self, note: &NoteId, kind: &str) -> StoreResult<bool> {
        if self.record(note).await?.kind == kind {
            return Ok(false);
        }
        self.backend
            .append(LogEntry::change_kind(note.clone(), kind))
            .await?;
        Ok(true)
    }

    pub async fn delete_note(&mut self, note: &NoteId) -> StoreResult<()> {
        self.record(note).await?;
        self.backend.append(LogEntry::delete_note(note.clone())).await?;
        debug!(note = %note, "note deleted");
        Ok(())
    }

    // ---- Content ----

    /// Current content of a note; empty for a note that has none yet.
    pub async fn get_latest_version(&mut self, note: &NoteId) -> StoreResult<String> {
        Ok(self.current_content(note).await?.unwrap_or_default())
    }

    /// `None` until the note's first version is written.
    async fn current_content(&mut self, note: &NoteId) -> StoreResult<Option<String>> {
        let Some(version) = self.record(note).await?.latest_version.clone() else {
            return Ok(None);
        };
        let bytes = self
            .backend
            .content(&version)
            .await?
            .ok_or_else(|| StoreError::ContentMissing(version.clone()))?;
        String::from_utf8(bytes.to_vec())
            .map(Some)
            .map_err(|_| StoreError::InvalidUtf8(version))
    }

    /// Store `content` as the note's new version. Returns `false` without
    /// writing anything when it equals the current content. The first
    /// version is always written, even when empty.
    pub async fn add_version(&mut self, note: &NoteId, content: &str) -> StoreResult<bool> {
        match self.current_content(note).await {
            Ok(Some(current)) if current == content => return Ok(false),
            Ok(_) | Err(StoreError::ContentMissing(_) | StoreError::InvalidUtf8(_)) => {}
            Err(e) => return Err(e),
        }
        let version = VersionId::generate(note);
        let size = content.len() as u64;
        let entry = LogEntry::change_content(note.clone(), version.clone(), size);
        self.backend
            .append_content(&version, Bytes::copy_from_slice(content.as_bytes()), entry)
            .await?;
        debug!(note = %note, version = %version, size, "version added");
        Ok(true)
    }

    // ---- Note fields ----

    pub async fn note_title(&mut self, note: &NoteId) -> StoreResult<String> {
        Ok(self.record(note).await?.title.clone())
    }

    pub async fn note_kind(&mut self, note: &NoteId) -> StoreResult<String> {
        Ok(self.record(note).await?.kind.clone())
    }

    pub async fn note_size(&mut self, note: &NoteId) -> StoreResult<u64> {
        Ok(self.record(note).await?.size)
    }

    pub async fn note_is_daily(&mut self, note: &NoteId) -> StoreResult<bool> {
        Ok(self.record(note).await?.is_daily)
    }

    pub async fn note_created_at(&mut self, note: &NoteId) -> StoreResult<Timestamp> {
        Ok(self.record(note).await?.created_at)
    }

    pub async fn note_last_modified(&mut self, note: &NoteId) -> StoreResult<Timestamp> {
        Ok(self.record(note).await?.updated_at)
    }

    pub async fn note_latest_version_id(&mut self, note: &NoteId) -> StoreResult<Option<VersionId>> {
        Ok(self.record(note).await?.latest_version.clone())
    }

    // ---- Lookup ----

    pub async fn note_by_id(&mut self, id: &str) -> StoreResult<Option<NoteId>> {
        Ok(lookup::find_by_id(self.index().await?, id).map(|r| r.id.clone()))
    }

    /// Resolve a `title~id` reference, a bare id, or a bare title.
    pub async fn note_by_title_or_id(&mut self, encoded: &str) -> StoreResult<Option<NoteId>> {
        Ok(lookup::find_by_title_or_id(self.index().await?, encoded).map(|r| r.id.clone()))
    }

    pub async fn last_modified_note(&mut self) -> StoreResult<Option<NoteId>> {
        Ok(lookup::last_modified(self.index().await?).map(|r| r.id.clone()))
    }

    /// Drop cached remote state; the next access bootstraps from scratch.
    pub async fn clear_cache(&mut self) -> StoreResult<()> {
        self.backend.clear_cache().await
    }
}

impl std::fmt::Debug for NoteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteStore")
            .field("mode", &self.mode())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
