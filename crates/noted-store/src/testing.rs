//! Test doubles shared by the store's unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use noted_kv::{InMemoryKv, KvError, KvResult, KvStore};
use noted_types::{LogEntry, NoteId, VersionId};

use crate::endpoint::{RemoteEndpoint, RemoteError, RemoteResult};

pub fn id(s: &str) -> NoteId {
    NoteId::parse(s).unwrap()
}

pub fn version(s: &str) -> VersionId {
    VersionId::parse(s).unwrap()
}

/// In-memory partition with write-failure injection and read counting.
#[derive(Default)]
pub struct FlakyKv {
    inner: InMemoryKv,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
}

impl FlakyKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of `get` + `keys` calls so far.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    fn check_write(&self) -> KvResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KvError::Io(std::io::Error::other("injected write failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for FlakyKv {
    async fn get(&self, key: &str) -> KvResult<Option<Bytes>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Bytes) -> KvResult<()> {
        self.check_write()?;
        self.inner.set(key, value).await
    }

    async fn add(&self, key: &str, value: Bytes) -> KvResult<()> {
        self.check_write()?;
        self.inner.add(key, value).await
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        self.check_write()?;
        self.inner.delete(key).await
    }

    async fn clear(&self) -> KvResult<()> {
        self.check_write()?;
        self.inner.clear().await
    }

    async fn keys(&self) -> KvResult<Vec<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.keys().await
    }
}

/// One call made against a [`RecordingEndpoint`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    GetLogs { start: usize, returned: usize },
    AppendLog,
    GetContent(VersionId),
    SetContent(VersionId),
}

/// In-memory remote authority that records every call.
#[derive(Default)]
pub struct RecordingEndpoint {
    log: Mutex<Vec<LogEntry>>,
    blobs: Mutex<HashMap<VersionId, Bytes>>,
    calls: Mutex<Vec<Call>>,
    fail_appends: AtomicBool,
    fail_uploads: AtomicBool,
    fail_content_reads: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(entries: Vec<LogEntry>) -> Self {
        let endpoint = Self::new();
        *endpoint.log.lock().unwrap() = entries;
        endpoint
    }

    pub fn put_blob(&self, version: VersionId, content: &'static [u8]) {
        self.blobs.lock().unwrap().insert(version, Bytes::from_static(content));
    }

    pub fn log(&self) -> Vec<LogEntry> {
        self.log.lock().unwrap().clone()
    }

    pub fn blob(&self, version: &VersionId) -> Option<Bytes> {
        self.blobs.lock().unwrap().get(version).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail_appends(&self, fail: bool) {
        self.fail_appends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_content_reads(&self, fail: bool) {
        self.fail_content_reads.store(fail, Ordering::SeqCst);
    }

    /// Highest number of `get_content` calls that were pending at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn unavailable(method: &'static str, path: &'static str) -> RemoteError {
        RemoteError::Status {
            method,
            path,
            status: 503,
            body: "unavailable".into(),
        }
    }
}

#[async_trait]
impl RemoteEndpoint for RecordingEndpoint {
    async fn get_logs(&self, start: usize) -> RemoteResult<Vec<LogEntry>> {
        let entries: Vec<LogEntry> = self.log.lock().unwrap().iter().skip(start).cloned().collect();
        self.record(Call::GetLogs {
            start,
            returned: entries.len(),
        });
        Ok(entries)
    }

    async fn append_log(&self, entry: &LogEntry) -> RemoteResult<()> {
        self.record(Call::AppendLog);
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(Self::unavailable("POST", "/api/store/appendLog"));
        }
        self.log.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn get_content(&self, version: &VersionId) -> RemoteResult<Option<Bytes>> {
        self.record(Call::GetContent(version.clone()));
        let pending = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(pending, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail_content_reads.load(Ordering::SeqCst) {
            return Err(Self::unavailable("GET", "/api/store/getContent"));
        }
        Ok(self.blob(version))
    }

    async fn set_content(&self, version: &VersionId, content: Bytes) -> RemoteResult<()> {
        self.record(Call::SetContent(version.clone()));
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(Self::unavailable("POST", "/api/store/setContent"));
        }
        self.blobs.lock().unwrap().insert(version.clone(), content);
        Ok(())
    }
}
