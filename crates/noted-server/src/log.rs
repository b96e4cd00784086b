//! The authoritative paged log.

use std::sync::Arc;

use noted_kv::KvStore;
use noted_log::{decode_page, read_pages, PageCursor, PageKey};
use noted_types::LogEntry;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::ServerResult;

/// Single ordered log shared by every client.
///
/// Appends are serialized by a mutex. Page lengths are kept in memory so a
/// read from offset `n` skips whole pages without loading them.
pub struct ServerLog {
    logs: Arc<dyn KvStore>,
    state: Mutex<LogState>,
}

struct LogState {
    cursor: PageCursor,
    /// Length of every persisted page, in key order.
    pages: Vec<(PageKey, usize)>,
}

impl LogState {
    fn len(&self) -> usize {
        self.pages.iter().map(|(_, len)| len).sum()
    }
}

impl ServerLog {
    pub async fn open(logs: Arc<dyn KvStore>) -> ServerResult<Self> {
        let pages = read_pages(logs.as_ref()).await?;
        let cursor = PageCursor::resume(&pages);
        let pages: Vec<(PageKey, usize)> = pages
            .iter()
            .map(|(key, entries)| (*key, entries.len()))
            .collect();
        let state = LogState { cursor, pages };
        debug!(pages = state.pages.len(), entries = state.len(), "server log opened");
        Ok(Self {
            logs,
            state: Mutex::new(state),
        })
    }

    /// Number of entries in the log.
    pub async fn len(&self) -> usize {
        self.state.lock().await.len()
    }

    /// Append one entry. Returns the new log length.
    pub async fn append(&self, entry: LogEntry) -> ServerResult<usize> {
        let mut state = self.state.lock().await;
        let (key, page) = state.cursor.stage(&entry)?;
        self.logs.set(&key.to_string(), page).await?;

        let state = &mut *state;
        if let Some((_, len)) = state.pages.last_mut().filter(|(last, _)| *last == key) {
            *len += 1;
        } else {
            state.pages.push((key, 1));
        }
        state.cursor.commit(entry);
        Ok(state.len())
    }

    /// Every entry at offset `start` or later.
    pub async fn entries_from(&self, start: usize) -> ServerResult<Vec<LogEntry>> {
        let state = self.state.lock().await;
        let mut skip = start;
        let mut out = Vec::new();
        for &(key, len) in &state.pages {
            if skip >= len {
                skip -= len;
                continue;
            }
            let Some(bytes) = self.logs.get(&key.to_string()).await? else {
                continue;
            };
            let entries = decode_page(key, &bytes)?;
            out.extend(entries.into_iter().skip(skip));
            skip = 0;
        }
        Ok(out)
    }
}
