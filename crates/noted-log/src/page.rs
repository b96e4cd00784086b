//! Page chunking of the note log.
//!
//! The log is persisted as consecutive pages of at most [`PAGE_CAPACITY`]
//! entries. Page `n` lives under the key `log:<n>` and holds the JSON array
//! of its entries. Keys are ordered by their numeric suffix, so `log:10`
//! comes after `log:9`.

use std::fmt;

use bytes::Bytes;
use noted_kv::KvStore;
use noted_types::LogEntry;
use tracing::{debug, warn};

use crate::error::{LogError, LogResult};

/// Maximum number of entries per page.
pub const PAGE_CAPACITY: usize = 1024;

const PAGE_PREFIX: &str = "log:";

/// Numeric page key (`log:<n>`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PageKey(u64);

impl PageKey {
    pub const FIRST: Self = Self(0);

    pub fn new(n: u64) -> Self {
        Self(n)
    }

    pub fn number(self) -> u64 {
        self.0
    }

    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// Parse `log:<n>`. Anything else is rejected.
    pub fn parse(key: &str) -> LogResult<Self> {
        key.strip_prefix(PAGE_PREFIX)
            .filter(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|n| n.parse().ok())
            .map(Self)
            .ok_or_else(|| LogError::InvalidPageKey(key.to_string()))
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PAGE_PREFIX}{}", self.0)
    }
}

/// Parse and numerically sort page keys, skipping keys that are not pages.
pub fn sort_page_keys<I, S>(keys: I) -> Vec<PageKey>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut pages: Vec<PageKey> = keys
        .into_iter()
        .filter_map(|key| match PageKey::parse(key.as_ref()) {
            Ok(page) => Some(page),
            Err(_) => {
                warn!(key = key.as_ref(), "ignoring non-page key in log partition");
                None
            }
        })
        .collect();
    pages.sort_unstable();
    pages
}

pub fn encode_page(entries: &[LogEntry]) -> LogResult<Bytes> {
    serde_json::to_vec(entries)
        .map(Bytes::from)
        .map_err(|e| LogError::Encode(e.to_string()))
}

pub fn decode_page(key: PageKey, bytes: &[u8]) -> LogResult<Vec<LogEntry>> {
    serde_json::from_slice(bytes).map_err(|e| LogError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

/// Split `entries` into consecutive pages, keyed from `log:0`.
pub fn chunk(entries: &[LogEntry]) -> impl Iterator<Item = (PageKey, &[LogEntry])> {
    entries
        .chunks(PAGE_CAPACITY)
        .enumerate()
        .map(|(n, page)| (PageKey::new(n as u64), page))
}

/// Load every page of a log partition in numeric key order.
///
/// A key that is listed but vanishes before it is read is skipped.
pub async fn read_pages(kv: &dyn KvStore) -> LogResult<Vec<(PageKey, Vec<LogEntry>)>> {
    let keys = sort_page_keys(kv.keys().await?);
    let mut pages = Vec::with_capacity(keys.len());
    for key in keys {
        let Some(bytes) = kv.get(&key.to_string()).await? else {
            warn!(key = %key, "page listed but missing");
            continue;
        };
        let entries = decode_page(key, &bytes)?;
        debug!(key = %key, entries = entries.len(), "page loaded");
        pages.push((key, entries));
    }
    Ok(pages)
}

/// Re-chunk `entries` and overwrite the partition with the result.
///
/// Page keys beyond the new page count are deleted. Returns the number of
/// pages written.
pub async fn write_pages(kv: &dyn KvStore, entries: &[LogEntry]) -> LogResult<usize> {
    let mut written = 0;
    for (key, page) in chunk(entries) {
        kv.set(&key.to_string(), encode_page(page)?).await?;
        written += 1;
    }
    for stale in sort_page_keys(kv.keys().await?) {
        if stale.number() >= written as u64 {
            kv.delete(&stale.to_string()).await?;
            debug!(key = %stale, "stale page deleted");
        }
    }
    debug!(pages = written, entries = entries.len(), "log re-chunked");
    Ok(written)
}

/// Tracks the open (highest) page of a log for appends.
///
/// Appending is two-phase: [`stage`](Self::stage) produces the bytes to
/// persist without changing the cursor, and [`commit`](Self::commit)
/// records the entry once the write has succeeded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageCursor {
    key: PageKey,
    buffer: Vec<LogEntry>,
}

impl PageCursor {
    /// Cursor for an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume after the given pages (as returned by [`read_pages`]).
    ///
    /// The last page becomes the open page; if it is already full the
    /// cursor rolls to the next key.
    pub fn resume(pages: &[(PageKey, Vec<LogEntry>)]) -> Self {
        match pages.last() {
            None => Self::new(),
            Some((key, entries)) if entries.len() >= PAGE_CAPACITY => Self {
                key: key.next(),
                buffer: Vec::new(),
            },
            Some((key, entries)) => Self {
                key: *key,
                buffer: entries.clone(),
            },
        }
    }

    /// Key of the open page.
    pub fn key(&self) -> PageKey {
        self.key
    }

    /// Entries already in the open page.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Encode the open page with `entry` appended. The cursor is unchanged.
    pub fn stage(&self, entry: &LogEntry) -> LogResult<(PageKey, Bytes)> {
        let mut page = Vec::with_capacity(self.buffer.len() + 1);
        page.extend_from_slice(&self.buffer);
        page.push(entry.clone());
        Ok((self.key, encode_page(&page)?))
    }

    /// Record a persisted entry. Returns the new key when the page fills
    /// and the cursor rolls over.
    pub fn commit(&mut self, entry: LogEntry) -> Option<PageKey> {
        self.buffer.push(entry);
        if self.buffer.len() < PAGE_CAPACITY {
            return None;
        }
        self.key = self.key.next();
        self.buffer.clear();
        Some(self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::ReplayEngine;
    use noted_kv::InMemoryKv;
    use noted_types::{NoteId, Timestamp};
    use proptest::prelude::*;

    fn id(s: &str) -> NoteId {
        NoteId::parse(s).unwrap()
    }

    fn entries(n: usize) -> Vec<LogEntry> {
        let mut out = vec![LogEntry::create_note(id("n1"), "t", "md", false).at(Timestamp::from_millis(0))];
        for i in 1..n {
            out.push(
                LogEntry::change_title(id("n1"), format!("title {i}"))
                    .at(Timestamp::from_millis(i as u64)),
            );
        }
        out
    }

    #[test]
    fn page_key_parse_and_display() {
        let key = PageKey::parse("log:42").unwrap();
        assert_eq!(key.number(), 42);
        assert_eq!(key.to_string(), "log:42");
        assert!(PageKey::parse("log:").is_err());
        assert!(PageKey::parse("log:-1").is_err());
        assert!(PageKey::parse("log:1a").is_err());
        assert!(PageKey::parse("content:1").is_err());
    }

    #[test]
    fn numeric_ordering() {
        let keys = sort_page_keys(["log:10", "log:9", "log:0", "log:2", "junk"]);
        let numbers: Vec<u64> = keys.iter().map(|k| k.number()).collect();
        assert_eq!(numbers, vec![0, 2, 9, 10]);
    }

    #[test]
    fn chunk_sizes() {
        let log = entries(PAGE_CAPACITY * 2 + 3);
        let pages: Vec<_> = chunk(&log).collect();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].0, PageKey::new(0));
        assert_eq!(pages[0].1.len(), PAGE_CAPACITY);
        assert_eq!(pages[1].1.len(), PAGE_CAPACITY);
        assert_eq!(pages[2].1.len(), 3);
        assert_eq!(chunk(&[]).count(), 0);
    }

    #[test]
    fn decode_rejects_unknown_op() {
        let err = decode_page(PageKey::FIRST, br#"[[9, 1, "n1"]]"#).unwrap_err();
        assert!(matches!(err, LogError::Decode { .. }));
    }

    #[test]
    fn cursor_rolls_over_when_full() {
        let log = entries(PAGE_CAPACITY);
        let mut cursor = PageCursor::new();
        for entry in &log[..PAGE_CAPACITY - 1] {
            assert_eq!(cursor.commit(entry.clone()), None);
        }
        assert_eq!(cursor.len(), PAGE_CAPACITY - 1);
        let rolled = cursor.commit(log[PAGE_CAPACITY - 1].clone());
        assert_eq!(rolled, Some(PageKey::new(1)));
        assert!(cursor.is_empty());
    }

    #[test]
    fn resume_from_full_page_opens_next() {
        let log = entries(PAGE_CAPACITY);
        let pages = vec![(PageKey::FIRST, log)];
        let cursor = PageCursor::resume(&pages);
        assert_eq!(cursor.key(), PageKey::new(1));
        assert!(cursor.is_empty());
    }

    #[test]
    fn stage_does_not_mutate() {
        let log = entries(2);
        let mut cursor = PageCursor::new();
        cursor.commit(log[0].clone());
        let (key, bytes) = cursor.stage(&log[1]).unwrap();
        assert_eq!(key, PageKey::FIRST);
        assert_eq!(cursor.len(), 1);
        assert_eq!(decode_page(key, &bytes).unwrap(), log);
    }

    #[tokio::test]
    async fn write_then_read_pages() {
        let kv = InMemoryKv::new();
        let log = entries(PAGE_CAPACITY + 10);
        assert_eq!(write_pages(&kv, &log).await.unwrap(), 2);

        let pages = read_pages(&kv).await.unwrap();
        assert_eq!(pages.len(), 2);
        let flat: Vec<LogEntry> = pages.iter().flat_map(|(_, p)| p.clone()).collect();
        assert_eq!(flat, log);

        let cursor = PageCursor::resume(&pages);
        assert_eq!(cursor.key(), PageKey::new(1));
        assert_eq!(cursor.len(), 10);
    }

    #[tokio::test]
    async fn write_pages_drops_stale_keys() {
        let kv = InMemoryKv::new();
        write_pages(&kv, &entries(PAGE_CAPACITY * 3)).await.unwrap();
        write_pages(&kv, &entries(5)).await.unwrap();
        assert_eq!(kv.keys().await.unwrap(), vec!["log:0".to_string()]);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn chunked_replay_matches_flat(n in 0usize..3_000) {
            let log = entries(n);
            let flat = ReplayEngine::replay(&log);

            let mut pages: Vec<(PageKey, Vec<LogEntry>)> = chunk(&log)
                .map(|(key, page)| (key, page.to_vec()))
                .collect();
            // Store order is byte order; replay must re-sort numerically.
            pages.sort_by_key(|(key, _)| key.to_string());
            let order = sort_page_keys(pages.iter().map(|(key, _)| key.to_string()));
            let mut rebuilt = Vec::new();
            for key in order {
                let page = pages.iter().find(|(k, _)| *k == key).map(|(_, p)| p.clone()).unwrap();
                rebuilt.extend(page);
            }
            prop_assert_eq!(ReplayEngine::replay(&rebuilt), flat);
        }
    }
}
