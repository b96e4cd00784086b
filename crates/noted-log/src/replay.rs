use noted_types::{LogEntry, LogOp, NoteId};
use tracing::warn;

use crate::index::{NoteIndex, NoteRecord};

/// Why an entry left the index unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The entry references a note that was never created or was deleted.
    NoteNotFound,
    /// A create entry for an id that is already live.
    AlreadyExists,
}

/// Effect of applying one entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Applied {
    Created(NoteId),
    Updated(NoteId),
    Deleted(NoteId),
    Skipped(SkipReason),
}

impl Applied {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}

/// Result of replaying a sequence of entries from an empty index.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReplayResult {
    pub index: NoteIndex,
    pub applied: u64,
    pub skipped: u64,
}

/// Deterministic replay of note logs.
///
/// Replay is order-sensitive but never fails: entries that reference an
/// unknown or deleted note are logged and skipped, and replay continues.
pub struct ReplayEngine;

impl ReplayEngine {
    /// Fold `entries` into a fresh index.
    pub fn replay<'a, I>(entries: I) -> ReplayResult
    where
        I: IntoIterator<Item = &'a LogEntry>,
    {
        let mut result = ReplayResult::default();
        Self::replay_onto(&mut result, entries);
        result
    }

    /// Fold `entries` into an existing result, updating its counters.
    pub fn replay_onto<'a, I>(result: &mut ReplayResult, entries: I)
    where
        I: IntoIterator<Item = &'a LogEntry>,
    {
        for entry in entries {
            if Self::apply(&mut result.index, entry).is_skipped() {
                result.skipped += 1;
            } else {
                result.applied += 1;
            }
        }
    }

    /// Apply a single entry to `index`.
    pub fn apply(index: &mut NoteIndex, entry: &LogEntry) -> Applied {
        let id = &entry.note;
        let at = entry.timestamp;

        match &entry.op {
            LogOp::CreateNote {
                title,
                kind,
                is_daily,
            } => {
                let record = NoteRecord {
                    id: id.clone(),
                    title: title.clone(),
                    kind: kind.clone(),
                    is_daily: *is_daily,
                    latest_version: None,
                    created_at: at,
                    updated_at: at,
                    size: 0,
                };
                if !index.insert(record) {
                    warn!(note = %id, "apply: note already exists; ignoring duplicate create");
                    return Applied::Skipped(SkipReason::AlreadyExists);
                }
                Applied::Created(id.clone())
            }
            LogOp::ChangeTitle { title } => update(index, entry, |r| r.title = title.clone()),
            LogOp::ChangeContent { version, size } => update(index, entry, |r| {
                r.latest_version = Some(version.clone());
                r.size = *size;
            }),
            LogOp::ChangeKind { kind } => update(index, entry, |r| r.kind = kind.clone()),
            LogOp::DeleteNote => match index.remove(id) {
                Some(_) => Applied::Deleted(id.clone()),
                None => {
                    warn_missing(entry);
                    Applied::Skipped(SkipReason::NoteNotFound)
                }
            },
        }
    }
}

fn update(index: &mut NoteIndex, entry: &LogEntry, change: impl FnOnce(&mut NoteRecord)) -> Applied {
    let Some(record) = index.get_mut(&entry.note) else {
        warn_missing(entry);
        return Applied::Skipped(SkipReason::NoteNotFound);
    };
    change(record);
    record.updated_at = entry.timestamp;
    Applied::Updated(entry.note.clone())
}

fn warn_missing(entry: &LogEntry) {
    let op = entry.op_code();
    warn!(
        note = %entry.note,
        op = op.code(),
        op_name = op.name(),
        "apply: note not found; was it deleted?"
    );
}
