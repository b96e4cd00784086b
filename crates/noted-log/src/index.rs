use std::collections::{BTreeSet, HashMap};

use noted_types::{NoteId, Timestamp, VersionId};

/// Current state of one live note, as reconstructed by replay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteRecord {
    pub id: NoteId,
    pub title: String,
    pub kind: String,
    pub is_daily: bool,
    /// Version id of the current content blob; `None` until the first
    /// content change.
    pub latest_version: Option<VersionId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    /// Byte length of the current content (0 when unknown).
    pub size: u64,
}

/// Flat, replay-derived index of live notes.
///
/// Records are kept in creation order in one contiguous vector; a map
/// resolves a note id to its record's offset. Invariants:
/// - every id in the map points at an in-range offset,
/// - every record is pointed at by exactly one id (its own),
/// - deleting a note compacts the vector; no tombstones remain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteIndex {
    records: Vec<NoteRecord>,
    offsets: HashMap<NoteId, usize>,
}

impl NoteIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live notes.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: &NoteId) -> bool {
        self.offsets.contains_key(id)
    }

    pub fn get(&self, id: &NoteId) -> Option<&NoteRecord> {
        self.offsets.get(id).map(|&offset| &self.records[offset])
    }

    /// Offset of the note's record in [`records`](Self::records).
    pub fn offset_of(&self, id: &NoteId) -> Option<usize> {
        self.offsets.get(id).copied()
    }

    /// All live records in creation order.
    pub fn records(&self) -> &[NoteRecord] {
        &self.records
    }

    /// Handles of all live notes in creation order.
    pub fn note_ids(&self) -> Vec<NoteId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    /// Version ids currently referenced as some note's latest content.
    pub fn referenced_versions(&self) -> BTreeSet<VersionId> {
        self.records
            .iter()
            .filter_map(|r| r.latest_version.clone())
            .collect()
    }

    /// Append a record. Returns `false` (and changes nothing) if the id is
    /// already live.
    pub(crate) fn insert(&mut self, record: NoteRecord) -> bool {
        if self.offsets.contains_key(&record.id) {
            return false;
        }
        self.offsets.insert(record.id.clone(), self.records.len());
        self.records.push(record);
        true
    }

    pub(crate) fn get_mut(&mut self, id: &NoteId) -> Option<&mut NoteRecord> {
        let offset = *self.offsets.get(id)?;
        self.records.get_mut(offset)
    }

    /// Remove a record and shift the trailing records left, fixing their
    /// offsets. O(n) in live notes.
    pub(crate) fn remove(&mut self, id: &NoteId) -> Option<NoteRecord> {
        let offset = self.offsets.remove(id)?;
        let record = self.records.remove(offset);
        for (shifted, trailing) in self.records[offset..].iter().enumerate() {
            if let Some(slot) = self.offsets.get_mut(&trailing.id) {
                *slot = offset + shifted;
            }
        }
        Some(record)
    }

    /// Verify the map/vector invariants. Used by tests and debug assertions.
    pub fn is_consistent(&self) -> bool {
        self.offsets.len() == self.records.len()
            && self
                .records
                .iter()
                .enumerate()
                .all(|(offset, r)| self.offsets.get(&r.id) == Some(&offset))
    }
}
