use std::borrow::Borrow;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Symbols used for random identifiers. Exactly 64 entries so a random byte
/// masked with `63` indexes it without bias.
pub const ID_ALPHABET: &[u8; 64] =
    b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_-";

/// Length of a freshly generated note id (older logs also hold 8-char ids).
pub const NOTE_ID_LEN: usize = 6;

/// Length of the random suffix appended to a note id to form a version id.
pub const VERSION_SUFFIX_LEN: usize = 4;

fn random_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| {
            let byte: u8 = rng.gen();
            ID_ALPHABET[(byte & 63) as usize] as char
        })
        .collect()
}

/// Identifier of a note, and the opaque handle the rest of the system holds.
///
/// The id is assigned by whoever creates the note, never by the store. No
/// other note field travels with the handle; everything else is looked up in
/// the replayed index.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteId(String);

impl NoteId {
    /// Generate a new random note id.
    pub fn generate() -> Self {
        Self(random_id(NOTE_ID_LEN))
    }

    /// Parse an id read from a log or supplied by a caller.
    pub fn parse(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidNoteId(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NoteId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<NoteId> for String {
    fn from(id: NoteId) -> Self {
        id.0
    }
}

impl Borrow<str> for NoteId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NoteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NoteId({})", self.0)
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one immutable content blob.
///
/// New ids are `<note id>-<random suffix>`, so blobs of different notes can
/// never collide and a blob is never rewritten under the same id. Older logs
/// may hold ids of another shape; they are accepted as opaque strings.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionId(String);

impl VersionId {
    /// Derive a fresh version id for `note`.
    pub fn generate(note: &NoteId) -> Self {
        Self(format!("{}-{}", note, random_id(VERSION_SUFFIX_LEN)))
    }

    pub fn parse(s: impl Into<String>) -> Result<Self, TypeError> {
        let s = s.into();
        if s.is_empty() || s.chars().any(char::is_whitespace) {
            return Err(TypeError::InvalidVersionId(s));
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if this version id was derived from `note`.
    pub fn belongs_to(&self, note: &NoteId) -> bool {
        self.0
            .strip_prefix(note.as_str())
            .is_some_and(|rest| rest.starts_with('-'))
    }
}

impl TryFrom<String> for VersionId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(s)
    }
}

impl From<VersionId> for String {
    fn from(id: VersionId) -> Self {
        id.0
    }
}

impl Borrow<str> for VersionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for VersionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VersionId({})", self.0)
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
