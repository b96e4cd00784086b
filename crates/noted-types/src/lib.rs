//! Foundation types for Noted.
//!
//! This crate provides the identity, temporal, and log-entry types shared by
//! every other Noted crate.
//!
//! # Key Types
//!
//! - [`NoteId`] -- Short random identifier; doubles as the opaque note handle
//! - [`VersionId`] -- Identifier of one immutable content blob (`<note>-<suffix>`)
//! - [`Timestamp`] -- Wall-clock milliseconds since the UNIX epoch
//! - [`LogEntry`] / [`LogOp`] -- One appended mutation of one note

pub mod entry;
pub mod error;
pub mod identity;
pub mod temporal;

pub use entry::{LogEntry, LogOp, OpCode};
pub use error::TypeError;
pub use identity::{NoteId, VersionId, ID_ALPHABET, NOTE_ID_LEN, VERSION_SUFFIX_LEN};
pub use temporal::Timestamp;
