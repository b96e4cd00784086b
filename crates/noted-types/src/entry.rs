use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::identity::{NoteId, VersionId};
use crate::temporal::Timestamp;

/// Kind assumed for notes whose create entry carries no kind.
pub const DEFAULT_KIND: &str = "md";

/// Wire code of a log operation (first element of a serialized entry).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    CreateNote = 1,
    ChangeTitle = 2,
    ChangeContent = 3,
    ChangeKind = 4,
    DeleteNote = 5,
}

impl OpCode {
    pub fn from_code(code: u64) -> Result<Self, TypeError> {
        match code {
            1 => Ok(Self::CreateNote),
            2 => Ok(Self::ChangeTitle),
            3 => Ok(Self::ChangeContent),
            4 => Ok(Self::ChangeKind),
            5 => Ok(Self::DeleteNote),
            other => Err(TypeError::UnknownOp(other)),
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::CreateNote => "CreateNote",
            Self::ChangeTitle => "ChangeTitle",
            Self::ChangeContent => "ChangeContent",
            Self::ChangeKind => "ChangeKind",
            Self::DeleteNote => "DeleteNote",
        }
    }
}

/// The mutation carried by a log entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogOp {
    CreateNote {
        title: String,
        kind: String,
        is_daily: bool,
    },
    ChangeTitle {
        title: String,
    },
    ChangeContent {
        version: VersionId,
        /// Byte length of the new content; 0 for entries written before
        /// sizes were recorded.
        size: u64,
    },
    ChangeKind {
        kind: String,
    },
    DeleteNote,
}

impl LogOp {
    pub fn code(&self) -> OpCode {
        match self {
            Self::CreateNote { .. } => OpCode::CreateNote,
            Self::ChangeTitle { .. } => OpCode::ChangeTitle,
            Self::ChangeContent { .. } => OpCode::ChangeContent,
            Self::ChangeKind { .. } => OpCode::ChangeKind,
            Self::DeleteNote => OpCode::DeleteNote,
        }
    }
}

/// One immutable, appended record describing a single note mutation.
///
/// Serialized as a JSON array `[op, timestamp, note, ...payload]`, the
/// format shared by the local page store, the remote cache and the server.
/// Every historical shape is accepted on read; the latest shape is always
/// written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Value>", into = "Vec<Value>")]
pub struct LogEntry {
    pub timestamp: Timestamp,
    pub note: NoteId,
    pub op: LogOp,
}

impl LogEntry {
    pub fn new(note: NoteId, op: LogOp) -> Self {
        Self {
            timestamp: Timestamp::now(),
            note,
            op,
        }
    }

    pub fn create_note(
        note: NoteId,
        title: impl Into<String>,
        kind: impl Into<String>,
        is_daily: bool,
    ) -> Self {
        Self::new(
            note,
            LogOp::CreateNote {
                title: title.into(),
                kind: kind.into(),
                is_daily,
            },
        )
    }

    pub fn change_title(note: NoteId, title: impl Into<String>) -> Self {
        Self::new(note, LogOp::ChangeTitle { title: title.into() })
    }

    pub fn change_content(note: NoteId, version: VersionId, size: u64) -> Self {
        Self::new(note, LogOp::ChangeContent { version, size })
    }

    pub fn change_kind(note: NoteId, kind: impl Into<String>) -> Self {
        Self::new(note, LogOp::ChangeKind { kind: kind.into() })
    }

    pub fn delete_note(note: NoteId) -> Self {
        Self::new(note, LogOp::DeleteNote)
    }

    /// Replace the timestamp (used when replaying fixtures).
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn op_code(&self) -> OpCode {
        self.op.code()
    }
}

impl From<LogEntry> for Vec<Value> {
    fn from(entry: LogEntry) -> Self {
        let mut out = vec![
            Value::from(entry.op_code().code()),
            Value::from(entry.timestamp.as_millis()),
            Value::from(String::from(entry.note)),
        ];
        match entry.op {
            LogOp::CreateNote {
                title,
                kind,
                is_daily,
            } => {
                out.push(Value::from(title));
                out.push(Value::from(kind));
                out.push(Value::from(is_daily));
            }
            LogOp::ChangeTitle { title } => out.push(Value::from(title)),
            LogOp::ChangeContent { version, size } => {
                out.push(Value::from(String::from(version)));
                out.push(Value::from(size));
            }
            LogOp::ChangeKind { kind } => out.push(Value::from(kind)),
            LogOp::DeleteNote => {}
        }
        out
    }
}

impl TryFrom<Vec<Value>> for LogEntry {
    type Error = TypeError;

    fn try_from(fields: Vec<Value>) -> Result<Self, Self::Error> {
        let code = fields
            .first()
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed("missing op code"))?;
        let op_code = OpCode::from_code(code)?;
        let timestamp = fields
            .get(1)
            .and_then(as_millis)
            .map(Timestamp::from_millis)
            .ok_or_else(|| malformed("missing timestamp"))?;
        let note = match fields.get(2) {
            Some(Value::String(s)) => NoteId::parse(s.as_str())?,
            _ => return Err(malformed("missing note id")),
        };

        let op = match op_code {
            OpCode::CreateNote => LogOp::CreateNote {
                title: opt_str(&fields, 3).unwrap_or_default(),
                kind: opt_str(&fields, 4).unwrap_or_else(|| DEFAULT_KIND.to_string()),
                is_daily: fields.get(5).and_then(Value::as_bool).unwrap_or(false),
            },
            OpCode::ChangeTitle => LogOp::ChangeTitle {
                title: opt_str(&fields, 3).unwrap_or_default(),
            },
            OpCode::ChangeContent => {
                let version = opt_str(&fields, 3)
                    .ok_or_else(|| malformed("change-content entry without version id"))?;
                LogOp::ChangeContent {
                    version: VersionId::parse(version)?,
                    size: fields.get(4).and_then(as_millis).unwrap_or(0),
                }
            }
            OpCode::ChangeKind => LogOp::ChangeKind {
                kind: opt_str(&fields, 3)
                    .ok_or_else(|| malformed("change-kind entry without kind"))?,
            },
            OpCode::DeleteNote => LogOp::DeleteNote,
        };

        Ok(Self {
            timestamp,
            note,
            op,
        })
    }
}

fn malformed(reason: &str) -> TypeError {
    TypeError::MalformedEntry(reason.to_string())
}

fn opt_str(fields: &[Value], idx: usize) -> Option<String> {
    fields.get(idx).and_then(Value::as_str).map(str::to_string)
}

/// Non-negative integer, tolerating float encodings from JavaScript writers.
fn as_millis(v: &Value) -> Option<u64> {
    v.as_u64().or_else(|| {
        v.as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f as u64)
    })
}
