//! Resolving user-facing note references.
//!
//! Links and URLs name a note as `title~id`. The id wins when it resolves;
//! otherwise the title is matched.

use std::borrow::Cow;

use noted_log::{NoteIndex, NoteRecord};
use noted_types::NoteId;

pub const ID_SEPARATOR: char = '~';

/// Split `title~id` at the last separator.
///
/// Without a separator the text could be either a title or an id, so it is
/// returned in both positions.
pub fn parse_encoded_title(encoded: &str) -> (&str, &str) {
    match encoded.rfind(ID_SEPARATOR) {
        Some(at) => (&encoded[..at], &encoded[at + ID_SEPARATOR.len_utf8()..]),
        None => (encoded, encoded),
    }
}

pub fn encode_title(title: &str, id: &NoteId) -> String {
    format!("{title}{ID_SEPARATOR}{id}")
}

pub fn find_by_id<'a>(index: &'a NoteIndex, id: &str) -> Option<&'a NoteRecord> {
    let id = NoteId::parse(id).ok()?;
    index.get(&id)
}

/// Resolve `encoded` by id, then exact title (raw or URL-decoded), then
/// title with `_` read as a space. The first match in creation order wins.
pub fn find_by_title_or_id<'a>(index: &'a NoteIndex, encoded: &str) -> Option<&'a NoteRecord> {
    let (title, id) = parse_encoded_title(encoded);
    if let Some(record) = find_by_id(index, id) {
        return Some(record);
    }
    // Malformed escapes leave the title as written.
    let decoded = urlencoding::decode(title).unwrap_or(Cow::Borrowed(title));
    let records = index.records();
    records
        .iter()
        .find(|r| r.title == title || r.title == decoded || r.title == encoded)
        .or_else(|| records.iter().find(|r| r.title.replace('_', " ") == decoded))
}

/// The note with the latest modification time. Ties go to the earlier
/// note; notes that were never timestamped are ignored.
pub fn last_modified(index: &NoteIndex) -> Option<&NoteRecord> {
    let mut latest: Option<&NoteRecord> = None;
    for record in index.records() {
        if record.updated_at.as_millis() == 0 {
            continue;
        }
        if latest.map_or(true, |l| record.updated_at > l.updated_at) {
            latest = Some(record);
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use noted_log::ReplayEngine;
    use noted_types::{LogEntry, Timestamp};

    fn id(s: &str) -> NoteId {
        NoteId::parse(s).unwrap()
    }

    fn index() -> NoteIndex {
        let entries = vec![
            LogEntry::create_note(id("aaaaaa"), "Groceries", "md", false).at(Timestamp::from_millis(10)),
            LogEntry::create_note(id("bbbbbb"), "weekly_plan", "md", false).at(Timestamp::from_millis(30)),
            LogEntry::create_note(id("cccccc"), "Ideas~2024", "md", false).at(Timestamp::from_millis(20)),
        ];
        ReplayEngine::replay(&entries).index
    }

    #[test]
    fn parse_splits_on_last_separator() {
        assert_eq!(parse_encoded_title("a~b~xyz123"), ("a~b", "xyz123"));
        assert_eq!(parse_encoded_title("plain"), ("plain", "plain"));
        assert_eq!(parse_encoded_title("~xyz123"), ("", "xyz123"));
    }

    #[test]
    fn encode_then_parse() {
        let encoded = encode_title("Todo", &id("abc123"));
        assert_eq!(encoded, "Todo~abc123");
        assert_eq!(parse_encoded_title(&encoded), ("Todo", "abc123"));
    }

    #[test]
    fn id_takes_precedence() {
        let index = index();
        let found = find_by_title_or_id(&index, "Groceries~bbbbbb").unwrap();
        assert_eq!(found.id, id("bbbbbb"));
        assert_eq!(find_by_title_or_id(&index, "cccccc").unwrap().id, id("cccccc"));
    }

    #[test]
    fn title_matching() {
        let index = index();
        assert_eq!(find_by_title_or_id(&index, "Groceries").unwrap().id, id("aaaaaa"));
        assert_eq!(find_by_title_or_id(&index, "Groceries~gone00").unwrap().id, id("aaaaaa"));
        // A title containing the separator still matches as a whole.
        assert_eq!(find_by_title_or_id(&index, "Ideas~2024").unwrap().id, id("cccccc"));
        assert_eq!(find_by_title_or_id(&index, "weekly plan").unwrap().id, id("bbbbbb"));
        assert!(find_by_title_or_id(&index, "nothing").is_none());
    }

    #[test]
    fn url_encoded_title_matching() {
        let index = index();
        assert_eq!(find_by_title_or_id(&index, "Ideas%7E2024~zzzzzz").unwrap().id, id("cccccc"));
        assert_eq!(find_by_title_or_id(&index, "weekly%20plan").unwrap().id, id("bbbbbb"));
        assert!(find_by_title_or_id(&index, "Groceries%FF").is_none());
    }

    #[test]
    fn last_modified_picks_latest() {
        assert_eq!(last_modified(&index()).unwrap().id, id("bbbbbb"));
        assert!(last_modified(&NoteIndex::new()).is_none());
    }
}
