use crate::{keys, read_json, write_json, KeyValueStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub note: String,
    /// Milliseconds since the Unix epoch of the last save.
    pub timestamp: i64,
}

/// Per-file freeform notes, stored as one JSON map under
/// [`keys::NOTES`]. Reads never fail: corrupt data reads as no notes.
#[derive(Clone)]
pub struct NoteStore<S> {
    store: S,
}

impl<S: KeyValueStore> NoteStore<S> {
    pub fn new(store: S) -> Self {
        NoteStore { store }
    }

    pub fn save(&self, file_id: &str, text: &str) -> Note {
        self.save_at(file_id, text, Utc::now())
    }

    /// Overwrite the note for `file_id`.
    pub fn save_at(&self, file_id: &str, text: &str, now: DateTime<Utc>) -> Note {
        let note = Note {
            id: file_id.to_string(),
            note: text.to_string(),
            timestamp: now.timestamp_millis(),
        };
        let mut all = self.get_all();
        all.insert(file_id.to_string(), note.clone());
        write_json(&self.store, keys::NOTES, &all);
        note
    }

    /// The note text, or an empty string.
    pub fn get(&self, file_id: &str) -> String {
        self.get_all()
            .remove(file_id)
            .map(|n| n.note)
            .unwrap_or_default()
    }

    pub fn get_all(&self) -> HashMap<String, Note> {
        read_json(&self.store, keys::NOTES).unwrap_or_default()
    }

    pub fn remove(&self, file_id: &str) {
        let mut all = self.get_all();
        if all.remove(file_id).is_some() {
            write_json(&self.store, keys::NOTES, &all);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[test]
    fn test_save_overwrites() {
        let notes = NoteStore::new(MemoryStore::new());
        assert_eq!(notes.get("f1"), "");
        notes.save("f1", "hello");
        assert_eq!(notes.get("f1"), "hello");
        notes.save("f1", "");
        assert_eq!(notes.get("f1"), "");
        assert!(notes.get_all().contains_key("f1"));
    }

    #[test]
    fn test_corrupt_data_reads_as_empty() {
        let store = MemoryStore::new();
        store.set(keys::NOTES, "{not json").unwrap();
        let notes = NoteStore::new(store);
        assert!(notes.get_all().is_empty());
        assert_eq!(notes.get("f1"), "");

        notes.save("f1", "recovered");
        assert_eq!(notes.get("f1"), "recovered");
    }

    #[test]
    fn test_stored_layout() {
        let store = MemoryStore::new();
        let notes = NoteStore::new(store.clone());
        let now = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        notes.save_at("f1", "beach", now);

        let raw: serde_json::Value =
            serde_json::from_str(&store.get(keys::NOTES).unwrap().unwrap()).unwrap();
        assert_eq!(raw["f1"]["note"], "beach");
        assert_eq!(raw["f1"]["id"], "f1");
        assert_eq!(raw["f1"]["timestamp"], now.timestamp_millis());

        notes.remove("f1");
        assert!(notes.get_all().is_empty());
    }
}
