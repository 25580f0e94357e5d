use crate::{keys, read_json, write_json, KeyValueStore};
use std::collections::BTreeSet;

/// A persisted set of file ids (archived or hidden), stored as a JSON array.
#[derive(Clone)]
pub struct FlagSet<S> {
    store: S,
    key: &'static str,
    ids: BTreeSet<String>,
}

impl<S: KeyValueStore> FlagSet<S> {
    pub fn load(store: S, key: &'static str) -> Self {
        let ids: Vec<String> = read_json(&store, key).unwrap_or_default();
        FlagSet {
            store,
            key,
            ids: ids.into_iter().collect(),
        }
    }

    pub fn archived(store: S) -> Self {
        Self::load(store, keys::ARCHIVED)
    }

    pub fn hidden(store: S) -> Self {
        Self::load(store, keys::HIDDEN)
    }

    pub fn contains(&self, file_id: &str) -> bool {
        self.ids.contains(file_id)
    }

    /// Flip membership and return the new state.
    pub fn toggle(&mut self, file_id: &str) -> bool {
        let member = if self.ids.remove(file_id) {
            false
        } else {
            self.ids.insert(file_id.to_string());
            true
        };
        self.persist();
        member
    }

    pub fn insert(&mut self, file_id: &str) {
        if self.ids.insert(file_id.to_string()) {
            self.persist();
        }
    }

    pub fn remove(&mut self, file_id: &str) {
        if self.ids.remove(file_id) {
            self.persist();
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn persist(&self) {
        let ids: Vec<&String> = self.ids.iter().collect();
        write_json(&self.store, self.key, &ids);
    }
}
