//! Local persistent state for the gallery: notes, archive and hidden flags,
//! and the last-login marker, kept in a small key-value store.

mod flags;
mod last_login;
mod memory;
mod notes;
mod sqlite;

pub use flags::FlagSet;
pub use last_login::{LastLogin, AUTO_REDIRECT_WINDOW_HOURS};
pub use memory::MemoryStore;
pub use notes::{Note, NoteStore};
pub use sqlite::SqliteStore;

use thiserror::Error;

/// Fixed keys, shared with the web dashboard's local storage layout.
pub mod keys {
    pub const NOTES: &str = "photoNotes";
    pub const ARCHIVED: &str = "archivedFiles";
    pub const HIDDEN: &str = "hiddenFiles";
    pub const LAST_LOGIN: &str = "lastLoginTime";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database Error: {0}")]
    DatabaseError(String),
    #[error("Serialization Error: {0}")]
    SerializationError(String),
    #[error("Other Error: {0}")]
    Other(String),
}

/// String-keyed, string-valued persistent storage.
pub trait KeyValueStore: Clone + Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Read and parse a JSON value, treating any failure as absent.
pub(crate) fn read_json<S, T>(store: &S, key: &str) -> Option<T>
where
    S: KeyValueStore,
    T: serde::de::DeserializeOwned,
{
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(e) => {
            tracing::warn!(key, error = %e, "Failed to read local state");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(key, error = %e, "Discarding corrupt local state");
            None
        }
    }
}

/// Serialize and write a JSON value. Failures are logged, not returned.
pub(crate) fn write_json<S, T>(store: &S, key: &str, value: &T)
where
    S: KeyValueStore,
    T: serde::Serialize,
{
    let result = serde_json::to_string(value)
        .map_err(|e| StoreError::SerializationError(e.to_string()))
        .and_then(|raw| store.set(key, &raw));
    if let Err(e) = result {
        tracing::error!(key, error = %e, "Failed to persist local state");
    }
}
