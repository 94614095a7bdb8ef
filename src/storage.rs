//! Key-value storage port.
//!
//! Every piece of library state is a JSON blob stored under one of four fixed
//! keys. Operations never keep a private copy between calls: they load the
//! whole collection, mutate it in memory and write the whole collection back.
//!
//! The [`KeyValueStore`] trait is the seam between that logic and the actual
//! backend. Production code uses the LMDB-backed
//! [`AppDbState`](crate::local_db_state::AppDbState); tests use
//! [`InMemoryStore`].

use std::collections::HashMap;

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::error::LibraryResult;

/// Key of the books collection.
pub const BOOKS_KEY: &str = "lms_books";
/// Key of the members collection.
pub const MEMBERS_KEY: &str = "lms_members";
/// Key of the circulation collection.
pub const CIRCULATION_KEY: &str = "lms_circulation";
/// Key of the identifier counters record.
pub const NEXT_IDS_KEY: &str = "lms_next_ids";

/// All keys owned by the library, in the order they are written on import.
pub const ALL_KEYS: [&str; 4] = [BOOKS_KEY, MEMBERS_KEY, CIRCULATION_KEY, NEXT_IDS_KEY];

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend rejected the operation.
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Filesystem failure while preparing the backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value is not valid UTF-8.
    #[error("stored value for '{0}' is not valid UTF-8")]
    Encoding(String),
}

impl From<lmdb::Error> for StorageError {
    fn from(err: lmdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Minimal key-value interface the library needs from its host.
pub trait KeyValueStore {
    /// Returns the raw value stored under `key`, if any.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;

    /// Removes `key`. Returns whether a value was present.
    fn delete(&mut self, key: &str) -> StorageResult<bool>;

    /// Returns whether `key` holds a value.
    fn contains(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Volatile store used by tests and by hosts that manage persistence themselves.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    data: HashMap<String, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> StorageResult<bool> {
        Ok(self.data.remove(key).is_some())
    }
}

/// Loads a JSON array stored under `key`. A missing key reads as empty.
pub fn load_collection<T, S>(store: &S, key: &str) -> LibraryResult<Vec<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(json) => {
            let items: Vec<T> = serde_json::from_str(&json)?;
            debug!("Loaded {} records from '{}'", items.len(), key);
            Ok(items)
        }
        None => Ok(Vec::new()),
    }
}

/// Serializes `items` and overwrites the blob under `key`.
pub fn save_collection<T, S>(store: &mut S, key: &str, items: &[T]) -> LibraryResult<()>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let json = serde_json::to_string(items)?;
    store.set(key, &json)?;
    Ok(())
}

/// Loads a single JSON record stored under `key`.
pub fn load_record<T, S>(store: &S, key: &str) -> LibraryResult<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Serializes `record` and overwrites the blob under `key`.
pub fn save_record<T, S>(store: &mut S, key: &str, record: &T) -> LibraryResult<()>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let json = serde_json::to_string(record)?;
    store.set(key, &json)?;
    Ok(())
}
