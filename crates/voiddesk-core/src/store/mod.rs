//! Persistent key-value store.
//!
//! Holds the user's toggles (auto-save, reveal-on-complete, downloads root)
//! and the download history as JSON values under string keys.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use serde::de::DeserializeOwned;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store encoding: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;
}

/// Reads `key` and decodes it as `T`. A value of the wrong shape is an error.
pub fn get_as<T: DeserializeOwned>(store: &dyn KvStore, key: &str) -> Result<Option<T>, StoreError> {
    match store.get(key)? {
        None | Some(Value::Null) => Ok(None),
        Some(v) => Ok(Some(serde_json::from_value(v)?)),
    }
}

/// Reads a boolean toggle; missing or malformed values yield `default`.
pub fn get_flag(store: &dyn KvStore, key: &str, default: bool) -> bool {
    match get_as::<bool>(store, key) {
        Ok(Some(v)) => v,
        Ok(None) => default,
        Err(e) => {
            tracing::warn!(key, "ignoring malformed setting: {}", e);
            default
        }
    }
}
