//! Bounded download history, newest first, persisted in the settings store.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::store::{get_as, KvStore, StoreError};
use crate::transfer::TransferState;

pub const HISTORY_KEY: &str = "downloads.history";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub filename: String,
    pub absolute_path: PathBuf,
    pub source_url: String,
    /// Unix milliseconds.
    pub completed_at: i64,
    pub final_state: TransferState,
}

/// Losing history never blocks a finished download; callers log this and move on.
#[derive(Debug, thiserror::Error)]
#[error("history write skipped: {0}")]
pub struct HistoryWriteSkipped(#[from] pub StoreError);

pub struct HistoryStore {
    store: Arc<dyn KvStore>,
    max_entries: usize,
    // Serializes read-modify-write cycles of the stored list.
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KvStore>, max_entries: usize) -> Self {
        Self {
            store,
            max_entries,
            write_lock: Mutex::new(()),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Current entries, newest first. A stored list of the wrong shape reads
    /// as empty (and is replaced by the next append).
    pub fn entries(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let mut entries = match get_as::<Vec<HistoryEntry>>(self.store.as_ref(), HISTORY_KEY) {
            Ok(v) => v.unwrap_or_default(),
            Err(StoreError::Json(e)) => {
                tracing::warn!("discarding unreadable download history: {}", e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        entries.truncate(self.max_entries);
        Ok(entries)
    }

    /// Prepends `entry`, evicting the oldest entries beyond the bound.
    pub fn append(&self, entry: HistoryEntry) -> Result<(), HistoryWriteSkipped> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut entries = self.entries()?;
        entries.insert(0, entry);
        entries.truncate(self.max_entries);
        let value = serde_json::to_value(&entries).map_err(StoreError::from)?;
        self.store.set(HISTORY_KEY, value)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.store.set(HISTORY_KEY, serde_json::Value::Array(Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn entry(n: usize) -> HistoryEntry {
        HistoryEntry {
            filename: format!("file-{n}.bin"),
            absolute_path: PathBuf::from(format!("/dl/file-{n}.bin")),
            source_url: format!("https://example.com/file-{n}.bin"),
            completed_at: n as i64,
            final_state: TransferState::Completed,
        }
    }

    #[test]
    fn newest_first() {
        let history = HistoryStore::new(Arc::new(MemoryStore::new()), 10);
        history.append(entry(1)).unwrap();
        history.append(entry(2)).unwrap();
        let names: Vec<_> = history.entries().unwrap().into_iter().map(|e| e.filename).collect();
        assert_eq!(names, vec!["file-2.bin", "file-1.bin"]);
    }

    #[test]
    fn bound_evicts_oldest() {
        let history = HistoryStore::new(Arc::new(MemoryStore::new()), 3);
        for n in 0..10 {
            history.append(entry(n)).unwrap();
            assert!(history.entries().unwrap().len() <= 3);
        }
        let stamps: Vec<_> = history.entries().unwrap().into_iter().map(|e| e.completed_at).collect();
        assert_eq!(stamps, vec![9, 8, 7]);
    }

    #[test]
    fn persisted_under_history_key_in_camel_case() {
        let store = Arc::new(MemoryStore::new());
        let history = HistoryStore::new(store.clone(), 5);
        history.append(entry(1)).unwrap();
        let raw = store.get(HISTORY_KEY).unwrap().unwrap();
        assert_eq!(raw[0]["absolutePath"], json!("/dl/file-1.bin"));
        assert_eq!(raw[0]["finalState"], json!("completed"));
    }

    #[test]
    fn oversized_stored_list_is_trimmed_on_read() {
        let store = Arc::new(MemoryStore::new());
        let list: Vec<_> = (0..8).map(entry).collect();
        store.set(HISTORY_KEY, serde_json::to_value(&list).unwrap()).unwrap();
        let history = HistoryStore::new(store, 4);
        assert_eq!(history.entries().unwrap().len(), 4);
    }

    #[test]
    fn garbage_is_replaced_by_next_append() {
        let store = Arc::new(MemoryStore::new());
        store.set(HISTORY_KEY, json!({"not": "a list"})).unwrap();
        let history = HistoryStore::new(store, 4);
        assert!(history.entries().unwrap().is_empty());
        history.append(entry(1)).unwrap();
        assert_eq!(history.entries().unwrap().len(), 1);
    }

    #[test]
    fn clear_empties() {
        let history = HistoryStore::new(Arc::new(MemoryStore::new()), 4);
        history.append(entry(1)).unwrap();
        history.clear().unwrap();
        assert!(history.entries().unwrap().is_empty());
    }
}
