//! JSON document store under the XDG config dir (`~/.config/voiddesk/voiddesk.json`).

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{KvStore, StoreError};

/// [`KvStore`] persisted as a single JSON object. Every `set` rewrites the
/// file through a temp file + rename so a crash never leaves half a document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    doc: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    /// Default location: `~/.config/voiddesk/voiddesk.json`.
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("voiddesk")?;
        Ok(xdg_dirs.get_config_home().join("voiddesk").join("voiddesk.json"))
    }

    /// Opens the store at `path`. A missing file is an empty store; a corrupt
    /// one is an error so the caller decides whether to discard it.
    pub fn open(path: &Path) -> Result<Self> {
        let doc = match std::fs::read(path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Map::new(),
            Ok(bytes) => serde_json::from_slice::<Map<String, Value>>(&bytes)
                .with_context(|| format!("parse settings store: {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("read settings store: {}", path.display()))
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            doc: Mutex::new(doc),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(&Self::default_path()?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, doc: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(doc)?;
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KvStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let doc = self.doc.lock().unwrap_or_else(|e| e.into_inner());
        Ok(doc.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let mut doc = self.doc.lock().unwrap_or_else(|e| e.into_inner());
        let previous = doc.insert(key.to_string(), value);
        if let Err(e) = self.persist(&doc) {
            // Keep memory and disk in agreement.
            match previous {
                Some(v) => doc.insert(key.to_string(), v),
                None => doc.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}
