//! Download preferences stored in the settings store.
//!
//! Read fresh for every transfer so a toggle flipped in the UI applies to the
//! next download without a restart.

use std::path::PathBuf;

use crate::store::{get_as, get_flag, KvStore};

pub const ALWAYS_ASK_KEY: &str = "downloads.alwaysAsk";
pub const REVEAL_ON_COMPLETE_KEY: &str = "downloads.revealOnComplete";
pub const NOTIFY_ON_COMPLETE_KEY: &str = "downloads.notifyOnComplete";
pub const ROOT_KEY: &str = "downloads.root";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPrefs {
    /// Prompt for a save path on every download instead of auto-saving.
    pub always_ask: bool,
    pub reveal_on_complete: bool,
    pub notify_on_complete: bool,
    /// Downloads root; every save path is confined underneath it.
    pub root: PathBuf,
}

impl DownloadPrefs {
    /// Reads the preferences, falling back to defaults for anything missing
    /// or malformed.
    pub fn load(store: &dyn KvStore) -> Self {
        Self {
            always_ask: get_flag(store, ALWAYS_ASK_KEY, false),
            reveal_on_complete: get_flag(store, REVEAL_ON_COMPLETE_KEY, false),
            notify_on_complete: get_flag(store, NOTIFY_ON_COMPLETE_KEY, true),
            root: root_override(store).unwrap_or_else(default_root),
        }
    }
}

fn root_override(store: &dyn KvStore) -> Option<PathBuf> {
    let raw = match get_as::<String>(store, ROOT_KEY) {
        Ok(v) => v?,
        Err(e) => {
            tracing::warn!("ignoring malformed {}: {}", ROOT_KEY, e);
            return None;
        }
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let path = PathBuf::from(raw);
    if !path.is_absolute() {
        tracing::warn!(root = %path.display(), "downloads root override is not absolute, ignoring");
        return None;
    }
    Some(path)
}

/// The user's download directory (`XDG_DOWNLOAD_DIR`), else `~/Downloads`.
pub fn default_root() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| std::env::temp_dir().join("voiddesk-downloads"))
}
