//! Host doubles that record what the coordinator asked of them.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use voiddesk_core::host::{DesktopShell, HandleReleased, SaveDialog, TransferHandle};
use voiddesk_core::transfer::SurfaceId;

#[derive(Default)]
pub struct RecordingHandle {
    pub save_path: Mutex<Option<PathBuf>>,
}

impl TransferHandle for RecordingHandle {
    fn set_save_path(&self, path: &Path) -> Result<(), HandleReleased> {
        *self.save_path.lock().unwrap() = Some(path.to_path_buf());
        Ok(())
    }

    fn cancel(&self) -> Result<(), HandleReleased> {
        Ok(())
    }
}

/// Dialog that must never be shown.
pub struct NoDialog;

impl SaveDialog for NoDialog {
    fn ask(&self, surface: &SurfaceId, suggested: &Path) -> Option<PathBuf> {
        panic!("unexpected save dialog on {surface} for {}", suggested.display());
    }
}

#[derive(Default)]
pub struct QuietDesktop {
    pub notified: Mutex<Vec<String>>,
}

impl DesktopShell for QuietDesktop {
    fn open_external(&self, _url: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn reveal_in_folder(&self, _path: &Path) -> anyhow::Result<()> {
        Ok(())
    }

    fn notify(&self, _title: &str, body: &str) -> anyhow::Result<()> {
        self.notified.lock().unwrap().push(body.to_string());
        Ok(())
    }
}
