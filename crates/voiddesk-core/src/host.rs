//! Capabilities the embedding shell provides to the core.
//!
//! The embedded-browser host, the OS desktop and the file system are external
//! collaborators. The core only sees them through these traits so it can be
//! driven by the real shell or by test doubles.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::transfer::SurfaceId;

/// The host released its native transfer object (surface closed, session torn down).
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("transfer handle already released")]
pub struct HandleReleased;

/// Accessors on the host's in-flight transfer object. Every call may race
/// with the owning surface being destroyed.
pub trait TransferHandle: Send + Sync {
    /// Fills the host's destination slot. Must be called before the transport writes.
    fn set_save_path(&self, path: &Path) -> Result<(), HandleReleased>;
    /// Asks the transport to stop.
    fn cancel(&self) -> Result<(), HandleReleased>;
}

/// Native save dialog. Blocking; the coordinator calls it off the async runtime.
pub trait SaveDialog: Send + Sync {
    /// Returns the chosen path, or `None` if the user dismissed the dialog.
    fn ask(&self, surface: &SurfaceId, suggested: &Path) -> Option<PathBuf>;
}

/// OS integration: external browser, file manager, notifications.
pub trait DesktopShell: Send + Sync {
    fn open_external(&self, url: &str) -> Result<()>;
    fn reveal_in_folder(&self, path: &Path) -> Result<()>;
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// File-system lookups used by target resolution and the fallback policy.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        // symlink_metadata so a dangling symlink still counts as taken.
        path.symlink_metadata().is_ok()
    }
}

/// [`DesktopShell`] for freedesktop.org desktops (`xdg-open`, `notify-send`).
#[derive(Debug, Clone, Copy, Default)]
pub struct XdgDesktop;

impl XdgDesktop {
    /// Runs `program` without waiting for it. A short-lived thread reaps the
    /// child so it does not linger as a zombie.
    fn spawn_detached(program: &str, args: &[&str]) -> Result<()> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        let name = program.to_string();
        std::thread::Builder::new()
            .name(format!("reap-{program}"))
            .spawn(move || match child.wait() {
                Ok(status) if !status.success() => {
                    tracing::debug!(program = %name, %status, "desktop helper exited");
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(program = %name, "wait on desktop helper failed: {}", e),
            })
            .with_context(|| format!("failed to start reaper for {program}"))?;
        Ok(())
    }
}

impl DesktopShell for XdgDesktop {
    fn open_external(&self, url: &str) -> Result<()> {
        Self::spawn_detached("xdg-open", &[url])
    }

    fn reveal_in_folder(&self, path: &Path) -> Result<()> {
        // xdg-open cannot select a file; open its directory instead.
        let dir = path.parent().unwrap_or(path);
        let dir = dir
            .to_str()
            .with_context(|| format!("non-UTF-8 path: {}", dir.display()))?;
        Self::spawn_detached("xdg-open", &[dir])
    }

    fn notify(&self, title: &str, body: &str) -> Result<()> {
        Self::spawn_detached("notify-send", &["--app-name=VoidDesk", title, body])
    }
}
