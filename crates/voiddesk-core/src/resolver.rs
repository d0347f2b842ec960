//! Download target resolution: sanitize, confine, then avoid collisions.
//!
//! Collision avoidance is check-then-create and therefore not atomic: two
//! transfers proposing the same name at the same instant can both pick the
//! same free path, and the last writer wins. This is an accepted limitation.

use std::path::{Path, PathBuf};

use crate::confine::{confine, PathEscapeError};
use crate::host::FileSystem;
use crate::naming::{sanitize_outcome, with_suffix, DEFAULT_FILENAME};
use crate::transfer::ResolvedTarget;

/// Probes of `" (N)"` suffixes before giving up on a name.
const MAX_DISAMBIGUATION_PROBES: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The downloads root itself is unusable. Fatal: nothing can be saved.
    #[error("invalid downloads root: {}", .0.display())]
    InvalidRoot(PathBuf),
    /// Even the generic fallback name has no free slot left.
    #[error("no free filename left in {}", .0.display())]
    NoFreeName(PathBuf),
}

/// Picks the save path for `proposed_name` inside `base_dir`.
///
/// `report.pdf` becomes `report (1).pdf`, `report (2).pdf`, … while the
/// candidate exists. Names that cannot be confined fall back to
/// [`DEFAULT_FILENAME`] inside `base_dir`.
pub fn resolve(
    base_dir: &Path,
    proposed_name: &str,
    fs: &dyn FileSystem,
) -> Result<ResolvedTarget, ResolveError> {
    if !base_dir.is_absolute() {
        return Err(ResolveError::InvalidRoot(base_dir.to_path_buf()));
    }

    let sanitized = sanitize_outcome(proposed_name, DEFAULT_FILENAME);
    match pick_free(base_dir, &sanitized.name, fs) {
        Ok(path) => Ok(ResolvedTarget::from_path(path)),
        Err(e) => {
            tracing::warn!(proposed = proposed_name, "falling back to generic filename: {}", e);
            pick_free(base_dir, DEFAULT_FILENAME, fs)
                .map(ResolvedTarget::from_path)
                .map_err(|e| match e {
                    PickError::Escape(_) => ResolveError::InvalidRoot(base_dir.to_path_buf()),
                    PickError::Exhausted(_) => ResolveError::NoFreeName(base_dir.to_path_buf()),
                })
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum PickError {
    #[error(transparent)]
    Escape(#[from] PathEscapeError),
    #[error("no free name after {0} probes")]
    Exhausted(u32),
}

fn pick_free(base_dir: &Path, name: &str, fs: &dyn FileSystem) -> Result<PathBuf, PickError> {
    let first = confine(base_dir, name)?;
    if !fs.exists(&first) {
        return Ok(first);
    }

    for n in 1..=MAX_DISAMBIGUATION_PROBES {
        let candidate = confine(base_dir, with_suffix(name, &format!(" ({n})")))?;
        if !fs.exists(&candidate) {
            return Ok(candidate);
        }
    }
    Err(PickError::Exhausted(MAX_DISAMBIGUATION_PROBES))
}
