//! Path confinement: keep every save path inside the downloads root.
//!
//! Resolution is purely lexical. `.` and `..` are folded without touching the
//! file system, and containment is checked per path component, so
//! `/home/me/Downloads` never matches `/home/me/DownloadsEVIL`.

use std::path::{Component, Path, PathBuf};

/// Rejection from [`confine`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathEscapeError {
    /// The base directory itself is unusable (relative or empty).
    #[error("downloads root must be an absolute path: {}", .0.display())]
    InvalidBase(PathBuf),
    /// The candidate resolves outside the base directory.
    #[error("path escapes downloads root: {candidate}")]
    Escapes { candidate: String },
}

/// Resolves `candidate` against `base_dir` and checks it stays inside.
///
/// Returns the normalized absolute path when it equals `base_dir` or lies
/// underneath it. An absolute `candidate` is accepted only if it already
/// points inside `base_dir`.
pub fn confine(base_dir: &Path, candidate: impl AsRef<Path>) -> Result<PathBuf, PathEscapeError> {
    if !base_dir.is_absolute() {
        return Err(PathEscapeError::InvalidBase(base_dir.to_path_buf()));
    }
    let candidate = candidate.as_ref();
    let base = normalize(base_dir);
    let resolved = normalize(&base.join(candidate));
    if resolved.starts_with(&base) {
        Ok(resolved)
    } else {
        Err(PathEscapeError::Escapes {
            candidate: candidate.display().to_string(),
        })
    }
}

/// Lexically folds `.` and `..`. `..` never climbs above the root.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PathBuf {
        PathBuf::from("/home/me/Downloads")
    }

    #[test]
    fn plain_name_lands_under_base() {
        assert_eq!(
            confine(&base(), "report.pdf").unwrap(),
            PathBuf::from("/home/me/Downloads/report.pdf")
        );
    }

    #[test]
    fn dot_segments_are_folded() {
        assert_eq!(
            confine(&base(), "./a/../b/./c.txt").unwrap(),
            PathBuf::from("/home/me/Downloads/b/c.txt")
        );
        assert_eq!(confine(&base(), "sub/..").unwrap(), base());
        assert_eq!(confine(&base(), "").unwrap(), base());
    }

    #[test]
    fn traversal_is_rejected() {
        assert!(matches!(
            confine(&base(), "../../etc/passwd"),
            Err(PathEscapeError::Escapes { .. })
        ));
        assert!(matches!(
            confine(&base(), "a/../../x"),
            Err(PathEscapeError::Escapes { .. })
        ));
    }

    #[test]
    fn sibling_with_common_prefix_is_rejected() {
        assert!(confine(&base(), "../DownloadsEVIL/x").is_err());
        assert!(confine(&base(), "/home/me/DownloadsEVIL/x").is_err());
    }

    #[test]
    fn absolute_candidate_inside_base_is_accepted() {
        assert_eq!(
            confine(&base(), "/home/me/Downloads/./x/y.bin").unwrap(),
            PathBuf::from("/home/me/Downloads/x/y.bin")
        );
        assert!(confine(&base(), "/etc/passwd").is_err());
    }

    #[test]
    fn unnormalized_base_still_confines() {
        let messy = PathBuf::from("/home/me/./tmp/../Downloads/");
        assert_eq!(
            confine(&messy, "f.txt").unwrap(),
            PathBuf::from("/home/me/Downloads/f.txt")
        );
    }

    #[test]
    fn relative_base_is_invalid() {
        assert!(matches!(
            confine(Path::new("Downloads"), "f.txt"),
            Err(PathEscapeError::InvalidBase(_))
        ));
    }

    #[test]
    fn results_always_stay_under_base() {
        let candidates = [
            "..", "../..", "/", "a/b/../../..", "./../Downloads/x", "x/../../Downloads/y",
            "....", "a/./././../b", "/home/me/Downloads/../Downloads/z",
        ];
        for candidate in candidates {
            if let Ok(p) = confine(&base(), candidate) {
                assert!(p.starts_with(base()), "{candidate} resolved to {}", p.display());
            }
        }
    }
}
