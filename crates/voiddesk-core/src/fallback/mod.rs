//! Bounded re-fetch after the host's own transfer failed.
//!
//! The host transport occasionally drops a transfer (expired blob, renderer
//! crash mid-stream). When the target never reached the disk and the source is
//! still reachable from the privileged side, one fresh fetch is attempted:
//! `http(s)` through [`CurlRefetch`], `data:` by decoding the URL itself.

mod data_url;
mod fetch;
mod part;

pub use data_url::decode_data_url;
pub use fetch::{CurlRefetch, Refetch};
pub use part::{part_path, PartFile, PART_SUFFIX};

use std::path::Path;

use crate::config::FallbackConfig;
use crate::naming::strip_scheme;

#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error("source cannot be re-fetched: {0}")]
    Unsupported(String),
    #[error("curl: {0}")]
    Curl(#[from] curl::Error),
    #[error("HTTP {0}")]
    Http(u32),
    #[error("write: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed data URL: {0}")]
    DataUrl(String),
}

/// Facts about a failed transfer that decide whether to re-fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureContext {
    /// Re-fetches already made for this transfer.
    pub attempts_made: u32,
    pub target_exists: bool,
    pub refetchable_source: bool,
    /// The owning surface went away.
    pub orphaned: bool,
    /// The user cancelled; a re-fetch would override their choice.
    pub user_cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    Exhausted,
    TargetExists,
    UnsupportedSource,
    Orphaned,
    UserCancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackDecision {
    Attempt,
    GiveUp(GiveUpReason),
}

/// At most one re-fetch per transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub max_attempts: u32,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self { max_attempts: 1 }
    }
}

impl FallbackPolicy {
    pub fn from_config(cfg: &FallbackConfig) -> Self {
        if cfg.max_attempts > 1 {
            tracing::debug!(configured = cfg.max_attempts, "clamping fallback attempts to 1");
        }
        Self {
            max_attempts: cfg.max_attempts.min(1),
        }
    }

    pub fn decide(&self, ctx: &FailureContext) -> FallbackDecision {
        use GiveUpReason::*;
        let reason = if ctx.user_cancelled {
            UserCancelled
        } else if ctx.orphaned {
            Orphaned
        } else if ctx.attempts_made >= self.max_attempts {
            Exhausted
        } else if ctx.target_exists {
            TargetExists
        } else if !ctx.refetchable_source {
            UnsupportedSource
        } else {
            return FallbackDecision::Attempt;
        };
        FallbackDecision::GiveUp(reason)
    }
}

/// `http`, `https` and `data:` sources can be fetched again from the privileged side.
pub fn is_refetchable(url: &str) -> bool {
    let url = url.trim();
    if strip_scheme(url, "data:").is_some() {
        return true;
    }
    url::Url::parse(url)
        .map(|u| matches!(u.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Fetches `url` into `dest`. Returns the number of bytes written.
///
/// Blocking; run it on `spawn_blocking`.
pub fn run_fallback(refetch: &dyn Refetch, url: &str, dest: &Path) -> Result<u64, FallbackError> {
    let url = url.trim();
    if strip_scheme(url, "data:").is_some() {
        let bytes = decode_data_url(url)?;
        return write_decoded(&bytes, dest);
    }
    if !is_refetchable(url) {
        return Err(FallbackError::Unsupported(url.to_string()));
    }
    refetch.refetch(url, dest)
}

fn write_decoded(bytes: &[u8], dest: &Path) -> Result<u64, FallbackError> {
    let mut part = PartFile::create(dest)?;
    if let Err(e) = part.write_chunk(bytes) {
        part.discard();
        return Err(e.into());
    }
    Ok(part.finalize(dest)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> FailureContext {
        FailureContext {
            attempts_made: 0,
            target_exists: false,
            refetchable_source: true,
            orphaned: false,
            user_cancelled: false,
        }
    }

    #[test]
    fn one_attempt_then_give_up() {
        let p = FallbackPolicy::default();
        assert_eq!(p.decide(&ctx()), FallbackDecision::Attempt);
        let again = FailureContext { attempts_made: 1, ..ctx() };
        assert_eq!(p.decide(&again), FallbackDecision::GiveUp(GiveUpReason::Exhausted));
    }

    #[test]
    fn config_cannot_raise_the_bound() {
        let cfg = FallbackConfig {
            max_attempts: 5,
            ..FallbackConfig::default()
        };
        assert_eq!(FallbackPolicy::from_config(&cfg).max_attempts, 1);
        let off = FallbackConfig {
            max_attempts: 0,
            ..FallbackConfig::default()
        };
        let p = FallbackPolicy::from_config(&off);
        assert_eq!(p.decide(&ctx()), FallbackDecision::GiveUp(GiveUpReason::Exhausted));
    }

    #[test]
    fn blockers() {
        let p = FallbackPolicy::default();
        let cases = [
            (FailureContext { target_exists: true, ..ctx() }, GiveUpReason::TargetExists),
            (FailureContext { refetchable_source: false, ..ctx() }, GiveUpReason::UnsupportedSource),
            (FailureContext { orphaned: true, ..ctx() }, GiveUpReason::Orphaned),
            (FailureContext { user_cancelled: true, ..ctx() }, GiveUpReason::UserCancelled),
        ];
        for (c, reason) in cases {
            assert_eq!(p.decide(&c), FallbackDecision::GiveUp(reason), "{c:?}");
        }
    }

    #[test]
    fn refetchable_schemes() {
        assert!(is_refetchable("https://files.example.com/a.pdf"));
        assert!(is_refetchable("http://localhost:8080/a"));
        assert!(is_refetchable("data:text/plain,hi"));
        assert!(!is_refetchable("blob:https://chat.openai.com/abc"));
        assert!(!is_refetchable("file:///etc/passwd"));
        assert!(!is_refetchable("ftp://example.com/a"));
        assert!(!is_refetchable("garbage"));
    }

    struct NoNetwork;

    impl Refetch for NoNetwork {
        fn refetch(&self, url: &str, _dest: &Path) -> Result<u64, FallbackError> {
            panic!("unexpected network fetch of {url}");
        }
    }

    #[test]
    fn data_url_is_written_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("hello.txt");
        let n = run_fallback(&NoNetwork, "data:text/plain;base64,aGVsbG8=", &dest).unwrap();
        assert_eq!(n, 5);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello");
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn unwritable_data_target_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing-dir").join("hello.txt");
        let err = run_fallback(&NoNetwork, "data:text/plain,hello", &dest).unwrap_err();
        assert!(matches!(err, FallbackError::Io(_)));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn malformed_data_url_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("x.bin");
        let err = run_fallback(&NoNetwork, "data:;base64,!!!", &dest).unwrap_err();
        assert!(matches!(err, FallbackError::DataUrl(_)));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn blob_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_fallback(
            &NoNetwork,
            "blob:https://chat.openai.com/abc",
            &dir.path().join("x"),
        )
        .unwrap_err();
        assert!(matches!(err, FallbackError::Unsupported(_)));
    }
}
