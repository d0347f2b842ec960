//! Plain GET re-fetch over libcurl.

use std::path::Path;
use std::time::Duration;

use super::{FallbackError, PartFile};
use crate::config::FallbackConfig;

/// Fetches an `http(s)` URL into a file. Blocking.
pub trait Refetch: Send + Sync {
    /// Writes the body of `url` to `dest` and returns the byte count. On error
    /// nothing is left at `dest`.
    fn refetch(&self, url: &str, dest: &Path) -> Result<u64, FallbackError>;
}

/// [`Refetch`] over a fresh curl easy handle per call. Redirects are followed;
/// non-2xx responses are errors.
#[derive(Debug, Clone, Copy)]
pub struct CurlRefetch {
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl Default for CurlRefetch {
    fn default() -> Self {
        Self::from_config(&FallbackConfig::default())
    }
}

impl CurlRefetch {
    pub fn from_config(cfg: &FallbackConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            timeout: Duration::from_secs(cfg.timeout_secs),
        }
    }

    fn fetch_into(&self, url: &str, part: &mut PartFile) -> Result<(), FallbackError> {
        let mut easy = curl::easy::Easy::new();
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(10)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;
        easy.low_speed_limit(1024)?;
        easy.low_speed_time(Duration::from_secs(60))?;

        let mut write_error: Option<std::io::Error> = None;
        let performed = {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| match part.write_chunk(data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    write_error = Some(e);
                    Ok(0) // abort transfer
                }
            })?;
            transfer.perform()
        };
        if let Some(e) = write_error {
            return Err(FallbackError::Io(e));
        }
        performed?;

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FallbackError::Http(code));
        }
        Ok(())
    }
}

impl Refetch for CurlRefetch {
    fn refetch(&self, url: &str, dest: &Path) -> Result<u64, FallbackError> {
        let mut part = PartFile::create(dest)?;
        match self.fetch_into(url, &mut part) {
            Ok(()) => {
                let written = part.finalize(dest)?;
                tracing::debug!(url, bytes = written, "re-fetch written to {}", dest.display());
                Ok(written)
            }
            Err(e) => {
                part.discard();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_from_config() {
        let cfg = FallbackConfig {
            max_attempts: 1,
            connect_timeout_secs: 3,
            timeout_secs: 40,
        };
        let r = CurlRefetch::from_config(&cfg);
        assert_eq!(r.connect_timeout, Duration::from_secs(3));
        assert_eq!(r.timeout, Duration::from_secs(40));
    }

    #[test]
    fn unreachable_host_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a.bin");
        // Bind then drop to get a loopback port nobody listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let r = CurlRefetch {
            connect_timeout: Duration::from_secs(2),
            timeout: Duration::from_secs(5),
        };
        let url = format!("http://127.0.0.1:{port}/a.bin");
        assert!(r.refetch(&url, &dest).is_err());
        assert!(!dest.exists());
        assert!(!crate::fallback::part_path(&dest).exists());
    }
}
