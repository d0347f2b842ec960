//! Pre-commit navigation hook and "Save as…".

use super::Coordinator;
use crate::classify::{Disposition, LinkAttributes};
use crate::transfer::{SurfaceId, TransferRequest};

/// What the host does with a navigation or popup it is about to commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationVerdict {
    /// Let it load inside the surface.
    Allow,
    /// Already handed to the OS; block it in the surface.
    OpenExternal,
    /// Block it; the target is not something the shell opens anywhere.
    Deny,
    /// Block it and start this transfer instead.
    Download(TransferRequest),
}

/// Schemes handed to the OS default handler.
const EXTERNAL_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

impl Coordinator {
    /// Classifies a navigation from `surface` before it commits.
    pub fn on_navigation(
        &self,
        surface: &SurfaceId,
        url: &str,
        attrs: &LinkAttributes,
    ) -> NavigationVerdict {
        match self.inner.classifier.classify(url, attrs) {
            Disposition::NavigateInternal => NavigationVerdict::Allow,
            Disposition::Download => {
                tracing::debug!(%surface, url, "navigation turned into download");
                NavigationVerdict::Download(download_request(surface, url, attrs.download.as_deref()))
            }
            Disposition::NavigateExternal => {
                let allowed = url::Url::parse(url.trim())
                    .map(|u| EXTERNAL_SCHEMES.contains(&u.scheme()))
                    .unwrap_or(false);
                if !allowed {
                    tracing::warn!(%surface, url, "blocked navigation to unsupported scheme");
                    return NavigationVerdict::Deny;
                }
                if let Err(e) = self.inner.host.desktop.open_external(url.trim()) {
                    tracing::warn!(url, "open in external browser failed: {:#}", e);
                }
                NavigationVerdict::OpenExternal
            }
        }
    }

    /// "Save as…" on a link: the transfer the host starts for `url` from this
    /// surface will ask for a save path, whatever the auto-save setting.
    pub fn request_save_as(
        &self,
        surface: &SurfaceId,
        url: &str,
        suggested_name: Option<&str>,
    ) -> TransferRequest {
        self.inner.lock().force_ask.mark(surface, url);
        download_request(surface, url, suggested_name)
    }
}

fn download_request(surface: &SurfaceId, url: &str, suggested: Option<&str>) -> TransferRequest {
    TransferRequest::from_host(surface.clone(), url, suggested, None)
}
