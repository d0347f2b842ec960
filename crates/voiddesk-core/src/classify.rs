//! Origin classification: decides what a navigation or link click inside an
//! untrusted surface turns into before it commits.

use serde::{Deserialize, Serialize};

use crate::config::ShellConfig;
use crate::naming::{split_extension, strip_scheme};

/// What to do with a navigation target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disposition {
    /// Load inside the managed surface.
    NavigateInternal,
    /// Hand to the OS default browser.
    NavigateExternal,
    /// Suppress navigation and start a transfer.
    Download,
}

/// Attributes of the clicked element, as reported by the surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkAttributes {
    /// Value of the anchor's `download` attribute. `Some("")` means the
    /// attribute is present without a value.
    #[serde(default)]
    pub download: Option<String>,
}

impl LinkAttributes {
    pub fn with_download(name: impl Into<String>) -> Self {
        Self {
            download: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OriginClassifier {
    trusted_hosts: Vec<String>,
    download_extensions: Vec<String>,
}

impl OriginClassifier {
    /// Hosts and extensions are matched case-insensitively; a leading `.` on
    /// an extension is ignored.
    pub fn new<H, E>(trusted_hosts: H, download_extensions: E) -> Self
    where
        H: IntoIterator,
        H::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        let trusted_hosts = trusted_hosts
            .into_iter()
            .map(|h| normalize_host(h.as_ref()))
            .filter(|h| !h.is_empty())
            .collect();
        let download_extensions = download_extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            trusted_hosts,
            download_extensions,
        }
    }

    pub fn from_config(cfg: &ShellConfig) -> Self {
        Self::new(&cfg.trusted_hosts, &cfg.download_extensions)
    }

    /// Classifies `url`. Download signals take precedence over the host check,
    /// so a file link on a trusted host is still a download. Anything that does
    /// not parse is external.
    pub fn classify(&self, url: &str, attrs: &LinkAttributes) -> Disposition {
        let url = url.trim();
        if strip_scheme(url, "blob:").is_some() || strip_scheme(url, "data:").is_some() {
            return Disposition::Download;
        }
        if attrs.download.is_some() {
            return Disposition::Download;
        }

        let parsed = match url::Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                tracing::debug!(url, "unparseable navigation target: {}", e);
                return Disposition::NavigateExternal;
            }
        };

        if self.has_download_extension(&parsed) {
            return Disposition::Download;
        }
        if let Some(host) = parsed.host_str() {
            if self.is_trusted(host) {
                return Disposition::NavigateInternal;
            }
        }
        Disposition::NavigateExternal
    }

    fn has_download_extension(&self, url: &url::Url) -> bool {
        let Some(last) = url.path_segments().and_then(|mut s| s.next_back()) else {
            return false;
        };
        let (_, ext) = split_extension(last);
        let ext = ext.trim_start_matches('.');
        !ext.is_empty() && self.download_extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }

    /// `host` equals a trusted host or is a subdomain of one.
    pub fn is_trusted(&self, host: &str) -> bool {
        let host = normalize_host(host);
        self.trusted_hosts.iter().any(|trusted| {
            host == *trusted
                || host
                    .strip_suffix(trusted.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

fn normalize_host(host: &str) -> String {
    host.trim().trim_end_matches('.').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> OriginClassifier {
        OriginClassifier::from_config(&ShellConfig::default())
    }

    fn classify(url: &str) -> Disposition {
        classifier().classify(url, &LinkAttributes::default())
    }

    #[test]
    fn blob_and_data_are_downloads() {
        assert_eq!(classify("blob:https://chat.openai.com/0b5e0c4e"), Disposition::Download);
        assert_eq!(classify("data:text/plain,hello"), Disposition::Download);
        assert_eq!(classify("DATA:image/png;base64,AAAA"), Disposition::Download);
    }

    #[test]
    fn download_attribute_wins_over_trusted_host() {
        let attrs = LinkAttributes::with_download("");
        assert_eq!(
            classifier().classify("https://chat.openai.com/c/123", &attrs),
            Disposition::Download
        );
    }

    #[test]
    fn allowlisted_extension_is_download() {
        assert_eq!(classify("https://cdn.example.com/files/report.PDF"), Disposition::Download);
        assert_eq!(classify("https://files.oaiusercontent.com/x/img.webp?se=1"), Disposition::Download);
        assert_eq!(classify("https://chat.openai.com/export.zip"), Disposition::Download);
    }

    #[test]
    fn other_extensions_are_not() {
        assert_eq!(classify("https://example.com/page.html"), Disposition::NavigateExternal);
        assert_eq!(classify("https://example.com/archive.tar.gz"), Disposition::NavigateExternal);
        // Extension must be on the last segment.
        assert_eq!(classify("https://example.com/a.pdf/view"), Disposition::NavigateExternal);
    }

    #[test]
    fn trusted_hosts_and_subdomains_stay_internal() {
        assert_eq!(classify("https://openai.com/"), Disposition::NavigateInternal);
        assert_eq!(classify("https://chat.openai.com/c/abc"), Disposition::NavigateInternal);
        assert_eq!(classify("https://AUTH.OpenAI.com./login"), Disposition::NavigateInternal);
        assert_eq!(classify("https://chatgpt.com/"), Disposition::NavigateInternal);
    }

    #[test]
    fn lookalike_hosts_are_external() {
        assert_eq!(classify("https://evilopenai.com/"), Disposition::NavigateExternal);
        assert_eq!(classify("https://openai.com.evil.net/"), Disposition::NavigateExternal);
        assert_eq!(classify("https://github.com/openai"), Disposition::NavigateExternal);
    }

    #[test]
    fn unparseable_is_external() {
        assert_eq!(classify("not a url"), Disposition::NavigateExternal);
        assert_eq!(classify(""), Disposition::NavigateExternal);
    }

    #[test]
    fn custom_lists() {
        let c = OriginClassifier::new(["Example.org"], [".ISO"]);
        let none = LinkAttributes::default();
        assert_eq!(c.classify("https://www.example.org/", &none), Disposition::NavigateInternal);
        assert_eq!(c.classify("https://mirror.net/debian.iso", &none), Disposition::Download);
        assert_eq!(c.classify("https://openai.com/", &none), Disposition::NavigateExternal);
    }
}
