//! Filename derivation and sanitization.
//!
//! A transfer's proposed name comes from the page (the anchor's `download`
//! attribute or the host's suggestion), the `Content-Disposition` header, or
//! the URL. Whatever is proposed is untrusted and goes through [`sanitize`]
//! before it gets anywhere near the file system.

mod content_disposition;
mod sanitize;
mod url_hint;

pub use content_disposition::filename_from_content_disposition;
pub use sanitize::{sanitize, sanitize_outcome, Sanitized, MAX_FILENAME_CHARS};
pub use url_hint::{filename_from_data_url, filename_from_url};

pub(crate) use sanitize::{split_extension, with_suffix};
pub(crate) use url_hint::strip_scheme;

/// Generic name used whenever nothing better can be derived.
pub const DEFAULT_FILENAME: &str = "download";

/// Picks the raw (unsanitized) proposed name for a transfer.
///
/// Preference order: explicit suggestion, `Content-Disposition`, `data:` media
/// type, URL path, then [`DEFAULT_FILENAME`].
///
/// # Examples
///
/// - `proposed_name("https://example.com/files/a.zip", None, None)` → `"a.zip"`
/// - `proposed_name("https://example.com/x", Some("notes.md"), None)` → `"notes.md"`
pub fn proposed_name(
    url: &str,
    suggested: Option<&str>,
    content_disposition: Option<&str>,
) -> String {
    suggested
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| content_disposition.and_then(filename_from_content_disposition))
        .or_else(|| filename_from_data_url(url, DEFAULT_FILENAME))
        .or_else(|| filename_from_url(url))
        .unwrap_or_else(|| DEFAULT_FILENAME.to_string())
}
