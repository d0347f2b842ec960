//! Filename sanitization for names proposed by untrusted pages.

/// Upper bound on a sanitized filename, in characters.
pub const MAX_FILENAME_CHARS: usize = 120;

/// Characters rejected on at least one desktop platform.
const RESERVED: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

/// Name used when both the proposed name and the caller's fallback are unusable.
const LAST_RESORT: &str = "download";

/// Result of sanitizing a proposed name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sanitized {
    pub name: String,
    /// True when the proposed name was unusable and the fallback was substituted.
    pub used_fallback: bool,
}

/// Turns an untrusted proposed name into a safe on-disk basename.
///
/// - keeps only the final path segment (`/` and `\` both separate)
/// - drops ASCII control characters and `< > : " | ? *`
/// - trims leading/trailing dots and whitespace
/// - returns `fallback` when nothing is left
/// - caps the result at [`MAX_FILENAME_CHARS`], shortening the stem so the
///   extension survives
///
/// # Examples
///
/// - `sanitize("../../etc/passwd", "download")` → `"passwd"`
/// - `sanitize("  ...  ", "download")` → `"download"`
pub fn sanitize(name: &str, fallback: &str) -> String {
    sanitize_outcome(name, fallback).name
}

/// Like [`sanitize`], but also reports whether the fallback was used.
pub fn sanitize_outcome(name: &str, fallback: &str) -> Sanitized {
    if let Some(clean) = clean(name) {
        return Sanitized {
            name: clean,
            used_fallback: false,
        };
    }
    // The fallback obeys the same rules as the proposed name.
    let name = clean(fallback).unwrap_or_else(|| LAST_RESORT.to_string());
    tracing::debug!(fallback = %name, "proposed filename unusable, substituting fallback");
    Sanitized {
        name,
        used_fallback: true,
    }
}

fn clean(name: &str) -> Option<String> {
    let last = name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or_default();
    let kept: String = last.chars().filter(|c| !is_forbidden(*c)).collect();
    let trimmed = trim_edges(&kept);
    if trimmed.is_empty() {
        return None;
    }
    Some(truncate_keeping_extension(trimmed, MAX_FILENAME_CHARS))
}

fn is_forbidden(c: char) -> bool {
    c.is_ascii_control() || c == '/' || c == '\\' || RESERVED.contains(&c)
}

fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c: char| c == '.' || c.is_whitespace())
}

fn truncate_keeping_extension(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }

    let (stem, ext) = split_extension(name);
    let ext_chars = ext.chars().count();
    if ext_chars == 0 || ext_chars >= max {
        // No extension worth keeping: hard cut.
        let cut: String = name.chars().take(max).collect();
        return trim_edges(&cut).to_string();
    }

    let stem: String = stem.chars().take(max - ext_chars).collect();
    format!("{}{}", stem.trim_end_matches(|c: char| c == '.' || c.is_whitespace()), ext)
}

/// `name` with `suffix` inserted before its extension, the stem shortened so
/// the result still fits [`MAX_FILENAME_CHARS`].
///
/// `with_suffix("report.pdf", " (2)")` → `"report (2).pdf"`
pub(crate) fn with_suffix(name: &str, suffix: &str) -> String {
    let (stem, ext) = split_extension(name);
    let suffix_chars = suffix.chars().count();
    let ext_chars = ext.chars().count();
    if suffix_chars + ext_chars >= MAX_FILENAME_CHARS {
        let base: String = name
            .chars()
            .take(MAX_FILENAME_CHARS.saturating_sub(suffix_chars))
            .collect();
        return format!("{base}{suffix}");
    }
    let stem: String = stem
        .chars()
        .take(MAX_FILENAME_CHARS - suffix_chars - ext_chars)
        .collect();
    format!("{stem}{suffix}{ext}")
}

/// Splits `name` into stem and extension (extension keeps its leading dot).
/// A leading dot does not start an extension.
pub(crate) fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}
