//! Filename hints from the source URL.

use percent_encoding::percent_decode_str;

/// Last non-empty path segment of an `http(s)`/`file` URL, percent-decoded.
///
/// `blob:` URLs carry an opaque object id rather than a name, so they yield `None`.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    if parsed.cannot_be_a_base() {
        return None;
    }
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = percent_decode_str(segment).decode_utf8_lossy().into_owned();
    if decoded == "." || decoded == ".." {
        return None;
    }
    Some(decoded)
}

/// Default name for a `data:` URL, using the media subtype as extension
/// (`data:image/png;base64,...` → `download.png`).
pub fn filename_from_data_url(url: &str, stem: &str) -> Option<String> {
    let rest = strip_scheme(url, "data:")?;
    let (meta, _) = rest.split_once(',')?;
    let mime = meta.split(';').next().unwrap_or_default().trim();
    let subtype = mime.split_once('/').map(|(_, sub)| sub)?;
    let ext = subtype.split('+').next().unwrap_or_default().to_ascii_lowercase();
    let ext = match ext.as_str() {
        "jpeg" => "jpg".to_string(),
        "plain" => "txt".to_string(),
        _ => ext,
    };
    if ext.is_empty() || ext.len() > 8 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(format!("{stem}.{ext}"))
}

/// Case-insensitive scheme prefix strip (`"DATA:..."` matches `"data:"`).
pub(crate) fn strip_scheme<'a>(url: &'a str, scheme: &str) -> Option<&'a str> {
    let head = url.get(..scheme.len())?;
    head.eq_ignore_ascii_case(scheme).then(|| &url[scheme.len()..])
}
