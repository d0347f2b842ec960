//! Filename hints from a `Content-Disposition` header.

use percent_encoding::percent_decode_str;

/// Returns the filename carried by a raw `Content-Disposition` value.
///
/// `filename*` (RFC 5987, `charset'lang'value`) wins over `filename`.
/// Only UTF-8 and ISO-8859-1 charsets are decoded; anything else is skipped.
pub fn filename_from_content_disposition(header_value: &str) -> Option<String> {
    let mut plain: Option<String> = None;

    for param in header_value.split(';').skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "filename*" => {
                if let Some(decoded) = decode_extended(value).filter(|s| !s.is_empty()) {
                    return Some(decoded);
                }
            }
            "filename" if plain.is_none() => {
                let unquoted = unquote(value);
                if !unquoted.is_empty() {
                    plain = Some(unquoted);
                }
            }
            _ => {}
        }
    }

    plain
}

fn decode_extended(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?.trim().to_ascii_lowercase();
    let _lang = parts.next()?;
    let encoded = parts.next()?;
    let bytes: Vec<u8> = percent_decode_str(encoded).collect();
    match charset.as_str() {
        "utf-8" => String::from_utf8(bytes).ok(),
        // Latin-1 maps byte-for-byte onto the first 256 code points.
        "iso-8859-1" => Some(bytes.into_iter().map(char::from).collect()),
        _ => None,
    }
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut escaped = false;
    for c in inner.chars() {
        if escaped || c != '\\' {
            out.push(c);
            escaped = false;
        } else {
            escaped = true;
        }
    }
    out
}
