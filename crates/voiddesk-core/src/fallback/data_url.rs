use base64::Engine;
use percent_encoding::percent_decode_str;

use super::FallbackError;
use crate::naming::strip_scheme;

/// Decodes the payload of a `data:` URL (RFC 2397).
///
/// `;base64` payloads are base64-decoded (whitespace and missing padding are
/// tolerated); anything else is percent-decoded.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, FallbackError> {
    let rest = strip_scheme(url.trim(), "data:")
        .ok_or_else(|| FallbackError::DataUrl("missing data: scheme".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| FallbackError::DataUrl("missing ',' separator".to_string()))?;

    let is_base64 = meta
        .rsplit(';')
        .next()
        .is_some_and(|p| p.trim().eq_ignore_ascii_case("base64"));
    if !is_base64 {
        return Ok(percent_decode_str(payload).collect());
    }

    // Base64 payloads may themselves be percent-encoded inside the URL.
    let raw: Vec<u8> = percent_decode_str(payload)
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let trimmed = raw
        .strip_suffix(b"==")
        .or_else(|| raw.strip_suffix(b"="))
        .unwrap_or(raw.as_slice());
    base64::engine::general_purpose::STANDARD_NO_PAD
        .decode(trimmed)
        .map_err(|e| FallbackError::DataUrl(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_payload() {
        assert_eq!(decode_data_url("data:text/plain;base64,aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_data_url("data:;base64,aGVsbG8").unwrap(), b"hello");
        assert_eq!(
            decode_data_url("DATA:application/octet-stream;BASE64,aGVs%0AbG8=").unwrap(),
            b"hello"
        );
    }

    #[test]
    fn percent_payload() {
        assert_eq!(decode_data_url("data:text/plain,a%20b").unwrap(), b"a b");
        assert_eq!(
            decode_data_url("data:application/json;charset=utf-8,%7B%22k%22%3A1%7D").unwrap(),
            br#"{"k":1}"#
        );
        assert_eq!(decode_data_url("data:,").unwrap(), b"");
    }

    #[test]
    fn malformed() {
        assert!(matches!(decode_data_url("data:text/plain"), Err(FallbackError::DataUrl(_))));
        assert!(matches!(decode_data_url("https://x/y"), Err(FallbackError::DataUrl(_))));
        assert!(matches!(
            decode_data_url("data:;base64,!!!"),
            Err(FallbackError::DataUrl(_))
        ));
    }
}
