//! Short upload references.
//!
//! Posts embed uploads as `upload://{code}.{ext}`, where the code is a
//! base62 encoding of the leading 120 bits (30 hex chars) of the content
//! hash. Decoding is the exact inverse of encoding; a decoded code yields a
//! hash prefix that the repository resolves to the first matching record.

use crate::constants::{SHORT_URL_PATH_PREFIX, SHORT_URL_SCHEME};

/// Hex chars of the content hash covered by a short code.
pub const SHORT_CODE_HEX_LEN: usize = 30;

const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Largest value a 30-hex-char prefix can hold.
const PREFIX_MAX: u128 = (1u128 << (SHORT_CODE_HEX_LEN as u32 * 4)) - 1;

/// Encode the truncated content hash as a base62 short code.
///
/// Returns `None` when the input is shorter than the truncation length or
/// not valid hex.
pub fn encode(sha1_hex: &str) -> Option<String> {
    let prefix = sha1_hex.get(..SHORT_CODE_HEX_LEN)?;
    let mut value = u128::from_str_radix(prefix, 16).ok()?;

    if value == 0 {
        return Some("0".to_string());
    }

    let mut out = Vec::new();
    while value > 0 {
        out.push(ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    out.reverse();
    String::from_utf8(out).ok()
}

/// Decode a base62 short code back into the 30-hex-char hash prefix.
///
/// Rejects empty input, characters outside the alphabet, and values too
/// large to have come from `encode`.
pub fn decode(code: &str) -> Option<String> {
    if code.is_empty() {
        return None;
    }

    let mut value: u128 = 0;
    for byte in code.bytes() {
        let digit = match byte {
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'z' => byte - b'a' + 10,
            b'A'..=b'Z' => byte - b'A' + 36,
            _ => return None,
        };
        value = value
            .checked_mul(62)?
            .checked_add(u128::from(digit))?;
    }

    if value > PREFIX_MAX {
        return None;
    }

    Some(format!("{value:0width$x}", width = SHORT_CODE_HEX_LEN))
}

/// The `upload://` reference for a content hash, e.g. `upload://2tA….png`.
pub fn short_url(sha1_hex: &str, extension: &str) -> Option<String> {
    let code = encode(sha1_hex)?;
    if extension.is_empty() {
        Some(format!("{SHORT_URL_SCHEME}{code}"))
    } else {
        Some(format!("{SHORT_URL_SCHEME}{code}.{extension}"))
    }
}

/// The HTTP path serving a short reference, e.g. `/uploads/short-url/2tA….png`.
pub fn short_path(sha1_hex: &str, extension: &str) -> Option<String> {
    let code = encode(sha1_hex)?;
    if extension.is_empty() {
        Some(format!("{SHORT_URL_PATH_PREFIX}{code}"))
    } else {
        Some(format!("{SHORT_URL_PATH_PREFIX}{code}.{extension}"))
    }
}

/// Extract the bare code from any short reference form: `upload://{code}.{ext}`,
/// `{code}.{ext}`, or `{code}`.
pub fn code_from_reference(reference: &str) -> Option<&str> {
    let rest = reference
        .strip_prefix(SHORT_URL_SCHEME)
        .unwrap_or(reference);
    let code = rest.split('.').next().unwrap_or("");
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}
