//! URL and filesystem safe identifiers.
//!
//! Identifiers made only of ASCII letters, digits, `-` and `_` are used as-is.
//! Anything else is replaced by the lowercase hex encoding of its UTF-8 bytes,
//! which keeps CJK titles and punctuation out of output paths while staying
//! reversible.

use std::fmt::Write;

/// Whether `s` can be used as a path segment without encoding.
pub fn is_safe(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Map an identifier to a path-safe slug.
pub fn safe_slug(s: &str) -> String {
    if is_safe(s) {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len() * 2);
    for byte in s.as_bytes() {
        // Writing to a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Decode a hex slug produced by [`safe_slug`] back into the original bytes.
///
/// Returns `None` when `s` is not an even-length hex string.
pub fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }

    s.as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = (pair[0] as char).to_digit(16)?;
            let lo = (pair[1] as char).to_digit(16)?;
            Some((hi * 16 + lo) as u8)
        })
        .collect()
}
