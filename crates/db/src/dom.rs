//! DOM snapshot encoding.
//!
//! Captured markup is stored base64-encoded so embedded control characters
//! survive the round trip through the database.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

pub fn encode_dom_tree(dom: &str) -> String {
    BASE64.encode(dom.as_bytes())
}

/// Decode a stored DOM snapshot.
///
/// Rows written before encoding was introduced hold raw markup; anything
/// that is not valid base64 of UTF-8 is returned unchanged.
pub fn decode_dom_tree(stored: &str) -> String {
    match BASE64.decode(stored.as_bytes()) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(decoded) => decoded,
            Err(_) => {
                tracing::warn!("Stored DOM tree is not UTF-8 after decoding, returning raw value");
                stored.to_string()
            }
        },
        Err(_) => stored.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_characters_survive() {
        let dom = "<div>\u{0}\u{1b}[31m日本語</div>";
        assert_eq!(decode_dom_tree(&encode_dom_tree(dom)), dom);
    }

    #[test]
    fn legacy_raw_markup_is_returned_as_is() {
        let raw = "<html><body>legacy</body></html>";
        assert_eq!(decode_dom_tree(raw), raw);
    }
}
