//! Ordered text rewriting with best-effort charset normalization.

use std::borrow::Cow;

use encoding_rs::Encoding;
use tracing::debug;

use crate::rules::Transform;

/// Applies `transforms` in order to `text`.
///
/// Without transforms the bytes are returned unchanged. Otherwise the text
/// is normalized to UTF-8 first; if that fails the transforms run over the
/// original bytes, and bytes outside any match are kept as they were.
#[must_use]
pub fn transform_text(transforms: &[Transform], text: &[u8], charset: Option<&str>) -> Vec<u8> {
    if transforms.is_empty() {
        return text.to_vec();
    }

    if let Some(normalized) = normalize(text, charset) {
        return apply_all(transforms, &normalized).into_bytes();
    }

    debug!("Charset normalization failed for {charset:?}; using original text");
    transforms
        .iter()
        .fold(text.to_vec(), |running, transform| {
            transform.apply_bytes(&running).into_owned()
        })
}

/// Applies `transforms` in order, each over the previous result.
#[must_use]
pub fn apply_all(transforms: &[Transform], text: &str) -> String {
    transforms
        .iter()
        .fold(text.to_string(), |running, transform| {
            transform.apply(&running).into_owned()
        })
}

/// Decodes text to UTF-8 using its declared charset.
///
/// Returns `None` if the bytes are neither UTF-8 nor valid in the declared
/// encoding.
#[must_use]
pub fn normalize<'a>(text: &'a [u8], charset: Option<&str>) -> Option<Cow<'a, str>> {
    if let Ok(utf8) = std::str::from_utf8(text) {
        return Some(Cow::Borrowed(utf8));
    }

    let encoding = Encoding::for_label(charset?.trim().as_bytes())?;
    encoding.decode_without_bom_handling_and_without_replacement(text)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rules_returns_input() {
        let latin1 = b"caf\xe9";
        assert_eq!(transform_text(&[], latin1, Some("iso-8859-1")), latin1);
    }

    #[test]
    fn test_rules_apply_sequentially() {
        let rules = [Transform::new("A", "B"), Transform::new("B", "C")];
        assert_eq!(transform_text(&rules, b"A", None), b"C");
    }

    #[test]
    fn test_strip_carrier_signature() {
        let rules = [Transform::new(
            "/\\s*This message was sent using PIX-FLIX Messaging service from .*/",
            "",
        )];
        let text = b"Hello world. This message was sent using PIX-FLIX Messaging service from CarrierX";
        assert_eq!(transform_text(&rules, text, None), b"Hello world.");
    }

    #[test]
    fn test_declared_charset_is_normalized() {
        let rules = [Transform::new("caf\u{e9}", "coffee")];
        assert_eq!(transform_text(&rules, b"caf\xe9!", Some("ISO-8859-1")), b"coffee!");
    }

    #[test]
    fn test_failed_normalization_uses_original() {
        assert!(normalize(b"caf\xe9", None).is_none());
        assert!(normalize(b"caf\xe9", Some("no-such-charset")).is_none());

        let rules = [Transform::new("/ ad$/", "")];
        assert_eq!(transform_text(&rules, b"caf\xe9 ad", None), b"caf\xe9");

        let rules = [Transform::new("caf", "tea")];
        assert_eq!(transform_text(&rules, b"caf\xe9", None), b"tea\xe9");
    }

    #[test]
    fn test_invalid_rule_is_skipped() {
        let rules = [
            Transform::new("/(/", "x"),
            Transform::new("/world/", "there"),
        ];
        assert_eq!(apply_all(&rules, "hello world"), "hello there");
    }
}
