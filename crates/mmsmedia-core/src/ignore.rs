//! Carrier noise detection for leaf parts.

use mmsmedia_mime::Part;
use tracing::debug;

use crate::rules::RuleSet;

/// Decides whether a leaf part is carrier noise.
///
/// Checks the part's ignore rules in order, stopping at the first hit: the
/// filename equal to a literal rule, the filename matching a pattern rule,
/// then the stripped body matching a pattern rule. A part whose stripped
/// body is empty is always ignored.
#[must_use]
pub fn should_ignore(part: &Part, filename: &str, rules: &RuleSet) -> bool {
    let mime_type = part.mime_type();
    let rules = rules.ignore_rules(&mime_type);
    let body = part.body().trim_ascii();

    if rules.iter().any(|rule| rule.equals(filename)) {
        debug!("Ignoring {mime_type} {filename:?}: literal filename rule");
        return true;
    }
    if rules.iter().any(|rule| rule.is_match(filename.as_bytes())) {
        debug!("Ignoring {mime_type} {filename:?}: filename pattern rule");
        return true;
    }
    if rules.iter().any(|rule| rule.is_match(body)) {
        debug!("Ignoring {mime_type} {filename:?}: body pattern rule");
        return true;
    }
    if body.is_empty() {
        debug!("Ignoring {mime_type} {filename:?}: empty body");
        return true;
    }

    false
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
    use mmsmedia_mime::ContentType;

    fn gif(body: &[u8]) -> Part {
        Part::new(ContentType::new("image", "gif"), body.to_vec())
    }

    #[test]
    fn test_literal_filename_wins_without_body_match() {
        let rules = RuleSet::new()
            .with_ignore("image/gif", "masthead.gif")
            .with_ignore("image/gif", "/never-in-body/");
        assert!(should_ignore(&gif(b"GIF89a..."), "masthead.gif", &rules));
        assert!(!should_ignore(&gif(b"GIF89a..."), "photo.gif", &rules));
    }

    #[test]
    fn test_filename_pattern() {
        let rules = RuleSet::new().with_ignore("image/gif", "/^spacer\\d*\\.gif$/i");
        assert!(should_ignore(&gif(b"GIF89a"), "Spacer01.gif", &rules));
        assert!(!should_ignore(&gif(b"GIF89a"), "my-spacer.gif", &rules));
    }

    #[test]
    fn test_body_pattern() {
        let rules = RuleSet::new().with_ignore("text/plain", "/^This message was sent using/");
        let ad = Part::new(ContentType::text_plain(), "\r\nThis message was sent using PIX-FLIX\r\n");
        let real = Part::new(ContentType::text_plain(), "Look at this!");
        assert!(should_ignore(&ad, "1.txt", &rules));
        assert!(!should_ignore(&real, "2.txt", &rules));
    }

    #[test]
    fn test_empty_body_always_ignored() {
        let rules = RuleSet::new();
        assert!(should_ignore(&gif(b""), "photo.gif", &rules));
        assert!(should_ignore(&gif(b" \r\n\t"), "photo.gif", &rules));
    }

    #[test]
    fn test_rules_of_other_types_do_not_apply() {
        let rules = RuleSet::new().with_ignore("image/jpeg", "photo.gif");
        assert!(!should_ignore(&gif(b"GIF89a"), "photo.gif", &rules));
    }

    #[test]
    fn test_invalid_rule_never_matches() {
        let rules = RuleSet::new().with_ignore("image/gif", "/([/");
        assert!(!should_ignore(&gif(b"([x"), "([.gif", &rules));
    }
}
