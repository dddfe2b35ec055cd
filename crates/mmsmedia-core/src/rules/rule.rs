//! Single ignore, transform and number rules.
//!
//! A rule string of the form `/body/flags` (flags drawn from `i`, `m`, `x`)
//! is a pattern; anything else is a literal. Patterns always match with
//! line anchors, `i` makes them case-insensitive, `m` lets `.` cross
//! newlines and `x` enables extended syntax. The form is decided once, when
//! the rule is loaded.

use std::borrow::Cow;

use tracing::warn;

/// Splits `/body/flags` into its body and flags.
fn split_pattern(source: &str) -> Option<(&str, &str)> {
    let rest = source.strip_prefix('/')?;
    let end = rest.rfind('/')?;
    let (body, flags) = (&rest[..end], &rest[end + 1..]);

    if body.is_empty() || !flags.chars().all(|c| matches!(c, 'i' | 'm' | 'x')) {
        return None;
    }
    Some((body, flags))
}

/// Builds the inline-flag prefix for a pattern body.
fn regex_source(body: &str, flags: &str) -> String {
    let mut inline = String::from("m");
    if flags.contains('i') {
        inline.push('i');
    }
    if flags.contains('m') {
        inline.push('s');
    }
    if flags.contains('x') {
        inline.push('x');
    }
    format!("(?{inline}){body}")
}

/// Ignore rule: a literal filename or a compiled pattern.
#[derive(Debug, Clone)]
pub enum Rule {
    /// Matches a filename exactly.
    Literal(String),
    /// Matches a filename or body anywhere.
    Pattern(regex::bytes::Regex),
    /// A pattern that failed to compile; never matches.
    Invalid(String),
}

impl Rule {
    /// Interprets a rule string.
    #[must_use]
    pub fn parse(source: &str) -> Self {
        let Some((body, flags)) = split_pattern(source) else {
            return Self::Literal(source.to_string());
        };

        match regex::bytes::Regex::new(&regex_source(body, flags)) {
            Ok(regex) => Self::Pattern(regex),
            Err(e) => {
                warn!("Ignoring malformed rule {source:?}: {e}");
                Self::Invalid(source.to_string())
            }
        }
    }

    /// Returns `true` if this is a literal equal to `name`.
    #[must_use]
    pub fn equals(&self, name: &str) -> bool {
        matches!(self, Self::Literal(literal) if literal == name)
    }

    /// Returns `true` if this is a pattern matching `haystack`.
    #[must_use]
    pub fn is_match(&self, haystack: &[u8]) -> bool {
        matches!(self, Self::Pattern(regex) if regex.is_match(haystack))
    }

    /// Returns `false` for patterns that failed to compile.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !matches!(self, Self::Invalid(_))
    }
}

/// Ordered text rewrite: a pattern and its replacement.
#[derive(Debug, Clone)]
pub struct Transform {
    pattern: Option<regex::Regex>,
    raw_pattern: Option<regex::bytes::Regex>,
    replacement: String,
}

impl Transform {
    /// Creates a transform.
    ///
    /// A `/.../` pattern is compiled as a regular expression, anything else
    /// matches literally. Back-references `\0`..`\9` in the replacement
    /// refer to capture groups.
    #[must_use]
    pub fn new(pattern: &str, replacement: &str) -> Self {
        let source = split_pattern(pattern).map_or_else(
            || regex::escape(pattern),
            |(body, flags)| regex_source(body, flags),
        );

        let (compiled, raw) = match regex::Regex::new(&source) {
            Ok(regex) => (Some(regex), regex::bytes::Regex::new(&source).ok()),
            Err(e) => {
                warn!("Ignoring malformed transform {pattern:?}: {e}");
                (None, None)
            }
        };

        Self {
            pattern: compiled,
            raw_pattern: raw,
            replacement: convert_replacement(replacement),
        }
    }

    /// Applies the rewrite to every match; invalid transforms leave `text` as is.
    #[must_use]
    pub fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match &self.pattern {
            Some(regex) => regex.replace_all(text, self.replacement.as_str()),
            None => Cow::Borrowed(text),
        }
    }

    /// Applies the rewrite to bytes that are not valid text.
    ///
    /// Bytes outside the matches are kept exactly as given.
    #[must_use]
    pub fn apply_bytes<'a>(&self, text: &'a [u8]) -> Cow<'a, [u8]> {
        match &self.raw_pattern {
            Some(regex) => regex.replace_all(text, self.replacement.as_bytes()),
            None => Cow::Borrowed(text),
        }
    }

    /// Returns `false` if the pattern failed to compile.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.pattern.is_some()
    }
}

/// Converts `\N` back-references to `${N}` and escapes literal `$`.
fn convert_replacement(replacement: &str) -> String {
    let mut converted = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => converted.push_str("$$"),
            '\\' => match chars.peek().copied() {
                Some(digit) if digit.is_ascii_digit() => {
                    chars.next();
                    converted.push_str("${");
                    converted.push(digit);
                    converted.push('}');
                }
                Some('\\') => {
                    chars.next();
                    converted.push('\\');
                }
                Some('$') => {
                    chars.next();
                    converted.push_str("$$");
                }
                _ => converted.push('\\'),
            },
            _ => converted.push(c),
        }
    }

    converted
}

/// Rule extracting the sender number from an alternate header.
#[derive(Debug, Clone)]
pub struct NumberRule {
    header: String,
    transform: Transform,
}

impl NumberRule {
    /// Creates a number rule reading `header` and rewriting it.
    #[must_use]
    pub fn new(header: &str, pattern: &str, replacement: &str) -> Self {
        Self {
            header: header.to_string(),
            transform: Transform::new(pattern, replacement),
        }
    }

    /// Returns the header the number is read from.
    #[must_use]
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Rewrites a header value into a number.
    #[must_use]
    pub fn apply(&self, value: &str) -> String {
        self.transform.apply(value).trim().to_string()
    }
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
    fn test_literal_rule() {
        let rule = Rule::parse("masthead.jpg");
        assert!(rule.equals("masthead.jpg"));
        assert!(!rule.equals("Masthead.jpg"));
        assert!(!rule.is_match(b"masthead.jpg"));
    }

    #[test]
    fn test_pattern_rule() {
        let rule = Rule::parse("/^logo\\d*\\.gif$/i");
        assert!(rule.is_match(b"LOGO12.gif"));
        assert!(!rule.is_match(b"photo.gif"));
        assert!(!rule.equals("/^logo\\d*\\.gif$/i"));
    }

    #[test]
    fn test_pattern_is_line_anchored() {
        let rule = Rule::parse("/^Sent from CarrierX$/");
        assert!(rule.is_match(b"Hello\nSent from CarrierX\n"));
    }

    #[test]
    fn test_unknown_flags_make_a_literal() {
        assert!(matches!(Rule::parse("/a/b/c.jpg"), Rule::Literal(_)));
        assert!(matches!(Rule::parse("/"), Rule::Literal(_)));
        assert!(matches!(Rule::parse("//"), Rule::Literal(_)));
    }

    #[test]
    fn test_invalid_pattern_never_matches() {
        let rule = Rule::parse("/([unclosed/");
        assert!(!rule.is_valid());
        assert!(!rule.is_match(b"([unclosed"));
        assert!(!rule.equals("/([unclosed/"));
    }

    #[test]
    fn test_dot_all_flag() {
        let strict = Rule::parse("/start.*end/");
        let dot_all = Rule::parse("/start.*end/m");
        assert!(!strict.is_match(b"start\nend"));
        assert!(dot_all.is_match(b"start\nend"));
    }

    #[test]
    fn test_transform_backreference() {
        let transform = Transform::new("/(\\d{3})-(\\d{4})/", "\\2-\\1");
        assert_eq!(transform.apply("call 555-1212"), "call 1212-555");
    }

    #[test]
    fn test_transform_keeps_literal_dollar() {
        let transform = Transform::new("/price/", "$5");
        assert_eq!(transform.apply("price"), "$5");
    }

    #[test]
    fn test_literal_transform() {
        let transform = Transform::new("(ad)", "");
        assert_eq!(transform.apply("photo (ad)"), "photo ");
    }

    #[test]
    fn test_invalid_transform_is_noop() {
        let transform = Transform::new("/(/", "x");
        assert_eq!(transform.apply_bytes(b"(\xff"), &b"(\xff"[..]);
        assert!(!transform.is_valid());
        assert_eq!(transform.apply("unchanged"), "unchanged");
    }

    #[test]
    fn test_number_rule() {
        let rule = NumberRule::new("X-Mms-Sender", "/\\D/", "");
        assert_eq!(rule.header(), "X-Mms-Sender");
        assert_eq!(rule.apply("+1 (206) 555-1212"), "12065551212");
    }

    #[test]
    fn test_convert_replacement() {
        assert_eq!(convert_replacement("\\1"), "${1}");
        assert_eq!(convert_replacement("a$b"), "a$$b");
        assert_eq!(convert_replacement("\\\\n"), "\\n");
        assert_eq!(convert_replacement("\\q"), "\\q");
    }
}
