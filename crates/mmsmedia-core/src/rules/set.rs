//! Effective rule set for one carrier and its JSON document form.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use super::rule::{NumberRule, Rule, Transform};

/// On-disk rule document.
///
/// ```json
/// {
///   "ignore":    { "image/gif": ["logo.gif", "/^dot\\d*\\.gif$/i"] },
///   "transform": { "text/plain": [["/\\s*Sent via .*$/", ""]] },
///   "number":    ["X-Mms-Sender", "/\\D/", ""]
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RuleDocument {
    ignore: HashMap<String, Vec<String>>,
    transform: HashMap<String, Vec<Vec<String>>>,
    number: Option<Vec<String>>,
}

/// Ignore, transform and number rules keyed by lowercase MIME type.
///
/// Lookups for unconfigured types yield empty slices.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    ignore: HashMap<String, Vec<Rule>>,
    transform: HashMap<String, Vec<Transform>>,
    number: Option<NumberRule>,
}

impl RuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON rule document.
    ///
    /// Transform entries that are not `[pattern, replacement]` pairs are
    /// skipped, as is a `number` entry that is not `[header, pattern, replacement]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid JSON of the expected shape.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let document: RuleDocument = serde_json::from_str(json)?;
        Ok(Self::from_document(document))
    }

    fn from_document(document: RuleDocument) -> Self {
        let mut rules = Self::new();

        for (mime_type, sources) in document.ignore {
            for source in sources {
                rules = rules.with_ignore(&mime_type, &source);
            }
        }

        for (mime_type, pairs) in document.transform {
            for pair in pairs {
                match pair.as_slice() {
                    [pattern, replacement] => {
                        rules = rules.with_transform(&mime_type, pattern, replacement);
                    }
                    _ => warn!("Skipping {mime_type} transform with {} elements", pair.len()),
                }
            }
        }

        match document.number.as_deref() {
            Some([header, pattern, replacement]) => {
                rules = rules.with_number(header, pattern, replacement);
            }
            Some(other) => warn!("Ignoring number rule with {} elements", other.len()),
            None => {}
        }

        rules
    }

    /// Loads a rule file, degrading to an empty set on any failure.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No rule file at {}", path.display());
                return Self::new();
            }
            Err(e) => {
                warn!("Cannot read rule file {}: {e}", path.display());
                return Self::new();
            }
        };

        match Self::from_json(&contents) {
            Ok(rules) => {
                debug!("Loaded rules from {}", path.display());
                rules
            }
            Err(e) => {
                warn!("Malformed rule file {}: {e}", path.display());
                Self::new()
            }
        }
    }

    /// Adds an ignore rule for a MIME type.
    #[must_use]
    pub fn with_ignore(mut self, mime_type: &str, rule: &str) -> Self {
        self.ignore
            .entry(mime_type.to_lowercase())
            .or_default()
            .push(Rule::parse(rule));
        self
    }

    /// Adds a transform for a MIME type.
    #[must_use]
    pub fn with_transform(mut self, mime_type: &str, pattern: &str, replacement: &str) -> Self {
        self.transform
            .entry(mime_type.to_lowercase())
            .or_default()
            .push(Transform::new(pattern, replacement));
        self
    }

    /// Sets the number rule.
    #[must_use]
    pub fn with_number(mut self, header: &str, pattern: &str, replacement: &str) -> Self {
        self.number = Some(NumberRule::new(header, pattern, replacement));
        self
    }

    /// Ignore rules for a MIME type.
    #[must_use]
    pub fn ignore_rules(&self, mime_type: &str) -> &[Rule] {
        self.ignore
            .get(&mime_type.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Transforms for a MIME type, in application order.
    #[must_use]
    pub fn transform_rules(&self, mime_type: &str) -> &[Transform] {
        self.transform
            .get(&mime_type.to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The number rule, if configured.
    #[must_use]
    pub const fn number(&self) -> Option<&NumberRule> {
        self.number.as_ref()
    }

    /// Returns `true` if no rules of any kind are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ignore.is_empty() && self.transform.is_empty() && self.number.is_none()
    }

    /// Merges a carrier fragment over this (default) set.
    ///
    /// Ignore and transform sequences are concatenated default-then-carrier
    /// per MIME type. The carrier's number rule replaces the default's when
    /// present.
    #[must_use]
    pub fn merge(mut self, carrier: Self) -> Self {
        for (mime_type, rules) in carrier.ignore {
            self.ignore.entry(mime_type).or_default().extend(rules);
        }
        for (mime_type, transforms) in carrier.transform {
            self.transform.entry(mime_type).or_default().extend(transforms);
        }
        if carrier.number.is_some() {
            self.number = carrier.number;
        }
        self
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
    use proptest::prelude::*;

    #[test]
    fn test_unconfigured_type_is_empty() {
        let rules = RuleSet::new();
        assert!(rules.ignore_rules("image/jpeg").is_empty());
        assert!(rules.transform_rules("text/plain").is_empty());
        assert!(rules.number().is_none());
        assert!(rules.is_empty());
    }

    #[test]
    fn test_from_json() {
        let rules = RuleSet::from_json(
            r#"{
                "ignore": { "Image/GIF": ["logo.gif", "/^dot/"] },
                "transform": { "text/plain": [["/ad$/", ""], ["only-one"]] },
                "number": ["X-Mms-Sender", "/\\D/", ""]
            }"#,
        )
        .unwrap();

        let ignore = rules.ignore_rules("image/gif");
        assert_eq!(ignore.len(), 2);
        assert!(ignore[0].equals("logo.gif"));
        assert!(ignore[1].is_match(b"dot.gif"));
        assert_eq!(rules.transform_rules("TEXT/PLAIN").len(), 1);
        assert_eq!(rules.number().unwrap().header(), "X-Mms-Sender");
    }

    #[test]
    fn test_from_json_missing_sections() {
        let rules = RuleSet::from_json("{}").unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_short_number_rule_is_ignored() {
        let rules = RuleSet::from_json(r#"{ "number": ["X-Mms-Sender"] }"#).unwrap();
        assert!(rules.number().is_none());
    }

    #[test]
    fn test_from_json_rejects_wrong_shape() {
        assert!(RuleSet::from_json(r#"{ "ignore": ["not", "a", "map"] }"#).is_err());
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RuleSet::load(&dir.path().join("absent.json")).is_empty());

        let malformed = dir.path().join("broken.json");
        std::fs::write(&malformed, "{ not json").unwrap();
        assert!(RuleSet::load(&malformed).is_empty());
    }

    #[test]
    fn test_merge_concatenates_default_first() {
        let default = RuleSet::new().with_ignore("image/gif", "default.gif");
        let carrier = RuleSet::new()
            .with_ignore("image/gif", "carrier.gif")
            .with_ignore("text/plain", "/boilerplate/");

        let merged = default.merge(carrier);
        let gif = merged.ignore_rules("image/gif");
        assert_eq!(gif.len(), 2);
        assert!(gif[0].equals("default.gif"));
        assert!(gif[1].equals("carrier.gif"));
        assert_eq!(merged.ignore_rules("text/plain").len(), 1);
    }

    #[test]
    fn test_merge_number_precedence() {
        let default = RuleSet::new().with_number("X-Default", "/x/", "");
        let kept = default.clone().merge(RuleSet::new());
        assert_eq!(kept.number().unwrap().header(), "X-Default");

        let replaced = default.merge(RuleSet::new().with_number("X-Carrier", "/x/", ""));
        assert_eq!(replaced.number().unwrap().header(), "X-Carrier");
    }

    fn build(mime_type: &str, names: &[String]) -> RuleSet {
        names
            .iter()
            .fold(RuleSet::new(), |rules, name| rules.with_ignore(mime_type, name))
    }

    proptest! {
        #[test]
        fn merge_with_empty_is_identity(names in proptest::collection::vec("[a-z]{1,8}\\.gif", 0..6)) {
            let merged = build("image/gif", &names).merge(RuleSet::new());
            let rules = merged.ignore_rules("image/gif");
            prop_assert_eq!(rules.len(), names.len());
            for (rule, name) in rules.iter().zip(&names) {
                prop_assert!(rule.equals(name));
            }
        }

        #[test]
        fn merge_lengths_add_up(
            defaults in proptest::collection::vec("[a-z]{1,8}\\.jpg", 0..6),
            carriers in proptest::collection::vec("[a-z]{1,8}\\.jpg", 0..6),
        ) {
            let merged = build("image/jpeg", &defaults).merge(build("image/jpeg", &carriers));
            let rules = merged.ignore_rules("image/jpeg");
            prop_assert_eq!(rules.len(), defaults.len() + carriers.len());
            for (rule, name) in rules.iter().zip(defaults.iter().chain(&carriers)) {
                prop_assert!(rule.equals(name));
            }
        }
    }
}
