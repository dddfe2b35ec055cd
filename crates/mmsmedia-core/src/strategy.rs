//! Per-carrier processing strategies.
//!
//! Nearly every carrier is handled by data alone (its rule file), so the
//! registry falls back to [`RuleStrategy`]. A carrier whose gateway needs
//! different control flow registers its own [`CarrierStrategy`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use mmsmedia_mime::Part;

use crate::rules::RuleSet;
use crate::{flatten, ignore};

/// Control-flow hooks a carrier may override.
pub trait CarrierStrategy: fmt::Debug + Send + Sync {
    /// Produces the leaf parts to consider, in order.
    fn leaf_parts<'a>(&self, root: &'a Part) -> Vec<&'a Part> {
        flatten::leaf_parts(root)
    }

    /// Decides whether a leaf part is carrier noise.
    fn should_ignore(&self, part: &Part, filename: &str, rules: &RuleSet) -> bool {
        ignore::should_ignore(part, filename, rules)
    }
}

/// Rule-driven processing used for every carrier without a custom strategy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleStrategy;

impl CarrierStrategy for RuleStrategy {}

/// Maps canonical carrier ids to strategies.
#[derive(Debug, Clone)]
pub struct StrategyRegistry {
    strategies: HashMap<String, Arc<dyn CarrierStrategy>>,
    fallback: Arc<dyn CarrierStrategy>,
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self {
            strategies: HashMap::new(),
            fallback: Arc::new(RuleStrategy),
        }
    }
}

impl StrategyRegistry {
    /// Creates a registry with only the rule-driven fallback.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a strategy for a canonical carrier id.
    #[must_use]
    pub fn with_strategy(mut self, carrier: &str, strategy: Arc<dyn CarrierStrategy>) -> Self {
        self.strategies.insert(carrier.to_lowercase(), strategy);
        self
    }

    /// Returns the strategy for a carrier, or the fallback.
    #[must_use]
    pub fn get(&self, carrier: &str) -> Arc<dyn CarrierStrategy> {
        self.strategies
            .get(&carrier.to_lowercase())
            .map_or_else(|| Arc::clone(&self.fallback), Arc::clone)
    }

    /// Returns `true` if the carrier has a dedicated strategy.
    #[must_use]
    pub fn contains(&self, carrier: &str) -> bool {
        self.strategies.contains_key(&carrier.to_lowercase())
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
    use mmsmedia_mime::ContentType;

    /// Keeps everything, even empty parts.
    #[derive(Debug)]
    struct KeepAll;

    impl CarrierStrategy for KeepAll {
        fn should_ignore(&self, _part: &Part, _filename: &str, _rules: &RuleSet) -> bool {
            false
        }
    }

    #[test]
    fn test_fallback_is_rule_strategy() {
        let registry = StrategyRegistry::new();
        let empty = Part::new(ContentType::text_plain(), "");
        assert!(!registry.contains("vzwpix.com"));
        assert!(registry.get("vzwpix.com").should_ignore(&empty, "a.txt", &RuleSet::new()));
    }

    #[test]
    fn test_registered_strategy() {
        let registry = StrategyRegistry::new().with_strategy("MMS.Example.NET", Arc::new(KeepAll));
        let empty = Part::new(ContentType::text_plain(), "");

        assert!(registry.contains("mms.example.net"));
        assert!(!registry.get("mms.example.net").should_ignore(&empty, "a.txt", &RuleSet::new()));
    }

    #[test]
    fn test_default_leaf_parts() {
        let root = Part::multipart(
            ContentType::new("multipart", "mixed"),
            vec![Part::new(ContentType::text_plain(), "hi")],
        );
        assert_eq!(RuleStrategy.leaf_parts(&root).len(), 1);
    }
}
