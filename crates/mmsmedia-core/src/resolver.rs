//! Carrier identification and effective rule resolution.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use mmsmedia_mime::Message;
use tracing::{debug, warn};

use crate::rules::RuleSet;
use crate::settings::Settings;

/// Redirects legacy or regional carrier domains to a canonical carrier id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasTable {
    aliases: HashMap<String, String>,
}

impl AliasTable {
    /// Creates an empty alias table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a flat JSON object of `alias -> canonical` domains.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a string-to-string object.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        Ok(raw
            .into_iter()
            .fold(Self::new(), |table, (alias, canonical)| {
                table.with_alias(&alias, &canonical)
            }))
    }

    /// Loads an alias file, degrading to an empty table on any failure.
    #[must_use]
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                warn!("Malformed alias file {}: {e}", path.display());
                Self::new()
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No alias file at {}", path.display());
                Self::new()
            }
            Err(e) => {
                warn!("Cannot read alias file {}: {e}", path.display());
                Self::new()
            }
        }
    }

    /// Adds an alias.
    #[must_use]
    pub fn with_alias(mut self, alias: &str, canonical: &str) -> Self {
        self.aliases
            .insert(alias.trim().to_lowercase(), canonical.trim().to_lowercase());
        self
    }

    /// Resolves a domain; unknown domains pass through unchanged.
    #[must_use]
    pub fn resolve<'a>(&'a self, domain: &'a str) -> &'a str {
        self.aliases.get(domain).map_or(domain, String::as_str)
    }

    /// Returns the number of aliases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Returns `true` if no aliases are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Derives the carrier domain from a message envelope.
///
/// Prefers a Return-Path of the form `<local@domain>`, then the domain of the
/// first From address, then `default_carrier`. The result is lowercase.
#[must_use]
pub fn carrier_domain(message: &Message, default_carrier: &str) -> String {
    message
        .return_path()
        .and_then(return_path_domain)
        .or_else(|| message.from().first().and_then(|from| address_domain(from)))
        .unwrap_or(default_carrier)
        .to_lowercase()
}

fn return_path_domain(value: &str) -> Option<&str> {
    let inner = value.trim().strip_prefix('<')?.strip_suffix('>')?;
    let (local, domain) = inner.rsplit_once('@')?;
    (!local.is_empty()).then_some(domain).and_then(non_empty)
}

fn address_domain(address: &str) -> Option<&str> {
    address.rsplit_once('@').and_then(|(_, domain)| non_empty(domain))
}

fn non_empty(domain: &str) -> Option<&str> {
    let domain = domain.trim();
    (!domain.is_empty()).then_some(domain)
}

/// Carrier identity and the rules that govern it.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Domain derived from the envelope.
    pub domain: String,
    /// Canonical carrier id after aliasing.
    pub carrier: String,
    /// Default rules merged with the carrier's.
    pub rules: RuleSet,
}

/// Loads and merges rule files from a configuration directory.
#[derive(Debug, Clone)]
pub struct ConfigResolver<'a> {
    settings: &'a Settings,
}

impl<'a> ConfigResolver<'a> {
    /// Creates a resolver reading from `settings.config_dir`.
    #[must_use]
    pub const fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Resolves the effective configuration for a message.
    #[must_use]
    pub fn resolve_message(&self, message: &Message) -> ResolvedConfig {
        let domain = carrier_domain(message, &self.settings.default_carrier);
        self.resolve(&domain)
    }

    /// Resolves the effective configuration for a carrier domain.
    ///
    /// Missing or malformed files contribute nothing; this never fails.
    #[must_use]
    pub fn resolve(&self, domain: &str) -> ResolvedConfig {
        let domain = domain.trim().to_lowercase();
        let aliases = AliasTable::load(&self.settings.aliases_path());
        let carrier = aliases.resolve(&domain).to_string();

        let default = RuleSet::load(&self.settings.default_rules_path());
        let fragment = RuleSet::load(&self.settings.carrier_rules_path(&carrier));
        if fragment.is_empty() {
            debug!("Carrier {carrier} has no rules; using defaults only");
        }

        ResolvedConfig {
            domain,
            carrier,
            rules: default.merge(fragment),
        }
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
    use mmsmedia_mime::{ContentType, Headers, Part};

    fn envelope(headers: &[(&str, &str)]) -> Message {
        let mut map = Headers::new();
        for (name, value) in headers {
            map.add(*name, value);
        }
        Message::new(map, Part::new(ContentType::text_plain(), "x"))
    }

    #[test]
    fn test_domain_from_return_path() {
        let message = envelope(&[
            ("Return-Path", "<2065551212@MMS.Example.NET>"),
            ("From", "someone@other.example"),
        ]);
        assert_eq!(carrier_domain(&message, "unknown"), "mms.example.net");
    }

    #[test]
    fn test_domain_falls_back_to_from() {
        let message = envelope(&[("Return-Path", "<>"), ("From", "5551234@vzwpix.com")]);
        assert_eq!(carrier_domain(&message, "unknown"), "vzwpix.com");

        let bare = envelope(&[("Return-Path", "2065551212@mms.example.net"), ("From", "x@y.example")]);
        assert_eq!(carrier_domain(&bare, "unknown"), "y.example");
    }

    #[test]
    fn test_domain_default() {
        let message = envelope(&[("From", "no-at-sign")]);
        assert_eq!(carrier_domain(&message, "unknown"), "unknown");
    }

    #[test]
    fn test_alias_resolution() {
        let aliases = AliasTable::from_json(r#"{"Pictures.SprintPCS.com": "pm.sprint.com"}"#).unwrap();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases.resolve("pictures.sprintpcs.com"), "pm.sprint.com");
        assert_eq!(aliases.resolve("vzwpix.com"), "vzwpix.com");
    }

    #[test]
    fn test_resolve_merges_alias_target() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("default.json"),
            r#"{"ignore": {"image/gif": ["spacer.gif"]}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("aliases.json"),
            r#"{"mms.regional.example": "carrierx"}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("carrierx.json"),
            r#"{"ignore": {"image/gif": ["logo.gif"]}, "number": ["X-Sender", "/\\D/", ""]}"#,
        )
        .unwrap();

        let settings = Settings::new(dir.path().join("stage"), dir.path());
        let resolved = ConfigResolver::new(&settings).resolve("MMS.Regional.Example");

        assert_eq!(resolved.domain, "mms.regional.example");
        assert_eq!(resolved.carrier, "carrierx");
        let gif = resolved.rules.ignore_rules("image/gif");
        assert_eq!(gif.len(), 2);
        assert!(gif[0].equals("spacer.gif"));
        assert!(gif[1].equals("logo.gif"));
        assert!(resolved.rules.number().is_some());
    }

    #[test]
    fn test_resolve_without_any_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("aliases.json"), "[not an object]").unwrap();

        let settings = Settings::new(dir.path().join("stage"), dir.path());
        let resolved = ConfigResolver::new(&settings).resolve("vzwpix.com");
        assert_eq!(resolved.carrier, "vzwpix.com");
        assert!(resolved.rules.is_empty());
    }
}
