//! Process-wide settings: where rule files live and where media is staged.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Carrier id used when a message carries no usable envelope domain.
pub const DEFAULT_CARRIER: &str = "unknown";

static GLOBAL: OnceLock<Settings> = OnceLock::new();

/// Locations and fallbacks shared by every session.
///
/// Sessions take a `&Settings` explicitly. A process-wide instance can be
/// installed once at startup with [`install`] and read back with
/// [`Settings::global`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory under which each message gets its own staging tree.
    pub staging_root: PathBuf,
    /// Directory holding `default.json`, `aliases.json` and `<carrier>.json`.
    pub config_dir: PathBuf,
    /// Carrier id used when no domain can be derived from the envelope.
    pub default_carrier: String,
}

impl Default for Settings {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("mmsmedia");

        Self {
            staging_root: std::env::temp_dir().join("mmsmedia"),
            config_dir,
            default_carrier: DEFAULT_CARRIER.to_string(),
        }
    }
}

impl Settings {
    /// Creates settings with explicit directories and the default carrier id.
    #[must_use]
    pub fn new(staging_root: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_root: staging_root.into(),
            config_dir: config_dir.into(),
            default_carrier: DEFAULT_CARRIER.to_string(),
        }
    }

    /// Sets the carrier id used when the envelope has no domain.
    #[must_use]
    pub fn with_default_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.default_carrier = carrier.into().to_lowercase();
        self
    }

    /// Returns the installed process-wide settings, or the defaults.
    ///
    /// The first call without a prior [`install`] pins the defaults.
    pub fn global() -> &'static Self {
        GLOBAL.get_or_init(Self::default)
    }

    /// Path of the global default rule file.
    #[must_use]
    pub fn default_rules_path(&self) -> PathBuf {
        self.config_dir.join("default.json")
    }

    /// Path of the carrier alias table.
    #[must_use]
    pub fn aliases_path(&self) -> PathBuf {
        self.config_dir.join("aliases.json")
    }

    /// Path of the rule file for a canonical carrier id.
    #[must_use]
    pub fn carrier_rules_path(&self, carrier: &str) -> PathBuf {
        let name = sanitize_filename::sanitize(carrier);
        self.config_dir.join(format!("{name}.json"))
    }

    /// Returns the staging root.
    #[must_use]
    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }
}

/// Installs the process-wide settings.
///
/// # Errors
///
/// Returns the rejected settings if an instance was already installed (or
/// [`Settings::global`] already pinned the defaults).
pub fn install(settings: Settings) -> Result<(), Settings> {
    GLOBAL.set(settings)
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
    fn test_default_locations() {
        let settings = Settings::default();
        assert!(settings.staging_root.ends_with("mmsmedia"));
        assert!(settings.config_dir.ends_with("mmsmedia"));
        assert_eq!(settings.default_carrier, DEFAULT_CARRIER);
    }

    #[test]
    fn test_rule_paths() {
        let settings = Settings::new("/tmp/stage", "/etc/mmsmedia");
        assert_eq!(settings.default_rules_path(), Path::new("/etc/mmsmedia/default.json"));
        assert_eq!(settings.aliases_path(), Path::new("/etc/mmsmedia/aliases.json"));
        assert_eq!(
            settings.carrier_rules_path("vzwpix.com"),
            Path::new("/etc/mmsmedia/vzwpix.com.json")
        );
    }

    #[test]
    fn test_carrier_path_cannot_escape_config_dir() {
        let settings = Settings::new("/tmp/stage", "/etc/mmsmedia");
        let path = settings.carrier_rules_path("../../etc/passwd");
        assert_eq!(path.parent(), Some(Path::new("/etc/mmsmedia")));
    }

    #[test]
    fn test_with_default_carrier_lowercases() {
        let settings = Settings::new("a", "b").with_default_carrier("MMS.Example.COM");
        assert_eq!(settings.default_carrier, "mms.example.com");
    }
}
