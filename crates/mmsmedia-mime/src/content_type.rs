//! Content-Type and Content-Disposition handling.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "jpeg", "related").
    pub sub_type: String,
    /// Parameters keyed by lowercase name (e.g., charset=utf-8, name=photo.jpg).
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type. Both halves are lowercased.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into().trim().to_lowercase(),
            sub_type: sub_type.into().trim().to_lowercase(),
            parameters: HashMap::new(),
        }
    }

    /// Creates a text/plain content type, the RFC 2045 default.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain")
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Returns `type/subtype` without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Returns a parameter by case-insensitive name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    ///
    /// # Errors
    ///
    /// Returns an error if the type or subtype is missing.
    pub fn parse(s: &str) -> Result<Self> {
        let (type_str, params) = s.split_once(';').unwrap_or((s, ""));

        let (main_type, sub_type) = type_str
            .trim()
            .split_once('/')
            .ok_or_else(|| Error::InvalidContentType(format!("Missing subtype in {s:?}")))?;

        if main_type.trim().is_empty() || sub_type.trim().is_empty() {
            return Err(Error::InvalidContentType(format!("Empty type in {s:?}")));
        }

        let mut content_type = Self::new(main_type, sub_type);
        content_type.parameters = parse_parameters(params);
        Ok(content_type)
    }
}

/// Content-Disposition header (RFC 2183) with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type, lowercased (e.g., "attachment", "inline").
    pub kind: String,
    /// Parameters keyed by lowercase name (e.g., filename=photo.jpg).
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Creates a disposition without parameters.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into().trim().to_lowercase(),
            parameters: HashMap::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Returns a parameter by case-insensitive name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Parses a disposition string such as `attachment; filename="a.jpg"`.
    ///
    /// Never fails: an empty kind is kept as-is so the parameters survive.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let (kind, params) = s.split_once(';').unwrap_or((s, ""));
        let mut disposition = Self::new(kind);
        disposition.parameters = parse_parameters(params);
        disposition
    }
}

/// Parses `; key=value; key="quoted value"` parameter lists.
fn parse_parameters(params: &str) -> HashMap<String, String> {
    params
        .split(';')
        .filter_map(|param| {
            let (key, value) = param.trim().split_once('=')?;
            let key = key.trim().to_lowercase();
            if key.is_empty() {
                return None;
            }
            Some((key, value.trim().trim_matches('"').to_string()))
        })
        .collect()
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
    fn test_content_type_new_lowercases() {
        let ct = ContentType::new("Image", "JPEG");
        assert_eq!(ct.essence(), "image/jpeg");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("text/plain; charset=utf-8").unwrap();
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_content_type_parse_quoted_name() {
        let ct = ContentType::parse("image/jpeg; Name=\"my photo.jpg\"").unwrap();
        assert_eq!(ct.parameter("name"), Some("my photo.jpg"));
        assert_eq!(ct.parameter("NAME"), Some("my photo.jpg"));
    }

    #[test]
    fn test_content_type_parse_missing_subtype() {
        assert!(ContentType::parse("text").is_err());
        assert!(ContentType::parse("/plain").is_err());
    }

    #[test]
    fn test_multipart_detection() {
        assert!(ContentType::new("multipart", "related").is_multipart());
        assert!(!ContentType::new("application", "smil").is_multipart());
    }

    #[test]
    fn test_disposition_parse() {
        let cd = ContentDisposition::parse("Attachment; filename=\"IMG_0001.JPG\"");
        assert_eq!(cd.kind, "attachment");
        assert_eq!(cd.parameter("FileName"), Some("IMG_0001.JPG"));
    }

    #[test]
    fn test_disposition_without_parameters() {
        let cd = ContentDisposition::parse("inline");
        assert_eq!(cd.kind, "inline");
        assert!(cd.parameters.is_empty());
    }

    proptest! {
        #[test]
        fn parse_recovers_any_token_pair(
            main in "[a-z][a-z0-9.+-]{0,12}",
            sub in "[a-z][a-z0-9.+-]{0,12}",
        ) {
            let ct = ContentType::parse(&format!("{main}/{sub}; charset=us-ascii")).unwrap();
            prop_assert_eq!(ct.essence(), format!("{main}/{sub}"));
            prop_assert_eq!(ct.charset(), Some("us-ascii"));
        }
    }
}
