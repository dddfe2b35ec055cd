//! MIME header handling.

use std::collections::HashMap;

/// Collection of raw header values keyed by lowercase name.
///
/// Values are unfolded and trimmed but otherwise left exactly as they
/// appeared on the wire, so carrier-specific formats survive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: HashMap<String, Vec<String>>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header value, unfolding continuation lines.
    pub fn add(&mut self, name: impl Into<String>, value: impl AsRef<str>) {
        let name = name.into().trim().to_lowercase();
        let value = unfold(value.as_ref());
        self.headers.entry(name).or_default().push(value);
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_lowercase())
            .and_then(|v| v.first().map(String::as_str))
    }
}

/// Joins folded header lines with single spaces and trims the result.
fn unfold(value: &str) -> String {
    let mut unfolded = String::with_capacity(value.len());
    for line in value.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !unfolded.is_empty() {
            unfolded.push(' ');
        }
        unfolded.push_str(line);
    }
    unfolded
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
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Location", "photo.jpg");
        assert_eq!(headers.get("Content-Location"), Some("photo.jpg"));
        assert_eq!(headers.get("content-location"), Some("photo.jpg")); // Case insensitive
        assert_eq!(headers.get("Content-ID"), None);
    }

    #[test]
    fn test_headers_first_value_wins() {
        let mut headers = Headers::new();
        headers.add("Received", "from a");
        headers.add("Received", "from b");
        assert_eq!(headers.get("received"), Some("from a"));
    }

    #[test]
    fn test_headers_unfold() {
        let mut headers = Headers::new();
        headers.add("Content-Type", " image/jpeg;\r\n\tname=\"a.jpg\"\r\n");
        assert_eq!(headers.get("content-type"), Some("image/jpeg; name=\"a.jpg\""));
    }
}
