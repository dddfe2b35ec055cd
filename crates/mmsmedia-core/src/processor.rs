//! Per-part extraction: effective type, content rewriting and staging.

use mmsmedia_mime::Part;
use tracing::debug;

use crate::error::Result;
use crate::filename;
use crate::rules::RuleSet;
use crate::store::{MediaItem, Staging};
use crate::transform;

/// Content extracted from a leaf part, before staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Output MIME type.
    pub mime_type: String,
    /// Bytes to stage.
    pub content: Vec<u8>,
}

/// Returns `true` for types run through the text transformer.
#[must_use]
pub fn is_text_like(mime_type: &str) -> bool {
    mime_type.starts_with("text/") || mime_type == "application/smil"
}

/// Determines the output type and content of a surviving leaf part.
///
/// Text and SMIL bodies are stripped and transformed. Octet-stream parts
/// take their type from the filename extension and are dropped when it is
/// unknown. Anything else passes through. Empty content yields `None`.
#[must_use]
pub fn extract(part: &Part, filename: &str, rules: &RuleSet) -> Option<Extracted> {
    let mime_type = part.mime_type();

    let extracted = if is_text_like(&mime_type) {
        let content = transform::transform_text(
            rules.transform_rules(&mime_type),
            part.body().trim_ascii(),
            part.charset(),
        );
        Extracted { mime_type, content }
    } else if mime_type == "application/octet-stream" {
        let Some(inferred) = filename::type_for_filename(filename) else {
            debug!("No type for octet-stream part {filename:?}");
            return None;
        };
        Extracted {
            mime_type: inferred,
            content: part.body().to_vec(),
        }
    } else {
        Extracted {
            mime_type,
            content: part.body().to_vec(),
        }
    };

    (!extracted.content.is_empty()).then_some(extracted)
}

/// Extracts a part and stages it.
///
/// # Errors
///
/// Returns an error if the staged file cannot be written.
pub fn process_part(
    part: &Part,
    filename: &str,
    rules: &RuleSet,
    staging: &mut Staging,
) -> Result<Option<MediaItem>> {
    let Some(extracted) = extract(part, filename, rules) else {
        debug!("Nothing to stage for {filename:?}");
        return Ok(None);
    };

    let path = staging.write(filename, &extracted.content)?;
    Ok(Some(MediaItem::new(path, extracted.mime_type)))
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

    #[test]
    fn test_text_is_stripped_and_transformed() {
        let rules = RuleSet::new().with_transform("text/plain", "/\\s*--\\s*Sent via CarrierX$/", "");
        let part = Part::new(ContentType::text_plain(), "\r\n  Hi there -- Sent via CarrierX\r\n");

        let extracted = extract(&part, "a.txt", &rules).unwrap();
        assert_eq!(extracted.mime_type, "text/plain");
        assert_eq!(extracted.content, b"Hi there");
    }

    #[test]
    fn test_smil_is_text_like() {
        assert!(is_text_like("application/smil"));
        assert!(is_text_like("text/html"));
        assert!(!is_text_like("image/jpeg"));
    }

    #[test]
    fn test_octet_stream_takes_type_from_filename() {
        let part = Part::new(ContentType::new("application", "octet-stream"), vec![1, 2, 3]);

        let extracted = extract(&part, "IMG_0042.JPG", &RuleSet::new()).unwrap();
        assert_eq!(extracted.mime_type, "image/jpeg");
        assert_eq!(extracted.content, [1, 2, 3]);

        assert!(extract(&part, "mystery.zzzz", &RuleSet::new()).is_none());
    }

    #[test]
    fn test_transform_to_empty_stages_nothing() {
        let rules = RuleSet::new().with_transform("text/plain", "/.*/m", "");
        let part = Part::new(ContentType::text_plain(), "only an advert");
        assert!(extract(&part, "ad.txt", &rules).is_none());
    }

    #[test]
    fn test_process_part_stages_binary_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = Staging::for_message(dir.path(), Some("m1"));
        let body = vec![0xff, 0xd8, 0x20, 0x20];
        let part = Part::new(ContentType::new("image", "jpeg"), body.clone());

        let item = process_part(&part, "photo.jpg", &RuleSet::new(), &mut staging)
            .unwrap()
            .unwrap();
        assert_eq!(item.mime_type(), "image/jpeg");
        assert_eq!(item.file_name(), Some("photo.jpg"));
        assert_eq!(std::fs::read(item.path()).unwrap(), body);
    }
}
