//! Adapter interface for handing a staged file to a host framework.

use std::path::Path;

use crate::store::MediaItem;

/// Minimal view of an extracted attachment.
///
/// Host integrations (upload handlers, message models) adapt this instead of
/// depending on [`MediaItem`] directly.
pub trait Attachment {
    /// Location of the file on disk.
    fn path(&self) -> &Path;

    /// Name to present to users or to use when saving.
    fn suggested_filename(&self) -> String;

    /// Size of the file in bytes; `0` if it cannot be read.
    fn byte_size(&self) -> u64;

    /// MIME type of the content.
    fn mime_type(&self) -> &str;
}

impl Attachment for MediaItem {
    fn path(&self) -> &Path {
        Self::path(self)
    }

    fn suggested_filename(&self) -> String {
        self.file_name().unwrap_or("attachment").to_string()
    }

    fn byte_size(&self) -> u64 {
        self.size().unwrap_or(0)
    }

    fn mime_type(&self) -> &str {
        Self::mime_type(self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn describe(attachment: &dyn Attachment) -> String {
        format!(
            "{} ({}, {} bytes)",
            attachment.suggested_filename(),
            attachment.mime_type(),
            attachment.byte_size()
        )
    }

    #[test]
    fn test_media_item_as_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.jpg");
        std::fs::write(&path, [0u8; 42]).unwrap();

        let item = MediaItem::new(&path, "image/jpeg");
        assert_eq!(describe(&item), "photo.jpg (image/jpeg, 42 bytes)");
        assert_eq!(Attachment::path(&item), path);
    }

    #[test]
    fn test_missing_file_reports_zero() {
        let item = MediaItem::new("/nonexistent/clip.3gp", "video/3gpp");
        assert_eq!(item.byte_size(), 0);
        assert_eq!(item.suggested_filename(), "clip.3gp");
    }
}
