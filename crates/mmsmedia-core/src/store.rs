//! Staged media files and the per-message staging tree.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::filename;

/// A staged media file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    path: PathBuf,
    mime_type: String,
}

impl MediaItem {
    /// Creates an item for a file already written to disk.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into().to_lowercase(),
        }
    }

    /// Path of the staged file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// MIME type the file was staged under.
    #[must_use]
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Portion of the MIME type before the slash.
    #[must_use]
    pub fn coarse_type(&self) -> &str {
        self.mime_type
            .split_once('/')
            .map_or(self.mime_type.as_str(), |(coarse, _)| coarse)
    }

    /// Basename of the staged file.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    /// Current size on disk, or `None` if the file cannot be inspected.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|meta| meta.len())
    }
}

/// Staged items grouped by MIME type.
///
/// Types keep the order they were first seen; items keep the order they
/// were staged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaStore {
    entries: Vec<(String, Vec<MediaItem>)>,
}

impl MediaStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an item under its MIME type.
    pub fn push(&mut self, item: MediaItem) {
        match self
            .entries
            .iter_mut()
            .find(|(mime_type, _)| *mime_type == item.mime_type)
        {
            Some((_, items)) => items.push(item),
            None => self.entries.push((item.mime_type.clone(), vec![item])),
        }
    }

    /// Items staged under an exact MIME type.
    #[must_use]
    pub fn get(&self, mime_type: &str) -> &[MediaItem] {
        let mime_type = mime_type.to_lowercase();
        self.entries
            .iter()
            .find(|(t, _)| *t == mime_type)
            .map(|(_, items)| items.as_slice())
            .unwrap_or_default()
    }

    /// Iterates `(type, items)` entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[MediaItem])> {
        self.entries
            .iter()
            .map(|(mime_type, items)| (mime_type.as_str(), items.as_slice()))
    }

    /// Iterates every item in staging order within each type.
    pub fn items(&self) -> impl Iterator<Item = &MediaItem> {
        self.entries.iter().flat_map(|(_, items)| items)
    }

    /// MIME types present, in first-seen order.
    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(mime_type, _)| mime_type.as_str())
    }

    /// Total number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, items)| items.len()).sum()
    }

    /// Returns `true` if nothing has been staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Staging tree of one message: `<root>/<n>/<basename>`.
#[derive(Debug, Clone)]
pub struct Staging {
    root: PathBuf,
    counter: usize,
}

impl Staging {
    /// Creates the staging tree location for a message.
    ///
    /// The directory is named after the sanitized Message-ID, or a timestamp
    /// when there is none. A relative root is resolved against the current
    /// directory. Nothing is created until the first write.
    #[must_use]
    pub fn for_message(staging_root: &Path, message_id: Option<&str>) -> Self {
        let staging_root = std::path::absolute(staging_root).unwrap_or_else(|e| {
            warn!("Cannot resolve staging root {}: {e}", staging_root.display());
            staging_root.to_path_buf()
        });
        let name = message_id
            .map(sanitize_filename::sanitize)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| {
                format!(
                    "{}-{}",
                    Local::now().format("%Y%m%d%H%M%S%6f"),
                    std::process::id()
                )
            });

        Self {
            root: staging_root.join(name),
            counter: 0,
        }
    }

    /// Root of this message's staging tree.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes content into the next numbered subdirectory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Staging`] if the directory or file cannot be written.
    pub fn write(&mut self, name: &str, content: &[u8]) -> Result<PathBuf> {
        self.counter += 1;
        let dir = self.root.join(self.counter.to_string());
        fs::create_dir_all(&dir).map_err(|source| Error::Staging {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(filename::staged_name(name));
        fs::write(&path, content).map_err(|source| Error::Staging {
            path: path.clone(),
            source,
        })?;

        debug!("Staged {} bytes at {}", content.len(), path.display());
        Ok(path)
    }

    /// Restarts subdirectory numbering.
    pub const fn reset(&mut self) {
        self.counter = 0;
    }

    /// Deletes the staging tree. Missing trees are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing tree cannot be removed.
    pub fn purge(&self) -> Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => {
                debug!("Purged {}", self.root.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
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

    #[test]
    fn test_store_preserves_order() {
        let mut store = MediaStore::new();
        store.push(MediaItem::new("/s/1/a.jpg", "image/jpeg"));
        store.push(MediaItem::new("/s/2/b.txt", "text/plain"));
        store.push(MediaItem::new("/s/3/c.jpg", "Image/JPEG"));

        assert_eq!(store.len(), 3);
        assert_eq!(store.types().collect::<Vec<_>>(), ["image/jpeg", "text/plain"]);
        let jpegs: Vec<_> = store.get("image/jpeg").iter().map(MediaItem::path).collect();
        assert_eq!(jpegs, [Path::new("/s/1/a.jpg"), Path::new("/s/3/c.jpg")]);
        assert!(store.get("video/mp4").is_empty());
    }

    #[test]
    fn test_item_accessors() {
        let item = MediaItem::new("/s/1/clip.3gp", "video/3gpp");
        assert_eq!(item.coarse_type(), "video");
        assert_eq!(item.file_name(), Some("clip.3gp"));
        assert_eq!(item.size(), None);
    }

    #[test]
    fn test_relative_root_becomes_absolute() {
        let staging = Staging::for_message(Path::new("stage"), Some("rel@mms.example.net"));
        assert!(staging.root().is_absolute());
        assert!(staging.root().ends_with("stage/rel@mms.example.net"));

        let item = MediaItem::new(staging.root().join("1").join("a.jpg"), "image/jpeg");
        assert!(item.path().is_absolute());
    }

    #[test]
    fn test_staging_numbers_each_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = Staging::for_message(dir.path(), Some("abc@mms.example.net"));

        let first = staging.write("photo.jpg", b"one").unwrap();
        let second = staging.write("photo.jpg", b"two").unwrap();

        assert_ne!(first, second);
        assert_eq!(first, staging.root().join("1").join("photo.jpg"));
        assert_eq!(second, staging.root().join("2").join("photo.jpg"));
        assert_eq!(fs::read(&second).unwrap(), b"two");
    }

    #[test]
    fn test_staging_stays_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = Staging::for_message(dir.path(), Some("../../escape"));
        assert!(staging.root().starts_with(dir.path()));

        let path = staging.write("../../../outside.jpg", b"x").unwrap();
        assert!(path.starts_with(staging.root()));
    }

    #[test]
    fn test_staging_without_message_id() {
        let dir = tempfile::tempdir().unwrap();
        let staging = Staging::for_message(dir.path(), None);
        assert_eq!(staging.root().parent(), Some(dir.path()));
    }

    #[test]
    fn test_purge_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut staging = Staging::for_message(dir.path(), Some("id"));
        staging.write("a.txt", b"a").unwrap();

        staging.purge().unwrap();
        assert!(!staging.root().exists());
        staging.purge().unwrap();
    }

    #[test]
    fn test_write_failure_is_staging_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"not a directory").unwrap();

        let mut staging = Staging::for_message(&blocker, Some("id"));
        let err = staging.write("a.txt", b"a").unwrap_err();
        assert!(matches!(err, Error::Staging { .. }));
    }
}
