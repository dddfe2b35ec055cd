//! Best-attachment selection by preferred type and size.

use crate::store::{MediaItem, MediaStore};

/// Preferences used for the default attachment.
pub const DEFAULT_MEDIA_PREFERENCES: [&str; 4] = ["video", "image", "application", "text"];

/// Preferences used for the default text.
pub const DEFAULT_TEXT_PREFERENCES: [&str; 1] = ["text/plain"];

/// Returns `true` if an item satisfies one preference.
///
/// A preference containing `/` must equal the item's type; otherwise it is
/// compared against the coarse type.
#[must_use]
pub fn matches_preference(item: &MediaItem, preference: &str) -> bool {
    if preference.contains('/') {
        item.mime_type().eq_ignore_ascii_case(preference)
    } else {
        item.coarse_type().eq_ignore_ascii_case(preference)
    }
}

/// Returns the largest item whose type matches any preference.
///
/// All matching types compete together; the preference order does not rank
/// them. Ties go to the item staged first. Items whose size cannot be read
/// are skipped.
#[must_use]
pub fn select<'a>(store: &'a MediaStore, preferences: &[&str]) -> Option<&'a MediaItem> {
    let mut best: Option<(u64, &MediaItem)> = None;

    let candidates = store
        .items()
        .filter(|item| preferences.iter().any(|p| matches_preference(item, p)));
    for item in candidates {
        let Some(size) = item.size() else {
            continue;
        };
        if best.is_none_or(|(best_size, _)| size > best_size) {
            best = Some((size, item));
        }
    }

    best.map(|(_, item)| item)
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
    use std::path::Path;

    fn stage(dir: &Path, name: &str, mime_type: &str, size: usize) -> MediaItem {
        let path = dir.join(name);
        std::fs::write(&path, vec![b'x'; size]).unwrap();
        MediaItem::new(path, mime_type)
    }

    fn sample_store(dir: &Path) -> MediaStore {
        let mut store = MediaStore::new();
        store.push(stage(dir, "big.jpg", "image/jpeg", 5 * 1024));
        store.push(stage(dir, "small.jpg", "image/jpeg", 1024));
        store.push(stage(dir, "clip.3gp", "video/3gpp", 2 * 1024));
        store
    }

    #[test]
    fn test_union_largest_wins() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample_store(dir.path());

        let best = select(&store, &["video", "image"]).unwrap();
        assert_eq!(best.file_name(), Some("big.jpg"));
    }

    #[test]
    fn test_narrow_preference() {
        let dir = tempfile::tempdir().unwrap();
        let store = sample_store(dir.path());

        assert_eq!(select(&store, &["video"]).unwrap().file_name(), Some("clip.3gp"));
        assert_eq!(select(&store, &["image"]).unwrap().file_name(), Some("big.jpg"));
        assert!(select(&store, &["audio"]).is_none());
    }

    #[test]
    fn test_tie_goes_to_first_staged() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MediaStore::new();
        store.push(stage(dir.path(), "first.gif", "image/gif", 100));
        store.push(stage(dir.path(), "second.png", "image/png", 100));

        assert_eq!(select(&store, &["image"]).unwrap().file_name(), Some("first.gif"));
    }

    #[test]
    fn test_exact_type_preference() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = MediaStore::new();
        store.push(stage(dir.path(), "page.html", "text/html", 900));
        store.push(stage(dir.path(), "note.txt", "text/plain", 10));

        let text = select(&store, &DEFAULT_TEXT_PREFERENCES).unwrap();
        assert_eq!(text.file_name(), Some("note.txt"));
    }

    #[test]
    fn test_unreadable_items_are_skipped() {
        let mut store = MediaStore::new();
        store.push(MediaItem::new("/nonexistent/a.jpg", "image/jpeg"));
        assert!(select(&store, &["image"]).is_none());
    }

    #[test]
    fn test_matches_preference() {
        let jpeg = MediaItem::new("/s/1/a.jpg", "image/jpeg");
        assert!(matches_preference(&jpeg, "image"));
        assert!(matches_preference(&jpeg, "IMAGE/JPEG"));
        assert!(!matches_preference(&jpeg, "image/png"));
        assert!(!matches_preference(&MediaItem::new("/s/1/x", "imagery/x"), "image"));
    }
}
