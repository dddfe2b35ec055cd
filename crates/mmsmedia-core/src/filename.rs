//! Filename resolution and extension/type mapping for leaf parts.

use chrono::{DateTime, Local};
use mmsmedia_mime::Part;

/// Longest filename kept, in bytes.
pub const MAX_FILENAME_BYTES: usize = 255;

/// Default extensions for types common in carrier MMS.
const EXTENSIONS: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/pjpeg", "jpg"),
    ("image/gif", "gif"),
    ("image/png", "png"),
    ("image/bmp", "bmp"),
    ("image/vnd.wap.wbmp", "wbmp"),
    ("video/3gpp", "3gp"),
    ("video/3gpp2", "3g2"),
    ("video/mp4", "mp4"),
    ("video/quicktime", "mov"),
    ("audio/amr", "amr"),
    ("audio/mpeg", "mp3"),
    ("audio/mp4", "m4a"),
    ("text/plain", "txt"),
    ("text/html", "html"),
    ("text/x-vcard", "vcf"),
    ("text/vcard", "vcf"),
    ("application/smil", "smil"),
    ("application/octet-stream", "bin"),
];

/// Returns the default extension for a MIME type, without the dot.
#[must_use]
pub fn default_extension(mime_type: &str) -> String {
    let mime_type = mime_type.to_ascii_lowercase();

    if let Some((_, ext)) = EXTENSIONS.iter().find(|(t, _)| *t == mime_type) {
        return (*ext).to_string();
    }
    if let Some(ext) = mime_guess::get_mime_extensions_str(&mime_type).and_then(|e| e.first()) {
        return (*ext).to_string();
    }

    let subtype: String = mime_type
        .split_once('/')
        .map_or("", |(_, sub)| sub)
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    if subtype.is_empty() {
        "bin".to_string()
    } else {
        subtype
    }
}

/// Infers a concrete MIME type from a filename's extension.
///
/// Returns `None` when the extension is unknown or only maps to
/// `application/octet-stream`.
#[must_use]
pub fn type_for_filename(name: &str) -> Option<String> {
    let ext = extension(name)?.to_ascii_lowercase();

    EXTENSIONS
        .iter()
        .find(|(_, e)| *e == ext)
        .map(|(t, _)| *t)
        .or_else(|| mime_guess::from_ext(&ext).first_raw())
        .filter(|t| *t != "application/octet-stream")
        .map(str::to_string)
}

/// Returns the short (1-4 character) extension of a name, if it has one.
fn extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    let short = (1..=4).contains(&ext.chars().count());
    (short && !stem.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric())).then_some(ext)
}

/// Resolves the filename of a leaf part.
///
/// Tries the Content-Type `name`, the Content-Disposition `filename`, the
/// Content-Location and the Content-ID in that order, and otherwise
/// synthesizes a timestamped name. A default extension is appended when the
/// name lacks one. Never empty.
#[must_use]
pub fn resolve(part: &Part) -> String {
    resolve_at(part, Local::now())
}

fn resolve_at(part: &Part, now: DateTime<Local>) -> String {
    let ext = default_extension(&part.mime_type());

    let declared = part
        .header_subvalue("content-type", "name")
        .or_else(|| part.header_subvalue("content-disposition", "filename"))
        .or_else(|| part.raw_header("content-location"))
        .or_else(|| part.raw_header("content-id").map(strip_angle_brackets))
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let name = match declared {
        Some(name) if extension(name).is_some() => name.to_string(),
        Some(name) => format!("{name}.{ext}"),
        None => format!("{}.{ext}", now.format("%Y%m%d%H%M%S%3f")),
    };

    truncate(&name)
}

fn strip_angle_brackets(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('<')
        .and_then(|inner| inner.strip_suffix('>'))
        .unwrap_or(value)
}

/// Shortens a name to [`MAX_FILENAME_BYTES`], keeping its extension.
fn truncate(name: &str) -> String {
    if name.len() <= MAX_FILENAME_BYTES {
        return name.to_string();
    }

    let suffix = extension(name).map_or(String::new(), |ext| format!(".{ext}"));
    let mut end = MAX_FILENAME_BYTES - suffix.len();
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{suffix}", &name[..end])
}

/// Reduces a resolved name to a safe basename for the staging directory.
#[must_use]
pub fn staged_name(name: &str) -> String {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let sanitized = sanitize_filename::sanitize(basename);
    if sanitized.is_empty() {
        "part".to_string()
    } else {
        sanitized
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
    use chrono::TimeZone;
    use mmsmedia_mime::{ContentDisposition, ContentType};

    fn jpeg() -> ContentType {
        ContentType::new("image", "jpeg")
    }

    #[test]
    fn test_priority_order() {
        let part = Part::new(jpeg().with_parameter("name", "from-type.jpg"), "x")
            .with_disposition(ContentDisposition::new("inline").with_parameter("filename", "from-disp.jpg"))
            .with_header("Content-Location", "from-location.jpg")
            .with_header("Content-ID", "<from-id.jpg>");
        assert_eq!(resolve(&part), "from-type.jpg");

        let part = Part::new(jpeg(), "x")
            .with_disposition(ContentDisposition::new("inline").with_parameter("filename", "from-disp.jpg"))
            .with_header("Content-Location", "from-location.jpg");
        assert_eq!(resolve(&part), "from-disp.jpg");

        let part = Part::new(jpeg(), "x")
            .with_header("Content-Location", "from-location.jpg")
            .with_header("Content-ID", "<from-id.jpg>");
        assert_eq!(resolve(&part), "from-location.jpg");

        let part = Part::new(jpeg(), "x").with_header("Content-ID", "<from-id.jpg>");
        assert_eq!(resolve(&part), "from-id.jpg");
    }

    #[test]
    fn test_default_extension_appended() {
        let part = Part::new(jpeg(), "x").with_header("Content-ID", "<0001>");
        assert_eq!(resolve(&part), "0001.jpg");

        let part = Part::new(ContentType::new("video", "3gpp"), "x")
            .with_header("Content-Location", "clip.longextension");
        assert_eq!(resolve(&part), "clip.longextension.3gp");
    }

    #[test]
    fn test_synthesized_name() {
        let now = Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 45).unwrap();
        let part = Part::new(ContentType::text_plain(), "Hello");
        assert_eq!(resolve_at(&part, now), "20240501123045000.txt");
    }

    #[test]
    fn test_long_name_keeps_extension() {
        let long = format!("{}.jpg", "a".repeat(400));
        let part = Part::new(jpeg().with_parameter("name", long), "x");
        let name = resolve(&part);
        assert_eq!(name.len(), MAX_FILENAME_BYTES);
        assert!(name.ends_with("a.jpg"));
    }

    #[test]
    fn test_default_extension_lookup() {
        assert_eq!(default_extension("image/jpeg"), "jpg");
        assert_eq!(default_extension("VIDEO/3GPP2"), "3g2");
        assert_eq!(default_extension("application/x-mms-unknown"), "xmmsunknown");
    }

    #[test]
    fn test_type_for_filename() {
        assert_eq!(type_for_filename("IMG_0001.JPG").as_deref(), Some("image/jpeg"));
        assert_eq!(type_for_filename("clip.3gp").as_deref(), Some("video/3gpp"));
        assert_eq!(type_for_filename("track.mp3").as_deref(), Some("audio/mpeg"));
        assert_eq!(type_for_filename("blob.bin"), None);
        assert_eq!(type_for_filename("no-extension"), None);
    }

    #[test]
    fn test_staged_name_is_a_basename() {
        assert_eq!(staged_name("../../etc/passwd.jpg"), "passwd.jpg");
        assert_eq!(staged_name("http://carrier.example/media/photo.jpg"), "photo.jpg");
        assert_eq!(staged_name("C:\\Users\\me\\pic.gif"), "pic.gif");
        assert_eq!(staged_name("/"), "part");
    }
}
