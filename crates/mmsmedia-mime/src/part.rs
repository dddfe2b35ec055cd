//! MIME part tree.

use crate::content_type::{ContentDisposition, ContentType};
use crate::header::Headers;

/// MIME message part.
///
/// Leaf parts carry a transfer-decoded body; multipart parts carry their
/// children in wire order and an empty body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    headers: Headers,
    content_type: ContentType,
    disposition: Option<ContentDisposition>,
    body: Vec<u8>,
    children: Vec<Part>,
}

impl Part {
    /// Creates a leaf part.
    #[must_use]
    pub fn new(content_type: ContentType, body: impl Into<Vec<u8>>) -> Self {
        Self {
            headers: Headers::new(),
            content_type,
            disposition: None,
            body: body.into(),
            children: Vec::new(),
        }
    }

    /// Creates a multipart part with the given children.
    #[must_use]
    pub fn multipart(content_type: ContentType, children: Vec<Self>) -> Self {
        Self {
            headers: Headers::new(),
            content_type,
            disposition: None,
            body: Vec::new(),
            children,
        }
    }

    /// Adds a raw header such as `Content-Location` or `Content-ID`.
    ///
    /// Content-Type and Content-Disposition are carried by their own
    /// fields; see [`Part::new`] and [`Part::with_disposition`].
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl AsRef<str>) -> Self {
        self.headers.add(name, value);
        self
    }

    /// Sets the Content-Disposition.
    #[must_use]
    pub fn with_disposition(mut self, disposition: ContentDisposition) -> Self {
        self.disposition = Some(disposition);
        self
    }

    pub(crate) fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Returns `type/subtype` in lowercase.
    #[must_use]
    pub fn mime_type(&self) -> String {
        self.content_type.essence()
    }

    /// Returns the parsed Content-Type.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Returns the parsed Content-Disposition, if any.
    #[must_use]
    pub const fn disposition(&self) -> Option<&ContentDisposition> {
        self.disposition.as_ref()
    }

    /// Returns all raw headers of this part.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Checks if this part is a multipart container.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.content_type.is_multipart()
    }

    /// Returns the child parts in wire order (empty for leaf parts).
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Returns a parameter of a structured header.
    ///
    /// `header_subvalue("content-type", "name")` and
    /// `header_subvalue("content-disposition", "filename")` are the common
    /// cases; any other header is parsed as `value; key=value` on demand.
    #[must_use]
    pub fn header_subvalue(&self, header: &str, parameter: &str) -> Option<&str> {
        if header.eq_ignore_ascii_case("content-type") {
            return self.content_type.parameter(parameter);
        }
        if header.eq_ignore_ascii_case("content-disposition") {
            return self.disposition.as_ref()?.parameter(parameter);
        }

        let raw = self.headers.get(header)?;
        let (_, params) = raw.split_once(';')?;
        params.split(';').find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim()
                .eq_ignore_ascii_case(parameter)
                .then(|| value.trim().trim_matches('"'))
        })
    }

    /// Returns the first raw value of a header.
    #[must_use]
    pub fn raw_header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Returns the decoded body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the declared charset, if any.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.content_type.charset()
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
    fn test_leaf_part() {
        let part = Part::new(ContentType::new("image", "jpeg"), b"\xff\xd8\xff".to_vec());
        assert_eq!(part.mime_type(), "image/jpeg");
        assert!(!part.is_multipart());
        assert!(part.children().is_empty());
        assert_eq!(part.body(), b"\xff\xd8\xff");
    }

    #[test]
    fn test_multipart_children_keep_order() {
        let first = Part::new(ContentType::text_plain(), "one");
        let second = Part::new(ContentType::text_plain(), "two");
        let root = Part::multipart(ContentType::new("multipart", "mixed"), vec![first, second]);

        assert!(root.is_multipart());
        assert!(root.body().is_empty());
        let bodies: Vec<_> = root.children().iter().map(Part::body).collect();
        assert_eq!(bodies, vec![b"one".as_slice(), b"two".as_slice()]);
    }

    #[test]
    fn test_header_subvalue() {
        let part = Part::new(
            ContentType::new("image", "gif").with_parameter("name", "logo.gif"),
            "GIF89a",
        )
        .with_disposition(ContentDisposition::new("inline").with_parameter("filename", "x.gif"))
        .with_header("X-Mms-Extra", "tag; key=\"value\"");

        assert_eq!(part.header_subvalue("Content-Type", "name"), Some("logo.gif"));
        assert_eq!(part.header_subvalue("content-disposition", "filename"), Some("x.gif"));
        assert_eq!(part.header_subvalue("x-mms-extra", "KEY"), Some("value"));
        assert_eq!(part.header_subvalue("content-type", "charset"), None);
        assert_eq!(part.header_subvalue("missing", "name"), None);
    }

    #[test]
    fn test_raw_header_and_charset() {
        let part = Part::new(
            ContentType::text_plain().with_parameter("charset", "iso-8859-1"),
            "caf\u{e9}",
        )
        .with_header("Content-ID", "<0001>");

        assert_eq!(part.raw_header("content-id"), Some("<0001>"));
        assert_eq!(part.charset(), Some("iso-8859-1"));
    }
}
