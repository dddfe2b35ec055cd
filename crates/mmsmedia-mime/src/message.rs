//! MIME message structure and parsing.

use crate::content_type::{ContentDisposition, ContentType};
use crate::error::{Error, Result};
use crate::header::Headers;
use crate::part::Part;
use mail_parser::{Address, MessageParser, MimeHeaders};

/// MIME message: envelope headers plus the root [`Part`].
#[derive(Debug, Clone)]
pub struct Message {
    headers: Headers,
    from: Vec<String>,
    subject: Option<String>,
    message_id: Option<String>,
    root: Part,
}

impl Message {
    /// Creates a message from top-level headers and a root part.
    ///
    /// From, Subject and Message-ID are read from the raw headers.
    #[must_use]
    pub fn new(headers: Headers, root: Part) -> Self {
        let from = headers
            .get("from")
            .map(addresses_from_raw)
            .unwrap_or_default();
        let subject = headers.get("subject").map(str::to_string);
        let message_id = headers
            .get("message-id")
            .map(strip_angle_brackets)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Self {
            headers,
            from,
            subject,
            message_id,
            root,
        }
    }

    /// Parses a raw RFC 5322 message.
    ///
    /// Bodies are transfer-decoded; text bodies are also charset-decoded to
    /// UTF-8 (their `charset` parameter is rewritten accordingly).
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not recognizable as a message.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let parsed = MessageParser::default()
            .parse(raw)
            .ok_or_else(|| Error::Parse("input is not an RFC 5322 message".to_string()))?;

        let root = convert_part(&parsed, raw, 0)?;

        let from = match parsed.from() {
            Some(Address::List(addrs)) => addrs
                .iter()
                .filter_map(|a| a.address.as_deref().map(str::to_string))
                .collect(),
            Some(Address::Group(groups)) => groups
                .iter()
                .flat_map(|g| {
                    g.addresses
                        .iter()
                        .filter_map(|a| a.address.as_deref().map(str::to_string))
                })
                .collect(),
            None => Vec::new(),
        };

        Ok(Self {
            headers: root.headers().clone(),
            from,
            subject: parsed.subject().map(str::to_string),
            message_id: parsed.message_id().map(str::to_string),
            root,
        })
    }

    /// Returns the top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Gets the first raw value of a top-level header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Gets the raw Return-Path header, e.g. `<2065551212@mms.example.com>`.
    #[must_use]
    pub fn return_path(&self) -> Option<&str> {
        self.headers.get("return-path")
    }

    /// Gets the From addresses in header order.
    #[must_use]
    pub fn from(&self) -> &[String] {
        &self.from
    }

    /// Gets the decoded Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Gets the Message-ID without angle brackets.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Gets the root part (the message itself, possibly multipart).
    #[must_use]
    pub const fn root(&self) -> &Part {
        &self.root
    }
}

/// Copies one parsed part (and its subtree) into an owned [`Part`].
fn convert_part(parsed: &mail_parser::Message<'_>, raw: &[u8], id: u32) -> Result<Part> {
    let source = parsed
        .part(id)
        .ok_or_else(|| Error::Parse(format!("missing MIME part {id}")))?;

    let mut headers = Headers::new();
    for header in source.headers() {
        let value = raw
            .get(header.offset_start() as usize..header.offset_end() as usize)
            .map(String::from_utf8_lossy)
            .unwrap_or_default();
        headers.add(header.name(), value);
    }

    let mut content_type = headers
        .get("content-type")
        .and_then(|value| ContentType::parse(value).ok())
        .unwrap_or_else(ContentType::text_plain);
    if let Some(parsed_type) = source.content_type() {
        // RFC 2047/2231 encoded parameters arrive decoded from the parser.
        if let Some(name) = parsed_type.attribute("name") {
            content_type
                .parameters
                .insert("name".to_string(), name.to_string());
        }
    }
    if source.is_text() {
        content_type
            .parameters
            .insert("charset".to_string(), "utf-8".to_string());
    }

    let disposition = source.content_disposition().map(|parsed_disposition| {
        let mut disposition = headers.get("content-disposition").map_or_else(
            || ContentDisposition::new(parsed_disposition.ctype()),
            ContentDisposition::parse,
        );
        if let Some(filename) = parsed_disposition.attribute("filename") {
            disposition
                .parameters
                .insert("filename".to_string(), filename.to_string());
        }
        disposition
    });

    let mut part = match source.sub_parts() {
        Some(children) => {
            let children = children
                .iter()
                .map(|&child| convert_part(parsed, raw, child))
                .collect::<Result<Vec<_>>>()?;
            Part::multipart(content_type, children)
        }
        None => Part::new(content_type, source.contents()),
    };
    if let Some(disposition) = disposition {
        part = part.with_disposition(disposition);
    }

    Ok(part.with_headers(headers))
}

fn strip_angle_brackets(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('<')
        .and_then(|inner| inner.strip_suffix('>'))
        .unwrap_or(value)
}

/// Extracts bare addresses from a raw address-list header.
fn addresses_from_raw(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter_map(|entry| {
            let entry = entry.trim();
            let address = match (entry.find('<'), entry.rfind('>')) {
                (Some(start), Some(end)) if start < end => &entry[start + 1..end],
                _ => entry,
            };
            let address = address.trim();
            (!address.is_empty()).then(|| address.to_string())
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

    const MULTIPART: &str = concat!(
        "Return-Path: <2065551212@mms.example.net>\r\n",
        "From: 2065551212@mms.example.net\r\n",
        "To: inbox@example.com\r\n",
        "Subject: Multimedia message\r\n",
        "Message-ID: <abc.123@mms.example.net>\r\n",
        "MIME-Version: 1.0\r\n",
        "Content-Type: multipart/mixed; boundary=\"outer\"\r\n",
        "\r\n",
        "--outer\r\n",
        "Content-Type: text/plain; charset=us-ascii\r\n",
        "\r\n",
        "Hello world.\r\n",
        "--outer\r\n",
        "Content-Type: image/jpeg; name=\"photo.jpg\"\r\n",
        "Content-Transfer-Encoding: base64\r\n",
        "Content-Disposition: attachment; filename=\"photo.jpg\"\r\n",
        "Content-Location: photo.jpg\r\n",
        "\r\n",
        "/9j/4AAQ\r\n",
        "--outer--\r\n",
    );

    #[test]
    fn test_parse_envelope() {
        let message = Message::parse(MULTIPART.as_bytes()).unwrap();
        assert_eq!(message.return_path(), Some("<2065551212@mms.example.net>"));
        assert_eq!(message.from(), ["2065551212@mms.example.net"]);
        assert_eq!(message.subject(), Some("Multimedia message"));
        assert_eq!(message.message_id(), Some("abc.123@mms.example.net"));
    }

    #[test]
    fn test_parse_parts() {
        let message = Message::parse(MULTIPART.as_bytes()).unwrap();
        let root = message.root();
        assert!(root.is_multipart());
        assert_eq!(root.children().len(), 2);

        let text = &root.children()[0];
        assert_eq!(text.mime_type(), "text/plain");
        assert_eq!(text.body().trim_ascii(), b"Hello world.");

        let photo = &root.children()[1];
        assert_eq!(photo.mime_type(), "image/jpeg");
        assert_eq!(photo.header_subvalue("content-type", "name"), Some("photo.jpg"));
        assert_eq!(photo.header_subvalue("content-disposition", "filename"), Some("photo.jpg"));
        assert_eq!(photo.raw_header("content-location"), Some("photo.jpg"));
        assert_eq!(photo.body(), &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10]);
    }

    #[test]
    fn test_parse_single_part() {
        let raw = "From: a@b.example\r\nSubject: hi\r\n\r\nJust text\r\n";
        let message = Message::parse(raw.as_bytes()).unwrap();
        assert!(!message.root().is_multipart());
        assert_eq!(message.root().mime_type(), "text/plain");
        assert_eq!(message.return_path(), None);
    }

    #[test]
    fn test_new_reads_raw_headers() {
        let mut headers = Headers::new();
        headers.add("From", "\"Pix\" <5551234@pix.example.com>, other@example.com");
        headers.add("Message-ID", "<id-1@example.com>");
        let message = Message::new(headers, Part::new(ContentType::text_plain(), "x"));

        assert_eq!(message.from(), ["5551234@pix.example.com", "other@example.com"]);
        assert_eq!(message.message_id(), Some("id-1@example.com"));
        assert_eq!(message.subject(), None);
    }
}
