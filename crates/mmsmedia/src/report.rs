//! Session summary printed by the command line.

use std::fmt;
use std::path::PathBuf;

use mmsmedia_core::{Attachment, Session};
use serde::Serialize;

/// One staged file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    /// MIME type the file was staged under.
    pub mime_type: String,
    /// Path of the staged file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
}

impl ItemReport {
    fn new(item: &impl Attachment) -> Self {
        Self {
            mime_type: item.mime_type().to_string(),
            path: item.path().to_path_buf(),
            size: item.byte_size(),
        }
    }
}

/// Everything extracted from one message.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// Canonical carrier id.
    pub carrier: String,
    /// Envelope domain.
    pub domain: String,
    /// Sender number, possibly empty.
    pub number: String,
    /// Filtered subject, possibly empty.
    pub subject: String,
    /// Body text, possibly empty.
    pub body: String,
    /// Staging tree of the message.
    pub staging_root: PathBuf,
    /// Every staged file, grouped by type in first-seen order.
    pub items: Vec<ItemReport>,
    /// The default attachment.
    pub default_media: Option<ItemReport>,
}

impl Report {
    /// Summarizes a processed session.
    pub fn from_session(session: &Session) -> Self {
        Self {
            carrier: session.carrier().to_string(),
            domain: session.domain().to_string(),
            number: session.number(),
            subject: session.subject(),
            body: session.body(),
            staging_root: session.staging_root().to_path_buf(),
            items: session.media().items().map(ItemReport::new).collect(),
            default_media: session.default_media().map(ItemReport::new),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Carrier:  {} ({})", self.carrier, self.domain)?;
        writeln!(f, "Number:   {}", self.number)?;
        writeln!(f, "Subject:  {}", self.subject)?;
        writeln!(f, "Body:     {}", self.body)?;
        writeln!(f, "Staged:   {}", self.staging_root.display())?;

        for item in &self.items {
            writeln!(
                f,
                "  {:<24} {:>10}  {}",
                item.mime_type,
                item.size,
                item.path.display()
            )?;
        }

        match &self.default_media {
            Some(item) => write!(f, "Default:  {}", item.path.display()),
            None => write!(f, "Default:  (none)"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mmsmedia_core::{SessionOptions, Settings};
    use mmsmedia_mime::{ContentType, Headers, Message, Part};

    fn session(dir: &tempfile::TempDir) -> Session {
        let mut headers = Headers::new();
        headers.add("From", "2065551212@mms.example.net");
        headers.add("Message-ID", "<report@mms.example.net>");
        let root = Part::multipart(
            ContentType::new("multipart", "mixed"),
            vec![
                Part::new(
                    ContentType::new("image", "png").with_parameter("name", "pic.png"),
                    vec![7; 64],
                ),
                Part::new(ContentType::text_plain(), "See you soon"),
            ],
        );
        let settings = Settings::new(dir.path().join("stage"), dir.path().join("conf"));
        Session::new(Message::new(headers, root), &settings, SessionOptions::eager()).unwrap()
    }

    #[test]
    fn test_report_fields() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::from_session(&session(&dir));

        assert_eq!(report.carrier, "mms.example.net");
        assert_eq!(report.number, "2065551212");
        assert_eq!(report.body, "See you soon");
        assert_eq!(report.items.len(), 2);
        let default = report.default_media.unwrap();
        assert_eq!(default.mime_type, "image/png");
        assert_eq!(default.size, 64);
    }

    #[test]
    fn test_report_text_and_json() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::from_session(&session(&dir));

        let text = report.to_string();
        assert!(text.starts_with("Carrier:  mms.example.net (mms.example.net)"));
        assert!(text.contains("image/png"));
        assert!(text.lines().last().unwrap().ends_with("pic.png"));

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["items"][0]["mime_type"], "image/png");
        assert_eq!(json["body"], "See you soon");
    }
}
