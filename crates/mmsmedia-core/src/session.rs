//! Per-message extraction session.

use std::path::Path;
use std::sync::Arc;

use mmsmedia_mime::Message;
use tracing::{Span, debug, info, info_span, warn};

use crate::error::Result;
use crate::resolver::ConfigResolver;
use crate::rules::RuleSet;
use crate::select::{self, DEFAULT_MEDIA_PREFERENCES, DEFAULT_TEXT_PREFERENCES};
use crate::settings::Settings;
use crate::store::{MediaItem, MediaStore, Staging};
use crate::strategy::{CarrierStrategy, StrategyRegistry};
use crate::{filename, processor, transform};

/// Options for constructing a [`Session`].
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Run the pipeline immediately in [`Session::new`].
    pub eager: bool,
    /// Span the session's own span is nested under.
    pub parent_span: Option<Span>,
    /// Carrier strategies; defaults to rule-driven processing for all.
    pub strategies: StrategyRegistry,
}

impl SessionOptions {
    /// Options that process on construction.
    #[must_use]
    pub fn eager() -> Self {
        Self {
            eager: true,
            ..Self::default()
        }
    }

    /// Options that wait for an explicit [`Session::process`].
    #[must_use]
    pub fn lazy() -> Self {
        Self::default()
    }

    /// Nests session logging under `span`.
    #[must_use]
    pub fn with_parent_span(mut self, span: Span) -> Self {
        self.parent_span = Some(span);
        self
    }

    /// Uses a custom strategy registry.
    #[must_use]
    pub fn with_strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = strategies;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Unprocessed,
    Processed,
}

/// Extraction session for one message.
///
/// Rules are resolved once on construction. [`Session::process`] stages
/// surviving media under the message's own staging tree and runs at most
/// once; queries read the resulting store. Staged files persist until
/// [`Session::purge`].
#[derive(Debug)]
pub struct Session {
    message: Message,
    domain: String,
    carrier: String,
    rules: RuleSet,
    strategy: Arc<dyn CarrierStrategy>,
    staging: Staging,
    store: MediaStore,
    state: State,
    span: Span,
}

impl Session {
    /// Resolves configuration for `message` and prepares its staging tree.
    ///
    /// # Errors
    ///
    /// In eager mode, returns any error from [`Session::process`].
    pub fn new(message: Message, settings: &Settings, options: SessionOptions) -> Result<Self> {
        let resolved = ConfigResolver::new(settings).resolve_message(&message);
        let message_id = message.message_id().unwrap_or_default().to_string();

        let span = match &options.parent_span {
            Some(parent) => info_span!(
                parent: parent,
                "mms_session",
                carrier = %resolved.carrier,
                message_id = %message_id
            ),
            None => info_span!(
                "mms_session",
                carrier = %resolved.carrier,
                message_id = %message_id
            ),
        };
        span.in_scope(|| {
            debug!(domain = %resolved.domain, "Resolved carrier rules");
        });

        let mut session = Self {
            staging: Staging::for_message(settings.staging_root(), message.message_id()),
            strategy: options.strategies.get(&resolved.carrier),
            message,
            domain: resolved.domain,
            carrier: resolved.carrier,
            rules: resolved.rules,
            store: MediaStore::new(),
            state: State::Unprocessed,
            span,
        };

        if options.eager {
            session.process()?;
        }
        Ok(session)
    }

    /// Runs the pipeline once; later calls do nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if a staged file cannot be written. The session is
    /// left unprocessed with an empty store.
    pub fn process(&mut self) -> Result<()> {
        if self.state == State::Processed {
            return Ok(());
        }

        let span = self.span.clone();
        let _guard = span.enter();

        if let Err(e) = self.run() {
            warn!("Processing failed: {e}");
            self.store.clear();
            self.staging.reset();
            if let Err(purge_error) = self.staging.purge() {
                warn!("Cannot remove partial staging tree: {purge_error}");
            }
            return Err(e);
        }

        self.state = State::Processed;
        info!(items = self.store.len(), "Processed message");
        Ok(())
    }

    /// Runs the pipeline once, then reports every `(type, items)` entry.
    ///
    /// The observer is called on every invocation, including ones where the
    /// pipeline had already run.
    ///
    /// # Errors
    ///
    /// Returns an error if a staged file cannot be written.
    pub fn process_with<F>(&mut self, mut observer: F) -> Result<()>
    where
        F: FnMut(&str, &[MediaItem]),
    {
        self.process()?;
        for (mime_type, items) in self.store.iter() {
            observer(mime_type, items);
        }
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let leaves = self.strategy.leaf_parts(self.message.root());
        debug!("{} leaf parts", leaves.len());

        for part in leaves {
            let name = filename::resolve(part);
            if self.strategy.should_ignore(part, &name, &self.rules) {
                continue;
            }
            if let Some(item) = processor::process_part(part, &name, &self.rules, &mut self.staging)? {
                debug!("Staged {} as {}", name, item.mime_type());
                self.store.push(item);
            }
        }
        Ok(())
    }

    /// Returns `true` once the pipeline has run.
    #[must_use]
    pub fn is_processed(&self) -> bool {
        self.state == State::Processed
    }

    /// All staged media.
    #[must_use]
    pub const fn media(&self) -> &MediaStore {
        &self.store
    }

    /// Largest staged item matching any of `preferences`.
    ///
    /// A preference is a coarse type (`"image"`) or an exact type
    /// (`"text/plain"`).
    #[must_use]
    pub fn media_of_type(&self, preferences: &[&str]) -> Option<&MediaItem> {
        select::select(&self.store, preferences)
    }

    /// Best attachment: the largest video, image, application or text item.
    #[must_use]
    pub fn default_media(&self) -> Option<&MediaItem> {
        self.media_of_type(&DEFAULT_MEDIA_PREFERENCES)
    }

    /// Best plain-text item.
    #[must_use]
    pub fn default_text(&self) -> Option<&MediaItem> {
        self.media_of_type(&DEFAULT_TEXT_PREFERENCES)
    }

    /// Contents of the default text, trimmed; empty if there is none.
    #[must_use]
    pub fn body(&self) -> String {
        let Some(item) = self.default_text() else {
            return String::new();
        };
        match std::fs::read(item.path()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
            Err(e) => {
                debug!("Cannot read {}: {e}", item.path().display());
                String::new()
            }
        }
    }

    /// Sender number; empty if none can be found.
    ///
    /// Uses the carrier's number rule when its header is present, otherwise
    /// the local part of the first From address.
    #[must_use]
    pub fn number(&self) -> String {
        let from_rule = self.rules.number().and_then(|rule| {
            let value = self.message.header(rule.header())?;
            let number = rule.apply(value);
            (!number.is_empty()).then_some(number)
        });

        from_rule.unwrap_or_else(|| {
            self.message
                .from()
                .first()
                .and_then(|address| address.split(['@', '/']).next())
                .unwrap_or_default()
                .trim()
                .to_string()
        })
    }

    /// Subject with carrier boilerplate removed; empty if it is pure noise.
    #[must_use]
    pub fn subject(&self) -> String {
        let subject = self.message.subject().unwrap_or_default().trim();
        if subject.is_empty() {
            return String::new();
        }

        let ignored = self
            .rules
            .ignore_rules("text/plain")
            .iter()
            .any(|rule| rule.equals(subject) || rule.is_match(subject.as_bytes()));
        if ignored {
            return String::new();
        }

        transform::apply_all(self.rules.transform_rules("text/plain"), subject)
            .trim()
            .to_string()
    }

    /// Canonical carrier id after aliasing.
    #[must_use]
    pub fn carrier(&self) -> &str {
        &self.carrier
    }

    /// Carrier domain derived from the envelope.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The message being processed.
    #[must_use]
    pub const fn message(&self) -> &Message {
        &self.message
    }

    /// Effective rules for this message.
    #[must_use]
    pub const fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Root of this message's staging tree.
    #[must_use]
    pub fn staging_root(&self) -> &Path {
        self.staging.root()
    }

    /// Deletes the staging tree. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing tree cannot be removed.
    pub fn purge(&self) -> Result<()> {
        let _guard = self.span.enter();
        self.staging.purge()
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
    use mmsmedia_mime::{ContentType, Headers, Part};
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> Settings {
        Settings::new(dir.path().join("stage"), dir.path().join("conf"))
    }

    fn write_conf(dir: &TempDir, file: &str, json: &str) {
        let conf = dir.path().join("conf");
        std::fs::create_dir_all(&conf).unwrap();
        std::fs::write(conf.join(file), json).unwrap();
    }

    fn message(headers: &[(&str, &str)], children: Vec<Part>) -> Message {
        let mut map = Headers::new();
        for (name, value) in headers {
            map.add(*name, value);
        }
        Message::new(
            map,
            Part::multipart(ContentType::new("multipart", "mixed"), children),
        )
    }

    fn photo(name: &str, size: usize) -> Part {
        Part::new(
            ContentType::new("image", "jpeg").with_parameter("name", name),
            vec![0xab; size],
        )
    }

    const ENVELOPE: [(&str, &str); 3] = [
        ("Return-Path", "<2065551212@mms.example.net>"),
        ("From", "2065551212@mms.example.net"),
        ("Message-ID", "<session-test@mms.example.net>"),
    ];

    #[test]
    fn test_lazy_session_waits_for_process() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(
            message(&ENVELOPE, vec![photo("a.jpg", 10)]),
            &settings(&dir),
            SessionOptions::lazy(),
        )
        .unwrap();

        assert!(!session.is_processed());
        assert!(session.media().is_empty());
        assert!(!session.staging_root().exists());

        session.process().unwrap();
        assert!(session.is_processed());
        assert_eq!(session.media().len(), 1);
    }

    #[test]
    fn test_process_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(
            message(&ENVELOPE, vec![photo("a.jpg", 10), photo("b.jpg", 20)]),
            &settings(&dir),
            SessionOptions::eager(),
        )
        .unwrap();

        let before = session.media().clone();
        session.process().unwrap();
        assert_eq!(session.media(), &before);

        let numbered = std::fs::read_dir(session.staging_root()).unwrap().count();
        assert_eq!(numbered, 2);
    }

    #[test]
    fn test_observer_sees_each_type() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = Session::new(
            message(
                &ENVELOPE,
                vec![
                    photo("a.jpg", 10),
                    Part::new(ContentType::text_plain(), "hello"),
                    photo("b.jpg", 20),
                ],
            ),
            &settings(&dir),
            SessionOptions::lazy(),
        )
        .unwrap();

        let mut seen = Vec::new();
        session
            .process_with(|mime_type, items| seen.push((mime_type.to_string(), items.len())))
            .unwrap();
        assert_eq!(
            seen,
            [("image/jpeg".to_string(), 2), ("text/plain".to_string(), 1)]
        );
    }

    #[test]
    fn test_number_from_rule_and_fallback() {
        let dir = tempfile::tempdir().unwrap();
        write_conf(&dir, "mms.example.net.json", r#"{"number": ["X-Mms-Sender", "/\\D/", ""]}"#);

        let mut headers = ENVELOPE.to_vec();
        headers.push(("X-Mms-Sender", "+1 (425) 555-0100"));
        let with_header = Session::new(message(&headers, vec![]), &settings(&dir), SessionOptions::lazy()).unwrap();
        assert_eq!(with_header.number(), "14255550100");

        let without_header =
            Session::new(message(&ENVELOPE, vec![]), &settings(&dir), SessionOptions::lazy()).unwrap();
        assert_eq!(without_header.number(), "2065551212");

        let no_sender = Session::new(message(&[], vec![]), &settings(&dir), SessionOptions::lazy()).unwrap();
        assert_eq!(no_sender.number(), "");
        assert_eq!(no_sender.carrier(), "unknown");
    }

    #[test]
    fn test_subject_filtering() {
        let dir = tempfile::tempdir().unwrap();
        write_conf(
            &dir,
            "default.json",
            r#"{
                "ignore": {"text/plain": ["Multimedia message", "/^\\(no subject\\)$/i"]},
                "transform": {"text/plain": [["/\\s*\\[ad\\]$/", ""]]}
            }"#,
        );

        let subject_of = |subject: &str| {
            let mut headers = ENVELOPE.to_vec();
            headers.push(("Subject", subject));
            Session::new(message(&headers, vec![]), &settings(&dir), SessionOptions::lazy())
                .unwrap()
                .subject()
        };

        assert_eq!(subject_of("Multimedia message"), "");
        assert_eq!(subject_of("(No Subject)"), "");
        assert_eq!(subject_of("Beach day [ad]"), "Beach day");
    }

    #[test]
    fn test_write_failure_leaves_session_unprocessed() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();
        let settings = Settings::new(&blocker, dir.path().join("conf"));

        let mut session = Session::new(
            message(&ENVELOPE, vec![photo("a.jpg", 10)]),
            &settings,
            SessionOptions::lazy(),
        )
        .unwrap();

        assert!(session.process().is_err());
        assert!(!session.is_processed());
        assert!(session.media().is_empty());
    }

    #[test]
    fn test_parent_span_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let parent = tracing::info_span!("inbox");
        let session = Session::new(
            message(&ENVELOPE, vec![photo("a.jpg", 10)]),
            &settings(&dir),
            SessionOptions::eager().with_parent_span(parent),
        )
        .unwrap();
        assert_eq!(session.default_media().unwrap().file_name(), Some("a.jpg"));
        session.purge().unwrap();
    }
}
