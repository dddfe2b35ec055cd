//! End-to-end extraction tests: message in, staged files out.

use std::fs;
use std::path::Path;

use mmsmedia_core::{Attachment, Session, SessionOptions, Settings};
use mmsmedia_mime::{ContentType, Headers, Message, Part};
use tempfile::TempDir;

const SIGNATURE: &str = "This message was sent using PIX-FLIX Messaging service from CarrierX";

/// Config directory with a default ignore rule and an aliased carrier transform.
fn config(dir: &TempDir) -> Settings {
    let conf = dir.path().join("conf");
    fs::create_dir_all(&conf).unwrap();
    fs::write(
        conf.join("default.json"),
        r#"{"ignore": {"image/jpeg": ["masthead.jpg"]}}"#,
    )
    .unwrap();
    fs::write(
        conf.join("aliases.json"),
        r#"{"mms.carrierx.example": "carrierx"}"#,
    )
    .unwrap();
    fs::write(
        conf.join("carrierx.json"),
        r#"{"transform": {"text/plain": [["/\\s*This message was sent using PIX-FLIX Messaging service from .*/", ""]]}}"#,
    )
    .unwrap();

    Settings::new(dir.path().join("stage"), conf)
}

fn carrier_message() -> Message {
    let mut headers = Headers::new();
    headers.add("Return-Path", "<2065551212@mms.carrierx.example>");
    headers.add("From", "2065551212@mms.carrierx.example");
    headers.add("Subject", "Beach");
    headers.add("Message-ID", "<20240501.abc@mms.carrierx.example>");

    let masthead = Part::new(
        ContentType::new("image", "jpeg").with_parameter("name", "masthead.jpg"),
        vec![0x11; 4000],
    );
    let photo = Part::new(
        ContentType::new("image", "jpeg").with_parameter("name", "photo.jpg"),
        vec![0xff; 10000],
    );
    let text = Part::new(
        ContentType::text_plain().with_parameter("charset", "utf-8"),
        format!("Hello world. {SIGNATURE}"),
    );

    Message::new(
        headers,
        Part::multipart(
            ContentType::new("multipart", "related"),
            vec![masthead, photo, text],
        ),
    )
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap()
}

#[test]
fn carrier_noise_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let settings = config(&dir);
    let session = Session::new(carrier_message(), &settings, SessionOptions::eager()).unwrap();

    assert_eq!(session.domain(), "mms.carrierx.example");
    assert_eq!(session.carrier(), "carrierx");

    let types: Vec<_> = session.media().types().collect();
    assert_eq!(types, ["image/jpeg", "text/plain"]);

    let jpegs = session.media().get("image/jpeg");
    assert_eq!(jpegs.len(), 1);
    assert_eq!(file_name(jpegs[0].path()), "photo.jpg");
    assert_eq!(jpegs[0].byte_size(), 10000);

    let texts = session.media().get("text/plain");
    assert_eq!(texts.len(), 1);
    assert_eq!(fs::read_to_string(texts[0].path()).unwrap(), "Hello world.");

    let best = session.default_media().unwrap();
    assert_eq!(best.suggested_filename(), "photo.jpg");
    assert_eq!(session.default_text().unwrap().path(), texts[0].path());
    assert_eq!(session.body(), "Hello world.");
    assert_eq!(session.number(), "2065551212");
    assert_eq!(session.subject(), "Beach");
}

#[test]
fn staged_files_live_under_the_session_root() {
    let dir = tempfile::tempdir().unwrap();
    let settings = config(&dir);
    let session = Session::new(carrier_message(), &settings, SessionOptions::eager()).unwrap();

    let root = session.staging_root();
    assert!(root.starts_with(&settings.staging_root));
    for item in session.media().items() {
        assert!(item.path().starts_with(root));
    }
}

#[test]
fn purge_removes_everything_and_can_repeat() {
    let dir = tempfile::tempdir().unwrap();
    let settings = config(&dir);
    let session = Session::new(carrier_message(), &settings, SessionOptions::eager()).unwrap();

    assert!(session.staging_root().exists());
    session.purge().unwrap();
    assert!(!session.staging_root().exists());
    session.purge().unwrap();
}

#[test]
fn processing_twice_stages_once() {
    let dir = tempfile::tempdir().unwrap();
    let settings = config(&dir);
    let mut session = Session::new(carrier_message(), &settings, SessionOptions::lazy()).unwrap();

    session.process().unwrap();
    let first = session.media().clone();
    session.process().unwrap();

    assert_eq!(session.media(), &first);
    let subdirs = fs::read_dir(session.staging_root()).unwrap().count();
    assert_eq!(subdirs, 2);
}

#[test]
fn unconfigured_carrier_uses_defaults_only() {
    let dir = tempfile::tempdir().unwrap();
    let settings = config(&dir);

    let mut headers = Headers::new();
    headers.add("From", "5551234@unlisted.example");
    let text = Part::new(ContentType::text_plain(), format!("Hi! {SIGNATURE}"));
    let message = Message::new(headers, text);

    let session = Session::new(message, &settings, SessionOptions::eager()).unwrap();
    assert_eq!(session.carrier(), "unlisted.example");
    assert_eq!(session.body(), format!("Hi! {SIGNATURE}"));
    session.purge().unwrap();
}

/// A raw message as a carrier gateway delivers it.
const RAW: &str = concat!(
    "Return-Path: <4255550100@mms.carrierx.example>\r\n",
    "From: 4255550100@mms.carrierx.example\r\n",
    "To: inbox@example.com\r\n",
    "Subject: Multimedia message\r\n",
    "Message-ID: <raw-1@mms.carrierx.example>\r\n",
    "MIME-Version: 1.0\r\n",
    "Content-Type: multipart/alternative; boundary=\"alt\"\r\n",
    "\r\n",
    "--alt\r\n",
    "Content-Type: multipart/related; boundary=\"rel\"\r\n",
    "\r\n",
    "--rel\r\n",
    "Content-Type: application/smil\r\n",
    "\r\n",
    "<smil><body><par><img src=\"cid:pic\"/></par></body></smil>\r\n",
    "--rel\r\n",
    "Content-Type: application/octet-stream\r\n",
    "Content-Location: IMG_0042.JPG\r\n",
    "\r\n",
    "not really a jpeg, but bytes all the same\r\n",
    "--rel\r\n",
    "Content-Type: text/plain; charset=us-ascii\r\n",
    "\r\n",
    "Sunset! This message was sent using PIX-FLIX Messaging service from CarrierX\r\n",
    "--rel--\r\n",
    "--alt--\r\n",
);

#[test]
fn raw_message_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let settings = config(&dir);
    fs::write(
        settings.config_dir.join("carrierx.json"),
        r#"{
            "ignore": {"application/smil": ["/<smil/i"], "text/plain": ["Multimedia message"]},
            "transform": {"text/plain": [["/\\s*This message was sent using PIX-FLIX Messaging service from .*/", ""]]}
        }"#,
    )
    .unwrap();

    let message = Message::parse(RAW.as_bytes()).unwrap();
    let session = Session::new(message, &settings, SessionOptions::eager()).unwrap();

    let types: Vec<_> = session.media().types().collect();
    assert_eq!(types, ["image/jpeg", "text/plain"]);

    let photo = session.default_media().unwrap();
    assert_eq!(photo.mime_type(), "image/jpeg");
    assert_eq!(photo.suggested_filename(), "IMG_0042.JPG");

    assert_eq!(session.body(), "Sunset!");
    assert_eq!(session.subject(), "");
    assert_eq!(session.number(), "4255550100");
    session.purge().unwrap();
}
