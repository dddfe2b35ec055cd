//! Integration tests for building the owned part tree from raw messages.

#![allow(clippy::unwrap_used)]

use mmsmedia_mime::Message;

/// Carrier-style nesting: related inside alternative inside mixed.
const NESTED: &str = concat!(
    "Return-Path: <5551234567@vzwpix.com>\r\n",
    "From: 5551234567@vzwpix.com\r\n",
    "Subject: \r\n",
    "Content-Type: multipart/mixed; boundary=\"a\"\r\n",
    "\r\n",
    "--a\r\n",
    "Content-Type: multipart/alternative; boundary=\"b\"\r\n",
    "\r\n",
    "--b\r\n",
    "Content-Type: multipart/related; boundary=\"c\"\r\n",
    "\r\n",
    "--c\r\n",
    "Content-Type: text/plain\r\n",
    "\r\n",
    "Sent from my phone\r\n",
    "--c\r\n",
    "Content-Type: image/gif\r\n",
    "Content-ID: <logo.gif>\r\n",
    "Content-Transfer-Encoding: base64\r\n",
    "\r\n",
    "R0lGODlh\r\n",
    "--c--\r\n",
    "--b--\r\n",
    "--a--\r\n",
);

#[test]
fn nested_containers_are_preserved_as_a_tree() {
    let message = Message::parse(NESTED.as_bytes()).unwrap();

    let mixed = message.root();
    assert_eq!(mixed.mime_type(), "multipart/mixed");
    assert_eq!(mixed.children().len(), 1);

    let alternative = &mixed.children()[0];
    assert_eq!(alternative.mime_type(), "multipart/alternative");

    let related = &alternative.children()[0];
    assert_eq!(related.mime_type(), "multipart/related");

    let leaves: Vec<_> = related.children().iter().map(|p| p.mime_type()).collect();
    assert_eq!(leaves, ["text/plain", "image/gif"]);

    let gif = &related.children()[1];
    assert_eq!(gif.raw_header("content-id"), Some("<logo.gif>"));
    assert_eq!(gif.body(), b"GIF89a");
}

#[test]
fn encoded_filename_parameters_are_decoded() {
    let raw = concat!(
        "From: 5551234567@mms.example.net\r\n",
        "Content-Type: multipart/mixed; boundary=\"x\"\r\n",
        "\r\n",
        "--x\r\n",
        "Content-Type: image/jpeg; name=\"=?utf-8?q?caf=C3=A9.jpg?=\"\r\n",
        "Content-Disposition: attachment; filename*=utf-8''caf%C3%A9.jpg\r\n",
        "\r\n",
        "data\r\n",
        "--x--\r\n",
    );
    let message = Message::parse(raw.as_bytes()).unwrap();
    let photo = &message.root().children()[0];

    assert_eq!(photo.header_subvalue("content-type", "name"), Some("café.jpg"));
    assert_eq!(
        photo.header_subvalue("content-disposition", "filename"),
        Some("café.jpg")
    );
}

#[test]
fn missing_content_type_defaults_to_text_plain() {
    let raw = "From: someone@example.com\r\nMessage-ID: <x@y>\r\n\r\nbody\r\n";
    let message = Message::parse(raw.as_bytes()).unwrap();

    assert_eq!(message.root().mime_type(), "text/plain");
    assert_eq!(message.message_id(), Some("x@y"));
}
