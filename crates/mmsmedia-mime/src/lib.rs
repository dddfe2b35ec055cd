//! # mmsmedia-mime
//!
//! Owned MIME part tree for carrier MMS messages delivered as email.
//!
//! ## Features
//!
//! - **Parsing**: Raw RFC 5322 bytes are parsed with `mail-parser` and copied
//!   into an owned, nested [`Part`] tree with transfer-decoded bodies
//! - **Headers**: Raw, unfolded header values by case-insensitive name
//! - **Parameters**: Content-Type and Content-Disposition parameters
//! - **Envelope**: Return-Path, From addresses, Message-ID and Subject
//!
//! ## Quick Start
//!
//! ```ignore
//! use mmsmedia_mime::Message;
//!
//! let message = Message::parse(raw_bytes)?;
//! println!("Carrier envelope: {:?}", message.return_path());
//!
//! for child in message.root().children() {
//!     println!("{} ({} bytes)", child.mime_type(), child.body().len());
//! }
//! ```
//!
//! ### Building parts by hand
//!
//! ```ignore
//! use mmsmedia_mime::{ContentType, Part};
//!
//! let photo = Part::new(
//!     ContentType::new("image", "jpeg").with_parameter("name", "photo.jpg"),
//!     jpeg_bytes,
//! );
//! let root = Part::multipart(ContentType::new("multipart", "mixed"), vec![photo]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod message;
mod part;

pub use content_type::{ContentDisposition, ContentType};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::Message;
pub use part::Part;
