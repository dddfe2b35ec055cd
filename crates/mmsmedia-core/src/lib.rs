//! # mmsmedia-core
//!
//! Carrier-aware extraction of user media from MMS messages delivered as
//! email.
//!
//! Carrier gateways wrap a user's photo, video or text in branding images,
//! spacer GIFs, SMIL layouts and advertising signatures. This crate strips
//! that noise using per-carrier rule files and stages what is left:
//!
//! - **Rules** - ignore rules, text transforms and a number rule per MIME
//!   type, loaded from JSON and merged over a global default
//! - **Resolution** - carrier identified from Return-Path or From, then
//!   redirected through an alias table
//! - **Flattening** - related/alternative/mixed/appledouble containers
//!   expanded into leaf parts
//! - **Staging** - surviving content written to a per-message directory tree
//! - **Selection** - the largest attachment among preferred types
//!
//! ## Quick Start
//!
//! ```ignore
//! use mmsmedia_core::{Session, SessionOptions, Settings};
//! use mmsmedia_mime::Message;
//!
//! let message = Message::parse(&raw)?;
//! let session = Session::new(message, Settings::global(), SessionOptions::eager())?;
//!
//! if let Some(media) = session.default_media() {
//!     println!("{} from {}", media.path().display(), session.number());
//! }
//! session.purge()?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod attachment;
mod error;
pub mod filename;
pub mod flatten;
pub mod ignore;
pub mod processor;
pub mod resolver;
pub mod rules;
pub mod select;
pub mod session;
pub mod settings;
pub mod store;
pub mod strategy;
pub mod transform;

pub use attachment::Attachment;
pub use error::{Error, Result};
pub use resolver::{AliasTable, ConfigResolver, ResolvedConfig};
pub use rules::{NumberRule, Rule, RuleSet, Transform};
pub use session::{Session, SessionOptions};
pub use settings::Settings;
pub use store::{MediaItem, MediaStore, Staging};
pub use strategy::{CarrierStrategy, RuleStrategy, StrategyRegistry};
