//! Error types for the core library.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while processing a message.
///
/// Configuration, rule and charset problems never surface here; they degrade
/// to empty configuration or unchanged text. Only conditions that make the
/// staged output untrustworthy are reported.
#[derive(Debug, Error)]
pub enum Error {
    /// MIME parsing failed.
    #[error("MIME error: {0}")]
    Mime(#[from] mmsmedia_mime::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A staging directory or file could not be written.
    #[error("Staging error at {}: {source}", path.display())]
    Staging {
        /// Path that could not be created or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
