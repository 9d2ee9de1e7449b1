//! Error types for qrtracker operations.

use thiserror::Error;

/// Errors that can occur while reading, annotating, or writing a book.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid EPUB: {0}")]
    InvalidEpub(String),

    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("Invalid preferences: {0}")]
    Prefs(#[from] serde_json::Error),

    #[error("QR encoding error: {0}")]
    Qr(#[from] qrcode::types::QrError),

    #[error("PNG encoding error: {0}")]
    Png(#[from] image::ImageError),

    #[error("UTF-8 decoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Expected precondition failure carrying a user-facing explanation.
    ///
    /// Raised for a whole run (no eligible candidates, missing book title)
    /// or for a single page (no `<body>` element). Per-page aborts are
    /// caught by the orchestrator and collected into the run report instead
    /// of stopping the batch.
    #[error("{0}")]
    Abort(String),
}

impl Error {
    /// Shorthand for an [`Error::Abort`] with a formatted message.
    pub fn abort(msg: impl Into<String>) -> Self {
        Error::Abort(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
