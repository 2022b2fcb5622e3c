//! OCR Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// An image pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for image pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("unsupported image media type: {_0}")]
    UnsupportedMediaType(#[error(not(source))] String),
    /// The image bytes could not be decoded.
    #[display("could not decode image")]
    Decode,
    #[display("could not encode image")]
    Encode,
    /// The OCR engine failed to start or to process an image.
    #[display("OCR engine error: {_0}")]
    Engine(#[error(not(source))] String),
    #[display("expected {expected} translations, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[display("invalid font data")]
    Font,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
