//! Document Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A document error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The container could not be opened or parsed.
    #[display("could not load document: {}", _0.display())]
    Load(#[error(not(source))] PathBuf),
    #[display("could not save document: {}", _0.display())]
    Save(#[error(not(source))] PathBuf),
    /// One content unit could not be parsed.
    #[display("malformed content: {_0}")]
    Malformed(#[error(not(source))] String),
    /// `replace` received a different number of segments than `extract` produced.
    #[display("expected {expected} segments, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    /// The structural handle was produced by a different implementation.
    #[display("structural handle does not belong to this extractor")]
    ForeignHandle,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
