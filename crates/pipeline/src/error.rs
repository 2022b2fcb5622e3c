//! Pipeline Error Types
//!
//! Only [`ErrorKind::Load`], [`ErrorKind::Save`] and [`ErrorKind::Cancelled`]
//! ever end a run. Unit and image failures are logged and counted where they
//! happen.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A pipeline error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The input document could not be opened or parsed.
    #[display("could not load {}", _0.display())]
    Load(#[error(not(source))] PathBuf),
    /// The translated document could not be written.
    #[display("could not save {}", _0.display())]
    Save(#[error(not(source))] PathBuf),
    #[display("content unit {_0} was left untranslated")]
    Unit(#[error(not(source))] String),
    #[display("image {_0} was left untranslated")]
    Image(#[error(not(source))] String),
    /// Processing one image panicked. Other images are unaffected.
    #[display("processing image {_0} panicked")]
    Panicked(#[error(not(source))] String),
    #[display("run cancelled")]
    Cancelled,
    #[display("font unavailable")]
    Font,
    /// A worker task panicked or was aborted.
    #[display("worker task failed")]
    Worker,
    #[display("could not serialize run report")]
    Report,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
