//! Backend Error Types

use derive_more::{Display, Error};

/// A translation backend error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for backend operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The call did not finish within the per-call timeout.
    #[display("translation request timed out")]
    Timeout,
    /// Network or API failure reported by the service.
    #[display("translation service error: {_0}")]
    Transport(#[error(not(source))] String),
    /// The service answered with a different number of segments.
    #[display("expected {expected} translations, got {actual}")]
    CountMismatch { expected: usize, actual: usize },
    /// The service refused the request outright (credentials, unsupported
    /// language pair). Retrying will not help.
    #[display("translation request rejected: {_0}")]
    Rejected(#[error(not(source))] String),
    #[display("translation failed after {_0} attempts")]
    Exhausted(#[error(not(source))] u32),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Transport(_) | Self::CountMismatch { .. })
    }
}
