//! Language Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A language error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for language operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// A country code was given where a language code was expected.
    #[display("'{given}' is a country code, use language code '{suggestion}' ({name}) instead")]
    CountryCode {
        given: String,
        suggestion: &'static str,
        name: &'static str,
    },
    #[display("unsupported language code: '{_0}'")]
    Unsupported(#[error(not(source))] String),
    /// `auto` is only meaningful as a source language.
    #[display("language code 'auto' cannot be used as a translation target")]
    AutoTarget,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        false
    }
}
