//! Cache Error Types
//!
//! Corruption is handled inside the caches: `get` degrades to a miss and `put`
//! retries once against a fresh store. Only `open`, `clear`, `prune` and
//! `stats` ever return these to the caller.

use derive_more::{Display, Error};

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("database error")]
    Database,
    #[display("database migration error")]
    Migration,
    /// The backing file is unreadable and has to be recreated.
    #[display("cache database is corrupt")]
    Corrupt,
    /// Serialization/deserialization error.
    #[display("invalid cache data")]
    InvalidData,
    #[display("cache file error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database | Self::Corrupt)
    }
}
