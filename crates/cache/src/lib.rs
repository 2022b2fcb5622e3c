//! SQLite caches that make repeated runs cheap.
//!
//! Two independent databases live under the user cache directory:
//! - [`ContentCache`]: translated text segments, keyed by the BLAKE3 hash of
//!   the source text plus the language pair and backend name.
//! - [`OcrArtifactStore`]: OCR detections per image and the translations of
//!   the merged regions built from them.
//!
//! Neither is a source of truth. Deleting a database file only costs
//! recomputation, and a file SQLite cannot read is deleted and recreated on
//! the spot.

mod content;
mod db;
pub mod error;
mod models;
mod ocr;
mod store;

pub use crate::content::{ContentCache, text_hash};
pub use crate::ocr::{OcrArtifactStore, RegionKey, image_hash};
pub use crate::store::CacheStats;

/// File name of the text translation cache inside the cache directory.
pub const CONTENT_CACHE_FILE: &str = "translations.db";
/// File name of the OCR artifact cache inside the cache directory.
pub const OCR_CACHE_FILE: &str = "ocr.db";
