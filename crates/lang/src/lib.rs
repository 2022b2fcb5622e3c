//! Language detection for translation runs.
//!
//! - [`detect`] is a pure classifier over Unicode script counts.
//! - [`SourceLanguage`] is the shared, lock-once slot that holds the effective
//!   source language for a whole run.
//! - [`script`] exposes the script ranges so OCR filtering and text wrapping
//!   agree with detection on what counts as Han, Hangul, and so on.

pub mod codes;
mod detect;
pub mod error;
pub mod script;
mod slot;

pub use crate::detect::{AUTO, detect};
pub use crate::script::Script;
pub use crate::slot::SourceLanguage;
