//! Book translation orchestration.
//!
//! [`Orchestrator::run`] loads a book, translates its content units on a
//! worker pool while images are prescanned in the background, translates and
//! redraws image text once the source language is settled, adds a CJK
//! stylesheet where needed, translates metadata and the table of contents,
//! then saves the result.
//!
//! Every translation goes through a [`Translator`], which consults the
//! content cache before calling the backend and falls back to the source
//! text when the backend gives up.

mod chapters;
mod checkpoint;
pub mod error;
mod images;
mod orchestrator;
mod report;
mod style;
mod translate;

pub use crate::chapters::{SAMPLE_CHARS, language_sample};
pub use crate::checkpoint::Checkpoint;
pub use crate::images::PrescanProgress;
pub use crate::orchestrator::{Collaborators, Orchestrator, default_output};
pub use crate::report::{ImageStats, Report, Timings};
pub use crate::style::{STYLESHEET_HREF, cjk_stylesheet, font_stack};
pub use crate::translate::{Batch, Translator};
