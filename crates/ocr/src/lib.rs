//! Translate text baked into images.
//!
//! Each image runs through a small state machine that terminates either in a
//! re-rendered image or in a skip:
//!
//! 1. **Detect**: OCR, confidence threshold, text normalization, noise and
//!    source-script filters ([`normalize`]).
//! 2. **Merge**: same-line fragments are joined into translatable units
//!    ([`merge`]).
//! 3. **Translate**: supplied by the caller, which owns caching and the
//!    translation backend. Units whose translation canonicalizes to the
//!    source are not redrawn.
//! 4. **Render**: background fill, contrast color, font fitting and centered
//!    drawing ([`render`]).
//!
//! The OCR engine and the typeface are seams: see [`OcrEngine`] and
//! [`Typeface`].

mod engine;
pub mod error;
mod face;
pub mod merge;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod models;
pub mod normalize;
mod pipeline;
pub mod render;

pub use crate::engine::{EngineFactory, FactoryHandle, LazyEngine, OcrEngine};
pub use crate::face::{FontFace, Typeface};
pub use crate::models::{BoundingBox, Detection, Point, Region, fingerprint};
pub use crate::pipeline::{
    DEFAULT_CONFIDENCE_THRESHOLD, MIN_IMAGE_DIMENSION, Outcome, RegionPipeline, SUPPORTED_MEDIA_TYPES, Skip,
    canonicalize, needs_redraw, supports,
};
