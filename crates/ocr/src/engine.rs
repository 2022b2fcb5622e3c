//! OCR engine seam.
//!
//! Engines are assumed to be unsafe to share between threads, so they are
//! only ever `Send`. Each worker owns one through a [`LazyEngine`] and builds
//! it on first use from a shared [`EngineFactory`].

use crate::error::Result;
use crate::models::Detection;
use image::RgbImage;
use std::sync::Arc;

/// A text detector and recognizer.
pub trait OcrEngine: Send {
    /// Detect text in `image`, returning polygons with recognized text and
    /// recognition confidence in `0.0..=1.0`.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>>;
}

/// Builds [`OcrEngine`] instances, one per worker.
pub trait EngineFactory: Send + Sync {
    /// Create an engine tuned for `source_lang` (which may be `auto`).
    fn create(&self, source_lang: &str) -> Result<Box<dyn OcrEngine>>;
}

pub type FactoryHandle = Arc<dyn EngineFactory>;

/// A worker-owned engine slot, constructed on first use and never shared.
pub struct LazyEngine {
    factory: FactoryHandle,
    source_lang: String,
    engine: Option<Box<dyn OcrEngine>>,
}

impl LazyEngine {
    pub fn new(factory: FactoryHandle, source_lang: impl Into<String>) -> Self {
        Self {
            factory,
            source_lang: source_lang.into(),
            engine: None,
        }
    }

    /// Returns `true` once the engine has been built.
    pub fn is_ready(&self) -> bool {
        self.engine.is_some()
    }

    /// Borrow the engine, building it if this is the first call.
    pub fn get(&mut self) -> Result<&mut dyn OcrEngine> {
        let engine = match self.engine.take() {
            Some(engine) => engine,
            None => {
                tracing::debug!(lang = %self.source_lang, "Constructing OCR engine for worker");
                self.factory.create(&self.source_lang)?
            },
        };
        Ok(self.engine.insert(engine).as_mut())
    }
}
