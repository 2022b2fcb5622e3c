//! In-memory collaborators for tests.

use crate::engine::{EngineFactory, OcrEngine};
use crate::error::{ErrorKind, Result};
use crate::face::Typeface;
use crate::models::Detection;
use image::{Rgba, RgbaImage, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Engine that returns a fixed set of detections for every image.
pub struct MockEngine {
    detections: Vec<Detection>,
    calls: Arc<AtomicUsize>,
}

impl OcrEngine for MockEngine {
    fn detect(&mut self, _image: &RgbImage) -> Result<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detections.clone())
    }
}

/// Factory for [`MockEngine`]s that counts constructions and detections.
pub struct MockFactory {
    detections: Vec<Detection>,
    fail: bool,
    created: AtomicUsize,
    calls: Arc<AtomicUsize>,
}

impl MockFactory {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            fail: false,
            created: AtomicUsize::new(0),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A factory whose engines can never be constructed.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::new(vec![]) }
    }

    /// Number of engines built so far.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of `detect` calls across all engines.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl EngineFactory for MockFactory {
    fn create(&self, _source_lang: &str) -> Result<Box<dyn OcrEngine>> {
        if self.fail {
            exn::bail!(ErrorKind::Engine("mock engine unavailable".to_string()));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockEngine {
            detections: self.detections.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}

/// Monospace typeface: every character advances half the pixel size, lines
/// are exactly the pixel size tall, and glyphs are drawn as solid blocks.
pub struct FixedFace;

impl Typeface for FixedFace {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * size / 2.0
    }

    fn line_height(&self, size: f32) -> f32 {
        size
    }

    fn draw(&self, canvas: &mut RgbaImage, text: &str, x: i32, y: i32, size: f32, color: Rgba<u8>) {
        let width = self.text_width(text, size).max(1.0) as u32;
        draw_filled_rect_mut(canvas, Rect::at(x, y).of_size(width, size.max(1.0) as u32), color);
    }
}
