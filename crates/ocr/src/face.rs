//! Glyph measurement and drawing.

use crate::error::{ErrorKind, Result};
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use exn::ResultExt;
use image::{Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use std::path::Path;

/// The minimal set of text primitives the renderer needs.
pub trait Typeface: Send + Sync {
    /// Horizontal advance of `text` at pixel size `size`.
    fn text_width(&self, text: &str, size: f32) -> f32;

    /// Vertical distance between consecutive baselines at `size`.
    fn line_height(&self, size: f32) -> f32;

    /// Draw `text` with its top-left corner at `(x, y)`.
    fn draw(&self, canvas: &mut RgbaImage, text: &str, x: i32, y: i32, size: f32, color: Rgba<u8>);
}

/// A TrueType/OpenType font loaded into memory.
pub struct FontFace {
    font: FontVec,
}

impl FontFace {
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let font = FontVec::try_from_vec(data).or_raise(|| ErrorKind::Font)?;
        Ok(Self { font })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).or_raise(|| ErrorKind::Font)?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "Loaded font");
        Self::from_bytes(data)
    }
}

impl Typeface for FontFace {
    fn text_width(&self, text: &str, size: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(size));
        text.chars().map(|ch| scaled.h_advance(scaled.scaled_glyph(ch).id)).sum()
    }

    fn line_height(&self, size: f32) -> f32 {
        let scaled = self.font.as_scaled(PxScale::from(size));
        scaled.height() + scaled.line_gap()
    }

    fn draw(&self, canvas: &mut RgbaImage, text: &str, x: i32, y: i32, size: f32, color: Rgba<u8>) {
        draw_text_mut(canvas, color, x, y, PxScale::from(size), &self.font, text);
    }
}
