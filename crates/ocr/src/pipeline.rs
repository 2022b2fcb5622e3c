use crate::engine::{LazyEngine, OcrEngine};
use crate::error::{ErrorKind, Result};
use crate::face::Typeface;
use crate::merge::merge;
use crate::models::{Detection, Region};
use crate::normalize::{filter_language, prepare};
use crate::render::paint;
use exn::ResultExt;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use tracing::instrument;

/// Images narrower or shorter than this are skipped without running OCR.
pub const MIN_IMAGE_DIMENSION: u32 = 100;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.3;
pub const SUPPORTED_MEDIA_TYPES: [&str; 2] = ["image/png", "image/jpeg"];

/// Returns `true` if images of `media_type` can be decoded and re-encoded.
pub fn supports(media_type: &str) -> bool {
    SUPPORTED_MEDIA_TYPES.contains(&media_type)
}

fn format_for(media_type: &str) -> Result<ImageFormat> {
    match media_type {
        "image/png" => Ok(ImageFormat::Png),
        "image/jpeg" => Ok(ImageFormat::Jpeg),
        other => exn::bail!(ErrorKind::UnsupportedMediaType(other.to_string())),
    }
}

/// Casefolded, whitespace-collapsed form used to compare a translation with
/// its source.
pub fn canonicalize(text: &str) -> String {
    text.split_whitespace().map(str::to_lowercase).collect::<Vec<_>>().join(" ")
}

/// Returns `true` if `translation` differs meaningfully from `source`.
///
/// This is a heuristic: a legitimate translation that canonicalizes to the
/// source (numerals, proper nouns) is also skipped.
pub fn needs_redraw(source: &str, translation: &str) -> bool {
    !translation.trim().is_empty() && canonicalize(source) != canonicalize(translation)
}

/// What happened to one image.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// New image bytes, encoded in the original media type.
    Rendered(Vec<u8>),
    /// Nothing needed redrawing; the original image stands.
    Unchanged(Skip),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skip {
    TooSmall,
    NoRegions,
    NoChanges,
}

/// Per-image state machine: detect, merge, translate, render.
///
/// The pipeline itself is stateless apart from its configuration; engines
/// and typefaces are passed in by the worker that owns them.
#[derive(Debug, Clone, Copy)]
pub struct RegionPipeline {
    threshold: f32,
}

impl Default for RegionPipeline {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

impl RegionPipeline {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Decode an image, or return `None` when it is below the minimum size.
    pub fn decode(&self, bytes: &[u8], media_type: &str) -> Result<Option<DynamicImage>> {
        let format = format_for(media_type)?;
        let image = image::load_from_memory_with_format(bytes, format).or_raise(|| ErrorKind::Decode)?;
        let (width, height) = image.dimensions();
        if width < MIN_IMAGE_DIMENSION || height < MIN_IMAGE_DIMENSION {
            tracing::debug!(width, height, "Image below minimum dimension");
            return Ok(None);
        }
        Ok(Some(image))
    }

    /// Run OCR and the detect-stage filters.
    pub fn detect(&self, engine: &mut dyn OcrEngine, image: &DynamicImage, source_lang: &str) -> Result<Vec<Detection>> {
        let raw = engine.detect(&image.to_rgb8())?;
        let found = raw.len();
        let kept = prepare(raw, self.threshold, source_lang);
        tracing::debug!(found, kept = kept.len(), lang = source_lang, "Detected text regions");
        Ok(kept)
    }

    /// Decode and detect in one step, as the prescan does.
    #[instrument(skip(self, engine, bytes), fields(bytes = bytes.len()))]
    pub fn scan(
        &self,
        engine: &mut LazyEngine,
        bytes: &[u8],
        media_type: &str,
        source_lang: &str,
    ) -> Result<Vec<Detection>> {
        match self.decode(bytes, media_type)? {
            Some(image) => self.detect(engine.get()?, &image, source_lang),
            None => Ok(Vec::new()),
        }
    }

    /// Pair each region with its translation, keeping only the ones whose
    /// translation would visibly change the image.
    pub fn plan(&self, regions: Vec<Region>, translations: Vec<String>) -> Result<Vec<(Region, String)>> {
        if regions.len() != translations.len() {
            exn::bail!(ErrorKind::CountMismatch {
                expected: regions.len(),
                actual: translations.len(),
            });
        }
        Ok(regions
            .into_iter()
            .zip(translations)
            .filter(|(region, translation)| needs_redraw(&region.text, translation))
            .collect())
    }

    /// Paint every planned region and re-encode in `media_type`.
    pub fn render(
        &self,
        face: &dyn Typeface,
        image: &DynamicImage,
        media_type: &str,
        plan: &[(Region, String)],
    ) -> Result<Vec<u8>> {
        let format = format_for(media_type)?;
        let source = image.to_rgba8();
        let mut canvas = source.clone();
        for (region, translation) in plan {
            paint(&mut canvas, &source, face, region, translation);
        }
        let output = match format {
            // JPEG has no alpha channel.
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()),
            _ => DynamicImage::ImageRgba8(canvas),
        };
        let mut buffer = Vec::new();
        output.write_to(&mut Cursor::new(&mut buffer), format).or_raise(|| ErrorKind::Encode)?;
        Ok(buffer)
    }

    /// Run the whole state machine for one image.
    ///
    /// `detections` are reused when the prescan already produced them for
    /// this image; otherwise the worker's engine runs here (and is built on
    /// first use). They are re-filtered with
    /// `source_lang` either way, since the prescan may have run before the
    /// source language was known. `translate` receives the merged regions
    /// and must return one translation per region, in order.
    #[instrument(skip_all, fields(media_type = %media_type, bytes = bytes.len()))]
    pub fn process(
        &self,
        engine: &mut LazyEngine,
        face: &dyn Typeface,
        bytes: &[u8],
        media_type: &str,
        source_lang: &str,
        detections: Option<Vec<Detection>>,
        translate: impl FnOnce(&[Region]) -> Vec<String>,
    ) -> Result<Outcome> {
        let Some(image) = self.decode(bytes, media_type)? else {
            return Ok(Outcome::Unchanged(Skip::TooSmall));
        };
        let detections = match detections {
            Some(detections) => filter_language(detections, source_lang),
            None => self.detect(engine.get()?, &image, source_lang)?,
        };
        let regions = merge(&detections);
        if regions.is_empty() {
            return Ok(Outcome::Unchanged(Skip::NoRegions));
        }
        let translations = translate(&regions);
        let plan = self.plan(regions, translations)?;
        if plan.is_empty() {
            return Ok(Outcome::Unchanged(Skip::NoChanges));
        }
        tracing::debug!(regions = plan.len(), "Rendering translated regions");
        self.render(face, &image, media_type, &plan).map(Outcome::Rendered)
    }
}
