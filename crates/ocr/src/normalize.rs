//! Detect-stage cleanup: text normalization and the noise/script filters.

use crate::models::Detection;
use unicode_normalization::UnicodeNormalization;
use verso_lang::AUTO;
use verso_lang::script::{has_known_script, matches_language};

const ZERO_WIDTH: [char; 5] = ['\u{200b}', '\u{200c}', '\u{200d}', '\u{2060}', '\u{feff}'];

/// Canonically composed, zero-width marks removed, whitespace runs collapsed
/// to a single space and trimmed.
pub fn normalize_text(text: &str) -> String {
    let composed: String = text.nfc().filter(|ch| !ZERO_WIDTH.contains(ch)).collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns `true` for text that is not worth translating: a lone symbol, or
/// nothing from any supported script.
pub fn is_noise(text: &str) -> bool {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (None, _) => true,
        (Some(ch), None) if !ch.is_alphanumeric() => true,
        _ => !has_known_script(text),
    }
}

/// Apply the full detect-stage filter chain, in order: confidence threshold,
/// normalization, noise, then the source-language script filter (skipped for
/// `auto`).
pub fn prepare(detections: Vec<Detection>, threshold: f32, source_lang: &str) -> Vec<Detection> {
    let cleaned = detections
        .into_iter()
        .filter(|d| d.confidence >= threshold)
        .filter_map(|mut d| {
            d.text = normalize_text(&d.text);
            (!is_noise(&d.text)).then_some(d)
        })
        .filter(|d| d.bbox().is_some())
        .collect();
    filter_language(cleaned, source_lang)
}

/// Drop detections whose text has no character from the scripts of
/// `source_lang`. A no-op under `auto`.
pub fn filter_language(detections: Vec<Detection>, source_lang: &str) -> Vec<Detection> {
    if source_lang == AUTO {
        return detections;
    }
    detections.into_iter().filter(|d| matches_language(&d.text, source_lang)).collect()
}
