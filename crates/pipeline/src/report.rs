use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use facet_json::to_string as to_json;
use verso_cache::CacheStats;

/// Image stage counters. `total` counts images in a supported format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, facet::Facet)]
pub struct ImageStats {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub total: usize,
}

/// Wall-clock seconds per stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, facet::Facet)]
pub struct Timings {
    #[facet(rename = "total_sec")]
    pub total: f64,
    #[facet(rename = "chapters_sec")]
    pub chapters: f64,
    #[facet(rename = "images_sec")]
    pub images: f64,
    #[facet(rename = "styles_sec")]
    pub styles: f64,
    #[facet(rename = "metadata_toc_sec")]
    pub metadata_toc: f64,
    #[facet(rename = "save_sec")]
    pub save: f64,
}

/// Summary of one finished run.
#[derive(Debug, Clone, PartialEq, facet::Facet)]
pub struct Report {
    pub output_path: String,
    /// `auto` if detection never settled on a language.
    pub effective_source_lang: String,
    pub target_lang: String,
    /// The run continued an earlier partial output in images-only mode.
    pub resumed: bool,
    /// Content units written back, including ones whose text fell back to
    /// the source.
    pub units_processed: usize,
    /// Content units left untouched after an extract or replace failure.
    pub units_failed: usize,
    pub images: ImageStats,
    pub performance: Timings,
    pub translation_cache: Option<CacheStats>,
    pub ocr_cache: Option<CacheStats>,
}

impl Report {
    pub fn to_json(&self) -> Result<String> {
        to_json(self).or_raise(|| ErrorKind::Report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_keys() {
        let report = Report {
            output_path: "novel.en.epub".to_string(),
            effective_source_lang: "zh-cn".to_string(),
            target_lang: "en".to_string(),
            resumed: false,
            units_processed: 3,
            units_failed: 1,
            images: ImageStats {
                processed: 1,
                skipped: 2,
                errors: 0,
                total: 3,
            },
            performance: Timings::default(),
            translation_cache: None,
            ocr_cache: None,
        };
        let json = report.to_json().unwrap();
        for key in [
            "\"output_path\"",
            "\"effective_source_lang\":\"zh-cn\"",
            "\"units_failed\":1",
            "\"skipped\":2",
            "\"total_sec\"",
            "\"metadata_toc_sec\"",
        ] {
            assert!(json.contains(key), "{key} missing from {json}");
        }
    }
}
