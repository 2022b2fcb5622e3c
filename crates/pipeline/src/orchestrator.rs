use crate::chapters::{ChapterStats, SAMPLE_CHARS, language_sample, translate_chapters};
use crate::checkpoint::Checkpoint;
use crate::error::{ErrorKind, Result};
use crate::images::{ImageContext, ImageStage};
use crate::report::{ImageStats, Report, Timings};
use crate::style::{STYLESHEET_HREF, cjk_stylesheet};
use crate::translate::Translator;
use exn::ResultExt;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use verso_backend::{BackendHandle, RetryPolicy, RetryingBackend};
use verso_cache::{CONTENT_CACHE_FILE, ContentCache, OCR_CACHE_FILE, OcrArtifactStore};
use verso_config::Config;
use verso_document::{Book, MetadataField, StoreHandle, TextStructureHandle};
use verso_lang::{SourceLanguage, codes};
use verso_ocr::{FactoryHandle, FontFace, RegionPipeline, Typeface};

/// The services a run talks to.
pub struct Collaborators {
    pub store: StoreHandle,
    pub structure: TextStructureHandle,
    /// The raw backend. The orchestrator wraps it in a [`RetryingBackend`].
    pub backend: BackendHandle,
    /// `None` disables image translation.
    pub ocr: Option<FactoryHandle>,
    /// Font for redrawn image text. Loaded from `font_path` when absent.
    pub typeface: Option<Arc<dyn Typeface>>,
}

/// `<input stem>.<target>.epub`, next to the input.
pub fn default_output(input: &Path, target_lang: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    input.with_file_name(format!("{stem}.{target_lang}.epub"))
}

fn ensure_running(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        exn::bail!(ErrorKind::Cancelled);
    }
    Ok(())
}

/// Drives one book through every stage:
///
/// ```text
/// Load -> { Chapters || Prescan } -> Images (gated) -> Stylesheet -> Metadata + TOC -> Save
/// ```
///
/// A checkpoint is written next to the output after each stage so that an
/// interrupted run can be continued with `resume`.
pub struct Orchestrator {
    config: Config,
    parts: Collaborators,
    backend: BackendHandle,
    content_cache: Option<ContentCache>,
    ocr_cache: Option<OcrArtifactStore>,
}

impl Orchestrator {
    pub fn new(config: Config, parts: Collaborators) -> Self {
        let policy = RetryPolicy {
            timeout: Duration::from_secs(config.backend.timeout_secs),
            max_retries: config.backend.max_retries,
            backoff_base: Duration::from_millis(config.backend.backoff_base_ms),
            backoff_max: Duration::from_millis(config.backend.backoff_max_ms),
        };
        let backend: BackendHandle = Arc::new(RetryingBackend::new(Arc::clone(&parts.backend), policy));
        Self {
            config,
            parts,
            backend,
            content_cache: None,
            ocr_cache: None,
        }
    }

    /// Use these caches instead of the ones under the cache directory.
    pub fn with_caches(self, content: Option<ContentCache>, ocr: Option<OcrArtifactStore>) -> Self {
        Self {
            content_cache: content,
            ocr_cache: ocr,
            ..self
        }
    }

    /// Open both caches under the configured cache directory. A cache that
    /// cannot be opened is disabled for the run.
    pub async fn open_caches(mut self) -> Self {
        if !self.config.use_cache {
            return self;
        }
        let Some(dir) = self.config.cache_dir() else {
            tracing::warn!("No cache directory available, caching disabled");
            return self;
        };
        match ContentCache::open(dir.join(CONTENT_CACHE_FILE)).await {
            Ok(cache) => self.content_cache = Some(cache),
            Err(err) => tracing::warn!(error = ?err, "Translation cache disabled"),
        }
        if self.config.translate_images {
            match OcrArtifactStore::open(dir.join(OCR_CACHE_FILE)).await {
                Ok(store) => self.ocr_cache = Some(store),
                Err(err) => tracing::warn!(error = ?err, "OCR cache disabled"),
            }
        }
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translate `input` and write the result to `output` (or the
    /// [default output](default_output)).
    ///
    /// Only a failed load, a failed save or cancellation end the run early.
    #[instrument(skip_all, fields(input = %input.display()))]
    pub async fn run(&self, input: &Path, output: Option<&Path>, cancel: &CancellationToken) -> Result<Report> {
        let started = Instant::now();
        let target = self.config.target_lang.as_str();
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output(input, target));

        let mut checkpoint = Checkpoint::default();
        let mut load_path = input.to_path_buf();
        let mut images_only = self.config.images_only;
        let mut resumed = false;
        if self.config.resume {
            match Checkpoint::load(&output) {
                Some(saved) if self.parts.store.exists(&output) => {
                    tracing::info!(output = %output.display(), "Existing output found, continuing in images-only mode");
                    checkpoint = saved;
                    load_path = output.clone();
                    images_only = true;
                    resumed = true;
                },
                _ => tracing::debug!(output = %output.display(), "Nothing to resume"),
            }
        }

        let mut book = self.load(&load_path).await?;
        ensure_running(cancel)?;

        let source = Arc::new(SourceLanguage::new(self.config.source_lang.as_str()));
        if source.is_auto() {
            source.observe_sample(&language_sample(&book.units, &*self.parts.structure, SAMPLE_CHARS));
        }
        let translator = Translator::new(
            Arc::clone(&self.backend),
            self.content_cache.clone(),
            Arc::clone(&source),
            target,
        );
        tracing::info!(
            units = book.units.len(),
            images = book.images.len(),
            source = %codes::label(source.current()),
            target = %codes::label(target),
            service = translator.service(),
            threads = self.config.threads,
            image_threads = self.config.image_threads(),
            cache = self.content_cache.is_some(),
            images_only,
            bilingual = self.config.bilingual,
            "Starting translation"
        );

        let mut timings = Timings::default();

        // Chapters, with the image prescan running alongside.
        let stage = Instant::now();
        let run_images = self.config.translate_images && !(resumed && checkpoint.images_done);
        let mut images = if run_images {
            self.image_stage(&book, &translator, cancel)
        } else {
            None
        };
        let mut chapters = ChapterStats::default();
        if !images_only {
            chapters = translate_chapters(
                &mut book,
                &self.parts.structure,
                &translator,
                self.config.threads,
                self.config.bilingual,
                images.as_mut(),
                cancel,
            )
            .await?;
        }
        if let Some(images) = images.as_mut() {
            images.idle().await?;
        }
        timings.chapters = stage.elapsed().as_secs_f64();
        checkpoint.chapters_done = true;
        checkpoint.save(&output);

        if source.is_auto() && !source.is_resolved() {
            source.observe_sample(&language_sample(&book.units, &*self.parts.structure, SAMPLE_CHARS));
        }
        if let Some(images) = images.as_mut() {
            images.poll().await;
        }
        tracing::info!(
            source = %codes::label(source.current()),
            target = %codes::label(target),
            "Effective language pair"
        );

        // Images.
        let stage = Instant::now();
        let image_stats = match images {
            Some(images) => {
                let results = images.finish().await?;
                for (asset, bytes) in results.rendered {
                    book.images[asset].content = bytes;
                }
                results.stats
            },
            None => ImageStats::default(),
        };
        timings.images = stage.elapsed().as_secs_f64();
        checkpoint.images_done = true;
        checkpoint.save(&output);
        ensure_running(cancel)?;

        // Stylesheet.
        let stage = Instant::now();
        if codes::is_cjk(target) && !images_only {
            tracing::info!(href = STYLESHEET_HREF, "Adding CJK stylesheet");
            book.add_stylesheet(STYLESHEET_HREF, cjk_stylesheet(target, &self.config.style));
        }
        timings.styles = stage.elapsed().as_secs_f64();

        // Metadata and table of contents.
        let stage = Instant::now();
        if !images_only {
            self.translate_metadata(&mut book, &translator, cancel).await?;
        }
        timings.metadata_toc = stage.elapsed().as_secs_f64();
        checkpoint.metadata_done = true;
        checkpoint.save(&output);
        ensure_running(cancel)?;

        // Save.
        let stage = Instant::now();
        self.save(book, &output).await?;
        timings.save = stage.elapsed().as_secs_f64();
        checkpoint.saved_done = true;
        checkpoint.save(&output);
        timings.total = started.elapsed().as_secs_f64();

        let translation_cache = match &self.content_cache {
            Some(cache) => cache.stats().await.ok(),
            None => None,
        };
        let ocr_cache = match &self.ocr_cache {
            Some(store) => store.stats().await.ok(),
            None => None,
        };
        let report = Report {
            output_path: output.display().to_string(),
            effective_source_lang: source.current().to_string(),
            target_lang: target.to_string(),
            resumed,
            units_processed: chapters.processed,
            units_failed: chapters.failed,
            images: image_stats,
            performance: timings,
            translation_cache,
            ocr_cache,
        };
        tracing::info!(
            output = %output.display(),
            total_sec = timings.total,
            images_processed = image_stats.processed,
            units_failed = chapters.failed,
            "Translation complete"
        );
        Ok(report)
    }

    async fn load(&self, path: &Path) -> Result<Book> {
        tracing::info!(path = %path.display(), "Loading document");
        let store = Arc::clone(&self.parts.store);
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || store.load(&owned))
            .await
            .or_raise(|| ErrorKind::Worker)?
            .or_raise(|| ErrorKind::Load(path.to_path_buf()))
    }

    async fn save(&self, book: Book, path: &Path) -> Result<()> {
        tracing::info!(path = %path.display(), "Saving translated document");
        let store = Arc::clone(&self.parts.store);
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || store.save(&book, &owned))
            .await
            .or_raise(|| ErrorKind::Worker)?
            .or_raise(|| ErrorKind::Save(path.to_path_buf()))
    }

    /// Start the prescan, or return `None` if there is no engine or no font.
    fn image_stage(&self, book: &Book, translator: &Translator, cancel: &CancellationToken) -> Option<ImageStage> {
        let Some(factory) = &self.parts.ocr else {
            tracing::debug!("No OCR engine configured, skipping images");
            return None;
        };
        let face: Arc<dyn Typeface> = match (&self.parts.typeface, &self.config.font_path) {
            (Some(face), _) => Arc::clone(face),
            (None, Some(path)) => match FontFace::from_path(path).or_raise(|| ErrorKind::Font) {
                Ok(face) => Arc::new(face),
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = ?err, "Could not load font, skipping images");
                    return None;
                },
            },
            (None, None) => {
                tracing::warn!("No font configured for redrawing image text, skipping images");
                return None;
            },
        };
        let context = ImageContext {
            factory: Arc::clone(factory),
            face,
            translator: translator.clone(),
            ocr_cache: self.ocr_cache.clone(),
            pipeline: RegionPipeline::new(self.config.confidence_threshold),
            threads: self.config.image_threads(),
        };
        Some(ImageStage::start(context, &book.images, cancel))
    }

    /// Translate metadata fields and TOC titles, then tag the book with the
    /// target language.
    #[instrument(skip_all)]
    async fn translate_metadata(&self, book: &mut Book, translator: &Translator, cancel: &CancellationToken) -> Result<()> {
        let mut originals: Vec<String> = MetadataField::ALL
            .iter()
            .flat_map(|&field| book.metadata.values(field).iter().cloned())
            .chain(book.toc_titles().into_iter().map(str::to_string))
            .filter(|text| !text.trim().is_empty())
            .collect();
        originals.sort();
        originals.dedup();

        let mut translated = HashMap::with_capacity(originals.len());
        for original in originals {
            ensure_running(cancel)?;
            let text = translator.translate_single(&original).await;
            translated.insert(original, text);
        }
        let lookup = |text: &str| translated.get(text).cloned().unwrap_or_else(|| text.to_string());

        let changes = book.translate_metadata(lookup);
        for (field, pairs) in &changes {
            for (original, translated) in pairs {
                tracing::info!(field = field.as_str(), %original, %translated, "Translated metadata");
            }
        }
        book.update_metadata_language(translator.target());
        book.update_toc_labels(lookup);
        tracing::info!(titles = book.toc_titles().len(), "Translated table of contents");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;
    use tempfile::TempDir;
    use verso_backend::MockBackend;
    use verso_document::mock::{LineStructure, MemoryStore};
    use verso_document::{ContentUnit, ImageAsset, TocNode};
    use verso_ocr::mock::{FixedFace, MockFactory};
    use verso_ocr::{Detection, Point};

    const INPUT: &str = "book.epub";

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([250, 250, 250, 255])));
        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png).unwrap();
        buffer
    }

    fn sign() -> Detection {
        Detection::new(
            vec![
                Point::new(10.0, 10.0),
                Point::new(60.0, 10.0),
                Point::new(60.0, 30.0),
                Point::new(10.0, 30.0),
            ],
            "出口",
            0.95,
        )
    }

    fn book(units: &[&[u8]]) -> Book {
        let mut book = Book {
            units: units
                .iter()
                .enumerate()
                .map(|(i, content)| ContentUnit::new(format!("c{i}"), format!("text/c{i}.xhtml"), content.to_vec()))
                .collect(),
            toc: vec![TocNode::section("第一部", vec![TocNode::leaf("这是第一章", "text/c0.xhtml")])],
            ..Book::default()
        };
        book.metadata.push(MetadataField::Title, "这是书名");
        book.metadata.push(MetadataField::Subject, "小说");
        book
    }

    fn chinese_book() -> Book {
        book(&["这是第一章\n内容".as_bytes(), "这是第二章".as_bytes()])
    }

    fn with_images(mut book: Book) -> Book {
        book.images = vec![
            ImageAsset::new("images/sign.png", "image/png", png(200, 120)),
            ImageAsset::new("images/icon.png", "image/png", png(50, 50)),
            ImageAsset::new("images/anim.gif", "image/gif", b"GIF89a".to_vec()),
        ];
        book
    }

    fn illustrated_book() -> Book {
        with_images(chinese_book())
    }

    fn config() -> Config {
        Config {
            use_cache: false,
            threads: 2,
            ..Config::default()
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        backend: Arc<MockBackend>,
        factory: Option<Arc<MockFactory>>,
        dir: TempDir,
    }

    impl Harness {
        fn new(book: Book, backend: MockBackend) -> Self {
            Self {
                store: Arc::new(MemoryStore::with_books([(INPUT, book)])),
                backend: Arc::new(backend),
                factory: None,
                dir: TempDir::new().unwrap(),
            }
        }

        fn with_ocr(self, factory: MockFactory) -> Self {
            Self {
                factory: Some(Arc::new(factory)),
                ..self
            }
        }

        fn output(&self) -> PathBuf {
            self.dir.path().join("book.en.epub")
        }

        fn orchestrator(&self, config: Config) -> Orchestrator {
            let parts = Collaborators {
                store: self.store.clone(),
                structure: Arc::new(LineStructure),
                backend: self.backend.clone(),
                ocr: self.factory.clone().map(|factory| factory as FactoryHandle),
                typeface: Some(Arc::new(FixedFace) as Arc<dyn Typeface>),
            };
            Orchestrator::new(config, parts)
        }

        async fn run(&self, config: Config) -> Result<Report> {
            self.orchestrator(config)
                .run(Path::new(INPUT), Some(&self.output()), &CancellationToken::new())
                .await
        }

        fn saved(&self) -> Book {
            self.store.get(self.output()).unwrap()
        }
    }

    #[test]
    fn test_default_output() {
        assert_eq!(
            default_output(Path::new("/books/novel.epub"), "en"),
            PathBuf::from("/books/novel.en.epub")
        );
        assert_eq!(default_output(Path::new("novel"), "zh-tw"), PathBuf::from("novel.zh-tw.epub"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_full_run() {
        let harness = Harness::new(chinese_book(), MockBackend::new());
        let report = harness.run(config()).await.unwrap();

        assert_eq!(report.effective_source_lang, "zh-cn");
        assert_eq!(report.target_lang, "en");
        assert_eq!((report.units_processed, report.units_failed), (2, 0));
        assert!(!report.resumed);
        assert_eq!(report.output_path, harness.output().display().to_string());

        let saved = harness.saved();
        assert_eq!(saved.units[0].content, "en:这是第一章\nen:内容".as_bytes());
        assert_eq!(saved.units[1].content, "en:这是第二章".as_bytes());
        assert_eq!(saved.metadata.values(MetadataField::Title), ["en:这是书名"]);
        assert_eq!(saved.metadata.values(MetadataField::Subject), ["en:小说"]);
        assert_eq!(saved.metadata.language.as_deref(), Some("en"));
        assert_eq!(saved.toc_titles(), ["en:第一部", "en:这是第一章"]);
        assert!(saved.stylesheets.is_empty());

        let requests = harness.backend.requests().await;
        assert!(requests.iter().all(|r| r.source_lang == "zh-cn" && r.target_lang == "en"));
        assert_eq!(
            Checkpoint::load(&harness.output()),
            Some(Checkpoint {
                chapters_done: true,
                images_done: true,
                metadata_done: true,
                saved_done: true,
            })
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_run_is_served_from_cache() {
        let cache = ContentCache::in_memory().await.unwrap();
        let first = Harness::new(chinese_book(), MockBackend::new());
        first
            .orchestrator(config())
            .with_caches(Some(cache.clone()), None)
            .run(Path::new(INPUT), Some(&first.output()), &CancellationToken::new())
            .await
            .unwrap();
        assert!(first.backend.calls() > 0);

        let second = Harness::new(chinese_book(), MockBackend::new());
        let report = second
            .orchestrator(config())
            .with_caches(Some(cache), None)
            .run(Path::new(INPUT), Some(&second.output()), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(second.backend.calls(), 0);
        assert_eq!(second.saved(), first.saved());
        let stats = report.translation_cache.unwrap();
        assert!(stats.hits > 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_malformed_unit_is_left_alone() {
        let harness = Harness::new(book(&[b"\xff\xfe", "这是正文".as_bytes()]), MockBackend::new());
        let report = harness.run(config()).await.unwrap();
        assert_eq!((report.units_processed, report.units_failed), (1, 1));
        let saved = harness.saved();
        assert_eq!(saved.units[0].content, b"\xff\xfe");
        assert_eq!(saved.units[1].content, "en:这是正文".as_bytes());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_bilingual_output() {
        let harness = Harness::new(book(&["这是正文".as_bytes()]), MockBackend::new());
        harness
            .run(Config {
                bilingual: true,
                ..config()
            })
            .await
            .unwrap();
        assert_eq!(harness.saved().units[0].content, "这是正文\n\nen:这是正文".as_bytes());
        // Metadata is never bilingual.
        assert_eq!(harness.saved().metadata.values(MetadataField::Title), ["en:这是书名"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cjk_target_gets_stylesheet() {
        let harness = Harness::new(book(&[b"Hello there"]), MockBackend::new());
        harness
            .run(Config {
                source_lang: "en".to_string(),
                target_lang: "ko".to_string(),
                ..config()
            })
            .await
            .unwrap();
        let saved = harness.saved();
        assert_eq!(saved.stylesheets.len(), 1);
        assert_eq!(saved.stylesheets[0].href, STYLESHEET_HREF);
        assert!(saved.stylesheets[0].content.contains("Noto Sans KR"));
        assert!(saved.units.iter().all(|unit| unit.stylesheets == [STYLESHEET_HREF]));
        assert_eq!(saved.units[0].content, b"ko:Hello there");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rejected_translations_keep_source_text() {
        let harness = Harness::new(chinese_book(), MockBackend::new().rejecting());
        let report = harness.run(config()).await.unwrap();
        assert_eq!(report.units_failed, 0);
        let saved = harness.saved();
        assert_eq!(saved.units, chinese_book().units);
        assert_eq!(saved.metadata.values(MetadataField::Title), ["这是书名"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_save_ends_the_run() {
        let mut harness = Harness::new(chinese_book(), MockBackend::new());
        harness.store = Arc::new(MemoryStore::with_books([(INPUT, chinese_book())]).failing_saves());
        let err = harness.run(config()).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Save(path) if *path == harness.output()));
        let checkpoint = Checkpoint::load(&harness.output()).unwrap();
        assert!(checkpoint.metadata_done);
        assert!(!checkpoint.saved_done);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_input() {
        let harness = Harness::new(chinese_book(), MockBackend::new());
        let err = harness
            .orchestrator(config())
            .run(Path::new("missing.epub"), Some(&harness.output()), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::Load(_)));
        assert_eq!(harness.backend.calls(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancellation_stops_before_saving() {
        let harness = Harness::new(chinese_book(), MockBackend::new().with_delay(Duration::from_secs(10)));
        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                cancel.cancel();
            }
        });
        let started = Instant::now();
        let err = harness
            .orchestrator(config())
            .run(Path::new(INPUT), Some(&harness.output()), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(&*err, ErrorKind::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(harness.store.saves(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_images_use_detected_language() {
        let harness = Harness::new(
            illustrated_book(),
            MockBackend::with_translations([("出口", "Exit")]),
        )
        .with_ocr(MockFactory::new(vec![sign()]));
        let report = harness.run(config()).await.unwrap();

        assert_eq!(
            report.images,
            ImageStats {
                processed: 1,
                skipped: 1,
                errors: 0,
                total: 2,
            }
        );
        let requests = harness.backend.requests().await;
        assert!(requests.iter().any(|r| r.texts == ["出口"]));
        assert!(requests.iter().all(|r| r.source_lang == "zh-cn"));

        let original = illustrated_book();
        let saved = harness.saved();
        assert_ne!(saved.images[0].content, original.images[0].content);
        assert_eq!(saved.images[1].content, original.images[1].content);
        assert_eq!(saved.images[2].content, original.images[2].content);
        let factory = harness.factory.as_ref().unwrap();
        // The prescan engine is the only one; workers reuse its detections.
        assert_eq!(factory.created(), 1);
        assert_eq!(factory.calls(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_images_wait_for_language_locked_by_a_chapter() {
        // The first unit alone fills the early sample, so detection only
        // settles once the second unit is translated.
        let latin = "word ".repeat(SAMPLE_CHARS / 4);
        let harness = Harness::new(
            with_images(book(&[latin.as_bytes(), "这是第二章".as_bytes()])),
            MockBackend::with_translations([("出口", "Exit")]),
        )
        .with_ocr(MockFactory::new(vec![sign()]));
        let report = harness
            .run(Config {
                threads: 1,
                ..config()
            })
            .await
            .unwrap();

        assert_eq!(report.effective_source_lang, "zh-cn");
        assert_eq!(report.images.processed, 1);
        let requests = harness.backend.requests().await;
        assert_eq!(requests[0].source_lang, "auto");
        let image_langs: Vec<&str> = requests
            .iter()
            .filter(|r| r.texts == ["出口"])
            .map(|r| r.source_lang.as_str())
            .collect();
        assert_eq!(image_langs, ["zh-cn"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_images_translated_under_auto_when_language_never_settles() {
        let mut latin = book(&[b"Chapter One
It was a dark night.", b"Chapter Two"]);
        latin.metadata = Default::default();
        latin.metadata.push(MetadataField::Title, "Night");
        latin.toc = vec![TocNode::leaf("Chapter One", "text/c0.xhtml")];
        let harness = Harness::new(with_images(latin), MockBackend::with_translations([("出口", "Exit")]))
            .with_ocr(MockFactory::new(vec![sign()]));
        let report = harness.run(config()).await.unwrap();

        assert_eq!(report.effective_source_lang, "auto");
        // With no concrete language the script filter keeps the Han text.
        assert_eq!(report.images.processed, 1);
        let requests = harness.backend.requests().await;
        assert!(requests.iter().all(|r| r.source_lang == "auto"));
        assert!(requests.iter().any(|r| r.texts == ["出口"]));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_images_can_be_disabled() {
        let harness = Harness::new(illustrated_book(), MockBackend::new()).with_ocr(MockFactory::new(vec![sign()]));
        let report = harness
            .run(Config {
                translate_images: false,
                ..config()
            })
            .await
            .unwrap();
        assert_eq!(report.images, ImageStats::default());
        assert_eq!(harness.factory.as_ref().unwrap().created(), 0);
        assert_eq!(harness.saved().images, illustrated_book().images);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ocr_results_are_reused_across_runs() {
        let ocr_cache = OcrArtifactStore::in_memory().await.unwrap();
        for run in 0..2 {
            let harness = Harness::new(illustrated_book(), MockBackend::with_translations([("出口", "Exit")]))
                .with_ocr(MockFactory::new(vec![sign()]));
            let report = harness
                .orchestrator(config())
                .with_caches(None, Some(ocr_cache.clone()))
                .run(Path::new(INPUT), Some(&harness.output()), &CancellationToken::new())
                .await
                .unwrap();
            assert_eq!(report.images.processed, 1);
            let factory = harness.factory.as_ref().unwrap();
            let expected = if run == 0 { 1 } else { 0 };
            assert_eq!(factory.calls(), expected, "run {run}");
            let image_requests = harness
                .backend
                .requests()
                .await
                .into_iter()
                .filter(|r| r.texts == ["出口"])
                .count();
            assert_eq!(image_requests, expected, "run {run}");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_resume_translates_only_images() {
        let harness = Harness::new(illustrated_book(), MockBackend::with_translations([("出口", "Exit")]))
            .with_ocr(MockFactory::new(vec![sign()]));
        let mut partial = illustrated_book();
        for unit in &mut partial.units {
            unit.content = b"already translated".to_vec();
        }
        harness.store.insert(harness.output(), partial.clone());
        Checkpoint {
            chapters_done: true,
            ..Checkpoint::default()
        }
        .save(&harness.output());

        let report = harness
            .run(Config {
                source_lang: "zh-cn".to_string(),
                resume: true,
                ..config()
            })
            .await
            .unwrap();
        assert!(report.resumed);
        assert_eq!(report.units_processed, 0);
        assert_eq!(report.images.processed, 1);

        let requests = harness.backend.requests().await;
        assert!(requests.iter().all(|r| r.texts == ["出口"]));
        let saved = harness.saved();
        assert_eq!(saved.units, partial.units);
        assert_eq!(saved.metadata, partial.metadata);
        assert!(saved.stylesheets.is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_resume_without_checkpoint_starts_over() {
        let harness = Harness::new(chinese_book(), MockBackend::new());
        let report = harness
            .run(Config {
                resume: true,
                ..config()
            })
            .await
            .unwrap();
        assert!(!report.resumed);
        assert_eq!(report.units_processed, 2);
    }
}
