use super::{ImageContext, ImageJob, ImageResults, Prescanned};
use crate::error::{ErrorKind, Result};
use crate::report::ImageStats;
use exn::{Exn, ResultExt};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use verso_cache::RegionKey;
use verso_ocr::{LazyEngine, Outcome, Region, fingerprint};

type Queue = Arc<Mutex<VecDeque<usize>>>;

impl ImageContext {
    /// Translations for the merged regions of one image, aligned with
    /// `regions`. Only complete batches are written to the OCR cache.
    async fn translate_regions(&self, key: &RegionKey, regions: &[Region]) -> Vec<String> {
        let texts: Vec<String> = regions.iter().map(|region| region.text.clone()).collect();
        let regions_hash = fingerprint(regions);
        let (target, service) = (self.translator.target(), self.translator.service());
        if let Some(store) = &self.ocr_cache {
            match store.get_translations(key, target, service, &regions_hash).await {
                Some(cached) if cached.len() == texts.len() => return cached,
                Some(cached) => tracing::debug!(
                    expected = texts.len(),
                    actual = cached.len(),
                    "Ignoring misaligned cached translations"
                ),
                None => {},
            }
        }
        let batch = self.translator.translate(&texts).await;
        if batch.complete && let Some(store) = &self.ocr_cache {
            store.put_translations(key, target, service, &regions_hash, &batch.texts).await;
        }
        batch.texts
    }
}

/// Pull jobs off the shared queue until it is empty or the run is
/// cancelled. The worker owns one engine for its whole life, built on first
/// use with the final source language.
fn work(
    context: Arc<ImageContext>,
    jobs: Arc<Vec<ImageJob>>,
    queue: Queue,
    prescanned: Arc<Prescanned>,
    source_lang: String,
    runtime: Handle,
    cancel: CancellationToken,
) -> Vec<(usize, Result<Outcome>)> {
    let mut engine = LazyEngine::new(Arc::clone(&context.factory), source_lang.as_str());
    let threshold = context.pipeline.threshold();
    let mut results = Vec::new();
    while !cancel.is_cancelled() {
        let Some(index) = queue.lock().unwrap_or_else(PoisonError::into_inner).pop_front() else {
            break;
        };
        let job = &jobs[index];
        let key = RegionKey::new(&job.bytes, &source_lang, &job.media_type, threshold);
        let process = AssertUnwindSafe(|| {
            context.pipeline.process(
                &mut engine,
                &*context.face,
                &job.bytes,
                &job.media_type,
                &source_lang,
                prescanned.get(&index).cloned(),
                |regions| runtime.block_on(context.translate_regions(&key, regions)),
            )
        });
        // A panic stays with its image; the worker moves on to the next job.
        let result = match panic::catch_unwind(process) {
            Ok(result) => result.or_raise(|| ErrorKind::Image(job.name.clone())),
            Err(_) => Err(Exn::new(ErrorKind::Panicked(job.name.clone()))),
        };
        results.push((index, result));
    }
    results
}

/// The translate stage: `context.threads` blocking workers over every job
/// that the prescan did not already rule out.
pub(super) async fn translate_images(
    context: Arc<ImageContext>,
    jobs: Arc<Vec<ImageJob>>,
    prescanned: Prescanned,
    source_lang: String,
    cancel: CancellationToken,
) -> ImageResults {
    let mut stats = ImageStats {
        total: jobs.len(),
        ..ImageStats::default()
    };
    let mut queue = VecDeque::new();
    for index in 0..jobs.len() {
        match prescanned.get(&index) {
            Some(detections) if detections.is_empty() => stats.skipped += 1,
            _ => queue.push_back(index),
        }
    }
    tracing::info!(
        total = stats.total,
        skipped = stats.skipped,
        to_translate = queue.len(),
        lang = %source_lang,
        "Translating images"
    );

    let workers = context.threads.max(1).min(queue.len());
    let queue: Queue = Arc::new(Mutex::new(queue));
    let prescanned = Arc::new(prescanned);
    let runtime = Handle::current();
    let mut running = JoinSet::new();
    for _ in 0..workers {
        let context = Arc::clone(&context);
        let jobs = Arc::clone(&jobs);
        let queue = Arc::clone(&queue);
        let prescanned = Arc::clone(&prescanned);
        let source_lang = source_lang.clone();
        let runtime = runtime.clone();
        let cancel = cancel.clone();
        running.spawn_blocking(move || work(context, jobs, queue, prescanned, source_lang, runtime, cancel));
    }

    let mut rendered = Vec::new();
    while let Some(joined) = running.join_next().await {
        let outcomes = match joined {
            Ok(outcomes) => outcomes,
            Err(err) => {
                tracing::warn!(error = %err, "Image worker failed");
                continue;
            },
        };
        for (index, result) in outcomes {
            let job = &jobs[index];
            match result {
                Ok(Outcome::Rendered(bytes)) => {
                    stats.processed += 1;
                    rendered.push((job.asset, bytes));
                },
                Ok(Outcome::Unchanged(reason)) => {
                    tracing::debug!(image = %job.name, ?reason, "Image left unchanged");
                    stats.skipped += 1;
                },
                Err(err) => {
                    tracing::warn!(image = %job.name, error = ?err, "Failed to process image");
                    stats.errors += 1;
                },
            }
        }
    }
    tracing::info!(
        processed = stats.processed,
        skipped = stats.skipped,
        errors = stats.errors,
        total = stats.total,
        "Image OCR summary"
    );
    ImageResults { stats, rendered }
}
