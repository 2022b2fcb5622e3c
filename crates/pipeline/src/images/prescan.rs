use super::{ImageContext, ImageJob, Prescanned};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use verso_cache::RegionKey;
use verso_ocr::LazyEngine;

/// Prescan progress, shared with the coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrescanProgress {
    pub total: usize,
    pub completed: usize,
}

/// Detect text in every job with a single engine, consulting the OCR cache
/// first. Runs on a blocking thread.
///
/// Images whose detection fails are left out of the result, so the
/// translate stage scans them again.
pub(super) fn prescan(
    context: Arc<ImageContext>,
    jobs: Arc<Vec<ImageJob>>,
    source_lang: String,
    progress: Arc<Mutex<PrescanProgress>>,
    runtime: Handle,
    cancel: CancellationToken,
) -> Prescanned {
    progress.lock().unwrap_or_else(PoisonError::into_inner).total = jobs.len();

    let threshold = context.pipeline.threshold();
    let mut engine = LazyEngine::new(Arc::clone(&context.factory), source_lang.as_str());
    let mut found = Prescanned::new();
    for (index, job) in jobs.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::debug!(completed = index, "Prescan cancelled");
            break;
        }
        let key = RegionKey::new(&job.bytes, &source_lang, &job.media_type, threshold);
        let cached = context
            .ocr_cache
            .as_ref()
            .and_then(|store| runtime.block_on(store.get_regions(&key)));
        let detections = match cached {
            Some(detections) => Some(detections),
            None => match context.pipeline.scan(&mut engine, &job.bytes, &job.media_type, &source_lang) {
                Ok(detections) => {
                    if let Some(store) = &context.ocr_cache {
                        runtime.block_on(store.put_regions(&key, &detections));
                    }
                    Some(detections)
                },
                Err(err) => {
                    tracing::warn!(image = %job.name, error = ?err, "Prescan failed, image will be scanned again");
                    None
                },
            },
        };
        if let Some(detections) = detections {
            found.insert(index, detections);
        }
        progress.lock().unwrap_or_else(PoisonError::into_inner).completed += 1;
    }
    tracing::info!(scanned = found.len(), total = jobs.len(), lang = %source_lang, "Image prescan finished");
    found
}
