//! Background image translation.
//!
//! Two stages run off the coordinating task:
//! 1. a single prescan worker runs detection over every image as soon as the
//!    book is loaded;
//! 2. once the prescan is done *and* the source language is settled, a pool
//!    of workers merges, translates and redraws.
//!
//! Starting stage 2 any earlier could filter OCR text and key cache entries
//! with a language that detection later overrides.

mod prescan;
mod worker;

pub use self::prescan::PrescanProgress;
use crate::error::{ErrorKind, Result};
use crate::report::ImageStats;
use crate::translate::Translator;
use exn::ResultExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use verso_cache::OcrArtifactStore;
use verso_document::ImageAsset;
use verso_ocr::{Detection, FactoryHandle, RegionPipeline, Typeface, supports};

/// How often the coordinator re-checks the gate once chapters are done.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Detections per job index. Jobs whose prescan failed are absent.
type Prescanned = HashMap<usize, Vec<Detection>>;

/// Everything an image worker needs, shared read-only.
pub(crate) struct ImageContext {
    pub factory: FactoryHandle,
    pub face: Arc<dyn Typeface>,
    pub translator: Translator,
    pub ocr_cache: Option<OcrArtifactStore>,
    pub pipeline: RegionPipeline,
    pub threads: usize,
}

/// An image in a supported format, copied out of the book.
pub(crate) struct ImageJob {
    /// Index into [`Book::images`](verso_document::Book::images).
    pub asset: usize,
    pub name: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

pub(crate) struct ImageResults {
    pub stats: ImageStats,
    /// New bytes per book image index.
    pub rendered: Vec<(usize, Vec<u8>)>,
}

/// Handle on both background stages. Dropping it aborts the translate stage
/// coordinator; blocking workers stop at their next job via `cancel`.
pub(crate) struct ImageStage {
    context: Arc<ImageContext>,
    jobs: Arc<Vec<ImageJob>>,
    progress: Arc<Mutex<PrescanProgress>>,
    prescan: Option<JoinHandle<Prescanned>>,
    translate: Option<JoinHandle<ImageResults>>,
    cancel: CancellationToken,
}

impl ImageStage {
    /// Copy the eligible images out of the book and start the prescan with
    /// the source language as it is right now.
    pub fn start(context: ImageContext, images: &[ImageAsset], cancel: &CancellationToken) -> Self {
        let jobs: Vec<ImageJob> = images
            .iter()
            .enumerate()
            .filter(|(_, image)| supports(&image.media_type))
            .map(|(asset, image)| ImageJob {
                asset,
                name: image.name.clone(),
                media_type: image.media_type.clone(),
                bytes: image.content.clone(),
            })
            .collect();
        let context = Arc::new(context);
        let jobs = Arc::new(jobs);
        let progress = Arc::new(Mutex::new(PrescanProgress::default()));
        let cancel = cancel.child_token();
        let source_lang = context.translator.source().current().to_string();
        tracing::info!(images = jobs.len(), lang = %source_lang, "Prescanning images in background");
        let prescan = tokio::task::spawn_blocking({
            let context = Arc::clone(&context);
            let jobs = Arc::clone(&jobs);
            let progress = Arc::clone(&progress);
            let runtime = Handle::current();
            let cancel = cancel.clone();
            move || prescan::prescan(context, jobs, source_lang, progress, runtime, cancel)
        });
        Self {
            context,
            jobs,
            progress,
            prescan: Some(prescan),
            translate: None,
            cancel,
        }
    }

    pub fn progress(&self) -> PrescanProgress {
        *self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_started(&self) -> bool {
        self.translate.is_some()
    }

    fn prescan_finished(&self) -> bool {
        self.prescan.as_ref().is_none_or(JoinHandle::is_finished)
    }

    fn gate_open(&self) -> bool {
        let source = self.context.translator.source();
        self.prescan_finished() && (!source.is_auto() || source.is_resolved())
    }

    /// Start the translate stage if the gate is open. Returns `true` once it
    /// has been started, now or earlier.
    pub async fn poll(&mut self) -> bool {
        if !self.is_started() && self.gate_open() {
            // The prescan is finished, so this does not wait.
            match self.collect_prescan().await {
                Ok(prescanned) => self.translate = Some(self.launch(prescanned)),
                Err(err) => tracing::debug!(error = ?err, "Prescan result unavailable"),
            }
        }
        self.is_started()
    }

    /// Wait, polling the gate, until the translate stage starts or the
    /// prescan finishes without the gate opening.
    pub async fn idle(&mut self) -> Result<()> {
        while !self.is_started() && !self.prescan_finished() {
            tokio::select! {
                _ = self.cancel.cancelled() => exn::bail!(ErrorKind::Cancelled),
                _ = tokio::time::sleep(POLL_INTERVAL) => {},
            }
            let PrescanProgress { total, completed } = self.progress();
            tracing::debug!(completed, total, "Waiting for image prescan");
            self.poll().await;
        }
        self.poll().await;
        Ok(())
    }

    /// Wait for the translate stage, starting it first if the gate never
    /// opened. Images are then translated with whatever the source language
    /// is by now, possibly `auto`.
    pub async fn finish(mut self) -> Result<ImageResults> {
        let mut handle = match self.translate.take() {
            Some(handle) => handle,
            None => {
                let prescanned = self.collect_prescan().await?;
                self.launch(prescanned)
            },
        };
        let joined = tokio::select! {
            _ = self.cancel.cancelled() => {
                handle.abort();
                exn::bail!(ErrorKind::Cancelled);
            },
            joined = &mut handle => joined,
        };
        joined.or_raise(|| ErrorKind::Worker)
    }

    async fn collect_prescan(&mut self) -> Result<Prescanned> {
        let Some(mut handle) = self.prescan.take() else {
            return Ok(Prescanned::new());
        };
        let joined = tokio::select! {
            _ = self.cancel.cancelled() => exn::bail!(ErrorKind::Cancelled),
            joined = &mut handle => joined,
        };
        Ok(joined.unwrap_or_else(|err| {
            tracing::warn!(error = %err, "Image prescan failed, images will be scanned during translation");
            Prescanned::new()
        }))
    }

    fn launch(&self, prescanned: Prescanned) -> JoinHandle<ImageResults> {
        let source_lang = self.context.translator.source().current().to_string();
        tracing::info!(lang = %source_lang, "Prescan ready, translating images in background");
        tokio::spawn(worker::translate_images(
            Arc::clone(&self.context),
            Arc::clone(&self.jobs),
            prescanned,
            source_lang,
            self.cancel.clone(),
        ))
    }
}

impl Drop for ImageStage {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = &self.translate {
            handle.abort();
        }
    }
}
