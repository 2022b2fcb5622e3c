//! Content unit translation on a bounded worker pool.

use crate::error::{ErrorKind, Result};
use crate::images::ImageStage;
use crate::translate::Translator;
use exn::ResultExt;
use std::collections::VecDeque;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use verso_document::{Book, ContentUnit, Extracted, TextStructure, TextStructureHandle};

/// Upper bound, in characters, of the text used for early and fallback
/// language detection.
pub const SAMPLE_CHARS: usize = 12_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ChapterStats {
    pub processed: usize,
    pub failed: usize,
}

/// Up to `max_chars` characters of trimmed, non-empty text in reading order.
/// Units that cannot be extracted are skipped.
pub fn language_sample(units: &[ContentUnit], structure: &dyn TextStructure, max_chars: usize) -> String {
    let mut chunks = Vec::new();
    let mut taken = 0;
    for unit in units {
        let Ok(Extracted { texts, .. }) = structure.extract(&unit.content) else {
            continue;
        };
        for text in texts {
            let text = text.trim();
            if text.is_empty() {
                continue;
            }
            chunks.push(text.to_string());
            taken += text.chars().count();
            if taken >= max_chars {
                return chunks.join(" ");
            }
        }
    }
    chunks.join(" ")
}

async fn translate_unit(
    structure: TextStructureHandle,
    translator: Translator,
    bilingual: bool,
    id: String,
    content: Vec<u8>,
) -> Result<Vec<u8>> {
    let Extracted { texts, handle } = structure.extract(&content).or_raise(|| ErrorKind::Unit(id.clone()))?;
    if texts.is_empty() {
        return Ok(content);
    }
    translator.source().observe(&texts);
    let translated = translator.translate_batch(&texts).await;
    let output: Vec<String> = if bilingual {
        texts
            .iter()
            .zip(translated)
            .map(|(original, translated)| {
                if original.trim().is_empty() {
                    translated
                } else {
                    format!("{original}\n\n{translated}")
                }
            })
            .collect()
    } else {
        translated
    };
    structure.replace(handle, &output).or_raise(|| ErrorKind::Unit(id))
}

/// Translate every content unit of `book` in place, `threads` at a time.
///
/// A unit that fails is logged and left as it was. After each unit the image
/// stage gets a chance to start. Cancellation aborts queued and running
/// units without waiting for them.
#[instrument(skip_all, fields(units = book.units.len(), threads = threads))]
pub(crate) async fn translate_chapters(
    book: &mut Book,
    structure: &TextStructureHandle,
    translator: &Translator,
    threads: usize,
    bilingual: bool,
    mut images: Option<&mut ImageStage>,
    cancel: &CancellationToken,
) -> Result<ChapterStats> {
    let total = book.units.len();
    let mut queue: VecDeque<(usize, String, Vec<u8>)> = book
        .units
        .iter()
        .enumerate()
        .map(|(index, unit)| (index, unit.id.clone(), unit.content.clone()))
        .collect();
    let spawn = |running: &mut JoinSet<(usize, Result<Vec<u8>>)>, (index, id, content): (usize, String, Vec<u8>)| {
        let structure = TextStructureHandle::clone(structure);
        let translator = translator.clone();
        running.spawn(async move { (index, translate_unit(structure, translator, bilingual, id, content).await) });
    };

    let mut running = JoinSet::new();
    for job in queue.drain(..threads.max(1).min(total)) {
        spawn(&mut running, job);
    }
    let mut stats = ChapterStats::default();
    loop {
        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!(queued = queue.len(), running = running.len(), "Chapter translation cancelled");
                running.abort_all();
                exn::bail!(ErrorKind::Cancelled);
            },
            joined = running.join_next() => joined,
        };
        let Some(joined) = joined else {
            break;
        };
        match joined {
            Ok((index, Ok(content))) => {
                book.units[index].content = content;
                stats.processed += 1;
            },
            Ok((index, Err(err))) => {
                tracing::warn!(unit = %book.units[index].id, error = ?err, "Content unit left untranslated");
                stats.failed += 1;
            },
            Err(err) => {
                tracing::warn!(error = %err, "Chapter worker failed");
                stats.failed += 1;
            },
        }
        tracing::debug!(done = stats.processed + stats.failed, total, "Chapter finished");
        // Pop-n-push, FIFO.
        if let Some(job) = queue.pop_front() {
            spawn(&mut running, job);
        }
        if let Some(images) = images.as_deref_mut() {
            images.poll().await;
        }
    }
    tracing::info!(processed = stats.processed, failed = stats.failed, "Translated chapters");
    Ok(stats)
}
