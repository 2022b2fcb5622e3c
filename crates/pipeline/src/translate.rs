//! Cache-aware text translation shared by every stage.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use verso_backend::BackendHandle;
use verso_cache::ContentCache;
use verso_lang::SourceLanguage;

/// Translations for one batch, aligned with the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub texts: Vec<String>,
    /// `false` when the backend gave up and source text stands in for some
    /// segments.
    pub complete: bool,
}

/// Translates text through the content cache and the backend.
///
/// Cache keys use the effective source language as it is at the start of
/// each call, so a batch is always looked up and written back under the same
/// key even if the language locks while it is in flight.
#[derive(Clone)]
pub struct Translator {
    backend: BackendHandle,
    cache: Option<ContentCache>,
    source: Arc<SourceLanguage>,
    target: String,
}

impl Translator {
    pub fn new(
        backend: BackendHandle,
        cache: Option<ContentCache>,
        source: Arc<SourceLanguage>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            cache,
            source,
            target: target.into(),
        }
    }

    /// Backend name, part of every cache key.
    pub fn service(&self) -> &str {
        self.backend.name()
    }

    pub fn source(&self) -> &SourceLanguage {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Translate `texts`, one output per input in input order.
    ///
    /// Blank segments pass through untouched. Cache hits skip the backend,
    /// and each distinct miss is sent once. When the backend gives up the
    /// source text is kept and nothing is cached.
    #[instrument(skip_all, fields(count = texts.len()))]
    pub async fn translate(&self, texts: &[String]) -> Batch {
        let mut output = texts.to_vec();
        let pending: Vec<usize> = (0..texts.len()).filter(|&i| !texts[i].trim().is_empty()).collect();
        if pending.is_empty() {
            return Batch { texts: output, complete: true };
        }
        let source_lang = self.source.current().to_string();
        let service = self.service();

        let lookup: Vec<&str> = pending.iter().map(|&i| texts[i].as_str()).collect();
        let mut cached = match &self.cache {
            Some(cache) => cache.get_batch(&lookup, &source_lang, &self.target, service).await,
            None => HashMap::new(),
        };

        let mut misses: Vec<String> = Vec::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut assignments: Vec<(usize, usize)> = Vec::new();
        for (position, &index) in pending.iter().enumerate() {
            if let Some(hit) = cached.remove(&position) {
                output[index] = hit;
                continue;
            }
            let text = texts[index].as_str();
            let slot = *slots.entry(text).or_insert_with(|| {
                misses.push(text.to_string());
                misses.len() - 1
            });
            assignments.push((index, slot));
        }
        if misses.is_empty() {
            tracing::debug!(hits = pending.len(), "Every segment served from cache");
            return Batch { texts: output, complete: true };
        }

        tracing::debug!(
            hits = pending.len() - assignments.len(),
            misses = misses.len(),
            "Sending cache misses to backend"
        );
        match self.backend.translate(&misses, &source_lang, &self.target).await {
            Ok(translations) if translations.len() == misses.len() => {
                for &(index, slot) in &assignments {
                    output[index] = translations[slot].clone();
                }
                if let Some(cache) = &self.cache {
                    let pairs: Vec<(&String, &String)> = misses.iter().zip(&translations).collect();
                    cache.put_batch(&pairs, &source_lang, &self.target, service).await;
                }
                Batch { texts: output, complete: true }
            },
            Ok(translations) => {
                tracing::warn!(
                    expected = misses.len(),
                    actual = translations.len(),
                    "Backend returned the wrong number of segments, keeping source text"
                );
                Batch { texts: output, complete: false }
            },
            Err(err) => {
                tracing::warn!(segments = misses.len(), error = ?err, "Translation failed, keeping source text");
                Batch { texts: output, complete: false }
            },
        }
    }

    /// [`translate`](Self::translate) without the completeness flag.
    pub async fn translate_batch(&self, texts: &[String]) -> Vec<String> {
        self.translate(texts).await.texts
    }

    /// Translate one short string such as a title or a TOC label.
    pub async fn translate_single(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }
        let mut texts = self.translate_batch(&[text.to_string()]).await;
        texts.pop().unwrap_or_else(|| text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verso_backend::MockBackend;

    fn strings(texts: &[&str]) -> Vec<String> {
        texts.iter().map(ToString::to_string).collect()
    }

    async fn translator(backend: &Arc<MockBackend>, source: &str) -> Translator {
        let cache = ContentCache::in_memory().await.unwrap();
        Translator::new(backend.clone(), Some(cache), Arc::new(SourceLanguage::new(source)), "en")
    }

    #[tokio::test]
    async fn test_hits_skip_the_backend() {
        let backend = Arc::new(MockBackend::with_translations([("猫", "cat")]));
        let translator = translator(&backend, "zh-cn").await;
        assert_eq!(translator.translate_batch(&strings(&["猫"])).await, ["cat"]);
        assert_eq!(translator.translate_batch(&strings(&["猫"])).await, ["cat"]);
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_duplicates_and_blanks() {
        let backend = Arc::new(MockBackend::new());
        let translator = translator(&backend, "ja").await;
        let output = translator.translate_batch(&strings(&["一", "  ", "二", "一"])).await;
        assert_eq!(output, ["en:一", "  ", "en:二", "en:一"]);
        assert_eq!(backend.requests().await[0].texts, ["一", "二"]);
        assert_eq!(backend.requests().await[0].source_lang, "ja");
    }

    #[tokio::test]
    async fn test_partial_hits_only_send_misses() {
        let backend = Arc::new(MockBackend::new());
        let translator = translator(&backend, "ja").await;
        translator.translate_batch(&strings(&["一"])).await;
        let output = translator.translate_batch(&strings(&["一", "二"])).await;
        assert_eq!(output, ["en:一", "en:二"]);
        assert_eq!(backend.requests().await[1].texts, ["二"]);
    }

    #[tokio::test]
    async fn test_failure_keeps_source_and_is_not_cached() {
        let backend = Arc::new(MockBackend::new().rejecting());
        let translator = translator(&backend, "ja").await;
        let batch = translator.translate(&strings(&["一", "二"])).await;
        assert_eq!(batch.texts, ["一", "二"]);
        assert!(!batch.complete);
        let stats = translator.cache.as_ref().unwrap().stats().await.unwrap();
        assert_eq!(stats.entries, 0);
    }

    #[tokio::test]
    async fn test_short_response_keeps_source() {
        let backend = Arc::new(MockBackend::new().dropping_last(1));
        let translator = Translator::new(backend.clone(), None, Arc::new(SourceLanguage::new("ja")), "en");
        let batch = translator.translate(&strings(&["一", "二"])).await;
        assert_eq!(batch.texts, ["一", "二"]);
        assert!(!batch.complete);
    }

    #[tokio::test]
    async fn test_single() {
        let backend = Arc::new(MockBackend::new());
        let translator = translator(&backend, "auto").await;
        assert_eq!(translator.translate_single("   ").await, "   ");
        assert_eq!(backend.calls(), 0);
        assert_eq!(translator.translate_single("目录").await, "en:目录");
        assert_eq!(backend.requests().await[0].source_lang, "auto");
    }
}
