//! In-memory translation backend for testing.

use crate::TranslationBackend;
use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

/// One call as seen by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub texts: Vec<String>,
    pub source_lang: String,
    pub target_lang: String,
}

/// Deterministic backend for tests.
///
/// Known texts are looked up in a dictionary; anything else becomes
/// `"<target>:<text>"`. Blank texts come back unchanged. Failures, delays and
/// short responses can be scripted with the builder methods.
pub struct MockBackend {
    name: String,
    dictionary: HashMap<String, String>,
    failures: AtomicUsize,
    reject: bool,
    drop_last: usize,
    delay: Option<Duration>,
    calls: AtomicUsize,
    requests: RwLock<Vec<Request>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            dictionary: HashMap::new(),
            failures: AtomicUsize::new(0),
            reject: false,
            drop_last: 0,
            delay: None,
            calls: AtomicUsize::new(0),
            requests: RwLock::new(Vec::new()),
        }
    }

    pub fn with_translations(pairs: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        let dictionary = pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { dictionary, ..Self::new() }
    }

    pub fn named(self, name: impl Into<String>) -> Self {
        Self { name: name.into(), ..self }
    }

    /// Fail the next `count` calls with a transport error.
    pub fn failing(self, count: usize) -> Self {
        Self { failures: AtomicUsize::new(count), ..self }
    }

    /// Reject every call with a non-retryable error.
    pub fn rejecting(self) -> Self {
        Self { reject: true, ..self }
    }

    /// Leave the last `count` segments out of every response.
    pub fn dropping_last(self, count: usize) -> Self {
        Self { drop_last: count, ..self }
    }

    /// Sleep before answering.
    pub fn with_delay(self, delay: Duration) -> Self {
        Self { delay: Some(delay), ..self }
    }

    /// Number of `translate` calls so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received so far, in arrival order.
    pub async fn requests(&self) -> Vec<Request> {
        self.requests.read().await.clone()
    }

    /// Total number of segments sent across all requests.
    pub async fn segments(&self) -> usize {
        self.requests.read().await.iter().map(|r| r.texts.len()).sum()
    }

    fn translate_one(&self, text: &str, target_lang: &str) -> String {
        if let Some(known) = self.dictionary.get(text) {
            return known.clone();
        }
        if text.trim().is_empty() {
            return text.to_string();
        }
        format!("{target_lang}:{text}")
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn translate(&self, texts: &[String], source_lang: &str, target_lang: &str) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.write().await.push(Request {
            texts: texts.to_vec(),
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.reject {
            exn::bail!(ErrorKind::Rejected("mock rejects everything".to_string()));
        }
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            exn::bail!(ErrorKind::Transport("mock outage".to_string()));
        }
        let keep = texts.len().saturating_sub(self.drop_last);
        Ok(texts[..keep].iter().map(|text| self.translate_one(text, target_lang)).collect())
    }
}
