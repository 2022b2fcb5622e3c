//! Translation backend seam.
//!
//! A backend turns a batch of text segments into the same number of
//! translated segments, in the same order. Concrete services (Google, DeepL,
//! OpenAI, Ollama, ...) live outside this workspace and plug in through
//! [`TranslationBackend`]. Wrap them in a [`RetryingBackend`] to get a
//! per-call timeout and bounded exponential backoff.

pub mod error;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod retry;

#[cfg(any(test, feature = "mock"))]
pub use crate::mock::{MockBackend, Request};
pub use crate::retry::{RetryPolicy, RetryingBackend};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn TranslationBackend + Send + Sync>;

/// Unified interface for translation services.
///
/// # Examples
///
/// ```
/// use verso_backend::{TranslationBackend, error::Result};
///
/// async fn greet(backend: &dyn TranslationBackend) -> Result<String> {
///     let texts = vec!["你好".to_string()];
///     let mut translated = backend.translate(&texts, "zh-cn", "en").await?;
///     Ok(translated.remove(0))
/// }
/// ```
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Name of the service. Part of every cache key, so two backends that
    /// produce different output must not share a name.
    fn name(&self) -> &str;

    /// Translate `texts` from `source_lang` to `target_lang`.
    ///
    /// Implementations must return exactly one translation per input, in
    /// input order. `source_lang` may be `"auto"`.
    async fn translate(&self, texts: &[String], source_lang: &str, target_lang: &str) -> Result<Vec<String>>;
}
