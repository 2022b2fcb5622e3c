//! Timeout and retry decorator.

use crate::error::{ErrorKind, Result};
use crate::{BackendHandle, TranslationBackend};
use async_trait::async_trait;
use std::time::Duration;

/// How hard to try before giving up on a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Limit for a single call to the wrapped backend.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each one after.
    pub backoff_base: Duration,
    /// Upper bound on any single delay.
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (zero-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry);
        self.backoff_base.saturating_mul(factor).min(self.backoff_max)
    }
}

/// Wraps a backend with a per-call timeout and exponential backoff.
///
/// A response with the wrong number of segments counts as a failed attempt.
/// Errors that are not [retryable](ErrorKind::is_retryable) are returned
/// immediately; retryable ones are returned as [`ErrorKind::Exhausted`] once
/// the policy runs out. Callers keep the source text in that case.
#[derive(Clone)]
pub struct RetryingBackend {
    inner: BackendHandle,
    policy: RetryPolicy,
}

impl RetryingBackend {
    pub fn new(inner: BackendHandle, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn attempt(&self, texts: &[String], source_lang: &str, target_lang: &str) -> Result<Vec<String>> {
        let call = self.inner.translate(texts, source_lang, target_lang);
        let Ok(result) = tokio::time::timeout(self.policy.timeout, call).await else {
            exn::bail!(ErrorKind::Timeout);
        };
        let translations = result?;
        if translations.len() != texts.len() {
            exn::bail!(ErrorKind::CountMismatch {
                expected: texts.len(),
                actual: translations.len(),
            });
        }
        Ok(translations)
    }
}

#[async_trait]
impl TranslationBackend for RetryingBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn translate(&self, texts: &[String], source_lang: &str, target_lang: &str) -> Result<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut retry = 0;
        loop {
            let err = match self.attempt(texts, source_lang, target_lang).await {
                Ok(translations) => return Ok(translations),
                Err(err) => err,
            };
            if !err.is_retryable() {
                return Err(err);
            }
            if retry >= self.policy.max_retries {
                tracing::warn!(
                    backend = self.name(),
                    attempts = retry + 1,
                    error = %*err,
                    "Translation failed, giving up"
                );
                return Err(err.raise(ErrorKind::Exhausted(retry + 1)));
            }
            let delay = self.policy.delay(retry);
            tracing::debug!(
                backend = self.name(),
                retry = retry + 1,
                delay_ms = delay.as_millis() as u64,
                error = %*err,
                "Retrying translation"
            );
            tokio::time::sleep(delay).await;
            retry += 1;
        }
    }
}
