use crate::detect::{AUTO, detect};
use std::sync::OnceLock;

/// The run-wide source language, resolved at most once.
///
/// When the configured source is concrete the slot starts out resolved and
/// never changes. When it is `auto`, detections are fed in opportunistically
/// through [`observe`](Self::observe) and the first one that yields a code
/// other than `auto` or `en` wins. Every later observation is a no-op.
///
/// English is never allowed to lock the slot: short Latin fragments such as
/// navigation labels appear in nearly every book regardless of its language.
///
/// The resolved value lives in a [`OnceLock`], so readers get an atomic
/// snapshot and can never see a half-applied transition.
#[derive(Debug)]
pub struct SourceLanguage {
    configured: String,
    resolved: OnceLock<String>,
}

impl SourceLanguage {
    pub fn new(configured: impl Into<String>) -> Self {
        let configured = configured.into();
        let resolved = OnceLock::new();
        if configured != AUTO {
            // Freshly created, cannot already be set.
            let _ = resolved.set(configured.clone());
        }
        Self { configured, resolved }
    }

    /// The language the user asked for, possibly `auto`.
    pub fn configured(&self) -> &str {
        &self.configured
    }

    /// Returns `true` if detection was requested for this run.
    pub fn is_auto(&self) -> bool {
        self.configured == AUTO
    }

    /// Returns `true` once the slot holds a concrete language.
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// The current effective language: the resolved code, or `auto`.
    pub fn current(&self) -> &str {
        self.resolved.get().map(String::as_str).unwrap_or(AUTO)
    }

    /// Run detection over a batch of texts and lock the slot if the result is
    /// decisive.
    ///
    /// Returns the code that was locked by *this* call, if any.
    pub fn observe<S: AsRef<str>>(&self, texts: &[S]) -> Option<&str> {
        if self.is_resolved() {
            return None;
        }
        let sample = texts
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        self.observe_sample(&sample)
    }

    /// Same as [`observe`](Self::observe), for text that is already joined.
    pub fn observe_sample(&self, sample: &str) -> Option<&str> {
        if self.is_resolved() || sample.is_empty() {
            return None;
        }
        let detected = detect(sample);
        if detected == AUTO || detected == "en" {
            return None;
        }
        match self.resolved.set(detected.to_string()) {
            Ok(()) => {
                tracing::info!(lang = detected, "Locked effective source language");
                self.resolved.get().map(String::as_str)
            },
            // Another worker won the race.
            Err(_) => None,
        }
    }
}
