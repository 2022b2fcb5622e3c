//! Layered configuration.
//!
//! Values are merged from, lowest priority first:
//! 1. compiled defaults,
//! 2. `config.{toml,yaml,json}` in the platform config directory,
//! 3. an explicitly given file,
//! 4. environment variables prefixed with `VERSO_` (nested keys use `__`,
//!    e.g. `VERSO_BACKEND__TIMEOUT_SECS=10`).

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use verso_lang::codes;

const ENV_PREFIX: &str = "VERSO_";

/// Typography for the stylesheet added to CJK-target books.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub font_size: String,
    pub line_height: String,
    /// `None` picks a default font stack for the target language.
    pub font_family: Option<String>,
    pub heading_font_family: Option<String>,
    pub paragraph_spacing: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_size: "0.95em".to_string(),
            line_height: "1.8".to_string(),
            font_family: None,
            heading_font_family: None,
            paragraph_spacing: "0.5em".to_string(),
        }
    }
}

/// Timeout and retry policy for translation backend calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 2,
            backoff_base_ms: 500,
            backoff_max_ms: 4000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the translation backend.
    pub service: String,
    /// Model name for LLM-based backends.
    pub model: Option<String>,
    pub source_lang: String,
    pub target_lang: String,
    /// Chapter worker count.
    pub threads: usize,
    /// Image worker count; defaults to `threads`.
    pub image_threads: Option<usize>,
    pub use_cache: bool,
    /// Defaults to the platform cache directory.
    pub cache_dir: Option<PathBuf>,
    /// Keep the original text above each translation.
    pub bilingual: bool,
    pub translate_images: bool,
    pub images_only: bool,
    pub resume: bool,
    pub confidence_threshold: f32,
    pub font_path: Option<PathBuf>,
    pub style: StyleConfig,
    pub backend: BackendConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: "google".to_string(),
            model: None,
            source_lang: "auto".to_string(),
            target_lang: "en".to_string(),
            threads: 4,
            image_threads: None,
            use_cache: true,
            cache_dir: None,
            bilingual: false,
            translate_images: true,
            images_only: false,
            resume: false,
            confidence_threshold: 0.3,
            font_path: None,
            style: StyleConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "verso")
}

/// Directory holding the user's `config.*` file, if the platform has one.
pub fn user_config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

impl Config {
    /// Build the provider stack without extracting it.
    pub fn figment(explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(dir) = user_config_dir() {
            figment = figment
                .merge(Toml::file(dir.join("config.toml")))
                .merge(Yaml::file(dir.join("config.yaml")))
                .merge(Json::file(dir.join("config.json")));
        }
        if let Some(path) = explicit {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
                Some("json") => figment.merge(Json::file_exact(path)),
                _ => figment.merge(Toml::file_exact(path)),
            };
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate the configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::from_figment(&Self::figment(explicit))
    }

    pub fn from_figment(figment: &Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Load)?;
        config.validate()
    }

    /// Check ranges and normalize language codes.
    pub fn validate(mut self) -> Result<Self> {
        self.source_lang = codes::validate(&self.source_lang).or_raise(|| ErrorKind::Invalid {
            field: "source_lang",
            reason: format!("'{}' is not a supported language", self.source_lang),
        })?;
        self.target_lang = codes::validate_target(&self.target_lang).or_raise(|| ErrorKind::Invalid {
            field: "target_lang",
            reason: format!("'{}' is not a supported target language", self.target_lang),
        })?;
        if self.threads == 0 {
            exn::bail!(ErrorKind::Invalid {
                field: "threads",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.image_threads == Some(0) {
            exn::bail!(ErrorKind::Invalid {
                field: "image_threads",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            exn::bail!(ErrorKind::Invalid {
                field: "confidence_threshold",
                reason: format!("{} is outside [0, 1]", self.confidence_threshold),
            });
        }
        if self.service.trim().is_empty() {
            exn::bail!(ErrorKind::Invalid {
                field: "service",
                reason: "must not be empty".to_string(),
            });
        }
        tracing::debug!(
            service = %self.service,
            source = %codes::label(&self.source_lang),
            target = %codes::label(&self.target_lang),
            threads = self.threads,
            "Loaded configuration"
        );
        Ok(self)
    }

    pub fn image_threads(&self) -> usize {
        self.image_threads.unwrap_or(self.threads)
    }

    /// Where the cache databases live: `cache_dir`, else the platform cache
    /// directory. `None` if neither is available.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.cache_dir().to_path_buf()))
    }
}
