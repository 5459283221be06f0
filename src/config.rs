//! Configuration types for author extraction.
//!
//! All run behaviour is controlled through [`ExtractionConfig`], built via its
//! [`ExtractionConfigBuilder`]. The builder lets callers set only what they
//! care about and rely on documented defaults for the rest.

use crate::error::ExtractError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Model used against an OpenAI-compatible `base_url` when none is given.
pub const DEFAULT_MODEL: &str = "Llama-4-Maverick-17B-128E-Instruct";

/// Configuration for an author-extraction run.
///
/// # Example
/// ```rust
/// use edgequake_authors::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .zoom(3.0)
///     .base_url("https://api.sambanova.ai/v1")
///     .api_key("sk-test")
///     .build()
///     .unwrap();
/// assert_eq!(config.zoom, 3.0);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Magnification applied when rasterising the first page. Range: 0.5–8.0. Default: 2.0.
    ///
    /// At 2× a letter-size page is roughly 1224 × 1584 px, enough for the
    /// superscript daggers and asterisks that drive role assignment. Raise it
    /// for tiny affiliation footnotes; lower it when payload size matters.
    pub zoom: f32,

    /// Sampling temperature for the model call. Default: 0.1.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: provider default.
    pub max_tokens: Option<usize>,

    /// Model identifier. If None, [`DEFAULT_MODEL`] for `base_url` endpoints,
    /// or the provider default otherwise.
    pub model: Option<String>,

    /// Base URL of an OpenAI-compatible chat-completions API
    /// (e.g. `https://api.sambanova.ai/v1`).
    pub base_url: Option<String>,

    /// Bearer credential for `base_url`.
    pub api_key: Option<String>,

    /// `edgequake_llm` provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over everything else.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Custom extraction prompt. If None, uses [`crate::prompts::AUTHOR_EXTRACTION_PROMPT`].
    pub prompt: Option<String>,

    /// Pause between two files, in milliseconds. Default: 0.
    pub inter_file_delay_ms: u64,

    /// Explicit path to the pdfium shared library. If None, `PDFIUM_LIB_PATH`,
    /// the working directory and the system library are tried in that order.
    pub pdfium_library_path: Option<PathBuf>,

    /// Optional per-file progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            zoom: 2.0,
            temperature: 0.1,
            max_tokens: None,
            model: None,
            base_url: None,
            api_key: None,
            provider_name: None,
            provider: None,
            api_timeout_secs: 60,
            prompt: None,
            inter_file_delay_ms: 0,
            pdfium_library_path: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("zoom", &self.zoom)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("prompt", &self.prompt.as_ref().map(|p| p.len()))
            .field("inter_file_delay_ms", &self.inter_file_delay_ms)
            .field("pdfium_library_path", &self.pdfium_library_path)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl fmt::Debug for ExtractionConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl ExtractionConfigBuilder {
    pub fn zoom(mut self, zoom: f32) -> Self {
        self.config.zoom = zoom;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn inter_file_delay_ms(mut self, ms: u64) -> Self {
        self.config.inter_file_delay_ms = ms;
        self
    }

    pub fn pdfium_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library_path = Some(path.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractError> {
        let c = &self.config;
        if !(0.5..=8.0).contains(&c.zoom) {
            return Err(ExtractError::InvalidConfig(format!(
                "zoom must be 0.5–8.0, got {}",
                c.zoom
            )));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(ref url) = c.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ExtractError::InvalidConfig(format!(
                    "base URL must start with http:// or https://, got '{url}'"
                )));
            }
        }
        if matches!(c.prompt.as_deref(), Some(p) if p.trim().is_empty()) {
            return Err(ExtractError::InvalidConfig("prompt must not be empty".into()));
        }
        Ok(self.config)
    }
}
