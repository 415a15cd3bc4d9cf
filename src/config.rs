//! Configuration types for image text extraction.
//!
//! Every knob of a run lives in [`ExtractionConfig`], built through
//! [`ExtractionConfigBuilder`]. The credential and the instruction text are
//! explicit named fields; nothing in the library reads the environment except
//! [`crate::extract::resolve_extractor`] when no credential was supplied.

use crate::error::Img2TextError;
use crate::pipeline::service::TextExtractor;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_INSTRUCTION;
use std::fmt;
use std::sync::Arc;

/// Provider used when none is named.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Gemini model used when none is named.
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Public Generative Language API endpoint.
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Configuration for an extraction run (batch or single image).
///
/// # Example
/// ```rust
/// use edgequake_img2text::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .api_key("AIza-test")
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// assert_eq!(config.model.as_deref(), Some("gemini-2.5-flash"));
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Provider name: `"gemini"` (default, direct REST client) or any
    /// edgequake-llm provider (`"openai"`, `"anthropic"`, `"ollama"`, …).
    pub provider_name: Option<String>,

    /// Model identifier. If None, uses [`DEFAULT_GEMINI_MODEL`] for Gemini and
    /// the provider default otherwise.
    pub model: Option<String>,

    /// API credential for the Gemini extractor. If None, falls back to
    /// `GOOGLE_API_KEY` / `GEMINI_API_KEY` at resolution time.
    pub api_key: Option<String>,

    /// Pre-constructed extractor. Takes precedence over `provider_name`.
    pub extractor: Option<Arc<dyn TextExtractor>>,

    /// Instruction sent with every image. Default: [`DEFAULT_INSTRUCTION`].
    pub instruction_text: String,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Transcription wants the model to be literal, not creative.
    pub temperature: f32,

    /// Maximum tokens the model may generate per image. Default: 8192.
    pub max_tokens: usize,

    /// Per-call timeout in seconds. Default: None (wait for the service).
    pub api_timeout_secs: Option<u64>,

    /// Base URL of the Generative Language API. Default: [`DEFAULT_GEMINI_BASE_URL`].
    pub gemini_base_url: String,

    /// Optional per-item progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            provider_name: None,
            model: None,
            api_key: None,
            extractor: None,
            instruction_text: DEFAULT_INSTRUCTION.to_string(),
            temperature: 0.1,
            max_tokens: 8192,
            api_timeout_secs: None,
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("provider_name", &self.provider_name)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn TextExtractor>"))
            .field("instruction_text", &self.instruction_text)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("gemini_base_url", &self.gemini_base_url)
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

    /// Provider name with the default applied.
    pub fn provider(&self) -> &str {
        self.provider_name.as_deref().unwrap_or(DEFAULT_PROVIDER)
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
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn instruction_text(mut self, text: impl Into<String>) -> Self {
        self.config.instruction_text = text.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn gemini_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.gemini_base_url = url.into();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, Img2TextError> {
        let c = &self.config;
        if c.instruction_text.trim().is_empty() {
            return Err(Img2TextError::InvalidConfig(
                "instruction text must not be empty".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(Img2TextError::InvalidConfig(
                "max tokens must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(Img2TextError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if !(c.gemini_base_url.starts_with("http://") || c.gemini_base_url.starts_with("https://"))
        {
            return Err(Img2TextError::InvalidConfig(format!(
                "Gemini base URL must be http(s), got '{}'",
                c.gemini_base_url
            )));
        }
        Ok(self.config)
    }
}
