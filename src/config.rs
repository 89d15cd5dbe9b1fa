//! Configuration types for paper summarisation.
//!
//! All behaviour is controlled through [`SummarizerConfig`], built via its
//! [`SummarizerConfigBuilder`]. Nothing in the library reads environment
//! variables on its own; front-ends resolve those and pass values in.

use crate::error::SummarizeError;
use crate::pipeline::gemini::DEFAULT_GEMINI_MODEL;
use crate::pipeline::llm::SummaryBackend;
use crate::pipeline::parse::SectionMode;
use crate::pipeline::write::OutputLocation;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_MAX_INPUT_CHARS;
use crate::retry::RetryPolicy;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Which remote service produces the summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// Google Generative Language REST API, keyed by [`SummarizerConfig::api_key`]. (default)
    #[default]
    Gemini,
    /// Any `edgequake-llm` provider, chosen by name or auto-detected.
    Provider,
}

/// Configuration for summarising one paper.
///
/// Built via [`SummarizerConfig::builder()`] or using
/// [`SummarizerConfig::default()`].
///
/// # Example
/// ```rust
/// use paper2csv::SummarizerConfig;
///
/// let config = SummarizerConfig::builder()
///     .api_key("my-key")
///     .model("gemini-1.5-pro-001")
///     .temperature(0.1)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct SummarizerConfig {
    /// Remote service to call. Default: [`BackendKind::Gemini`].
    pub backend_kind: BackendKind,

    /// Pre-constructed backend. Takes precedence over everything else.
    pub backend: Option<Arc<dyn SummaryBackend>>,

    /// Credential for the Gemini backend.
    pub api_key: Option<String>,

    /// Model identifier. If None, uses `gemini-1.5-pro-001`.
    pub model: Option<String>,

    /// Override of the Gemini REST base URL.
    pub api_base_url: Option<String>,

    /// `edgequake-llm` provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, uses `ProviderFactory::from_env()`.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Range: 0.0–2.0. Default: 0.1.
    pub temperature: f32,

    /// Characters of paper text sent to the model. Default: 15 000.
    pub max_input_chars: usize,

    /// Network timeout for a single backend call, in seconds. Default: 300.
    pub request_timeout_secs: u64,

    /// Retry schedule for failed backend calls.
    pub retry: RetryPolicy,

    /// How lines after a section marker are treated. Default: continuation.
    pub section_mode: SectionMode,

    /// Where the CSV is written. Default: the current directory.
    pub output: OutputLocation,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Characters of extracted text shown as a preview. Default: 1000.
    pub preview_chars: usize,

    /// Optional progress callback for stage events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            backend_kind: BackendKind::default(),
            backend: None,
            api_key: None,
            model: None,
            api_base_url: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
            request_timeout_secs: 300,
            retry: RetryPolicy::default(),
            section_mode: SectionMode::default(),
            output: OutputLocation::default(),
            password: None,
            download_timeout_secs: 120,
            preview_chars: 1000,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for SummarizerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SummarizerConfig")
            .field("backend_kind", &self.backend_kind)
            .field("backend", &self.backend.as_ref().map(|b| b.name().to_string()))
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("api_base_url", &self.api_base_url)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_input_chars", &self.max_input_chars)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("retry", &self.retry)
            .field("section_mode", &self.section_mode)
            .field("output", &self.output)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl SummarizerConfig {
    /// Create a new builder for `SummarizerConfig`.
    pub fn builder() -> SummarizerConfigBuilder {
        SummarizerConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model identifier in effect.
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL)
    }
}

/// Builder for [`SummarizerConfig`].
#[derive(Debug)]
pub struct SummarizerConfigBuilder {
    config: SummarizerConfig,
}

impl SummarizerConfigBuilder {
    pub fn backend_kind(mut self, kind: BackendKind) -> Self {
        self.config.backend_kind = kind;
        self
    }

    pub fn backend(mut self, backend: Arc<dyn SummaryBackend>) -> Self {
        self.config.backend = Some(backend);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = Some(url.into());
        self
    }

    /// Selecting a provider by name also switches to [`BackendKind::Provider`].
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self.config.backend_kind = BackendKind::Provider;
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self.config.backend_kind = BackendKind::Provider;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_input_chars(mut self, n: usize) -> Self {
        self.config.max_input_chars = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Shorthand for changing only the overall retry deadline.
    pub fn retry_deadline(mut self, deadline: Duration) -> Self {
        self.config.retry.deadline = deadline;
        self
    }

    pub fn section_mode(mut self, mode: SectionMode) -> Self {
        self.config.section_mode = mode;
        self
    }

    pub fn output(mut self, location: OutputLocation) -> Self {
        self.config.output = location;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output = OutputLocation::Directory(dir.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn preview_chars(mut self, n: usize) -> Self {
        self.config.preview_chars = n;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SummarizerConfig, SummarizeError> {
        let c = &self.config;
        if c.max_input_chars == 0 {
            return Err(SummarizeError::InvalidConfig(
                "max_input_chars must be ≥ 1".into(),
            ));
        }
        if c.request_timeout_secs == 0 {
            return Err(SummarizeError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if c.model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            return Err(SummarizeError::InvalidConfig("model name is empty".into()));
        }
        c.retry.validate()?;
        Ok(self.config)
    }
}
