//! Summarisation client: prompt construction, backend call, retry.
//!
//! This module is intentionally thin. Prompt wording lives in
//! [`crate::prompts`], the retry schedule in [`crate::retry`], and the wire
//! details of each remote service in its backend. What stays here is the
//! [`SummaryBackend`] seam and the [`Summarizer`] that ties them together.
//!
//! ## Backends
//!
//! * [`crate::pipeline::gemini::GeminiBackend`]: Google Generative Language
//!   REST API with an explicit API key.
//! * [`ProviderBackend`]: any `edgequake-llm` provider (OpenAI, Anthropic,
//!   Gemini, Ollama, …).
//!
//! Tests plug in their own implementation to script failures.

use crate::config::{BackendKind, SummarizerConfig};
use crate::error::{RemoteError, RemoteErrorKind, SummarizeError};
use crate::pipeline::gemini::GeminiBackend;
use crate::progress::ProgressCallback;
use crate::prompts::{summary_prompt, truncate_chars};
use crate::retry::{Retried, RetryPolicy};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// One request to a summarisation backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRequest {
    pub prompt: String,
    pub temperature: f32,
    /// Always 1: a single response is requested.
    pub candidate_count: u32,
    /// Network timeout for this one call.
    pub timeout: Duration,
}

/// Raw text returned by a backend, unparsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryResponse {
    pub text: String,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl SummaryResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            input_tokens: None,
            output_tokens: None,
        }
    }
}

/// A remote text-generation service.
///
/// Implementations classify every failure into a [`RemoteErrorKind`]; they
/// never retry on their own.
#[async_trait]
pub trait SummaryBackend: Send + Sync {
    /// Short name for logs, e.g. `"gemini"`.
    fn name(&self) -> &str;

    async fn generate(&self, request: &SummaryRequest) -> Result<SummaryResponse, RemoteError>;
}

/// Sends truncated paper text to a backend under a [`RetryPolicy`].
pub struct Summarizer {
    backend: Arc<dyn SummaryBackend>,
    retry: RetryPolicy,
    temperature: f32,
    max_input_chars: usize,
    request_timeout: Duration,
    progress: Option<ProgressCallback>,
}

impl Summarizer {
    /// Build a client around an existing backend.
    pub fn new(backend: Arc<dyn SummaryBackend>, config: &SummarizerConfig) -> Self {
        Self {
            backend,
            retry: config.retry.clone(),
            temperature: config.temperature,
            max_input_chars: config.max_input_chars,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            progress: config.progress_callback.clone(),
        }
    }

    /// Build a client with the backend `config` describes.
    pub fn from_config(config: &SummarizerConfig) -> Result<Self, SummarizeError> {
        let backend = resolve_backend(config)?;
        Ok(Self::new(backend, config))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    /// The request that would be sent for `text`.
    pub fn request_for(&self, text: &str) -> SummaryRequest {
        SummaryRequest {
            prompt: summary_prompt(text, self.max_input_chars),
            temperature: self.temperature,
            candidate_count: 1,
            timeout: self.request_timeout,
        }
    }

    /// Number of characters of `text` that will reach the model.
    pub fn submitted_chars(&self, text: &str) -> usize {
        truncate_chars(text, self.max_input_chars).chars().count()
    }

    /// Ask the backend for a summary of `text`.
    ///
    /// Returns the raw response; [`crate::pipeline::parse`] turns it into a
    /// record.
    pub async fn summarize(&self, text: &str) -> Result<Retried<SummaryResponse>, SummarizeError> {
        let request = self.request_for(text);
        info!(
            "Requesting summary from {} ({} of {} chars)",
            self.backend.name(),
            self.submitted_chars(text),
            text.chars().count()
        );

        let progress = self.progress.clone();
        let result = self
            .retry
            .run(
                |attempt| {
                    debug!("{}: attempt {}", self.backend.name(), attempt);
                    self.backend.generate(&request)
                },
                |event| {
                    if let Some(ref cb) = progress {
                        cb.on_retry(event.attempt, event.delay, &event.error.to_string());
                    }
                },
            )
            .await?;

        debug!(
            "{}: {} chars after {} attempt(s), {:?} in / {:?} out tokens",
            self.backend.name(),
            result.value.text.len(),
            result.attempts,
            result.value.input_tokens,
            result.value.output_tokens
        );
        Ok(result)
    }
}

// ── edgequake-llm provider backend ───────────────────────────────────────

/// Adapter from an `edgequake-llm` [`LLMProvider`] to [`SummaryBackend`].
pub struct ProviderBackend {
    name: String,
    provider: Arc<dyn LLMProvider>,
}

impl ProviderBackend {
    pub fn new(name: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            name: name.into(),
            provider,
        }
    }
}

#[async_trait]
impl SummaryBackend for ProviderBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &SummaryRequest) -> Result<SummaryResponse, RemoteError> {
        let messages = vec![ChatMessage::user(request.prompt.as_str())];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            ..Default::default()
        };

        let response = match tokio::time::timeout(
            request.timeout,
            self.provider.chat(&messages, Some(&options)),
        )
        .await
        {
            Err(_) => {
                return Err(RemoteError::deadline_exceeded(format!(
                    "no response within {}s",
                    request.timeout.as_secs()
                )))
            }
            Ok(Err(e)) => return Err(classify_error_message(&e.to_string())),
            Ok(Ok(response)) => response,
        };

        if response.content.trim().is_empty() {
            return Err(RemoteError::permanent("model returned an empty response"));
        }

        Ok(SummaryResponse {
            text: response.content,
            input_tokens: Some(response.prompt_tokens as u64),
            output_tokens: Some(response.completion_tokens as u64),
        })
    }
}

/// Classify a provider error from its message.
///
/// `edgequake-llm` flattens transport, HTTP, and API errors into one type,
/// so the message is the only portable signal.
pub fn classify_error_message(message: &str) -> RemoteError {
    let lower = message.to_lowercase();
    let kind = if ["timeout", "timed out", "deadline"]
        .iter()
        .any(|p| lower.contains(p))
    {
        RemoteErrorKind::DeadlineExceeded
    } else if has_status_code(&lower, &["429", "500", "502", "503"])
        || ["rate limit", "overloaded", "unavailable", "connection"]
            .iter()
            .any(|p| lower.contains(p))
    {
        RemoteErrorKind::Transient
    } else {
        RemoteErrorKind::Permanent
    };
    RemoteError::new(kind, message)
}

/// Whether one of `codes` appears as a standalone number in `message`,
/// e.g. `HTTP 503` or `status: 429`, but not `5000 tokens`.
fn has_status_code(message: &str, codes: &[&str]) -> bool {
    message
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|token| codes.contains(&token))
}

// ── Backend resolution ───────────────────────────────────────────────────

/// Resolve the backend, from most-specific to least-specific.
///
/// 1. **Pre-built backend** (`config.backend`): used as-is.
/// 2. **Gemini** (`BackendKind::Gemini`): needs `config.api_key`.
/// 3. **Provider** (`BackendKind::Provider`):
///    a. pre-built `config.provider`;
///    b. named provider + model through [`ProviderFactory::create_llm_provider`];
///    c. [`ProviderFactory::from_env`] auto-detection.
pub fn resolve_backend(config: &SummarizerConfig) -> Result<Arc<dyn SummaryBackend>, SummarizeError> {
    if let Some(ref backend) = config.backend {
        return Ok(Arc::clone(backend));
    }

    match config.backend_kind {
        BackendKind::Gemini => {
            let api_key = config
                .api_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| SummarizeError::ProviderNotConfigured {
                    provider: "gemini".to_string(),
                    hint: "No API key configured. Set GEMINI_API_KEY or pass --api-key.".to_string(),
                })?;
            let mut backend = GeminiBackend::new(api_key, config.model())?;
            if let Some(ref base) = config.api_base_url {
                backend = backend.with_base_url(base);
            }
            Ok(Arc::new(backend))
        }
        BackendKind::Provider => {
            let (name, provider) = resolve_provider(config)?;
            Ok(Arc::new(ProviderBackend::new(name, provider)))
        }
    }
}

fn resolve_provider(
    config: &SummarizerConfig,
) -> Result<(String, Arc<dyn LLMProvider>), SummarizeError> {
    if let Some(ref provider) = config.provider {
        let name = config
            .provider_name
            .clone()
            .unwrap_or_else(|| "custom".to_string());
        return Ok((name, Arc::clone(provider)));
    }

    if let Some(ref name) = config.provider_name {
        let model = config
            .model
            .as_deref()
            .unwrap_or_else(|| default_provider_model(name));
        let provider = ProviderFactory::create_llm_provider(name, model).map_err(|e| {
            SummarizeError::ProviderNotConfigured {
                provider: name.to_string(),
                hint: format!("{e}"),
            }
        })?;
        return Ok((name.clone(), provider));
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SummarizeError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(("auto".to_string(), llm_provider))
}

fn default_provider_model(provider_name: &str) -> &'static str {
    match provider_name {
        "gemini" => crate::pipeline::gemini::DEFAULT_GEMINI_MODEL,
        _ => "gpt-4.1-nano",
    }
}
