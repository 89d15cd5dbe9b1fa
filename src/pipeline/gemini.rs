//! Google Generative Language REST backend.
//!
//! One `models/{model}:generateContent` call per attempt, authenticated with
//! the `x-goog-api-key` header. HTTP and transport failures are mapped onto
//! [`RemoteErrorKind`] here so the retry policy never sees reqwest types.
//!
//! | Failure                                     | Kind               |
//! |---------------------------------------------|--------------------|
//! | client timeout, HTTP 504, `DEADLINE_EXCEEDED` | `DeadlineExceeded` |
//! | HTTP 429 / 500 / 502 / 503, connect errors  | `Transient`        |
//! | anything else, blocked or empty responses   | `Permanent`        |

use crate::error::{RemoteError, RemoteErrorKind, SummarizeError};
use crate::pipeline::llm::{SummaryBackend, SummaryRequest, SummaryResponse};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-pro-001";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Longest slice of an error body echoed back in a [`RemoteError`].
const MAX_ERROR_BODY: usize = 300;

pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, SummarizeError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SummarizeError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl SummaryBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &SummaryRequest) -> Result<SummaryResponse, RemoteError> {
        let body = GenerateContentRequest::new(request);
        debug!("POST {} ({} prompt bytes)", self.endpoint(), request.prompt.len());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let text = response.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), &text));
        }
        parse_generate_response(&text)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(request: &'a SummaryRequest) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![Part {
                    text: &request.prompt,
                }],
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                candidate_count: request.candidate_count,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    candidate_count: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

// ── Classification ───────────────────────────────────────────────────────

/// Map a non-2xx response onto a [`RemoteError`].
pub(crate) fn classify_status(code: u16, body: &str) -> RemoteError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let status = parsed.as_ref().and_then(|e| e.error.status.as_deref());
    let message = parsed
        .as_ref()
        .and_then(|e| e.error.message.clone())
        .unwrap_or_else(|| body.trim().chars().take(MAX_ERROR_BODY).collect());

    let kind = if code == 504 || status == Some("DEADLINE_EXCEEDED") {
        RemoteErrorKind::DeadlineExceeded
    } else if matches!(code, 429 | 500 | 502 | 503) {
        RemoteErrorKind::Transient
    } else {
        RemoteErrorKind::Permanent
    };
    RemoteError::new(kind, format!("HTTP {code}: {message}"))
}

fn classify_transport(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::deadline_exceeded(e.to_string())
    } else if e.is_connect() {
        RemoteError::transient(e.to_string())
    } else {
        RemoteError::permanent(e.to_string())
    }
}

/// Pull the first candidate's text and token counts out of a 2xx body.
pub(crate) fn parse_generate_response(body: &str) -> Result<SummaryResponse, RemoteError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| RemoteError::permanent(format!("unreadable response: {e}")))?;

    let Some(candidate) = parsed.candidates.first() else {
        let reason = parsed
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map(|r| format!("prompt blocked: {r}"))
            .unwrap_or_else(|| "response contained no candidates".to_string());
        return Err(RemoteError::permanent(reason));
    };

    let text: String = candidate
        .content
        .iter()
        .flat_map(|c| c.parts.iter())
        .filter_map(|p| p.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        return Err(RemoteError::permanent(format!(
            "empty response (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    let usage = parsed.usage_metadata;
    Ok(SummaryResponse {
        text,
        input_tokens: usage.as_ref().and_then(|u| u.prompt_token_count),
        output_tokens: usage.as_ref().and_then(|u| u.candidates_token_count),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn request() -> SummaryRequest {
        SummaryRequest {
            prompt: "Summarize this.".into(),
            temperature: 0.1,
            candidate_count: 1,
            timeout: Duration::from_secs(300),
        }
    }

    #[test]
    fn request_body_shape() {
        let req = request();
        let json = serde_json::to_value(GenerateContentRequest::new(&req)).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "Summarize this.");
        assert_eq!(json["generationConfig"]["candidateCount"], 1);
        let t = json["generationConfig"]["temperature"].as_f64().unwrap();
        assert!((t - 0.1).abs() < 1e-6);
    }

    #[test]
    fn endpoint_joins_model() {
        let backend = GeminiBackend::new("k", "gemini-1.5-pro-001")
            .unwrap()
            .with_base_url("http://localhost:9999/v1beta/");
        assert_eq!(
            backend.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-1.5-pro-001:generateContent"
        );
    }

    #[test]
    fn debug_hides_key() {
        let backend = GeminiBackend::new("AIza-secret", DEFAULT_GEMINI_MODEL).unwrap();
        assert!(!format!("{backend:?}").contains("AIza-secret"));
    }

    #[test]
    fn gateway_timeout_is_deadline_exceeded() {
        assert_eq!(classify_status(504, "").kind, RemoteErrorKind::DeadlineExceeded);
    }

    #[test]
    fn deadline_status_in_body_wins_over_code() {
        let body = r#"{"error":{"code":500,"message":"Deadline expired","status":"DEADLINE_EXCEEDED"}}"#;
        let err = classify_status(500, body);
        assert_eq!(err.kind, RemoteErrorKind::DeadlineExceeded);
        assert!(err.message.contains("Deadline expired"));
    }

    #[test]
    fn rate_limit_and_overload_are_transient() {
        assert_eq!(classify_status(429, "slow down").kind, RemoteErrorKind::Transient);
        assert_eq!(classify_status(503, "").kind, RemoteErrorKind::Transient);
    }

    #[test]
    fn auth_failures_are_permanent() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        let err = classify_status(400, body);
        assert_eq!(err.kind, RemoteErrorKind::Permanent);
        assert_eq!(err.message, "HTTP 400: API key not valid.");
        assert_eq!(classify_status(403, "forbidden").kind, RemoteErrorKind::Permanent);
    }

    #[test]
    fn parses_text_and_usage() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Objectives: A\n"}, {"text": "Methods: B"}]},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 4100, "candidatesTokenCount": 120, "totalTokenCount": 4220}
        }"#;
        let resp = parse_generate_response(body).unwrap();
        assert_eq!(resp.text, "Objectives: A\nMethods: B");
        assert_eq!(resp.input_tokens, Some(4100));
        assert_eq!(resp.output_tokens, Some(120));
    }

    #[test]
    fn blocked_prompt_is_permanent() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let err = parse_generate_response(body).unwrap_err();
        assert_eq!(err.kind, RemoteErrorKind::Permanent);
        assert!(err.message.contains("SAFETY"));
    }

    #[test]
    fn empty_candidate_is_permanent() {
        let body = r#"{"candidates": [{"content": {"parts": []}, "finishReason": "MAX_TOKENS"}]}"#;
        let err = parse_generate_response(body).unwrap_err();
        assert!(err.message.contains("MAX_TOKENS"));
    }
}
