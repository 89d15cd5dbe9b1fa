//! Summarisation entry points.
//!
//! A run is strictly sequential: load → extract → summarise → parse →
//! write. The first failing stage ends the run with its [`SummarizeError`];
//! a failure before the summarise step means no remote call was made, and a
//! failure before the write step means no CSV exists.

use crate::config::SummarizerConfig;
use crate::error::SummarizeError;
use crate::output::{DocumentInfo, SummaryOutput, SummaryStats};
use crate::pipeline::input::{self, UploadedDocument};
use crate::pipeline::llm::Summarizer;
use crate::pipeline::extract::{self, ExtractedText};
use crate::pipeline::{parse, write};
use crate::progress::Stage;
use crate::prompts::truncate_chars;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info};

/// Summarise a PDF file or URL into a one-row CSV.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input`: Local file path or HTTP/HTTPS URL to a PDF
/// * `config`: Summarisation configuration
///
/// # Errors
/// Returns `Err(SummarizeError)` when any stage fails; see
/// [`SummarizeError::kind`] for the user-facing category.
pub async fn summarize(
    input_str: impl AsRef<str>,
    config: &SummarizerConfig,
) -> Result<SummaryOutput, SummarizeError> {
    let input_str = input_str.as_ref();
    info!("Starting summary: {}", input_str);

    let doc = run_stage(
        config,
        Stage::Loading,
        input::load_input(input_str, config.download_timeout_secs),
    )
    .await?;
    summarize_document(doc, config).await
}

/// Summarise PDF bytes already held in memory, e.g. an upload.
///
/// `file_name` is only used for display and error messages.
pub async fn summarize_bytes(
    file_name: impl Into<String>,
    bytes: Vec<u8>,
    config: &SummarizerConfig,
) -> Result<SummaryOutput, SummarizeError> {
    let doc = UploadedDocument::new(file_name, bytes)?;
    summarize_document(doc, config).await
}

/// Summarise an [`UploadedDocument`] with the backend `config` describes.
///
/// The backend is resolved only once text has been extracted, so a missing
/// credential surfaces at the first remote call rather than up front.
pub async fn summarize_document(
    doc: UploadedDocument,
    config: &SummarizerConfig,
) -> Result<SummaryOutput, SummarizeError> {
    run_pipeline(doc, None, config).await
}

/// Run the pipeline on `doc` using an already-built [`Summarizer`].
///
/// Sampling, truncation, and retry settings come from `summarizer`; the
/// remaining fields of `config` (output, password, progress) still apply.
pub async fn summarize_with(
    doc: UploadedDocument,
    summarizer: &Summarizer,
    config: &SummarizerConfig,
) -> Result<SummaryOutput, SummarizeError> {
    run_pipeline(doc, Some(summarizer), config).await
}

async fn run_pipeline(
    doc: UploadedDocument,
    summarizer: Option<&Summarizer>,
    config: &SummarizerConfig,
) -> Result<SummaryOutput, SummarizeError> {
    let total_start = Instant::now();

    // ── Step 1: Extract text ─────────────────────────────────────────────
    let extract_start = Instant::now();
    let extracted = run_stage(
        config,
        Stage::Extracting,
        extract::extract_text(&doc, config.password.as_deref()),
    )
    .await?;
    let extract_duration_ms = extract_start.elapsed().as_millis() as u64;
    info!(
        "Extracted {} chars from {} pages in {}ms",
        extracted.char_count(),
        extracted.page_count,
        extract_duration_ms
    );

    let mut output = summarize_text(doc.file_name, extracted, summarizer, config).await?;
    output.stats.extract_duration_ms = extract_duration_ms;
    output.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
    Ok(output)
}

/// Run the remote, parse, and write stages on text that was already
/// extracted.
///
/// Uses `summarizer` when given, otherwise the backend `config` describes.
pub async fn summarize_text(
    source_name: impl Into<String>,
    extracted: ExtractedText,
    summarizer: Option<&Summarizer>,
    config: &SummarizerConfig,
) -> Result<SummaryOutput, SummarizeError> {
    let total_start = Instant::now();

    // ── Step 2: Request summary ──────────────────────────────────────────
    let llm_start = Instant::now();
    let response = run_stage(config, Stage::Summarizing, async {
        match summarizer {
            Some(s) => s.summarize(&extracted.text).await,
            None => {
                Summarizer::from_config(config)?
                    .summarize(&extracted.text)
                    .await
            }
        }
    })
    .await?;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    // ── Step 3: Parse sections ───────────────────────────────────────────
    let (record, report) = run_stage(config, Stage::Parsing, async {
        Ok(parse::parse_summary(&response.value.text, config.section_mode))
    })
    .await?;
    debug!("Parsed summary: {:?}", report);

    // ── Step 4: Write CSV ────────────────────────────────────────────────
    let csv = run_stage(
        config,
        Stage::Writing,
        write::write_csv(&record, &config.output),
    )
    .await?;

    let extracted_chars = extracted.char_count();
    let max_input_chars = summarizer.map_or(config.max_input_chars, Summarizer::max_input_chars);
    let stats = SummaryStats {
        page_count: extracted.page_count,
        extracted_chars,
        submitted_chars: truncate_chars(&extracted.text, max_input_chars)
            .chars()
            .count(),
        truncated: extracted_chars > max_input_chars,
        attempts: response.attempts,
        input_tokens: response.value.input_tokens,
        output_tokens: response.value.output_tokens,
        extract_duration_ms: 0,
        llm_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Summary complete: {} ({} attempt(s), {}ms total)",
        csv.file_name(),
        stats.attempts,
        stats.total_duration_ms
    );

    Ok(SummaryOutput {
        source_name: source_name.into(),
        preview: extract::preview(&extracted.text, config.preview_chars),
        raw_summary: response.value.text,
        record,
        report,
        csv,
        stats,
    })
}

/// Blocking wrapper around [`summarize`] for non-async callers.
pub fn summarize_sync(
    input_str: impl AsRef<str>,
    config: &SummarizerConfig,
) -> Result<SummaryOutput, SummarizeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| SummarizeError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(summarize(input_str, config))
}

/// Read PDF metadata without extracting text or calling a backend.
///
/// Does not require an API key.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &SummarizerConfig,
) -> Result<DocumentInfo, SummarizeError> {
    let doc = input::load_input(input_str.as_ref(), config.download_timeout_secs).await?;
    extract::read_info(&doc, config.password.as_deref()).await
}

/// Await one stage, reporting start, completion, and failure to the
/// configured progress callback.
async fn run_stage<T, Fut>(
    config: &SummarizerConfig,
    stage: Stage,
    fut: Fut,
) -> Result<T, SummarizeError>
where
    Fut: Future<Output = Result<T, SummarizeError>>,
{
    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_stage_start(stage);
    }
    let start = Instant::now();
    let result = fut.await;
    if let Some(cb) = cb {
        match &result {
            Ok(_) => cb.on_stage_complete(stage, start.elapsed()),
            Err(e) => cb.on_failure(stage, &e.to_string()),
        }
    }
    result
}
