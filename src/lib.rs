//! # paper2csv
//!
//! Summarise research papers (PDF) into a one-row CSV with an LLM.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     read local file or download from URL
//!  ├─ 2. Extract   page text via pdfium (spawn_blocking)
//!  ├─ 3. Summarise first 15 000 chars → Gemini / edgequake-llm, with retry
//!  ├─ 4. Parse     Objectives / Methods / Key Findings
//!  └─ 5. Write     summary_<uuid>.csv (atomic)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use paper2csv::{summarize, SummarizerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SummarizerConfig::builder()
//!         .api_key(std::env::var("GEMINI_API_KEY")?)
//!         .build()?;
//!     let output = summarize("paper.pdf", &config).await?;
//!     println!("{}", output.preview);
//!     println!("{}", output.raw_summary);
//!     eprintln!("CSV written to {}", output.csv.path().display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `paper2csv` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! paper2csv = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod retry;
pub mod summarize;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{BackendKind, SummarizerConfig, SummarizerConfigBuilder};
pub use error::{FailureKind, RemoteError, RemoteErrorKind, SummarizeError};
pub use output::{DocumentInfo, SummaryOutput, SummaryReport, SummaryStats};
pub use pipeline::extract::ExtractedText;
pub use pipeline::gemini::GeminiBackend;
pub use pipeline::input::UploadedDocument;
pub use pipeline::llm::{
    ProviderBackend, SummaryBackend, SummaryRequest, SummaryResponse, Summarizer,
};
pub use pipeline::parse::{parse_summary, ParseReport, SectionMode};
pub use pipeline::write::{CsvArtifact, Download, OutputLocation, CSV_MIME_TYPE};
pub use progress::{NoopProgressCallback, ProgressCallback, Stage, SummaryProgressCallback};
pub use record::{Section, SummaryRecord};
pub use retry::RetryPolicy;
pub use summarize::{
    inspect, summarize, summarize_bytes, summarize_document, summarize_sync, summarize_text,
    summarize_with,
};
