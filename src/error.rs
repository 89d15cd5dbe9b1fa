//! Error types for the paper2csv library.
//!
//! Two layers of error exist because they are consumed at different places:
//!
//! * [`RemoteError`]: a single failed attempt against the summarisation
//!   backend. It carries a [`RemoteErrorKind`] so the retry loop can decide
//!   whether another attempt is allowed. It never leaves the client.
//!
//! * [`SummarizeError`]: **Fatal**: the run cannot produce a CSV. Returned
//!   as `Err(SummarizeError)` from the top-level `summarize*` functions and
//!   from each pipeline stage. Every variant belongs to exactly one
//!   [`FailureKind`], which is what front-ends show the user.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the paper2csv library.
#[derive(Debug, Error)]
pub enum SummarizeError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The bytes were read, but they are not a PDF.
    #[error("'{name}' is not a valid PDF\nFirst bytes: {magic:?}")]
    NotAPdf { name: String, magic: Vec<u8> },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' could not be parsed: {detail}")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// Every page came back empty; there is nothing to summarise.
    #[error("No extractable text in '{name}' ({pages} pages)\nScanned PDFs need OCR first.")]
    NoExtractableText { name: String, pages: usize },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDFium is normally downloaded automatically on first run.\n\
If the auto-download failed, set PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Remote errors ─────────────────────────────────────────────────────
    /// No summarisation backend could be built (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Deadline-exceeded failures kept happening until the retry budget ran out.
    #[error(
        "Summarisation timed out after {attempts} attempt(s) ({elapsed_ms}ms)\n\
Try again later or submit a shorter document."
    )]
    Timeout { attempts: u32, elapsed_ms: u64 },

    /// The backend failed with an error the retry policy does not cover.
    #[error("Summarisation failed ({kind}) after {attempts} attempt(s): {message}")]
    Remote {
        kind: RemoteErrorKind,
        attempts: u32,
        message: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output CSV file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SummarizeError {
    /// Which of the user-facing failure categories this error belongs to.
    pub fn kind(&self) -> FailureKind {
        match self {
            SummarizeError::FileNotFound { .. }
            | SummarizeError::PermissionDenied { .. }
            | SummarizeError::InvalidInput { .. }
            | SummarizeError::DownloadFailed { .. }
            | SummarizeError::DownloadTimeout { .. }
            | SummarizeError::NotAPdf { .. }
            | SummarizeError::CorruptPdf { .. }
            | SummarizeError::PasswordRequired { .. }
            | SummarizeError::WrongPassword { .. }
            | SummarizeError::NoExtractableText { .. }
            | SummarizeError::PdfiumBindingFailed(_) => FailureKind::Extraction,
            SummarizeError::Timeout { .. } => FailureKind::Timeout,
            SummarizeError::Remote { .. } | SummarizeError::ProviderNotConfigured { .. } => {
                FailureKind::Remote
            }
            SummarizeError::OutputWriteFailed { .. } => FailureKind::Write,
            SummarizeError::InvalidConfig(_) => FailureKind::Config,
            SummarizeError::Internal(_) => FailureKind::Internal,
        }
    }
}

/// Coarse failure category shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The PDF could not be read or yielded no text. No remote call was made.
    Extraction,
    /// The remote call kept exceeding its deadline.
    Timeout,
    /// The remote call failed for a reason that is not retried.
    Remote,
    /// The CSV could not be written; no download is available.
    Write,
    /// The configuration was rejected before anything ran.
    Config,
    /// Bug or runtime failure inside the library.
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Extraction => "extraction failure",
            FailureKind::Timeout => "timeout failure",
            FailureKind::Remote => "remote failure",
            FailureKind::Write => "write failure",
            FailureKind::Config => "configuration error",
            FailureKind::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// Classification of a single failed backend call.
///
/// The retry policy is keyed on this, not on any client library's error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteErrorKind {
    /// The call did not complete within its allotted time.
    DeadlineExceeded,
    /// Rate limiting, overloaded backend, dropped connection.
    Transient,
    /// Authentication, quota, malformed request, unusable response.
    Permanent,
}

impl fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RemoteErrorKind::DeadlineExceeded => "deadline exceeded",
            RemoteErrorKind::Transient => "transient",
            RemoteErrorKind::Permanent => "permanent",
        };
        f.write_str(s)
    }
}

/// One failed attempt against a [`crate::pipeline::llm::SummaryBackend`].
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn deadline_exceeded(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::DeadlineExceeded, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transient, message)
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Permanent, message)
    }
}
