//! Progress-callback trait for pipeline stage events.
//!
//! Inject an [`Arc<dyn SummaryProgressCallback>`] via
//! [`crate::config::SummarizerConfigBuilder::progress_callback`] to receive
//! events as a run moves through its stages. The CLI uses this to drive its
//! busy spinner; other front-ends can forward events wherever they like
//! without the library knowing how the host application communicates.
//!
//! # Example
//!
//! ```rust
//! use paper2csv::{Stage, SummaryProgressCallback, SummarizerConfig};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl SummaryProgressCallback for Printer {
//!     fn on_stage_start(&self, stage: Stage) {
//!         eprintln!("{stage}…");
//!     }
//! }
//!
//! let config = SummarizerConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn SummaryProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Pipeline stages, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Reading the local file or downloading the URL.
    Loading,
    /// Extracting page text with pdfium.
    Extracting,
    /// Waiting on the summarisation backend (including retries).
    Summarizing,
    /// Splitting the response into sections.
    Parsing,
    /// Writing the CSV file.
    Writing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Loading => "Loading PDF",
            Stage::Extracting => "Extracting text",
            Stage::Summarizing => "Generating summary",
            Stage::Parsing => "Parsing summary",
            Stage::Writing => "Saving CSV",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as it moves through each [`Stage`].
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Implementations must be `Send + Sync` because the
/// extraction stage runs on Tokio's blocking pool.
pub trait SummaryProgressCallback: Send + Sync {
    /// Called when a stage begins.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes successfully.
    fn on_stage_complete(&self, stage: Stage, elapsed: Duration) {
        let _ = (stage, elapsed);
    }

    /// Called before the client sleeps ahead of another attempt.
    ///
    /// # Arguments
    /// * `attempt`: the attempt that just failed (1-indexed)
    /// * `delay`  : wait before the next attempt
    /// * `error`  : human-readable description of the failure
    fn on_retry(&self, attempt: u32, delay: Duration, error: &str) {
        let _ = (attempt, delay, error);
    }

    /// Called once when a stage fails and the run stops.
    fn on_failure(&self, stage: Stage, error: &str) {
        let _ = (stage, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SummaryProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SummarizerConfig`].
pub type ProgressCallback = Arc<dyn SummaryProgressCallback>;
