//! Result types returned by the summarisation entry points.

use crate::pipeline::parse::ParseReport;
use crate::pipeline::write::CsvArtifact;
use crate::record::SummaryRecord;
use serde::{Deserialize, Serialize};

/// Everything produced by one successful run.
#[derive(Debug)]
pub struct SummaryOutput {
    /// Name the PDF was uploaded under.
    pub source_name: String,
    /// Start of the extracted text, for display.
    pub preview: String,
    /// Model response exactly as received.
    pub raw_summary: String,
    pub record: SummaryRecord,
    pub report: ParseReport,
    /// The CSV on disk. Dropping a temporary artifact deletes the file.
    pub csv: CsvArtifact,
    pub stats: SummaryStats,
}

/// Serialisable view of a run, for `--json` output and logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    pub source_name: String,
    pub csv_path: String,
    pub csv_file_name: String,
    pub record: SummaryRecord,
    pub report: ParseReport,
    pub stats: SummaryStats,
}

impl SummaryOutput {
    pub fn to_report(&self) -> SummaryReport {
        SummaryReport {
            source_name: self.source_name.clone(),
            csv_path: self.csv.path().display().to_string(),
            csv_file_name: self.csv.file_name().to_string(),
            record: self.record.clone(),
            report: self.report.clone(),
            stats: self.stats.clone(),
        }
    }
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub page_count: usize,
    /// Characters of text extracted from the PDF.
    pub extracted_chars: usize,
    /// Characters of paper text actually sent to the model.
    pub submitted_chars: usize,
    /// `true` when the text was cut to fit the character budget.
    pub truncated: bool,
    /// Backend calls made, including the successful one.
    pub attempts: u32,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub extract_duration_ms: u64,
    pub llm_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// PDF metadata reported by [`crate::inspect`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub file_name: String,
    pub page_count: usize,
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub pdf_version: String,
}
