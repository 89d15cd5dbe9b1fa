//! Summary parsing: pull the three labelled sections out of model output.
//!
//! Matching is deliberately literal. After trimming, a line that starts with
//! `Objectives:`, `Methods:` or `Key Findings:` (case-sensitive, checked in
//! that order) opens that section and its remainder becomes the value. A
//! later line with the same prefix replaces the earlier value.
//!
//! What happens to the other lines depends on [`SectionMode`]. Either way
//! nothing here can fail: sections that never show up stay `None`, and the
//! [`ParseReport`] says what was missing, duplicated, or dropped.

use crate::record::{Section, SummaryRecord};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How lines that carry no section prefix are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SectionMode {
    /// Keep only the prefixed line; everything else is discarded. (default)
    #[default]
    FirstLine,
    /// Append non-blank lines to the most recently opened section.
    Continuation,
}

/// Diagnostics gathered while parsing one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseReport {
    /// Sections whose prefix never appeared.
    pub missing: Vec<Section>,
    /// Sections whose prefix appeared more than once (last one kept).
    pub duplicated: Vec<Section>,
    /// Continuation lines folded into a section value.
    pub continuation_lines: usize,
    /// Non-blank lines that ended up in no section.
    pub discarded_lines: usize,
}

/// Parse a model response into a [`SummaryRecord`].
pub fn parse_summary(response: &str, mode: SectionMode) -> (SummaryRecord, ParseReport) {
    let mut record = SummaryRecord::default();
    let mut report = ParseReport::default();
    let mut seen: Vec<Section> = Vec::new();
    let mut current: Option<Section> = None;

    for raw in response.lines() {
        let line = raw.trim();

        if let Some((section, rest)) = match_prefix(line) {
            if seen.contains(&section) {
                if !report.duplicated.contains(&section) {
                    report.duplicated.push(section);
                }
            } else {
                seen.push(section);
            }
            record.set(section, rest.trim());
            current = Some(section);
            continue;
        }

        if line.is_empty() {
            continue;
        }

        match (mode, current) {
            (SectionMode::Continuation, Some(section)) => {
                let value = record.slot_mut(section).get_or_insert_with(String::new);
                if !value.is_empty() {
                    value.push('\n');
                }
                value.push_str(line);
                report.continuation_lines += 1;
            }
            _ => report.discarded_lines += 1,
        }
    }

    report.missing = record.missing();

    if !report.missing.is_empty() {
        warn!("Summary is missing section(s): {}", join_sections(&report.missing));
    }
    if !report.duplicated.is_empty() {
        warn!(
            "Summary repeats section(s) {}; keeping the last occurrence",
            join_sections(&report.duplicated)
        );
    }
    debug!(
        "Parsed summary: {} continuation line(s), {} discarded line(s)",
        report.continuation_lines, report.discarded_lines
    );

    (record, report)
}

fn match_prefix(line: &str) -> Option<(Section, &str)> {
    Section::ALL
        .into_iter()
        .find_map(|s| line.strip_prefix(s.prefix()).map(|rest| (s, rest)))
}

fn join_sections(sections: &[Section]) -> String {
    sections
        .iter()
        .map(|s| s.column())
        .collect::<Vec<_>>()
        .join(", ")
}
