//! The three-field summary record and its section keys.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three sections the model is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Section {
    Objectives,
    Methods,
    KeyFindings,
}

impl Section {
    /// All sections in column order, which is also prefix priority order.
    pub const ALL: [Section; 3] = [Section::Objectives, Section::Methods, Section::KeyFindings];

    /// Column header used in the CSV output.
    pub fn column(self) -> &'static str {
        match self {
            Section::Objectives => "Objectives",
            Section::Methods => "Methods",
            Section::KeyFindings => "Key Findings",
        }
    }

    /// Literal, case-sensitive line prefix in the model response.
    pub fn prefix(self) -> &'static str {
        match self {
            Section::Objectives => "Objectives:",
            Section::Methods => "Methods:",
            Section::KeyFindings => "Key Findings:",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Summary extracted from the model response. Any section may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    #[serde(rename = "Objectives")]
    pub objectives: Option<String>,
    #[serde(rename = "Methods")]
    pub methods: Option<String>,
    #[serde(rename = "Key Findings")]
    pub key_findings: Option<String>,
}

impl SummaryRecord {
    pub fn get(&self, section: Section) -> Option<&str> {
        match section {
            Section::Objectives => self.objectives.as_deref(),
            Section::Methods => self.methods.as_deref(),
            Section::KeyFindings => self.key_findings.as_deref(),
        }
    }

    /// Replace the value for `section`.
    pub fn set(&mut self, section: Section, value: impl Into<String>) {
        let slot = self.slot_mut(section);
        *slot = Some(value.into());
    }

    pub(crate) fn slot_mut(&mut self, section: Section) -> &mut Option<String> {
        match section {
            Section::Objectives => &mut self.objectives,
            Section::Methods => &mut self.methods,
            Section::KeyFindings => &mut self.key_findings,
        }
    }

    /// Values in column order, with unset sections as empty strings.
    pub fn row(&self) -> [&str; 3] {
        Section::ALL.map(|s| self.get(s).unwrap_or(""))
    }

    /// Sections that never appeared in the response.
    pub fn missing(&self) -> Vec<Section> {
        Section::ALL
            .into_iter()
            .filter(|s| self.get(*s).is_none())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_fills_missing_with_empty() {
        let mut record = SummaryRecord::default();
        record.set(Section::Methods, "survey");
        assert_eq!(record.row(), ["", "survey", ""]);
        assert_eq!(record.missing(), vec![Section::Objectives, Section::KeyFindings]);
        assert!(!record.is_complete());
    }

    #[test]
    fn columns_and_prefixes() {
        assert_eq!(Section::KeyFindings.column(), "Key Findings");
        assert_eq!(Section::KeyFindings.prefix(), "Key Findings:");
        assert_eq!(
            Section::ALL.map(Section::column),
            ["Objectives", "Methods", "Key Findings"]
        );
    }

    #[test]
    fn serializes_with_column_names() {
        let mut record = SummaryRecord::default();
        record.set(Section::KeyFindings, "it works");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Key Findings"], "it works");
        assert!(json["Objectives"].is_null());
    }
}
