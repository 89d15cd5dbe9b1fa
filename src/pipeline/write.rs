//! Output writer: serialise one [`SummaryRecord`] to a single-row CSV file.
//!
//! Every run gets a fresh `summary_<uuid>.csv` name, so repeated runs in the
//! same directory never collide. Files are written to `<name>.tmp` first and
//! renamed into place, so a reader never sees a half-written CSV.
//!
//! Where the file lives is an explicit choice ([`OutputLocation`]). A
//! temporary location ties the file's lifetime to the returned
//! [`CsvArtifact`]: dropping the artifact removes it.

use crate::error::SummarizeError;
use crate::record::{Section, SummaryRecord};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};
use uuid::Uuid;

/// MIME type offered alongside the CSV download.
pub const CSV_MIME_TYPE: &str = "text/csv";

/// Where the generated CSV is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputLocation {
    /// Keep the file in this directory (created if missing).
    Directory(PathBuf),
    /// Write into a private temporary directory removed with the artifact.
    Temporary,
}

impl Default for OutputLocation {
    fn default() -> Self {
        OutputLocation::Directory(PathBuf::from("."))
    }
}

/// A CSV file produced by [`write_csv`].
#[derive(Debug)]
pub struct CsvArtifact {
    path: PathBuf,
    file_name: String,
    /// Held only for [`OutputLocation::Temporary`]; dropping it deletes the file.
    _temp_dir: Option<TempDir>,
}

/// The payload offered to the user for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl CsvArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name on disk, also used as the download name.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// `true` when the file is removed once this artifact is dropped.
    pub fn is_temporary(&self) -> bool {
        self._temp_dir.is_some()
    }

    /// Read the file back as a `text/csv` download.
    pub async fn download(&self) -> Result<Download, SummarizeError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| SummarizeError::OutputWriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        Ok(Download {
            file_name: self.file_name.clone(),
            mime_type: CSV_MIME_TYPE,
            bytes,
        })
    }
}

/// Generate a fresh `summary_<uuid-v4>.csv` file name.
pub fn output_file_name() -> String {
    format!("summary_{}.csv", Uuid::new_v4())
}

/// Render the header row and the single data row.
///
/// Unset sections become empty fields. Commas, quotes, and newlines inside
/// values are quoted by the CSV writer.
pub fn render_csv(record: &SummaryRecord) -> io::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(Section::ALL.map(Section::column))?;
    writer.write_record(record.row())?;
    writer.into_inner().map_err(|e| e.into_error())
}

/// Write `record` to a new CSV file at `location`.
pub async fn write_csv(
    record: &SummaryRecord,
    location: &OutputLocation,
) -> Result<CsvArtifact, SummarizeError> {
    let file_name = output_file_name();

    let (dir, temp_dir) = match location {
        OutputLocation::Directory(dir) => {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| SummarizeError::OutputWriteFailed {
                    path: dir.join(&file_name),
                    source: e,
                })?;
            (dir.clone(), None)
        }
        OutputLocation::Temporary => {
            let temp = TempDir::new().map_err(|e| SummarizeError::OutputWriteFailed {
                path: std::env::temp_dir().join(&file_name),
                source: e,
            })?;
            (temp.path().to_path_buf(), Some(temp))
        }
    };

    let path = dir.join(&file_name);
    let write_err = |e: io::Error| SummarizeError::OutputWriteFailed {
        path: path.clone(),
        source: e,
    };

    let bytes = render_csv(record).map_err(write_err)?;

    // Atomic write: write to temp, then rename
    let tmp_path = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp_path, &bytes).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    debug!("Wrote {} bytes of CSV", bytes.len());
    info!("Summary saved to {}", path.display());

    Ok(CsvArtifact {
        path,
        file_name,
        _temp_dir: temp_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_back(bytes: &[u8]) -> (Vec<String>, Vec<Vec<String>>) {
        let mut reader = csv::Reader::from_reader(bytes);
        let headers = reader
            .headers()
            .unwrap()
            .iter()
            .map(str::to_string)
            .collect();
        let rows = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect();
        (headers, rows)
    }

    #[test]
    fn header_is_fixed() {
        let bytes = render_csv(&SummaryRecord::default()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("Objectives,Methods,Key Findings\n"), "got: {text}");
    }

    #[test]
    fn embedded_commas_and_newlines_round_trip() {
        let mut record = SummaryRecord::default();
        record.set(Section::Objectives, "a,b");
        record.set(Section::Methods, "c");
        record.set(Section::KeyFindings, "d\ne");

        let bytes = render_csv(&record).unwrap();
        let (headers, rows) = read_back(&bytes);
        assert_eq!(headers, vec!["Objectives", "Methods", "Key Findings"]);
        assert_eq!(rows, vec![vec!["a,b".to_string(), "c".into(), "d\ne".into()]]);
    }

    #[test]
    fn missing_sections_are_empty_fields() {
        let mut record = SummaryRecord::default();
        record.set(Section::Objectives, "study X");

        let (_, rows) = read_back(&render_csv(&record).unwrap());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], vec!["study X".to_string(), String::new(), String::new()]);
    }

    #[test]
    fn file_names_are_unique() {
        let a = output_file_name();
        let b = output_file_name();
        assert_ne!(a, b);
        assert!(a.starts_with("summary_") && a.ends_with(".csv"));
    }

    #[tokio::test]
    async fn writes_into_directory_and_offers_download() {
        let dir = tempfile::tempdir().unwrap();
        let mut record = SummaryRecord::default();
        record.set(Section::Methods, "survey");

        let artifact = write_csv(&record, &OutputLocation::Directory(dir.path().join("out")))
            .await
            .unwrap();
        assert!(artifact.path().exists());
        assert!(!artifact.is_temporary());
        assert_eq!(artifact.path().parent(), Some(dir.path().join("out").as_path()));

        let download = artifact.download().await.unwrap();
        assert_eq!(download.mime_type, "text/csv");
        assert_eq!(download.file_name, artifact.file_name());
        let (_, rows) = read_back(&download.bytes);
        assert_eq!(rows[0][1], "survey");

        // No stray temp file left behind.
        let entries = std::fs::read_dir(dir.path().join("out")).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn temporary_output_is_removed_on_drop() {
        let artifact = write_csv(&SummaryRecord::default(), &OutputLocation::Temporary)
            .await
            .unwrap();
        let path = artifact.path().to_path_buf();
        assert!(artifact.is_temporary());
        assert!(path.exists());

        drop(artifact);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn unwritable_location_is_a_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = write_csv(
            &SummaryRecord::default(),
            &OutputLocation::Directory(blocker.join("nested")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::FailureKind::Write);
    }
}
