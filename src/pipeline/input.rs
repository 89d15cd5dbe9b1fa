//! Input resolution: turn a user-supplied path or URL into an in-memory
//! [`UploadedDocument`].
//!
//! pdfium can load straight from a byte slice, so unlike a file-based
//! pipeline nothing is staged on disk: local files are read, URLs are
//! downloaded, and both are checked for the `%PDF` magic bytes before any
//! parsing is attempted.

use crate::error::SummarizeError;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Raw bytes of one PDF plus the name it was uploaded under.
#[derive(Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for UploadedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedDocument")
            .field("file_name", &self.file_name)
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .finish()
    }
}

impl UploadedDocument {
    /// Wrap bytes received from elsewhere, validating the PDF magic.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, SummarizeError> {
        let file_name = file_name.into();
        check_magic(&file_name, &bytes)?;
        Ok(Self { file_name, bytes })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory PDF.
///
/// If the input is a URL, download it; otherwise read the local file.
pub async fn load_input(input: &str, timeout_secs: u64) -> Result<UploadedDocument, SummarizeError> {
    if input.trim().is_empty() {
        return Err(SummarizeError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        load_local(Path::new(input)).await
    }
}

/// Read a local file, validating existence, permissions, and PDF magic bytes.
async fn load_local(path: &Path) -> Result<UploadedDocument, SummarizeError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => SummarizeError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::NotFound => SummarizeError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => SummarizeError::CorruptPdf {
            name: path.display().to_string(),
            detail: e.to_string(),
        },
    })?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("Read local PDF: {} ({} bytes)", path.display(), bytes.len());
    UploadedDocument::new(file_name, bytes)
}

/// Download a URL into memory.
async fn download_url(url: &str, timeout_secs: u64) -> Result<UploadedDocument, SummarizeError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SummarizeError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            SummarizeError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SummarizeError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(SummarizeError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            SummarizeError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SummarizeError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    info!("Downloaded {} bytes", bytes.len());
    UploadedDocument::new(filename_from_url(url), bytes.to_vec())
}

/// Derive a file name from the last URL path segment.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

fn check_magic(name: &str, bytes: &[u8]) -> Result<(), SummarizeError> {
    if bytes.len() < 4 || &bytes[..4] != b"%PDF" {
        return Err(SummarizeError::NotAPdf {
            name: name.to_string(),
            magic: bytes.iter().take(4).copied().collect(),
        });
    }
    Ok(())
}
