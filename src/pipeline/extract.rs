//! Document loader: pull plain text out of every page via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! `pdfium-render` wraps the pdfium C++ library, which keeps thread-local
//! state and is not safe to drive from async contexts. All pdfium work runs
//! on the blocking pool so Tokio worker threads never stall on a large PDF.
//!
//! Page joining is separated from pdfium behind [`PageTextSource`] so the
//! ordering and separator rules can be tested without a native library.

use crate::error::SummarizeError;
use crate::output::DocumentInfo;
use crate::pipeline::input::UploadedDocument;
use crate::prompts::truncate_chars;
use pdfium_render::prelude::*;
use std::fmt::Debug;
use tracing::{debug, info, warn};

/// Text extracted from a whole document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Each page's text followed by a single `\n`, in page order.
    pub text: String,
    pub page_count: usize,
    /// Pages whose text was empty or whitespace only.
    pub empty_pages: usize,
}

impl ExtractedText {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Anything that can hand out per-page text in document order.
pub trait PageTextSource {
    type Error: Debug;

    fn page_count(&self) -> usize;

    /// Best-effort text of the page at 0-based `index`.
    fn page_text(&self, index: usize) -> Result<String, Self::Error>;
}

impl PageTextSource for PdfPages<'_> {
    type Error = PdfiumError;

    fn page_count(&self) -> usize {
        self.len() as usize
    }

    fn page_text(&self, index: usize) -> Result<String, PdfiumError> {
        let page = self.get(index as u16)?;
        let text = page.text()?;
        Ok(text.all())
    }
}

/// Concatenate every page's text, each followed by one newline.
///
/// Fails with [`SummarizeError::NoExtractableText`] when no page has any
/// non-whitespace text.
pub fn join_pages<S: PageTextSource>(name: &str, source: &S) -> Result<ExtractedText, SummarizeError> {
    let page_count = source.page_count();
    let mut text = String::new();
    let mut empty_pages = 0;

    for index in 0..page_count {
        let page_text = source
            .page_text(index)
            .map_err(|e| SummarizeError::CorruptPdf {
                name: name.to_string(),
                detail: format!("page {}: {:?}", index + 1, e),
            })?;

        if page_text.trim().is_empty() {
            empty_pages += 1;
        }
        text.push_str(&page_text);
        text.push('\n');
    }

    if empty_pages == page_count {
        return Err(SummarizeError::NoExtractableText {
            name: name.to_string(),
            pages: page_count,
        });
    }
    if empty_pages > 0 {
        warn!("{} of {} pages yielded no text", empty_pages, page_count);
    }

    Ok(ExtractedText {
        text,
        page_count,
        empty_pages,
    })
}

/// Shorten extracted text for display: the first `max_chars` characters then `...`.
pub fn preview(text: &str, max_chars: usize) -> String {
    format!("{}...", truncate_chars(text, max_chars))
}

/// Extract the text of every page of `doc`.
pub async fn extract_text(
    doc: &UploadedDocument,
    password: Option<&str>,
) -> Result<ExtractedText, SummarizeError> {
    let name = doc.file_name.clone();
    let bytes = doc.bytes.clone();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || -> Result<ExtractedText, SummarizeError> {
        let pdfium = bind_pdfium()?;
        let document = load_document(&pdfium, &name, &bytes, password.as_deref())?;
        let pages = document.pages();
        info!("PDF loaded: {} pages", pages.len());

        let extracted = join_pages(&name, pages)?;
        debug!(
            "Extracted {} chars from {} pages",
            extracted.char_count(),
            extracted.page_count
        );
        Ok(extracted)
    })
    .await
    .map_err(|e| SummarizeError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Read page count and standard metadata without extracting any text.
pub async fn read_info(
    doc: &UploadedDocument,
    password: Option<&str>,
) -> Result<DocumentInfo, SummarizeError> {
    let name = doc.file_name.clone();
    let bytes = doc.bytes.clone();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || -> Result<DocumentInfo, SummarizeError> {
        let pdfium = bind_pdfium()?;
        let document = load_document(&pdfium, &name, &bytes, password.as_deref())?;
        let metadata = document.metadata();

        let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
            metadata.get(tag).and_then(|t| {
                let v = t.value().to_string();
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            })
        };

        Ok(DocumentInfo {
            file_name: name.clone(),
            page_count: document.pages().len() as usize,
            title: get_meta(PdfDocumentMetadataTagType::Title),
            author: get_meta(PdfDocumentMetadataTagType::Author),
            subject: get_meta(PdfDocumentMetadataTagType::Subject),
            creator: get_meta(PdfDocumentMetadataTagType::Creator),
            producer: get_meta(PdfDocumentMetadataTagType::Producer),
            creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
            modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
            pdf_version: format!("{:?}", document.version()),
        })
    })
    .await
    .map_err(|e| SummarizeError::Internal(format!("Metadata task panicked: {}", e)))?
}

fn bind_pdfium() -> Result<Pdfium, SummarizeError> {
    pdfium_auto::bind_pdfium_silent().map_err(|e| SummarizeError::PdfiumBindingFailed(e.to_string()))
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    name: &str,
    bytes: &'a [u8],
    password: Option<&str>,
) -> Result<PdfDocument<'a>, SummarizeError> {
    pdfium.load_pdf_from_byte_slice(bytes, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                SummarizeError::WrongPassword {
                    name: name.to_string(),
                }
            } else {
                SummarizeError::PasswordRequired {
                    name: name.to_string(),
                }
            }
        } else {
            SummarizeError::CorruptPdf {
                name: name.to_string(),
                detail: err_str,
            }
        }
    })
}
