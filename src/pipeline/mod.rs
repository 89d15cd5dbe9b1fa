//! Pipeline stages for paper summarisation.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ llm ──▶ parse ──▶ write
//! (path/URL) (pdfium)  (retry)  (sections) (CSV)
//! ```
//!
//! 1. [`input`]  : read the local file or download the URL into memory
//! 2. [`extract`]: concatenate page text; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`llm`]    : truncate, prompt, and call a [`llm::SummaryBackend`]
//!    under the retry policy; [`gemini`] is the default backend
//! 4. [`parse`]  : split the response into Objectives / Methods / Key Findings
//! 5. [`write`]  : one-row CSV with a unique name, written atomically

pub mod extract;
pub mod gemini;
pub mod input;
pub mod llm;
pub mod parse;
pub mod write;
