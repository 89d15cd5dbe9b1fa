//! Prompt text for research-paper summarisation.
//!
//! Every prompt lives here so a wording change touches exactly one place,
//! and unit tests can inspect the exact text without calling a model.
//!
//! The requested layout is one `Label: value` line per section. The labels
//! must stay in sync with [`crate::record::Section::prefix`], which is what
//! the parser matches on.

use crate::record::Section;

/// Default maximum number of characters of paper text sent to the model.
pub const DEFAULT_MAX_INPUT_CHARS: usize = 15_000;

/// Instruction placed before the paper content.
pub const SUMMARY_INSTRUCTIONS: &str = "You are an expert researcher skilled in academic paper analysis. \
Given the following research paper content, provide a structured summary with the following \
sections: Objectives, Methods, and Key Findings. Format the response as a concise summary \
suitable for CSV output.";

/// Return at most the first `max_chars` characters of `text`.
///
/// Counts Unicode scalar values, never splits a code point, and never
/// allocates.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Build the full summarisation prompt for `text`, truncated to `max_chars`.
pub fn summary_prompt(text: &str, max_chars: usize) -> String {
    let content = truncate_chars(text, max_chars);

    let mut layout = String::new();
    for section in Section::ALL {
        layout.push_str(&format!(
            "{} [Summarized {}]\n",
            section.prefix(),
            section.column().to_lowercase()
        ));
    }

    format!(
        "{SUMMARY_INSTRUCTIONS}\n\n\
Research Paper Content:\n\
{content}\n\n\
Provide the response in the following format, one line per section:\n\
{layout}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        let text = "αβγδε";
        assert_eq!(truncate_chars(text, 2), "αβ");
        assert_eq!(truncate_chars(text, 0), "");
    }

    #[test]
    fn prompt_contains_exactly_the_budget() {
        // Marker characters that never occur in the prompt scaffolding.
        let text = format!("{}{}", "Ж".repeat(DEFAULT_MAX_INPUT_CHARS), "Я".repeat(500));
        let prompt = summary_prompt(&text, DEFAULT_MAX_INPUT_CHARS);

        assert_eq!(prompt.matches('Ж').count(), DEFAULT_MAX_INPUT_CHARS);
        assert!(!prompt.contains('Я'), "text past the budget leaked into the prompt");
    }

    #[test]
    fn prompt_requests_each_section_prefix() {
        let prompt = summary_prompt("paper body", DEFAULT_MAX_INPUT_CHARS);
        for section in Section::ALL {
            assert!(
                prompt.lines().any(|l| l.starts_with(section.prefix())),
                "missing layout line for {section}"
            );
        }
        assert!(prompt.contains("paper body"));
    }
}
