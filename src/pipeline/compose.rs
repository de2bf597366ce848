//! Prompt composition: template + extracted text + instructions → two messages.
//!
//! The extracted text is the only unbounded input, so it alone is subject to
//! the character budget (`max_chars`). The cut is a plain prefix of exactly
//! `max_chars` characters. It makes no attempt to end on a word or sentence;
//! the budget is a ceiling against context overflow and must be predictable.

use crate::prompts;
use tracing::warn;

/// The system and user messages for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPrompt {
    /// The document type's template, verbatim.
    pub system_prompt: String,
    /// Labeled document type, extracted text and instructions.
    pub user_content: String,
    /// `true` iff the extracted text exceeded the budget and was cut.
    pub truncated: bool,
    /// Character count of the extracted text before any cut.
    pub original_chars: usize,
}

/// Build the two messages sent to the model.
pub fn compose(
    doc_type: &str,
    template: &str,
    extracted_text: &str,
    instructions: &str,
    max_chars: usize,
) -> ComposedPrompt {
    let (text, original_chars, truncated) = truncate_chars(extracted_text, max_chars);
    if truncated {
        warn!(
            "Document truncated: {} → {} characters",
            original_chars, max_chars
        );
    }

    ComposedPrompt {
        system_prompt: template.to_string(),
        user_content: prompts::user_content(doc_type, text, instructions),
        truncated,
        original_chars,
    }
}

/// Prefix of at most `max_chars` characters, the original character count,
/// and whether anything was dropped.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, usize, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], text.chars().count(), true),
        None => (text, text.chars().count(), false),
    }
}
