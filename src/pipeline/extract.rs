//! PDF text extraction.
//!
//! Instrument exports (echo machines, Holter software, ECG carts) are digital
//! PDFs with a text layer, so reading that layer is enough. Scanned pages have
//! no text layer and come back empty; there is no OCR fallback.
//!
//! Parsing is CPU-bound and synchronous. Callers in async code run it on
//! `spawn_blocking` (see [`crate::report`]).

use crate::error::ReportError;
use std::panic::{self, AssertUnwindSafe};
use tracing::debug;

/// Separator placed between the text of consecutive pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Turns PDF bytes into one plain-text string.
///
/// Implementations return `Ok` with an empty (or whitespace-only) string when
/// the document parses but carries no text. `Err` is reserved for input that
/// cannot be read as a document at all.
pub trait TextExtractor: Send + Sync {
    fn extract(&self, pdf_bytes: &[u8]) -> Result<String, ReportError>;
}

/// Text-layer extractor backed by the `pdf-extract` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl TextExtractor for PdfTextExtractor {
    fn extract(&self, pdf_bytes: &[u8]) -> Result<String, ReportError> {
        // pdf-extract can panic on malformed content streams; a bad file must
        // not take the host down.
        let pages = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        }))
        .map_err(|payload| ReportError::Extraction {
            detail: format!("PDF parser panicked: {}", panic_message(payload.as_ref())),
        })?
        .map_err(|e| ReportError::Extraction {
            detail: e.to_string(),
        })?;

        debug!(
            "Extracted {} pages, {} empty",
            pages.len(),
            pages.iter().filter(|p| p.trim().is_empty()).count()
        );

        Ok(pages.join(PAGE_SEPARATOR))
    }
}

/// First `max_chars` characters of `text`, for a quick look before generating.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
