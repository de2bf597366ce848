//! Error types for the pdf2report library.
//!
//! Two error types mirror the two places things can go wrong:
//!
//! * [`RegistryError`]: an edit to the document-type registry would break
//!   one of its invariants (duplicate name, unknown name, removing the last
//!   entry). The registry is left untouched.
//!
//! * [`ReportError`]: every other failure. A precondition failed before any
//!   external call, the PDF could not be read, the LLM endpoint failed, or the
//!   configuration could not be written. Exactly one of these is returned for
//!   a failed report; there are no partial results.
//!
//! Nothing here is retried automatically. A retry is the caller re-issuing
//! the request.

use std::path::PathBuf;
use thiserror::Error;

/// Invariant violations on the document-type registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The name is already registered, or is empty / whitespace-only.
    #[error("Document type '{name}' already exists or is not a valid name")]
    DuplicateName { name: String },

    /// No document type with this name.
    #[error("Unknown document type '{name}'")]
    NotFound { name: String },

    /// The registry must keep at least one document type.
    #[error("Cannot remove '{name}': it is the last document type")]
    LastEntry { name: String },
}

/// All failures surfaced by report generation and configuration persistence.
#[derive(Debug, Error)]
pub enum ReportError {
    // ── Preconditions ─────────────────────────────────────────────────────
    /// No PDF was supplied.
    #[error("No PDF supplied.\nImport a PDF export first.")]
    MissingInput,

    /// A required LLM connection setting is blank.
    #[error("LLM configuration incomplete: '{field}' is empty.\nSet it with `pdf2report config set`.")]
    ConfigIncomplete { field: &'static str },

    // ── Document errors ───────────────────────────────────────────────────
    /// The byte stream could not be parsed as a PDF at all.
    #[error("Could not read the PDF: {detail}")]
    Extraction { detail: String },

    /// The PDF parsed, but no page carries a text layer.
    #[error("No text could be extracted from the PDF.\nScanned document without OCR?")]
    NoExtractableText,

    /// Registry lookup or edit failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The endpoint could not be reached or answered with a non-2xx status.
    #[error("Could not reach the LLM endpoint '{endpoint}': {detail}\nIs the server running and the base URL correct?")]
    Transport { endpoint: String, detail: String },

    /// The endpoint answered 2xx, but without `choices[0].message.content`.
    #[error("Unexpected response from the LLM endpoint: {body}")]
    MalformedResponse { body: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// The configuration file could not be written.
    #[error("Failed to save configuration to '{path}': {detail}")]
    Persistence { path: PathBuf, detail: String },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error (runtime or HTTP client construction).
    #[error("Internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_error_converts_into_report_error() {
        let e: ReportError = RegistryError::NotFound {
            name: "IRM cardiaque".into(),
        }
        .into();
        assert!(matches!(e, ReportError::Registry(RegistryError::NotFound { .. })));
        assert_eq!(e.to_string(), "Unknown document type 'IRM cardiaque'");
    }

    #[test]
    fn transport_display_names_endpoint() {
        let e = ReportError::Transport {
            endpoint: "http://127.0.0.1:1234/v1/chat/completions".into(),
            detail: "connection refused".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("127.0.0.1:1234"), "got: {msg}");
        assert!(msg.contains("connection refused"), "got: {msg}");
    }

    #[test]
    fn malformed_display_carries_body() {
        let e = ReportError::MalformedResponse {
            body: r#"{"unexpected":"shape"}"#.into(),
        };
        assert!(e.to_string().contains(r#"{"unexpected":"shape"}"#));
    }

    #[test]
    fn config_incomplete_names_field() {
        let e = ReportError::ConfigIncomplete { field: "model_name" };
        assert!(e.to_string().contains("model_name"));
    }
}
