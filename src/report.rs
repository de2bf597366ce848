//! Report generation: validate, extract, compose, call the model.
//!
//! ## Gates
//!
//! ```text
//! request
//!  ├─ 1. PDF present?                  MissingInput
//!  ├─ 2. base_url / model_name set?    ConfigIncomplete
//!  ├─ 3. document type known?          Registry(NotFound)
//!  ├─ 4. extract text                  Extraction / NoExtractableText
//!  ├─ 5. compose (budget applied)
//!  └─ 6. chat completion               Transport / MalformedResponse
//! ```
//!
//! Gates 1–3 run before any parsing or network I/O. A request either yields a
//! complete [`Report`] or exactly one error. Nothing here writes the
//! configuration; auto-save is the caller's business
//! (see [`crate::session::Session::generate_report`]).

use crate::config::LlmSettings;
use crate::error::ReportError;
use crate::pipeline::compose::compose;
use crate::pipeline::extract::{PdfTextExtractor, TextExtractor};
use crate::pipeline::llm::{LlmClient, TokenUsage};
use crate::registry::DocumentTypeRegistry;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// One report request. Built per call, never persisted.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    /// Name of a registered document type.
    pub doc_type: String,
    /// Raw PDF bytes; `None` (or empty) when nothing was supplied.
    pub pdf_bytes: Option<Vec<u8>>,
    /// Free-form supplementary instructions, may be empty.
    pub instructions: String,
    /// Snapshot of the connection settings for this call.
    pub settings: LlmSettings,
}

/// A generated report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// The model's answer, unmodified (markdown-flavoured).
    pub text: String,
    pub doc_type: String,
    /// `true` when the extracted text exceeded `max_chars` and was cut.
    pub truncated: bool,
    /// Characters extracted from the PDF, before truncation.
    pub extracted_chars: usize,
    pub usage: Option<TokenUsage>,
    pub duration_ms: u64,
}

impl Report {
    /// File name for saving this report, e.g. `compte_rendu_holter_ecg.txt`.
    pub fn suggested_file_name(&self) -> String {
        report_file_name(&self.doc_type)
    }
}

/// `compte_rendu_<doc type, lower-cased, spaces as underscores>.txt`
pub fn report_file_name(doc_type: &str) -> String {
    format!("compte_rendu_{}.txt", doc_type.to_lowercase().replace(' ', "_"))
}

/// Extractor + HTTP client. Cheap to clone.
#[derive(Clone)]
pub struct ReportPipeline {
    extractor: Arc<dyn TextExtractor>,
    client: LlmClient,
}

impl ReportPipeline {
    /// Pipeline with the `pdf-extract` text extractor.
    pub fn new() -> Result<Self, ReportError> {
        Self::with_extractor(Arc::new(PdfTextExtractor))
    }

    /// Pipeline with a custom extractor.
    pub fn with_extractor(extractor: Arc<dyn TextExtractor>) -> Result<Self, ReportError> {
        Ok(Self {
            extractor,
            client: LlmClient::new()?,
        })
    }

    /// Extract the text of a PDF off the async executor.
    pub async fn extract_text(&self, pdf_bytes: Vec<u8>) -> Result<String, ReportError> {
        let extractor = Arc::clone(&self.extractor);
        tokio::task::spawn_blocking(move || extractor.extract(&pdf_bytes))
            .await
            .map_err(|e| ReportError::Internal(format!("extraction task failed: {e}")))?
    }

    /// Run every gate and return the finished report.
    pub async fn run(
        &self,
        registry: &DocumentTypeRegistry,
        request: ReportRequest,
    ) -> Result<Report, ReportError> {
        let start = Instant::now();
        let ReportRequest {
            doc_type,
            pdf_bytes,
            instructions,
            settings,
        } = request;

        // ── Gate 1: input ───────────────────────────────────────────────
        let pdf_bytes = match pdf_bytes {
            Some(bytes) if !bytes.is_empty() => bytes,
            _ => return Err(ReportError::MissingInput),
        };

        // ── Gate 2: connection settings ─────────────────────────────────
        if settings.base_url.trim().is_empty() {
            return Err(ReportError::ConfigIncomplete { field: "base_url" });
        }
        if settings.model_name.trim().is_empty() {
            return Err(ReportError::ConfigIncomplete { field: "model_name" });
        }

        // ── Gate 3: document type ───────────────────────────────────────
        let template = registry.get(&doc_type)?;

        // ── Step 4: extract ─────────────────────────────────────────────
        info!("Extracting text ({} bytes) for '{}'", pdf_bytes.len(), doc_type);
        let text = self.extract_text(pdf_bytes).await?;
        if text.trim().is_empty() {
            return Err(ReportError::NoExtractableText);
        }

        // ── Step 5: compose ─────────────────────────────────────────────
        let prompt = compose(&doc_type, template, &text, &instructions, settings.max_chars);
        debug!(
            "Prompt: {} system chars, {} user chars",
            prompt.system_prompt.len(),
            prompt.user_content.len()
        );

        // ── Step 6: model ───────────────────────────────────────────────
        let completion = self
            .client
            .generate(&settings, &prompt.system_prompt, &prompt.user_content)
            .await?;

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("Report for '{}' generated in {}ms", doc_type, duration_ms);

        Ok(Report {
            text: completion.content,
            doc_type,
            truncated: prompt.truncated,
            extracted_chars: prompt.original_chars,
            usage: completion.usage,
            duration_ms,
        })
    }
}

/// Generate a report with the default pipeline.
///
/// This is the library's single entry point for generation; it never touches
/// the configuration file. Use [`crate::session::Session`] for auto-save.
///
/// # Example
/// ```rust,no_run
/// use pdf2report::{generate_report, DocumentTypeRegistry, LlmSettings};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = DocumentTypeRegistry::default();
/// let pdf = std::fs::read("holter.pdf")?;
/// let report = generate_report(
///     &registry,
///     "Holter ECG",
///     Some(pdf),
///     "Rédige un compte-rendu structuré.",
///     &LlmSettings::default(),
/// )
/// .await?;
/// println!("{}", report.text);
/// # Ok(())
/// # }
/// ```
pub async fn generate_report(
    registry: &DocumentTypeRegistry,
    doc_type: &str,
    pdf_bytes: Option<Vec<u8>>,
    instructions: &str,
    settings: &LlmSettings,
) -> Result<Report, ReportError> {
    let request = ReportRequest {
        doc_type: doc_type.to_string(),
        pdf_bytes,
        instructions: instructions.to_string(),
        settings: settings.clone(),
    };
    ReportPipeline::new()?.run(registry, request).await
}

/// Blocking wrapper around [`generate_report`].
///
/// Creates a single-threaded tokio runtime internally; do not call from
/// inside an async context.
pub fn generate_report_sync(
    registry: &DocumentTypeRegistry,
    doc_type: &str,
    pdf_bytes: Option<Vec<u8>>,
    instructions: &str,
    settings: &LlmSettings,
) -> Result<Report, ReportError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| ReportError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(generate_report(
            registry,
            doc_type,
            pdf_bytes,
            instructions,
            settings,
        ))
}
