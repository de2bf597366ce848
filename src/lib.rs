//! # pdf2report
//!
//! Draft medical examination reports from instrument PDF exports with a
//! locally hosted language model.
//!
//! Echocardiography machines, Holter and ambulatory blood-pressure software,
//! polygraphy recorders and ECG carts export their measurements as digital
//! PDFs. This crate reads the PDF's text layer, pairs it with an instruction
//! template for the kind of examination, and asks an OpenAI-compatible server
//! (LM Studio, Ollama, vLLM…) for a structured report.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes + document type + instructions + settings
//!  │
//!  ├─ 1. Gates    input present, settings complete, type registered
//!  ├─ 2. Extract  text layer via pdf-extract (spawn_blocking)
//!  ├─ 3. Compose  template as system prompt, text cut to max_chars
//!  ├─ 4. LLM      one POST /v1/chat/completions, no retries
//!  └─ 5. Report   model answer verbatim + truncation flag + usage
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2report::{ConfigStore, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Session::open(ConfigStore::default())?;
//!     let pdf = std::fs::read("echo.pdf")?;
//!     let delivery = session
//!         .generate_report("Échographie cardiaque", Some(pdf), "")
//!         .await?;
//!     println!("{}", delivery.report.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2report` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf2report = { version = "0.1", default-features = false }
//! ```
//!
//! ## Persistence
//!
//! Registry and settings live in one JSON document (`cr_config.json` by
//! default). It is read leniently and written atomically; see [`store`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod prompts;
pub mod registry;
pub mod report;
pub mod session;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Config, LlmSettings, LlmSettingsBuilder, PartialConfig};
pub use error::{RegistryError, ReportError};
pub use pipeline::extract::{PdfTextExtractor, TextExtractor};
pub use pipeline::llm::TokenUsage;
pub use registry::{DocumentType, DocumentTypeRegistry};
pub use report::{generate_report, generate_report_sync, Report, ReportPipeline, ReportRequest};
pub use session::{ReportDelivery, Session};
pub use store::{ConfigStore, DEFAULT_CONFIG_FILE};
