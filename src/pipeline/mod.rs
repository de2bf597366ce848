//! Pipeline stages for PDF-to-report generation.
//!
//! Each submodule implements one step and knows nothing about the others.
//! [`crate::report`] wires them together and owns the validation gates.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ compose ──▶ llm
//! (text layer)  (prompt)   (chat completion)
//! ```
//!
//! 1. [`extract`]: read the PDF's text layer; synchronous and CPU-bound, so
//!    callers run it in `spawn_blocking`
//! 2. [`compose`]: apply the character budget and build the system and user
//!    messages; pure
//! 3. [`llm`]: one POST to `/v1/chat/completions`; the only stage with
//!    network I/O

pub mod compose;
pub mod extract;
pub mod llm;
