//! Error types for the edgequake-authors library.
//!
//! Two layers of error reflect two distinct failure modes:
//!
//! * [`ExtractError`]: **Fatal**, the run cannot start or its results cannot
//!   be written (invalid config, no model gateway configured, CSV write
//!   failure). Returned as `Err(ExtractError)` from setup and export calls.
//!
//! * [`FileError`]: **Non-fatal**, one document failed somewhere in its
//!   render → infer → parse pipeline. It never escapes
//!   [`crate::extract::AuthorExtractor`]; instead it becomes a single error
//!   row in the batch so the remaining documents are still processed.
//!
//! [`RenderError`], [`GatewayError`] and [`ParseError`] are the stage-level
//! errors gathered under [`FileError`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-authors library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No model gateway could be built (missing API key, unknown provider …).
    #[error("Model gateway '{provider}' is not configured.\n{hint}")]
    GatewayNotConfigured { provider: String, hint: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not serialise the batch as CSV.
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure to turn a PDF's first page into PNG bytes.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum RenderError {
    #[error("PDF file not found: '{path}'")]
    FileNotFound { path: PathBuf },

    #[error("File is not a valid PDF: '{path}' (first bytes: {magic:?})")]
    NotAPdf { path: PathBuf, magic: Vec<u8> },

    /// pdfium refused to open the document (corrupt, encrypted, unreadable).
    #[error("Cannot open PDF '{path}': {detail}")]
    Open { path: PathBuf, detail: String },

    #[error("PDF '{path}' has no pages")]
    NoPages { path: PathBuf },

    #[error("Rasterisation failed for '{path}': {detail}")]
    Rasterise { path: PathBuf, detail: String },

    #[error("PNG encoding failed: {0}")]
    Encode(String),

    /// The pdfium shared library could not be loaded.
    #[error("Failed to bind to pdfium library: {0}\nSet PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide.")]
    Binding(String),

    #[error("Render task panicked: {0}")]
    TaskPanicked(String),
}

/// Failure talking to the vision model endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayError {
    /// Transport-level failure (DNS, TLS, connection reset …).
    #[error("Request to model endpoint failed: {0}")]
    Http(String),

    #[error("Model call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// 401 / 403; retrying with the same credential will not help.
    #[error("Authentication rejected by model endpoint (HTTP {status}): {detail}")]
    Auth { status: u16, detail: String },

    #[error("Model endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The endpoint answered 2xx but the body is not a chat-completion.
    #[error("Malformed response from model endpoint: {0}")]
    MalformedResponse(String),

    /// Error surfaced by an `edgequake_llm` provider.
    #[error("LLM provider error: {0}")]
    Provider(String),
}

/// The sanitised model reply could not be read as an author list.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseError {
    #[error("Model reply is not valid JSON: {detail}")]
    InvalidJson { detail: String },

    #[error("Model reply is not a JSON object (got {found})")]
    NotAnObject { found: String },

    #[error("\"authors\" must be an array (got {found})")]
    AuthorsNotArray { found: String },

    #[error("Author entry #{index} is not a JSON object")]
    InvalidEntry { index: usize },
}

/// A non-fatal error for a single document.
///
/// Its `Display` text is what ends up in the `role` column of the error row.
#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Anything else, including a panic inside the pipeline.
    #[error("Internal error: {0}")]
    Internal(String),
}
