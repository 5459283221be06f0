//! # edgequake-authors
//!
//! Extract author names, roles, corresponding-author flags, affiliations and
//! emails from research-paper PDFs using Vision Language Models (VLMs).
//!
//! ## Why render instead of parsing text?
//!
//! Author blocks are where PDF text extraction is weakest: names split across
//! superscript affiliation markers, daggers for equal contribution, asterisks
//! for the corresponding author, emails tucked into footnotes. This crate
//! rasterises the first page and lets a VLM read it as a human would, then
//! normalises its JSON reply into typed rows.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Render    rasterise page 1 via pdfium (spawn_blocking), PNG
//!  ├─ 2. Prompt    fixed role-assignment rules (First / Co-First / Co-Author, corresponding flag)
//!  ├─ 3. VLM       one multimodal call, no retries
//!  ├─ 4. Sanitise  strip ```json fences
//!  ├─ 5. Map       {"authors": [...]} → AuthorRecord rows
//!  └─ 6. Batch     per-file fault isolation, CSV export
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_authors::{extract_batch, to_csv_string, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder()
//!         .base_url("https://api.sambanova.ai/v1")
//!         .api_key(std::env::var("SAMBANOVA_API_KEY")?)
//!         .build()?;
//!     let batch = extract_batch(["paper1.pdf", "paper2.pdf"], &config).await?;
//!     print!("{}", to_csv_string(&batch.records)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf-authors` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{extract_batch, extract_batch_sync, BatchInput, BatchRunner};
pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use error::{ExtractError, FileError, GatewayError, ParseError, RenderError};
pub use export::{present_columns, to_csv_string, write_csv, write_csv_file, CSV_COLUMNS};
pub use extract::{AuthorExtractor, FileOutcome, Stage};
pub use output::{AuthorRecord, BatchStats, ExtractionBatch};
pub use pipeline::gateway::{ChatCompletionsGateway, ModelGateway, ProviderGateway};
pub use pipeline::render::{PageRenderer, PdfiumRenderer};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
