//! Single-document extraction: render → infer → sanitise → parse → map.
//!
//! [`AuthorExtractor`] is the fault-isolation boundary. Whatever happens to one
//! document (unreadable PDF, endpoint outage, prose instead of JSON, even a
//! panic in a stage) comes back as a [`FileOutcome::Failed`] value, never as
//! an `Err` or an unwinding panic, so a batch always advances to the next file.

use crate::config::ExtractionConfig;
use crate::error::{ExtractError, FileError};
use crate::output::AuthorRecord;
use crate::pipeline::gateway::{resolve_gateway, ModelGateway};
use crate::pipeline::mapper::{map_authors, parse_response};
use crate::pipeline::render::{PageRenderer, PdfiumRenderer};
use crate::pipeline::sanitize::sanitize;
use crate::prompts::build_prompt;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pipeline stage a document was in when it failed.
///
/// Sanitising and mapping cannot fail, so they have no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Rendering,
    Inferring,
    Parsing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Rendering => "rendering",
            Stage::Inferring => "inferring",
            Stage::Parsing => "parsing",
        };
        f.write_str(s)
    }
}

/// Result of extracting one document. Either real records or one failure; never a mix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FileOutcome {
    /// The model's author list, possibly empty.
    Extracted {
        source_file: String,
        records: Vec<AuthorRecord>,
    },
    /// `stage` is `None` when the failure happened outside the pipeline
    /// stages: a caught panic, or PDF bytes that could not be staged.
    Failed {
        source_file: String,
        stage: Option<Stage>,
        error: FileError,
    },
}

impl FileOutcome {
    pub fn source_file(&self) -> &str {
        match self {
            FileOutcome::Extracted { source_file, .. }
            | FileOutcome::Failed { source_file, .. } => source_file,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }

    /// Flatten into rows: the records, or exactly one error row.
    pub fn into_records(self) -> Vec<AuthorRecord> {
        match self {
            FileOutcome::Extracted { records, .. } => records,
            FileOutcome::Failed {
                source_file, error, ..
            } => vec![AuthorRecord::error(source_file, error.to_string())],
        }
    }
}

/// Orchestrates one document end-to-end.
///
/// Renderer and gateway are stateless, shared services; build them once per
/// run and reuse the extractor for every file.
#[derive(Clone)]
pub struct AuthorExtractor {
    renderer: Arc<dyn PageRenderer>,
    gateway: Arc<dyn ModelGateway>,
    prompt: String,
}

impl AuthorExtractor {
    pub fn new(renderer: Arc<dyn PageRenderer>, gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            renderer,
            gateway,
            prompt: build_prompt(None).to_string(),
        }
    }

    /// Replace the built-in instructions.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// pdfium renderer at `config.zoom` plus the gateway chosen by [`resolve_gateway`].
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let mut renderer = PdfiumRenderer::new(config.zoom);
        if let Some(ref lib) = config.pdfium_library_path {
            renderer = renderer.with_library_path(lib);
        }
        let gateway = resolve_gateway(config)?;

        Ok(Self {
            renderer: Arc::new(renderer),
            gateway,
            prompt: build_prompt(config.prompt.as_deref()).to_string(),
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Extract author rows for the PDF at `path`, labelled `source_file`.
    ///
    /// Never fails: a broken document yields one row with `name = "ERROR"`
    /// and the failure description in `role`.
    pub async fn extract(&self, path: &Path, source_file: &str) -> Vec<AuthorRecord> {
        self.extract_outcome(path, source_file).await.into_records()
    }

    /// Like [`extract`](Self::extract) but keeps the typed failure.
    pub async fn extract_outcome(&self, path: &Path, source_file: &str) -> FileOutcome {
        let pipeline = AssertUnwindSafe(self.run_pipeline(path, source_file)).catch_unwind();

        match pipeline.await {
            Ok(Ok(records)) => {
                info!("{}: {} authors", source_file, records.len());
                FileOutcome::Extracted {
                    source_file: source_file.to_string(),
                    records,
                }
            }
            Ok(Err((stage, error))) => {
                warn!("{}: failed while {}: {}", source_file, stage, error);
                FileOutcome::Failed {
                    source_file: source_file.to_string(),
                    stage: Some(stage),
                    error,
                }
            }
            Err(panic) => {
                let msg = panic_message(panic.as_ref());
                warn!("{}: pipeline panicked: {}", source_file, msg);
                FileOutcome::Failed {
                    source_file: source_file.to_string(),
                    stage: None,
                    error: FileError::Internal(format!("pipeline panicked: {msg}")),
                }
            }
        }
    }

    /// Extract from in-memory PDF bytes.
    ///
    /// The bytes are staged in a managed temp file that is removed on return,
    /// fully written and flushed before rendering starts.
    pub async fn extract_bytes(&self, bytes: &[u8], source_file: &str) -> FileOutcome {
        let staged = tempfile::Builder::new()
            .prefix("edgequake-authors-")
            .suffix(".pdf")
            .tempfile()
            .and_then(|mut tmp| {
                tmp.write_all(bytes)?;
                tmp.flush()?;
                Ok(tmp)
            });

        match staged {
            Ok(tmp) => self.extract_outcome(tmp.path(), source_file).await,
            Err(e) => FileOutcome::Failed {
                source_file: source_file.to_string(),
                stage: None,
                error: FileError::Internal(format!("could not stage PDF bytes: {e}")),
            },
        }
    }

    async fn run_pipeline(
        &self,
        path: &Path,
        source_file: &str,
    ) -> Result<Vec<AuthorRecord>, (Stage, FileError)> {
        let png = self
            .renderer
            .render_first_page(path)
            .await
            .map_err(|e| (Stage::Rendering, e.into()))?;
        debug!("{}: rendered first page ({} PNG bytes)", source_file, png.len());

        let raw = self
            .gateway
            .infer(&png, &self.prompt)
            .await
            .map_err(|e| (Stage::Inferring, e.into()))?;
        debug!("{}: raw reply {} chars", source_file, raw.len());

        let cleaned = sanitize(&raw);

        let authors = parse_response(&cleaned).map_err(|e| (Stage::Parsing, e.into()))?;

        Ok(map_authors(&authors, source_file))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
