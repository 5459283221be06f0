//! Batch entry points: run many documents through one [`AuthorExtractor`].
//!
//! Files are processed strictly one at a time, in the order given. Each file
//! contributes either its author rows or exactly one error row, so `N` inputs
//! always mean `N` files attempted (unless the run is cancelled between files).

use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::extract::{AuthorExtractor, FileOutcome};
use crate::output::{BatchStats, ExtractionBatch};
use crate::progress::{completed_fraction, ProgressCallback};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// One document to process, paired with the label its rows will carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchInput {
    pub path: PathBuf,
    pub source_file: String,
}

impl BatchInput {
    pub fn new(path: impl Into<PathBuf>, source_file: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            source_file: source_file.into(),
        }
    }

    /// Label the document with its file name (falling back to the full path).
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let source_file = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::new(path, source_file)
    }
}

/// Sequential driver accumulating every file's rows into one [`ExtractionBatch`].
pub struct BatchRunner {
    extractor: AuthorExtractor,
    progress: Option<ProgressCallback>,
    inter_file_delay: Duration,
    cancel: Option<Arc<AtomicBool>>,
}

impl BatchRunner {
    pub fn new(extractor: AuthorExtractor) -> Self {
        Self {
            extractor,
            progress: None,
            inter_file_delay: Duration::ZERO,
            cancel: None,
        }
    }

    /// Extractor, progress callback and pacing taken from `config`.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let mut runner = Self::new(AuthorExtractor::from_config(config)?)
            .with_inter_file_delay(Duration::from_millis(config.inter_file_delay_ms));
        if let Some(ref cb) = config.progress_callback {
            runner = runner.with_progress(Arc::clone(cb));
        }
        Ok(runner)
    }

    pub fn with_progress(mut self, cb: ProgressCallback) -> Self {
        self.progress = Some(cb);
        self
    }

    pub fn with_inter_file_delay(mut self, delay: Duration) -> Self {
        self.inter_file_delay = delay;
        self
    }

    /// Stop before the next file once `flag` is set. Never interrupts a file mid-pipeline.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn extractor(&self) -> &AuthorExtractor {
        &self.extractor
    }

    /// Process `inputs` in order and return every row produced.
    pub async fn run(&self, inputs: impl IntoIterator<Item = BatchInput>) -> ExtractionBatch {
        let inputs: Vec<BatchInput> = inputs.into_iter().collect();
        let total = inputs.len();
        let start = Instant::now();
        info!("Starting batch of {} files", total);

        if let Some(ref cb) = self.progress {
            cb.on_batch_start(total);
        }

        let mut records = Vec::new();
        let mut stats = BatchStats {
            total_files: total,
            ..Default::default()
        };

        for (i, input) in inputs.iter().enumerate() {
            if self.is_cancelled() {
                info!("Batch cancelled after {}/{} files", i, total);
                stats.cancelled = true;
                break;
            }
            if i > 0 && !self.inter_file_delay.is_zero() {
                tokio::time::sleep(self.inter_file_delay).await;
            }

            let index = i + 1;
            if let Some(ref cb) = self.progress {
                cb.on_file_start(index, total, &input.source_file);
            }

            let outcome = self
                .extractor
                .extract_outcome(&input.path, &input.source_file)
                .await;

            if let Some(ref cb) = self.progress {
                match &outcome {
                    FileOutcome::Extracted { records, .. } => {
                        cb.on_file_complete(index, total, records.len())
                    }
                    FileOutcome::Failed { error, .. } => {
                        cb.on_file_error(index, total, &error.to_string())
                    }
                }
                cb.on_progress(completed_fraction(index, total));
            }

            stats.processed_files += 1;
            if outcome.is_failure() {
                stats.failed_files += 1;
            }
            records.extend(outcome.into_records());
        }

        stats.total_records = records.len();
        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Batch complete: {}/{} files, {} failed, {} rows, {}ms",
            stats.processed_files, total, stats.failed_files, stats.total_records, stats.duration_ms
        );

        if let Some(ref cb) = self.progress {
            cb.on_batch_complete(stats.processed_files, stats.failed_files);
        }

        ExtractionBatch { records, stats }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }
}

/// Extract authors from every PDF in `paths`, labelled by file name.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Only setup can fail (invalid config, no model endpoint). Per-file failures
/// become error rows inside the returned batch.
pub async fn extract_batch<P: AsRef<Path>>(
    paths: impl IntoIterator<Item = P>,
    config: &ExtractionConfig,
) -> Result<ExtractionBatch, ExtractError> {
    let runner = BatchRunner::from_config(config)?;
    Ok(runner.run(paths.into_iter().map(BatchInput::from_path)).await)
}

/// Synchronous wrapper around [`extract_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_batch_sync<P: AsRef<Path>>(
    paths: impl IntoIterator<Item = P>,
    config: &ExtractionConfig,
) -> Result<ExtractionBatch, ExtractError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract_batch(paths, config))
}
