//! CLI binary for edgequake-authors.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig`, runs the batch and writes CSV (or JSON).

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_authors::{
    write_csv, write_csv_file, BatchInput, BatchProgressCallback, BatchRunner, ExtractionBatch,
    ExtractionConfig, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a ✓/✗ line per file.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Wall-clock start of the file currently in the pipeline.
    file_start: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Extracting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            file_start: Mutex::new(None),
        })
    }

    fn elapsed_secs(&self) -> f64 {
        self.file_start
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting authors from {total_files} files…"))
        ));
    }

    fn on_file_start(&self, _index: usize, _total: usize, source_file: &str) {
        if let Ok(mut t) = self.file_start.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(source_file.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, record_count: usize) {
        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {:<12}  {}",
            green("✓"),
            index,
            total,
            dim(&format!("{record_count:>3} authors")),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{:.1}s", self.elapsed_secs())),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, files_processed: usize, files_failed: usize) {
        self.bar.finish_and_clear();
        let ok = files_processed.saturating_sub(files_failed);
        if files_failed == 0 {
            eprintln!("{} {} files processed successfully", green("✔"), bold(&ok.to_string()));
        } else {
            eprintln!(
                "{} {}/{} files processed  ({} failed)",
                if ok == 0 { red("✘") } else { cyan("⚠") },
                bold(&ok.to_string()),
                files_processed,
                red(&files_failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract authors from two papers, CSV to stdout
  pdf-authors paper1.pdf paper2.pdf

  # Every PDF in a directory, CSV to a file
  pdf-authors ./papers -o authors_extracted.csv

  # SambaNova (or any OpenAI-compatible endpoint)
  pdf-authors --base-url https://api.sambanova.ai/v1 --model Llama-4-Maverick-17B-128E-Instruct paper.pdf

  # Named provider via edgequake-llm
  pdf-authors --provider openai --model gpt-4.1-mini paper.pdf

  # JSON output (rows + per-run stats)
  pdf-authors --json papers/ > authors.json

OUTPUT COLUMNS:
  source_file, name, role, is_corresponding, affiliation, email
  Optional columns that are empty for every row are omitted.
  A file that could not be processed yields one row with name=ERROR and the
  reason in the role column.

ENVIRONMENT VARIABLES:
  AUTHORS_BASE_URL        OpenAI-compatible base URL
  AUTHORS_API_KEY         API key for AUTHORS_BASE_URL (falls back to SAMBANOVA_API_KEY)
  OPENAI_API_KEY          OpenAI API key (auto-detected when no base URL is given)
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)

  A .env file in the working directory is loaded first.
"#;

/// Extract author metadata from research-paper PDFs using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-authors",
    version,
    about = "Extract author names, roles and affiliations from research-paper PDFs using Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF files, or directories whose *.pdf files are processed in name order.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write CSV (or JSON with --json) to this file instead of stdout.
    #[arg(short, long, env = "AUTHORS_OUTPUT")]
    output: Option<PathBuf>,

    /// OpenAI-compatible base URL (e.g. https://api.sambanova.ai/v1).
    #[arg(long, env = "AUTHORS_BASE_URL")]
    base_url: Option<String>,

    /// API key for --base-url.
    #[arg(long, env = "AUTHORS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Vision model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// edgequake-llm provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// First-page magnification (0.5–8.0).
    #[arg(long, env = "AUTHORS_ZOOM", default_value_t = 2.0)]
    zoom: f32,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "AUTHORS_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens per file.
    #[arg(long, env = "AUTHORS_MAX_TOKENS")]
    max_tokens: Option<usize>,

    /// Per-file LLM call timeout in seconds.
    #[arg(long, env = "AUTHORS_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Pause between files in milliseconds.
    #[arg(long, env = "AUTHORS_DELAY_MS", default_value_t = 0)]
    delay_ms: u64,

    /// Path to a text file replacing the built-in extraction prompt.
    #[arg(long, env = "AUTHORS_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Path to libpdfium (file or directory).
    #[arg(long)]
    pdfium_lib: Option<PathBuf>,

    /// Output the batch (rows + stats) as JSON instead of CSV.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "AUTHORS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; --verbose always wins.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inputs ───────────────────────────────────────────────────────────
    let inputs = expand_inputs(&cli.inputs)?;
    if inputs.is_empty() {
        anyhow::bail!("No PDF files found in the given inputs");
    }

    // ── Build config + runner ────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted: finishing the current file, then writing partial results…");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let runner = BatchRunner::from_config(&config)
        .context("Failed to set up extraction")?
        .with_cancel_flag(cancel);

    // ── Run ──────────────────────────────────────────────────────────────
    let batch = runner.run(inputs).await;

    write_output(&cli, &batch).await?;

    if !cli.quiet {
        let stats = &batch.stats;
        eprintln!(
            "{} rows from {}/{} files  ({} failed)  {}ms{}",
            stats.total_records,
            stats.processed_files,
            stats.total_files,
            stats.failed_files,
            stats.duration_ms,
            if stats.cancelled { "  [cancelled]" } else { "" }
        );
    }

    if batch.stats.processed_files > 0 && batch.stats.failed_files == batch.stats.processed_files {
        anyhow::bail!("All {} files failed", batch.stats.failed_files);
    }
    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .zoom(cli.zoom)
        .temperature(cli.temperature)
        .api_timeout_secs(cli.api_timeout)
        .inter_file_delay_ms(cli.delay_ms);

    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt);
    }
    if let Some(ref url) = cli.base_url {
        builder = builder.base_url(url);
    }
    if let Some(key) = cli
        .api_key
        .clone()
        .or_else(|| std::env::var("SAMBANOVA_API_KEY").ok())
    {
        builder = builder.api_key(key);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(n) = cli.max_tokens {
        builder = builder.max_tokens(n);
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library_path(lib);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Expand directories into their `*.pdf` files (sorted); plain paths pass through.
///
/// Missing files are kept so they show up as error rows rather than vanishing.
fn expand_inputs(paths: &[PathBuf]) -> Result<Vec<BatchInput>> {
    let mut inputs = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut pdfs: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("Failed to read directory {}", path.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_pdf(p))
                .collect();
            pdfs.sort();
            inputs.extend(pdfs.into_iter().map(BatchInput::from_path));
        } else {
            inputs.push(BatchInput::from_path(path));
        }
    }
    Ok(inputs)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

async fn write_output(cli: &Cli, batch: &ExtractionBatch) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(batch).context("Failed to serialise output")?;
        match cli.output {
            Some(ref path) => tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => println!("{json}"),
        }
        return Ok(());
    }

    match cli.output {
        Some(ref path) => write_csv_file(&batch.records, path)
            .await
            .context("Failed to write CSV")?,
        None => {
            let stdout = io::stdout();
            write_csv(&batch.records, stdout.lock()).context("Failed to write CSV to stdout")?;
        }
    }
    Ok(())
}
