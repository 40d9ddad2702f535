//! CLI binary for edgequake-pdfchunk.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` + `Job` and prints the records.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdfchunk::{
    parse_page_list, run, run_to_file, DeletionOrder, ExtractionConfig, Job, PartitionStrategy,
    PipelineProgressCallback, ProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
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

/// Spinner that narrates the pipeline stages on stderr.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    /// Stop the spinner without a summary line, e.g. before printing an error.
    fn clear(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_fetch_start(&self, url: &str) {
        self.bar.set_prefix("Downloading");
        self.bar.set_message(url.to_string());
    }

    fn on_fetch_complete(&self, bytes: usize) {
        self.bar.println(format!(
            "  {} Downloaded  {}",
            green("✓"),
            dim(&format!("{:.1} KiB", bytes as f64 / 1024.0))
        ));
    }

    fn on_pages_removed(&self, removed: usize, remaining: usize) {
        self.bar.println(format!(
            "  {} Removed {} pages  {}",
            green("✓"),
            removed,
            dim(&format!("{remaining} left"))
        ));
    }

    fn on_extraction_start(&self) {
        self.bar.set_prefix("Partitioning");
        self.bar.set_message("waiting for the extraction service…");
    }

    fn on_extraction_complete(&self, record_count: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} records extracted",
            green("✔"),
            bold(&record_count.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Partition a paper, print records to stdout
  pdfchunk https://arxiv.org/pdf/2305.15334.pdf

  # Drop the cover page and the references (pages 14-16)
  pdfchunk https://arxiv.org/pdf/2305.15334.pdf --delete-pages 1,14-16

  # JSON output to a file
  pdfchunk https://arxiv.org/pdf/2305.15334.pdf --label gorilla -o gorilla.json

  # Faster, text-layer-only partitioning
  pdfchunk --strategy fast https://example.com/report.pdf

ENVIRONMENT VARIABLES:
  UNSTRUCTURED_API_KEY    Unstructured API key (required)
  UNSTRUCTURED_API_URL    Partition endpoint override (self-hosted API)
  RUST_LOG                Log filter, e.g. edgequake_pdfchunk=debug
"#;

#[derive(Parser, Debug)]
#[command(
    name = "pdfchunk",
    version,
    about = "Download a PDF, drop pages, and partition it into chunks via the Unstructured API",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// URL of the PDF to process. Must end with ".pdf".
    url: String,

    /// Name carried through to the output.
    #[arg(short, long, env = "PDFCHUNK_LABEL", default_value = "document")]
    label: String,

    /// Pages to remove before partitioning, 1-based: "2,4" or "1,14-16".
    #[arg(short, long, env = "PDFCHUNK_DELETE_PAGES")]
    delete_pages: Option<String>,

    /// Apply --delete-pages exactly as given instead of sorting it first.
    /// The list must then already be ascending.
    #[arg(long)]
    preserve_order: bool,

    /// Partition strategy requested from the service.
    #[arg(long, env = "PDFCHUNK_STRATEGY", value_enum, default_value = "hi-res")]
    strategy: StrategyArg,

    /// Unstructured API key.
    #[arg(long, env = "UNSTRUCTURED_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Partition endpoint URL.
    #[arg(long, env = "UNSTRUCTURED_API_URL")]
    api_url: Option<String>,

    /// Scratch directory for the staging file.
    #[arg(long, env = "PDFCHUNK_STAGING_DIR", default_value = "pdfs")]
    staging_dir: PathBuf,

    /// Write JSON output to this file instead of stdout.
    #[arg(short, long, env = "PDFCHUNK_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the full output as JSON.
    #[arg(long, env = "PDFCHUNK_JSON")]
    json: bool,

    #[arg(long, env = "PDFCHUNK_NO_PROGRESS")]
    no_progress: bool,

    #[arg(short, long, env = "PDFCHUNK_VERBOSE")]
    verbose: bool,

    #[arg(short, long, env = "PDFCHUNK_QUIET")]
    quiet: bool,

    #[arg(long, env = "PDFCHUNK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    #[arg(long, env = "PDFCHUNK_API_TIMEOUT", default_value_t = 300)]
    api_timeout: u64,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum StrategyArg {
    HiRes,
    Fast,
    Auto,
    OcrOnly,
}

impl From<StrategyArg> for PartitionStrategy {
    fn from(v: StrategyArg) -> Self {
        match v {
            StrategyArg::HiRes => PartitionStrategy::HiRes,
            StrategyArg::Fast => PartitionStrategy::Fast,
            StrategyArg::Auto => PartitionStrategy::Auto,
            StrategyArg::OcrOnly => PartitionStrategy::OcrOnly,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers what INFO logs would say; keep them quiet unless asked.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build job + config ───────────────────────────────────────────────
    let mut job = Job::new(&cli.url, &cli.label);
    if let Some(ref list) = cli.delete_pages {
        job = job.delete_pages(parse_page_list(list).context("Invalid --delete-pages")?);
    }

    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = spinner
        .clone()
        .map(|s| s as Arc<dyn PipelineProgressCallback>);

    let result = match build_config(&cli, progress_cb) {
        Ok(config) => execute(&cli, &job, &config, show_progress).await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        // The spinner only finishes on success; clear it so the error is readable.
        if let Some(ref spinner) = spinner {
            spinner.clear();
        }
    }
    result
}

async fn execute(
    cli: &Cli,
    job: &Job,
    config: &ExtractionConfig,
    show_progress: bool,
) -> Result<()> {
    if let Some(ref output_path) = cli.output {
        let stats = run_to_file(job, output_path, config)
            .await
            .context("Extraction failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  {} records  {}ms  →  {}",
                green("✔"),
                stats.record_count,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
        }
    } else {
        let output = run(job, config).await.context("Extraction failed")?;

        let stdout = io::stdout();
        let mut handle = stdout.lock();
        if cli.json {
            serde_json::to_writer_pretty(&mut handle, &output)
                .context("Failed to serialise output")?;
            writeln!(handle).context("Failed to write to stdout")?;
        } else {
            for record in &output.records {
                let page = record
                    .page_number()
                    .map(|p| format!("p{p}"))
                    .unwrap_or_else(|| "p?".to_string());
                writeln!(
                    handle,
                    "{} {} {}",
                    dim(&page),
                    cyan(&format!("[{}]", record.category)),
                    record.text
                )
                .context("Failed to write to stdout")?;
            }
            writeln!(handle, "length {}", output.records.len())
                .context("Failed to write to stdout")?;
        }

        if !cli.quiet && !show_progress && !cli.json {
            eprintln!(
                "Extracted {} records in {}ms",
                output.stats.record_count, output.stats.total_duration_ms
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .strategy(cli.strategy.clone().into())
        .staging_dir(&cli.staging_dir)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout)
        .deletion_order(if cli.preserve_order {
            DeletionOrder::AsGiven
        } else {
            DeletionOrder::Ascending
        });

    // clap already folded the env vars into these fields.
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref url) = cli.api_url {
        builder = builder.api_url(url);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
