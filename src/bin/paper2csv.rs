//! CLI binary for paper2csv.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `SummarizerConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use paper2csv::{
    inspect, summarize, BackendKind, OutputLocation, ProgressCallback, SectionMode, Stage,
    SummarizerConfig, SummaryOutput, SummaryProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Busy spinner that follows the pipeline stages and logs retries above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(style);
        bar.set_message("Starting…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{stage}…"));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed: Duration) {
        self.bar.println(format!(
            "  {} {:<20} {}",
            green("✓"),
            stage.to_string(),
            dim(&format!("{:.1}s", elapsed.as_secs_f64()))
        ));
    }

    fn on_retry(&self, attempt: u32, delay: Duration, error: &str) {
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} attempt {} failed ({}), retrying in {}s",
            yellow("↻"),
            attempt,
            msg,
            delay.as_secs()
        ));
    }

    fn on_failure(&self, stage: Stage, _error: &str) {
        self.bar.println(format!("  {} {}", red("✗"), stage));
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise a local paper (CSV written to the current directory)
  paper2csv paper.pdf

  # Summarise from a URL into ./summaries
  paper2csv https://arxiv.org/pdf/1706.03762 -o summaries

  # Use another provider through edgequake-llm
  paper2csv --backend provider --provider openai --model gpt-4.1-mini paper.pdf

  # Inspect PDF metadata (no API key needed)
  paper2csv --inspect-only paper.pdf

  # Machine-readable report
  paper2csv --json paper.pdf > report.json

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Generative Language API key (default backend)
  PAPER2CSV_MODEL         Model ID (default: gemini-1.5-pro-001)
  PAPER2CSV_OUTPUT_DIR    Directory for generated CSV files
  EDGEQUAKE_PROVIDER      Provider for --backend provider
  OPENAI_API_KEY          Used by --backend provider (openai)
  ANTHROPIC_API_KEY       Used by --backend provider (anthropic)
  PDFIUM_LIB_PATH         Path to an existing libpdfium, skips auto-download
  RUST_LOG                Log filter, overrides -v / -q

  Variables may also be placed in a `.env` file in the working directory.
"#;

/// Summarise a research paper PDF into a one-row CSV.
#[derive(Parser, Debug)]
#[command(
    name = "paper2csv",
    version,
    about = "Summarise a research paper PDF into Objectives / Methods / Key Findings CSV",
    long_about = "Extract the text of a research paper (local file or URL), ask an LLM for a \
three-part summary (Objectives, Methods, Key Findings), and save it as a single-row CSV.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Directory the CSV is written to.
    #[arg(short, long, env = "PAPER2CSV_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Write the CSV to a temporary directory and print it instead of keeping it.
    /// Takes precedence over `--output-dir`.
    #[arg(long, env = "PAPER2CSV_TEMPORARY")]
    temporary: bool,

    /// Summarisation backend.
    #[arg(long, env = "PAPER2CSV_BACKEND", value_enum, default_value = "gemini")]
    backend: BackendArg,

    /// edgequake-llm provider for `--backend provider`: openai, anthropic,
    /// gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Model ID.
    #[arg(long, env = "PAPER2CSV_MODEL")]
    model: Option<String>,

    /// API key for the Gemini backend.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, hide = true)]
    api_key: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PAPER2CSV_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Characters of paper text sent to the model.
    #[arg(long, env = "PAPER2CSV_MAX_CHARS", default_value_t = 15_000)]
    max_chars: usize,

    /// Per-request timeout in seconds.
    #[arg(long, env = "PAPER2CSV_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Overall retry deadline in seconds.
    #[arg(long, env = "PAPER2CSV_RETRY_DEADLINE", default_value_t = 300)]
    retry_deadline: u64,

    /// Fold unlabelled lines into the section above them instead of dropping them.
    #[arg(long, env = "PAPER2CSV_KEEP_CONTINUATIONS")]
    keep_continuations: bool,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAPER2CSV_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PAPER2CSV_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Output a JSON report instead of text.
    #[arg(long, env = "PAPER2CSV_JSON")]
    json: bool,

    /// Disable the busy spinner.
    #[arg(long, env = "PAPER2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no summary.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PAPER2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the CSV path.
    #[arg(short, long, env = "PAPER2CSV_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum BackendArg {
    Gemini,
    Provider,
}

impl From<BackendArg> for BackendKind {
    fn from(v: BackendArg) -> Self {
        match v {
            BackendArg::Gemini => BackendKind::Gemini,
            BackendArg::Provider => BackendKind::Provider,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner provides all the feedback that matters, so library logs
    // are limited to errors while it is shown.
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

    // ── Ensure PDFium engine is available ───────────────────────────────────
    // First run downloads the library (~30 MB) and caches it; later runs
    // only check the cache path.
    if !pdfium_auto::is_pdfium_cached() {
        ensure_pdfium(cli.quiet)?;
    }

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let config = build_config(&cli, None)?;
        let meta = inspect(&cli.input, &config)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", meta.file_name);
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb = spinner
        .clone()
        .map(|cb| cb as Arc<dyn SummaryProgressCallback>);
    let config = build_config(&cli, progress_cb)?;

    // ── Run summary ──────────────────────────────────────────────────────
    let result = summarize(&cli.input, &config).await;
    if let Some(ref s) = spinner {
        s.finish();
    }
    let output = result.map_err(|e| {
        let kind = e.kind();
        anyhow::Error::new(e).context(format!("Summary failed ({kind})"))
    })?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output.to_report())
            .context("Failed to serialise report")?;
        println!("{json}");
    } else {
        print_output(&cli, &output).await?;
    }

    Ok(())
}

/// Preview, summary, and download location, in that order.
async fn print_output(cli: &Cli, output: &SummaryOutput) -> Result<()> {
    if !cli.quiet {
        println!("{}", bold("Extracted text (preview)"));
        println!("{}\n", dim(&output.preview));
        println!("{}", bold("Summary"));
        println!("{}\n", output.raw_summary.trim_end());

        if !output.report.missing.is_empty() {
            let names: Vec<String> = output.report.missing.iter().map(|s| s.to_string()).collect();
            eprintln!(
                "{} missing section(s): {}",
                yellow("⚠"),
                names.join(", ")
            );
        }
    }

    if output.csv.is_temporary() {
        // The file goes away with the artifact, so hand over the bytes.
        let download = output
            .csv
            .download()
            .await
            .context("Failed to read generated CSV")?;
        eprintln!(
            "{} {} ({})",
            green("✔"),
            bold(&download.file_name),
            download.mime_type
        );
        print!("{}", String::from_utf8_lossy(&download.bytes));
    } else {
        println!(
            "{} CSV saved: {}",
            green("✔"),
            bold(&output.csv.path().display().to_string())
        );
    }

    if !cli.quiet {
        let stats = &output.stats;
        eprintln!(
            "   {} pages  {}/{} chars sent{}  {} attempt(s)  {}ms total",
            stats.page_count,
            stats.submitted_chars,
            stats.extracted_chars,
            if stats.truncated { " (truncated)" } else { "" },
            stats.attempts,
            stats.total_duration_ms,
        );
        if let (Some(i), Some(o)) = (stats.input_tokens, stats.output_tokens) {
            eprintln!(
                "   {} tokens in  /  {} tokens out",
                dim(&i.to_string()),
                dim(&o.to_string())
            );
        }
    }
    Ok(())
}

/// Map CLI args to `SummarizerConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SummarizerConfig> {
    let mut builder = SummarizerConfig::builder()
        .backend_kind(cli.backend.into())
        .temperature(cli.temperature)
        .max_input_chars(cli.max_chars)
        .request_timeout_secs(cli.timeout)
        .retry_deadline(Duration::from_secs(cli.retry_deadline))
        .download_timeout_secs(cli.download_timeout)
        .section_mode(if cli.keep_continuations {
            SectionMode::Continuation
        } else {
            SectionMode::FirstLine
        })
        .output(if cli.temporary {
            OutputLocation::Temporary
        } else {
            OutputLocation::Directory(cli.output_dir.clone())
        });

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let (BackendArg::Provider, Some(provider)) = (cli.backend, cli.provider.as_ref()) {
        builder = builder.provider_name(provider);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// First-run download of the pdfium shared library, with a byte-level bar.
fn ensure_pdfium(quiet: bool) -> Result<()> {
    if quiet {
        return tokio::task::block_in_place(|| pdfium_auto::ensure_pdfium_library(None))
            .map(|_| ())
            .context("Failed to download PDFium engine");
    }

    let dl_bar = ProgressBar::new(0);
    dl_bar.set_style(
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS),
    );
    dl_bar.set_prefix("PDF engine");
    dl_bar.enable_steady_tick(Duration::from_millis(80));

    let bar = dl_bar.clone();
    tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(t) = total {
                if bar.length().unwrap_or(0) != t {
                    bar.set_length(t);
                }
            }
            bar.set_position(downloaded);
        }))
    })
    .context("Failed to download PDFium engine")?;

    dl_bar.finish_with_message("ready ✓");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_overrides_output_dir() {
        let cli =
            Cli::try_parse_from(["paper2csv", "-o", "summaries", "--temporary", "paper.pdf"])
                .unwrap();
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.output, OutputLocation::Temporary);
    }

    #[test]
    fn section_mode_follows_keep_continuations() {
        let cli = Cli::try_parse_from(["paper2csv", "paper.pdf"]).unwrap();
        assert_eq!(build_config(&cli, None).unwrap().section_mode, SectionMode::FirstLine);

        let cli = Cli::try_parse_from(["paper2csv", "--keep-continuations", "paper.pdf"]).unwrap();
        assert_eq!(
            build_config(&cli, None).unwrap().section_mode,
            SectionMode::Continuation
        );
    }
}
