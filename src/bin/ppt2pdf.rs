//! CLI binary for ppt2pdf.
//!
//! A thin shim over the library crate: resolve the directory (argument or
//! interactive prompt), run the batch with a progress bar, print a summary.

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use ppt2pdf::{
    discover_presentations, run_batch, tasks_from_paths, BatchConfig, BatchProgressCallback,
    BatchResult, CancelFlag, ConversionOutcome, ProgressCallback, DEFAULT_CONCURRENCY,
    DEFAULT_STEP_TIMEOUT,
};
use std::io;
use std::path::{Path, PathBuf};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callbacks ───────────────────────────────────────────────────

/// Terminal progress callback: a live progress bar plus one log line per file.
/// Files complete out of order, so every line names its file.
struct BarProgressCallback {
    bar: ProgressBar,
}

impl BarProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {percent:>3}%  {pos}/{len} files  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for BarProgressCallback {
    fn on_batch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.reset_eta();
    }

    fn on_message(&self, outcome: &ConversionOutcome) {
        let elapsed = dim(&format!("{:.1}s", outcome.duration_ms as f64 / 1000.0));
        if outcome.success {
            self.bar
                .println(format!("  {} {}  {}", green("✓"), outcome.message, elapsed));
        } else {
            self.bar
                .println(format!("  {} {}  {}", red("✗"), red(&outcome.message), elapsed));
        }
    }

    fn on_progress(&self, _percent: u8, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
    }

    fn on_finished(&self, _result: &BatchResult) {
        self.bar.finish_and_clear();
    }
}

/// Plain log lines on stderr, for `--no-progress` runs.
struct LineProgressCallback;

impl BatchProgressCallback for LineProgressCallback {
    fn on_message(&self, outcome: &ConversionOutcome) {
        eprintln!("{}", outcome.message);
    }

    fn on_progress(&self, percent: u8, completed: usize, total: usize) {
        eprintln!("{}", dim(&format!("[{percent:>3}%] {completed}/{total}")));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Prompt for the directory
  ppt2pdf

  # Convert every presentation in a directory
  ppt2pdf C:\Talks

  # Two PowerPoint instances at a time, PowerShell 7
  ppt2pdf --concurrency 2 --powershell pwsh.exe C:\Talks

  # Machine-readable summary
  ppt2pdf --json C:\Talks > result.json

NOTES:
  Presentations (*.ppt, *.pptx, *.pptm) are picked up from the directory
  itself, not its sub-directories. Each PDF is written beside its source
  with the same name. Ctrl-C stops after the files already being converted.

ENVIRONMENT VARIABLES:
  PPT2PDF_POWERSHELL      PowerShell executable (default: powershell.exe)
  PPT2PDF_CONCURRENCY     Simultaneous conversions (default: 4)
  PPT2PDF_STEP_TIMEOUT    Seconds one PowerPoint step may take (default: 300)
  RUST_LOG                Override the log filter
"#;

/// Bulk-convert PowerPoint presentations to PDF.
#[derive(Parser, Debug)]
#[command(
    name = "ppt2pdf",
    version,
    about = "Bulk-convert PowerPoint presentations to PDF",
    long_about = "Convert every PowerPoint presentation in a directory to PDF by driving \
Microsoft PowerPoint through automation. Requires Windows with PowerPoint installed.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the presentations. Prompted for when omitted.
    directory: Option<PathBuf>,

    /// Number of presentations converted at once.
    #[arg(short, long, env = "PPT2PDF_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// PowerShell executable that hosts PowerPoint automation.
    #[arg(long, env = "PPT2PDF_POWERSHELL")]
    powershell: Option<PathBuf>,

    /// Seconds a single PowerPoint step may take before the file is failed
    /// and its PowerPoint instance killed.
    #[arg(long, env = "PPT2PDF_STEP_TIMEOUT", default_value_t = DEFAULT_STEP_TIMEOUT.as_secs())]
    step_timeout: u64,

    /// Print the batch result as JSON instead of the text summary.
    #[arg(long, env = "PPT2PDF_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PPT2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PPT2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the summary.
    #[arg(short, long, env = "PPT2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar carries all per-file feedback; keep library INFO
    // logs from tearing it.
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

    // ── Resolve input ────────────────────────────────────────────────────
    let directory = match cli.directory {
        Some(ref dir) => dir.clone(),
        None => prompt_directory()?,
    };

    let paths = discover_presentations(&directory)
        .with_context(|| format!("Failed to list presentations in {}", directory.display()))?;

    if paths.is_empty() {
        println!("{}", empty_report(cli.json)?);
        return Ok(());
    }
    if !cli.json {
        println!("Found {} PowerPoint files.", paths.len());
    }

    // ── Progress reporting ───────────────────────────────────────────────
    let mut bar = None;
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = BarProgressCallback::new();
        bar = Some(cb.bar.clone());
        Some(cb as Arc<dyn BatchProgressCallback>)
    } else if !cli.quiet && !cli.json {
        Some(Arc::new(LineProgressCallback) as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    // ── Cancellation on Ctrl-C ───────────────────────────────────────────
    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt(&cancel, bar.as_ref());
            }
        });
    }

    // ── Build config ─────────────────────────────────────────────────────

    let config = build_config(&cli, progress_cb, cancel)?;

    // ── Run conversion ───────────────────────────────────────────────────
    let result = run_batch(tasks_from_paths(paths), &config).await;

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else {
        print_summary(&result);
    }

    Ok(())
}

/// Map CLI args to `BatchConfig`.
fn build_config(
    cli: &Cli,
    progress: Option<ProgressCallback>,
    cancel: CancelFlag,
) -> Result<BatchConfig> {
    let mut builder = BatchConfig::builder()
        .concurrency(cli.concurrency)
        .step_timeout(Duration::from_secs(cli.step_timeout))
        .cancel_flag(cancel);

    if let Some(ref exe) = cli.powershell {
        builder = builder.powershell_exe(exe.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Request cancellation and say so without tearing the progress bar.
fn interrupt(cancel: &CancelFlag, bar: Option<&ProgressBar>) {
    let notice = format!(
        "{} Cancelling, waiting for running conversions to finish…",
        cyan("⚠")
    );
    match bar {
        Some(bar) => bar.println(notice),
        None => eprintln!("{notice}"),
    }
    cancel.cancel();
}

/// What to print when the directory holds no presentations.
fn empty_report(json: bool) -> Result<String> {
    if json {
        serde_json::to_string_pretty(&BatchResult::empty()).context("Failed to serialise result")
    } else {
        Ok("No PowerPoint files found in the specified directory.".to_string())
    }
}

/// Ask for the input directory until an existing one is given.
fn prompt_directory() -> Result<PathBuf> {
    let raw: String = Input::new()
        .with_prompt("Enter the directory path containing PPT files")
        .validate_with(|input: &String| -> Result<(), String> {
            let path = clean_path_input(input);
            if path.is_dir() {
                Ok(())
            } else {
                Err(format!("'{}' is not a directory", path.display()))
            }
        })
        .interact_text()
        .context("Failed to read directory path")?;
    Ok(clean_path_input(&raw))
}

/// Trim whitespace and one pair of surrounding quotes ("Copy as path" in
/// Explorer adds them).
fn clean_path_input(raw: &str) -> PathBuf {
    let s = raw.trim();
    let s = s
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')))
        .unwrap_or(s);
    Path::new(s.trim()).to_path_buf()
}

fn print_summary(result: &BatchResult) {
    let succeeded = result.success_count();
    let failed = result.failure_count();

    println!();
    if result.cancelled {
        println!(
            "{} {}",
            cyan("⚠"),
            bold(&format!(
                "Conversion cancelled after {}/{} files:",
                result.outcomes.len(),
                result.total
            ))
        );
    } else {
        println!("{}", bold("Conversion complete:"));
    }
    println!(
        "{} Successfully converted: {} files",
        green("✔"),
        bold(&succeeded.to_string())
    );
    println!(
        "{} Failed conversions: {} files",
        if failed == 0 { dim("✘") } else { red("✘") },
        bold(&failed.to_string())
    );

    if failed > 0 {
        println!("\nFailed conversions:");
        for message in result.failure_messages() {
            println!("{message}");
        }
    }
}
