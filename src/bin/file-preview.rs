//! CLI binary for file-preview.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PreviewConfig` and writes the preview bytes out.

use anyhow::{Context, Result};
use clap::Parser;
use file_preview::{
    inspect_with, preview_with_async, write_preview, ConversionPipeline, FileInfo, InputFile,
    PreviewConfig, PreviewOutput, Route,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Preview to a file
  file-preview report.pdf -o report.jpg

  # Raw JPEG on stdout
  file-preview photo.webp > thumb.jpg

  # Word document (needs LibreOffice)
  file-preview letter.docx -o letter.jpg

  # Inline data URI, e.g. for an <img> tag
  file-preview --data-uri diagram.png

  # What would happen, without converting
  file-preview --inspect-only --json archive.zip

  # Make legacy .doc files previewable
  file-preview --allow application/msword old.doc -o old.jpg

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH             Path to libpdfium (else the cache, then the system library)
  PDFIUM_AUTO_CACHE_DIR       Where a downloaded libpdfium is cached
  FILE_PREVIEW_OUTPUT         Default output path
  FILE_PREVIEW_QUALITY        JPEG quality, 1-100
  FILE_PREVIEW_MAX_PIXELS     Longest side of a rendered PDF page
  FILE_PREVIEW_OFFICE_COMMAND LibreOffice executable
  FILE_PREVIEW_TIMEOUT        Seconds before giving up
  RUST_LOG                    Overrides the log filter
"#;

/// Generate a JPEG preview of a PDF, image or word-processing document.
#[derive(Parser, Debug)]
#[command(
    name = "file-preview",
    version,
    about = "Generate a JPEG preview of a PDF, image or word-processing document",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// File to preview.
    input: PathBuf,

    /// Write the preview to this file instead of stdout.
    #[arg(short, long, env = "FILE_PREVIEW_OUTPUT")]
    output: Option<PathBuf>,

    /// JPEG quality (1–100).
    #[arg(long, env = "FILE_PREVIEW_QUALITY", default_value_t = 85,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Longest side, in pixels, of a rendered PDF page.
    #[arg(long, env = "FILE_PREVIEW_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Explicit path to the pdfium shared library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Never download PDFium; use PDFIUM_LIB_PATH, the cache or the system library.
    #[arg(long, env = "FILE_PREVIEW_OFFLINE")]
    offline: bool,

    /// LibreOffice executable used for office documents.
    #[arg(long, env = "FILE_PREVIEW_OFFICE_COMMAND", default_value = "soffice")]
    office_command: PathBuf,

    /// Keep the intermediate PDF produced for office documents.
    #[arg(long, env = "FILE_PREVIEW_KEEP_INTERMEDIATE")]
    keep_intermediate: bool,

    /// Extra MIME patterns to treat as previewable (repeatable).
    #[arg(long = "allow", value_name = "PATTERN")]
    allow: Vec<String>,

    /// Give up after this many seconds.
    #[arg(long, env = "FILE_PREVIEW_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Print what is known about the file, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Output structured JSON instead of raw bytes.
    #[arg(long, env = "FILE_PREVIEW_JSON")]
    json: bool,

    /// Print the preview as a base64 data URI.
    #[arg(long, conflicts_with = "json")]
    data_uri: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FILE_PREVIEW_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FILE_PREVIEW_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers INFO-level progress when stderr is a terminal.
    let show_progress = !cli.quiet && !cli.verbose && io::stderr().is_terminal();
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

    let config = build_config(&cli)?;
    let pipeline = ConversionPipeline::new(&config);

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let info = inspect_with(&pipeline, &cli.input).context("Failed to inspect file")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize file info")?
            );
        } else {
            print_info(&info);
        }
        return Ok(());
    }

    // ── Make sure PDFium is available for PDF and office routes ──────────
    if cli.pdfium_lib.is_none() && !cli.offline && needs_pdfium(&pipeline, &cli.input) {
        if let Err(e) = ensure_pdfium(show_progress) {
            warn!("{:#}; falling back to the system library", e);
        }
    }

    // ── Run preview ──────────────────────────────────────────────────────
    let spinner = show_progress.then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Previewing");
        bar.set_message(cli.input.display().to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    });

    let start = Instant::now();
    let result = preview_with_async(
        pipeline,
        cli.input.clone(),
        Duration::from_secs(config.timeout_secs),
    )
    .await;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let output = match result {
        Ok(output) => output,
        Err(e) => {
            if !cli.quiet {
                eprintln!("{} {}", red("✘"), e);
            }
            return Err(e).context(format!("Preview of {} failed", cli.input.display()));
        }
    };

    write_output(&cli, &output)?;

    if !cli.quiet {
        eprintln!(
            "{} {}  {}  {}",
            green("✔"),
            bold(output.content_type()),
            dim(&format!("{} bytes", output.len())),
            dim(&format!("{}ms", start.elapsed().as_millis())),
        );
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<PreviewConfig> {
    let mut builder = PreviewConfig::builder()
        .jpeg_quality(cli.quality)
        .max_rendered_pixels(cli.max_pixels)
        .office_command(&cli.office_command)
        .keep_intermediate_pdf(cli.keep_intermediate)
        .timeout_secs(cli.timeout);
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(lib);
    }
    for pattern in &cli.allow {
        builder = builder.allow(pattern);
    }
    builder.build().context("Invalid configuration")
}

/// Whether previewing `input` would bind libpdfium.
fn needs_pdfium(pipeline: &ConversionPipeline, input: &Path) -> bool {
    InputFile::new(input)
        .mime()
        .ok()
        .and_then(|mime| pipeline.route_for(&mime).ok())
        .is_some_and(|route| matches!(route, Route::Pdf | Route::OfficeWord))
}

#[cfg(feature = "bundled")]
fn ensure_pdfium(_show_progress: bool) -> Result<()> {
    let path = tokio::task::block_in_place(pdfium_auto::ensure_pdfium_bundled)
        .context("Failed to unpack the embedded PDFium")?;
    debug!("Using embedded PDFium at {}", path.display());
    Ok(())
}

#[cfg(not(feature = "bundled"))]
fn ensure_pdfium(show_progress: bool) -> Result<()> {
    if pdfium_auto::is_pdfium_cached() {
        return Ok(());
    }

    let bar = show_progress.then(|| {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─"),
        );
        bar.set_prefix("PDF engine");
        bar
    });

    let result = tokio::task::block_in_place(|| {
        pdfium_auto::ensure_pdfium_library(Some(&|downloaded, total| {
            if let Some(ref bar) = bar {
                if let Some(total) = total {
                    bar.set_length(total);
                }
                bar.set_position(downloaded);
            }
        }))
    });
    if let Some(bar) = bar {
        bar.finish_and_clear();
    }

    let path = result.context("Failed to download PDFium")?;
    debug!("PDFium ready at {}", path.display());
    Ok(())
}

fn write_output(cli: &Cli, output: &PreviewOutput) -> Result<()> {
    if cli.json {
        let json = serde_json::json!({
            "input": cli.input,
            "content_type": output.content_type(),
            "bytes": output.len(),
            "data_uri": output.to_data_uri(),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&json).context("Failed to serialise output")?
        );
        return Ok(());
    }

    if cli.data_uri {
        println!("{}", output.to_data_uri());
        return Ok(());
    }

    match cli.output {
        Some(ref path) => write_preview(output, path)?,
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.payload())
                .and_then(|()| handle.flush())
                .context("Failed to write to stdout")?;
        }
    }
    Ok(())
}

fn print_info(info: &FileInfo) {
    println!("File:         {}", info.path.display());
    println!("MIME:         {}", info.mime);
    println!(
        "Previewable:  {}",
        if info.eligible { green("yes") } else { red("no") }
    );
    match info.route {
        Some(route) => println!("Route:        {}", route),
        None => println!("Route:        {}", dim("none")),
    }
    println!("Size:         {} ({} bytes)", info.human_size, info.size);
    println!("Modified:     {}", info.modified.to_rfc3339());
    println!("Accessed:     {}", info.accessed.to_rfc3339());
    println!("Changed:      {}", info.changed.to_rfc3339());
    println!("Regular file: {}", info.is_file);
    println!("Symlink:      {}", info.is_link);
}
