//! CLI binary for nanotools-client.
//!
//! A thin shim over the tool controllers: flags map onto controller state,
//! results are written into `--out-dir` and summarised on stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use nanotools_client::config::DEFAULT_BASE_URL;
use nanotools_client::platform::{
    ClipboardSink, DirectoryDownloads, FileSource, MemoryBlobUrls, PathFileSource,
};
use nanotools_client::tools::image::ImageConverter;
use nanotools_client::tools::pdf::PdfConverter;
use nanotools_client::tools::qr::{
    CopyOutcome, ErrorCorrection, QrGenerator, QrOptions, QrPayload, WifiEncryption,
};
use nanotools_client::tools::uuid::{UuidGenerator, UuidOptions};
use nanotools_client::tools::video::{VideoDownloader, DEFAULT_QUALITY};
use nanotools_client::{ApiClient, ClientConfig, OutputFormat, ToolContext, TransferProgress};
use serde_json::json;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── Download progress using indicatif ────────────────────────────────────────

/// Starts as a spinner; becomes a byte bar once `Content-Length` is known.
struct CliTransferProgress {
    bar: ProgressBar,
}

impl CliTransferProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {bytes}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Downloading");
        bar.set_message("waiting for server…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl TransferProgress for CliTransferProgress {
    fn on_start(&self, total: Option<u64>) {
        self.bar.set_message("");
        if let Some(total) = total {
            self.bar.set_length(total);
            self.bar.set_style(
                ProgressStyle::with_template(
                    "{spinner:.cyan} {prefix:.bold}  \
                     [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▉▊▋▌▍▎▏  ")
                .tick_strings(TICKS),
            );
        }
    }

    fn on_chunk(&self, received: u64, _total: Option<u64>) {
        self.bar.set_position(received);
    }

    fn on_complete(&self, _received: u64) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert an image to WebP at quality 70
  nanotools image photo.png --format webp --quality 70

  # Render every page of a PDF as PNG at 200 dpi into ./pages
  nanotools --out-dir pages pdf report.pdf --format png --dpi 200

  # Wi-Fi QR code, copied to the clipboard as well
  nanotools qr --copy wifi "Cafe Guest" --password hunter2

  # Ten upper-case UUIDs without hyphens, as JSON
  nanotools --json uuid --count 10 --uppercase --no-hyphens

  # Against a remote backend
  nanotools --server https://tools.example.net uuid

  # Inspect, then download a video with English subtitles
  nanotools video-info https://youtu.be/dQw4w9WgXcQ
  nanotools video https://youtu.be/dQw4w9WgXcQ --quality 1080p --subtitles en

ENVIRONMENT VARIABLES:
  NANOTOOLS_URL            Backend base URL (default http://localhost:8080)
  NANOTOOLS_TIMEOUT_SECS   Request timeout in seconds (default 60)
  RUST_LOG                 Log filter, overrides --verbose / --quiet
"#;

/// Client for the nanotools web toolkit.
#[derive(Parser, Debug)]
#[command(
    name = "nanotools",
    version,
    about = "Convert images and PDFs, generate QR codes and UUIDs, download videos",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Backend base URL.
    #[arg(long, global = true, env = "NANOTOOLS_URL", default_value = DEFAULT_BASE_URL)]
    server: String,

    /// Request timeout in seconds.
    #[arg(long, global = true, env = "NANOTOOLS_TIMEOUT_SECS", default_value_t = 60)]
    timeout: u64,

    /// Video download timeout in seconds.
    #[arg(long, global = true, env = "NANOTOOLS_DOWNLOAD_TIMEOUT_SECS", default_value_t = 600)]
    download_timeout: u64,

    /// Directory downloads are written to.
    #[arg(short, long, global = true, env = "NANOTOOLS_OUT_DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Print structured JSON on stdout.
    #[arg(long, global = true)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "NANOTOOLS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "NANOTOOLS_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert an image (max 10 MB) to JPEG, PNG or WebP.
    Image {
        input: PathBuf,
        #[arg(long, default_value = "jpeg")]
        format: OutputFormat,
        #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,
    },

    /// Render every page of a PDF (max 50 MB) as an image.
    Pdf {
        input: PathBuf,
        #[arg(long, default_value = "jpeg")]
        format: OutputFormat,
        #[arg(long, default_value_t = 150, value_parser = clap::value_parser!(u32).range(72..=600))]
        dpi: u32,
        #[arg(long, default_value_t = 85, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: u8,
    },

    /// Generate a QR code PNG.
    Qr {
        #[command(subcommand)]
        payload: QrCommand,
        /// Edge length in pixels (min 64).
        #[arg(long, default_value_t = 512, value_parser = clap::value_parser!(u32).range(64..))]
        size: u32,
        /// 0 = low, 1 = medium, 2 = high, 3 = highest.
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=3))]
        error_correction: u8,
        #[arg(long, default_value = "#000000")]
        foreground: String,
        #[arg(long, default_value = "#ffffff")]
        background: String,
        /// Also copy the PNG to the clipboard.
        #[arg(long)]
        copy: bool,
    },

    /// Generate UUIDs.
    Uuid {
        #[arg(short = 'n', long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=100))]
        count: u32,
        #[arg(long)]
        uppercase: bool,
        #[arg(long)]
        no_hyphens: bool,
        /// Copy the list (one per line) to the clipboard.
        #[arg(long)]
        copy: bool,
    },

    /// Show title, duration and formats of a video URL.
    VideoInfo {
        url: String,
        /// cookies.txt export for sites that need a login.
        #[arg(long)]
        cookies: Option<PathBuf>,
    },

    /// Download a video (or its audio track).
    Video {
        url: String,
        /// e.g. 360p, 720p, 1080p, or `audio`.
        #[arg(long, default_value = DEFAULT_QUALITY)]
        quality: String,
        /// Subtitle language to embed.
        #[arg(long)]
        subtitles: Option<String>,
        #[arg(long)]
        cookies: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug, Clone)]
enum QrCommand {
    /// Plain text or a URL.
    Text { content: String },
    /// Wi-Fi network credentials.
    Wifi {
        ssid: String,
        #[arg(long, default_value = "")]
        password: String,
        /// WPA, WEP or nopass.
        #[arg(long, default_value = "WPA")]
        encryption: WifiEncryption,
    },
    /// Contact card.
    Contact {
        name: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long, default_value = "")]
        email: String,
    },
}

impl From<QrCommand> for QrPayload {
    fn from(c: QrCommand) -> Self {
        match c {
            QrCommand::Text { content } => QrPayload::Text { content },
            QrCommand::Wifi {
                ssid,
                password,
                encryption,
            } => QrPayload::Wifi {
                ssid,
                password,
                encryption,
            },
            QrCommand::Contact { name, phone, email } => QrPayload::Contact { name, phone, email },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build context ────────────────────────────────────────────────────
    let config = ClientConfig::builder()
        .base_url(cli.server.clone())
        .request_timeout_secs(cli.timeout)
        .download_timeout_secs(cli.download_timeout)
        .build()
        .context("Invalid configuration")?;
    let client = ApiClient::new(config).context("Failed to create HTTP client")?;

    tokio::fs::create_dir_all(&cli.out_dir)
        .await
        .with_context(|| format!("Failed to create output directory {:?}", cli.out_dir))?;

    let ctx = ToolContext::new(
        client,
        Arc::new(MemoryBlobUrls::new()),
        Arc::new(DirectoryDownloads::new(cli.out_dir.clone())),
    );

    match cli.command {
        Command::Image {
            ref input,
            format,
            quality,
        } => run_image(&cli, ctx, input, format, quality).await,
        Command::Pdf {
            ref input,
            format,
            dpi,
            quality,
        } => run_pdf(&cli, ctx, input, format, dpi, quality).await,
        Command::Qr {
            ref payload,
            size,
            error_correction,
            ref foreground,
            ref background,
            copy,
        } => {
            let options = QrOptions {
                size,
                error_correction: ErrorCorrection::from_level(error_correction)
                    .unwrap_or_default(),
                foreground: foreground.clone(),
                background: background.clone(),
            };
            run_qr(&cli, ctx, payload.clone().into(), options, copy).await
        }
        Command::Uuid {
            count,
            uppercase,
            no_hyphens,
            copy,
        } => {
            let options = UuidOptions {
                count,
                uppercase,
                hyphens: !no_hyphens,
            };
            run_uuid(&cli, ctx, options, copy).await
        }
        Command::VideoInfo {
            ref url,
            ref cookies,
        } => run_video_info(&cli, ctx, url, cookies.as_deref()).await,
        Command::Video {
            ref url,
            ref quality,
            ref subtitles,
            ref cookies,
        } => run_video(&cli, ctx, url, quality, subtitles.clone(), cookies.as_deref()).await,
    }
}

// ── Subcommands ──────────────────────────────────────────────────────────────

async fn run_image(
    cli: &Cli,
    ctx: ToolContext,
    input: &Path,
    format: OutputFormat,
    quality: u8,
) -> Result<()> {
    let converter = ImageConverter::new(ctx);
    converter.set_format(format);
    converter.set_quality(quality);
    converter
        .select_file(&PathFileSource::new(input))
        .await
        .with_context(|| format!("Cannot use {:?}", input))?;

    let spinner = spinner(cli, "Converting");
    let result = converter.convert().await;
    spinner.finish_and_clear();
    let result = result.context("Conversion failed")?;

    let filename = converter
        .download()
        .await
        .context("Failed to save converted image")?
        .unwrap_or_default();
    let state = converter.state();

    if cli.json {
        print_json(&json!({
            "file": filename,
            "format": result.format,
            "size": result.size,
            "bytes": result.blob.len(),
            "width": result.dimensions.map(|d| d.0),
            "height": result.dimensions.map(|d| d.1),
            "source_size": state.file_size,
        }))?;
    } else if !cli.quiet {
        let dims = result
            .dimensions
            .map(|(w, h)| format!("{w}×{h}  "))
            .unwrap_or_default();
        eprintln!(
            "{} {}  {}  {}{}",
            green("✔"),
            bold(&filename),
            result.format_label,
            dims,
            dim(&format!("{} → {}", state.file_size, result.size)),
        );
    }
    Ok(())
}

async fn run_pdf(
    cli: &Cli,
    ctx: ToolContext,
    input: &Path,
    format: OutputFormat,
    dpi: u32,
    quality: u8,
) -> Result<()> {
    let converter = PdfConverter::new(ctx);
    converter.set_format(format);
    converter.set_dpi(dpi);
    converter.set_quality(quality);
    converter
        .select_file(&PathFileSource::new(input))
        .await
        .with_context(|| format!("Cannot use {:?}", input))?;

    let spinner = spinner(cli, "Rendering pages");
    let pages = converter.convert().await;
    spinner.finish_and_clear();
    let pages = pages.context("Conversion failed")?;

    let files = converter
        .download_all()
        .await
        .context("Failed to save pages")?;

    if cli.json {
        print_json(&json!({ "count": pages.len(), "files": files }))?;
    } else if !cli.quiet {
        for f in &files {
            eprintln!("  {} {}", green("✓"), f);
        }
        eprintln!(
            "{} {} pages written to {}",
            green("✔"),
            bold(&files.len().to_string()),
            cli.out_dir.display()
        );
    }
    Ok(())
}

async fn run_qr(
    cli: &Cli,
    ctx: ToolContext,
    payload: QrPayload,
    options: QrOptions,
    copy: bool,
) -> Result<()> {
    let generator = QrGenerator::new(ctx);
    generator.set_payload(payload);
    generator.set_options(options);

    let qr = generator.generate().await.context("QR generation failed")?;
    let filename = generator
        .download()
        .await
        .context("Failed to save QR code")?
        .unwrap_or_default();

    let copied = if copy {
        let clipboard = clipboard();
        let outcome = generator
            .copy_to_clipboard(clipboard.as_ref())
            .await
            .context("Copy failed")?;
        if let (CopyOutcome::Unsupported, Some(notice)) = (outcome, generator.state().notice) {
            if !cli.quiet {
                eprintln!("{} {}", cyan("ℹ"), notice);
            }
        }
        outcome == CopyOutcome::Copied
    } else {
        false
    };

    if cli.json {
        print_json(&json!({
            "file": filename,
            "type": qr.payload.kind(),
            "size": qr.size,
            "copied": copied,
        }))?;
    } else if !cli.quiet {
        eprintln!(
            "{} {}  {}{}",
            green("✔"),
            bold(&filename),
            dim(&qr.size),
            if copied { "  (copied)" } else { "" }
        );
    }
    Ok(())
}

async fn run_uuid(cli: &Cli, ctx: ToolContext, options: UuidOptions, copy: bool) -> Result<()> {
    let generator = UuidGenerator::new(ctx);
    generator.set_options(options);
    let uuids = generator.generate().await.context("UUID generation failed")?;

    let mut copied = false;
    if copy {
        let clipboard = clipboard();
        match generator.copy_all(clipboard.as_ref()).await {
            Ok(text) => copied = text.is_some(),
            Err(e) if !cli.quiet => eprintln!("{} {}", cyan("ℹ"), e),
            Err(_) => {}
        }
    }

    if cli.json {
        print_json(&json!({ "uuids": uuids, "count": uuids.len(), "copied": copied }))?;
    } else {
        for u in &uuids {
            println!("{u}");
        }
        if copied && !cli.quiet {
            eprintln!("{} {} copied", green("✔"), uuids.len());
        }
    }
    Ok(())
}

async fn run_video_info(
    cli: &Cli,
    ctx: ToolContext,
    url: &str,
    cookies: Option<&Path>,
) -> Result<()> {
    let downloader = VideoDownloader::new(ctx);
    downloader.set_url(url);
    attach_cookies(&downloader, cookies).await?;

    let spinner = spinner(cli, "Looking up");
    let info = downloader.fetch_info().await;
    spinner.finish_and_clear();
    let info = info.context("Failed to get video info")?;

    if cli.json {
        print_json(&info)?;
        return Ok(());
    }

    println!("Title:       {}", info.title);
    if !info.uploader.is_empty() {
        println!("Uploader:    {}", info.uploader);
    }
    println!("Duration:    {}", info.display_duration());
    println!("Size:        {}", info.display_size());
    let qualities = info.available_qualities();
    if !qualities.is_empty() {
        println!("Qualities:   {}", qualities.join(", "));
    }
    if downloader.state().is_known_platform && cookies.is_none() {
        eprintln!(
            "{} {}",
            cyan("ℹ"),
            dim("If the download is refused, pass a cookies.txt export with --cookies")
        );
    }
    Ok(())
}

async fn run_video(
    cli: &Cli,
    ctx: ToolContext,
    url: &str,
    quality: &str,
    subtitles: Option<String>,
    cookies: Option<&Path>,
) -> Result<()> {
    let downloader = VideoDownloader::new(ctx);
    downloader.set_url(url);
    downloader.select_quality(quality);
    downloader.set_subtitles(subtitles);
    attach_cookies(&downloader, cookies).await?;

    if !cli.quiet && !cli.json {
        downloader.set_progress(CliTransferProgress::new());
    }
    let filename = downloader.download().await.context("Download failed")?;

    if cli.json {
        print_json(&json!({ "file": filename }))?;
    } else if !cli.quiet {
        eprintln!(
            "{} {}  →  {}",
            green("✔"),
            bold(&filename),
            cli.out_dir.display()
        );
    }
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────────────

async fn attach_cookies(downloader: &VideoDownloader, cookies: Option<&Path>) -> Result<()> {
    let Some(path) = cookies else {
        return Ok(());
    };
    let file = PathFileSource::new(path)
        .pick()
        .await
        .with_context(|| format!("Failed to read cookies file {:?}", path))?;
    downloader.set_cookies(file);
    Ok(())
}

fn spinner(cli: &Cli, prefix: &'static str) -> ProgressBar {
    if cli.quiet || cli.json {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS),
    );
    bar.set_prefix(prefix);
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialise output")?
    );
    Ok(())
}

#[cfg(feature = "clipboard")]
fn clipboard() -> Box<dyn ClipboardSink> {
    Box::new(nanotools_client::platform::SystemClipboard)
}

#[cfg(not(feature = "clipboard"))]
fn clipboard() -> Box<dyn ClipboardSink> {
    Box::new(nanotools_client::platform::UnsupportedClipboard)
}
