//! # nanotools-client
//!
//! Client-side controllers for a small web toolkit: image conversion, PDF to
//! page images, QR codes, UUIDs and video downloads.
//!
//! ## Why this crate?
//!
//! The heavy lifting (transcoding, rasterising, encoding) happens on the
//! backend. What is left on the client is easy to get subtly wrong: size
//! limits checked before upload, error bodies surfaced verbatim, download
//! names derived from the right inputs, object URLs released, "copied"
//! badges that reset themselves. This crate does exactly that part, with the
//! platform (file picker, clipboard, downloads) behind small traits.
//!
//! ## Flow
//!
//! ```text
//! FileSource / form
//!  │
//!  ├─ 1. Validate  size and type limits, required fields (no I/O)
//!  ├─ 2. Dispatch  multipart POST or GET through ApiClient
//!  ├─ 3. Interpret binary blob, base64 page list or JSON descriptor
//!  └─ 4. Present   preview URL, DownloadSink, ClipboardSink
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nanotools_client::platform::{MemoryBlobUrls, DirectoryDownloads, PathFileSource};
//! use nanotools_client::tools::image::ImageConverter;
//! use nanotools_client::{ApiClient, ClientConfig, OutputFormat, ToolContext};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ApiClient::new(ClientConfig::from_env()?)?;
//!     let ctx = ToolContext::new(
//!         client,
//!         Arc::new(MemoryBlobUrls::new()),
//!         Arc::new(DirectoryDownloads::new(".")),
//!     );
//!
//!     let converter = ImageConverter::new(ctx);
//!     converter.select_file(&PathFileSource::new("photo.png")).await?;
//!     converter.set_format(OutputFormat::Webp);
//!     let result = converter.convert().await?;
//!     eprintln!("{} {}", result.format_label, result.size);
//!     converter.download().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `nanotools` binary (clap + anyhow + indicatif + tracing-subscriber) |
//! | `clipboard` | off | `SystemClipboard` backed by arboard |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! nanotools-client = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod platform;
pub mod progress;
pub mod state;
pub mod tools;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::ApiClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::ToolError;
pub use format::{format_bytes, format_duration, format_size};
pub use progress::{NoopProgress, ProgressCallback, TransferProgress};
pub use tools::{OutputFormat, ToolContext};
