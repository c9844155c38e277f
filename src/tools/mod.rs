//! Tool controllers.
//!
//! Each submodule owns one page section of the toolkit and repeats the same
//! interaction shape with its own payload and response:
//!
//! ```text
//! capture ──▶ validate ──▶ dispatch ──▶ interpret ──▶ present
//! (file/form)  (no I/O)    (HTTP)      (blob/JSON)   (preview/save/copy)
//! ```
//!
//! 1. [`image`] — image format conversion, binary response
//! 2. [`pdf`]   — PDF pages to images, JSON list of base64 pages
//! 3. [`qr`]    — QR codes for text, Wi-Fi credentials or contact cards
//! 4. [`uuid`]  — bulk UUID generation with copy feedback
//! 5. [`video`] — video metadata lookup and streamed download
//!
//! Controllers never share state. Each is built from a [`ToolContext`]
//! holding the HTTP client and the platform capabilities.

pub mod image;
pub mod pdf;
pub mod qr;
pub mod uuid;
pub mod video;

use crate::client::ApiClient;
use crate::error::ToolError;
use crate::platform::{blob, Blob, BlobUrlAllocator, DownloadRequest, DownloadSink};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// What every controller needs from its surroundings.
#[derive(Clone)]
pub struct ToolContext {
    pub client: ApiClient,
    pub urls: Arc<dyn BlobUrlAllocator>,
    pub downloads: Arc<dyn DownloadSink>,
}

impl ToolContext {
    pub fn new(
        client: ApiClient,
        urls: Arc<dyn BlobUrlAllocator>,
        downloads: Arc<dyn DownloadSink>,
    ) -> Self {
        Self {
            client,
            urls,
            downloads,
        }
    }

    /// Save `blob` under `filename` through a fresh blob URL, released
    /// shortly after the save was handed off.
    pub(crate) async fn save_blob(&self, blob: &Blob, filename: &str) -> Result<(), ToolError> {
        let url = self.urls.create(blob);
        let delivered = self
            .downloads
            .deliver(DownloadRequest {
                href: url.as_str(),
                filename,
                bytes: blob.bytes(),
            })
            .await;

        match delivered {
            Ok(()) => {
                blob::release_after(
                    Arc::clone(&self.urls),
                    url,
                    self.client.config().release_delay(),
                );
                Ok(())
            }
            Err(e) => {
                warn!("Saving {} failed: {}", filename, e);
                self.urls.revoke(&url);
                Err(e)
            }
        }
    }
}

/// Raster formats the conversion endpoints produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}

impl OutputFormat {
    /// Form value and file extension.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    /// Upper-case label for display (`JPEG`).
    pub fn label(&self) -> String {
        self.as_str().to_uppercase()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(ToolError::validation(format!("Unsupported output format: {other}"))),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::ClientConfig;
    use crate::platform::{MemoryBlobUrls, RecordingDownloads};

    /// A context pointing at a closed port; only usable for actions that
    /// fail before dispatch.
    pub fn offline_context() -> (ToolContext, Arc<MemoryBlobUrls>, Arc<RecordingDownloads>) {
        let config = ClientConfig::builder()
            .base_url("http://127.0.0.1:9")
            .build()
            .expect("valid config");
        let client = ApiClient::new(config).expect("client");
        let urls = Arc::new(MemoryBlobUrls::new());
        let downloads = Arc::new(RecordingDownloads::new());
        let ctx = ToolContext::new(client, urls.clone(), downloads.clone());
        (ctx, urls, downloads)
    }
}
