//! Image format conversion.
//!
//! The picked image (≤ 10 MB) is posted with the target format and quality;
//! the backend answers with the converted image bytes, which become a
//! previewable blob URL and a download named `<stem>_converted.<format>`.

use super::{OutputFormat, ToolContext};
use crate::client::file_part;
use crate::error::ToolError;
use crate::format::{file_stem, format_bytes, format_bytes_with, UNITS_TO_MB, ZERO_BYTES};
use crate::platform::{Blob, BlobUrl, FileSource, PendingFile};
use crate::state::{SingleFlight, StateCell};
use reqwest::multipart::Form;
use tracing::{info, warn};

pub const ENDPOINT: &str = "/api/tools/image/convert";

/// Upload limit enforced before dispatch.
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

pub const TOO_LARGE: &str = "File too large. Maximum size is 10MB.";
pub const NO_FILE: &str = "Please select an image first";
const FALLBACK: &str = "Conversion failed";

/// The outcome of a successful conversion.
#[derive(Debug, Clone)]
pub struct ConvertedImage {
    pub blob: Blob,
    /// Preview address, owned by the controller until replaced.
    pub url: BlobUrl,
    pub format: OutputFormat,
    /// e.g. `WEBP`
    pub format_label: String,
    /// e.g. `48.2 KB`
    pub size: String,
    pub dimensions: Option<(u32, u32)>,
}

#[derive(Debug, Clone)]
pub struct ImageConverterState {
    pub file: Option<PendingFile>,
    pub file_name: String,
    pub file_size: String,
    pub format: OutputFormat,
    pub quality: u8,
    pub converting: bool,
    pub error: Option<String>,
    pub result: Option<ConvertedImage>,
}

impl Default for ImageConverterState {
    fn default() -> Self {
        Self {
            file: None,
            file_name: String::new(),
            file_size: String::new(),
            format: OutputFormat::Jpeg,
            quality: 85,
            converting: false,
            error: None,
            result: None,
        }
    }
}

pub struct ImageConverter {
    ctx: ToolContext,
    flight: SingleFlight,
    state: StateCell<ImageConverterState>,
}

impl ImageConverter {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            flight: SingleFlight::new(),
            state: StateCell::new(ImageConverterState::default()),
        }
    }

    pub fn state(&self) -> ImageConverterState {
        self.state.get()
    }

    pub fn set_format(&self, format: OutputFormat) {
        self.state.update(|s| s.format = format);
    }

    /// Quality is clamped to 1–100.
    pub fn set_quality(&self, quality: u8) {
        self.state.update(|s| s.quality = quality.clamp(1, 100));
    }

    /// Ask `source` for a file and accept it. A cancelled pick changes nothing.
    pub async fn select_file(&self, source: &dyn FileSource) -> Result<(), ToolError> {
        match source.pick().await {
            Ok(Some(file)) => self.accept_file(file),
            Ok(None) => Ok(()),
            Err(e) => Err(self.record(e)),
        }
    }

    /// Validate and store a picked file. A rejected file keeps the previous
    /// selection.
    pub fn accept_file(&self, file: PendingFile) -> Result<(), ToolError> {
        if file.size() > MAX_IMAGE_BYTES {
            warn!("Rejected {} ({} bytes): over limit", file.name, file.size());
            return Err(self.record(ToolError::validation(TOO_LARGE)));
        }

        let previous = self.state.update(|s| {
            s.file_name = file.name.clone();
            s.file_size = format_bytes_with(file.size(), UNITS_TO_MB, ZERO_BYTES);
            s.file = Some(file);
            s.error = None;
            s.result.take()
        });
        self.release(previous);
        Ok(())
    }

    /// Send the selected file for conversion.
    pub async fn convert(&self) -> Result<ConvertedImage, ToolError> {
        let _flight = self.flight.begin()?;

        let snapshot = self.state.get();
        let Some(file) = snapshot.file else {
            return Err(self.record(ToolError::validation(NO_FILE)));
        };

        let previous = self.state.update(|s| {
            s.converting = true;
            s.error = None;
            s.result.take()
        });
        self.release(previous);

        let outcome = self.request(&file, snapshot.format, snapshot.quality).await;

        self.state.update(|s| {
            s.converting = false;
            match &outcome {
                Ok(result) => s.result = Some(result.clone()),
                Err(e) => s.error = Some(e.user_message()),
            }
        });
        outcome
    }

    async fn request(
        &self,
        file: &PendingFile,
        format: OutputFormat,
        quality: u8,
    ) -> Result<ConvertedImage, ToolError> {
        info!("Converting {} to {} (quality {})", file.name, format, quality);
        let form = Form::new()
            .part("image", file_part(file)?)
            .text("format", format.as_str())
            .text("quality", quality.to_string());

        let blob = self.ctx.client.post_form_blob(ENDPOINT, form, FALLBACK).await?;
        let url = self.ctx.urls.create(&blob);

        Ok(ConvertedImage {
            format,
            format_label: format.label(),
            size: format_bytes(blob.len() as u64),
            dimensions: blob.dimensions(),
            url,
            blob,
        })
    }

    /// Suggested name for the current result.
    pub fn download_name(&self) -> Option<String> {
        let s = self.state.get();
        s.result
            .map(|r| format!("{}_converted.{}", file_stem(&s.file_name), r.format.as_str()))
    }

    /// Save the converted image. `Ok(None)` when there is nothing to save.
    pub async fn download(&self) -> Result<Option<String>, ToolError> {
        let (Some(result), Some(filename)) = (self.state.get().result, self.download_name()) else {
            return Ok(None);
        };
        self.ctx
            .save_blob(&result.blob, &filename)
            .await
            .map_err(|e| self.record(e))?;
        Ok(Some(filename))
    }

    /// Forget the file and result, releasing the preview.
    pub fn reset(&self) {
        let previous = self.state.update(|s| {
            let result = s.result.take();
            *s = ImageConverterState {
                format: s.format,
                quality: s.quality,
                ..ImageConverterState::default()
            };
            result
        });
        self.release(previous);
    }

    fn release(&self, result: Option<ConvertedImage>) {
        if let Some(r) = result {
            self.ctx.urls.revoke(&r.url);
        }
    }

    fn record(&self, e: ToolError) -> ToolError {
        self.state.update(|s| s.error = Some(e.user_message()));
        e
    }
}

impl Drop for ImageConverter {
    fn drop(&mut self) {
        let previous = self.state.update(|s| s.result.take());
        self.release(previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::offline_context;

    #[test]
    fn oversize_file_is_rejected_and_previous_kept() {
        let (ctx, _, _) = offline_context();
        let conv = ImageConverter::new(ctx);
        conv.accept_file(PendingFile::new("ok.png", "image/png", vec![0u8; 2048]))
            .unwrap();

        let big = PendingFile::new("big.png", "image/png", vec![0u8; (MAX_IMAGE_BYTES + 1) as usize]);
        let err = conv.accept_file(big).unwrap_err();
        assert_eq!(err.to_string(), TOO_LARGE);

        let s = conv.state();
        assert_eq!(s.error.as_deref(), Some(TOO_LARGE));
        assert_eq!(s.file_name, "ok.png");
        assert_eq!(s.file_size, "2 KB");
    }

    #[test]
    fn exactly_ten_megabytes_is_accepted() {
        let (ctx, _, _) = offline_context();
        let conv = ImageConverter::new(ctx);
        let file = PendingFile::new("edge.jpg", "image/jpeg", vec![0u8; MAX_IMAGE_BYTES as usize]);
        conv.accept_file(file).unwrap();
        assert_eq!(conv.state().file_size, "10 MB");
    }

    #[tokio::test]
    async fn convert_without_file_fails_before_dispatch() {
        let (ctx, _, _) = offline_context();
        let conv = ImageConverter::new(ctx);
        let err = conv.convert().await.unwrap_err();
        assert_eq!(err.to_string(), NO_FILE);
        assert!(!conv.state().converting);
    }

    #[tokio::test]
    async fn download_without_result_is_noop() {
        let (ctx, _, downloads) = offline_context();
        let conv = ImageConverter::new(ctx);
        assert_eq!(conv.download().await.unwrap(), None);
        assert!(downloads.delivered().is_empty());
    }

    #[test]
    fn quality_is_clamped() {
        let (ctx, _, _) = offline_context();
        let conv = ImageConverter::new(ctx);
        conv.set_quality(0);
        assert_eq!(conv.state().quality, 1);
        conv.set_quality(200);
        assert_eq!(conv.state().quality, 100);
    }
}
