//! PDF to page images.
//!
//! The backend rasterises every page and answers with a JSON list of
//! base64-encoded images. Pages are shown through `data:` URLs and saved
//! as `<basename>_page_<N>.<format>`.

use super::{OutputFormat, ToolContext};
use crate::client::file_part;
use crate::error::ToolError;
use crate::format::{format_bytes_with, UNITS_TO_GB, ZERO_BYTES};
use crate::platform::{DownloadRequest, FileSource, PendingFile};
use crate::state::{SingleFlight, StateCell};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const ENDPOINT: &str = "/api/tools/pdf/to-images";

pub const MAX_PDF_BYTES: u64 = 50 * 1024 * 1024;

pub const NOT_A_PDF: &str = "Please upload a valid PDF file.";
pub const TOO_LARGE: &str = "File too large. Maximum size is 50MB.";
pub const NO_FILE: &str = "Please select a PDF file first";
const FALLBACK: &str = "Conversion failed";

pub const MIN_DPI: u32 = 72;
pub const MAX_DPI: u32 = 600;
pub const DEFAULT_DPI: u32 = 150;

/// One rendered page as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImage {
    #[serde(rename = "PageNumber")]
    pub page_number: u32,
    #[serde(rename = "Format")]
    pub format: String,
    /// Base64 (standard alphabet) image bytes.
    #[serde(rename = "ImageData")]
    pub image_data: String,
}

impl PageImage {
    pub fn data_url(&self) -> String {
        format!("data:image/{};base64,{}", self.format, self.image_data)
    }

    pub fn decode(&self) -> Result<Vec<u8>, ToolError> {
        STANDARD.decode(self.image_data.trim()).map_err(|e| {
            warn!("Page {} carries invalid base64: {}", self.page_number, e);
            ToolError::InvalidResponse
        })
    }
}

#[derive(Debug, Deserialize)]
struct ConvertResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    images: Option<Vec<PageImage>>,
}

#[derive(Debug, Clone)]
pub struct PdfConverterState {
    pub file: Option<PendingFile>,
    pub file_name: String,
    pub file_size: String,
    pub format: OutputFormat,
    pub dpi: u32,
    pub quality: u8,
    pub converting: bool,
    pub error: Option<String>,
    pub pages: Vec<PageImage>,
}

impl Default for PdfConverterState {
    fn default() -> Self {
        Self {
            file: None,
            file_name: String::new(),
            file_size: String::new(),
            format: OutputFormat::Jpeg,
            dpi: DEFAULT_DPI,
            quality: 85,
            converting: false,
            error: None,
            pages: Vec::new(),
        }
    }
}

pub struct PdfConverter {
    ctx: ToolContext,
    flight: SingleFlight,
    state: StateCell<PdfConverterState>,
}

impl PdfConverter {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            flight: SingleFlight::new(),
            state: StateCell::new(PdfConverterState::default()),
        }
    }

    pub fn state(&self) -> PdfConverterState {
        self.state.get()
    }

    pub fn set_format(&self, format: OutputFormat) {
        self.state.update(|s| s.format = format);
    }

    pub fn set_dpi(&self, dpi: u32) {
        self.state.update(|s| s.dpi = dpi.clamp(MIN_DPI, MAX_DPI));
    }

    pub fn set_quality(&self, quality: u8) {
        self.state.update(|s| s.quality = quality.clamp(1, 100));
    }

    pub async fn select_file(&self, source: &dyn FileSource) -> Result<(), ToolError> {
        match source.pick().await {
            Ok(Some(file)) => self.accept_file(file),
            Ok(None) => Ok(()),
            Err(e) => Err(self.record(e)),
        }
    }

    /// The type check runs before the size check.
    pub fn accept_file(&self, file: PendingFile) -> Result<(), ToolError> {
        if file.mime != "application/pdf" {
            warn!("Rejected {}: type '{}'", file.name, file.mime);
            return Err(self.record(ToolError::validation(NOT_A_PDF)));
        }
        if file.size() > MAX_PDF_BYTES {
            warn!("Rejected {} ({} bytes): over limit", file.name, file.size());
            return Err(self.record(ToolError::validation(TOO_LARGE)));
        }

        self.state.update(|s| {
            s.file_name = file.name.clone();
            s.file_size = format_bytes_with(file.size(), UNITS_TO_GB, ZERO_BYTES);
            s.file = Some(file);
            s.error = None;
            s.pages.clear();
        });
        Ok(())
    }

    pub async fn convert(&self) -> Result<Vec<PageImage>, ToolError> {
        let _flight = self.flight.begin()?;

        let snapshot = self.state.get();
        let Some(file) = &snapshot.file else {
            return Err(self.record(ToolError::validation(NO_FILE)));
        };

        self.state.update(|s| {
            s.converting = true;
            s.error = None;
            s.pages.clear();
        });

        let outcome = self.request(file, &snapshot).await;

        self.state.update(|s| {
            s.converting = false;
            match &outcome {
                Ok(pages) => s.pages = pages.clone(),
                Err(e) => s.error = Some(e.user_message()),
            }
        });
        outcome
    }

    async fn request(
        &self,
        file: &PendingFile,
        options: &PdfConverterState,
    ) -> Result<Vec<PageImage>, ToolError> {
        info!(
            "Converting {} to {} pages at {} dpi",
            file.name, options.format, options.dpi
        );
        let form = Form::new()
            .part("pdf", file_part(file)?)
            .text("format", options.format.as_str())
            .text("dpi", options.dpi.to_string())
            .text("quality", options.quality.to_string());

        let response: ConvertResponse = self
            .ctx
            .client
            .post_form_json(ENDPOINT, form, FALLBACK)
            .await?;

        match response {
            ConvertResponse {
                success: true,
                images: Some(images),
                count,
            } => {
                debug!("Received {} pages (reported {:?})", images.len(), count);
                Ok(images)
            }
            _ => Err(ToolError::InvalidResponse),
        }
    }

    /// `<basename>_page_<N>.<format>`, basename without a trailing `.pdf`.
    pub fn page_filename(&self, page: &PageImage) -> String {
        page_filename(&self.state.get().file_name, page)
    }

    pub async fn download_page(&self, index: usize) -> Result<String, ToolError> {
        let state = self.state.get();
        let page = state
            .pages
            .get(index)
            .ok_or_else(|| self.record(ToolError::NotFound(index)))?;
        self.save_page(&state.file_name, page).await
    }

    /// Save every page in order.
    pub async fn download_all(&self) -> Result<Vec<String>, ToolError> {
        let state = self.state.get();
        let mut saved = Vec::with_capacity(state.pages.len());
        for page in &state.pages {
            saved.push(self.save_page(&state.file_name, page).await?);
        }
        Ok(saved)
    }

    async fn save_page(&self, file_name: &str, page: &PageImage) -> Result<String, ToolError> {
        let filename = page_filename(file_name, page);
        let bytes = page.decode().map_err(|e| self.record(e))?;
        let href = page.data_url();
        self.ctx
            .downloads
            .deliver(DownloadRequest {
                href: &href,
                filename: &filename,
                bytes: &bytes,
            })
            .await
            .map_err(|e| self.record(e))?;
        Ok(filename)
    }

    pub fn reset(&self) {
        self.state.update(|s| {
            *s = PdfConverterState {
                format: s.format,
                dpi: s.dpi,
                quality: s.quality,
                ..PdfConverterState::default()
            }
        });
    }

    fn record(&self, e: ToolError) -> ToolError {
        self.state.update(|s| s.error = Some(e.user_message()));
        e
    }
}

fn page_filename(file_name: &str, page: &PageImage) -> String {
    let base = match file_name.len().checked_sub(4) {
        Some(cut) if file_name.is_char_boundary(cut) && file_name[cut..].eq_ignore_ascii_case(".pdf") => {
            &file_name[..cut]
        }
        _ => file_name,
    };
    format!("{}_page_{}.{}", base, page.page_number, page.format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::offline_context;

    fn page(n: u32, data: &str) -> PageImage {
        PageImage {
            page_number: n,
            format: "jpeg".into(),
            image_data: data.into(),
        }
    }

    #[test]
    fn filename_strips_pdf_case_insensitively() {
        assert_eq!(page_filename("report.PDF", &page(2, "")), "report_page_2.jpeg");
        assert_eq!(page_filename("report.pdf", &page(1, "")), "report_page_1.jpeg");
        assert_eq!(page_filename("scan.tiff", &page(1, "")), "scan.tiff_page_1.jpeg");
    }

    #[test]
    fn data_url_uses_page_format() {
        let p = PageImage {
            page_number: 1,
            format: "png".into(),
            image_data: "AAEC".into(),
        };
        assert_eq!(p.data_url(), "data:image/png;base64,AAEC");
        assert_eq!(p.decode().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn bad_base64_is_invalid_response() {
        assert!(matches!(page(1, "%%%").decode(), Err(ToolError::InvalidResponse)));
    }

    #[test]
    fn wrong_type_is_checked_before_size() {
        let (ctx, _, _) = offline_context();
        let conv = PdfConverter::new(ctx);
        let huge_text = PendingFile::new("a.txt", "text/plain", vec![0u8; (MAX_PDF_BYTES + 1) as usize]);
        let err = conv.accept_file(huge_text).unwrap_err();
        assert_eq!(err.to_string(), NOT_A_PDF);

        let huge_pdf = PendingFile::new("a.pdf", "application/pdf", vec![0u8; (MAX_PDF_BYTES + 1) as usize]);
        let err = conv.accept_file(huge_pdf).unwrap_err();
        assert_eq!(err.to_string(), TOO_LARGE);
        assert!(conv.state().file.is_none());
    }

    #[test]
    fn dpi_is_clamped() {
        let (ctx, _, _) = offline_context();
        let conv = PdfConverter::new(ctx);
        conv.set_dpi(10);
        assert_eq!(conv.state().dpi, MIN_DPI);
        conv.set_dpi(9000);
        assert_eq!(conv.state().dpi, MAX_DPI);
    }

    #[test]
    fn response_shape() {
        let ok: ConvertResponse = serde_json::from_str(
            r#"{"success":true,"count":1,"images":[{"PageNumber":1,"Format":"png","ImageData":"AA=="}]}"#,
        )
        .unwrap();
        assert_eq!(ok.images.unwrap()[0].page_number, 1);

        let missing: ConvertResponse = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(missing.images.is_none());
    }

    #[tokio::test]
    async fn unknown_page_index() {
        let (ctx, _, _) = offline_context();
        let conv = PdfConverter::new(ctx);
        assert!(matches!(conv.download_page(3).await, Err(ToolError::NotFound(3))));
        assert_eq!(conv.state().error.as_deref(), Some("No result at position 3"));
    }

    #[tokio::test]
    async fn convert_without_file() {
        let (ctx, _, _) = offline_context();
        let conv = PdfConverter::new(ctx);
        assert_eq!(conv.convert().await.unwrap_err().to_string(), NO_FILE);
    }
}
