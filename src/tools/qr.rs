//! QR code generation.
//!
//! Three payload kinds share one endpoint; the `type` form field selects how
//! the backend encodes the remaining fields:
//!
//! | Kind | `type` | Fields | Download name |
//! |------|--------|--------|---------------|
//! | Text | `text` | `content` | `qr-code.png` |
//! | Wi-Fi | `wifi` | `ssid`, `password`, `encryption` | `wifi-<ssid>.png` |
//! | Contact | `vcard` | `name`, `phone`, `email` | `contact-<name>.png` |

use super::ToolContext;
use crate::error::ToolError;
use crate::format::format_bytes;
use crate::platform::{Blob, BlobUrl, ClipboardError, ClipboardSink};
use crate::state::{CopyFeedback, SingleFlight, StateCell};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const ENDPOINT: &str = "/api/tools/qr/generate";

pub const EMPTY_TEXT: &str = "Please enter content to encode";
pub const EMPTY_SSID: &str = "Please enter Wi-Fi network name";
pub const EMPTY_NAME: &str = "Please enter at least a name";
pub const COPY_FAILED: &str = "Failed to copy to clipboard";
pub const COPY_UNSUPPORTED: &str =
    "Copying images is not supported here. Download the QR code or copy the image manually.";
const FALLBACK: &str = "Failed to generate QR code";

pub const MIN_SIZE: u32 = 64;
pub const DEFAULT_SIZE: u32 = 512;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

// ── Payload ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WifiEncryption {
    #[default]
    #[serde(rename = "WPA")]
    Wpa,
    #[serde(rename = "WEP")]
    Wep,
    #[serde(rename = "nopass")]
    NoPass,
}

impl WifiEncryption {
    pub fn as_str(&self) -> &'static str {
        match self {
            WifiEncryption::Wpa => "WPA",
            WifiEncryption::Wep => "WEP",
            WifiEncryption::NoPass => "nopass",
        }
    }
}

impl std::str::FromStr for WifiEncryption {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wpa" | "wpa2" => Ok(WifiEncryption::Wpa),
            "wep" => Ok(WifiEncryption::Wep),
            "nopass" | "none" | "open" => Ok(WifiEncryption::NoPass),
            other => Err(ToolError::validation(format!("Unknown encryption: {other}"))),
        }
    }
}

/// What the QR code encodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QrPayload {
    Text {
        content: String,
    },
    Wifi {
        ssid: String,
        password: String,
        #[serde(default)]
        encryption: WifiEncryption,
    },
    #[serde(rename = "vcard")]
    Contact {
        name: String,
        phone: String,
        email: String,
    },
}

impl Default for QrPayload {
    fn default() -> Self {
        QrPayload::Text {
            content: String::new(),
        }
    }
}

impl QrPayload {
    /// Value of the `type` form field.
    pub fn kind(&self) -> &'static str {
        match self {
            QrPayload::Text { .. } => "text",
            QrPayload::Wifi { .. } => "wifi",
            QrPayload::Contact { .. } => "vcard",
        }
    }

    pub fn validate(&self) -> Result<(), ToolError> {
        let missing = match self {
            QrPayload::Text { content } if content.is_empty() => EMPTY_TEXT,
            QrPayload::Wifi { ssid, .. } if ssid.is_empty() => EMPTY_SSID,
            QrPayload::Contact { name, .. } if name.is_empty() => EMPTY_NAME,
            _ => return Ok(()),
        };
        Err(ToolError::validation(missing))
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            QrPayload::Text { content } => vec![("content", content.clone())],
            QrPayload::Wifi {
                ssid,
                password,
                encryption,
            } => vec![
                ("ssid", ssid.clone()),
                ("password", password.clone()),
                ("encryption", encryption.as_str().to_string()),
            ],
            QrPayload::Contact { name, phone, email } => vec![
                ("name", name.clone()),
                ("phone", phone.clone()),
                ("email", email.clone()),
            ],
        }
    }

    /// Download name for a code generated from this payload.
    pub fn filename(&self) -> String {
        match self {
            QrPayload::Wifi { ssid, .. } => format!("wifi-{ssid}.png"),
            QrPayload::Contact { name, .. } => {
                format!("contact-{}.png", WHITESPACE.replace_all(name, "-"))
            }
            QrPayload::Text { .. } => "qr-code.png".to_string(),
        }
    }
}

// ── Rendering options ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorCorrection {
    Low = 0,
    #[default]
    Medium = 1,
    High = 2,
    Highest = 3,
}

impl ErrorCorrection {
    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(ErrorCorrection::Low),
            1 => Some(ErrorCorrection::Medium),
            2 => Some(ErrorCorrection::High),
            3 => Some(ErrorCorrection::Highest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrOptions {
    pub size: u32,
    pub error_correction: ErrorCorrection,
    /// `#rrggbb`
    pub foreground: String,
    /// `#rrggbb`
    pub background: String,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            size: DEFAULT_SIZE,
            error_correction: ErrorCorrection::Medium,
            foreground: "#000000".to_string(),
            background: "#ffffff".to_string(),
        }
    }
}

// ── Controller ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GeneratedQr {
    pub blob: Blob,
    pub url: BlobUrl,
    pub size: String,
    /// The payload this code encodes; later form edits do not affect it.
    pub payload: QrPayload,
}

/// Outcome of a copy attempt that did not fail outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    /// The clipboard cannot take images; a notice was set instead.
    Unsupported,
    NothingToCopy,
}

#[derive(Debug, Clone, Default)]
pub struct QrGeneratorState {
    pub payload: QrPayload,
    pub options: QrOptions,
    pub generating: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub copied: bool,
    pub result: Option<GeneratedQr>,
}

pub struct QrGenerator {
    ctx: ToolContext,
    flight: SingleFlight,
    feedback: CopyFeedback<()>,
    state: StateCell<QrGeneratorState>,
}

impl QrGenerator {
    pub fn new(ctx: ToolContext) -> Self {
        let hold = ctx.client.config().copy_feedback();
        Self {
            ctx,
            flight: SingleFlight::new(),
            feedback: CopyFeedback::new(hold),
            state: StateCell::new(QrGeneratorState::default()),
        }
    }

    pub fn state(&self) -> QrGeneratorState {
        let mut s = self.state.get();
        s.copied = self.feedback.is_marked(&());
        s
    }

    pub fn set_payload(&self, payload: QrPayload) {
        self.state.update(|s| s.payload = payload);
    }

    /// Size is raised to the 64 px minimum.
    pub fn set_options(&self, mut options: QrOptions) {
        options.size = options.size.max(MIN_SIZE);
        self.state.update(|s| s.options = options);
    }

    pub async fn generate(&self) -> Result<GeneratedQr, ToolError> {
        let _flight = self.flight.begin()?;

        self.feedback.clear();
        let (snapshot, previous) = self.state.update(|s| {
            s.error = None;
            s.notice = None;
            (s.clone(), s.result.take())
        });
        self.release(previous);

        if let Err(e) = snapshot.payload.validate() {
            return Err(self.record(e));
        }

        self.state.update(|s| s.generating = true);
        let outcome = self.request(&snapshot.payload, &snapshot.options).await;

        self.state.update(|s| {
            s.generating = false;
            match &outcome {
                Ok(qr) => s.result = Some(qr.clone()),
                Err(e) => s.error = Some(e.user_message()),
            }
        });
        outcome
    }

    async fn request(&self, payload: &QrPayload, options: &QrOptions) -> Result<GeneratedQr, ToolError> {
        info!("Generating {} QR code ({} px)", payload.kind(), options.size);
        let mut form = Form::new()
            .text("type", payload.kind())
            .text("size", options.size.max(MIN_SIZE).to_string())
            .text("error_correction", options.error_correction.level().to_string())
            .text("foreground_color", options.foreground.clone())
            .text("background_color", options.background.clone());
        for (name, value) in payload.fields() {
            form = form.text(name, value);
        }

        let blob = self.ctx.client.post_form_blob(ENDPOINT, form, FALLBACK).await?;
        let url = self.ctx.urls.create(&blob);
        Ok(GeneratedQr {
            size: format_bytes(blob.len() as u64),
            payload: payload.clone(),
            url,
            blob,
        })
    }

    pub fn filename(&self) -> Option<String> {
        self.state.get().result.map(|r| r.payload.filename())
    }

    pub async fn download(&self) -> Result<Option<String>, ToolError> {
        let Some(result) = self.state.get().result else {
            return Ok(None);
        };
        let filename = result.payload.filename();
        self.ctx
            .save_blob(&result.blob, &filename)
            .await
            .map_err(|e| self.record(e))?;
        Ok(Some(filename))
    }

    /// Put the PNG on the clipboard and mark the copied indicator.
    pub async fn copy_to_clipboard(&self, clipboard: &dyn ClipboardSink) -> Result<CopyOutcome, ToolError> {
        let Some(result) = self.state.get().result else {
            return Ok(CopyOutcome::NothingToCopy);
        };

        match clipboard.write_image(&result.blob).await {
            Ok(()) => {
                self.feedback.mark(());
                Ok(CopyOutcome::Copied)
            }
            Err(ClipboardError::Unsupported(what)) => {
                info!("Clipboard does not take {}", what);
                self.state.update(|s| s.notice = Some(COPY_UNSUPPORTED.to_string()));
                Ok(CopyOutcome::Unsupported)
            }
            Err(ClipboardError::Failed(reason)) => {
                warn!("Copying QR code failed: {}", reason);
                Err(self.record(ToolError::Clipboard(COPY_FAILED.to_string())))
            }
        }
    }

    pub fn reset(&self) {
        self.feedback.clear();
        let previous = self.state.update(|s| std::mem::take(s).result);
        self.release(previous);
    }

    fn release(&self, result: Option<GeneratedQr>) {
        if let Some(r) = result {
            self.ctx.urls.revoke(&r.url);
        }
    }

    fn record(&self, e: ToolError) -> ToolError {
        self.state.update(|s| s.error = Some(e.user_message()));
        e
    }
}

impl Drop for QrGenerator {
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
    fn filenames_follow_payload_kind() {
        let wifi = QrPayload::Wifi {
            ssid: "Cafe".into(),
            password: "pw".into(),
            encryption: WifiEncryption::Wpa,
        };
        assert_eq!(wifi.filename(), "wifi-Cafe.png");

        let contact = QrPayload::Contact {
            name: "Ada  King\tLovelace".into(),
            phone: String::new(),
            email: String::new(),
        };
        assert_eq!(contact.filename(), "contact-Ada-King-Lovelace.png");

        assert_eq!(QrPayload::default().filename(), "qr-code.png");
    }

    #[test]
    fn validation_messages() {
        let cases = [
            (QrPayload::default(), EMPTY_TEXT),
            (
                QrPayload::Wifi {
                    ssid: String::new(),
                    password: "x".into(),
                    encryption: WifiEncryption::NoPass,
                },
                EMPTY_SSID,
            ),
            (
                QrPayload::Contact {
                    name: String::new(),
                    phone: "123".into(),
                    email: String::new(),
                },
                EMPTY_NAME,
            ),
        ];
        for (payload, msg) in cases {
            assert_eq!(payload.validate().unwrap_err().to_string(), msg);
        }
    }

    #[test]
    fn whitespace_only_values_are_accepted() {
        let text = QrPayload::Text { content: "   ".into() };
        assert!(text.validate().is_ok());
        let wifi = QrPayload::Wifi {
            ssid: " ".into(),
            password: String::new(),
            encryption: WifiEncryption::NoPass,
        };
        assert!(wifi.validate().is_ok());
    }

    #[test]
    fn kinds_and_fields() {
        let wifi = QrPayload::Wifi {
            ssid: "Net".into(),
            password: "secret".into(),
            encryption: WifiEncryption::Wep,
        };
        assert_eq!(wifi.kind(), "wifi");
        assert_eq!(
            wifi.fields(),
            vec![
                ("ssid", "Net".to_string()),
                ("password", "secret".to_string()),
                ("encryption", "WEP".to_string()),
            ]
        );
        assert_eq!(
            QrPayload::Contact {
                name: "a".into(),
                phone: String::new(),
                email: String::new()
            }
            .kind(),
            "vcard"
        );
    }

    #[test]
    fn error_correction_levels() {
        assert_eq!(ErrorCorrection::default().level(), 1);
        assert_eq!(ErrorCorrection::from_level(3), Some(ErrorCorrection::Highest));
        assert_eq!(ErrorCorrection::from_level(4), None);
    }

    #[test]
    fn size_has_a_floor() {
        let (ctx, _, _) = offline_context();
        let qr = QrGenerator::new(ctx);
        qr.set_options(QrOptions {
            size: 10,
            ..QrOptions::default()
        });
        assert_eq!(qr.state().options.size, MIN_SIZE);
    }

    #[tokio::test]
    async fn empty_ssid_never_dispatches() {
        let (ctx, _, _) = offline_context();
        let qr = QrGenerator::new(ctx);
        qr.set_payload(QrPayload::Wifi {
            ssid: String::new(),
            password: String::new(),
            encryption: WifiEncryption::Wpa,
        });
        let err = qr.generate().await.unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
        let s = qr.state();
        assert_eq!(s.error.as_deref(), Some(EMPTY_SSID));
        assert!(!s.generating);
    }

    #[tokio::test]
    async fn copy_without_result_is_noop() {
        let (ctx, _, _) = offline_context();
        let qr = QrGenerator::new(ctx);
        let clip = crate::platform::MemoryClipboard::new();
        assert_eq!(qr.copy_to_clipboard(&clip).await.unwrap(), CopyOutcome::NothingToCopy);
        assert_eq!(clip.image_count(), 0);
    }
}
