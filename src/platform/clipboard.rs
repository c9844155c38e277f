//! Clipboard writes.
//!
//! Not every platform accepts images on the clipboard. Implementations report
//! that case as [`ClipboardError::Unsupported`] so tools can show a notice
//! instead of an error.

use super::blob::Blob;
use async_trait::async_trait;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClipboardError {
    /// The clipboard cannot hold this kind of content.
    #[error("clipboard does not support {0}")]
    Unsupported(&'static str),

    /// The write was attempted and failed.
    #[error("clipboard write failed: {0}")]
    Failed(String),
}

/// Destination for copy actions.
#[async_trait]
pub trait ClipboardSink: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError>;

    async fn write_image(&self, image: &Blob) -> Result<(), ClipboardError>;
}

/// A clipboard that accepts nothing.
pub struct UnsupportedClipboard;

#[async_trait]
impl ClipboardSink for UnsupportedClipboard {
    async fn write_text(&self, _text: &str) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unsupported("text"))
    }

    async fn write_image(&self, _image: &Blob) -> Result<(), ClipboardError> {
        Err(ClipboardError::Unsupported("images"))
    }
}

/// Records writes in memory. Image support can be switched off to model a
/// text-only clipboard.
pub struct MemoryClipboard {
    accepts_images: bool,
    texts: Mutex<Vec<String>>,
    images: Mutex<Vec<Blob>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self {
            accepts_images: true,
            texts: Mutex::new(Vec::new()),
            images: Mutex::new(Vec::new()),
        }
    }

    pub fn text_only() -> Self {
        Self {
            accepts_images: false,
            ..Self::new()
        }
    }

    /// The most recent text written.
    pub fn last_text(&self) -> Option<String> {
        self.texts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    pub fn image_count(&self) -> usize {
        self.images.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for MemoryClipboard {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClipboardSink for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.texts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        Ok(())
    }

    async fn write_image(&self, image: &Blob) -> Result<(), ClipboardError> {
        if !self.accepts_images {
            return Err(ClipboardError::Unsupported("images"));
        }
        self.images
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(image.clone());
        Ok(())
    }
}

/// The operating-system clipboard.
#[cfg(feature = "clipboard")]
pub struct SystemClipboard;

#[cfg(feature = "clipboard")]
impl SystemClipboard {
    fn map_err(e: arboard::Error, kind: &'static str) -> ClipboardError {
        match e {
            arboard::Error::ClipboardNotSupported => ClipboardError::Unsupported(kind),
            other => ClipboardError::Failed(other.to_string()),
        }
    }
}

#[cfg(feature = "clipboard")]
#[async_trait]
impl ClipboardSink for SystemClipboard {
    async fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let text = text.to_string();
        tokio::task::spawn_blocking(move || {
            let mut cb = arboard::Clipboard::new().map_err(|e| Self::map_err(e, "text"))?;
            cb.set_text(text).map_err(|e| Self::map_err(e, "text"))
        })
        .await
        .map_err(|e| ClipboardError::Failed(e.to_string()))?
    }

    async fn write_image(&self, image: &Blob) -> Result<(), ClipboardError> {
        let bytes = image.bytes().clone();
        tokio::task::spawn_blocking(move || {
            let rgba = image::load_from_memory(&bytes)
                .map_err(|e| ClipboardError::Failed(e.to_string()))?
                .to_rgba8();
            let (width, height) = rgba.dimensions();
            let data = arboard::ImageData {
                width: width as usize,
                height: height as usize,
                bytes: std::borrow::Cow::Owned(rgba.into_raw()),
            };
            let mut cb = arboard::Clipboard::new().map_err(|e| Self::map_err(e, "images"))?;
            cb.set_image(data).map_err(|e| Self::map_err(e, "images"))
        })
        .await
        .map_err(|e| ClipboardError::Failed(e.to_string()))?
    }
}
