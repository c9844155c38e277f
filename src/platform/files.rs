//! File selection.
//!
//! A [`FileSource`] stands in for the file picker: it yields the file the
//! user chose, or `None` if they cancelled.

use crate::error::ToolError;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file the user picked, not yet validated by any tool.
#[derive(Debug, Clone)]
pub struct PendingFile {
    /// File name without directories.
    pub name: String,
    /// Declared MIME type; empty when unknown.
    pub mime: String,
    pub bytes: Bytes,
}

impl PendingFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Yields the file the user selected.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// `Ok(None)` means the selection was cancelled.
    async fn pick(&self) -> Result<Option<PendingFile>, ToolError>;
}

/// Reads one file from the local file system.
#[derive(Debug, Clone)]
pub struct PathFileSource {
    path: PathBuf,
}

impl PathFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FileSource for PathFileSource {
    async fn pick(&self) -> Result<Option<PendingFile>, ToolError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| ToolError::Io {
                path: self.path.clone(),
                source,
            })?;

        let name = self
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        let mime = detect_mime(&self.path, &bytes);
        debug!("Picked {} ({} bytes, {})", name, bytes.len(), mime);

        Ok(Some(PendingFile::new(name, mime, bytes)))
    }
}

/// A source that always reports a cancelled selection.
pub struct CancelledFileSource;

#[async_trait]
impl FileSource for CancelledFileSource {
    async fn pick(&self) -> Result<Option<PendingFile>, ToolError> {
        Ok(None)
    }
}

/// MIME type from the extension, falling back to the leading magic bytes.
pub fn detect_mime(path: &Path, bytes: &[u8]) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .or_else(|| sniff(bytes))
        .unwrap_or("application/octet-stream")
        .to_string()
}

fn sniff(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"%PDF") {
        Some("application/pdf")
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"GIF8") {
        Some("image/gif")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        assert_eq!(detect_mime(Path::new("a.PDF"), b""), "application/pdf");
        assert_eq!(detect_mime(Path::new("a.jpeg"), b""), "image/jpeg");
        assert_eq!(detect_mime(Path::new("scan.tif"), b""), "image/tiff");
        assert_eq!(detect_mime(Path::new("old.bmp"), b""), "image/bmp");
    }

    #[test]
    fn mime_from_magic() {
        assert_eq!(detect_mime(Path::new("upload"), b"%PDF-1.7"), "application/pdf");
        assert_eq!(
            detect_mime(Path::new("upload"), b"\x89PNG\r\n\x1a\n...."),
            "image/png"
        );
        assert_eq!(
            detect_mime(Path::new("upload"), b"hello"),
            "application/octet-stream"
        );
    }

    #[test]
    fn extension_wins_over_magic() {
        assert_eq!(detect_mime(Path::new("notes.txt"), b"%PDF"), "text/plain");
    }

    #[tokio::test]
    async fn path_source_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.pdf");
        std::fs::write(&path, b"%PDF-1.4 test").unwrap();

        let file = PathFileSource::new(&path).pick().await.unwrap().unwrap();
        assert_eq!(file.name, "doc.pdf");
        assert_eq!(file.mime, "application/pdf");
        assert_eq!(file.size(), 13);
    }

    #[tokio::test]
    async fn path_source_missing_file() {
        let err = PathFileSource::new("/definitely/not/here.png")
            .pick()
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Io { .. }));
    }
}
