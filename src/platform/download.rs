//! Save actions.
//!
//! A tool hands a [`DownloadSink`] the address it would navigate to (a blob
//! or data URL), the suggested file name, and the bytes behind the address.

use crate::error::ToolError;
use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// One save action.
#[derive(Debug, Clone, Copy)]
pub struct DownloadRequest<'a> {
    pub href: &'a str,
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

/// Receives save actions.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn deliver(&self, request: DownloadRequest<'_>) -> Result<(), ToolError>;
}

/// Writes downloads into a directory.
///
/// Each file is written to a temporary sibling and renamed into place, so a
/// failed save never leaves a truncated file under the final name.
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where `filename` ends up. Directory components in the suggested name
    /// are dropped.
    pub fn target(&self, filename: &str) -> PathBuf {
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("download");
        self.dir.join(name)
    }
}

#[async_trait]
impl DownloadSink for DirectoryDownloads {
    async fn deliver(&self, request: DownloadRequest<'_>) -> Result<(), ToolError> {
        let dir = self.dir.clone();
        let path = self.target(request.filename);
        let bytes = request.bytes.to_vec();

        let target = path.clone();
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            std::fs::create_dir_all(&dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&bytes)?;
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| ToolError::Io {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?
        .map_err(|source| ToolError::Io {
            path: path.clone(),
            source,
        })?;

        info!("Saved {} ({} bytes)", path.display(), request.bytes.len());
        Ok(())
    }
}

/// A delivered download, as seen by [`RecordingDownloads`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDownload {
    pub href: String,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Keeps every delivered download in memory.
#[derive(Default)]
pub struct RecordingDownloads {
    delivered: Mutex<Vec<RecordedDownload>>,
}

impl RecordingDownloads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<RecordedDownload> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn filenames(&self) -> Vec<String> {
        self.delivered().into_iter().map(|d| d.filename).collect()
    }
}

#[async_trait]
impl DownloadSink for RecordingDownloads {
    async fn deliver(&self, request: DownloadRequest<'_>) -> Result<(), ToolError> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedDownload {
                href: request.href.to_string(),
                filename: request.filename.to_string(),
                bytes: request.bytes.to_vec(),
            });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn directory_sink_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectoryDownloads::new(dir.path().join("out"));
        sink.deliver(DownloadRequest {
            href: "blob:nanotools/1",
            filename: "photo_converted.png",
            bytes: b"png-bytes",
        })
        .await
        .unwrap();

        let written = std::fs::read(dir.path().join("out/photo_converted.png")).unwrap();
        assert_eq!(written, b"png-bytes");
    }

    #[test]
    fn target_drops_directories() {
        let sink = DirectoryDownloads::new("/tmp/dl");
        assert_eq!(sink.target("../../etc/passwd"), PathBuf::from("/tmp/dl/passwd"));
        assert_eq!(sink.target(""), PathBuf::from("/tmp/dl/download"));
    }

    #[tokio::test]
    async fn recording_sink_keeps_order() {
        let sink = RecordingDownloads::new();
        for name in ["a.png", "b.png"] {
            sink.deliver(DownloadRequest {
                href: "data:,",
                filename: name,
                bytes: b"",
            })
            .await
            .unwrap();
        }
        assert_eq!(sink.filenames(), vec!["a.png", "b.png"]);
    }
}
