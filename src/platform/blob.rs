//! In-memory response bodies and the local URLs that reference them.
//!
//! A [`BlobUrl`] is what a preview pane or a save action navigates to. It
//! keeps its [`Blob`] alive inside the allocator until it is revoked, so
//! every allocation must be paired with a [`BlobUrlAllocator::revoke`].

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// A binary response body with its declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    bytes: Bytes,
    content_type: String,
}

impl Blob {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Pixel dimensions, when the body is an image whose header can be read.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        image::ImageReader::new(Cursor::new(self.bytes.as_ref()))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    }
}

/// A local, navigable reference to a [`Blob`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobUrl(String);

impl BlobUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Allocates and releases [`BlobUrl`]s.
pub trait BlobUrlAllocator: Send + Sync {
    /// Register `blob` and return a URL for it.
    fn create(&self, blob: &Blob) -> BlobUrl;

    /// Look up the blob behind a live URL.
    fn resolve(&self, url: &BlobUrl) -> Option<Blob>;

    /// Release a URL. Revoking an unknown or already revoked URL is a no-op.
    fn revoke(&self, url: &BlobUrl);

    /// Number of URLs allocated and not yet revoked.
    fn live_count(&self) -> usize;
}

/// Process-local allocator handing out `blob:nanotools/<n>` addresses.
#[derive(Default)]
pub struct MemoryBlobUrls {
    next: AtomicU64,
    live: Mutex<HashMap<BlobUrl, Blob>>,
}

impl MemoryBlobUrls {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobUrlAllocator for MemoryBlobUrls {
    fn create(&self, blob: &Blob) -> BlobUrl {
        let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        let url = BlobUrl(format!("blob:nanotools/{id}"));
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.clone(), blob.clone());
        debug!("Allocated {} ({} bytes)", url, blob.len());
        url
    }

    fn resolve(&self, url: &BlobUrl) -> Option<Blob> {
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .cloned()
    }

    fn revoke(&self, url: &BlobUrl) {
        if self
            .live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(url)
            .is_some()
        {
            debug!("Revoked {}", url);
        }
    }

    fn live_count(&self) -> usize {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Revoke `url` after `delay` so a save that was just triggered can still
/// read it.
pub(crate) fn release_after(urls: Arc<dyn BlobUrlAllocator>, url: BlobUrl, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        urls.revoke(&url);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};

    fn png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(w, h, Rgba([0, 0, 0, 255]));
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .expect("encode png");
        buf
    }

    #[test]
    fn create_resolve_revoke() {
        let urls = MemoryBlobUrls::new();
        let blob = Blob::new(vec![1u8, 2, 3], "application/octet-stream");
        let a = urls.create(&blob);
        let b = urls.create(&blob);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("blob:nanotools/"));
        assert_eq!(urls.live_count(), 2);
        assert_eq!(urls.resolve(&a), Some(blob));

        urls.revoke(&a);
        urls.revoke(&a);
        assert_eq!(urls.live_count(), 1);
        assert!(urls.resolve(&a).is_none());
    }

    #[test]
    fn dimensions_of_png() {
        let blob = Blob::new(png(12, 7), "image/png");
        assert_eq!(blob.dimensions(), Some((12, 7)));
        assert_eq!(Blob::new(vec![0u8; 4], "image/png").dimensions(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn release_after_delay() {
        let urls: Arc<MemoryBlobUrls> = Arc::new(MemoryBlobUrls::new());
        let url = urls.create(&Blob::new(vec![9u8], "text/plain"));

        release_after(urls.clone(), url.clone(), Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(urls.resolve(&url).is_some());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(urls.live_count(), 0);
    }
}
