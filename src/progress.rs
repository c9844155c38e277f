//! Progress-callback trait for streamed downloads.
//!
//! Pass an [`Arc<dyn TransferProgress>`] to
//! [`crate::tools::video::VideoDownloader::set_progress`] to receive events
//! while the response body arrives chunk by chunk. The CLI forwards them to a
//! terminal progress bar; a GUI could forward them to a channel.
//!
//! # Example
//!
//! ```rust
//! use nanotools_client::TransferProgress;
//! use std::sync::atomic::{AtomicU64, Ordering};
//!
//! struct LastSeen(AtomicU64);
//!
//! impl TransferProgress for LastSeen {
//!     fn on_chunk(&self, received: u64, _total: Option<u64>) {
//!         self.0.store(received, Ordering::SeqCst);
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called while a response body is being received.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait TransferProgress: Send + Sync {
    /// Called once, when the response headers are in.
    ///
    /// # Arguments
    /// * `total` — `Content-Length` if the server sent one
    fn on_start(&self, total: Option<u64>) {
        let _ = total;
    }

    /// Called after each chunk.
    ///
    /// # Arguments
    /// * `received` — bytes received so far
    /// * `total`    — `Content-Length` if known
    fn on_chunk(&self, received: u64, total: Option<u64>) {
        let _ = (received, total);
    }

    /// Called once, after the last chunk.
    fn on_complete(&self, received: u64) {
        let _ = received;
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgress;

impl TransferProgress for NoopProgress {}

/// Convenience alias for the shared callback type.
pub type ProgressCallback = Arc<dyn TransferProgress>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    struct Tracking {
        chunks: AtomicUsize,
        last: AtomicU64,
        done: AtomicU64,
    }

    impl TransferProgress for Tracking {
        fn on_chunk(&self, received: u64, _total: Option<u64>) {
            self.chunks.fetch_add(1, Ordering::SeqCst);
            self.last.store(received, Ordering::SeqCst);
        }

        fn on_complete(&self, received: u64) {
            self.done.store(received, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_does_not_panic() {
        let cb: ProgressCallback = Arc::new(NoopProgress);
        cb.on_start(Some(10));
        cb.on_chunk(5, Some(10));
        cb.on_complete(10);
    }

    #[test]
    fn tracking_receives_events() {
        let t = Tracking {
            chunks: AtomicUsize::new(0),
            last: AtomicU64::new(0),
            done: AtomicU64::new(0),
        };
        t.on_start(None);
        t.on_chunk(100, None);
        t.on_chunk(250, None);
        t.on_complete(250);
        assert_eq!(t.chunks.load(Ordering::SeqCst), 2);
        assert_eq!(t.last.load(Ordering::SeqCst), 250);
        assert_eq!(t.done.load(Ordering::SeqCst), 250);
    }
}
