//! Platform capabilities the tools depend on.
//!
//! A browser front-end gets these for free (file picker, clipboard, object
//! URLs, anchor-click downloads). Here each one is a small trait so the
//! tools run anywhere and can be tested without a real platform:
//!
//! | Trait | Provided implementations |
//! |-------|--------------------------|
//! | [`FileSource`] | [`PathFileSource`], [`CancelledFileSource`] |
//! | [`ClipboardSink`] | [`MemoryClipboard`], [`UnsupportedClipboard`], `SystemClipboard` (feature `clipboard`) |
//! | [`BlobUrlAllocator`] | [`MemoryBlobUrls`] |
//! | [`DownloadSink`] | [`DirectoryDownloads`], [`RecordingDownloads`] |

pub mod blob;
pub mod clipboard;
pub mod download;
pub mod files;

pub use blob::{Blob, BlobUrl, BlobUrlAllocator, MemoryBlobUrls};
#[cfg(feature = "clipboard")]
pub use clipboard::SystemClipboard;
pub use clipboard::{ClipboardError, ClipboardSink, MemoryClipboard, UnsupportedClipboard};
pub use download::{
    DirectoryDownloads, DownloadRequest, DownloadSink, RecordedDownload, RecordingDownloads,
};
pub use files::{detect_mime, CancelledFileSource, FileSource, PathFileSource, PendingFile};
