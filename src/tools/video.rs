//! Video metadata lookup and download.
//!
//! `fetch_info` asks the backend to describe a URL; `download` streams the
//! chosen rendition back, reporting progress per chunk, and saves it under
//! the name the backend suggests in `Content-Disposition`.

use super::ToolContext;
use crate::client::{content_type, file_part};
use crate::error::ToolError;
use crate::format::{content_disposition_filename, format_duration, format_size};
use crate::platform::{Blob, PendingFile};
use crate::progress::{NoopProgress, ProgressCallback};
use crate::state::{SingleFlight, StateCell};
use futures::StreamExt;
use reqwest::header;
use reqwest::multipart::Form;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub const INFO_ENDPOINT: &str = "/api/tools/video/info";
pub const DOWNLOAD_ENDPOINT: &str = "/api/tools/video/download";

/// Hosts that get platform-specific affordances (cookie upload hints).
pub const KNOWN_PLATFORMS: &[&str] = &["youtube.com", "youtu.be"];

pub const EMPTY_URL: &str = "Please enter a video URL";
pub const DEFAULT_QUALITY: &str = "720p";
pub const AUDIO_ONLY: &str = "audio";
pub const DEFAULT_FILENAME: &str = "video.mp4";
const INFO_FALLBACK: &str = "Failed to get video info";
const DOWNLOAD_FALLBACK: &str = "Download failed";

pub fn is_known_platform(url: &str) -> bool {
    KNOWN_PLATFORMS.iter().any(|host| url.contains(host))
}

// ── Descriptor ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoFormat {
    pub format_id: String,
    pub ext: String,
    pub resolution: String,
    pub filesize: Option<u64>,
    pub fps: Option<f64>,
    pub vcodec: String,
    pub acodec: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoInfo {
    pub title: String,
    /// Seconds.
    pub duration: Option<u64>,
    pub description: String,
    pub uploader: String,
    pub thumbnail: String,
    /// `null` is read as no formats.
    #[serde(deserialize_with = "null_as_empty")]
    pub formats: Vec<VideoFormat>,
    pub is_youtube: bool,
    pub filesize: Option<u64>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl VideoInfo {
    pub fn display_duration(&self) -> String {
        format_duration(self.duration)
    }

    pub fn display_size(&self) -> String {
        format_size(self.filesize)
    }

    /// Distinct non-empty resolutions, in the order the backend listed them.
    pub fn available_qualities(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for f in &self.formats {
            let r = f.resolution.as_str();
            if !r.is_empty() && !seen.contains(&r) {
                seen.push(r);
            }
        }
        seen
    }
}

// ── Controller ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct VideoDownloaderState {
    pub url: String,
    pub is_known_platform: bool,
    pub loading: bool,
    pub downloading: bool,
    pub error: Option<String>,
    pub info: Option<VideoInfo>,
    pub quality: String,
    /// Subtitle language to embed, e.g. `en`.
    pub subtitles: Option<String>,
    pub cookies: Option<PendingFile>,
    pub last_download: Option<String>,
}

impl Default for VideoDownloaderState {
    fn default() -> Self {
        Self {
            url: String::new(),
            is_known_platform: false,
            loading: false,
            downloading: false,
            error: None,
            info: None,
            quality: DEFAULT_QUALITY.to_string(),
            subtitles: None,
            cookies: None,
            last_download: None,
        }
    }
}

pub struct VideoDownloader {
    ctx: ToolContext,
    flight: SingleFlight,
    progress: Mutex<ProgressCallback>,
    state: StateCell<VideoDownloaderState>,
}

impl VideoDownloader {
    pub fn new(ctx: ToolContext) -> Self {
        Self {
            ctx,
            flight: SingleFlight::new(),
            progress: Mutex::new(Arc::new(NoopProgress)),
            state: StateCell::new(VideoDownloaderState::default()),
        }
    }

    pub fn state(&self) -> VideoDownloaderState {
        self.state.get()
    }

    /// Receive chunk events during [`download`](Self::download).
    pub fn set_progress(&self, progress: ProgressCallback) {
        *self.progress.lock().unwrap_or_else(|e| e.into_inner()) = progress;
    }

    pub fn set_url(&self, url: impl Into<String>) {
        let url = url.into();
        self.state.update(|s| {
            s.is_known_platform = is_known_platform(&url);
            s.url = url;
        });
    }

    /// `720p`, `1080p`, ... or [`AUDIO_ONLY`].
    pub fn select_quality(&self, quality: impl Into<String>) {
        let quality = quality.into();
        self.state.update(|s| s.quality = quality);
    }

    pub fn set_subtitles(&self, language: Option<String>) {
        let language = language.filter(|l| !l.trim().is_empty());
        self.state.update(|s| s.subtitles = language);
    }

    /// A cookies.txt export sent along with both requests.
    pub fn set_cookies(&self, cookies: Option<PendingFile>) {
        self.state.update(|s| s.cookies = cookies);
    }

    pub async fn fetch_info(&self) -> Result<VideoInfo, ToolError> {
        let _flight = self.flight.begin()?;

        let snapshot = self.state.get();
        if snapshot.url.trim().is_empty() {
            return Err(self.record(ToolError::validation(EMPTY_URL)));
        }

        self.state.update(|s| {
            s.loading = true;
            s.error = None;
            s.info = None;
        });

        let outcome = self.request_info(&snapshot).await;

        self.state.update(|s| {
            s.loading = false;
            match &outcome {
                Ok(info) => s.info = Some(info.clone()),
                Err(e) => s.error = Some(e.user_message()),
            }
        });
        outcome
    }

    async fn request_info(&self, snapshot: &VideoDownloaderState) -> Result<VideoInfo, ToolError> {
        info!("Fetching video info for {}", snapshot.url);
        let mut form = Form::new().text("url", snapshot.url.clone());
        if let Some(cookies) = &snapshot.cookies {
            form = form.part("cookies_file", file_part(cookies)?);
        }
        let info: VideoInfo = self
            .ctx
            .client
            .post_form_json(INFO_ENDPOINT, form, INFO_FALLBACK)
            .await?;
        debug!("{} formats for '{}'", info.formats.len(), info.title);
        Ok(info)
    }

    /// Download the selected quality and save it. Returns the filename.
    pub async fn download(&self) -> Result<String, ToolError> {
        let _flight = self.flight.begin()?;

        let snapshot = self.state.get();
        if snapshot.url.trim().is_empty() {
            return Err(self.record(ToolError::validation(EMPTY_URL)));
        }

        self.state.update(|s| {
            s.downloading = true;
            s.error = None;
        });

        let outcome = self.stream_and_save(&snapshot).await;

        self.state.update(|s| {
            s.downloading = false;
            match &outcome {
                Ok(name) => s.last_download = Some(name.clone()),
                Err(e) => s.error = Some(e.user_message()),
            }
        });
        outcome
    }

    async fn stream_and_save(&self, snapshot: &VideoDownloaderState) -> Result<String, ToolError> {
        let mut form = Form::new()
            .text("url", snapshot.url.clone())
            .text("quality", snapshot.quality.clone())
            .text("format", "mp4");
        if let Some(lang) = &snapshot.subtitles {
            form = form.text("subtitles", lang.clone());
        }
        if let Some(cookies) = &snapshot.cookies {
            form = form.part("cookies_file", file_part(cookies)?);
        }

        info!("Downloading {} at {}", snapshot.url, snapshot.quality);
        let config = self.ctx.client.config();
        let response = self
            .ctx
            .client
            .post_form_streaming(DOWNLOAD_ENDPOINT, form, config.download_timeout(), DOWNLOAD_FALLBACK)
            .await?;

        let filename = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .and_then(|v| content_disposition_filename(&v))
            .unwrap_or_else(|| DEFAULT_FILENAME.to_string());
        let mime = content_type(&response);
        let total = response.content_length();

        let progress = Arc::clone(&*self.progress.lock().unwrap_or_else(|e| e.into_inner()));
        progress.on_start(total);

        let mut body = Vec::with_capacity(total.unwrap_or(0).min(64 * 1024 * 1024) as usize);
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            body.extend_from_slice(&chunk);
            progress.on_chunk(body.len() as u64, total);
        }
        progress.on_complete(body.len() as u64);
        info!("Received {} bytes as {}", body.len(), filename);

        let blob = Blob::new(body, mime);
        self.ctx.save_blob(&blob, &filename).await?;
        Ok(filename)
    }

    fn record(&self, e: ToolError) -> ToolError {
        self.state.update(|s| s.error = Some(e.user_message()));
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::offline_context;

    #[test]
    fn platform_detection_is_substring_based() {
        assert!(is_known_platform("https://www.youtube.com/watch?v=x"));
        assert!(is_known_platform("https://youtu.be/x"));
        assert!(!is_known_platform("https://vimeo.com/1"));
    }

    #[test]
    fn set_url_recomputes_platform_flag() {
        let (ctx, _, _) = offline_context();
        let v = VideoDownloader::new(ctx);
        v.set_url("https://youtu.be/abc");
        assert!(v.state().is_known_platform);
        v.set_url("https://example.com/v.mp4");
        assert!(!v.state().is_known_platform);
    }

    #[test]
    fn descriptor_tolerates_missing_fields() {
        let info: VideoInfo = serde_json::from_str(
            r#"{"title":"Clip","duration":3725,"formats":[
                {"format_id":"18","resolution":"640x360"},
                {"format_id":"22","resolution":"1280x720"},
                {"format_id":"140","resolution":""},
                {"format_id":"43","resolution":"640x360"}]}"#,
        )
        .unwrap();
        assert_eq!(info.display_duration(), "1:02:05");
        assert_eq!(info.display_size(), "Unknown");
        assert_eq!(info.available_qualities(), vec!["640x360", "1280x720"]);
    }

    #[test]
    fn null_formats_read_as_empty() {
        let info: VideoInfo =
            serde_json::from_str(r#"{"title":"x","duration":10,"formats":null,"is_youtube":false}"#).unwrap();
        assert!(info.formats.is_empty());
        assert!(info.available_qualities().is_empty());
        assert_eq!(info.display_duration(), "0:10");
    }

    #[test]
    fn zero_values_render_unknown() {
        let info: VideoInfo = serde_json::from_str(r#"{"duration":0,"filesize":0}"#).unwrap();
        assert_eq!(info.display_duration(), "Unknown");
        assert_eq!(info.display_size(), "Unknown");
    }

    #[test]
    fn blank_subtitles_are_dropped() {
        let (ctx, _, _) = offline_context();
        let v = VideoDownloader::new(ctx);
        v.set_subtitles(Some("  ".into()));
        assert!(v.state().subtitles.is_none());
        v.set_subtitles(Some("en".into()));
        assert_eq!(v.state().subtitles.as_deref(), Some("en"));
    }

    #[tokio::test]
    async fn empty_url_is_rejected_for_both_actions() {
        let (ctx, _, _) = offline_context();
        let v = VideoDownloader::new(ctx);
        assert_eq!(v.fetch_info().await.unwrap_err().to_string(), EMPTY_URL);
        assert_eq!(v.download().await.unwrap_err().to_string(), EMPTY_URL);
        assert_eq!(v.state().quality, DEFAULT_QUALITY);
    }
}
