//! Client configuration.
//!
//! Everything that is not a per-tool option lives in [`ClientConfig`]: where
//! the backend is, how long to wait for it, and the timings of the transient
//! UI feedback. Build it with [`ClientConfig::builder()`] or read it from the
//! environment with [`ClientConfig::from_env()`].

use crate::error::ToolError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default backend address (the toolkit server listens on `:8080`).
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Configuration shared by every tool controller.
///
/// # Example
/// ```rust
/// use nanotools_client::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("https://tools.example.com/")
///     .request_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.base_url, "https://tools.example.com");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Backend origin, without a trailing slash. Default: `http://localhost:8080`.
    pub base_url: String,

    /// Timeout for ordinary requests in seconds. Default: 60.
    ///
    /// Matches the backend's own request timeout.
    pub request_timeout_secs: u64,

    /// Timeout for video downloads in seconds. Default: 600.
    ///
    /// The backend allows a download job up to ten minutes.
    pub download_timeout_secs: u64,

    /// How long a "copied" indicator stays set, in milliseconds. Default: 2000.
    pub copy_feedback_ms: u64,

    /// Delay before a download's blob URL is released, in milliseconds. Default: 100.
    pub release_delay_ms: u64,

    /// `User-Agent` sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 60,
            download_timeout_secs: 600,
            copy_feedback_ms: 2000,
            release_delay_ms: 100,
            user_agent: concat!("nanotools-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read `NANOTOOLS_URL` and `NANOTOOLS_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> Result<Self, ToolError> {
        let mut builder = Self::builder();
        if let Ok(url) = std::env::var("NANOTOOLS_URL") {
            if !url.is_empty() {
                builder = builder.base_url(url);
            }
        }
        if let Ok(secs) = std::env::var("NANOTOOLS_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ToolError::InvalidConfig(format!("NANOTOOLS_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            builder = builder.request_timeout_secs(secs);
        }
        builder.build()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn copy_feedback(&self) -> Duration {
        Duration::from_millis(self.copy_feedback_ms)
    }

    pub fn release_delay(&self) -> Duration {
        Duration::from_millis(self.release_delay_ms)
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn copy_feedback_ms(mut self, ms: u64) -> Self {
        self.config.copy_feedback_ms = ms;
        self
    }

    pub fn release_delay_ms(mut self, ms: u64) -> Self {
        self.config.release_delay_ms = ms;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ToolError> {
        let c = &self.config;
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(ToolError::InvalidConfig(format!(
                "base URL must start with http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if c.request_timeout_secs == 0 || c.download_timeout_secs == 0 {
            return Err(ToolError::InvalidConfig("timeouts must be ≥ 1 second".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ClientConfig::default();
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
        assert_eq!(c.copy_feedback(), Duration::from_secs(2));
        assert_eq!(c.release_delay(), Duration::from_millis(100));
        assert!(c.user_agent.starts_with("nanotools-client/"));
    }

    #[test]
    fn builder_trims_trailing_slash() {
        let c = ClientConfig::builder()
            .base_url("http://127.0.0.1:9000///")
            .build()
            .unwrap();
        assert_eq!(c.base_url, "http://127.0.0.1:9000");
    }

    #[test]
    fn builder_rejects_bad_scheme() {
        let err = ClientConfig::builder().base_url("ftp://x").build().unwrap_err();
        assert!(matches!(err, ToolError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        assert!(ClientConfig::builder().request_timeout_secs(0).build().is_err());
    }
}
