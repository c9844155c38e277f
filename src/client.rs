//! HTTP transport shared by all tools.
//!
//! Every backend call goes through [`ApiClient`], which applies the one
//! error rule all endpoints share: a non-OK response body is read as text
//! and becomes the user-facing message verbatim, or the action's generic
//! fallback when the body is empty.

use crate::config::ClientConfig;
use crate::error::ToolError;
use crate::platform::{Blob, PendingFile};
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP client for the toolkit backend.
///
/// Cheap to clone; every tool controller holds its own clone.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    config: Arc<ClientConfig>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ToolError> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ToolError::InvalidConfig(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url, path)
    }

    /// POST a multipart form and return the binary body.
    pub async fn post_form_blob(
        &self,
        path: &str,
        form: Form,
        fallback: &str,
    ) -> Result<Blob, ToolError> {
        let response = self.post_form(path, form, None, fallback).await?;
        let content_type = content_type(&response);
        let bytes = response.bytes().await?;
        info!("POST {} → {} bytes ({})", path, bytes.len(), content_type);
        Ok(Blob::new(bytes, content_type))
    }

    /// POST a multipart form and decode the JSON body.
    pub async fn post_form_json<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
        fallback: &str,
    ) -> Result<T, ToolError> {
        let response = self.post_form(path, form, None, fallback).await?;
        decode_json(path, response).await
    }

    /// GET with query parameters and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        fallback: &str,
    ) -> Result<T, ToolError> {
        debug!("GET {} {:?}", path, query);
        let response = self.http.get(self.url(path)).query(query).send().await?;
        let response = check_status(path, response, fallback).await?;
        decode_json(path, response).await
    }

    /// POST a multipart form and return the checked response so the caller
    /// can stream the body. `timeout` overrides the client-wide timeout.
    pub async fn post_form_streaming(
        &self,
        path: &str,
        form: Form,
        timeout: Duration,
        fallback: &str,
    ) -> Result<Response, ToolError> {
        self.post_form(path, form, Some(timeout), fallback).await
    }

    async fn post_form(
        &self,
        path: &str,
        form: Form,
        timeout: Option<Duration>,
        fallback: &str,
    ) -> Result<Response, ToolError> {
        debug!("POST {} (multipart)", path);
        let mut request = self.http.post(self.url(path)).multipart(form);
        if let Some(t) = timeout {
            request = request.timeout(t);
        }
        let response = request.send().await?;
        check_status(path, response, fallback).await
    }
}

/// Turn a non-OK response into [`ToolError::Server`].
async fn check_status(path: &str, response: Response, fallback: &str) -> Result<Response, ToolError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let body = body.trim_end_matches(['\r', '\n']);
    let message = if body.trim().is_empty() {
        fallback.to_string()
    } else {
        body.to_string()
    };
    warn!("{} failed with {}: {}", path, status, message);

    Err(ToolError::Server {
        status: status.as_u16(),
        message,
    })
}

async fn decode_json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ToolError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| {
        warn!("{} returned an unexpected body: {}", path, e);
        ToolError::InvalidResponse
    })
}

pub(crate) fn content_type(response: &Response) -> String {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// A multipart file part carrying the picked file's name and type.
pub(crate) fn file_part(file: &PendingFile) -> Result<Part, ToolError> {
    let part = Part::bytes(file.bytes.to_vec()).file_name(file.name.clone());
    if file.mime.is_empty() {
        return Ok(part);
    }
    part.mime_str(&file.mime)
        .map_err(|e| ToolError::validation(format!("Invalid file type '{}': {e}", file.mime)))
}
