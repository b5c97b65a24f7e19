//! reqwest-backed client for the transcription service's JSON API.

use super::backend::{CaptionSource, JobStatusClient};
use crate::error::ClientError;
use crate::job::{Caption, JobStatus, UploadResponse, VideoEntry};
use async_trait::async_trait;
use log::debug;
use reqwest::Url;
use std::path::Path;
use std::time::Duration;

pub struct HttpJobClient {
    base_url: String,
    upload_timeout: Duration,
    client: reqwest::Client,
}

impl HttpJobClient {
    /// `base_url` is the API root, e.g. `http://localhost:5000/api`.
    pub fn new(base_url: &str, upload_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            upload_timeout,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Locators like `/api/files/x/x_chunked.json` are relative to the server
    /// origin, not to the API root.
    pub fn resolve_locator(&self, locator: &str) -> Result<String, ClientError> {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return Ok(locator.to_string());
        }
        let base = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Transport(format!("invalid base url: {}", e)))?;
        base.join(locator)
            .map(|u| u.to_string())
            .map_err(|e| ClientError::Transport(format!("invalid locator {}: {}", locator, e)))
    }

    /// List jobs that finished earlier and have both outputs on the server.
    pub async fn list_videos(&self) -> Result<Vec<VideoEntry>, ClientError> {
        let response = self.client.get(self.endpoint("videos")).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }
}

/// Map non-2xx responses to `ClientError::Status`, preferring the backend's
/// `{"error": "..."}` message over the raw body.
async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|json| json.get("error").and_then(|v| v.as_str()).map(String::from))
        .unwrap_or(body);
    Err(ClientError::Status {
        code: status.as_u16(),
        body: message,
    })
}

fn video_mime(file: &Path) -> &'static str {
    match file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("avi") => "video/x-msvideo",
        Some("mkv") => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

#[async_trait]
impl JobStatusClient for HttpJobClient {
    async fn fetch_status(&self) -> Result<JobStatus, ClientError> {
        let response = self.client.get(self.endpoint("status")).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    async fn submit_job(&self, file: &Path) -> Result<UploadResponse, ClientError> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| ClientError::Transport(format!("could not read {}: {}", file.display(), e)))?;
        let file_name = file
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("video.mp4")
            .to_string();
        debug!("[client] uploading {} ({} bytes)", file_name, bytes.len());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(video_mime(file))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .timeout(self.upload_timeout)
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl CaptionSource for HttpJobClient {
    async fn fetch_captions(&self, locator: &str) -> Result<Vec<Caption>, ClientError> {
        let url = self.resolve_locator(locator)?;
        let response = self.client.get(url).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }
}
