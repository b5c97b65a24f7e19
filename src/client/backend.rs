//! Interfaces the monitor and the upload flow consume from the backend.

use crate::error::ClientError;
use crate::job::{Caption, JobStatus, UploadResponse};
use async_trait::async_trait;
use std::path::Path;

/// Status and submission endpoints of the transcription service.
#[async_trait]
pub trait JobStatusClient: Send + Sync {
    async fn fetch_status(&self) -> Result<JobStatus, ClientError>;
    async fn submit_job(&self, file: &Path) -> Result<UploadResponse, ClientError>;
}

/// Where finished caption sets are fetched from.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    async fn fetch_captions(&self, locator: &str) -> Result<Vec<Caption>, ClientError>;
}
