#![allow(dead_code)]

use async_trait::async_trait;
use caption_monitor_lib::job::UploadStatus;
use caption_monitor_lib::{Caption, CaptionSource, ClientError, JobStatus, JobStatusClient, UploadResponse};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub enum Submit {
    Respond(UploadResponse),
    Fail(ClientError),
    Hang,
}

/// Backend double: answers uploads with a fixed behaviour and replays a
/// script of status responses. An exhausted script keeps reporting
/// "still processing", or never answers once `stalling` is set.
pub struct FakeBackend {
    submit: Mutex<Option<Submit>>,
    statuses: Mutex<VecDeque<Result<JobStatus, ClientError>>>,
    captions: Mutex<Option<Result<Vec<Caption>, ClientError>>>,
    status_calls: AtomicUsize,
    stall: bool,
}

impl FakeBackend {
    pub fn new(submit: Submit, statuses: Vec<Result<JobStatus, ClientError>>) -> Self {
        Self {
            submit: Mutex::new(Some(submit)),
            statuses: Mutex::new(statuses.into()),
            captions: Mutex::new(None),
            status_calls: AtomicUsize::new(0),
            stall: false,
        }
    }

    pub fn with_captions(self, captions: Result<Vec<Caption>, ClientError>) -> Self {
        *self.captions.lock().unwrap() = Some(captions);
        self
    }

    pub fn stalling(mut self) -> Self {
        self.stall = true;
        self
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStatusClient for FakeBackend {
    async fn fetch_status(&self) -> Result<JobStatus, ClientError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self.statuses.lock().unwrap().pop_front();
        match next {
            Some(status) => status,
            None if self.stall => std::future::pending().await,
            None => Ok(processing(50, "transcribing", vec![])),
        }
    }

    async fn submit_job(&self, _file: &Path) -> Result<UploadResponse, ClientError> {
        let behaviour = self.submit.lock().unwrap().take();
        match behaviour {
            Some(Submit::Respond(response)) => Ok(response),
            Some(Submit::Fail(e)) => Err(e),
            Some(Submit::Hang) | None => std::future::pending().await,
        }
    }
}

#[async_trait]
impl CaptionSource for FakeBackend {
    async fn fetch_captions(&self, _locator: &str) -> Result<Vec<Caption>, ClientError> {
        self.captions
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| Err(ClientError::Status { code: 404, body: "no captions".into() }))
    }
}

pub fn accepted() -> Submit {
    Submit::Respond(UploadResponse {
        status: UploadStatus::Processing,
        message: None,
        video: None,
        subtitles: None,
    })
}

pub fn processing(progress: u8, stage: &str, partial: Vec<Caption>) -> JobStatus {
    JobStatus {
        is_processing: true,
        progress,
        current_stage: stage.to_string(),
        partial_captions: partial,
        ..Default::default()
    }
}

pub fn video_file(dir: &Path) -> PathBuf {
    let path = dir.join("interview.mp4");
    std::fs::write(&path, b"fake video bytes").unwrap();
    path
}
