//! One upload attempt: validate, preview, submit, monitor, release.

use crate::captions::CaptionTrack;
use crate::client::JobStatusClient;
use crate::config::ClientConfig;
use crate::error::{ClientError, JobError};
use crate::job::{JobResult, JobStatus, UploadStatus};
use crate::monitor::{
    JobOutcome, ProgressMonitor, DEFAULT_FAILURE_THRESHOLD, DEFAULT_FETCH_TIMEOUT, DEFAULT_POLL_INTERVAL,
};
use crate::preview::{PreviewHandle, PreviewManager};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Extensions the backend accepts, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv"];

pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| s.eq_ignore_ascii_case(ext))
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSettings {
    pub poll_interval: Duration,
    pub failure_threshold: u32,
    pub upload_timeout: Duration,
    pub status_timeout: Duration,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            upload_timeout: DEFAULT_UPLOAD_TIMEOUT,
            status_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

impl From<&ClientConfig> for FlowSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            failure_threshold: config.failure_threshold,
            upload_timeout: Duration::from_secs(config.upload_timeout_secs),
            status_timeout: Duration::from_secs(config.status_timeout_secs),
        }
    }
}

/// Progress reported to the rendering layer while a flow runs.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    PreviewReady { uri: String },
    /// Polling began; the track grows as partial captions stream in.
    Monitoring { captions: CaptionTrack },
    Snapshot(JobStatus),
}

pub struct UploadFlow {
    client: Arc<dyn JobStatusClient>,
    previews: PreviewManager,
    settings: FlowSettings,
}

impl UploadFlow {
    pub fn new(client: Arc<dyn JobStatusClient>, previews: PreviewManager, settings: FlowSettings) -> Self {
        Self {
            client,
            previews,
            settings,
        }
    }

    /// Run one attempt to completion. Every error leaves nothing behind: the
    /// preview is released and a later call starts from scratch with a fresh
    /// monitor. Dropping the returned future cancels polling and releases the
    /// preview as well.
    pub async fn run(
        &self,
        file: &Path,
        events: Option<mpsc::UnboundedSender<FlowEvent>>,
    ) -> Result<JobResult, JobError> {
        if !is_supported_video(file) {
            return Err(JobError::UnsupportedFile(file.display().to_string()));
        }

        let mut preview = self
            .previews
            .acquire(file)
            .map_err(|e| JobError::Preview(e.to_string()))?;
        emit(&events, FlowEvent::PreviewReady {
            uri: preview.uri().to_string(),
        });

        let outcome = self.submit_and_monitor(file, &events).await;
        finish(&mut preview, &outcome);
        outcome
    }

    async fn submit_and_monitor(
        &self,
        file: &Path,
        events: &Option<mpsc::UnboundedSender<FlowEvent>>,
    ) -> JobOutcome {
        info!("[flow] uploading {}", file.display());
        let response = match tokio::time::timeout(self.settings.upload_timeout, self.client.submit_job(file)).await {
            Err(_) | Ok(Err(ClientError::Timeout)) => return Err(JobError::UploadTimeout),
            Ok(Err(e)) => return Err(JobError::UploadTransport(e.to_string())),
            Ok(Ok(response)) => response,
        };

        if response.status == UploadStatus::Success {
            info!("[flow] backend finished synchronously");
            return response
                .completed_result()
                .ok_or(JobError::MalformedTerminalStatus);
        }

        let monitor = ProgressMonitor::new(self.client.clone())
            .with_failure_threshold(self.settings.failure_threshold)
            .with_fetch_timeout(self.settings.status_timeout);
        emit(events, FlowEvent::Monitoring {
            captions: monitor.captions(),
        });
        if let Some(tx) = events.clone() {
            monitor.on_snapshot(move |status| {
                let _ = tx.send(FlowEvent::Snapshot(status.clone()));
            });
        }
        let (done_tx, done_rx) = oneshot::channel();
        monitor.on_terminal(move |outcome| {
            let _ = done_tx.send(outcome);
        });
        if let Err(e) = monitor.start(self.settings.poll_interval) {
            warn!("[flow] could not start monitor: {}", e);
            return Err(JobError::Cancelled);
        }

        done_rx.await.unwrap_or(Err(JobError::Cancelled))
    }
}

fn emit(events: &Option<mpsc::UnboundedSender<FlowEvent>>, event: FlowEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

fn finish(preview: &mut PreviewHandle, outcome: &JobOutcome) {
    match outcome {
        Ok(result) => info!("[flow] done, replacing preview with {}", result.video),
        Err(e) => warn!("[flow] failed: {}", e),
    }
    preview.release();
}
