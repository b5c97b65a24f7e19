//! Job snapshots, captions and the other shapes exchanged with the backend.

use crate::error::JobError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Caption identifier. The backend sends integers today, but the value is opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptionId {
    Number(i64),
    Text(String),
}

impl fmt::Display for CaptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptionId::Number(n) => write!(f, "{}", n),
            CaptionId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for CaptionId {
    fn from(n: i64) -> Self {
        CaptionId::Number(n)
    }
}

/// A single timed caption. Times are seconds from the start of the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub id: CaptionId,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub text: String,
}

impl Caption {
    pub fn new(id: impl Into<CaptionId>, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            text: text.into(),
        }
    }

    /// Inclusive on both ends.
    pub fn contains(&self, time: f64) -> bool {
        self.start <= time && time <= self.end
    }
}

/// Snapshot of a job as reported by `GET status`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub is_processing: bool,
    #[serde(default, deserialize_with = "deserialize_progress")]
    pub progress: u8,
    #[serde(default, deserialize_with = "null_as_default")]
    pub current_stage: String,
    #[serde(default, rename = "estimated_time")]
    pub estimated_total_seconds: Option<f64>,
    #[serde(default, rename = "partial_subtitles", deserialize_with = "null_as_default")]
    pub partial_captions: Vec<Caption>,
    #[serde(default, rename = "video", skip_serializing_if = "Option::is_none")]
    pub result_video_ref: Option<String>,
    #[serde(default, rename = "subtitles", skip_serializing_if = "Option::is_none")]
    pub result_captions_ref: Option<String>,
}

/// Locators of a finished job's permanent outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub video: String,
    pub subtitles: String,
}

/// Explicit reading of a [`JobStatus`], so callers never inspect `progress`
/// to tell "just started" apart from "failed".
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Pending,
    Succeeded(JobResult),
    Failed(JobError),
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !self.is_processing
    }

    /// Classify a snapshot using the backend's field conventions:
    /// a terminal snapshot at 100% with both locators is a success, one at 0%
    /// is a failure whose reason travels in `current_stage`.
    pub fn classify(&self) -> JobState {
        if !self.is_terminal() {
            return JobState::Pending;
        }
        match (
            self.progress,
            &self.result_video_ref,
            &self.result_captions_ref,
        ) {
            (100, Some(video), Some(subtitles)) => JobState::Succeeded(JobResult {
                video: video.clone(),
                subtitles: subtitles.clone(),
            }),
            (0, _, _) => JobState::Failed(JobError::JobFailed(self.current_stage.clone())),
            _ => JobState::Failed(JobError::MalformedTerminalStatus),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Processing,
    Success,
    #[serde(other)]
    Unknown,
}

/// Response of `POST upload`. Some backends finish synchronously and return
/// `success` with both locators, skipping the polling phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub status: UploadStatus,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub video: Option<String>,
    #[serde(default)]
    pub subtitles: Option<String>,
}

impl UploadResponse {
    pub fn completed_result(&self) -> Option<JobResult> {
        if self.status != UploadStatus::Success {
            return None;
        }
        match (&self.video, &self.subtitles) {
            (Some(video), Some(subtitles)) => Some(JobResult {
                video: video.clone(),
                subtitles: subtitles.clone(),
            }),
            _ => None,
        }
    }
}

/// One entry of `GET videos`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEntry {
    pub name: String,
    pub video: String,
    pub subtitles: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts integer or float percentages and clamps them to 0..=100.
fn deserialize_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0);
    if value.is_nan() {
        return Ok(0);
    }
    Ok(value.round().clamp(0.0, 100.0) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_streaming_snapshot() {
        let json = r#"{
            "is_processing": true,
            "progress": 30,
            "current_stage": "transcribing",
            "estimated_time": 120.5,
            "partial_subtitles": [{"id": 1, "start": 0, "end": 2, "text": "hello"}]
        }"#;
        let status: JobStatus = serde_json::from_str(json).unwrap();
        assert!(status.is_processing);
        assert_eq!(status.progress, 30);
        assert_eq!(status.current_stage, "transcribing");
        assert_eq!(status.estimated_total_seconds, Some(120.5));
        assert_eq!(status.partial_captions.len(), 1);
        assert_eq!(status.partial_captions[0].id, CaptionId::Number(1));
        assert_eq!(status.classify(), JobState::Pending);
    }

    #[test]
    fn tolerates_nulls_and_float_progress() {
        let json = r#"{"is_processing": true, "progress": 42.6, "current_stage": null, "partial_subtitles": null}"#;
        let status: JobStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.progress, 43);
        assert!(status.current_stage.is_empty());
        assert!(status.partial_captions.is_empty());
    }

    #[test]
    fn missing_is_processing_is_rejected() {
        assert!(serde_json::from_str::<JobStatus>(r#"{"progress": 10}"#).is_err());
    }

    #[test]
    fn classifies_success() {
        let json = r#"{"is_processing": false, "progress": 100, "video": "/v/1.mp4", "subtitles": "/s/1.json"}"#;
        let status: JobStatus = serde_json::from_str(json).unwrap();
        assert_eq!(
            status.classify(),
            JobState::Succeeded(JobResult {
                video: "/v/1.mp4".into(),
                subtitles: "/s/1.json".into(),
            })
        );
    }

    #[test]
    fn classifies_failure_with_stage_as_reason() {
        let status = JobStatus {
            is_processing: false,
            progress: 0,
            current_stage: "unsupported codec".into(),
            ..Default::default()
        };
        assert_eq!(
            status.classify(),
            JobState::Failed(JobError::JobFailed("unsupported codec".into()))
        );
    }

    #[test]
    fn other_terminal_shapes_are_malformed() {
        let missing_ref = JobStatus {
            is_processing: false,
            progress: 100,
            result_video_ref: Some("/v/1.mp4".into()),
            ..Default::default()
        };
        let halfway = JobStatus {
            is_processing: false,
            progress: 55,
            ..Default::default()
        };
        for status in [missing_ref, halfway] {
            assert_eq!(
                status.classify(),
                JobState::Failed(JobError::MalformedTerminalStatus)
            );
        }
    }

    #[test]
    fn upload_response_variants() {
        let done: UploadResponse = serde_json::from_str(
            r#"{"status": "success", "message": "ok", "video": "/a.mp4", "subtitles": "/a.json"}"#,
        )
        .unwrap();
        assert_eq!(
            done.completed_result().map(|r| r.video),
            Some("/a.mp4".to_string())
        );

        let pending: UploadResponse = serde_json::from_str(r#"{"status": "processing"}"#).unwrap();
        assert_eq!(pending.status, UploadStatus::Processing);
        assert!(pending.completed_result().is_none());

        let odd: UploadResponse = serde_json::from_str(r#"{"status": "queued"}"#).unwrap();
        assert_eq!(odd.status, UploadStatus::Unknown);
    }

    #[test]
    fn caption_ids_are_opaque() {
        let caption: Caption =
            serde_json::from_str(r#"{"id": "c-7", "start": 1.5, "end": 2.0, "text": "x"}"#).unwrap();
        assert_eq!(caption.id.to_string(), "c-7");
        assert!(caption.contains(1.5));
        assert!(caption.contains(2.0));
        assert!(!caption.contains(2.01));
    }
}
