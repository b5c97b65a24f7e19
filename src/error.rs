//! Error types shared by the monitor, the upload flow and the HTTP client.

use thiserror::Error;

/// Failure of a single request against the transcription backend.
///
/// During polling these are transient: the monitor counts them and keeps going
/// until the failure threshold is reached.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("backend returned {code}: {body}")]
    Status { code: u16, body: String },
    #[error("could not decode response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout
        } else if e.is_decode() {
            ClientError::Decode(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

/// Terminal, user-visible failure of one upload/transcription attempt.
///
/// The `Display` text is the single message shown to the user.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JobError {
    #[error("status endpoint unresponsive")]
    PollExhausted,
    #[error("{0}")]
    JobFailed(String),
    #[error("malformed terminal status")]
    MalformedTerminalStatus,
    #[error("upload timed out")]
    UploadTimeout,
    #[error("upload failed: {0}")]
    UploadTransport(String),
    #[error("unsupported file type: {0}")]
    UnsupportedFile(String),
    #[error("could not prepare preview: {0}")]
    Preview(String),
    #[error("monitoring was cancelled")]
    Cancelled,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum MonitorError {
    #[error("monitor is already running")]
    AlreadyRunning,
}

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("source file not found: {0}")]
    MissingSource(String),
    #[error("preview io error: {0}")]
    Io(#[from] std::io::Error),
}
