//! Client-side core of a video transcription service: upload a video, follow
//! the asynchronous job until it finishes, and keep the caption under the
//! playhead in sync while captions are still streaming in.

pub mod captions;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod flow;
pub mod job;
pub mod logging;
pub mod monitor;
pub mod paths;
pub mod preview;
pub mod progress;

pub use captions::{active_caption_at, CaptionSynchronizer, CaptionTrack};
pub use client::{CaptionSource, HttpJobClient, JobStatusClient};
pub use config::ClientConfig;
pub use error::{ClientError, JobError, MonitorError, PreviewError};
pub use flow::{FlowEvent, FlowSettings, UploadFlow};
pub use job::{Caption, CaptionId, JobResult, JobState, JobStatus, UploadResponse, VideoEntry};
pub use monitor::{JobOutcome, MonitorPhase, PollState, ProgressMonitor};
pub use preview::{PreviewHandle, PreviewManager};
