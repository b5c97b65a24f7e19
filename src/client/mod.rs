//! Transcription service client: the interfaces the core consumes and an HTTP implementation.

mod backend;
mod http;

pub use backend::{CaptionSource, JobStatusClient};
pub use http::HttpJobClient;
