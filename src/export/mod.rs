//! Export caption sets to SRT and VTT formats.

mod srt;
mod vtt;

use crate::job::Caption;
use std::path::Path;

pub use srt::render_srt;
pub use vtt::render_vtt;

/// Caption time in whole milliseconds. Negative or invalid times clamp to zero.
fn seconds_to_ms(seconds: f64) -> u64 {
    if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    }
}

/// Export captions to SRT format.
pub fn export_srt(path: &Path, captions: &[Caption]) -> Result<(), String> {
    std::fs::write(path, render_srt(captions)).map_err(|e| e.to_string())
}

/// Export captions to VTT format.
pub fn export_vtt(path: &Path, captions: &[Caption]) -> Result<(), String> {
    std::fs::write(path, render_vtt(captions)).map_err(|e| e.to_string())
}

/// Pick the writer from the file extension (`.srt` or `.vtt`).
pub fn export_by_extension(path: &Path, captions: &[Caption]) -> Result<(), String> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("srt") => export_srt(path, captions),
        Some("vtt") => export_vtt(path, captions),
        other => Err(format!("Unsupported format: {}", other.unwrap_or(""))),
    }
}
