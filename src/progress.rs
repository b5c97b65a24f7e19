//! Human-readable progress text for a running job.

use crate::job::{Caption, JobStatus};
use std::time::{Duration, Instant};

/// Seconds left, scaled from the backend's estimate of the whole job.
pub fn remaining_seconds(status: &JobStatus) -> Option<f64> {
    let total = status.estimated_total_seconds.filter(|t| t.is_finite() && *t > 0.0)?;
    Some(total * f64::from(100 - status.progress.min(100)) / 100.0)
}

pub fn describe_remaining(status: &JobStatus) -> String {
    match remaining_seconds(status) {
        None => "Estimating time...".to_string(),
        Some(r) if r < 60.0 => format!("About {} s remaining", r.ceil() as u64),
        Some(r) => format!("About {} min remaining", (r / 60.0).ceil() as u64),
    }
}

/// `m:ss`, minutes unbounded.
pub fn format_clock(total_seconds: u64) -> String {
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Caption timestamp as `m:ss`. Invalid input renders as `0:00`.
pub fn format_timestamp(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return format_clock(0);
    }
    format_clock(seconds.floor() as u64)
}

/// Percent per second, or per minute when slower than 0.1 %/s.
pub fn processing_speed(progress: u8, elapsed: Duration) -> Option<String> {
    let secs = elapsed.as_secs();
    if progress == 0 || secs == 0 {
        return None;
    }
    let per_second = f64::from(progress) / secs as f64;
    if per_second < 0.1 {
        Some(format!("{:.1}% per minute", per_second * 60.0))
    } else {
        Some(format!("{:.1}% per second", per_second))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptionSummary {
    pub count: usize,
    /// End of the most recently appended caption.
    pub covered_until: f64,
}

pub fn summarize(captions: &[Caption]) -> CaptionSummary {
    CaptionSummary {
        count: captions.len(),
        covered_until: captions.last().map_or(0.0, |c| c.end),
    }
}

/// Wall-clock bookkeeping for one job attempt.
#[derive(Debug, Clone, Copy)]
pub struct ProgressTracker {
    started: Instant,
}

impl ProgressTracker {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// One status line: stage, percent, remaining time, elapsed and speed.
    pub fn status_line(&self, status: &JobStatus) -> String {
        let elapsed = self.elapsed();
        let stage = if status.current_stage.is_empty() {
            "Initializing..."
        } else {
            &status.current_stage
        };
        let mut line = format!(
            "{} | {}% | {} | elapsed {}",
            stage,
            status.progress,
            describe_remaining(status),
            format_clock(elapsed.as_secs())
        );
        if let Some(speed) = processing_speed(status.progress, elapsed) {
            line.push_str(" | ");
            line.push_str(&speed);
        }
        line
    }
}
