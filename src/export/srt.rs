//! SRT (SubRip) subtitle format writer.

use super::seconds_to_ms;
use crate::job::Caption;
use std::fmt::Write;

fn ms_to_srt_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let mins = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
}

/// Cues are numbered by position, not by caption id.
pub fn render_srt(captions: &[Caption]) -> String {
    let mut out = String::new();
    for (i, caption) in captions.iter().enumerate() {
        let _ = writeln!(out, "{}", i + 1);
        let _ = writeln!(
            out,
            "{} --> {}",
            ms_to_srt_time(seconds_to_ms(caption.start)),
            ms_to_srt_time(seconds_to_ms(caption.end))
        );
        let _ = writeln!(out, "{}", caption.text.trim());
        let _ = writeln!(out);
    }
    out
}
