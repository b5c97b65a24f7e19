//! VTT (WebVTT) subtitle format writer.

use super::seconds_to_ms;
use crate::job::Caption;
use std::fmt::Write;

fn ms_to_vtt_time(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let mins = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, mins, secs, millis)
}

pub fn render_vtt(captions: &[Caption]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for caption in captions {
        let _ = writeln!(out, "{}", caption.id);
        let _ = writeln!(
            out,
            "{} --> {}",
            ms_to_vtt_time(seconds_to_ms(caption.start)),
            ms_to_vtt_time(seconds_to_ms(caption.end))
        );
        let _ = writeln!(out, "{}", caption.text.trim());
        let _ = writeln!(out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_header_and_cue_ids() {
        let captions = vec![Caption::new(0, 1.0, 2.004, "hi")];
        assert_eq!(
            render_vtt(&captions),
            "WEBVTT\n\n0\n00:00:01.000 --> 00:00:02.004\nhi\n\n"
        );
    }
}
