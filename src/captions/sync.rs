//! Resolve the caption active at a playback position.

use crate::job::Caption;

/// The caption whose `[start, end]` interval contains `time`.
///
/// When captions overlap, the one that began most recently wins; among equal
/// starts the one later in the sequence wins. The sequence may still be
/// growing and is not assumed to be sorted.
pub fn active_caption_at(time: f64, captions: &[Caption]) -> Option<&Caption> {
    captions
        .iter()
        .filter(|c| c.contains(time))
        .fold(None, |best: Option<&Caption>, c| match best {
            Some(b) if b.start > c.start => Some(b),
            _ => Some(c),
        })
}

/// Where the player should jump when a caption is clicked.
pub fn seek_target(caption: &Caption) -> f64 {
    caption.start.max(0.0)
}

/// Emitted only when the resolved active caption differs from the previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveCaptionChange {
    pub previous: Option<Caption>,
    pub current: Option<Caption>,
}

/// Remembers the last resolved caption so callers re-render only on change.
#[derive(Debug, Default)]
pub struct CaptionSynchronizer {
    position: f64,
    active: Option<Caption>,
}

impl CaptionSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&Caption> {
        self.active.as_ref()
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    /// Playback time moved (progress tick or seek).
    pub fn on_time(&mut self, time: f64, captions: &[Caption]) -> Option<ActiveCaptionChange> {
        if time.is_finite() {
            self.position = time.max(0.0);
        }
        self.resolve(captions)
    }

    /// The caption sequence grew; re-resolve at the last known position.
    pub fn on_captions_changed(&mut self, captions: &[Caption]) -> Option<ActiveCaptionChange> {
        self.resolve(captions)
    }

    fn resolve(&mut self, captions: &[Caption]) -> Option<ActiveCaptionChange> {
        let current = active_caption_at(self.position, captions);
        if current == self.active.as_ref() {
            return None;
        }
        let current = current.cloned();
        let previous = std::mem::replace(&mut self.active, current.clone());
        Some(ActiveCaptionChange { previous, current })
    }
}
