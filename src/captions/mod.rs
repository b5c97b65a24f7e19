//! Caption synchronization against a playback clock.

mod sync;
mod track;

pub use sync::{active_caption_at, seek_target, ActiveCaptionChange, CaptionSynchronizer};
pub use track::CaptionTrack;

use crate::client::CaptionSource;
use log::{info, warn};

/// Fetch a finished caption set. A failed fetch is not fatal: playback goes on
/// with an empty track, so no caption is ever active.
pub async fn load_captions_or_empty(source: &dyn CaptionSource, locator: &str) -> CaptionTrack {
    match source.fetch_captions(locator).await {
        Ok(captions) => {
            info!("[captions] loaded {} captions from {}", captions.len(), locator);
            CaptionTrack::from(captions)
        }
        Err(e) => {
            warn!("[captions] failed to load {}: {}", locator, e);
            CaptionTrack::new()
        }
    }
}
