//! Append-only caption sequence shared between the monitor (writer) and
//! synchronizers (readers).

use crate::job::Caption;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Cheap to clone; every clone sees the same growing sequence.
#[derive(Debug, Clone, Default)]
pub struct CaptionTrack {
    inner: Arc<RwLock<Vec<Caption>>>,
}

impl CaptionTrack {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Caption>> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Caption>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Append the part of `partial` this track has not seen yet.
    ///
    /// Snapshots carry the whole partial sequence so far, so only the tail past
    /// the current length is new. A shorter sequence appends nothing; existing
    /// entries are never rewritten. Returns how many captions were appended.
    pub fn append_from(&self, partial: &[Caption]) -> usize {
        let mut captions = self.write();
        if partial.len() <= captions.len() {
            return 0;
        }
        let seen = captions.len();
        captions.extend_from_slice(&partial[seen..]);
        partial.len() - seen
    }

    pub fn push(&self, caption: Caption) {
        self.write().push(caption);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Run `f` against the current contents without copying them.
    pub fn with_captions<R>(&self, f: impl FnOnce(&[Caption]) -> R) -> R {
        f(&self.read())
    }

    pub fn snapshot(&self) -> Vec<Caption> {
        self.read().clone()
    }
}

impl From<Vec<Caption>> for CaptionTrack {
    fn from(captions: Vec<Caption>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(captions)),
        }
    }
}
