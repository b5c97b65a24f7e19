//! Temporary local copies of videos being uploaded, so they can be watched
//! before the backend returns a permanent result.

use crate::error::PreviewError;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Creates preview handles inside one directory and counts the live ones.
#[derive(Debug, Clone)]
pub struct PreviewManager {
    dir: PathBuf,
    live: Arc<AtomicUsize>,
}

/// Exclusively owned reference to one preview file. Released at most once,
/// either explicitly or on drop.
#[derive(Debug)]
pub struct PreviewHandle {
    uri: String,
    path: PathBuf,
    released: bool,
    live: Arc<AtomicUsize>,
}

impl PreviewManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of handles acquired and not yet released.
    pub fn live_handles(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Link (or copy, across filesystems) `file` into the preview directory.
    pub fn acquire(&self, file: &Path) -> Result<PreviewHandle, PreviewError> {
        if !file.is_file() {
            return Err(PreviewError::MissingSource(file.display().to_string()));
        }
        std::fs::create_dir_all(&self.dir)?;

        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());
        let path = self
            .dir
            .join(format!("{}_{}", uuid::Uuid::new_v4().simple(), file_name));
        if let Err(e) = std::fs::hard_link(file, &path) {
            debug!("[preview] hard link failed ({}), copying instead", e);
            std::fs::copy(file, &path)?;
        }

        self.live.fetch_add(1, Ordering::SeqCst);
        let uri = format!("file://{}", path.display());
        info!("[preview] acquired {}", uri);
        Ok(PreviewHandle {
            uri,
            path,
            released: false,
            live: self.live.clone(),
        })
    }

    /// Same as [`PreviewHandle::release`].
    pub fn release(&self, handle: &mut PreviewHandle) -> bool {
        handle.release()
    }
}

impl PreviewHandle {
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Delete the preview file. Returns `true` only for the call that actually
    /// cleaned up; later calls are no-ops.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("[preview] failed to remove {}: {}", self.path.display(), e),
        }
        self.live.fetch_sub(1, Ordering::SeqCst);
        debug!("[preview] released {}", self.uri);
        true
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.release();
    }
}
