//! Client configuration, persisted as JSON.

use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:5000/api`.
    pub base_url: String,
    pub poll_interval_ms: u64,
    /// Consecutive failed status fetches before giving up.
    pub failure_threshold: u32,
    pub upload_timeout_secs: u64,
    /// A status fetch slower than this counts as a failed poll.
    pub status_timeout_secs: u64,
    pub preview_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api".to_string(),
            poll_interval_ms: 1000,
            failure_threshold: 5,
            upload_timeout_secs: 30,
            status_timeout_secs: 10,
            preview_dir: None,
        }
    }
}

impl ClientConfig {
    pub fn preview_dir(&self) -> PathBuf {
        self.preview_dir.clone().unwrap_or_else(paths::preview_dir)
    }
}

/// Load config from `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<ClientConfig, String> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }
    let json = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&json).map_err(|e| format!("{}: {}", path.display(), e))
}

pub fn save_config(path: &Path, config: &ClientConfig) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }
    let json = serde_json::to_string_pretty(config).map_err(|e| e.to_string())?;
    std::fs::write(path, json).map_err(|e| e.to_string())?;
    Ok(())
}
