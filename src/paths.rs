//! Path utilities for config, log and preview directories.

use std::path::PathBuf;

const APP_DIR: &str = "caption-monitor";

fn app_dir(base: Option<PathBuf>) -> PathBuf {
    base.map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the config directory (e.g. ~/.config/caption-monitor on Linux).
pub fn config_dir() -> PathBuf {
    app_dir(dirs::config_dir())
}

/// Get the path to the config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Get the log directory (e.g. ~/.local/share/caption-monitor/logs).
pub fn log_dir() -> PathBuf {
    app_dir(dirs::data_dir()).join("logs")
}

/// Get the log file path.
pub fn log_file_path() -> PathBuf {
    log_dir().join("caption-monitor.log")
}

/// Default directory for temporary preview copies of uploads.
pub fn preview_dir() -> PathBuf {
    app_dir(dirs::cache_dir()).join("previews")
}

/// Ensure all app directories exist.
pub fn ensure_directories() -> Result<(), String> {
    for dir in [config_dir(), log_dir(), preview_dir()] {
        std::fs::create_dir_all(&dir).map_err(|e| e.to_string())?;
    }
    Ok(())
}
