//! Logger setup: stderr plus a log file, in one line format.

use crate::paths;
use std::path::PathBuf;

/// Install the global logger. Returns the log file path.
pub fn init_logger(level: log::LevelFilter) -> Result<PathBuf, fern::InitError> {
    let log_dir = paths::log_dir();
    std::fs::create_dir_all(&log_dir).ok();
    let log_file = paths::log_file_path();

    let format = |out: fern::FormatCallback<'_>, message: &std::fmt::Arguments<'_>, record: &log::Record| {
        out.finish(format_args!(
            "[{}][{}][{}][{:?}] {}",
            chrono::Local::now().format("%Y-%m-%d"),
            chrono::Local::now().format("%H:%M:%S"),
            record.target(),
            record.level(),
            message
        ))
    };

    fern::Dispatch::new()
        .format(format)
        .level(level)
        // HTTP internals are noisy at debug level.
        .level_for("hyper", log::LevelFilter::Info)
        .level_for("reqwest", log::LevelFilter::Info)
        .chain(std::io::stderr())
        .chain(fern::log_file(&log_file)?)
        .apply()?;

    Ok(log_file)
}
