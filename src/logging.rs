//! Logging setup with file rotation.

use crate::supervisor::LoggingSettings;

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

const LOG_FILE_PREFIX: &str = "lifeflow-supervisor";
const LOG_RETENTION_FILES: usize = 7;

/// Setup logging with console and rotating file output.
///
/// The file layer rotates daily inside the configured log directory
/// (relative to `data_dir`) and keeps the last week of files. The
/// configured level is the baseline; `RUST_LOG` overrides it.
pub fn setup_logging(
    data_dir: &Path,
    settings: &LoggingSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let logs_dir = data_dir.join(&settings.directory);
    std::fs::create_dir_all(&logs_dir)?;

    // Console layer - human readable for development
    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(true);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(LOG_RETENTION_FILES)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .build(&logs_dir)?;

    let file_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_writer(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

/// Path of today's log file (for diagnostics export).
pub fn current_log_path(data_dir: &Path, settings: &LoggingSettings) -> PathBuf {
    let today = chrono::Local::now().format("%Y-%m-%d");
    data_dir
        .join(&settings.directory)
        .join(format!("{LOG_FILE_PREFIX}.{today}.log"))
}
