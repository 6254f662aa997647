//! Logging initialization.
//!
//! Logs go to a daily rotated file next to the configuration so they never
//! mix with command output on the terminal.
//!
//! The log level is controlled via the `RUST_LOG` environment variable and
//! defaults to `info`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_PREFIX: &str = "rusty-assist";

/// Directory holding the log files for a given configuration file.
pub fn log_dir_for(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(|dir| dir.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

/// Initialize file logging under `log_dir`.
///
/// Returns the writer guard, which must be held until exit so buffered
/// lines are flushed. Returns `None` when logging could not be set up; the
/// program keeps running without it.
pub fn init_logging(log_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = fs::create_dir_all(log_dir) {
        eprintln!("Warning: Failed to create logs directory: {}", e);
        return None;
    }

    let appender = match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix("log")
        .build(log_dir)
    {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Warning: Failed to create log file: {}", e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        // a subscriber is already installed
        return None;
    }

    tracing::info!("Logging initialized - writing to {}", log_dir.display());
    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_dir_sits_next_to_config() {
        let dir = log_dir_for(Path::new("/home/me/.config/rusty-assist/config.json"));
        assert_eq!(dir, PathBuf::from("/home/me/.config/rusty-assist/logs"));
    }
}
