//! Structured logging setup
//!
//! File-based logging with daily rotation plus a compact console layer.
//! Logs land under the platform config directory, e.g.
//! `~/.config/hostwatch/logs/` on Linux.

pub mod macros;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging system.
///
/// Sets up a compact stderr layer and a daily rotating JSON file layer.
/// The `RUST_LOG` environment variable controls the level (default:
/// `info`). Returns the log directory.
pub fn init_logging() -> Result<PathBuf> {
    let log_dir = log_directory()?;
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "hostwatch.log");

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .json();

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let init_result = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Err(e) = init_result {
        // Tests and embedding applications may have installed a global
        // subscriber already; that is not a reason to fail startup.
        if e.to_string().contains("already been set") {
            return Ok(log_dir);
        }
        return Err(anyhow!(e));
    }

    tracing::debug!("logging initialized, log directory: {}", log_dir.display());

    Ok(log_dir)
}

/// Log directory under the platform config dir:
/// `%APPDATA%/hostwatch/logs` on Windows, `~/.config/hostwatch/logs`
/// elsewhere.
fn log_directory() -> Result<PathBuf> {
    let base_dir = if cfg!(target_os = "windows") {
        dirs::data_local_dir().ok_or_else(|| anyhow!("could not find APPDATA directory"))?
    } else {
        dirs::config_dir().ok_or_else(|| anyhow!("could not find config directory"))?
    };

    Ok(base_dir.join("hostwatch").join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directory_is_under_hostwatch() {
        let log_dir = log_directory().expect("should get log directory");
        assert!(log_dir.to_string_lossy().contains("hostwatch"));
        assert!(log_dir.to_string_lossy().contains("logs"));
    }
}
