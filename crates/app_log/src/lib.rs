//! File manager logging & crash reporting
//!
//! Provides structured logging (console + rolling JSON file) and a panic hook
//! that writes crash reports.

mod panic_hook;
mod logging;

pub use panic_hook::init_panic_hook;
pub use logging::{cleanup_old_logs, init_logging, LogGuard};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Logging configuration (the `[logging]` section of the config file)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Also write JSON logs to a daily rolling file
    pub file: bool,
    /// Log directory override
    pub directory: Option<PathBuf>,
    /// Rolled log files older than this many days are removed at startup
    pub retention_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: true,
            directory: None,
            retention_days: 7,
        }
    }
}

impl LoggingConfig {
    /// Effective log directory
    pub fn log_dir(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(log_dir)
    }
}

/// Get the default log directory
pub fn log_dir() -> PathBuf {
    ProjectDirs::from("com", "FileManager", "FileManager")
        .map(|dirs| dirs.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// Initialize all observability features
///
/// The returned guard flushes the file writer; keep it alive until exit.
pub fn init(config: &LoggingConfig) -> anyhow::Result<LogGuard> {
    let guard = init_logging(config)?;
    init_panic_hook(config.log_dir());
    Ok(guard)
}
