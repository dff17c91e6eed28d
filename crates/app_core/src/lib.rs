//! File manager core
//!
//! This crate contains:
//! - Configuration
//! - Error types
//! - The storage-backed file manager service
//! - Shared server state

pub mod config;
pub mod error;
pub mod service;
pub mod state;

pub use api_proto::ClientConfig;
pub use config::{AppConfig, ServerConfig, StorageConfig};
pub use error::{AppError, Result};
pub use service::{FileManager, PendingUpload, UPLOAD_CHUNK_SIZE};
pub use state::AppState;

/// Load configuration and bring up logging
///
/// The returned guard must live as long as the process logs.
pub fn init(config_path: Option<&std::path::Path>) -> anyhow::Result<(AppConfig, app_log::LogGuard)> {
    let config = match config_path {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    let guard = app_log::init(&config.logging)?;

    let log_dir = config.logging.log_dir();
    if let Err(e) = app_log::cleanup_old_logs(&log_dir, config.logging.retention_days) {
        tracing::warn!("Failed to clean up old logs: {}", e);
    }

    Ok((config, guard))
}
