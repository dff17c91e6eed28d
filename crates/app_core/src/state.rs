//! Shared server state

use crate::{AppConfig, AppError, FileManager};
use std::sync::Arc;

/// State shared by every request handler
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// File operations over the storage root
    pub manager: Arc<FileManager>,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: AppConfig) -> Result<Self, AppError> {
        let manager = FileManager::new(&config.storage)?;

        Ok(Self {
            config: Arc::new(config),
            manager: Arc::new(manager),
        })
    }
}
