//! File manager HTTP server
//!
//! Usage: `file_manager [config.toml]`

use anyhow::Result;
use file_manager_server::app;
use std::path::PathBuf;

fn main() -> Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);

    // Configuration, logging and panic hook first
    let (config, _log_guard) = app_core::init(config_path.as_deref())?;

    tracing::info!("File manager starting...");

    let state = app_core::AppState::new(config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(app::run(state))
}
