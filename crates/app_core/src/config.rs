//! Application configuration

use api_proto::ClientConfig;
use app_fs::HiddenFiles;
use app_log::LoggingConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub client: ClientConfig,
    pub logging: LoggingConfig,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub request_timeout_secs: u64,
    /// Upper bound on a whole request body (all files of one upload)
    pub max_request_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            request_timeout_secs: 30,
            max_request_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Storage root and listing policy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
    /// URL prefix under which the root is served read-only
    pub public_url_prefix: String,
    /// Per-file upload limit
    pub max_upload_bytes: u64,
    pub hidden_files: HiddenFiles,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./storage/public"),
            public_url_prefix: "/storage".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            hidden_files: HiddenFiles::Hide,
        }
    }
}

impl StorageConfig {
    /// Public prefix with exactly one leading and no trailing slash
    /// ("" when files are not served)
    pub fn public_prefix(&self) -> String {
        let trimmed = self.public_url_prefix.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{}", trimmed)
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        tracing::info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "FileManager", "FileManager")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.storage.max_upload_bytes, 10_485_760);
        assert_eq!(config.storage.hidden_files, HiddenFiles::Hide);
        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.client.timeout_secs, 30);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [storage]
            root = "/srv/files"
            hidden_files = "show"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.root, PathBuf::from("/srv/files"));
        assert_eq!(config.storage.hidden_files, HiddenFiles::Show);
        assert_eq!(config.storage.public_url_prefix, "/storage");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_serialized_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.storage.max_upload_bytes = 1024;
        std::fs::write(&path, toml::to_string_pretty(&config).unwrap()).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.storage.max_upload_bytes, 1024);
    }

    #[test]
    fn test_public_prefix_normalization() {
        let mut storage = StorageConfig::default();
        assert_eq!(storage.public_prefix(), "/storage");

        storage.public_url_prefix = "files/".to_string();
        assert_eq!(storage.public_prefix(), "/files");

        storage.public_url_prefix = "/".to_string();
        assert_eq!(storage.public_prefix(), "");
    }
}
