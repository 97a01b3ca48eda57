//! Configuration module for Folio.

use serde::Deserialize;
use std::path::Path;

use crate::{FolioError, Result};

/// Remote store connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the storage API (scheme, host and port).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path prefix of the versioned API routes.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    /// Path prefix under which raw file content is served.
    #[serde(default = "default_uploads_prefix")]
    pub uploads_prefix: String,
    /// Bearer token attached to every request, if set.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Connection timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds, uploads included.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// User agent string.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_uploads_prefix() -> String {
    "/uploads".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_timeout() -> u64 {
    300
}

fn default_user_agent() -> String {
    "Folio/0.1".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_prefix: default_api_prefix(),
            uploads_prefix: default_uploads_prefix(),
            access_token: None,
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Upload configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Maximum size of a single staged file in megabytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: u64,
    /// Entry names that are never staged, in addition to dotfiles.
    #[serde(default = "default_ignored_names")]
    pub ignored_names: Vec<String>,
}

fn default_max_file_size() -> u64 {
    100
}

fn default_ignored_names() -> Vec<String> {
    vec![
        ".DS_Store".to_string(),
        ".gitignore".to_string(),
        ".git".to_string(),
    ]
}

impl UploadConfig {
    /// Maximum size of a single file in bytes.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb * 1024 * 1024
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size(),
            ignored_names: default_ignored_names(),
        }
    }
}

/// Preview configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    /// Number of CSV data rows shown below the header.
    #[serde(default = "default_csv_max_rows")]
    pub csv_max_rows: usize,
    /// Character ceiling for JSON previews.
    #[serde(default = "default_json_max_chars")]
    pub json_max_chars: usize,
}

fn default_csv_max_rows() -> usize {
    50
}

fn default_json_max_chars() -> usize {
    100_000
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            csv_max_rows: default_csv_max_rows(),
            json_max_chars: default_json_max_chars(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/folio.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Remote store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Upload configuration.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Preview configuration.
    #[serde(default)]
    pub preview: PreviewConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FolioError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FolioError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FOLIO_API_URL`: Override the store base URL
    /// - `FOLIO_ACCESS_TOKEN`: Override the bearer token
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var("FOLIO_API_URL").ok(),
            std::env::var("FOLIO_ACCESS_TOKEN").ok(),
        );
    }

    fn apply_overrides(&mut self, api_url: Option<String>, token: Option<String>) {
        if let Some(url) = api_url.filter(|v| !v.trim().is_empty()) {
            self.store.base_url = url.trim().to_string();
        }
        if let Some(token) = token.filter(|v| !v.trim().is_empty()) {
            self.store.access_token = Some(token);
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - `store.base_url` is not an absolute http(s) URL
    /// - a preview limit is zero
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.store.base_url)
            .map_err(|e| FolioError::Config(format!("invalid store.base_url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FolioError::Config(format!(
                "unsupported store.base_url scheme: {}",
                parsed.scheme()
            )));
        }
        if self.preview.csv_max_rows == 0 || self.preview.json_max_chars == 0 {
            return Err(FolioError::Config(
                "preview limits must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
