//! Construction parameters of a OneDrive storage mount.

use crate::auth::token_state::{TokenState, TOKEN_URL};
use crate::error::{StorageError, StorageResult};
use crate::onedrive_service::http_client::GRAPH_API_BASE;
use log::LevelFilter;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use url::Url;

pub const PARAM_CLIENT_ID: &str = "client_id";
pub const PARAM_CLIENT_SECRET: &str = "client_secret";
pub const PARAM_TOKEN: &str = "token";
pub const PARAM_CONFIGURED: &str = "configured";

/// Keys the host must always provide
pub const REQUIRED_PARAMS: [&str; 4] = [
    PARAM_CLIENT_ID,
    PARAM_CLIENT_SECRET,
    PARAM_TOKEN,
    PARAM_CONFIGURED,
];

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Serialized [`TokenState`]
    pub token: String,
    /// The host marks a finished OAuth setup with the string "true"
    pub configured: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,
}

fn default_api_base() -> String {
    GRAPH_API_BASE.to_string()
}

fn default_token_url() -> String {
    TOKEN_URL.to_string()
}

impl StorageConfig {
    /// Build from the host's key/value parameter map
    pub fn from_params(params: &HashMap<String, String>) -> StorageResult<Self> {
        let required = |key: &str| -> StorageResult<String> {
            params
                .get(key)
                .cloned()
                .ok_or_else(|| StorageError::Config(format!("missing parameter '{}'", key)))
        };

        let config = Self {
            client_id: required(PARAM_CLIENT_ID)?,
            client_secret: required(PARAM_CLIENT_SECRET)?,
            token: required(PARAM_TOKEN)?,
            configured: required(PARAM_CONFIGURED)?,
            api_base: params
                .get("api_base")
                .cloned()
                .unwrap_or_else(default_api_base),
            token_url: params
                .get("token_url")
                .cloned()
                .unwrap_or_else(default_token_url),
            temp_dir: params.get("temp_dir").map(PathBuf::from),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> StorageResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| StorageError::Config(format!("malformed configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> StorageResult<()> {
        for (key, value) in [
            (PARAM_CLIENT_ID, &self.client_id),
            (PARAM_CLIENT_SECRET, &self.client_secret),
            (PARAM_TOKEN, &self.token),
        ] {
            if value.trim().is_empty() {
                return Err(StorageError::Config(format!("parameter '{}' is empty", key)));
            }
        }

        if self.configured != "true" {
            return Err(StorageError::Config(
                "storage is not configured, finish the OAuth setup first".to_string(),
            ));
        }

        for (key, value) in [("api_base", &self.api_base), ("token_url", &self.token_url)] {
            Url::parse(value).map_err(|e| {
                StorageError::Config(format!("parameter '{}' is not a URL: {}", key, e))
            })?;
        }

        self.token_state()?;
        Ok(())
    }

    pub fn token_state(&self) -> StorageResult<TokenState> {
        TokenState::from_blob(&self.token)
            .map_err(|e| StorageError::Config(format!("unreadable token: {:#}", e)))
    }

    /// Directory for staged local copies
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Settings for [`crate::log_appender::setup_logging`]
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
    pub level: LevelFilter,
    /// Roll the active log file once it reaches this many bytes
    pub max_file_size: u64,
    /// Number of compressed archives kept
    pub archive_count: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: std::env::temp_dir().join("onedrive-storage"),
            level: LevelFilter::Info,
            max_file_size: 5 * 1024 * 1024,
            archive_count: 3,
        }
    }
}
