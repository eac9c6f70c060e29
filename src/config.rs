//! Console configuration
//!
//! Values resolve as environment variable, then config file, then default.

use crate::drawer::EXPLANATION_FALLBACK;
use crate::layout::LayoutConfig;
use crate::{ForensicsError, UPLOAD_FALLBACK_MESSAGE};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_API_URL: &str = "FORENSICS_API_URL";
pub const ENV_REQUEST_TIMEOUT: &str = "FORENSICS_REQUEST_TIMEOUT_SECS";
pub const ENV_EXPORT_DIR: &str = "FORENSICS_EXPORT_DIR";
pub const ENV_LOG_LEVEL: &str = "FORENSICS_LOG";

/// Console configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub export_dir: PathBuf,
    pub log_level: String,
    pub upload_fallback_message: String,
    pub explanation_fallback_message: String,
    pub layout: LayoutConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            request_timeout_secs: 30,
            export_dir: PathBuf::from("."),
            log_level: "info".to_string(),
            upload_fallback_message: UPLOAD_FALLBACK_MESSAGE.to_string(),
            explanation_fallback_message: EXPLANATION_FALLBACK.to_string(),
            layout: LayoutConfig::default(),
        }
    }
}

/// Config file contents; every field optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConsoleConfig {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub export_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub upload_fallback_message: Option<String>,
    pub explanation_fallback_message: Option<String>,
    pub layout: Option<LayoutConfig>,
}

impl PartialConsoleConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ForensicsError> {
        toml::from_str(raw).map_err(|e| ForensicsError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ForensicsError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ForensicsError::Config(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }
}

impl ConsoleConfig {
    /// Merge file values and environment overrides onto the defaults
    pub fn from_env_or_file(
        file: Option<PartialConsoleConfig>,
        env_map: &HashMap<String, String>,
    ) -> Result<Self, ForensicsError> {
        let defaults = Self::default();
        let file = file.unwrap_or_default();

        let api_base_url = env_map
            .get(ENV_API_URL)
            .cloned()
            .or(file.api_base_url)
            .unwrap_or(defaults.api_base_url);
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ForensicsError::Config(format!(
                "Invalid API base URL: {}",
                api_base_url
            )));
        }

        let request_timeout_secs = match env_map.get(ENV_REQUEST_TIMEOUT) {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ForensicsError::Config(format!("{} must be a whole number: {}", ENV_REQUEST_TIMEOUT, raw))
            })?,
            None => file
                .request_timeout_secs
                .unwrap_or(defaults.request_timeout_secs),
        };
        if request_timeout_secs == 0 {
            return Err(ForensicsError::Config(
                "Request timeout must be at least one second".to_string(),
            ));
        }

        let export_dir = env_map
            .get(ENV_EXPORT_DIR)
            .map(PathBuf::from)
            .or(file.export_dir)
            .unwrap_or(defaults.export_dir);

        let log_level = env_map
            .get(ENV_LOG_LEVEL)
            .cloned()
            .or(file.log_level)
            .unwrap_or(defaults.log_level);

        Ok(Self {
            api_base_url,
            request_timeout_secs,
            export_dir,
            log_level,
            upload_fallback_message: file
                .upload_fallback_message
                .unwrap_or(defaults.upload_fallback_message),
            explanation_fallback_message: file
                .explanation_fallback_message
                .unwrap_or(defaults.explanation_fallback_message),
            layout: file.layout.unwrap_or(defaults.layout),
        })
    }

    /// Load from the process environment and an optional TOML file
    pub fn load(path: Option<&Path>) -> Result<Self, ForensicsError> {
        let file = path.map(PartialConsoleConfig::from_file).transpose()?;
        let env_map: HashMap<String, String> = std::env::vars().collect();
        Self::from_env_or_file(file, &env_map)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
