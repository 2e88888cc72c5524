//! Settings file: read on startup, written with defaults when missing.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::DownloadFormat;
use crate::orchestrator::OrchestratorOptions;

pub const DEFAULT_CONFIG_FILE: &str = "echo_downloader.yaml";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Download-preparation endpoint, receives `POST {url, format}`
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Seconds before a preparation request counts as failed (unset = wait forever)
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Format selected when the window opens
    #[serde(default)]
    pub default_format: DownloadFormat,

    /// Cancelling a processing download keeps it in the list as cancelled
    #[serde(default)]
    pub keep_cancelled: bool,

    /// Cancelling the in-flight download also aborts its request
    #[serde(default)]
    pub abort_on_cancel: bool,

    /// How long toasts stay on screen
    #[serde(default = "default_toast_seconds")]
    pub toast_seconds: u64,

    #[serde(default = "default_true")]
    pub dark_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_secs: None,
            default_format: DownloadFormat::default(),
            keep_cancelled: false,
            abort_on_cancel: false,
            toast_seconds: default_toast_seconds(),
            dark_mode: true,
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8787/api/download".to_string()
}

fn default_toast_seconds() -> u64 {
    4
}

fn default_true() -> bool {
    true
}

impl AppConfig {
    /// Loads `path`, creating it from defaults first if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // An empty file deserializes as null, not as an empty mapping
        let config: Self = if raw.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let yaml = serde_yaml::to_string(self).map_err(|err| ConfigError::Validation(err.to_string()))?;
        fs::write(path, yaml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint_url()?;
        if self.request_timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.toast_seconds == 0 {
            return Err(ConfigError::Validation("toast_seconds must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn endpoint_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.endpoint)
            .map_err(|err| ConfigError::Validation(format!("endpoint {:?}: {err}", self.endpoint)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::Validation(format!(
                "endpoint must use http or https, not {other}"
            ))),
        }
    }

    pub fn toast_duration(&self) -> Duration {
        Duration::from_secs(self.toast_seconds)
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            timeout: self.request_timeout_secs.map(Duration::from_secs),
            keep_cancelled: self.keep_cancelled,
            abort_on_cancel: self.abort_on_cancel,
        }
    }
}
