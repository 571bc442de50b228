//! Client configuration
//!
//! Loaded from TOML. Every field has a default so an empty file (or no file at
//! all) yields a working configuration pointed at a local backend.
//!
//! Lookup order: explicit path, `NUTRISCAN_CONFIG`, `./nutriscan.toml`.
//! `NUTRISCAN_API_URL` overrides `api.base_url` after loading.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use crate::api::scan::{PollConfig, UploadPolicy};

pub const CONFIG_ENV: &str = "NUTRISCAN_CONFIG";
pub const API_URL_ENV: &str = "NUTRISCAN_API_URL";
const DEFAULT_CONFIG_FILE: &str = "nutriscan.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub api: ApiSection,
    pub upload: UploadSection,
    pub poll: PollSection,
    pub session: SessionSection,
    pub barcode: BarcodeSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Base URL including the version prefix, e.g. `https://host/api/v1`
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadSection {
    pub max_bytes: u64,
    pub allowed_types: Vec<String>,
    /// Ask the backend to keep the uploaded image
    pub store_image: bool,
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            allowed_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
            ],
            store_image: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSection {
    pub interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_attempts: 60,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Session file; defaults to `nutriscan_session.json` in the working directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BarcodeSection {
    /// zbar-compatible decoder executable
    pub program: String,
    pub frame_interval_ms: u64,
}

impl Default for BarcodeSection {
    fn default() -> Self {
        Self {
            program: "zbarimg".to_string(),
            frame_interval_ms: 100,
        }
    }
}

impl ClientConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Self = toml::from_str(toml_str).context("Invalid configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("In config file {}", path.display()))
    }

    /// Resolve configuration using the standard lookup order.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(path) => Self::from_file(&path)?,
            None => {
                let local = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::from_file(&local)?
                } else {
                    log::debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            config.set_base_url(&url)?;
        }
        Ok(config)
    }

    pub fn set_base_url(&mut self, url: &str) -> Result<()> {
        self.api.base_url = url.trim_end_matches('/').to_string();
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api.base_url)
            .map_err(|err| anyhow!("Invalid api.base_url '{}': {err}", self.api.base_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "api.base_url must use http or https, got '{}'",
                url.scheme()
            ));
        }
        if self.poll.max_attempts == 0 {
            return Err(anyhow!("poll.max_attempts must be at least 1"));
        }
        if self.upload.allowed_types.is_empty() {
            return Err(anyhow!("upload.allowed_types must not be empty"));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    pub fn session_path(&self) -> PathBuf {
        self.session
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("nutriscan_session.json"))
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            allowed_types: self.upload.allowed_types.clone(),
            max_bytes: self.upload.max_bytes,
        }
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll.interval_ms),
            max_attempts: self.poll.max_attempts,
        }
    }

    /// Convert to a TOML string
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
