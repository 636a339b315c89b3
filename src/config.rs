//! Tool configuration.
//!
//! Loaded from a TOML file (`shipwright.toml` by default) with
//! `SHIPWRIGHT__`-prefixed environment variable overrides. Only loading and
//! deserialization happen here; the settings are interpreted by the commands
//! and the error handler.

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use crate::error::HandlerConfig;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "shipwright.toml";

/// Errors that can occur while loading the configuration.
#[derive(Debug, Error)]
pub enum ToolConfigError {
    /// The configuration file was not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] ConfigError),

    /// The configuration file path is not valid UTF-8.
    #[error("invalid configuration path: {0}")]
    InvalidPath(String),
}

/// Hardening options applied to generated images.
#[derive(Debug, Clone, Deserialize)]
pub struct HardeningConfig {
    /// Run the application as an unprivileged user.
    #[serde(default = "default_true")]
    pub non_root: bool,
    /// Mount the root filesystem read-only.
    #[serde(default = "default_true")]
    pub read_only_rootfs: bool,
    /// Drop all Linux capabilities the runtime does not need.
    #[serde(default = "default_true")]
    pub drop_capabilities: bool,
}

impl Default for HardeningConfig {
    fn default() -> Self {
        Self {
            non_root: true,
            read_only_rootfs: true,
            drop_capabilities: true,
        }
    }
}

/// Error handler settings, mirrored into [`HandlerConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_error_history")]
    pub max_error_history: usize,
    #[serde(default = "default_true")]
    pub enable_recovery: bool,
    #[serde(default = "default_true")]
    pub enable_classification: bool,
    #[serde(default = "default_true")]
    pub enable_user_friendly_messages: bool,
}

impl Default for ErrorConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            max_error_history: default_max_error_history(),
            enable_recovery: true,
            enable_classification: true,
            enable_user_friendly_messages: true,
        }
    }
}

impl ErrorConfig {
    /// Converts into the handler's constructor settings.
    pub fn to_handler_config(&self) -> HandlerConfig {
        HandlerConfig::new()
            .with_max_retries(self.max_retries)
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms))
            .with_max_error_history(self.max_error_history)
            .with_recovery(self.enable_recovery)
            .with_classification(self.enable_classification)
            .with_user_friendly_messages(self.enable_user_friendly_messages)
    }
}

/// Root configuration for the tool.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolConfig {
    /// Image name, without registry or tag.
    #[serde(default = "default_image")]
    pub image: String,
    /// Registry host to push to. Required by `push` and `manifest`.
    #[serde(default)]
    pub registry: Option<String>,
    /// Tag applied to built images.
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Target platforms, e.g. `linux/amd64`.
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
    /// Image hardening options.
    #[serde(default)]
    pub hardening: HardeningConfig,
    /// Error handler settings.
    #[serde(default)]
    pub errors: ErrorConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            registry: None,
            tag: default_tag(),
            platforms: default_platforms(),
            hardening: HardeningConfig::default(),
            errors: ErrorConfig::default(),
        }
    }
}

impl ToolConfig {
    /// Loads configuration from a TOML file, with `SHIPWRIGHT__` environment
    /// overrides (double underscore separates nested keys).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ToolConfigError> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| ToolConfigError::InvalidPath(format!("{path:?}")))?;

        if !path.exists() {
            return Err(ToolConfigError::FileNotFound(path_str.to_string()));
        }

        let config = Config::builder()
            .add_source(File::with_name(path_str))
            .add_source(
                Environment::with_prefix("SHIPWRIGHT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Loads the given file, or falls back to defaults when no path was
    /// given and the default file does not exist. An explicitly named file
    /// must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ToolConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Full image reference, including registry when configured.
    pub fn image_reference(&self) -> String {
        match &self.registry {
            Some(registry) => format!("{}/{}:{}", registry, self.image, self.tag),
            None => format!("{}:{}", self.image, self.tag),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_image() -> String {
    "webapp-runtime".to_string()
}

fn default_tag() -> String {
    "latest".to_string()
}

fn default_platforms() -> Vec<String> {
    vec!["linux/amd64".to_string(), "linux/arm64".to_string()]
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_max_error_history() -> usize {
    100
}
