//! Configuration management for AzureMachine conversion
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (conversion.toml)
//! - Environment variables (CONVERSION__*)
//!
//! ## Example config file (conversion.toml):
//! ```toml
//! [side_channel]
//! annotation_key = "cluster.x-k8s.io/conversion-data"
//! preserve = true
//!
//! [output]
//! format = "pretty"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::codec::{SideChannel, DEFAULT_ANNOTATION};
use crate::convert::Converter;

/// Main configuration for conversion tooling
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionConfig {
    /// Side-channel settings
    #[serde(default)]
    pub side_channel: SideChannelConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Side-channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SideChannelConfig {
    /// Annotation key holding preserved hub data
    #[serde(default = "default_annotation_key")]
    pub annotation_key: String,

    /// Stash hub data on down-conversion
    #[serde(default = "default_true")]
    pub preserve: bool,
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

impl OutputFormat {
    /// Render a value in this format
    pub fn render<T: Serialize>(&self, value: &T) -> serde_json::Result<String> {
        match self {
            OutputFormat::Pretty => serde_json::to_string_pretty(value),
            OutputFormat::Compact => serde_json::to_string(value),
        }
    }
}

fn default_annotation_key() -> String {
    DEFAULT_ANNOTATION.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SideChannelConfig {
    fn default() -> Self {
        Self {
            annotation_key: default_annotation_key(),
            preserve: true,
        }
    }
}

impl ConversionConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "conversion.toml",
            ".conversion.toml",
            "config/conversion.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("io", "x-k8s", "azmachine-conversion") {
            let xdg_config = config_dir.config_dir().join("conversion.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("CONVERSION")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Build a converter using these settings
    pub fn converter(&self) -> Converter {
        Converter::new(SideChannel::from_config(&self.side_channel))
    }
}
