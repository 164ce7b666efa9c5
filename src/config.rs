//! Configuration management for the generator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (openapi-to-effect.toml)
//! - Environment variables (OPENAPI_TO_EFFECT__*)
//!
//! ## Example config file (openapi-to-effect.toml):
//! ```toml
//! log_filter = "openapi_to_effect=debug"
//!
//! [formatter]
//! command = "prettier --parser babel-ts"
//!
//! [output]
//! bundle_header = true
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::output::{BasicFormatter, CommandFormatter, Formatter};

/// Main configuration for the generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Default `tracing` filter (overridden by `RUST_LOG`)
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Formatter settings
    #[serde(default)]
    pub formatter: FormatterConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Formatter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// External formatter command; whitespace cleanup only when unset
    #[serde(default)]
    pub command: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Prefix bundles with a generation timestamp comment
    #[serde(default = "default_true")]
    pub bundle_header: bool,
}

fn default_log_filter() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { bundle_header: true }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            formatter: FormatterConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration, with an explicit file layered over the default locations
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = [
            "openapi-to-effect.toml",
            ".openapi-to-effect.toml",
            "config/openapi-to-effect.toml",
        ];

        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        if let Some(config_dir) = directories::ProjectDirs::from("dev", "openapi-to-effect", "openapi-to-effect") {
            let xdg_config = config_dir.config_dir().join("openapi-to-effect.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("OPENAPI_TO_EFFECT")
                .prefix_separator("__")
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

    /// The configured formatter
    pub fn formatter(&self) -> Box<dyn Formatter> {
        match self.formatter.command.as_deref().and_then(CommandFormatter::from_command_line) {
            Some(command) => Box::new(command),
            None => Box::new(BasicFormatter),
        }
    }
}
