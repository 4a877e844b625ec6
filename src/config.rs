use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{Result, ThinkingError};
use crate::validation::DEFAULT_MAX_THOUGHT_LENGTH;
use crate::visual::DisplayStyle;

/// Sequential thinking service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ThinkingConfig {
    /// Display side channel
    pub display: DisplayConfig,
    /// Input limits
    pub validation: ValidationConfig,
    /// Server identification
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayConfig {
    /// Whether rendered thoughts are written to stderr at all
    pub enabled: bool,
    pub style: DisplayStyle,
    /// Maximum box width in columns
    pub width: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidationConfig {
    /// Maximum thought length in characters
    pub max_thought_length: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
}

impl Default for ThinkingConfig {
    fn default() -> Self {
        Self {
            display: DisplayConfig::default(),
            validation: ValidationConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            style: DisplayStyle::Rich,
            width: 80,
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_thought_length: DEFAULT_MAX_THOUGHT_LENGTH,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "sequential-thinking".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl ThinkingConfig {
    /// Load configuration: defaults, then an optional TOML file, then
    /// SEQUENTIAL_THINKING__* environment variables
    pub fn load() -> Result<Self> {
        let mut config = Config::builder()
            .set_default("display.enabled", true)?
            .set_default("display.style", "rich")?
            .set_default("display.width", 80_i64)?
            .set_default("validation.max_thought_length", DEFAULT_MAX_THOUGHT_LENGTH as i64)?
            .set_default("server.name", "sequential-thinking")?
            .set_default("server.version", env!("CARGO_PKG_VERSION"))?;

        if let Ok(config_file) = std::env::var("SEQUENTIAL_THINKING_CONFIG") {
            tracing::info!("Using config file: {}", config_file);
            config = config.add_source(File::with_name(&config_file).required(false));
        } else {
            config = config.add_source(File::with_name("sequential-thinking.toml").required(false));
        }

        config = config.add_source(
            Environment::with_prefix("SEQUENTIAL_THINKING")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: Self = config.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        if self.display.width < 20 {
            return Err(ThinkingError::Configuration(format!(
                "display.width must be at least 20 columns, got {}",
                self.display.width
            )));
        }

        if self.validation.max_thought_length == 0 {
            return Err(ThinkingError::Configuration(
                "validation.max_thought_length must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
