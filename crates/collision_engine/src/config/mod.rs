//! Configuration system
//!
//! Settings are plain serde structs that can be loaded from and saved to
//! TOML or RON files, picked by file extension.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
pub use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;
use crate::spatial::QuadtreeConfig;

/// On-disk formats settings can be stored in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml` files
    Toml,
    /// `.ron` files
    Ron,
}

impl ConfigFormat {
    /// Pick the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Settings that can be read from and written to TOML or RON
pub trait Config: Serialize + DeserializeOwned + Default {
    /// Parse settings from text in the given format
    fn parse(contents: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
            ConfigFormat::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        }
    }

    /// Render settings as text in the given format
    fn render(&self, format: ConfigFormat) -> Result<String, ConfigError> {
        match format {
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string())),
            ConfigFormat::Ron => ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string())),
        }
    }

    /// Load settings from a `.toml` or `.ron` file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, format)
    }

    /// Load settings from `path`, or the defaults if there is no such file
    fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to a `.toml` or `.ron` file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = self.render(ConfigFormat::from_path(path)?)?;
        std::fs::write(path, contents).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// Reading or writing a settings file failed
    #[error("cannot access {}: {source}", path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: std::io::Error,
    },

    /// Text is not valid for the format
    #[error("Parse error: {0}")]
    Parse(String),

    /// Settings could not be rendered
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// File extension is neither `.toml` nor `.ron`
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values that parse but make no sense
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// # Collision Engine Configuration
///
/// World region, index tuning and the log filter used by hosts that let the
/// engine bootstrap logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Default log filter
    pub log_level: String,
    /// Region covered by the quadtree root
    pub world: Bounds,
    /// Quadtree tuning
    pub quadtree: QuadtreeConfig,
}

impl CollisionConfig {
    /// Create a configuration for the given world region
    pub fn new(world: Bounds) -> Self {
        Self {
            log_level: "info".to_string(),
            world,
            quadtree: QuadtreeConfig::default(),
        }
    }

    /// Set quadtree tuning
    #[must_use]
    pub const fn with_quadtree(mut self, quadtree: QuadtreeConfig) -> Self {
        self.quadtree = quadtree;
        self
    }

    /// Set log level
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let world = &self.world;
        let finite = [world.x, world.y, world.width, world.height]
            .iter()
            .all(|value| value.is_finite());
        if !finite || world.width <= 0.0 || world.height <= 0.0 {
            return Err(ConfigError::Invalid(format!("world region must have a positive finite size: {world}")));
        }

        self.quadtree.validate().map_err(ConfigError::Invalid)
    }
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self::new(Bounds::new(0.0, 0.0, 1024.0, 1024.0))
    }
}

impl Config for CollisionConfig {}
