//! Factory configuration loaded from TOML
//!
//! ```toml
//! [sources]
//! base_path = "assets/things"
//!
//! [references]
//! prefix = "@"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading or parsing configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    ParseError(#[from] toml::de::Error),
}

/// Default prefix marking a property value as a reference to another entity
pub const DEFAULT_REFERENCE_PREFIX: &str = "@";

/// Configuration options for a [`crate::ThingFactory`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactoryConfig {
    /// Base path for resolving definition file identifiers
    pub base_path: Option<PathBuf>,

    /// Prefix marking a property value as a reference
    pub reference_prefix: String,
}

/// TOML structure for deserializing configuration
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    sources: TomlSources,
    #[serde(default)]
    references: TomlReferences,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlSources {
    base_path: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TomlReferences {
    prefix: Option<String>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            base_path: None,
            reference_prefix: DEFAULT_REFERENCE_PREFIX.to_string(),
        }
    }
}

impl FactoryConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let parsed: TomlConfig = toml::from_str(content)?;

        Ok(FactoryConfig {
            base_path: parsed.sources.base_path,
            reference_prefix: parsed
                .references
                .prefix
                .unwrap_or_else(|| DEFAULT_REFERENCE_PREFIX.to_string()),
        })
    }

    /// Set the base path for definition files
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Set the reference prefix
    pub fn with_reference_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.reference_prefix = prefix.into();
        self
    }
}
