use annotation::{DiscoveryOptions, DEFAULT_CATEGORY_ID};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

/// Dataset location and defaults for new annotations
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct RelabelConfig {
    pub dataset_root: PathBuf,
    pub annotation_extension: String,
    pub image_extension: String,
    pub default_category_id: u64,
}

impl Default for RelabelConfig {
    fn default() -> Self {
        let discovery = DiscoveryOptions::default();
        Self {
            dataset_root: PathBuf::from("."),
            annotation_extension: discovery.annotation_extension,
            image_extension: discovery.image_extension,
            default_category_id: DEFAULT_CATEGORY_ID,
        }
    }
}

impl RelabelConfig {
    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path)?),
            Some("json") => Self::from_json(&fs::read_to_string(path)?),
            _ => Err(ConfigError::UnsupportedFileFormat),
        }
    }

    /// Start from `path` when given, otherwise from the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        path.map_or_else(|| Ok(Self::default()), Self::from_file)
    }

    /// Apply command-line overrides on top of the loaded values
    pub fn with_overrides(mut self, root: Option<PathBuf>, category_id: Option<u64>) -> Self {
        if let Some(root) = root {
            self.dataset_root = root;
        }
        if let Some(category_id) = category_id {
            self.default_category_id = category_id;
        }
        self
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            annotation_extension: self.annotation_extension.clone(),
            image_extension: self.image_extension.clone(),
        }
    }
}
