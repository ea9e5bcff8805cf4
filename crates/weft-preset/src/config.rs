//! Preset documents
//!
//! A preset names plugins by catalog key and carries processor-wide settings:
//!
//! ```toml
//! plugins = ["text_parse", { name = "trim", enabled = false }, "text_stringify"]
//!
//! [settings.text]
//! trim = true
//! ```

use crate::error::{PresetError, PresetResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// One plugin reference in a preset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginSpec {
    /// Bare catalog name, enabled with no options
    Name(String),
    /// Catalog name with options and an on/off switch
    Table {
        /// Catalog name
        name: String,
        /// Options spread into the attacher
        #[serde(default)]
        options: Vec<Value>,
        /// `false` registers the plugin disabled
        #[serde(default)]
        enabled: Option<bool>,
    },
}

impl PluginSpec {
    /// Catalog name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Table { name, .. } => name,
        }
    }
}

/// Deserialized preset document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresetConfig {
    /// Plugins, in order
    #[serde(default)]
    pub plugins: Vec<PluginSpec>,
    /// Processor-wide settings
    #[serde(default)]
    pub settings: Value,
}

/// Supported preset document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.toml`
    Toml,
    /// `.json`
    Json,
    /// `.yaml` / `.yml`
    Yaml,
}

impl Format {
    /// Detect format from file extension
    ///
    /// # Errors
    /// Returns [`PresetError::UnsupportedFormat`] for unknown extensions
    pub fn from_path(path: &Path) -> PresetResult<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(PresetError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

impl PresetConfig {
    /// Parse from TOML string
    ///
    /// # Errors
    /// Returns error if TOML is invalid
    pub fn from_toml_str(source: &str) -> PresetResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Parse from JSON string
    ///
    /// # Errors
    /// Returns error if JSON is invalid
    pub fn from_json_str(source: &str) -> PresetResult<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Parse from YAML string
    ///
    /// # Errors
    /// Returns error if YAML is invalid
    pub fn from_yaml_str(source: &str) -> PresetResult<Self> {
        Ok(serde_yaml::from_str(source)?)
    }

    /// Parse `source` in the given format
    ///
    /// # Errors
    /// Returns error if the document is invalid
    pub fn parse(source: &str, format: Format) -> PresetResult<Self> {
        match format {
            Format::Toml => Self::from_toml_str(source),
            Format::Json => Self::from_json_str(source),
            Format::Yaml => Self::from_yaml_str(source),
        }
    }

    /// Load from a file, picking the format by extension
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> PresetResult<Self> {
        let path = path.as_ref();
        let format = Format::from_path(path)?;
        let source = std::fs::read_to_string(path).map_err(|source| PresetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), ?format, "loading preset");
        Self::parse(&source, format)
    }
}
