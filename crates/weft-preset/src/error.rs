//! Preset loading errors

use std::path::PathBuf;
use weft_core::ProcessorError;

/// Errors raised while loading or resolving a preset
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    /// Preset file could not be read
    #[error("cannot read preset {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Invalid TOML
    #[error("invalid TOML preset: {0}")]
    InvalidToml(#[from] toml::de::Error),

    /// Invalid JSON
    #[error("invalid JSON preset: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Invalid YAML
    #[error("invalid YAML preset: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    /// File extension does not name a known format
    #[error("unsupported preset format: {0}")]
    UnsupportedFormat(String),

    /// Plugin name not found in the catalog
    #[error("unknown plugin `{0}`")]
    UnknownPlugin(String),

    /// `settings` is present but not a table
    #[error("preset settings must be a table, got {0}")]
    InvalidSettings(String),
}

impl From<PresetError> for ProcessorError {
    fn from(err: PresetError) -> Self {
        ProcessorError::configuration(err.to_string())
    }
}

/// Result type alias for preset operations
pub type PresetResult<T> = Result<T, PresetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_plugin_becomes_configuration_error() {
        let err: ProcessorError = PresetError::UnknownPlugin("nope".to_string()).into();
        assert!(matches!(err, ProcessorError::Configuration(ref msg) if msg == "unknown plugin `nope`"));
    }
}
