//! Named plugin catalog
//!
//! Presets refer to plugins by name; the catalog maps those names to plugin
//! functions and turns a [`PresetConfig`] into a core [`Preset`].

use crate::config::{PluginSpec, PresetConfig};
use crate::error::{PresetError, PresetResult};
use indexmap::IndexMap;
use serde_json::Value;
use std::path::Path;
use weft_core::{Pluggable, Plugin, Preset};

/// Name → plugin registry, in registration order
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    plugins: IndexMap<String, Plugin>,
}

impl PluginCatalog {
    /// Create empty catalog
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `plugin` under `name`, replacing any previous entry
    pub fn register(&mut self, name: impl Into<String>, plugin: Plugin) -> &mut Self {
        let name = name.into();
        if self.plugins.insert(name.clone(), plugin).is_some() {
            tracing::debug!(%name, "replaced catalog entry");
        }
        self
    }

    /// Builder form of [`register`](Self::register)
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, plugin: Plugin) -> Self {
        self.register(name, plugin);
        self
    }

    /// Plugin registered under `name`
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.plugins.get(name)
    }

    /// Whether `name` is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    /// Registered names, in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    /// Number of registered plugins
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Whether the catalog is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Look up a plugin by name
    ///
    /// # Errors
    /// Returns [`PresetError::UnknownPlugin`] if `name` is not registered
    pub fn require(&self, name: &str) -> PresetResult<Plugin> {
        self.get(name)
            .cloned()
            .ok_or_else(|| PresetError::UnknownPlugin(name.to_string()))
    }

    /// Turn a preset document into a core preset
    ///
    /// # Errors
    /// Returns [`PresetError::UnknownPlugin`] for names not in the catalog and
    /// [`PresetError::InvalidSettings`] when settings are not a table
    pub fn resolve(&self, config: &PresetConfig) -> PresetResult<Preset> {
        let plugins = config
            .plugins
            .iter()
            .map(|spec| self.resolve_spec(spec))
            .collect::<PresetResult<Vec<_>>>()?;

        let settings = match &config.settings {
            Value::Null => None,
            Value::Object(_) => Some(config.settings.clone()),
            Value::Bool(_) => return Err(PresetError::InvalidSettings("a boolean".to_string())),
            Value::Number(_) => return Err(PresetError::InvalidSettings("a number".to_string())),
            Value::String(_) => return Err(PresetError::InvalidSettings("a string".to_string())),
            Value::Array(_) => return Err(PresetError::InvalidSettings("an array".to_string())),
        };

        Ok(Preset { plugins, settings })
    }

    fn resolve_spec(&self, spec: &PluginSpec) -> PresetResult<Pluggable> {
        match spec {
            PluginSpec::Name(name) => Ok(self.require(name)?.into()),
            PluginSpec::Table {
                name,
                options,
                enabled,
            } => {
                let plugin = self.require(name)?;
                Ok(match enabled {
                    Some(false) => (plugin, false).into(),
                    _ => Pluggable::entry(plugin, options.clone()),
                })
            }
        }
    }

    /// Load a preset file and resolve it
    ///
    /// # Errors
    /// See [`PresetConfig::load`] and [`resolve`](Self::resolve)
    pub fn load(&self, path: impl AsRef<Path>) -> PresetResult<Preset> {
        self.resolve(&PresetConfig::load(path)?)
    }
}
