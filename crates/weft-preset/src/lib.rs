//! Weft Presets
//!
//! Declarative processor configuration: a preset document lists plugins by
//! name and carries settings. Documents are read from TOML, JSON or YAML and
//! resolved against a [`PluginCatalog`] into a core [`weft_core::Preset`].
//!
//! # Example
//!
//! ```
//! use weft_core::{Plugin, Processor};
//! use weft_preset::{PluginCatalog, PresetConfig};
//!
//! let catalog = PluginCatalog::new().with("noop", Plugin::new("noop", |_, _| Ok(None)));
//! let config = PresetConfig::from_toml_str("plugins = [\"noop\"]\n[settings]\nquiet = true\n")?;
//!
//! let processor = Processor::new().use_plugin(catalog.resolve(&config)?)?;
//! assert_eq!(processor.attachers().len(), 1);
//! assert!(processor.settings().is_some());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod catalog;
pub mod config;
pub mod error;

pub use catalog::PluginCatalog;
pub use config::{Format, PluginSpec, PresetConfig};
pub use error::{PresetError, PresetResult};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
