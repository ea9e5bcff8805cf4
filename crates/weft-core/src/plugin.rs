//! Plugins and the polymorphic `use` argument
//!
//! A [`Plugin`] is an attacher: invoked once when the processor freezes, it may
//! configure the processor through [`Attach`] and may return a [`Transformer`].
//! [`Pluggable`] covers every shape `use` accepts: a bare plugin, a plugin with
//! options or an on/off switch, a list, or a [`Preset`].

use crate::error::{BoxError, ProcessorError};
use crate::namespace::Namespace;
use crate::registry::Configuration;
use crate::slots::{Compiler, Parser};
use crate::transformer::Transformer;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

type AttachFn = dyn Fn(&mut Attach<'_>, &[Value]) -> Result<Option<Transformer>, BoxError> + Send + Sync;

/// Plugin-defining function
///
/// Identity is the identity of the underlying function: clones of a plugin are
/// the same plugin, separately constructed plugins are distinct even if their
/// code is identical.
#[derive(Clone)]
pub struct Plugin {
    name: Arc<str>,
    attach: Arc<AttachFn>,
}

impl Plugin {
    /// Create plugin from an attacher function
    pub fn new<F>(name: impl Into<String>, attach: F) -> Self
    where
        F: Fn(&mut Attach<'_>, &[Value]) -> Result<Option<Transformer>, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name.into()),
            attach: Arc::new(attach),
        }
    }

    /// Plugin whose only job is to contribute `transformer`
    pub fn transformer(name: impl Into<String>, transformer: Transformer) -> Self {
        Self::new(name, move |_, _| Ok(Some(transformer.clone())))
    }

    /// Plugin that installs a parser
    pub fn parser(name: impl Into<String>, parser: Parser) -> Self {
        Self::new(name, move |ctx, _| {
            ctx.set_parser(parser.clone());
            Ok(None)
        })
    }

    /// Plugin that installs a compiler
    pub fn compiler(name: impl Into<String>, compiler: Compiler) -> Self {
        Self::new(name, move |ctx, _| {
            ctx.set_compiler(compiler.clone());
            Ok(None)
        })
    }

    /// Plugin name (for logging and errors)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether both handles refer to the same plugin function
    #[inline]
    #[must_use]
    pub fn same_as(&self, other: &Plugin) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.attach).cast::<()>(),
            Arc::as_ptr(&other.attach).cast::<()>(),
        )
    }

    pub(crate) fn attach(
        &self,
        ctx: &mut Attach<'_>,
        options: &[Value],
    ) -> Result<Option<Transformer>, BoxError> {
        (self.attach)(ctx, options)
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin").field("name", &self.name).finish()
    }
}

/// Everything `use` accepts
#[derive(Debug, Clone)]
pub enum Pluggable {
    /// A plugin with its options
    Plugin {
        /// The plugin
        plugin: Plugin,
        /// Options spread into the attacher
        options: Vec<Value>,
        /// Disabled plugins are recorded but never attached
        enabled: bool,
    },
    /// Several pluggables, in order
    List(Vec<Pluggable>),
    /// Plugins plus processor-wide settings
    Preset(Preset),
}

impl Pluggable {
    /// Plugin with options; a lone boolean option is an on/off switch
    #[must_use]
    pub fn entry(plugin: Plugin, mut options: Vec<Value>) -> Self {
        let mut enabled = true;
        if let [Value::Bool(switch)] = options.as_slice() {
            enabled = *switch;
            options.clear();
        }
        Self::Plugin {
            plugin,
            options,
            enabled,
        }
    }
}

impl From<Plugin> for Pluggable {
    fn from(plugin: Plugin) -> Self {
        Self::entry(plugin, Vec::new())
    }
}

impl From<(Plugin, Value)> for Pluggable {
    fn from((plugin, options): (Plugin, Value)) -> Self {
        Self::entry(plugin, vec![options])
    }
}

impl From<(Plugin, bool)> for Pluggable {
    fn from((plugin, enabled): (Plugin, bool)) -> Self {
        Self::entry(plugin, vec![Value::Bool(enabled)])
    }
}

impl From<(Plugin, Vec<Value>)> for Pluggable {
    fn from((plugin, options): (Plugin, Vec<Value>)) -> Self {
        Self::entry(plugin, options)
    }
}

impl From<Vec<Pluggable>> for Pluggable {
    fn from(list: Vec<Pluggable>) -> Self {
        Self::List(list)
    }
}

impl From<Vec<Plugin>> for Pluggable {
    fn from(list: Vec<Plugin>) -> Self {
        Self::List(list.into_iter().map(Pluggable::from).collect())
    }
}

impl From<Preset> for Pluggable {
    fn from(preset: Preset) -> Self {
        Self::Preset(preset)
    }
}

/// Shareable configuration: plugins plus settings
///
/// `settings` must be a JSON object; it is deep-merged into the processor's
/// `settings` namespace entry when the preset is used.
#[derive(Debug, Clone, Default)]
pub struct Preset {
    /// Plugins, in order
    pub plugins: Vec<Pluggable>,
    /// Processor-wide settings
    pub settings: Option<Value>,
}

impl Preset {
    /// Create empty preset
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a plugin
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Into<Pluggable>) -> Self {
        self.plugins.push(plugin.into());
        self
    }

    /// Set settings
    #[must_use]
    pub fn with_settings(mut self, settings: Value) -> Self {
        self.settings = Some(settings);
        self
    }
}

/// Setup context handed to attachers while the processor freezes
///
/// This is the attacher's view of the processor: it can install collaborators,
/// read and write the namespace, and register further plugins, which are
/// attached later in the same freeze.
pub struct Attach<'a> {
    index: usize,
    plugin: &'a str,
    config: &'a mut Configuration,
    namespace: &'a mut Namespace,
}

impl<'a> Attach<'a> {
    pub(crate) fn new(
        index: usize,
        plugin: &'a str,
        config: &'a mut Configuration,
        namespace: &'a mut Namespace,
    ) -> Self {
        Self {
            index,
            plugin,
            config,
            namespace,
        }
    }

    /// Index of the attacher being invoked
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Name of the plugin being attached
    #[inline]
    #[must_use]
    pub fn plugin(&self) -> &str {
        self.plugin
    }

    /// Install the parser; the last plugin to set it wins
    pub fn set_parser(&mut self, parser: Parser) -> &mut Self {
        if self.config.parser.is_some() {
            tracing::debug!(plugin = self.plugin, "replacing parser");
        }
        self.config.parser = Some(parser);
        self
    }

    /// Install the compiler; the last plugin to set it wins
    pub fn set_compiler(&mut self, compiler: Compiler) -> &mut Self {
        if self.config.compiler.is_some() {
            tracing::debug!(plugin = self.plugin, "replacing compiler");
        }
        self.config.compiler = Some(compiler);
        self
    }

    /// Whether a parser is installed
    #[must_use]
    pub fn has_parser(&self) -> bool {
        self.config.parser.is_some()
    }

    /// Whether a compiler is installed
    #[must_use]
    pub fn has_compiler(&self) -> bool {
        self.config.compiler.is_some()
    }

    /// The processor namespace
    #[inline]
    #[must_use]
    pub fn data(&self) -> &Namespace {
        &*self.namespace
    }

    /// Value stored under `key`
    #[must_use]
    pub fn data_get(&self, key: &str) -> Option<&Value> {
        self.namespace.get(key)
    }

    /// Store `value` under `key`
    pub fn set_data(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.namespace.insert(key, value);
        self
    }

    /// Processor-wide settings
    #[must_use]
    pub fn settings(&self) -> Option<&Map<String, Value>> {
        self.namespace.settings()
    }

    /// Register more plugins; they attach after the current one
    ///
    /// # Errors
    /// Returns [`ProcessorError::Configuration`] for malformed presets
    pub fn use_plugin(&mut self, plugin: impl Into<Pluggable>) -> Result<&mut Self, ProcessorError> {
        self.config.add(self.namespace, plugin.into())?;
        Ok(self)
    }
}

impl fmt::Debug for Attach<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attach")
            .field("index", &self.index)
            .field("plugin", &self.plugin)
            .finish_non_exhaustive()
    }
}
