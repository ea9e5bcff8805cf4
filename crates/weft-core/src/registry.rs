//! Attacher registry and freeze
//!
//! Holds the mutable side of a processor:
//! - the ordered attacher list, with identity-based replacement
//! - the parser and compiler slots
//! - transformers collected so far, and the cursor of the next attacher to invoke
//!
//! Once every attacher has run, the configuration is sealed into a [`Pipeline`]
//! shared by reference between forks.

use crate::error::{ProcessorError, ProcessorResult};
use crate::namespace::{deep_merge, Namespace, SETTINGS_KEY};
use crate::plugin::{Attach, Pluggable, Plugin, Preset};
use crate::runner::{BoundTransformer, Runner};
use crate::slots::{Compiler, Parser};
use serde_json::Value;
use std::sync::Arc;

/// One registered plugin with its stored options
#[derive(Debug, Clone)]
pub struct Attacher {
    plugin: Plugin,
    options: Vec<Value>,
    enabled: bool,
}

impl Attacher {
    /// The plugin
    #[inline]
    #[must_use]
    pub fn plugin(&self) -> &Plugin {
        &self.plugin
    }

    /// Options spread into the attacher at freeze time
    #[inline]
    #[must_use]
    pub fn options(&self) -> &[Value] {
        &self.options
    }

    /// Whether the attacher is invoked at freeze time
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Mutable configuration of an unfrozen processor
#[derive(Debug, Clone, Default)]
pub(crate) struct Configuration {
    pub(crate) attachers: Vec<Attacher>,
    pub(crate) parser: Option<Parser>,
    pub(crate) compiler: Option<Compiler>,
    transformers: Vec<BoundTransformer>,
    cursor: usize,
}

impl Configuration {
    /// Register everything in `pluggable`, in order
    pub(crate) fn add(&mut self, namespace: &mut Namespace, pluggable: Pluggable) -> ProcessorResult<()> {
        match pluggable {
            Pluggable::Plugin {
                plugin,
                options,
                enabled,
            } => {
                self.register(plugin, options, enabled);
                Ok(())
            }
            Pluggable::List(list) => list.into_iter().try_for_each(|item| self.add(namespace, item)),
            Pluggable::Preset(preset) => self.add_preset(namespace, preset),
        }
    }

    fn add_preset(&mut self, namespace: &mut Namespace, preset: Preset) -> ProcessorResult<()> {
        let Preset { plugins, settings } = preset;
        if let Some(settings) = &settings {
            if !settings.is_object() {
                return Err(ProcessorError::configuration(format!(
                    "preset settings must be an object, got {}",
                    kind_of(settings)
                )));
            }
        }
        for plugin in plugins {
            self.add(namespace, plugin)?;
        }
        if let Some(settings) = settings {
            namespace.merge(SETTINGS_KEY, settings);
        }
        Ok(())
    }

    fn register(&mut self, plugin: Plugin, mut options: Vec<Value>, enabled: bool) {
        let existing = self
            .attachers
            .iter_mut()
            .find(|attacher| attacher.plugin.same_as(&plugin));

        let Some(existing) = existing else {
            tracing::debug!(plugin = plugin.name(), enabled, "registered plugin");
            self.attachers.push(Attacher {
                plugin,
                options,
                enabled,
            });
            return;
        };

        if enabled {
            if let (Some(Value::Object(_)), Some(Value::Object(_))) =
                (existing.options.first(), options.first())
            {
                let mut merged = existing.options[0].clone();
                deep_merge(&mut merged, options[0].take());
                options[0] = merged;
            }
        }
        tracing::debug!(plugin = plugin.name(), enabled, "replaced plugin options");
        existing.options = options;
        existing.enabled = enabled;
    }

    /// Invoke every attacher that has not run yet
    ///
    /// Attachers registered while this runs are picked up in the same pass.
    /// The cursor moves past an attacher before it is invoked, so a failing
    /// attacher is never retried.
    pub(crate) fn attach_pending(&mut self, namespace: &mut Namespace) -> ProcessorResult<()> {
        while let Some(attacher) = self.attachers.get(self.cursor).cloned() {
            let index = self.cursor;
            self.cursor += 1;
            if !attacher.enabled {
                tracing::debug!(index, plugin = attacher.plugin.name(), "skipping disabled plugin");
                continue;
            }

            tracing::debug!(index, plugin = attacher.plugin.name(), "attaching");
            let mut ctx = Attach::new(index, attacher.plugin.name(), self, namespace);
            let returned = attacher
                .plugin
                .attach(&mut ctx, &attacher.options)
                .map_err(|source| ProcessorError::Attach {
                    index,
                    plugin: attacher.plugin.name().to_string(),
                    source,
                })?;

            if let Some(transformer) = returned {
                self.transformers.push(BoundTransformer {
                    index,
                    plugin: Arc::from(attacher.plugin.name()),
                    transformer,
                });
            }
        }
        Ok(())
    }

    /// Seal into a shareable pipeline
    pub(crate) fn seal(self) -> Pipeline {
        Pipeline {
            attachers: self.attachers.into(),
            parser: self.parser,
            compiler: self.compiler,
            runner: Runner::new(self.transformers.into()),
        }
    }

    /// Fresh configuration with the same attachers and slots
    pub(crate) fn reopen(attachers: &[Attacher], parser: Option<Parser>, compiler: Option<Compiler>) -> Self {
        Self {
            attachers: attachers.to_vec(),
            parser,
            compiler,
            transformers: Vec::new(),
            cursor: 0,
        }
    }
}

/// Immutable configuration of a frozen processor
#[derive(Debug)]
pub struct Pipeline {
    attachers: Arc<[Attacher]>,
    parser: Option<Parser>,
    compiler: Option<Compiler>,
    runner: Runner,
}

impl Pipeline {
    /// Registered attachers, including disabled ones
    #[inline]
    #[must_use]
    pub fn attachers(&self) -> &[Attacher] {
        &self.attachers
    }

    /// The parser slot
    #[inline]
    #[must_use]
    pub fn parser(&self) -> Option<&Parser> {
        self.parser.as_ref()
    }

    /// The compiler slot
    #[inline]
    #[must_use]
    pub fn compiler(&self) -> Option<&Compiler> {
        self.compiler.as_ref()
    }

    /// The transform runner
    #[inline]
    #[must_use]
    pub fn runner(&self) -> &Runner {
        &self.runner
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
