//! Processor facade
//!
//! A [`Processor`] starts out configurable, accumulating plugins through
//! [`use_plugin`](Processor::use_plugin). The first call to `freeze`, or to any
//! operation that needs the pipeline, invokes every attacher and seals the
//! configuration into a shared [`Pipeline`]. From then on:
//!
//! - cloning is a fork: the pipeline is shared, the namespace is copied
//! - configuring again works on an unfrozen copy, never on the shared pipeline
//! - the namespace stays writable, and transformers read it at run time
//!
//! `run` hands transformers this processor's own namespace. `process` runs
//! against a fresh fork of it per call, so concurrent documents never observe
//! each other's writes.
//!
//! ```
//! use weft_core::prelude::*;
//!
//! let upper = Plugin::transformer(
//!     "upper",
//!     Transformer::sync(|tree, _, _| {
//!         let value = tree.value().unwrap_or_default().to_uppercase();
//!         Ok(Some(Node::text(value)))
//!     }),
//! );
//!
//! let mut processor = Processor::new()
//!     .use_plugin(Plugin::parser("text", Parser::new(|doc, _| Ok(Node::text(doc)))))?
//!     .use_plugin(upper)?
//!     .use_plugin(Plugin::compiler(
//!         "text",
//!         Compiler::new(|tree, _| Ok(Output::from(tree.value().unwrap_or_default()))),
//!     ))?;
//!
//! let file = processor.process_sync("abc")?;
//! assert_eq!(file.to_string(), "ABC");
//! # Ok::<(), weft_core::ProcessorError>(())
//! ```

use crate::error::{ProcessorError, ProcessorResult};
use crate::file::{Output, VFile};
use crate::namespace::SharedNamespace;
use crate::node::Node;
use crate::plugin::{Pluggable, Plugin};
use crate::registry::{Attacher, Configuration, Pipeline};
use crate::slots::{Compiler, Parser};
use crate::transformer::Transformed;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
enum State {
    Configuring(Configuration),
    Frozen(Arc<Pipeline>),
}

/// Plugin-extensible parse → transform → stringify pipeline
#[derive(Debug)]
pub struct Processor {
    state: State,
    namespace: SharedNamespace,
}

impl Clone for Processor {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            namespace: self.namespace.fork(),
        }
    }
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor {
    /// Create an empty, unfrozen processor
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: State::Configuring(Configuration::default()),
            namespace: SharedNamespace::default(),
        }
    }

    /// Whether the configuration is sealed
    #[inline]
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        matches!(self.state, State::Frozen(_))
    }

    /// Registered attachers in order, including disabled ones
    #[must_use]
    pub fn attachers(&self) -> &[Attacher] {
        match &self.state {
            State::Configuring(config) => &config.attachers,
            State::Frozen(pipeline) => pipeline.attachers(),
        }
    }

    /// The sealed pipeline, if frozen
    #[must_use]
    pub fn pipeline(&self) -> Option<&Arc<Pipeline>> {
        match &self.state {
            State::Configuring(_) => None,
            State::Frozen(pipeline) => Some(pipeline),
        }
    }

    /// Unfrozen processor with the same attachers, slots and a copy of the namespace
    ///
    /// Transformers are not carried over; the copy collects its own when it
    /// freezes, invoking every attacher again.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            state: State::Configuring(self.reopened()),
            namespace: self.namespace.fork(),
        }
    }

    fn reopened(&self) -> Configuration {
        match &self.state {
            State::Configuring(config) => {
                Configuration::reopen(&config.attachers, config.parser.clone(), config.compiler.clone())
            }
            State::Frozen(pipeline) => Configuration::reopen(
                pipeline.attachers(),
                pipeline.parser().cloned(),
                pipeline.compiler().cloned(),
            ),
        }
    }

    fn thaw(&mut self) {
        if self.is_frozen() {
            tracing::debug!("configuring a frozen processor; continuing on a copy");
            let config = self.reopened();
            self.state = State::Configuring(config);
        }
    }

    /// Register a plugin, a list, or a preset
    ///
    /// On a frozen processor this continues on [`copy`](Self::copy); clone the
    /// processor first to keep the frozen one.
    ///
    /// # Errors
    /// Returns [`ProcessorError::Configuration`] when a preset carries
    /// non-object settings
    pub fn use_plugin(mut self, plugin: impl Into<Pluggable>) -> ProcessorResult<Self> {
        self.thaw();
        if let State::Configuring(config) = &mut self.state {
            config.add(&mut self.namespace.write(), plugin.into())?;
        }
        Ok(self)
    }

    /// Register a plugin with options spread into its attacher
    ///
    /// # Errors
    /// See [`use_plugin`](Self::use_plugin)
    pub fn use_with(self, plugin: Plugin, options: impl IntoIterator<Item = Value>) -> ProcessorResult<Self> {
        self.use_plugin(Pluggable::entry(plugin, options.into_iter().collect()))
    }

    /// Install a parser directly; an attacher setting one later still wins
    #[must_use]
    pub fn with_parser(mut self, parser: Parser) -> Self {
        self.thaw();
        if let State::Configuring(config) = &mut self.state {
            config.parser = Some(parser);
        }
        self
    }

    /// Install a compiler directly; an attacher setting one later still wins
    #[must_use]
    pub fn with_compiler(mut self, compiler: Compiler) -> Self {
        self.thaw();
        if let State::Configuring(config) = &mut self.state {
            config.compiler = Some(compiler);
        }
        self
    }

    /// Invoke every pending attacher and seal the configuration
    ///
    /// Idempotent: a frozen processor is returned unchanged and no attacher is
    /// ever invoked twice.
    ///
    /// # Errors
    /// Returns [`ProcessorError::Attach`] for the first attacher that fails;
    /// the processor stays unfrozen
    pub fn freeze(&mut self) -> ProcessorResult<&mut Self> {
        self.sealed()?;
        Ok(self)
    }

    fn sealed(&mut self) -> ProcessorResult<Arc<Pipeline>> {
        let config = match &mut self.state {
            State::Frozen(pipeline) => return Ok(Arc::clone(pipeline)),
            State::Configuring(config) => config,
        };

        let span = tracing::debug_span!("freeze", attachers = config.attachers.len());
        let _guard = span.enter();
        config.attach_pending(&mut self.namespace.write())?;

        let pipeline = Arc::new(std::mem::take(config).seal());
        tracing::info!(
            attachers = pipeline.attachers().len(),
            transformers = pipeline.runner().len(),
            parser = pipeline.parser().is_some(),
            compiler = pipeline.compiler().is_some(),
            "processor frozen"
        );
        self.state = State::Frozen(Arc::clone(&pipeline));
        Ok(pipeline)
    }

    /// Parse a document into a tree
    ///
    /// Without a parser the result is an empty root.
    ///
    /// # Errors
    /// Freeze failures, or [`ProcessorError::Parse`]
    pub fn parse(&mut self, file: impl Into<VFile>) -> ProcessorResult<Node> {
        self.sealed()?.parse(&file.into())
    }

    /// Compile a tree
    ///
    /// Without a compiler the tree comes back as [`Output::Tree`].
    ///
    /// # Errors
    /// Freeze failures, or [`ProcessorError::Compile`]
    pub fn stringify(&mut self, tree: Node, file: &VFile) -> ProcessorResult<Output> {
        self.sealed()?.stringify(tree, file)
    }

    /// Compile an untyped value
    ///
    /// Without a compiler the value comes back as [`Output::Value`].
    ///
    /// # Errors
    /// [`ProcessorError::NotANode`] when a compiler is set and `value` is not a
    /// node, otherwise as [`stringify`](Self::stringify)
    pub fn stringify_value(&mut self, value: Value, file: &VFile) -> ProcessorResult<Output> {
        let pipeline = self.sealed()?;
        if pipeline.compiler().is_none() {
            return Ok(Output::Value(value));
        }
        pipeline.stringify(Node::try_from(value)?, file)
    }

    /// Run the transformers over a tree
    ///
    /// Freezes immediately; the returned future owns everything it needs and
    /// can be spawned. Transformers share this processor's namespace.
    pub fn run(&mut self, tree: Node, file: VFile) -> BoxFuture<'static, ProcessorResult<Transformed>> {
        let namespace = self.namespace.clone();
        match self.sealed() {
            Ok(pipeline) => async move { pipeline.runner().run(tree, file, namespace).await }.boxed(),
            Err(error) => future::ready(Err(error)).boxed(),
        }
    }

    /// Run the transformers without suspending
    ///
    /// # Errors
    /// [`ProcessorError::AsyncUsage`] if any transformer tries to suspend, or
    /// the first transformer failure
    pub fn run_sync(&mut self, tree: Node, file: VFile) -> ProcessorResult<Transformed> {
        self.sealed()?.runner().run_sync("run_sync", tree, file, &self.namespace)
    }

    /// Run the transformers and hand the outcome to `callback`
    ///
    /// # Panics
    /// Must be called from within a tokio runtime
    pub fn run_with<F>(&mut self, tree: Node, file: VFile, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(ProcessorResult<Transformed>) + Send + 'static,
    {
        let run = self.run(tree, file);
        tokio::spawn(async move { callback(run.await) })
    }

    /// Parse, run and stringify one document
    ///
    /// Transformers see a fork of this processor's namespace taken when the
    /// call is made, so concurrent calls cannot interfere with each other.
    /// Text or bytes output becomes the file's content; any other output is
    /// stored in [`VFile::result`].
    pub fn process(&mut self, file: impl Into<VFile>) -> BoxFuture<'static, ProcessorResult<VFile>> {
        let file = file.into();
        match self.sealed() {
            Ok(pipeline) => {
                let namespace = self.namespace.fork();
                async move { pipeline.process(file, namespace).await }.boxed()
            }
            Err(error) => future::ready(Err(error)).boxed(),
        }
    }

    /// [`process`](Self::process) without suspending
    ///
    /// # Errors
    /// [`ProcessorError::AsyncUsage`] if any transformer tries to suspend, or
    /// the first failure of any stage
    pub fn process_sync(&mut self, file: impl Into<VFile>) -> ProcessorResult<VFile> {
        let file = file.into();
        self.sealed()?.process_sync(file, &self.namespace.fork())
    }

    /// [`process`](Self::process) handing the outcome to `callback`
    ///
    /// # Panics
    /// Must be called from within a tokio runtime
    pub fn process_with<F>(&mut self, file: impl Into<VFile>, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(ProcessorResult<VFile>) + Send + 'static,
    {
        let process = self.process(file);
        tokio::spawn(async move { callback(process.await) })
    }

    /// Copy of the whole namespace
    #[must_use]
    pub fn data(&self) -> Map<String, Value> {
        self.namespace.to_map()
    }

    /// Handle to this processor's namespace
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &SharedNamespace {
        &self.namespace
    }

    /// Value stored under `key`
    #[must_use]
    pub fn data_get(&self, key: &str) -> Option<Value> {
        self.namespace.get(key)
    }

    /// Store `value` under `key`; allowed on frozen processors
    pub fn set_data(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.namespace.insert(key, value);
        self
    }

    /// Settings merged in by presets
    #[must_use]
    pub fn settings(&self) -> Option<Map<String, Value>> {
        self.namespace.settings()
    }
}

/// Operations on a sealed pipeline
///
/// These only need `&self`, so a frozen processor shared behind an `Arc` can
/// be driven through [`Processor::pipeline`] without locking it. The caller
/// picks the namespace the transformers see; pass a fork to keep runs apart.
impl Pipeline {
    /// Parse a document; an empty root without a parser
    ///
    /// # Errors
    /// [`ProcessorError::Parse`]
    pub fn parse(&self, file: &VFile) -> ProcessorResult<Node> {
        match self.parser() {
            Some(parser) => parser.parse(&file.text(), file).map_err(ProcessorError::Parse),
            None => Ok(Node::root()),
        }
    }

    /// Compile a tree; the tree itself without a compiler
    ///
    /// # Errors
    /// [`ProcessorError::Compile`]
    pub fn stringify(&self, tree: Node, file: &VFile) -> ProcessorResult<Output> {
        match self.compiler() {
            Some(compiler) => compiler.compile(&tree, file).map_err(ProcessorError::Compile),
            None => Ok(Output::Tree(tree)),
        }
    }

    /// Parse, run and stringify one document against `namespace`
    ///
    /// # Errors
    /// The first failure of any stage
    pub async fn process(&self, file: VFile, namespace: SharedNamespace) -> ProcessorResult<VFile> {
        let tree = self.parse(&file)?;
        let (tree, file) = self.runner().run(tree, file, namespace).await?;
        self.finish(tree, file)
    }

    /// [`process`](Self::process) without suspending
    ///
    /// # Errors
    /// [`ProcessorError::AsyncUsage`] if any transformer tries to suspend, or
    /// the first failure of any stage
    pub fn process_sync(&self, file: VFile, namespace: &SharedNamespace) -> ProcessorResult<VFile> {
        let tree = self.parse(&file)?;
        let (tree, file) = self.runner().run_sync("process_sync", tree, file, namespace)?;
        self.finish(tree, file)
    }

    fn finish(&self, tree: Node, mut file: VFile) -> ProcessorResult<VFile> {
        match self.stringify(tree, &file)?.into_contents() {
            Ok(contents) => file.value = Some(contents),
            Err(other) => file.result = Some(other),
        }
        Ok(file)
    }
}
