//! Transform runner
//!
//! Executes transformers strictly in registration order against one tree and
//! file. Only one transformer is in flight at a time; the first failure aborts
//! the run and nothing is rolled back.

use crate::error::ProcessorError;
use crate::file::VFile;
use crate::namespace::SharedNamespace;
use crate::node::Node;
use crate::transformer::{Step, Transformed, Transformer};
use std::sync::Arc;
use tracing::Instrument;

/// A transformer together with the attacher that produced it
#[derive(Debug, Clone)]
pub struct BoundTransformer {
    /// Attacher index in registration order
    pub index: usize,
    /// Plugin name
    pub plugin: Arc<str>,
    /// The transformer
    pub transformer: Transformer,
}

/// Serial executor over a frozen transformer list
#[derive(Debug, Clone)]
pub struct Runner {
    transformers: Arc<[BoundTransformer]>,
}

impl Runner {
    /// Create runner
    #[inline]
    #[must_use]
    pub fn new(transformers: Arc<[BoundTransformer]>) -> Self {
        Self { transformers }
    }

    /// Number of transformers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    /// Whether there is nothing to run
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    /// Transformers in execution order
    #[inline]
    #[must_use]
    pub fn transformers(&self) -> &[BoundTransformer] {
        &self.transformers
    }

    /// Run every transformer, suspending whenever one does
    ///
    /// Every transformer sees `namespace`.
    ///
    /// # Errors
    /// Returns the first failure; later transformers never run
    pub async fn run(
        &self,
        tree: Node,
        file: VFile,
        namespace: SharedNamespace,
    ) -> Result<Transformed, ProcessorError> {
        let span = tracing::debug_span!("run", transformers = self.transformers.len());
        async move {
            let (mut tree, mut file) = (tree, file);
            for bound in self.transformers.iter() {
                tracing::trace!(index = bound.index, plugin = %bound.plugin, "transform");
                let outcome = match bound.transformer.invoke(bound.index, &bound.plugin, tree, file, &namespace) {
                    Step::Ready(result) => result,
                    Step::Pending(pending) => pending.await,
                };
                (tree, file) = outcome.map_err(|error| aborted(bound, error))?;
            }
            Ok((tree, file))
        }
        .instrument(span)
        .await
    }

    /// Run every transformer without suspending
    ///
    /// # Errors
    /// Returns [`ProcessorError::AsyncUsage`] as soon as a transformer tries to
    /// suspend, or the first transformer failure
    pub fn run_sync(
        &self,
        operation: &'static str,
        tree: Node,
        file: VFile,
        namespace: &SharedNamespace,
    ) -> Result<Transformed, ProcessorError> {
        let _span = tracing::debug_span!("run_sync", operation, transformers = self.transformers.len()).entered();
        let (mut tree, mut file) = (tree, file);
        for bound in self.transformers.iter() {
            tracing::trace!(index = bound.index, plugin = %bound.plugin, "transform");
            let outcome = match bound.transformer.invoke(bound.index, &bound.plugin, tree, file, namespace) {
                Step::Ready(result) => result,
                Step::Pending(_) => Err(ProcessorError::AsyncUsage {
                    operation,
                    index: bound.index,
                    plugin: bound.plugin.to_string(),
                }),
            };
            (tree, file) = outcome.map_err(|error| aborted(bound, error))?;
        }
        Ok((tree, file))
    }
}

fn aborted(bound: &BoundTransformer, error: ProcessorError) -> ProcessorError {
    tracing::warn!(index = bound.index, plugin = %bound.plugin, %error, "run aborted");
    error
}
