//! Error types for the processor pipeline
//!
//! Covers every failure the core can surface:
//! - Configuration (`use` with malformed input)
//! - Attacher failures during freeze
//! - Transformer failures during a run
//! - Misuse of the completion protocol (sync-only entry points, double completion)
//! - Parser / compiler collaborator failures

/// Boxed error returned by plugins, transformers, parsers and compilers
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main processor error type
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// Invalid argument to `use` (malformed settings, unresolvable plugin)
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An attacher failed while the processor was freezing
    #[error("plugin `{plugin}` (attacher {index}) failed to attach: {source}")]
    Attach {
        /// Attacher index in registration order
        index: usize,
        /// Plugin name
        plugin: String,
        /// Originating error
        #[source]
        source: BoxError,
    },

    /// A transformer threw, rejected, or completed with an error
    #[error("transformer of `{plugin}` (attacher {index}) failed: {source}")]
    Transform {
        /// Attacher index that produced the failing transformer
        index: usize,
        /// Plugin name
        plugin: String,
        /// Originating error
        #[source]
        source: BoxError,
    },

    /// A sync-only entry point met a transformer that tried to suspend
    #[error("`{operation}` finished async: transformer of `{plugin}` (attacher {index}) tried to suspend")]
    AsyncUsage {
        /// Entry point that forbids suspension (`run_sync`, `process_sync`)
        operation: &'static str,
        /// Attacher index of the suspending transformer
        index: usize,
        /// Plugin name
        plugin: String,
    },

    /// A transformer signalled completion more than once
    #[error("transformer of `{plugin}` (attacher {index}) completed more than once")]
    MultipleCompletion {
        /// Attacher index of the offending transformer
        index: usize,
        /// Plugin name
        plugin: String,
    },

    /// Every completion handle was dropped without completing
    #[error("transformer of `{plugin}` (attacher {index}) dropped its completion handle")]
    Abandoned {
        /// Attacher index of the offending transformer
        index: usize,
        /// Plugin name
        plugin: String,
    },

    /// A value handed to the compiler is not a node
    #[error("expected a node: {0}")]
    NotANode(String),

    /// The configured parser failed
    #[error("parse failed: {0}")]
    Parse(#[source] BoxError),

    /// The configured compiler failed
    #[error("compile failed: {0}")]
    Compile(#[source] BoxError),
}

impl ProcessorError {
    /// Create configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Whether this error came from a transformer (throw, rejection, or error completion)
    #[inline]
    #[must_use]
    pub fn is_transform_failure(&self) -> bool {
        matches!(self, Self::Transform { .. })
    }

    /// Attacher index the failure is attributed to, if any
    #[must_use]
    pub fn failed_index(&self) -> Option<usize> {
        match self {
            Self::Attach { index, .. }
            | Self::Transform { index, .. }
            | Self::AsyncUsage { index, .. }
            | Self::MultipleCompletion { index, .. }
            | Self::Abandoned { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Result type alias for processor operations
pub type ProcessorResult<T> = Result<T, ProcessorError>;
