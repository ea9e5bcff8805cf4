//! Weft Core
//!
//! A plugin-extensible processor that turns text into a tree, transforms the
//! tree, and turns it back into output.
//!
//! # Core Operations
//!
//! - **Use**: register plugins, options and presets on an unfrozen processor
//! - **Freeze**: invoke every attacher once and seal the configuration
//! - **Parse**: text → tree through the parser slot
//! - **Run**: tree → tree through the transformers, in order, fail-fast
//! - **Stringify**: tree → output through the compiler slot
//! - **Process**: parse, run and stringify in one call
//!
//! # Architecture
//!
//! ```text
//! use() → Configuration ──freeze()──→ Arc<Pipeline> ─┬─ Parser   (text → Node)
//!            ↑ Attach                                ├─ Runner   (Node → Node, sync / async / callback)
//!            └─ attachers may set slots & data       └─ Compiler (Node → Output)
//!
//! SharedNamespace ── per processor, forked per process() call, seen by transformers
//! ```
//!
//! Transformers complete in one of three styles: returning a result, resolving
//! a future, or calling a [`Next`] handle. The runner treats them uniformly and
//! the sync entry points fail with [`ProcessorError::AsyncUsage`] when one of
//! them tries to suspend.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

// Core modules
pub mod error;
pub mod file;
pub mod namespace;
pub mod node;
pub mod plugin;
pub mod processor;
pub mod registry;
pub mod runner;
pub mod slots;
pub mod transformer;

// Re-exports for convenience
pub use error::{BoxError, ProcessorError, ProcessorResult};
pub use file::{Contents, FileFailure, Message, Output, VFile};
pub use namespace::{Namespace, SharedNamespace};
pub use node::Node;
pub use plugin::{Attach, Pluggable, Plugin, Preset};
pub use processor::Processor;
pub use registry::{Attacher, Pipeline};
pub use slots::{Compiler, DocumentParser, Parser, TreeCompiler};
pub use transformer::{AsyncTransform, Next, Transformed, Transformer};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Create an empty processor
#[must_use]
pub fn processor() -> Processor {
    Processor::new()
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing plugins and driving processors
    pub use crate::error::{BoxError, ProcessorError, ProcessorResult};
    pub use crate::file::{Output, VFile};
    pub use crate::namespace::SharedNamespace;
    pub use crate::node::Node;
    pub use crate::plugin::{Attach, Pluggable, Plugin, Preset};
    pub use crate::processor::Processor;
    pub use crate::slots::{Compiler, DocumentParser, Parser, TreeCompiler};
    pub use crate::transformer::{AsyncTransform, Next, Transformer};
}
