//! Parser and compiler slots
//!
//! A collaborator is either a plain function or a constructible type with a
//! `parse`/`compile` operation. Both shapes are normalized into one callable
//! when the slot is set, so the pipeline never branches on the original shape.

use crate::error::BoxError;
use crate::file::{Output, VFile};
use crate::node::Node;
use std::fmt;
use std::sync::Arc;

type ParseFn = dyn Fn(&str, &VFile) -> Result<Node, BoxError> + Send + Sync;
type CompileFn = dyn Fn(&Node, &VFile) -> Result<Output, BoxError> + Send + Sync;

/// Constructible parser: built per document, then asked to parse it
pub trait DocumentParser: Sized {
    /// Construct a parser for one document
    fn new(document: &str, file: &VFile) -> Self;

    /// Produce the tree
    ///
    /// # Errors
    /// Returns an error if the document cannot be parsed
    fn parse(self) -> Result<Node, BoxError>;
}

/// Constructible compiler: built per tree, then asked to compile it
pub trait TreeCompiler: Sized {
    /// Construct a compiler for one tree
    fn new(tree: &Node, file: &VFile) -> Self;

    /// Produce the output
    ///
    /// # Errors
    /// Returns an error if the tree cannot be compiled
    fn compile(self) -> Result<Output, BoxError>;
}

/// Normalized parser: text → tree
#[derive(Clone)]
pub struct Parser {
    name: &'static str,
    parse: Arc<ParseFn>,
}

impl Parser {
    /// Wrap a parse function
    pub fn new<F>(parse: F) -> Self
    where
        F: Fn(&str, &VFile) -> Result<Node, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: "fn",
            parse: Arc::new(parse),
        }
    }

    /// Wrap a constructible parser type
    #[must_use]
    pub fn from_type<P: DocumentParser + 'static>() -> Self {
        Self {
            name: std::any::type_name::<P>(),
            parse: Arc::new(|document: &str, file: &VFile| P::new(document, file).parse()),
        }
    }

    /// Parse a document
    ///
    /// # Errors
    /// Propagates the collaborator's error
    #[inline]
    pub fn parse(&self, document: &str, file: &VFile) -> Result<Node, BoxError> {
        (self.parse)(document, file)
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser").field("name", &self.name).finish()
    }
}

/// Normalized compiler: tree → output
#[derive(Clone)]
pub struct Compiler {
    name: &'static str,
    compile: Arc<CompileFn>,
}

impl Compiler {
    /// Wrap a compile function
    pub fn new<F>(compile: F) -> Self
    where
        F: Fn(&Node, &VFile) -> Result<Output, BoxError> + Send + Sync + 'static,
    {
        Self {
            name: "fn",
            compile: Arc::new(compile),
        }
    }

    /// Wrap a constructible compiler type
    #[must_use]
    pub fn from_type<C: TreeCompiler + 'static>() -> Self {
        Self {
            name: std::any::type_name::<C>(),
            compile: Arc::new(|tree: &Node, file: &VFile| C::new(tree, file).compile()),
        }
    }

    /// Compile a tree
    ///
    /// # Errors
    /// Propagates the collaborator's error
    #[inline]
    pub fn compile(&self, tree: &Node, file: &VFile) -> Result<Output, BoxError> {
        (self.compile)(tree, file)
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler").field("name", &self.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct LineParser {
        lines: Vec<String>,
    }

    impl DocumentParser for LineParser {
        fn new(document: &str, _file: &VFile) -> Self {
            Self {
                lines: document.lines().map(str::to_string).collect(),
            }
        }

        fn parse(self) -> Result<Node, BoxError> {
            let mut root = Node::root();
            for line in self.lines {
                root.push_child(Node::text(line));
            }
            Ok(root)
        }
    }

    struct CountCompiler(usize);

    impl TreeCompiler for CountCompiler {
        fn new(tree: &Node, _file: &VFile) -> Self {
            Self(tree.children().len())
        }

        fn compile(self) -> Result<Output, BoxError> {
            Ok(Output::Value(json!(self.0)))
        }
    }

    #[test]
    fn function_parser() {
        let parser = Parser::new(|doc, _| Ok(Node::text(doc)));
        let tree = parser.parse("abc", &VFile::new()).unwrap();
        assert_eq!(tree.value(), Some("abc"));
    }

    #[test]
    fn constructible_collaborators() {
        let parser = Parser::from_type::<LineParser>();
        let compiler = Compiler::from_type::<CountCompiler>();
        let file = VFile::new();

        let tree = parser.parse("a\nb\nc", &file).unwrap();
        let output = compiler.compile(&tree, &file).unwrap();
        assert!(matches!(output, Output::Value(v) if v == json!(3)));
        assert!(format!("{parser:?}").contains("LineParser"));
    }

    #[test]
    fn compiler_errors_propagate() {
        let compiler = Compiler::new(|_, _| Err("nope".into()));
        let err = compiler.compile(&Node::root(), &VFile::new()).unwrap_err();
        assert_eq!(err.to_string(), "nope");
    }
}
