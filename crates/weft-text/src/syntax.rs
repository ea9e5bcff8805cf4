//! Plain-text tree shape
//!
//! ```text
//! root
//! └── paragraph
//!     └── text { value }
//! ```
//!
//! Paragraphs are separated by one or more blank lines.

use serde_json::json;
use weft_core::{BoxError, Node, Output, TreeCompiler, VFile};

/// Paragraph node type
pub const PARAGRAPH: &str = "paragraph";
/// Text node type
pub const TEXT: &str = "text";

/// Paragraph holding one text node
#[must_use]
pub fn paragraph(text: impl Into<String>) -> Node {
    let mut node = Node::new(PARAGRAPH);
    node.push_child(Node::text(text));
    node
}

/// Split `document` into paragraphs
#[must_use]
pub fn parse_paragraphs(document: &str, trim: bool) -> Node {
    let mut root = Node::root();
    let mut current: Vec<&str> = Vec::new();

    for line in document.lines() {
        if line.trim().is_empty() {
            flush(&mut current, &mut root, trim);
        } else {
            current.push(line);
        }
    }
    flush(&mut current, &mut root, trim);
    root
}

fn flush(lines: &mut Vec<&str>, root: &mut Node, trim: bool) {
    if lines.is_empty() {
        return;
    }
    let joined = lines.join("\n");
    let text = if trim { joined.trim().to_string() } else { joined };
    root.push_child(paragraph(text));
    lines.clear();
}

/// Concatenated text of `node` and its descendants
#[must_use]
pub fn text_content(node: &Node) -> String {
    if node.kind() == TEXT {
        return node.value().unwrap_or_default().to_string();
    }
    node.children().iter().map(text_content).collect()
}

/// Rewrite the value of every text node in place
pub fn map_text(node: &mut Node, f: &dyn Fn(&str) -> String) {
    if node.kind() == TEXT {
        if let Some(value) = node.value() {
            let mapped = f(value);
            node.set("value", json!(mapped));
        }
    }
    let mut children = node.children();
    if children.is_empty() {
        return;
    }
    for child in &mut children {
        map_text(child, f);
    }
    node.set_children(children);
}

/// Every text value in document order
#[must_use]
pub fn text_values(node: &Node) -> Vec<String> {
    if node.kind() == TEXT {
        return node.value().map(str::to_string).into_iter().collect();
    }
    node.children().iter().flat_map(text_values).collect()
}

/// Compiler joining paragraphs with a blank line
#[derive(Debug)]
pub struct TextCompiler {
    paragraphs: Vec<String>,
}

impl TreeCompiler for TextCompiler {
    fn new(tree: &Node, _file: &VFile) -> Self {
        let paragraphs = if tree.kind() == TEXT {
            vec![text_content(tree)]
        } else {
            tree.children().iter().map(text_content).collect()
        };
        Self { paragraphs }
    }

    fn compile(self) -> Result<Output, BoxError> {
        Ok(Output::Text(self.paragraphs.join("\n\n")))
    }
}
