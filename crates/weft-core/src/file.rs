//! File context flowing alongside the tree
//!
//! The core treats a [`VFile`] as opaque: `parse` builds one from raw input,
//! transformers may edit or replace it, and `process` writes compiler output
//! back into it. Messages are a board for collaborators; the core never reads
//! them.

use crate::node::Node;
use serde_json::{Map, Value};
use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Primary content of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contents {
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
}

impl Contents {
    /// Content as text (lossy for bytes)
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// Value returned by a compiler
///
/// The core never coerces it: text and bytes become the file's content in
/// `process`, anything else lands in [`VFile::result`].
#[derive(Clone)]
pub enum Output {
    /// Text output (most serializers)
    Text(String),
    /// Binary output
    Bytes(Vec<u8>),
    /// A tree; what the identity compiler returns
    Tree(Node),
    /// Structured data
    Value(Value),
    /// Anything else (component trees, handles, ...)
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl Output {
    /// Wrap an arbitrary value
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        Self::Opaque(Arc::new(value))
    }

    /// Text output, if any
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Tree output, if any
    #[must_use]
    pub fn as_tree(&self) -> Option<&Node> {
        match self {
            Self::Tree(tree) => Some(tree),
            _ => None,
        }
    }

    /// Downcast opaque output
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Opaque(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Text or bytes as file content; any other output is handed back
    ///
    /// # Errors
    /// Returns `self` unchanged when it is not text or bytes
    pub fn into_contents(self) -> Result<Contents, Self> {
        match self {
            Self::Text(text) => Ok(Contents::Text(text)),
            Self::Bytes(bytes) => Ok(Contents::Bytes(bytes)),
            other => Err(other),
        }
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Tree(tree) => f.debug_tuple("Tree").field(tree).finish(),
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Opaque(_) => f.write_str("Opaque(..)"),
        }
    }
}

impl From<String> for Output {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Output {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Output {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Diagnostic attached to a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Human readable reason
    pub reason: String,
    /// Plugin or rule that produced the message
    pub origin: Option<String>,
    /// Whether processing should be considered failed
    pub fatal: bool,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = if self.fatal { "error" } else { "warning" };
        match &self.origin {
            Some(origin) => write!(f, "{level}: {} ({origin})", self.reason),
            None => write!(f, "{level}: {}", self.reason),
        }
    }
}

/// Error returned by [`VFile::fail`]
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct FileFailure(pub Message);

/// File context
#[derive(Debug, Clone, Default)]
pub struct VFile {
    /// Primary content
    pub value: Option<Contents>,
    /// Path of the document, if known
    pub path: Option<PathBuf>,
    /// Per-file scratch space for plugins
    pub data: Map<String, Value>,
    /// Message board
    pub messages: Vec<Message>,
    /// Compiler output that is not text or bytes
    pub result: Option<Output>,
}

impl VFile {
    /// Create empty file
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set path
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Document text (lossy for bytes, empty if no content)
    #[must_use]
    pub fn text(&self) -> String {
        self.value.as_ref().map(Contents::to_text).unwrap_or_default()
    }

    /// Attach a warning
    pub fn message(&mut self, reason: impl Into<String>, origin: Option<&str>) -> &Message {
        self.push(reason.into(), origin, false)
    }

    /// Attach a fatal message and return it as an error for the caller to propagate
    pub fn fail(&mut self, reason: impl Into<String>, origin: Option<&str>) -> FileFailure {
        let message = self.push(reason.into(), origin, true).clone();
        FileFailure(message)
    }

    /// Whether a fatal message was recorded
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.messages.iter().any(|m| m.fatal)
    }

    fn push(&mut self, reason: String, origin: Option<&str>, fatal: bool) -> &Message {
        self.messages.push(Message {
            reason,
            origin: origin.map(str::to_string),
            fatal,
        });
        let last = self.messages.len() - 1;
        &self.messages[last]
    }
}

impl From<&str> for VFile {
    fn from(text: &str) -> Self {
        Self {
            value: Some(Contents::Text(text.to_string())),
            ..Self::default()
        }
    }
}

impl From<String> for VFile {
    fn from(text: String) -> Self {
        Self {
            value: Some(Contents::Text(text)),
            ..Self::default()
        }
    }
}

impl From<Vec<u8>> for VFile {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            value: Some(Contents::Bytes(bytes)),
            ..Self::default()
        }
    }
}

impl fmt::Display for VFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_contents() {
        assert_eq!(VFile::from("abc").to_string(), "abc");
        assert_eq!(VFile::from(b"xyz".to_vec()).to_string(), "xyz");
        assert_eq!(VFile::new().to_string(), "");
    }

    #[test]
    fn messages_and_failures() {
        let mut file = VFile::from("doc").with_path("a.txt");
        file.message("odd spacing", Some("lint"));
        assert!(!file.has_failed());

        let failure = file.fail("broken", None);
        assert!(file.has_failed());
        assert_eq!(failure.to_string(), "error: broken");
        assert_eq!(file.messages[0].to_string(), "warning: odd spacing (lint)");
    }

    #[test]
    fn opaque_output_downcasts() {
        #[derive(Debug, PartialEq)]
        struct Component(&'static str);

        let output = Output::opaque(Component("a"));
        assert_eq!(output.downcast_ref::<Component>(), Some(&Component("a")));
        assert_eq!(format!("{output:?}"), "Opaque(..)");
        assert!(output.into_contents().is_err());
        assert_eq!(Output::from("x").into_contents().ok(), Some(Contents::Text("x".to_string())));
        assert_eq!(Output::Bytes(vec![1]).into_contents().ok(), Some(Contents::Bytes(vec![1])));
    }
}
