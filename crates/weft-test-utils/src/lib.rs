//! Testing utilities for the Weft workspace
//!
//! Shared plugins, fixtures, and call logs.

#![allow(missing_docs)]

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use weft_core::{Compiler, Node, Output, Parser, Plugin, Processor, Transformer};

/// Shared record of which transformers ran, in order
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Counter shared between a plugin and the test observing it
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Plugin counting its attacher invocations and recording the options it saw
pub fn counting_plugin(name: &str) -> (Plugin, Counter, Arc<Mutex<Vec<Vec<Value>>>>) {
    let counter = Counter::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let (count, record) = (counter.clone(), Arc::clone(&seen));
    let plugin = Plugin::new(name, move |_, options| {
        count.bump();
        record.lock().push(options.to_vec());
        Ok(None)
    });
    (plugin, counter, seen)
}

/// Plugin whose sync transformer logs `name` and leaves the tree alone
pub fn recording_plugin(name: &str, log: &CallLog) -> Plugin {
    let (entry, log) = (name.to_string(), log.clone());
    Plugin::transformer(
        name,
        Transformer::sync(move |_, _, _| {
            log.push(entry.clone());
            Ok(None)
        }),
    )
}

/// Plugin whose transformer counts its invocations
pub fn counting_transformer(name: &str) -> (Plugin, Counter) {
    let counter = Counter::new();
    let count = counter.clone();
    let plugin = Plugin::transformer(
        name,
        Transformer::sync(move |_, _, _| {
            count.bump();
            Ok(None)
        }),
    );
    (plugin, counter)
}

/// Plugin replacing a literal tree with one whose value has `suffix` appended
pub fn append_plugin(name: &str, suffix: &str) -> Plugin {
    let suffix = suffix.to_string();
    Plugin::transformer(
        name,
        Transformer::sync(move |tree, _, _| {
            let value = format!("{}{suffix}", tree.value().unwrap_or_default());
            Ok(Some(literal(value)))
        }),
    )
}

/// Plugin uppercasing the value of a literal tree, synchronously
pub fn uppercase_plugin() -> Plugin {
    Plugin::transformer(
        "uppercase",
        Transformer::sync(|tree, _, _| {
            let value = tree.value().unwrap_or_default().to_uppercase();
            Ok(Some(literal(value)))
        }),
    )
}

/// Plugin whose callback transformer completes after `delay` on the tokio runtime
pub fn deferred_plugin(name: &str, delay: Duration, log: &CallLog) -> Plugin {
    let (entry, log) = (name.to_string(), log.clone());
    Plugin::transformer(
        name,
        Transformer::callback(move |tree, file, _, next| {
            let (entry, log) = (entry.clone(), log.clone());
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                log.push(entry);
                let _ = next.done(tree, file);
            });
            Ok(())
        }),
    )
}

/// Plugin whose transformer always fails with `reason`
pub fn failing_plugin(name: &str, reason: &'static str) -> Plugin {
    Plugin::transformer(name, Transformer::sync(move |_, _, _| Err(reason.into())))
}

/// Parser producing a single literal node holding the whole document
pub fn literal_parser() -> Plugin {
    Plugin::parser("literal", Parser::new(|document, _| Ok(literal(document))))
}

/// Compiler emitting the value of a literal tree
pub fn literal_compiler() -> Plugin {
    Plugin::compiler(
        "literal",
        Compiler::new(|tree, _| Ok(Output::Text(tree.value().unwrap_or_default().to_string()))),
    )
}

/// Processor with the literal parser and compiler
pub fn literal_processor() -> Processor {
    Processor::new()
        .use_plugin(vec![literal_parser(), literal_compiler()])
        .unwrap()
}

pub fn literal(value: impl Into<String>) -> Node {
    Node::text(value)
}

/// Root node with one literal child per value
pub fn root_of(values: &[&str]) -> Node {
    let mut root = Node::root();
    for value in values {
        root.push_child(literal(*value));
    }
    root
}
