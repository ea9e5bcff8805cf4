//! Per-processor key/value store
//!
//! The namespace lets attachers and transformers share state outside of the
//! tree and file. Each processor instance owns its own copy behind a
//! [`SharedNamespace`]; forking deep-copies it.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Key presets merge their settings into
pub const SETTINGS_KEY: &str = "settings";

/// Processor namespace
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Namespace {
    entries: Map<String, Value>,
}

impl Namespace {
    /// Create empty namespace
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored under `key`
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Store `value` under `key`, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(key.into(), value)
    }

    /// Deep-merge `value` into the entry under `key`
    pub fn merge(&mut self, key: &str, value: Value) {
        let slot = self.entries.entry(key).or_insert(Value::Null);
        deep_merge(slot, value);
    }

    /// Processor-wide settings merged by presets
    #[must_use]
    pub fn settings(&self) -> Option<&Map<String, Value>> {
        self.entries.get(SETTINGS_KEY).and_then(Value::as_object)
    }

    /// The whole mapping
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.entries
    }

    /// Number of keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the namespace is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Handle to a processor namespace, handed to transformers at run time
///
/// Clones share the same store; [`fork`](Self::fork) makes an independent copy.
#[derive(Debug, Clone, Default)]
pub struct SharedNamespace {
    inner: Arc<RwLock<Namespace>>,
}

impl SharedNamespace {
    /// Wrap `namespace`
    #[must_use]
    pub fn new(namespace: Namespace) -> Self {
        Self {
            inner: Arc::new(RwLock::new(namespace)),
        }
    }

    /// Value stored under `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.read().get(key).cloned()
    }

    /// Store `value` under `key`, returning the previous value
    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.inner.write().insert(key, value)
    }

    /// Processor-wide settings merged by presets
    #[must_use]
    pub fn settings(&self) -> Option<Map<String, Value>> {
        self.inner.read().settings().cloned()
    }

    /// Copy of the whole mapping
    #[must_use]
    pub fn to_map(&self) -> Map<String, Value> {
        self.inner.read().as_map().clone()
    }

    /// Shared read access
    pub fn read(&self) -> RwLockReadGuard<'_, Namespace> {
        self.inner.read()
    }

    /// Exclusive write access
    pub fn write(&self) -> RwLockWriteGuard<'_, Namespace> {
        self.inner.write()
    }

    /// Independent deep copy
    #[must_use]
    pub fn fork(&self) -> Self {
        Self::new(self.inner.read().clone())
    }

    /// Whether both handles point at the same store
    #[inline]
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Recursively merge `source` into `target`
///
/// Objects merge key by key; any other source value replaces the target.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}
