//! Immutable capability contexts
//!
//! A [`Context`] maps capability keys to values. It is persistent: providing a
//! capability returns a new context and leaves the receiver untouched, so a
//! context can be handed to any number of runs (on any thread) without
//! coordination. Lookups see the nearest provider; providing a key that is
//! already present shadows the outer value for everything built on top of the
//! new context.

use crate::error::Defect;
use crate::key::{CapabilityRef, Key, KeyId};
use crate::value::{unshare, Shared};
use im::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
struct Entry {
    capability: CapabilityRef,
    value: Shared,
}

impl Entry {
    fn new<T: Send + Sync + 'static>(key: &Key<T>, value: Arc<T>) -> Self {
        Entry {
            capability: key.capability(),
            value,
        }
    }
}

#[derive(Clone, Default)]
pub struct Context {
    entries: HashMap<KeyId, Entry>,
}

impl Context {
    pub fn empty() -> Self {
        Self::default()
    }

    /// New context in which `key` resolves to `value`
    pub fn provide<T: Send + Sync + 'static>(&self, key: &Key<T>, value: T) -> Self {
        self.provide_shared(key, Arc::new(value))
    }

    pub fn provide_shared<T: Send + Sync + 'static>(&self, key: &Key<T>, value: Arc<T>) -> Self {
        Context {
            entries: self.entries.update(key.id(), Entry::new(key, value)),
        }
    }

    /// New context with every override of `layer` on top of this one
    pub fn extend(&self, layer: &Layer) -> Self {
        if layer.is_empty() {
            return self.clone();
        }
        Context {
            entries: layer.entries.clone().union(self.entries.clone()),
        }
    }

    pub fn lookup<T: Send + Sync + 'static>(&self, key: &Key<T>) -> Result<Arc<T>, Defect> {
        self.entries
            .get(&key.id())
            .map(|entry| unshare::<T>(Arc::clone(&entry.value)))
            .ok_or_else(|| Defect::unresolved(key.name(), key.id().as_u64()))
    }

    pub(crate) fn lookup_erased(&self, capability: &CapabilityRef) -> Option<Shared> {
        self.entries
            .get(&capability.id())
            .map(|entry| Arc::clone(&entry.value))
    }

    pub fn contains<T>(&self, key: &Key<T>) -> bool {
        self.entries.contains_key(&key.id())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Provided capabilities, ordered by key creation
    pub fn capabilities(&self) -> Vec<CapabilityRef> {
        let mut capabilities: Vec<CapabilityRef> = self
            .entries
            .values()
            .map(|entry| entry.capability.clone())
            .collect();
        capabilities.sort_by_key(CapabilityRef::id);
        capabilities
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.capabilities().iter().map(ToString::to_string))
            .finish()
    }
}

/// A bundle of overrides applied to a context in one step
#[derive(Clone, Default)]
pub struct Layer {
    entries: HashMap<KeyId, Entry>,
}

impl Layer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Send + Sync + 'static>(self, key: &Key<T>, value: T) -> Self {
        self.with_shared(key, Arc::new(value))
    }

    pub fn with_shared<T: Send + Sync + 'static>(mut self, key: &Key<T>, value: Arc<T>) -> Self {
        self.entries.insert(key.id(), Entry::new(key, value));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(self.entries.values().map(|entry| entry.capability.to_string()))
            .finish()
    }
}
