//! Capability keys
//!
//! A key names a capability by identity, not by string: every call to
//! [`Key::new`] allocates a fresh id from a process-wide counter, so two
//! independently authored modules can both create a key called `"program"`
//! without colliding. The name is carried for diagnostics only.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Raw identity of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(u64);

impl KeyId {
    fn fresh() -> Self {
        KeyId(NEXT_KEY.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Typed capability key. `T` is the shape of the value the key resolves to.
pub struct Key<T> {
    id: KeyId,
    name: Arc<str>,
    _shape: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Key {
            id: KeyId::fresh(),
            name: name.into(),
            _shape: PhantomData,
        }
    }

    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Untyped view of this key, as carried by capability requests
    pub fn capability(&self) -> CapabilityRef {
        CapabilityRef {
            id: self.id,
            name: Arc::clone(&self.name),
        }
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        Key {
            id: self.id,
            name: Arc::clone(&self.name),
            _shape: PhantomData,
        }
    }
}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Key<T> {}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}{})", self.name, self.id)
    }
}

/// A key with its value shape erased
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityRef {
    id: KeyId,
    name: Arc<str>,
}

impl CapabilityRef {
    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for CapabilityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.id)
    }
}
