//! Erased values flowing through the driver
//!
//! The interpreter works on type-erased values so that one continuation stack
//! can hold steps of every result type. Every erased value is produced by a
//! typed constructor and consumed by the matching typed continuation, so a
//! shape mismatch can only be an engine bug.

use std::any::{type_name, Any};
use std::sync::Arc;

pub(crate) type Value = Box<dyn Any>;

/// Capability values as stored in a context
pub(crate) type Shared = Arc<dyn Any + Send + Sync>;

pub(crate) fn boxed<A: 'static>(value: A) -> Value {
    Box::new(value)
}

pub(crate) fn unbox<A: 'static>(value: Value) -> A {
    match value.downcast::<A>() {
        Ok(value) => *value,
        Err(_) => unreachable!("step engine resumed with a value that is not {}", type_name::<A>()),
    }
}

pub(crate) fn unshare<T: Send + Sync + 'static>(value: Shared) -> Arc<T> {
    match value.downcast::<T>() {
        Ok(value) => value,
        Err(_) => unreachable!("capability stored under a key for {}", type_name::<T>()),
    }
}
