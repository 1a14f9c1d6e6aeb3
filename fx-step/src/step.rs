//! Step vocabulary and the instruction tree the driver walks
//!
//! A [`Step`] is what a sequence suspends on. Everything else in [`Instr`] is
//! plumbing between suspension points: immediate values, continuations and
//! the finalizer and recovery markers the combinators install.

use crate::context::Layer;
use crate::cx::{Abort, Cx};
use crate::key::CapabilityRef;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

type Make<E> = Box<dyn Fn(Option<&Build<E>>) -> Instr<E> + Send + Sync>;

/// Re-runnable recipe for an instruction tree.
///
/// A combinator keeps the recipe it wraps as an explicit link rather than
/// inside its closure, so a chain of any length is freed link by link.
pub(crate) struct Build<E>(Arc<Link<E>>);

struct Link<E> {
    inner: Option<Build<E>>,
    make: Make<E>,
}

impl<E: 'static> Build<E> {
    pub(crate) fn new<F>(make: F) -> Self
    where
        F: Fn() -> Instr<E> + Send + Sync + 'static,
    {
        Build(Arc::new(Link {
            inner: None,
            make: Box::new(move |_: Option<&Build<E>>| make()),
        }))
    }

    /// Recipe built on top of `inner`, which `make` receives on every call
    pub(crate) fn wrap<F>(inner: Build<E>, make: F) -> Self
    where
        F: Fn(&Build<E>) -> Instr<E> + Send + Sync + 'static,
    {
        Build(Arc::new(Link {
            inner: Some(inner),
            make: Box::new(move |inner: Option<&Build<E>>| match inner {
                Some(inner) => make(inner),
                None => unreachable!("wrapped recipe lost its inner link"),
            }),
        }))
    }

    pub(crate) fn instr(&self) -> Instr<E> {
        (self.0.make)(self.0.inner.as_ref())
    }
}

impl<E> Clone for Build<E> {
    fn clone(&self) -> Self {
        Build(Arc::clone(&self.0))
    }
}

impl<E> Drop for Link<E> {
    fn drop(&mut self) {
        let mut next = self.inner.take();
        while let Some(Build(link)) = next {
            next = match Arc::try_unwrap(link) {
                Ok(mut link) => link.inner.take(),
                Err(_) => None,
            };
        }
    }
}

pub(crate) type Then<E> = Box<dyn FnOnce(Value) -> Instr<E>>;

pub(crate) type Recover<E> = Box<dyn FnOnce(E) -> Instr<E>>;

pub(crate) type Routine<E> = Arc<dyn Fn(&mut Cx<'_, E>) -> Result<Value, Abort> + Send + Sync>;

/// A suspension point
pub(crate) enum Step<E> {
    /// Resume with the value the context holds for this capability
    RequestCapability(CapabilityRef),
    /// Abort the enclosing sequence
    Fail(E),
    /// Drive a sequence in its own frame and resume with its success value
    RunNested(Nested<E>),
    /// Push a finalizer onto the current frame and resume with `()`
    Finalize(Build<E>),
}

impl<E> Step<E> {
    pub(crate) fn kind(&self) -> StepKind {
        match self {
            Step::RequestCapability(_) => StepKind::RequestCapability,
            Step::Fail(_) => StepKind::Fail,
            Step::RunNested(_) => StepKind::RunNested,
            Step::Finalize(_) => StepKind::Finalize,
        }
    }
}

pub(crate) struct Nested<E> {
    pub(crate) body: Build<E>,
    pub(crate) layer: Option<Layer>,
}

/// Kind of a suspension point, as reported in traces and statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    RequestCapability,
    Fail,
    RunNested,
    Finalize,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::RequestCapability => "request-capability",
            StepKind::Fail => "fail",
            StepKind::RunNested => "run-nested",
            StepKind::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

pub(crate) enum Instr<E> {
    Succeed(Value),
    Suspend(Step<E>),
    /// Build the next instruction only when the driver reaches it
    Defer(Build<E>),
    FlatMap(Box<Instr<E>>, Then<E>),
    /// Like `FlatMap`, but a domain failure of the inner instruction is
    /// handed to the recovery branch
    Fold(Box<Instr<E>>, Then<E>, Recover<E>),
    /// Register the finalizer once the inner instruction settles
    Ensuring(Box<Instr<E>>, Build<E>),
    Routine(Routine<E>),
}
