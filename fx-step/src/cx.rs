//! The handle `gen` routines use to suspend
//!
//! Every method on [`Cx`] is a suspension point: control passes to the
//! interpreter, which handles the step against the current frame and resumes
//! the routine with the resulting value. When a step interrupts the routine
//! (a failure, a missing capability) the method returns `Err(Abort)` and the
//! handle latches the interrupt. From then on every further call aborts
//! immediately, and whatever the routine finally returns, the latched
//! interrupt decides how the routine settles. A routine therefore cannot
//! resume past a failure by discarding the `Err`.

use crate::context::{Context, Layer};
use crate::error::Defect;
use crate::interpreter::{Frame, Interpreter, Interrupt};
use crate::key::Key;
use crate::outcome::Outcome;
use crate::report::Journal;
use crate::sequence::Sequence;
use crate::step::{Nested, Step};
use crate::value::{unbox, unshare, Shared, Value};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Token returned when a routine has been interrupted. Propagate it with `?`.
pub struct Abort {
    _not_send: PhantomData<*const ()>,
}

impl Abort {
    fn new() -> Self {
        Abort {
            _not_send: PhantomData,
        }
    }
}

impl fmt::Debug for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Abort")
    }
}

pub struct Cx<'r, E> {
    driver: &'r Interpreter,
    frame: &'r mut Frame<E>,
    journal: &'r mut Journal,
    latched: Option<Interrupt<E>>,
}

impl<'r, E: 'static> Cx<'r, E> {
    pub(crate) fn new(
        driver: &'r Interpreter,
        frame: &'r mut Frame<E>,
        journal: &'r mut Journal,
    ) -> Self {
        Cx {
            driver,
            frame,
            journal,
            latched: None,
        }
    }

    /// Settle the routine: a latched interrupt wins over the returned value.
    ///
    /// An `Err(Abort)` with nothing latched only happens when a routine hands
    /// back a token some other handle issued; that misuse settles as
    /// [`Defect::DetachedAbort`].
    pub(crate) fn finish(self, returned: Result<Value, Abort>) -> Result<Value, Interrupt<E>> {
        match (self.latched, returned) {
            (Some(interrupt), _) => Err(interrupt),
            (None, Ok(value)) => Ok(value),
            (None, Err(_)) => Err(Interrupt::Defect(Defect::DetachedAbort)),
        }
    }

    fn latch<A>(&mut self, interrupt: Interrupt<E>) -> Result<A, Abort> {
        self.latched = Some(interrupt);
        Err(Abort::new())
    }

    fn guard(&self) -> Result<(), Abort> {
        match self.latched {
            Some(_) => Err(Abort::new()),
            None => Ok(()),
        }
    }

    fn perform(&mut self, step: Step<E>) -> Result<Value, Abort> {
        self.guard()?;
        match self.driver.handle(step, self.frame, self.journal) {
            Ok(value) => Ok(value),
            Err(interrupt) => self.latch(interrupt),
        }
    }

    /// Resolve a capability from the current context
    pub fn service<T: Send + Sync + 'static>(&mut self, key: &Key<T>) -> Result<Arc<T>, Abort> {
        let raw = self.perform(Step::RequestCapability(key.capability()))?;
        Ok(unshare::<T>(unbox::<Shared>(raw)))
    }

    /// Abort the routine with a domain failure. Never resumes.
    pub fn fail<A>(&mut self, error: E) -> Result<A, Abort> {
        self.guard()?;
        let interrupt = self.driver.raise(error, self.frame.depth, self.journal);
        self.latch(interrupt)
    }

    /// Run `sequence` inline, sharing this frame's finalizer stack
    pub fn bind<A: 'static>(&mut self, sequence: &Sequence<A, E>) -> Result<A, Abort> {
        self.guard()?;
        match self.driver.eval(sequence.instr(), self.frame, self.journal) {
            Ok(value) => Ok(unbox::<A>(value)),
            Err(interrupt) => self.latch(interrupt),
        }
    }

    /// Run `sequence` in a nested frame whose finalizers are drained before
    /// this call returns
    pub fn nested<A: 'static>(&mut self, sequence: &Sequence<A, E>) -> Result<A, Abort> {
        let value = self.perform(Step::RunNested(Nested {
            body: sequence.build(),
            layer: None,
        }))?;
        Ok(unbox::<A>(value))
    }

    /// Like [`nested`](Cx::nested), with `layer` on top of the current context
    pub fn nested_with<A: 'static>(
        &mut self,
        sequence: &Sequence<A, E>,
        layer: Layer,
    ) -> Result<A, Abort> {
        let value = self.perform(Step::RunNested(Nested {
            body: sequence.build(),
            layer: Some(layer),
        }))?;
        Ok(unbox::<A>(value))
    }

    /// Run `sequence` in a nested frame and hand back its domain outcome.
    /// Unresolved capabilities still abort this routine.
    pub fn attempt<A: 'static, F: 'static>(
        &mut self,
        sequence: &Sequence<A, F>,
    ) -> Result<Outcome<A, F>, Abort> {
        self.guard()?;
        let context = self.frame.context.clone();
        match self.driver.attempt(sequence, context, self.frame.depth + 1, self.journal) {
            Ok(outcome) => Ok(outcome),
            Err(defect) => self.latch(Interrupt::Defect(defect)),
        }
    }

    /// Register a finalizer on the current frame
    pub fn finalize(&mut self, finalizer: &Sequence<(), E>) -> Result<(), Abort> {
        self.perform(Step::Finalize(finalizer.build()))?;
        Ok(())
    }

    pub fn context(&self) -> &Context {
        &self.frame.context
    }

    /// Nesting level of the frame this routine runs in
    pub fn depth(&self) -> usize {
        self.frame.depth
    }
}
