//! The driver
//!
//! [`Interpreter::eval`] is a trampolined state machine over an explicit
//! continuation stack:
//!
//! - `Running(instr)` takes an instruction apart, pushing continuations,
//!   finalizer markers and recovery branches until it reaches a value or a
//!   suspension point;
//! - `Suspended(step)` hands the step to [`Interpreter::handle`], whose answer
//!   either resumes the top continuation or starts unwinding;
//! - `Resumed(value)` feeds the value to the top continuation, or completes
//!   the frame when the stack is empty;
//! - `Unwinding(interrupt)` pops continuations until a recovery branch takes
//!   the domain failure, or completes the frame with the interrupt.
//!
//! Chains of `and_then` therefore cost heap, not host stack. Only nested
//! frames (and inline binds from `gen` routines) recurse.
//!
//! Every frame owns a finalizer stack. When the frame completes, whatever
//! the exit path, the stack is drained in reverse registration order; each
//! finalizer runs in a frame of its own under the context the frame ran with.

use crate::config::EngineConfig;
use crate::context::Context;
use crate::cx::Cx;
use crate::error::Defect;
use crate::outcome::Outcome;
use crate::report::{Journal, RunReport, TraceEvent};
use crate::sequence::Sequence;
use crate::step::{Build, Instr, Recover, Step, StepKind, Then};
use crate::value::{boxed, unbox, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, debug_span, trace, warn};

static NEXT_RUN: AtomicU64 = AtomicU64::new(1);

/// Why a frame stopped early
pub(crate) enum Interrupt<E> {
    Failed(E),
    Defect(Defect),
}

pub(crate) type Settled<E> = Result<Value, Interrupt<E>>;

pub(crate) struct Frame<E> {
    pub(crate) context: Context,
    pub(crate) depth: usize,
    finalizers: Vec<Build<E>>,
    suppressed: Vec<E>,
}

impl<E> Frame<E> {
    fn new(context: Context, depth: usize) -> Self {
        Frame {
            context,
            depth,
            finalizers: Vec::new(),
            suppressed: Vec::new(),
        }
    }
}

enum Continuation<E> {
    Then(Then<E>),
    Fold(Then<E>, Recover<E>),
    Ensure(Build<E>),
}

enum State<E> {
    Running(Instr<E>),
    Suspended(Step<E>),
    Resumed(Value),
    Unwinding(Interrupt<E>),
}

/// Synchronous interpreter for sequences.
///
/// Holds no per-run state, so one interpreter can run any number of
/// sequences, the same sequence many times, or runs from several threads at
/// once.
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    config: EngineConfig,
}

impl Interpreter {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `sequence` to completion under `context`
    pub fn run<A: 'static, E: 'static>(
        &self,
        sequence: &Sequence<A, E>,
        context: &Context,
    ) -> Result<Outcome<A, E>, Defect> {
        self.run_with_report(sequence, context).exit
    }

    pub fn run_with_report<A: 'static, E: 'static>(
        &self,
        sequence: &Sequence<A, E>,
        context: &Context,
    ) -> RunReport<A, E> {
        let run = NEXT_RUN.fetch_add(1, Ordering::Relaxed);
        let span = debug_span!("sequence_run", run);
        let _entered = span.enter();

        let mut journal = Journal::new(&self.config);
        let (settled, suppressed) = self.drive(sequence.instr(), context.clone(), 0, &mut journal);
        let exit = match settled {
            Ok(value) => Ok(Outcome::Ok(unbox::<A>(value))),
            Err(Interrupt::Failed(error)) => Ok(Outcome::Err(error)),
            Err(Interrupt::Defect(defect)) => Err(defect),
        };
        debug!(
            ok = matches!(exit, Ok(Outcome::Ok(_))),
            defect = exit.is_err(),
            suppressed = suppressed.len(),
            "run completed"
        );
        journal.into_report(exit, suppressed)
    }

    /// Run a frame: evaluate, then drain its finalizers
    fn drive<E: 'static>(
        &self,
        instr: Instr<E>,
        context: Context,
        depth: usize,
        journal: &mut Journal,
    ) -> (Settled<E>, Vec<E>) {
        journal.reach(depth);
        let mut frame = Frame::new(context, depth);
        let settled = self.eval(instr, &mut frame, journal);
        let settled = self.drain(&mut frame, settled, journal);
        (settled, frame.suppressed)
    }

    /// Enter a nested frame, as for `RunNested`
    fn nested<E: 'static>(
        &self,
        instr: Instr<E>,
        context: Context,
        depth: usize,
        journal: &mut Journal,
    ) -> (Settled<E>, Vec<E>) {
        journal.record(|| TraceEvent::NestedEntered { depth });
        debug!(depth, "entering nested frame");
        let (settled, suppressed) = self.drive(instr, context, depth, journal);
        let ok = settled.is_ok();
        journal.record(|| TraceEvent::NestedExited { depth, ok });
        debug!(depth, ok, "left nested frame");
        (settled, suppressed)
    }

    /// Nested run whose domain failure is handed back as a value
    pub(crate) fn attempt<A: 'static, F: 'static>(
        &self,
        sequence: &Sequence<A, F>,
        context: Context,
        depth: usize,
        journal: &mut Journal,
    ) -> Result<Outcome<A, F>, Defect> {
        journal.step(StepKind::RunNested);
        // Failures suppressed in here were already logged and counted; the
        // caller's frame may have a different error type.
        let (settled, _suppressed) = self.nested(sequence.instr(), context, depth, journal);
        match settled {
            Ok(value) => Ok(Outcome::Ok(unbox::<A>(value))),
            Err(Interrupt::Failed(error)) => Ok(Outcome::Err(error)),
            Err(Interrupt::Defect(defect)) => Err(defect),
        }
    }

    pub(crate) fn eval<E: 'static>(
        &self,
        instr: Instr<E>,
        frame: &mut Frame<E>,
        journal: &mut Journal,
    ) -> Settled<E> {
        let mut stack: Vec<Continuation<E>> = Vec::new();
        let mut state = State::Running(instr);

        loop {
            state = match state {
                State::Running(instr) => match instr {
                    Instr::Succeed(value) => State::Resumed(value),
                    Instr::Suspend(step) => State::Suspended(step),
                    Instr::Defer(build) => State::Running(build.instr()),
                    Instr::FlatMap(inner, then) => {
                        stack.push(Continuation::Then(then));
                        State::Running(*inner)
                    }
                    Instr::Fold(inner, then, recover) => {
                        stack.push(Continuation::Fold(then, recover));
                        State::Running(*inner)
                    }
                    Instr::Ensuring(inner, finalizer) => {
                        stack.push(Continuation::Ensure(finalizer));
                        State::Running(*inner)
                    }
                    Instr::Routine(routine) => {
                        let mut cx = Cx::new(self, frame, journal);
                        let returned = routine(&mut cx);
                        match cx.finish(returned) {
                            Ok(value) => State::Resumed(value),
                            Err(interrupt) => State::Unwinding(interrupt),
                        }
                    }
                },
                State::Suspended(step) => match self.handle(step, frame, journal) {
                    Ok(value) => State::Resumed(value),
                    Err(interrupt) => State::Unwinding(interrupt),
                },
                State::Resumed(value) => match stack.pop() {
                    None => return Ok(value),
                    Some(Continuation::Then(then) | Continuation::Fold(then, _)) => {
                        State::Running(then(value))
                    }
                    Some(Continuation::Ensure(finalizer)) => {
                        self.register(finalizer, frame, journal);
                        State::Resumed(value)
                    }
                },
                State::Unwinding(interrupt) => match stack.pop() {
                    None => return Err(interrupt),
                    Some(Continuation::Then(_)) => State::Unwinding(interrupt),
                    Some(Continuation::Fold(_, recover)) => match interrupt {
                        Interrupt::Failed(error) => State::Running(recover(error)),
                        Interrupt::Defect(defect) => State::Unwinding(Interrupt::Defect(defect)),
                    },
                    Some(Continuation::Ensure(finalizer)) => {
                        self.register(finalizer, frame, journal);
                        State::Unwinding(interrupt)
                    }
                },
            };
        }
    }

    /// Handle one suspension point against the current frame
    pub(crate) fn handle<E: 'static>(
        &self,
        step: Step<E>,
        frame: &mut Frame<E>,
        journal: &mut Journal,
    ) -> Settled<E> {
        let depth = frame.depth;
        trace!(kind = %step.kind(), depth, "handling step");

        match step {
            Step::RequestCapability(capability) => {
                journal.step(StepKind::RequestCapability);
                match frame.context.lookup_erased(&capability) {
                    Some(value) => {
                        journal.record(|| TraceEvent::CapabilityResolved {
                            depth,
                            name: capability.name().to_string(),
                        });
                        Ok(boxed(value))
                    }
                    None => {
                        warn!(capability = %capability, depth, "unresolved capability");
                        journal.record(|| TraceEvent::CapabilityUnresolved {
                            depth,
                            name: capability.name().to_string(),
                        });
                        Err(Interrupt::Defect(Defect::unresolved(
                            capability.name(),
                            capability.id().as_u64(),
                        )))
                    }
                }
            }
            Step::Fail(error) => Err(self.raise(error, depth, journal)),
            Step::RunNested(nested) => {
                journal.step(StepKind::RunNested);
                let context = match &nested.layer {
                    Some(layer) => frame.context.extend(layer),
                    None => frame.context.clone(),
                };
                let (settled, suppressed) =
                    self.nested(nested.body.instr(), context, depth + 1, journal);
                frame.suppressed.extend(suppressed);
                settled
            }
            Step::Finalize(finalizer) => {
                self.register(finalizer, frame, journal);
                Ok(boxed(()))
            }
        }
    }

    pub(crate) fn raise<E>(&self, error: E, depth: usize, journal: &mut Journal) -> Interrupt<E> {
        journal.step(StepKind::Fail);
        journal.record(|| TraceEvent::Failed { depth });
        debug!(depth, "sequence failed");
        Interrupt::Failed(error)
    }

    fn register<E>(&self, finalizer: Build<E>, frame: &mut Frame<E>, journal: &mut Journal) {
        let depth = frame.depth;
        journal.step(StepKind::Finalize);
        journal.record(|| TraceEvent::FinalizerRegistered { depth });
        trace!(depth, pending = frame.finalizers.len() + 1, "finalizer registered");
        frame.finalizers.push(finalizer);
    }

    /// Run every registered finalizer, newest first, and settle the frame.
    ///
    /// The first finalizer failure replaces a successful outcome; any other
    /// failure is suppressed. An unresolved capability inside a finalizer
    /// replaces everything but an earlier defect.
    fn drain<E: 'static>(
        &self,
        frame: &mut Frame<E>,
        settled: Settled<E>,
        journal: &mut Journal,
    ) -> Settled<E> {
        let mut settled = settled;
        let depth = frame.depth;

        while let Some(finalizer) = frame.finalizers.pop() {
            journal.finalizer_ran(depth);
            let context = frame.context.clone();
            let (result, suppressed) = self.drive(finalizer.instr(), context, depth + 1, journal);
            frame.suppressed.extend(suppressed);

            settled = match (settled, result) {
                (settled, Ok(_)) => settled,
                (Ok(_), Err(interrupt)) => {
                    debug!(depth, "finalizer failure replaces successful outcome");
                    Err(interrupt)
                }
                (Err(Interrupt::Failed(earlier)), Err(Interrupt::Defect(defect))) => {
                    warn!(depth, %defect, "finalizer defect replaces domain failure");
                    self.suppress(earlier, frame, journal);
                    Err(Interrupt::Defect(defect))
                }
                (Err(earlier), Err(Interrupt::Failed(error))) => {
                    self.suppress(error, frame, journal);
                    Err(earlier)
                }
                (Err(Interrupt::Defect(earlier)), Err(Interrupt::Defect(defect))) => {
                    warn!(depth, %defect, "finalizer defect suppressed");
                    journal.suppressed(depth);
                    Err(Interrupt::Defect(earlier))
                }
            };
        }

        settled
    }

    fn suppress<E>(&self, error: E, frame: &mut Frame<E>, journal: &mut Journal) {
        warn!(depth = frame.depth, "finalizer failure suppressed");
        journal.suppressed(frame.depth);
        frame.suppressed.push(error);
    }
}
