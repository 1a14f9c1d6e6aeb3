//! Authored sequences
//!
//! A [`Sequence`] is a recipe, not a running computation: it holds a shared
//! builder that produces a fresh instruction tree every time a driver reaches
//! it. Running the same sequence twice, or from two threads, never shares any
//! run state. Combinators link onto the builder they wrap, so neither running
//! nor dropping a long chain grows the host stack.

use crate::combinators::gen;
use crate::context::Layer;
use crate::cx::Cx;
use crate::key::Key;
use crate::outcome::Outcome;
use crate::step::{Build, Instr, Nested, Step};
use crate::value::{boxed, unbox};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A re-runnable effectful routine producing `A` or failing with `E`
pub struct Sequence<A, E> {
    build: Build<E>,
    _output: PhantomData<fn() -> A>,
}

impl<A, E> Clone for Sequence<A, E> {
    fn clone(&self) -> Self {
        Sequence {
            build: self.build.clone(),
            _output: PhantomData,
        }
    }
}

impl<A, E> fmt::Debug for Sequence<A, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("output", &std::any::type_name::<A>())
            .field("error", &std::any::type_name::<E>())
            .finish()
    }
}

impl<A: 'static, E: 'static> Sequence<A, E> {
    pub(crate) fn from_build(build: Build<E>) -> Self {
        Sequence {
            build,
            _output: PhantomData,
        }
    }

    pub(crate) fn build(&self) -> Build<E> {
        self.build.clone()
    }

    /// Instruction that builds this sequence once the driver reaches it
    pub(crate) fn instr(&self) -> Instr<E> {
        Instr::Defer(self.build())
    }

    /// Continue with `f` on success; a failure short-circuits without
    /// invoking `f`.
    pub fn and_then<B, F>(self, f: F) -> Sequence<B, E>
    where
        B: 'static,
        F: Fn(A) -> Sequence<B, E> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Sequence::from_build(Build::wrap(self.build, move |inner| {
            let f = Arc::clone(&f);
            Instr::FlatMap(
                Box::new(Instr::Defer(inner.clone())),
                Box::new(move |value| f(unbox::<A>(value)).instr()),
            )
        }))
    }

    pub fn map<B, F>(self, f: F) -> Sequence<B, E>
    where
        B: 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Sequence::from_build(Build::wrap(self.build, move |inner| {
            let f = Arc::clone(&f);
            Instr::FlatMap(
                Box::new(Instr::Defer(inner.clone())),
                Box::new(move |value| Instr::Succeed(boxed(f(unbox::<A>(value))))),
            )
        }))
    }

    /// Convert the domain failure. The receiver runs in a nested frame so its
    /// finalizers keep their own error type; failures they suppress there are
    /// logged but not carried over.
    pub fn map_err<F, G>(self, f: G) -> Sequence<A, F>
    where
        F: 'static,
        G: Fn(E) -> F + Send + Sync + 'static,
    {
        gen(move |cx: &mut Cx<'_, F>| match cx.attempt(&self)? {
            Outcome::Ok(value) => Ok(value),
            Outcome::Err(error) => cx.fail(f(error)),
        })
    }

    /// Recover from a domain failure. Unresolved capabilities are not
    /// intercepted.
    pub fn or_else<F>(self, f: F) -> Sequence<A, E>
    where
        F: Fn(E) -> Sequence<A, E> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Sequence::from_build(Build::wrap(self.build, move |inner| {
            let f = Arc::clone(&f);
            Instr::Fold(
                Box::new(Instr::Defer(inner.clone())),
                Box::new(Instr::Succeed),
                Box::new(move |error| f(error).instr()),
            )
        }))
    }

    /// Surface the domain outcome as the success value
    pub fn either<F: 'static>(self) -> Sequence<Outcome<A, E>, F> {
        gen(move |cx: &mut Cx<'_, F>| cx.attempt(&self))
    }

    /// Run in a frame of its own: finalizers registered inside are drained
    /// as soon as this sequence settles.
    pub fn nested(self) -> Sequence<A, E> {
        self.run_nested(None)
    }

    /// Run nested with `key` resolving to `value`
    pub fn provide<T: Send + Sync + 'static>(self, key: &Key<T>, value: T) -> Sequence<A, E> {
        self.provide_layer(Layer::new().with(key, value))
    }

    pub fn provide_layer(self, layer: Layer) -> Sequence<A, E> {
        self.run_nested(Some(layer))
    }

    fn run_nested(self, layer: Option<Layer>) -> Sequence<A, E> {
        Sequence::from_build(Build::wrap(self.build, move |body| {
            Instr::Suspend(Step::RunNested(Nested {
                body: body.clone(),
                layer: layer.clone(),
            }))
        }))
    }

    /// Register `finalizer` on the enclosing frame once this sequence
    /// settles, whichever way it settles.
    pub fn ensuring(self, finalizer: Sequence<(), E>) -> Sequence<A, E> {
        let finalizer = finalizer.build;
        Sequence::from_build(Build::wrap(self.build, move |inner| {
            Instr::Ensuring(Box::new(Instr::Defer(inner.clone())), finalizer.clone())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combinators::{fail, service, succeed, sync};
    use crate::context::Context;
    use crate::interpreter::Interpreter;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn run<A: 'static, E: 'static>(sequence: &Sequence<A, E>, context: &Context) -> Outcome<A, E> {
        Interpreter::default().run(sequence, context).unwrap()
    }

    #[test]
    fn test_map() {
        let sequence = succeed::<_, ()>(20).map(|n| n + 1).map(|n| n * 2);
        assert_eq!(run(&sequence, &Context::empty()), Outcome::Ok(42));
    }

    #[test]
    fn test_and_then_skips_continuation_on_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let sequence = fail::<u8, _>("boom").and_then(move |n| {
            seen.fetch_add(1, Ordering::SeqCst);
            succeed(n)
        });

        assert_eq!(run(&sequence, &Context::empty()), Outcome::Err("boom"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_map_err() {
        let sequence = fail::<u8, _>(404u16).map_err(|code| format!("status {code}"));
        assert_eq!(run(&sequence, &Context::empty()), Outcome::Err("status 404".to_string()));
    }

    #[test]
    fn test_or_else_recovers() {
        let sequence = fail::<u8, &str>("bad").or_else(|_| succeed(0));
        assert_eq!(run(&sequence, &Context::empty()), Outcome::Ok(0));
    }

    #[test]
    fn test_or_else_does_not_catch_defects() {
        let missing: Key<u8> = Key::new("missing");
        let sequence = service::<u8, &str>(&missing).map(|n| *n).or_else(|_| succeed(0));

        let result = Interpreter::default().run(&sequence, &Context::empty());
        assert!(result.unwrap_err().is_unresolved_capability());
    }

    #[test]
    fn test_either() {
        let failing = fail::<u8, &str>("bad").either::<()>();
        assert_eq!(run(&failing, &Context::empty()), Outcome::Ok(Outcome::Err("bad")));

        let passing = succeed::<u8, &str>(1).either::<()>();
        assert_eq!(run(&passing, &Context::empty()), Outcome::Ok(Outcome::Ok(1)));
    }

    #[test]
    fn test_provide_shadows_outer_value() {
        let name: Key<String> = Key::new("name");
        let read = service::<String, ()>(&name).map(|name| name.as_str().to_owned());
        let sequence = read.clone().provide(&name, "inner".to_string()).and_then(move |inner| {
            read.clone().map(move |outer| format!("{inner}/{outer}"))
        });

        let context = Context::empty().provide(&name, "outer".to_string());
        assert_eq!(run(&sequence, &context), Outcome::Ok("inner/outer".to_string()));
    }

    #[test]
    fn test_provide_unreferenced_key_is_inert() {
        let unused: Key<u8> = Key::new("unused");
        let sequence = succeed::<_, ()>(3).provide(&unused, 9);
        assert_eq!(run(&sequence, &Context::empty()), Outcome::Ok(3));
    }

    #[test]
    fn test_nested_drains_before_continuing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let note = |label: &'static str| {
            let log = Arc::clone(&log);
            sync::<_, (), _>(move || log.lock().unwrap().push(label))
        };
        let after = note("after nested");

        let sequence = succeed(1)
            .ensuring(note("inner cleanup"))
            .nested()
            .and_then(move |n| after.clone().map(move |_| n))
            .ensuring(note("outer cleanup"));

        assert_eq!(run(&sequence, &Context::empty()), Outcome::Ok(1));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["inner cleanup", "after nested", "outer cleanup"]
        );
    }

    #[test]
    fn test_sequence_debug() {
        let sequence = succeed::<u8, ()>(1);
        let debug = format!("{sequence:?}");
        assert!(debug.contains("u8"));
    }
}
