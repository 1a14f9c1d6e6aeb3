//! Sequence constructors
//!
//! The free-function forms of the method combinators on [`Sequence`]
//! (`and_then`, `provide_sequence`, `ensuring`) are here as well, for call
//! sites that read better in prefix form.

use crate::cx::{Abort, Cx};
use crate::key::Key;
use crate::sequence::Sequence;
use crate::step::{Build, Instr, Routine, Step};
use crate::value::{boxed, unbox, unshare, Shared};
use std::sync::Arc;

/// Sequence that succeeds with `value` without suspending
pub fn succeed<A, E>(value: A) -> Sequence<A, E>
where
    A: Clone + Send + Sync + 'static,
    E: 'static,
{
    Sequence::from_build(Build::new(move || Instr::Succeed(boxed(value.clone()))))
}

/// Sequence that aborts with `error`
pub fn fail<A, E>(error: E) -> Sequence<A, E>
where
    A: 'static,
    E: Clone + Send + Sync + 'static,
{
    Sequence::from_build(Build::new(move || Instr::Suspend(Step::Fail(error.clone()))))
}

/// Request the capability named by `key`
pub fn service<T, E>(key: &Key<T>) -> Sequence<Arc<T>, E>
where
    T: Send + Sync + 'static,
    E: 'static,
{
    let capability = key.capability();
    Sequence::from_build(Build::new(move || {
        Instr::FlatMap(
            Box::new(Instr::Suspend(Step::RequestCapability(capability.clone()))),
            Box::new(|value| Instr::Succeed(boxed(unshare::<T>(unbox::<Shared>(value))))),
        )
    }))
}

/// Author a sequence as a direct-style routine.
///
/// The routine runs on every run of the sequence. Each [`Cx`] call is a
/// suspension point; propagate aborts with `?`.
///
/// ```
/// use fx_step::{gen, Context, Cx, Interpreter, Key, Outcome};
///
/// let greeting: Key<String> = Key::new("greeting");
/// let key = greeting.clone();
/// let shout = gen(move |cx: &mut Cx<'_, String>| {
///     let text = cx.service(&key)?;
///     if text.is_empty() {
///         return cx.fail("nothing to say".to_string());
///     }
///     Ok(text.to_uppercase())
/// });
///
/// let context = Context::empty().provide(&greeting, "hello".to_string());
/// let result = Interpreter::default().run(&shout, &context);
/// assert_eq!(result, Ok(Outcome::Ok("HELLO".to_string())));
/// ```
pub fn gen<A, E, F>(routine: F) -> Sequence<A, E>
where
    A: 'static,
    E: 'static,
    F: Fn(&mut Cx<'_, E>) -> Result<A, Abort> + Send + Sync + 'static,
{
    let routine: Routine<E> = Arc::new(move |cx: &mut Cx<'_, E>| routine(cx).map(boxed));
    Sequence::from_build(Build::new(move || Instr::Routine(Arc::clone(&routine))))
}

/// Lift a side-effecting closure, called anew on every run
pub fn sync<A, E, F>(f: F) -> Sequence<A, E>
where
    A: 'static,
    E: 'static,
    F: Fn() -> A + Send + Sync + 'static,
{
    Sequence::from_build(Build::new(move || Instr::Succeed(boxed(f()))))
}

pub fn try_sync<A, E, F>(f: F) -> Sequence<A, E>
where
    A: 'static,
    E: 'static,
    F: Fn() -> Result<A, E> + Send + Sync + 'static,
{
    Sequence::from_build(Build::new(move || match f() {
        Ok(value) => Instr::Succeed(boxed(value)),
        Err(error) => Instr::Suspend(Step::Fail(error)),
    }))
}

/// Build the sequence only when a run reaches it
pub fn suspend<A, E, F>(f: F) -> Sequence<A, E>
where
    A: 'static,
    E: 'static,
    F: Fn() -> Sequence<A, E> + Send + Sync + 'static,
{
    Sequence::from_build(Build::new(move || f().instr()))
}

/// Run `sequences` strictly left to right and collect their values.
///
/// Stops at the first failure; later members are never started. Members run
/// in the enclosing frame, so finalizers they registered before the failure
/// are drained with it.
pub fn all<A, E, I>(sequences: I) -> Sequence<Vec<A>, E>
where
    A: 'static,
    E: 'static,
    I: IntoIterator<Item = Sequence<A, E>>,
{
    let members: Arc<[Sequence<A, E>]> = sequences.into_iter().collect();
    if members.is_empty() {
        return Sequence::from_build(Build::new(|| Instr::Succeed(boxed(Vec::<A>::new()))));
    }

    gen(move |cx: &mut Cx<'_, E>| {
        let mut values = Vec::with_capacity(members.len());
        for member in members.iter() {
            values.push(cx.bind(member)?);
        }
        Ok(values)
    })
}

/// `all` over the sequences `f` produces for `items`
pub fn for_each<T, A, E, F>(items: impl IntoIterator<Item = T>, f: F) -> Sequence<Vec<A>, E>
where
    A: 'static,
    E: 'static,
    F: FnMut(T) -> Sequence<A, E>,
{
    all(items.into_iter().map(f))
}

pub fn and_then<A, B, E, F>(sequence: Sequence<A, E>, f: F) -> Sequence<B, E>
where
    A: 'static,
    B: 'static,
    E: 'static,
    F: Fn(A) -> Sequence<B, E> + Send + Sync + 'static,
{
    sequence.and_then(f)
}

/// Run `sequence` with `key` resolving to `value`
pub fn provide_sequence<A, E, T>(sequence: Sequence<A, E>, key: &Key<T>, value: T) -> Sequence<A, E>
where
    A: 'static,
    E: 'static,
    T: Send + Sync + 'static,
{
    sequence.provide(key, value)
}

pub fn ensuring<A, E>(sequence: Sequence<A, E>, finalizer: Sequence<(), E>) -> Sequence<A, E>
where
    A: 'static,
    E: 'static,
{
    sequence.ensuring(finalizer)
}
