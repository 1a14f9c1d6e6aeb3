//! Step engine
//!
//! A small cooperative effect-interpretation runtime. Analysis code is
//! written as [`Sequence`]s: linear routines that suspend to request a
//! capability from an ambient [`Context`], to fail with a typed error, to run
//! another sequence in a frame of its own, or to register a finalizer. An
//! [`Interpreter`] drives a sequence to completion and reports either an
//! [`Outcome`] or a [`Defect`] (a capability nobody provided).
//!
//! ```
//! use fx_step::{fail, service, succeed, Context, Interpreter, Key, Outcome};
//!
//! let limit: Key<usize> = Key::new("limit");
//! let check = service::<usize, String>(&limit).and_then(|limit| {
//!     if *limit > 100 {
//!         fail(format!("limit {limit} too large"))
//!     } else {
//!         succeed(*limit * 2)
//!     }
//! });
//!
//! let interpreter = Interpreter::default();
//! let small = Context::empty().provide(&limit, 21);
//! let large = Context::empty().provide(&limit, 500);
//!
//! assert_eq!(interpreter.run(&check, &small), Ok(Outcome::Ok(42)));
//! assert_eq!(
//!     interpreter.run(&check, &large),
//!     Ok(Outcome::Err("limit 500 too large".to_string()))
//! );
//! assert!(interpreter.run(&check, &Context::empty()).is_err());
//! ```

pub mod combinators;
pub mod config;
pub mod context;
pub mod cx;
pub mod error;
pub mod interpreter;
pub mod key;
pub mod outcome;
pub mod report;
pub mod sequence;
pub mod step;
mod value;

pub use combinators::{
    all, and_then, ensuring, fail, for_each, gen, provide_sequence, service, succeed, suspend, sync,
    try_sync,
};
pub use config::{EngineConfig, EngineConfigError};
pub use context::{Context, Layer};
pub use cx::{Abort, Cx};
pub use error::Defect;
pub use interpreter::Interpreter;
pub use key::{CapabilityRef, Key, KeyId};
pub use outcome::Outcome;
pub use report::{RunReport, RunStats, TraceEvent};
pub use sequence::Sequence;
pub use step::StepKind;

/// Run `sequence` under `context` with the default interpreter
pub fn run<A: 'static, E: 'static>(
    sequence: &Sequence<A, E>,
    context: &Context,
) -> Result<Outcome<A, E>, Defect> {
    Interpreter::default().run(sequence, context)
}
