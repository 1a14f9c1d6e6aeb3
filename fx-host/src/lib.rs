//! Host glue for the step engine
//!
//! The pieces every consumer of `fx-step` needs to run checks: well-known
//! capability keys, the in-memory program model, configuration, logging
//! setup and [`Session`], which runs one check over every file of a
//! program.

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod keys;
pub mod logging;
pub mod program;
pub mod services;
pub mod session;

pub use config::{ConfigError, HostConfig};
pub use diagnostic::{ChangeTracker, Diagnostic, Severity, TextEdit};
pub use error::CheckError;
pub use logging::init_logging;
pub use program::{Program, SourceFile, Span};
pub use session::{AnalysisReport, Check, FileDefect, FileFailure, Session};
