//! Sequences over the well-known capabilities
//!
//! Checks are written against these rather than against the keys directly.

use crate::diagnostic::{Diagnostic, Severity, TextEdit};
use crate::error::CheckError;
use crate::keys;
use crate::program::{Program, SourceFile};
use fx_step::{all, gen, service, Cx, Sequence};
use std::sync::Arc;

pub fn program<E: 'static>() -> Sequence<Arc<Program>, E> {
    service(keys::program())
}

pub fn source_file<E: 'static>() -> Sequence<Arc<SourceFile>, E> {
    service(keys::source_file())
}

pub fn host_option<E: 'static>(name: &str) -> Sequence<Option<String>, E> {
    let name = name.to_string();
    service(keys::host_options()).map(move |options| options.get(&name).cloned())
}

/// Look a file of the program up by path
pub fn file(path: &str) -> Sequence<Arc<SourceFile>, CheckError> {
    let path = path.to_string();
    gen(move |cx: &mut Cx<'_, CheckError>| {
        let program = cx.service(keys::program())?;
        match program.file(&path) {
            Some(file) => Ok(Arc::clone(file)),
            None => cx.fail(CheckError::missing_file(path.as_str())),
        }
    })
}

/// Ask the change tracker to apply `edit`; overlapping edits fail the check
pub fn record_edit(edit: TextEdit) -> Sequence<(), CheckError> {
    gen(move |cx: &mut Cx<'_, CheckError>| {
        let tracker = cx.service(keys::change_tracker())?;
        match tracker.record(edit.clone()) {
            Ok(()) => Ok(()),
            Err(error) => cx.fail(error),
        }
    })
}

/// Report every occurrence of `pattern` in the current file
pub fn pattern_check<E: 'static>(
    rule: &str,
    pattern: &str,
    severity: Severity,
    message: &str,
) -> Sequence<Vec<Diagnostic>, E> {
    let (rule, pattern, message) = (rule.to_string(), pattern.to_string(), message.to_string());
    source_file().map(move |file| {
        file.find_all(&pattern)
            .into_iter()
            .map(|span| {
                Diagnostic::new(file.path.as_str(), span, severity, rule.as_str(), message.as_str())
            })
            .collect()
    })
}

/// Run `checks` in order and concatenate their diagnostics
pub fn combine<E: 'static>(
    checks: impl IntoIterator<Item = Sequence<Vec<Diagnostic>, E>>,
) -> Sequence<Vec<Diagnostic>, E> {
    all(checks).map(|batches| batches.into_iter().flatten().collect())
}
