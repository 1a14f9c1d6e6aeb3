//! Diagnostics and text edits produced by checks

use crate::error::CheckError;
use crate::program::Span;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub span: Span,
    pub severity: Severity,
    /// Name of the rule that produced this diagnostic
    pub rule: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        file: impl Into<String>,
        span: Span,
        severity: Severity,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            span,
            severity,
            rule: rule.into(),
            message: message.into(),
        }
    }

    pub fn error(
        file: impl Into<String>,
        span: Span,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(file, span, Severity::Error, rule, message)
    }

    pub fn warning(
        file: impl Into<String>,
        span: Span,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(file, span, Severity::Warning, rule, message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub file: String,
    pub span: Span,
    pub replacement: String,
}

impl TextEdit {
    pub fn new(file: impl Into<String>, span: Span, replacement: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            span,
            replacement: replacement.into(),
        }
    }
}

/// Collects the edits one check requests for one file.
///
/// Capability values are shared immutably, so recording goes through a
/// lock. Edits to the same file must not overlap.
#[derive(Debug, Default)]
pub struct ChangeTracker {
    edits: Mutex<Vec<TextEdit>>,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TextEdit>> {
        self.edits.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, edit: TextEdit) -> Result<(), CheckError> {
        let mut edits = self.lock();
        if let Some(existing) = edits
            .iter()
            .find(|existing| existing.file == edit.file && existing.span.overlaps(&edit.span))
        {
            return Err(CheckError::edit(format!(
                "{} at {} overlaps an edit at {}",
                edit.file, edit.span, existing.span
            )));
        }
        edits.push(edit);
        Ok(())
    }

    pub fn edits(&self) -> Vec<TextEdit> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Remove and return every recorded edit
    pub fn take(&self) -> Vec<TextEdit> {
        std::mem::take(&mut *self.lock())
    }
}
