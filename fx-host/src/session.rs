//! Analysis sessions
//!
//! A session owns the context shared by every file of one analysis request
//! and drives one check over each file in turn, providing the per-file
//! capabilities each time. Edits a file records are kept only when its check
//! succeeds.

use crate::config::HostConfig;
use crate::diagnostic::{ChangeTracker, Diagnostic, Severity, TextEdit};
use crate::error::CheckError;
use crate::keys;
use crate::program::Program;
use anyhow::Context as _;
use fx_step::{Context, Interpreter, Outcome, RunStats, Sequence, TraceEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn};

/// A check, as run by a session over each file
pub type Check = Sequence<Vec<Diagnostic>, CheckError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFailure {
    pub file: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDefect {
    pub file: String,
    /// The capability nobody provided, when that was the cause
    pub capability: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub files_analyzed: usize,
    pub diagnostics: Vec<Diagnostic>,
    pub failures: Vec<FileFailure>,
    pub defects: Vec<FileDefect>,
    /// Finalizer failures that lost to an earlier outcome
    pub suppressed: Vec<FileFailure>,
    pub edits: Vec<TextEdit>,
    pub stats: RunStats,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub traces: BTreeMap<String, Vec<TraceEvent>>,
}

impl AnalysisReport {
    /// No errors, failures or defects
    pub fn is_clean(&self) -> bool {
        self.error_count() == 0 && self.failures.is_empty() && self.defects.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.severity == Severity::Error)
            .count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub struct Session {
    config: HostConfig,
    interpreter: Interpreter,
    program: Arc<Program>,
    context: Context,
}

impl Session {
    pub fn new(config: HostConfig, program: Program) -> Self {
        let program = Arc::new(program);
        let context = Context::empty()
            .provide_shared(keys::program(), Arc::clone(&program))
            .provide(keys::host_options(), config.options.clone());

        Self {
            interpreter: Interpreter::new(config.engine.clone()),
            config,
            program,
            context,
        }
    }

    pub fn from_config_path(path: &Path, program: Program) -> anyhow::Result<Self> {
        let config = HostConfig::from_file(path)
            .with_context(|| format!("Failed to load host configuration: {}", path.display()))?;
        Ok(Self::new(config, program))
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Context shared by every file of this session
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Run `check` over every file of the program
    pub fn analyze(&self, check: &Check) -> AnalysisReport {
        let span = info_span!("analyze", files = self.program.len());
        let _entered = span.enter();

        let mut report = AnalysisReport::default();

        for file in self.program.files() {
            debug!(file = %file.path, "running check");
            let tracker = Arc::new(ChangeTracker::new());
            let context = self
                .context
                .provide_shared(keys::change_tracker(), Arc::clone(&tracker))
                .provide_shared(keys::source_file(), Arc::clone(file));
            let run = self.interpreter.run_with_report(check, &context);

            report.files_analyzed += 1;
            absorb(&mut report.stats, &run.stats);
            if !run.trace.is_empty() {
                report.traces.insert(file.path.clone(), run.trace);
            }
            report
                .suppressed
                .extend(run.suppressed.iter().map(|error| FileFailure {
                    file: file.path.clone(),
                    message: error.to_string(),
                }));

            match run.exit {
                Ok(Outcome::Ok(diagnostics)) => {
                    debug!(file = %file.path, count = diagnostics.len(), "check finished");
                    report.diagnostics.extend(diagnostics);
                    report.edits.extend(tracker.take());
                }
                Ok(Outcome::Err(failure)) => {
                    warn!(file = %file.path, %failure, discarded = tracker.len(), "check failed");
                    report.failures.push(FileFailure {
                        file: file.path.clone(),
                        message: failure.to_string(),
                    });
                }
                Err(defect) => {
                    let discarded = tracker.len();
                    error!(file = %file.path, %defect, discarded, "check hit a defect");
                    report.defects.push(FileDefect {
                        file: file.path.clone(),
                        capability: defect.capability_name().map(str::to_string),
                        message: defect.to_string(),
                    });
                    if self.config.fail_fast {
                        break;
                    }
                }
            }
        }

        info!(
            files = report.files_analyzed,
            diagnostics = report.diagnostics.len(),
            failures = report.failures.len(),
            defects = report.defects.len(),
            edits = report.edits.len(),
            "analysis finished"
        );
        report
    }
}

fn absorb(total: &mut RunStats, run: &RunStats) {
    total.steps += run.steps;
    total.capability_requests += run.capability_requests;
    total.finalizers_run += run.finalizers_run;
    total.suppressed += run.suppressed;
    total.max_depth = total.max_depth.max(run.max_depth);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::Span;
    use crate::services;
    use fx_step::{fail, succeed};

    fn program() -> Program {
        Program::new()
            .with_file("a.ts", "Effect.runSync(main)")
            .with_file("b.ts", "const x = 1")
    }

    #[test]
    fn test_analyze_runs_check_per_file() {
        let session = Session::new(HostConfig::default(), program());
        let check =
            services::pattern_check("run-sync", "runSync", Severity::Warning, "avoid runSync");

        let report = session.analyze(&check);

        assert_eq!(report.files_analyzed, 2);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].file, "a.ts");
        assert!(report.is_clean());
    }

    #[test]
    fn test_failures_are_recorded_per_file() {
        let session = Session::new(HostConfig::default(), program());
        let check: Check = fail(CheckError::rule("always", "nope"));

        let report = session.analyze(&check);

        assert_eq!(report.failures.len(), 2);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_fail_fast_stops_at_first_defect() {
        let missing: fx_step::Key<u8> = fx_step::Key::new("not_wired");
        let check: Check = fx_step::service(&missing).and_then(|_| succeed(Vec::new()));

        let mut config = HostConfig::default();
        config.fail_fast = true;
        let report = Session::new(config, program()).analyze(&check);

        assert_eq!(report.files_analyzed, 1);
        assert_eq!(report.defects.len(), 1);
        assert_eq!(report.defects[0].capability.as_deref(), Some("not_wired"));
    }

    #[test]
    fn test_failed_check_discards_its_edits() {
        let check: Check = services::source_file().and_then(|file| {
            let edit = TextEdit::new(file.path.as_str(), Span::new(0, 1), "y");
            let verdict: Check = if file.path == "a.ts" {
                fail(CheckError::rule("rewrite", "gave up after editing"))
            } else {
                succeed(Vec::new())
            };
            services::record_edit(edit).and_then(move |_| verdict.clone())
        });

        let report = Session::new(HostConfig::default(), program()).analyze(&check);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file, "a.ts");
        assert_eq!(report.edits, vec![TextEdit::new("b.ts", Span::new(0, 1), "y")]);
    }

    #[test]
    fn test_defective_check_discards_its_edits() {
        let unwired: fx_step::Key<u8> = fx_step::Key::new("formatter");
        let check: Check = services::source_file().and_then(move |file| {
            let edit = TextEdit::new(file.path.as_str(), Span::new(0, 1), "y");
            let after: Check = if file.path == "b.ts" {
                fx_step::service(&unwired).map(|_| Vec::new())
            } else {
                succeed(Vec::new())
            };
            services::record_edit(edit).and_then(move |_| after.clone())
        });

        let report = Session::new(HostConfig::default(), program()).analyze(&check);

        assert_eq!(report.defects.len(), 1);
        assert_eq!(report.defects[0].file, "b.ts");
        assert_eq!(report.edits, vec![TextEdit::new("a.ts", Span::new(0, 1), "y")]);
    }

    #[test]
    fn test_edits_to_same_span_in_different_files_are_kept() {
        let check: Check = services::source_file().and_then(|file| {
            let edit = TextEdit::new(file.path.as_str(), Span::new(0, 1), "y");
            services::record_edit(edit).map(|_| Vec::new())
        });

        let report = Session::new(HostConfig::default(), program()).analyze(&check);

        assert!(report.is_clean());
        assert_eq!(report.edits.len(), 2);
    }

    #[test]
    fn test_report_json() {
        let session = Session::new(HostConfig::default(), program());
        let report = session.analyze(&succeed(Vec::new()));

        let json = report.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["files_analyzed"], 2);
        assert!(value.get("traces").is_none());
    }
}
