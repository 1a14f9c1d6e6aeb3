//! fx-analyzer
//!
//! The step engine ([`fx_step`]) and the host glue that runs checks written
//! against it ([`fx_host`]).

pub use fx_host as host;
pub use fx_step as step;

pub use fx_host::{
    AnalysisReport, Check, CheckError, Diagnostic, HostConfig, Program, Session, Severity,
};
pub use fx_step::{Context, Cx, Defect, Interpreter, Key, Outcome, Sequence};

use std::path::Path;

/// Load the host configuration at `config_path` and run `check` over
/// `program`
pub fn analyze(
    config_path: &Path,
    program: Program,
    check: &Check,
) -> anyhow::Result<AnalysisReport> {
    let session = Session::from_config_path(config_path, program)?;
    Ok(session.analyze(check))
}
