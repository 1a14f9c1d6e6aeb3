//! Interpreter settings

use serde::{Deserialize, Serialize};

/// Interpreter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Keep a journal of trace events in every run report
    pub record_trace: bool,
    /// Maximum number of journal entries kept per run; later ones are counted
    /// but dropped
    pub trace_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            record_trace: false,
            trace_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Configuration that records every event of a run
    pub fn tracing() -> Self {
        Self {
            record_trace: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineConfigError> {
        if self.record_trace && self.trace_capacity == 0 {
            return Err(EngineConfigError::Invalid {
                field: "trace_capacity",
                message: "Trace capacity must be positive when traces are recorded".to_string(),
            });
        }
        Ok(())
    }

    /// Merge with an overriding configuration, such as a project file over
    /// user defaults. Merging only ever switches `record_trace` on, and a
    /// `trace_capacity` equal to the default leaves the current one.
    pub fn merge(&mut self, other: EngineConfig) {
        let defaults = EngineConfig::default();
        if other.record_trace {
            self.record_trace = other.record_trace;
        }
        if other.trace_capacity != defaults.trace_capacity {
            self.trace_capacity = other.trace_capacity;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineConfigError {
    #[error("Invalid engine configuration for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}
