//! Run reports and the per-run journal

use crate::config::EngineConfig;
use crate::error::Defect;
use crate::outcome::Outcome;
use crate::step::StepKind;
use serde::{Deserialize, Serialize};

/// One entry of a run journal. `depth` is the frame nesting level, 0 being
/// the top-level run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    CapabilityResolved { depth: usize, name: String },
    CapabilityUnresolved { depth: usize, name: String },
    Failed { depth: usize },
    NestedEntered { depth: usize },
    NestedExited { depth: usize, ok: bool },
    FinalizerRegistered { depth: usize },
    FinalizerRan { depth: usize },
    FinalizerSuppressed { depth: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// Suspension points handled, across all frames
    pub steps: usize,
    pub capability_requests: usize,
    pub finalizers_run: usize,
    /// Failures discarded while settling the run
    pub suppressed: usize,
    pub max_depth: usize,
}

/// Everything a run produced besides its exit
#[derive(Debug)]
pub struct RunReport<A, E> {
    pub exit: Result<Outcome<A, E>, Defect>,
    /// Failures that lost to an earlier outcome, in the order they were
    /// discarded
    pub suppressed: Vec<E>,
    pub stats: RunStats,
    /// Empty unless the engine was configured to record traces
    pub trace: Vec<TraceEvent>,
    pub dropped_events: usize,
}

impl<A, E> RunReport<A, E> {
    pub fn is_success(&self) -> bool {
        matches!(self.exit, Ok(Outcome::Ok(_)))
    }

    pub fn into_exit(self) -> Result<Outcome<A, E>, Defect> {
        self.exit
    }
}

pub(crate) struct Journal {
    record: bool,
    capacity: usize,
    events: Vec<TraceEvent>,
    dropped: usize,
    stats: RunStats,
}

impl Journal {
    pub(crate) fn new(config: &EngineConfig) -> Self {
        Journal {
            record: config.record_trace,
            capacity: config.trace_capacity,
            events: Vec::new(),
            dropped: 0,
            stats: RunStats::default(),
        }
    }

    pub(crate) fn record(&mut self, event: impl FnOnce() -> TraceEvent) {
        if !self.record {
            return;
        }
        if self.events.len() < self.capacity {
            self.events.push(event());
        } else {
            self.dropped += 1;
        }
    }

    pub(crate) fn step(&mut self, kind: StepKind) {
        self.stats.steps += 1;
        if kind == StepKind::RequestCapability {
            self.stats.capability_requests += 1;
        }
    }

    pub(crate) fn reach(&mut self, depth: usize) {
        self.stats.max_depth = self.stats.max_depth.max(depth);
    }

    pub(crate) fn finalizer_ran(&mut self, depth: usize) {
        self.stats.finalizers_run += 1;
        self.record(|| TraceEvent::FinalizerRan { depth });
    }

    pub(crate) fn suppressed(&mut self, depth: usize) {
        self.stats.suppressed += 1;
        self.record(|| TraceEvent::FinalizerSuppressed { depth });
    }

    pub(crate) fn into_report<A, E>(
        self,
        exit: Result<Outcome<A, E>, Defect>,
        suppressed: Vec<E>,
    ) -> RunReport<A, E> {
        RunReport {
            exit,
            suppressed,
            stats: self.stats,
            trace: self.events,
            dropped_events: self.dropped,
        }
    }
}
