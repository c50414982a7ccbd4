//! Workflow Tracer: a scoped, single-threaded object that records one
//! request's retrieved chunks, per-phase timings, and reasoning steps.

use crate::types::{Phase, ReasoningStep, RetrievedEntry};
use std::collections::HashMap;
use std::time::Instant;

/// Bound to exactly one in-flight Ask request. Not `Send` across awaits by
/// contract — held by `&mut` reference by its owner, never shared across
/// tasks. All insertions preserve order; `snapshot` is idempotent.
#[derive(Debug, Default)]
pub struct WorkflowTracer {
    retrieved: Vec<RetrievedEntry>,
    steps: Vec<ReasoningStep>,
    phase_starts: HashMap<Phase, Instant>,
}

/// The persistable result of a completed trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceSnapshot {
    pub retrieved: Vec<RetrievedEntry>,
    pub steps: Vec<ReasoningStep>,
}

impl WorkflowTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one retrieved chunk in rank order.
    pub fn add_retrieved(&mut self, entry: RetrievedEntry) {
        self.retrieved.push(entry);
    }

    /// Record a reasoning step for `phase` with no duration yet attached.
    pub fn add_step(&mut self, phase: Phase, description: impl Into<String>) {
        self.steps.push(ReasoningStep {
            phase,
            description: description.into(),
            duration_ms: None,
        });
    }

    /// Mark the wall-clock start of `phase`. Calling twice for the same
    /// phase overwrites the earlier start.
    pub fn mark_phase_start(&mut self, phase: Phase) {
        self.phase_starts.insert(phase, Instant::now());
    }

    /// Mark the wall-clock end of `phase`, recording its duration against
    /// the most recently added step for that phase, if any; otherwise
    /// appends a bare timing step.
    pub fn mark_phase_end(&mut self, phase: Phase) {
        let Some(start) = self.phase_starts.remove(&phase) else {
            return;
        };
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        if let Some(step) = self.steps.iter_mut().rev().find(|s| s.phase == phase && s.duration_ms.is_none()) {
            step.duration_ms = Some(elapsed_ms);
        } else {
            self.steps.push(ReasoningStep {
                phase,
                description: format!("{} completed", phase.as_str()),
                duration_ms: Some(elapsed_ms),
            });
        }
    }

    /// Produce the persistable reasoning trace. Calling multiple times
    /// returns equal snapshots as long as no further mutation occurs.
    #[must_use]
    pub fn snapshot(&self) -> TraceSnapshot {
        TraceSnapshot {
            retrieved: self.retrieved.clone(),
            steps: self.steps.clone(),
        }
    }
}
