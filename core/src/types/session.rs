//! Session sub-structures: retrieved entries, reasoning steps, feedback status.

use super::ChunkId;
use serde::{Deserialize, Serialize};

/// Whether a retrieved chunk was reported useful by feedback. `Unknown`
/// until feedback is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Usefulness {
    Useful,
    NotUseful,
    Unknown,
}

/// One entry of a session's immutable retrieved list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrievedEntry {
    pub chunk_id: ChunkId,
    /// 1-based rank within this session's retrieved list.
    pub rank: usize,
    pub raw_similarity: f64,
    pub effective_score: f64,
    pub workflow_boosted: bool,
    pub was_useful: Usefulness,
}

/// The phase of the Ask pipeline a reasoning step or timing belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Embed,
    WorkflowLookup,
    Retrieve,
    Generate,
    Persist,
}

impl Phase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Embed => "embed",
            Phase::WorkflowLookup => "workflow_lookup",
            Phase::Retrieve => "retrieve",
            Phase::Generate => "generate",
            Phase::Persist => "persist",
        }
    }
}

/// One entry of a session's reasoning trace: a phase, a human-readable
/// description, and (once the phase ends) its wall-clock duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub phase: Phase,
    pub description: String,
    pub duration_ms: Option<u64>,
}

/// A session's feedback lifecycle state (invariant I3: at most one
/// effectful transition out of `Pending`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackStatus {
    Pending,
    Correct,
    Incorrect,
}

impl FeedbackStatus {
    /// Whether this status can still accept a feedback call.
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(self, FeedbackStatus::Pending)
    }
}
