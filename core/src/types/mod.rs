//! Core domain types: chunks, sessions, and workflow memories.

mod ids;
mod session;

pub use ids::{ChunkId, SessionId, WorkflowMemoryId};
pub use session::{FeedbackStatus, ReasoningStep, RetrievedEntry, Usefulness};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An immutable content chunk with a mutable, feedback-driven accuracy weight.
///
/// `content`, `repo`, `path`, `section`, and `embedding` are set once by the
/// ingester and never change. `accuracy_weight` and the retrieval counters
/// are the only fields the engine itself mutates, and only through
/// [`crate::storage::ChunkStore::adjust_weight`] and
/// [`crate::storage::ChunkStore::bump_counters`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub content: String,
    pub repo: String,
    pub path: String,
    pub section: String,
    pub embedding: Vec<f32>,
    pub accuracy_weight: f64,
    pub times_retrieved: u64,
    pub times_useful: u64,
}

impl Chunk {
    /// Initial weight assigned to every chunk at ingestion.
    pub const INITIAL_WEIGHT: f64 = 1.0;

    /// A ~200-char provenance-aware preview used by `INSPECT SESSION` and
    /// workflow memory summaries.
    #[must_use]
    pub fn content_preview(&self, max_len: usize) -> String {
        if self.content.chars().count() <= max_len {
            self.content.clone()
        } else {
            let truncated: String = self.content.chars().take(max_len.saturating_sub(1)).collect();
            format!("{truncated}…")
        }
    }

    /// A short, deterministic provenance slug (`repo/path#section`) used to
    /// compose workflow memory summaries.
    #[must_use]
    pub fn provenance_slug(&self) -> String {
        format!("{}/{}#{}", self.repo, self.path, self.section)
    }
}

/// A persistent record of a past successful reasoning episode.
///
/// Created only from sessions marked `correct` with at least one useful
/// chunk (invariant I4); never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMemory {
    pub id: WorkflowMemoryId,
    pub summary_embedding: Vec<f32>,
    pub source_session_id: SessionId,
    pub useful_chunk_ids: Vec<ChunkId>,
    pub created_at: DateTime<Utc>,
}

/// A persistent record of one (query, answer, retrieved chunks, feedback)
/// tuple — the unit of feedback attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub query: String,
    pub query_embedding: Vec<f32>,
    pub answer: String,
    pub retrieved: Vec<RetrievedEntry>,
    pub reasoning_steps: Vec<ReasoningStep>,
    pub feedback_status: FeedbackStatus,
    pub correction_text: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Whether this session's list of retrieved entries satisfies invariant
    /// I2: strictly increasing rank starting at 1.
    #[must_use]
    pub fn has_well_formed_ranks(&self) -> bool {
        self.retrieved
            .iter()
            .enumerate()
            .all(|(i, entry)| entry.rank == i + 1)
    }

    /// Chunk ids reported useful, in encounter order. Empty unless feedback
    /// has been applied.
    #[must_use]
    pub fn useful_chunk_ids(&self) -> Vec<ChunkId> {
        self.retrieved
            .iter()
            .filter(|e| e.was_useful == Usefulness::Useful)
            .map(|e| e.chunk_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> Chunk {
        Chunk {
            id: ChunkId(1),
            content: "a".repeat(250),
            repo: "acme/widgets".to_string(),
            path: "docs/setup.md".to_string(),
            section: "Installation".to_string(),
            embedding: vec![0.0; 4],
            accuracy_weight: Chunk::INITIAL_WEIGHT,
            times_retrieved: 0,
            times_useful: 0,
        }
    }

    #[test]
    fn content_preview_truncates_with_ellipsis() {
        let chunk = sample_chunk();
        let preview = chunk.content_preview(200);
        assert_eq!(preview.chars().count(), 200); // 199 chars + ellipsis, bounded by max_len
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn content_preview_passes_through_short_content() {
        let mut chunk = sample_chunk();
        chunk.content = "short".to_string();
        assert_eq!(chunk.content_preview(200), "short");
    }

    #[test]
    fn provenance_slug_is_deterministic() {
        let chunk = sample_chunk();
        assert_eq!(chunk.provenance_slug(), "acme/widgets/docs/setup.md#Installation");
    }
}
