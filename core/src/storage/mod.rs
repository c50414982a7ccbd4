//! Storage abstraction: async traits for the three logical stores
//! (chunks, sessions, workflow memories), backed by either the in-memory
//! implementation in this crate or the SQL-backed implementation in
//! `askdocs-storage-sql`.

pub mod memory;

use crate::error::Result;
use crate::types::{Chunk, ChunkId, FeedbackStatus, Session, SessionId, Usefulness, WorkflowMemory, WorkflowMemoryId};
use async_trait::async_trait;

/// Persistent set of immutable content chunks with a mutable,
/// feedback-driven `accuracy_weight`. Every mutation is a single-row
/// transaction; readers observe either the pre- or post-state, never a
/// torn value.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// The `N` nearest chunks to `query_vec` by cosine similarity, each
    /// paired with its raw similarity score. `N` is a pre-ranking fanout
    /// configured larger than K by the caller.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on persistence failure.
    async fn fetch_candidates(&self, query_vec: &[f32], n: usize) -> Result<Vec<(Chunk, f64)>>;

    /// Fetch a single chunk by id.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no chunk with `id` exists, `Error::Store`
    /// on persistence failure.
    async fn get(&self, id: ChunkId) -> Result<Chunk>;

    /// Atomically increment `times_retrieved` and, if `useful`, also
    /// `times_useful` (invariant I5: `times_useful ≤ times_retrieved`).
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no chunk with `id` exists, `Error::Store`
    /// on persistence failure.
    async fn bump_counters(&self, id: ChunkId, useful: bool) -> Result<()>;

    /// Atomically set `weight ← clamp(weight + delta, W_min, W_max)` and
    /// return the post-state. `delta` magnitude is bounded by the caller
    /// (`|δ| ≤ 0.5`).
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no chunk with `id` exists, `Error::Store`
    /// on persistence failure.
    async fn adjust_weight(&self, id: ChunkId, delta: f64, w_min: f64, w_max: f64) -> Result<f64>;

    /// Atomically set `weight` to an exact value, clamped to `[w_min, w_max]`,
    /// for the `CHUNK EDIT` admin operation.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no chunk with `id` exists, `Error::Store`
    /// on persistence failure.
    async fn set_weight(&self, id: ChunkId, new_weight: f64, w_min: f64, w_max: f64) -> Result<f64>;

    /// All chunks, for `STATS` aggregation. Implementations may choose to
    /// page internally; this trait exposes the simplest "give me
    /// everything" contract since the core budget assumes a corpus that
    /// fits comfortably in a scan.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on persistence failure.
    async fn all(&self) -> Result<Vec<Chunk>>;
}

/// Persistent set of workflow memories: embeddings summarising past
/// successful reasoning, each tied to the chunk ids that were useful.
/// Append-only; concurrent inserts of distinct ids are independent.
#[async_trait]
pub trait WorkflowMemoryStore: Send + Sync {
    /// Cosine search restricted to recorded memories, filtering by
    /// `min_sim` and returning up to `top_m`, most similar first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on persistence failure.
    async fn find_similar(
        &self,
        query_vec: &[f32],
        top_m: usize,
        min_sim: f64,
    ) -> Result<Vec<(WorkflowMemory, f64)>>;

    /// Insert a new workflow memory. Rejects a duplicate
    /// `source_session_id` as `Error::InvalidInput`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `source_session_id` already has a
    /// memory, `Error::Store` on persistence failure.
    async fn record(
        &self,
        summary_vec: Vec<f32>,
        source_session_id: SessionId,
        useful_chunk_ids: Vec<ChunkId>,
    ) -> Result<WorkflowMemoryId>;

    /// Count of recorded workflow memories, for `STATS`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on persistence failure.
    async fn count(&self) -> Result<usize>;
}

/// Persistent record of each (query, answer, retrieved chunks, feedback)
/// tuple — the unit of feedback attribution.
#[async_trait]
pub trait SessionLog: Send + Sync {
    /// Single atomic write including the retrieved list and reasoning
    /// trace; returns the assigned session id.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on persistence failure.
    async fn create(&self, session: Session) -> Result<SessionId>;

    /// Fetch a session by id.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no session with `id` exists,
    /// `Error::Store` on persistence failure.
    async fn get(&self, id: SessionId) -> Result<Session>;

    /// List sessions with `feedback_status == Pending`, newest first, for
    /// `STATS`'s pending-feedback count and for feedback worklists.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on persistence failure.
    async fn list_pending(&self) -> Result<Vec<Session>>;

    /// Atomically apply feedback: set `feedback_status`, mark
    /// `was_useful` on each listed entry, and store `correction`.
    /// Rejects (`Error::AlreadyFinalised`) a second call against a
    /// session whose status is no longer `Pending`.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no session with `id` exists,
    /// `Error::AlreadyFinalised` if feedback was already applied,
    /// `Error::Store` on persistence failure.
    async fn update_feedback(
        &self,
        id: SessionId,
        status: FeedbackStatus,
        usefulness: &[(ChunkId, Usefulness)],
        correction: Option<String>,
    ) -> Result<()>;

    /// Aggregate counts for `STATS`: total sessions, sessions with
    /// `feedback_status == Correct`, and sessions still `Pending`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on persistence failure.
    async fn stats(&self) -> Result<SessionStats>;
}

/// Aggregate counts backing the `STATS` operation's accuracy rate and
/// pending-feedback count.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStats {
    pub total: u64,
    pub correct: u64,
    pub incorrect: u64,
    pub pending: u64,
}

impl SessionStats {
    /// `correct / (correct + incorrect)`, or `None` if no feedback has
    /// been finalised yet.
    #[must_use]
    pub fn accuracy_rate(&self) -> Option<f64> {
        let decided = self.correct + self.incorrect;
        if decided == 0 {
            None
        } else {
            Some(self.correct as f64 / decided as f64)
        }
    }
}
