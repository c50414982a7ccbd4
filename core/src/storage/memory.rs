//! In-memory implementations of the three store traits, for tests, the CLI
//! demo mode, and as a reference before reaching for the SQL backend.

use super::{ChunkStore, SessionLog, SessionStats, WorkflowMemoryStore};
use crate::embedder::cosine_similarity;
use crate::error::{Error, Result};
use crate::types::{
    Chunk, ChunkId, FeedbackStatus, Session, SessionId, Usefulness, WorkflowMemory, WorkflowMemoryId,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// In-memory [`ChunkStore`]. Mutations are guarded by a single mutex over
/// the whole table; since each method holds the lock only for the
/// duration of one chunk's read-modify-write, readers never observe a
/// torn value, matching the single-row-transaction contract.
#[derive(Default)]
pub struct InMemoryChunkStore {
    chunks: Mutex<HashMap<ChunkId, Chunk>>,
}

impl InMemoryChunkStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with a chunk, for tests and ingestion fixtures.
    pub fn insert(&self, chunk: Chunk) {
        self.chunks.lock().insert(chunk.id, chunk);
    }
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn fetch_candidates(&self, query_vec: &[f32], n: usize) -> Result<Vec<(Chunk, f64)>> {
        let chunks = self.chunks.lock();
        let mut scored: Vec<(Chunk, f64)> = Vec::with_capacity(chunks.len());
        for chunk in chunks.values() {
            let sim = cosine_similarity(query_vec, &chunk.embedding)?;
            scored.push((chunk.clone(), sim));
        }
        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        scored.truncate(n);
        Ok(scored)
    }

    async fn get(&self, id: ChunkId) -> Result<Chunk> {
        self.chunks
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("chunk {id}")))
    }

    async fn bump_counters(&self, id: ChunkId, useful: bool) -> Result<()> {
        let mut chunks = self.chunks.lock();
        let chunk = chunks.get_mut(&id).ok_or_else(|| Error::NotFound(format!("chunk {id}")))?;
        chunk.times_retrieved += 1;
        if useful {
            chunk.times_useful += 1;
        }
        Ok(())
    }

    async fn adjust_weight(&self, id: ChunkId, delta: f64, w_min: f64, w_max: f64) -> Result<f64> {
        let mut chunks = self.chunks.lock();
        let chunk = chunks.get_mut(&id).ok_or_else(|| Error::NotFound(format!("chunk {id}")))?;
        chunk.accuracy_weight = (chunk.accuracy_weight + delta).clamp(w_min, w_max);
        Ok(chunk.accuracy_weight)
    }

    async fn set_weight(&self, id: ChunkId, new_weight: f64, w_min: f64, w_max: f64) -> Result<f64> {
        let mut chunks = self.chunks.lock();
        let chunk = chunks.get_mut(&id).ok_or_else(|| Error::NotFound(format!("chunk {id}")))?;
        chunk.accuracy_weight = new_weight.clamp(w_min, w_max);
        Ok(chunk.accuracy_weight)
    }

    async fn all(&self) -> Result<Vec<Chunk>> {
        Ok(self.chunks.lock().values().cloned().collect())
    }
}

/// In-memory [`WorkflowMemoryStore`], append-only.
#[derive(Default)]
pub struct InMemoryWorkflowMemoryStore {
    memories: Mutex<Vec<WorkflowMemory>>,
}

impl InMemoryWorkflowMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowMemoryStore for InMemoryWorkflowMemoryStore {
    async fn find_similar(
        &self,
        query_vec: &[f32],
        top_m: usize,
        min_sim: f64,
    ) -> Result<Vec<(WorkflowMemory, f64)>> {
        let memories = self.memories.lock();
        let mut scored: Vec<(WorkflowMemory, f64)> = Vec::new();
        for memory in memories.iter() {
            let sim = cosine_similarity(query_vec, &memory.summary_embedding)?;
            if sim >= min_sim {
                scored.push((memory.clone(), sim));
            }
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_m);
        Ok(scored)
    }

    async fn record(
        &self,
        summary_vec: Vec<f32>,
        source_session_id: SessionId,
        useful_chunk_ids: Vec<ChunkId>,
    ) -> Result<WorkflowMemoryId> {
        let mut memories = self.memories.lock();
        if memories.iter().any(|m| m.source_session_id == source_session_id) {
            return Err(Error::InvalidInput(format!(
                "workflow memory already recorded for session {source_session_id}"
            )));
        }
        let id = WorkflowMemoryId::new();
        memories.push(WorkflowMemory {
            id,
            summary_embedding: summary_vec,
            source_session_id,
            useful_chunk_ids,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.memories.lock().len())
    }
}

/// In-memory [`SessionLog`]. Session ids are assigned monotonically from
/// an atomic counter to mirror a `SERIAL`/`AUTOINCREMENT` primary key.
pub struct InMemorySessionLog {
    sessions: Mutex<HashMap<SessionId, Session>>,
    next_id: AtomicI64,
}

impl Default for InMemorySessionLog {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemorySessionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionLog for InMemorySessionLog {
    async fn create(&self, mut session: Session) -> Result<SessionId> {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        session.id = id;
        self.sessions.lock().insert(id, session);
        Ok(id)
    }

    async fn get(&self, id: SessionId) -> Result<Session> {
        self.sessions
            .lock()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("session {id}")))
    }

    async fn list_pending(&self) -> Result<Vec<Session>> {
        let mut pending: Vec<Session> = self
            .sessions
            .lock()
            .values()
            .filter(|s| s.feedback_status.is_pending())
            .cloned()
            .collect();
        pending.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(pending)
    }

    async fn update_feedback(
        &self,
        id: SessionId,
        status: FeedbackStatus,
        usefulness: &[(ChunkId, Usefulness)],
        correction: Option<String>,
    ) -> Result<()> {
        let mut sessions = self.sessions.lock();
        let session = sessions.get_mut(&id).ok_or_else(|| Error::NotFound(format!("session {id}")))?;

        if !session.feedback_status.is_pending() {
            return Err(Error::AlreadyFinalised(format!("session {id}")));
        }

        for entry in &mut session.retrieved {
            if let Some((_, useful)) = usefulness.iter().find(|(id, _)| *id == entry.chunk_id) {
                entry.was_useful = *useful;
            }
        }
        session.feedback_status = status;
        session.correction_text = correction;
        Ok(())
    }

    async fn stats(&self) -> Result<SessionStats> {
        let sessions = self.sessions.lock();
        let mut stats = SessionStats::default();
        for session in sessions.values() {
            stats.total += 1;
            match session.feedback_status {
                FeedbackStatus::Pending => stats.pending += 1,
                FeedbackStatus::Correct => stats.correct += 1,
                FeedbackStatus::Incorrect => stats.incorrect += 1,
            }
        }
        Ok(stats)
    }
}
