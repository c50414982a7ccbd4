//! Feedback Processor: applies a feedback event to a session, mutating
//! chunk weights and optionally creating a workflow memory.

pub mod summary;

use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::storage::{ChunkStore, SessionLog, WorkflowMemoryStore};
use crate::types::{ChunkId, FeedbackStatus, SessionId, Usefulness};
use std::sync::Arc;
use tracing::{info, warn};

/// One chunk's feedback report: was it useful for answering its session's
/// query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkFeedback {
    pub chunk_id: ChunkId,
    pub was_useful: bool,
}

/// Outcome of applying one feedback event, returned to the external
/// interface layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackOutcome {
    pub chunks_updated: usize,
    pub workflow_memory_created: bool,
}

/// Applies feedback events to sessions: mutates chunk weights, optionally
/// creates a workflow memory, updates session status.
pub struct FeedbackProcessor {
    chunk_store: Arc<dyn ChunkStore>,
    session_log: Arc<dyn SessionLog>,
    workflow_memory_store: Arc<dyn WorkflowMemoryStore>,
    embedder: Arc<Embedder>,
    delta: f64,
    w_min: f64,
    w_max: f64,
    r_mem: u32,
    workflow_enabled: bool,
}

impl FeedbackProcessor {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chunk_store: Arc<dyn ChunkStore>,
        session_log: Arc<dyn SessionLog>,
        workflow_memory_store: Arc<dyn WorkflowMemoryStore>,
        embedder: Arc<Embedder>,
        delta: f64,
        w_min: f64,
        w_max: f64,
        r_mem: u32,
        workflow_enabled: bool,
    ) -> Self {
        Self {
            chunk_store,
            session_log,
            workflow_memory_store,
            embedder,
            delta,
            w_min,
            w_max,
            r_mem,
            workflow_enabled,
        }
    }

    /// Apply one feedback event.
    ///
    /// 1. Load the session; fail with `NotFound`/`AlreadyFinalised` as
    ///    appropriate.
    /// 2. For each listed chunk, bump its counters and adjust its weight
    ///    by `±Δ`; chunks not listed are left untouched.
    /// 3. Set the session's feedback status.
    /// 4. If correct and at least one chunk was useful, compose a summary,
    ///    embed it, and best-effort record a workflow memory (retried up
    ///    to `R_mem` times; failure here does not roll back step 2–3).
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the session doesn't exist,
    /// `Error::AlreadyFinalised` if feedback was already applied,
    /// `Error::Store`/`Error::Provider` on downstream failure.
    pub async fn apply(
        &self,
        session_id: SessionId,
        is_correct: bool,
        chunk_feedback: &[ChunkFeedback],
        correction: Option<String>,
    ) -> Result<FeedbackOutcome> {
        let session = self.session_log.get(session_id).await?;
        if !session.feedback_status.is_pending() {
            return Err(Error::AlreadyFinalised(format!("session {session_id}")));
        }

        for feedback in chunk_feedback {
            let delta = if feedback.was_useful { self.delta } else { -self.delta };
            self.chunk_store.bump_counters(feedback.chunk_id, feedback.was_useful).await?;
            self.chunk_store
                .adjust_weight(feedback.chunk_id, delta, self.w_min, self.w_max)
                .await?;
        }

        let usefulness: Vec<(ChunkId, Usefulness)> = chunk_feedback
            .iter()
            .map(|f| (f.chunk_id, if f.was_useful { Usefulness::Useful } else { Usefulness::NotUseful }))
            .collect();
        let status = if is_correct { FeedbackStatus::Correct } else { FeedbackStatus::Incorrect };
        self.session_log.update_feedback(session_id, status, &usefulness, correction).await?;

        let useful_ids: Vec<ChunkId> = chunk_feedback
            .iter()
            .filter(|f| f.was_useful)
            .map(|f| f.chunk_id)
            .collect();

        let workflow_memory_created = if is_correct && !useful_ids.is_empty() && self.workflow_enabled {
            self.record_workflow_memory(session_id, &session.query, &useful_ids).await
        } else {
            false
        };

        Ok(FeedbackOutcome {
            chunks_updated: chunk_feedback.len(),
            workflow_memory_created,
        })
    }

    /// Best-effort: compose + embed + record, retried up to `R_mem` times.
    /// Logged on failure; never surfaced to the caller or rolled back.
    async fn record_workflow_memory(&self, session_id: SessionId, query: &str, useful_ids: &[ChunkId]) -> bool {
        let mut useful_chunks = Vec::with_capacity(useful_ids.len());
        for id in useful_ids {
            match self.chunk_store.get(*id).await {
                Ok(chunk) => useful_chunks.push(chunk),
                Err(e) => {
                    warn!("workflow memory skipped: failed to load chunk {id}: {e}");
                    return false;
                }
            }
        }

        let summary_text = summary::compose_summary(query, &useful_chunks);
        let embedder = &self.embedder;
        let workflow_memory_store = &self.workflow_memory_store;
        let useful_ids = useful_ids.to_vec();

        let mut policy = RetryPolicy::with_config(RetryConfig::new().with_max_retries(self.r_mem));
        let result = policy
            .execute(|| async {
                let summary_vec = embedder.embed(&summary_text).await?;
                workflow_memory_store.record(summary_vec, session_id, useful_ids.clone()).await
            })
            .await;

        match result {
            Ok(_) => {
                info!("recorded workflow memory for session {session_id}");
                true
            }
            Err(e) => {
                warn!("workflow memory creation failed for session {session_id}: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::EmbeddingProvider;
    use crate::storage::memory::{InMemoryChunkStore, InMemorySessionLog, InMemoryWorkflowMemoryStore};
    use crate::types::{Chunk, FeedbackStatus, Phase, ReasoningStep, RetrievedEntry, Session};
    use async_trait::async_trait;
    use chrono::Utc;

    struct StubProvider;

    #[async_trait]
    impl EmbeddingProvider for StubProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
        fn dimension(&self) -> usize {
            2
        }
    }

    fn chunk(id: i64) -> Chunk {
        Chunk {
            id: ChunkId(id),
            content: "c".to_string(),
            repo: "r".to_string(),
            path: "p".to_string(),
            section: "s".to_string(),
            embedding: vec![1.0, 0.0],
            accuracy_weight: 1.0,
            times_retrieved: 0,
            times_useful: 0,
        }
    }

    fn session_with_entry(chunk_id: ChunkId) -> Session {
        Session {
            id: SessionId(0),
            query: "how do I install?".to_string(),
            query_embedding: vec![1.0, 0.0],
            answer: "answer".to_string(),
            retrieved: vec![RetrievedEntry {
                chunk_id,
                rank: 1,
                raw_similarity: 0.9,
                effective_score: 0.9,
                workflow_boosted: false,
                was_useful: Usefulness::Unknown,
            }],
            reasoning_steps: vec![ReasoningStep {
                phase: Phase::Embed,
                description: "embedded".to_string(),
                duration_ms: Some(1),
            }],
            feedback_status: FeedbackStatus::Pending,
            correction_text: None,
            created_at: Utc::now(),
        }
    }

    fn processor(
        chunk_store: Arc<InMemoryChunkStore>,
        session_log: Arc<InMemorySessionLog>,
        workflow_store: Arc<InMemoryWorkflowMemoryStore>,
    ) -> FeedbackProcessor {
        FeedbackProcessor::new(
            chunk_store,
            session_log,
            workflow_store,
            Arc::new(Embedder::new(Arc::new(StubProvider))),
            0.1,
            0.5,
            2.0,
            2,
            true,
        )
    }

    #[tokio::test]
    async fn useful_feedback_increases_weight_and_creates_memory() {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        chunk_store.insert(chunk(1));
        let session_log = Arc::new(InMemorySessionLog::new());
        let workflow_store = Arc::new(InMemoryWorkflowMemoryStore::new());
        let session_id = session_log.create(session_with_entry(ChunkId(1))).await.expect("creates");

        let fp = processor(chunk_store.clone(), session_log.clone(), workflow_store.clone());
        let outcome = fp
            .apply(session_id, true, &[ChunkFeedback { chunk_id: ChunkId(1), was_useful: true }], None)
            .await
            .expect("applies");

        assert_eq!(outcome.chunks_updated, 1);
        assert!(outcome.workflow_memory_created);

        let updated_chunk = chunk_store.get(ChunkId(1)).await.expect("exists");
        assert!((updated_chunk.accuracy_weight - 1.1).abs() < 1e-9);
        assert_eq!(workflow_store.count().await.expect("counts"), 1);
    }

    #[tokio::test]
    async fn correct_with_no_useful_chunks_does_not_create_memory() {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        chunk_store.insert(chunk(1));
        let session_log = Arc::new(InMemorySessionLog::new());
        let workflow_store = Arc::new(InMemoryWorkflowMemoryStore::new());
        let session_id = session_log.create(session_with_entry(ChunkId(1))).await.expect("creates");

        let fp = processor(chunk_store, session_log, workflow_store.clone());
        let outcome = fp
            .apply(session_id, true, &[ChunkFeedback { chunk_id: ChunkId(1), was_useful: false }], None)
            .await
            .expect("applies");

        assert!(!outcome.workflow_memory_created);
        assert_eq!(workflow_store.count().await.expect("counts"), 0);
    }

    #[tokio::test]
    async fn second_feedback_call_is_rejected() {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        chunk_store.insert(chunk(1));
        let session_log = Arc::new(InMemorySessionLog::new());
        let workflow_store = Arc::new(InMemoryWorkflowMemoryStore::new());
        let session_id = session_log.create(session_with_entry(ChunkId(1))).await.expect("creates");

        let fp = processor(chunk_store, session_log, workflow_store);
        fp.apply(session_id, true, &[ChunkFeedback { chunk_id: ChunkId(1), was_useful: true }], None)
            .await
            .expect("first call applies");

        let result = fp
            .apply(session_id, false, &[ChunkFeedback { chunk_id: ChunkId(1), was_useful: false }], None)
            .await;
        assert!(matches!(result, Err(Error::AlreadyFinalised(_))));
    }

    #[tokio::test]
    async fn weight_stays_clamped_at_w_max() {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        let mut c = chunk(1);
        c.accuracy_weight = 2.0;
        chunk_store.insert(c);
        let session_log = Arc::new(InMemorySessionLog::new());
        let workflow_store = Arc::new(InMemoryWorkflowMemoryStore::new());
        let session_id = session_log.create(session_with_entry(ChunkId(1))).await.expect("creates");

        let fp = processor(chunk_store.clone(), session_log, workflow_store);
        fp.apply(session_id, true, &[ChunkFeedback { chunk_id: ChunkId(1), was_useful: true }], None)
            .await
            .expect("applies");

        let updated = chunk_store.get(ChunkId(1)).await.expect("exists");
        assert_eq!(updated.accuracy_weight, 2.0);
    }
}
