//! `AskdocsEngine`: the facade the HTTP layer (or any other caller) drives.
//! Wires the Ask Orchestrator, Feedback Processor, and the three stores
//! into the seven operations enumerated in the external interface
//! contract: ASK, INSPECT SESSION, FEEDBACK (single/bulk), CHUNK EDIT,
//! WORKFLOW SEARCH, STATS.

use crate::error::{Error, Result};
use crate::feedback::{ChunkFeedback, FeedbackOutcome, FeedbackProcessor};
use crate::orchestrator::{AskOrchestrator, AskResponse};
use crate::storage::{ChunkStore, SessionLog, WorkflowMemoryStore};
use crate::telemetry::Telemetry;
use crate::tracer::TraceSnapshot;
use crate::types::{Chunk, ChunkId, Session, SessionId, Usefulness, WorkflowMemory};
use std::sync::Arc;
use tracing::instrument;

/// `ASK`'s public shape: the answer, the session it was persisted under,
/// provenance strings, and, if requested, the full reasoning trace.
#[derive(Debug, Clone, PartialEq)]
pub struct AskOutput {
    pub answer: String,
    pub session_id: SessionId,
    pub sources: Vec<String>,
    pub reasoning_chain: Option<TraceSnapshot>,
}

/// One retrieved chunk as surfaced to `INSPECT SESSION`: rank, similarity,
/// the chunk's current weight, and a bounded content preview.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectedEntry {
    pub chunk_id: ChunkId,
    pub rank: usize,
    pub raw_similarity: f64,
    pub effective_score: f64,
    pub accuracy_weight: f64,
    pub content_preview: String,
    pub was_useful: Usefulness,
}

/// `INSPECT SESSION`'s full output.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectedSession {
    pub session: Session,
    pub entries: Vec<InspectedEntry>,
}

/// One item of a `FEEDBACK (bulk)` request.
#[derive(Debug, Clone)]
pub struct FeedbackRequest {
    pub session_id: SessionId,
    pub is_correct: bool,
    pub chunk_feedback: Vec<ChunkFeedback>,
    pub correction: Option<String>,
}

/// Per-item result of a `FEEDBACK (bulk)` call: either the outcome or the
/// error kind, keyed by the request's session id so callers can correlate.
#[derive(Debug, Clone)]
pub struct BulkFeedbackItem {
    pub session_id: SessionId,
    pub result: std::result::Result<FeedbackOutcome, String>,
}

/// Aggregate result of `FEEDBACK (bulk)`.
#[derive(Debug, Clone, Default)]
pub struct BulkFeedbackOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub items: Vec<BulkFeedbackItem>,
}

/// `WORKFLOW SEARCH`'s output: a ranked workflow memory plus its
/// similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSearchHit {
    pub memory: WorkflowMemory,
    pub similarity: f64,
}

/// `STATS`'s output: accuracy rate, pending feedback count, and the
/// top-N chunks by usefulness rate (`times_useful / times_retrieved`).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStats {
    pub total_sessions: u64,
    pub accuracy_rate: Option<f64>,
    pub pending_feedback_count: u64,
    pub top_chunks_by_usefulness: Vec<(ChunkId, f64)>,
    /// Lifetime count of `ASK` calls served, from the in-process telemetry
    /// counters (reset on restart, not persisted).
    pub asks_served: u64,
    /// Lifetime count of feedback events successfully applied.
    pub feedback_applied: u64,
    /// Lifetime count of workflow memories recorded.
    pub workflow_memories_created: u64,
}

/// The engine: composes the orchestrator, feedback processor, and stores
/// behind the seven external operations.
pub struct AskdocsEngine {
    orchestrator: Arc<AskOrchestrator>,
    feedback_processor: Arc<FeedbackProcessor>,
    chunk_store: Arc<dyn ChunkStore>,
    session_log: Arc<dyn SessionLog>,
    workflow_memory_store: Arc<dyn WorkflowMemoryStore>,
    w_min: f64,
    w_max: f64,
    stats_top_n: usize,
    telemetry: Telemetry,
}

impl AskdocsEngine {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        orchestrator: Arc<AskOrchestrator>,
        feedback_processor: Arc<FeedbackProcessor>,
        chunk_store: Arc<dyn ChunkStore>,
        session_log: Arc<dyn SessionLog>,
        workflow_memory_store: Arc<dyn WorkflowMemoryStore>,
        w_min: f64,
        w_max: f64,
        stats_top_n: usize,
    ) -> Self {
        Self {
            orchestrator,
            feedback_processor,
            chunk_store,
            session_log,
            workflow_memory_store,
            w_min,
            w_max,
            stats_top_n,
            telemetry: Telemetry::new(),
        }
    }

    /// `ASK`. No authentication required at this layer.
    ///
    /// # Errors
    ///
    /// Propagates the orchestrator's errors unchanged.
    #[instrument(skip(self, query))]
    pub async fn ask(&self, query: &str, k: usize, include_trace: bool) -> Result<AskOutput> {
        let AskResponse { answer, session_id, sources } = self.orchestrator.ask(query, k).await?;
        self.telemetry.counter("asks_served").increment();
        let reasoning_chain = if include_trace {
            Some(self.session_log.get(session_id).await.map(|s| TraceSnapshot {
                retrieved: s.retrieved,
                steps: s.reasoning_steps,
            })?)
        } else {
            None
        };
        Ok(AskOutput { answer, session_id, sources, reasoning_chain })
    }

    /// `INSPECT SESSION`. Admin-authenticated at the HTTP layer.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if the session doesn't exist.
    #[instrument(skip(self))]
    pub async fn inspect_session(&self, session_id: SessionId) -> Result<InspectedSession> {
        let session = self.session_log.get(session_id).await?;

        let mut entries = Vec::with_capacity(session.retrieved.len());
        for entry in &session.retrieved {
            let chunk = self.chunk_store.get(entry.chunk_id).await?;
            entries.push(InspectedEntry {
                chunk_id: entry.chunk_id,
                rank: entry.rank,
                raw_similarity: entry.raw_similarity,
                effective_score: entry.effective_score,
                accuracy_weight: chunk.accuracy_weight,
                content_preview: chunk.content_preview(200),
                was_useful: entry.was_useful,
            });
        }

        Ok(InspectedSession { session, entries })
    }

    /// `FEEDBACK (single)`. Admin-authenticated at the HTTP layer.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound`/`Error::AlreadyFinalised` per
    /// [`FeedbackProcessor::apply`].
    #[instrument(skip(self, chunk_feedback, correction))]
    pub async fn feedback(
        &self,
        session_id: SessionId,
        is_correct: bool,
        chunk_feedback: &[ChunkFeedback],
        correction: Option<String>,
    ) -> Result<FeedbackOutcome> {
        let outcome = self.feedback_processor.apply(session_id, is_correct, chunk_feedback, correction).await?;
        self.record_feedback_telemetry(&outcome);
        Ok(outcome)
    }

    fn record_feedback_telemetry(&self, outcome: &FeedbackOutcome) {
        self.telemetry.counter("feedback_applied").increment();
        if outcome.workflow_memory_created {
            self.telemetry.counter("workflow_memories_created").increment();
        }
    }

    /// `FEEDBACK (bulk)`. Each item is applied independently; one item's
    /// failure does not prevent the rest from applying.
    pub async fn feedback_bulk(&self, requests: Vec<FeedbackRequest>) -> BulkFeedbackOutcome {
        let mut outcome = BulkFeedbackOutcome::default();
        for request in requests {
            let result = self
                .feedback_processor
                .apply(request.session_id, request.is_correct, &request.chunk_feedback, request.correction)
                .await;
            match result {
                Ok(applied) => {
                    self.record_feedback_telemetry(&applied);
                    outcome.succeeded += 1;
                    outcome.items.push(BulkFeedbackItem { session_id: request.session_id, result: Ok(applied) });
                }
                Err(e) => {
                    outcome.failed += 1;
                    outcome.items.push(BulkFeedbackItem {
                        session_id: request.session_id,
                        result: Err(e.to_string()),
                    });
                }
            }
        }
        outcome
    }

    /// `CHUNK EDIT`. Admin-authenticated at the HTTP layer; atomically
    /// sets `new_weight`, clamped to `[W_min, W_max]`. `reason` is logged
    /// by the caller, not interpreted here.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if `new_weight` is outside
    /// `[W_min, W_max]`, `Error::NotFound` if the chunk doesn't exist.
    #[instrument(skip(self, reason))]
    pub async fn chunk_edit(&self, chunk_id: ChunkId, new_weight: f64, reason: &str) -> Result<f64> {
        if new_weight < self.w_min || new_weight > self.w_max {
            return Err(Error::InvalidInput(format!(
                "new_weight {new_weight} outside [{}, {}]",
                self.w_min, self.w_max
            )));
        }
        tracing::info!(%chunk_id, new_weight, reason, "chunk weight edited");
        self.chunk_store.set_weight(chunk_id, new_weight, self.w_min, self.w_max).await
    }

    /// `WORKFLOW SEARCH`. Admin-authenticated at the HTTP layer.
    /// `successful_only` is always true in this engine, since
    /// `WorkflowMemoryStore::record` only ever stores memories sourced
    /// from sessions with `feedback_status == Correct` (invariant P4).
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on persistence failure.
    #[instrument(skip(self, query_embedding))]
    pub async fn workflow_search(
        &self,
        query_embedding: &[f32],
        min_similarity: f64,
        top_k: usize,
    ) -> Result<Vec<WorkflowSearchHit>> {
        let hits = self.workflow_memory_store.find_similar(query_embedding, top_k, min_similarity).await?;
        Ok(hits.into_iter().map(|(memory, similarity)| WorkflowSearchHit { memory, similarity }).collect())
    }

    /// `STATS`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` on persistence failure.
    #[instrument(skip(self))]
    pub async fn stats(&self) -> Result<EngineStats> {
        let session_stats = self.session_log.stats().await?;
        let chunks = self.chunk_store.all().await?;

        let mut by_usefulness: Vec<(ChunkId, f64)> = chunks
            .iter()
            .filter(|c| c.times_retrieved > 0)
            .map(|c| (c.id, c.times_useful as f64 / c.times_retrieved as f64))
            .collect();
        by_usefulness.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        by_usefulness.truncate(self.stats_top_n);

        let telemetry_summary = self.telemetry.get_summary().await;
        let counter = |name: &str| telemetry_summary.counters.get(name).copied().unwrap_or(0);

        Ok(EngineStats {
            total_sessions: session_stats.total,
            accuracy_rate: session_stats.accuracy_rate(),
            pending_feedback_count: session_stats.pending,
            top_chunks_by_usefulness: by_usefulness,
            asks_served: counter("asks_served"),
            feedback_applied: counter("feedback_applied"),
            workflow_memories_created: counter("workflow_memories_created"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::{Embedder, EmbeddingProvider};
    use crate::generator::{Generator, LlmProvider};
    use crate::retrieval::Retriever;
    use crate::storage::memory::{InMemoryChunkStore, InMemorySessionLog, InMemoryWorkflowMemoryStore};
    use async_trait::async_trait;

    struct StubEmbedder;

    #[async_trait]
    impl EmbeddingProvider for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
        fn dimension(&self) -> usize {
            2
        }
    }

    struct StubLlm;

    #[async_trait]
    impl LlmProvider for StubLlm {
        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok("the answer".to_string())
        }
    }

    fn chunk(id: i64) -> Chunk {
        Chunk {
            id: ChunkId(id),
            content: "a".repeat(300),
            repo: "acme/widgets".to_string(),
            path: "README.md".to_string(),
            section: "intro".to_string(),
            embedding: vec![1.0, 0.0],
            accuracy_weight: 1.0,
            times_retrieved: 0,
            times_useful: 0,
        }
    }

    fn build_engine(chunk_store: Arc<InMemoryChunkStore>) -> AskdocsEngine {
        let embedder = Arc::new(Embedder::new(Arc::new(StubEmbedder)));
        let workflow_memory_store = Arc::new(InMemoryWorkflowMemoryStore::new());
        let retriever = Arc::new(Retriever::new(chunk_store.clone(), 0.2, 200));
        let generator = Arc::new(Generator::new(Arc::new(StubLlm), 3));
        let session_log = Arc::new(InMemorySessionLog::new());
        let orchestrator = Arc::new(AskOrchestrator::new(
            embedder.clone(),
            chunk_store.clone(),
            workflow_memory_store.clone(),
            retriever,
            generator,
            session_log.clone(),
            4000,
            50,
            3,
            0.75,
            true,
        ));
        let feedback_processor = Arc::new(FeedbackProcessor::new(
            chunk_store.clone(),
            session_log.clone(),
            workflow_memory_store.clone(),
            embedder,
            0.1,
            0.5,
            2.0,
            2,
            true,
        ));
        AskdocsEngine::new(
            orchestrator,
            feedback_processor,
            chunk_store,
            session_log,
            workflow_memory_store,
            0.5,
            2.0,
            10,
        )
    }

    #[tokio::test]
    async fn ask_then_inspect_round_trips_preview() {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        chunk_store.insert(chunk(1));
        let engine = build_engine(chunk_store);

        let ask_output = engine.ask("how do I install?", 5, true).await.expect("asks");
        assert!(ask_output.reasoning_chain.is_some());

        let inspected = engine.inspect_session(ask_output.session_id).await.expect("inspects");
        assert_eq!(inspected.entries.len(), 1);
        assert!(inspected.entries[0].content_preview.chars().count() <= 200);
    }

    #[tokio::test]
    async fn chunk_edit_rejects_out_of_range_weight() {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        chunk_store.insert(chunk(1));
        let engine = build_engine(chunk_store);

        let result = engine.chunk_edit(ChunkId(1), 3.0, "test").await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn chunk_edit_sets_exact_weight() {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        chunk_store.insert(chunk(1));
        let engine = build_engine(chunk_store);

        let new_weight = engine.chunk_edit(ChunkId(1), 1.5, "manual correction").await.expect("edits");
        assert_eq!(new_weight, 1.5);
    }

    #[tokio::test]
    async fn feedback_bulk_reports_per_item_status() {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        chunk_store.insert(chunk(1));
        let engine = build_engine(chunk_store);

        let ask_output = engine.ask("how do I install?", 5, false).await.expect("asks");
        let requests = vec![
            FeedbackRequest {
                session_id: ask_output.session_id,
                is_correct: true,
                chunk_feedback: vec![ChunkFeedback { chunk_id: ChunkId(1), was_useful: true }],
                correction: None,
            },
            FeedbackRequest {
                session_id: SessionId(999),
                is_correct: true,
                chunk_feedback: vec![],
                correction: None,
            },
        ];

        let outcome = engine.feedback_bulk(requests).await;
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed, 1);
    }

    #[tokio::test]
    async fn stats_reflects_pending_sessions() {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        chunk_store.insert(chunk(1));
        let engine = build_engine(chunk_store);

        engine.ask("how do I install?", 5, false).await.expect("asks");
        let stats = engine.stats().await.expect("stats");
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.pending_feedback_count, 1);
        assert_eq!(stats.accuracy_rate, None);
    }
}
