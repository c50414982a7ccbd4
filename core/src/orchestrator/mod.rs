//! Ask Orchestrator: composes the Embedder, Workflow Memory, Retriever,
//! Generator, and Session Log into one request: embed → retrieve-with-
//! workflow-boost → generate → persist.

use crate::embedder::Embedder;
use crate::error::{Error, Result};
use crate::generator::Generator;
use crate::retrieval::Retriever;
use crate::storage::{ChunkStore, SessionLog, WorkflowMemoryStore};
use crate::tracer::WorkflowTracer;
use crate::types::{Chunk, FeedbackStatus, Phase, Session, SessionId, WorkflowMemory};
use chrono::Utc;
use std::sync::Arc;
use tracing::instrument;

/// Response to one `ASK` call.
#[derive(Debug, Clone, PartialEq)]
pub struct AskResponse {
    pub answer: String,
    pub session_id: SessionId,
    pub sources: Vec<String>,
}

/// Composes the pipeline components into one request.
pub struct AskOrchestrator {
    embedder: Arc<Embedder>,
    chunk_store: Arc<dyn ChunkStore>,
    workflow_memory_store: Arc<dyn WorkflowMemoryStore>,
    retriever: Arc<Retriever>,
    generator: Arc<Generator>,
    session_log: Arc<dyn SessionLog>,
    q_max: usize,
    k_max: usize,
    top_m: usize,
    min_memory_sim: f64,
    workflow_enabled: bool,
}

impl AskOrchestrator {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        embedder: Arc<Embedder>,
        chunk_store: Arc<dyn ChunkStore>,
        workflow_memory_store: Arc<dyn WorkflowMemoryStore>,
        retriever: Arc<Retriever>,
        generator: Arc<Generator>,
        session_log: Arc<dyn SessionLog>,
        q_max: usize,
        k_max: usize,
        top_m: usize,
        min_memory_sim: f64,
        workflow_enabled: bool,
    ) -> Self {
        Self {
            embedder,
            chunk_store,
            workflow_memory_store,
            retriever,
            generator,
            session_log,
            q_max,
            k_max,
            top_m,
            min_memory_sim,
            workflow_enabled,
        }
    }

    /// Run the full pipeline for one query.
    ///
    /// If any step before persist fails, no Session is written. Once the
    /// query embedding is available, the workflow-memory lookup and the
    /// chunk candidate fetch run concurrently; the Generator call observes
    /// both.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty or over-long query or an
    /// out-of-range `k`; otherwise propagates the failing component's
    /// error (`Error::Provider`, `Error::Store`, `Error::Timeout`).
    #[instrument(skip(self, query), fields(query_len = query.len()))]
    pub async fn ask(&self, query: &str, k: usize) -> Result<AskResponse> {
        self.validate_query(query, k)?;

        let mut tracer = WorkflowTracer::new();

        tracer.mark_phase_start(Phase::Embed);
        let query_vec = self.embedder.embed(query).await?;
        tracer.add_step(Phase::Embed, "embedded query");
        tracer.mark_phase_end(Phase::Embed);

        tracer.mark_phase_start(Phase::WorkflowLookup);
        tracer.mark_phase_start(Phase::Retrieve);
        let (workflow_hits, candidates) = if self.workflow_enabled {
            let (hits, candidates) = tokio::join!(
                self.workflow_memory_store.find_similar(&query_vec, self.top_m, self.min_memory_sim),
                self.retriever.fetch_scored_candidates(&query_vec, k)
            );
            (hits?, candidates?)
        } else {
            let candidates = self.retriever.fetch_scored_candidates(&query_vec, k).await?;
            (Vec::<(WorkflowMemory, f64)>::new(), candidates)
        };
        tracer.add_step(Phase::WorkflowLookup, format!("found {} workflow hits", workflow_hits.len()));
        tracer.mark_phase_end(Phase::WorkflowLookup);

        let results = self.retriever.apply_workflow_boost(candidates, k, &workflow_hits);
        tracer.add_step(Phase::Retrieve, format!("retrieved {} chunks", results.len()));
        tracer.mark_phase_end(Phase::Retrieve);

        for result in &results {
            tracer.add_retrieved(crate::types::RetrievedEntry::from(*result));
        }

        let mut chunks: Vec<Chunk> = Vec::with_capacity(results.len());
        for result in &results {
            chunks.push(self.chunk_store.get(result.chunk_id).await?);
        }

        let answer = self.generator.generate(query, &chunks, &mut tracer).await?;

        tracer.mark_phase_start(Phase::Persist);
        let session = Session {
            id: SessionId(0),
            query: query.to_string(),
            query_embedding: query_vec,
            answer: answer.clone(),
            retrieved: results.iter().map(|r| crate::types::RetrievedEntry::from(*r)).collect(),
            reasoning_steps: tracer.snapshot().steps,
            feedback_status: FeedbackStatus::Pending,
            correction_text: None,
            created_at: Utc::now(),
        };
        let session_id = self.session_log.create(session).await?;
        tracer.mark_phase_end(Phase::Persist);

        let sources: Vec<String> = chunks.iter().map(Chunk::provenance_slug).collect();

        Ok(AskResponse { answer, session_id, sources })
    }

    fn validate_query(&self, query: &str, k: usize) -> Result<()> {
        if query.is_empty() {
            return Err(Error::InvalidInput("query must not be empty".to_string()));
        }
        if query.chars().count() > self.q_max {
            return Err(Error::InvalidInput(format!(
                "query exceeds Q_max of {} characters",
                self.q_max
            )));
        }
        if k == 0 || k > self.k_max {
            return Err(Error::InvalidInput(format!("k must be between 1 and {}", self.k_max)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::EmbeddingProvider;
    use crate::generator::LlmProvider;
    use crate::storage::memory::{InMemoryChunkStore, InMemorySessionLog, InMemoryWorkflowMemoryStore};
    use crate::types::{Chunk, ChunkId};
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
            content: "content".to_string(),
            repo: "acme/widgets".to_string(),
            path: "README.md".to_string(),
            section: "intro".to_string(),
            embedding: vec![1.0, 0.0],
            accuracy_weight: 1.0,
            times_retrieved: 0,
            times_useful: 0,
        }
    }

    fn build_orchestrator(chunk_store: Arc<InMemoryChunkStore>) -> AskOrchestrator {
        let embedder = Arc::new(Embedder::new(Arc::new(StubEmbedder)));
        let workflow_memory_store = Arc::new(InMemoryWorkflowMemoryStore::new());
        let retriever = Arc::new(Retriever::new(chunk_store.clone(), 0.2, 200));
        let generator = Arc::new(Generator::new(Arc::new(StubLlm), 3));
        let session_log = Arc::new(InMemorySessionLog::new());
        AskOrchestrator::new(
            embedder,
            chunk_store,
            workflow_memory_store,
            retriever,
            generator,
            session_log,
            4000,
            50,
            3,
            0.75,
            true,
        )
    }

    #[tokio::test]
    async fn ask_rejects_empty_query() {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        let orchestrator = build_orchestrator(chunk_store);
        let result = orchestrator.ask("", 5).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn ask_rejects_k_above_k_max() {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        let orchestrator = build_orchestrator(chunk_store);
        let result = orchestrator.ask("question?", 51).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn ask_produces_answer_and_sources_and_persists_session() {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        chunk_store.insert(chunk(1));
        let orchestrator = build_orchestrator(chunk_store);

        let response = orchestrator.ask("how do I install?", 5).await.expect("ask succeeds");
        assert_eq!(response.answer, "the answer");
        assert_eq!(response.sources.len(), 1);
        assert!(response.session_id.0 > 0);
    }

    #[tokio::test]
    async fn ask_works_with_workflow_disabled() {
        let chunk_store = Arc::new(InMemoryChunkStore::new());
        chunk_store.insert(chunk(1));
        let embedder = Arc::new(Embedder::new(Arc::new(StubEmbedder)));
        let workflow_memory_store = Arc::new(InMemoryWorkflowMemoryStore::new());
        let retriever = Arc::new(Retriever::new(chunk_store.clone(), 0.2, 200));
        let generator = Arc::new(Generator::new(Arc::new(StubLlm), 3));
        let session_log = Arc::new(InMemorySessionLog::new());
        let orchestrator = AskOrchestrator::new(
            embedder,
            chunk_store,
            workflow_memory_store,
            retriever,
            generator,
            session_log,
            4000,
            50,
            3,
            0.75,
            false,
        );

        let response = orchestrator.ask("how do I install?", 5).await.expect("ask succeeds");
        assert_eq!(response.answer, "the answer");
    }
}
