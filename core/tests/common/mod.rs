//! Shared fixtures for the workspace-level scenario and property tests:
//! a query-keyed embedder stub, a fixed-answer LLM stub, and an
//! `AskdocsEngine` builder wired the same way `engine.rs`'s own unit
//! tests wire one, just parameterised so each test can pick its own
//! `beta`/`delta`/`w_min`/`w_max`.

use askdocs_core::embedder::{Embedder, EmbeddingProvider};
use askdocs_core::engine::AskdocsEngine;
use askdocs_core::error::{Error, Result};
use askdocs_core::feedback::FeedbackProcessor;
use askdocs_core::generator::{Generator, LlmProvider};
use askdocs_core::orchestrator::AskOrchestrator;
use askdocs_core::retrieval::Retriever;
use askdocs_core::storage::memory::{InMemoryChunkStore, InMemorySessionLog, InMemoryWorkflowMemoryStore};
use askdocs_core::types::{Chunk, ChunkId};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// A unit 2D vector whose cosine similarity with `(1.0, 0.0)` is exactly
/// `cosine` (clamped to `[-1.0, 1.0]`). Lets scenario tests assert on
/// literal raw-similarity values without depending on any particular
/// text-embedding scheme.
#[must_use]
pub fn circle_embedding(cosine: f64) -> Vec<f32> {
    let cosine = cosine.clamp(-1.0, 1.0);
    let sine = (1.0 - cosine * cosine).sqrt();
    vec![cosine as f32, sine as f32]
}

pub const QUERY_AXIS: [f32; 2] = [1.0, 0.0];

#[must_use]
pub fn chunk(id: i64, embedding: Vec<f32>, weight: f64) -> Chunk {
    Chunk {
        id: ChunkId(id),
        content: format!("content for chunk {id}"),
        repo: "acme/widgets".to_string(),
        path: "docs/guide.md".to_string(),
        section: "section".to_string(),
        embedding,
        accuracy_weight: weight,
        times_retrieved: 0,
        times_useful: 0,
    }
}

/// Maps exact query strings to fixed vectors; any other text is an error,
/// so a test can never silently retrieve against an un-intended fixture.
#[derive(Default)]
pub struct FixtureEmbedder {
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    dimension: usize,
}

impl FixtureEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { vectors: Mutex::new(HashMap::new()), dimension }
    }

    pub fn register(&self, text: impl Into<String>, vector: Vec<f32>) {
        self.vectors.lock().insert(text.into(), vector);
    }
}

#[async_trait]
impl EmbeddingProvider for FixtureEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.vectors
            .lock()
            .get(text)
            .cloned()
            .ok_or_else(|| Error::Provider(format!("no fixture embedding registered for '{text}'")))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Always answers with a fixed string; the scenarios below only assert on
/// retrieval/feedback bookkeeping, not generated text.
pub struct StubLlm;

#[async_trait]
impl LlmProvider for StubLlm {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok("the answer".to_string())
    }
}

pub struct EngineConfigOverrides {
    pub beta: f64,
    pub delta: f64,
    pub w_min: f64,
    pub w_max: f64,
    pub top_m: usize,
    pub min_memory_sim: f64,
    pub workflow_enabled: bool,
}

impl Default for EngineConfigOverrides {
    fn default() -> Self {
        Self { beta: 0.2, delta: 0.1, w_min: 0.5, w_max: 2.0, top_m: 3, min_memory_sim: 0.75, workflow_enabled: true }
    }
}

pub struct TestEngine {
    pub engine: AskdocsEngine,
    pub chunk_store: Arc<InMemoryChunkStore>,
    pub embedder: Arc<FixtureEmbedder>,
}

#[must_use]
pub fn build_engine(overrides: EngineConfigOverrides) -> TestEngine {
    let chunk_store = Arc::new(InMemoryChunkStore::new());
    let fixture_embedder = Arc::new(FixtureEmbedder::new(2));
    let embedder = Arc::new(Embedder::new(fixture_embedder.clone()));
    let workflow_memory_store = Arc::new(InMemoryWorkflowMemoryStore::new());
    let retriever = Arc::new(Retriever::new(chunk_store.clone(), overrides.beta, 200));
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
        overrides.top_m,
        overrides.min_memory_sim,
        overrides.workflow_enabled,
    ));
    let feedback_processor = Arc::new(FeedbackProcessor::new(
        chunk_store.clone(),
        session_log.clone(),
        workflow_memory_store.clone(),
        embedder.clone(),
        overrides.delta,
        overrides.w_min,
        overrides.w_max,
        2,
        overrides.workflow_enabled,
    ));

    let engine = AskdocsEngine::new(
        orchestrator,
        feedback_processor,
        chunk_store.clone(),
        session_log,
        workflow_memory_store,
        overrides.w_min,
        overrides.w_max,
        10,
    );

    TestEngine { engine, chunk_store, embedder: fixture_embedder }
}
