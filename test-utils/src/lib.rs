//! # Test Utilities
//!
//! Shared fixtures for exercising the askdocs engine: deterministic chunk
//! builders, session builders, and a pair of stub providers that embed
//! and complete without any network I/O.

use askdocs_core::embedder::EmbeddingProvider;
use askdocs_core::error::Result;
use askdocs_core::generator::LlmProvider;
use askdocs_core::types::{
    Chunk, ChunkId, FeedbackStatus, Phase, ReasoningStep, RetrievedEntry, Session, SessionId,
    Usefulness,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;

/// Build a chunk with the given id and embedding, all other fields
/// defaulted to plausible test values.
#[must_use]
pub fn test_chunk(id: i64, embedding: Vec<f32>) -> Chunk {
    Chunk {
        id: ChunkId(id),
        content: format!("This is test content for chunk {id}."),
        repo: "acme/widgets".to_string(),
        path: "docs/guide.md".to_string(),
        section: "overview".to_string(),
        embedding,
        accuracy_weight: Chunk::INITIAL_WEIGHT,
        times_retrieved: 0,
        times_useful: 0,
    }
}

/// Build a chunk with an explicit accuracy weight, for tests exercising
/// weight clamping or ranking.
#[must_use]
pub fn test_chunk_with_weight(id: i64, embedding: Vec<f32>, accuracy_weight: f64) -> Chunk {
    Chunk { accuracy_weight, ..test_chunk(id, embedding) }
}

/// Build a pending session with one retrieved entry, for feedback tests.
#[must_use]
pub fn test_session(query: &str, chunk_id: ChunkId, raw_similarity: f64) -> Session {
    Session {
        id: SessionId(0),
        query: query.to_string(),
        query_embedding: vec![1.0, 0.0],
        answer: "a test answer".to_string(),
        retrieved: vec![RetrievedEntry {
            chunk_id,
            rank: 1,
            raw_similarity,
            effective_score: raw_similarity,
            workflow_boosted: false,
            was_useful: Usefulness::Unknown,
        }],
        reasoning_steps: vec![ReasoningStep {
            phase: Phase::Embed,
            description: "embedded query".to_string(),
            duration_ms: Some(1),
        }],
        feedback_status: FeedbackStatus::Pending,
        correction_text: None,
        created_at: Utc::now(),
    }
}

/// Deterministic embedding provider: returns a fixed vector per input
/// text (looked up by exact string match), or a zero vector of
/// `dimension` for unrecognised text. Never performs I/O.
pub struct StubEmbeddingProvider {
    dimension: usize,
    fixtures: Mutex<HashMap<String, Vec<f32>>>,
}

impl StubEmbeddingProvider {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension, fixtures: Mutex::new(HashMap::new()) }
    }

    /// Register a fixed embedding for exact text `key`.
    pub fn with_fixture(self, key: impl Into<String>, embedding: Vec<f32>) -> Self {
        self.fixtures.lock().expect("lock poisoned").insert(key.into(), embedding);
        self
    }
}

#[async_trait]
impl EmbeddingProvider for StubEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let fixtures = self.fixtures.lock().expect("lock poisoned");
        Ok(fixtures.get(text).cloned().unwrap_or_else(|| vec![0.0; self.dimension]))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic LLM provider: echoes a fixed completion string,
/// regardless of prompt. Never performs I/O.
pub struct StubLlmProvider {
    completion: String,
}

impl StubLlmProvider {
    #[must_use]
    pub fn new(completion: impl Into<String>) -> Self {
        Self { completion: completion.into() }
    }
}

#[async_trait]
impl LlmProvider for StubLlmProvider {
    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.completion.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_has_initial_weight() {
        let chunk = test_chunk(1, vec![1.0, 0.0]);
        assert_eq!(chunk.accuracy_weight, Chunk::INITIAL_WEIGHT);
    }

    #[tokio::test]
    async fn stub_embedding_provider_returns_fixture() {
        let provider = StubEmbeddingProvider::new(2).with_fixture("hello", vec![1.0, 0.0]);
        let embedding = provider.embed("hello").await.expect("embeds");
        assert_eq!(embedding, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn stub_embedding_provider_falls_back_to_zero_vector() {
        let provider = StubEmbeddingProvider::new(3);
        let embedding = provider.embed("unregistered").await.expect("embeds");
        assert_eq!(embedding, vec![0.0, 0.0, 0.0]);
    }

    #[tokio::test]
    async fn stub_llm_provider_echoes_fixed_completion() {
        let provider = StubLlmProvider::new("the answer");
        let completion = provider.complete("anything").await.expect("completes");
        assert_eq!(completion, "the answer");
    }
}
