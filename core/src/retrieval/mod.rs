//! Retriever: given a query embedding, returns the top-K chunks ranked by
//! a composite score combining cosine similarity, per-chunk accuracy
//! weight, and optional workflow boost.

pub mod scoring;

use crate::error::{Error, Result};
use crate::storage::ChunkStore;
use crate::types::{ChunkId, RetrievedEntry, Usefulness, WorkflowMemory};
use scoring::{boost_factor, boost_set, effective_score, fanout, sort_candidates, ScoredCandidate};
use std::sync::Arc;
use tracing::instrument;

/// One ranked result from [`Retriever::retrieve`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalResult {
    pub chunk_id: ChunkId,
    pub raw_similarity: f64,
    pub effective_score: f64,
    pub rank: usize,
    pub workflow_boosted: bool,
}

impl From<RetrievalResult> for RetrievedEntry {
    fn from(r: RetrievalResult) -> Self {
        RetrievedEntry {
            chunk_id: r.chunk_id,
            rank: r.rank,
            raw_similarity: r.raw_similarity,
            effective_score: r.effective_score,
            workflow_boosted: r.workflow_boosted,
            was_useful: Usefulness::Unknown,
        }
    }
}

/// Given a query embedding, returns the top-K chunks by composite score.
pub struct Retriever {
    chunk_store: Arc<dyn ChunkStore>,
    beta: f64,
    max_fanout: usize,
}

impl Retriever {
    #[must_use]
    pub fn new(chunk_store: Arc<dyn ChunkStore>, beta: f64, max_fanout: usize) -> Self {
        Self { chunk_store, beta, max_fanout }
    }

    /// Fetch `N = max(3K, K+10)` candidates (capped at `max_fanout`) and
    /// score each by `raw_similarity × accuracy_weight`, unboosted. Split
    /// out from [`Self::retrieve`] so callers (the Ask Orchestrator) can run
    /// this concurrently with the workflow-memory lookup via
    /// `tokio::join!`, joining the two only at [`Self::apply_workflow_boost`].
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty query vector or `k == 0`,
    /// `Error::Store` on chunk store failure.
    pub async fn fetch_scored_candidates(&self, query_vec: &[f32], k: usize) -> Result<Vec<ScoredCandidate>> {
        if query_vec.is_empty() {
            return Err(Error::InvalidInput("query vector must not be empty".to_string()));
        }
        if k == 0 {
            return Err(Error::InvalidInput("k must be positive".to_string()));
        }

        let n = fanout(k, self.max_fanout);
        let candidates = self.chunk_store.fetch_candidates(query_vec, n).await?;

        Ok(candidates
            .into_iter()
            .map(|(chunk, raw_similarity)| ScoredCandidate {
                chunk_id: chunk.id,
                raw_similarity,
                effective_score: effective_score(raw_similarity, chunk.accuracy_weight),
                workflow_boosted: false,
            })
            .collect())
    }

    /// Apply the workflow boost to already-scored candidates, sort by the
    /// deterministic three-key order, and return the top `k`.
    #[must_use]
    pub fn apply_workflow_boost(
        &self,
        mut candidates: Vec<ScoredCandidate>,
        k: usize,
        workflow_hits: &[(WorkflowMemory, f64)],
    ) -> Vec<RetrievalResult> {
        let hit_sets: Vec<(Vec<ChunkId>, f64)> = workflow_hits
            .iter()
            .map(|(memory, sim)| (memory.useful_chunk_ids.clone(), *sim))
            .collect();
        let boosts = boost_set(&hit_sets);

        for candidate in &mut candidates {
            if let Some(max_sim) = boosts.get(&candidate.chunk_id) {
                candidate.effective_score *= boost_factor(self.beta, *max_sim);
                candidate.workflow_boosted = true;
            }
        }

        sort_candidates(&mut candidates);
        candidates.truncate(k);

        candidates
            .into_iter()
            .enumerate()
            .map(|(i, c)| RetrievalResult {
                chunk_id: c.chunk_id,
                raw_similarity: c.raw_similarity,
                effective_score: c.effective_score,
                rank: i + 1,
                workflow_boosted: c.workflow_boosted,
            })
            .collect()
    }

    /// Convenience wrapper combining [`Self::fetch_scored_candidates`] and
    /// [`Self::apply_workflow_boost`] for callers that already have
    /// `workflow_hits` in hand (e.g. tests, `WORKFLOW SEARCH` tooling).
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for an empty query vector or `k == 0`,
    /// `Error::Store` on chunk store failure.
    #[instrument(skip(self, query_vec, workflow_hits), fields(k))]
    pub async fn retrieve(
        &self,
        query_vec: &[f32],
        k: usize,
        workflow_hits: &[(WorkflowMemory, f64)],
    ) -> Result<Vec<RetrievalResult>> {
        let candidates = self.fetch_scored_candidates(query_vec, k).await?;
        Ok(self.apply_workflow_boost(candidates, k, workflow_hits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryChunkStore;
    use crate::types::{Chunk, SessionId, WorkflowMemoryId};
    use chrono::Utc;

    fn chunk(id: i64, embedding: Vec<f32>, weight: f64) -> Chunk {
        Chunk {
            id: ChunkId(id),
            content: "c".to_string(),
            repo: "r".to_string(),
            path: "p".to_string(),
            section: "s".to_string(),
            embedding,
            accuracy_weight: weight,
            times_retrieved: 0,
            times_useful: 0,
        }
    }

    #[tokio::test]
    async fn empty_query_vector_is_rejected() {
        let store = Arc::new(InMemoryChunkStore::new());
        let retriever = Retriever::new(store, 0.2, 200);
        let result = retriever.retrieve(&[], 5, &[]).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn fewer_than_k_candidates_returns_all_with_contiguous_ranks() {
        let store = Arc::new(InMemoryChunkStore::new());
        store.insert(chunk(1, vec![1.0, 0.0], 1.0));
        store.insert(chunk(2, vec![0.9, 0.1], 1.0));
        let retriever = Retriever::new(store, 0.2, 200);

        let results = retriever.retrieve(&[1.0, 0.0], 5, &[]).await.expect("retrieves");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[1].rank, 2);
    }

    #[tokio::test]
    async fn results_are_sorted_by_effective_score_descending() {
        let store = Arc::new(InMemoryChunkStore::new());
        store.insert(chunk(1, vec![1.0, 0.0], 0.5)); // similarity 1.0 * weight 0.5 = 0.5
        store.insert(chunk(2, vec![1.0, 0.0], 1.0)); // similarity 1.0 * weight 1.0 = 1.0
        let retriever = Retriever::new(store, 0.2, 200);

        let results = retriever.retrieve(&[1.0, 0.0], 2, &[]).await.expect("retrieves");
        assert_eq!(results[0].chunk_id, ChunkId(2));
        assert_eq!(results[1].chunk_id, ChunkId(1));
    }

    #[tokio::test]
    async fn workflow_hit_boosts_matching_chunk() {
        let store = Arc::new(InMemoryChunkStore::new());
        store.insert(chunk(1, vec![1.0, 0.0], 1.0));
        store.insert(chunk(2, vec![0.99, 0.01], 1.0));
        let retriever = Retriever::new(store, 0.2, 200);

        let memory = WorkflowMemory {
            id: WorkflowMemoryId::new(),
            summary_embedding: vec![1.0, 0.0],
            source_session_id: SessionId(1),
            useful_chunk_ids: vec![ChunkId(2)],
            created_at: Utc::now(),
        };
        let hits = vec![(memory, 0.9)];

        let results = retriever.retrieve(&[1.0, 0.0], 2, &hits).await.expect("retrieves");
        let boosted = results.iter().find(|r| r.chunk_id == ChunkId(2)).expect("present");
        assert!(boosted.workflow_boosted);
    }
}
