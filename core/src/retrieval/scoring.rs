//! Pure scoring functions for the Retriever: multiplicative composition of
//! raw similarity, accuracy weight, and workflow boost, plus deterministic
//! ranking. Kept free of I/O so they're cheap to test in isolation.

use crate::types::ChunkId;
use std::collections::HashMap;

/// `raw_similarity × accuracy_weight`.
#[must_use]
pub fn effective_score(raw_similarity: f64, accuracy_weight: f64) -> f64 {
    raw_similarity * accuracy_weight
}

/// Union of `useful_chunk_ids` across workflow hits, each id mapped to the
/// highest similarity among the memories that named it (`max_memory_similarity`
/// feeding the boost factor below).
#[must_use]
pub fn boost_set(hits: &[(Vec<ChunkId>, f64)]) -> HashMap<ChunkId, f64> {
    let mut boosts: HashMap<ChunkId, f64> = HashMap::new();
    for (useful_ids, similarity) in hits {
        for id in useful_ids {
            boosts
                .entry(*id)
                .and_modify(|best| {
                    if *similarity > *best {
                        *best = *similarity;
                    }
                })
                .or_insert(*similarity);
        }
    }
    boosts
}

/// `1 + β · max_memory_similarity`, applied multiplicatively to a
/// candidate's effective score when its id is in the boost set.
#[must_use]
pub fn boost_factor(beta: f64, max_memory_similarity: f64) -> f64 {
    1.0 + beta * max_memory_similarity
}

/// One scored-and-ranked candidate, before assignment of its final 1-based
/// rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub chunk_id: ChunkId,
    pub raw_similarity: f64,
    pub effective_score: f64,
    pub workflow_boosted: bool,
}

/// Sort candidates by effective score descending, breaking ties by raw
/// similarity descending, then by chunk id ascending — the deterministic
/// three-key order the Retriever's contract requires.
pub fn sort_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        b.effective_score
            .partial_cmp(&a.effective_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.raw_similarity.partial_cmp(&a.raw_similarity).unwrap_or(std::cmp::Ordering::Equal))
            .then_with(|| a.chunk_id.cmp(&b.chunk_id))
    });
}

/// `N = max(3·K, K+10)`, capped at `max_fanout`.
#[must_use]
pub fn fanout(k: usize, max_fanout: usize) -> usize {
    let n = (3 * k).max(k + 10);
    n.min(max_fanout)
}
