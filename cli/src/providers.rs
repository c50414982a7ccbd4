//! Offline demo providers.
//!
//! The embedding model and the LLM text-generation service are external
//! collaborators the engine is built against, not something this crate
//! ships. These providers exist so `askdocs` is runnable out of the box
//! for local exploration against a seeded database, without requiring a
//! network call to a real provider. Point the engine at real providers
//! by implementing `EmbeddingProvider`/`LlmProvider` against whatever
//! service you use and wiring it in where `build_providers` is called.

use askdocs_core::embedder::EmbeddingProvider;
use askdocs_core::error::Result;
use askdocs_core::generator::LlmProvider;
use async_trait::async_trait;

/// Deterministic bag-of-words hashing embedder: splits on whitespace,
/// hashes each token into one of `dimension` buckets, and L2-normalises
/// the resulting count vector. Two queries that share vocabulary land
/// close together; this is good enough to exercise ranking end to end,
/// not a substitute for a trained embedding model.
pub struct HashingEmbeddingProvider {
    dimension: usize,
}

impl HashingEmbeddingProvider {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn bucket(&self, token: &str) -> usize {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        token.hash(&mut hasher);
        (hasher.finish() as usize) % self.dimension
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0_f32; self.dimension];
        for token in text.split_whitespace().map(str::to_lowercase) {
            vector[self.bucket(&token)] += 1.0;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Extractive answer generator: returns the content of the
/// highest-ranked context chunk found in the prompt, with a one-line
/// disclaimer. Stands in for a real LLM so `ask` is runnable offline.
pub struct ExtractiveLlmProvider;

#[async_trait]
impl LlmProvider for ExtractiveLlmProvider {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let first_chunk = prompt
            .lines()
            .skip_while(|line| !line.starts_with("[1]"))
            .nth(1)
            .unwrap_or("(no context chunks were retrieved for this query)");

        Ok(format!(
            "{first_chunk}\n\n(offline demo provider: extractive answer from the top chunk, not a generated one)"
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hashing_embedder_is_deterministic() {
        let provider = HashingEmbeddingProvider::new(16);
        let a = provider.embed("how do I deploy the service").await.unwrap();
        let b = provider.embed("how do I deploy the service").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn hashing_embedder_produces_unit_vectors() {
        let provider = HashingEmbeddingProvider::new(16);
        let v = provider.embed("deploy the service").await.unwrap();
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn extractive_llm_pulls_top_chunk_content() {
        let prompt = "System preamble\n\n[1] (acme/widgets/docs#overview) Overview\ninstall with cargo\n\nQuestion: how?\n";
        let answer = ExtractiveLlmProvider.complete(prompt).await.unwrap();
        assert!(answer.contains("install with cargo"));
    }

    #[tokio::test]
    async fn extractive_llm_handles_missing_context() {
        let answer = ExtractiveLlmProvider.complete("Question: anything?\n").await.unwrap();
        assert!(answer.contains("no context chunks"));
    }
}
