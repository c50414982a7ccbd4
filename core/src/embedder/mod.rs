//! Embedder: a thin, circuit-breaker-guarded wrapper over an external
//! text-to-vector provider.

mod math;

pub use math::{cosine_similarity, l2_normalize};

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, OpenErrorKind};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

/// A provider of `text -> vector` embeddings. Implementations are pure
/// wrappers over an external model or service; they hold no persistent
/// state beyond a cached model handle.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single non-empty string into a vector of [`Self::dimension`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Provider` on upstream failure.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of strings. The default implementation calls
    /// [`Self::embed`] in sequence; providers with native batch APIs should
    /// override this for throughput.
    ///
    /// # Errors
    ///
    /// Returns `Error::Provider` on upstream failure.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Fixed output dimension `D`, known at boot.
    fn dimension(&self) -> usize;
}

/// Wraps an [`EmbeddingProvider`] with a circuit breaker so a failing
/// provider fails fast instead of piling up latency on every request.
pub struct Embedder {
    provider: Arc<dyn EmbeddingProvider>,
    breaker: CircuitBreaker,
}

impl Embedder {
    #[must_use]
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::with_breaker_config(provider, CircuitBreakerConfig::default())
    }

    #[must_use]
    pub fn with_breaker_config(
        provider: Arc<dyn EmbeddingProvider>,
        config: CircuitBreakerConfig,
    ) -> Self {
        Self {
            provider,
            breaker: CircuitBreaker::new("embedder", OpenErrorKind::Provider, config),
        }
    }

    /// Embed non-empty `text`, L2-normalising the result.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for empty text, `Error::Provider` on
    /// upstream or circuit-open failure.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.is_empty() {
            return Err(Error::InvalidInput("text to embed must not be empty".to_string()));
        }
        let provider = self.provider.clone();
        let text = text.to_string();
        let vec = self
            .breaker
            .call(|| async move { provider.embed(&text).await })
            .await?;
        Ok(l2_normalize(&vec))
    }

    /// Embed a batch of non-empty texts.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if any text is empty, `Error::Provider`
    /// on upstream or circuit-open failure.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.iter().any(String::is_empty) {
            return Err(Error::InvalidInput("batch texts must not be empty".to_string()));
        }
        let provider = self.provider.clone();
        let texts = texts.to_vec();
        let vecs = self
            .breaker
            .call(|| async move { provider.embed_batch(&texts).await })
            .await?;
        Ok(vecs.iter().map(|v| l2_normalize(v)).collect())
    }

    /// Cosine similarity between two vectors of matching dimension.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the vectors' lengths differ.
    pub fn cosine(a: &[f32], b: &[f32]) -> Result<f64> {
        cosine_similarity(a, b)
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.provider.dimension()
    }
}
