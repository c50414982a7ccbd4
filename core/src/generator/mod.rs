//! Generator: assembles a prompt from retrieved chunks and calls the LLM
//! provider, retrying transient failures with backoff.

mod prompt;

pub use prompt::build_prompt;

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, OpenErrorKind};
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, RetryPolicy};
use crate::tracer::WorkflowTracer;
use crate::types::{Chunk, Phase};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::instrument;

/// An external LLM text-generation service, accessed as an abstract
/// oracle. Implementations hold whatever client/connection state they
/// need; this crate never constructs a prompt for, or parses a response
/// from, any concrete vendor API directly.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate an answer for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Provider` on upstream failure.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Thin adapter over an [`LlmProvider`], retried up to `R_gen` times with
/// exponential backoff behind a circuit breaker.
pub struct Generator {
    provider: Arc<dyn LlmProvider>,
    breaker: CircuitBreaker,
    retry_config: RetryConfig,
}

impl Generator {
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, max_retries: u32) -> Self {
        Self {
            provider,
            breaker: CircuitBreaker::new(
                "generator",
                OpenErrorKind::Provider,
                CircuitBreakerConfig::default(),
            ),
            retry_config: RetryConfig::new().with_max_retries(max_retries),
        }
    }

    /// Build a prompt from `query` and `chunks`, call the LLM provider
    /// (retried up to `R_gen` times on transient failure), and record a
    /// `Generate` reasoning step on `tracer`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Provider` if every attempt fails.
    #[instrument(skip(self, chunks, tracer), fields(num_chunks = chunks.len()))]
    pub async fn generate(
        &self,
        query: &str,
        chunks: &[Chunk],
        tracer: &mut WorkflowTracer,
    ) -> Result<String> {
        tracer.mark_phase_start(Phase::Generate);
        let prompt = build_prompt(query, chunks);

        let provider = self.provider.clone();
        let breaker = &self.breaker;
        let mut policy = RetryPolicy::with_config(self.retry_config.clone());

        let result = policy
            .execute(|| async {
                let provider = provider.clone();
                let prompt = prompt.clone();
                breaker.call(|| async move { provider.complete(&prompt).await }).await
            })
            .await;

        match &result {
            Ok(_) => tracer.add_step(Phase::Generate, "generated answer from retrieved chunks"),
            Err(e) => tracer.add_step(Phase::Generate, format!("generation failed: {e}")),
        }
        tracer.mark_phase_end(Phase::Generate);

        result
    }
}
