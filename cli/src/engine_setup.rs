//! Wires an `AskdocsEngine` from `EngineConfig` plus a chosen storage
//! backend and the offline demo providers.

use crate::providers::{ExtractiveLlmProvider, HashingEmbeddingProvider};
use anyhow::{Context, Result};
use askdocs_core::constants::defaults::MAX_FANOUT;
use askdocs_core::embedder::Embedder;
use askdocs_core::engine::AskdocsEngine;
use askdocs_core::feedback::FeedbackProcessor;
use askdocs_core::generator::Generator;
use askdocs_core::orchestrator::AskOrchestrator;
use askdocs_core::retrieval::Retriever;
use askdocs_core::storage::memory::{InMemoryChunkStore, InMemorySessionLog, InMemoryWorkflowMemoryStore};
use askdocs_core::storage::{ChunkStore, SessionLog, WorkflowMemoryStore};
use askdocs_core::EngineConfig;
use std::sync::Arc;

/// Where the three stores live. `InMemory` is lost on exit; `Sql` persists
/// to a libSQL/Turso database reachable from `database_url`.
pub enum StoreBackend {
    InMemory,
    #[cfg(feature = "sql")]
    Sql { database_url: String, auth_token: String },
}

/// Build the full engine: stores, embedder, generator, orchestrator,
/// feedback processor, wired behind the offline demo providers.
///
/// # Errors
///
/// Returns an error if the requested store backend fails to connect or
/// initialise its schema.
pub async fn build_engine(config: &EngineConfig, backend: StoreBackend) -> Result<AskdocsEngine> {
    let (chunk_store, session_log, workflow_memory_store): (
        Arc<dyn ChunkStore>,
        Arc<dyn SessionLog>,
        Arc<dyn WorkflowMemoryStore>,
    ) = match backend {
        StoreBackend::InMemory => (
            Arc::new(InMemoryChunkStore::new()),
            Arc::new(InMemorySessionLog::new()),
            Arc::new(InMemoryWorkflowMemoryStore::new()),
        ),
        #[cfg(feature = "sql")]
        StoreBackend::Sql { database_url, auth_token } => {
            let store = Arc::new(
                askdocs_storage_sql::SqlStore::new(&database_url, &auth_token)
                    .await
                    .context("failed to connect to the SQL store")?,
            );
            store.initialize_schema().await.context("failed to initialise schema")?;
            (store.clone(), store.clone(), store)
        }
    };

    let embedder = Arc::new(Embedder::new(Arc::new(HashingEmbeddingProvider::new(config.embed_dim))));
    let generator = Arc::new(Generator::new(Arc::new(ExtractiveLlmProvider), config.r_gen));
    let retriever = Arc::new(Retriever::new(chunk_store.clone(), config.beta, MAX_FANOUT));

    let orchestrator = Arc::new(AskOrchestrator::new(
        embedder.clone(),
        chunk_store.clone(),
        workflow_memory_store.clone(),
        retriever,
        generator,
        session_log.clone(),
        config.q_max,
        config.k_max,
        config.top_m,
        config.min_memory_sim,
        config.workflow_enabled,
    ));

    let feedback_processor = Arc::new(FeedbackProcessor::new(
        chunk_store.clone(),
        session_log.clone(),
        workflow_memory_store.clone(),
        embedder,
        config.delta,
        config.w_min,
        config.w_max,
        config.r_mem,
        config.workflow_enabled,
    ));

    Ok(AskdocsEngine::new(
        orchestrator,
        feedback_processor,
        chunk_store,
        session_log,
        workflow_memory_store,
        config.w_min,
        config.w_max,
        10,
    ))
}
