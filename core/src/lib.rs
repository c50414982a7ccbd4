#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::unused_self)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::assigning_clones)]
#![allow(clippy::borrowed_box)]
#![allow(clippy::float_cmp)]
#![allow(clippy::ref_option)]

//! # askdocs-core
//!
//! Core engine for a self-improving retrieval-augmented generation
//! pipeline: vector retrieval over accuracy-weighted chunks, combined with
//! an LLM, where feedback on past answers adjusts future ranking and
//! successful reasoning traces ("workflow memories") boost retrieval for
//! similar future queries.
//!
//! ## Module Organization
//!
//! ### Primary APIs
//! - [`engine`]: `AskdocsEngine`, the facade over all seven external
//!   operations (ASK, INSPECT SESSION, FEEDBACK, CHUNK EDIT, WORKFLOW
//!   SEARCH, STATS)
//! - [`orchestrator`]: `AskOrchestrator`, the embed → retrieve → generate
//!   → persist pipeline for one query
//! - [`feedback`]: `FeedbackProcessor`, mutating chunk weights and
//!   recording workflow memories from feedback events
//!
//! ### Pipeline Components
//! - [`embedder`]: `Embedder`, wrapping an [`embedder::EmbeddingProvider`]
//!   with normalization and circuit breaking
//! - [`retrieval`]: `Retriever`, composite accuracy-weighted and
//!   workflow-boosted ranking
//! - [`generator`]: `Generator`, wrapping an [`generator::LlmProvider`]
//!   with retry and circuit breaking
//! - [`tracer`]: `WorkflowTracer`, per-request reasoning trace capture
//!
//! ### Support Modules
//! - [`types`]: domain types (`Chunk`, `Session`, `WorkflowMemory`, ids)
//! - [`storage`]: `ChunkStore`/`WorkflowMemoryStore`/`SessionLog` traits
//!   plus an in-memory reference implementation
//! - [`config`]: `EngineConfig`, TOML-plus-env-override configuration
//! - [`error`]: the seven-kind `Error` enum shared by every fallible
//!   operation in this crate
//! - [`circuit_breaker`]: generic circuit breaker guarding provider/store
//!   calls
//! - [`retry`]: generic bounded-retry policy with jittered backoff
//! - [`telemetry`], [`tracing`]: structured logging and metrics helpers
//!
//! ## Quick Start
//!
//! ```no_run
//! use askdocs_core::config::EngineConfig;
//! use askdocs_core::embedder::Embedder;
//! use askdocs_core::engine::AskdocsEngine;
//! use askdocs_core::feedback::FeedbackProcessor;
//! use askdocs_core::generator::Generator;
//! use askdocs_core::orchestrator::AskOrchestrator;
//! use askdocs_core::retrieval::Retriever;
//! use askdocs_core::storage::memory::{
//!     InMemoryChunkStore, InMemorySessionLog, InMemoryWorkflowMemoryStore,
//! };
//! # use askdocs_core::embedder::EmbeddingProvider;
//! # use askdocs_core::generator::LlmProvider;
//! # use askdocs_core::error::Result;
//! # use async_trait::async_trait;
//! # struct MyEmbedder;
//! # #[async_trait]
//! # impl EmbeddingProvider for MyEmbedder {
//! #     async fn embed(&self, _text: &str) -> Result<Vec<f32>> { Ok(vec![0.0; 768]) }
//! #     fn dimension(&self) -> usize { 768 }
//! # }
//! # struct MyLlm;
//! # #[async_trait]
//! # impl LlmProvider for MyLlm {
//! #     async fn complete(&self, _prompt: &str) -> Result<String> { Ok(String::new()) }
//! # }
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = EngineConfig::default();
//!     let embedder = Arc::new(Embedder::new(Arc::new(MyEmbedder)));
//!     let chunk_store = Arc::new(InMemoryChunkStore::new());
//!     let workflow_memory_store = Arc::new(InMemoryWorkflowMemoryStore::new());
//!     let session_log = Arc::new(InMemorySessionLog::new());
//!
//!     let retriever = Arc::new(Retriever::new(chunk_store.clone(), config.beta, 200));
//!     let generator = Arc::new(Generator::new(Arc::new(MyLlm), config.r_gen));
//!     let orchestrator = Arc::new(AskOrchestrator::new(
//!         embedder.clone(),
//!         chunk_store.clone(),
//!         workflow_memory_store.clone(),
//!         retriever,
//!         generator,
//!         session_log.clone(),
//!         config.q_max,
//!         config.k_max,
//!         config.top_m,
//!         config.min_memory_sim,
//!         config.workflow_enabled,
//!     ));
//!     let feedback_processor = Arc::new(FeedbackProcessor::new(
//!         chunk_store.clone(),
//!         session_log.clone(),
//!         workflow_memory_store.clone(),
//!         embedder,
//!         config.delta,
//!         config.w_min,
//!         config.w_max,
//!         config.r_mem,
//!         config.workflow_enabled,
//!     ));
//!
//!     let engine = AskdocsEngine::new(
//!         orchestrator,
//!         feedback_processor,
//!         chunk_store,
//!         session_log,
//!         workflow_memory_store,
//!         config.w_min,
//!         config.w_max,
//!         10,
//!     );
//!
//!     let _ = engine.ask("how do I configure retries?", config.k, false).await;
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every fallible operation returns [`error::Result<T>`]:
//!
//! ```no_run
//! use askdocs_core::error::Result;
//!
//! async fn example() -> Result<()> {
//!     // Operations that can fail
//!     // .await?
//!     Ok(())
//! }
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod constants;
pub mod embedder;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod generator;
pub mod orchestrator;
pub mod retrieval;
pub mod retry;
pub mod storage;
pub mod telemetry;
pub mod tracer;
pub mod tracing;
pub mod types;

pub use config::EngineConfig;
pub use engine::AskdocsEngine;
pub use error::{Error, Result};
pub use orchestrator::{AskOrchestrator, AskResponse};
pub use types::{Chunk, ChunkId, Session, SessionId, WorkflowMemory, WorkflowMemoryId};
