//! Global constants for the retrieval engine.
//!
//! Centralizes default configuration values and persistence naming so they
//! stay in one place rather than scattered as magic numbers.

/// Default configuration values, overridable through [`crate::config::EngineConfig`].
pub mod defaults {
    use std::time::Duration;

    /// Default embedding dimension when a provider doesn't otherwise fix one.
    pub const EMBED_DIM: usize = 768;

    /// Default top-K retrieval size.
    pub const K: usize = 5;

    /// Hard cap on caller-supplied K.
    pub const K_MAX: usize = 50;

    /// Workflow boost coefficient applied to effective score.
    pub const BETA: f64 = 0.2;

    /// Minimum cosine similarity for a workflow memory to be considered a hit.
    pub const MIN_MEMORY_SIM: f64 = 0.75;
    /// Default cap on workflow memory hits per lookup.
    pub const TOP_M: usize = 3;

    /// Per-feedback accuracy weight increment/decrement.
    pub const DELTA: f64 = 0.1;

    /// Lower clamp on chunk accuracy weight.
    pub const W_MIN: f64 = 0.5;

    /// Upper clamp on chunk accuracy weight.
    pub const W_MAX: f64 = 2.0;

    /// Whether workflow memory lookup/recording is enabled by default.
    pub const WORKFLOW_ENABLED: bool = true;

    /// Maximum accepted query length, in characters.
    pub const Q_MAX: usize = 4000;

    /// Hard cap on the candidate fanout `N` fetched from the chunk store
    /// before scoring, regardless of K.
    pub const MAX_FANOUT: usize = 200;

    /// Retry attempts for the generator (`R_GEN`).
    pub const R_GEN: u32 = 3;

    /// Retry attempts for the best-effort workflow memory write (`R_MEM`).
    pub const R_MEM: u32 = 2;

    pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);
    pub const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_GENERATE_TIMEOUT: Duration = Duration::from_secs(30);

    pub const DEFAULT_RETRY_DELAY_MS: u64 = 100;
    pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5_000;
    pub const DEFAULT_RETRY_JITTER_FACTOR: f64 = 0.25;

    pub const DEFAULT_CIRCUIT_FAILURE_THRESHOLD: u32 = 5;
    pub const DEFAULT_CIRCUIT_TIMEOUT_SECS: u64 = 30;

    /// Default number of top-N chunks reported by STATS.
    pub const STATS_TOP_N: usize = 10;
}

/// Error message fragments shared across modules.
pub mod errors {
    pub const CHUNK_NOT_FOUND: &str = "chunk not found";
    pub const SESSION_NOT_FOUND: &str = "session not found";
    pub const WORKFLOW_MEMORY_NOT_FOUND: &str = "workflow memory not found";
    pub const SESSION_ALREADY_FINALISED: &str = "session already finalised";
    pub const QUERY_TOO_LONG: &str = "query exceeds Q_MAX characters";
    pub const QUERY_EMPTY: &str = "query must not be empty";
    pub const K_OUT_OF_RANGE: &str = "K must be between 1 and K_MAX";
    pub const EMBED_DIM_MISMATCH: &str = "embedding dimension mismatch";
}

/// Log line prefixes, matched against the span/component emitting them.
pub mod logging {
    pub const LOG_PREFIX_ASK: &str = "[ask]";
    pub const LOG_PREFIX_RETRIEVE: &str = "[retrieve]";
    pub const LOG_PREFIX_FEEDBACK: &str = "[feedback]";
    pub const LOG_PREFIX_WORKFLOW: &str = "[workflow]";
    pub const LOG_PREFIX_STORE: &str = "[store]";
}

/// Database table and column names, shared between the in-memory store and
/// the SQL-backed store so both speak the same vocabulary.
pub mod db {
    pub const TABLE_CHUNKS: &str = "chunks";
    pub const TABLE_SESSIONS: &str = "sessions";
    pub const TABLE_EMBEDDING_LINKS: &str = "embedding_links";
    pub const TABLE_WORKFLOW_MEMORIES: &str = "workflow_memories";

    pub const COL_ID: &str = "id";
    pub const COL_SESSION_ID: &str = "session_id";
    pub const COL_CHUNK_ID: &str = "chunk_id";
    pub const COL_CREATED_AT: &str = "created_at";
    pub const COL_UPDATED_AT: &str = "updated_at";
}

/// Feature flags for conditional compilation.
pub mod features {
    #[cfg(feature = "proptest-arbitrary")]
    pub const PROPTEST_ARBITRARY_ENABLED: bool = true;
    #[cfg(not(feature = "proptest-arbitrary"))]
    pub const PROPTEST_ARBITRARY_ENABLED: bool = false;
}
