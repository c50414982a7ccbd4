//! Database schema definitions for the SQL-backed engine stores.
//!
//! Embeddings are stored as JSON-encoded `f32` arrays rather than a
//! vector-index column: the core's fetch contracts (`all`, `fetch_candidates`
//! scanning up to `N`) assume a corpus that fits comfortably in a scan, so
//! similarity is computed in Rust after a full read rather than pushed down
//! into SQL.

/// SQL to create the `chunks` table.
pub const CREATE_CHUNKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content TEXT NOT NULL,
    repo TEXT NOT NULL,
    path TEXT NOT NULL,
    section TEXT NOT NULL,
    embedding TEXT NOT NULL,
    accuracy_weight REAL NOT NULL DEFAULT 1.0,
    times_retrieved INTEGER NOT NULL DEFAULT 0,
    times_useful INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
    updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
)
"#;

/// Index on chunk provenance, used by `CHUNK EDIT` audit lookups.
pub const CREATE_CHUNKS_REPO_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_chunks_repo_path
ON chunks(repo, path)
"#;

/// SQL to create the `sessions` table.
pub const CREATE_SESSIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL,
    query_embedding TEXT NOT NULL,
    answer TEXT NOT NULL,
    reasoning_steps TEXT NOT NULL,
    feedback_status TEXT NOT NULL DEFAULT 'pending',
    correction_text TEXT,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
)
"#;

/// Index for `STATS`'s pending-feedback count and worklist queries.
pub const CREATE_SESSIONS_STATUS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_sessions_feedback_status
ON sessions(feedback_status, created_at DESC)
"#;

/// SQL to create the `embedding_links` table: one row per
/// (session, chunk) pair in a session's retrieved list.
pub const CREATE_EMBEDDING_LINKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS embedding_links (
    session_id INTEGER NOT NULL REFERENCES sessions(id),
    chunk_id INTEGER NOT NULL REFERENCES chunks(id),
    rank INTEGER NOT NULL,
    raw_similarity REAL NOT NULL,
    effective_score REAL NOT NULL,
    workflow_boosted INTEGER NOT NULL DEFAULT 0,
    was_useful TEXT NOT NULL DEFAULT 'unknown',
    PRIMARY KEY (session_id, chunk_id)
)
"#;

/// Index for reconstructing a session's retrieved list in rank order.
pub const CREATE_EMBEDDING_LINKS_SESSION_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_embedding_links_session
ON embedding_links(session_id, rank)
"#;

/// SQL to create the `workflow_memories` table.
pub const CREATE_WORKFLOW_MEMORIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS workflow_memories (
    id TEXT PRIMARY KEY NOT NULL,
    summary_embedding TEXT NOT NULL,
    source_session_id INTEGER NOT NULL UNIQUE REFERENCES sessions(id),
    useful_chunk_ids TEXT NOT NULL,
    created_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
)
"#;

/// Index on workflow memory recency, used to bound brute-force scans.
pub const CREATE_WORKFLOW_MEMORIES_CREATED_AT_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_workflow_memories_created_at
ON workflow_memories(created_at DESC)
"#;
