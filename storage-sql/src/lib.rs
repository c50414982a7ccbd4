//! # askdocs-storage-sql
//!
//! libSQL/Turso-backed implementation of the core's `ChunkStore`,
//! `WorkflowMemoryStore`, and `SessionLog` traits.
//!
//! This crate provides:
//! - Connection management for local and remote libSQL databases
//! - SQL schema creation, safe to call repeatedly
//! - Trait implementations backing the four logical tables: `chunks`,
//!   `sessions`, `embedding_links`, `workflow_memories`
//!
//! ## Example
//!
//! ```no_run
//! use askdocs_storage_sql::SqlStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = SqlStore::new("libsql://localhost:8080", "token").await?;
//! store.initialize_schema().await?;
//! # Ok(())
//! # }
//! ```

use askdocs_core::error::{Error, Result};
use libsql::{Builder, Connection, Database};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub mod pool;
mod schema;
mod store;

pub use pool::{ConnectionPool, PoolConfig, PoolStatistics};

/// libSQL-backed store for the chunk, session, and workflow memory tables.
pub struct SqlStore {
    db: Arc<Database>,
    pool: Option<Arc<ConnectionPool>>,
    config: SqlStoreConfig,
}

/// Configuration for [`SqlStore`].
#[derive(Debug, Clone)]
pub struct SqlStoreConfig {
    /// Maximum retry attempts for failed schema-initialization statements.
    pub max_retries: u32,
    /// Base delay for exponential backoff (milliseconds).
    pub retry_base_delay_ms: u64,
    /// Maximum delay for exponential backoff (milliseconds).
    pub retry_max_delay_ms: u64,
    /// Enable connection pooling.
    pub enable_pooling: bool,
}

impl Default for SqlStoreConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_base_delay_ms: 100,
            retry_max_delay_ms: 5000,
            enable_pooling: true,
        }
    }
}

impl SqlStore {
    /// Create a new store, connecting to `url` with `token`.
    ///
    /// # Arguments
    ///
    /// * `url` - Database URL (only `libsql://`, `file:`, or `:memory:` protocols allowed)
    /// * `token` - Authentication token (required for `libsql://`, empty for local files)
    ///
    /// # Security
    ///
    /// Remote connections must use `libsql://` with a non-empty token;
    /// `http://`/`https://` are rejected. Local `file:`/`:memory:`
    /// databases need no token.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for a disallowed URL scheme or a
    /// missing remote token, `Error::Store` if the connection fails.
    pub async fn new(url: &str, token: &str) -> Result<Self> {
        Self::with_config(url, token, SqlStoreConfig::default()).await
    }

    /// Build a store from an already-open [`libsql::Database`], useful for
    /// tests against a local file database.
    pub fn from_database(db: Database) -> Self {
        Self { db: Arc::new(db), pool: None, config: SqlStoreConfig::default() }
    }

    /// Create a new store with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` for a disallowed URL scheme or a
    /// missing remote token, `Error::Store` if the connection fails.
    pub async fn with_config(url: &str, token: &str, config: SqlStoreConfig) -> Result<Self> {
        info!("connecting to database at {url}");

        if !url.starts_with("libsql://") && !url.starts_with("file:") && !url.starts_with(":memory:") {
            return Err(Error::InvalidInput(format!(
                "insecure database url: {url}. only libsql://, file:, or :memory: protocols are allowed"
            )));
        }
        if url.starts_with("libsql://") && token.trim().is_empty() {
            return Err(Error::InvalidInput(
                "authentication token required for remote connections".to_string(),
            ));
        }

        let db = if url.starts_with("libsql://") {
            Builder::new_remote(url.to_string(), token.to_string())
                .build()
                .await
                .map_err(|e| Error::Store(format!("failed to connect: {e}")))?
        } else {
            let path = url.strip_prefix("file:").unwrap_or(url);
            Builder::new_local(path).build().await.map_err(|e| Error::Store(format!("failed to connect: {e}")))?
        };
        let db = Arc::new(db);

        let pool = if config.enable_pooling {
            let pool = ConnectionPool::new(Arc::clone(&db), PoolConfig::default()).await?;
            Some(Arc::new(pool))
        } else {
            None
        };

        Ok(Self { db, pool, config })
    }

    /// Create all tables and indexes. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if any statement fails after retrying.
    pub async fn initialize_schema(&self) -> Result<()> {
        info!("initializing schema");
        let conn = self.get_connection().await?;

        self.execute_with_retry(&conn, schema::CREATE_CHUNKS_TABLE).await?;
        self.execute_with_retry(&conn, schema::CREATE_CHUNKS_REPO_INDEX).await?;
        self.execute_with_retry(&conn, schema::CREATE_SESSIONS_TABLE).await?;
        self.execute_with_retry(&conn, schema::CREATE_SESSIONS_STATUS_INDEX).await?;
        self.execute_with_retry(&conn, schema::CREATE_EMBEDDING_LINKS_TABLE).await?;
        self.execute_with_retry(&conn, schema::CREATE_EMBEDDING_LINKS_SESSION_INDEX).await?;
        self.execute_with_retry(&conn, schema::CREATE_WORKFLOW_MEMORIES_TABLE).await?;
        self.execute_with_retry(&conn, schema::CREATE_WORKFLOW_MEMORIES_CREATED_AT_INDEX).await?;

        info!("schema initialization complete");
        Ok(())
    }

    /// Get a database connection, from the pool if enabled.
    async fn get_connection(&self) -> Result<Connection> {
        if let Some(ref pool) = self.pool {
            let pooled = pool.get().await?;
            pooled.into_inner()
        } else {
            self.db.connect().map_err(|e| Error::Store(format!("failed to get connection: {e}")))
        }
    }

    /// Pool statistics, if pooling is enabled.
    pub async fn pool_statistics(&self) -> Option<PoolStatistics> {
        match &self.pool {
            Some(pool) => Some(pool.statistics().await),
            None => None,
        }
    }

    async fn execute_with_retry(&self, conn: &Connection, sql: &str) -> Result<()> {
        let mut attempts = 0;
        let mut delay = Duration::from_millis(self.config.retry_base_delay_ms);

        loop {
            match conn.execute(sql, ()).await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    attempts += 1;
                    if attempts >= self.config.max_retries {
                        error!("schema statement failed after {attempts} attempts: {e}");
                        return Err(Error::Store(format!("schema init failed after {attempts} retries: {e}")));
                    }
                    warn!("schema statement attempt {attempts} failed: {e}, retrying");
                    tokio::time::sleep(delay).await;
                    delay = std::cmp::min(delay * 2, Duration::from_millis(self.config.retry_max_delay_ms));
                }
            }
        }
    }

    /// Health check: verify the database is reachable.
    ///
    /// # Errors
    ///
    /// Returns `Error::Store` if the database does not respond.
    pub async fn health_check(&self) -> Result<()> {
        let conn = self.get_connection().await?;
        conn.query("SELECT 1", ()).await.map_err(|e| Error::Store(format!("health check failed: {e}")))?;
        debug!("health check passed");
        Ok(())
    }
}
