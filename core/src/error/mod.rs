//! Error types for the retrieval engine.
//!
//! The error surface is intentionally small: every fallible operation in this
//! crate returns one of the seven kinds below. Storage backends and provider
//! adapters map their own richer errors down onto this set at the boundary.

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the retrieval engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied argument failed validation (empty query, K out of
    /// range, malformed chunk edit, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested entity (session, chunk, workflow memory) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A write was attempted against a session that has already been
    /// finalised and can no longer accept feedback.
    #[error("session already finalised: {0}")]
    AlreadyFinalised(String),

    /// The embedder or generator provider returned an error, including a
    /// tripped circuit breaker.
    #[error("provider error: {0}")]
    Provider(String),

    /// The chunk store, session log, or workflow memory store returned an
    /// error.
    #[error("store error: {0}")]
    Store(String),

    /// An operation did not complete within its configured deadline.
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// An invariant was violated or an unexpected condition was hit that
    /// does not fit any of the above. Treated as a bug, not caller error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether a retry policy should retry an operation that failed with
    /// this error. Only transient conditions are recoverable; validation
    /// and state errors are not, since retrying them cannot succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Provider(_) | Error::Store(_) | Error::Timeout(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(format!("serialization error: {err}"))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Store(format!("io error: {err}"))
    }
}
