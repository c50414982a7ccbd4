//! # Circuit Breaker Pattern for External Providers
//!
//! Implements a circuit breaker so embedder and generator calls fail fast
//! instead of piling up retries against a dependency that is already down.
//!
//! ## Circuit States
//!
//! - **Closed**: Normal operation, all requests pass through
//! - **Open**: Too many failures detected, requests fail immediately
//! - **Half-Open**: Testing if the service has recovered
//!
//! ## Configuration
//!
//! - Failure threshold: Configurable consecutive failures to open circuit
//! - Timeout: Duration before attempting recovery (OPEN -> `HALF_OPEN`)
//! - Half-open test period: Duration to test recovery before closing
//! - Exponential backoff: Progressive delays between retries
//!
//! ## Example
//!
//! ```no_run
//! use askdocs_core::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, OpenErrorKind};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CircuitBreakerConfig::default();
//! let circuit_breaker = Arc::new(CircuitBreaker::new("embedder", OpenErrorKind::Provider, config));
//!
//! // Execute operation with circuit breaker protection
//! let result = circuit_breaker.call(|| async {
//!     // Your embedding provider call here
//!     Ok::<_, askdocs_core::Error>(())
//! }).await;
//! # Ok(())
//! # }
//! ```

mod states;

pub use states::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState, OpenErrorKind};
