//! Engine configuration: the tunables of the external interface contract
//! as a loadable, validated struct, with TOML-file plus `ASKDOCS_*`
//! environment-variable overrides.

use crate::constants::defaults;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// All tunables enumerated in the external interface contract, plus the
/// ambient retry/timeout knobs the core needs to actually run them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed embedding dimension, set at boot and never changed thereafter.
    pub embed_dim: usize,
    /// Default top-K retrieval size.
    pub k: usize,
    /// Hard cap on caller-supplied K.
    pub k_max: usize,
    /// Workflow boost coefficient (β).
    pub beta: f64,
    /// Minimum cosine similarity for a workflow memory hit.
    pub min_memory_sim: f64,
    /// Maximum number of workflow memory hits considered per lookup.
    pub top_m: usize,
    /// Per-feedback accuracy weight increment (Δ).
    pub delta: f64,
    /// Lower clamp on accuracy weight.
    pub w_min: f64,
    /// Upper clamp on accuracy weight.
    pub w_max: f64,
    /// Gate for workflow lookup and workflow memory creation.
    pub workflow_enabled: bool,
    /// Maximum accepted query length, in characters.
    pub q_max: usize,
    /// Generator retry attempts (`R_gen`).
    pub r_gen: u32,
    /// Workflow memory write retry attempts (`R_mem`, best-effort).
    pub r_mem: u32,
    #[serde(with = "duration_secs")]
    pub embed_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub generate_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub store_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embed_dim: defaults::EMBED_DIM,
            k: defaults::K,
            k_max: defaults::K_MAX,
            beta: defaults::BETA,
            min_memory_sim: defaults::MIN_MEMORY_SIM,
            top_m: defaults::TOP_M,
            delta: defaults::DELTA,
            w_min: defaults::W_MIN,
            w_max: defaults::W_MAX,
            workflow_enabled: defaults::WORKFLOW_ENABLED,
            q_max: defaults::Q_MAX,
            r_gen: defaults::R_GEN,
            r_mem: defaults::R_MEM,
            embed_timeout: defaults::DEFAULT_EMBED_TIMEOUT,
            generate_timeout: defaults::DEFAULT_GENERATE_TIMEOUT,
            store_timeout: defaults::DEFAULT_OPERATION_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// Parse configuration from TOML text, then apply `ASKDOCS_*` environment
    /// overrides, then validate.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if the TOML is malformed or validation
    /// fails.
    pub fn load(toml_str: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(toml_str)
            .map_err(|e| Error::InvalidInput(format!("invalid config toml: {e}")))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Start from defaults and apply `ASKDOCS_*` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` if validation fails.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        macro_rules! override_usize {
            ($field:ident, $env:literal) => {
                if let Ok(v) = std::env::var($env) {
                    if let Ok(parsed) = v.parse() {
                        self.$field = parsed;
                    }
                }
            };
        }
        macro_rules! override_f64 {
            ($field:ident, $env:literal) => {
                if let Ok(v) = std::env::var($env) {
                    if let Ok(parsed) = v.parse() {
                        self.$field = parsed;
                    }
                }
            };
        }

        override_usize!(embed_dim, "ASKDOCS_EMBED_DIM");
        override_usize!(k, "ASKDOCS_K");
        override_usize!(k_max, "ASKDOCS_K_MAX");
        override_f64!(beta, "ASKDOCS_BETA");
        override_f64!(min_memory_sim, "ASKDOCS_MIN_MEMORY_SIM");
        override_usize!(top_m, "ASKDOCS_TOP_M");
        override_f64!(delta, "ASKDOCS_DELTA");
        override_f64!(w_min, "ASKDOCS_W_MIN");
        override_f64!(w_max, "ASKDOCS_W_MAX");
        override_usize!(q_max, "ASKDOCS_Q_MAX");

        if let Ok(v) = std::env::var("ASKDOCS_WORKFLOW_ENABLED") {
            if let Ok(parsed) = v.parse() {
                self.workflow_enabled = parsed;
            }
        }
    }

    /// Validate cross-field invariants: non-zero dimensions, sane weight
    /// clamps, `K ≤ K_max`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidInput` describing the first violated
    /// invariant found.
    pub fn validate(&self) -> Result<()> {
        if self.embed_dim == 0 {
            return Err(Error::InvalidInput("embed_dim must be positive".to_string()));
        }
        if self.k == 0 || self.k > self.k_max {
            return Err(Error::InvalidInput(
                "k must be positive and not exceed k_max".to_string(),
            ));
        }
        if self.w_min <= 0.0 || self.w_min >= self.w_max {
            return Err(Error::InvalidInput(
                "w_min must be positive and less than w_max".to_string(),
            ));
        }
        if self.delta <= 0.0 || self.delta > (self.w_max - self.w_min) {
            return Err(Error::InvalidInput(
                "delta must be positive and within the weight range".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_memory_sim) {
            return Err(Error::InvalidInput(
                "min_memory_sim must be within [0, 1]".to_string(),
            ));
        }
        if self.top_m == 0 {
            return Err(Error::InvalidInput("top_m must be positive".to_string()));
        }
        if self.beta < 0.0 {
            return Err(Error::InvalidInput("beta must be non-negative".to_string()));
        }
        if self.q_max == 0 {
            return Err(Error::InvalidInput("q_max must be positive".to_string()));
        }
        Ok(())
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
