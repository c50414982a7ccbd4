//! CLI-level configuration: engine tuning plus where to look for the
//! database, loaded from an optional TOML file and `ASKDOCS_*`
//! environment overrides.

use anyhow::{Context, Result};
use askdocs_core::EngineConfig;
use serde::Deserialize;
use std::path::Path;

/// The CLI's own settings, layered on top of `EngineConfig`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct CliConfig {
    pub engine: EngineConfigToml,
    /// `libsql://...`, `file:...`, or `:memory:`. Omitted entirely to use
    /// the non-persistent in-memory store.
    pub database_url: Option<String>,
    /// Auth token for a remote `libsql://` database. Ignored otherwise.
    #[serde(default)]
    pub database_token: String,
}

/// `EngineConfig` mirrored as an all-optional TOML shape so a config file
/// can override a subset of fields; unset fields keep the engine default.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfigToml {
    pub embed_dim: Option<usize>,
    pub k: Option<usize>,
    pub k_max: Option<usize>,
    pub beta: Option<f64>,
    pub min_memory_sim: Option<f64>,
    pub top_m: Option<usize>,
    pub delta: Option<f64>,
    pub w_min: Option<f64>,
    pub w_max: Option<f64>,
    pub workflow_enabled: Option<bool>,
    pub q_max: Option<usize>,
}

impl CliConfig {
    /// Load from `path` if it exists, else start from defaults. Either
    /// way, `ASKDOCS_*` environment variables are applied afterward.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed,
    /// or if the resulting `EngineConfig` fails validation.
    pub fn load(path: Option<&Path>) -> Result<(Self, EngineConfig)> {
        let cli_config = match path {
            Some(p) if p.exists() => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("reading config file {}", p.display()))?;
                toml::from_str(&text).with_context(|| format!("parsing config file {}", p.display()))?
            }
            _ => CliConfig::default(),
        };

        let mut engine_config = EngineConfig::default();
        cli_config.engine.apply_to(&mut engine_config);

        // ASKDOCS_* env overrides take priority over the config file.
        let env_config = EngineConfig::from_env().context("invalid ASKDOCS_* environment override")?;
        merge_env_overrides(&mut engine_config, &env_config);
        engine_config.validate().context("invalid engine configuration")?;

        Ok((cli_config, engine_config))
    }
}

impl EngineConfigToml {
    fn apply_to(&self, config: &mut EngineConfig) {
        if let Some(v) = self.embed_dim {
            config.embed_dim = v;
        }
        if let Some(v) = self.k {
            config.k = v;
        }
        if let Some(v) = self.k_max {
            config.k_max = v;
        }
        if let Some(v) = self.beta {
            config.beta = v;
        }
        if let Some(v) = self.min_memory_sim {
            config.min_memory_sim = v;
        }
        if let Some(v) = self.top_m {
            config.top_m = v;
        }
        if let Some(v) = self.delta {
            config.delta = v;
        }
        if let Some(v) = self.w_min {
            config.w_min = v;
        }
        if let Some(v) = self.w_max {
            config.w_max = v;
        }
        if let Some(v) = self.workflow_enabled {
            config.workflow_enabled = v;
        }
        if let Some(v) = self.q_max {
            config.q_max = v;
        }
    }
}

/// `EngineConfig::from_env` starts from defaults, so every field it
/// reports differs from `EngineConfig::default()` only where an env var
/// was actually set. Copy just those over the file-derived config.
fn merge_env_overrides(config: &mut EngineConfig, env_config: &EngineConfig) {
    let defaults = EngineConfig::default();
    macro_rules! merge {
        ($field:ident) => {
            if env_config.$field != defaults.$field {
                config.$field = env_config.$field;
            }
        };
    }
    merge!(embed_dim);
    merge!(k);
    merge!(k_max);
    merge!(beta);
    merge!(min_memory_sim);
    merge!(top_m);
    merge!(delta);
    merge!(w_min);
    merge!(w_max);
    merge!(workflow_enabled);
    merge!(q_max);
}
