//! Packing and simulation configuration.
//!
//! Settings are plain serde structs with defaults, so a TOML file only
//! needs the keys it wants to change:
//!
//! ```toml
//! [packing]
//! server_cpus = 4.0
//! server_memory = 32.0
//! reuse_window = 28800.0
//! # reuse_window_enabled = false   # servers accept runs forever
//!
//! [simulation]
//! trials = 500
//! seed = 42
//! compact = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::models::ServerTag;

/// Default standard server CPU capacity.
pub const DEFAULT_SERVER_CPUS: f64 = 3.0;
/// Default standard server memory capacity (GiB).
pub const DEFAULT_SERVER_MEMORY: f64 = 16.0;
/// Default reuse window: 8 hours.
pub const DEFAULT_REUSE_WINDOW: f64 = 8.0 * 60.0 * 60.0;
/// Default number of Monte Carlo trials.
pub const DEFAULT_TRIALS: usize = 1000;

/// Server sizing and reuse policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackingConfig {
    /// Standard server CPU capacity.
    pub server_cpus: f64,
    /// Standard server memory capacity.
    pub server_memory: f64,
    /// Reuse window in seconds. `None` = servers accept runs forever.
    pub reuse_window: Option<f64>,
    /// Whether the reuse window applies at all. TOML has no null, so this
    /// is how a file turns the window off.
    pub reuse_window_enabled: bool,
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            server_cpus: DEFAULT_SERVER_CPUS,
            server_memory: DEFAULT_SERVER_MEMORY,
            reuse_window: Some(DEFAULT_REUSE_WINDOW),
            reuse_window_enabled: true,
        }
    }
}

impl PackingConfig {
    /// The window servers are actually given.
    pub fn effective_reuse_window(&self) -> Option<f64> {
        self.reuse_window.filter(|_| self.reuse_window_enabled)
    }
}

/// Monte Carlo driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of randomized trials.
    pub trials: usize,
    /// Base RNG seed. `None` = pick one at random.
    pub seed: Option<u64>,
    /// Run the compactor before measuring each trial.
    pub compact: bool,
    /// Worker threads. `0` = available parallelism.
    pub workers: usize,
    /// Server tags excluded from the concurrency count.
    pub skip_concurrency_tags: Vec<ServerTag>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
            seed: None,
            compact: false,
            workers: 0,
            skip_concurrency_tags: vec![ServerTag::Fargate],
        }
    }
}

impl SimulationConfig {
    /// Number of worker threads to use for `trials` trials.
    pub fn effective_workers(&self) -> usize {
        let requested = if self.workers == 0 {
            std::thread::available_parallelism().map_or(1, |n| n.get())
        } else {
            self.workers
        };
        requested.clamp(1, self.trials.max(1))
    }
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub packing: PackingConfig,
    pub simulation: SimulationConfig,
}

impl Config {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.packing;
        if !(p.server_cpus.is_finite() && p.server_cpus > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "server_cpus must be positive, got {}",
                p.server_cpus
            )));
        }
        if !(p.server_memory.is_finite() && p.server_memory > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "server_memory must be positive, got {}",
                p.server_memory
            )));
        }
        if let Some(window) = p.reuse_window {
            if window.is_nan() || window < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "reuse_window must be non-negative, got {window}"
                )));
            }
        }
        if self.simulation.trials == 0 {
            return Err(ConfigError::Invalid("trials must be at least 1".into()));
        }
        Ok(())
    }
}
