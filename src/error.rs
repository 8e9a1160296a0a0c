//! Error types.

use thiserror::Error;

use crate::models::RunId;

/// Errors that abort a packing run.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PackingError {
    #[error("run {run_id} has negative duration: {duration}")]
    NegativeDuration { run_id: RunId, duration: f64 },

    #[error("run {run_id} has a non-finite field")]
    NonFinite { run_id: RunId },

    #[error("run {run_id} requests negative resources (cpus={cpus}, memory={memory})")]
    NegativeRequirement {
        run_id: RunId,
        cpus: f64,
        memory: f64,
    },

    #[error("oversize run {run_id} failed to schedule on its dedicated server")]
    DedicatedPlacement { run_id: RunId },

    #[error("run {run_id} could not be placed on a fresh server")]
    FreshServerPlacement { run_id: RunId },
}

/// Errors raised while loading run data.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type PackingResult<T> = Result<T, PackingError>;
