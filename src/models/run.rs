//! Run (job) model.
//!
//! A run is one unit of batch work to be packed onto a server. Its
//! resource requirement and duration are fixed up front; the packer only
//! decides *where* and *when* it executes.
//!
//! # Time Representation
//! Durations and start times are in seconds relative to a simulation
//! epoch (t=0). The first run placed on a server starts at t=0.

use serde::{Deserialize, Serialize};

/// Unique run identifier.
pub type RunId = u64;

/// A run (job) to be packed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Unique run identifier.
    pub id: RunId,
    /// CPU requirement (cores, may be fractional).
    pub cpus: f64,
    /// Memory requirement (GiB).
    pub memory: f64,
    /// Execution time (seconds).
    pub duration: f64,
    /// Free-form label (e.g. pipeline name).
    pub label: String,
}

impl Run {
    /// Creates a new unlabeled run.
    pub fn new(id: RunId, cpus: f64, memory: f64, duration: f64) -> Self {
        Self {
            id,
            cpus,
            memory,
            duration,
            label: String::new(),
        }
    }

    /// Sets the label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Whether this run needs more than a server of the given size offers.
    #[inline]
    pub fn exceeds(&self, server_cpus: f64, server_memory: f64) -> bool {
        self.cpus > server_cpus || self.memory > server_memory
    }
}

/// Aggregate totals over a set of runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTotals {
    /// Number of runs.
    pub count: usize,
    /// Sum of durations (seconds).
    pub total_duration: f64,
    /// Sum of memory requirements.
    pub total_memory: f64,
    /// Sum of CPU requirements.
    pub total_cpus: f64,
}

impl RunTotals {
    /// Sums requirements across runs.
    pub fn from_runs(runs: &[Run]) -> Self {
        runs.iter().fold(Self::default(), |mut acc, run| {
            acc.count += 1;
            acc.total_duration += run.duration;
            acc.total_memory += run.memory;
            acc.total_cpus += run.cpus;
            acc
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_builder() {
        let run = Run::new(7, 2.0, 4.5, 600.0).with_label("nightly-etl");
        assert_eq!(run.id, 7);
        assert_eq!(run.label, "nightly-etl");
        assert!((run.memory - 4.5).abs() < 1e-10);
    }

    #[test]
    fn test_run_exceeds() {
        let run = Run::new(0, 2.0, 4.0, 10.0);
        assert!(!run.exceeds(3.0, 16.0));
        assert!(!run.exceeds(2.0, 4.0)); // exact fit is not oversize
        assert!(run.exceeds(1.5, 16.0));
        assert!(run.exceeds(3.0, 3.9));
    }

    #[test]
    fn test_run_totals() {
        let runs = vec![
            Run::new(0, 1.0, 2.0, 100.0),
            Run::new(1, 0.5, 8.0, 50.0),
        ];
        let totals = RunTotals::from_runs(&runs);
        assert_eq!(totals.count, 2);
        assert!((totals.total_duration - 150.0).abs() < 1e-10);
        assert!((totals.total_memory - 10.0).abs() < 1e-10);
        assert!((totals.total_cpus - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_run_totals_empty() {
        assert_eq!(RunTotals::from_runs(&[]), RunTotals::default());
    }

    #[test]
    fn test_run_serde() {
        let run = Run::new(3, 1.0, 2.0, 30.0).with_label("p");
        let json = serde_json::to_string(&run).unwrap();
        let back: Run = serde_json::from_str(&json).unwrap();
        assert_eq!(back, run);
    }
}
