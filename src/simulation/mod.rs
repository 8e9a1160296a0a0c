//! Monte Carlo bounds on fleet size.
//!
//! The greedy packer is order-sensitive, so one packing understates the
//! worst case. The driver repacks the same runs under many random
//! orderings and tracks running maxima of the server counts and of the
//! peak concurrency.
//!
//! # Determinism
//!
//! Trial `t` shuffles with `StdRng::seed_from_u64(seed + t)`. Outcomes
//! therefore depend only on the base seed, never on the number of
//! worker threads or on scheduling order between them.
//!
//! # Concurrency
//!
//! Trials are independent: each clones the run list and builds its own
//! servers. Workers share only the read-only input slice.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::analytics::max_concurrent_jobs;
use crate::config::SimulationConfig;
use crate::error::PackingResult;
use crate::models::{Run, ServerTag};
use crate::packing::{compact, BinPacker};

/// Measurements of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialOutcome {
    /// Trial index.
    pub trial: usize,
    /// Standard servers used.
    pub ec2_servers: usize,
    /// Dedicated servers used.
    pub fargate_servers: usize,
    /// Peak concurrency (skipped tags excluded).
    pub max_concurrent_jobs: usize,
}

/// Running maxima across trials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningMax {
    /// Most standard servers in any trial so far.
    pub ec2_servers: usize,
    /// Most dedicated servers in any trial so far.
    pub fargate_servers: usize,
    /// Highest peak concurrency in any trial so far.
    pub max_concurrent_jobs: usize,
}

impl RunningMax {
    /// Folds one trial into the maxima.
    pub fn update(&mut self, outcome: &TrialOutcome) {
        self.ec2_servers = self.ec2_servers.max(outcome.ec2_servers);
        self.fargate_servers = self.fargate_servers.max(outcome.fargate_servers);
        self.max_concurrent_jobs = self.max_concurrent_jobs.max(outcome.max_concurrent_jobs);
    }
}

/// Result of a simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    /// Base seed actually used.
    pub seed: u64,
    /// Per-trial outcomes, ordered by trial index.
    pub outcomes: Vec<TrialOutcome>,
    /// Maxima over all trials.
    pub overall: RunningMax,
}

impl SimulationSummary {
    /// Running maxima after each trial, in trial order.
    pub fn running_maxima(&self) -> impl Iterator<Item = (usize, RunningMax)> + '_ {
        self.outcomes.iter().scan(RunningMax::default(), |acc, outcome| {
            acc.update(outcome);
            Some((outcome.trial, *acc))
        })
    }
}

/// Randomized repacking driver.
///
/// # Example
///
/// ```
/// use u_capacity::config::SimulationConfig;
/// use u_capacity::models::Run;
/// use u_capacity::packing::BinPacker;
/// use u_capacity::simulation::MonteCarlo;
///
/// let runs: Vec<Run> = (0..20).map(|i| Run::new(i, 1.0, 2.0, 600.0)).collect();
/// let config = SimulationConfig { trials: 10, seed: Some(1), ..Default::default() };
/// let summary = MonteCarlo::new(BinPacker::new(3.0, 16.0), config).run(&runs).unwrap();
/// assert_eq!(summary.outcomes.len(), 10);
/// assert!(summary.overall.ec2_servers >= 1);
/// ```
#[derive(Debug, Clone)]
pub struct MonteCarlo {
    packer: BinPacker,
    config: SimulationConfig,
}

impl MonteCarlo {
    /// Creates a driver.
    pub fn new(packer: BinPacker, config: SimulationConfig) -> Self {
        Self { packer, config }
    }

    /// Driver settings.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs all trials.
    ///
    /// # Errors
    /// The first packing error of any trial (e.g. a negative duration).
    pub fn run(&self, runs: &[Run]) -> PackingResult<SimulationSummary> {
        let seed = self.config.seed.unwrap_or_else(rand::random::<u64>);
        let trials = self.config.trials;
        let workers = self.config.effective_workers();
        info!(trials, workers, seed, runs = runs.len(), "starting simulation");

        let per_worker: Vec<PackingResult<Vec<TrialOutcome>>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|worker| {
                    scope.spawn(move || {
                        (worker..trials)
                            .step_by(workers)
                            .map(|trial| self.run_trial(runs, seed, trial))
                            .collect::<PackingResult<Vec<_>>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
                .collect()
        });

        let mut outcomes = Vec::with_capacity(trials);
        for chunk in per_worker {
            outcomes.extend(chunk?);
        }
        outcomes.sort_by_key(|o| o.trial);

        let mut overall = RunningMax::default();
        for outcome in &outcomes {
            overall.update(outcome);
        }
        info!(
            ec2 = overall.ec2_servers,
            fargate = overall.fargate_servers,
            concurrent = overall.max_concurrent_jobs,
            "simulation finished"
        );

        Ok(SimulationSummary {
            seed,
            outcomes,
            overall,
        })
    }

    /// Shuffles, packs and measures one trial.
    pub fn run_trial(&self, runs: &[Run], seed: u64, trial: usize) -> PackingResult<TrialOutcome> {
        let mut order = runs.to_vec();
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(trial as u64));
        order.shuffle(&mut rng);

        let mut set = self.packer.pack(&order)?;
        if self.config.compact {
            set = compact(&set);
        }

        let outcome = TrialOutcome {
            trial,
            ec2_servers: set.count_by_tag(ServerTag::Ec2),
            fargate_servers: set.count_by_tag(ServerTag::Fargate),
            max_concurrent_jobs: max_concurrent_jobs(
                &set.servers,
                &self.config.skip_concurrency_tags,
            )
            .max_concurrent_jobs,
        };
        debug!(
            trial,
            ec2 = outcome.ec2_servers,
            fargate = outcome.fargate_servers,
            concurrent = outcome.max_concurrent_jobs,
            "trial done"
        );
        Ok(outcome)
    }
}
