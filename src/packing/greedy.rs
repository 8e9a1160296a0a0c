//! First-fit greedy packer.
//!
//! # Algorithm
//!
//! Runs are processed in the order given:
//! 1. A run larger than a standard server gets its own dedicated
//!    `fargate` server sized exactly to it.
//! 2. Otherwise it goes to the first non-dedicated server (creation
//!    order) that can host it, at that server's earliest feasible start.
//! 3. If none can, a new standard `ec2` server is opened for it.
//!
//! The result depends on input order; see [`crate::simulation`] for
//! bounding it over random orderings.
//!
//! # Complexity
//! O(n * k * s²) where n=runs, k=servers, s=segments per server.
//!
//! # Reference
//! Johnson (1974), "Fast algorithms for bin packing", JCSS 8(3)

use tracing::debug;

use crate::config::PackingConfig;
use crate::error::{PackingError, PackingResult};
use crate::models::{Run, Server, ServerSet};

/// Greedy first-fit packer.
///
/// # Example
///
/// ```
/// use u_capacity::models::{Run, ServerTag};
/// use u_capacity::packing::BinPacker;
///
/// let runs = vec![
///     Run::new(0, 2.0, 4.0, 100.0),
///     Run::new(1, 2.0, 4.0, 100.0),
///     Run::new(2, 1.0, 2.0, 50.0),
/// ];
/// let set = BinPacker::new(3.0, 16.0).pack(&runs).unwrap();
/// // Run 1 can't share t=0 with run 0, so it waits for it on server 0
/// assert_eq!(set.count_by_tag(ServerTag::Ec2), 1);
/// assert_eq!(set.job(1).unwrap().start, 100.0);
/// assert_eq!(set.job(2).unwrap().start, 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BinPacker {
    server_cpus: f64,
    server_memory: f64,
    reuse_window: Option<f64>,
}

impl BinPacker {
    /// Creates a packer for standard servers of the given size, with no reuse window.
    pub fn new(server_cpus: f64, server_memory: f64) -> Self {
        Self {
            server_cpus,
            server_memory,
            reuse_window: None,
        }
    }

    /// Creates a packer from configuration.
    pub fn from_config(config: &PackingConfig) -> Self {
        Self::new(config.server_cpus, config.server_memory)
            .with_reuse_window(config.effective_reuse_window())
    }

    /// Sets the reuse window (seconds) applied to every server.
    pub fn with_reuse_window(mut self, reuse_window: Option<f64>) -> Self {
        self.reuse_window = reuse_window;
        self
    }

    /// Standard server CPU capacity.
    pub fn server_cpus(&self) -> f64 {
        self.server_cpus
    }

    /// Standard server memory capacity.
    pub fn server_memory(&self) -> f64 {
        self.server_memory
    }

    /// Reuse window.
    pub fn reuse_window(&self) -> Option<f64> {
        self.reuse_window
    }

    /// Packs runs onto servers in the given order.
    ///
    /// # Errors
    /// - [`PackingError::NonFinite`] if a run field is NaN or infinite.
    /// - [`PackingError::NegativeDuration`] if any run has a negative duration.
    /// - [`PackingError::NegativeRequirement`] if a run requests negative
    ///   CPUs or memory.
    /// - [`PackingError::DedicatedPlacement`] / [`PackingError::FreshServerPlacement`]
    ///   if a run is rejected by a server freshly created for it.
    pub fn pack(&self, runs: &[Run]) -> PackingResult<ServerSet> {
        let mut set = ServerSet::new();

        for run in runs {
            check_run(run)?;

            if run.exceeds(self.server_cpus, self.server_memory) {
                let mut server = Server::dedicated_for(set.len(), run)
                    .with_reuse_window(self.reuse_window);
                if !server.add_run(run) {
                    return Err(PackingError::DedicatedPlacement { run_id: run.id });
                }
                let idx = set.push(server);
                debug!(
                    run = run.id,
                    server = idx,
                    cpus = run.cpus,
                    memory = run.memory,
                    "opened dedicated server"
                );
                continue;
            }

            let placed = set
                .servers
                .iter_mut()
                .enumerate()
                .filter(|(_, s)| !s.dedicated)
                .find_map(|(idx, s)| s.add_run(run).then_some(idx));

            match placed {
                Some(idx) => {
                    set.assignments.insert(run.id, idx);
                }
                None => {
                    let mut server =
                        Server::standard(set.len(), self.server_cpus, self.server_memory)
                            .with_reuse_window(self.reuse_window);
                    if !server.add_run(run) {
                        return Err(PackingError::FreshServerPlacement { run_id: run.id });
                    }
                    let idx = set.push(server);
                    debug!(run = run.id, server = idx, "opened standard server");
                }
            }
        }

        Ok(set)
    }
}

/// Rejects runs that would corrupt the usage sweep.
fn check_run(run: &Run) -> PackingResult<()> {
    if ![run.cpus, run.memory, run.duration].iter().all(|v| v.is_finite()) {
        return Err(PackingError::NonFinite { run_id: run.id });
    }
    if run.duration < 0.0 {
        return Err(PackingError::NegativeDuration {
            run_id: run.id,
            duration: run.duration,
        });
    }
    if run.cpus < 0.0 || run.memory < 0.0 {
        return Err(PackingError::NegativeRequirement {
            run_id: run.id,
            cpus: run.cpus,
            memory: run.memory,
        });
    }
    Ok(())
}
