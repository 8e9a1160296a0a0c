//! Fleet quality metrics (KPIs).
//!
//! Summarizes a packed server set into the numbers used for capacity
//! planning.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | EC2 / Fargate servers | Servers per tag |
//! | Max concurrency | Peak simultaneous jobs (skipped tags excluded) |
//! | Total span | Sum of per-server `last_end - first_start` |
//! | Total busy | Sum of per-server time with ≥1 active job |
//! | Avg utilization | Mean `busy / span` over servers with a positive span |
//!
//! # Reference
//! Pinedo (2016), "Scheduling", Ch. 1.2: Performance Measures

use serde::{Deserialize, Serialize};

use super::{max_concurrent_jobs, ServerTimeMetrics};
use crate::models::{ServerSet, ServerTag};

/// Fleet performance indicators. Time values are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetKpi {
    /// Standard servers.
    pub ec2_servers: usize,
    /// Dedicated servers.
    pub fargate_servers: usize,
    /// Scheduled jobs.
    pub jobs: usize,
    /// Peak concurrency over non-skipped servers.
    pub max_concurrent_jobs: usize,
    /// Time of the concurrency peak.
    pub peak_time: f64,
    /// Sum of server spans.
    pub total_span: f64,
    /// Sum of server busy time.
    pub total_busy: f64,
    /// Mean per-server utilization (0.0..1.0).
    pub avg_utilization: f64,
}

impl FleetKpi {
    /// Computes KPIs for a server set.
    ///
    /// # Arguments
    /// * `set` - The packed servers.
    /// * `skip_tags` - Tags left out of the concurrency count.
    pub fn calculate(set: &ServerSet, skip_tags: &[ServerTag]) -> Self {
        let concurrency = max_concurrent_jobs(&set.servers, skip_tags);

        let mut total_span = 0.0;
        let mut total_busy = 0.0;
        let mut util_sum = 0.0;
        let mut util_count = 0usize;
        for server in &set.servers {
            let m = ServerTimeMetrics::calculate(server);
            total_span += m.span;
            total_busy += m.busy;
            if let Some(u) = m.utilization() {
                util_sum += u;
                util_count += 1;
            }
        }

        Self {
            ec2_servers: set.count_by_tag(ServerTag::Ec2),
            fargate_servers: set.count_by_tag(ServerTag::Fargate),
            jobs: set.job_count(),
            max_concurrent_jobs: concurrency.max_concurrent_jobs,
            peak_time: concurrency.peak_time,
            total_span,
            total_busy,
            avg_utilization: if util_count == 0 {
                0.0
            } else {
                util_sum / util_count as f64
            },
        }
    }

    /// Total servers of any tag.
    pub fn total_servers(&self) -> usize {
        self.ec2_servers + self.fargate_servers
    }
}
