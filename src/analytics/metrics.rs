//! Per-server time and usage metrics.

use serde::{Deserialize, Serialize};

use crate::models::{peak_usage, PeakUsage, Server, ServerTag, UsageEvent};

/// How long a server is alive and how much of that it is busy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerTimeMetrics {
    /// `last_end - first_start` (0 for an empty server).
    pub span: f64,
    /// Total time with at least one active job.
    pub busy: f64,
    /// Earliest job start.
    pub first_start: Option<f64>,
    /// Latest job end.
    pub last_end: Option<f64>,
}

impl ServerTimeMetrics {
    /// Computes span and busy time of a server.
    ///
    /// Busy time is swept over `(start, +1)` / `(end, -1)` events with
    /// ends ordered before starts at equal timestamps.
    pub fn calculate(server: &Server) -> Self {
        let jobs = server.jobs();
        if jobs.is_empty() {
            return Self::default();
        }

        let first_start = jobs.iter().map(|j| j.start).fold(f64::INFINITY, f64::min);
        let last_end = jobs.iter().map(|j| j.end).fold(f64::NEG_INFINITY, f64::max);

        let mut events: Vec<(f64, i8)> = jobs
            .iter()
            .flat_map(|j| [(j.start, 1), (j.end, -1)])
            .collect();
        events.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut busy = 0.0;
        let mut active: i64 = 0;
        let mut prev = events[0].0;
        for (time, delta) in events {
            if active > 0 {
                busy += time - prev;
            }
            active += i64::from(delta);
            prev = time;
        }

        Self {
            span: last_end - first_start,
            busy,
            first_start: Some(first_start),
            last_end: Some(last_end),
        }
    }

    /// Busy fraction of the span (`None` for a zero span).
    pub fn utilization(&self) -> Option<f64> {
        (self.span > 0.0).then(|| self.busy / self.span)
    }
}

/// Peak simultaneous CPU and memory usage, derived from the job schedule.
pub fn server_peak_usage(server: &Server) -> PeakUsage {
    let events: Vec<UsageEvent> = server
        .jobs()
        .iter()
        .flat_map(|j| {
            [
                UsageEvent::acquire(j.run_id, j.start, j.cpus, j.memory),
                UsageEvent::release(j.run_id, j.end, j.cpus, j.memory),
            ]
        })
        .collect();
    peak_usage(&events)
}

/// Number of servers with a given tag.
pub fn count_servers(servers: &[Server], tag: ServerTag) -> usize {
    servers.iter().filter(|s| s.tag == tag).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Run;

    #[test]
    fn test_time_metrics_back_to_back() {
        // Single-cpu server: run 1 waits for run 0 → [0,100) + [100,150)
        let mut s = Server::standard(0, 1.0, 1.0);
        assert!(s.add_run(&Run::new(0, 1.0, 1.0, 100.0)));
        assert!(s.add_run(&Run::new(1, 1.0, 1.0, 50.0)));
        let m = ServerTimeMetrics::calculate(&s);
        assert_eq!(m.first_start, Some(0.0));
        assert_eq!(m.last_end, Some(150.0));
        assert!((m.span - 150.0).abs() < 1e-10);
        assert!((m.busy - 150.0).abs() < 1e-10);
        assert!((m.utilization().unwrap() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_busy_counts_overlap_once() {
        let mut s = Server::standard(0, 3.0, 16.0);
        assert!(s.add_run(&Run::new(0, 1.0, 1.0, 100.0)));
        assert!(s.add_run(&Run::new(1, 1.0, 1.0, 60.0)));
        let m = ServerTimeMetrics::calculate(&s);
        assert!((m.busy - 100.0).abs() < 1e-10);
        assert!((m.span - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_zero_duration_jobs() {
        let mut s = Server::standard(0, 3.0, 16.0);
        assert!(s.add_run(&Run::new(0, 1.0, 1.0, 0.0)));
        let m = ServerTimeMetrics::calculate(&s);
        assert_eq!(m.span, 0.0);
        assert_eq!(m.busy, 0.0);
        assert_eq!(m.utilization(), None);
    }

    #[test]
    fn test_empty_server() {
        let m = ServerTimeMetrics::calculate(&Server::standard(0, 3.0, 16.0));
        assert_eq!(m, ServerTimeMetrics::default());
        assert_eq!(m.first_start, None);
    }

    #[test]
    fn test_peak_usage_matches_events() {
        let mut s = Server::standard(0, 3.0, 16.0);
        assert!(s.add_run(&Run::new(0, 2.0, 4.0, 100.0)));
        assert!(s.add_run(&Run::new(1, 1.0, 10.0, 50.0)));
        assert!(s.add_run(&Run::new(2, 3.0, 1.0, 10.0))); // waits for both
        let peak = server_peak_usage(&s);
        assert!((peak.cpus - 3.0).abs() < 1e-10);
        assert!((peak.memory - 14.0).abs() < 1e-10);
        assert_eq!(peak, s.peak_usage());
    }

    #[test]
    fn test_count_servers() {
        let servers = vec![
            Server::standard(0, 3.0, 16.0),
            Server::new(1, 4.0, 4.0, ServerTag::Fargate),
            Server::standard(2, 3.0, 16.0),
        ];
        assert_eq!(count_servers(&servers, ServerTag::Ec2), 2);
        assert_eq!(count_servers(&servers, ServerTag::Fargate), 1);
    }
}
