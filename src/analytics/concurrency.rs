//! Fleet-wide job concurrency.
//!
//! # Algorithm
//! Every scheduled job contributes `(start, +1)` and `(end, -1)`. Events
//! are sorted by time with ends before starts at equal timestamps, so a
//! job ending exactly when another begins never counts as overlap. A
//! sweep tracks the running count and its peak. Zero-length jobs cover an
//! empty interval and are never active, so they add no timeline points
//! either; the peak is the same as with their `+1`/`-1` pair included.

use serde::{Deserialize, Serialize};

use crate::models::{Server, ServerTag};

/// Number of active jobs right after an event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConcurrencyPoint {
    /// Event time.
    pub time: f64,
    /// Active jobs after applying the event.
    pub active: usize,
}

/// Result of a concurrency sweep.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConcurrencyProfile {
    /// Highest number of simultaneously active jobs.
    pub max_concurrent_jobs: usize,
    /// First time the peak is reached (0 when there are no jobs).
    pub peak_time: f64,
    /// Running count after every event, in sweep order.
    pub timeline: Vec<ConcurrencyPoint>,
}

/// Computes the peak number of concurrent jobs across servers.
///
/// Servers whose tag is in `skip_tags` are ignored (e.g. `Fargate`).
pub fn max_concurrent_jobs(servers: &[Server], skip_tags: &[ServerTag]) -> ConcurrencyProfile {
    let mut events: Vec<(f64, i8)> = servers
        .iter()
        .filter(|s| !skip_tags.contains(&s.tag))
        .flat_map(|s| s.jobs().iter())
        .filter(|job| job.end > job.start)
        .flat_map(|job| [(job.start, 1), (job.end, -1)])
        .collect();

    if events.is_empty() {
        return ConcurrencyProfile::default();
    }

    events.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut current: usize = 0;
    let mut profile = ConcurrencyProfile {
        timeline: Vec::with_capacity(events.len()),
        ..ConcurrencyProfile::default()
    };
    for (time, delta) in events {
        if delta > 0 {
            current += 1;
        } else {
            current = current.saturating_sub(1);
        }
        profile.timeline.push(ConcurrencyPoint {
            time,
            active: current,
        });
        if current > profile.max_concurrent_jobs {
            profile.max_concurrent_jobs = current;
            profile.peak_time = time;
        }
    }
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Run;

    fn server_with(tag: ServerTag, runs: &[Run]) -> Server {
        let mut s = Server::new(0, 100.0, 100.0, tag);
        for r in runs {
            assert!(s.add_run(r));
        }
        s
    }

    #[test]
    fn test_disjoint_jobs() {
        // A [0,100) on its own; B waits for a full server → [100,150)
        let mut s = Server::standard(0, 1.0, 1.0);
        assert!(s.add_run(&Run::new(0, 1.0, 1.0, 100.0)));
        assert!(s.add_run(&Run::new(1, 1.0, 1.0, 50.0)));
        let profile = max_concurrent_jobs(&[s], &[]);
        assert_eq!(profile.max_concurrent_jobs, 1);
        assert_eq!(profile.peak_time, 0.0);
    }

    #[test]
    fn test_overlapping_jobs() {
        let s = server_with(
            ServerTag::Ec2,
            &[Run::new(0, 1.0, 1.0, 100.0), Run::new(1, 1.0, 1.0, 50.0)],
        );
        let profile = max_concurrent_jobs(&[s], &[]);
        assert_eq!(profile.max_concurrent_jobs, 2);
        assert_eq!(profile.timeline.len(), 4);
        assert_eq!(profile.timeline.last().map(|p| p.active), Some(0));
    }

    #[test]
    fn test_across_servers_and_skip_tags() {
        let a = server_with(ServerTag::Ec2, &[Run::new(0, 1.0, 1.0, 100.0)]);
        let b = server_with(ServerTag::Ec2, &[Run::new(1, 1.0, 1.0, 100.0)]);
        let c = server_with(ServerTag::Fargate, &[Run::new(2, 1.0, 1.0, 100.0)]);
        let servers = vec![a, b, c];
        assert_eq!(max_concurrent_jobs(&servers, &[]).max_concurrent_jobs, 3);
        assert_eq!(
            max_concurrent_jobs(&servers, &[ServerTag::Fargate]).max_concurrent_jobs,
            2
        );
    }

    #[test]
    fn test_end_before_start_tie_break() {
        // Server a: [0,100); server b: [0,100) then [100,200)
        let a = server_with(ServerTag::Ec2, &[Run::new(0, 1.0, 1.0, 100.0)]);
        let mut b = Server::standard(1, 1.0, 1.0);
        assert!(b.add_run(&Run::new(1, 1.0, 1.0, 100.0)));
        assert!(b.add_run(&Run::new(2, 1.0, 1.0, 100.0)));
        assert_eq!(b.job(2).unwrap().start, 100.0);
        let profile = max_concurrent_jobs(&[a, b], &[]);
        assert_eq!(profile.max_concurrent_jobs, 2);
        // At t=100 both ends apply before the start → count dips to 0 then 1
        let at_100: Vec<usize> = profile
            .timeline
            .iter()
            .filter(|p| p.time == 100.0)
            .map(|p| p.active)
            .collect();
        assert_eq!(at_100, vec![1, 0, 1]);
    }

    #[test]
    fn test_zero_length_jobs_ignored() {
        let s = server_with(
            ServerTag::Ec2,
            &[Run::new(0, 1.0, 1.0, 0.0), Run::new(1, 1.0, 1.0, 0.0)],
        );
        let profile = max_concurrent_jobs(&[s], &[]);
        assert_eq!(profile.max_concurrent_jobs, 0);
        assert!(profile.timeline.is_empty());
    }

    #[test]
    fn test_empty() {
        let profile = max_concurrent_jobs(&[], &[]);
        assert_eq!(profile, ConcurrencyProfile::default());
    }
}
