//! Server model.
//!
//! A server is a simulated resource container with fixed CPU and memory
//! capacity. It hosts scheduled runs over time and answers the central
//! feasibility question: *what is the earliest time a run of this size
//! and duration can start here without exceeding capacity?*
//!
//! # Reuse Window
//!
//! A server may only accept new runs within `reuse_window` seconds of its
//! creation (the start of its first run). The bound is lifted for good as
//! soon as any run longer than the window has been assigned to it.
//!
//! # Reference
//! Coffman et al. (2013), "Bin Packing Approximation Algorithms:
//! Survey and Classification", Sec. 5 (dynamic bin packing)

use std::fmt;

use serde::{Deserialize, Serialize};

use super::usage::{build_usage_profile, peak_usage, PeakUsage, Segment, UsageEvent};
use super::{Run, RunId};

/// Slack allowed when comparing summed usage against capacity.
pub const CAPACITY_EPSILON: f64 = 1e-9;

/// Server class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerTag {
    /// Reusable general-purpose instance.
    Ec2,
    /// Single-run instance sized to its run.
    Fargate,
}

impl ServerTag {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerTag::Ec2 => "ec2",
            ServerTag::Fargate => "fargate",
        }
    }
}

impl fmt::Display for ServerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run placed on a server at a concrete time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJob {
    /// Placed run.
    pub run_id: RunId,
    /// Run label.
    pub label: String,
    /// CPU requirement.
    pub cpus: f64,
    /// Memory requirement.
    pub memory: f64,
    /// Start time (seconds).
    pub start: f64,
    /// Duration (seconds).
    pub duration: f64,
    /// End time: `start + duration`.
    pub end: f64,
}

impl ScheduledJob {
    fn new(run: &Run, start: f64) -> Self {
        Self {
            run_id: run.id,
            label: run.label.clone(),
            cpus: run.cpus,
            memory: run.memory,
            start,
            duration: run.duration,
            end: start + run.duration,
        }
    }

    /// Reconstructs the run this job was placed from.
    pub fn to_run(&self) -> Run {
        Run::new(self.run_id, self.cpus, self.memory, self.duration).with_label(self.label.clone())
    }
}

/// A simulated server hosting scheduled runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Position in the owning server set.
    pub id: usize,
    /// CPU capacity.
    pub max_cpus: f64,
    /// Memory capacity.
    pub max_memory: f64,
    /// Server class.
    pub tag: ServerTag,
    /// Restricted to a single run.
    pub dedicated: bool,
    /// Seconds after creation during which new runs may start. `None` = unbounded.
    pub reuse_window: Option<f64>,
    creation_time: Option<f64>,
    longest_duration: f64,
    events: Vec<UsageEvent>,
    jobs: Vec<ScheduledJob>,
}

impl Server {
    /// Creates an empty server.
    pub fn new(id: usize, max_cpus: f64, max_memory: f64, tag: ServerTag) -> Self {
        Self {
            id,
            max_cpus,
            max_memory,
            tag,
            dedicated: false,
            reuse_window: None,
            creation_time: None,
            longest_duration: 0.0,
            events: Vec::new(),
            jobs: Vec::new(),
        }
    }

    /// Creates a reusable `ec2` server.
    pub fn standard(id: usize, max_cpus: f64, max_memory: f64) -> Self {
        Self::new(id, max_cpus, max_memory, ServerTag::Ec2)
    }

    /// Creates a dedicated `fargate` server sized exactly to `run`.
    pub fn dedicated_for(id: usize, run: &Run) -> Self {
        Self::new(id, run.cpus, run.memory, ServerTag::Fargate).with_dedicated(true)
    }

    /// Restricts the server to a single run.
    pub fn with_dedicated(mut self, dedicated: bool) -> Self {
        self.dedicated = dedicated;
        self
    }

    /// Sets the reuse window (seconds).
    pub fn with_reuse_window(mut self, reuse_window: Option<f64>) -> Self {
        self.reuse_window = reuse_window;
        self
    }

    /// Start time of the first run placed. `None` until then.
    pub fn creation_time(&self) -> Option<f64> {
        self.creation_time
    }

    /// Longest duration ever assigned to this server.
    pub fn longest_duration(&self) -> f64 {
        self.longest_duration
    }

    /// Scheduled jobs in placement order.
    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// Usage events in placement order.
    pub fn events(&self) -> &[UsageEvent] {
        &self.events
    }

    /// Finds the job for a run.
    pub fn job(&self, run_id: RunId) -> Option<&ScheduledJob> {
        self.jobs.iter().find(|j| j.run_id == run_id)
    }

    /// Number of hosted runs.
    pub fn run_count(&self) -> usize {
        self.jobs.len()
    }

    /// Whether the server hosts no runs.
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Piecewise-constant usage profile.
    pub fn usage_profile(&self) -> Vec<Segment> {
        build_usage_profile(&self.events)
    }

    /// Peak CPU and memory usage over the server's lifetime.
    pub fn peak_usage(&self) -> PeakUsage {
        peak_usage(&self.events)
    }

    /// Finds the earliest feasible start time for a run.
    ///
    /// # Algorithm
    /// 1. Reject negative durations and requirements beyond capacity.
    /// 2. An empty server accepts at t=0.
    /// 3. Candidate starts are the creation time and every segment
    ///    boundary, restricted to `[creation, creation + reuse_window]`
    ///    unless the reuse cap is lifted.
    /// 4. Each candidate, in ascending order, is checked against every
    ///    segment overlapping `[start, start + duration)`. The first that
    ///    never exceeds capacity wins.
    ///
    /// # Complexity
    /// O(s²) where s = number of segments.
    pub fn can_fit(&self, cpus: f64, memory: f64, duration: f64) -> Option<f64> {
        if duration < 0.0 || cpus > self.max_cpus || memory > self.max_memory {
            return None;
        }

        let creation = match self.creation_time {
            Some(t) if !self.jobs.is_empty() => t,
            _ => return Some(0.0),
        };

        let segments = self.usage_profile();
        let (lower, upper) = self.start_window(creation, duration);

        let mut candidates: Vec<f64> = std::iter::once(creation)
            .chain(segments.iter().map(|s| s.start))
            .filter(|&t| t >= lower && t <= upper)
            .collect();
        candidates.sort_by(f64::total_cmp);
        candidates.dedup();

        candidates
            .into_iter()
            .find(|&start| self.hosts_over(&segments, start, start + duration, cpus, memory))
    }

    /// Admissible start interval for a run of `duration`.
    fn start_window(&self, creation: f64, duration: f64) -> (f64, f64) {
        let upper = match self.reuse_window {
            Some(window) if self.longest_duration.max(duration) <= window => creation + window,
            _ => f64::INFINITY,
        };
        (creation, upper)
    }

    /// Whether every segment overlapping `[start, end)` has room left.
    ///
    /// Segments are sorted, so the walk stops at the first one beginning
    /// at or after `end`. Idle gaps and the open tail only ever hold the
    /// candidate itself, which already fits the capacity.
    fn hosts_over(
        &self,
        segments: &[Segment],
        start: f64,
        end: f64,
        cpus: f64,
        memory: f64,
    ) -> bool {
        for seg in segments {
            if seg.start >= end {
                break;
            }
            if !seg.overlaps(start, end) {
                continue;
            }
            if seg.used_cpus + cpus > self.max_cpus + CAPACITY_EPSILON
                || seg.used_memory + memory > self.max_memory + CAPACITY_EPSILON
            {
                return false;
            }
        }
        true
    }

    /// Places a run at its earliest feasible start.
    ///
    /// Returns `false` (leaving the server untouched) if the server is
    /// dedicated and occupied, or if no feasible start exists.
    pub fn add_run(&mut self, run: &Run) -> bool {
        if self.dedicated && !self.jobs.is_empty() {
            return false;
        }
        let Some(start) = self.can_fit(run.cpus, run.memory, run.duration) else {
            return false;
        };

        let job = ScheduledJob::new(run, start);
        if self.jobs.is_empty() {
            self.creation_time = Some(start);
        }
        self.longest_duration = self.longest_duration.max(run.duration);
        self.events
            .push(UsageEvent::acquire(run.id, job.start, run.cpus, run.memory));
        self.events
            .push(UsageEvent::release(run.id, job.end, run.cpus, run.memory));
        self.jobs.push(job);
        true
    }

    /// Removes a run and both of its events.
    ///
    /// Returns the removed job, or `None` if the run is not hosted here.
    /// The longest-duration record is kept, so a lifted reuse cap stays lifted.
    pub fn remove_run(&mut self, run_id: RunId) -> Option<ScheduledJob> {
        let pos = self.jobs.iter().position(|j| j.run_id == run_id)?;
        let job = self.jobs.remove(pos);
        self.events.retain(|e| e.run_id != run_id);
        if self.jobs.is_empty() {
            self.creation_time = None;
        }
        Some(job)
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let peak = self.peak_usage();
        write!(
            f,
            "[{}] Server {}: {} runs, peak usage {}/{} CPUs, {:.1}/{} memory",
            self.tag,
            self.id,
            self.jobs.len(),
            peak.cpus,
            self.max_cpus,
            peak.memory,
            self.max_memory
        )
    }
}
