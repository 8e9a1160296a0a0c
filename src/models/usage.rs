//! Interval/event model of resource usage.
//!
//! Each scheduled run contributes two [`UsageEvent`]s: a positive delta
//! at its start and a negative delta at its end. Sorting and sweeping the
//! events yields a piecewise-constant usage profile made of [`Segment`]s.
//!
//! # Algorithm
//!
//! 1. Sort events by time (stable).
//! 2. Coalesce events sharing a timestamp by summing their deltas.
//! 3. Sweep in time order, accumulating usage; each pair of consecutive
//!    distinct timestamps bounds one segment. The last segment is open.
//!
//! # Complexity
//! O(e log e) where e = number of events.

use serde::{Deserialize, Serialize};

use super::RunId;

/// A resource delta at a point in time, owned by one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Run that produced this event.
    pub run_id: RunId,
    /// Event time (seconds).
    pub time: f64,
    /// CPU delta (positive at start, negative at end).
    pub delta_cpus: f64,
    /// Memory delta (positive at start, negative at end).
    pub delta_memory: f64,
}

impl UsageEvent {
    /// Resource acquisition at `time`.
    pub fn acquire(run_id: RunId, time: f64, cpus: f64, memory: f64) -> Self {
        Self {
            run_id,
            time,
            delta_cpus: cpus,
            delta_memory: memory,
        }
    }

    /// Resource release at `time`.
    pub fn release(run_id: RunId, time: f64, cpus: f64, memory: f64) -> Self {
        Self {
            run_id,
            time,
            delta_cpus: -cpus,
            delta_memory: -memory,
        }
    }
}

/// A maximal half-open interval `[start, end)` of constant usage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment start (inclusive).
    pub start: f64,
    /// Segment end (exclusive). `None` = open-ended.
    pub end: Option<f64>,
    /// Aggregate CPU usage over the segment.
    pub used_cpus: f64,
    /// Aggregate memory usage over the segment.
    pub used_memory: f64,
}

impl Segment {
    /// Whether this segment intersects `[start, end)`.
    #[inline]
    pub fn overlaps(&self, start: f64, end: f64) -> bool {
        self.start < end && self.end.map_or(true, |e| e > start)
    }
}

/// Peak resource usage; the two maxima need not co-occur.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakUsage {
    /// Highest simultaneous CPU usage.
    pub cpus: f64,
    /// Highest simultaneous memory usage.
    pub memory: f64,
}

/// Builds the piecewise-constant usage profile of a set of events.
///
/// Returns an empty profile when there are no events.
pub fn build_usage_profile(events: &[UsageEvent]) -> Vec<Segment> {
    let mut sorted: Vec<&UsageEvent> = events.iter().collect();
    sorted.sort_by(|a, b| a.time.total_cmp(&b.time));

    // Coalesce same-time deltas
    let mut coalesced: Vec<(f64, f64, f64)> = Vec::with_capacity(sorted.len());
    for event in sorted {
        match coalesced.last_mut() {
            Some(last) if last.0 == event.time => {
                last.1 += event.delta_cpus;
                last.2 += event.delta_memory;
            }
            _ => coalesced.push((event.time, event.delta_cpus, event.delta_memory)),
        }
    }

    let mut segments = Vec::with_capacity(coalesced.len());
    let mut used_cpus = 0.0;
    let mut used_memory = 0.0;
    for (i, &(time, dc, dm)) in coalesced.iter().enumerate() {
        used_cpus += dc;
        used_memory += dm;
        segments.push(Segment {
            start: time,
            end: coalesced.get(i + 1).map(|next| next.0),
            used_cpus,
            used_memory,
        });
    }
    segments
}

/// Maximum CPU and memory usage over the profile of `events`.
pub fn peak_usage(events: &[UsageEvent]) -> PeakUsage {
    build_usage_profile(events)
        .iter()
        .fold(PeakUsage::default(), |peak, seg| PeakUsage {
            cpus: peak.cpus.max(seg.used_cpus),
            memory: peak.memory.max(seg.used_memory),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_events(run_id: RunId, start: f64, end: f64, cpus: f64, mem: f64) -> [UsageEvent; 2] {
        [
            UsageEvent::acquire(run_id, start, cpus, mem),
            UsageEvent::release(run_id, end, cpus, mem),
        ]
    }

    #[test]
    fn test_empty_profile() {
        assert!(build_usage_profile(&[]).is_empty());
        assert_eq!(peak_usage(&[]), PeakUsage::default());
    }

    #[test]
    fn test_single_job_profile() {
        let events = job_events(0, 0.0, 100.0, 2.0, 4.0);
        let segs = build_usage_profile(&events);
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0].start, 0.0);
        assert_eq!(segs[0].end, Some(100.0));
        assert!((segs[0].used_cpus - 2.0).abs() < 1e-10);
        assert_eq!(segs[1].start, 100.0);
        assert_eq!(segs[1].end, None); // open tail
        assert!(segs[1].used_cpus.abs() < 1e-10);
    }

    #[test]
    fn test_coalesce_shared_timestamp() {
        // A ends at 50 exactly when B starts → one boundary, not two
        let mut events = Vec::new();
        events.extend(job_events(0, 0.0, 50.0, 2.0, 4.0));
        events.extend(job_events(1, 50.0, 80.0, 1.0, 8.0));
        let segs = build_usage_profile(&events);
        let starts: Vec<f64> = segs.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0.0, 50.0, 80.0]);
        assert!((segs[1].used_cpus - 1.0).abs() < 1e-10);
        assert!((segs[1].used_memory - 8.0).abs() < 1e-10);
    }

    #[test]
    fn test_unsorted_events() {
        let mut events = Vec::new();
        events.extend(job_events(1, 30.0, 60.0, 1.0, 1.0));
        events.extend(job_events(0, 0.0, 40.0, 1.0, 1.0));
        events.reverse();
        let segs = build_usage_profile(&events);
        let starts: Vec<f64> = segs.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0.0, 30.0, 40.0, 60.0]);
        assert!((segs[1].used_cpus - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_peak_independent_maxima() {
        // CPU peak in [0,10), memory peak in [20,30) → peaks don't co-occur
        let mut events = Vec::new();
        events.extend(job_events(0, 0.0, 10.0, 3.0, 1.0));
        events.extend(job_events(1, 20.0, 30.0, 1.0, 12.0));
        let peak = peak_usage(&events);
        assert!((peak.cpus - 3.0).abs() < 1e-10);
        assert!((peak.memory - 12.0).abs() < 1e-10);
    }

    #[test]
    fn test_segment_overlap() {
        let seg = Segment {
            start: 10.0,
            end: Some(20.0),
            used_cpus: 0.0,
            used_memory: 0.0,
        };
        assert!(seg.overlaps(15.0, 25.0));
        assert!(!seg.overlaps(20.0, 30.0)); // half-open
        assert!(!seg.overlaps(0.0, 10.0));
        let tail = Segment { end: None, ..seg };
        assert!(tail.overlaps(1_000.0, 2_000.0));
    }
}
