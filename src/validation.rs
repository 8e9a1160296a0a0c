//! Input validation and solution auditing.
//!
//! Checks run lists before packing and packed server sets afterwards.
//!
//! Input checks detect:
//! - Duplicate run IDs
//! - Negative durations and requirements
//! - Non-finite (NaN/infinite) values
//!
//! The audit re-derives every invariant of a packing from scratch:
//! - Capacity never exceeded at any instant
//! - `end == start + duration`, `start >= 0`
//! - Reuse-window bound while no long run has lifted it
//! - Dedicated servers host one run and are sized to it
//! - Two events per job, a consistent assignment map
//! - Oversized runs only on dedicated servers

use std::collections::{HashMap, HashSet};

use crate::models::{Run, Server, ServerSet, CAPACITY_EPSILON};
use crate::packing::BinPacker;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two runs share the same ID.
    DuplicateId,
    /// A run has a negative duration.
    NegativeDuration,
    /// A run requests negative CPUs or memory.
    NegativeRequirement,
    /// A run field is NaN or infinite.
    NonFinite,
    /// Aggregate usage exceeds server capacity.
    CapacityExceeded,
    /// A job's start/end are inconsistent with its duration.
    TimeInconsistent,
    /// A job starts after the server's reuse window closed.
    ReuseWindowExceeded,
    /// A dedicated server hosts more than one run or is mis-sized.
    DedicatedViolation,
    /// Usage events don't match the job list.
    EventMismatch,
    /// The assignment map disagrees with the servers.
    MappingMismatch,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

fn into_result(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates runs before packing.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_runs(runs: &[Run]) -> ValidationResult {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();

    for run in runs {
        if !ids.insert(run.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate run ID: {}", run.id),
            ));
        }

        if ![run.cpus, run.memory, run.duration]
            .iter()
            .all(|v| v.is_finite())
        {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonFinite,
                format!("Run {} has a non-finite field", run.id),
            ));
            continue;
        }

        if run.duration < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeDuration,
                format!("Run {} has negative duration: {}", run.id, run.duration),
            ));
        }

        if run.cpus < 0.0 || run.memory < 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NegativeRequirement,
                format!(
                    "Run {} requests negative resources (cpus={}, memory={})",
                    run.id, run.cpus, run.memory
                ),
            ));
        }
    }

    into_result(errors)
}

/// Audits a packed server set against all packing invariants.
pub fn audit_server_set(set: &ServerSet) -> ValidationResult {
    let mut errors = Vec::new();

    for (idx, server) in set.servers.iter().enumerate() {
        if server.id != idx {
            errors.push(ValidationError::new(
                ValidationErrorKind::MappingMismatch,
                format!("Server at position {idx} has id {}", server.id),
            ));
        }
        audit_capacity(server, &mut errors);
        audit_times(server, &mut errors);
        audit_reuse_window(server, &mut errors);
        audit_dedicated(server, &mut errors);
        audit_events(server, &mut errors);

        for job in server.jobs() {
            if set.server_index(job.run_id) != Some(idx) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::MappingMismatch,
                    format!(
                        "Run {} hosted on server {idx} but mapped to {:?}",
                        job.run_id,
                        set.server_index(job.run_id)
                    ),
                ));
            }
        }
    }

    if set.assignments.len() != set.job_count() {
        errors.push(ValidationError::new(
            ValidationErrorKind::MappingMismatch,
            format!(
                "{} assignments for {} scheduled jobs",
                set.assignments.len(),
                set.job_count()
            ),
        ));
    }

    into_result(errors)
}

/// Audits a set produced by `packer`, including oversized-run isolation.
pub fn audit_packing(set: &ServerSet, packer: &BinPacker) -> ValidationResult {
    let mut errors = audit_server_set(set).err().unwrap_or_default();

    for server in &set.servers {
        for job in server.jobs() {
            let oversized =
                job.cpus > packer.server_cpus() || job.memory > packer.server_memory();
            if oversized && !server.dedicated {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DedicatedViolation,
                    format!(
                        "Oversized run {} shares standard server {}",
                        job.run_id, server.id
                    ),
                ));
            }
        }
    }

    into_result(errors)
}

fn audit_capacity(server: &Server, errors: &mut Vec<ValidationError>) {
    for seg in server.usage_profile() {
        if seg.used_cpus > server.max_cpus + CAPACITY_EPSILON
            || seg.used_memory > server.max_memory + CAPACITY_EPSILON
        {
            errors.push(ValidationError::new(
                ValidationErrorKind::CapacityExceeded,
                format!(
                    "Server {} uses {}/{} CPUs, {}/{} memory at t={}",
                    server.id,
                    seg.used_cpus,
                    server.max_cpus,
                    seg.used_memory,
                    server.max_memory,
                    seg.start
                ),
            ));
        }
    }
}

fn audit_times(server: &Server, errors: &mut Vec<ValidationError>) {
    for job in server.jobs() {
        if job.start < 0.0 || (job.end - (job.start + job.duration)).abs() > CAPACITY_EPSILON {
            errors.push(ValidationError::new(
                ValidationErrorKind::TimeInconsistent,
                format!(
                    "Run {} has start={} duration={} end={}",
                    job.run_id, job.start, job.duration, job.end
                ),
            ));
        }
    }
}

fn audit_reuse_window(server: &Server, errors: &mut Vec<ValidationError>) {
    let (Some(window), Some(creation)) = (server.reuse_window, server.creation_time()) else {
        return;
    };
    if server.longest_duration() > window {
        return;
    }
    for job in server.jobs() {
        if job.start < creation || job.start > creation + window {
            errors.push(ValidationError::new(
                ValidationErrorKind::ReuseWindowExceeded,
                format!(
                    "Run {} starts at {} outside [{creation}, {}] on server {}",
                    job.run_id,
                    job.start,
                    creation + window,
                    server.id
                ),
            ));
        }
    }
}

fn audit_dedicated(server: &Server, errors: &mut Vec<ValidationError>) {
    if !server.dedicated {
        return;
    }
    match server.jobs() {
        [] => {}
        [job] => {
            if job.cpus != server.max_cpus || job.memory != server.max_memory {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DedicatedViolation,
                    format!(
                        "Dedicated server {} sized {}/{} for run needing {}/{}",
                        server.id, server.max_cpus, server.max_memory, job.cpus, job.memory
                    ),
                ));
            }
        }
        jobs => errors.push(ValidationError::new(
            ValidationErrorKind::DedicatedViolation,
            format!("Dedicated server {} hosts {} runs", server.id, jobs.len()),
        )),
    }
}

fn audit_events(server: &Server, errors: &mut Vec<ValidationError>) {
    let mut per_run: HashMap<u64, usize> = HashMap::new();
    for event in server.events() {
        *per_run.entry(event.run_id).or_insert(0) += 1;
    }
    let consistent = per_run.len() == server.run_count()
        && server
            .jobs()
            .iter()
            .all(|job| per_run.get(&job.run_id) == Some(&2));
    if !consistent {
        errors.push(ValidationError::new(
            ValidationErrorKind::EventMismatch,
            format!(
                "Server {} has {} events for {} jobs",
                server.id,
                server.events().len(),
                server.run_count()
            ),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_runs() {
        let runs = vec![Run::new(0, 1.0, 2.0, 10.0), Run::new(1, 0.0, 0.0, 0.0)];
        assert!(validate_runs(&runs).is_ok());
    }

    #[test]
    fn test_duplicate_run_id() {
        let runs = vec![Run::new(0, 1.0, 2.0, 10.0), Run::new(0, 1.0, 2.0, 10.0)];
        let errors = validate_runs(&runs).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId));
    }

    #[test]
    fn test_negative_fields() {
        let runs = vec![Run::new(0, 1.0, 2.0, -1.0), Run::new(1, -1.0, 2.0, 10.0)];
        let errors = validate_runs(&runs).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::NegativeDuration));
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::NegativeRequirement));
    }

    #[test]
    fn test_non_finite() {
        let runs = vec![Run::new(0, f64::NAN, 2.0, 10.0)];
        let errors = validate_runs(&runs).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::NonFinite);
    }

    #[test]
    fn test_audit_clean_packing() {
        let runs = vec![
            Run::new(0, 2.0, 4.0, 100.0),
            Run::new(1, 2.0, 4.0, 100.0),
            Run::new(2, 1.0, 2.0, 50.0),
            Run::new(3, 6.0, 4.0, 10.0),
        ];
        let packer = BinPacker::new(3.0, 16.0).with_reuse_window(Some(3600.0));
        let set = packer.pack(&runs).unwrap();
        assert!(audit_packing(&set, &packer).is_ok());
    }

    #[test]
    fn test_audit_accepts_fractional_exact_fill() {
        let runs: Vec<Run> = (0..30).map(|id| Run::new(id, 0.1, 0.5, 100.0)).collect();
        let packer = BinPacker::new(3.0, 16.0);
        let set = packer.pack(&runs).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.jobs().all(|j| j.start == 0.0));
        assert!(audit_packing(&set, &packer).is_ok());
    }

    #[test]
    fn test_audit_detects_mapping_mismatch() {
        let mut set = BinPacker::new(3.0, 16.0)
            .pack(&[Run::new(0, 1.0, 1.0, 1.0)])
            .unwrap();
        set.assignments.insert(0, 5);
        let errors = audit_server_set(&set).unwrap_err();
        assert!(errors
            .iter()
            .all(|e| e.kind == ValidationErrorKind::MappingMismatch));
    }

    #[test]
    fn test_audit_detects_missing_assignment() {
        let mut set = BinPacker::new(3.0, 16.0)
            .pack(&[Run::new(0, 1.0, 1.0, 1.0), Run::new(1, 1.0, 1.0, 1.0)])
            .unwrap();
        set.assignments.remove(&1);
        assert!(audit_server_set(&set).is_err());
    }

    #[test]
    fn test_audit_detects_oversized_on_standard() {
        // A 4-cpu run packed for 8-cpu servers is oversized for a 3-cpu audit
        let wide = BinPacker::new(8.0, 16.0);
        let set = wide.pack(&[Run::new(0, 4.0, 1.0, 1.0)]).unwrap();
        assert!(audit_packing(&set, &wide).is_ok());
        let errors = audit_packing(&set, &BinPacker::new(3.0, 16.0)).unwrap_err();
        assert_eq!(errors[0].kind, ValidationErrorKind::DedicatedViolation);
    }
}
