//! Run ingestion.
//!
//! Loads the job table (CSV with `cpus`, `mem`, `duration` and
//! `pipeline_name` columns) and the optional label allow-list.
//!
//! # Cleaning Rules
//! - `mem` may carry a `Gi` unit suffix, which is stripped.
//! - Rows whose `cpus`, `mem` or `duration` is missing or not a finite
//!   number are dropped and counted.
//! - A run's ID is its zero-based data row position in the file, so IDs
//!   stay stable when rows are dropped.

use std::collections::{BTreeSet, HashSet};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::models::{Run, RunId};

/// Memory unit suffix stripped from the `mem` column.
pub const MEMORY_UNIT_SUFFIX: &str = "Gi";

#[derive(Debug, Deserialize)]
struct RawRow {
    #[serde(default)]
    cpus: Option<String>,
    #[serde(default)]
    mem: Option<String>,
    #[serde(default)]
    duration: Option<String>,
    #[serde(default)]
    pipeline_name: Option<String>,
}

/// Runs loaded from a table, plus the number of rows dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedRuns {
    /// Rows that parsed cleanly, in file order.
    pub runs: Vec<Run>,
    /// Rows dropped for missing or non-numeric fields.
    pub dropped: usize,
}

/// Parses a finite number, ignoring surrounding whitespace.
fn parse_number(field: Option<&str>) -> Option<f64> {
    field?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parses a memory value, stripping a trailing `Gi`.
pub fn parse_memory(field: &str) -> Option<f64> {
    let trimmed = field.trim();
    let number = trimmed.strip_suffix(MEMORY_UNIT_SUFFIX).unwrap_or(trimmed);
    parse_number(Some(number))
}

/// Loads runs from CSV data with a header row.
///
/// Extra columns are ignored; a missing required column makes every row
/// invalid, so all rows are dropped.
pub fn load_runs_csv<R: Read>(reader: R) -> Result<LoadedRuns, IngestError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut loaded = LoadedRuns::default();
    for (row, record) in rdr.deserialize::<RawRow>().enumerate() {
        let record = record?;
        let cpus = parse_number(record.cpus.as_deref());
        let memory = record.mem.as_deref().and_then(parse_memory);
        let duration = parse_number(record.duration.as_deref());

        match (cpus, memory, duration) {
            (Some(cpus), Some(memory), Some(duration)) => {
                let run = Run::new(row as RunId, cpus, memory, duration)
                    .with_label(record.pipeline_name.unwrap_or_default());
                loaded.runs.push(run);
            }
            _ => {
                debug!(row, "dropping row with missing or non-numeric fields");
                loaded.dropped += 1;
            }
        }
    }

    if loaded.dropped > 0 {
        warn!(
            dropped = loaded.dropped,
            kept = loaded.runs.len(),
            "dropped rows with missing cpus/mem/duration"
        );
    }
    Ok(loaded)
}

/// Loads runs from a CSV file.
pub fn load_runs_file(path: impl AsRef<Path>) -> Result<LoadedRuns, IngestError> {
    let file = std::fs::File::open(path)?;
    load_runs_csv(file)
}

/// Parses a comma-separated label list.
///
/// Entries may be wrapped in single or double quotes. Empty entries are
/// skipped; the result is deduplicated and sorted.
pub fn parse_label_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(|name| {
            name.trim()
                .trim_matches('\'')
                .trim_matches('"')
                .to_string()
        })
        .filter(|name| !name.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Reads and parses a label list file.
pub fn read_label_file(path: impl AsRef<Path>) -> Result<Vec<String>, IngestError> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_label_list(&text))
}

/// Keeps only runs whose label is in `labels`.
pub fn filter_by_labels(runs: Vec<Run>, labels: &[String]) -> Vec<Run> {
    let allowed: HashSet<&str> = labels.iter().map(String::as_str).collect();
    runs.into_iter()
        .filter(|run| allowed.contains(run.label.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory() {
        assert_eq!(parse_memory("4Gi"), Some(4.0));
        assert_eq!(parse_memory(" 0.5Gi "), Some(0.5));
        assert_eq!(parse_memory("16"), Some(16.0));
        assert_eq!(parse_memory("Gi"), None);
        assert_eq!(parse_memory("lots"), None);
        assert_eq!(parse_memory("NaN"), None);
    }

    #[test]
    fn test_load_csv() {
        let data = "\
pipeline_name,cpus,mem,duration,status
etl,2,4Gi,100,ok
report,0.5,1.5Gi,30.5,ok
";
        let loaded = load_runs_csv(data.as_bytes()).unwrap();
        assert_eq!(loaded.dropped, 0);
        assert_eq!(loaded.runs.len(), 2);
        assert_eq!(loaded.runs[0], Run::new(0, 2.0, 4.0, 100.0).with_label("etl"));
        assert_eq!(loaded.runs[1].id, 1);
        assert!((loaded.runs[1].memory - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_drops_incomplete_rows() {
        let data = "\
pipeline_name,cpus,mem,duration
a,1,2Gi,10
b,,2Gi,10
c,1,abc,10
d,1,2Gi,
e,1,2Gi,20
";
        let loaded = load_runs_csv(data.as_bytes()).unwrap();
        assert_eq!(loaded.dropped, 3);
        let ids: Vec<RunId> = loaded.runs.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 4]); // row positions survive dropping
    }

    #[test]
    fn test_missing_column_drops_all() {
        let data = "pipeline_name,cpus,duration\na,1,10\n";
        let loaded = load_runs_csv(data.as_bytes()).unwrap();
        assert!(loaded.runs.is_empty());
        assert_eq!(loaded.dropped, 1);
    }

    #[test]
    fn test_negative_duration_is_kept() {
        // Numeric but invalid: ingestion keeps it, packing rejects it
        let data = "pipeline_name,cpus,mem,duration\na,1,1Gi,-5\n";
        let loaded = load_runs_csv(data.as_bytes()).unwrap();
        assert_eq!(loaded.runs.len(), 1);
        assert!((loaded.runs[0].duration + 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_parse_label_list() {
        let labels = parse_label_list("'etl', \"report\",  'etl' ,, nightly\n");
        assert_eq!(labels, vec!["etl", "nightly", "report"]);
        assert!(parse_label_list("  ").is_empty());
    }

    #[test]
    fn test_filter_by_labels() {
        let runs = vec![
            Run::new(0, 1.0, 1.0, 1.0).with_label("etl"),
            Run::new(1, 1.0, 1.0, 1.0).with_label("adhoc"),
            Run::new(2, 1.0, 1.0, 1.0).with_label("report"),
        ];
        let kept = filter_by_labels(runs, &["etl".into(), "report".into()]);
        let ids: Vec<RunId> = kept.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 2]);
    }
}
