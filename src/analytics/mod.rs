//! Schedule analytics.
//!
//! Derives summary statistics from a completed packing: fleet-wide job
//! concurrency, per-server span/busy time and peak usage, and fleet KPIs.
//!
//! # Concurrency
//!
//! "Concurrency" here is a modeled property: the number of simulated jobs
//! whose `[start, end)` intervals overlap at an instant.

mod concurrency;
mod kpi;
mod metrics;

pub use concurrency::{max_concurrent_jobs, ConcurrencyPoint, ConcurrencyProfile};
pub use kpi::FleetKpi;
pub use metrics::{count_servers, server_peak_usage, ServerTimeMetrics};
