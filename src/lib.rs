//! Resource-aware batch capacity planning.
//!
//! Packs batch runs (CPU, memory, duration) onto a fleet of fixed-size
//! servers over simulated time, and estimates how many servers a workload
//! needs. Runs too large for a standard server get a dedicated server of
//! their own.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Run`, `Server`, `ScheduledJob`,
//!   `ServerSet`, usage events and the piecewise usage profile
//! - **`packing`**: First-fit greedy packer and the post-pass compactor
//! - **`analytics`**: Peak concurrency, server span/busy time, peak usage, KPIs
//! - **`simulation`**: Monte Carlo repacking under random orderings
//! - **`validation`**: Input checks and packing audits
//! - **`ingest`**: CSV run loading and label filtering
//! - **`config`**: TOML configuration
//! - **`error`**: Error types
//!
//! # Example
//!
//! ```
//! use u_capacity::models::{Run, ServerTag};
//! use u_capacity::packing::BinPacker;
//!
//! let runs = vec![
//!     Run::new(0, 2.0, 4.0, 3600.0),
//!     Run::new(1, 1.0, 8.0, 1800.0),
//!     Run::new(2, 6.0, 32.0, 600.0), // needs a dedicated server
//! ];
//! let set = BinPacker::new(3.0, 16.0).pack(&runs).unwrap();
//! assert_eq!(set.count_by_tag(ServerTag::Ec2), 1);
//! assert_eq!(set.count_by_tag(ServerTag::Fargate), 1);
//! ```
//!
//! # References
//!
//! - Pinedo (2016), "Scheduling: Theory, Algorithms, and Systems"
//! - Coffman, Garey & Johnson (1996), "Approximation Algorithms for Bin Packing: A Survey"

pub mod analytics;
pub mod config;
pub mod error;
pub mod ingest;
pub mod models;
pub mod packing;
pub mod simulation;
pub mod validation;
