//! Capacity-planning domain models.
//!
//! Provides the core data types for packing runs onto servers and for
//! reasoning about their resource usage over time.
//!
//! # Domain Mappings
//!
//! | u-capacity | Batch platform | CI fleet | Render farm |
//! |------------|----------------|----------|-------------|
//! | Run | Pipeline run | Build job | Frame batch |
//! | Server | EC2 / Fargate task | Runner VM | Render node |
//! | ServerSet | Fleet plan | Runner pool | Farm allocation |

mod run;
mod server;
mod server_set;
pub mod usage;

pub use run::{Run, RunId, RunTotals};
pub use server::{ScheduledJob, Server, ServerTag, CAPACITY_EPSILON};
pub use server_set::ServerSet;
pub use usage::{build_usage_profile, peak_usage, PeakUsage, Segment, UsageEvent};
