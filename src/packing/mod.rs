//! Two-phase server packing.
//!
//! Provides a first-fit greedy packer and a backward compactor that
//! consolidates its output.
//!
//! # Algorithm
//!
//! [`BinPacker`] places runs in arrival order, each at the earliest
//! feasible start on the first server that can take it. Its result is
//! order-dependent and leaves gaps; [`compact`] then walks servers
//! backwards and moves runs onto earlier servers, deleting servers that
//! empty out. The two phases are independent: compaction accepts any
//! valid server set.
//!
//! # References
//!
//! - Johnson (1974), "Fast algorithms for bin packing"
//! - Coffman, Garey & Johnson (1983), "Dynamic bin packing", SIAM J. Comput.

mod compact;
mod greedy;

pub use compact::compact;
pub use greedy::BinPacker;
