//! Backward compaction of a packed server set.
//!
//! # Algorithm
//!
//! 1. Walk servers from last to first, skipping server 0.
//! 2. Walk the current server's runs from last to first; re-place each
//!    on the earliest lower-indexed server that accepts it, then remove
//!    it from the current server.
//! 3. Delete the current server if it ended up empty, shifting every
//!    assignment above it down by one.
//! 4. Renumber server ids to their positions.
//!
//! Relocated runs go through the target's normal feasibility search, so
//! capacity and reuse-window rules hold exactly as after packing. A
//! relocated run may get a different start time; its requirements and
//! duration never change.
//!
//! # Complexity
//! O(k² * n * s²) worst case where k=servers, n=runs per server,
//! s=segments per server.

use tracing::debug;

use crate::models::ServerSet;

/// Consolidates runs onto earlier servers, returning a new set.
///
/// The input is left untouched. The result never has more servers than
/// the input and hosts exactly the same runs.
pub fn compact(set: &ServerSet) -> ServerSet {
    let mut servers = set.servers.clone();
    let mut assignments = set.assignments.clone();
    let mut moved = 0usize;
    let mut removed = 0usize;

    let mut idx = servers.len().saturating_sub(1);
    while idx > 0 {
        let mut pos = servers[idx].run_count();
        while pos > 0 {
            pos -= 1;
            let run = servers[idx].jobs()[pos].to_run();
            let (earlier, rest) = servers.split_at_mut(idx);

            let mut target = None;
            for (t, server) in earlier.iter_mut().enumerate() {
                if server.add_run(&run) {
                    target = Some(t);
                    break;
                }
            }

            if let Some(t) = target {
                rest[0].remove_run(run.id);
                assignments.insert(run.id, t);
                moved += 1;
            }
        }

        if servers[idx].is_empty() {
            servers.remove(idx);
            for server_idx in assignments.values_mut() {
                if *server_idx > idx {
                    *server_idx -= 1;
                }
            }
            removed += 1;
        }
        idx -= 1;
    }

    for (i, server) in servers.iter_mut().enumerate() {
        server.id = i;
    }

    debug!(moved, removed, servers = servers.len(), "compaction finished");
    ServerSet {
        servers,
        assignments,
    }
}
