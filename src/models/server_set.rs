//! Server set (packing solution) model.
//!
//! An ordered list of servers plus the `run → server index` map. Server
//! order is creation order; the packer's first-fit and the compactor's
//! "move to an earlier server" both rely on it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{RunId, ScheduledJob, Server, ServerTag};

/// A complete packing of runs onto servers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSet {
    /// Servers in creation order; `servers[i].id == i`.
    pub servers: Vec<Server>,
    /// Run → index into `servers`.
    pub assignments: HashMap<RunId, usize>,
}

impl ServerSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from servers, deriving the assignment map from their jobs.
    ///
    /// Server ids are renumbered to their positions.
    pub fn from_servers(mut servers: Vec<Server>) -> Self {
        let mut assignments = HashMap::new();
        for (idx, server) in servers.iter_mut().enumerate() {
            server.id = idx;
            for job in server.jobs() {
                assignments.insert(job.run_id, idx);
            }
        }
        Self {
            servers,
            assignments,
        }
    }

    /// Appends a server, returning its index.
    pub fn push(&mut self, mut server: Server) -> usize {
        let idx = self.servers.len();
        server.id = idx;
        for job in server.jobs() {
            self.assignments.insert(job.run_id, idx);
        }
        self.servers.push(server);
        idx
    }

    /// Number of servers.
    pub fn len(&self) -> usize {
        self.servers.len()
    }

    /// Whether there are no servers.
    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Index of the server hosting a run.
    pub fn server_index(&self, run_id: RunId) -> Option<usize> {
        self.assignments.get(&run_id).copied()
    }

    /// The server hosting a run.
    pub fn server_for(&self, run_id: RunId) -> Option<&Server> {
        self.server_index(run_id).and_then(|idx| self.servers.get(idx))
    }

    /// The scheduled job of a run.
    pub fn job(&self, run_id: RunId) -> Option<&ScheduledJob> {
        self.server_for(run_id).and_then(|s| s.job(run_id))
    }

    /// Number of servers with a given tag.
    pub fn count_by_tag(&self, tag: ServerTag) -> usize {
        self.servers.iter().filter(|s| s.tag == tag).count()
    }

    /// All scheduled jobs across servers.
    pub fn jobs(&self) -> impl Iterator<Item = &ScheduledJob> {
        self.servers.iter().flat_map(|s| s.jobs().iter())
    }

    /// Total number of scheduled jobs.
    pub fn job_count(&self) -> usize {
        self.servers.iter().map(Server::run_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Run;

    fn sample_set() -> ServerSet {
        let mut a = Server::standard(0, 3.0, 16.0);
        assert!(a.add_run(&Run::new(10, 1.0, 1.0, 10.0)));
        assert!(a.add_run(&Run::new(11, 1.0, 1.0, 10.0)));
        let big = Run::new(12, 8.0, 32.0, 10.0);
        let mut b = Server::dedicated_for(0, &big);
        assert!(b.add_run(&big));
        ServerSet::from_servers(vec![a, b])
    }

    #[test]
    fn test_from_servers_builds_map() {
        let set = sample_set();
        assert_eq!(set.len(), 2);
        assert_eq!(set.servers[1].id, 1);
        assert_eq!(set.server_index(10), Some(0));
        assert_eq!(set.server_index(12), Some(1));
        assert_eq!(set.server_index(99), None);
        assert_eq!(set.job_count(), 3);
    }

    #[test]
    fn test_count_by_tag() {
        let set = sample_set();
        assert_eq!(set.count_by_tag(ServerTag::Ec2), 1);
        assert_eq!(set.count_by_tag(ServerTag::Fargate), 1);
    }

    #[test]
    fn test_push() {
        let mut set = ServerSet::new();
        assert!(set.is_empty());
        let mut s = Server::standard(7, 3.0, 16.0);
        assert!(s.add_run(&Run::new(1, 1.0, 1.0, 1.0)));
        let idx = set.push(s);
        assert_eq!(idx, 0);
        assert_eq!(set.servers[0].id, 0);
        assert_eq!(set.server_for(1).map(|s| s.id), Some(0));
    }

    #[test]
    fn test_job_lookup() {
        let set = sample_set();
        let job = set.job(11).unwrap();
        assert_eq!(job.run_id, 11);
        assert_eq!(set.jobs().count(), 3);
    }

    #[test]
    fn test_serde_roundtrip() {
        let set = sample_set();
        let json = serde_json::to_string(&set).unwrap();
        let back: ServerSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back.assignments, set.assignments);
        assert_eq!(back.servers[0].jobs(), set.servers[0].jobs());
    }
}
