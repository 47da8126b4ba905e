use serde::{Deserialize, Serialize};

/// Point-in-time counters of a worker pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub name: String,
    pub workers: usize,
    pub capacity: usize,
    pub active: usize,
    pub queued: usize,
    pub completed: usize,
}
