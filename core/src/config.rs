//! Immutable per-run group configuration.

use serde::{Deserialize, Serialize};

/// The rank that owns full-length vectors and performs all input/output.
pub const LEADER_RANK: usize = 0;

/// Per-run values fixed at launch: the group size and this member's rank.
///
/// The leader rank is fixed at [`LEADER_RANK`]; membership never changes for
/// the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    comm_sz: usize,
    rank: usize,
}

impl GroupConfig {
    pub fn new(comm_sz: usize, rank: usize) -> Self {
        debug_assert!(comm_sz >= 1);
        debug_assert!(rank < comm_sz);
        Self { comm_sz, rank }
    }

    /// Number of cooperating members in the group.
    pub fn comm_sz(&self) -> usize {
        self.comm_sz
    }

    /// This member's rank, in `0..comm_sz`.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// The designated leader's rank.
    pub fn leader(&self) -> usize {
        LEADER_RANK
    }

    /// Whether this member is the leader.
    pub fn is_leader(&self) -> bool {
        self.rank == LEADER_RANK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leader_is_rank_zero() {
        let cfg = GroupConfig::new(4, 0);
        assert!(cfg.is_leader());
        assert_eq!(cfg.leader(), 0);

        let cfg = GroupConfig::new(4, 3);
        assert!(!cfg.is_leader());
        assert_eq!(cfg.leader(), 0);
        assert_eq!(cfg.comm_sz(), 4);
        assert_eq!(cfg.rank(), 3);
    }
}
