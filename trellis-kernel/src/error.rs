use thiserror::Error;
use trellis_common::{Hash, StoreError};

/// Ways loading or sealing rounds can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error(transparent)]
    Store(#[from] StoreError),

    // Local state integrity
    #[error("round {number} of node {node_id} has no snapshots")]
    EmptyRound { node_id: Hash, number: u64 },
    #[error("snapshot at {timestamp} precedes start {start} of round {number} of node {node_id}")]
    SnapshotBeforeStart {
        node_id: Hash,
        number: u64,
        timestamp: u64,
        start: u64,
    },
    #[error("snapshot at {timestamp} outside [{start}, {end}] of round {number} of node {node_id}")]
    SnapshotOutOfBounds {
        node_id: Hash,
        number: u64,
        timestamp: u64,
        start: u64,
        end: u64,
    },
    #[error("final round {number} of node {node_id} already sealed")]
    FinalRoundExists { node_id: Hash, number: u64 },
    #[error("round {number} of node {node_id} has no successor number")]
    RoundNumberOverflow { node_id: Hash, number: u64 },
    #[error("store filed snapshot for node {found_node} round {found} under round {number} of node {node_id}")]
    MisfiledSnapshot {
        node_id: Hash,
        number: u64,
        found_node: Hash,
        found: u64,
    },

    // Caller errors
    #[error("node {node_id} is not in the round graph")]
    UnknownNode { node_id: Hash },
    #[error("snapshot for node {found_node} round {found} does not belong to round {expected} of node {node_id}")]
    RoundMismatch {
        node_id: Hash,
        expected: u64,
        found_node: Hash,
        found: u64,
    },
}

impl GraphError {
    /// True when the error means local round state is corrupted, as opposed
    /// to a store outage or a bad request.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(
            self,
            Self::EmptyRound { .. }
                | Self::SnapshotBeforeStart { .. }
                | Self::SnapshotOutOfBounds { .. }
                | Self::FinalRoundExists { .. }
                | Self::RoundNumberOverflow { .. }
                | Self::MisfiledSnapshot { .. }
        )
    }
}
