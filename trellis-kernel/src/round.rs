//! Open and sealed rounds.
//!
//! Rules the graph keeps for every validator:
//!
//! 1. never update a round once the next round has valid snapshots
//! 2. a conflicting snapshot is merged by timestamp, never by pruning
//! 3. a round referenced by other validators is never pruned
//! 4. all snapshots in a round carry the same references
//!
//! A sealed round has two hashes depending on how it was produced:
//! [`CacheRound::as_final`] folds snapshot hashes with a byte-wise OR, while
//! [`final_round_from_snapshots`] hashes their concatenation in store order.
//! The two are not interchangeable.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use trellis_common::{Hash, Snapshot};

use crate::GraphError;

/// A validator's open round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheRound {
    pub node_id: Hash,
    pub number: u64,
    pub start: u64,
    pub references: [Hash; 2],
    #[serde(skip)]
    pub end: u64,
    #[serde(skip)]
    pub snapshots: Vec<Arc<Snapshot>>,
}

/// A sealed round. Never mutated once built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalRound {
    pub node_id: Hash,
    pub number: u64,
    pub start: u64,
    pub end: u64,
    pub hash: Hash,
}

impl CacheRound {
    /// An empty round with no references.
    pub fn new(node_id: Hash, number: u64, start: u64) -> Self {
        CacheRound {
            node_id,
            number,
            start,
            references: [Hash::default(); 2],
            end: 0,
            snapshots: Vec::new(),
        }
    }

    /// Copies the round including its snapshot list, so the copy can be
    /// handed to a reader while this round keeps growing.
    pub fn copy(&self) -> CacheRound {
        self.clone()
    }

    /// Checks that `s` may join this round.
    pub fn validate_snapshot(&self, s: &Snapshot) -> Result<(), GraphError> {
        if s.node_id != self.node_id || s.round_number != self.number {
            return Err(GraphError::RoundMismatch {
                node_id: self.node_id,
                expected: self.number,
                found_node: s.node_id,
                found: s.round_number,
            });
        }
        if s.timestamp < self.start {
            return Err(GraphError::SnapshotBeforeStart {
                node_id: self.node_id,
                number: self.number,
                timestamp: s.timestamp,
                start: self.start,
            });
        }
        Ok(())
    }

    pub fn push(&mut self, s: Arc<Snapshot>) -> Result<(), GraphError> {
        self.validate_snapshot(&s)?;
        self.end = self.end.max(s.timestamp);
        self.snapshots.push(s);
        Ok(())
    }

    /// Seals this round. The hash is independent of snapshot order.
    pub fn as_final(&self) -> Result<FinalRound, GraphError> {
        let first = self.snapshots.first().ok_or(GraphError::EmptyRound {
            node_id: self.node_id,
            number: self.number,
        })?;

        let mut hash = Hash::new(&round_prefix(&self.node_id, self.number));
        let (mut start, mut end) = (first.timestamp, 0);
        for s in &self.snapshots {
            hash = hash.byte_or(&s.payload_hash());
            start = start.min(s.timestamp);
            end = end.max(s.timestamp);
        }

        Ok(FinalRound {
            node_id: self.node_id,
            number: self.number,
            start,
            end,
            hash,
        })
    }
}

impl FinalRound {
    pub fn copy(&self) -> FinalRound {
        *self
    }
}

/// Wraps a lone snapshot, e.g. a late or conflicting one, as a round of its own.
pub fn snapshot_as_cache_round(s: Arc<Snapshot>) -> CacheRound {
    CacheRound {
        node_id: s.node_id,
        number: s.round_number,
        start: s.timestamp,
        references: s.references,
        end: s.timestamp,
        snapshots: vec![s],
    }
}

/// Rebuilds a sealed round from the snapshots the store holds for it.
///
/// The store returns snapshots in timestamp order, so the first and last
/// bound the round; any snapshot outside those bounds means the store is
/// corrupted. The hash depends on snapshot order.
pub fn final_round_from_snapshots(
    node_id: Hash,
    number: u64,
    snapshots: &[Arc<Snapshot>],
) -> Result<FinalRound, GraphError> {
    let (first, last) = match (snapshots.first(), snapshots.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(GraphError::EmptyRound { node_id, number }),
    };
    let (start, end) = (first.timestamp, last.timestamp);

    let mut buf = round_prefix(&node_id, number);
    buf.reserve(snapshots.len() * 32);
    for s in snapshots {
        if s.timestamp < start || s.timestamp > end {
            return Err(GraphError::SnapshotOutOfBounds {
                node_id,
                number,
                timestamp: s.timestamp,
                start,
                end,
            });
        }
        buf.extend_from_slice(s.payload_hash().as_bytes());
    }

    Ok(FinalRound {
        node_id,
        number,
        start,
        end,
        hash: Hash::new(&buf),
    })
}

fn round_prefix(node_id: &Hash, number: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(40);
    buf.extend_from_slice(node_id.as_bytes());
    buf.extend_from_slice(&number.to_be_bytes());
    buf
}
