use std::collections::BTreeMap;
use std::sync::Arc;

use trellis_common::Hash;

use crate::{FinalRound, GraphError};

/// Append-only arena of sealed rounds, indexed by (node, number).
///
/// There is no way to remove or replace an entry; sealing the same round
/// twice is an error.
#[derive(Clone, Debug, Default)]
pub struct FinalLog {
    rounds: Vec<Arc<FinalRound>>,
    index: BTreeMap<(Hash, u64), usize>,
}

impl FinalLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, round: Arc<FinalRound>) -> Result<(), GraphError> {
        let key = (round.node_id, round.number);
        if self.index.contains_key(&key) {
            return Err(GraphError::FinalRoundExists {
                node_id: round.node_id,
                number: round.number,
            });
        }
        self.index.insert(key, self.rounds.len());
        self.rounds.push(round);
        Ok(())
    }

    pub fn get(&self, node_id: &Hash, number: u64) -> Option<&Arc<FinalRound>> {
        self.index
            .get(&(*node_id, number))
            .map(|&i| &self.rounds[i])
    }

    /// Highest-numbered sealed round of `node_id`.
    pub fn latest(&self, node_id: &Hash) -> Option<&Arc<FinalRound>> {
        self.index
            .range((*node_id, 0)..=(*node_id, u64::MAX))
            .next_back()
            .map(|(_, &i)| &self.rounds[i])
    }

    pub fn contains(&self, round: &FinalRound) -> bool {
        self.get(&round.node_id, round.number)
            .is_some_and(|r| **r == *round)
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// Sealed rounds in the order they were appended.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FinalRound>> {
        self.rounds.iter()
    }
}
