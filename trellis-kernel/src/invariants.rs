use std::collections::BTreeSet;

use thiserror::Error;
use trellis_common::Hash;

use crate::format::format_hash_short;
use crate::RoundGraph;

/// Represents a violation of a round graph invariant
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphInvariantViolation {
    // Membership
    #[error("node {} listed more than once", format_hash_short(.node_id))]
    DuplicateNode { node_id: Hash },
    #[error("node {} has no open round", format_hash_short(.node_id))]
    MissingCacheRound { node_id: Hash },
    #[error("open round kept for {} which is not in the validator set", format_hash_short(.node_id))]
    OrphanCacheRound { node_id: Hash },
    #[error("final round kept for {} which is not in the validator set", format_hash_short(.node_id))]
    OrphanFinalRound { node_id: Hash },

    // Keys
    #[error("cache entry {} holds a round of {}", format_hash_short(.key), format_hash_short(.node_id))]
    CacheKeyMismatch { key: Hash, node_id: Hash },
    #[error("final entry {} holds a round of {}", format_hash_short(.key), format_hash_short(.node_id))]
    FinalKeyMismatch { key: Hash, node_id: Hash },

    // Numbering
    #[error("node {} has open round {cache} after final round {final_number}", format_hash_short(.node_id))]
    CacheNotAfterFinal {
        node_id: Hash,
        cache: u64,
        final_number: u64,
    },

    // Timestamps
    #[error("node {} round {number} has snapshot at {timestamp} before start {start}", format_hash_short(.node_id))]
    SnapshotBeforeStart {
        node_id: Hash,
        number: u64,
        timestamp: u64,
        start: u64,
    },
    #[error("node {} round {number} ends at {end} but has snapshot at {timestamp}", format_hash_short(.node_id))]
    SnapshotAfterEnd {
        node_id: Hash,
        number: u64,
        timestamp: u64,
        end: u64,
    },
    #[error("node {} final round {number} starts at {start} after its end {end}", format_hash_short(.node_id))]
    FinalBoundsInverted {
        node_id: Hash,
        number: u64,
        start: u64,
        end: u64,
    },

    // History
    #[error("node {} final round {number} missing from the sealed history", format_hash_short(.node_id))]
    FinalNotInHistory { node_id: Hash, number: u64 },
    #[error("final cache disagrees with final rounds")]
    FinalCacheStale,
}

impl RoundGraph {
    /// Checks the graph's structural invariants and returns every violation found.
    pub fn check_invariants(&self) -> Vec<GraphInvariantViolation> {
        let mut violations = Vec::new();

        let mut members = BTreeSet::new();
        for id in &self.nodes {
            if !members.insert(*id) {
                violations.push(GraphInvariantViolation::DuplicateNode { node_id: *id });
            }
            if !self.cache_round.contains_key(id) {
                violations.push(GraphInvariantViolation::MissingCacheRound { node_id: *id });
            }
        }

        for (key, cache) in &self.cache_round {
            if !members.contains(key) {
                violations.push(GraphInvariantViolation::OrphanCacheRound { node_id: *key });
            }
            if cache.node_id != *key {
                violations.push(GraphInvariantViolation::CacheKeyMismatch {
                    key: *key,
                    node_id: cache.node_id,
                });
            }
            for s in &cache.snapshots {
                if s.timestamp < cache.start {
                    violations.push(GraphInvariantViolation::SnapshotBeforeStart {
                        node_id: cache.node_id,
                        number: cache.number,
                        timestamp: s.timestamp,
                        start: cache.start,
                    });
                }
                if s.timestamp > cache.end {
                    violations.push(GraphInvariantViolation::SnapshotAfterEnd {
                        node_id: cache.node_id,
                        number: cache.number,
                        timestamp: s.timestamp,
                        end: cache.end,
                    });
                }
            }
        }

        for (key, last) in &self.final_round {
            if !members.contains(key) {
                violations.push(GraphInvariantViolation::OrphanFinalRound { node_id: *key });
            }
            if last.node_id != *key {
                violations.push(GraphInvariantViolation::FinalKeyMismatch {
                    key: *key,
                    node_id: last.node_id,
                });
            }
            if last.start > last.end {
                violations.push(GraphInvariantViolation::FinalBoundsInverted {
                    node_id: last.node_id,
                    number: last.number,
                    start: last.start,
                    end: last.end,
                });
            }
            if !self.history.contains(last) {
                violations.push(GraphInvariantViolation::FinalNotInHistory {
                    node_id: last.node_id,
                    number: last.number,
                });
            }
            if let Some(cache) = self.cache_round.get(key) {
                if last.number.checked_add(1) != Some(cache.number) {
                    violations.push(GraphInvariantViolation::CacheNotAfterFinal {
                        node_id: *key,
                        cache: cache.number,
                        final_number: last.number,
                    });
                }
            }
        }

        let mut fresh = self.clone();
        fresh.update_final_cache();
        if fresh.final_cache != self.final_cache {
            violations.push(GraphInvariantViolation::FinalCacheStale);
        }

        violations
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{CacheRound, FinalRound};

    fn graph() -> (RoundGraph, Hash) {
        let id = Hash::new(b"node");
        let mut g = RoundGraph::default();
        g.nodes.push(id);
        let last = Arc::new(FinalRound {
            node_id: id,
            number: 4,
            start: 10,
            end: 20,
            hash: Hash::new(b"h"),
        });
        g.history.insert(last.clone()).unwrap();
        g.final_round.insert(id, last);
        g.cache_round.insert(id, CacheRound::new(id, 5, 30));
        g.update_final_cache();
        (g, id)
    }

    #[test]
    fn consistent_graph_has_no_violations() {
        let (g, _) = graph();
        assert_eq!(g.check_invariants(), vec![]);
    }

    #[test]
    fn detects_numbering_gap() {
        let (mut g, id) = graph();
        g.cache_round.get_mut(&id).unwrap().number = 7;
        assert_eq!(
            g.check_invariants(),
            vec![GraphInvariantViolation::CacheNotAfterFinal {
                node_id: id,
                cache: 7,
                final_number: 4
            }]
        );
    }

    #[test]
    fn detects_orphans_and_missing_rounds() {
        let (mut g, id) = graph();
        let stranger = Hash::new(b"stranger");
        g.cache_round.insert(stranger, CacheRound::new(stranger, 1, 0));
        g.nodes.push(Hash::new(b"late"));
        let violations = g.check_invariants();
        assert!(violations.contains(&GraphInvariantViolation::OrphanCacheRound { node_id: stranger }));
        assert!(violations.contains(&GraphInvariantViolation::MissingCacheRound {
            node_id: Hash::new(b"late")
        }));
        assert!(!violations
            .iter()
            .any(|v| matches!(v, GraphInvariantViolation::OrphanFinalRound { node_id } if *node_id == id)));
    }

    #[test]
    fn detects_final_round_outside_history() {
        let (mut g, id) = graph();
        let forged = Arc::new(FinalRound {
            hash: Hash::new(b"forged"),
            ..**g.final_round.get(&id).unwrap()
        });
        g.final_round.insert(id, forged);
        assert!(g
            .check_invariants()
            .contains(&GraphInvariantViolation::FinalNotInHistory { node_id: id, number: 4 }));
    }

    #[test]
    fn detects_stale_final_cache() {
        let (mut g, _) = graph();
        g.final_cache.clear();
        assert_eq!(g.check_invariants(), vec![GraphInvariantViolation::FinalCacheStale]);
    }
}
