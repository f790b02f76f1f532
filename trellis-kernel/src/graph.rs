use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;
use trellis_common::{DataStore, Hash, RoundStore, ValidatorTable};

use crate::format::format_round_graph;
use crate::round::final_round_from_snapshots;
use crate::*;

/// Flattened view of one validator's last sealed round, for recency scans.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FinalCacheEntry {
    pub node_id: Hash,
    pub number: u64,
    pub start: u64,
}

/// Round progress of every validator in the current set.
///
/// Each validator has at most one open round and one latest sealed round;
/// when both exist the open round is numbered one past the sealed one.
#[derive(Clone, Debug, Default)]
pub struct RoundGraph {
    /// Validator ids in validator-table order
    pub(crate) nodes: Vec<Hash>,
    pub(crate) cache_round: BTreeMap<Hash, CacheRound>,
    pub(crate) final_round: BTreeMap<Hash, Arc<FinalRound>>,
    pub(crate) final_cache: Vec<FinalCacheEntry>,
    pub(crate) history: FinalLog,
}

/// Loads the round graph for the validator set currently in `store`.
pub fn load_round_graph<S: RoundStore + ?Sized>(
    store: &S,
    network_id: Hash,
) -> Result<RoundGraph, GraphError> {
    let table = DataStore::read_consensus_nodes(store)?;
    RoundGraph::load(store, &table, &KernelConfig::for_network(network_id))
}

impl RoundGraph {
    /// Rebuilds every validator's open and latest sealed round from `store`.
    ///
    /// All or nothing: the first failing validator aborts the whole load.
    pub fn load<S: RoundStore + ?Sized>(
        store: &S,
        table: &ValidatorTable,
        config: &KernelConfig,
    ) -> Result<RoundGraph, GraphError> {
        let mut graph = RoundGraph::default();

        for node in table.iter() {
            let id = node.id_for_network(&config.network_id);
            graph.nodes.push(id);
            graph
                .load_node(store, id)
                .inspect_err(|e| {
                    if e.is_integrity_fault() {
                        tracing_setup::integrity_fault(&id, e);
                    }
                })?;
        }

        graph.update_final_cache();
        tracing_setup::graph_loaded(&config.network_id, graph.nodes.len(), graph.final_round.len());
        if config.log_graph_on_load {
            debug!(target: "graph_loaded", "\n{}", graph.print());
        }
        Ok(graph)
    }

    fn load_node<S: RoundStore + ?Sized>(&mut self, store: &S, id: Hash) -> Result<(), GraphError> {
        let Some(head) = load_head_round(store, id)? else {
            // nothing persisted yet: the validator starts at round 1
            tracing_setup::round_loaded(&id, 1, None, 0);
            self.cache_round.insert(id, CacheRound::new(id, 1, 0));
            return Ok(());
        };

        // round 0 is sealed from its own snapshots
        let (cache, final_number) = if head.number == 0 {
            (CacheRound::new(id, 1, 0), 0)
        } else {
            let number = head.number - 1;
            (head, number)
        };

        let snapshots = store.read_snapshots_for_node_round(&id, final_number)?;
        let last = Arc::new(final_round_from_snapshots(id, final_number, &snapshots)?);
        tracing_setup::round_loaded(&id, cache.number, Some(final_number), cache.snapshots.len());

        self.history.insert(last.clone())?;
        self.final_round.insert(id, last);
        self.cache_round.insert(id, cache);
        Ok(())
    }

    /// Seals the open round of `node_id` and opens the next one.
    ///
    /// The sealed round is appended to the history and becomes the
    /// validator's latest final round. On error the graph is unchanged.
    pub fn seal(
        &mut self,
        node_id: &Hash,
        next_start: u64,
        references: [Hash; 2],
    ) -> Result<Arc<FinalRound>, GraphError> {
        let cache = self
            .cache_round
            .get(node_id)
            .ok_or(GraphError::UnknownNode { node_id: *node_id })?;
        let sealed = Arc::new(cache.as_final()?);
        let next_number = sealed
            .number
            .checked_add(1)
            .ok_or(GraphError::RoundNumberOverflow {
                node_id: *node_id,
                number: sealed.number,
            })?;
        self.history.insert(sealed.clone())?;

        let mut next = CacheRound::new(*node_id, next_number, next_start);
        next.references = references;
        self.cache_round.insert(*node_id, next);
        self.final_round.insert(*node_id, sealed.clone());
        self.update_final_cache();

        tracing_setup::round_sealed(&sealed);
        Ok(sealed)
    }

    pub fn update_final_cache(&mut self) {
        self.final_cache = self
            .nodes
            .iter()
            .filter_map(|id| self.final_round.get(id))
            .map(|f| FinalCacheEntry {
                node_id: f.node_id,
                number: f.number,
                start: f.start,
            })
            .collect();
    }

    pub fn nodes(&self) -> &[Hash] {
        &self.nodes
    }

    pub fn final_cache(&self) -> &[FinalCacheEntry] {
        &self.final_cache
    }

    pub fn cache_round(&self, node_id: &Hash) -> Option<&CacheRound> {
        self.cache_round.get(node_id)
    }

    pub fn final_round(&self, node_id: &Hash) -> Option<&Arc<FinalRound>> {
        self.final_round.get(node_id)
    }

    /// Every round sealed or loaded through this graph.
    pub fn history(&self) -> &FinalLog {
        &self.history
    }

    /// Multi-line diagnostic dump of the graph.
    pub fn print(&self) -> String {
        format_round_graph(self)
    }
}

/// Reads the head round of `id` with its snapshots so far.
fn load_head_round<S: RoundStore + ?Sized>(
    store: &S,
    id: Hash,
) -> Result<Option<CacheRound>, GraphError> {
    let Some(meta) = store.read_round(&id)? else {
        return Ok(None);
    };

    let mut round = CacheRound::new(id, meta.number, meta.timestamp);
    round.references = meta.references;
    for s in store.read_snapshots_for_node_round(&id, meta.number)? {
        round.push(s).map_err(|e| match e {
            GraphError::RoundMismatch {
                node_id,
                expected,
                found_node,
                found,
            } => GraphError::MisfiledSnapshot {
                node_id,
                number: expected,
                found_node,
                found,
            },
            e => e,
        })?;
    }
    Ok(Some(round))
}
