use std::sync::Arc;

use trellis_common::test_harness::{account, MemoryStore};
use trellis_common::*;
use trellis_kernel::*;

fn network() -> Hash {
    Hash::new(b"trellis-testnet")
}

fn genesis_nodes(n: u8) -> Vec<Node> {
    (0..n)
        .map(|i| Node::genesis(account(i).address, account(i + 100).address))
        .collect()
}

fn node_ids(store: &MemoryStore) -> Vec<Hash> {
    store
        .table()
        .iter()
        .map(|n| n.id_for_network(&network()))
        .collect()
}

fn snapshot(node_id: Hash, round_number: u64, timestamp: u64, tag: &str) -> Snapshot {
    Snapshot {
        node_id,
        round_number,
        transaction: Hash::new(tag.as_bytes()),
        timestamp,
        references: [Hash::new(b"left"), Hash::new(b"right")],
    }
}

fn refs() -> [Hash; 2] {
    [Hash::new(b"left"), Hash::new(b"right")]
}

/// Head round 3 at 1000 with two snapshots, sealed round 2 spanning 500..700.
fn store_with_history() -> (MemoryStore, Hash) {
    let store = MemoryStore::with_nodes(genesis_nodes(1));
    let id = node_ids(&store)[0];
    store.put_round(
        id,
        RoundMeta {
            number: 3,
            timestamp: 1000,
            references: refs(),
        },
    );
    for (ts, tag) in [(500, "a"), (600, "b"), (700, "c")] {
        store.put_snapshot(snapshot(id, 2, ts, tag));
    }
    for (ts, tag) in [(1000, "d"), (1200, "e")] {
        store.put_snapshot(snapshot(id, 3, ts, tag));
    }
    (store, id)
}

#[test_log::test]
fn test_fresh_validators_start_at_round_one() {
    let store = MemoryStore::with_nodes(genesis_nodes(3));
    let graph = load_round_graph(&store, network()).unwrap();

    assert_eq!(graph.nodes(), node_ids(&store).as_slice());
    for id in graph.nodes() {
        let cache = graph.cache_round(id).unwrap();
        assert_eq!((cache.number, cache.start), (1, 0));
        assert!(cache.snapshots.is_empty());
        assert!(graph.final_round(id).is_none());
    }
    assert!(graph.final_cache().is_empty());
    assert!(graph.history().is_empty());
    assert!(graph.check_invariants().is_empty());
}

#[test_log::test]
fn test_empty_validator_set_gives_empty_graph() {
    let store = MemoryStore::new();
    let graph = load_round_graph(&store, network()).unwrap();
    assert!(graph.nodes().is_empty());
    assert!(graph.final_cache().is_empty());
    assert_eq!(graph.print(), "ROUND GRAPH BEGIN\nROUND GRAPH END");
}

#[test_log::test]
fn test_head_round_becomes_cache_and_previous_is_final() {
    let (store, id) = store_with_history();
    let graph = load_round_graph(&store, network()).unwrap();

    let cache = graph.cache_round(&id).unwrap();
    assert_eq!(cache.number, 3);
    assert_eq!(cache.start, 1000);
    assert_eq!(cache.end, 1200);
    assert_eq!(cache.references, refs());
    assert_eq!(cache.snapshots.len(), 2);

    let stored = store.read_snapshots_for_node_round(&id, 2).unwrap();
    let expected = final_round_from_snapshots(id, 2, &stored).unwrap();
    let last = graph.final_round(&id).unwrap();
    assert_eq!(**last, expected);
    assert_eq!((last.start, last.end), (500, 700));

    assert_eq!(
        graph.final_cache(),
        &[FinalCacheEntry {
            node_id: id,
            number: 2,
            start: 500
        }]
    );
    assert!(graph.history().contains(last));
    assert!(graph.check_invariants().is_empty());
}

#[test_log::test]
fn test_round_zero_head_is_sealed_on_load() {
    let store = MemoryStore::with_nodes(genesis_nodes(1));
    let id = node_ids(&store)[0];
    store.put_round(
        id,
        RoundMeta {
            number: 0,
            timestamp: 0,
            references: [Hash::default(); 2],
        },
    );
    store.put_snapshot(snapshot(id, 0, 0, "genesis"));

    let graph = load_round_graph(&store, network()).unwrap();
    let last = graph.final_round(&id).unwrap();
    assert_eq!((last.number, last.start, last.end), (0, 0, 0));
    let cache = graph.cache_round(&id).unwrap();
    assert_eq!((cache.number, cache.start), (1, 0));
    assert!(cache.snapshots.is_empty());
    assert!(graph.check_invariants().is_empty());
}

#[test_log::test]
fn test_missing_final_snapshots_abort_the_load() {
    let store = MemoryStore::with_nodes(genesis_nodes(2));
    let ids = node_ids(&store);
    store.put_round(
        ids[1],
        RoundMeta {
            number: 5,
            timestamp: 100,
            references: refs(),
        },
    );

    let err = load_round_graph(&store, network()).unwrap_err();
    assert_eq!(
        err,
        GraphError::EmptyRound {
            node_id: ids[1],
            number: 4
        }
    );
    assert!(err.is_integrity_fault());
}

#[test_log::test]
fn test_unordered_final_snapshots_are_corruption() {
    let (store, id) = store_with_history();
    store.put_snapshot(snapshot(id, 2, 650, "tail"));

    let err = load_round_graph(&store, network()).unwrap_err();
    assert_eq!(
        err,
        GraphError::SnapshotOutOfBounds {
            node_id: id,
            number: 2,
            timestamp: 700,
            start: 500,
            end: 650
        }
    );
}

#[test_log::test]
fn test_head_snapshot_before_round_start_is_rejected() {
    let (store, id) = store_with_history();
    store.put_snapshot(snapshot(id, 3, 999, "early"));

    let err = load_round_graph(&store, network()).unwrap_err();
    assert!(matches!(
        err,
        GraphError::SnapshotBeforeStart {
            timestamp: 999,
            start: 1000,
            ..
        }
    ));
}

#[test_log::test]
fn test_store_failure_propagates() {
    let (store, _) = store_with_history();
    let outage = StoreError::Unavailable("disk offline".to_string());
    store.set_failure(Some(outage.clone()));

    let err = load_round_graph(&store, network()).unwrap_err();
    assert_eq!(err, GraphError::Store(outage));
    assert!(!err.is_integrity_fault());

    store.set_failure(None);
    assert!(load_round_graph(&store, network()).is_ok());
}

#[test_log::test]
fn test_load_uses_the_given_table_and_network() {
    let (store, id) = store_with_history();
    let other = Hash::new(b"other-net");

    // same validators, different network: no rounds under those ids
    let graph = RoundGraph::load(&store, &store.table(), &KernelConfig::for_network(other)).unwrap();
    assert!(graph.cache_round(&id).is_none());
    let scoped = graph.nodes()[0];
    assert_eq!(graph.cache_round(&scoped).unwrap().number, 1);

    let empty = ValidatorTable::default();
    let graph = RoundGraph::load(&store, &empty, &KernelConfig::for_network(network())).unwrap();
    assert!(graph.nodes().is_empty());
}

#[test_log::test]
fn test_seal_opens_the_next_round() {
    let (store, id) = store_with_history();
    let mut graph = load_round_graph(&store, network()).unwrap();
    let live = graph.cache_round(&id).unwrap().copy();

    let next_refs = [Hash::new(b"n0"), Hash::new(b"n1")];
    let sealed = graph.seal(&id, 1500, next_refs).unwrap();
    assert_eq!(*sealed, live.as_final().unwrap());
    assert_eq!((sealed.number, sealed.start, sealed.end), (3, 1000, 1200));

    let cache = graph.cache_round(&id).unwrap();
    assert_eq!((cache.number, cache.start), (4, 1500));
    assert_eq!(cache.references, next_refs);
    assert!(cache.snapshots.is_empty());

    assert_eq!(graph.final_round(&id).unwrap(), &sealed);
    assert_eq!(graph.final_cache()[0].number, 3);
    assert_eq!(graph.history().len(), 2);
    assert_eq!(graph.history().get(&id, 2).unwrap().number, 2);
    assert!(graph.check_invariants().is_empty());

    // nothing has joined round 4 yet
    assert!(matches!(
        graph.seal(&id, 2000, next_refs),
        Err(GraphError::EmptyRound { number: 4, .. })
    ));
    assert_eq!(graph.history().len(), 2);
}

#[test_log::test]
fn test_seal_rejects_unknown_node() {
    let (store, _) = store_with_history();
    let mut graph = load_round_graph(&store, network()).unwrap();
    let stranger = Hash::new(b"stranger");
    assert_eq!(
        graph.seal(&stranger, 0, refs()),
        Err(GraphError::UnknownNode { node_id: stranger })
    );
}

#[test_log::test]
fn test_sealed_and_reloaded_hashes_differ() {
    let (store, id) = store_with_history();
    let mut graph = load_round_graph(&store, network()).unwrap();
    let sealed = graph.seal(&id, 1500, refs()).unwrap();

    store.put_round(
        id,
        RoundMeta {
            number: 4,
            timestamp: 1500,
            references: refs(),
        },
    );
    let reloaded = load_round_graph(&store, network()).unwrap();
    let last = reloaded.final_round(&id).unwrap();

    assert_eq!((last.number, last.start, last.end), (sealed.number, sealed.start, sealed.end));
    assert_ne!(last.hash, sealed.hash);
}

#[test_log::test]
fn test_print_lists_every_validator() {
    let (store, id) = store_with_history();
    let fresh = Node::genesis(account(7).address, account(8).address);
    let mut nodes = store.table().nodes().to_vec();
    nodes.push(fresh.clone());
    store.set_table(ValidatorTable::new(1, nodes));

    let graph = load_round_graph(&store, network()).unwrap();
    let last = graph.final_round(&id).unwrap();
    let expected = format!(
        "ROUND GRAPH BEGIN\n\
         NODE# {id}\nFINAL 2 500 {}\nCACHE 3 1000\n\
         NODE# {}\nFINAL -\nCACHE 1 0\n\
         ROUND GRAPH END",
        last.hash,
        fresh.id_for_network(&network()),
    );
    assert_eq!(graph.print(), expected);
}

#[test_log::test]
fn test_shared_round_seals_like_the_graph() {
    let (store, id) = store_with_history();
    let graph = load_round_graph(&store, network()).unwrap();
    let live = SharedCacheRound::new(graph.cache_round(&id).unwrap().copy());

    live.push(Arc::new(snapshot(id, 3, 1300, "f"))).unwrap();
    let sealed = live.as_final().unwrap();
    assert_eq!((sealed.start, sealed.end), (1000, 1300));
    assert_eq!(graph.cache_round(&id).unwrap().snapshots.len(), 2);
}

#[test_log::test]
fn test_seal_at_the_last_round_number_leaves_graph_unchanged() {
    let store = MemoryStore::with_nodes(genesis_nodes(1));
    let id = node_ids(&store)[0];
    store.put_round(
        id,
        RoundMeta {
            number: u64::MAX,
            timestamp: 10,
            references: refs(),
        },
    );
    store.put_snapshot(snapshot(id, u64::MAX - 1, 5, "prev"));
    store.put_snapshot(snapshot(id, u64::MAX, 12, "head"));

    let mut graph = load_round_graph(&store, network()).unwrap();
    let before = graph.print();

    let err = graph.seal(&id, 20, refs()).unwrap_err();
    assert_eq!(
        err,
        GraphError::RoundNumberOverflow {
            node_id: id,
            number: u64::MAX
        }
    );
    assert!(err.is_integrity_fault());

    assert_eq!(graph.print(), before);
    assert_eq!(graph.history().len(), 1);
    assert!(graph.history().get(&id, u64::MAX).is_none());
    assert_eq!(graph.cache_round(&id).unwrap().snapshots.len(), 1);
    assert!(graph.check_invariants().is_empty());
}

/// Serves a stray snapshot alongside the real ones for every head round read.
struct MisfilingStore {
    inner: MemoryStore,
    stray: Arc<Snapshot>,
}

impl DataStore for MisfilingStore {
    fn read_consensus_nodes(&self) -> Result<ValidatorTable, StoreError> {
        self.inner.read_consensus_nodes()
    }

    fn read_transaction(&self, hash: &Hash) -> Result<Option<Transaction>, StoreError> {
        self.inner.read_transaction(hash)
    }
}

impl RoundStore for MisfilingStore {
    fn read_round(&self, node_id: &Hash) -> Result<Option<RoundMeta>, StoreError> {
        self.inner.read_round(node_id)
    }

    fn read_snapshots_for_node_round(
        &self,
        node_id: &Hash,
        number: u64,
    ) -> Result<Vec<Arc<Snapshot>>, StoreError> {
        let mut snapshots = self.inner.read_snapshots_for_node_round(node_id, number)?;
        if self.inner.read_round(node_id)?.is_some_and(|m| m.number == number) {
            snapshots.push(self.stray.clone());
        }
        Ok(snapshots)
    }
}

#[test_log::test]
fn test_misfiled_head_snapshot_is_an_integrity_fault() {
    let (inner, id) = store_with_history();
    let store = MisfilingStore {
        inner,
        stray: Arc::new(snapshot(id, 7, 1100, "stray")),
    };

    let err = load_round_graph(&store, network()).unwrap_err();
    assert_eq!(
        err,
        GraphError::MisfiledSnapshot {
            node_id: id,
            number: 3,
            found_node: id,
            found: 7
        }
    );
    assert!(err.is_integrity_fault());
}
