//! In-memory store for driving membership checks and graph loading in tests.
//!
//! Everything lives behind one `RwLock`, so a `MemoryStore` can be shared
//! between threads the same way a real store would be.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::crypto::Hash;
use crate::node::{Node, ValidatorTable};
use crate::store::{DataStore, RoundStore, StoreError};
use crate::types::*;

#[derive(Default)]
struct Inner {
    table: ValidatorTable,
    transactions: BTreeMap<Hash, Transaction>,
    rounds: BTreeMap<Hash, RoundMeta>,
    snapshots: BTreeMap<(Hash, u64), Vec<Arc<Snapshot>>>,
    failure: Option<StoreError>,
}

/// A store backed by ordered maps.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: Vec<Node>) -> Self {
        let store = Self::new();
        store.set_table(ValidatorTable::new(0, nodes));
        store
    }

    pub fn set_table(&self, table: ValidatorTable) {
        self.inner.write().table = table;
    }

    pub fn table(&self) -> ValidatorTable {
        self.inner.read().table.clone()
    }

    /// Stores `tx` under its payload hash and returns the hash.
    pub fn put_transaction(&self, tx: Transaction) -> Hash {
        let hash = tx.payload_hash();
        self.inner.write().transactions.insert(hash, tx);
        hash
    }

    pub fn put_round(&self, node_id: Hash, meta: RoundMeta) {
        self.inner.write().rounds.insert(node_id, meta);
    }

    /// Appends a snapshot to its (node, round) bucket, keeping insertion order.
    pub fn put_snapshot(&self, snapshot: Snapshot) {
        self.inner
            .write()
            .snapshots
            .entry((snapshot.node_id, snapshot.round_number))
            .or_default()
            .push(Arc::new(snapshot));
    }

    /// Makes every subsequent read fail with `err` until cleared with `None`.
    pub fn set_failure(&self, err: Option<StoreError>) {
        self.inner.write().failure = err;
    }

    fn check(&self) -> Result<(), StoreError> {
        match &self.inner.read().failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

impl DataStore for MemoryStore {
    fn read_consensus_nodes(&self) -> Result<ValidatorTable, StoreError> {
        self.check()?;
        Ok(self.inner.read().table.clone())
    }

    fn read_transaction(&self, hash: &Hash) -> Result<Option<Transaction>, StoreError> {
        self.check()?;
        Ok(self.inner.read().transactions.get(hash).cloned())
    }
}

impl RoundStore for MemoryStore {
    fn read_round(&self, node_id: &Hash) -> Result<Option<RoundMeta>, StoreError> {
        self.check()?;
        Ok(self.inner.read().rounds.get(node_id).copied())
    }

    fn read_snapshots_for_node_round(
        &self,
        node_id: &Hash,
        number: u64,
    ) -> Result<Vec<Arc<Snapshot>>, StoreError> {
        self.check()?;
        Ok(self
            .inner
            .read()
            .snapshots
            .get(&(*node_id, number))
            .cloned()
            .unwrap_or_default())
    }
}

/// Deterministic test account number `i`.
pub fn account(i: u8) -> Account {
    let mut seed = [0u8; 64];
    seed[i as usize % 63] = i;
    seed[63] = 0xa5;
    Account::from_seed(&seed)
}

/// A pledge transaction by `signer` naming `payee`, bonding `amount`.
pub fn pledge_transaction(signer: &Address, payee: &Address, amount: Amount) -> Transaction {
    let mut tx = Transaction::new(base_asset_id());
    tx.add_input(Hash::new(b"pledge-funding"), 0);
    tx.add_output(OutputType::NodePledge, amount);
    tx.extra = [signer.public_spend_key.0, payee.public_spend_key.0].concat();
    tx
}

/// A previous accept transaction whose bond output is owned by `owner`.
pub fn accept_source_transaction(owner: &Address, amount: Amount) -> Transaction {
    let mut tx = Transaction::new(base_asset_id());
    tx.add_input(Hash::new(owner.public_spend_key.as_bytes()), 0);
    tx.add_output(OutputType::NodeAccept, amount);
    tx.extra = [owner.public_spend_key.0, owner.public_spend_key.0].concat();
    tx
}

/// An accept spending `accept_source` and `pledge_source` into one output.
pub fn accept_transaction(accept_source: Hash, pledge_source: Hash, amount: Amount) -> Transaction {
    let mut tx = Transaction::new(base_asset_id());
    tx.add_input(accept_source, 0);
    tx.add_input(pledge_source, 0);
    tx.add_output(OutputType::NodeAccept, amount);
    tx
}

/// A spendable script UTXO funding a pledge.
pub fn script_utxo(amount: Amount) -> Utxo {
    Utxo {
        input: Input {
            hash: Hash::new(b"pledge-funding"),
            index: 0,
        },
        output: Output {
            output_type: OutputType::Script,
            amount,
        },
        asset: base_asset_id(),
    }
}
