//! Read-only views of the persistent store.

use std::sync::Arc;

use thiserror::Error;

use crate::crypto::Hash;
use crate::node::ValidatorTable;
use crate::types::{RoundMeta, Snapshot, Transaction};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store corrupted: {0}")]
    Corrupted(String),
}

/// What transaction validation needs from the store.
pub trait DataStore {
    fn read_consensus_nodes(&self) -> Result<ValidatorTable, StoreError>;

    fn read_transaction(&self, hash: &Hash) -> Result<Option<Transaction>, StoreError>;
}

/// What round graph loading needs from the store.
pub trait RoundStore: DataStore {
    /// Head round of a validator, keyed by its network-scoped id.
    fn read_round(&self, node_id: &Hash) -> Result<Option<RoundMeta>, StoreError>;

    /// Snapshots of one round in store order.
    fn read_snapshots_for_node_round(
        &self,
        node_id: &Hash,
        number: u64,
    ) -> Result<Vec<Arc<Snapshot>>, StoreError>;
}
