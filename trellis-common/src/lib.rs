//! # Trellis common
//!
//! Ledger vocabulary shared by the trellis round DAG and the rules that
//! govern who may join its validator set.
//!
//! Validators join in two steps. A prospective validator **pledges** a fixed
//! bond; a sitting validator then **accepts** it, consolidating one bond unit
//! per current validator into a single output. Only one admission may be in
//! flight at a time.
//!
//! ## Modules
//!
//! - `crypto.rs`: hashes, public keys and deterministic key derivation
//! - `types.rs`: addresses, amounts, transactions, snapshots
//! - `node.rs`: validator records and the versioned validator table
//! - `store.rs`: read-only store traits
//! - `membership.rs`: pledge and accept validation
//! - `test_harness.rs`: in-memory store and transaction builders for tests

mod crypto;
mod membership;
mod node;
mod store;
mod types;

pub mod test_harness;

pub use crypto::*;
pub use membership::{validate_accept, validate_pledge, BondSource, ErrorKind, ValidationError};
pub use node::{Node, NodeState, NodeTransitionError, ValidatorTable};
pub use store::{DataStore, RoundStore, StoreError};
pub use types::*;
