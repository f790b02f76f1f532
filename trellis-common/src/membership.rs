//! Validator membership rules for pledge and accept transactions.
//!
//! Both checks are pure reads over a [`ValidatorTable`] and the store. They
//! answer "may this transaction be honored against this table"; applying the
//! result is [`ValidatorTable::commit_pledge`] / [`ValidatorTable::commit_accept`].

use std::fmt;

use thiserror::Error;
use tracing::{debug, trace};

use crate::crypto::{Hash, KEY_SIZE};
use crate::node::{Node, NodeState, NodeTransitionError, ValidatorTable};
use crate::store::{DataStore, StoreError};
use crate::types::*;

/// Which bond output an accept input is expected to spend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondSource {
    /// Output of the previous accept, owned by a sitting validator.
    Accept,
    /// Output of the pending pledge, owned by the pledging validator.
    Pledge,
}

impl BondSource {
    fn output_type(&self) -> OutputType {
        match self {
            BondSource::Accept => OutputType::NodeAccept,
            BondSource::Pledge => OutputType::NodePledge,
        }
    }

    fn owner_state(&self) -> NodeState {
        match self {
            BondSource::Accept => NodeState::Accepted,
            BondSource::Pledge => NodeState::Pledging,
        }
    }
}

impl fmt::Display for BondSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BondSource::Accept => write!(f, "accept"),
            BondSource::Pledge => write!(f, "pledge"),
        }
    }
}

/// Broad class of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Structural,
    StateConsistency,
    AmountMismatch,
    Store,
}

/// The different ways a pledge or accept can be rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    // Structure
    #[error("invalid outputs count {count} for {kind:?} transaction")]
    InvalidOutputsCount { kind: MembershipKind, count: usize },
    #[error("invalid inputs count {count} for accept transaction")]
    InvalidInputsCount { count: usize },
    #[error("invalid extra length {length} for pledge transaction")]
    InvalidExtraLength { length: usize },
    #[error("invalid asset {asset} for {kind:?} transaction")]
    InvalidAsset { kind: MembershipKind, asset: Hash },
    #[error("invalid utxo type {output_type:?}")]
    InvalidUtxoType { output_type: OutputType },
    #[error("{source_kind} source transaction {hash} not found")]
    MissingSourceTransaction { source_kind: BondSource, hash: Hash },
    #[error("invalid {source_kind} utxo count {count}")]
    InvalidSourceOutputsCount { source_kind: BondSource, count: usize },
    #[error("invalid {source_kind} utxo type {output_type:?}")]
    InvalidSourceOutputType {
        source_kind: BondSource,
        output_type: OutputType,
    },
    #[error("{source_kind} source transaction {hash} commits no spend key")]
    InvalidSourceExtra { source_kind: BondSource, hash: Hash },

    // Validator set state
    #[error("invalid node pending state {signer} {state}")]
    NodeNotAccepted { signer: Address, state: NodeState },
    #[error("invalid pledging nodes {first} {second}")]
    MultiplePledgingNodes { first: Address, second: Address },
    #[error("no pledging node needs to get accepted")]
    NoPledgingNode,
    #[error("invalid {source_kind} utxo source {owner} in state {state:?}")]
    InvalidSourceOwner {
        source_kind: BondSource,
        owner: Address,
        state: Option<NodeState>,
    },
    #[error("node {signer} is already in the validator set")]
    DuplicateSigner { signer: Address },
    #[error(transparent)]
    Transition(#[from] NodeTransitionError),

    // Bond arithmetic
    #[error("invalid pledge amount {amount}")]
    InvalidPledgeAmount { amount: Amount },
    #[error("invalid accept input amount {accept} {pledge} {expected}")]
    InvalidAcceptInputAmount {
        accept: Amount,
        pledge: Amount,
        expected: Amount,
    },
    #[error("invalid accept output amount {output} for inputs {inputs}")]
    InvalidAcceptOutputAmount { output: Amount, inputs: Amount },
    #[error("accept amount overflow")]
    AmountOverflow,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ValidationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidOutputsCount { .. }
            | Self::InvalidInputsCount { .. }
            | Self::InvalidExtraLength { .. }
            | Self::InvalidAsset { .. }
            | Self::InvalidUtxoType { .. }
            | Self::MissingSourceTransaction { .. }
            | Self::InvalidSourceOutputsCount { .. }
            | Self::InvalidSourceOutputType { .. }
            | Self::InvalidSourceExtra { .. } => ErrorKind::Structural,

            Self::NodeNotAccepted { .. }
            | Self::MultiplePledgingNodes { .. }
            | Self::NoPledgingNode
            | Self::InvalidSourceOwner { .. }
            | Self::DuplicateSigner { .. }
            | Self::Transition(_) => ErrorKind::StateConsistency,

            Self::InvalidPledgeAmount { .. }
            | Self::InvalidAcceptInputAmount { .. }
            | Self::InvalidAcceptOutputAmount { .. }
            | Self::AmountOverflow => ErrorKind::AmountMismatch,

            Self::Store(_) => ErrorKind::Store,
        }
    }
}

/// Checks that a pledge may be honored against `table`.
///
/// `inputs` are the UTXOs the pledge consumes, already resolved from the store.
pub fn validate_pledge<'a>(
    tx: &Transaction,
    table: &ValidatorTable,
    inputs: impl IntoIterator<Item = &'a Utxo>,
) -> Result<(), ValidationError> {
    check_pledge(tx, table, inputs)
        .inspect(|_| trace!(target: "membership", tx = %tx.payload_hash(), "pledge valid"))
        .inspect_err(|e| {
            debug!(target: "membership", tx = %tx.payload_hash(), version = table.version(), error = %e, "pledge rejected")
        })
}

fn check_pledge<'a>(
    tx: &Transaction,
    table: &ValidatorTable,
    inputs: impl IntoIterator<Item = &'a Utxo>,
) -> Result<(), ValidationError> {
    if tx.outputs.len() != 1 {
        return Err(ValidationError::InvalidOutputsCount {
            kind: MembershipKind::Pledge,
            count: tx.outputs.len(),
        });
    }
    if tx.extra.len() != 2 * KEY_SIZE {
        return Err(ValidationError::InvalidExtraLength {
            length: tx.extra.len(),
        });
    }
    if tx.asset != base_asset_id() {
        return Err(ValidationError::InvalidAsset {
            kind: MembershipKind::Pledge,
            asset: tx.asset,
        });
    }
    for utxo in inputs {
        if utxo.output.output_type != OutputType::Script {
            return Err(ValidationError::InvalidUtxoType {
                output_type: utxo.output.output_type,
            });
        }
    }

    let amount = tx.outputs[0].amount;
    if amount != Amount::units(PLEDGE_AMOUNT) {
        return Err(ValidationError::InvalidPledgeAmount { amount });
    }

    // one admission at a time: no pledge while another pledge or a departure is pending
    if let Some(n) = table.iter().find(|n| !n.is_accepted()) {
        return Err(ValidationError::NodeNotAccepted {
            signer: *n.signer(),
            state: n.state(),
        });
    }

    Ok(())
}

/// Checks that an accept may be honored against `table`, resolving the two
/// bond outputs it spends through `store`.
pub fn validate_accept<S: DataStore + ?Sized>(
    tx: &Transaction,
    table: &ValidatorTable,
    store: &S,
) -> Result<(), ValidationError> {
    check_accept(tx, table, store)
        .map(|pledging| {
            trace!(target: "membership", tx = %tx.payload_hash(), pledging = %pledging.signer(), "accept valid")
        })
        .inspect_err(|e| {
            debug!(target: "membership", tx = %tx.payload_hash(), version = table.version(), error = %e, "accept rejected")
        })
}

fn check_accept<'t, S: DataStore + ?Sized>(
    tx: &Transaction,
    table: &'t ValidatorTable,
    store: &S,
) -> Result<&'t Node, ValidationError> {
    if tx.outputs.len() != 1 {
        return Err(ValidationError::InvalidOutputsCount {
            kind: MembershipKind::Accept,
            count: tx.outputs.len(),
        });
    }
    if tx.inputs.len() != 2 {
        return Err(ValidationError::InvalidInputsCount {
            count: tx.inputs.len(),
        });
    }
    if tx.asset != base_asset_id() {
        return Err(ValidationError::InvalidAsset {
            kind: MembershipKind::Accept,
            asset: tx.asset,
        });
    }

    let mut pledging: Option<&Node> = None;
    for n in table.iter() {
        match n.state() {
            NodeState::Accepted => {}
            NodeState::Departing => {
                return Err(ValidationError::NodeNotAccepted {
                    signer: *n.signer(),
                    state: n.state(),
                });
            }
            NodeState::Pledging => {
                if let Some(first) = pledging {
                    return Err(ValidationError::MultiplePledgingNodes {
                        first: *first.signer(),
                        second: *n.signer(),
                    });
                }
                pledging = Some(n);
            }
        }
    }
    let pledging = pledging.ok_or(ValidationError::NoPledgingNode)?;

    let accept = bond_output(tx.inputs[0].hash, BondSource::Accept, table, store)?;
    let pledge = bond_output(tx.inputs[1].hash, BondSource::Pledge, table, store)?;

    let expected = Amount::units(PLEDGE_AMOUNT)
        .checked_mul(table.len() as u64)
        .ok_or(ValidationError::AmountOverflow)?;
    let inputs = accept
        .amount
        .checked_add(pledge.amount)
        .ok_or(ValidationError::AmountOverflow)?;
    if inputs != expected {
        return Err(ValidationError::InvalidAcceptInputAmount {
            accept: accept.amount,
            pledge: pledge.amount,
            expected,
        });
    }
    let output = tx.outputs[0].amount;
    if output != inputs {
        return Err(ValidationError::InvalidAcceptOutputAmount { output, inputs });
    }

    Ok(pledging)
}

/// Resolves the sole output of the transaction `hash` and checks that it is
/// a `source` bond owned by a node in the expected state.
fn bond_output<S: DataStore + ?Sized>(
    hash: Hash,
    source: BondSource,
    table: &ValidatorTable,
    store: &S,
) -> Result<Output, ValidationError> {
    let prev = store
        .read_transaction(&hash)?
        .ok_or(ValidationError::MissingSourceTransaction {
            source_kind: source,
            hash,
        })?;

    let output = match prev.outputs.as_slice() {
        [o] => *o,
        outputs => {
            return Err(ValidationError::InvalidSourceOutputsCount {
                source_kind: source,
                count: outputs.len(),
            });
        }
    };
    if output.output_type != source.output_type() {
        return Err(ValidationError::InvalidSourceOutputType {
            source_kind: source,
            output_type: output.output_type,
        });
    }

    let spend = prev
        .committed_spend_key()
        .ok_or(ValidationError::InvalidSourceExtra {
            source_kind: source,
            hash,
        })?;
    let owner = Address::from_public_spend(spend);
    let state = table.state_of(&owner);
    if state != Some(source.owner_state()) {
        return Err(ValidationError::InvalidSourceOwner {
            source_kind: source,
            owner,
            state,
        });
    }

    Ok(output)
}

impl Transaction {
    /// [`validate_pledge`] against the validator table currently in `store`.
    pub fn validate_node_pledge<'a, S: DataStore + ?Sized>(
        &self,
        store: &S,
        inputs: impl IntoIterator<Item = &'a Utxo>,
    ) -> Result<(), ValidationError> {
        let table = store.read_consensus_nodes()?;
        validate_pledge(self, &table, inputs)
    }

    /// [`validate_accept`] against the validator table currently in `store`.
    pub fn validate_node_accept<S: DataStore + ?Sized>(&self, store: &S) -> Result<(), ValidationError> {
        let table = store.read_consensus_nodes()?;
        validate_accept(self, &table, store)
    }

    /// Runs whichever membership rule applies to this transaction.
    ///
    /// Returns `Ok(None)` for transactions that are neither pledges nor accepts.
    pub fn validate_membership<'a, S: DataStore + ?Sized>(
        &self,
        table: &ValidatorTable,
        store: &S,
        inputs: impl IntoIterator<Item = &'a Utxo>,
    ) -> Result<Option<MembershipKind>, ValidationError> {
        match self.membership_kind() {
            Some(MembershipKind::Pledge) => validate_pledge(self, table, inputs).map(|_| Some(MembershipKind::Pledge)),
            Some(MembershipKind::Accept) => validate_accept(self, table, store).map(|_| Some(MembershipKind::Accept)),
            None => Ok(None),
        }
    }
}

impl ValidatorTable {
    /// Validates `tx` as a pledge against this exact table and returns the
    /// next table, holding the new PLEDGING node.
    pub fn commit_pledge<'a>(
        &self,
        tx: &Transaction,
        inputs: impl IntoIterator<Item = &'a Utxo>,
    ) -> Result<ValidatorTable, ValidationError> {
        validate_pledge(tx, self, inputs)?;
        let (signer, payee) = tx
            .pledge_keys()
            .ok_or(ValidationError::InvalidExtraLength {
                length: tx.extra.len(),
            })?;
        let signer = Address::from_public_spend(signer);
        let payee = Address::from_public_spend(payee);
        if self.state_of(&signer).is_some() {
            return Err(ValidationError::DuplicateSigner { signer });
        }
        let next = self.with_node(Node::pledging(signer, payee));
        debug!(target: "membership", signer = %signer, version = next.version(), "node pledging");
        Ok(next)
    }

    /// Validates `tx` as an accept against this exact table and returns the
    /// next table, where the pledging node is ACCEPTED.
    pub fn commit_accept<S: DataStore + ?Sized>(
        &self,
        tx: &Transaction,
        store: &S,
    ) -> Result<ValidatorTable, ValidationError> {
        validate_accept(tx, self, store)?;
        let signer = *self
            .pledging()
            .next()
            .ok_or(ValidationError::NoPledgingNode)?
            .signer();
        let next = self
            .with_transition(&signer, Node::accept)
            .ok_or(ValidationError::NoPledgingNode)??;
        debug!(target: "membership", signer = %signer, version = next.version(), "node accepted");
        Ok(next)
    }
}
