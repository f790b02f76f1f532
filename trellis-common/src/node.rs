//! Validator records and the versioned validator table.
//!
//! A node moves PLEDGING -> ACCEPTED -> DEPARTING and is then removed. The
//! state can only change through [`Node::accept`] and [`Node::depart`], so a
//! record never skips a step.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::Hash;
use crate::types::Address;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    Pledging,
    Accepted,
    Departing,
}

impl fmt::Debug for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeState::Pledging => write!(f, "PLEDGING"),
            NodeState::Accepted => write!(f, "ACCEPTED"),
            NodeState::Departing => write!(f, "DEPARTING"),
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("node {signer} cannot move from {from} to {to}")]
pub struct NodeTransitionError {
    pub signer: Address,
    pub from: NodeState,
    pub to: NodeState,
}

/// One validator identity.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Node {
    signer: Address,
    payee: Address,
    state: NodeState,
}

impl Node {
    /// A node whose pledge has been honored but not yet accepted.
    pub fn pledging(signer: Address, payee: Address) -> Self {
        Node {
            signer,
            payee,
            state: NodeState::Pledging,
        }
    }

    /// A member of the initial validator set.
    pub fn genesis(signer: Address, payee: Address) -> Self {
        Node {
            signer,
            payee,
            state: NodeState::Accepted,
        }
    }

    pub fn accept(self) -> Result<Node, NodeTransitionError> {
        self.transition(NodeState::Pledging, NodeState::Accepted)
    }

    pub fn depart(self) -> Result<Node, NodeTransitionError> {
        self.transition(NodeState::Accepted, NodeState::Departing)
    }

    fn transition(self, from: NodeState, to: NodeState) -> Result<Node, NodeTransitionError> {
        if self.state != from {
            return Err(NodeTransitionError {
                signer: self.signer,
                from: self.state,
                to,
            });
        }
        Ok(Node { state: to, ..self })
    }

    pub fn signer(&self) -> &Address {
        &self.signer
    }

    pub fn payee(&self) -> &Address {
        &self.payee
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_accepted(&self) -> bool {
        self.state == NodeState::Accepted
    }

    /// Validator id of this node on `network_id`.
    pub fn id_for_network(&self, network_id: &Hash) -> Hash {
        self.signer.hash().for_network(network_id)
    }
}

/// The validator set as of one store version.
///
/// Membership checks and graph loading take the table explicitly, and a
/// commit is only meaningful against the exact table it was validated with.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct ValidatorTable {
    version: u64,
    nodes: Vec<Node>,
}

impl ValidatorTable {
    pub fn new(version: u64, nodes: Vec<Node>) -> Self {
        ValidatorTable { version, nodes }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// State of the node whose signer is `signer`, if it is in the table.
    pub fn state_of(&self, signer: &Address) -> Option<NodeState> {
        self.nodes
            .iter()
            .find(|n| n.signer == *signer)
            .map(|n| n.state)
    }

    pub fn pledging(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|n| n.state == NodeState::Pledging)
    }

    /// Returns the next version of the table with `node` appended.
    pub(crate) fn with_node(&self, node: Node) -> ValidatorTable {
        let mut nodes = self.nodes.clone();
        nodes.push(node);
        ValidatorTable {
            version: self.version + 1,
            nodes,
        }
    }

    /// Returns the next version of the table with the node signed by
    /// `signer` replaced by the result of `f`.
    pub(crate) fn with_transition(
        &self,
        signer: &Address,
        f: impl FnOnce(Node) -> Result<Node, NodeTransitionError>,
    ) -> Option<Result<ValidatorTable, NodeTransitionError>> {
        let pos = self.nodes.iter().position(|n| n.signer == *signer)?;
        let mut nodes = self.nodes.clone();
        let node = nodes.remove(pos);
        Some(f(node).map(|updated| {
            nodes.insert(pos, updated);
            ValidatorTable {
                version: self.version + 1,
                nodes,
            }
        }))
    }
}
