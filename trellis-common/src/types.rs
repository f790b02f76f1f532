use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::{Hash, Key, PrivateKey, KEY_SIZE};

/// Bond, in base-asset units, that each validator contributes on admission.
pub const PLEDGE_AMOUNT: u64 = 10000;

/// Symbol hashed into the base asset id.
pub const BASE_ASSET_SYMBOL: &str = "TRL";

/// Asset id of the network's native unit.
pub fn base_asset_id() -> Hash {
    Hash::new(BASE_ASSET_SYMBOL.as_bytes())
}

/// A receiving address: a view key and a spend key.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    pub public_spend_key: Key,
    pub public_view_key: Key,
}

impl Address {
    /// Rebuilds the address that owns `spend` when its view key was derived
    /// deterministically from the spend key.
    pub fn from_public_spend(spend: Key) -> Self {
        Address {
            public_spend_key: spend,
            public_view_key: spend.deterministic_hash_derive().public(),
        }
    }

    pub fn hash(&self) -> Hash {
        let mut buf = Vec::with_capacity(2 * KEY_SIZE);
        buf.extend_from_slice(self.public_spend_key.as_bytes());
        buf.extend_from_slice(self.public_view_key.as_bytes());
        Hash::new(&buf)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.public_spend_key, self.public_view_key)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

/// An address together with its private keys.
#[derive(Clone, Debug)]
pub struct Account {
    pub address: Address,
    pub private_spend_key: PrivateKey,
    pub private_view_key: PrivateKey,
}

impl Account {
    pub fn from_seed(seed: &[u8]) -> Self {
        let private_spend_key = PrivateKey::from_seed(seed);
        let public_spend_key = private_spend_key.public();
        let private_view_key = public_spend_key.deterministic_hash_derive();
        Account {
            address: Address {
                public_spend_key,
                public_view_key: private_view_key.public(),
            },
            private_spend_key,
            private_view_key,
        }
    }
}

/// A quantity of some asset in indivisible base units.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount(pub u128);

impl Amount {
    pub const fn units(n: u64) -> Self {
        Amount(n as u128)
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_mul(self, n: u64) -> Option<Amount> {
        self.0.checked_mul(n as u128).map(Amount)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an output is for. Only `Script` outputs are generically spendable;
/// the rest tag validator lifecycle transactions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum OutputType {
    Script,
    NodePledge,
    NodeAccept,
    NodeDepart,
    NodeRemove,
}

impl OutputType {
    fn tag(&self) -> u8 {
        match self {
            OutputType::Script => 0x00,
            OutputType::NodePledge => 0xa3,
            OutputType::NodeAccept => 0xa4,
            OutputType::NodeDepart => 0xa5,
            OutputType::NodeRemove => 0xa6,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Input {
    pub hash: Hash,
    pub index: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Output {
    pub output_type: OutputType,
    pub amount: Amount,
}

/// An unspent output, as resolved from the store for a transaction input.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Utxo {
    pub input: Input,
    pub output: Output,
    pub asset: Hash,
}

/// Which validator membership rule a transaction falls under.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MembershipKind {
    Pledge,
    Accept,
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub asset: Hash,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub extra: Vec<u8>,
}

impl Transaction {
    pub fn new(asset: Hash) -> Self {
        Transaction {
            asset,
            inputs: Vec::new(),
            outputs: Vec::new(),
            extra: Vec::new(),
        }
    }

    pub fn add_input(&mut self, hash: Hash, index: u32) {
        self.inputs.push(Input { hash, index });
    }

    pub fn add_output(&mut self, output_type: OutputType, amount: Amount) {
        self.outputs.push(Output {
            output_type,
            amount,
        });
    }

    /// Canonical encoding hashed into the transaction id.
    pub fn payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 + self.inputs.len() * 36 + self.outputs.len() * 17);
        buf.extend_from_slice(self.asset.as_bytes());
        buf.extend_from_slice(&(self.inputs.len() as u32).to_be_bytes());
        for input in &self.inputs {
            buf.extend_from_slice(input.hash.as_bytes());
            buf.extend_from_slice(&input.index.to_be_bytes());
        }
        buf.extend_from_slice(&(self.outputs.len() as u32).to_be_bytes());
        for output in &self.outputs {
            buf.push(output.output_type.tag());
            buf.extend_from_slice(&output.amount.0.to_be_bytes());
        }
        buf.extend_from_slice(&(self.extra.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.extra);
        buf
    }

    pub fn payload_hash(&self) -> Hash {
        Hash::new(&self.payload())
    }

    pub fn membership_kind(&self) -> Option<MembershipKind> {
        match self.outputs.as_slice() {
            [o] if o.output_type == OutputType::NodePledge => Some(MembershipKind::Pledge),
            [o] if o.output_type == OutputType::NodeAccept => Some(MembershipKind::Accept),
            _ => None,
        }
    }

    /// Spend key committed in the first `KEY_SIZE` bytes of `extra`.
    pub fn committed_spend_key(&self) -> Option<Key> {
        Key::from_slice(&self.extra)
    }

    /// Signer and payee spend keys packed into a pledge's `extra`.
    pub fn pledge_keys(&self) -> Option<(Key, Key)> {
        if self.extra.len() != 2 * KEY_SIZE {
            return None;
        }
        let signer = Key::from_slice(&self.extra[..KEY_SIZE])?;
        let payee = Key::from_slice(&self.extra[KEY_SIZE..])?;
        Some((signer, payee))
    }
}

/// Record that one transaction was confirmed in a validator's round.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub node_id: Hash,
    pub round_number: u64,
    pub transaction: Hash,
    pub timestamp: u64,
    pub references: [Hash; 2],
}

impl Snapshot {
    pub fn payload(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(32 * 4 + 16);
        buf.extend_from_slice(self.node_id.as_bytes());
        buf.extend_from_slice(&self.round_number.to_be_bytes());
        buf.extend_from_slice(self.transaction.as_bytes());
        buf.extend_from_slice(&self.timestamp.to_be_bytes());
        for r in &self.references {
            buf.extend_from_slice(r.as_bytes());
        }
        buf
    }

    pub fn payload_hash(&self) -> Hash {
        Hash::new(&self.payload())
    }
}

/// Head round metadata as persisted for one validator.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct RoundMeta {
    pub number: u64,
    pub timestamp: u64,
    pub references: [Hash; 2],
}
