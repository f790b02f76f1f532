use std::fmt;
use std::str::FromStr;

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Sha3_256};

/// Size in bytes of a public key, a private key seed and a hash.
pub const KEY_SIZE: usize = 32;

/// A SHA3-256 digest.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash(pub [u8; 32]);

impl Hash {
    pub fn new(data: &[u8]) -> Self {
        Hash(Sha3_256::digest(data).into())
    }

    /// Scopes an identity hash to a network, so the same signer gets a
    /// distinct validator id on every network it joins.
    pub fn for_network(&self, network_id: &Hash) -> Hash {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&network_id.0);
        buf.extend_from_slice(&self.0);
        Hash::new(&buf)
    }

    /// Byte-wise OR of two digests. Commutative and associative, so
    /// accumulating a set of hashes with it ignores their order.
    pub fn byte_or(&self, other: &Hash) -> Hash {
        let mut out = self.0;
        for (b, o) in out.iter_mut().zip(other.0.iter()) {
            *b |= o;
        }
        Hash(out)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self)
    }
}

impl FromStr for Hash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Hash(out))
    }
}

impl Serialize for Hash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A compressed Ed25519 public key.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Key(pub [u8; KEY_SIZE]);

impl Key {
    /// Derives a private key whose secret is the hash of this public key.
    ///
    /// Anyone holding the public key can recompute the result, which is what
    /// lets an address be rebuilt from a spend key committed on chain.
    pub fn deterministic_hash_derive(&self) -> PrivateKey {
        PrivateKey(SigningKey::from_bytes(&Hash::new(&self.0).0))
    }

    /// Reads a key from the first `KEY_SIZE` bytes of `data`.
    pub fn from_slice(data: &[u8]) -> Option<Key> {
        let bytes: [u8; KEY_SIZE] = data.get(..KEY_SIZE)?.try_into().ok()?;
        Some(Key(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self)
    }
}

/// An Ed25519 secret key.
#[derive(Clone)]
pub struct PrivateKey(SigningKey);

impl PrivateKey {
    /// Hashes arbitrary seed material down to a 32-byte secret.
    pub fn from_seed(seed: &[u8]) -> Self {
        PrivateKey(SigningKey::from_bytes(&Hash::new(seed).0))
    }

    pub fn public(&self) -> Key {
        Key(self.0.verifying_key().to_bytes())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(public: {})", self.public())
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bytes() == other.0.to_bytes()
    }
}

impl Eq for PrivateKey {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_hex_roundtrip_and_length() {
        let h = Hash::new(b"trellis");
        let s = h.to_string();
        assert_eq!(s.len(), 64);
        assert_eq!(s.parse::<Hash>().unwrap(), h);
        assert!("zz".parse::<Hash>().is_err());
    }

    #[test]
    fn for_network_separates_networks() {
        let id = Hash::new(b"signer");
        let a = id.for_network(&Hash::new(b"net-a"));
        let b = id.for_network(&Hash::new(b"net-b"));
        assert_ne!(a, b);
        assert_eq!(a, id.for_network(&Hash::new(b"net-a")));
    }

    #[test]
    fn byte_or_is_commutative() {
        let a = Hash::new(b"a");
        let b = Hash::new(b"b");
        let c = Hash::new(b"c");
        assert_eq!(a.byte_or(&b), b.byte_or(&a));
        assert_eq!(a.byte_or(&b).byte_or(&c), c.byte_or(&a).byte_or(&b));
        assert_eq!(a.byte_or(&a), a);
    }

    #[test]
    fn deterministic_derive_is_stable() {
        let spend = PrivateKey::from_seed(b"spend").public();
        let v1 = spend.deterministic_hash_derive();
        let v2 = spend.deterministic_hash_derive();
        assert_eq!(v1, v2);
        assert_eq!(v1.public(), v2.public());
        assert_ne!(v1.public(), spend);
    }

    #[test]
    fn key_from_short_slice_is_none() {
        assert!(Key::from_slice(&[0u8; 31]).is_none());
        assert_eq!(Key::from_slice(&[7u8; 40]), Some(Key([7u8; 32])));
    }
}
