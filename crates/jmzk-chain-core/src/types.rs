//! Small shared aliases used across the data model. Key material itself
//! (signing, recovery) lives in `jmzk-crypto`; this crate only needs the
//! wire shape of a public key, not the operations on it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::JmzkError;

/// Unix timestamp (seconds, UTC).
pub type Timestamp = i64;

/// Current wall-clock time as a `Timestamp`. Nodes use this to seed their
/// controller clock at startup; transaction expiration/tapos checks take
/// the chain's own clock rather than calling this directly.
pub fn now() -> Timestamp {
    chrono::Utc::now().timestamp()
}

/// Compressed SEC1 secp256k1 public key (33 bytes: 1 prefix + 32 x-coord).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PublicKeyBytes(pub [u8; 33]);

impl PublicKeyBytes {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let mut arr = [0u8; 33];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Base-58 encoding, the conventional external representation for
    /// keys in this chain family (wallets/explorers show this form, not
    /// hex).
    pub fn to_b58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    pub fn from_b58(s: &str) -> Result<Self, JmzkError> {
        let bytes = bs58::decode(s).into_vec().map_err(|e| JmzkError::InvalidArgument(e.to_string()))?;
        if bytes.len() != 33 {
            return Err(JmzkError::InvalidArgument(format!("expected 33 bytes, got {}", bytes.len())));
        }
        let mut arr = [0u8; 33];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Display for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}…)", &self.to_hex()[..12])
    }
}

/// 65-byte recoverable ECDSA signature: 64-byte (r, s) plus 1-byte recovery id.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature(pub [u8; 65]);

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}…)", &hex::encode(&self.0[..8]))
    }
}

/// 32-byte chain block id, as produced by the controller (out of scope
/// here; only its wire shape matters for tapos fields).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub [u8; 32]);

impl BlockId {
    /// `ref_block_num = bswap32(id[0..4]) & 0xFFFF`.
    pub fn ref_block_num(&self) -> u16 {
        let word = u32::from_be_bytes(self.0[0..4].try_into().unwrap());
        (word.swap_bytes() & 0xFFFF) as u16
    }

    /// `ref_block_prefix = id[4..8]` interpreted as little-endian u32.
    pub fn ref_block_prefix(&self) -> u32 {
        u32::from_le_bytes(self.0[4..8].try_into().unwrap())
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_b58_round_trips() {
        let key = PublicKeyBytes([7u8; 33]);
        let s = key.to_b58();
        assert_eq!(PublicKeyBytes::from_b58(&s).unwrap(), key);
    }

    #[test]
    fn block_id_tapos_fields() {
        let mut bytes = [0u8; 32];
        bytes[0..4].copy_from_slice(&0x0001_2345u32.to_be_bytes());
        bytes[4..8].copy_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
        let id = BlockId(bytes);
        assert_eq!(id.ref_block_num(), 0x2345);
        assert_eq!(id.ref_block_prefix(), 0xDEAD_BEEF);
    }
}
