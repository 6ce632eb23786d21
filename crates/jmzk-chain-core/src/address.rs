//! Tagged-union principal identifier. Every balance, owner slot and payer
//! field is an `Address`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::name128::Name128;
use crate::types::PublicKeyBytes;

/// `reserved` is the all-zero address: the sink for destroyed tokens and
/// burned fungibles. It can never sign, own a live token, or pay.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Address {
    Reserved,
    PublicKey(PublicKeyBytes),
    Generated { prefix: Name128, key: Name128, nonce: u32 },
}

impl Address {
    pub fn is_reserved(&self) -> bool {
        matches!(self, Address::Reserved)
    }

    /// `.domain:<name>` — the deterministic sink/payer address for a domain.
    pub fn for_domain(domain: Name128) -> Self {
        Address::Generated {
            prefix: Name128::from_str_checked("domain").unwrap(),
            key: domain,
            nonce: 0,
        }
    }

    /// `.fungible:<sym_id>` — the mint/recycle sink for a fungible token.
    pub fn for_fungible(sym_id: u32) -> Self {
        Address::Generated {
            prefix: Name128::from_str_checked("fungible").unwrap(),
            key: Name128(sym_id as u128),
            nonce: 0,
        }
    }

    /// `.lock:<proposal_name>:0` — the escrow address for a lock proposal.
    pub fn for_lock(name: Name128) -> Self {
        Address::Generated {
            prefix: Name128::from_str_checked("lock").unwrap(),
            key: name,
            nonce: 0,
        }
    }

    /// `.psvbonus:<sym_id>:<round>` — the collection/distribution address
    /// for a passive bonus round.
    pub fn for_psvbonus(sym_id: u32, round: u32) -> Self {
        Address::Generated {
            prefix: Name128::from_str_checked("psvbonus").unwrap(),
            key: Name128(sym_id as u128),
            nonce: round,
        }
    }

    /// `.stake:<validator_name>:0` — the escrow address holding a
    /// validator's staked principal plus any bonus credited to it.
    pub fn for_stake(validator: Name128) -> Self {
        Address::Generated {
            prefix: Name128::from_str_checked("stake").unwrap(),
            key: validator,
            nonce: 0,
        }
    }

    /// True when this is a generated address with the given prefix name.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        match self {
            Address::Generated { prefix: p, .. } => p.to_string_lossy() == prefix,
            _ => false,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Reserved => write!(f, "RESERVED"),
            Address::PublicKey(pk) => write!(f, "{pk}"),
            Address::Generated { prefix, key, nonce } => {
                write!(f, ".{prefix}:{key}:{nonce}")
            }
        }
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_address_has_prefix() {
        let d = Name128::from_str_checked("d1").unwrap();
        let a = Address::for_domain(d);
        assert!(a.has_prefix("domain"));
        assert!(!a.has_prefix("lock"));
    }

    #[test]
    fn reserved_is_reserved() {
        assert!(Address::Reserved.is_reserved());
        let a = Address::for_lock(Name128::from_str_checked("s1").unwrap());
        assert!(!a.is_reserved());
    }
}
