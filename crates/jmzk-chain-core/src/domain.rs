//! Domain and token principal records (C13's `newdomain`/`issuetoken`/
//! `transfer`/`destroytoken` operate on these).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::group::PermissionDef;
use crate::name128::Name128;
use crate::types::{PublicKeyBytes, Timestamp};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Meta {
    pub key: Name128,
    pub value: String,
    pub creator: PublicKeyBytes,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct DomainDef {
    pub name: Name128,
    pub creator: PublicKeyBytes,
    pub create_time: Timestamp,
    pub issue: PermissionDef,
    pub transfer: PermissionDef,
    pub manage: PermissionDef,
    pub metas: Vec<Meta>,
}

impl DomainDef {
    /// `.disable_destroy` is a reserved meta key; `destroytoken` fails the
    /// domain-wide kill switch when it is present and not `"false"`.
    pub fn destroy_disabled(&self) -> bool {
        self.metas
            .iter()
            .find(|m| m.key.to_string_lossy() == "disable_destroy")
            .map(|m| m.value != "false")
            .unwrap_or(false)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct TokenDef {
    pub domain: Name128,
    pub name: Name128,
    pub owner: Vec<Address>,
    pub metas: Vec<Meta>,
}

impl TokenDef {
    /// A token is destroyed iff its sole owner is the reserved address.
    pub fn is_destroyed(&self) -> bool {
        self.owner.len() == 1 && self.owner[0].is_reserved()
    }

    /// A token is locked iff its sole owner is a generated address with
    /// the "lock" prefix.
    pub fn is_locked(&self) -> bool {
        self.owner.len() == 1 && self.owner[0].has_prefix("lock")
    }
}

/// Balance-like record attached to an address/symbol pair (also used for
/// bookkeeping metadata on NFT domains keyed by name rather than symbol id).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct MetaIndex(pub HashMap<String, String>);

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(b: u8) -> PublicKeyBytes {
        let mut bytes = [0u8; 33];
        bytes[0] = 0x02;
        bytes[32] = b;
        PublicKeyBytes(bytes)
    }

    #[test]
    fn destroyed_token_has_single_reserved_owner() {
        let t = TokenDef {
            domain: Name128::from_str_checked("d1").unwrap(),
            name: Name128::from_str_checked("a").unwrap(),
            owner: vec![Address::Reserved],
            metas: vec![],
        };
        assert!(t.is_destroyed());
    }

    #[test]
    fn live_token_is_not_destroyed() {
        let t = TokenDef {
            domain: Name128::from_str_checked("d1").unwrap(),
            name: Name128::from_str_checked("a").unwrap(),
            owner: vec![Address::PublicKey(pk(1))],
            metas: vec![],
        };
        assert!(!t.is_destroyed());
    }

    #[test]
    fn disable_destroy_meta_gate() {
        let mut d = DomainDef {
            name: Name128::from_str_checked("d1").unwrap(),
            creator: pk(1),
            create_time: 0,
            issue: PermissionDef { name: Name128::from_str_checked("issue").unwrap(), threshold: 1, authorizers: vec![] },
            transfer: PermissionDef { name: Name128::from_str_checked("transfer").unwrap(), threshold: 1, authorizers: vec![] },
            manage: PermissionDef { name: Name128::from_str_checked("manage").unwrap(), threshold: 0, authorizers: vec![] },
            metas: vec![],
        };
        assert!(!d.destroy_disabled());
        d.metas.push(Meta {
            key: Name128::from_str_checked("disable_destroy").unwrap(),
            value: "true".into(),
            creator: pk(1),
        });
        assert!(d.destroy_disabled());
    }
}
