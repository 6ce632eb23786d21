//! Lock proposal: an escrow that releases assets to one address list on
//! condition, or another after a deadline (C13 `newlock`/`aprvlock`/
//! `tryunlock`, §4.10).

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::name128::Name128;
use crate::symbol::Asset;
use crate::types::{PublicKeyBytes, Timestamp};

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum LockStatus {
    Proposed,
    Succeed,
    Failed,
}

/// Only the threshold-of-keys condition exists today; modeled as an enum
/// so additional condition kinds can be added without breaking callers
/// that pattern-match exhaustively on the variant they know about.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum LockCondition {
    Keys { threshold: u32, cond_keys: Vec<PublicKeyBytes> },
}

impl LockCondition {
    pub fn validate(&self) -> bool {
        match self {
            LockCondition::Keys { threshold, cond_keys } => {
                *threshold > 0 && cond_keys.len() as u32 >= *threshold
            }
        }
    }

    pub fn satisfied_by(&self, signed_keys: &[PublicKeyBytes]) -> bool {
        match self {
            LockCondition::Keys { threshold, cond_keys } => {
                let count = cond_keys.iter().filter(|k| signed_keys.contains(k)).count();
                count as u32 >= *threshold
            }
        }
    }
}

/// An asset locked in the proposal: either an NFT `(domain, name)` or a
/// fungible amount. Pinned native (`pjmzk`) may not be locked.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum LockAsset {
    Token { domain: Name128, name: Name128 },
    Fungible(Asset),
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct LockDef {
    pub name: Name128,
    pub proposer: PublicKeyBytes,
    pub status: LockStatus,
    pub unlock_time: Timestamp,
    pub deadline: Timestamp,
    pub assets: Vec<LockAsset>,
    pub condition: LockCondition,
    pub succeed: Vec<Address>,
    pub failed: Vec<Address>,
    pub signed_keys: Vec<PublicKeyBytes>,
}

impl LockDef {
    pub fn escrow_address(&self) -> Address {
        Address::for_lock(self.name)
    }

    /// If any fungible asset is present, both outcome lists must be
    /// singletons (a fungible transfer cannot fan out to many owners).
    pub fn validate_outcome_lists(&self) -> bool {
        let has_fungible = self.assets.iter().any(|a| matches!(a, LockAsset::Fungible(_)));
        if has_fungible {
            self.succeed.len() == 1 && self.failed.len() == 1
        } else {
            true
        }
    }
}
