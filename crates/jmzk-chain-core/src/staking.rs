//! Staking pool and embedded-script records. Accounting-only: staking has
//! no consensus effect here (no block producer in scope), and scripts are
//! opaque bodies consumed by an external filter engine this crate does not
//! implement.

use serde::{Deserialize, Serialize};

use crate::name128::Name128;
use crate::symbol::Asset;
use crate::types::{PublicKeyBytes, Timestamp};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Validator {
    pub name: Name128,
    pub creator: PublicKeyBytes,
    pub signing_key: PublicKeyBytes,
    pub commission_rate: f64,
    pub total_staked: Asset,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct StakeShare {
    pub staker: PublicKeyBytes,
    pub validator: Name128,
    pub staked: Asset,
    pub since: Timestamp,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct StakePool {
    pub total_staked: i64,
    pub total_active: i64,
    pub shares: Vec<StakeShare>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct ScriptDef {
    pub name: Name128,
    pub creator: PublicKeyBytes,
    pub body: Vec<u8>,
    pub version: u32,
}
