//! Suspend proposal: a deferred transaction collecting signatures before
//! execution (C13 `newsuspend`/`aprvsuspend`/`cancelsuspend`/`execsuspend`).

use serde::{Deserialize, Serialize};

use crate::name128::Name128;
use crate::transaction::TransactionBody;
use crate::types::{PublicKeyBytes, RecoverableSignature};

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum SuspendStatus {
    Proposed,
    Executed,
    Failed,
    Cancelled,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct SuspendDef {
    pub name: Name128,
    pub proposer: PublicKeyBytes,
    pub status: SuspendStatus,
    pub trx: TransactionBody,
    pub signed_keys: Vec<PublicKeyBytes>,
    pub signatures: Vec<RecoverableSignature>,
}

impl SuspendDef {
    pub fn is_pending(&self) -> bool {
        matches!(self.status, SuspendStatus::Proposed)
    }
}
