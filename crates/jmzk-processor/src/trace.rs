//! Per-transaction execution trace (§4.7): one [`ActionTrace`] per
//! dispatched action, plus the synthetic `paycharge` entry appended once
//! the user's own actions all succeed, and the terminal
//! [`TransactionStatus`] the state machine settled on.

use serde::{Deserialize, Serialize};

use jmzk_chain_core::Action;

/// Mirrors the handful of terminal states a pushed transaction can reach.
/// Only `Executed` and `HardFail` are produced by [`crate::processor`]
/// today; `SoftFail`, `Delayed` and `Expired` are carried for API
/// compatibility with callers that already branch on them.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum TransactionStatus {
    Executed,
    SoftFail,
    HardFail,
    Delayed,
    Expired,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ActionTrace {
    pub action: Action,
    pub error: Option<String>,
}

impl ActionTrace {
    pub fn ok(action: Action) -> Self {
        ActionTrace { action, error: None }
    }

    pub fn failed(action: Action, error: String) -> Self {
        ActionTrace { action, error: Some(error) }
    }
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct TransactionTrace {
    pub id: [u8; 32],
    pub status: TransactionStatus,
    pub charge: u32,
    pub action_traces: Vec<ActionTrace>,
    pub except: Option<String>,
}

impl TransactionTrace {
    pub fn hard_fail(id: [u8; 32], action_traces: Vec<ActionTrace>, except: String) -> Self {
        TransactionTrace { id, status: TransactionStatus::HardFail, charge: 0, action_traces, except: Some(except) }
    }
}
