//! On-chain configuration record. Mutated only by `prodvote` (each
//! producer votes a numeric value per key; the median, or version-majority
//! for `action-*` keys, is committed once quorum is reached) — see
//! `jmzk-contracts`' prodvote handler.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Category base factors and the global factor the charge manager
/// multiplies network/cpu/storage units by (§4.6).
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug)]
pub struct ChainConfig {
    pub base_network_charge_factor: u32,
    pub base_storage_charge_factor: u32,
    pub base_cpu_charge_factor: u32,
    pub global_charge_factor: u32,
    pub jmzk_link_expired_secs: i64,
    pub max_charge: u32,
    pub net_usage_limit: u32,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            base_network_charge_factor: 1000,
            base_storage_charge_factor: 1000,
            base_cpu_charge_factor: 1000,
            global_charge_factor: 1,
            jmzk_link_expired_secs: crate::constants::DEFAULT_JMZK_LINK_EXPIRED_SECS,
            max_charge: 1_000_000,
            net_usage_limit: 10 * 1024 * 1024,
        }
    }
}

/// Per-action current version, indexed by action name. Persisted in the
/// global property record; the execution context reads it at init and
/// appends new compiled-in actions at version 1 when it is shorter than
/// the compiled-in action set (§4.5).
#[derive(Clone, PartialEq, Serialize, Deserialize, Debug, Default)]
pub struct ActionVersions(pub HashMap<String, u32>);

#[derive(Clone, PartialEq, Serialize, Deserialize, Debug, Default)]
pub struct GlobalProperties {
    pub config: ChainConfig,
    pub action_vers: ActionVersions,
}
