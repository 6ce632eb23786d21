//! Charge manager (C11): turns a packed transaction into the native-token
//! unit cost paid for executing it.
//!
//! Per-action overrides (e.g. `issuetoken` charging more cpu per extra
//! name, `issuefungible` waiving its extra factor for the native token)
//! are registered at runtime rather than hardcoded here, since only the
//! contract crate that defines an action's payload type can deserialize
//! `Action::data` to inspect it — this crate only knows the shared
//! `Action` envelope.

use std::collections::HashMap;

use jmzk_chain_core::{
    action_name_id, Action, ChainConfig, JmzkError, PackedTransaction, Result, CHARGE_DIVISOR,
    CPU_UNITS_PER_SIGNATURE, DEFAULT_ACTION_CPU_UNITS, DEFAULT_ACTION_EXTRA_FACTOR, SIGNATURE_SIZE,
};

/// Per-action-type charge override. Default methods reproduce
/// `base_act_charge`: storage billed on the wire size of the action's
/// payload, a flat cpu unit count, and a flat extra factor.
pub trait ActionCharge: Send + Sync {
    fn storage(&self, act: &Action) -> u32 {
        act.data.len() as u32
    }
    fn cpu(&self, _act: &Action) -> u32 {
        DEFAULT_ACTION_CPU_UNITS
    }
    fn extra_factor(&self, _act: &Action) -> u32 {
        DEFAULT_ACTION_EXTRA_FACTOR
    }
}

struct DefaultCharge;
impl ActionCharge for DefaultCharge {}

pub struct ChargeManager {
    config: ChainConfig,
    overrides: HashMap<u64, Box<dyn ActionCharge>>,
}

impl ChargeManager {
    pub fn new(config: ChainConfig) -> Self {
        ChargeManager { config, overrides: HashMap::new() }
    }

    pub fn register_override(&mut self, action_name: &str, charge: Box<dyn ActionCharge>) {
        self.overrides.insert(action_name_id(action_name), charge);
    }

    fn charge_for(&self, act: &Action) -> &dyn ActionCharge {
        self.overrides.get(&act.name).map(|b| b.as_ref()).unwrap_or(&DefaultCharge)
    }

    fn network(ptrx: &PackedTransaction, sig_num: usize) -> Result<u32> {
        let unprunable = bincode::serialize(&ptrx.body)?.len() as u32;
        Ok(unprunable + sig_num as u32 * SIGNATURE_SIZE as u32)
    }

    fn cpu_base(sig_num: usize) -> u32 {
        sig_num as u32 * CPU_UNITS_PER_SIGNATURE
    }

    /// `sig_num` lets the processor account for signatures not yet
    /// attached to `ptrx` (e.g. while estimating cost before signing);
    /// it's floored at `ptrx.signatures.len()`.
    pub fn calculate(&self, ptrx: &PackedTransaction, sig_num: Option<usize>) -> Result<u32> {
        if ptrx.body.actions.is_empty() {
            return Err(JmzkError::TxNoAction);
        }
        let sig_num = sig_num.unwrap_or(0).max(ptrx.signatures.len());

        let mut base = 0u64;
        base += Self::network(ptrx, sig_num)? as u64 * self.config.base_network_charge_factor as u64;
        base += Self::cpu_base(sig_num) as u64 * self.config.base_cpu_charge_factor as u64;

        let per_action_base = base / ptrx.body.actions.len() as u64;

        let mut total = 0u64;
        for act in &ptrx.body.actions {
            let charge = self.charge_for(act);
            let mut unit = charge.storage(act) as u64 * self.config.base_storage_charge_factor as u64;
            unit += charge.cpu(act) as u64 * self.config.base_cpu_charge_factor as u64;
            let extra = charge.extra_factor(act) as u64;
            total += (unit + per_action_base) * extra;
        }

        total *= self.config.global_charge_factor as u64;
        total /= CHARGE_DIVISOR as u64;
        Ok(total as u32)
    }
}
