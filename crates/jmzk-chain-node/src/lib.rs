//! Wires every crate in the workspace together into a runnable chain: TDB
//! → cache → execution context → contracts → transaction processor,
//! behind the one [`controller::InMemoryController`] this workspace
//! ships. `bootstrap` is the single entry point both `main.rs` and the
//! integration tests under `tests/` use to stand one up.

pub mod controller;

use std::sync::Arc;

use jmzk_chain_core::{Name128, PackedTransaction, TransactionBody, TransactionHeader};
use jmzk_crypto::KeyPair;
use jmzk_genesis::GenesisParams;
use jmzk_processor::TransactionProcessor;
use jmzk_state::{Tdb, TdbCache};

use crate::controller::InMemoryController;

/// Default cache capacity for the harness; large enough that none of the
/// integration scenarios evict a record they still need.
const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// A fully wired chain: the processor callers dispatch transactions
/// through, plus the controller it was built around (kept so tests can
/// drive the clock or hand `push_suspend_transaction` to `execsuspend`).
pub struct Chain {
    pub controller: Arc<InMemoryController>,
    pub processor: Arc<TransactionProcessor<InMemoryController>>,
    pub chain_id: [u8; 32],
}

/// Builds a fresh in-memory chain seeded with genesis, with every
/// compiled-in action registered and every action payload type in the
/// ABI table. `loadtest_mode` is on by default: the integration tests
/// exercise contract semantics, not the charge/solvency pipeline, and
/// turning it on waives header/tapos/expiration/payer-signature/charge
/// checks the same way a load-test deployment would (§4.7).
pub fn bootstrap(founder: &KeyPair) -> anyhow::Result<Chain> {
    let chain_id = [0u8; 32];
    let tdb = Tdb::open_in_memory()?;

    let genesis_params = GenesisParams::new(founder.public_key());
    apply_genesis_and_wrap(tdb, chain_id, genesis_params)
}

fn apply_genesis_and_wrap(tdb: Tdb, chain_id: [u8; 32], genesis_params: GenesisParams) -> anyhow::Result<Chain> {
    let global_props = jmzk_genesis::apply_genesis(&tdb, &genesis_params)?;

    let cache = TdbCache::new(Arc::new(tdb), DEFAULT_CACHE_CAPACITY);
    let contract_ctx = Arc::new(jmzk_contracts::context::ContractContext::new(cache.clone(), chain_id, genesis_params.config.clone()));
    contract_ctx.set_loadtest_mode(true);

    let exec_ctx = jmzk_contracts::registry::register_actions(contract_ctx.clone())?;

    let controller = Arc::new(InMemoryController::new(cache, exec_ctx, global_props));
    let processor = Arc::new(TransactionProcessor::new(controller.clone(), contract_ctx));
    controller.bind_processor(Arc::downgrade(&processor));

    Ok(Chain { controller, processor, chain_id })
}

/// Wraps a single action into a minimal transaction body. The header
/// fields are inert under `loadtest_mode`; `payer` only needs to not be
/// `Address::Reserved` (§4.7 rejects that unconditionally).
pub fn single_action_body(action: jmzk_chain_core::Action, payer: jmzk_chain_core::Address) -> TransactionBody {
    TransactionBody {
        header: TransactionHeader { expiration: 0, ref_block_num: 0, ref_block_prefix: 0, max_charge: 0 },
        actions: vec![action],
        payer,
        transaction_extensions: vec![],
    }
}

pub fn body_of(actions: Vec<jmzk_chain_core::Action>, payer: jmzk_chain_core::Address) -> TransactionBody {
    TransactionBody {
        header: TransactionHeader { expiration: 0, ref_block_num: 0, ref_block_prefix: 0, max_charge: 0 },
        actions,
        payer,
        transaction_extensions: vec![],
    }
}

/// Signs `body` with every key in `signers`, producing the packed
/// transaction a caller would submit to [`TransactionProcessor::push_transaction`].
pub fn sign(body: TransactionBody, signers: &[&KeyPair], chain_id: &[u8; 32]) -> anyhow::Result<PackedTransaction> {
    let digest = body.digest(chain_id)?;
    let signatures = signers.iter().map(|kp| kp.sign_prehash(&digest)).collect::<Result<Vec<_>, _>>()?;
    Ok(PackedTransaction { body, signatures })
}

pub fn name(s: &str) -> Name128 {
    Name128::from_str_checked(s).expect("valid test name128")
}
