//! Controller (C15): the single point the transaction processor asks for
//! chain state it doesn't own directly — head/pending block clock,
//! on-chain config and action-version table, the shared execution
//! context and ABI serializer, TAPOS/expiration validation, and the raw
//! TDB/cache handles (§6.1).
//!
//! `jmzk-chain-node` provides the one concrete implementation this
//! workspace ships, `InMemoryController`, built for the §8 integration
//! scenarios. A real block-producing, fork-db-aware, networked
//! controller is out of scope per §1.

use std::sync::{Arc, RwLock};

use jmzk_abi::AbiSerializer;
use jmzk_chain_core::{ChainConfig, GlobalProperties, PublicKeyBytes, Result, Timestamp, TransactionBody};
use jmzk_exec_context::ExecutionContext;
use jmzk_state::{Tdb, TdbCache};

use crate::trace::TransactionTrace;

pub trait Controller {
    fn head_block_time(&self) -> Timestamp;
    fn pending_block_time(&self) -> Timestamp;
    fn pending_block_producer(&self) -> Option<PublicKeyBytes>;

    fn global_properties(&self) -> GlobalProperties;
    fn set_chain_config(&self, cfg: ChainConfig);
    fn set_action_version(&self, name: &str, ver: u32) -> Result<u32>;

    /// Readers take a shared lock to dispatch; the processor takes a
    /// write lock only when applying a `prodvote`-committed action
    /// version bump (§4.5/§4.8).
    fn execution_context(&self) -> &RwLock<ExecutionContext>;
    fn abi_serializer(&self) -> &AbiSerializer;

    fn validate_tapos(&self, trx: &TransactionBody) -> Result<()>;
    fn validate_expiration(&self, trx: &TransactionBody) -> Result<()>;

    fn token_db(&self) -> &Tdb;
    fn token_db_cache(&self) -> &Arc<TdbCache>;

    /// Drives a previously-proposed `SuspendDef` through the same
    /// dispatch pipeline ordinary transactions use, per §4.8's
    /// `execsuspend` description. Implementations delegate to their own
    /// `TransactionProcessor::push_suspend_transaction`.
    fn push_suspend_transaction(
        &self,
        name: jmzk_chain_core::Name128,
        executer: PublicKeyBytes,
        deadline: std::time::Instant,
    ) -> Result<TransactionTrace>;

    fn on_pre_accepted_block(&self) {}
    fn on_accepted_block(&self) {}
    fn on_applied_transaction(&self, _trace: &TransactionTrace) {}
    fn on_irreversible_block(&self) {}
}
