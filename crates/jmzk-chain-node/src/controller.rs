//! The one concrete [`Controller`] this workspace ships: an in-memory,
//! single-process stand-in for the block clock, on-chain config, and
//! TDB/cache handles a real networked node would own. Built for the
//! integration tests in `tests/`, not for running a chain.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, OnceLock, RwLock, Weak};
use std::time::Instant;

use jmzk_abi::AbiSerializer;
use jmzk_chain_core::{ChainConfig, GlobalProperties, JmzkError, Name128, PublicKeyBytes, Result, Timestamp, TransactionBody};
use jmzk_exec_context::ExecutionContext;
use jmzk_processor::controller::Controller;
use jmzk_processor::trace::TransactionTrace;
use jmzk_processor::TransactionProcessor;
use jmzk_state::{Tdb, TdbCache};

/// Built in two steps because the processor needs a `Controller` handle
/// and the controller needs to call back into the processor for
/// `push_suspend_transaction`: construct the controller, build the
/// processor around it, then bind the processor back with
/// [`InMemoryController::bind_processor`]. The `Weak` reference avoids a
/// reference cycle between the two `Arc`s.
pub struct InMemoryController {
    cache: Arc<TdbCache>,
    abi: AbiSerializer,
    exec_ctx: RwLock<ExecutionContext>,
    global_props: RwLock<GlobalProperties>,
    clock: AtomicI64,
    processor: OnceLock<Weak<TransactionProcessor<InMemoryController>>>,
}

impl InMemoryController {
    pub fn new(cache: Arc<TdbCache>, exec_ctx: ExecutionContext, global_props: GlobalProperties) -> Self {
        InMemoryController {
            cache,
            abi: jmzk_contracts::registry::register_abi_types(),
            exec_ctx: RwLock::new(exec_ctx),
            global_props: RwLock::new(global_props),
            clock: AtomicI64::new(0),
            processor: OnceLock::new(),
        }
    }

    /// Binds the processor this controller delegates `push_suspend_transaction`
    /// to. Must be called exactly once, right after the processor wrapping
    /// this controller is constructed.
    pub fn bind_processor(&self, processor: Weak<TransactionProcessor<InMemoryController>>) {
        self.processor.set(processor).ok();
    }

    pub fn set_clock(&self, now: Timestamp) {
        self.clock.store(now, Ordering::SeqCst);
    }

    pub fn advance_clock(&self, delta: Timestamp) {
        self.clock.fetch_add(delta, Ordering::SeqCst);
    }
}

impl Controller for InMemoryController {
    fn head_block_time(&self) -> Timestamp {
        self.clock.load(Ordering::SeqCst)
    }

    fn pending_block_time(&self) -> Timestamp {
        self.clock.load(Ordering::SeqCst)
    }

    fn pending_block_producer(&self) -> Option<PublicKeyBytes> {
        None
    }

    fn global_properties(&self) -> GlobalProperties {
        self.global_props.read().unwrap().clone()
    }

    fn set_chain_config(&self, cfg: ChainConfig) {
        self.global_props.write().unwrap().config = cfg;
    }

    fn set_action_version(&self, name: &str, ver: u32) -> Result<u32> {
        let mut exec = self.exec_ctx.write().unwrap();
        let old = exec.set_version(name, ver)?;
        self.global_props.write().unwrap().action_vers.0.insert(name.to_string(), ver);
        Ok(old)
    }

    fn execution_context(&self) -> &RwLock<ExecutionContext> {
        &self.exec_ctx
    }

    fn abi_serializer(&self) -> &AbiSerializer {
        &self.abi
    }

    /// No block log is kept in this harness, so tapos can't reference a
    /// real ancestor; every `ref_block_num`/`ref_block_prefix` pair is
    /// accepted rather than checked against a chain of produced blocks.
    fn validate_tapos(&self, _trx: &TransactionBody) -> Result<()> {
        Ok(())
    }

    fn validate_expiration(&self, trx: &TransactionBody) -> Result<()> {
        let now = self.head_block_time();
        if (trx.header.expiration as i64) < now {
            return Err(JmzkError::InvalidArgument(format!(
                "transaction expired: expiration {} < head block time {now}",
                trx.header.expiration
            )));
        }
        Ok(())
    }

    fn token_db(&self) -> &Tdb {
        self.cache.tdb()
    }

    fn token_db_cache(&self) -> &Arc<TdbCache> {
        &self.cache
    }

    fn push_suspend_transaction(&self, name: Name128, executer: PublicKeyBytes, deadline: Instant) -> Result<TransactionTrace> {
        let processor = self
            .processor
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| JmzkError::InvalidArgument("controller not yet bound to a processor".into()))?;
        processor.push_suspend_transaction(name, executer, deadline)
    }

    fn on_applied_transaction(&self, trace: &TransactionTrace) {
        tracing::debug!(id = %hex::encode(trace.id), status = ?trace.status, charge = trace.charge, "applied transaction");
    }
}
