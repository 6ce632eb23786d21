//! Shared state every action handler needs: the cache, the current
//! transaction's signing keys and clock, and the authorization/group
//! lookups wired back onto the cache itself.
//!
//! The processor sets the per-transaction fields once via
//! [`ContractContext::begin_transaction`] before dispatching that
//! transaction's actions through the execution context; the handlers
//! registered there close over one shared `Arc<ContractContext>`, so the
//! mutable fields live behind a `Mutex` to satisfy the `Send + Sync`
//! bound `jmzk_exec_context::Handler` requires. The single-writer
//! processor never contends the lock.

use std::sync::{Arc, Mutex};

use jmzk_auth::{AuthorizationChecker, GroupResolver, OwnerResolver};
use jmzk_chain_core::{
    Address, ChainConfig, Group, JmzkError, Name128, PublicKeyBytes, Result, TokenDef, Timestamp,
};
use jmzk_state::{TdbCache, TokenType};

struct TxState {
    now: Timestamp,
    config: ChainConfig,
    signing_keys: Vec<PublicKeyBytes>,
    loadtest_mode: bool,
}

pub struct ContractContext {
    pub cache: Arc<TdbCache>,
    pub chain_id: [u8; 32],
    state: Mutex<TxState>,
}

impl ContractContext {
    pub fn new(cache: Arc<TdbCache>, chain_id: [u8; 32], config: ChainConfig) -> Self {
        ContractContext {
            cache,
            chain_id,
            state: Mutex::new(TxState { now: 0, config, signing_keys: Vec::new(), loadtest_mode: false }),
        }
    }

    pub fn begin_transaction(&self, now: Timestamp, signing_keys: Vec<PublicKeyBytes>) {
        let mut state = self.state.lock().unwrap();
        state.now = now;
        state.signing_keys = signing_keys;
    }

    pub fn now(&self) -> Timestamp {
        self.state.lock().unwrap().now
    }

    pub fn config(&self) -> ChainConfig {
        self.state.lock().unwrap().config.clone()
    }

    pub fn set_config(&self, config: ChainConfig) {
        self.state.lock().unwrap().config = config;
    }

    pub fn loadtest_mode(&self) -> bool {
        self.state.lock().unwrap().loadtest_mode
    }

    pub fn set_loadtest_mode(&self, v: bool) {
        self.state.lock().unwrap().loadtest_mode = v;
    }

    pub fn signing_keys(&self) -> Vec<PublicKeyBytes> {
        self.state.lock().unwrap().signing_keys.clone()
    }

    pub fn checker(&self) -> AuthorizationChecker<'_> {
        AuthorizationChecker::new(self.signing_keys(), self, self)
    }

    pub fn has_signed(&self, key: &PublicKeyBytes) -> bool {
        self.state.lock().unwrap().signing_keys.contains(key)
    }
}

impl GroupResolver for ContractContext {
    fn resolve_group(&self, name: &Name128) -> Result<Group> {
        let g = self.cache.read_token::<Group>(TokenType::Group, None, *name)?;
        Ok((*g).clone())
    }
}

impl OwnerResolver for ContractContext {
    fn resolve_owner(&self, domain: &Name128, key: &Name128) -> Result<Vec<PublicKeyBytes>> {
        let token = self.cache.read_token::<TokenDef>(TokenType::Token, Some(*domain), *key)?;
        token
            .owner
            .iter()
            .map(|a| match a {
                Address::PublicKey(pk) => Ok(*pk),
                other => Err(JmzkError::MetaInvolve(format!("owner {other} of {domain}/{key} is not a public key"))),
            })
            .collect()
    }
}
