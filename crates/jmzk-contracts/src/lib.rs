//! Contract actions (C13): one module per related family of action
//! handlers, all operating against the shared [`ContractContext`] the
//! processor constructs once per chain instance and reuses across every
//! transaction.
//!
//! [`registry::register_actions`] wires every handler here into an
//! [`jmzk_exec_context::ExecutionContext`]; [`registry::register_abi_types`]
//! does the same for [`jmzk_abi::AbiSerializer`]. `execsuspend` is the one
//! action with no handler in the registry — see that module's doc comment.

pub mod bonus;
pub mod context;
pub mod domain;
pub mod fungible;
pub mod link_actions;
pub mod lock;
pub mod meta;
pub mod payloads;
pub mod prodvote;
pub mod registry;
pub mod script;
pub mod staking;
pub mod suspend;

pub use context::ContractContext;
