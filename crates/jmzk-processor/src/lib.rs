//! Transaction processor (C12) and controller glue (C15): turns a
//! signed [`jmzk_chain_core::PackedTransaction`] into a committed or
//! rolled-back TDB savepoint and a [`trace::TransactionTrace`] recording
//! what happened, per §4.7 of the chain's component design.
//!
//! [`controller::Controller`] is the narrow set of chain-wide state the
//! processor asks its host for (block clock, config, execution context,
//! ABI table, TDB handles) rather than owning directly; `jmzk-chain-node`
//! supplies the one concrete implementation this workspace ships.

pub mod controller;
pub mod processor;
pub mod trace;

pub use controller::Controller;
pub use processor::TransactionProcessor;
pub use trace::{ActionTrace, TransactionStatus, TransactionTrace};
