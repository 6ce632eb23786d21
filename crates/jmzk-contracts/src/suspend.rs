//! `newsuspend`, `aprvsuspend`, `cancelsuspend`, `execsuspend`.
//!
//! `execsuspend` only prepares/finalizes `SuspendDef` bookkeeping here —
//! actually re-dispatching the inner transaction's actions needs the same
//! execution pipeline the processor owns, so `prepare_exec_suspend`
//! returns the inner body for the processor to run and
//! `finalize_exec_suspend` records the outcome afterwards.

use jmzk_chain_core::{
    action_name_id, Action, Address, AuthorizerRef, DomainDef, Group, JmzkError, Name128, PermissionDef, PublicKeyBytes, Result, SuspendDef,
    SuspendStatus, TokenDef, TransactionBody,
};
use jmzk_crypto::recovery::recover_public_key;
use jmzk_state::{PutOp, TokenType};

use crate::context::ContractContext;
use crate::payloads::{AprvSuspend, CancelSuspend, ExecSuspend, NewSuspend};

fn decode<T: serde::de::DeserializeOwned>(act: &Action) -> Result<T> {
    bincode::deserialize(&act.data).map_err(JmzkError::from)
}

fn group_all_keys(group: &Group, out: &mut Vec<PublicKeyBytes>) {
    for node in &group.root {
        if node.is_leaf() {
            if let Some(key) = node.key {
                out.push(key);
            }
        }
    }
}

fn permission_keys(ctx: &ContractContext, perm: &PermissionDef, out: &mut Vec<PublicKeyBytes>) -> Result<()> {
    for aw in &perm.authorizers {
        match &aw.reference {
            AuthorizerRef::Account(k) => out.push(*k),
            AuthorizerRef::Group(name) => {
                if let Some(group) = ctx.cache.read_token_opt::<Group>(TokenType::Group, None, *name)? {
                    group_all_keys(&group, out);
                }
            }
            AuthorizerRef::Owner => {}
        }
    }
    Ok(())
}

/// The pool of keys any of this transaction's actions could plausibly
/// need: every key referenced (directly or through a group) by the
/// domains it touches' `issue`/`transfer`/`manage` permissions, plus any
/// targeted token's current owner set. A conservative superset of the
/// transaction's actual required keys, used to reject `aprvsuspend`
/// signatures from keys with no bearing on the suspended transaction at
/// all.
fn referenced_keys(ctx: &ContractContext, trx: &TransactionBody) -> Result<Vec<PublicKeyBytes>> {
    let mut keys = Vec::new();
    for action in &trx.actions {
        if let Some(domain) = ctx.cache.read_token_opt::<DomainDef>(TokenType::Domain, None, action.domain)? {
            permission_keys(ctx, &domain.issue, &mut keys)?;
            permission_keys(ctx, &domain.transfer, &mut keys)?;
            permission_keys(ctx, &domain.manage, &mut keys)?;
            if let Some(token) = ctx.cache.read_token_opt::<TokenDef>(TokenType::Token, Some(action.domain), action.key)? {
                for addr in &token.owner {
                    if let Address::PublicKey(k) = addr {
                        keys.push(*k);
                    }
                }
            }
        }
    }
    Ok(keys)
}

const DEFERRED_ACTION_NAMES: [&str; 4] = ["everipay", "everipayv2", "everipass", "everipassv2"];

fn rejects_deferrable(trx: &TransactionBody) -> Result<()> {
    for action in &trx.actions {
        if DEFERRED_ACTION_NAMES.iter().any(|n| action_name_id(n) == action.name) {
            return Err(JmzkError::InvalidArgument("newsuspend cannot carry a deferred action".into()));
        }
        if action.domain.to_string_lossy() == "suspend" {
            return Err(JmzkError::InvalidArgument("newsuspend cannot target the suspend domain".into()));
        }
    }
    Ok(())
}

pub fn new_suspend(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: NewSuspend = decode(act)?;
    if ctx.cache.exists_token(TokenType::Suspend, None, p.name)? {
        return Err(JmzkError::DuplicateSuspend(p.name.to_string()));
    }
    if !ctx.has_signed(&p.proposer) {
        return Err(JmzkError::Authorization(format!("newsuspend proposer {} did not sign", p.proposer)));
    }
    if p.trx.actions.is_empty() {
        return Err(JmzkError::TxNoAction);
    }
    rejects_deferrable(&p.trx)?;

    let def = SuspendDef {
        name: p.name,
        proposer: p.proposer,
        status: SuspendStatus::Proposed,
        trx: p.trx,
        signed_keys: vec![],
        signatures: vec![],
    };
    ctx.cache.put_token(TokenType::Suspend, PutOp::Add, None, p.name, def)?;
    Ok(())
}

/// Recovers each signature's signer against the inner transaction's own
/// digest and merges newly-seen keys into `signed_keys`; does not
/// attempt to decide whether the merged set would actually authorize the
/// inner transaction's actions, since that needs the same dispatch the
/// processor performs at `execsuspend` time.
pub fn aprv_suspend(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: AprvSuspend = decode(act)?;
    let def = ctx.cache.read_token::<SuspendDef>(TokenType::Suspend, None, p.name)?;
    if !def.is_pending() {
        return Err(JmzkError::InvalidArgument(format!("suspend {} is not pending", p.name)));
    }

    let digest = def.trx.digest(&ctx.chain_id).map_err(JmzkError::from)?;
    let required = referenced_keys(ctx, &def.trx)?;
    let mut updated = (*def).clone();
    for sig in &p.signatures {
        let key = recover_public_key(&digest, sig)?;
        if !required.contains(&key) {
            return Err(JmzkError::Authorization(format!(
                "aprvsuspend key {key} is not required by suspend {}'s inner transaction",
                p.name
            )));
        }
        if !updated.signed_keys.contains(&key) {
            updated.signed_keys.push(key);
            updated.signatures.push(sig.clone());
        }
    }
    ctx.cache.put_token(TokenType::Suspend, PutOp::Put, None, p.name, updated)?;
    Ok(())
}

pub fn cancel_suspend(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: CancelSuspend = decode(act)?;
    let def = ctx.cache.read_token::<SuspendDef>(TokenType::Suspend, None, p.name)?;
    if !def.is_pending() {
        return Err(JmzkError::InvalidArgument(format!("suspend {} is not pending", p.name)));
    }
    if !ctx.has_signed(&def.proposer) {
        return Err(JmzkError::Authorization(format!("cancelsuspend requires proposer {} to sign", def.proposer)));
    }
    let mut updated = (*def).clone();
    updated.status = SuspendStatus::Cancelled;
    ctx.cache.put_token(TokenType::Suspend, PutOp::Put, None, p.name, updated)?;
    Ok(())
}

/// Loads and validates the pending suspend named by `act`, returning the
/// inner transaction and the key set collected so far for the processor
/// to dispatch. Does not mutate the record; `finalize_exec_suspend`
/// records the outcome once the processor knows whether dispatch
/// succeeded.
pub fn prepare_exec_suspend(ctx: &ContractContext, act: &Action) -> Result<(TransactionBody, Vec<PublicKeyBytes>)> {
    let p: ExecSuspend = decode(act)?;
    let def = ctx.cache.read_token::<SuspendDef>(TokenType::Suspend, None, p.name)?;
    if !def.is_pending() {
        return Err(JmzkError::InvalidArgument(format!("suspend {} is not pending", p.name)));
    }
    if !ctx.has_signed(&p.executer) {
        return Err(JmzkError::Authorization(format!("execsuspend executer {} did not sign", p.executer)));
    }
    Ok((def.trx.clone(), def.signed_keys.clone()))
}

pub fn finalize_exec_suspend(ctx: &ContractContext, name: Name128, succeeded: bool) -> Result<()> {
    let def = ctx.cache.read_token::<SuspendDef>(TokenType::Suspend, None, name)?;
    let mut updated = (*def).clone();
    updated.status = if succeeded { SuspendStatus::Executed } else { SuspendStatus::Failed };
    ctx.cache.put_token(TokenType::Suspend, PutOp::Put, None, name, updated)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmzk_chain_core::{Address, Name128, TransactionHeader};
    use jmzk_state::Tdb;
    use std::sync::Arc;

    fn pk(b: u8) -> PublicKeyBytes {
        let mut bytes = [0u8; 33];
        bytes[0] = 0x02;
        bytes[32] = b;
        PublicKeyBytes(bytes)
    }

    fn setup() -> ContractContext {
        let tdb = Arc::new(Tdb::open_in_memory().unwrap());
        let cache = jmzk_state::TdbCache::new(tdb, 64);
        ContractContext::new(cache, [0u8; 32], Default::default())
    }

    fn inner_trx() -> TransactionBody {
        TransactionBody {
            header: TransactionHeader { expiration: 0, ref_block_num: 0, ref_block_prefix: 0, max_charge: 0 },
            actions: vec![Action::new(
                "transferft",
                Name128::RESERVED,
                Name128::RESERVED,
                vec![],
            )],
            payer: Address::Reserved,
            transaction_extensions: vec![],
        }
    }

    #[test]
    fn newsuspend_rejects_deferred_action() {
        let ctx = setup();
        let proposer = pk(1);
        ctx.begin_transaction(0, vec![proposer]);
        let mut trx = inner_trx();
        trx.actions[0] = Action::new("everipay", Name128::RESERVED, Name128::RESERVED, vec![]);
        let act = Action::new(
            "newsuspend",
            Name128::RESERVED,
            Name128::RESERVED,
            bincode::serialize(&NewSuspend { name: Name128::from_str_checked("s1").unwrap(), proposer, trx }).unwrap(),
        );
        assert!(new_suspend(&ctx, &act).is_err());
    }

    #[test]
    fn newsuspend_then_cancel() {
        let ctx = setup();
        let proposer = pk(1);
        ctx.begin_transaction(0, vec![proposer]);
        let name = Name128::from_str_checked("s1").unwrap();
        let act = Action::new(
            "newsuspend",
            Name128::RESERVED,
            Name128::RESERVED,
            bincode::serialize(&NewSuspend { name, proposer, trx: inner_trx() }).unwrap(),
        );
        new_suspend(&ctx, &act).unwrap();

        let act = Action::new("cancelsuspend", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&CancelSuspend { name }).unwrap());
        cancel_suspend(&ctx, &act).unwrap();

        let def = ctx.cache.read_token::<SuspendDef>(TokenType::Suspend, None, name).unwrap();
        assert!(matches!(def.status, SuspendStatus::Cancelled));
    }
}
