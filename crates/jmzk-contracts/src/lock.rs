//! `newlock`, `aprvlock`, `tryunlock` (§4.10).
//!
//! Locked NFTs have their owner replaced by the proposal's escrow
//! address; locked FTs move there too. `tryunlock` releases to `succeed`
//! once `condition` is met after `unlock_time`, or to `failed` once
//! `deadline` passes with the condition still unmet.

use jmzk_chain_core::{
    Action, Address, Asset, FungibleDef, JmzkError, LockAsset, LockDef, LockStatus, Name128, Result, TokenDef,
    PJMZK_SYM_ID,
};
use jmzk_state::{PutOp, TokenType};

use crate::context::ContractContext;
use crate::payloads::{AprvLock, NewLock, TryUnlock};

fn decode<T: serde::de::DeserializeOwned>(act: &Action) -> Result<T> {
    bincode::deserialize(&act.data).map_err(JmzkError::from)
}

fn read_balance(ctx: &ContractContext, address: &Address, sym_id: u32, sym: jmzk_chain_core::Symbol) -> Result<jmzk_chain_core::Property> {
    match ctx.cache.tdb().read_asset_opt(address, sym_id)? {
        Some(bytes) => Ok(bincode::deserialize(&bytes)?),
        None => Ok(jmzk_chain_core::Property { amount: Asset::new(0, sym)?, frozen_amount: Asset::new(0, sym)?, sym, created_at: ctx.now(), created_index: 0 }),
    }
}

fn write_balance(ctx: &ContractContext, address: &Address, sym_id: u32, balance: &jmzk_chain_core::Property) -> Result<()> {
    ctx.cache.tdb().put_asset(address, sym_id, bincode::serialize(balance)?)?;
    Ok(())
}

fn move_funds(ctx: &ContractContext, from: &Address, to: &Address, amount: Asset) -> Result<()> {
    let sym_id = amount.sym.id();
    let mut from_bal = read_balance(ctx, from, sym_id, amount.sym)?;
    from_bal.amount = from_bal.amount.checked_sub(&amount)?;
    write_balance(ctx, from, sym_id, &from_bal)?;
    let mut to_bal = read_balance(ctx, to, sym_id, amount.sym)?;
    to_bal.amount = to_bal.amount.checked_add(&amount)?;
    write_balance(ctx, to, sym_id, &to_bal)?;
    Ok(())
}

pub fn new_lock(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: NewLock = decode(act)?;
    if ctx.cache.exists_token(TokenType::Lock, None, p.name)? {
        return Err(JmzkError::DuplicateLock(p.name.to_string()));
    }
    if !ctx.has_signed(&p.proposer) {
        return Err(JmzkError::Authorization(format!("newlock proposer {} did not sign", p.proposer)));
    }
    if p.assets.is_empty() {
        return Err(JmzkError::InvalidArgument("newlock requires at least one asset".into()));
    }
    for asset in &p.assets {
        if let LockAsset::Fungible(amount) = asset {
            if amount.sym.id() as u64 == PJMZK_SYM_ID {
                return Err(JmzkError::InvalidArgument("pjmzk cannot be locked".into()));
            }
        }
    }
    if !p.condition.validate() {
        return Err(JmzkError::InvalidArgument("lock condition threshold exceeds cond_keys size".into()));
    }

    let def = LockDef {
        name: p.name,
        proposer: p.proposer,
        status: LockStatus::Proposed,
        unlock_time: p.unlock_time,
        deadline: p.deadline,
        assets: p.assets,
        condition: p.condition,
        succeed: p.succeed,
        failed: p.failed,
        signed_keys: vec![],
    };
    if !def.validate_outcome_lists() {
        return Err(JmzkError::InvalidArgument("fungible lock requires singleton succeed/failed lists".into()));
    }

    let escrow = def.escrow_address();
    for asset in &def.assets {
        match asset {
            LockAsset::Token { domain, name } => {
                let token = ctx.cache.read_token::<TokenDef>(TokenType::Token, Some(*domain), *name)?;
                if token.is_destroyed() || token.is_locked() {
                    return Err(JmzkError::InvalidArgument(format!("token {domain}/{name} is not lockable")));
                }
                let mut updated = (*token).clone();
                updated.owner = vec![escrow.clone()];
                ctx.cache.put_token(TokenType::Token, PutOp::Put, Some(*domain), *name, updated)?;
            }
            LockAsset::Fungible(amount) => {
                let name = crate::fungible::fungible_name_for_sym(ctx, amount.sym.id())?;
                let fdef = ctx.cache.read_token::<FungibleDef>(TokenType::Fungible, None, name)?;
                move_funds(ctx, &fdef.sink_address(), &escrow, *amount)?;
            }
        }
    }
    ctx.cache.put_token(TokenType::Lock, PutOp::Add, None, p.name, def)?;
    Ok(())
}

pub fn aprv_lock(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: AprvLock = decode(act)?;
    let def = ctx.cache.read_token::<LockDef>(TokenType::Lock, None, p.name)?;
    if !matches!(def.status, LockStatus::Proposed) {
        return Err(JmzkError::InvalidArgument(format!("lock {} is no longer proposed", p.name)));
    }
    if !ctx.has_signed(&p.approver) {
        return Err(JmzkError::Authorization(format!("aprvlock approver {} did not sign", p.approver)));
    }
    let mut updated = (*def).clone();
    if !updated.signed_keys.contains(&p.approver) {
        updated.signed_keys.push(p.approver);
    }
    ctx.cache.put_token(TokenType::Lock, PutOp::Put, None, p.name, updated)?;
    Ok(())
}

pub fn try_unlock(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: TryUnlock = decode(act)?;
    let def = ctx.cache.read_token::<LockDef>(TokenType::Lock, None, p.name)?;
    if !matches!(def.status, LockStatus::Proposed) {
        return Err(JmzkError::InvalidArgument(format!("lock {} is no longer proposed", p.name)));
    }
    let now = ctx.now();
    if now < def.unlock_time {
        return Err(JmzkError::InvalidArgument(format!("lock {} has not reached unlock_time yet", p.name)));
    }

    let satisfied = def.condition.satisfied_by(&def.signed_keys);
    let (destinations, new_status) = if satisfied {
        (def.succeed.clone(), LockStatus::Succeed)
    } else if now >= def.deadline {
        (def.failed.clone(), LockStatus::Failed)
    } else {
        return Err(JmzkError::InvalidArgument(format!("lock {} condition unmet before deadline", p.name)));
    };

    for asset in &def.assets {
        match asset {
            LockAsset::Token { domain, name } => {
                let token = ctx.cache.read_token::<TokenDef>(TokenType::Token, Some(*domain), *name)?;
                let mut updated = (*token).clone();
                updated.owner = destinations.clone();
                ctx.cache.put_token(TokenType::Token, PutOp::Put, Some(*domain), *name, updated)?;
            }
            LockAsset::Fungible(amount) => {
                let name = crate::fungible::fungible_name_for_sym(ctx, amount.sym.id())?;
                let fdef = ctx.cache.read_token::<FungibleDef>(TokenType::Fungible, None, name)?;
                // validate_outcome_lists() guarantees exactly one destination here.
                let to = destinations.first().cloned().unwrap_or(fdef.sink_address());
                move_funds(ctx, &def.escrow_address(), &to, *amount)?;
            }
        }
    }

    let mut updated = (*def).clone();
    updated.status = new_status;
    ctx.cache.put_token(TokenType::Lock, PutOp::Put, None, p.name, updated)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmzk_chain_core::{LockCondition, PublicKeyBytes};
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

    #[test]
    fn newlock_moves_nft_owner_to_escrow_then_tryunlock_releases_on_condition() {
        let ctx = setup();
        let proposer = pk(1);
        let condkey = pk(2);
        ctx.begin_transaction(0, vec![proposer]);

        let domain = Name128::from_str_checked("d1").unwrap();
        let tname = Name128::from_str_checked("t1").unwrap();
        let token = TokenDef { domain, name: tname, owner: vec![Address::PublicKey(proposer)], metas: vec![] };
        ctx.cache.put_token(TokenType::Token, PutOp::Add, Some(domain), tname, token).unwrap();

        let lname = Name128::from_str_checked("l1").unwrap();
        let act = Action::new(
            "newlock",
            Name128::RESERVED,
            Name128::RESERVED,
            bincode::serialize(&NewLock {
                name: lname,
                proposer,
                unlock_time: 0,
                deadline: 100,
                assets: vec![LockAsset::Token { domain, name: tname }],
                condition: LockCondition::Keys { threshold: 1, cond_keys: vec![condkey] },
                succeed: vec![Address::PublicKey(pk(3))],
                failed: vec![Address::PublicKey(proposer)],
            })
            .unwrap(),
        );
        new_lock(&ctx, &act).unwrap();

        let token = ctx.cache.read_token::<TokenDef>(TokenType::Token, Some(domain), tname).unwrap();
        assert!(token.owner[0].has_prefix("lock"));

        ctx.begin_transaction(50, vec![condkey]);
        let act = Action::new("aprvlock", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&AprvLock { name: lname, approver: condkey }).unwrap());
        aprv_lock(&ctx, &act).unwrap();

        let act = Action::new("tryunlock", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&TryUnlock { name: lname }).unwrap());
        try_unlock(&ctx, &act).unwrap();

        let token = ctx.cache.read_token::<TokenDef>(TokenType::Token, Some(domain), tname).unwrap();
        assert_eq!(token.owner, vec![Address::PublicKey(pk(3))]);
    }
}
