//! `newvalidator`, `staketkns`, `unstaketkns`, `toactivetkns`,
//! `valiwithdraw`, `recvstkbonus`: staking pool bookkeeping. Accounting
//! only — there is no block producer schedule or consensus weight in
//! this crate for these numbers to feed into.
//!
//! Each validator gets one escrow address (`.stake:<validator>:0`)
//! holding its stakers' principal plus any bonus credited on top;
//! `valiwithdraw` pays the validator's `commission_rate` cut of whatever
//! sits above the tracked principal.

use jmzk_chain_core::{Action, Address, Asset, JmzkError, Name128, Result, StakePool, StakeShare, Validator};
use jmzk_state::{PutOp, TokenType};

use crate::context::ContractContext;
use crate::payloads::{NewValidator, RecvStkBonus, StakeTkns, ToActiveTkns, UnstakeTkns, ValiWithdraw};

fn decode<T: serde::de::DeserializeOwned>(act: &Action) -> Result<T> {
    bincode::deserialize(&act.data).map_err(JmzkError::from)
}

/// Minimum time a stake sits pending before `toactivetkns` counts it.
const BONDING_PERIOD_SECS: i64 = 3 * 24 * 3600;

fn escrow_address(validator: Name128) -> Address {
    Address::for_stake(validator)
}

fn native_sym(ctx: &ContractContext) -> Result<jmzk_chain_core::Symbol> {
    let jmzk = ctx.cache.read_token::<jmzk_chain_core::FungibleDef>(TokenType::Fungible, None, Name128::from_str_checked("jmzk").unwrap())?;
    Ok(jmzk.sym)
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

fn credit_only(ctx: &ContractContext, to: &Address, amount: Asset) -> Result<()> {
    let sym_id = amount.sym.id();
    let mut bal = read_balance(ctx, to, sym_id, amount.sym)?;
    bal.amount = bal.amount.checked_add(&amount)?;
    write_balance(ctx, to, sym_id, &bal)
}

pub fn new_validator(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: NewValidator = decode(act)?;
    if ctx.cache.exists_token(TokenType::Validator, None, p.name)? {
        return Err(JmzkError::InvalidArgument(format!("validator {} already exists", p.name)));
    }
    if !ctx.has_signed(&p.creator) {
        return Err(JmzkError::Authorization(format!("newvalidator creator {} did not sign", p.creator)));
    }
    if !(0.0..=1.0).contains(&p.commission_rate) {
        return Err(JmzkError::InvalidArgument("commission_rate must be in [0, 1]".into()));
    }
    let sym = native_sym(ctx)?;
    let validator = Validator { name: p.name, creator: p.creator, signing_key: p.signing_key, commission_rate: p.commission_rate, total_staked: Asset::new(0, sym)? };
    ctx.cache.put_token(TokenType::Validator, PutOp::Add, None, p.name, validator)?;
    ctx.cache.put_token(TokenType::StakePool, PutOp::Add, None, p.name, StakePool::default())?;
    Ok(())
}

pub fn stake_tkns(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: StakeTkns = decode(act)?;
    if !ctx.has_signed(&p.staker) {
        return Err(JmzkError::Authorization(format!("staketkns staker {} did not sign", p.staker)));
    }
    let validator = ctx.cache.read_token::<Validator>(TokenType::Validator, None, p.validator)?;
    let pool = ctx.cache.read_token::<StakePool>(TokenType::StakePool, None, p.validator)?;

    move_funds(ctx, &Address::PublicKey(p.staker), &escrow_address(p.validator), p.amount)?;

    let mut updated = (*pool).clone();
    updated.shares.push(StakeShare { staker: p.staker, validator: p.validator, staked: p.amount, since: ctx.now() });
    updated.total_staked += p.amount.amount;
    ctx.cache.put_token(TokenType::StakePool, PutOp::Put, None, p.validator, updated)?;

    let mut v = (*validator).clone();
    v.total_staked = v.total_staked.checked_add(&p.amount)?;
    ctx.cache.put_token(TokenType::Validator, PutOp::Put, None, p.validator, v)?;
    Ok(())
}

pub fn to_active_tkns(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: ToActiveTkns = decode(act)?;
    let pool = ctx.cache.read_token::<StakePool>(TokenType::StakePool, None, p.validator)?;
    let now = ctx.now();
    let total_active: i64 = pool
        .shares
        .iter()
        .filter(|s| s.staker == p.staker && s.since + BONDING_PERIOD_SECS <= now)
        .map(|s| s.staked.amount)
        .sum();
    if total_active == 0 {
        return Err(JmzkError::InvalidArgument("no eligible stake past its bonding period yet".into()));
    }
    let mut updated = (*pool).clone();
    updated.total_active = updated
        .shares
        .iter()
        .filter(|s| s.since + BONDING_PERIOD_SECS <= now)
        .map(|s| s.staked.amount)
        .sum();
    ctx.cache.put_token(TokenType::StakePool, PutOp::Put, None, p.validator, updated)?;
    Ok(())
}

pub fn unstake_tkns(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: UnstakeTkns = decode(act)?;
    if !ctx.has_signed(&p.staker) {
        return Err(JmzkError::Authorization(format!("unstaketkns staker {} did not sign", p.staker)));
    }
    let pool = ctx.cache.read_token::<StakePool>(TokenType::StakePool, None, p.validator)?;
    let sym = native_sym(ctx)?;

    let mut updated = (*pool).clone();
    let mut remaining = p.share_amount;
    for share in updated.shares.iter_mut().filter(|s| s.staker == p.staker) {
        if remaining <= 0 {
            break;
        }
        let take = remaining.min(share.staked.amount);
        share.staked.amount -= take;
        remaining -= take;
    }
    if remaining > 0 {
        return Err(JmzkError::Balance(format!("{} has less staked with validator {} than requested", p.staker, p.validator)));
    }
    updated.shares.retain(|s| s.staked.amount > 0);
    updated.total_staked -= p.share_amount;

    move_funds(ctx, &escrow_address(p.validator), &Address::PublicKey(p.staker), Asset::new(p.share_amount, sym)?)?;
    ctx.cache.put_token(TokenType::StakePool, PutOp::Put, None, p.validator, updated)?;
    Ok(())
}

pub fn vali_withdraw(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: ValiWithdraw = decode(act)?;
    let validator = ctx.cache.read_token::<Validator>(TokenType::Validator, None, p.validator)?;
    if !ctx.has_signed(&validator.creator) {
        return Err(JmzkError::Authorization(format!("valiwithdraw requires creator {} to sign", validator.creator)));
    }
    let sym = native_sym(ctx)?;
    let escrow = escrow_address(p.validator);
    let balance = read_balance(ctx, &escrow, sym.id(), sym)?;
    let surplus = balance.amount.amount - validator.total_staked.amount;
    if surplus <= 0 {
        return Err(JmzkError::Balance(format!("validator {} has no surplus to withdraw", p.validator)));
    }
    let payout = (surplus as f64 * validator.commission_rate).floor() as i64;
    if payout <= 0 {
        return Err(JmzkError::Balance(format!("validator {} commission on surplus rounds to zero", p.validator)));
    }
    move_funds(ctx, &escrow, &Address::PublicKey(validator.creator), Asset::new(payout, sym)?)?;
    Ok(())
}

pub fn recv_stk_bonus(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: RecvStkBonus = decode(act)?;
    if !ctx.cache.exists_token(TokenType::Validator, None, p.validator)? {
        return Err(JmzkError::UnknownValidator(p.validator.to_string()));
    }
    credit_only(ctx, &escrow_address(p.validator), p.amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmzk_chain_core::{FungibleDef, PermissionDef, PublicKeyBytes, Symbol, JMZK_SYM_ID};
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
        let ctx = ContractContext::new(cache, [0u8; 32], Default::default());
        let sym = Symbol::new(5, JMZK_SYM_ID as u32).unwrap();
        let perm = |n: &str| PermissionDef { name: Name128::from_str_checked(n).unwrap(), threshold: 1, authorizers: vec![] };
        let jmzk = FungibleDef {
            name: Name128::from_str_checked("jmzk").unwrap(),
            sym_name: "JMZK".into(),
            sym,
            creator: pk(0),
            create_time: 0,
            issue: perm("issue"),
            transfer: perm("transfer"),
            manage: PermissionDef { name: Name128::from_str_checked("manage").unwrap(), threshold: 0, authorizers: vec![] },
            total_supply: Asset::new(0, sym).unwrap(),
            metas: vec![],
        };
        ctx.cache.put_token(TokenType::Fungible, PutOp::Add, None, jmzk.name, jmzk).unwrap();
        ctx
    }

    #[test]
    fn stake_then_recv_bonus_then_withdraw_commission() {
        let ctx = setup();
        let creator = pk(1);
        let staker = pk(2);
        ctx.begin_transaction(0, vec![creator]);
        let vname = Name128::from_str_checked("v1").unwrap();
        let act = Action::new(
            "newvalidator",
            Name128::RESERVED,
            Name128::RESERVED,
            bincode::serialize(&NewValidator { name: vname, creator, signing_key: creator, commission_rate: 0.1 }).unwrap(),
        );
        new_validator(&ctx, &act).unwrap();

        let sym = native_sym(&ctx).unwrap();
        write_balance(&ctx, &Address::PublicKey(staker), sym.id(), &jmzk_chain_core::Property {
            amount: Asset::new(1000, sym).unwrap(),
            frozen_amount: Asset::new(0, sym).unwrap(),
            sym,
            created_at: 0,
            created_index: 0,
        })
        .unwrap();

        ctx.begin_transaction(0, vec![staker]);
        let act = Action::new(
            "staketkns",
            Name128::RESERVED,
            Name128::RESERVED,
            bincode::serialize(&StakeTkns { staker, validator: vname, amount: Asset::new(500, sym).unwrap() }).unwrap(),
        );
        stake_tkns(&ctx, &act).unwrap();

        ctx.begin_transaction(0, vec![creator]);
        let act = Action::new("recvstkbonus", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&RecvStkBonus { validator: vname, amount: Asset::new(100, sym).unwrap() }).unwrap());
        recv_stk_bonus(&ctx, &act).unwrap();

        let act = Action::new("valiwithdraw", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&ValiWithdraw { validator: vname }).unwrap());
        vali_withdraw(&ctx, &act).unwrap();

        let payout = read_balance(&ctx, &Address::PublicKey(creator), sym.id(), sym).unwrap();
        assert_eq!(payout.amount.amount, 10); // floor(0.1 * 100)
    }
}
