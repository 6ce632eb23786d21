//! `setpsvbonus`/`setpsvbonus_v2`, `distpsvbonus`, and the collection hook
//! `transferft`/`everipay` call into on a match (§4.9).

use std::collections::HashMap;

use jmzk_chain_core::{
    Action, Address, Asset, BonusMethod, DistReceiver, FungibleDef, HolderSnapshot, JmzkError, Name128, PassiveBonus,
    PublicKeyBytes, Result,
};
use jmzk_state::{PutOp, TokenType};

use crate::context::ContractContext;
use crate::payloads::{DistPsvBonus, SetPsvBonus, SetPsvBonusV2};

fn decode<T: serde::de::DeserializeOwned>(act: &Action) -> Result<T> {
    bincode::deserialize(&act.data).map_err(JmzkError::from)
}

/// The window a round stays open before the next `distpsvbonus` is due;
/// rolled forward from `now` each time a round closes.
const DIST_WINDOW_SECS: i64 = 7 * 24 * 3600;

fn bonus_key(sym_id: u32) -> Name128 {
    Name128(sym_id as u128)
}

fn snapshot_key(sym_id: u32, round: u32) -> Name128 {
    Name128(((sym_id as u128) << 32) | round as u128)
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
    if amount.amount == 0 {
        return Ok(());
    }
    let sym_id = amount.sym.id();
    let mut from_bal = read_balance(ctx, from, sym_id, amount.sym)?;
    from_bal.amount = from_bal.amount.checked_sub(&amount)?;
    write_balance(ctx, from, sym_id, &from_bal)?;
    let mut to_bal = read_balance(ctx, to, sym_id, amount.sym)?;
    to_bal.amount = to_bal.amount.checked_add(&amount)?;
    write_balance(ctx, to, sym_id, &to_bal)?;
    Ok(())
}

fn require_manage(ctx: &ContractContext, def: &FungibleDef) -> Result<()> {
    let mut checker = ctx.checker();
    if !checker.satisfied(&def.manage, &Name128::RESERVED, &Name128::RESERVED)? {
        return Err(JmzkError::Authorization(format!("manage permission not satisfied for fungible {}", def.name)));
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn apply_set_psv_bonus(ctx: &ContractContext, p: SetPsvBonusV2) -> Result<()> {
    let name = crate::fungible::fungible_name_for_sym(ctx, p.sym_id)?;
    let fdef = ctx.cache.read_token::<FungibleDef>(TokenType::Fungible, None, name)?;
    require_manage(ctx, &fdef)?;

    let existing = ctx.cache.read_token_opt::<PassiveBonus>(TokenType::PsvBonus, None, bonus_key(p.sym_id))?;
    let (round, deadline) = existing.as_ref().map(|b| (b.round, b.deadline)).unwrap_or((0, 0));

    let bonus = PassiveBonus {
        sym_id: p.sym_id,
        rate: p.rate,
        base_charge: p.base_charge,
        charge_threshold: p.charge_threshold,
        minimum_charge: p.minimum_charge,
        dist_threshold: p.dist_threshold,
        rules: p.rules,
        methods: p.methods,
        round,
        deadline,
        final_receiver: p.final_receiver,
    };
    bonus.validate()?;

    let op = if existing.is_some() { PutOp::Put } else { PutOp::Add };
    ctx.cache.put_token(TokenType::PsvBonus, op, None, bonus_key(p.sym_id), bonus)?;
    Ok(())
}

pub fn set_psv_bonus(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: SetPsvBonus = decode(act)?;
    apply_set_psv_bonus(
        ctx,
        SetPsvBonusV2 {
            sym_id: p.sym_id,
            rate: p.rate,
            base_charge: p.base_charge,
            charge_threshold: p.charge_threshold,
            minimum_charge: p.minimum_charge,
            dist_threshold: p.dist_threshold,
            rules: p.rules,
            methods: p.methods,
            final_receiver: None,
        },
    )
}

pub fn set_psv_bonus_v2(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: SetPsvBonusV2 = decode(act)?;
    apply_set_psv_bonus(ctx, p)
}

/// Called by `transferft` (and, eventually, `everipay`) after the funds
/// move; debits the bonus charge from the same payer and credits the
/// collection address. A no-op when no bonus is registered for `sym_id`
/// or `method` isn't among the registered trigger methods.
pub fn on_collectible_action(ctx: &ContractContext, payer: &Address, amount: Asset, method: BonusMethod) -> Result<()> {
    let sym_id = amount.sym.id();
    let Some(bonus) = ctx.cache.read_token_opt::<PassiveBonus>(TokenType::PsvBonus, None, bonus_key(sym_id))? else {
        return Ok(());
    };
    if !bonus.methods.contains(&method) {
        return Ok(());
    }
    let charge = bonus.charge_for(amount.amount);
    if charge <= 0 {
        return Ok(());
    }
    move_funds(ctx, payer, &bonus.collection_address(), Asset::new(charge, amount.sym)?)
}

pub fn on_transfer_ft(ctx: &ContractContext, from: &Address, amount: Asset) -> Result<()> {
    on_collectible_action(ctx, from, amount, BonusMethod::TransferFt)
}

pub fn on_everi_pay(ctx: &ContractContext, payer: &Address, amount: Asset) -> Result<()> {
    on_collectible_action(ctx, payer, amount, BonusMethod::EveriPay)
}

fn holder_hash(pk: &PublicKeyBytes) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for b in pk.0 {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

fn snapshot_holders(ctx: &ContractContext, sym_id: u32) -> Result<HolderSnapshot> {
    let mut snapshot = HolderSnapshot::default();
    ctx.cache.tdb().read_assets_range(sym_id, 0, |address_bytes, value| {
        if let (Ok(Address::PublicKey(pk)), Ok(prop)) =
            (bincode::deserialize::<Address>(address_bytes), bincode::deserialize::<jmzk_chain_core::Property>(value))
        {
            let h = holder_hash(&pk);
            if let Some(existing) = snapshot.by_hash.get(&h) {
                if *existing != prop.amount.amount {
                    snapshot.collisions.insert(pk, prop.amount.amount);
                } else {
                    snapshot.by_hash.insert(h, prop.amount.amount);
                }
            } else {
                snapshot.by_hash.insert(h, prop.amount.amount);
            }
        }
        true
    })?;
    Ok(snapshot)
}

/// Splits `pool` pro-rata across holders of `holder_sym` at or above
/// `threshold`. Reuses `bonus_snapshot` when it already covers
/// `holder_sym` (the common case: the bonus's own fungible); otherwise
/// takes a fresh snapshot of the referenced fungible.
fn resolve_ft_holders(
    ctx: &ContractContext,
    bonus_sym_id: u32,
    bonus_snapshot: &HolderSnapshot,
    holder_sym: u32,
    threshold: i64,
    pool: i64,
) -> Result<HashMap<u32, i64>> {
    let owned_snapshot;
    let snapshot = if holder_sym == bonus_sym_id {
        bonus_snapshot
    } else {
        owned_snapshot = snapshot_holders(ctx, holder_sym)?;
        &owned_snapshot
    };

    let holders: Vec<(u32, i64)> =
        snapshot.by_hash.iter().map(|(h, amt)| (*h, *amt)).filter(|(_, amt)| *amt >= threshold).collect();
    let total: i64 = holders.iter().map(|(_, amt)| *amt).sum();
    let mut out = HashMap::new();
    if total <= 0 {
        return Ok(out);
    }
    for (h, amt) in holders {
        let share = (pool as f64 * (amt as f64 / total as f64)).floor() as i64;
        out.insert(h, share);
    }
    Ok(out)
}

pub fn dist_psv_bonus(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: DistPsvBonus = decode(act)?;
    let bonus = ctx.cache.read_token::<PassiveBonus>(TokenType::PsvBonus, None, bonus_key(p.sym_id))?;
    let fname = crate::fungible::fungible_name_for_sym(ctx, p.sym_id)?;
    let fdef = ctx.cache.read_token::<FungibleDef>(TokenType::Fungible, None, fname)?;

    let collection = bonus.collection_address();
    let collected = read_balance(ctx, &collection, p.sym_id, fdef.sym)?.spendable();
    if collected < bonus.dist_threshold {
        return Err(JmzkError::InvalidArgument(format!("fungible {} has not reached its dist_threshold yet", p.sym_id)));
    }

    let snapshot = snapshot_holders(ctx, p.sym_id)?;
    let payouts = jmzk_chain_core::evaluate_dist_rules(&bonus.rules, collected);
    for (receiver, amount) in payouts {
        match receiver {
            DistReceiver::Address(addr) => {
                move_funds(ctx, &collection, &addr, Asset::new(amount, fdef.sym)?)?;
            }
            DistReceiver::FtHolders { sym_id: holder_sym, threshold } => {
                let shares = resolve_ft_holders(ctx, p.sym_id, &snapshot, holder_sym, threshold, amount)?;
                // Individual holders are only known by snapshot hash; the
                // round's distribution address holds their combined share
                // until a claim step resolves each hash back to a payout.
                let round_addr = bonus.distribution_address(bonus.round + 1);
                let total_share: i64 = shares.values().sum();
                if total_share > 0 {
                    move_funds(ctx, &collection, &round_addr, Asset::new(total_share, fdef.sym)?)?;
                }
                // Floor division (and a threshold nobody meets) can leave a
                // remainder undistributed; route it to final_receiver when
                // the fungible's bonus schedule names one.
                let shortfall = amount - total_share;
                if shortfall > 0 {
                    if let Some(receiver) = bonus.final_receiver {
                        move_funds(ctx, &collection, &receiver, Asset::new(shortfall, fdef.sym)?)?;
                    }
                }
            }
        }
    }

    let new_round = bonus.round + 1;
    ctx.cache.put_token(TokenType::PsvBonusDist, PutOp::Add, None, snapshot_key(p.sym_id, new_round), snapshot)?;

    let mut updated = (*bonus).clone();
    updated.round = new_round;
    updated.deadline = ctx.now() + DIST_WINDOW_SECS;
    ctx.cache.put_token(TokenType::PsvBonus, PutOp::Put, None, bonus_key(p.sym_id), updated)?;
    Ok(())
}
