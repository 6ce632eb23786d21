//! `newfungible`/`newfungible_v2`, `updfungible`, `issuefungible`,
//! `transferft`, `recycleft`, `destroyft`. Passive bonus collection on
//! `transferft` lives in [`crate::bonus`]; this module calls into it
//! after crediting the transfer itself.

use jmzk_chain_core::{
    Action, Address, Asset, FungibleDef, JmzkError, Name128, Property, Result, PJMZK_SYM_ID,
};
use jmzk_state::{PutOp, TokenType};

use crate::context::ContractContext;
use crate::payloads::{DestroyFt, IssueFungible, NewFungible, NewFungibleV2, RecycleFt, TransferFt, UpdFungible};

fn decode<T: serde::de::DeserializeOwned>(act: &Action) -> Result<T> {
    bincode::deserialize(&act.data).map_err(JmzkError::from)
}

fn read_balance(ctx: &ContractContext, address: &Address, sym_id: u32, sym: jmzk_chain_core::Symbol, now: i64) -> Result<Property> {
    match ctx.cache.tdb().read_asset_opt(address, sym_id)? {
        Some(bytes) => Ok(bincode::deserialize(&bytes)?),
        None => Ok(Property { amount: Asset::new(0, sym)?, frozen_amount: Asset::new(0, sym)?, sym, created_at: now, created_index: 0 }),
    }
}

fn write_balance(ctx: &ContractContext, address: &Address, sym_id: u32, balance: &Property) -> Result<()> {
    ctx.cache.tdb().put_asset(address, sym_id, bincode::serialize(balance)?)?;
    Ok(())
}

fn move_funds(ctx: &ContractContext, from: &Address, to: &Address, amount: Asset) -> Result<()> {
    let sym_id = amount.sym.id();
    let now = ctx.now();

    let mut from_bal = read_balance(ctx, from, sym_id, amount.sym, now)?;
    if from_bal.spendable() < amount.amount {
        return Err(JmzkError::Balance(format!("{from} has insufficient spendable balance of {}", amount.sym)));
    }
    from_bal.amount = from_bal.amount.checked_sub(&amount)?;
    write_balance(ctx, from, sym_id, &from_bal)?;

    let mut to_bal = read_balance(ctx, to, sym_id, amount.sym, now)?;
    to_bal.amount = to_bal.amount.checked_add(&amount)?;
    write_balance(ctx, to, sym_id, &to_bal)?;
    Ok(())
}

fn create_fungible(
    ctx: &ContractContext,
    name: Name128,
    sym_name: String,
    sym: jmzk_chain_core::Symbol,
    creator: jmzk_chain_core::PublicKeyBytes,
    issue: jmzk_chain_core::PermissionDef,
    transfer: jmzk_chain_core::PermissionDef,
    manage: jmzk_chain_core::PermissionDef,
    total_supply: Asset,
    metas: Vec<jmzk_chain_core::Meta>,
) -> Result<()> {
    if ctx.cache.exists_token(TokenType::Fungible, None, name)? {
        return Err(JmzkError::DuplicateFungible(name.to_string()));
    }
    if !ctx.has_signed(&creator) {
        return Err(JmzkError::Authorization(format!("newfungible creator {creator} did not sign")));
    }
    issue.validate(true)?;
    transfer.validate(true)?;
    manage.validate(false)?;
    if total_supply.sym != sym {
        return Err(JmzkError::AssetSymbol("total_supply symbol must match fungible's own symbol".into()));
    }

    let def = FungibleDef {
        name,
        sym_name,
        sym,
        creator,
        create_time: ctx.now(),
        issue,
        transfer,
        manage,
        total_supply,
        metas,
    };
    ctx.cache.put_token(TokenType::Fungible, PutOp::Add, None, name, def.clone())?;

    // The whole supply is minted straight to the sink at creation; issuefungible
    // only ever moves coins out of the sink, it never mints beyond this.
    let sink = def.sink_address();
    write_balance(ctx, &sink, sym.id(), &Property { amount: total_supply, frozen_amount: Asset::new(0, sym)?, sym, created_at: ctx.now(), created_index: 0 })?;
    Ok(())
}

pub fn new_fungible(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: NewFungible = decode(act)?;
    create_fungible(ctx, p.name, p.sym_name, p.sym, p.creator, p.issue, p.transfer, p.manage, p.total_supply, vec![])
}

pub fn new_fungible_v2(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: NewFungibleV2 = decode(act)?;
    create_fungible(ctx, p.name, p.sym_name, p.sym, p.creator, p.issue, p.transfer, p.manage, p.total_supply, p.metas)
}

pub fn upd_fungible(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: UpdFungible = decode(act)?;
    let name = fungible_name_for_sym(ctx, p.sym_id)?;
    let def = ctx.cache.read_token::<FungibleDef>(TokenType::Fungible, None, name)?;

    let mut checker = ctx.checker();
    if !checker.satisfied(&def.manage, &Name128::RESERVED, &Name128::RESERVED)? {
        return Err(JmzkError::Authorization(format!("manage permission not satisfied for fungible {}", def.name)));
    }

    let mut updated = (*def).clone();
    if let Some(issue) = p.issue {
        issue.validate(true)?;
        updated.issue = issue;
    }
    if let Some(transfer) = p.transfer {
        transfer.validate(true)?;
        updated.transfer = transfer;
    }
    if let Some(manage) = p.manage {
        manage.validate(false)?;
        updated.manage = manage;
    }
    ctx.cache.put_token(TokenType::Fungible, PutOp::Put, None, name, updated)?;
    Ok(())
}

/// Fungibles are keyed by name in the TDB but addressed by `sym_id` on
/// the wire; a full table scan stands in for a dedicated sym_id index
/// since this crate has no table-building step of its own.
pub(crate) fn fungible_name_for_sym(ctx: &ContractContext, sym_id: u32) -> Result<Name128> {
    let mut found = None;
    ctx.cache.tdb().read_tokens_range(TokenType::Fungible, None, 0, |key, bytes| {
        if let Ok(def) = bincode::deserialize::<FungibleDef>(bytes) {
            if def.sym.id() == sym_id {
                found = Some(key);
                return false;
            }
        }
        true
    })?;
    found.ok_or_else(|| JmzkError::UnknownFungible(sym_id.to_string()))
}

pub fn issue_fungible(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: IssueFungible = decode(act)?;
    let name = fungible_name_for_sym(ctx, p.number.sym.id())?;
    let def = ctx.cache.read_token::<FungibleDef>(TokenType::Fungible, None, name)?;

    if p.number.sym.id() as u64 == jmzk_chain_core::JMZK_SYM_ID && p.address == def.sink_address() {
        return Err(JmzkError::InvalidArgument("native token cannot be issued to its own sink".into()));
    }

    let mut checker = ctx.checker();
    if !checker.satisfied(&def.issue, &Name128::RESERVED, &Name128::RESERVED)? {
        return Err(JmzkError::Authorization(format!("issue permission not satisfied for fungible {}", def.name)));
    }

    move_funds(ctx, &def.sink_address(), &p.address, p.number)
}

fn require_not_pinned(amount: &Asset) -> Result<()> {
    if amount.sym.id() as u64 == PJMZK_SYM_ID {
        return Err(JmzkError::InvalidArgument("pjmzk cannot move through transferft".into()));
    }
    Ok(())
}

pub fn transfer_ft(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: TransferFt = decode(act)?;
    require_not_pinned(&p.number)?;

    let from_key = match &p.from {
        Address::PublicKey(pk) => *pk,
        _ => return Err(JmzkError::InvalidArgument("transferft sender must be a keyed address".into())),
    };
    if !ctx.has_signed(&from_key) {
        return Err(JmzkError::Authorization(format!("transferft sender {from_key} did not sign")));
    }

    move_funds(ctx, &p.from, &p.to, p.number)?;
    crate::bonus::on_transfer_ft(ctx, &p.from, p.number)?;
    Ok(())
}

pub fn recycle_ft(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: RecycleFt = decode(act)?;
    let name = fungible_name_for_sym(ctx, p.number.sym.id())?;
    let def = ctx.cache.read_token::<FungibleDef>(TokenType::Fungible, None, name)?;

    let mut checker = ctx.checker();
    if !checker.satisfied(&def.manage, &Name128::RESERVED, &Name128::RESERVED)? {
        return Err(JmzkError::Authorization(format!("manage permission not satisfied for fungible {}", def.name)));
    }
    move_funds(ctx, &p.address, &def.sink_address(), p.number)
}

pub fn destroy_ft(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: DestroyFt = decode(act)?;
    let name = fungible_name_for_sym(ctx, p.number.sym.id())?;
    let def = ctx.cache.read_token::<FungibleDef>(TokenType::Fungible, None, name)?;

    let mut checker = ctx.checker();
    if !checker.satisfied(&def.manage, &Name128::RESERVED, &Name128::RESERVED)? {
        return Err(JmzkError::Authorization(format!("manage permission not satisfied for fungible {}", def.name)));
    }
    move_funds(ctx, &p.address, &Address::Reserved, p.number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmzk_chain_core::{AuthorizerRef, AuthorizerWeight, PermissionDef, PublicKeyBytes, Symbol};
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

    fn perm(key: PublicKeyBytes) -> PermissionDef {
        PermissionDef {
            name: Name128::from_str_checked("p").unwrap(),
            threshold: 1,
            authorizers: vec![AuthorizerWeight { reference: AuthorizerRef::Account(key), weight: 1 }],
        }
    }

    #[test]
    fn newfungible_mints_total_supply_to_sink_then_issue_moves_it() {
        let ctx = setup();
        let creator = pk(1);
        let holder = pk(2);
        let sym = Symbol::new(2, 5).unwrap();
        ctx.begin_transaction(0, vec![creator]);

        let act = Action::new(
            "newfungible",
            Name128::RESERVED,
            Name128::RESERVED,
            bincode::serialize(&NewFungible {
                name: Name128::from_str_checked("f1").unwrap(),
                sym_name: "FOO".into(),
                sym,
                creator,
                issue: perm(creator),
                transfer: perm(creator),
                manage: perm(creator),
                total_supply: Asset::new(10_000, sym).unwrap(),
            })
            .unwrap(),
        );
        new_fungible(&ctx, &act).unwrap();

        let act = Action::new(
            "issuefungible",
            Name128::RESERVED,
            Name128::RESERVED,
            bincode::serialize(&IssueFungible { address: Address::PublicKey(holder), number: Asset::new(100, sym).unwrap(), memo: String::new() }).unwrap(),
        );
        issue_fungible(&ctx, &act).unwrap();

        let bal = read_balance(&ctx, &Address::PublicKey(holder), sym.id(), sym, 0).unwrap();
        assert_eq!(bal.amount.amount, 100);
    }

    #[test]
    fn transferft_rejects_insufficient_balance() {
        let ctx = setup();
        let sym = Symbol::new(0, 9).unwrap();
        let a = pk(1);
        let b = pk(2);
        ctx.begin_transaction(0, vec![a]);
        let act = Action::new(
            "transferft",
            Name128::RESERVED,
            Name128::RESERVED,
            bincode::serialize(&TransferFt { from: Address::PublicKey(a), to: Address::PublicKey(b), number: Asset::new(50, sym).unwrap(), memo: String::new() }).unwrap(),
        );
        assert!(transfer_ft(&ctx, &act).is_err());
    }
}
