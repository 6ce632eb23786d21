//! `everipass`/`everipass_v2`, `everipay`/`everipay_v2` (§4.11): both
//! consume a jmzk-Link, a signed, self-contained proof carried outside
//! the transaction's own signatures. `everipass` is a pure ownership
//! check (optionally destroying the token it names); `everipay` moves
//! funds from the link's signer to a payee named in the action itself.
//!
//! Every link is single-use: its `link_id` (the low 16 bytes of its
//! digest) is recorded in a [`JmzkLinkObject`] the first time it is
//! consumed, and any later attempt at the same `link_id` is rejected —
//! skipped entirely in loadtest mode, where determinism across replays
//! matters more than replay protection.

use jmzk_chain_core::{Action, Address, Asset, JmzkError, JmzkLinkObject, Name128, Result, TokenDef};
use jmzk_link::{JmzkLink, Segment, SegmentValue, FLAG_DESTROY, FLAG_EVERIPASS, FLAG_EVERIPAY};
use jmzk_state::{PutOp, TokenType};

use crate::context::ContractContext;
use crate::payloads::{EveriPass, EveriPassV2, EveriPay, EveriPayV2};

fn decode<T: serde::de::DeserializeOwned>(act: &Action) -> Result<T> {
    bincode::deserialize(&act.data).map_err(JmzkError::from)
}

fn link_id_of(link: &JmzkLink) -> Result<u128> {
    let digest = link.digest()?;
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Ok(u128::from_be_bytes(bytes))
}

fn check_not_consumed_and_record(ctx: &ContractContext, link_id: u128) -> Result<()> {
    if ctx.loadtest_mode() {
        return Ok(());
    }
    let key = Name128(link_id);
    if ctx.cache.exists_token(TokenType::JmzkLink, None, key)? {
        return Err(JmzkError::JmzkLinkException(format!("link {link_id} has already been consumed")));
    }
    // block_num/trx_id are stamped in by the processor once the action is
    // committed to a block; this layer only guards against reuse within a
    // single execution.
    ctx.cache.put_token(TokenType::JmzkLink, PutOp::Add, None, key, JmzkLinkObject { link_id, block_num: 0, trx_id: [0u8; 32] })?;
    Ok(())
}

fn segment_str(link: &JmzkLink, key: u8) -> Result<String> {
    match &link.get_segment(key)?.value {
        SegmentValue::Str(s) => Ok(s.clone()),
        _ => Err(JmzkError::JmzkLinkException(format!("segment {key} is not a string"))),
    }
}

fn segment_u32(link: &JmzkLink, key: u8) -> Result<u32> {
    match &link.get_segment(key)?.value {
        SegmentValue::U32(v) => Ok(*v),
        _ => Err(JmzkError::JmzkLinkException(format!("segment {key} is not a u32"))),
    }
}

fn check_not_expired(ctx: &ContractContext, link: &JmzkLink) -> Result<()> {
    if ctx.loadtest_mode() {
        return Ok(());
    }
    let issued_at = segment_u32(link, Segment::KEY_TIMESTAMP)? as i64;
    let expired_secs = ctx.config().jmzk_link_expired_secs;
    if (ctx.now() - issued_at).abs() > expired_secs {
        return Err(JmzkError::JmzkLinkException("link has expired".into()));
    }
    Ok(())
}

fn apply_everipass(ctx: &ContractContext, p: EveriPass) -> Result<()> {
    let link = JmzkLink::parse(&p.link)?;
    if link.header() & FLAG_EVERIPASS == 0 {
        return Err(JmzkError::JmzkLinkException("link is not an everipass link".into()));
    }
    check_not_expired(ctx, &link)?;

    let domain = Name128::from_str_checked(&segment_str(&link, Segment::KEY_DOMAIN)?)?;
    let name = Name128::from_str_checked(&segment_str(&link, Segment::KEY_TOKEN)?)?;
    let token = ctx.cache.read_token::<TokenDef>(TokenType::Token, Some(domain), name)?;
    if token.is_destroyed() {
        return Err(JmzkError::InvalidArgument(format!("token {domain}/{name} is already destroyed")));
    }
    if token.is_locked() {
        return Err(JmzkError::InvalidArgument(format!("token {domain}/{name} is locked")));
    }

    let owners: Vec<_> = token
        .owner
        .iter()
        .map(|a| match a {
            Address::PublicKey(pk) => Ok(*pk),
            other => Err(JmzkError::InvalidArgument(format!("owner {other} of {domain}/{name} is not a public key"))),
        })
        .collect::<Result<_>>()?;
    let mut signers = link.restore_keys()?;
    signers.sort_by_key(|k| k.0);
    let mut expected = owners;
    expected.sort_by_key(|k| k.0);
    if signers != expected {
        return Err(JmzkError::Authorization(format!("link signers do not match the owner set of {domain}/{name}")));
    }

    let link_id = link_id_of(&link)?;
    check_not_consumed_and_record(ctx, link_id)?;

    if link.header() & FLAG_DESTROY != 0 {
        let mut updated = (*token).clone();
        updated.owner = vec![Address::Reserved];
        ctx.cache.put_token(TokenType::Token, PutOp::Put, Some(domain), name, updated)?;
    }
    Ok(())
}

pub fn everipass(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: EveriPass = decode(act)?;
    apply_everipass(ctx, p)
}

pub fn everipass_v2(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: EveriPassV2 = decode(act)?;
    apply_everipass(ctx, EveriPass { link: p.link })
}

/// Rejects a link carrying both the integer and string variant of the
/// same segment rather than silently preferring one: the two encodings
/// are meant to be mutually exclusive, not a fallback pair.
fn exactly_one_of(link: &JmzkLink, int_key: u8, str_key: u8, field: &str) -> Result<Option<i64>> {
    let has_int = link.has_segment(int_key);
    let has_str = link.has_segment(str_key);
    if has_int && has_str {
        return Err(JmzkError::JmzkLinkException(format!("link carries both the integer and string form of {field}")));
    }
    if has_int {
        return Ok(Some(segment_u32(link, int_key)? as i64));
    }
    if has_str {
        let s = segment_str(link, str_key)?;
        return Ok(Some(s.parse::<i64>().map_err(|_| JmzkError::JmzkLinkException(format!("{field} string is not an integer")))?));
    }
    Ok(None)
}

fn max_pay_of(link: &JmzkLink) -> Result<Option<i64>> {
    exactly_one_of(link, Segment::KEY_MAX_PAY, Segment::KEY_MAX_PAY_STR, "max_pay")
}

fn fixed_amount_of(link: &JmzkLink) -> Result<Option<i64>> {
    exactly_one_of(link, Segment::KEY_FIXED_AMOUNT, Segment::KEY_FIXED_AMOUNT_STR, "fixed_amount")
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
    if from_bal.spendable() < amount.amount {
        return Err(JmzkError::Balance(format!("{from} has insufficient spendable balance of {}", amount.sym)));
    }
    from_bal.amount = from_bal.amount.checked_sub(&amount)?;
    write_balance(ctx, from, sym_id, &from_bal)?;
    let mut to_bal = read_balance(ctx, to, sym_id, amount.sym)?;
    to_bal.amount = to_bal.amount.checked_add(&amount)?;
    write_balance(ctx, to, sym_id, &to_bal)?;
    Ok(())
}

fn apply_everipay(ctx: &ContractContext, p: EveriPay) -> Result<()> {
    let link = JmzkLink::parse(&p.link)?;
    if link.header() & FLAG_EVERIPAY == 0 {
        return Err(JmzkError::JmzkLinkException("link is not an everipay link".into()));
    }
    check_not_expired(ctx, &link)?;

    if link.signatures().len() != 1 {
        return Err(JmzkError::JmzkLinkException("everipay link must carry exactly one signature".into()));
    }
    let signers = link.restore_keys()?;
    let payer = signers[0];
    let payer_addr = Address::PublicKey(payer);
    if payer_addr == p.payee {
        return Err(JmzkError::InvalidArgument("everipay payer and payee must differ".into()));
    }

    let sym_id = segment_u32(&link, Segment::KEY_SYMBOL_ID)?;
    if sym_id != p.number.sym.id() {
        return Err(JmzkError::AssetSymbol("everipay link's symbol_id does not match the action's amount".into()));
    }

    if let Some(fixed) = fixed_amount_of(&link)? {
        if p.number.amount != fixed {
            return Err(JmzkError::InvalidArgument(format!("everipay link fixes the amount at {fixed}")));
        }
    } else if let Some(max) = max_pay_of(&link)? {
        if p.number.amount > max {
            return Err(JmzkError::InvalidArgument(format!("everipay amount exceeds the link's max_pay of {max}")));
        }
    } else {
        return Err(JmzkError::JmzkLinkException("everipay link carries neither a fixed_amount nor a max_pay".into()));
    }

    let link_id = link_id_of(&link)?;
    check_not_consumed_and_record(ctx, link_id)?;

    move_funds(ctx, &payer_addr, &p.payee, p.number)?;
    crate::bonus::on_everi_pay(ctx, &payer_addr, p.number)?;
    Ok(())
}

pub fn everipay(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: EveriPay = decode(act)?;
    apply_everipay(ctx, p)
}

pub fn everipay_v2(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: EveriPayV2 = decode(act)?;
    apply_everipay(ctx, EveriPay { link: p.link, payee: p.payee, number: p.number })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmzk_chain_core::{PublicKeyBytes, Symbol};
    use jmzk_crypto::keypair::KeyPair;
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
    fn everipass_requires_link_signers_to_match_owner_set() {
        let ctx = setup();
        let owner_kp = KeyPair::generate();
        let domain = Name128::from_str_checked("d1").unwrap();
        let name = Name128::from_str_checked("t1").unwrap();
        let token = TokenDef { domain, name, owner: vec![Address::PublicKey(owner_kp.public_key())], metas: vec![] };
        ctx.cache.put_token(TokenType::Token, PutOp::Add, Some(domain), name, token).unwrap();

        let mut link = JmzkLink::new(FLAG_EVERIPASS);
        link.add_segment(Segment::new(Segment::KEY_TIMESTAMP, SegmentValue::U32(0)).unwrap());
        link.add_segment(Segment::new(Segment::KEY_DOMAIN, SegmentValue::Str("d1".into())).unwrap());
        link.add_segment(Segment::new(Segment::KEY_TOKEN, SegmentValue::Str("t1".into())).unwrap());
        link.sign(&owner_kp).unwrap();

        let act = Action::new("everipass", domain, name, bincode::serialize(&EveriPass { link: link.to_uri_string(false).unwrap() }).unwrap());
        everipass(&ctx, &act).unwrap();

        // replay is rejected
        assert!(everipass(&ctx, &act).is_err());
    }

    #[test]
    fn everipay_moves_funds_within_max_pay() {
        let ctx = setup();
        let payer_kp = KeyPair::generate();
        let payee = pk(9);
        let sym = Symbol::new(0, 9).unwrap();

        write_balance(&ctx, &Address::PublicKey(payer_kp.public_key()), sym.id(), &jmzk_chain_core::Property {
            amount: Asset::new(1000, sym).unwrap(),
            frozen_amount: Asset::new(0, sym).unwrap(),
            sym,
            created_at: 0,
            created_index: 0,
        })
        .unwrap();

        let mut link = JmzkLink::new(FLAG_EVERIPAY);
        link.add_segment(Segment::new(Segment::KEY_TIMESTAMP, SegmentValue::U32(0)).unwrap());
        link.add_segment(Segment::new(Segment::KEY_SYMBOL_ID, SegmentValue::U32(sym.id())).unwrap());
        link.add_segment(Segment::new(Segment::KEY_MAX_PAY, SegmentValue::U32(200)).unwrap());
        link.sign(&payer_kp).unwrap();

        let act = Action::new(
            "everipay",
            Name128::RESERVED,
            Name128::RESERVED,
            bincode::serialize(&EveriPay { link: link.to_uri_string(false).unwrap(), payee: Address::PublicKey(payee), number: Asset::new(150, sym).unwrap() }).unwrap(),
        );
        everipay(&ctx, &act).unwrap();

        let bal = read_balance(&ctx, &Address::PublicKey(payee), sym.id(), sym).unwrap();
        assert_eq!(bal.amount.amount, 150);
    }
}
