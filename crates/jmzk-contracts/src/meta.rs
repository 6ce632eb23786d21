//! `addmeta`: appends a `(key, value, creator)` triple to whichever
//! principal record `target` names. `creator` must actually be involved
//! with the target — a member of its `issue`/`transfer`/`manage`
//! authorizer list, its owner set, or (for a group target) the group
//! itself — and must have actually signed, not merely be named in the
//! payload.

use jmzk_chain_core::{Action, Address, AuthorizerRef, DomainDef, FungibleDef, Group, JmzkError, Meta, PermissionDef, Result, TokenDef};
use jmzk_state::{PutOp, TokenType};

use crate::context::ContractContext;
use crate::payloads::{AddMeta, MetaTarget};

fn decode<T: serde::de::DeserializeOwned>(act: &Action) -> Result<T> {
    bincode::deserialize(&act.data).map_err(JmzkError::from)
}

/// Reserved key names, scoped to the one target kind that interprets
/// them. Any other target may still attach an ordinary meta under the
/// same string; only the owning subsystem's reading of it is reserved.
fn reserved_key_allowed(key: &str, target: &MetaTarget) -> bool {
    match key {
        "disable_destroy" => matches!(target, MetaTarget::Domain(_)),
        _ => true,
    }
}

fn group_contains_key(group: &Group, key: &jmzk_chain_core::PublicKeyBytes) -> bool {
    group.root.iter().any(|n| n.is_leaf() && n.key == Some(*key))
}

/// Whether `creator` is actually named among `perm`'s authorizers, either
/// directly (an `Account` authorizer matching the same key) or through a
/// referenced group (a `Group` authorizer whose tree contains the key, or
/// whose name matches a `Group`-ref creator).
fn permission_involves(ctx: &ContractContext, perm: &PermissionDef, creator: &AuthorizerRef) -> Result<bool> {
    for aw in &perm.authorizers {
        match (&aw.reference, creator) {
            (AuthorizerRef::Account(a), AuthorizerRef::Account(c)) if a == c => return Ok(true),
            (AuthorizerRef::Group(gname), AuthorizerRef::Account(c)) => {
                let group = ctx.cache.read_token::<Group>(TokenType::Group, None, *gname)?;
                if group_contains_key(&group, c) {
                    return Ok(true);
                }
            }
            (AuthorizerRef::Group(gname), AuthorizerRef::Group(cname)) if gname == cname => return Ok(true),
            _ => {}
        }
    }
    Ok(false)
}

/// Whether `creator` names a key present in a token's owner list.
fn owner_involves(owner: &[Address], creator: &AuthorizerRef) -> bool {
    match creator {
        AuthorizerRef::Account(key) => owner.iter().any(|a| matches!(a, Address::PublicKey(k) if k == key)),
        _ => false,
    }
}

/// Whether the signing key set backing `creator` actually signed this
/// transaction — a group creator must meet its own tree's threshold.
fn creator_signed(ctx: &ContractContext, creator: &AuthorizerRef) -> Result<bool> {
    match creator {
        AuthorizerRef::Account(key) => Ok(ctx.has_signed(key)),
        AuthorizerRef::Group(name) => {
            let group = ctx.cache.read_token::<Group>(TokenType::Group, None, *name)?;
            let signing_keys = ctx.signing_keys();
            let mut used = Vec::new();
            Ok(group.satisfied(&signing_keys, &mut |k| used.push(*k)))
        }
        AuthorizerRef::Owner => Ok(false),
    }
}

pub fn add_meta(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: AddMeta = decode(act)?;
    let key_str = p.key.to_string_lossy();
    if !reserved_key_allowed(&key_str, &p.target) {
        return Err(JmzkError::MetaInvolve(format!("meta key {key_str} is reserved for a different target kind")));
    }

    if !creator_signed(ctx, &p.creator)? {
        return Err(JmzkError::Authorization("addmeta creator did not sign this transaction".into()));
    }
    let creator_key = match &p.creator {
        AuthorizerRef::Account(pk) => *pk,
        AuthorizerRef::Owner | AuthorizerRef::Group(_) => {
            // Recorded on the meta entry for provenance even when the
            // authorizing principal is a group or the token's owner set;
            // the first signing key on the transaction stands in for it.
            *ctx.signing_keys().first().ok_or_else(|| JmzkError::Authorization("addmeta requires at least one signature".into()))?
        }
    };

    match p.target {
        MetaTarget::Domain(name) => {
            let domain = ctx.cache.read_token::<DomainDef>(TokenType::Domain, None, name)?;
            if domain.metas.iter().any(|m| m.key == p.key) {
                return Err(JmzkError::MetaInvolve(format!("domain {name} already has meta key {key_str}")));
            }
            if !permission_involves(ctx, &domain.manage, &p.creator)? {
                return Err(JmzkError::Authorization(format!("addmeta creator not involved with domain {name}")));
            }
            let mut updated = (*domain).clone();
            updated.metas.push(Meta { key: p.key, value: p.value, creator: creator_key });
            ctx.cache.put_token(TokenType::Domain, PutOp::Put, None, name, updated)?;
        }
        MetaTarget::Token { domain: domain_name, name } => {
            let domain = ctx.cache.read_token::<DomainDef>(TokenType::Domain, None, domain_name)?;
            let token = ctx.cache.read_token::<TokenDef>(TokenType::Token, Some(domain_name), name)?;
            if token.is_destroyed() {
                return Err(JmzkError::InvalidArgument(format!("token {domain_name}/{name} is destroyed")));
            }
            if token.is_locked() {
                return Err(JmzkError::InvalidArgument(format!("token {domain_name}/{name} is locked")));
            }
            if token.metas.iter().any(|m| m.key == p.key) {
                return Err(JmzkError::MetaInvolve(format!("token {domain_name}/{name} already has meta key {key_str}")));
            }
            let involved = owner_involves(&token.owner, &p.creator)
                || permission_involves(ctx, &domain.issue, &p.creator)?
                || permission_involves(ctx, &domain.transfer, &p.creator)?;
            if !involved {
                return Err(JmzkError::Authorization(format!("addmeta creator not involved with token {domain_name}/{name}")));
            }
            let mut updated = (*token).clone();
            updated.metas.push(Meta { key: p.key, value: p.value, creator: creator_key });
            ctx.cache.put_token(TokenType::Token, PutOp::Put, Some(domain_name), name, updated)?;
        }
        MetaTarget::Fungible(sym_id) => {
            let name = crate::fungible::fungible_name_for_sym(ctx, sym_id)?;
            let def = ctx.cache.read_token::<FungibleDef>(TokenType::Fungible, None, name)?;
            if def.metas.iter().any(|m| m.key == p.key) {
                return Err(JmzkError::MetaInvolve(format!("fungible {sym_id} already has meta key {key_str}")));
            }
            let involved = matches!(&p.creator, AuthorizerRef::Account(k) if *k == def.creator)
                || permission_involves(ctx, &def.manage, &p.creator)?;
            if !involved {
                return Err(JmzkError::Authorization(format!("addmeta creator not involved with fungible {sym_id}")));
            }
            let mut updated = (*def).clone();
            updated.metas.push(Meta { key: p.key, value: p.value, creator: creator_key });
            ctx.cache.put_token(TokenType::Fungible, PutOp::Put, None, name, updated)?;
        }
        MetaTarget::Group(name) => {
            let group = ctx.cache.read_token::<Group>(TokenType::Group, None, name)?;
            let involved = match &p.creator {
                AuthorizerRef::Group(cname) => *cname == group.name,
                AuthorizerRef::Account(key) => group.key == *key,
                AuthorizerRef::Owner => false,
            };
            if !involved {
                return Err(JmzkError::Authorization(format!("addmeta creator not involved with group {name}")));
            }
            // groups carry no meta list of their own in this model; an
            // involvement check still runs so the action fails the same
            // way it would against any other unauthorized target.
            return Err(JmzkError::MetaInvolve(format!("group {name} does not carry a meta list")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmzk_chain_core::{Address, AuthorizerWeight, Name128, PublicKeyBytes};
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
    fn addmeta_rejects_duplicate_key_on_domain() {
        let ctx = setup();
        let creator = pk(1);
        ctx.begin_transaction(0, vec![creator]);
        let domain = DomainDef {
            name: Name128::from_str_checked("d1").unwrap(),
            creator,
            create_time: 0,
            issue: perm(creator),
            transfer: perm(creator),
            manage: perm(creator),
            metas: vec![],
        };
        ctx.cache.put_token(TokenType::Domain, PutOp::Add, None, domain.name, domain.clone()).unwrap();

        let act = Action::new(
            "addmeta",
            domain.name,
            Name128::RESERVED,
            bincode::serialize(&AddMeta {
                target: MetaTarget::Domain(domain.name),
                key: Name128::from_str_checked("k1").unwrap(),
                value: "v1".into(),
                creator: AuthorizerRef::Account(creator),
            })
            .unwrap(),
        );
        add_meta(&ctx, &act).unwrap();
        assert!(add_meta(&ctx, &act).is_err());
    }

    #[test]
    fn addmeta_rejects_reserved_key_on_wrong_target() {
        let ctx = setup();
        let creator = pk(1);
        ctx.begin_transaction(0, vec![creator]);
        let domain = DomainDef {
            name: Name128::from_str_checked("d1").unwrap(),
            creator,
            create_time: 0,
            issue: perm(creator),
            transfer: perm(creator),
            manage: perm(creator),
            metas: vec![],
        };
        ctx.cache.put_token(TokenType::Domain, PutOp::Add, None, domain.name, domain.clone()).unwrap();
        let token = TokenDef { domain: domain.name, name: Name128::from_str_checked("t1").unwrap(), owner: vec![Address::PublicKey(creator)], metas: vec![] };
        ctx.cache.put_token(TokenType::Token, PutOp::Add, Some(domain.name), token.name, token.clone()).unwrap();

        let act = Action::new(
            "addmeta",
            domain.name,
            token.name,
            bincode::serialize(&AddMeta {
                target: MetaTarget::Token { domain: domain.name, name: token.name },
                key: Name128::from_str_checked("disable_destroy").unwrap(),
                value: "true".into(),
                creator: AuthorizerRef::Account(creator),
            })
            .unwrap(),
        );
        assert!(add_meta(&ctx, &act).is_err());
    }
}
