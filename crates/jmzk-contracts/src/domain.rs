//! `newdomain`, `updatedomain`, `issuetoken`, `transfer`, `destroytoken`,
//! and the two group actions (`newgroup`, `updategroup`) that every
//! domain's/group's own `manage` permission needs in order to ever be
//! exercised.

use jmzk_chain_core::{Action, Address, DomainDef, JmzkError, Meta, Name128, Result, TokenDef};
use jmzk_state::{PutOp, TokenType};

use crate::context::ContractContext;
use crate::payloads::{DestroyToken, IssueToken, NewDomain, NewGroup, Transfer, UpdateDomain, UpdateGroup};

fn decode<T: serde::de::DeserializeOwned>(act: &Action) -> Result<T> {
    bincode::deserialize(&act.data).map_err(JmzkError::from)
}

pub fn new_domain(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: NewDomain = decode(act)?;
    if ctx.cache.exists_token(TokenType::Domain, None, p.name)? {
        return Err(JmzkError::DuplicateDomain(p.name.to_string()));
    }
    if !ctx.has_signed(&p.creator) {
        return Err(JmzkError::Authorization(format!("newdomain creator {} did not sign", p.creator)));
    }
    p.issue.validate(true)?;
    p.transfer.validate(true)?;
    p.manage.validate(false)?;

    let domain = DomainDef {
        name: p.name,
        creator: p.creator,
        create_time: ctx.now(),
        issue: p.issue,
        transfer: p.transfer,
        manage: p.manage,
        metas: vec![],
    };
    ctx.cache.put_token(TokenType::Domain, PutOp::Add, None, p.name, domain)?;
    Ok(())
}

fn require_manage(ctx: &ContractContext, domain: &DomainDef) -> Result<()> {
    let mut checker = ctx.checker();
    if !checker.satisfied(&domain.manage, &domain.name, &Name128::RESERVED)? {
        return Err(JmzkError::Authorization(format!("manage permission not satisfied for domain {}", domain.name)));
    }
    Ok(())
}

pub fn update_domain(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: UpdateDomain = decode(act)?;
    let domain = ctx.cache.read_token::<DomainDef>(TokenType::Domain, None, p.name)?;
    require_manage(ctx, &domain)?;

    let mut updated = (*domain).clone();
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
    ctx.cache.put_token(TokenType::Domain, PutOp::Put, None, p.name, updated)?;
    Ok(())
}

pub fn issue_token(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: IssueToken = decode(act)?;
    let domain = ctx.cache.read_token::<DomainDef>(TokenType::Domain, None, p.domain)?;

    let mut checker = ctx.checker();
    if !checker.satisfied(&domain.issue, &domain.name, &Name128::RESERVED)? {
        return Err(JmzkError::Authorization(format!("issue permission not satisfied for domain {}", domain.name)));
    }

    if p.names.is_empty() {
        return Err(JmzkError::InvalidArgument("issuetoken requires at least one name".into()));
    }
    if p.owner.is_empty() {
        return Err(JmzkError::InvalidArgument("issuetoken requires at least one owner".into()));
    }
    for name in &p.names {
        if name.is_reserved() {
            return Err(JmzkError::InvalidArgument(format!("token name {name} is reserved")));
        }
        if ctx.cache.exists_token(TokenType::Token, Some(p.domain), *name)? {
            return Err(JmzkError::DuplicateToken(p.domain.to_string(), name.to_string()));
        }
    }

    for name in p.names {
        let token = TokenDef { domain: p.domain, name, owner: p.owner.clone(), metas: vec![] };
        ctx.cache.put_token(TokenType::Token, PutOp::Add, Some(p.domain), name, token)?;
    }
    Ok(())
}

pub fn transfer(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: Transfer = decode(act)?;
    let domain = ctx.cache.read_token::<DomainDef>(TokenType::Domain, None, p.domain)?;
    let token = ctx.cache.read_token::<TokenDef>(TokenType::Token, Some(p.domain), p.name)?;

    if token.is_destroyed() {
        return Err(JmzkError::InvalidArgument(format!("token {}/{} is destroyed", p.domain, p.name)));
    }
    if token.is_locked() {
        return Err(JmzkError::InvalidArgument(format!("token {}/{} is locked", p.domain, p.name)));
    }
    if p.to.is_empty() {
        return Err(JmzkError::InvalidArgument("transfer requires at least one recipient".into()));
    }

    let mut checker = ctx.checker();
    if !checker.satisfied(&domain.transfer, &domain.name, &p.name)? {
        return Err(JmzkError::Authorization(format!("transfer permission not satisfied for {}/{}", p.domain, p.name)));
    }

    let mut updated = (*token).clone();
    updated.owner = p.to;
    ctx.cache.put_token(TokenType::Token, PutOp::Put, Some(p.domain), p.name, updated)?;
    Ok(())
}

pub fn destroy_token(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: DestroyToken = decode(act)?;
    let domain = ctx.cache.read_token::<DomainDef>(TokenType::Domain, None, p.domain)?;
    let token = ctx.cache.read_token::<TokenDef>(TokenType::Token, Some(p.domain), p.name)?;

    if domain.destroy_disabled() {
        return Err(JmzkError::InvalidArgument(format!("domain {} has disabled token destruction", p.domain)));
    }
    if token.is_destroyed() {
        return Err(JmzkError::InvalidArgument(format!("token {}/{} already destroyed", p.domain, p.name)));
    }
    if token.is_locked() {
        return Err(JmzkError::InvalidArgument(format!("token {}/{} is locked", p.domain, p.name)));
    }

    let mut checker = ctx.checker();
    if !checker.satisfied(&domain.transfer, &domain.name, &p.name)? {
        return Err(JmzkError::Authorization(format!("transfer permission not satisfied for {}/{}", p.domain, p.name)));
    }

    let mut updated = (*token).clone();
    updated.owner = vec![Address::Reserved];
    ctx.cache.put_token(TokenType::Token, PutOp::Put, Some(p.domain), p.name, updated)?;
    Ok(())
}

pub fn new_group(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: NewGroup = decode(act)?;
    if ctx.cache.exists_token(TokenType::Group, None, p.name)? {
        return Err(JmzkError::DuplicateGroup(p.name.to_string()));
    }
    p.group.validate()?;
    if !ctx.has_signed(&p.group.key) {
        return Err(JmzkError::Authorization(format!("newgroup key {} did not sign", p.group.key)));
    }
    ctx.cache.put_token(TokenType::Group, PutOp::Add, None, p.name, p.group)?;
    Ok(())
}

pub fn update_group(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: UpdateGroup = decode(act)?;
    let existing = ctx.cache.read_token::<jmzk_chain_core::Group>(TokenType::Group, None, p.name)?;
    if !ctx.has_signed(&existing.key) {
        return Err(JmzkError::Authorization(format!("updategroup requires {} to sign", existing.key)));
    }
    p.group.validate()?;
    ctx.cache.put_token(TokenType::Group, PutOp::Put, None, p.name, p.group)?;
    Ok(())
}
