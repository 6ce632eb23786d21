//! `newscript`, `updscript`: opaque bodies consumed by an external filter
//! engine this crate does not implement; only storage and versioning live
//! here.

use jmzk_chain_core::{Action, JmzkError, Name128, Result, ScriptDef};
use jmzk_state::{PutOp, TokenType};

use crate::context::ContractContext;
use crate::payloads::{NewScript, UpdScript};

fn decode<T: serde::de::DeserializeOwned>(act: &Action) -> Result<T> {
    bincode::deserialize(&act.data).map_err(JmzkError::from)
}

pub fn new_script(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: NewScript = decode(act)?;
    if ctx.cache.exists_token(TokenType::Script, None, p.name)? {
        return Err(JmzkError::InvalidArgument(format!("script {} already exists", p.name)));
    }
    if !ctx.has_signed(&p.creator) {
        return Err(JmzkError::Authorization(format!("newscript creator {} did not sign", p.creator)));
    }
    if p.body.is_empty() {
        return Err(JmzkError::InvalidArgument("newscript body must not be empty".into()));
    }
    let def = ScriptDef { name: p.name, creator: p.creator, body: p.body, version: 1 };
    ctx.cache.put_token(TokenType::Script, PutOp::Add, None, p.name, def)?;
    Ok(())
}

pub fn upd_script(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: UpdScript = decode(act)?;
    let def = ctx.cache.read_token::<ScriptDef>(TokenType::Script, None, p.name)?;
    if !ctx.has_signed(&def.creator) {
        return Err(JmzkError::Authorization(format!("updscript requires creator {} to sign", def.creator)));
    }
    if p.body.is_empty() {
        return Err(JmzkError::InvalidArgument("updscript body must not be empty".into()));
    }
    let mut updated = (*def).clone();
    updated.body = p.body;
    updated.version += 1;
    ctx.cache.put_token(TokenType::Script, PutOp::Put, None, p.name, updated)?;
    Ok(())
}
