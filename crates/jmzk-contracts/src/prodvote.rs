//! `prodvote`: each validator casts a numeric vote for a config key; once
//! more than two thirds of the active validator set has voted, the
//! result is committed — the median for ordinary keys, a plurality vote
//! for `action-*` keys (those bump an action's dispatch version, decided
//! by the processor's execution context rather than here).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use jmzk_chain_core::{Action, ChainConfig, JmzkError, Name128, PublicKeyBytes, Result, Validator};
use jmzk_state::{PutOp, TokenType};

use crate::context::ContractContext;
use crate::payloads::ProdVote;

fn decode<T: serde::de::DeserializeOwned>(act: &Action) -> Result<T> {
    bincode::deserialize(&act.data).map_err(JmzkError::from)
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
struct ProdVoteTally {
    votes: HashMap<PublicKeyBytes, i64>,
}

/// An `action-*` key committed to quorum, waiting for the processor to
/// apply it to its own execution context's version table.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct CommittedActionVote {
    pub action_name: String,
    pub version: u32,
}

fn vote_key_id(key: &str) -> Name128 {
    Name128(jmzk_chain_core::action_name_id(key) as u128)
}

fn active_validators(ctx: &ContractContext) -> Result<Vec<PublicKeyBytes>> {
    let mut out = Vec::new();
    ctx.cache.tdb().read_tokens_range(TokenType::Validator, None, 0, |_key, bytes| {
        if let Ok(v) = bincode::deserialize::<Validator>(bytes) {
            out.push(v.signing_key);
        }
        true
    })?;
    Ok(out)
}

fn median(mut values: Vec<i64>) -> i64 {
    values.sort_unstable();
    values[values.len() / 2]
}

fn plurality(votes: &HashMap<PublicKeyBytes, i64>) -> i64 {
    let mut counts: HashMap<i64, u32> = HashMap::new();
    for v in votes.values() {
        *counts.entry(*v).or_insert(0) += 1;
    }
    counts.into_iter().max_by_key(|(_, c)| *c).map(|(v, _)| v).unwrap_or(0)
}

fn apply_config_key(config: &mut ChainConfig, key: &str, value: i64) -> Result<()> {
    match key {
        "base_network_charge_factor" => config.base_network_charge_factor = value as u32,
        "base_storage_charge_factor" => config.base_storage_charge_factor = value as u32,
        "base_cpu_charge_factor" => config.base_cpu_charge_factor = value as u32,
        "global_charge_factor" => config.global_charge_factor = value as u32,
        "jmzk_link_expired_secs" => config.jmzk_link_expired_secs = value,
        "max_charge" => config.max_charge = value as u32,
        "net_usage_limit" => config.net_usage_limit = value as u32,
        _ => return Err(JmzkError::InvalidArgument(format!("prodvote key {key} does not name a known config field"))),
    }
    Ok(())
}

pub fn prod_vote(ctx: &ContractContext, act: &Action) -> Result<()> {
    let p: ProdVote = decode(act)?;
    if !ctx.has_signed(&p.producer) {
        return Err(JmzkError::Authorization(format!("prodvote producer {} did not sign", p.producer)));
    }
    let producers = active_validators(ctx)?;
    if producers.is_empty() {
        return Err(JmzkError::InvalidArgument("prodvote has no active validator set to vote among".into()));
    }
    if !producers.contains(&p.producer) {
        return Err(JmzkError::Authorization(format!("{} is not an active validator", p.producer)));
    }

    let key_id = vote_key_id(&p.key);
    let mut tally = ctx
        .cache
        .read_token_opt::<ProdVoteTally>(TokenType::Prodvote, None, key_id)?
        .map(|t| (*t).clone())
        .unwrap_or_default();
    tally.votes.insert(p.producer, p.value);

    let quorum_met = tally.votes.len() * 3 > producers.len() * 2;
    if quorum_met {
        if let Some(action_name) = p.key.strip_prefix("action-") {
            let version = plurality(&tally.votes);
            ctx.cache.put_token(
                TokenType::Prodvote,
                PutOp::Put,
                None,
                key_id,
                CommittedActionVote { action_name: action_name.to_string(), version: version.max(1) as u32 },
            )?;
        } else {
            let values: Vec<i64> = tally.votes.values().copied().collect();
            let mut config = ctx.config();
            apply_config_key(&mut config, &p.key, median(values))?;
            ctx.set_config(config);
            ctx.cache.remove_token(TokenType::Prodvote, None, key_id)?;
        }
    } else {
        let op = if ctx.cache.exists_token(TokenType::Prodvote, None, key_id)? { PutOp::Put } else { PutOp::Add };
        ctx.cache.put_token(TokenType::Prodvote, op, None, key_id, tally)?;
    }
    Ok(())
}
