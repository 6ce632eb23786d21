//! jmzk-chain-node — a thin demonstration binary over the transactional
//! core. Applies genesis to a fresh in-memory database, creates one
//! domain and issues one token through the full transaction processor,
//! and prints the resulting trace.
//!
//! This is not a production node: block production, networking and RPC
//! surfaces are out of scope (see `DESIGN.md`). Its purpose is to prove
//! the crates in this workspace actually wire together end to end; the
//! integration tests under `tests/` exercise the rest of the behavior.

use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use tracing::info;

use jmzk_chain_core::{Action, Address, PermissionDef};
use jmzk_contracts::payloads::{IssueToken, NewDomain};
use jmzk_crypto::KeyPair;

#[derive(Parser, Debug)]
#[command(name = "jmzk-chain-node", version, about = "jmzk transactional core demo")]
struct Args {
    /// Name of the domain to create in the demo run.
    #[arg(long, default_value = "demo")]
    domain: String,

    /// Name of the token issued into that domain.
    #[arg(long, default_value = "token1")]
    token: String,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let founder = KeyPair::generate();
    let chain = jmzk_chain_node::bootstrap(&founder).context("bootstrapping chain")?;
    let now = chrono::Utc::now().timestamp();
    chain.controller.set_clock(now);
    info!(founder = %founder.public_key(), "genesis applied");

    let domain_name = jmzk_chain_node::name(&args.domain);
    let token_name = jmzk_chain_node::name(&args.token);
    let perm = |n: &str| PermissionDef {
        name: jmzk_chain_node::name(n),
        threshold: 1,
        authorizers: vec![jmzk_chain_core::AuthorizerWeight {
            reference: jmzk_chain_core::AuthorizerRef::Account(founder.public_key()),
            weight: 1,
        }],
    };

    let newdomain = Action::new(
        "newdomain",
        domain_name,
        jmzk_chain_core::Name128::RESERVED,
        bincode::serialize(&NewDomain {
            name: domain_name,
            creator: founder.public_key(),
            issue: perm("issue"),
            transfer: perm("transfer"),
            manage: PermissionDef { name: jmzk_chain_node::name("manage"), threshold: 0, authorizers: vec![] },
        })?,
    );
    let body = jmzk_chain_node::single_action_body(newdomain, Address::PublicKey(founder.public_key()));
    let ptrx = jmzk_chain_node::sign(body, &[&founder], &chain.chain_id)?;
    let trace = chain.processor.push_transaction(&ptrx, Instant::now() + Duration::from_secs(5));
    info!(status = ?trace.status, id = %hex::encode(trace.id), "newdomain applied");

    let issuetoken = Action::new(
        "issuetoken",
        domain_name,
        jmzk_chain_core::Name128::RESERVED,
        bincode::serialize(&IssueToken { domain: domain_name, names: vec![token_name], owner: vec![Address::PublicKey(founder.public_key())] })?,
    );
    let body = jmzk_chain_node::single_action_body(issuetoken, Address::PublicKey(founder.public_key()));
    let ptrx = jmzk_chain_node::sign(body, &[&founder], &chain.chain_id)?;
    let trace = chain.processor.push_transaction(&ptrx, Instant::now() + Duration::from_secs(5));
    info!(status = ?trace.status, id = %hex::encode(trace.id), "issuetoken applied");

    Ok(())
}
