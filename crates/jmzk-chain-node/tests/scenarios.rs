//! End-to-end coverage of the chain's concrete test scenarios, driven
//! through the full `TransactionProcessor` pipeline rather than calling
//! contract handlers directly. Scenario 3 (jmzk-Link everipay) is covered
//! at the contract/link-codec unit-test level instead; it needs no
//! processor-level plumbing this harness would add anything to.

use std::time::{Duration, Instant};

use jmzk_chain_core::{
    Action, Address, Asset, AuthorizerRef, AuthorizerWeight, BonusMethod, DistReceiver, DistRule, Name128, PermissionDef,
    PublicKeyBytes, Symbol, TokenDef,
};
use jmzk_contracts::payloads::{
    AprvSuspend, CancelSuspend, DestroyToken, DistPsvBonus, IssueFungible, IssueToken, NewDomain, NewFungibleV2,
    NewSuspend, SetPsvBonusV2, Transfer, TransferFt,
};
use jmzk_crypto::KeyPair;
use jmzk_state::TokenType;

fn deadline() -> Instant {
    Instant::now() + Duration::from_secs(5)
}

fn perm(name: &str, key: PublicKeyBytes) -> PermissionDef {
    PermissionDef {
        name: jmzk_chain_node::name(name),
        threshold: 1,
        authorizers: vec![AuthorizerWeight { reference: AuthorizerRef::Account(key), weight: 1 }],
    }
}

fn no_manage() -> PermissionDef {
    PermissionDef { name: jmzk_chain_node::name("manage"), threshold: 0, authorizers: vec![] }
}

/// Transfer/destroy permission bound to the token's current owner rather
/// than a fixed key, so whoever holds a token can move or destroy it.
fn owner_perm() -> PermissionDef {
    PermissionDef {
        name: jmzk_chain_node::name("transfer"),
        threshold: 1,
        authorizers: vec![AuthorizerWeight { reference: AuthorizerRef::Owner, weight: 1 }],
    }
}

#[test]
fn scenario1_create_then_destroy_domain() {
    let founder = KeyPair::generate();
    let chain = jmzk_chain_node::bootstrap(&founder).unwrap();
    let creator = KeyPair::generate();

    let d1 = jmzk_chain_node::name("d1");
    let newdomain = |creator_key: PublicKeyBytes| NewDomain {
        name: d1,
        creator: creator_key,
        issue: perm("issue", creator_key),
        transfer: perm("transfer", creator_key),
        manage: no_manage(),
    };

    let act = Action::new("newdomain", d1, Name128::RESERVED, bincode::serialize(&newdomain(creator.public_key())).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(creator.public_key()));
    let ptrx = jmzk_chain_node::sign(body, &[&creator], &chain.chain_id).unwrap();
    let trace = chain.processor.push_transaction(&ptrx, deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    assert!(chain.processor.contract_context().cache.exists_token(TokenType::Domain, None, d1).unwrap());

    // Re-issuing the same domain name must fail duplicate_domain.
    let act = Action::new("newdomain", d1, Name128::RESERVED, bincode::serialize(&newdomain(creator.public_key())).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(creator.public_key()));
    let ptrx = jmzk_chain_node::sign(body, &[&creator], &chain.chain_id).unwrap();
    let trace = chain.processor.push_transaction(&ptrx, deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::HardFail);
    assert!(trace.except.unwrap().to_lowercase().contains("duplicate"));
}

#[test]
fn scenario2_issue_and_transfer_nft() {
    let founder = KeyPair::generate();
    let chain = jmzk_chain_node::bootstrap(&founder).unwrap();
    let creator = KeyPair::generate();
    let k1 = KeyPair::generate();
    let k2 = KeyPair::generate();

    let d1 = jmzk_chain_node::name("d1");
    let newdomain = NewDomain { name: d1, creator: creator.public_key(), issue: perm("issue", creator.public_key()), transfer: owner_perm(), manage: no_manage() };
    let act = Action::new("newdomain", d1, Name128::RESERVED, bincode::serialize(&newdomain).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(creator.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&creator], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    let a = jmzk_chain_node::name("a");
    let b = jmzk_chain_node::name("b");
    let issue = IssueToken { domain: d1, names: vec![a, b], owner: vec![Address::PublicKey(k1.public_key())] };
    let act = Action::new("issuetoken", d1, Name128::RESERVED, bincode::serialize(&issue).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(creator.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&creator], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    let transfer = Transfer { domain: d1, name: a, to: vec![Address::PublicKey(k2.public_key())], memo: String::new() };
    let act = Action::new("transfer", d1, a, bincode::serialize(&transfer).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(k1.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&k1], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    let token = chain.processor.contract_context().cache.read_token::<TokenDef>(TokenType::Token, Some(d1), a).unwrap();
    assert_eq!(token.owner, vec![Address::PublicKey(k2.public_key())]);
    drop(token);

    // K1 no longer owns "a"; a transfer signed only by K1 must fail authorization.
    let transfer_again = Transfer { domain: d1, name: a, to: vec![Address::PublicKey(k1.public_key())], memo: String::new() };
    let act = Action::new("transfer", d1, a, bincode::serialize(&transfer_again).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(k1.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&k1], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::HardFail);

    // K2, the current owner, can destroy it.
    let destroy = DestroyToken { domain: d1, name: a };
    let act = Action::new("destroytoken", d1, a, bincode::serialize(&destroy).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(k2.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&k2], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    // A further transfer on the destroyed token fails.
    let act = Action::new("transfer", d1, a, bincode::serialize(&transfer_again).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(k2.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&k2], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::HardFail);
}

#[test]
fn scenario4_suspend_then_execute() {
    let founder = KeyPair::generate();
    let chain = jmzk_chain_node::bootstrap(&founder).unwrap();
    let proposer = KeyPair::generate();
    let approver1 = KeyPair::generate();
    let approver2 = KeyPair::generate();
    let creator = KeyPair::generate();

    let d1 = jmzk_chain_node::name("d1");
    let newdomain = NewDomain { name: d1, creator: creator.public_key(), issue: perm("issue", creator.public_key()), transfer: owner_perm(), manage: no_manage() };
    let act = Action::new("newdomain", d1, Name128::RESERVED, bincode::serialize(&newdomain).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(creator.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&creator], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    let a = jmzk_chain_node::name("a");
    let issue = IssueToken { domain: d1, names: vec![a], owner: vec![Address::PublicKey(proposer.public_key())] };
    let act = Action::new("issuetoken", d1, Name128::RESERVED, bincode::serialize(&issue).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(creator.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&creator], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    // The proposer drafts a transfer of "a" to approver2 and wraps it in a suspend.
    let inner_transfer = Transfer { domain: d1, name: a, to: vec![Address::PublicKey(approver2.public_key())], memo: String::new() };
    let inner_action = Action::new("transfer", d1, a, bincode::serialize(&inner_transfer).unwrap());
    let inner_body = jmzk_chain_node::body_of(vec![inner_action], Address::PublicKey(proposer.public_key()));

    let s1 = jmzk_chain_node::name("s1");
    let newsuspend = NewSuspend { name: s1, proposer: proposer.public_key(), trx: inner_body.clone() };
    let act = Action::new("newsuspend", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&newsuspend).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(proposer.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&proposer], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    let inner_digest = inner_body.digest(&chain.chain_id).unwrap();

    // approver1 has no bearing on the inner transfer at all: not the
    // token's owner, not in d1's issue/transfer/manage permissions. Its
    // approval must be rejected rather than merged in.
    let sig = approver1.sign_prehash(&inner_digest).unwrap();
    let aprv = AprvSuspend { name: s1, signatures: vec![sig] };
    let act = Action::new("aprvsuspend", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&aprv).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(proposer.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&proposer], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::HardFail);

    // The proposer, who currently owns the token, approves and that's enough.
    let sig = proposer.sign_prehash(&inner_digest).unwrap();
    let aprv = AprvSuspend { name: s1, signatures: vec![sig] };
    let act = Action::new("aprvsuspend", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&aprv).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(proposer.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&proposer], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    // Any signer can now execute it; the proposer's own signature already
    // authorizes the inner `transfer` (its domain's transfer permission
    // only requires the creator's key by this test's setup).
    let trace = chain.processor.push_suspend_transaction(s1, proposer.public_key(), deadline()).unwrap();
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    let token = chain.processor.contract_context().cache.read_token::<TokenDef>(TokenType::Token, Some(d1), a).unwrap();
    assert_eq!(token.owner, vec![Address::PublicKey(approver2.public_key())]);
    drop(token);

    let def = chain.processor.contract_context().cache.read_token::<jmzk_chain_core::SuspendDef>(TokenType::Suspend, None, s1).unwrap();
    assert!(matches!(def.status, jmzk_chain_core::SuspendStatus::Executed));
}

#[test]
fn scenario4b_cancelled_suspend_cannot_execute() {
    let founder = KeyPair::generate();
    let chain = jmzk_chain_node::bootstrap(&founder).unwrap();
    let proposer = KeyPair::generate();

    let inner_action = Action::new("transfer", Name128::RESERVED, Name128::RESERVED, vec![]);
    let inner_body = jmzk_chain_node::body_of(vec![inner_action], Address::Reserved);
    let s1 = jmzk_chain_node::name("s1");
    let newsuspend = NewSuspend { name: s1, proposer: proposer.public_key(), trx: inner_body };
    let act = Action::new("newsuspend", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&newsuspend).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(proposer.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&proposer], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    let cancel = CancelSuspend { name: s1 };
    let act = Action::new("cancelsuspend", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&cancel).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(proposer.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&proposer], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    let trace = chain.processor.push_suspend_transaction(s1, proposer.public_key(), deadline()).unwrap();
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::HardFail);
}

#[test]
fn scenario5_savepoint_rollback_on_mid_transaction_failure() {
    let founder = KeyPair::generate();
    let chain = jmzk_chain_node::bootstrap(&founder).unwrap();
    let creator = KeyPair::generate();

    let d1 = jmzk_chain_node::name("d1");
    let newdomain = NewDomain { name: d1, creator: creator.public_key(), issue: perm("issue", creator.public_key()), transfer: perm("transfer", creator.public_key()), manage: no_manage() };
    let act = Action::new("newdomain", d1, Name128::RESERVED, bincode::serialize(&newdomain).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(creator.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&creator], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    let names = ["t1", "t2", "t3"].map(jmzk_chain_node::name);
    let issue_one = |n: Name128| {
        let p = IssueToken { domain: d1, names: vec![n], owner: vec![Address::PublicKey(creator.public_key())] };
        Action::new("issuetoken", d1, Name128::RESERVED, bincode::serialize(&p).unwrap())
    };
    // Action 4 re-issues "t1", which is a duplicate inside the very same
    // transaction once actions 1-3 have each queued their own Add into the
    // cache: the whole transaction must fail and none of t1/t2/t3 persist.
    let actions = vec![issue_one(names[0]), issue_one(names[1]), issue_one(names[2]), issue_one(names[0])];
    let body = jmzk_chain_node::body_of(actions, Address::PublicKey(creator.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&creator], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::HardFail);

    for n in names {
        assert!(!chain.processor.contract_context().cache.exists_token(TokenType::Token, Some(d1), n).unwrap());
    }
}

#[test]
fn scenario6_passive_bonus_distribution() {
    let founder = KeyPair::generate();
    let chain = jmzk_chain_node::bootstrap(&founder).unwrap();
    let creator = KeyPair::generate();
    let sender = KeyPair::generate();
    let receiver = KeyPair::generate();
    let addr_a = Address::PublicKey(KeyPair::generate().public_key());
    let addr_b = Address::PublicKey(KeyPair::generate().public_key());
    let final_receiver = Address::PublicKey(KeyPair::generate().public_key());

    let sym = Symbol::new(0, 3).unwrap();
    let f1 = jmzk_chain_node::name("f1");
    let newfungible = NewFungibleV2 {
        name: f1,
        sym_name: "FOO".into(),
        sym,
        creator: creator.public_key(),
        issue: perm("issue", creator.public_key()),
        transfer: perm("transfer", creator.public_key()),
        manage: perm("manage", creator.public_key()),
        total_supply: Asset::new(10_100, sym).unwrap(),
        metas: vec![],
    };
    let act = Action::new("newfungiblev2", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&newfungible).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(creator.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&creator], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    let issue = IssueFungible { address: Address::PublicKey(sender.public_key()), number: Asset::new(10_100, sym).unwrap(), memo: String::new() };
    let act = Action::new("issuefungible", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&issue).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(creator.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&creator], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    let set_bonus = SetPsvBonusV2 {
        sym_id: sym.id(),
        rate: 0.01,
        base_charge: 0,
        charge_threshold: None,
        minimum_charge: None,
        dist_threshold: 100,
        rules: vec![
            DistRule::Fixed { amount: 10, receiver: DistReceiver::Address(addr_a) },
            DistRule::Percent { percent: 0.3, receiver: DistReceiver::Address(addr_b) },
            // Nobody meets this threshold, so the whole remaining share
            // falls through to final_receiver below.
            DistRule::RemainingPercent { percent: 1.0, receiver: DistReceiver::FtHolders { sym_id: sym.id(), threshold: 1_000_000 } },
        ],
        methods: vec![BonusMethod::TransferFt],
        final_receiver: Some(final_receiver),
    };
    let act = Action::new("setpsvbonusv2", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&set_bonus).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(creator.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&creator], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    for _ in 0..10 {
        let transfer = TransferFt { from: Address::PublicKey(sender.public_key()), to: Address::PublicKey(receiver.public_key()), number: Asset::new(1000, sym).unwrap(), memo: String::new() };
        let act = Action::new("transferft", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&transfer).unwrap());
        let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(sender.public_key()));
        let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&sender], &chain.chain_id).unwrap(), deadline());
        assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);
    }

    let dist = DistPsvBonus { sym_id: sym.id() };
    let act = Action::new("distpsvbonus", Name128::RESERVED, Name128::RESERVED, bincode::serialize(&dist).unwrap());
    let body = jmzk_chain_node::single_action_body(act, Address::PublicKey(creator.public_key()));
    let trace = chain.processor.push_transaction(&jmzk_chain_node::sign(body, &[&creator], &chain.chain_id).unwrap(), deadline());
    assert_eq!(trace.status, jmzk_processor::TransactionStatus::Executed, "{:?}", trace.except);

    let balance_of = |addr: &Address| -> i64 {
        chain
            .processor
            .contract_context()
            .cache
            .tdb()
            .read_asset_opt(addr, sym.id())
            .unwrap()
            .map(|bytes| bincode::deserialize::<jmzk_chain_core::Property>(&bytes).unwrap().amount.amount)
            .unwrap_or(0)
    };

    assert_eq!(balance_of(&addr_a), 10);
    assert_eq!(balance_of(&addr_b), 30);
    assert_eq!(balance_of(&final_receiver), 60);
}
