//! Wires every action handler into an [`ExecutionContext`], every
//! payload type into an [`AbiSerializer`], and the handful of actions
//! whose cost diverges from the flat default into a [`ChargeManager`].
//!
//! `execsuspend` is conspicuously absent: re-dispatching a suspended
//! transaction's inner actions needs the very `ExecutionContext` being
//! built here, so the processor calls [`crate::suspend::prepare_exec_suspend`]
//! and [`crate::suspend::finalize_exec_suspend`] directly around its own
//! `invoke` loop instead of going through a registered handler.

use std::sync::Arc;

use jmzk_abi::AbiSerializer;
use jmzk_chain_core::{Action, ChainConfig, Result};
use jmzk_charge::{ActionCharge, ChargeManager};
use jmzk_exec_context::ExecutionContext;

use crate::context::ContractContext;
use crate::payloads::*;
use crate::{bonus, domain, fungible, link_actions, lock, meta, prodvote, script, staking, suspend};

macro_rules! register {
    ($exec:expr, $ctx:expr, $name:literal, $handler:expr, $type_name:literal) => {
        let ctx = $ctx.clone();
        $exec.register_action($name, 1, $type_name, Box::new(move |act: &Action| $handler(&ctx, act)))?;
    };
}

pub fn register_actions(ctx: Arc<ContractContext>) -> Result<ExecutionContext> {
    let mut exec = ExecutionContext::new();

    register!(exec, ctx, "newdomain", domain::new_domain, "newdomain");
    register!(exec, ctx, "updatedomain", domain::update_domain, "updatedomain");
    register!(exec, ctx, "issuetoken", domain::issue_token, "issuetoken");
    register!(exec, ctx, "transfer", domain::transfer, "transfer");
    register!(exec, ctx, "destroytoken", domain::destroy_token, "destroytoken");
    register!(exec, ctx, "newgroup", domain::new_group, "newgroup");
    register!(exec, ctx, "updategroup", domain::update_group, "updategroup");

    register!(exec, ctx, "newfungible", fungible::new_fungible, "newfungible");
    register!(exec, ctx, "newfungiblev2", fungible::new_fungible_v2, "newfungiblev2");
    register!(exec, ctx, "updfungible", fungible::upd_fungible, "updfungible");
    register!(exec, ctx, "issuefungible", fungible::issue_fungible, "issuefungible");
    register!(exec, ctx, "transferft", fungible::transfer_ft, "transferft");
    register!(exec, ctx, "recycleft", fungible::recycle_ft, "recycleft");
    register!(exec, ctx, "destroyft", fungible::destroy_ft, "destroyft");

    register!(exec, ctx, "addmeta", meta::add_meta, "addmeta");

    register!(exec, ctx, "newsuspend", suspend::new_suspend, "newsuspend");
    register!(exec, ctx, "aprvsuspend", suspend::aprv_suspend, "aprvsuspend");
    register!(exec, ctx, "cancelsuspend", suspend::cancel_suspend, "cancelsuspend");

    register!(exec, ctx, "newlock", lock::new_lock, "newlock");
    register!(exec, ctx, "aprvlock", lock::aprv_lock, "aprvlock");
    register!(exec, ctx, "tryunlock", lock::try_unlock, "tryunlock");

    register!(exec, ctx, "setpsvbonus", bonus::set_psv_bonus, "setpsvbonus");
    register!(exec, ctx, "setpsvbonusv2", bonus::set_psv_bonus_v2, "setpsvbonusv2");
    register!(exec, ctx, "distpsvbonus", bonus::dist_psv_bonus, "distpsvbonus");

    register!(exec, ctx, "prodvote", prodvote::prod_vote, "prodvote");

    register!(exec, ctx, "everipass", link_actions::everipass, "everipass");
    register!(exec, ctx, "everipassv2", link_actions::everipass_v2, "everipassv2");
    register!(exec, ctx, "everipay", link_actions::everipay, "everipay");
    register!(exec, ctx, "everipayv2", link_actions::everipay_v2, "everipayv2");

    register!(exec, ctx, "newscript", script::new_script, "newscript");
    register!(exec, ctx, "updscript", script::upd_script, "updscript");

    register!(exec, ctx, "newvalidator", staking::new_validator, "newvalidator");
    register!(exec, ctx, "staketkns", staking::stake_tkns, "staketkns");
    register!(exec, ctx, "unstaketkns", staking::unstake_tkns, "unstaketkns");
    register!(exec, ctx, "toactivetkns", staking::to_active_tkns, "toactivetkns");
    register!(exec, ctx, "valiwithdraw", staking::vali_withdraw, "valiwithdraw");
    register!(exec, ctx, "recvstkbonus", staking::recv_stk_bonus, "recvstkbonus");

    Ok(exec)
}

pub fn register_abi_types() -> AbiSerializer {
    let mut abi = AbiSerializer::new();
    abi.register::<NewDomain>("newdomain");
    abi.register::<UpdateDomain>("updatedomain");
    abi.register::<IssueToken>("issuetoken");
    abi.register::<Transfer>("transfer");
    abi.register::<DestroyToken>("destroytoken");
    abi.register::<NewGroup>("newgroup");
    abi.register::<UpdateGroup>("updategroup");

    abi.register::<NewFungible>("newfungible");
    abi.register::<NewFungibleV2>("newfungiblev2");
    abi.register::<UpdFungible>("updfungible");
    abi.register::<IssueFungible>("issuefungible");
    abi.register::<TransferFt>("transferft");
    abi.register::<RecycleFt>("recycleft");
    abi.register::<DestroyFt>("destroyft");

    abi.register::<AddMeta>("addmeta");

    abi.register::<NewSuspend>("newsuspend");
    abi.register::<AprvSuspend>("aprvsuspend");
    abi.register::<CancelSuspend>("cancelsuspend");
    abi.register::<ExecSuspend>("execsuspend");

    abi.register::<NewLock>("newlock");
    abi.register::<AprvLock>("aprvlock");
    abi.register::<TryUnlock>("tryunlock");

    abi.register::<SetPsvBonus>("setpsvbonus");
    abi.register::<SetPsvBonusV2>("setpsvbonusv2");
    abi.register::<DistPsvBonus>("distpsvbonus");

    abi.register::<ProdVote>("prodvote");

    abi.register::<EveriPass>("everipass");
    abi.register::<EveriPassV2>("everipassv2");
    abi.register::<EveriPay>("everipay");
    abi.register::<EveriPayV2>("everipayv2");

    abi.register::<NewScript>("newscript");
    abi.register::<UpdScript>("updscript");

    abi.register::<NewValidator>("newvalidator");
    abi.register::<StakeTkns>("staketkns");
    abi.register::<UnstakeTkns>("unstaketkns");
    abi.register::<ToActiveTkns>("toactivetkns");
    abi.register::<ValiWithdraw>("valiwithdraw");
    abi.register::<RecvStkBonus>("recvstkbonus");

    abi.register::<PayCharge>("paycharge");
    abi
}

/// `issuetoken` bills one storage unit per name issued rather than the
/// flat per-payload default; a batch issuance of many names is a
/// proportionally bigger write, not a constant-cost one.
struct IssueTokenCharge;
impl ActionCharge for IssueTokenCharge {
    fn storage(&self, act: &Action) -> u32 {
        match bincode::deserialize::<IssueToken>(&act.data) {
            Ok(p) => (act.data.len() * p.names.len().max(1)) as u32,
            Err(_) => act.data.len() as u32,
        }
    }
}

/// `addmeta` is cheap to store but still worth billing on its own value
/// length rather than the whole serialized payload (which also carries
/// the target enum discriminant and key).
struct AddMetaCharge;
impl ActionCharge for AddMetaCharge {
    fn storage(&self, act: &Action) -> u32 {
        match bincode::deserialize::<AddMeta>(&act.data) {
            Ok(p) => p.value.len() as u32,
            Err(_) => act.data.len() as u32,
        }
    }
}

/// `issuefungible` of the native token waives the extra factor other
/// fungible issuance pays, mirroring how newly-minted jmzk itself is
/// cheaper to move than a user-defined fungible.
struct IssueFungibleCharge;
impl ActionCharge for IssueFungibleCharge {
    fn extra_factor(&self, act: &Action) -> u32 {
        match bincode::deserialize::<IssueFungible>(&act.data) {
            Ok(p) if p.number.sym.id() as u64 == jmzk_chain_core::JMZK_SYM_ID => 1,
            _ => jmzk_chain_core::DEFAULT_ACTION_EXTRA_FACTOR,
        }
    }
}

pub fn register_charges(config: ChainConfig) -> ChargeManager {
    let mut cm = ChargeManager::new(config);
    cm.register_override("issuetoken", Box::new(IssueTokenCharge));
    cm.register_override("addmeta", Box::new(AddMetaCharge));
    cm.register_override("issuefungible", Box::new(IssueFungibleCharge));
    cm
}

#[cfg(test)]
mod tests {
    use super::*;
    use jmzk_chain_core::{Address, Name128, PublicKeyBytes};
    use jmzk_state::Tdb;

    fn pk(b: u8) -> PublicKeyBytes {
        let mut bytes = [0u8; 33];
        bytes[0] = 0x02;
        bytes[32] = b;
        PublicKeyBytes(bytes)
    }

    #[test]
    fn registers_every_action_and_dispatches_one() {
        let tdb = Arc::new(Tdb::open_in_memory().unwrap());
        let cache = jmzk_state::TdbCache::new(tdb, 64);
        let ctx = Arc::new(ContractContext::new(cache, [0u8; 32], ChainConfig::default()));
        let creator = pk(1);
        ctx.begin_transaction(0, vec![creator]);

        let exec = register_actions(ctx).unwrap();
        assert_eq!(exec.current_version("newdomain").unwrap(), 1);
        assert_eq!(exec.current_version("recvstkbonus").unwrap(), 1);

        let act = Action::new(
            "newdomain",
            Name128::from_str_checked("d1").unwrap(),
            Name128::RESERVED,
            bincode::serialize(&NewDomain {
                name: Name128::from_str_checked("d1").unwrap(),
                creator,
                issue: jmzk_chain_core::PermissionDef { name: Name128::from_str_checked("issue").unwrap(), threshold: 0, authorizers: vec![] },
                transfer: jmzk_chain_core::PermissionDef { name: Name128::from_str_checked("transfer").unwrap(), threshold: 0, authorizers: vec![] },
                manage: jmzk_chain_core::PermissionDef { name: Name128::from_str_checked("manage").unwrap(), threshold: 0, authorizers: vec![] },
            })
            .unwrap(),
        );
        exec.invoke(&act).unwrap();
    }

    #[test]
    fn abi_round_trips_newdomain() {
        let abi = register_abi_types();
        assert!(abi.has_type("newdomain"));
        assert!(abi.has_type("recvstkbonus"));
        let p = NewDomain {
            name: Name128::from_str_checked("d1").unwrap(),
            creator: pk(1),
            issue: jmzk_chain_core::PermissionDef { name: Name128::from_str_checked("issue").unwrap(), threshold: 0, authorizers: vec![] },
            transfer: jmzk_chain_core::PermissionDef { name: Name128::from_str_checked("transfer").unwrap(), threshold: 0, authorizers: vec![] },
            manage: jmzk_chain_core::PermissionDef { name: Name128::from_str_checked("manage").unwrap(), threshold: 0, authorizers: vec![] },
        };
        let bin = bincode::serialize(&p).unwrap();
        let variant = abi.binary_to_variant("newdomain", &bin).unwrap();
        let bin2 = abi.variant_to_binary("newdomain", &variant).unwrap();
        assert_eq!(bin, bin2);
    }

    #[test]
    fn issuetoken_charge_scales_with_name_count() {
        let cm = register_charges(ChainConfig::default());
        let one = IssueToken { domain: Name128::from_str_checked("d1").unwrap(), names: vec![Name128::from_str_checked("a").unwrap()], owner: vec![Address::PublicKey(pk(1))] };
        let many = IssueToken {
            domain: Name128::from_str_checked("d1").unwrap(),
            names: vec![Name128::from_str_checked("a").unwrap(), Name128::from_str_checked("b").unwrap(), Name128::from_str_checked("c").unwrap()],
            owner: vec![Address::PublicKey(pk(1))],
        };
        let body = |p: &IssueToken| jmzk_chain_core::PackedTransaction {
            body: jmzk_chain_core::TransactionBody {
                header: jmzk_chain_core::TransactionHeader { expiration: 1, ref_block_num: 1, ref_block_prefix: 1, max_charge: 1_000_000 },
                actions: vec![Action::new("issuetoken", Name128::from_str_checked("d1").unwrap(), Name128::RESERVED, bincode::serialize(p).unwrap())],
                payer: Address::Reserved,
                transaction_extensions: vec![],
            },
            signatures: vec![],
        };
        let cheap = cm.calculate(&body(&one), Some(1)).unwrap();
        let pricey = cm.calculate(&body(&many), Some(1)).unwrap();
        assert!(pricey > cheap);
    }
}
