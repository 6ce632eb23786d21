//! Wire payload for every action registered in [`crate::registry::register_all`].
//! Each type is also registered with an [`jmzk_abi::AbiSerializer`] under its
//! action name so it round-trips through JSON for external callers.

use serde::{Deserialize, Serialize};

use jmzk_chain_core::{
    Address, Asset, AuthorizerRef, Group, LockAsset, LockCondition, Meta, Name128, PermissionDef,
    PublicKeyBytes, RecoverableSignature, Symbol, TransactionBody,
};

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct NewDomain {
    pub name: Name128,
    pub creator: PublicKeyBytes,
    pub issue: PermissionDef,
    pub transfer: PermissionDef,
    pub manage: PermissionDef,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UpdateDomain {
    pub name: Name128,
    pub issue: Option<PermissionDef>,
    pub transfer: Option<PermissionDef>,
    pub manage: Option<PermissionDef>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct IssueToken {
    pub domain: Name128,
    pub names: Vec<Name128>,
    pub owner: Vec<Address>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Transfer {
    pub domain: Name128,
    pub name: Name128,
    pub to: Vec<Address>,
    pub memo: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct DestroyToken {
    pub domain: Name128,
    pub name: Name128,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct NewGroup {
    pub name: Name128,
    pub group: Group,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UpdateGroup {
    pub name: Name128,
    pub group: Group,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct NewFungible {
    pub name: Name128,
    pub sym_name: String,
    pub sym: Symbol,
    pub creator: PublicKeyBytes,
    pub issue: PermissionDef,
    pub transfer: PermissionDef,
    pub manage: PermissionDef,
    pub total_supply: Asset,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct NewFungibleV2 {
    pub name: Name128,
    pub sym_name: String,
    pub sym: Symbol,
    pub creator: PublicKeyBytes,
    pub issue: PermissionDef,
    pub transfer: PermissionDef,
    pub manage: PermissionDef,
    pub total_supply: Asset,
    pub metas: Vec<Meta>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UpdFungible {
    pub sym_id: u32,
    pub issue: Option<PermissionDef>,
    pub transfer: Option<PermissionDef>,
    pub manage: Option<PermissionDef>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct IssueFungible {
    pub address: Address,
    pub number: Asset,
    pub memo: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct TransferFt {
    pub from: Address,
    pub to: Address,
    pub number: Asset,
    pub memo: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct RecycleFt {
    pub address: Address,
    pub number: Asset,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct DestroyFt {
    pub address: Address,
    pub number: Asset,
}

/// Identifies which principal record an `addmeta` call attaches to. The
/// original action's `(domain, key)` header pair doubles as this
/// discriminant implicitly; spelled out explicitly here since this crate
/// dispatches on a plain enum rather than replaying string conventions.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum MetaTarget {
    Domain(Name128),
    Token { domain: Name128, name: Name128 },
    Fungible(u32),
    Group(Name128),
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AddMeta {
    pub target: MetaTarget,
    pub key: Name128,
    pub value: String,
    pub creator: AuthorizerRef,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct NewSuspend {
    pub name: Name128,
    pub proposer: PublicKeyBytes,
    pub trx: TransactionBody,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AprvSuspend {
    pub name: Name128,
    pub signatures: Vec<RecoverableSignature>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct CancelSuspend {
    pub name: Name128,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ExecSuspend {
    pub name: Name128,
    pub executer: PublicKeyBytes,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct NewLock {
    pub name: Name128,
    pub proposer: PublicKeyBytes,
    pub unlock_time: i64,
    pub deadline: i64,
    pub assets: Vec<LockAsset>,
    pub condition: LockCondition,
    pub succeed: Vec<Address>,
    pub failed: Vec<Address>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct AprvLock {
    pub name: Name128,
    pub approver: PublicKeyBytes,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct TryUnlock {
    pub name: Name128,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct SetPsvBonus {
    pub sym_id: u32,
    pub rate: f64,
    pub base_charge: i64,
    pub charge_threshold: Option<i64>,
    pub minimum_charge: Option<i64>,
    pub dist_threshold: i64,
    pub rules: Vec<jmzk_chain_core::DistRule>,
    pub methods: Vec<jmzk_chain_core::BonusMethod>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct SetPsvBonusV2 {
    pub sym_id: u32,
    pub rate: f64,
    pub base_charge: i64,
    pub charge_threshold: Option<i64>,
    pub minimum_charge: Option<i64>,
    pub dist_threshold: i64,
    pub rules: Vec<jmzk_chain_core::DistRule>,
    pub methods: Vec<jmzk_chain_core::BonusMethod>,
    pub final_receiver: Option<Address>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct DistPsvBonus {
    pub sym_id: u32,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ProdVote {
    pub producer: PublicKeyBytes,
    pub key: String,
    pub value: i64,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct EveriPass {
    pub link: String,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct EveriPassV2 {
    pub link: String,
    pub memo: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct EveriPay {
    pub link: String,
    pub payee: Address,
    pub number: Asset,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct EveriPayV2 {
    pub link: String,
    pub payee: Address,
    pub number: Asset,
    pub memo: Option<String>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct NewScript {
    pub name: Name128,
    pub creator: PublicKeyBytes,
    pub body: Vec<u8>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UpdScript {
    pub name: Name128,
    pub body: Vec<u8>,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct NewValidator {
    pub name: Name128,
    pub creator: PublicKeyBytes,
    pub signing_key: PublicKeyBytes,
    pub commission_rate: f64,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct StakeTkns {
    pub staker: PublicKeyBytes,
    pub validator: Name128,
    pub amount: Asset,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct UnstakeTkns {
    pub staker: PublicKeyBytes,
    pub validator: Name128,
    pub share_amount: i64,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ToActiveTkns {
    pub staker: PublicKeyBytes,
    pub validator: Name128,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct ValiWithdraw {
    pub validator: Name128,
}

/// Synthetic action the processor appends after a transaction's own
/// actions to record the charge deduction (§4.7); never dispatched
/// through the execution context, only carried in the trace and the ABI
/// table so explorers can decode it.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct PayCharge {
    pub payer: Address,
    pub charge: u32,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct RecvStkBonus {
    pub validator: Name128,
    pub amount: Asset,
}
