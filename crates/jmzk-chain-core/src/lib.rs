pub mod action;
pub mod address;
pub mod bonus;
pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod fungible;
pub mod group;
pub mod link_object;
pub mod lock;
pub mod name128;
pub mod staking;
pub mod suspend;
pub mod symbol;
pub mod transaction;
pub mod types;

pub use action::{action_name_id, Action};
pub use address::Address;
pub use bonus::{evaluate_dist_rules, BonusMethod, DistReceiver, DistRule, HolderSnapshot, PassiveBonus};
pub use config::{ActionVersions, ChainConfig, GlobalProperties};
pub use constants::*;
pub use domain::{DomainDef, Meta, TokenDef};
pub use error::{JmzkError, Result};
pub use fungible::{FungibleDef, Property};
pub use group::{AuthorizerRef, AuthorizerWeight, Group, GroupNode, PermissionDef};
pub use link_object::JmzkLinkObject;
pub use lock::{LockAsset, LockCondition, LockDef, LockStatus};
pub use name128::Name128;
pub use staking::{ScriptDef, StakePool, StakeShare, Validator};
pub use suspend::{SuspendDef, SuspendStatus};
pub use symbol::{Asset, Symbol, EMPTY_SYM_ID, JMZK_SYM_ID, MAX_PRECISION, PJMZK_SYM_ID};
pub use transaction::{PackedTransaction, TransactionBody, TransactionHeader};
pub use types::{now, BlockId, PublicKeyBytes, RecoverableSignature, Timestamp};
