//! Error taxonomy shared by every crate in the workspace. Handlers return
//! `JmzkError` (or a crate-local error that converts into it via `#[from]`)
//! and the processor turns a propagated error into a failed transaction
//! trace rather than unwinding.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JmzkError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("invalid binary: {0}")]
    InvalidBinary(String),

    #[error("unknown domain: {0}")]
    UnknownDomain(String),
    #[error("unknown token: {0}/{1}")]
    UnknownToken(String, String),
    #[error("unknown group: {0}")]
    UnknownGroup(String),
    #[error("unknown suspend: {0}")]
    UnknownSuspend(String),
    #[error("unknown lock: {0}")]
    UnknownLock(String),
    #[error("unknown fungible: {0}")]
    UnknownFungible(String),
    #[error("unknown script: {0}")]
    UnknownScript(String),
    #[error("unknown validator: {0}")]
    UnknownValidator(String),

    #[error("duplicate domain: {0}")]
    DuplicateDomain(String),
    #[error("duplicate token: {0}/{1}")]
    DuplicateToken(String, String),
    #[error("duplicate group: {0}")]
    DuplicateGroup(String),
    #[error("duplicate fungible: {0}")]
    DuplicateFungible(String),
    #[error("duplicate lock: {0}")]
    DuplicateLock(String),
    #[error("duplicate suspend: {0}")]
    DuplicateSuspend(String),
    #[error("duplicate jmzk-link: {0}")]
    DuplicateJmzkLink(u128),

    #[error("invalid permission type: {0}")]
    PermissionType(String),
    #[error("meta involve check failed: {0}")]
    MetaInvolve(String),
    #[error("authorization unsatisfied: {0}")]
    Authorization(String),

    #[error("invalid asset symbol: {0}")]
    AssetSymbol(String),
    #[error("invalid asset type: {0}")]
    AssetType(String),
    #[error("insufficient balance: {0}")]
    Balance(String),
    #[error("charge exceeded: need {need}, have {have}")]
    ChargeExceeded { need: i64, have: i64 },
    #[error("max charge exceeded: {0} > {1}")]
    MaxChargeExceeded(u32, u32),

    #[error("jmzk-link version error: {0}")]
    JmzkLinkVersion(String),
    #[error("jmzk-link type error: {0}")]
    JmzkLinkType(String),
    #[error("jmzk-link id error: {0}")]
    JmzkLinkId(String),
    #[error("jmzk-link expired")]
    JmzkLinkExpiration,
    #[error("jmzk-link link_id already used: {0}")]
    JmzkLinkDupe(u128),
    #[error("jmzk-link malformed: {0}")]
    JmzkLinkException(String),

    #[error("transaction has no actions")]
    TxNoAction,
    #[error("transaction net usage exceeded: {0} > {1}")]
    TxNetUsageExceeded(u32, u32),
    #[error("duplicate transaction: {0}")]
    TxDuplicate(String),
    #[error("deadline exceeded")]
    DeadlineException,
    #[error("payer error: {0}")]
    PayerException(String),

    #[error("token database error: {0}")]
    TokenDatabase(String),
    #[error("token not found")]
    TokenDatabaseNotFound,
    #[error("token database duplicate key")]
    TokenDatabaseDuplicate,
    #[error("savepoint seq not valid")]
    TokenDatabaseSeqNotValid,
    #[error("no savepoint on stack")]
    TokenDatabaseNoSavepoint,
    #[error("token database cache type mismatch")]
    TokenDatabaseCacheException,

    #[error("script load error: {0}")]
    ScriptLoad(String),
    #[error("script execution error: {0}")]
    ScriptExecution(String),
    #[error("script invalid result: {0}")]
    ScriptInvalidResult(String),

    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, JmzkError>;
