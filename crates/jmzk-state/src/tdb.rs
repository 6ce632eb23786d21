//! Token database (C6): a typed key-value store over sled with a stack of
//! nested savepoints supporting multi-level rollback and squash (§4.1).
//!
//! Named trees, one per `token_type`, plus a dedicated `asset` tree keyed
//! by `(sym_id, address)` so range scans over one symbol are contiguous.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use jmzk_chain_core::{Address, JmzkError, Name128};
use serde::Serialize;

/// The closed enumeration of principal record kinds the TDB stores.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TokenType {
    Domain,
    Token,
    Group,
    Suspend,
    Lock,
    Fungible,
    Prodvote,
    JmzkLink,
    PsvBonus,
    PsvBonusDist,
    Validator,
    StakePool,
    Script,
}

impl TokenType {
    const ALL: [TokenType; 13] = [
        TokenType::Domain,
        TokenType::Token,
        TokenType::Group,
        TokenType::Suspend,
        TokenType::Lock,
        TokenType::Fungible,
        TokenType::Prodvote,
        TokenType::JmzkLink,
        TokenType::PsvBonus,
        TokenType::PsvBonusDist,
        TokenType::Validator,
        TokenType::StakePool,
        TokenType::Script,
    ];

    fn tree_name(&self) -> &'static str {
        match self {
            TokenType::Domain => "domain",
            TokenType::Token => "token",
            TokenType::Group => "group",
            TokenType::Suspend => "suspend",
            TokenType::Lock => "lock",
            TokenType::Fungible => "fungible",
            TokenType::Prodvote => "prodvote",
            TokenType::JmzkLink => "jmzklink",
            TokenType::PsvBonus => "psvbonus",
            TokenType::PsvBonusDist => "psvbonus_dist",
            TokenType::Validator => "validator",
            TokenType::StakePool => "stakepool",
            TokenType::Script => "script",
        }
    }
}

/// Put semantics: `Add` requires absence, `Update` requires presence,
/// `Put` is unconditional.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PutOp {
    Add,
    Update,
    Put,
}

/// Identifies one TDB entry independent of its byte encoding, used both as
/// the undo record's subject and as the cache's invalidation key.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TdbKey {
    Token { ty: TokenType, domain: Option<Name128>, key: Name128 },
    Asset { sym_id: u32, address_bytes: Vec<u8> },
}

struct UndoRecord {
    tree: &'static str,
    raw_key: Vec<u8>,
    /// `None` means the key was absent before this mutation — rollback
    /// deletes it; `Some(bytes)` restores the prior value.
    prior: Option<Vec<u8>>,
    signal_key: TdbKey,
}

struct SavepointFrame {
    seq: u64,
    undo_log: Vec<UndoRecord>,
}

/// Implemented by the TDB cache (C7); both signals evict, never repopulate.
pub trait TdbListener: Send + Sync {
    fn on_rollback(&self, key: &TdbKey);
    fn on_remove(&self, key: &TdbKey);
}

pub struct Tdb {
    db: sled::Db,
    trees: std::collections::HashMap<&'static str, sled::Tree>,
    assets: sled::Tree,
    frames: Mutex<Vec<SavepointFrame>>,
    listeners: Mutex<Vec<Arc<dyn TdbListener>>>,
}

impl Tdb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, JmzkError> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    pub fn open_in_memory() -> Result<Self, JmzkError> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: sled::Db) -> Result<Self, JmzkError> {
        let mut trees = std::collections::HashMap::new();
        for ty in TokenType::ALL {
            let tree = db.open_tree(ty.tree_name())?;
            trees.insert(ty.tree_name(), tree);
        }
        let assets = db.open_tree("asset")?;
        Ok(Tdb { db, trees, assets, frames: Mutex::new(Vec::new()), listeners: Mutex::new(Vec::new()) })
    }

    pub fn subscribe(&self, listener: Arc<dyn TdbListener>) {
        self.listeners.lock().unwrap().push(listener);
    }

    fn tree(&self, ty: TokenType) -> &sled::Tree {
        self.trees.get(ty.tree_name()).expect("every token_type has a tree")
    }

    fn compose_key(domain: Option<Name128>, key: Name128) -> Vec<u8> {
        let mut out = Vec::with_capacity(32);
        if let Some(d) = domain {
            out.extend_from_slice(&d.to_be_bytes());
        }
        out.extend_from_slice(&key.to_be_bytes());
        out
    }

    fn compose_asset_key(sym_id: u32, address: &Address) -> Result<Vec<u8>, JmzkError> {
        let mut out = Vec::with_capacity(4 + 40);
        out.extend_from_slice(&sym_id.to_be_bytes());
        out.extend(bincode::serialize(address)?);
        Ok(out)
    }

    fn record_undo(&self, rec: UndoRecord) {
        if let Some(frame) = self.frames.lock().unwrap().last_mut() {
            frame.undo_log.push(rec);
        }
        // writes outside any open savepoint are irreversible; only genesis
        // bootstrapping should ever take this path.
    }

    // ── Token space ──────────────────────────────────────────────────────

    pub fn exists_token(&self, ty: TokenType, domain: Option<Name128>, key: Name128) -> Result<bool, JmzkError> {
        let raw_key = Self::compose_key(domain, key);
        Ok(self.tree(ty).contains_key(raw_key)?)
    }

    pub fn read_token(&self, ty: TokenType, domain: Option<Name128>, key: Name128) -> Result<Vec<u8>, JmzkError> {
        let raw_key = Self::compose_key(domain, key);
        match self.tree(ty).get(raw_key)? {
            Some(v) => Ok(v.to_vec()),
            None => Err(JmzkError::TokenDatabaseNotFound),
        }
    }

    pub fn read_token_opt(
        &self,
        ty: TokenType,
        domain: Option<Name128>,
        key: Name128,
    ) -> Result<Option<Vec<u8>>, JmzkError> {
        let raw_key = Self::compose_key(domain, key);
        Ok(self.tree(ty).get(raw_key)?.map(|v| v.to_vec()))
    }

    pub fn put_token(
        &self,
        ty: TokenType,
        op: PutOp,
        domain: Option<Name128>,
        key: Name128,
        bytes: Vec<u8>,
    ) -> Result<(), JmzkError> {
        let raw_key = Self::compose_key(domain, key);
        let tree = self.tree(ty);
        let existing = tree.get(&raw_key)?;
        match op {
            PutOp::Add if existing.is_some() => return Err(JmzkError::TokenDatabaseDuplicate),
            PutOp::Update if existing.is_none() => return Err(JmzkError::TokenDatabaseNotFound),
            _ => {}
        }
        self.record_undo(UndoRecord {
            tree: ty.tree_name(),
            raw_key: raw_key.clone(),
            prior: existing.map(|v| v.to_vec()),
            signal_key: TdbKey::Token { ty, domain, key },
        });
        tree.insert(raw_key, bytes)?;
        Ok(())
    }

    pub fn put_tokens(
        &self,
        ty: TokenType,
        op: PutOp,
        domain: Option<Name128>,
        keys: Vec<Name128>,
        bytes: Vec<Vec<u8>>,
    ) -> Result<(), JmzkError> {
        if keys.len() != bytes.len() {
            return Err(JmzkError::InvalidArgument("put_tokens keys/bytes length mismatch".into()));
        }
        // validated up front so the batch fails atomically on the first error
        // without partially applying any of it.
        for key in &keys {
            let raw_key = Self::compose_key(domain, *key);
            let existing = self.tree(ty).get(&raw_key)?;
            match op {
                PutOp::Add if existing.is_some() => return Err(JmzkError::TokenDatabaseDuplicate),
                PutOp::Update if existing.is_none() => return Err(JmzkError::TokenDatabaseNotFound),
                _ => {}
            }
        }
        for (key, value) in keys.into_iter().zip(bytes.into_iter()) {
            self.put_token(ty, op, domain, key, value)?;
        }
        Ok(())
    }

    /// Visits `(key, bytes)` in the tree's natural order, skipping the
    /// first `skip` entries for the given `(type, domain)`. `visit`
    /// returns `false` to stop early.
    pub fn read_tokens_range(
        &self,
        ty: TokenType,
        domain: Option<Name128>,
        skip: usize,
        mut visit: impl FnMut(Name128, &[u8]) -> bool,
    ) -> Result<(), JmzkError> {
        let prefix = domain.map(|d| d.to_be_bytes().to_vec()).unwrap_or_default();
        let iter = self.tree(ty).scan_prefix(&prefix);
        for (i, item) in iter.enumerate() {
            if i < skip {
                continue;
            }
            let (raw_key, value) = item?;
            let key_bytes = &raw_key[raw_key.len() - 16..];
            let mut arr = [0u8; 16];
            arr.copy_from_slice(key_bytes);
            let key = Name128::from_be_bytes(arr);
            if !visit(key, &value) {
                break;
            }
        }
        Ok(())
    }

    /// Deletes a token, recording the prior value for rollback and
    /// emitting a `remove` signal to subscribers immediately (unlike
    /// rollback eviction, removal is not deferred to savepoint release).
    pub fn remove_token(&self, ty: TokenType, domain: Option<Name128>, key: Name128) -> Result<(), JmzkError> {
        let raw_key = Self::compose_key(domain, key);
        let tree = self.tree(ty);
        let existing = tree.get(&raw_key)?;
        if existing.is_none() {
            return Err(JmzkError::TokenDatabaseNotFound);
        }
        self.record_undo(UndoRecord {
            tree: ty.tree_name(),
            raw_key: raw_key.clone(),
            prior: existing.map(|v| v.to_vec()),
            signal_key: TdbKey::Token { ty, domain, key },
        });
        tree.remove(raw_key)?;
        let signal_key = TdbKey::Token { ty, domain, key };
        for l in self.listeners.lock().unwrap().iter() {
            l.on_remove(&signal_key);
        }
        Ok(())
    }

    // ── Asset space ──────────────────────────────────────────────────────

    pub fn exists_asset(&self, address: &Address, sym_id: u32) -> Result<bool, JmzkError> {
        let raw_key = Self::compose_asset_key(sym_id, address)?;
        Ok(self.assets.contains_key(raw_key)?)
    }

    pub fn read_asset(&self, address: &Address, sym_id: u32) -> Result<Vec<u8>, JmzkError> {
        let raw_key = Self::compose_asset_key(sym_id, address)?;
        match self.assets.get(raw_key)? {
            Some(v) => Ok(v.to_vec()),
            None => Err(JmzkError::TokenDatabaseNotFound),
        }
    }

    pub fn read_asset_opt(&self, address: &Address, sym_id: u32) -> Result<Option<Vec<u8>>, JmzkError> {
        let raw_key = Self::compose_asset_key(sym_id, address)?;
        Ok(self.assets.get(raw_key)?.map(|v| v.to_vec()))
    }

    /// Unconditional write to the asset space.
    pub fn put_asset(&self, address: &Address, sym_id: u32, bytes: Vec<u8>) -> Result<(), JmzkError> {
        let raw_key = Self::compose_asset_key(sym_id, address)?;
        let existing = self.assets.get(&raw_key)?;
        self.record_undo(UndoRecord {
            tree: "asset",
            raw_key: raw_key.clone(),
            prior: existing.map(|v| v.to_vec()),
            signal_key: TdbKey::Asset { sym_id, address_bytes: raw_key[4..].to_vec() },
        });
        self.assets.insert(raw_key, bytes)?;
        Ok(())
    }

    pub fn read_assets_range(
        &self,
        sym_id: u32,
        skip: usize,
        mut visit: impl FnMut(&[u8], &[u8]) -> bool,
    ) -> Result<(), JmzkError> {
        let prefix = sym_id.to_be_bytes();
        for (i, item) in self.assets.scan_prefix(prefix).enumerate() {
            if i < skip {
                continue;
            }
            let (raw_key, value) = item?;
            if !visit(&raw_key[4..], &value) {
                break;
            }
        }
        Ok(())
    }

    // ── Savepoint discipline ─────────────────────────────────────────────

    pub fn add_savepoint(&self, seq: u64) -> Result<(), JmzkError> {
        let mut frames = self.frames.lock().unwrap();
        if let Some(top) = frames.last() {
            if seq <= top.seq {
                return Err(JmzkError::TokenDatabaseSeqNotValid);
            }
        }
        frames.push(SavepointFrame { seq, undo_log: Vec::new() });
        Ok(())
    }

    pub fn latest_savepoint_seq(&self) -> Option<u64> {
        self.frames.lock().unwrap().last().map(|f| f.seq)
    }

    pub fn savepoints_size(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    /// Replays the top frame's undo records in reverse, restoring prior
    /// bytes (or deleting the key if it was absent), then pops the frame.
    pub fn rollback_to_latest_savepoint(&self) -> Result<(), JmzkError> {
        let frame = {
            let mut frames = self.frames.lock().unwrap();
            frames.pop().ok_or(JmzkError::TokenDatabaseNoSavepoint)?
        };
        for rec in frame.undo_log.into_iter().rev() {
            let tree = self.trees.get(rec.tree).cloned().unwrap_or_else(|| self.assets.clone());
            match &rec.prior {
                Some(bytes) => {
                    tree.insert(&rec.raw_key, bytes.clone())?;
                }
                None => {
                    tree.remove(&rec.raw_key)?;
                }
            }
            for l in self.listeners.lock().unwrap().iter() {
                l.on_rollback(&rec.signal_key);
            }
        }
        Ok(())
    }

    /// Discards the top frame's undo log, keeping current state.
    pub fn pop_back_savepoint(&self) -> Result<(), JmzkError> {
        self.frames.lock().unwrap().pop().ok_or(JmzkError::TokenDatabaseNoSavepoint)?;
        Ok(())
    }

    /// Merges the top frame into its parent. For each undo record in the
    /// top frame, if the parent has no record for that key yet, move it
    /// (the parent must be able to undo back past this frame too);
    /// otherwise drop it, since the parent's existing record already
    /// captures the value from further back.
    pub fn squash(&self) -> Result<(), JmzkError> {
        let mut frames = self.frames.lock().unwrap();
        let top = frames.pop().ok_or(JmzkError::TokenDatabaseNoSavepoint)?;
        if let Some(parent) = frames.last_mut() {
            let mut seen: HashSet<(&'static str, Vec<u8>)> =
                parent.undo_log.iter().map(|r| (r.tree, r.raw_key.clone())).collect();
            for rec in top.undo_log {
                let dedup = (rec.tree, rec.raw_key.clone());
                if !seen.contains(&dedup) {
                    seen.insert(dedup);
                    parent.undo_log.push(rec);
                }
            }
        }
        Ok(())
    }

    /// Releases all frames with `seq < until` in FIFO order, accepting
    /// them (their undo logs are simply discarded; the already-applied
    /// writes stay).
    pub fn pop_savepoints(&self, until: u64) -> Result<(), JmzkError> {
        self.frames.lock().unwrap().retain(|f| f.seq >= until);
        Ok(())
    }

    pub fn new_savepoint_session(&self, seq: u64) -> Result<Session<'_>, JmzkError> {
        self.add_savepoint(seq)?;
        Ok(Session { tdb: self, seq, resolved: false })
    }

    pub fn flush(&self) -> Result<(), JmzkError> {
        self.db.flush()?;
        Ok(())
    }
}

/// RAII savepoint handle: rolls back on drop unless `accept()` or
/// `squash()` was called.
pub struct Session<'a> {
    tdb: &'a Tdb,
    seq: u64,
    resolved: bool,
}

impl<'a> Session<'a> {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn accept(mut self) -> Result<(), JmzkError> {
        self.resolved = true;
        self.tdb.pop_back_savepoint()
    }

    pub fn squash(mut self) -> Result<(), JmzkError> {
        self.resolved = true;
        self.tdb.squash()
    }
}

impl<'a> Drop for Session<'a> {
    fn drop(&mut self) {
        if !self.resolved {
            let _ = self.tdb.rollback_to_latest_savepoint();
        }
    }
}

/// Serialize helper contracts in this crate use so callers never hand
/// `put_token` a type mismatched with its `token_type`.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, JmzkError> {
    Ok(bincode::serialize(value)?)
}
