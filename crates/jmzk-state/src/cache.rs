//! TDB cache (C7): a bounded, typed LRU sitting in front of the TDB.
//!
//! Every read and write goes through here rather than the TDB directly.
//! The cache subscribes to the TDB's `rollback`/`remove` signals and
//! evicts on both — it never repopulates itself from a signal, only the
//! next `read_token` miss does that. A type mismatch between what's
//! cached under a key and what the caller asks for is a programming
//! error (`token_database_cache_exception`), not a recoverable one.

use std::any::{Any, TypeId};
use std::sync::{Arc, Mutex};

use jmzk_chain_core::{JmzkError, Name128};
use lru::LruCache;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::tdb::{encode, PutOp, Tdb, TdbKey, TdbListener, TokenType};

struct CacheEntry {
    type_id: TypeId,
    data: Arc<dyn Any + Send + Sync>,
}

pub struct TdbCache {
    tdb: Arc<Tdb>,
    entries: Mutex<LruCache<TdbKey, CacheEntry>>,
}

impl TdbCache {
    pub fn new(tdb: Arc<Tdb>, capacity: usize) -> Arc<Self> {
        let cache = Arc::new(TdbCache {
            tdb: Arc::clone(&tdb),
            entries: Mutex::new(LruCache::new(
                std::num::NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
        });
        tdb.subscribe(cache.clone() as Arc<dyn TdbListener>);
        cache
    }

    fn typed_get<T: 'static>(&self, key: &TdbKey) -> Result<Option<Arc<T>>, JmzkError> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) => {
                if entry.type_id != TypeId::of::<T>() {
                    return Err(JmzkError::TokenDatabaseCacheException);
                }
                Ok(Some(entry.data.clone().downcast::<T>().map_err(|_| JmzkError::TokenDatabaseCacheException)?))
            }
            None => Ok(None),
        }
    }

    fn typed_insert<T: Send + Sync + 'static>(&self, key: TdbKey, value: T) -> Arc<T> {
        let arc = Arc::new(value);
        let entry = CacheEntry { type_id: TypeId::of::<T>(), data: arc.clone() };
        self.entries.lock().unwrap().put(key, entry);
        arc
    }

    /// Cache-only lookup; does not fall through to the TDB on a miss.
    pub fn lookup_token<T: Send + Sync + 'static>(
        &self,
        ty: TokenType,
        domain: Option<Name128>,
        key: Name128,
    ) -> Result<Option<Arc<T>>, JmzkError> {
        self.typed_get(&TdbKey::Token { ty, domain, key })
    }

    pub fn read_token<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
        ty: TokenType,
        domain: Option<Name128>,
        key: Name128,
    ) -> Result<Arc<T>, JmzkError> {
        let cache_key = TdbKey::Token { ty, domain, key };
        if let Some(hit) = self.typed_get::<T>(&cache_key)? {
            return Ok(hit);
        }
        let bytes = self.tdb.read_token(ty, domain, key)?;
        let value: T = bincode::deserialize(&bytes)?;
        Ok(self.typed_insert(cache_key, value))
    }

    pub fn read_token_opt<T: DeserializeOwned + Send + Sync + 'static>(
        &self,
        ty: TokenType,
        domain: Option<Name128>,
        key: Name128,
    ) -> Result<Option<Arc<T>>, JmzkError> {
        let cache_key = TdbKey::Token { ty, domain, key };
        if let Some(hit) = self.typed_get::<T>(&cache_key)? {
            return Ok(Some(hit));
        }
        match self.tdb.read_token_opt(ty, domain, key)? {
            Some(bytes) => {
                let value: T = bincode::deserialize(&bytes)?;
                Ok(Some(self.typed_insert(cache_key, value)))
            }
            None => Ok(None),
        }
    }

    /// Writes through to the TDB, then inserts (replacing any existing
    /// entry) into the cache.
    pub fn put_token<T: Serialize + Send + Sync + 'static>(
        &self,
        ty: TokenType,
        op: PutOp,
        domain: Option<Name128>,
        key: Name128,
        value: T,
    ) -> Result<Arc<T>, JmzkError> {
        let bytes = encode(&value)?;
        self.tdb.put_token(ty, op, domain, key, bytes)?;
        Ok(self.typed_insert(TdbKey::Token { ty, domain, key }, value))
    }

    pub fn exists_token(&self, ty: TokenType, domain: Option<Name128>, key: Name128) -> Result<bool, JmzkError> {
        self.tdb.exists_token(ty, domain, key)
    }

    pub fn remove_token(&self, ty: TokenType, domain: Option<Name128>, key: Name128) -> Result<(), JmzkError> {
        self.tdb.remove_token(ty, domain, key)
        // the `remove` signal handles eviction via `on_remove` below.
    }

    pub fn tdb(&self) -> &Tdb {
        &self.tdb
    }
}

impl TdbListener for TdbCache {
    fn on_rollback(&self, key: &TdbKey) {
        self.entries.lock().unwrap().pop(key);
    }

    fn on_remove(&self, key: &TdbKey) {
        self.entries.lock().unwrap().pop(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
    struct Dummy {
        n: u32,
    }

    fn name(s: &str) -> Name128 {
        Name128::from_str_checked(s).unwrap()
    }

    #[test]
    fn read_after_write_hits_cache_without_reparsing() {
        let tdb = Arc::new(Tdb::open_in_memory().unwrap());
        let cache = TdbCache::new(tdb, 16);
        cache
            .put_token(TokenType::Domain, PutOp::Add, None, name("d1"), Dummy { n: 7 })
            .unwrap();
        let v = cache.read_token::<Dummy>(TokenType::Domain, None, name("d1")).unwrap();
        assert_eq!(*v, Dummy { n: 7 });
    }

    #[test]
    fn rollback_evicts_mutated_keys() {
        let tdb = Arc::new(Tdb::open_in_memory().unwrap());
        let cache = TdbCache::new(tdb.clone(), 16);
        cache
            .put_token(TokenType::Domain, PutOp::Add, None, name("d1"), Dummy { n: 1 })
            .unwrap();

        tdb.add_savepoint(1).unwrap();
        cache
            .put_token(TokenType::Domain, PutOp::Put, None, name("d1"), Dummy { n: 2 })
            .unwrap();
        assert_eq!(*cache.read_token::<Dummy>(TokenType::Domain, None, name("d1")).unwrap(), Dummy { n: 2 });

        tdb.rollback_to_latest_savepoint().unwrap();
        // cache entry evicted by the rollback signal; re-read reloads restored bytes
        let v = cache.read_token::<Dummy>(TokenType::Domain, None, name("d1")).unwrap();
        assert_eq!(*v, Dummy { n: 1 });
    }

    #[test]
    fn type_mismatch_is_fatal() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Other {
            s: String,
        }
        let tdb = Arc::new(Tdb::open_in_memory().unwrap());
        let cache = TdbCache::new(tdb, 16);
        cache
            .put_token(TokenType::Domain, PutOp::Add, None, name("d1"), Dummy { n: 1 })
            .unwrap();
        let err = cache.read_token::<Other>(TokenType::Domain, None, name("d1"));
        assert!(matches!(err, Err(JmzkError::TokenDatabaseCacheException)));
    }
}
