//! Ordered key-value storage
//!
//! The engine persists everything through `KvStore`. `MemStore` is the
//! ordered in-memory backend; `CacheKv` buffers writes on top of another
//! store and applies them only on `commit`, which gives each batch item its
//! own all-or-nothing scope.

pub mod keys;

use crate::errors::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

/// Ordered byte-keyed storage
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;

    fn set(&mut self, key: &[u8], value: Vec<u8>);

    fn delete(&mut self, key: &[u8]);

    /// All entries whose key starts with `prefix`, in ascending key order
    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;

    fn has(&self, key: &[u8]) -> bool {
        self.get(key).is_some()
    }
}

/// Encode `value` with bincode and store it under `key`
pub fn put<T: Serialize>(store: &mut dyn KvStore, key: &[u8], value: &T) -> Result<(), StoreError> {
    let bytes = bincode::serialize(value).map_err(|e| StoreError::Codec {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: e.to_string(),
    })?;
    store.set(key, bytes);
    Ok(())
}

/// Load and decode the value stored under `key`
pub fn load<T: DeserializeOwned>(store: &dyn KvStore, key: &[u8]) -> Result<Option<T>, StoreError> {
    store.get(key).map(|bytes| decode(key, &bytes)).transpose()
}

pub fn decode<T: DeserializeOwned>(key: &[u8], bytes: &[u8]) -> Result<T, StoreError> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Codec {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: e.to_string(),
    })
}

/// In-memory store backed by an ordered map
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.data.get(key).cloned()
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.data.insert(key.to_vec(), value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.data.remove(key);
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.data
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

/// Buffered writes waiting to be applied to a parent store
#[derive(Debug, Default)]
pub struct PendingWrites {
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl PendingWrites {
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Apply every buffered write to `store`
    pub fn commit(self, store: &mut dyn KvStore) {
        for (key, value) in self.writes {
            match value {
                Some(value) => store.set(&key, value),
                None => store.delete(&key),
            }
        }
    }
}

/// Write-buffering overlay over a read-only parent
pub struct CacheKv<'a> {
    parent: &'a dyn KvStore,
    pending: PendingWrites,
}

impl<'a> CacheKv<'a> {
    pub fn new(parent: &'a dyn KvStore) -> Self {
        Self {
            parent,
            pending: PendingWrites::default(),
        }
    }

    /// Release the parent borrow, keeping the buffered writes
    pub fn into_pending(self) -> PendingWrites {
        self.pending
    }
}

impl KvStore for CacheKv<'_> {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        match self.pending.writes.get(key) {
            Some(value) => value.clone(),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: Vec<u8>) {
        self.pending.writes.insert(key.to_vec(), Some(value));
    }

    fn delete(&mut self, key: &[u8]) {
        self.pending.writes.insert(key.to_vec(), None);
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self.parent.prefix_scan(prefix).into_iter().collect();
        for (key, value) in self
            .pending
            .writes
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
        {
            match value {
                Some(value) => merged.insert(key.clone(), value.clone()),
                None => merged.remove(key),
            };
        }
        merged.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_store_prefix_scan_is_ordered() {
        let mut store = MemStore::new();
        store.set(b"order/b", b"2".to_vec());
        store.set(b"order/a", b"1".to_vec());
        store.set(b"other", b"x".to_vec());

        let keys: Vec<_> = store.prefix_scan(b"order/").into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![b"order/a".to_vec(), b"order/b".to_vec()]);
    }

    #[test]
    fn test_cache_kv_discarded_without_commit() {
        let mut store = MemStore::new();
        store.set(b"k", b"v".to_vec());
        {
            let mut overlay = CacheKv::new(&store);
            overlay.set(b"k", b"changed".to_vec());
            overlay.set(b"n", b"new".to_vec());
            assert_eq!(overlay.get(b"k"), Some(b"changed".to_vec()));
        }
        assert_eq!(store.get(b"k"), Some(b"v".to_vec()));
        assert!(!store.has(b"n"));
    }

    #[test]
    fn test_cache_kv_commit_applies_writes_and_deletes() {
        let mut store = MemStore::new();
        store.set(b"a/1", b"1".to_vec());
        store.set(b"a/2", b"2".to_vec());

        let mut overlay = CacheKv::new(&store);
        overlay.delete(b"a/1");
        overlay.set(b"a/3", b"3".to_vec());
        let scanned: Vec<_> = overlay.prefix_scan(b"a/").into_iter().map(|(k, _)| k).collect();
        assert_eq!(scanned, vec![b"a/2".to_vec(), b"a/3".to_vec()]);

        let pending = overlay.into_pending();
        assert_eq!(pending.len(), 2);
        pending.commit(&mut store);
        assert!(!store.has(b"a/1"));
        assert_eq!(store.get(b"a/3"), Some(b"3".to_vec()));
    }

    #[test]
    fn test_put_and_load() {
        let mut store = MemStore::new();
        put(&mut store, b"num", &42i64).unwrap();
        assert_eq!(load::<i64>(&store, b"num").unwrap(), Some(42));
        assert_eq!(load::<i64>(&store, b"missing").unwrap(), None);

        store.set(b"bad", vec![1]);
        assert!(load::<i64>(&store, b"bad").is_err());
    }
}
