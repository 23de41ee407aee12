//! Key-Value Store with Expiry Support
//!
//! This module implements the authoritative map of key to value for
//! EmberKV, together with the expiry timestamps attached to keys.
//!
//! ## Design Decisions
//!
//! 1. **Separate expiry map**: Expiries are tracked in their own map, keyed
//!    like the values. An expiry can be recorded for a key that does not
//!    exist yet, and the sweeper only walks keys that actually carry one.
//! 2. **Absolute time**: Expiries are absolute UNIX timestamps in
//!    milliseconds. An entry whose expiry is `<= now` is logically absent.
//! 3. **Lazy expiry**: `get` removes an expired entry when it observes it.
//!    The background sweeper is only a safety net for keys never read
//!    again.
//! 4. **One lock**: Commands run one at a time, so the keyspace sits
//!    behind a single `Mutex`. Deleting a key removes its value and its
//!    expiry under the same guard, so no caller sees half of a delete.
//!
//! ## Overwrite Semantics
//!
//! `set` stores a value with no expiry and drops any expiry previously
//! attached to the key. Use `set_with_expiry` or `set_with_ttl` to store
//! a value and its expiry together.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current UNIX time in milliseconds.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// The maps guarded by the engine lock.
#[derive(Debug, Default)]
struct Keyspace {
    values: HashMap<Bytes, Bytes>,
    expiries: HashMap<Bytes, u64>,
}

impl Keyspace {
    #[inline]
    fn is_expired(&self, key: &[u8], now: u64) -> bool {
        self.expiries.get(key).is_some_and(|&at| at <= now)
    }

    /// Removes the value and the expiry of `key`.
    ///
    /// Returns `true` if a value was removed.
    fn remove(&mut self, key: &[u8]) -> bool {
        self.expiries.remove(key);
        self.values.remove(key).is_some()
    }
}

/// The key-value store.
///
/// One instance is created at startup, wrapped in an `Arc` and shared by
/// every connection, so keys written by one client are visible to all.
///
/// # Example
///
/// ```
/// use emberkv::storage::StorageEngine;
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new();
///
/// engine.set(Bytes::from("name"), Bytes::from("ember"));
/// assert_eq!(engine.get(&Bytes::from("name")), Some(Bytes::from("ember")));
///
/// engine.set_with_ttl(Bytes::from("session"), Bytes::from("abc"), Duration::from_secs(60));
/// assert!(engine.expires_at(&Bytes::from("session")).is_some());
/// ```
pub struct StorageEngine {
    keyspace: Mutex<Keyspace>,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: total SET operations
    set_count: AtomicU64,

    /// Statistics: total explicit deletions
    del_count: AtomicU64,

    /// Statistics: number of expired keys removed (lazily or by a sweep)
    expired_count: AtomicU64,
}

impl std::fmt::Debug for StorageEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("keys", &self.len())
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for StorageEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            keyspace: Mutex::new(Keyspace::default()),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// The maps hold plain data, so a poisoned lock is still usable.
    fn keyspace(&self) -> MutexGuard<'_, Keyspace> {
        self.keyspace.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Stores `value` under `key` and clears any expiry on `key`.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new key was created, `false` if an existing key was updated.
    pub fn set(&self, key: Bytes, value: Bytes) -> bool {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let mut ks = self.keyspace();
        ks.expiries.remove(&key);
        ks.values.insert(key, value).is_none()
    }

    /// Stores `value` under `key` with an absolute expiry in UNIX milliseconds.
    pub fn set_with_expiry(&self, key: Bytes, value: Bytes, expires_at: u64) -> bool {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let mut ks = self.keyspace();
        ks.expiries.insert(key.clone(), expires_at);
        ks.values.insert(key, value).is_none()
    }

    /// Stores `value` under `key`, expiring `ttl` from now.
    pub fn set_with_ttl(&self, key: Bytes, value: Bytes, ttl: Duration) -> bool {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        self.set_with_expiry(key, value, now_millis().saturating_add(ttl_ms))
    }

    /// Records or overwrites the expiry of `key`, whether or not the key
    /// currently holds a value.
    pub fn set_expiry(&self, key: Bytes, expires_at: u64) {
        self.keyspace().expiries.insert(key, expires_at);
    }

    /// Returns the expiry recorded for `key`, if any.
    pub fn expires_at(&self, key: &Bytes) -> Option<u64> {
        self.keyspace().expiries.get(key).copied()
    }

    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. An expired
    /// entry is removed on the spot.
    pub fn get(&self, key: &Bytes) -> Option<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let mut ks = self.keyspace();
        if ks.is_expired(key, now_millis()) {
            if ks.remove(key) {
                self.expired_count.fetch_add(1, Ordering::Relaxed);
            }
            return None;
        }
        ks.values.get(key).cloned()
    }

    /// Deletes a key and its expiry.
    ///
    /// # Returns
    ///
    /// Returns `true` if the key held a value.
    pub fn delete(&self, key: &Bytes) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);
        self.keyspace().remove(key)
    }

    /// Checks if a key exists (and is not expired).
    pub fn exists(&self, key: &Bytes) -> bool {
        let ks = self.keyspace();
        ks.values.contains_key(key) && !ks.is_expired(key, now_millis())
    }

    /// Number of stored values, including expired ones not yet removed.
    pub fn len(&self) -> u64 {
        self.keyspace().values.len() as u64
    }

    /// Returns true if the store holds no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every key whose expiry is due.
    ///
    /// This is called by the background expiry sweeper.
    ///
    /// # Returns
    ///
    /// Returns the number of values removed.
    pub fn cleanup_expired(&self) -> u64 {
        let now = now_millis();
        let mut ks = self.keyspace();

        let due: Vec<Bytes> = ks
            .expiries
            .iter()
            .filter(|&(_, &at)| at <= now)
            .map(|(key, _)| key.clone())
            .collect();

        let cleaned = due.iter().filter(|key| ks.remove(key)).count() as u64;
        drop(ks);

        if cleaned > 0 {
            self.expired_count.fetch_add(cleaned, Ordering::Relaxed);
        }
        cleaned
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.len(),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageStats {
    /// Stored values
    pub keys: u64,
    /// GET operations served
    pub get_ops: u64,
    /// SET operations served
    pub set_ops: u64,
    /// Explicit deletions
    pub del_ops: u64,
    /// Expired keys removed
    pub expired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> Bytes {
        Bytes::from(s.to_string())
    }

    #[test]
    fn test_set_and_get() {
        let engine = StorageEngine::new();

        assert!(engine.set(key("foo"), key("bar")));
        assert_eq!(engine.get(&key("foo")), Some(key("bar")));
        assert!(!engine.set(key("foo"), key("baz")));
        assert_eq!(engine.get(&key("foo")), Some(key("baz")));
    }

    #[test]
    fn test_get_nonexistent() {
        let engine = StorageEngine::new();
        assert_eq!(engine.get(&key("missing")), None);
    }

    #[test]
    fn test_delete() {
        let engine = StorageEngine::new();

        engine.set_with_ttl(key("k"), key("v"), Duration::from_secs(60));
        assert!(engine.delete(&key("k")));
        assert_eq!(engine.get(&key("k")), None);
        assert_eq!(engine.expires_at(&key("k")), None);
        assert!(!engine.delete(&key("k")));
    }

    #[test]
    fn test_expiry() {
        let engine = StorageEngine::new();

        engine.set_with_ttl(key("k"), key("v"), Duration::from_millis(50));
        assert_eq!(engine.get(&key("k")), Some(key("v")));

        std::thread::sleep(Duration::from_millis(100));

        assert_eq!(engine.get(&key("k")), None);
        assert!(!engine.exists(&key("k")));
    }

    #[test]
    fn test_expired_get_deletes_once() {
        let engine = StorageEngine::new();

        engine.set_with_expiry(key("k"), key("v"), now_millis() - 1);
        assert_eq!(engine.len(), 1);

        assert_eq!(engine.get(&key("k")), None);
        assert_eq!(engine.get(&key("k")), None);

        let stats = engine.stats();
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.keys, 0);
        assert_eq!(stats.get_ops, 2);
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let engine = StorageEngine::new();

        // An expiry equal to "now" (or earlier) is already due.
        engine.set_with_expiry(key("k"), key("v"), now_millis());
        assert_eq!(engine.get(&key("k")), None);
    }

    #[test]
    fn test_set_clears_previous_expiry() {
        let engine = StorageEngine::new();

        engine.set_with_ttl(key("k"), key("v1"), Duration::from_millis(30));
        engine.set(key("k"), key("v2"));
        assert_eq!(engine.expires_at(&key("k")), None);

        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(engine.get(&key("k")), Some(key("v2")));
    }

    #[test]
    fn test_set_expiry_without_value() {
        let engine = StorageEngine::new();

        let at = now_millis() + 60_000;
        engine.set_expiry(key("ghost"), at);
        assert_eq!(engine.expires_at(&key("ghost")), Some(at));
        assert!(!engine.exists(&key("ghost")));
        assert!(engine.is_empty());
    }

    #[test]
    fn test_set_expiry_on_existing_key() {
        let engine = StorageEngine::new();

        engine.set(key("k"), key("v"));
        engine.set_expiry(key("k"), now_millis() - 1);
        assert_eq!(engine.get(&key("k")), None);
    }

    #[test]
    fn test_cleanup_expired() {
        let engine = StorageEngine::new();

        engine.set_with_ttl(key("key1"), key("value1"), Duration::from_millis(10));
        engine.set_with_ttl(key("key2"), key("value2"), Duration::from_millis(10));
        engine.set(key("key3"), key("value3"));
        engine.set_with_ttl(key("key4"), key("value4"), Duration::from_secs(60));

        std::thread::sleep(Duration::from_millis(50));

        assert_eq!(engine.cleanup_expired(), 2);
        assert_eq!(engine.len(), 2);
        assert!(engine.exists(&key("key3")));
        assert!(engine.exists(&key("key4")));

        // Nothing left to sweep.
        assert_eq!(engine.cleanup_expired(), 0);
        assert_eq!(engine.stats().expired, 2);
    }

    #[test]
    fn test_cleanup_drops_orphan_expiries() {
        let engine = StorageEngine::new();

        engine.set_expiry(key("ghost"), now_millis() - 1);
        assert_eq!(engine.cleanup_expired(), 0);
        assert_eq!(engine.expires_at(&key("ghost")), None);
    }

    #[test]
    fn test_concurrent_access() {
        use std::sync::Arc;
        use std::thread;

        let engine = Arc::new(StorageEngine::new());
        let mut handles = vec![];

        for i in 0..10 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let k = Bytes::from(format!("key-{}-{}", i, j));
                    engine.set(k.clone(), Bytes::from("value"));
                    engine.get(&k);
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 1000);
    }
}
