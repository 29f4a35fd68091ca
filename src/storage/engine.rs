//! Thread-Safe Storage Engine with Expiry Support
//!
//! This module implements the key-value store behind RQLDB. The engine is
//! generic over the stored payload, so the same code backs both the data
//! store (`StorageEngine<Bytes>`) and the registered-user store
//! (`StorageEngine<RegisteredUser>`).
//!
//! ## Design Decisions
//!
//! 1. **Sharded Locks**: Keys are spread over 64 shards, each with its own lock.
//! 2. **Lazy Expiry**: An expired entry reads as absent and is removed on access.
//! 3. **One Clock**: Expiry deadlines are `Instant`s, written and compared on the
//!    same monotonic clock.
//! 4. **Default Expiry**: Each engine carries the expiry applied to writes that
//!    do not specify one.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   StorageEngine<V>                          │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐           │
//! │  │ Shard 0 │ │ Shard 1 │ │ Shard 2 │ │ Shard N │           │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │           │
//! │  │ HashMap │ │ HashMap │ │ HashMap │ │ HashMap │           │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A key always hashes to the same shard, so every operation on one key is
//! serialized by that shard's lock.

use bytes::Bytes;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Number of shards for the storage engine.
const NUM_SHARDS: usize = 64;

/// How long a stored entry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiry {
    /// The entry is kept until it is deleted or overwritten.
    #[default]
    Never,
    /// The entry expires this long after it was written.
    After(Duration),
}

impl Expiry {
    /// Expiry after a number of milliseconds.
    pub fn from_millis(ms: u64) -> Self {
        Expiry::After(Duration::from_millis(ms))
    }

    /// The deadline for an entry written at `now`.
    ///
    /// A duration too large to represent as an `Instant` never expires.
    fn deadline(self, now: Instant) -> Option<Instant> {
        match self {
            Expiry::Never => None,
            Expiry::After(ttl) => now.checked_add(ttl),
        }
    }
}

/// A stored value with optional expiry time.
#[derive(Debug, Clone)]
pub struct Entry<V> {
    /// The actual value stored
    pub value: V,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    /// Creates an entry written now with the given expiry.
    pub fn new(value: V, expiry: Expiry) -> Self {
        Self {
            value,
            expires_at: expiry.deadline(Instant::now()),
        }
    }

    /// Checks if this entry has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| Instant::now() >= exp)
            .unwrap_or(false)
    }
}

/// A single shard containing a portion of the key-value pairs.
#[derive(Debug)]
struct Shard<V> {
    data: RwLock<HashMap<Bytes, Entry<V>>>,
}

impl<V> Shard<V> {
    fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    // A panic while holding the lock cannot leave a map half-updated: every
    // critical section is a single insert, remove or retain.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<Bytes, Entry<V>>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Bytes, Entry<V>>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A TTL-aware key-value store.
///
/// This struct is designed to be wrapped in an `Arc` and shared across all
/// client sessions. All operations are thread-safe and never block beyond a
/// single shard's critical section.
///
/// # Example
///
/// ```
/// use rqldb::storage::{Expiry, StorageEngine};
/// use bytes::Bytes;
/// use std::time::Duration;
///
/// let engine = StorageEngine::new(Expiry::Never);
///
/// engine.set(Bytes::from("name"), Bytes::from("widget"), None);
/// assert_eq!(engine.get(b"name"), Some(Bytes::from("widget")));
///
/// engine.set(
///     Bytes::from("session"),
///     Bytes::from("abc123"),
///     Some(Expiry::After(Duration::from_secs(60))),
/// );
/// assert!(engine.exists(b"session"));
/// ```
pub struct StorageEngine<V> {
    /// Sharded storage for reduced lock contention
    shards: Vec<Shard<V>>,

    /// Expiry used by writes that do not specify one
    default_expiry: Expiry,

    /// Statistics: total number of entries, including expired ones not yet removed
    key_count: AtomicU64,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: total SET operations
    set_count: AtomicU64,

    /// Statistics: total DEL operations
    del_count: AtomicU64,

    /// Statistics: number of expired keys cleaned up
    expired_count: AtomicU64,
}

impl<V> std::fmt::Debug for StorageEngine<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageEngine")
            .field("shards", &self.shards.len())
            .field("default_expiry", &self.default_expiry)
            .field("key_count", &self.key_count.load(Ordering::Relaxed))
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl<V> Default for StorageEngine<V> {
    fn default() -> Self {
        Self::new(Expiry::Never)
    }
}

impl<V> StorageEngine<V> {
    /// Creates a new storage engine with the given default expiry.
    pub fn new(default_expiry: Expiry) -> Self {
        let shards = (0..NUM_SHARDS).map(|_| Shard::new()).collect();

        Self {
            shards,
            default_expiry,
            key_count: AtomicU64::new(0),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// The expiry applied when `set` is called without one.
    pub fn default_expiry(&self) -> Expiry {
        self.default_expiry
    }

    #[inline]
    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % NUM_SHARDS
    }

    #[inline]
    fn get_shard(&self, key: &[u8]) -> &Shard<V> {
        &self.shards[self.shard_index(key)]
    }

    /// Inserts or replaces the value for `key`.
    ///
    /// `expiry` overrides the engine's default; `None` uses the default.
    /// Any previous entry for the key is discarded, expired or not.
    ///
    /// # Returns
    ///
    /// Returns `true` if a new key was created, `false` if an existing key was updated.
    pub fn set(&self, key: Bytes, value: V, expiry: Option<Expiry>) -> bool {
        self.set_count.fetch_add(1, Ordering::Relaxed);

        let entry = Entry::new(value, expiry.unwrap_or(self.default_expiry));
        let mut data = self.get_shard(&key).write();

        let is_new = data.insert(key, entry).is_none();
        if is_new {
            self.key_count.fetch_add(1, Ordering::Relaxed);
        }

        is_new
    }

    /// Deletes a key.
    ///
    /// # Returns
    ///
    /// Returns `true` if an entry was removed, `false` if there was none.
    pub fn delete(&self, key: &[u8]) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);

        let mut data = self.get_shard(key).write();

        if data.remove(key).is_some() {
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Checks if a key exists (and is not expired).
    pub fn exists(&self, key: &[u8]) -> bool {
        let data = self.get_shard(key).read();
        data.get(key).map(|e| !e.is_expired()).unwrap_or(false)
    }

    /// Returns the approximate number of keys, counting expired entries that
    /// have not been removed yet.
    pub fn len(&self) -> u64 {
        self.key_count.load(Ordering::Relaxed)
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            keys: self.key_count.load(Ordering::Relaxed),
            get_ops: self.get_count.load(Ordering::Relaxed),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
        }
    }

    /// Removes every expired entry from all shards.
    ///
    /// This is called by the background expiry sweeper.
    ///
    /// # Returns
    ///
    /// Returns the number of keys that were cleaned up.
    pub fn cleanup_expired(&self) -> u64 {
        let mut cleaned = 0u64;

        for shard in &self.shards {
            let mut data = shard.write();
            let before = data.len();

            data.retain(|_, entry| !entry.is_expired());

            cleaned += (before - data.len()) as u64;
        }

        if cleaned > 0 {
            self.key_count.fetch_sub(cleaned, Ordering::Relaxed);
            self.expired_count.fetch_add(cleaned, Ordering::Relaxed);
        }

        cleaned
    }
}

impl<V: Clone> StorageEngine<V> {
    /// Gets the live value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. An expired
    /// entry is removed on the way out.
    pub fn get(&self, key: &[u8]) -> Option<V> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let shard = self.get_shard(key);

        // Fast path under the read lock
        {
            let data = shard.read();
            match data.get(key) {
                Some(entry) if !entry.is_expired() => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        // The entry looked expired. Re-check under the write lock: a `set`
        // that landed in between replaced it and must win.
        let mut data = shard.write();
        if data.get(key)?.is_expired() {
            data.remove(key);
            self.key_count.fetch_sub(1, Ordering::Relaxed);
            self.expired_count.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        data.get(key).map(|entry| entry.value.clone())
    }
}

/// Store statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Number of entries currently stored
    pub keys: u64,
    /// Total GET operations
    pub get_ops: u64,
    /// Total SET operations
    pub set_ops: u64,
    /// Total DEL operations
    pub del_ops: u64,
    /// Total expired keys cleaned up
    pub expired: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn engine() -> StorageEngine<Bytes> {
        StorageEngine::new(Expiry::Never)
    }

    #[test]
    fn test_set_and_get() {
        let engine = engine();

        assert!(engine.set(Bytes::from("key"), Bytes::from("value"), None));
        assert_eq!(engine.get(b"key"), Some(Bytes::from("value")));
    }

    #[test]
    fn test_get_nonexistent() {
        let engine = engine();
        assert_eq!(engine.get(b"nonexistent"), None);
    }

    #[test]
    fn test_overwrite_replaces_value_and_expiry() {
        let engine = engine();

        engine.set(
            Bytes::from("key"),
            Bytes::from("old"),
            Some(Expiry::from_millis(20)),
        );
        assert!(!engine.set(Bytes::from("key"), Bytes::from("new"), None));

        thread::sleep(Duration::from_millis(40));

        assert_eq!(engine.get(b"key"), Some(Bytes::from("new")));
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_delete() {
        let engine = engine();

        engine.set(Bytes::from("key"), Bytes::from("value"), None);
        assert!(engine.delete(b"key"));
        assert_eq!(engine.get(b"key"), None);
        assert!(!engine.delete(b"key")); // Already deleted
    }

    #[test]
    fn test_expiry_boundaries() {
        let engine = engine();
        let ttl = Duration::from_millis(200);

        engine.set(
            Bytes::from("key"),
            Bytes::from("value"),
            Some(Expiry::After(ttl)),
        );

        // Alive at t/2
        thread::sleep(ttl / 2);
        assert_eq!(engine.get(b"key"), Some(Bytes::from("value")));

        // Gone at 2t
        thread::sleep(ttl * 3 / 2);
        assert_eq!(engine.get(b"key"), None);
        assert!(!engine.exists(b"key"));
        assert_eq!(engine.stats().expired, 1);
        assert_eq!(engine.len(), 0);
    }

    #[test]
    fn test_default_expiry_applies_without_override() {
        let engine: StorageEngine<Bytes> = StorageEngine::new(Expiry::from_millis(20));

        engine.set(Bytes::from("short"), Bytes::from("v"), None);
        engine.set(Bytes::from("pinned"), Bytes::from("v"), Some(Expiry::Never));

        thread::sleep(Duration::from_millis(50));

        assert_eq!(engine.get(b"short"), None);
        assert_eq!(engine.get(b"pinned"), Some(Bytes::from("v")));
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let engine = engine();

        engine.set(Bytes::from("k"), Bytes::from("v"), Some(Expiry::from_millis(0)));
        assert_eq!(engine.get(b"k"), None);
    }

    #[test]
    fn test_huge_ttl_never_expires() {
        let engine = engine();

        engine.set(
            Bytes::from("k"),
            Bytes::from("v"),
            Some(Expiry::After(Duration::MAX)),
        );
        assert!(engine.exists(b"k"));

        let entry = Entry::new(Bytes::from("v"), Expiry::After(Duration::MAX));
        assert_eq!(entry.expires_at, None);
    }

    #[test]
    fn test_cleanup_expired() {
        let engine = engine();

        engine.set(Bytes::from("key1"), Bytes::from("v"), Some(Expiry::from_millis(10)));
        engine.set(Bytes::from("key2"), Bytes::from("v"), Some(Expiry::from_millis(10)));
        engine.set(Bytes::from("key3"), Bytes::from("v"), None);

        thread::sleep(Duration::from_millis(50));

        assert_eq!(engine.cleanup_expired(), 2);
        assert_eq!(engine.len(), 1);
        assert!(engine.exists(b"key3"));
    }

    #[test]
    fn test_stats_count_operations() {
        let engine = engine();

        engine.set(Bytes::from("a"), Bytes::from("1"), None);
        engine.get(b"a");
        engine.get(b"b");
        engine.delete(b"a");

        let stats = engine.stats();
        assert_eq!(stats.set_ops, 1);
        assert_eq!(stats.get_ops, 2);
        assert_eq!(stats.del_ops, 1);
        assert_eq!(stats.keys, 0);
    }

    #[test]
    fn test_non_bytes_payload() {
        #[derive(Debug, Clone, PartialEq)]
        struct Record {
            id: u32,
        }

        let engine: StorageEngine<Record> = StorageEngine::default();
        engine.set(Bytes::from("r"), Record { id: 7 }, None);
        assert_eq!(engine.get(b"r"), Some(Record { id: 7 }));
    }

    #[test]
    fn test_concurrent_writers_lose_nothing() {
        let engine = Arc::new(engine());
        let mut handles = vec![];

        for i in 0..10 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for j in 0..100 {
                    let key = format!("key-{}-{}", i, j);
                    engine.set(Bytes::from(key.clone()), Bytes::from(key.clone()), None);
                    // Read-your-writes on the same thread
                    assert_eq!(engine.get(key.as_bytes()), Some(Bytes::from(key)));
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 1000);
        for i in 0..10 {
            for j in 0..100 {
                assert!(engine.exists(format!("key-{}-{}", i, j).as_bytes()));
            }
        }
    }

    #[test]
    fn test_set_wins_over_expiry_on_read() {
        let engine = Arc::new(engine());

        for round in 0..50 {
            engine.set(Bytes::from("hot"), Bytes::from("stale"), Some(Expiry::from_millis(0)));

            let writer = {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    engine.set(Bytes::from("hot"), Bytes::from(format!("fresh-{}", round)), None);
                })
            };
            let reader = {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    engine.get(b"hot");
                })
            };

            writer.join().unwrap();
            reader.join().unwrap();

            // Whatever the interleaving, the completed write survives.
            assert_eq!(engine.get(b"hot"), Some(Bytes::from(format!("fresh-{}", round))));
        }
    }
}
