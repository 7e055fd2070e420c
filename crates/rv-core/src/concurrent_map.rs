//! A bucket-array hash table whose buckets are individually lock-free,
//! with a reader/writer lock guarding the (rare) doubling rehash.
//!
//! Outside of a resize, concurrent `get`/`put` on different buckets do
//! not interfere with each other at all (the reader lock is shared); on
//! the same bucket they rely on [`crate::lock_free_bucket::LockFreeBucket`]'s
//! lock-free properties. A resize takes the writer lock, which is
//! exclusive with every other reader and writer, so a `get` racing a
//! resize sees either the pre- or post-resize table — both contain the
//! key once `put` has returned.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::bus::BusPort;
use crate::lock_free_bucket::LockFreeBucket;

const MAX_LOAD: f64 = 0.75;
const DEFAULT_CAPACITY: usize = 64;

/// Concurrent hash table keyed by `K`, valued by `V`. Capacity is always a
/// power of two; it doubles when the load factor reaches 0.75.
pub struct ConcurrentMap<K, V> {
    buckets: RwLock<Vec<LockFreeBucket<K, V>>>,
    size: AtomicU64,
}

impl<K: Hash + Eq + Copy, V: Copy> ConcurrentMap<K, V> {
    /// Creates a map with `capacity` buckets. `capacity` must be a power
    /// of two; panics otherwise, the same way the reference table treats
    /// a non-power-of-two capacity as a programming error rather than a
    /// recoverable condition.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity > 0 && capacity.is_power_of_two(),
            "ConcurrentMap capacity must be a power of two, got {capacity}"
        );
        let buckets = (0..capacity).map(|_| LockFreeBucket::new()).collect();
        Self {
            buckets: RwLock::new(buckets),
            size: AtomicU64::new(0),
        }
    }

    fn bucket_index(num_buckets: usize, key: &K) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) & (num_buckets - 1)
    }

    /// Looks up `key` under the reader lock.
    #[must_use]
    pub fn get(&self, key: K) -> Option<V> {
        let buckets = self.buckets.read().expect("concurrent map lock poisoned");
        let idx = Self::bucket_index(buckets.len(), &key);
        buckets[idx].find(key)
    }

    /// Inserts or overwrites `(key, val)` under the reader lock, then
    /// checks whether a rehash is due.
    pub fn put(&self, key: K, val: V) {
        {
            let buckets = self.buckets.read().expect("concurrent map lock poisoned");
            let idx = Self::bucket_index(buckets.len(), &key);
            if !buckets[idx].put(key, val) {
                self.size.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.maybe_rehash();
    }

    /// Current number of distinct keys.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Relaxed)
    }

    fn load_factor(size: u64, num_buckets: usize) -> f64 {
        size as f64 / num_buckets as f64
    }

    fn maybe_rehash(&self) {
        {
            let buckets = self.buckets.read().expect("concurrent map lock poisoned");
            if Self::load_factor(self.size.load(Ordering::Relaxed), buckets.len()) < MAX_LOAD {
                return;
            }
        }

        let mut buckets = self.buckets.write().expect("concurrent map lock poisoned");
        // Re-check: another thread may have already rehashed while we
        // waited for the exclusive lock.
        if Self::load_factor(self.size.load(Ordering::Relaxed), buckets.len()) < MAX_LOAD {
            return;
        }

        let new_capacity = buckets.len() * 2;
        log::debug!(
            "rehashing concurrent map: {} -> {new_capacity} buckets",
            buckets.len()
        );
        let new_buckets: Vec<LockFreeBucket<K, V>> =
            (0..new_capacity).map(|_| LockFreeBucket::new()).collect();

        for old_bucket in buckets.iter() {
            old_bucket.for_each(|k, v| {
                let idx = Self::bucket_index(new_capacity, &k);
                new_buckets[idx].put(k, v);
            });
        }

        *buckets = new_buckets;
    }
}

impl<K: Hash + Eq + Copy, V: Copy> Default for ConcurrentMap<K, V> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl BusPort for ConcurrentMap<u32, u32> {
    fn load_word(&mut self, addr: u32) -> Option<u32> {
        self.get(addr)
    }

    fn store_word(&mut self, addr: u32, val: u32) -> bool {
        self.put(addr, val);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn get_after_put_returns_latest_value() {
        let map: ConcurrentMap<u32, u32> = ConcurrentMap::default();
        map.put(7, 42);
        assert_eq!(map.get(7), Some(42));
        map.put(7, 43);
        assert_eq!(map.get(7), Some(43));
        assert_eq!(map.size(), 1);
    }

    #[test]
    fn get_on_missing_key_is_none() {
        let map: ConcurrentMap<u32, u32> = ConcurrentMap::default();
        assert_eq!(map.get(123), None);
    }

    #[test]
    fn rehash_preserves_all_entries() {
        let map: ConcurrentMap<u32, u32> = ConcurrentMap::with_capacity(4);
        for i in 0..64 {
            map.put(i, i * 2);
        }
        assert_eq!(map.size(), 64);
        for i in 0..64 {
            assert_eq!(map.get(i), Some(i * 2));
        }
    }

    #[test]
    fn bus_port_facade_round_trips() {
        let mut map: ConcurrentMap<u32, u32> = ConcurrentMap::default();
        assert_eq!(BusPort::load_word(&mut map, 4), None);
        assert!(BusPort::store_word(&mut map, 4, 0xABCD));
        assert_eq!(BusPort::load_word(&mut map, 4), Some(0xABCD));
    }

    #[test]
    fn parallel_put_get_stress() {
        let map: Arc<ConcurrentMap<u32, u32>> = Arc::new(ConcurrentMap::with_capacity(64));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let map = Arc::clone(&map);
            handles.push(thread::spawn(move || {
                let mut rng_state: u64 = 0x2545F4914F6CDD1D ^ (std::process::id() as u64);
                for _ in 0..20_000 {
                    // xorshift64 - no external rand dependency needed for a
                    // uniform-enough key stream over a stress test.
                    rng_state ^= rng_state << 13;
                    rng_state ^= rng_state >> 7;
                    rng_state ^= rng_state << 17;
                    let key = (rng_state % 1_000_000) as u32;
                    map.put(key, key);
                    let _ = map.get(key);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert!(map.size() > 0 && map.size() <= 1_000_000);
    }
}
