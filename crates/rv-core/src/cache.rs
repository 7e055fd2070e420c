//! N-set by W-way set-associative cache sitting in front of a
//! [`BusPort`], with single-bit-MRU victim selection and write-back
//! (default) or write-through stores.
//!
//! All cache access is mediated through `&mut self`
//! ([`BusPort::load_word`]/[`BusPort::store_word`]), which is also how a
//! [`crate::hart::Hart`] talks to its bus — there is exactly one owner at
//! a time, matching "the Hart itself is single-threaded" and "multi-hart
//! execution" being a non-goal. The per-set MRU tracker is therefore a
//! plain `Vec<usize>` rather than the spin-lock-guarded field the
//! reference design uses for a cache that might be shared across
//! threads; see `DESIGN.md`. The hit/miss/eviction counters remain
//! atomic, since they are meant to be observable from another thread
//! concurrently with the owning hart's execution.

use crate::bus::BusPort;
use crate::cache_line::CacheLine;
use crate::stats::CacheStats;
use std::sync::atomic::Ordering;

const LINE_WORDS: usize = 4;
const LINE_SHIFT: u32 = 4; // 16-byte lines

/// Write policy on a store hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Defer propagation to the next level until the line is evicted.
    WriteBack,
    /// Propagate every store to the next level immediately, in addition
    /// to updating the resident line.
    WriteThrough,
}

/// An `S`-set, `W`-way set-associative cache in front of a `next`
/// [`BusPort`].
pub struct SetAssociativeCache<B: BusPort> {
    sets: usize,
    ways: usize,
    policy: WritePolicy,
    data: Vec<CacheLine>, // flat [set * ways + way]
    mru_way: Vec<usize>,
    next: B,
    stats: CacheStats,
}

impl<B: BusPort> SetAssociativeCache<B> {
    /// Builds a cache with `sets` sets (must be a power of two) and `ways`
    /// ways in front of `next`, using `policy`.
    #[must_use]
    pub fn new(sets: usize, ways: usize, next: B, policy: WritePolicy) -> Self {
        assert!(sets > 0 && sets.is_power_of_two(), "sets must be a power of two");
        assert!(ways > 0, "ways must be at least 1");
        Self {
            sets,
            ways,
            policy,
            data: vec![CacheLine::EMPTY; sets * ways],
            mru_way: vec![0; sets],
            next,
            stats: CacheStats::new(),
        }
    }

    /// The write-back-default constructor most callers want.
    #[must_use]
    pub fn write_back(sets: usize, ways: usize, next: B) -> Self {
        Self::new(sets, ways, next, WritePolicy::WriteBack)
    }

    /// Read-only access to the running counters.
    #[must_use]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn log2_sets(&self) -> u32 {
        self.sets.trailing_zeros()
    }

    fn set_of(&self, addr: u32) -> usize {
        ((addr >> LINE_SHIFT) as usize) & (self.sets - 1)
    }

    fn tag_of(&self, addr: u32) -> u32 {
        addr >> (LINE_SHIFT + self.log2_sets())
    }

    fn word_in_line(addr: u32) -> usize {
        ((addr >> 2) & 0x3) as usize
    }

    fn slot(&self, set: usize, way: usize) -> usize {
        set * self.ways + way
    }

    fn block_base(&self, tag: u32, set: usize) -> u32 {
        (tag << (LINE_SHIFT + self.log2_sets())) | ((set as u32) << LINE_SHIFT)
    }

    fn find_way(&self, set: usize, tag: u32) -> Option<usize> {
        (0..self.ways).find(|&w| {
            let line = &self.data[self.slot(set, w)];
            line.valid && line.tag == tag
        })
    }

    fn select_victim(&self, set: usize) -> usize {
        let mru = self.mru_way[set];
        (0..self.ways).find(|&w| w != mru).unwrap_or(0)
    }

    fn touch_mru(&mut self, set: usize, way: usize) {
        self.mru_way[set] = way;
    }

    fn fill_line(&mut self, set: usize, way: usize, addr: u32) {
        let slot = self.slot(set, way);
        let old = self.data[slot];

        if old.valid && old.dirty {
            let base = self.block_base(old.tag, set);
            for (i, word) in old.words.iter().enumerate() {
                self.next.store_word(base | ((i as u32) << 2), *word);
            }
        }
        if old.valid {
            self.stats.n_evictions.fetch_add(1, Ordering::Relaxed);
        }

        let new_tag = self.tag_of(addr);
        let base = addr & !((1u32 << LINE_SHIFT) - 1);
        let mut words = [0u32; LINE_WORDS];
        for (i, word) in words.iter_mut().enumerate() {
            *word = self.next.load_word(base | ((i as u32) << 2)).unwrap_or(0);
        }

        self.data[slot] = CacheLine { tag: new_tag, valid: true, dirty: false, words };
        self.touch_mru(set, way);
        log::trace!("cache fill set={set} way={way} addr=0x{addr:08x} tag=0x{new_tag:08x}");
    }
}

impl<B: BusPort> BusPort for SetAssociativeCache<B> {
    fn load_word(&mut self, addr: u32) -> Option<u32> {
        self.stats.n_cpu_accesses.fetch_add(1, Ordering::Relaxed);
        let set = self.set_of(addr);
        let tag = self.tag_of(addr);
        let word_idx = Self::word_in_line(addr);

        if let Some(way) = self.find_way(set, tag) {
            self.stats.n_hits.fetch_add(1, Ordering::Relaxed);
            self.touch_mru(set, way);
            return Some(self.data[self.slot(set, way)].words[word_idx]);
        }

        self.stats.n_misses.fetch_add(1, Ordering::Relaxed);
        let victim = self.select_victim(set);
        self.fill_line(set, victim, addr);
        Some(self.data[self.slot(set, victim)].words[word_idx])
    }

    fn store_word(&mut self, addr: u32, val: u32) -> bool {
        self.stats.n_cpu_accesses.fetch_add(1, Ordering::Relaxed);
        let set = self.set_of(addr);
        let tag = self.tag_of(addr);
        let word_idx = Self::word_in_line(addr);

        if let Some(way) = self.find_way(set, tag) {
            self.stats.n_hits.fetch_add(1, Ordering::Relaxed);
            let slot = self.slot(set, way);
            self.data[slot].words[word_idx] = val;
            self.data[slot].dirty = true;
            self.touch_mru(set, way);
            return match self.policy {
                WritePolicy::WriteThrough => self.next.store_word(addr, val),
                WritePolicy::WriteBack => true,
            };
        }

        self.stats.n_misses.fetch_add(1, Ordering::Relaxed);
        let victim = self.select_victim(set);
        self.fill_line(set, victim, addr);
        // Stats already counted this access; the retry below must not
        // double-count, so write the filled line directly instead of
        // recursing into store_word.
        let slot = self.slot(set, victim);
        self.data[slot].words[word_idx] = val;
        self.data[slot].dirty = true;
        self.touch_mru(set, victim);
        match self.policy {
            WritePolicy::WriteThrough => self.next.store_word(addr, val),
            WritePolicy::WriteBack => true,
        }
    }
}
