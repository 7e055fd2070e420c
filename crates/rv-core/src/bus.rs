//! The word-granular memory bus contract shared by every layer of the
//! memory hierarchy.
//!
//! All concrete layers — [`crate::concurrent_map::ConcurrentMap`],
//! [`crate::mmio::MmioWindow`], [`crate::cache::SetAssociativeCache`] —
//! implement [`BusPort`] and own their next level exclusively (a
//! single-owner decorator chain, not shared ownership). A [`BusPort`]
//! operation never blocks on I/O; it may spin briefly on an internal lock.

/// Word-granular load/store over a 32-bit address space.
///
/// Implementors decide what "unmapped" means for their layer: a cache
/// never reports unmapped (it always fills from its next level), while the
/// backing [`crate::concurrent_map::ConcurrentMap`] reports unmapped for
/// any address that was never written.
///
/// # Examples
///
/// ```
/// use rv_core::bus::BusPort;
///
/// struct FlatRam {
///     words: Vec<u32>,
/// }
///
/// impl BusPort for FlatRam {
///     fn load_word(&mut self, addr: u32) -> Option<u32> {
///         self.words.get((addr / 4) as usize).copied()
///     }
///
///     fn store_word(&mut self, addr: u32, val: u32) -> bool {
///         match self.words.get_mut((addr / 4) as usize) {
///             Some(slot) => { *slot = val; true }
///             None => false,
///         }
///     }
/// }
/// ```
pub trait BusPort {
    /// Reads the word at `addr`. `addr` must be word-aligned
    /// (`addr & 3 == 0`); behavior on a misaligned address is undefined by
    /// this contract. Returns `None` if `addr` is unmapped by this layer.
    fn load_word(&mut self, addr: u32) -> Option<u32>;

    /// Writes `val` at `addr`. Returns `true` on success, `false` if
    /// `addr` is unmapped by this layer.
    fn store_word(&mut self, addr: u32, val: u32) -> bool;
}
