//! Wiring glue that hooks the backing store, MMIO window, cache, and hart
//! together into one runnable machine.
//!
//! This is the Rust counterpart of the original `build_system` helper: it
//! owns no window, no event loop, and no rendering — those belong to the
//! out-of-scope SDL/browser frontends. It exists so a caller (a test, a
//! frontend, a REPL) gets a ready-to-step machine without re-deriving the
//! standard layering by hand.

use crate::bus::BusPort;
use crate::cache::SetAssociativeCache;
use crate::concurrent_map::ConcurrentMap;
use crate::hart::Hart;
use crate::mmio::MmioWindow;

/// Default cache geometry: 64 sets, 2-way associative.
pub const DEFAULT_CACHE_SETS: usize = 64;
/// Default cache geometry: 64 sets, 2-way associative.
pub const DEFAULT_CACHE_WAYS: usize = 2;

/// `addi x0, x0, 0` — a no-op, used to seed address 0.
const NOP: u32 = 0x0000_0013;
/// `jalr x0, x0, 0` — with `rs1 = x0` this always jumps to address 0,
/// regardless of where it itself sits, so placed at address 4 it closes
/// a two-instruction idle loop with the `NOP` at address 0 rather than
/// looping in place.
const IDLE_JUMP_TO_ZERO: u32 = 0x0000_0067;

/// The concrete layered bus this crate wires up by default:
/// cache → MMIO window → concurrent-map backing store.
pub type DefaultBus = SetAssociativeCache<MmioWindow<ConcurrentMap<u32, u32>>>;

/// Builds a DRAM → MMIO → cache → hart stack and seeds address 0 with a
/// no-op and address 4 with a `jalr` back to address 0, mirroring the
/// reference `build_system`'s splash-screen bring-up sequence: a hart
/// that idles forever alternating between the two seeded addresses.
#[must_use]
pub fn default_system() -> Hart<DefaultBus> {
    let dram: ConcurrentMap<u32, u32> = ConcurrentMap::default();
    let mmio = MmioWindow::new(dram);
    let cache = SetAssociativeCache::write_back(DEFAULT_CACHE_SETS, DEFAULT_CACHE_WAYS, mmio);
    let mut hart = Hart::new(cache);
    hart.bus_mut().store_word(0, NOP);
    hart.bus_mut().store_word(4, IDLE_JUMP_TO_ZERO);
    hart
}
