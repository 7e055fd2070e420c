//! A small in-process emulator for a load/store RISC instruction subset,
//! together with the memory hierarchy that backs it.
//!
//! Three pieces compose into a working machine:
//!
//! - [`bus`] — the word-granular [`bus::BusPort`] contract every layer
//!   below implements.
//! - [`lock_free_bucket`] and [`concurrent_map`] — a concurrent hash
//!   table used as the backing store, with a lock-free per-bucket list
//!   and a reader/writer-guarded resize.
//! - [`cache`] and [`mmio`] — a set-associative cache and an MMIO
//!   decorator that chain in front of the backing store.
//! - [`decode`] and [`hart`] — the opcode-indexed decoder and the
//!   fetch/decode/execute loop that drives everything through a
//!   [`bus::BusPort`].
//!
//! # Example
//!
//! ```
//! use rv_core::bus::BusPort;
//! use rv_core::cache::SetAssociativeCache;
//! use rv_core::concurrent_map::ConcurrentMap;
//! use rv_core::hart::Hart;
//! use rv_core::mmio::MmioWindow;
//!
//! let dram: ConcurrentMap<u32, u32> = ConcurrentMap::default();
//! let mmio = MmioWindow::new(dram);
//! let cache = SetAssociativeCache::write_back(64, 2, mmio);
//! let mut hart = Hart::new(cache);
//!
//! // addi x1, x0, 5 ; jalr x0, x0, 0
//! hart.bus_mut().store_word(0, 0x0050_0093);
//! hart.bus_mut().store_word(4, 0x0000_0067);
//! hart.step().unwrap();
//! assert_eq!(hart.reg(1), 5);
//! ```

#![warn(missing_docs)]

pub mod bus;
pub mod cache;
pub mod cache_line;
pub mod concurrent_map;
pub mod decode;
pub mod demo;
pub mod error;
pub mod hart;
pub mod lock_free_bucket;
pub mod mmio;
pub mod stats;
