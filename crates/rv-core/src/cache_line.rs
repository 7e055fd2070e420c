//! A single cache slot: one 16-byte (four-word) line plus its tag and
//! dirty/valid bits.

/// One set-associative cache slot.
///
/// Invariants: `!valid` implies `!dirty`; `dirty` implies `valid`. A valid
/// line in set `s` with tag `t` covers the aligned 16-byte block whose
/// address decomposes as `(tag, set, word_in_line)` per
/// [`crate::cache::SetAssociativeCache`]'s address decomposition.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheLine {
    /// Tag of the block currently resident, meaningful only when `valid`.
    pub tag: u32,
    /// Whether this slot holds a real block.
    pub valid: bool,
    /// Whether the slot has been written since it was filled.
    pub dirty: bool,
    /// The four 32-bit words of the line.
    pub words: [u32; 4],
}

impl CacheLine {
    /// An empty, invalid line. `Empty` is reachable only at construction;
    /// after that a line only moves between valid-clean and valid-dirty,
    /// or gets evicted and refilled with a new tag.
    pub const EMPTY: CacheLine = CacheLine { tag: 0, valid: false, dirty: false, words: [0; 4] };
}
