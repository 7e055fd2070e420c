//! Error taxonomy for the fetch/decode/execute loop and the statistics
//! formatter.

/// Errors a [`crate::hart::Hart::step`] can raise. Terminal: the hart does
/// not attempt to recover, the error simply propagates to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EmulationError {
    /// `bus.load_word(pc)` returned `None` — the program counter points at
    /// an unmapped address.
    #[error("fetch fault at pc=0x{0:08x}")]
    FetchFault(u32),

    /// The primary opcode has no entry in the decoder table.
    #[error("illegal opcode 0x{0:02x} at pc=0x{1:08x}")]
    IllegalOpcode(u8, u32),

    /// The decoded record's funct3/funct7 fields select an operation the
    /// hart does not implement.
    #[error("illegal instruction (funct3={0}, funct7={1}) at pc=0x{2:08x}")]
    IllegalInstruction(u8, u8, u32),
}

/// Raised by [`crate::stats::format_stats`] when given an unrecognized
/// format specifier.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unsupported cache-statistics format specifier '{0}'")]
pub struct FormatError(pub String);
