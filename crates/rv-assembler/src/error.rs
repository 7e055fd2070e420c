//! Assembler error type.

/// Errors the assembler can raise while encoding a program.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AssemblerSyntax {
    /// A source line matched none of the supported instruction patterns.
    #[error("syntax error: no matching instruction pattern for '{0}'")]
    NoMatchingPattern(String),

    /// A register name was not one of `x0`..`x31`.
    #[error("bad register name '{0}'")]
    BadRegister(String),

    /// A branch referenced a label that was never defined.
    #[error("undefined label '{0}'")]
    UndefinedLabel(String),
}
