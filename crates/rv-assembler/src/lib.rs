//! Textual assembler for the small RISC instruction subset `rv-core` decodes.
//!
//! This is deliberately minimal: it understands exactly the mnemonics used
//! by the end-to-end scenarios it exists to build fixtures for (`add`,
//! `sub`, `addi`, `jalr`, `lw`, `sw`, `bne`, `beq`), two passes (label
//! collection, then encode), and one-line `#` comments. It is not a general
//! RISC-V assembler and does not try to be.
//!
//! # Example
//!
//! ```
//! use rv_assembler::assemble;
//!
//! let words = assemble(
//!     "addi x1,x0,11\n\
//!      addi x2,x0,0\n\
//!      addi x3,x0,1\n\
//!      loop: add x2,x2,x3\n\
//!      addi x3,x3,1\n\
//!      bne x3,x1,loop\n\
//!      sw x2,32(x0)\n\
//!      jalr x0,x0,0\n",
//! )
//! .unwrap();
//! assert_eq!(words.len(), 8);
//! ```

#![warn(missing_docs)]

mod encode;
mod error;

pub use error::AssemblerSyntax;

use std::collections::HashMap;

/// Encodes a source program into a flat sequence of 32-bit instruction
/// words, one per non-blank, non-label-only line.
///
/// Two passes: the first records label addresses (a label costs no
/// instruction slot by itself), the second encodes each instruction line,
/// resolving any label reference against the table built in pass one.
pub fn assemble(src: &str) -> Result<Vec<u32>, AssemblerSyntax> {
    let lines: Vec<&str> = src.lines().map(strip_comment_and_trim).collect();

    let mut labels = HashMap::new();
    let mut pc = 0u32;
    let mut bodies = Vec::with_capacity(lines.len());
    for line in &lines {
        let body = match line.split_once(':') {
            Some((label, rest)) if is_label(label) => {
                labels.insert(label.trim().to_string(), pc);
                rest.trim()
            }
            _ => line.trim(),
        };
        if !body.is_empty() {
            pc += 4;
        }
        bodies.push(body);
    }

    let mut words = Vec::with_capacity(bodies.iter().filter(|b| !b.is_empty()).count());
    let mut pc = 0u32;
    for body in bodies {
        if body.is_empty() {
            continue;
        }
        let word = encode::encode_line(body, pc, &labels)?;
        words.push(word);
        pc += 4;
    }
    Ok(words)
}

fn strip_comment_and_trim(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => line[..idx].trim(),
        None => line.trim(),
    }
}

fn is_label(candidate: &str) -> bool {
    let candidate = candidate.trim();
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
