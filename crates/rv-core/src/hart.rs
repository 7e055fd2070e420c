//! The fetch/decode/execute loop: 32 integer registers (`x0` hardwired to
//! zero), a 32-bit program counter, and a [`BusPort`] for every fetch and
//! data access.

use crate::bus::BusPort;
use crate::decode::{self, InstructionRecord};
use crate::error::EmulationError;

/// One logical CPU execution context. Owns its [`BusPort`] exclusively —
/// the single-owner chaining pattern every layer in this crate follows.
pub struct Hart<B: BusPort> {
    regs: [u32; 32],
    pc: u32,
    bus: B,
}

impl<B: BusPort> Hart<B> {
    /// Creates a hart with all registers and `pc` zeroed, owning `bus`.
    #[must_use]
    pub fn new(bus: B) -> Self {
        Self { regs: [0; 32], pc: 0, bus }
    }

    /// Current program counter.
    #[must_use]
    pub fn pc(&self) -> u32 {
        self.pc
    }

    /// Reads register `i`. `reg(0)` is always `0`.
    #[must_use]
    pub fn reg(&self, i: u8) -> u32 {
        self.regs[i as usize]
    }

    /// Borrows the bus, e.g. to peek at memory from a test harness.
    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn write_reg(&mut self, rd: u8, val: u32) {
        if rd != 0 {
            self.regs[rd as usize] = val;
        }
    }

    /// Fetches, decodes, and executes one instruction, advancing `pc`
    /// (except for `jalr`/`jal`/taken branches, which set it directly).
    ///
    /// # Errors
    ///
    /// Returns [`EmulationError::FetchFault`] if `pc` is unmapped,
    /// [`EmulationError::IllegalOpcode`] if the primary opcode has no
    /// decoder entry, or [`EmulationError::IllegalInstruction`] if the
    /// decoded funct3/funct7 select an operation this hart does not
    /// implement. All three are terminal: the hart does not attempt
    /// recovery.
    pub fn step(&mut self) -> Result<(), EmulationError> {
        let raw = self
            .bus
            .load_word(self.pc)
            .ok_or(EmulationError::FetchFault(self.pc))?;

        let opcode = (raw & 0x7F) as u8;
        let record = decode::decode(raw)
            .ok_or(EmulationError::IllegalOpcode(opcode, self.pc))?;

        match record {
            InstructionRecord::R { rd, rs1, rs2, funct3, funct7 } => {
                self.exec_r(rd, rs1, rs2, funct3, funct7)?;
            }
            InstructionRecord::I { rd, rs1, funct3, imm } => {
                self.exec_i(opcode, rd, rs1, funct3, imm)?;
            }
            InstructionRecord::S { rs1, rs2, funct3, imm } => {
                self.exec_s(rs1, rs2, funct3, imm)?;
            }
            InstructionRecord::B { rs1, rs2, funct3, imm } => {
                self.exec_b(rs1, rs2, funct3, imm)?;
            }
            InstructionRecord::U { rd, imm } => {
                self.exec_u(opcode, rd, imm);
            }
            InstructionRecord::UJ { rd, imm } => {
                self.exec_uj(rd, imm);
            }
        }
        Ok(())
    }

    fn exec_r(&mut self, rd: u8, rs1: u8, rs2: u8, funct3: u8, funct7: u8) -> Result<(), EmulationError> {
        let result = match (funct7, funct3) {
            (0x00, 0x0) => self.reg(rs1).wrapping_add(self.reg(rs2)), // add
            (0x20, 0x0) => self.reg(rs1).wrapping_sub(self.reg(rs2)), // sub
            _ => {
                log::warn!("illegal R-type funct7={funct7:#x} funct3={funct3:#x} at pc=0x{:08x}", self.pc);
                return Err(EmulationError::IllegalInstruction(funct3, funct7, self.pc));
            }
        };
        self.write_reg(rd, result);
        self.pc = self.pc.wrapping_add(4);
        Ok(())
    }

    fn exec_i(&mut self, opcode: u8, rd: u8, rs1: u8, funct3: u8, imm: i32) -> Result<(), EmulationError> {
        match opcode as usize {
            decode::OP_IMM => {
                if funct3 != 0 {
                    log::warn!("illegal OP-IMM funct3={funct3:#x} at pc=0x{:08x}", self.pc);
                    return Err(EmulationError::IllegalInstruction(funct3, 0, self.pc));
                }
                let result = self.reg(rs1).wrapping_add(imm as u32); // addi
                self.write_reg(rd, result);
                self.pc = self.pc.wrapping_add(4);
            }
            decode::LOAD => {
                let addr = self.reg(rs1).wrapping_add(imm as u32);
                let val = self.bus.load_word(addr).unwrap_or(0);
                self.write_reg(rd, val);
                self.pc = self.pc.wrapping_add(4);
            }
            decode::JALR => {
                let link = self.pc.wrapping_add(4);
                let target = self.reg(rs1).wrapping_add(imm as u32) & !1u32;
                self.write_reg(rd, link);
                self.pc = target; // note: pc += 4 is NOT applied here
            }
            _ => unreachable!("decoder only yields I-shape for OP_IMM/LOAD/JALR"),
        }
        Ok(())
    }

    fn exec_s(&mut self, rs1: u8, rs2: u8, funct3: u8, imm: i32) -> Result<(), EmulationError> {
        let addr = self.reg(rs1).wrapping_add(imm as u32);
        let val = self.reg(rs2);
        let stored = match funct3 {
            0 => val & 0xFF,     // sb
            1 => val & 0xFFFF,   // sh
            2 => val,            // sw
            _ => {
                log::warn!("illegal STORE funct3={funct3:#x} at pc=0x{:08x}", self.pc);
                return Err(EmulationError::IllegalInstruction(funct3, 0, self.pc));
            }
        };
        self.bus.store_word(addr, stored);
        self.pc = self.pc.wrapping_add(4);
        Ok(())
    }

    fn exec_b(&mut self, rs1: u8, rs2: u8, funct3: u8, imm: i32) -> Result<(), EmulationError> {
        let a = self.reg(rs1);
        let b = self.reg(rs2);
        let taken = match funct3 {
            0 => a == b,                               // beq
            1 => a != b,                               // bne
            4 => (a as i32) < (b as i32),               // blt
            5 => (a as i32) >= (b as i32),              // bge
            6 => a < b,                                 // bltu
            7 => a >= b,                                 // bgeu
            _ => {
                log::warn!("illegal BRANCH funct3={funct3:#x} at pc=0x{:08x}", self.pc);
                return Err(EmulationError::IllegalInstruction(funct3, 0, self.pc));
            }
        };
        self.pc = if taken {
            self.pc.wrapping_add(imm as u32)
        } else {
            self.pc.wrapping_add(4)
        };
        Ok(())
    }

    fn exec_u(&mut self, opcode: u8, rd: u8, imm: i32) {
        let result = match opcode as usize {
            decode::LUI => imm as u32,
            decode::AUIPC => self.pc.wrapping_add(imm as u32),
            _ => unreachable!("decoder only yields U-shape for LUI/AUIPC"),
        };
        self.write_reg(rd, result);
        self.pc = self.pc.wrapping_add(4);
    }

    fn exec_uj(&mut self, rd: u8, imm: i32) {
        let link = self.pc.wrapping_add(4);
        self.write_reg(rd, link);
        self.pc = self.pc.wrapping_add(imm as u32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FlatRam {
        words: HashMap<u32, u32>,
    }

    impl FlatRam {
        fn load_program(&mut self, base: u32, words: &[u32]) {
            for (i, w) in words.iter().enumerate() {
                self.words.insert(base + (i as u32) * 4, *w);
            }
        }
    }

    impl BusPort for FlatRam {
        fn load_word(&mut self, addr: u32) -> Option<u32> {
            self.words.get(&addr).copied()
        }
        fn store_word(&mut self, addr: u32, val: u32) -> bool {
            self.words.insert(addr, val);
            true
        }
    }

    /// Encoding of `jalr x0,x0,0`. With `rs1 = x0`, this always jumps to
    /// address 0 rather than looping in place, so it cannot be detected
    /// by pc invariance after stepping it — the halt must be recognized
    /// by the word sitting at `pc` *before* it is executed.
    const HALT_WORD: u32 = 0x0000_0067;

    fn run_to_halt(hart: &mut Hart<FlatRam>) {
        while hart.bus_mut().load_word(hart.pc()) != Some(HALT_WORD) {
            hart.step().unwrap();
        }
    }

    #[test]
    fn triangular_sum_scenario() {
        let words = rv_assembler::assemble(
            "addi x1,x0,11\n\
             addi x2,x0,0\n\
             addi x3,x0,1\n\
             loop: add x2,x2,x3\n\
             addi x3,x3,1\n\
             bne x3,x1,loop\n\
             sw x2,32(x0)\n\
             jalr x0,x0,0\n",
        )
        .unwrap();
        let mut ram = FlatRam::default();
        ram.load_program(0, &words);
        let mut hart = Hart::new(ram);
        run_to_halt(&mut hart);
        assert_eq!(hart.reg(2), 55);
        assert_eq!(hart.bus_mut().load_word(32), Some(55));
    }

    #[test]
    fn constant_propagation_scenario() {
        let words = rv_assembler::assemble(
            "addi x1,x0,5\n\
             addi x2,x1,7\n\
             sw x2,16(x0)\n\
             jalr x0,x0,0\n",
        )
        .unwrap();
        let mut ram = FlatRam::default();
        ram.load_program(0, &words);
        let mut hart = Hart::new(ram);
        for _ in 0..4 {
            hart.step().unwrap();
        }
        assert_eq!(hart.reg(2), 12);
        assert_eq!(hart.bus_mut().load_word(16), Some(12));
    }

    #[test]
    fn x0_is_always_zero_through_a_self_loop_program() {
        let words = rv_assembler::assemble("jalr x0,x0,0\n").unwrap();
        let mut ram = FlatRam::default();
        ram.load_program(0, &words);
        let mut hart = Hart::new(ram);
        for _ in 0..5 {
            hart.step().unwrap();
            assert_eq!(hart.reg(0), 0);
        }
    }

    #[test]
    fn fetch_fault_on_unmapped_pc() {
        let mut hart = Hart::new(FlatRam::default());
        assert_eq!(hart.step(), Err(EmulationError::FetchFault(0)));
    }

    #[test]
    fn illegal_opcode_is_reported() {
        let mut ram = FlatRam::default();
        ram.load_program(0, &[0x7F]); // opcode bits = 0x7F, no table entry
        let mut hart = Hart::new(ram);
        assert_eq!(hart.step(), Err(EmulationError::IllegalOpcode(0x7F, 0)));
    }

    #[test]
    fn unimplemented_r_type_is_illegal_instruction() {
        let mut ram = FlatRam::default();
        // funct7=0x01, funct3=0, opcode=OP: a multiply-looking op we don't implement
        let word = (0x01u32 << 25) | (1 << 20) | (1 << 15) | (0 << 12) | (1 << 7) | 0b0110011;
        ram.load_program(0, &[word]);
        let mut hart = Hart::new(ram);
        assert_eq!(hart.step(), Err(EmulationError::IllegalInstruction(0, 0x01, 0)));
    }

    #[test]
    fn lui_and_auipc() {
        let words = rv_assembler::assemble("jalr x0,x0,0\n").unwrap();
        let mut ram = FlatRam::default();
        // lui x1, 0x12345000 ; auipc x2, 0x1000
        ram.load_program(0, &[0x1234_5000 | (1 << 7) | 0b0110111, (0x1000u32 & 0xFFFFF000) | (2 << 7) | 0b0010111]);
        let mut hart = Hart::new(ram);
        hart.step().unwrap();
        assert_eq!(hart.reg(1), 0x1234_5000);
        hart.step().unwrap();
        assert_eq!(hart.reg(2), 4 + 0x1000);
        let _ = words;
    }
}
