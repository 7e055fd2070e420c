//! Property: for every format, packing arbitrary field values into a word
//! and decoding it back recovers exactly those fields on the bits that
//! format defines.

use proptest::prelude::*;
use rv_core::decode::{decode, sign_extend, InstructionRecord};

const OP: u32 = 0b011_0011;
const OP_IMM: u32 = 0b001_0011;
const BRANCH: u32 = 0b110_0011;
const LUI: u32 = 0b011_0111;
const JAL: u32 = 0b110_1111;

fn reg() -> impl Strategy<Value = u8> {
    0u8..32
}

proptest! {
    #[test]
    fn r_type_round_trips(rd in reg(), rs1 in reg(), rs2 in reg(), funct3 in 0u8..8, funct7_bit in any::<bool>()) {
        let funct7: u8 = if funct7_bit { 0x20 } else { 0x00 };
        let word = ((funct7 as u32) << 25)
            | ((rs2 as u32) << 20)
            | ((rs1 as u32) << 15)
            | ((funct3 as u32) << 12)
            | ((rd as u32) << 7)
            | OP;
        let Some(InstructionRecord::R { rd: d_rd, rs1: d_rs1, rs2: d_rs2, funct3: d_f3, funct7: d_f7 }) = decode(word) else {
            prop_assert!(false, "expected R-type");
            return Ok(());
        };
        prop_assert_eq!(d_rd, rd);
        prop_assert_eq!(d_rs1, rs1);
        prop_assert_eq!(d_rs2, rs2);
        prop_assert_eq!(d_f3, funct3);
        prop_assert_eq!(d_f7, funct7);
    }

    #[test]
    fn i_type_round_trips(rd in reg(), rs1 in reg(), imm in -2048i32..2048) {
        let word = (((imm as u32) & 0xFFF) << 20)
            | ((rs1 as u32) << 15)
            | ((rd as u32) << 7)
            | OP_IMM;
        let Some(InstructionRecord::I { rd: d_rd, rs1: d_rs1, imm: d_imm, .. }) = decode(word) else {
            prop_assert!(false, "expected I-type");
            return Ok(());
        };
        prop_assert_eq!(d_rd, rd);
        prop_assert_eq!(d_rs1, rs1);
        prop_assert_eq!(d_imm, imm);
    }

    #[test]
    fn branch_offset_round_trips(rs1 in reg(), rs2 in reg(), offset in -4096i32..4096) {
        // B-imm is always even; the low bit is never encoded.
        let offset = offset & !1;
        let imm = (offset as u32) & 0x1FFF;
        let word = ((imm & 0x1000) << 19)
            | ((imm & 0x7E0) << 20)
            | ((imm & 0x1E) << 7)
            | ((imm & 0x800) >> 4)
            | ((rs2 as u32) << 20)
            | ((rs1 as u32) << 15)
            | BRANCH;
        let Some(InstructionRecord::B { rs1: d_rs1, rs2: d_rs2, imm: d_imm, .. }) = decode(word) else {
            prop_assert!(false, "expected B-type");
            return Ok(());
        };
        prop_assert_eq!(d_rs1, rs1);
        prop_assert_eq!(d_rs2, rs2);
        prop_assert_eq!(d_imm, offset);
    }

    #[test]
    fn u_type_round_trips(rd in reg(), upper in 0u32..(1u32 << 20)) {
        let word = (upper << 12) | ((rd as u32) << 7) | LUI;
        let Some(InstructionRecord::U { rd: d_rd, imm: d_imm }) = decode(word) else {
            prop_assert!(false, "expected U-type");
            return Ok(());
        };
        prop_assert_eq!(d_rd, rd);
        prop_assert_eq!(d_imm as u32, upper << 12);
    }

    #[test]
    fn uj_offset_round_trips(rd in reg(), offset in -(1 << 19)..(1 << 19)) {
        let offset = offset & !1;
        let imm = (offset as u32) & 0x1F_FFFF;
        let word = (((imm >> 20) & 0x1) << 31)
            | (((imm >> 12) & 0xFF) << 12)
            | (((imm >> 11) & 0x1) << 20)
            | (((imm >> 1) & 0x3FF) << 21)
            | ((rd as u32) << 7)
            | JAL;
        let Some(InstructionRecord::UJ { rd: d_rd, imm: d_imm }) = decode(word) else {
            prop_assert!(false, "expected UJ-type");
            return Ok(());
        };
        prop_assert_eq!(d_rd, rd);
        prop_assert_eq!(d_imm, offset);
    }

    #[test]
    fn sign_extend_is_identity_within_range(bits in 2u32..32, v in 0u32..(1u32 << 30)) {
        let masked = v & ((1u32 << bits) - 1);
        let extended = sign_extend(masked, bits);
        // Re-masking the sign-extended value to `bits` bits must recover
        // the original bit pattern.
        prop_assert_eq!((extended as u32) & ((1u32 << bits) - 1), masked);
    }
}
