//! Per-mnemonic parsing and R/I/S/B bit packing.
//!
//! Mirrors the field layout `rv-core`'s decoder expects bit-for-bit, so
//! `decode(encode_line(...))` round-trips on the bits each format defines.

use std::collections::HashMap;

use crate::error::AssemblerSyntax;

const OP: u32 = 0b011_0011;
const OP_IMM: u32 = 0b001_0011;
const LOAD: u32 = 0b000_0011;
const STORE: u32 = 0b010_0011;
const BRANCH: u32 = 0b110_0011;
const JALR: u32 = 0b110_0111;

pub(crate) fn encode_line(
    line: &str,
    pc: u32,
    labels: &HashMap<String, u32>,
) -> Result<u32, AssemblerSyntax> {
    let (mnemonic, rest) = line
        .split_once(char::is_whitespace)
        .unwrap_or((line, ""));
    let operands: Vec<&str> = rest.split(',').map(str::trim).collect();

    match mnemonic {
        "add" => encode_r(operands, 0b000, 0b0000000, OP),
        "sub" => encode_r(operands, 0b000, 0b0100000, OP),
        "addi" => encode_i_reg_reg_imm(operands, 0b000, OP_IMM),
        "jalr" => encode_jalr(operands),
        "lw" => encode_i_offset(operands, 0b010, LOAD),
        "sw" => encode_s(operands),
        "bne" => encode_b(operands, 0b001, pc, labels),
        "beq" => encode_b(operands, 0b000, pc, labels),
        _ => Err(AssemblerSyntax::NoMatchingPattern(line.to_string())),
    }
}

fn regnum(name: &str) -> Result<u8, AssemblerSyntax> {
    let name = name.trim();
    let digits = name
        .strip_prefix('x')
        .ok_or_else(|| AssemblerSyntax::BadRegister(name.to_string()))?;
    let n: u8 = digits
        .parse()
        .map_err(|_| AssemblerSyntax::BadRegister(name.to_string()))?;
    if n > 31 {
        return Err(AssemblerSyntax::BadRegister(name.to_string()));
    }
    Ok(n)
}

fn parse_imm(text: &str) -> Result<i32, AssemblerSyntax> {
    text.trim()
        .parse()
        .map_err(|_| AssemblerSyntax::BadRegister(text.to_string()))
}

/// Splits `"imm(reg)"` into its immediate and register parts.
fn split_offset(operand: &str) -> Result<(i32, u8), AssemblerSyntax> {
    let open = operand
        .find('(')
        .ok_or_else(|| AssemblerSyntax::NoMatchingPattern(operand.to_string()))?;
    let close = operand
        .find(')')
        .ok_or_else(|| AssemblerSyntax::NoMatchingPattern(operand.to_string()))?;
    let imm = parse_imm(&operand[..open])?;
    let reg = regnum(&operand[open + 1..close])?;
    Ok((imm, reg))
}

fn encode_r(operands: Vec<&str>, f3: u32, f7: u32, opcode: u32) -> Result<u32, AssemblerSyntax> {
    let [rd, rs1, rs2] = operands[..] else {
        return Err(AssemblerSyntax::NoMatchingPattern(operands.join(",")));
    };
    let rd = regnum(rd)? as u32;
    let rs1 = regnum(rs1)? as u32;
    let rs2 = regnum(rs2)? as u32;
    Ok((f7 << 25) | (rs2 << 20) | (rs1 << 15) | (f3 << 12) | (rd << 7) | opcode)
}

fn pack_i(rd: u32, rs1: u32, f3: u32, imm: i32, opcode: u32) -> u32 {
    (((imm as u32) & 0xFFF) << 20) | (rs1 << 15) | (f3 << 12) | (rd << 7) | opcode
}

fn encode_i_reg_reg_imm(
    operands: Vec<&str>,
    f3: u32,
    opcode: u32,
) -> Result<u32, AssemblerSyntax> {
    let [rd, rs1, imm] = operands[..] else {
        return Err(AssemblerSyntax::NoMatchingPattern(operands.join(",")));
    };
    let rd = regnum(rd)? as u32;
    let rs1 = regnum(rs1)? as u32;
    let imm = parse_imm(imm)?;
    Ok(pack_i(rd, rs1, f3, imm, opcode))
}

fn encode_i_offset(operands: Vec<&str>, f3: u32, opcode: u32) -> Result<u32, AssemblerSyntax> {
    let [rd, offset] = operands[..] else {
        return Err(AssemblerSyntax::NoMatchingPattern(operands.join(",")));
    };
    let rd = regnum(rd)? as u32;
    let (imm, rs1) = split_offset(offset)?;
    Ok(pack_i(rd, rs1 as u32, f3, imm, opcode))
}

/// `jalr` accepts both `jalr rd,rs1,imm` and `jalr rd,imm(rs1)`.
fn encode_jalr(operands: Vec<&str>) -> Result<u32, AssemblerSyntax> {
    match operands[..] {
        [rd, rs1, imm] => {
            let rd = regnum(rd)? as u32;
            let rs1 = regnum(rs1)? as u32;
            let imm = parse_imm(imm)?;
            Ok(pack_i(rd, rs1, 0b000, imm, JALR))
        }
        [rd, offset] => {
            let rd = regnum(rd)? as u32;
            let (imm, rs1) = split_offset(offset)?;
            Ok(pack_i(rd, rs1 as u32, 0b000, imm, JALR))
        }
        _ => Err(AssemblerSyntax::NoMatchingPattern(operands.join(","))),
    }
}

fn encode_s(operands: Vec<&str>) -> Result<u32, AssemblerSyntax> {
    let [rs2, offset] = operands[..] else {
        return Err(AssemblerSyntax::NoMatchingPattern(operands.join(",")));
    };
    let rs2 = regnum(rs2)? as u32;
    let (imm, rs1) = split_offset(offset)?;
    let imm = (imm as u32) & 0xFFF;
    Ok(((imm & 0xFE0) << 20)
        | (rs2 << 20)
        | ((rs1 as u32) << 15)
        | (0b010 << 12)
        | ((imm & 0x1F) << 7)
        | STORE)
}

fn encode_b(
    operands: Vec<&str>,
    f3: u32,
    pc: u32,
    labels: &HashMap<String, u32>,
) -> Result<u32, AssemblerSyntax> {
    let [rs1, rs2, label] = operands[..] else {
        return Err(AssemblerSyntax::NoMatchingPattern(operands.join(",")));
    };
    let rs1 = regnum(rs1)? as u32;
    let rs2 = regnum(rs2)? as u32;
    let target = *labels
        .get(label)
        .ok_or_else(|| AssemblerSyntax::UndefinedLabel(label.to_string()))?;
    let offset = target.wrapping_sub(pc);
    let imm = offset & 0x1FFF;
    Ok(((imm & 0x1000) << 19)
        | ((imm & 0x7E0) << 20)
        | ((imm & 0x1E) << 7)
        | ((imm & 0x800) >> 4)
        | (rs2 << 20)
        | (rs1 << 15)
        | (f3 << 12)
        | BRANCH)
}
