//! Helpers for building SPIR-V binaries by hand.

#![allow(dead_code)]

use spvdis::spv::spec;

/// Words for the instruction `name`, with the control word computed from
/// `operands` (which are everything after the control word).
pub fn op(name: &str, operands: &[u32]) -> Vec<u32> {
    let opcode = spec::Spec::get().instructions.lookup(name).unwrap();
    let control_word = ((operands.len() as u32 + 1) << 16) | u32::from(opcode.as_u16());
    [&[control_word][..], operands].concat()
}

/// Words of a `LiteralString` (NUL-terminated and zero-padded).
pub fn string_words(s: &str) -> Vec<u32> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.resize(bytes.len() / 4 * 4 + 4, 0);
    bytes.chunks(4).map(|c| u32::from_le_bytes(c.try_into().unwrap())).collect()
}

/// Value of the enumerant `name` of the operand kind `kind`.
pub fn enumerant(kind: &str, name: &str) -> u32 {
    let spec = spec::Spec::get();
    let kind = spec.operand_kinds.lookup(kind).unwrap();
    match kind.def() {
        spec::OperandKindDef::ValueEnum { variants } => variants.lookup(name).unwrap(),
        spec::OperandKindDef::BitEnum { empty_name, .. } if name == *empty_name => 0,
        spec::OperandKindDef::BitEnum { bits, .. } => bits.lookup(name).unwrap().mask(),
        _ => panic!("{} is not an enumerant kind", kind.name()),
    }
}

/// A whole module: header (SPIR-V 1.2, from the LLVM/SPIR-V translator)
/// followed by `insts`.
pub fn module_words(bound: u32, insts: &[Vec<u32>]) -> Vec<u32> {
    let header = [spec::Spec::get().magic, 0x0001_0200, 0x0006_000e, bound, 0];
    [&header[..], &insts.concat()[..]].concat()
}

pub fn le_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

pub fn be_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

/// Remove ANSI escape sequences (`ESC [ ... m`).
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            chars.by_ref().find(|&c| c == 'm');
        } else {
            out.push(c);
        }
    }
    out
}
