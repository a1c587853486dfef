//! SPIR-V binary form: grammar ([`spec`]), decoding ([`read`]) and the
//! decoded instruction representation.

// NOTE(eddyb) all the modules are declared here, but they're documented "inside"
// (i.e. using inner doc comments).
pub mod read;
pub mod spec;

use smallvec::SmallVec;
use std::num::NonZeroU32;

/// SPIR-V `<id>` (a module-wide numeric handle, never `0`).
pub type Id = NonZeroU32;

/// A decoded SPIR-V instruction: the opcode "tag", its optional result type
/// and result `<id>`s, and every other operand in grammar order.
///
/// The opcode's [`spec::InstructionDef`] fully determines which shapes the
/// operands can take, so code consuming an `Inst` dispatches on `opcode` and
/// matches on [`Operand`]s, instead of needing one type per instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct Inst {
    pub opcode: spec::Opcode,

    pub result_type_id: Option<Id>,
    pub result_id: Option<Id>,

    pub operands: SmallVec<[Operand; 4]>,
}

impl Inst {
    pub fn new(opcode: spec::Opcode) -> Self {
        Self { opcode, result_type_id: None, result_id: None, operands: SmallVec::new() }
    }

    /// Iterate over all the `<id>`s referenced by the operands (excluding
    /// the result type and result `<id>`s), including nested ones.
    pub fn referenced_ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.operands.iter().flat_map(Operand::ids)
    }

    /// Get the bit width of an `OpTypeInt`/`OpTypeFloat` instruction.
    pub fn int_or_float_type_bit_width(&self) -> Option<u32> {
        let wk = &spec::Spec::get().well_known;
        if ![wk.OpTypeInt, wk.OpTypeFloat].contains(&self.opcode) {
            return None;
        }
        match self.operands.first()? {
            &Operand::LiteralInteger(width) => Some(width),
            _ => None,
        }
    }

    /// Get the signedness of an `OpTypeInt` instruction.
    pub fn int_type_signedness(&self) -> Option<bool> {
        if self.opcode != spec::Spec::get().well_known.OpTypeInt {
            return None;
        }
        match self.operands.get(1)? {
            &Operand::LiteralInteger(signedness) => Some(signedness != 0),
            _ => None,
        }
    }
}

/// One decoded operand (see also [`spec::OperandKindDef`]).
#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    /// `<id>` reference (`IdRef`, or any other `Id`-category kind).
    Id(Id),

    /// One-word literal (`LiteralInteger`).
    LiteralInteger(u32),

    /// NUL-terminated string literal (`LiteralString`).
    LiteralString(String),

    /// Literal whose width and interpretation come from a type (e.g. the
    /// result type of `OpConstant`, or the selector type of `OpSwitch`).
    Number(Number),

    /// Instruction number in an extended instruction set (`OpExtInst`).
    ExtInstOpcode(u32),

    /// Opcode of the operation performed by `OpSpecConstantOp`, which is
    /// followed by the operands of that opcode.
    SpecConstantOpcode(spec::Opcode),

    /// Scalar enumerant, followed by its own parameters (if any).
    ValueEnum { kind: spec::OperandKind, value: u32, params: Vec<Operand> },

    /// Bitmask enumerant, as its set flags in bit order (empty for `None`).
    BitEnum { kind: spec::OperandKind, flags: SmallVec<[Flag; 2]> },

    /// Paired operands, from a repeated composite kind (e.g. `OpPhi`'s
    /// `PairIdRefIdRef`).
    Pair(Box<[Operand; 2]>),
}

impl Operand {
    fn ids(&self) -> Box<dyn Iterator<Item = Id> + '_> {
        match self {
            &Operand::Id(id) => Box::new(std::iter::once(id)),
            Operand::ValueEnum { params, .. } => Box::new(params.iter().flat_map(Operand::ids)),
            Operand::BitEnum { flags, .. } => {
                Box::new(flags.iter().flat_map(|flag| flag.params.iter().flat_map(Operand::ids)))
            }
            Operand::Pair(pair) => Box::new(pair.iter().flat_map(Operand::ids)),
            Operand::LiteralInteger(_)
            | Operand::LiteralString(_)
            | Operand::Number(_)
            | Operand::ExtInstOpcode(_)
            | Operand::SpecConstantOpcode(_) => Box::new(std::iter::empty()),
        }
    }

    /// Name of a scalar enumerant (e.g. `Function` for a `StorageClass`).
    pub fn value_enum_name(&self) -> Option<&'static str> {
        match *self {
            Operand::ValueEnum { kind, value, .. } => match kind.def() {
                spec::OperandKindDef::ValueEnum { variants } => Some(variants.get_named(value)?.0),
                _ => None,
            },
            _ => None,
        }
    }

    /// Bit pattern of a bitmask enumerant (reassembled from its flags).
    pub fn bit_enum_mask(&self) -> Option<u32> {
        match self {
            Operand::BitEnum { flags, .. } => {
                Some(flags.iter().fold(0, |mask, flag| mask | flag.bit.mask()))
            }
            _ => None,
        }
    }
}

/// One set flag of a bitmask enumerant, with its trailing parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Flag {
    pub bit: spec::BitIdx,
    pub params: Vec<Operand>,
}

impl Flag {
    pub fn name(&self, kind: spec::OperandKind) -> Option<&'static str> {
        match kind.def() {
            spec::OperandKindDef::BitEnum { bits, .. } => Some(bits.get_named(self.bit)?.0),
            _ => None,
        }
    }
}

/// Value of a `LiteralContextDependentNumber`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Number {
    /// Signed integer of `width` bits, sign-extended.
    Int { width: u32, value: i64 },

    /// Unsigned integer of `width` bits.
    UInt { width: u32, value: u64 },

    F32(f32),
    F64(f64),
}

/// Extract a string from the little-endian bytes of `words`, stopping at the
/// first `0` byte, and reporting how many words (including the terminator)
/// were consumed, or `None` if no terminating word was found.
pub fn extract_literal_string(words: &[u32]) -> Option<(Vec<u8>, usize)> {
    let end = words.iter().position(|&word| word.to_le_bytes()[3] == 0)?;
    let mut bytes: Vec<u8> = words[..=end].iter().flat_map(|word| word.to_le_bytes()).collect();
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes.truncate(len);
    Some((bytes, end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_string_stops_at_first_nul() {
        // "abcd" "ef\0\0"
        let words = [u32::from_le_bytes(*b"abcd"), u32::from_le_bytes(*b"ef\0\0"), 7];
        let (bytes, consumed) = extract_literal_string(&words).unwrap();
        assert_eq!(bytes, b"abcdef");
        assert_eq!(consumed, 2);
    }

    #[test]
    fn literal_string_needs_terminator() {
        assert_eq!(extract_literal_string(&[u32::from_le_bytes(*b"abcd")]), None);

        // A length multiple of 4 is followed by an all-zero word.
        let (bytes, consumed) = extract_literal_string(&[u32::from_le_bytes(*b"abcd"), 0]).unwrap();
        assert_eq!(bytes, b"abcd");
        assert_eq!(consumed, 2);
    }

    #[test]
    fn literal_string_discards_padding() {
        // Only the last byte decides termination, bytes after a NUL are ignored.
        let word = u32::from_le_bytes([b'x', 0, b'y', 0]);
        let (bytes, consumed) = extract_literal_string(&[word]).unwrap();
        assert_eq!(bytes, b"x");
        assert_eq!(consumed, 1);
    }
}
