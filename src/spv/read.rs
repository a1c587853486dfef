//! Low-level parsing of SPIR-V binary form.

use crate::module::Module;
use crate::spv::{self, spec};
use crate::{Error, Result};
use smallvec::SmallVec;
use std::io::{self, Read};
use std::slice;

/// Byte order of the words in a SPIR-V stream (as detected from the magic).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Determine the byte order from the first word of a module, given as
    /// it would be read in little-endian byte order.
    pub fn from_magic(first_word_le: u32) -> Option<Self> {
        let magic = spec::Spec::get().magic;
        if first_word_le == magic {
            Some(Self::LittleEndian)
        } else if first_word_le.swap_bytes() == magic {
            Some(Self::BigEndian)
        } else {
            None
        }
    }

    pub fn word_from_bytes(self, bytes: [u8; 4]) -> u32 {
        match self {
            Self::LittleEndian => u32::from_le_bytes(bytes),
            Self::BigEndian => u32::from_be_bytes(bytes),
        }
    }
}

/// Presents a byte stream as a sequence of 32-bit words.
///
/// The byte order starts out as [`ByteOrder::LittleEndian`], and is meant to be
/// set once, right after the magic number is read (see [`ByteOrder::from_magic`]).
pub struct WordSource<R> {
    reader: R,
    byte_order: ByteOrder,
    byte_order_was_set: bool,

    /// Number of whole words returned so far.
    words_read: usize,
}

impl<R: Read> WordSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, byte_order: ByteOrder::default(), byte_order_was_set: false, words_read: 0 }
    }

    pub fn set_byte_order(&mut self, byte_order: ByteOrder) {
        debug_assert!(!self.byte_order_was_set, "WordSource: byte order set more than once");
        self.byte_order_was_set = true;
        self.byte_order = byte_order;
    }

    pub fn words_read(&self) -> usize {
        self.words_read
    }

    /// Read the next word, or `None` if the stream ended cleanly (i.e. not in
    /// the middle of a word).
    pub fn next_word(&mut self) -> Result<Option<u32>> {
        let mut bytes = [0; 4];
        let mut filled = 0;
        while filled < bytes.len() {
            match self.reader.read(&mut bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        match filled {
            0 => Ok(None),
            4 => {
                self.words_read += 1;
                Ok(Some(self.byte_order.word_from_bytes(bytes)))
            }
            trailing_bytes => Err(Error::TruncatedWord { trailing_bytes }),
        }
    }

    /// Replace the contents of `out` with the next `count` words, returning
    /// `false` if the stream ended before all of them could be read.
    pub fn read_words_into(&mut self, out: &mut Vec<u32>, count: usize) -> Result<bool> {
        out.clear();
        out.reserve(count);
        while out.len() < count {
            match self.next_word()? {
                Some(word) => out.push(word),
                None => return Ok(false),
            }
        }
        Ok(true)
    }
}

/// Opcodes `OpSpecConstantOp` can perform (`Shader` ones first, then the
/// ones only allowed with the `Kernel` capability).
///
/// None of them is `OpSpecConstantOp` itself, so inner operands never nest.
const SPEC_CONSTANT_OP_OPCODES: &[&str] = &[
    "OpSConvert",
    "OpUConvert",
    "OpFConvert",
    "OpSNegate",
    "OpNot",
    "OpIAdd",
    "OpISub",
    "OpIMul",
    "OpUDiv",
    "OpSDiv",
    "OpUMod",
    "OpSRem",
    "OpSMod",
    "OpShiftRightLogical",
    "OpShiftRightArithmetic",
    "OpShiftLeftLogical",
    "OpBitwiseOr",
    "OpBitwiseXor",
    "OpBitwiseAnd",
    "OpVectorShuffle",
    "OpCompositeExtract",
    "OpCompositeInsert",
    "OpLogicalOr",
    "OpLogicalAnd",
    "OpLogicalNot",
    "OpLogicalEqual",
    "OpLogicalNotEqual",
    "OpSelect",
    "OpIEqual",
    "OpINotEqual",
    "OpULessThan",
    "OpSLessThan",
    "OpUGreaterThan",
    "OpSGreaterThan",
    "OpULessThanEqual",
    "OpSLessThanEqual",
    "OpUGreaterThanEqual",
    "OpSGreaterThanEqual",
    "OpQuantizeToF16",
    "OpConvertFToS",
    "OpConvertSToF",
    "OpConvertFToU",
    "OpConvertUToF",
    "OpConvertPtrToU",
    "OpConvertUToPtr",
    "OpGenericCastToPtr",
    "OpPtrCastToGeneric",
    "OpBitcast",
    "OpFNegate",
    "OpFAdd",
    "OpFSub",
    "OpFMul",
    "OpFDiv",
    "OpFRem",
    "OpFMod",
    "OpAccessChain",
    "OpInBoundsAccessChain",
    "OpPtrAccessChain",
    "OpInBoundsPtrAccessChain",
];

/// Decoder for the operands of a single instruction, reading from the words
/// following its control word, and recording `<id>`s into a [`Module`].
pub struct InstParser<'a> {
    wk: &'static spec::WellKnown,

    /// Module being decoded, used to create `<id>`s and look up types.
    module: &'a mut Module,

    /// Control word fields (for error reporting).
    opcode: spec::Opcode,
    word_count: u16,

    /// Operand words of the instruction (i.e. excluding the control word).
    words: slice::Iter<'a, u32>,

    /// Output instruction, being parsed.
    inst: spv::Inst,
}

impl<'a> InstParser<'a> {
    pub fn new(
        module: &'a mut Module,
        opcode: spec::Opcode,
        word_count: u16,
        operand_words: &'a [u32],
    ) -> Self {
        Self {
            wk: &spec::Spec::get().well_known,
            module,
            opcode,
            word_count,
            words: operand_words.iter(),
            inst: spv::Inst::new(opcode),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.words.len() == 0
    }

    fn next_word(&mut self) -> Result<u32> {
        self.words.next().copied().ok_or(Error::WordCountMismatch {
            opcode: self.opcode.as_u16(),
            word_count: self.word_count,
        })
    }

    /// Decode an `<id>` operand, registering it with the module.
    pub fn id(&mut self) -> Result<spv::Id> {
        let id = spv::Id::new(self.next_word()?).ok_or(Error::IdZero)?;
        Ok(self.module.get_or_create(id))
    }

    pub fn literal_integer(&mut self) -> Result<u32> {
        self.next_word()
    }

    pub fn literal_string(&mut self) -> Result<String> {
        let (bytes, word_count) =
            spv::extract_literal_string(self.words.as_slice()).ok_or(Error::WordCountMismatch {
                opcode: self.opcode.as_u16(),
                word_count: self.word_count,
            })?;
        self.words.nth(word_count - 1);

        Ok(String::from_utf8(bytes).unwrap_or_else(|e| {
            log::warn!("{}: literal string is not valid UTF-8: {e}", self.opcode.name());
            String::from_utf8_lossy(e.as_bytes()).into_owned()
        }))
    }

    /// Decode a number whose width and interpretation come from `type_id`,
    /// which must be an already defined `OpTypeInt` or `OpTypeFloat`.
    pub fn context_dependent_number(&mut self, type_id: spv::Id) -> Result<spv::Number> {
        let (is_float, width, signed) = {
            let ty = self.module.resolve(type_id)?;
            let width = ty.int_or_float_type_bit_width().ok_or(Error::UnsupportedLiteralType {
                type_id,
                opcode: ty.opcode.name(),
            })?;
            (ty.opcode == self.wk.OpTypeFloat, width, ty.int_type_signedness().unwrap_or(false))
        };

        match (is_float, width) {
            (false, 8 | 16 | 32 | 64) | (true, 32 | 64) => {}
            _ => return Err(Error::UnsupportedLiteralWidth(width)),
        }

        // Multi-word literals have their low-order word first.
        let low = self.next_word()?;
        let bits = if width > 32 { u64::from(self.next_word()?) << 32 | u64::from(low) } else { u64::from(low) };

        Ok(match (is_float, width) {
            (true, 32) => spv::Number::F32(f32::from_bits(low)),
            (true, _) => spv::Number::F64(f64::from_bits(bits)),
            (false, _) if signed => {
                let unused_bits = 64 - width;
                spv::Number::Int { width, value: ((bits << unused_bits) as i64) >> unused_bits }
            }
            (false, _) => {
                let mask = u64::MAX >> (64 - width);
                spv::Number::UInt { width, value: bits & mask }
            }
        })
    }

    /// Find the type for a `LiteralContextDependentNumber` operand: the
    /// result type (e.g. `OpConstant`), or the type of the first operand
    /// (`OpSwitch`'s selector).
    fn contextual_type(&self) -> Result<spv::Id> {
        if let Some(type_id) = self.inst.result_type_id {
            return Ok(type_id);
        }
        let selector = match self.inst.operands.first() {
            Some(&spv::Operand::Id(id)) => id,
            _ => {
                return Err(Error::WordCountMismatch {
                    opcode: self.opcode.as_u16(),
                    word_count: self.word_count,
                });
            }
        };
        let selector_def = self.module.resolve(selector)?;
        selector_def.result_type_id.ok_or(Error::UnsupportedLiteralType {
            type_id: selector,
            opcode: selector_def.opcode.name(),
        })
    }

    fn enumerant_params(&mut self, enumerant: &spec::Enumerant) -> Result<Vec<spv::Operand>> {
        enumerant.params.iter().map(|&kind| self.operand(kind)).collect()
    }

    /// Decode one operand of kind `kind` (including any enumerant parameters).
    pub fn operand(&mut self, kind: spec::OperandKind) -> Result<spv::Operand> {
        let unknown_enumerant = |code| Error::UnknownEnumerant { kind: kind.name(), code };

        Ok(match kind.def() {
            spec::OperandKindDef::BitEnum { bits, .. } => {
                let word = self.next_word()?;
                let mut flags = SmallVec::new();
                for bit in spec::BitIdx::of_all_set_bits(word) {
                    let (_, bit_def) = bits.get_named(bit).ok_or_else(|| unknown_enumerant(word))?;
                    flags.push(spv::Flag { bit, params: self.enumerant_params(bit_def)? });
                }
                spv::Operand::BitEnum { kind, flags }
            }

            spec::OperandKindDef::ValueEnum { variants } => {
                let value = self.next_word()?;
                let variant_def = variants.get(value).ok_or_else(|| unknown_enumerant(value))?;
                spv::Operand::ValueEnum { kind, value, params: self.enumerant_params(variant_def)? }
            }

            spec::OperandKindDef::Id => spv::Operand::Id(self.id()?),

            spec::OperandKindDef::Literal { size: spec::LiteralSize::Word } => {
                let word = self.literal_integer()?;
                if kind == self.wk.LiteralExtInstInteger {
                    spv::Operand::ExtInstOpcode(word)
                } else if kind == self.wk.LiteralSpecConstantOpInteger {
                    let inner_opcode = u16::try_from(word)
                        .ok()
                        .and_then(spec::Opcode::try_from_u16_with_name_and_def)
                        .filter(|(_, name, _)| SPEC_CONSTANT_OP_OPCODES.contains(name))
                        .ok_or(Error::InvalidSpecConstantOpcode(word))?
                        .0;
                    spv::Operand::SpecConstantOpcode(inner_opcode)
                } else {
                    spv::Operand::LiteralInteger(word)
                }
            }
            spec::OperandKindDef::Literal { size: spec::LiteralSize::NulTerminated } => {
                spv::Operand::LiteralString(self.literal_string()?)
            }
            spec::OperandKindDef::Literal { size: spec::LiteralSize::FromContextualType } => {
                let type_id = self.contextual_type()?;
                spv::Operand::Number(self.context_dependent_number(type_id)?)
            }
        })
    }

    fn push_operand(&mut self, kind: spec::OperandKind) -> Result<()> {
        let operand = self.operand(kind)?;
        let inner_opcode = match operand {
            spv::Operand::SpecConstantOpcode(inner_opcode) => Some(inner_opcode),
            _ => None,
        };
        self.inst.operands.push(operand);

        // `OpSpecConstantOp` is followed by the operands of the opcode it
        // names (but not its result type and result `<id>`).
        if let Some(inner_opcode) = inner_opcode {
            self.operands(inner_opcode.def())?;
        }
        Ok(())
    }

    fn operands(&mut self, def: &'static spec::InstructionDef) -> Result<()> {
        for &kind in &def.req_operands {
            self.push_operand(kind)?;
        }
        for &kind in &def.opt_operands {
            if self.is_exhausted() {
                return Ok(());
            }
            self.push_operand(kind)?;
        }
        match def.rest_operands {
            None => {}
            Some(spec::RestOperandsUnit::One(kind)) => {
                while !self.is_exhausted() {
                    self.push_operand(kind)?;
                }
            }
            Some(spec::RestOperandsUnit::Two([a_kind, b_kind])) => {
                while !self.is_exhausted() {
                    let a = self.operand(a_kind)?;
                    let b = self.operand(b_kind)?;
                    self.inst.operands.push(spv::Operand::Pair(Box::new([a, b])));
                }
            }
        }
        Ok(())
    }

    /// Decode the whole instruction, per its grammar.
    pub fn inst(mut self) -> Result<spv::Inst> {
        let def = self.opcode.def();

        if def.has_result_type_id {
            self.inst.result_type_id = Some(self.id()?);
        }
        if def.has_result_id {
            self.inst.result_id = Some(self.id()?);
        }

        self.operands(def)?;

        // The instruction must consume its entire word count.
        if !self.is_exhausted() {
            return Err(Error::ExcessOperandWords {
                opcode: self.opcode.as_u16(),
                count: self.words.len(),
            });
        }

        Ok(self.inst)
    }
}
