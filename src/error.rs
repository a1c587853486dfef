use crate::spv;
use std::io;

/// Every way decoding (and disassembling) a SPIR-V module can fail.
///
/// All of these are fatal: the decode is aborted and no output is produced.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid magic number {0:#010x} (not a SPIR-V module)")]
    InvalidMagicNumber(u32),
    #[error("stream ends with {trailing_bytes} byte(s) that do not form a whole word")]
    TruncatedWord { trailing_bytes: usize },
    #[error("stream ends inside the module header")]
    TruncatedHeader,

    #[error("unknown opcode {0}")]
    UnknownOpcode(u16),
    #[error("invalid word count 0 for opcode {0}")]
    InvalidWordCount(u16),
    #[error("opcode {opcode} needs more operands than its word count {word_count} allows")]
    WordCountMismatch { opcode: u16, word_count: u16 },
    #[error("stream ends inside opcode {opcode} (declared word count {word_count})")]
    TruncatedInstruction { opcode: u16, word_count: u16 },
    #[error("opcode {opcode} has {count} word(s) left over after its operands")]
    ExcessOperandWords { opcode: u16, count: usize },

    #[error("{0:#x} is not an opcode `OpSpecConstantOp` can perform")]
    InvalidSpecConstantOpcode(u32),

    #[error("unknown {kind} enumerant {code:#x}")]
    UnknownEnumerant { kind: &'static str, code: u32 },
    #[error("unsupported literal width {0}")]
    UnsupportedLiteralWidth(u32),
    #[error("%{type_id} (defined by {opcode}) is not a numeric literal type")]
    UnsupportedLiteralType { type_id: spv::Id, opcode: &'static str },

    #[error("ID %0 is illegal")]
    IdZero,
    #[error("ID %{0} is used but never defined")]
    UnresolvedIdentifier(spv::Id),
    #[error("ID %{0} is the result of multiple instructions")]
    DuplicateDefinition(spv::Id),

    #[error("unsupported extended instruction set {0:?}")]
    UnsupportedExtendedInstructionSet(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
