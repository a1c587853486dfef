//! Decoding SPIR-V binary modules into an in-memory [`Module`], and printing
//! them as human-readable assembly text.
//!
//! The grammar (opcodes, operand kinds, enumerants) is entirely data-driven,
//! loaded from the Khronos `*.grammar.json` files embedded at build time
//! (see [`spv::spec`]), and [`spv::read::InstParser`] interprets it generically.
//!
//! Typical usage goes through [`disassemble`] (or [`decode`] followed by
//! [`print::Printer`], when the [`Module`] itself is also needed):
//!
//! ```no_run
//! let input = std::fs::File::open("shader.spv")?;
//! let mut text = vec![];
//! spvdis::disassemble(input, &mut text, &spvdis::Config::default())?;
//! # Ok::<(), spvdis::Error>(())
//! ```

pub mod disassemble;
mod error;
pub mod module;
pub mod names;
pub mod print;
pub mod spv;

pub use disassemble::{decode, decode_words, disassemble, Config, DecodeOptions};
pub use error::{Error, Result};
pub use module::Module;
pub use print::PrintOptions;

type FxIndexMap<K, V> =
    indexmap::IndexMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;
