//! Driving the decode of a whole module (and, optionally, printing it).

use crate::module::{Header, Module, Scope};
use crate::print::{self, PrintOptions};
use crate::spv::read::{ByteOrder, InstParser, WordSource};
use crate::spv::{self, spec};
use crate::{names, Error, Result};
use std::io::{self, Read, Write};
use std::mem;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Keep going (with a warning) when `OpExtInstImport` names an extended
    /// instruction set without embedded grammar, instead of failing.
    ///
    /// `OpExtInst`s using such a set print their instruction numbers.
    pub allow_unknown_ext_inst_sets: bool,
}

/// Everything controlling [`disassemble`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    pub decode: DecodeOptions,
    pub print: PrintOptions,
}

enum State {
    ReadMagic,
    ReadHeader,
    DecodeLoop { module: Module, scope: Scope },
    Print(Module),
    Done(String),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::ReadMagic => "ReadMagic",
            State::ReadHeader => "ReadHeader",
            State::DecodeLoop { .. } => "DecodeLoop",
            State::Print(_) => "Print",
            State::Done(_) => "Done",
        }
    }
}

/// Decoder state machine, from the magic number to the printed text.
///
/// Any error is terminal: the methods driving the decode consume `self`.
pub struct Disassembler<R> {
    words: WordSource<R>,
    config: Config,
    state: State,

    /// Reused between instructions (word counts are 16-bit, so this is bounded).
    operand_words: Vec<u32>,
}

impl<R: Read> Disassembler<R> {
    pub fn new(reader: R, config: &Config) -> Self {
        Self {
            words: WordSource::new(reader),
            config: *config,
            state: State::ReadMagic,
            operand_words: vec![],
        }
    }

    /// Decode the whole input, stopping short of printing.
    pub fn decode(mut self) -> Result<Module> {
        loop {
            self.step()?;
            if let State::Print(_) = self.state {
                break;
            }
        }
        match self.state {
            State::Print(module) => Ok(module),
            _ => unreachable!(),
        }
    }

    /// Decode the whole input and print it, returning the text.
    pub fn run(mut self) -> Result<String> {
        loop {
            self.step()?;
            if let State::Done(_) = self.state {
                break;
            }
        }
        match self.state {
            State::Done(text) => Ok(text),
            _ => unreachable!(),
        }
    }

    fn step(&mut self) -> Result<()> {
        let prev_state = mem::replace(&mut self.state, State::ReadMagic);
        let prev_state_name = prev_state.name();

        let next_state = match prev_state {
            State::ReadMagic => {
                // An empty input is reported as a `0` magic number.
                let magic = self.words.next_word()?.ok_or(Error::InvalidMagicNumber(0))?;
                let byte_order =
                    ByteOrder::from_magic(magic).ok_or(Error::InvalidMagicNumber(magic))?;
                self.words.set_byte_order(byte_order);
                log::debug!("byte order: {byte_order:?}");
                State::ReadHeader
            }
            State::ReadHeader => {
                let mut header_words = [0; spec::HEADER_LEN - 1];
                for word in &mut header_words {
                    *word = self.words.next_word()?.ok_or(Error::TruncatedHeader)?;
                }
                let header = Header::from_words(header_words);
                let (major, minor) = header.version_major_minor();
                log::info!(
                    "SPIR-V {major}.{minor}, generator {:#010x}, bound {}",
                    header.generator,
                    header.bound
                );
                State::DecodeLoop { module: Module::new(header), scope: Module::ROOT_SCOPE }
            }
            State::DecodeLoop { mut module, scope } => {
                let offset = self.words.words_read() * 4;
                match self.inst(&mut module, scope) {
                    Ok(Some(scope)) => State::DecodeLoop { module, scope },
                    Ok(None) => {
                        log::info!(
                            "decoded {} instructions, {} <id>s",
                            module.len(),
                            module.ids().count()
                        );
                        State::Print(module)
                    }
                    Err(e) => {
                        log::error!("failed to decode instruction at byte offset {offset:#x}: {e}");
                        return Err(e);
                    }
                }
            }
            State::Print(module) => {
                State::Done(print::print_module(&module, &self.config.print))
            }
            state @ State::Done(_) => state,
        };

        if next_state.name() != prev_state_name {
            log::debug!("{prev_state_name} -> {}", next_state.name());
        }
        self.state = next_state;
        Ok(())
    }

    /// Decode the next instruction into `module`, returning the scope for the
    /// instruction after it, or `None` at the end of the input.
    fn inst(&mut self, module: &mut Module, scope: Scope) -> Result<Option<Scope>> {
        let offset = self.words.words_read() * 4;
        let Some(control_word) = self.words.next_word()? else {
            return Ok(None);
        };
        let (word_count, opcode) = ((control_word >> 16) as u16, control_word as u16);

        let (opcode, _, _) =
            spec::Opcode::try_from_u16_with_name_and_def(opcode).ok_or(Error::UnknownOpcode(opcode))?;
        if word_count == 0 {
            return Err(Error::InvalidWordCount(opcode.as_u16()));
        }
        if !self.words.read_words_into(&mut self.operand_words, usize::from(word_count) - 1)? {
            return Err(Error::TruncatedInstruction { opcode: opcode.as_u16(), word_count });
        }

        let inst = InstParser::new(module, opcode, word_count, &self.operand_words).inst()?;
        log::trace!("{offset:#x}: {inst:?}");

        names::infer(module, &inst)?;
        if inst.opcode == spec::Spec::get().well_known.OpExtInstImport {
            self.import_ext_inst_set(module, &inst)?;
        }

        module.append(inst, scope).map(Some)
    }

    fn import_ext_inst_set(&self, module: &mut Module, inst: &spv::Inst) -> Result<()> {
        let (Some(id), [spv::Operand::LiteralString(name)]) = (inst.result_id, &inst.operands[..])
        else {
            return Ok(());
        };

        let lowercase_name = name.to_ascii_lowercase();
        match spec::Spec::get().get_ext_inst_set_by_lowercase_name(&lowercase_name) {
            Some(set) => {
                log::debug!("%{id} imports extended instruction set {name:?}");
                module.import_ext_inst_set(id, set);
            }
            None if self.config.decode.allow_unknown_ext_inst_sets => {
                log::warn!("unsupported extended instruction set {name:?}, its instructions will be numbered");
            }
            None => return Err(Error::UnsupportedExtendedInstructionSet(name.clone())),
        }
        Ok(())
    }
}

/// Decode a SPIR-V module from `reader`.
pub fn decode(reader: impl Read, options: &DecodeOptions) -> Result<Module> {
    let config = Config { decode: *options, ..Config::default() };
    Disassembler::new(io::BufReader::new(reader), &config).decode()
}

/// Decode a SPIR-V module already in memory, as native-endian words.
pub fn decode_words(words: &[u32], options: &DecodeOptions) -> Result<Module> {
    let config = Config { decode: *options, ..Config::default() };
    Disassembler::new(bytemuck::cast_slice::<u32, u8>(words), &config).decode()
}

/// Decode a SPIR-V module from `reader` and write its text form to `writer`.
///
/// Nothing is written unless the whole module decodes successfully.
pub fn disassemble(reader: impl Read, mut writer: impl Write, config: &Config) -> Result<()> {
    let text = Disassembler::new(io::BufReader::new(reader), config).run()?;
    writer.write_all(text.as_bytes())?;
    writer.flush()?;
    Ok(())
}
