//! Rendering a decoded [`Module`] as SPIR-V assembly text.
//!
//! Printing happens in two passes: the first picks the display text of every
//! `<id>` (and the width needed to align `%id = ` prefixes), the second emits
//! one line per instruction, in the logical layout order of a SPIR-V module.

use crate::module::{InstIdx, Module, ScopeKind};
use crate::spv::{self, spec};
use itertools::Itertools;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

mod highlight;

pub use highlight::{palettes, AnsiHighlighter, Highlighter, NoHighlight};

/// Output knobs (all off by default, i.e. plain aligned text with a header).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PrintOptions {
    /// Wrap tokens in ANSI color escapes (see [`AnsiHighlighter`]).
    pub highlight: bool,

    /// Print `<id>`s using their (debug or inferred) names, when available.
    pub inline_names: bool,

    /// Don't right-align the `%id = ` prefixes.
    pub no_indent: bool,

    /// Separate the logical sections (and functions) with blank lines.
    pub group: bool,

    /// Omit the `; SPIR-V` header comment.
    pub no_header: bool,
}

impl PrintOptions {
    pub fn highlighter(&self) -> &'static dyn Highlighter {
        if self.highlight { &AnsiHighlighter } else { &NoHighlight }
    }
}

/// Logical layout sections, in the order they must appear in a module.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Section {
    Capabilities,
    Extensions,
    ExtInstImports,
    MemoryModel,
    EntryPoints,
    ExecutionModes,
    DebugSources,
    DebugNames,
    ModuleProcessed,
    Annotations,
    Globals,
    FuncDecls,
    FuncDefs,
}

impl Section {
    fn of_module_level_inst(inst: &spv::Inst) -> Self {
        let wk = &spec::Spec::get().well_known;
        let opcode = inst.opcode;

        if opcode == wk.OpCapability {
            Section::Capabilities
        } else if opcode == wk.OpExtension {
            Section::Extensions
        } else if opcode == wk.OpExtInstImport {
            Section::ExtInstImports
        } else if opcode == wk.OpMemoryModel {
            Section::MemoryModel
        } else if opcode == wk.OpEntryPoint {
            Section::EntryPoints
        } else if [wk.OpExecutionMode, wk.OpExecutionModeId].contains(&opcode) {
            Section::ExecutionModes
        } else if [wk.OpString, wk.OpSource, wk.OpSourceContinued, wk.OpSourceExtension]
            .contains(&opcode)
        {
            Section::DebugSources
        } else if [wk.OpName, wk.OpMemberName].contains(&opcode) {
            Section::DebugNames
        } else if opcode == wk.OpModuleProcessed {
            Section::ModuleProcessed
        } else if opcode.def().category == spec::InstructionCategory::Annotation {
            Section::Annotations
        } else {
            Section::Globals
        }
    }
}

/// Printer for one [`Module`], see the module-level docs.
pub struct Printer<'a> {
    module: &'a Module,
    options: PrintOptions,
    highlighter: &'a dyn Highlighter,

    /// Display text (without the `%` sigil) of every `<id>` in the module.
    id_texts: FxHashMap<spv::Id, String>,

    /// Width of the widest `%id` that's the result of an instruction.
    result_id_width: usize,
}

impl<'a> Printer<'a> {
    pub fn new(module: &'a Module, options: &PrintOptions, highlighter: &'a dyn Highlighter) -> Self {
        let mut id_texts = FxHashMap::default();

        if options.inline_names {
            // Unnamed `<id>`s keep their numbers, so names can't take those.
            let mut taken: FxHashSet<String> = module
                .ids()
                .filter(|(_, def)| def.name.is_none())
                .map(|(id, _)| id.to_string())
                .collect();

            for (id, def) in module.ids() {
                let Some(name) = &def.name else { continue };
                let mut text = sanitize_name(name.as_str());
                if text.is_empty() {
                    text = id.to_string();
                }
                if taken.contains(&text) {
                    text = (1..)
                        .map(|n| format!("{text}_{n}"))
                        .find(|candidate| !taken.contains(candidate))
                        .unwrap_or_else(|| id.to_string());
                }
                taken.insert(text.clone());
                id_texts.insert(id, text);
            }
        }
        for (id, _) in module.ids() {
            id_texts.entry(id).or_insert_with(|| id.to_string());
        }

        let result_id_width = if options.no_indent {
            0
        } else {
            module
                .insts()
                .filter_map(|(_, inst)| Some(1 + id_texts[&inst.result_id?].len()))
                .max()
                .unwrap_or(0)
        };

        Self { module, options: *options, highlighter, id_texts, result_id_width }
    }

    fn id_text(&self, id: spv::Id) -> String {
        match self.id_texts.get(&id) {
            Some(text) => format!("%{text}"),
            None => format!("%{id}"),
        }
    }

    /// Group instructions into layout sections, with each function forming its
    /// own group (of either [`Section::FuncDecls`] or [`Section::FuncDefs`]).
    fn layout(&self) -> Vec<(Section, Vec<InstIdx>)> {
        let module = self.module;

        let mut module_level: Vec<_> = module
            .insts()
            .filter(|&(idx, _)| module.scope_of(idx) == Module::ROOT_SCOPE)
            .map(|(idx, inst)| (Section::of_module_level_inst(inst), idx))
            .collect();
        // Stable, so each section keeps the original relative order.
        module_level.sort_by_key(|&(section, _)| section);

        let mut layout: Vec<(Section, Vec<InstIdx>)> = module_level
            .into_iter()
            .group_by(|&(section, _)| section)
            .into_iter()
            .map(|(section, insts)| (section, insts.map(|(_, idx)| idx).collect()))
            .collect();

        let (decls, defs): (Vec<_>, Vec<_>) = module.functions().partition(|&func| {
            let func_def = module.scope(func);
            debug_assert_eq!(func_def.kind, ScopeKind::Function);
            func_def.children.is_empty()
        });
        layout.extend(decls.into_iter().map(|func| (Section::FuncDecls, module.function_insts(func))));
        layout.extend(defs.into_iter().map(|func| (Section::FuncDefs, module.function_insts(func))));

        layout
    }

    fn header(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let header = &self.module.header;
        let (major, minor) = header.version_major_minor();
        let (vendor, tool_version) = header.generator_vendor_and_version();
        let vendor = match generator_vendor_name(vendor) {
            Some(name) => name.to_string(),
            None => vendor.to_string(),
        };

        for line in [
            "; SPIR-V".to_string(),
            format!("; Version: {major}.{minor}"),
            format!("; Generator: {vendor}; {tool_version}"),
            format!("; Bound: {}", header.bound),
            format!("; Schema: {}", header.schema),
        ] {
            writeln!(out, "{}", self.highlighter.highlight_comment(&line))?;
        }
        Ok(())
    }

    fn inst(&self, inst: &spv::Inst, out: &mut dyn fmt::Write) -> fmt::Result {
        // Alignment is computed from the plain text, before highlighting.
        match inst.result_id {
            Some(result_id) => {
                let text = self.id_text(result_id);
                let padding = self.result_id_width.saturating_sub(text.len());
                write!(out, "{:padding$}{} = ", "", self.highlighter.highlight_id(&text))?;
            }
            None if self.result_id_width > 0 => {
                write!(out, "{:width$}", "", width = self.result_id_width + " = ".len())?;
            }
            None => {}
        }

        write!(out, "{}", inst.opcode.name())?;

        let mut tokens = vec![];
        if let Some(type_id) = inst.result_type_id {
            tokens.push(self.highlighter.highlight_id(&self.id_text(type_id)));
        }
        for operand in &inst.operands {
            self.operand(inst, operand, &mut tokens);
        }
        for token in tokens {
            write!(out, " {token}")?;
        }
        writeln!(out)
    }

    fn operand(&self, inst: &spv::Inst, operand: &spv::Operand, tokens: &mut Vec<String>) {
        let hl = self.highlighter;
        match operand {
            &spv::Operand::Id(id) => tokens.push(hl.highlight_id(&self.id_text(id))),
            spv::Operand::LiteralInteger(x) => tokens.push(hl.highlight_int(&x.to_string())),
            spv::Operand::LiteralString(s) => tokens.push(hl.highlight_string(&quote(s))),
            spv::Operand::Number(number) => tokens.push(hl.highlight_int(&match *number {
                spv::Number::Int { value, .. } => value.to_string(),
                spv::Number::UInt { value, .. } => value.to_string(),
                spv::Number::F32(x) => format!("{x:?}"),
                spv::Number::F64(x) => format!("{x:?}"),
            })),
            &spv::Operand::ExtInstOpcode(ext_opcode) => {
                // The set is always the first `<id>` operand of `OpExtInst`.
                let name = inst
                    .referenced_ids()
                    .next()
                    .and_then(|set_id| self.module.ext_inst_set(set_id))
                    .and_then(|set| set.instruction_name(ext_opcode));
                tokens.push(match name {
                    Some(name) => name.to_string(),
                    None => hl.highlight_int(&ext_opcode.to_string()),
                });
            }
            spv::Operand::SpecConstantOpcode(opcode) => {
                let name = opcode.name();
                tokens.push(name.strip_prefix("Op").unwrap_or(name).to_string());
            }
            spv::Operand::ValueEnum { value, params, .. } => {
                tokens.push(match operand.value_enum_name() {
                    Some(name) => name.to_string(),
                    None => hl.highlight_int(&value.to_string()),
                });
                for param in params {
                    self.operand(inst, param, tokens);
                }
            }
            &spv::Operand::BitEnum { kind, ref flags } => {
                let text = if flags.is_empty() {
                    match kind.def() {
                        spec::OperandKindDef::BitEnum { empty_name, .. } => empty_name.to_string(),
                        _ => "0".to_string(),
                    }
                } else {
                    flags
                        .iter()
                        .map(|flag| match flag.name(kind) {
                            Some(name) => name.to_string(),
                            None => format!("{:#x}", flag.bit.mask()),
                        })
                        .join("|")
                };
                tokens.push(text);
                for param in flags.iter().flat_map(|flag| &flag.params) {
                    self.operand(inst, param, tokens);
                }
            }
            spv::Operand::Pair(pair) => {
                for operand in pair.iter() {
                    self.operand(inst, operand, tokens);
                }
            }
        }
    }
}

impl fmt::Display for Printer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.options.no_header {
            self.header(f)?;
        }

        let mut prev_section = None;
        for (section, insts) in self.layout() {
            if self.options.group {
                let starts_function = matches!(section, Section::FuncDecls | Section::FuncDefs);
                if prev_section.is_some() && (prev_section != Some(section) || starts_function) {
                    writeln!(f)?;
                }
            }
            prev_section = Some(section);

            for idx in insts {
                self.inst(self.module.inst(idx), f)?;
            }
        }
        Ok(())
    }
}

/// Print `module` with the highlighter chosen by `options.highlight`.
pub fn print_module(module: &Module, options: &PrintOptions) -> String {
    Printer::new(module, options, options.highlighter()).to_string()
}

/// Well-known values of the upper 16 bits of the header's generator word.
fn generator_vendor_name(vendor: u16) -> Option<&'static str> {
    Some(match vendor {
        0 => "Khronos",
        6 => "Khronos LLVM/SPIR-V Translator",
        7 => "Khronos SPIR-V Tools Assembler",
        8 => "Khronos Glslang Reference Front End",
        _ => return None,
    })
}

/// Replace every character outside `[A-Za-z0-9_.]` with `_`.
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '.' { c } else { '_' })
        .collect()
}

fn quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Header;

    fn id(x: u32) -> spv::Id {
        spv::Id::new(x).unwrap()
    }

    fn inst(name: &str, result_type_id: Option<u32>, result_id: Option<u32>, operands: Vec<spv::Operand>) -> spv::Inst {
        spv::Inst {
            result_type_id: result_type_id.map(id),
            result_id: result_id.map(id),
            operands: operands.into(),
            ..spv::Inst::new(spec::Spec::get().instructions.lookup(name).unwrap())
        }
    }

    fn build(insts: Vec<spv::Inst>) -> Module {
        let mut module = Module::new(Header::from_words([0x0001_0000, 0x0007_0000, 10, 0]));
        let mut scope = Module::ROOT_SCOPE;
        for inst in insts {
            crate::names::infer(&mut module, &inst).unwrap();
            for id in inst.result_type_id.into_iter().chain(inst.referenced_ids()) {
                module.get_or_create(id);
            }
            scope = module.append(inst, scope).unwrap();
        }
        module
    }

    fn capability(value: u32) -> spv::Operand {
        let kind = spec::Spec::get().well_known.Capability;
        spv::Operand::ValueEnum { kind, value, params: vec![] }
    }

    #[test]
    fn sections_are_reordered() {
        use spv::Operand::{Id, LiteralInteger, LiteralString};

        let module = build(vec![
            inst("OpTypeInt", None, Some(1), vec![LiteralInteger(32), LiteralInteger(0)]),
            inst("OpName", None, None, vec![Id(id(1)), LiteralString("x".into())]),
            inst("OpCapability", None, None, vec![capability(1)]),
        ]);
        let options = PrintOptions { no_header: true, ..Default::default() };
        assert_eq!(
            print_module(&module, &options),
            "     OpCapability Shader\n     OpName %1 \"x\"\n%1 = OpTypeInt 32 0\n"
        );

        let options = PrintOptions { no_header: true, no_indent: true, group: true, ..Default::default() };
        assert_eq!(
            print_module(&module, &options),
            "OpCapability Shader\n\nOpName %1 \"x\"\n\n%1 = OpTypeInt 32 0\n"
        );
    }

    #[test]
    fn names_are_sanitized_and_unique() {
        use spv::Operand::{Id, LiteralInteger, LiteralString};

        let module = build(vec![
            inst("OpName", None, None, vec![Id(id(2)), LiteralString("a b".into())]),
            inst("OpName", None, None, vec![Id(id(3)), LiteralString("a-b".into())]),
            inst("OpName", None, None, vec![Id(id(4)), LiteralString("5".into())]),
            inst("OpTypeInt", None, Some(1), vec![LiteralInteger(32), LiteralInteger(0)]),
            inst("OpUndef", Some(1), Some(2), vec![]),
            inst("OpUndef", Some(1), Some(3), vec![]),
            inst("OpUndef", Some(1), Some(4), vec![]),
            inst("OpUndef", Some(1), Some(5), vec![]),
        ]);
        let options = PrintOptions { no_header: true, inline_names: true, ..Default::default() };
        let text = print_module(&module, &options);
        let lines: Vec<_> = text.lines().skip(3).collect();
        assert_eq!(lines, [
            " %uint = OpTypeInt 32 0",
            "  %a_b = OpUndef %uint",
            "%a_b_1 = OpUndef %uint",
            "  %5_1 = OpUndef %uint",
            "    %5 = OpUndef %uint",
        ]);
    }

    #[test]
    fn header_comment() {
        let module = build(vec![]);
        assert_eq!(
            print_module(&module, &PrintOptions::default()),
            "; SPIR-V\n; Version: 1.0\n; Generator: Khronos SPIR-V Tools Assembler; 0\n; Bound: 10\n; Schema: 0\n"
        );
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(quote(r#"a"b\c"#), r#""a\"b\\c""#);
        assert_eq!(sanitize_name("foo.bar[0]"), "foo.bar_0_");
    }
}
