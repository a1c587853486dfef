mod common;

use common::{be_bytes, enumerant, le_bytes, module_words, op, string_words};
use smallvec::SmallVec;
use spvdis::spv::{self, spec};
use spvdis::{DecodeOptions, Error, Module, PrintOptions};

fn id(x: u32) -> spv::Id {
    spv::Id::new(x).unwrap()
}

fn decode_bytes(bytes: &[u8]) -> spvdis::Result<Module> {
    spvdis::decode(bytes, &DecodeOptions::default())
}

#[test]
fn single_capability() {
    #[rustfmt::skip]
    let bytes = [
        0x03, 0x02, 0x23, 0x07,
        0x00, 0x00, 0x01, 0x00,
        0x00, 0x00, 0x00, 0x00,
        0x01, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00,
        0x11, 0x00, 0x02, 0x00,
        0x01, 0x00, 0x00, 0x00,
    ];
    let module = decode_bytes(&bytes).unwrap();
    assert_eq!(module.len(), 1);
    assert_eq!(module.header.bound, 1);

    let (_, inst) = module.insts().next().unwrap();
    assert_eq!(inst.opcode.name(), "OpCapability");
    assert_eq!(inst.operands[0].value_enum_name(), Some("Shader"));
}

#[test]
fn unknown_opcode() {
    let words = module_words(1, &[vec![(1 << 16) | 9999]]);
    assert!(matches!(decode_bytes(&le_bytes(&words)), Err(Error::UnknownOpcode(9999))));
}

#[test]
fn word_count_below_grammar_minimum() {
    // `OpTypeInt %1 32` is missing its signedness.
    let inst = op("OpTypeInt", &[1, 32]);
    let opcode = inst[0] as u16;
    let words = module_words(2, &[inst]);
    assert!(matches!(
        decode_bytes(&le_bytes(&words)),
        Err(Error::WordCountMismatch { opcode: o, word_count: 3 }) if o == opcode
    ));

    // `OpEntryPoint` cut off inside its name string.
    let mut inst = op("OpEntryPoint", &[&[0, 1][..], &string_words("main_function")[..]].concat());
    inst.truncate(inst.len() - 1);
    inst[0] -= 1 << 16;
    let words = module_words(2, &[inst]);
    assert!(matches!(decode_bytes(&le_bytes(&words)), Err(Error::WordCountMismatch { .. })));
}

#[test]
fn signed_constant_minus_one() {
    let words = module_words(3, &[op("OpTypeInt", &[1, 32, 1]), op("OpConstant", &[1, 2, 0xffff_ffff])]);
    let module = decode_bytes(&le_bytes(&words)).unwrap();
    let constant = module.resolve(id(2)).unwrap();
    assert_eq!(constant.operands[..], [spv::Operand::Number(spv::Number::Int { width: 32, value: -1 })]);
}

#[test]
fn memory_access_consumes_no_params() {
    let words = module_words(4, &[
        op("OpTypeInt", &[1, 32, 0]),
        op("OpUndef", &[1, 2]),
        op("OpStore", &[3, 2, 0x5]),
        op("OpNop", &[]),
    ]);
    let module = decode_bytes(&le_bytes(&words)).unwrap();
    assert_eq!(module.len(), 4);

    let (_, store) = module.insts().nth(2).unwrap();
    let spv::Operand::BitEnum { kind, flags } = &store.operands[2] else { panic!() };
    let names: Vec<_> = flags.iter().map(|flag| flag.name(*kind).unwrap()).collect();
    assert_eq!(names, ["Volatile", "Nontemporal"]);
    assert!(flags.iter().all(|flag| flag.params.is_empty()));
}

#[test]
fn byte_orders_decode_identically() {
    let words = module_words(4, &[
        op("OpCapability", &[enumerant("Capability", "Kernel")]),
        op("OpExtInstImport", &[&[1][..], &string_words("OpenCL.std")[..]].concat()),
        op("OpTypeInt", &[2, 64, 1]),
        op("OpConstant", &[2, 3, 0xffff_fff0, 0xffff_ffff]),
    ]);
    let le = decode_bytes(&le_bytes(&words)).unwrap();
    let be = decode_bytes(&be_bytes(&words)).unwrap();
    let native = spvdis::decode_words(&words, &DecodeOptions::default()).unwrap();

    for module in [&be, &native] {
        assert_eq!(module.header, le.header);
        assert!(module.insts().map(|(_, inst)| inst).eq(le.insts().map(|(_, inst)| inst)));
    }
    assert_eq!(
        le.resolve(id(3)).unwrap().operands[0],
        spv::Operand::Number(spv::Number::Int { width: 64, value: -16 })
    );

    let options = PrintOptions { inline_names: true, ..Default::default() };
    assert_eq!(spvdis::print::print_module(&le, &options), spvdis::print::print_module(&be, &options));
}

#[test]
fn literal_strings_in_both_byte_orders() {
    for s in ["", "a", "abc", "abcd", "main_function", "with \"quotes\""] {
        let words = module_words(2, &[op("OpString", &[&[1][..], &string_words(s)[..]].concat())]);
        for bytes in [le_bytes(&words), be_bytes(&words)] {
            let module = decode_bytes(&bytes).unwrap();
            let inst = module.resolve(id(1)).unwrap();
            assert_eq!(inst.operands[..], [spv::Operand::LiteralString(s.to_string())]);
        }
    }
}

#[test]
fn invalid_utf8_is_replaced() {
    let word = u32::from_le_bytes([b'a', 0xff, b'b', 0]);
    let words = module_words(2, &[op("OpString", &[1, word])]);
    let module = decode_bytes(&le_bytes(&words)).unwrap();
    let inst = module.resolve(id(1)).unwrap();
    assert_eq!(inst.operands[..], [spv::Operand::LiteralString("a\u{fffd}b".to_string())]);
}

#[test]
fn names_are_deterministic_and_op_name_wins() {
    let storage_class = enumerant("StorageClass", "Function");
    let words = module_words(6, &[
        op("OpName", &[&[2][..], &string_words("index")[..]].concat()),
        op("OpTypeInt", &[1, 32, 0]),
        op("OpTypeInt", &[2, 32, 1]),
        op("OpTypeVector", &[3, 1, 4]),
        op("OpTypePointer", &[4, storage_class, 3]),
        op("OpName", &[&[1][..], &string_words("u32")[..]].concat()),
    ]);
    let bytes = le_bytes(&words);

    let first = decode_bytes(&bytes).unwrap();
    let second = decode_bytes(&bytes).unwrap();
    for module in [&first, &second] {
        assert_eq!(module.name(id(1)), Some("u32"));
        assert_eq!(module.name(id(2)), Some("index"));
        // Names are taken when the type is defined (before the later `OpName`).
        assert_eq!(module.name(id(3)), Some("v4uint"));
        assert_eq!(module.name(id(4)), Some("_ptr_Function_v4uint"));
    }
}

#[test]
fn forward_references_resolve_later() {
    let words = module_words(4, &[
        op("OpDecorate", &[3, enumerant("Decoration", "Restrict")]),
        op("OpTypeInt", &[1, 32, 0]),
        op("OpUndef", &[1, 3]),
    ]);
    let module = decode_bytes(&le_bytes(&words)).unwrap();
    assert_eq!(module.resolve(id(3)).unwrap().opcode.name(), "OpUndef");
}

#[test]
fn undefined_literal_type() {
    let words = module_words(3, &[op("OpConstant", &[1, 2, 0])]);
    assert!(matches!(decode_bytes(&le_bytes(&words)), Err(Error::UnresolvedIdentifier(x)) if x == id(1)));
}

#[test]
fn duplicate_result_ids() {
    let words = module_words(2, &[op("OpTypeVoid", &[1]), op("OpTypeBool", &[1])]);
    assert!(matches!(decode_bytes(&le_bytes(&words)), Err(Error::DuplicateDefinition(x)) if x == id(1)));
}

/// Words encoding one operand of kind `kind` (in a context where `%1` is a
/// 32-bit signed integer type and `%3` a value of that type), and the
/// operands decoding should produce.
fn synthetic_operand(kind: spec::OperandKind, words: &mut Vec<u32>, expected: &mut Vec<spv::Operand>) {
    let wk = &spec::Spec::get().well_known;
    match kind.def() {
        spec::OperandKindDef::Id => {
            words.push(3);
            expected.push(spv::Operand::Id(id(3)));
        }
        spec::OperandKindDef::ValueEnum { variants } => {
            let (value, _, variant_def) = variants.iter().next().unwrap();
            words.push(value);
            let mut params = vec![];
            for &param_kind in &variant_def.params {
                synthetic_operand(param_kind, words, &mut params);
            }
            expected.push(spv::Operand::ValueEnum { kind, value, params });
        }
        spec::OperandKindDef::BitEnum { .. } => {
            words.push(0);
            expected.push(spv::Operand::BitEnum { kind, flags: SmallVec::new() });
        }
        spec::OperandKindDef::Literal { size: spec::LiteralSize::Word } => {
            if kind == wk.LiteralExtInstInteger {
                words.push(0);
                expected.push(spv::Operand::ExtInstOpcode(0));
            } else if kind == wk.LiteralSpecConstantOpInteger {
                let iadd = spec::Spec::get().instructions.lookup("OpIAdd").unwrap();
                words.extend([u32::from(iadd.as_u16()), 3, 3]);
                expected.extend([
                    spv::Operand::SpecConstantOpcode(iadd),
                    spv::Operand::Id(id(3)),
                    spv::Operand::Id(id(3)),
                ]);
            } else {
                words.push(7);
                expected.push(spv::Operand::LiteralInteger(7));
            }
        }
        spec::OperandKindDef::Literal { size: spec::LiteralSize::NulTerminated } => {
            // Also a supported `OpExtInstImport` name.
            words.extend(string_words("OpenCL.std"));
            expected.push(spv::Operand::LiteralString("OpenCL.std".to_string()));
        }
        spec::OperandKindDef::Literal { size: spec::LiteralSize::FromContextualType } => {
            words.push(5);
            expected.push(spv::Operand::Number(spv::Number::Int { width: 32, value: 5 }));
        }
    }
}

/// Encode every operand `def` can take: required ones, all optional ones,
/// and one repetition of the variadic tail (if any).
fn synthetic_operands(def: &spec::InstructionDef, words: &mut Vec<u32>, expected: &mut Vec<spv::Operand>) {
    for &kind in def.req_operands.iter().chain(&def.opt_operands) {
        synthetic_operand(kind, words, expected);
    }
    match def.rest_operands {
        None => {}
        Some(spec::RestOperandsUnit::One(kind)) => synthetic_operand(kind, words, expected),
        Some(spec::RestOperandsUnit::Two([a_kind, b_kind])) => {
            let mut pair = vec![];
            synthetic_operand(a_kind, words, &mut pair);
            synthetic_operand(b_kind, words, &mut pair);
            let [a, b]: [spv::Operand; 2] = pair.try_into().unwrap();
            expected.push(spv::Operand::Pair(Box::new([a, b])));
        }
    }
}

#[test]
fn every_opcode_decodes_all_its_operands() {
    let spec = spec::Spec::get();
    let type_int = op("OpTypeInt", &[1, 32, 1]);
    let value = op("OpUndef", &[1, 3]);

    for (opcode, name, def) in spec.instructions.iter() {
        let mut operand_words = vec![];
        if def.has_result_type_id {
            operand_words.push(1);
        }
        if def.has_result_id {
            operand_words.push(2);
        }
        let mut expected = vec![];
        synthetic_operands(def, &mut operand_words, &mut expected);

        let control_word = ((operand_words.len() as u32 + 1) << 16) | u32::from(opcode.as_u16());
        let inst = [&[control_word][..], &operand_words[..]].concat();
        let words = module_words(4, &[type_int.clone(), value.clone(), inst]);

        let module = decode_bytes(&le_bytes(&words)).unwrap_or_else(|e| panic!("{name}: {e}"));
        assert_eq!(module.len(), 3, "{name}");
        let (_, inst) = module.insts().nth(2).unwrap();
        assert_eq!(inst.opcode, opcode);
        assert_eq!(inst.result_type_id, def.has_result_type_id.then(|| id(1)), "{name}");
        assert_eq!(inst.result_id, def.has_result_id.then(|| id(2)), "{name}");
        assert_eq!(inst.operands[..], expected[..], "{name}");

        // Printing must cope with anything that decodes.
        let text = spvdis::print::print_module(&module, &PrintOptions::default());
        assert!(text.contains(name), "{name}");
    }
}
