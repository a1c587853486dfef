//! SPIR-V grammar loading and indexing.
//!
//! The grammar is data: `grammar/spirv.core.grammar.json` (in the Khronos
//! `*.grammar.json` format) is embedded at build time and parsed on first use,
//! so every opcode and operand kind the decoder knows about is auditable there.

use arrayvec::ArrayVec;
use lazy_static::lazy_static;
use rustc_hash::FxHashMap;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use std::{fmt, iter};

pub const HEADER_LEN: usize = 5;

pub struct Spec {
    pub magic: u32,

    /// Pre-cached indices for "well-known" names.
    pub well_known: WellKnown,

    pub instructions: indexed::NamedIdxMap<Opcode, InstructionDef>,

    pub operand_kinds: indexed::NamedIdxMap<OperandKind, OperandKindDef>,

    // HACK(eddyb) the `OnceLock`s allow lazy parsing, avoiding overhead.
    #[allow(clippy::type_complexity)]
    ext_inst_sets: BTreeMap<
        &'static str,
        (OnceLock<ExtInstSetDesc>, Box<dyn Fn() -> ExtInstSetDesc + Send + Sync>),
    >,
}

/// Opcode names for an "extended instruction" set (imported by `OpExtInstImport`).
pub struct ExtInstSetDesc {
    /// Lowercase name the set is registered under (e.g. `opencl.std`).
    pub name: &'static str,

    pub instructions: BTreeMap<u32, Cow<'static, str>>,
}

impl ExtInstSetDesc {
    pub fn instruction_name(&self, opcode: u32) -> Option<&str> {
        self.instructions.get(&opcode).map(|name| &name[..])
    }
}

macro_rules! def_well_known {
    ($($group:ident: $ty:ty = [$($entry:ident),+ $(,)?]),+ $(,)?) => {
        #[allow(non_snake_case)]
        pub struct WellKnown {
            $($(pub $entry: $ty,)+)+
        }

        #[allow(non_camel_case_types)]
        struct PerWellKnownGroup<$($group),+> {
            $($group: $group),+
        }

        impl WellKnown {
            fn lookup_with(lookup_fns: PerWellKnownGroup<$(impl Fn(&'static str) -> $ty),+>) -> Self {
                Self {
                    $($($entry: (lookup_fns.$group)(stringify!($entry)),)+)+
                }
            }
        }
    };
}

def_well_known! {
    opcode: Opcode = [
        OpCapability,
        OpExtension,
        OpExtInstImport,
        OpExtInst,

        OpMemoryModel,

        OpEntryPoint,
        OpExecutionMode,
        OpExecutionModeId,

        OpString,
        OpSource,
        OpSourceContinued,
        OpSourceExtension,
        OpName,
        OpMemberName,
        OpModuleProcessed,

        OpLine,
        OpNoLine,

        OpTypeVoid,
        OpTypeBool,
        OpTypeInt,
        OpTypeFloat,
        OpTypeVector,
        OpTypePointer,

        OpSpecConstantOp,

        OpFunction,
        OpFunctionEnd,
        OpLabel,
    ],
    operand_kind: OperandKind = [
        IdResultType,
        IdResult,
        IdRef,

        Capability,
        StorageClass,
        MemoryAccess,

        LiteralInteger,
        LiteralString,
        LiteralContextDependentNumber,
        LiteralExtInstInteger,
        LiteralSpecConstantOpInteger,
    ],
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Opcode(u16);

impl fmt::Debug for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Spec::get().instructions.get_named(*self) {
            Some((name, _)) => f.write_str(name),
            None => write!(f, "Opcode({})", self.0),
        }
    }
}

impl Opcode {
    /// Lookup the name & definition for `opcode` in the lazily-loaded [`Spec`],
    /// returning `None` if it's not a known opcode.
    pub fn try_from_u16_with_name_and_def(
        opcode: u16,
    ) -> Option<(Self, &'static str, &'static InstructionDef)> {
        let opcode = Self(opcode);
        let (name, def) = Spec::get().instructions.get_named(opcode)?;
        Some((opcode, name, def))
    }

    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Lookup the name & definition for this opcode in the lazily-loaded [`Spec`].
    #[inline]
    pub fn name_and_def(self) -> (&'static str, &'static InstructionDef) {
        // NOTE(eddyb) `Opcode`s are only ever constructed from the `Spec` itself.
        Spec::get().instructions.get_named(self).unwrap()
    }

    /// Lookup the name for this opcode in the lazily-loaded [`Spec`].
    #[inline]
    pub fn name(self) -> &'static str {
        self.name_and_def().0
    }

    /// Lookup the definition for this opcode in the lazily-loaded [`Spec`].
    #[inline]
    pub fn def(self) -> &'static InstructionDef {
        self.name_and_def().1
    }
}

#[derive(PartialEq, Eq)]
pub struct InstructionDef {
    pub category: InstructionCategory,

    pub has_result_type_id: bool,
    pub has_result_id: bool,

    pub req_operands: ArrayVec<OperandKind, 16>,
    pub opt_operands: ArrayVec<OperandKind, 2>,
    pub rest_operands: Option<RestOperandsUnit>,
}

/// Coarse classification of instructions, derived from the grammar's `class`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InstructionCategory {
    ModeSetting,
    Extension,
    Debug,
    Annotation,
    Type,
    Const,
    Function,
    ControlFlow,
    Other,
}

/// Whether the trailing `*` "operand" (i.e. repeated arbitrarily many times),
/// consists of just one operand, or two per repeat (used by e.g. `OpPhi`).
#[derive(PartialEq, Eq)]
pub enum RestOperandsUnit {
    One(OperandKind),
    Two([OperandKind; 2]),
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OperandKind(u8);

impl fmt::Debug for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OperandKind({} => {:?})", self.0, self.name())
    }
}

impl OperandKind {
    /// Lookup the name & definition for this operand kind in the lazily-loaded [`Spec`].
    #[inline]
    pub fn name_and_def(self) -> (&'static str, &'static OperandKindDef) {
        Spec::get().operand_kinds.get_named(self).unwrap()
    }

    /// Lookup the name for this operand kind in the lazily-loaded [`Spec`].
    #[inline]
    pub fn name(self) -> &'static str {
        self.name_and_def().0
    }

    /// Lookup the definition for this operand kind in the lazily-loaded [`Spec`].
    #[inline]
    pub fn def(self) -> &'static OperandKindDef {
        self.name_and_def().1
    }
}

pub enum OperandKindDef {
    BitEnum {
        empty_name: &'static str,
        bits: BitTable,
    },

    ValueEnum {
        variants: indexed::NamedIdxMap<u32, Enumerant>,
    },

    Id,
    Literal {
        size: LiteralSize,
    },
}

/// Named flags of a `BitEnum`, indexed by bit position.
pub struct BitTable {
    by_bit: [Option<(&'static str, Enumerant)>; 32],
}

impl BitTable {
    pub fn get_named(&self, bit_idx: BitIdx) -> Option<(&'static str, &Enumerant)> {
        let (name, def) = self.by_bit.get(usize::from(bit_idx.0))?.as_ref()?;
        Some((name, def))
    }

    pub fn lookup(&self, name: &str) -> Option<BitIdx> {
        self.by_bit
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|&(n, _)| n == name))
            .map(|i| BitIdx(i as u8))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitIdx(pub u8);

impl BitIdx {
    /// Returns `Some(BitIdx(i))` if and only if `x == (1 << i)`.
    pub fn of_single_set_bit(x: u32) -> Option<Self> {
        if x.is_power_of_two() { Some(Self(x.trailing_zeros() as u8)) } else { None }
    }

    /// Returns an iterator of [`BitIdx`]s, from which `x` can be reconstructed
    /// by OR-ing together `1 << i` for every `BitIdx(i)`.
    ///
    /// The iterator is ordered: lower bit indices appear before higher ones.
    pub fn of_all_set_bits(mut x: u32) -> impl Iterator<Item = Self> {
        iter::from_fn(move || {
            if x == 0 {
                return None;
            }
            let idx = Self(x.trailing_zeros() as u8);
            // Clear the lowest set bit.
            x &= x - 1;
            Some(idx)
        })
    }

    pub fn mask(self) -> u32 {
        1 << self.0
    }
}

/// Parameters carried by an enumerant (e.g. `Aligned` carries its alignment).
#[derive(PartialEq, Eq)]
pub struct Enumerant {
    pub params: ArrayVec<OperandKind, 3>,
}

pub enum LiteralSize {
    /// The literal is always one word (but may occupy only part of it).
    Word,

    /// The literal is a word-encoded byte array, that ends with a `0` byte.
    NulTerminated,

    /// The literal uses as many words as required by its type, which is known
    /// contextually (`OpConstant`'s result type or `OpSwitch`'s selector type).
    FromContextualType,
}

// HACK(eddyb) make sure parsing JSON doesn't start failing randomly.
#[test]
fn get_spec_and_all_ext_inst_sets() {
    let spec = Spec::get();
    for name in spec.ext_inst_sets.keys() {
        assert!(spec.get_ext_inst_set_by_lowercase_name(name).is_some());
    }
}

impl Spec {
    /// Return a lazily-loaded [`Spec`] (only does significant work for the first call).
    #[inline(always)]
    #[must_use]
    pub fn get() -> &'static Spec {
        lazy_static! {
            static ref SPEC: Spec = {
                mod spv_grammar_jsons {
                    include!(concat!(env!("OUT_DIR"), "/spv_grammar_jsons.rs"));
                }

                let raw_core_grammar: raw::CoreGrammar<'static> =
                    serde_json::from_str(spv_grammar_jsons::SPIRV_CORE_GRAMMAR).unwrap();

                let mut spec = Spec::from_raw(raw_core_grammar);

                for &(name, json) in spv_grammar_jsons::EXTINST_NAMES_AND_GRAMMARS {
                    let lazy_init = move || {
                        let extinst_grammar: raw::ExtInstGrammar<'static> =
                            serde_json::from_str(json).unwrap();
                        let instructions = extinst_grammar
                            .instructions
                            .iter()
                            .map(|inst| (inst.opcode.into(), Cow::Borrowed(inst.opname)))
                            .collect();
                        ExtInstSetDesc { name, instructions }
                    };
                    spec.ext_inst_sets.insert(name, (OnceLock::new(), Box::new(lazy_init)));
                }

                spec
            };
        }
        &SPEC
    }

    /// Return a lazily-parsed [`ExtInstSetDesc`], if a known one exists for this
    /// `OpExtInstImport` name (required to be lowercase, due to Khronos' choice
    /// of case insensitivity, but **not checked by this function**).
    pub fn get_ext_inst_set_by_lowercase_name(
        &self,
        lowercase_ext_inst_set_name: &str,
    ) -> Option<&ExtInstSetDesc> {
        self.ext_inst_sets
            .get(lowercase_ext_inst_set_name)
            .map(|(once_cell, init)| once_cell.get_or_init(init))
    }

    /// Implementation detail of [`Spec::get`], indexes the raw data to produce a [`Spec`].
    fn from_raw(raw_core_grammar: raw::CoreGrammar<'static>) -> Self {
        // Constructing the full `OperandKindDef` may require looking up other
        // `OperandKind`s by name, so build the lookup table for that up-front.
        let operand_kind_by_name: FxHashMap<_, _> = raw_core_grammar
            .operand_kinds
            .iter()
            .filter(|o| !matches!(o.category, raw::OperandKindCategory::Composite))
            .enumerate()
            .map(|(i, o)| (o.kind, OperandKind(i.try_into().unwrap())))
            .collect();

        let enumerant_from_raw = |kind_name: &str, e: &raw::OperandKindEnumerant<'static>| {
            let mut params = ArrayVec::new();
            for p in &e.parameters {
                assert!(p.quantifier.is_none(), "{kind_name}/{}: quantified parameter", e.enumerant);
                params
                    .try_push(operand_kind_by_name[p.kind])
                    .map_err(|err| format!("{kind_name}/{}: {err}", e.enumerant))
                    .unwrap();
            }
            Enumerant { params }
        };

        let mut operand_kinds = indexed::NamedIdxMap::default();
        for o in &raw_core_grammar.operand_kinds {
            let def = match o.category {
                raw::OperandKindCategory::BitEnum => {
                    assert!(o.bases.is_none());

                    let mut empty_name = None;
                    let mut by_bit: [Option<(&'static str, Enumerant)>; 32] =
                        std::array::from_fn(|_| None);
                    for e in o.enumerants.as_deref().unwrap_or_default() {
                        // `BitEnum` enumerants with `"value" : "0x0000"`
                        // only name the state with no bits set (`"None"`).
                        if e.value == 0 {
                            assert!(e.parameters.is_empty());
                            empty_name = empty_name.or(Some(e.enumerant));
                            continue;
                        }

                        let bit_idx = BitIdx::of_single_set_bit(e.value).unwrap();
                        let slot = &mut by_bit[usize::from(bit_idx.0)];
                        assert!(slot.is_none(), "{}: duplicate bit {}", o.kind, e.enumerant);
                        *slot = Some((e.enumerant, enumerant_from_raw(o.kind, e)));
                    }

                    OperandKindDef::BitEnum {
                        empty_name: empty_name.unwrap_or("None"),
                        bits: BitTable { by_bit },
                    }
                }
                raw::OperandKindCategory::ValueEnum => {
                    assert!(o.bases.is_none());

                    let mut variants = indexed::NamedIdxMap::default();
                    for e in o.enumerants.as_deref().unwrap_or_default() {
                        variants.insert(e.value, e.enumerant, enumerant_from_raw(o.kind, e));
                    }
                    OperandKindDef::ValueEnum { variants }
                }
                raw::OperandKindCategory::Id => {
                    assert!(o.enumerants.is_none() && o.bases.is_none());
                    OperandKindDef::Id
                }
                raw::OperandKindCategory::Literal => {
                    assert!(o.enumerants.is_none() && o.bases.is_none());
                    let size = match o.kind {
                        "LiteralInteger" | "LiteralExtInstInteger"
                        | "LiteralSpecConstantOpInteger" => LiteralSize::Word,
                        "LiteralString" => LiteralSize::NulTerminated,
                        "LiteralContextDependentNumber" => LiteralSize::FromContextualType,
                        _ => unreachable!("unknown literal kind {}", o.kind),
                    };
                    OperandKindDef::Literal { size }
                }
                raw::OperandKindCategory::Composite => continue,
            };
            operand_kinds.insert(operand_kind_by_name[o.kind], o.kind, def);
        }

        let operand_kind_pairs_by_name: FxHashMap<_, _> = raw_core_grammar
            .operand_kinds
            .iter()
            .filter(|o| matches!(o.category, raw::OperandKindCategory::Composite))
            .map(|o| {
                assert!(o.enumerants.is_none());
                let mut bases: [_; 2] = o.bases.as_deref().unwrap()[..].try_into().unwrap();

                // `OpSwitch` case literals have the width of the selector's type.
                if o.kind == "PairLiteralIntegerIdRef" {
                    assert_eq!(bases, ["LiteralInteger", "IdRef"]);
                    bases[0] = "LiteralContextDependentNumber";
                }

                (o.kind, bases.map(|base| operand_kinds.lookup(base).unwrap()))
            })
            .collect();

        let id_result_type = operand_kinds.lookup("IdResultType").unwrap();
        let id_result = operand_kinds.lookup("IdResult").unwrap();

        let mut instructions = indexed::NamedIdxMap::default();
        for inst in &raw_core_grammar.instructions {
            let category = match inst.class {
                "Mode-Setting" => InstructionCategory::ModeSetting,
                "Extension" => InstructionCategory::Extension,
                "Debug" => InstructionCategory::Debug,
                "Annotation" => InstructionCategory::Annotation,
                "Type-Declaration" => InstructionCategory::Type,
                "Constant-Creation" => InstructionCategory::Const,
                "Function" => InstructionCategory::Function,
                "Control-Flow" => InstructionCategory::ControlFlow,
                _ => InstructionCategory::Other,
            };

            // Helper for checking if `inst.opname` starts with `prefix`
            // followed by an uppercase letter indicating the start of
            // the first "word" for the intra-category instruction name.
            let has_categorical_prefix = |prefix| {
                inst.opname
                    .strip_prefix(prefix)
                    .is_some_and(|next| next.starts_with(|c: char| c.is_ascii_uppercase()))
            };
            if has_categorical_prefix("OpType") {
                assert_eq!(category, InstructionCategory::Type, "{}", inst.opname);
            }

            let mut def = InstructionDef {
                category,

                has_result_type_id: false,
                has_result_id: false,

                req_operands: ArrayVec::new(),
                opt_operands: ArrayVec::new(),
                rest_operands: None,
            };

            #[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
            enum Seq {
                IdResultType,
                IdResult,
                Required,
                Optional,
                Rest,
            }
            let mut seq = None;

            for o in &inst.operands {
                let single = operand_kinds.lookup(o.kind);

                let next_seq = match o.quantifier {
                    _ if single == Some(id_result_type) => {
                        assert!(o.quantifier.is_none());
                        assert!(!def.has_result_type_id);
                        def.has_result_type_id = true;
                        Seq::IdResultType
                    }
                    _ if single == Some(id_result) => {
                        assert!(o.quantifier.is_none());
                        assert!(!def.has_result_id);
                        def.has_result_id = true;
                        Seq::IdResult
                    }
                    None => {
                        def.req_operands
                            .try_push(single.unwrap())
                            .map_err(|err| format!("{}/{}: {err}", inst.opname, o.kind))
                            .unwrap();
                        Seq::Required
                    }
                    Some(raw::Quantifier::Optional) => {
                        def.opt_operands
                            .try_push(single.unwrap())
                            .map_err(|err| format!("{}/{}: {err}", inst.opname, o.kind))
                            .unwrap();
                        Seq::Optional
                    }
                    Some(raw::Quantifier::Rest) => {
                        def.rest_operands = Some(match single {
                            Some(kind) => RestOperandsUnit::One(kind),
                            None => RestOperandsUnit::Two(operand_kind_pairs_by_name[o.kind]),
                        });
                        Seq::Rest
                    }
                };
                assert!(seq <= Some(next_seq), "{}: {next_seq:?} -> {seq:?}", inst.opname);
                seq = Some(next_seq);
            }

            // `IdResultType` without `IdResult` is impossible.
            if def.has_result_type_id {
                assert!(def.has_result_id);
            }

            instructions.insert(Opcode(inst.opcode), inst.opname, def);
        }

        let well_known = WellKnown::lookup_with(PerWellKnownGroup {
            opcode: |name| instructions.lookup(name).unwrap(),
            operand_kind: |name| operand_kinds.lookup(name).unwrap(),
        });

        Self {
            magic: raw_core_grammar.magic_number,

            instructions,
            well_known,
            operand_kinds,

            ext_inst_sets: BTreeMap::new(),
        }
    }
}

/// Deserialization for the `.grammar.json` files, without any post-processing.
pub mod raw {
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct CoreGrammar<'a> {
        #[serde(borrow, default)]
        pub copyright: Vec<CowStr<'a>>,

        #[serde(deserialize_with = "dew_u32_maybe_hex")]
        pub magic_number: u32,

        pub major_version: u8,
        pub minor_version: u8,
        pub revision: u8,

        pub instructions: Vec<Instruction<'a>>,
        pub operand_kinds: Vec<OperandKind<'a>>,
    }

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct ExtInstGrammar<'a> {
        #[serde(borrow, default)]
        pub copyright: Vec<CowStr<'a>>,

        pub version: Option<u32>,
        pub revision: u8,

        pub instructions: Vec<Instruction<'a>>,
    }

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct Instruction<'a> {
        pub opname: &'a str,
        #[serde(default)]
        pub class: &'a str,
        pub opcode: u16,
        #[serde(default)]
        pub operands: Vec<Operand<'a>>,
    }

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct Operand<'a> {
        pub kind: &'a str,
        pub quantifier: Option<Quantifier>,
        #[serde(borrow)]
        pub name: Option<CowStr<'a>>,
    }

    #[derive(Deserialize)]
    pub enum Quantifier {
        #[serde(rename = "?")]
        Optional,

        #[serde(rename = "*")]
        Rest,
    }

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct OperandKind<'a> {
        pub category: OperandKindCategory,
        pub kind: &'a str,
        pub doc: Option<&'a str>,

        pub enumerants: Option<Vec<OperandKindEnumerant<'a>>>,

        pub bases: Option<Vec<&'a str>>,
    }

    #[derive(Deserialize)]
    pub enum OperandKindCategory {
        BitEnum,
        ValueEnum,

        Id,
        Literal,
        Composite,
    }

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    pub struct OperandKindEnumerant<'a> {
        pub enumerant: &'a str,

        #[serde(deserialize_with = "dew_u32_maybe_hex")]
        pub value: u32,

        #[serde(default)]
        pub parameters: Vec<Operand<'a>>,
    }

    // HACK(eddyb) `Cow<'a, str>` that works w/ zero-copy deserialization, even
    // when nested (`serde` only special-cases `Cow` used directly as a field type).
    #[derive(Deserialize, Debug)]
    #[serde(untagged)]
    pub enum CowStr<'a> {
        Borrowed(&'a str),
        Owned(String),
    }

    /// Helper to generate functions usable with `deserialize_with` (hence "dew"),
    /// that deserialize to an intermediary type, which is then passed through the
    /// supplied closure, which is allowed to error.
    macro_rules! dew_and_then {
        ($($name:ident: |$x:ident: $in_ty:ty| -> $out_ty:ty $body:block),* $(,)?) => {
            $(fn $name<'de, D>(deserializer: D) -> Result<$out_ty, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let x = Deserialize::deserialize(deserializer)?;

                // HACK(eddyb) this is a `try {...}`-like use of a closure.
                #[allow(clippy::redundant_closure_call)]
                (|$x: $in_ty| -> Result<$out_ty, _> { $body })(x)
                    .map_err(serde::de::Error::custom)
            })*
        };
    }

    dew_and_then! {
        dew_u32_maybe_hex: |x: DecOrHex<'_>| -> u32 { x.to_u32() },
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub enum DecOrHex<'a> {
        Dec(u32),
        MaybeHex(&'a str),
    }

    impl DecOrHex<'_> {
        fn to_u32(&self) -> Result<u32, String> {
            match *self {
                DecOrHex::Dec(x) => Ok(x),
                DecOrHex::MaybeHex(s) => {
                    // Some decimal numbers are kept as strings.
                    if let Ok(x) = s.parse() {
                        return Ok(x);
                    }
                    let digits = s
                        .strip_prefix("0x")
                        .ok_or_else(|| format!("DecOrHex string form doesn't start with 0x: {s:?}"))?;
                    u32::from_str_radix(digits, 16).map_err(|e| format!("{s:?}: {e}"))
                }
            }
        }
    }
}

/// Name-indexed maps used by the [`Spec`] tables.
pub mod indexed {
    use crate::FxIndexMap;
    use rustc_hash::FxHashMap;
    use std::hash::Hash;

    /// Map from a compact index to a named value, with reverse lookup by name.
    ///
    /// Aliases (several names for one index) keep the first name as canonical,
    /// but all names remain valid for `lookup`.
    pub struct NamedIdxMap<I, T> {
        idx_by_name: FxHashMap<&'static str, I>,
        storage: FxIndexMap<I, (&'static str, T)>,
    }

    impl<I, T> Default for NamedIdxMap<I, T> {
        fn default() -> Self {
            Self { idx_by_name: FxHashMap::default(), storage: FxIndexMap::default() }
        }
    }

    impl<I: Copy + Eq + Hash, T> NamedIdxMap<I, T> {
        pub(super) fn insert(&mut self, idx: I, name: &'static str, value: T) {
            self.idx_by_name.insert(name, idx);
            self.storage.entry(idx).or_insert((name, value));
        }

        /// Get an index from a name.
        pub fn lookup(&self, name: &str) -> Option<I> {
            self.idx_by_name.get(name).copied()
        }

        pub fn get_named(&self, idx: I) -> Option<(&'static str, &T)> {
            let (name, value) = self.storage.get(&idx)?;
            Some((name, value))
        }

        pub fn get(&self, idx: I) -> Option<&T> {
            let (_name, value) = self.get_named(idx)?;
            Some(value)
        }

        /// All entries, in grammar order.
        pub fn iter(&self) -> impl Iterator<Item = (I, &'static str, &T)> + '_ {
            self.storage.iter().map(|(&idx, (name, value))| (idx, *name, value))
        }

        pub fn len(&self) -> usize {
            self.storage.len()
        }

        pub fn is_empty(&self) -> bool {
            self.storage.is_empty()
        }
    }
}
