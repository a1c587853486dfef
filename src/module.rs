//! In-memory SPIR-V module: header, instructions, `<id>` table and scopes.

use crate::spv::{self, spec};
use crate::{Error, FxIndexMap, Result};
use rustc_hash::FxHashMap;
use std::fmt;

/// The 4 words following the magic number, stored verbatim.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Header {
    pub version: u32,
    pub generator: u32,
    pub bound: u32,

    /// Reserved (expected to be `0`, but never checked).
    pub schema: u32,
}

impl Header {
    pub fn from_words([version, generator, bound, schema]: [u32; spec::HEADER_LEN - 1]) -> Self {
        Self { version, generator, bound, schema }
    }

    /// `(major, minor)` SPIR-V version (encoded as `0 | major | minor | 0`).
    pub fn version_major_minor(&self) -> (u8, u8) {
        ((self.version >> 16) as u8, (self.version >> 8) as u8)
    }

    /// `(vendor, tool version)` halves of the generator magic.
    pub fn generator_vendor_and_version(&self) -> (u16, u16) {
        ((self.generator >> 16) as u16, self.generator as u16)
    }
}

/// Position of an instruction in [`Module`]'s flat instruction sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstIdx(u32);

impl InstIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to a [`ScopeDef`] in the [`Module`]'s scope arena.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scope(u32);

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({})", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    Module,
    Function,
    Block,
}

/// Structural grouping of instructions, only used for presentation.
///
/// `<id>` resolution is module-global and never looks at scopes.
#[derive(Debug)]
pub struct ScopeDef {
    pub kind: ScopeKind,
    pub parent: Option<Scope>,
    pub children: Vec<Scope>,
    pub insts: Vec<InstIdx>,
}

/// Cosmetic name for an `<id>`, remembering where it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IdName {
    /// From `OpName` (always takes precedence).
    Debug(String),

    /// Assigned by [`crate::names`] from the shape of the defining instruction.
    Inferred(String),
}

impl IdName {
    pub fn as_str(&self) -> &str {
        match self {
            IdName::Debug(s) | IdName::Inferred(s) => s,
        }
    }
}

/// Entry in the `<id>` table, created on the first reference to the `<id>`.
#[derive(Clone, Debug, Default)]
pub struct IdDef {
    /// Defining instruction, once one was appended.
    pub def: Option<InstIdx>,

    pub name: Option<IdName>,
}

pub struct Module {
    pub header: Header,

    insts: Vec<spv::Inst>,
    inst_scopes: Vec<Scope>,

    ids: FxIndexMap<spv::Id, IdDef>,

    scopes: Vec<ScopeDef>,

    /// Extended instruction sets, keyed by the `OpExtInstImport` result `<id>`.
    ext_inst_imports: FxHashMap<spv::Id, &'static spec::ExtInstSetDesc>,
}

impl Module {
    pub const ROOT_SCOPE: Scope = Scope(0);

    pub fn new(header: Header) -> Self {
        Self {
            header,
            insts: vec![],
            inst_scopes: vec![],
            ids: FxIndexMap::default(),
            scopes: vec![ScopeDef {
                kind: ScopeKind::Module,
                parent: None,
                children: vec![],
                insts: vec![],
            }],
            ext_inst_imports: FxHashMap::default(),
        }
    }

    /// Return `id`, creating an unbound placeholder entry for it if this is
    /// the first time it's referenced.
    pub fn get_or_create(&mut self, id: spv::Id) -> spv::Id {
        self.ids.entry(id).or_default();
        id
    }

    /// All `<id>`s seen so far, in order of first reference.
    pub fn ids(&self) -> impl Iterator<Item = (spv::Id, &IdDef)> + '_ {
        self.ids.iter().map(|(&id, def)| (id, def))
    }

    /// Get the instruction defining `id`, failing if `id` was never defined.
    pub fn resolve(&self, id: spv::Id) -> Result<&spv::Inst> {
        let def = self.ids.get(&id).and_then(|id_def| id_def.def);
        def.map(|idx| &self.insts[idx.index()]).ok_or(Error::UnresolvedIdentifier(id))
    }

    /// Add `inst` to the end of the module, attaching it to `current_scope`
    /// (or to a scope it opens), and returning the scope the next instruction
    /// should be attached to.
    pub fn append(&mut self, inst: spv::Inst, current_scope: Scope) -> Result<Scope> {
        let wk = &spec::Spec::get().well_known;

        let idx = InstIdx(self.insts.len() as u32);
        if let Some(id) = inst.result_id {
            let id_def = self.ids.entry(id).or_default();
            if id_def.def.is_some() {
                return Err(Error::DuplicateDefinition(id));
            }
            id_def.def = Some(idx);
        }

        let enclosing_function = |this: &Self| match this.scope(current_scope).kind {
            ScopeKind::Function => Some(current_scope),
            ScopeKind::Block => this.scope(current_scope).parent,
            ScopeKind::Module => None,
        };

        let (attach_to, next_scope) = if inst.opcode == wk.OpFunction {
            let func = self.new_scope(ScopeKind::Function, Self::ROOT_SCOPE);
            (func, func)
        } else if inst.opcode == wk.OpLabel {
            match enclosing_function(self) {
                Some(func) => {
                    let block = self.new_scope(ScopeKind::Block, func);
                    (block, block)
                }
                None => (current_scope, current_scope),
            }
        } else if inst.opcode == wk.OpFunctionEnd {
            match enclosing_function(self) {
                Some(func) => (func, Self::ROOT_SCOPE),
                None => (current_scope, current_scope),
            }
        } else {
            (current_scope, current_scope)
        };

        self.scopes[attach_to.0 as usize].insts.push(idx);
        self.inst_scopes.push(attach_to);
        self.insts.push(inst);

        Ok(next_scope)
    }

    fn new_scope(&mut self, kind: ScopeKind, parent: Scope) -> Scope {
        let scope = Scope(self.scopes.len() as u32);
        self.scopes.push(ScopeDef { kind, parent: Some(parent), children: vec![], insts: vec![] });
        self.scopes[parent.0 as usize].children.push(scope);
        scope
    }

    pub fn scope(&self, scope: Scope) -> &ScopeDef {
        &self.scopes[scope.0 as usize]
    }

    /// The scope `idx` was attached to by [`Module::append`].
    pub fn scope_of(&self, idx: InstIdx) -> Scope {
        self.inst_scopes[idx.index()]
    }

    /// Function scopes, in module order.
    pub fn functions(&self) -> impl Iterator<Item = Scope> + '_ {
        self.scope(Self::ROOT_SCOPE).children.iter().copied()
    }

    /// All the instructions of a function scope (including those of its
    /// blocks), in module order.
    pub fn function_insts(&self, func: Scope) -> Vec<InstIdx> {
        let func_def = self.scope(func);
        let mut insts: Vec<_> = func_def
            .insts
            .iter()
            .chain(func_def.children.iter().flat_map(|&block| &self.scope(block).insts))
            .copied()
            .collect();
        insts.sort_unstable();
        insts
    }

    pub fn inst(&self, idx: InstIdx) -> &spv::Inst {
        &self.insts[idx.index()]
    }

    /// All instructions, in module order.
    pub fn insts(&self) -> impl ExactSizeIterator<Item = (InstIdx, &spv::Inst)> + '_ {
        self.insts.iter().enumerate().map(|(i, inst)| (InstIdx(i as u32), inst))
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn name(&self, id: spv::Id) -> Option<&str> {
        Some(self.ids.get(&id)?.name.as_ref()?.as_str())
    }

    /// Set the `OpName` name of `id` (replacing any previous name).
    pub fn set_debug_name(&mut self, id: spv::Id, name: String) {
        self.ids.entry(id).or_default().name = Some(IdName::Debug(name));
    }

    /// Set an inferred name for `id`, unless it already has an `OpName` name.
    pub fn set_inferred_name(&mut self, id: spv::Id, name: String) {
        let slot = &mut self.ids.entry(id).or_default().name;
        if !matches!(slot, Some(IdName::Debug(_))) {
            *slot = Some(IdName::Inferred(name));
        }
    }

    pub fn import_ext_inst_set(&mut self, id: spv::Id, set: &'static spec::ExtInstSetDesc) {
        self.ext_inst_imports.insert(id, set);
    }

    /// The extended instruction set imported as `id`, if it's a supported one.
    pub fn ext_inst_set(&self, id: spv::Id) -> Option<&'static spec::ExtInstSetDesc> {
        self.ext_inst_imports.get(&id).copied()
    }
}
