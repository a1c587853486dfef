//! Cosmetic names for `<id>`s, inferred while decoding.
//!
//! Three sources, applied in this order for every instruction:
//! 1. well-known scalar types (e.g. `OpTypeInt 32 0` is `uint`)
//! 2. `OpName` (a "debug" name, never overwritten by the other two)
//! 3. names built from other names (pointer and vector types)

use crate::module::Module;
use crate::spv::{self, spec};
use crate::Result;

/// Record any name `inst` implies (for its own result `<id>` or, in the case
/// of `OpName`, for its target).
///
/// The `<id>`s referenced by pointer and vector types must already be defined.
pub fn infer(module: &mut Module, inst: &spv::Inst) -> Result<()> {
    let wk = &spec::Spec::get().well_known;

    if inst.opcode == wk.OpName {
        if let [spv::Operand::Id(target), spv::Operand::LiteralString(name)] = &inst.operands[..] {
            module.set_debug_name(*target, name.clone());
        }
        return Ok(());
    }

    let Some(result_id) = inst.result_id else {
        return Ok(());
    };

    if let Some(name) = scalar_type_name(inst) {
        module.set_inferred_name(result_id, name.to_string());
        return Ok(());
    }

    let name = if inst.opcode == wk.OpTypePointer {
        match &inst.operands[..] {
            [storage_class, spv::Operand::Id(pointee)] => {
                let storage_class = storage_class.value_enum_name().unwrap_or("?");
                format!("_ptr_{storage_class}_{}", name_or_number(module, *pointee)?)
            }
            _ => return Ok(()),
        }
    } else if inst.opcode == wk.OpTypeVector {
        match inst.operands[..] {
            [spv::Operand::Id(component), spv::Operand::LiteralInteger(count)] => {
                format!("v{count}{}", name_or_number(module, component)?)
            }
            _ => return Ok(()),
        }
    } else {
        return Ok(());
    };
    module.set_inferred_name(result_id, name);

    Ok(())
}

fn scalar_type_name(inst: &spv::Inst) -> Option<&'static str> {
    let wk = &spec::Spec::get().well_known;

    if inst.opcode == wk.OpTypeVoid {
        return Some("void");
    }
    if inst.opcode == wk.OpTypeBool {
        return Some("bool");
    }
    Some(match (inst.int_or_float_type_bit_width()?, inst.int_type_signedness()) {
        (32, Some(true)) => "int",
        (32, Some(false)) => "uint",
        (64, Some(true)) => "long",
        (64, Some(false)) => "ulong",
        (32, None) => "float",
        (64, None) => "double",
        _ => return None,
    })
}

/// Name of an already defined `<id>`, falling back to its number.
fn name_or_number(module: &Module, id: spv::Id) -> Result<String> {
    module.resolve(id)?;
    Ok(module.name(id).map_or_else(|| id.to_string(), str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Header;
    use crate::Error;

    fn id(x: u32) -> spv::Id {
        spv::Id::new(x).unwrap()
    }

    fn inst(name: &str, result_id: u32, operands: &[spv::Operand]) -> spv::Inst {
        let opcode = spec::Spec::get().instructions.lookup(name).unwrap();
        spv::Inst {
            result_id: spv::Id::new(result_id),
            operands: operands.iter().cloned().collect(),
            ..spv::Inst::new(opcode)
        }
    }

    fn define(module: &mut Module, inst: spv::Inst) {
        infer(module, &inst).unwrap();
        module.append(inst, Module::ROOT_SCOPE).unwrap();
    }

    fn storage_class(name: &str) -> spv::Operand {
        let kind = spec::Spec::get().well_known.StorageClass;
        let spec::OperandKindDef::ValueEnum { variants } = kind.def() else { unreachable!() };
        spv::Operand::ValueEnum { kind, value: variants.lookup(name).unwrap(), params: vec![] }
    }

    fn int_type(result_id: u32, width: u32, signed: u32) -> spv::Inst {
        use spv::Operand::LiteralInteger;
        inst("OpTypeInt", result_id, &[LiteralInteger(width), LiteralInteger(signed)])
    }

    #[test]
    fn scalar_types() {
        use spv::Operand::LiteralInteger;

        let mut module = Module::new(Header::default());
        define(&mut module, inst("OpTypeVoid", 1, &[]));
        define(&mut module, inst("OpTypeBool", 2, &[]));
        define(&mut module, int_type(3, 32, 1));
        define(&mut module, int_type(4, 32, 0));
        define(&mut module, int_type(5, 64, 1));
        define(&mut module, int_type(6, 64, 0));
        define(&mut module, inst("OpTypeFloat", 7, &[LiteralInteger(32)]));
        define(&mut module, inst("OpTypeFloat", 8, &[LiteralInteger(64)]));
        define(&mut module, int_type(9, 16, 0));

        let names: Vec<_> = (1..=9).map(|i| module.name(id(i))).collect();
        assert_eq!(names, [
            Some("void"),
            Some("bool"),
            Some("int"),
            Some("uint"),
            Some("long"),
            Some("ulong"),
            Some("float"),
            Some("double"),
            None,
        ]);
    }

    #[test]
    fn debug_names_override_in_either_order() {
        let op_name = |target, name: &str| {
            inst("OpName", 0, &[spv::Operand::Id(id(target)), spv::Operand::LiteralString(name.into())])
        };

        let mut module = Module::new(Header::default());
        infer(&mut module, &op_name(1, "counter")).unwrap();
        define(&mut module, int_type(1, 32, 0));
        assert_eq!(module.name(id(1)), Some("counter"));

        define(&mut module, int_type(2, 32, 0));
        infer(&mut module, &op_name(2, "first")).unwrap();
        infer(&mut module, &op_name(2, "second")).unwrap();
        assert_eq!(module.name(id(2)), Some("second"));
    }

    #[test]
    fn pointer_and_vector_names() {
        use spv::Operand::{Id, LiteralInteger};

        let mut module = Module::new(Header::default());
        define(&mut module, inst("OpTypeFloat", 1, &[LiteralInteger(32)]));
        define(&mut module, inst("OpTypeVector", 2, &[Id(id(1)), LiteralInteger(4)]));
        define(&mut module, inst("OpTypePointer", 3, &[storage_class("Function"), Id(id(2))]));
        assert_eq!(module.name(id(2)), Some("v4float"));
        assert_eq!(module.name(id(3)), Some("_ptr_Function_v4float"));

        // Unnamed pointee.
        define(&mut module, inst("OpTypeStruct", 4, &[Id(id(1))]));
        define(&mut module, inst("OpTypePointer", 5, &[storage_class("CrossWorkgroup"), Id(id(4))]));
        assert_eq!(module.name(id(5)), Some("_ptr_CrossWorkgroup_4"));
    }

    #[test]
    fn undefined_component_is_an_error() {
        use spv::Operand::{Id, LiteralInteger};

        let mut module = Module::new(Header::default());
        let vector = inst("OpTypeVector", 2, &[Id(id(1)), LiteralInteger(4)]);
        assert!(matches!(infer(&mut module, &vector), Err(Error::UnresolvedIdentifier(x)) if x == id(1)));
    }
}
