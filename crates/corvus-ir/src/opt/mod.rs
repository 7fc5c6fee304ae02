//! The optimization pipeline (spec §4.9). Grounded on
//! `original_source/src/ir/ir_pass.h`'s `run_passes`: a fixed ordered
//! sequence of passes, except here it loops to a fixed point, since
//! folding can expose new dead code and inlining can expose new
//! foldable constants that a single pass over the list would miss.

pub mod dce;
pub mod fold;
pub mod inline;

use crate::ir::IRModule;

/// Runs constant folding, inlining, and dead-code elimination
/// repeatedly until none of them change the module, then returns how
/// many individual passes reported a modification.
pub fn optimize_module(module: &mut IRModule) -> usize {
    let mut modifications = 0;
    loop {
        let mut changed = false;
        if fold::fold_module(module) {
            changed = true;
            modifications += 1;
        }
        if inline::inline_module(module) {
            changed = true;
            modifications += 1;
        }
        if dce::dce_module(module) {
            changed = true;
            modifications += 1;
        }
        if !changed {
            break;
        }
    }
    modifications
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::ir::{IRType, Opcode, Value, ValueId};

    #[test]
    fn inlining_then_folding_collapses_a_call_to_a_constant() {
        let mut b = Builder::new();
        let param = Value { id: ValueId(0), ty: IRType::I32, name: "x".into(), is_constant: false, constant: None };
        b.create_function("double", vec![param.clone()], IRType::I32);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let two = b.const_int(IRType::I32, 2);
        let doubled = b.emit_mul(param, two);
        b.emit_ret(Some(doubled));
        let callee = b.finish_function();

        let mut b = Builder::new();
        b.create_function("main", vec![], IRType::I32);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let arg = b.const_int(IRType::I32, 21);
        let result = b.emit_call("double", vec![arg], IRType::I32).unwrap();
        b.emit_ret(Some(result));
        let caller = b.finish_function();

        let mut module = IRModule::new("m");
        module.functions.push(caller);
        module.functions.push(callee);

        optimize_module(&mut module);

        let main_fn = module.functions.iter().find(|f| f.name == "main").unwrap();
        let entry_id = main_fn.entry;
        let ret = main_fn.blocks[entry_id].instructions.last().unwrap();
        assert_eq!(ret.opcode, Opcode::Ret);
        assert_eq!(ret.operands[0].as_int(), Some(42));
    }
}
