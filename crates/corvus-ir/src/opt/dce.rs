//! Dead-code elimination (spec §4.9). Grounded on
//! `original_source/src/ir/passes/dead_code_elimination.cpp`: a BFS from
//! the entry block to drop unreachable blocks, then a used-value sweep
//! to drop instructions whose result is never read and which has no
//! side effect worth keeping for its own sake.

use crate::analysis::cfg::unreachable_blocks;
use crate::ir::{BlockId, IRModule, ValueId};
use corvus_util::{FxHashMap, FxHashSet, IndexVec};

pub fn dce_module(module: &mut IRModule) -> bool {
    let mut modified = false;
    for function in module.functions.iter_mut() {
        if remove_unreachable_blocks(function) {
            modified = true;
        }
        if remove_unused_instructions(function) {
            modified = true;
        }
    }
    modified
}

fn remove_unreachable_blocks(function: &mut crate::ir::IRFunction) -> bool {
    if function.blocks.is_empty() {
        return false;
    }
    let dead = unreachable_blocks(function);
    if dead.is_empty() {
        return false;
    }

    // Renumber surviving blocks to dense positions: `BlockId` indexes
    // directly into the backing vector (spec §3), so every id the
    // removed blocks leave behind has to be remapped, not just skipped.
    let mut remap: FxHashMap<BlockId, BlockId> = FxHashMap::default();
    let mut kept: IndexVec<BlockId, crate::ir::BasicBlock> = IndexVec::new();
    for block in function.blocks.as_slice().iter().cloned() {
        if !dead.contains(&block.id) {
            let new_id = kept.len();
            remap.insert(block.id, BlockId(new_id as u32));
            kept.push(block);
        }
    }

    let translate = |id: BlockId| remap.get(&id).copied().unwrap_or(id);
    for block in kept.as_mut_slice().iter_mut() {
        block.id = translate(block.id);
        block.predecessors = block.predecessors.iter().filter(|p| !dead.contains(p)).map(|p| translate(*p)).collect();
        block.successors = block.successors.iter().map(|s| translate(*s)).collect();
        for inst in block.instructions.iter_mut() {
            if let Some(t) = inst.true_block {
                inst.true_block = Some(translate(t));
            }
            if let Some(t) = inst.false_block {
                inst.false_block = Some(translate(t));
            }
            for (_, target) in inst.switch_targets.iter_mut() {
                *target = translate(*target);
            }
            if let Some(o) = inst.switch_otherwise {
                inst.switch_otherwise = Some(translate(o));
            }
            for (_, from) in inst.phi_incoming.iter_mut() {
                *from = translate(*from);
            }
        }
    }

    function.entry = translate(function.entry);
    function.blocks = kept;
    true
}

fn remove_unused_instructions(function: &mut crate::ir::IRFunction) -> bool {
    let mut used: FxHashSet<ValueId> = FxHashSet::default();
    for block in function.blocks.as_slice() {
        for inst in &block.instructions {
            for operand in &inst.operands {
                used.insert(operand.id);
            }
            for (value, _) in &inst.phi_incoming {
                used.insert(value.id);
            }
        }
    }

    let mut modified = false;
    for block in function.blocks.as_mut_slice().iter_mut() {
        let before = block.instructions.len();
        block.instructions.retain(|inst| {
            match &inst.result {
                Some(result) => inst.opcode.has_side_effects() || used.contains(&result.id),
                None => true,
            }
        });
        if block.instructions.len() != before {
            modified = true;
        }
    }
    modified
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::ir::IRType;

    #[test]
    fn drops_unreachable_block() {
        let mut b = Builder::new();
        b.create_function("f", vec![], IRType::I32);
        let entry = b.create_block("entry");
        let dead = b.create_block("dead");
        b.set_insert_point(entry);
        let v = b.const_int(IRType::I32, 1);
        b.emit_ret(Some(v));
        b.set_insert_point(dead);
        let v = b.const_int(IRType::I32, 2);
        b.emit_ret(Some(v));
        let f = b.finish_function();
        let mut module = IRModule::new("m");
        module.functions.push(f);
        let modified = dce_module(&mut module);
        assert!(modified);
        assert_eq!(module.functions[0].blocks.len(), 1);
    }

    #[test]
    fn drops_dead_arithmetic_but_keeps_store() {
        let mut b = Builder::new();
        b.create_function("f", vec![], IRType::Void);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let a = b.const_int(IRType::I32, 1);
        let c = b.const_int(IRType::I32, 2);
        let _unused = b.emit_add(a, c);
        let slot = b.emit_alloca(IRType::I32, "x");
        let five = b.const_int(IRType::I32, 5);
        b.emit_store(five, slot);
        b.emit_ret(None);
        let f = b.finish_function();
        let mut module = IRModule::new("m");
        module.functions.push(f);
        dce_module(&mut module);
        let entry_id = module.functions[0].entry;
        let instructions = &module.functions[0].blocks[entry_id].instructions;
        assert!(instructions.iter().all(|i| i.opcode != crate::ir::Opcode::Add));
        assert!(instructions.iter().any(|i| i.opcode == crate::ir::Opcode::Store));
    }
}
