//! Single-block callee inlining (spec §4.9). Grounded on
//! `original_source/src/ir/passes/inliner.cpp`: inline only trivial
//! callees (one block, ten instructions or fewer), never a function
//! into itself, fresh value IDs for everything the callee contributes,
//! and restart from scratch after each successful inline so later call
//! sites see the simplified caller.

use crate::ir::{BasicBlock, IRFunction, IRModule, Instruction, Opcode, Value, ValueId};
use corvus_util::FxHashMap;

const MAX_INLINE_INSTRUCTIONS: usize = 10;

pub fn inline_module(module: &mut IRModule) -> bool {
    let mut modified = false;
    let callees = module.functions.clone();
    for index in 0..module.functions.len() {
        if module.functions[index].blocks.is_empty() {
            continue;
        }
        loop {
            let changed = inline_calls_in_function(index, module, &callees);
            if !changed {
                break;
            }
            modified = true;
        }
    }
    modified
}

fn should_inline(callee: &IRFunction) -> bool {
    callee.blocks.len() == 1 && callee.blocks.as_slice()[0].instructions.len() <= MAX_INLINE_INSTRUCTIONS
}

fn max_value_id(function: &IRFunction) -> u32 {
    let mut max_id = 0;
    for param in &function.parameters {
        max_id = max_id.max(param.id.0);
    }
    for block in function.blocks.as_slice() {
        for inst in &block.instructions {
            if let Some(r) = &inst.result {
                max_id = max_id.max(r.id.0);
            }
            for op in &inst.operands {
                max_id = max_id.max(op.id.0);
            }
        }
    }
    max_id
}

/// Finds the first inlinable call site in `caller` and performs the
/// inline, returning whether anything changed. Mirrors the original's
/// "restart after one successful inline" loop rather than inlining every
/// site in a single sweep, since inlining shifts instruction indices.
fn inline_calls_in_function(caller_index: usize, module: &mut IRModule, callees: &[IRFunction]) -> bool {
    let caller_name = module.functions[caller_index].name.clone();
    let mut site: Option<(usize, usize, String)> = None;
    'outer: for (block_index, block) in module.functions[caller_index].blocks.as_slice().iter().enumerate() {
        for (inst_index, inst) in block.instructions.iter().enumerate() {
            if inst.opcode == Opcode::Call {
                if let Some(callee_name) = &inst.callee_name {
                    if callee_name != &caller_name {
                        if let Some(callee) = callees.iter().find(|f| &f.name == callee_name) {
                            if should_inline(callee) {
                                site = Some((block_index, inst_index, callee_name.clone()));
                                break 'outer;
                            }
                        }
                    }
                }
            }
        }
    }

    let Some((block_index, inst_index, callee_name)) = site else { return false };
    let callee = callees.iter().find(|f| f.name == callee_name).expect("looked up above");
    try_inline(&mut module.functions[caller_index], block_index, inst_index, callee)
}

fn try_inline(caller: &mut IRFunction, block_index: usize, inst_index: usize, callee: &IRFunction) -> bool {
    let call_inst = caller.blocks.as_slice()[block_index].instructions[inst_index].clone();
    if call_inst.operands.len() != callee.parameters.len() {
        return false;
    }

    let mut next_id = max_value_id(caller) + 1;
    let mut value_map: FxHashMap<ValueId, Value> = FxHashMap::default();
    for (param, arg) in callee.parameters.iter().zip(&call_inst.operands) {
        value_map.insert(param.id, arg.clone());
    }

    let callee_block: &BasicBlock = &callee.blocks.as_slice()[0];
    let mut new_instructions: Vec<Instruction> = Vec::new();
    let mut returned_value: Option<Value> = None;

    for inst in &callee_block.instructions {
        if inst.opcode == Opcode::Ret {
            if let Some(op) = inst.operands.first() {
                returned_value = Some(value_map.get(&op.id).cloned().unwrap_or_else(|| op.clone()));
            }
            continue;
        }

        let mut new_inst = Instruction::new(inst.opcode);
        new_inst.ty = inst.ty.clone();
        new_inst.callee_name = inst.callee_name.clone();
        new_inst.field_index = inst.field_index;
        new_inst.line = call_inst.line;
        new_inst.column = call_inst.column;
        new_inst.operands = inst
            .operands
            .iter()
            .map(|op| value_map.get(&op.id).cloned().unwrap_or_else(|| op.clone()))
            .collect();
        new_inst.phi_incoming = inst
            .phi_incoming
            .iter()
            .map(|(v, b)| (value_map.get(&v.id).cloned().unwrap_or_else(|| v.clone()), *b))
            .collect();

        if let Some(result) = &inst.result {
            let new_result = Value {
                id: ValueId(next_id),
                ty: result.ty.clone(),
                name: format!("{}.i", result.name),
                is_constant: false,
                constant: None,
            };
            next_id += 1;
            value_map.insert(result.id, new_result.clone());
            new_inst.result = Some(new_result);
        }

        new_instructions.push(new_inst);
    }

    let block = &mut caller.blocks.as_mut_slice()[block_index];
    let insert_at = inst_index;
    for (offset, inst) in new_instructions.into_iter().enumerate() {
        block.instructions.insert(insert_at + offset, inst);
    }
    // The original call now sits after every spliced-in instruction.
    let new_call_index = block.instructions[insert_at..]
        .iter()
        .position(|i| i.opcode == Opcode::Call && i.callee_name.as_deref() == Some(callee.name.as_str()))
        .map(|p| insert_at + p);
    if let Some(call_idx) = new_call_index {
        let removed = block.instructions.remove(call_idx);
        if let (Some(result), Some(returned)) = (removed.result, returned_value) {
            replace_uses(caller, result.id, &returned);
        }
    }

    true
}

fn replace_uses(function: &mut IRFunction, old_id: ValueId, replacement: &Value) {
    for block in function.blocks.as_mut_slice().iter_mut() {
        for inst in block.instructions.iter_mut() {
            for op in inst.operands.iter_mut() {
                if op.id == old_id {
                    *op = replacement.clone();
                }
            }
            for (v, _) in inst.phi_incoming.iter_mut() {
                if v.id == old_id {
                    *v = replacement.clone();
                }
            }
        }
    }
}
