//! The IR verifier (spec §4.7). Grounded on
//! `original_source/src/ir/passes/ir_verifier.cpp`'s per-instruction
//! checks, extended with the two invariants the original doesn't need
//! because its backend never runs without a working lowerer: phi-incoming
//! matching the predecessor set (P6) and every operand being defined in a
//! block that dominates its use (P5).

use crate::analysis::cfg::ControlFlowGraph;
use crate::ir::{BlockId, IRFunction, IRModule, Instruction, Opcode, ValueId};
use corvus_util::FxHashMap;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyError {
    pub function: String,
    pub message: String,
}

impl std::fmt::Display for VerifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "function '{}': {}", self.function, self.message)
    }
}

/// Verifies every function in `module`, collecting every violation found
/// rather than stopping at the first (spec §4.7: "aggregate, don't
/// fail fast").
pub fn verify_module(module: &IRModule) -> Vec<VerifyError> {
    let mut errors = Vec::new();
    for function in &module.functions {
        verify_function(function, &mut errors);
    }
    errors
}

pub fn verify_function(function: &IRFunction, errors: &mut Vec<VerifyError>) {
    if function.blocks.is_empty() {
        return;
    }

    let cfg = ControlFlowGraph::new(function);
    let mut defined_in: FxHashMap<ValueId, BlockId> = FxHashMap::default();
    for param in &function.parameters {
        defined_in.insert(param.id, function.entry);
    }
    for (block_id, block) in function.blocks.iter_enumerated() {
        for inst in &block.instructions {
            if let Some(result) = &inst.result {
                defined_in.insert(result.id, block_id);
            }
        }
    }

    for (block_id, block) in function.blocks.iter_enumerated() {
        if block.instructions.is_empty() {
            errors.push(VerifyError {
                function: function.name.clone(),
                message: format!("block '{}' is empty and unterminated", block.label),
            });
            continue;
        }
        if !block.is_terminated() {
            errors.push(VerifyError {
                function: function.name.clone(),
                message: format!("block '{}' is not terminated (missing ret/br)", block.label),
            });
        }
        let preds: HashSet<BlockId> = block.predecessors.iter().copied().collect();
        for inst in &block.instructions {
            verify_instruction(inst, function, errors);
            verify_operand_dominance(inst, block_id, &defined_in, &cfg, function, errors);
            if inst.opcode == Opcode::Phi {
                verify_phi_incoming(inst, &preds, function, errors);
            }
        }
    }
}

fn verify_instruction(inst: &Instruction, function: &IRFunction, errors: &mut Vec<VerifyError>) {
    match inst.opcode {
        Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod | Opcode::BitAnd
        | Opcode::BitOr | Opcode::BitXor | Opcode::Shl | Opcode::Shr => {
            if inst.operands.len() != 2 {
                errors.push(VerifyError {
                    function: function.name.clone(),
                    message: format!("'{}' requires 2 operands", inst.opcode.as_str()),
                });
            } else if inst.operands[0].ty != inst.operands[1].ty {
                errors.push(VerifyError {
                    function: function.name.clone(),
                    message: format!(
                        "'{}' operand type mismatch ({} vs {})",
                        inst.opcode.as_str(),
                        inst.operands[0].ty,
                        inst.operands[1].ty
                    ),
                });
            }
        }
        Opcode::Br => {
            if inst.true_block.is_none() {
                errors.push(VerifyError {
                    function: function.name.clone(),
                    message: "br instruction missing target block".into(),
                });
            }
        }
        Opcode::CondBr => {
            if inst.operands.len() != 1 {
                errors.push(VerifyError {
                    function: function.name.clone(),
                    message: "condbr requires exactly one condition operand".into(),
                });
            } else if inst.operands[0].ty != crate::ir::IRType::Bool {
                errors.push(VerifyError {
                    function: function.name.clone(),
                    message: "condbr condition must be bool".into(),
                });
            }
            if inst.true_block.is_none() || inst.false_block.is_none() {
                errors.push(VerifyError {
                    function: function.name.clone(),
                    message: "condbr missing a target block".into(),
                });
            }
        }
        Opcode::Switch => {
            if inst.switch_otherwise.is_none() {
                errors.push(VerifyError {
                    function: function.name.clone(),
                    message: "switch missing an otherwise target".into(),
                });
            }
        }
        Opcode::Ret => {
            if inst.operands.len() > 1 {
                errors.push(VerifyError {
                    function: function.name.clone(),
                    message: "ret can only have 0 or 1 operand".into(),
                });
            }
            let is_void = function.return_type == crate::ir::IRType::Void;
            if is_void && !inst.operands.is_empty() {
                errors.push(VerifyError {
                    function: function.name.clone(),
                    message: "void function returns a value".into(),
                });
            } else if !is_void && inst.operands.is_empty() {
                errors.push(VerifyError {
                    function: function.name.clone(),
                    message: "non-void function returns nothing".into(),
                });
            }
        }
        _ => {}
    }
}

fn verify_phi_incoming(
    inst: &Instruction,
    preds: &HashSet<BlockId>,
    function: &IRFunction,
    errors: &mut Vec<VerifyError>,
) {
    let incoming: HashSet<BlockId> = inst.phi_incoming.iter().map(|(_, b)| *b).collect();
    if &incoming != preds {
        errors.push(VerifyError {
            function: function.name.clone(),
            message: "phi incoming blocks do not match the block's predecessor set".into(),
        });
    }
}

/// Every operand must be defined by an instruction (or be a parameter or
/// constant) in a block that dominates the block using it (spec P5) —
/// phi operands are exempt since they're defined "on the incoming edge",
/// not at the use site.
fn verify_operand_dominance(
    inst: &Instruction,
    use_block: BlockId,
    defined_in: &FxHashMap<ValueId, BlockId>,
    cfg: &ControlFlowGraph,
    function: &IRFunction,
    errors: &mut Vec<VerifyError>,
) {
    if inst.opcode == Opcode::Phi {
        return;
    }
    for operand in &inst.operands {
        if operand.is_constant {
            continue;
        }
        match defined_in.get(&operand.id) {
            Some(def_block) => {
                if *def_block != use_block && !cfg.dominates(*def_block, use_block) {
                    errors.push(VerifyError {
                        function: function.name.clone(),
                        message: format!(
                            "value %{} used in block '{}' is not defined in a dominating block",
                            operand.name,
                            function.blocks[use_block].label
                        ),
                    });
                }
            }
            None => {
                errors.push(VerifyError {
                    function: function.name.clone(),
                    message: format!("value %{} used before it is defined", operand.name),
                });
            }
        }
    }
}
