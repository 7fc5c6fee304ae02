//! Constant folding (spec §4.9). Grounded on
//! `original_source/src/ir/passes/constant_folding.cpp`'s per-opcode
//! switch. Unlike the original, operands here are owned copies rather
//! than shared pointers, so folding a result also has to be propagated
//! forward: once an instruction's result becomes a compile-time
//! constant, every later instruction's matching operand is rewritten to
//! carry that constant directly, which is what lets dead-code
//! elimination delete the now-unused arithmetic afterward.

use crate::ir::{ConstantValue, IRModule, Instruction, Opcode, Value, ValueId};
use corvus_util::FxHashMap;

pub fn fold_module(module: &mut IRModule) -> bool {
    let mut modified = false;
    for function in module.functions.iter_mut() {
        let mut constants: FxHashMap<ValueId, Value> = FxHashMap::default();
        for block in function.blocks.as_mut_slice().iter_mut() {
            for inst in block.instructions.iter_mut() {
                for operand in inst.operands.iter_mut() {
                    if let Some(c) = constants.get(&operand.id) {
                        *operand = c.clone();
                    }
                }
                for (value, _) in inst.phi_incoming.iter_mut() {
                    if let Some(c) = constants.get(&value.id) {
                        *value = c.clone();
                    }
                }
                if let Some(folded) = try_fold(inst) {
                    if let Some(result) = inst.result.as_mut() {
                        apply_fold(result, folded);
                        constants.insert(result.id, result.clone());
                        modified = true;
                    }
                }
            }
        }
    }
    modified
}

fn apply_fold(result: &mut Value, folded: ConstantValue) {
    result.is_constant = true;
    result.name = match &folded {
        ConstantValue::Int(n) => n.to_string(),
        ConstantValue::UInt(n) => n.to_string(),
        ConstantValue::Float(n) => n.to_string(),
        ConstantValue::Bool(b) => b.to_string(),
        ConstantValue::String(s) => format!("\"{}\"", s),
    };
    result.constant = Some(folded);
}

fn try_fold(inst: &Instruction) -> Option<ConstantValue> {
    if inst.result.is_none() {
        return None;
    }
    match inst.operands.len() {
        2 => fold_binary(inst),
        1 => fold_unary(inst),
        _ => None,
    }
}

fn fold_binary(inst: &Instruction) -> Option<ConstantValue> {
    let lhs = &inst.operands[0];
    let rhs = &inst.operands[1];
    if !lhs.is_constant || !rhs.is_constant {
        return None;
    }

    if let (Some(l), Some(r)) = (lhs.as_int(), rhs.as_int()) {
        let width = lhs.ty.int_width().unwrap_or(64);
        let signed = lhs.ty.is_signed();
        let wrapped = |v: i64| wrap_to_width(v, width, signed);
        return match inst.opcode {
            Opcode::Add => Some(ConstantValue::Int(wrapped(l.wrapping_add(r)))),
            Opcode::Sub => Some(ConstantValue::Int(wrapped(l.wrapping_sub(r)))),
            Opcode::Mul => Some(ConstantValue::Int(wrapped(l.wrapping_mul(r)))),
            Opcode::Div if r != 0 => Some(ConstantValue::Int(wrapped(l.wrapping_div(r)))),
            Opcode::Mod if r != 0 => Some(ConstantValue::Int(wrapped(l.wrapping_rem(r)))),
            Opcode::BitAnd => Some(ConstantValue::Int(wrapped(l & r))),
            Opcode::BitOr => Some(ConstantValue::Int(wrapped(l | r))),
            Opcode::BitXor => Some(ConstantValue::Int(wrapped(l ^ r))),
            Opcode::Shl => Some(ConstantValue::Int(wrapped(l.wrapping_shl(r as u32)))),
            Opcode::Shr => Some(ConstantValue::Int(wrapped(l.wrapping_shr(r as u32)))),
            Opcode::Eq => Some(ConstantValue::Bool(l == r)),
            Opcode::Ne => Some(ConstantValue::Bool(l != r)),
            Opcode::Lt => Some(ConstantValue::Bool(l < r)),
            Opcode::Le => Some(ConstantValue::Bool(l <= r)),
            Opcode::Gt => Some(ConstantValue::Bool(l > r)),
            Opcode::Ge => Some(ConstantValue::Bool(l >= r)),
            _ => None,
        };
    }

    if let (Some(l), Some(r)) = (lhs.as_float(), rhs.as_float()) {
        return match inst.opcode {
            Opcode::Add => Some(ConstantValue::Float(l + r)),
            Opcode::Sub => Some(ConstantValue::Float(l - r)),
            Opcode::Mul => Some(ConstantValue::Float(l * r)),
            Opcode::Div if r != 0.0 => Some(ConstantValue::Float(l / r)),
            Opcode::Mod if r != 0.0 => Some(ConstantValue::Float(l % r)),
            Opcode::Eq => Some(ConstantValue::Bool(l == r)),
            Opcode::Ne => Some(ConstantValue::Bool(l != r)),
            Opcode::Lt => Some(ConstantValue::Bool(l < r)),
            Opcode::Le => Some(ConstantValue::Bool(l <= r)),
            Opcode::Gt => Some(ConstantValue::Bool(l > r)),
            Opcode::Ge => Some(ConstantValue::Bool(l >= r)),
            _ => None,
        };
    }

    if let (Some(l), Some(r)) = (lhs.as_bool(), rhs.as_bool()) {
        return match inst.opcode {
            Opcode::LogicAnd => Some(ConstantValue::Bool(l && r)),
            Opcode::LogicOr => Some(ConstantValue::Bool(l || r)),
            Opcode::Eq => Some(ConstantValue::Bool(l == r)),
            Opcode::Ne => Some(ConstantValue::Bool(l != r)),
            _ => None,
        };
    }

    None
}

fn fold_unary(inst: &Instruction) -> Option<ConstantValue> {
    let operand = &inst.operands[0];
    if !operand.is_constant {
        return None;
    }
    match (inst.opcode, operand.as_int(), operand.as_bool()) {
        (Opcode::Neg, Some(n), _) => {
            let width = operand.ty.int_width().unwrap_or(64);
            Some(ConstantValue::Int(wrap_to_width(n.wrapping_neg(), width, operand.ty.is_signed())))
        }
        (Opcode::BitNot, Some(n), _) => {
            let width = operand.ty.int_width().unwrap_or(64);
            Some(ConstantValue::Int(wrap_to_width(!n, width, operand.ty.is_signed())))
        }
        (Opcode::LogicNot, _, Some(b)) => Some(ConstantValue::Bool(!b)),
        _ => None,
    }
}

/// Truncate to `width` bits, then sign-extend back to `i64` if the type
/// is signed (spec §8: arithmetic wraps modulo the operand's width
/// rather than overflowing into undefined behavior).
fn wrap_to_width(value: i64, width: u32, signed: bool) -> i64 {
    if width >= 64 {
        return value;
    }
    let mask = (1i64 << width) - 1;
    let truncated = value & mask;
    if signed && (truncated & (1 << (width - 1))) != 0 {
        truncated - (1 << width)
    } else {
        truncated
    }
}
