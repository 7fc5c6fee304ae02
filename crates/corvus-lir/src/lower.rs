//! IR to LIR Lowering
//!
//! Converts a verified, optimized `corvus_ir::IRFunction` into the flat
//! x86-64 instruction sequence defined in `lir`. This only covers
//! arithmetic, memory, control flow, and direct calls — enough to show
//! the seam into a real backend. Aggregate ops, casts, indirect calls,
//! switch, and phi resolution are left to the real backend: they need a
//! register allocator and calling-convention-aware copy insertion this
//! crate doesn't implement.

use crate::calling_convention::SystemVAbi;
use crate::lir::*;
use corvus_ir::{
    BasicBlock as IrBlock, IRFunction, IRType, Instruction as IrInst, Opcode, Value, ValueId,
};
use corvus_util::Symbol;
use std::collections::HashMap;

pub fn lower_ir_function(ir_fn: &IRFunction) -> Function {
    let mut lowerer = LirLowerer::new(Symbol::intern(&ir_fn.name));
    lowerer.function.param_count = ir_fn.parameters.len();
    for param in &ir_fn.parameters {
        let reg = lowerer.reg_for(param.id);
        lowerer.function.registers.push(reg);
    }
    for block in ir_fn.blocks.as_slice() {
        lowerer.lower_block(block);
    }
    lowerer.finish()
}

pub struct LirLowerer {
    pub function: Function,
    pub register_counter: u32,
    pub value_to_reg: HashMap<ValueId, VirtualRegister>,
}

impl LirLowerer {
    pub fn new(name: Symbol) -> Self {
        Self { function: Function::new(name), register_counter: 0, value_to_reg: HashMap::new() }
    }

    fn reg_for(&mut self, id: ValueId) -> VirtualRegister {
        if let Some(reg) = self.value_to_reg.get(&id) {
            return *reg;
        }
        let reg = self.new_scratch_reg();
        self.value_to_reg.insert(id, reg);
        reg
    }

    fn new_scratch_reg(&mut self) -> VirtualRegister {
        let reg = VirtualRegister::new(self.register_counter);
        self.register_counter += 1;
        reg
    }

    fn operand(&mut self, value: &Value) -> Operand {
        match &value.constant {
            Some(corvus_ir::ConstantValue::Int(n)) => Operand::Imm(*n),
            Some(corvus_ir::ConstantValue::UInt(n)) => Operand::Imm(*n as i64),
            Some(corvus_ir::ConstantValue::Bool(b)) => Operand::Imm(if *b { 1 } else { 0 }),
            _ => Operand::Reg(self.reg_for(value.id)),
        }
    }

    pub fn lower_block(&mut self, block: &IrBlock) {
        self.function.instructions.push(Instruction::Label { name: format!(".Lbb{}", block.id.0) });
        for inst in &block.instructions {
            self.lower_instruction(inst);
        }
    }

    fn lower_instruction(&mut self, inst: &IrInst) {
        match inst.opcode {
            Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::BitAnd
            | Opcode::BitOr
            | Opcode::BitXor
            | Opcode::Shl
            | Opcode::Shr => self.lower_binary(inst),
            Opcode::Div | Opcode::Mod => self.lower_divrem(inst),
            Opcode::Neg => self.lower_neg(inst),
            Opcode::BitNot => self.lower_not(inst),
            Opcode::Eq | Opcode::Ne | Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge => {
                self.lower_compare(inst)
            }
            Opcode::Alloca => self.lower_alloca(inst),
            Opcode::Load => self.lower_load(inst),
            Opcode::Store => self.lower_store(inst),
            Opcode::Br => {
                let target = inst.true_block.expect("br always carries a target");
                self.function.instructions.push(Instruction::Jmp { target: format!(".Lbb{}", target.0) });
            }
            Opcode::CondBr => self.lower_cond_br(inst),
            Opcode::Ret => {
                let value = inst.operands.first().map(|v| self.operand(v));
                self.function.instructions.push(Instruction::Ret { value });
            }
            Opcode::Unreachable => {
                self.function.instructions.push(Instruction::Ret { value: None });
            }
            Opcode::Call => self.lower_call(inst),
            _ => {
                // GetField/InsertValue/ExtractValue/StructInit/ArrayInit,
                // casts, Switch, CallIndirect, Phi: the real backend sees
                // the IR directly and lowers these with full type layout
                // and register-allocation context this crate doesn't have.
            }
        }
    }

    fn lower_binary(&mut self, inst: &IrInst) {
        let lhs = self.operand(&inst.operands[0]);
        let rhs = self.operand(&inst.operands[1]);
        let dest_reg = self.reg_for(inst.result.as_ref().expect("binary op always produces a result").id);
        let dest = Operand::Reg(dest_reg);
        self.function.instructions.push(Instruction::Mov { dest: dest.clone(), src: lhs });
        let op_inst = match inst.opcode {
            Opcode::Add => Instruction::Add { dest: dest.clone(), src: rhs },
            Opcode::Sub => Instruction::Sub { dest: dest.clone(), src: rhs },
            Opcode::Mul => Instruction::Mul { dest: dest.clone(), src: rhs, signed: true },
            Opcode::BitAnd => Instruction::And { dest: dest.clone(), src: rhs },
            Opcode::BitOr => Instruction::Or { dest: dest.clone(), src: rhs },
            Opcode::BitXor => Instruction::Xor { dest: dest.clone(), src: rhs },
            Opcode::Shl => Instruction::Shl { dest: dest.clone(), count: rhs },
            Opcode::Shr => Instruction::Shr { dest: dest.clone(), count: rhs },
            _ => unreachable!(),
        };
        self.function.instructions.push(op_inst);
    }

    fn lower_divrem(&mut self, inst: &IrInst) {
        let lhs = self.operand(&inst.operands[0]);
        let rhs = self.operand(&inst.operands[1]);
        let dest_reg = self.reg_for(inst.result.as_ref().expect("div/mod always produces a result").id);
        let dest = Operand::Reg(dest_reg);
        self.function.instructions.push(Instruction::Mov { dest: dest.clone(), src: lhs });
        match inst.opcode {
            Opcode::Div => self.function.instructions.push(Instruction::Idiv { dest, src: rhs }),
            Opcode::Mod => self.function.instructions.push(Instruction::IdivSigned { divisor: rhs }),
            _ => unreachable!(),
        }
    }

    fn lower_neg(&mut self, inst: &IrInst) {
        let src = self.operand(&inst.operands[0]);
        let dest_reg = self.reg_for(inst.result.as_ref().expect("neg always produces a result").id);
        let dest = Operand::Reg(dest_reg);
        self.function.instructions.push(Instruction::Mov { dest: dest.clone(), src });
        self.function.instructions.push(Instruction::Neg { dest });
    }

    fn lower_not(&mut self, inst: &IrInst) {
        let src = self.operand(&inst.operands[0]);
        let dest_reg = self.reg_for(inst.result.as_ref().expect("not always produces a result").id);
        let dest = Operand::Reg(dest_reg);
        self.function.instructions.push(Instruction::Mov { dest: dest.clone(), src });
        self.function.instructions.push(Instruction::Not { dest });
    }

    fn lower_compare(&mut self, inst: &IrInst) {
        let lhs = self.operand(&inst.operands[0]);
        let rhs = self.operand(&inst.operands[1]);
        self.function.instructions.push(Instruction::Cmp { src1: lhs, src2: rhs });

        let dest_reg = self.reg_for(inst.result.as_ref().expect("compare always produces a result").id);
        let dest = Operand::Reg(dest_reg);
        let cond = match inst.opcode {
            Opcode::Eq => Condition::Eq,
            Opcode::Ne => Condition::Ne,
            Opcode::Lt => Condition::L,
            Opcode::Le => Condition::Le,
            Opcode::Gt => Condition::G,
            Opcode::Ge => Condition::Ge,
            _ => unreachable!(),
        };
        self.function.instructions.push(Instruction::Mov { dest: dest.clone(), src: Operand::Imm(0) });
        let one = self.new_scratch_reg();
        self.function.instructions.push(Instruction::Mov { dest: Operand::Reg(one), src: Operand::Imm(1) });
        self.function.instructions.push(Instruction::Cmov { cond, dest, src: Operand::Reg(one) });
    }

    fn lower_cond_br(&mut self, inst: &IrInst) {
        let cond = self.operand(&inst.operands[0]);
        self.function.instructions.push(Instruction::Cmp { src1: cond, src2: Operand::Imm(0) });
        let then_block = inst.true_block.expect("condbr always carries a then target");
        let else_block = inst.false_block.expect("condbr always carries an else target");
        self.function.instructions.push(Instruction::Jcc { cond: Condition::Ne, target: format!(".Lbb{}", then_block.0) });
        self.function.instructions.push(Instruction::Jmp { target: format!(".Lbb{}", else_block.0) });
    }

    fn lower_alloca(&mut self, inst: &IrInst) {
        let dest_reg = self.reg_for(inst.result.as_ref().expect("alloca always produces a result").id);
        // Slot size is a frame-layout concern; the real backend assigns it
        // once register allocation and stack-frame planning have run.
        self.function.instructions.push(Instruction::Alloca { dest: Operand::Reg(dest_reg), size: Operand::Imm(8) });
    }

    fn lower_load(&mut self, inst: &IrInst) {
        let dest_reg = self.reg_for(inst.result.as_ref().expect("load always produces a result").id);
        self.function.instructions.push(Instruction::Load {
            dest: Operand::Reg(dest_reg),
            addr: Address::StackRelative { offset: 0 },
            width: width_of(&inst.ty),
        });
    }

    fn lower_store(&mut self, inst: &IrInst) {
        let value = self.operand(&inst.operands[0]);
        self.function.instructions.push(Instruction::Store {
            addr: Address::StackRelative { offset: 0 },
            src: value,
            width: width_of(&inst.operands[0].ty),
        });
    }

    fn lower_call(&mut self, inst: &IrInst) {
        for (i, arg) in inst.operands.iter().enumerate() {
            if let Some(reg) = SystemVAbi::get_arg_register(i) {
                let src = self.operand(arg);
                self.function.instructions.push(Instruction::Mov { dest: Operand::PhysReg(reg), src });
            }
        }
        let callee = inst.callee_name.as_deref().unwrap_or("?");
        self.function.instructions.push(Instruction::Call { target: CallTarget::Direct(Symbol::intern(callee)) });
        if let Some(result) = &inst.result {
            let dest_reg = self.reg_for(result.id);
            self.function.instructions.push(Instruction::Mov {
                dest: Operand::Reg(dest_reg),
                src: Operand::PhysReg(SystemVAbi::RET_REG),
            });
        }
    }

    pub fn finish(self) -> Function {
        self.function
    }
}

fn width_of(ty: &IRType) -> RegisterWidth {
    match ty.int_width() {
        Some(8) => RegisterWidth::W8,
        Some(16) => RegisterWidth::W16,
        Some(32) => RegisterWidth::W32,
        _ => RegisterWidth::W64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvus_ir::Builder;

    #[test]
    fn lowers_a_trivial_add_function() {
        let mut b = Builder::new();
        let param = corvus_ir::Value {
            id: corvus_ir::ValueId(0),
            ty: IRType::I32,
            name: "x".into(),
            is_constant: false,
            constant: None,
        };
        b.create_function("add_one", vec![param.clone()], IRType::I32);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let one = b.const_int(IRType::I32, 1);
        let sum = b.emit_add(param, one);
        b.emit_ret(Some(sum));
        let ir_fn = b.finish_function();

        let lir_fn = lower_ir_function(&ir_fn);
        assert_eq!(lir_fn.name.as_str(), "add_one");
        assert!(lir_fn.instructions.iter().any(|i| matches!(i, Instruction::Add { .. })));
        assert!(lir_fn.instructions.iter().any(|i| matches!(i, Instruction::Ret { .. })));
    }

    #[test]
    fn lowers_a_call_through_the_systemv_argument_registers() {
        let mut b = Builder::new();
        b.create_function("main", vec![], IRType::I32);
        let entry = b.create_block("entry");
        b.set_insert_point(entry);
        let arg = b.const_int(IRType::I32, 7);
        let result = b.emit_call("helper", vec![arg], IRType::I32).unwrap();
        b.emit_ret(Some(result));
        let ir_fn = b.finish_function();

        let lir_fn = lower_ir_function(&ir_fn);
        assert!(lir_fn.instructions.iter().any(|i| matches!(
            i,
            Instruction::Mov { dest: Operand::PhysReg(PhysicalRegister::RDI), .. }
        )));
        assert!(lir_fn.instructions.iter().any(|i| matches!(i, Instruction::Call { .. })));
    }
}
