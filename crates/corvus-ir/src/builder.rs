//! A single stateful builder that owns block insertion and value numbering
//! (spec §4.6). Grounded on `original_source/src/ir/ir_builder.{h,cpp}`:
//! the same `emit_*` fluent surface, re-expressed with `IndexVec`-backed
//! blocks addressed by [`BlockId`] instead of raw `BasicBlock*` (spec §9's
//! note on implementations without raw pointers).

use crate::ir::*;
use corvus_util::IndexVec;

pub struct Builder {
    function: Option<IRFunction>,
    current_block: BlockId,
    next_value_id: u32,
    block_counter: u32,
    line: u32,
    column: u32,
}

impl Builder {
    pub fn new() -> Self {
        Builder {
            function: None,
            current_block: BlockId(0),
            next_value_id: 0,
            block_counter: 0,
            line: 0,
            column: 0,
        }
    }

    pub fn create_function(&mut self, name: impl Into<String>, parameters: Vec<Value>, return_type: IRType) {
        self.next_value_id = parameters.iter().map(|p| p.id.0 + 1).max().unwrap_or(0);
        self.block_counter = 0;
        self.function = Some(IRFunction {
            name: name.into(),
            parameters,
            return_type,
            blocks: IndexVec::new(),
            entry: BlockId(0),
        });
    }

    pub fn set_source_location(&mut self, line: u32, column: u32) {
        self.line = line;
        self.column = column;
    }

    fn function_mut(&mut self) -> &mut IRFunction {
        self.function.as_mut().expect("create_function must be called before emitting IR")
    }

    pub fn create_block(&mut self, label_prefix: &str) -> BlockId {
        let label = format!("{}.{}", label_prefix, self.block_counter);
        self.block_counter += 1;
        let index = self.function.as_ref().unwrap().blocks.len();
        let id = BlockId(index as u32);
        let pushed = self.function_mut().blocks.push(BasicBlock::new(id, label));
        debug_assert_eq!(pushed, id);
        if index == 0 {
            self.function_mut().entry = id;
        }
        id
    }

    pub fn set_insert_point(&mut self, block: BlockId) {
        self.current_block = block;
    }

    pub fn current_block(&self) -> BlockId {
        self.current_block
    }

    pub fn is_current_block_terminated(&self) -> bool {
        self.function.as_ref().unwrap().blocks[self.current_block].is_terminated()
    }

    fn new_value(&mut self, ty: IRType) -> Value {
        let id = ValueId(self.next_value_id);
        self.next_value_id += 1;
        Value { id, ty, name: id.0.to_string(), is_constant: false, constant: None }
    }

    pub fn const_int(&mut self, ty: IRType, n: i64) -> Value {
        let id = ValueId(self.next_value_id);
        self.next_value_id += 1;
        Value::constant(id, ty, ConstantValue::Int(n))
    }

    pub fn const_uint(&mut self, ty: IRType, n: u64) -> Value {
        let id = ValueId(self.next_value_id);
        self.next_value_id += 1;
        Value::constant(id, ty, ConstantValue::UInt(n))
    }

    pub fn const_float(&mut self, ty: IRType, n: f64) -> Value {
        let id = ValueId(self.next_value_id);
        self.next_value_id += 1;
        Value::constant(id, ty, ConstantValue::Float(n))
    }

    pub fn const_bool(&mut self, b: bool) -> Value {
        let id = ValueId(self.next_value_id);
        self.next_value_id += 1;
        Value::constant(id, IRType::Bool, ConstantValue::Bool(b))
    }

    pub fn const_string(&mut self, s: impl Into<String>) -> Value {
        let id = ValueId(self.next_value_id);
        self.next_value_id += 1;
        Value::constant(id, IRType::ptr(IRType::U8), ConstantValue::String(s.into()))
    }

    fn insert(&mut self, inst: Instruction) {
        let block = self.current_block;
        self.function_mut().blocks[block].instructions.push(inst);
    }

    fn add_edge(&mut self, from: BlockId, to: BlockId) {
        let f = self.function_mut();
        f.blocks[from].successors.push(to);
        f.blocks[to].predecessors.push(from);
    }

    fn emit_binary(&mut self, op: Opcode, lhs: Value, rhs: Value, result_ty: IRType) -> Value {
        let result = self.new_value(result_ty.clone());
        let mut inst = Instruction::new(op);
        inst.ty = result_ty;
        inst.operands = vec![lhs, rhs];
        inst.result = Some(result.clone());
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        result
    }

    fn emit_unary(&mut self, op: Opcode, operand: Value, result_ty: IRType) -> Value {
        let result = self.new_value(result_ty.clone());
        let mut inst = Instruction::new(op);
        inst.ty = result_ty;
        inst.operands = vec![operand];
        inst.result = Some(result.clone());
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        result
    }

    pub fn emit_add(&mut self, l: Value, r: Value) -> Value {
        let ty = l.ty.clone();
        self.emit_binary(Opcode::Add, l, r, ty)
    }
    pub fn emit_sub(&mut self, l: Value, r: Value) -> Value {
        let ty = l.ty.clone();
        self.emit_binary(Opcode::Sub, l, r, ty)
    }
    pub fn emit_mul(&mut self, l: Value, r: Value) -> Value {
        let ty = l.ty.clone();
        self.emit_binary(Opcode::Mul, l, r, ty)
    }
    pub fn emit_div(&mut self, l: Value, r: Value) -> Value {
        let ty = l.ty.clone();
        self.emit_binary(Opcode::Div, l, r, ty)
    }
    pub fn emit_mod(&mut self, l: Value, r: Value) -> Value {
        let ty = l.ty.clone();
        self.emit_binary(Opcode::Mod, l, r, ty)
    }
    pub fn emit_neg(&mut self, v: Value) -> Value {
        let ty = v.ty.clone();
        self.emit_unary(Opcode::Neg, v, ty)
    }

    pub fn emit_bit_and(&mut self, l: Value, r: Value) -> Value {
        let ty = l.ty.clone();
        self.emit_binary(Opcode::BitAnd, l, r, ty)
    }
    pub fn emit_bit_or(&mut self, l: Value, r: Value) -> Value {
        let ty = l.ty.clone();
        self.emit_binary(Opcode::BitOr, l, r, ty)
    }
    pub fn emit_bit_xor(&mut self, l: Value, r: Value) -> Value {
        let ty = l.ty.clone();
        self.emit_binary(Opcode::BitXor, l, r, ty)
    }
    pub fn emit_shl(&mut self, l: Value, r: Value) -> Value {
        let ty = l.ty.clone();
        self.emit_binary(Opcode::Shl, l, r, ty)
    }
    pub fn emit_shr(&mut self, l: Value, r: Value) -> Value {
        let ty = l.ty.clone();
        self.emit_binary(Opcode::Shr, l, r, ty)
    }
    pub fn emit_bit_not(&mut self, v: Value) -> Value {
        let ty = v.ty.clone();
        self.emit_unary(Opcode::BitNot, v, ty)
    }

    pub fn emit_eq(&mut self, l: Value, r: Value) -> Value {
        self.emit_binary(Opcode::Eq, l, r, IRType::Bool)
    }
    pub fn emit_ne(&mut self, l: Value, r: Value) -> Value {
        self.emit_binary(Opcode::Ne, l, r, IRType::Bool)
    }
    pub fn emit_lt(&mut self, l: Value, r: Value) -> Value {
        self.emit_binary(Opcode::Lt, l, r, IRType::Bool)
    }
    pub fn emit_le(&mut self, l: Value, r: Value) -> Value {
        self.emit_binary(Opcode::Le, l, r, IRType::Bool)
    }
    pub fn emit_gt(&mut self, l: Value, r: Value) -> Value {
        self.emit_binary(Opcode::Gt, l, r, IRType::Bool)
    }
    pub fn emit_ge(&mut self, l: Value, r: Value) -> Value {
        self.emit_binary(Opcode::Ge, l, r, IRType::Bool)
    }

    pub fn emit_logic_and(&mut self, l: Value, r: Value) -> Value {
        self.emit_binary(Opcode::LogicAnd, l, r, IRType::Bool)
    }
    pub fn emit_logic_or(&mut self, l: Value, r: Value) -> Value {
        self.emit_binary(Opcode::LogicOr, l, r, IRType::Bool)
    }
    pub fn emit_logic_not(&mut self, v: Value) -> Value {
        self.emit_unary(Opcode::LogicNot, v, IRType::Bool)
    }

    pub fn emit_alloca(&mut self, ty: IRType, name: &str) -> Value {
        let mut result = self.new_value(IRType::ptr(ty.clone()));
        result.name = name.to_string();
        let mut inst = Instruction::new(Opcode::Alloca);
        inst.ty = ty;
        inst.result = Some(result.clone());
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        result
    }

    pub fn emit_load(&mut self, ptr: Value) -> Value {
        let pointee = match &ptr.ty {
            IRType::Pointer(p) => (**p).clone(),
            other => other.clone(),
        };
        self.emit_unary(Opcode::Load, ptr, pointee)
    }

    pub fn emit_store(&mut self, value: Value, ptr: Value) {
        let mut inst = Instruction::new(Opcode::Store);
        inst.operands = vec![value, ptr];
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
    }

    pub fn emit_get_element_ptr(&mut self, base: Value, index: Value, elem_ty: IRType) -> Value {
        let result_ty = IRType::ptr(elem_ty);
        let result = self.new_value(result_ty.clone());
        let mut inst = Instruction::new(Opcode::GetElementPtr);
        inst.ty = result_ty;
        inst.operands = vec![base, index];
        inst.result = Some(result.clone());
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        result
    }

    pub fn emit_get_field(&mut self, base: Value, field_index: u32, field_ty: IRType) -> Value {
        let result_ty = IRType::ptr(field_ty);
        let result = self.new_value(result_ty.clone());
        let mut inst = Instruction::new(Opcode::GetField);
        inst.ty = result_ty;
        inst.operands = vec![base];
        inst.field_index = Some(field_index);
        inst.result = Some(result.clone());
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        result
    }

    pub fn emit_cast(&mut self, op: Opcode, value: Value, target: IRType) -> Value {
        self.emit_unary(op, value, target)
    }

    pub fn emit_br(&mut self, target: BlockId) {
        let mut inst = Instruction::new(Opcode::Br);
        inst.true_block = Some(target);
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        self.add_edge(self.current_block, target);
    }

    pub fn emit_cond_br(&mut self, cond: Value, true_bb: BlockId, false_bb: BlockId) {
        let mut inst = Instruction::new(Opcode::CondBr);
        inst.operands = vec![cond];
        inst.true_block = Some(true_bb);
        inst.false_block = Some(false_bb);
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        self.add_edge(self.current_block, true_bb);
        self.add_edge(self.current_block, false_bb);
    }

    pub fn emit_switch(
        &mut self,
        discr: Value,
        targets: Vec<(i64, BlockId)>,
        otherwise: BlockId,
    ) {
        let current = self.current_block;
        let mut inst = Instruction::new(Opcode::Switch);
        inst.operands = vec![discr];
        inst.switch_targets = targets.clone();
        inst.switch_otherwise = Some(otherwise);
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        for (_, b) in targets {
            self.add_edge(current, b);
        }
        self.add_edge(current, otherwise);
    }

    pub fn emit_ret(&mut self, value: Option<Value>) {
        let mut inst = Instruction::new(Opcode::Ret);
        if let Some(v) = value {
            inst.operands = vec![v];
        }
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
    }

    pub fn emit_unreachable(&mut self) {
        let mut inst = Instruction::new(Opcode::Unreachable);
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
    }

    pub fn emit_call(&mut self, callee: &str, args: Vec<Value>, return_type: IRType) -> Option<Value> {
        let result = if matches!(return_type, IRType::Void) {
            None
        } else {
            Some(self.new_value(return_type.clone()))
        };
        let mut inst = Instruction::new(Opcode::Call);
        inst.ty = return_type;
        inst.operands = args;
        inst.callee_name = Some(callee.to_string());
        inst.result = result.clone();
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        result
    }

    pub fn emit_call_indirect(&mut self, callee: Value, args: Vec<Value>, return_type: IRType) -> Option<Value> {
        let result = if matches!(return_type, IRType::Void) {
            None
        } else {
            Some(self.new_value(return_type.clone()))
        };
        let mut inst = Instruction::new(Opcode::CallIndirect);
        inst.ty = return_type;
        let mut operands = vec![callee];
        operands.extend(args);
        inst.operands = operands;
        inst.result = result.clone();
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        result
    }

    pub fn emit_phi(&mut self, ty: IRType, incoming: Vec<(Value, BlockId)>) -> Value {
        let result = self.new_value(ty.clone());
        let mut inst = Instruction::new(Opcode::Phi);
        inst.ty = ty;
        inst.phi_incoming = incoming;
        inst.result = Some(result.clone());
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        result
    }

    pub fn emit_insert_value(&mut self, aggregate: Value, value: Value, index: u32) -> Value {
        let ty = aggregate.ty.clone();
        let result = self.new_value(ty.clone());
        let mut inst = Instruction::new(Opcode::InsertValue);
        inst.ty = ty;
        inst.operands = vec![aggregate, value];
        inst.field_index = Some(index);
        inst.result = Some(result.clone());
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        result
    }

    pub fn emit_extract_value(&mut self, aggregate: Value, index: u32, field_ty: IRType) -> Value {
        let result = self.new_value(field_ty.clone());
        let mut inst = Instruction::new(Opcode::ExtractValue);
        inst.ty = field_ty;
        inst.operands = vec![aggregate];
        inst.field_index = Some(index);
        inst.result = Some(result.clone());
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        result
    }

    pub fn emit_struct_init(&mut self, struct_name: &str, fields: Vec<Value>, struct_ty: IRType) -> Value {
        let result = self.new_value(struct_ty.clone());
        let mut inst = Instruction::new(Opcode::StructInit);
        inst.ty = struct_ty;
        inst.operands = fields;
        inst.callee_name = Some(struct_name.to_string());
        inst.result = Some(result.clone());
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        result
    }

    pub fn emit_array_init(&mut self, elements: Vec<Value>, array_ty: IRType) -> Value {
        let result = self.new_value(array_ty.clone());
        let mut inst = Instruction::new(Opcode::ArrayInit);
        inst.ty = array_ty;
        inst.operands = elements;
        inst.result = Some(result.clone());
        inst.line = self.line;
        inst.column = self.column;
        self.insert(inst);
        result
    }

    /// Finish the current function. If the entry block (or any block) was
    /// left unterminated (e.g. a `Void` function falling off the end of
    /// its body), it is closed with an implicit `ret void` (spec §4.6).
    pub fn finish_function(&mut self) -> IRFunction {
        let mut function = self.function.take().expect("create_function must be called before finish_function");
        for block in function.blocks.as_mut_slice().iter_mut() {
            if !block.is_terminated() {
                let mut inst = Instruction::new(Opcode::Ret);
                if !matches!(function.return_type, IRType::Void) {
                    inst.opcode = Opcode::Unreachable;
                }
                block.instructions.push(inst);
            }
        }
        function
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
