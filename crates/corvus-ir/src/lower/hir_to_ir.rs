//! Grounded on `original_source/src/ir/ir_lowering.cpp`: a scope stack
//! mapping source bindings to storage, a loop-context stack for
//! break/continue targets, and a running counter for unique block labels.
//! Re-expressed against the builder in `crate::builder` instead of the
//! original's raw `IRBuilder*`.

use crate::builder::Builder;
use crate::ir::*;
use corvus_sem::hir;
use corvus_sem::Type;
use corvus_util::{DefId, FxHashMap, Symbol};

#[derive(Debug, thiserror::Error)]
pub enum LowerError {
    #[error("{0}")]
    Unsupported(String),
}

/// One-way bridge from the semantic type lattice to the IR's own, narrower
/// type representation. Generics never reach here: monomorphization has
/// already substituted every `Type::Generic` for a concrete type.
pub fn lower_type(ty: &Type) -> IRType {
    use corvus_sem::types::{FloatWidth, IntWidth};
    match ty {
        Type::Int(IntWidth::W8, true) => IRType::I8,
        Type::Int(IntWidth::W16, true) => IRType::I16,
        Type::Int(IntWidth::W32, true) => IRType::I32,
        Type::Int(IntWidth::W64, true) => IRType::I64,
        Type::Int(IntWidth::W128, true) => IRType::I128,
        Type::Int(IntWidth::Ptr, true) => IRType::I64,
        Type::Int(IntWidth::W8, false) => IRType::U8,
        Type::Int(IntWidth::W16, false) => IRType::U16,
        Type::Int(IntWidth::W32, false) => IRType::U32,
        Type::Int(IntWidth::W64, false) => IRType::U64,
        Type::Int(IntWidth::W128, false) => IRType::U128,
        Type::Int(IntWidth::Ptr, false) => IRType::U64,
        Type::Float(FloatWidth::W32) => IRType::F32,
        Type::Float(FloatWidth::W64) => IRType::F64,
        Type::Float(FloatWidth::W128) => IRType::F128,
        Type::Bool => IRType::Bool,
        Type::Char => IRType::U32,
        Type::String => IRType::ptr(IRType::U8),
        Type::Void => IRType::Void,
        Type::Never => IRType::Never,
        Type::Unknown => IRType::Void,
        Type::Reference(t, _) => IRType::ptr(lower_type(t)),
        Type::Tuple(ts) => IRType::Tuple(ts.iter().map(lower_type).collect()),
        Type::Array(t, n) => IRType::Array(Box::new(lower_type(t)), *n),
        Type::Slice(t) => IRType::Slice(Box::new(lower_type(t))),
        Type::Fn(params, ret) => {
            IRType::Function(params.iter().map(lower_type).collect(), Box::new(lower_type(ret)))
        }
        Type::Struct(name, _) => IRType::Struct(name.as_str().to_string(), Vec::new()),
        Type::Enum(name, _) => IRType::Enum(name.as_str().to_string()),
        // Option<T>/Result<T, E> are lowered as two-field tagged structs:
        // field 0 is the `i32` discriminant, field 1 the payload (the `E`
        // payload of `Result::Err` and the unit payload of `None` both
        // reuse the same slot; the verifier never inspects it).
        Type::Option(t) => IRType::Struct("Option".to_string(), vec![IRType::I32, lower_type(t)]),
        Type::Result(t, e) => {
            IRType::Struct("Result".to_string(), vec![IRType::I32, lower_type(t), lower_type(e)])
        }
        Type::Generic(name, _) => IRType::Struct(name.as_str().to_string(), Vec::new()),
    }
}

struct EnumInfo {
    variants: Vec<Symbol>,
    variant_data: FxHashMap<Symbol, hir::VariantData>,
}

struct LoopContext {
    continue_target: BlockId,
    break_target: BlockId,
    label: Option<hir::LabelId>,
}

struct FunctionLowerer<'m> {
    builder: Builder,
    locals: FxHashMap<DefId, Value>,
    loop_stack: Vec<LoopContext>,
    label_counter: u32,
    structs: &'m FxHashMap<Symbol, hir::StructItem>,
    enums: &'m FxHashMap<Symbol, EnumInfo>,
}

/// Lower every resolved, monomorphized item into one flat [`IRModule`].
/// Non-goal (spec §1): trait/impl method dispatch has already been
/// resolved to concrete `FnItem`s by `corvus_sem::Resolver`, so only
/// `Item::Function` and `Item::Struct`/`Item::Enum` carry anything for
/// this phase to lower; trait and impl items contribute nothing beyond
/// their already-lowered function bodies (monomorphization inlines impl
/// methods into the flat function list using their mangled names).
pub fn lower_module(name: &str, items: &[hir::Item]) -> Result<IRModule, LowerError> {
    let mut structs = FxHashMap::default();
    let mut enums = FxHashMap::default();
    for item in items {
        match item {
            hir::Item::Struct(s) => {
                structs.insert(s.name, s.clone());
            }
            hir::Item::Enum(e) => {
                let variants: Vec<Symbol> = e.variants.iter().map(|v| v.name).collect();
                let variant_data = e.variants.iter().map(|v| (v.name, v.data.clone())).collect();
                enums.insert(e.name, EnumInfo { variants, variant_data });
            }
            _ => {}
        }
    }

    let mut module = IRModule::new(name);
    for item in items {
        if let hir::Item::Struct(s) = item {
            let fields = s.fields.iter().map(|f| (f.name.as_str().to_string(), lower_type(&f.ty))).collect();
            module.struct_layouts.push(StructLayout { name: s.name.as_str().to_string(), fields });
        }
    }

    for item in items {
        if let hir::Item::Function(f) = item {
            let mut lowerer = FunctionLowerer {
                builder: Builder::new(),
                locals: FxHashMap::default(),
                loop_stack: Vec::new(),
                label_counter: 0,
                structs: &structs,
                enums: &enums,
            };
            module.functions.push(lowerer.lower_function(f)?);
        }
        if let hir::Item::Impl(imp) = item {
            for method in &imp.methods {
                let mut lowerer = FunctionLowerer {
                    builder: Builder::new(),
                    locals: FxHashMap::default(),
                    loop_stack: Vec::new(),
                    label_counter: 0,
                    structs: &structs,
                    enums: &enums,
                };
                module.functions.push(lowerer.lower_function(method)?);
            }
        }
    }
    Ok(module)
}

impl<'m> FunctionLowerer<'m> {
    fn unique_label(&mut self, prefix: &str) -> String {
        self.label_counter += 1;
        format!("{}{}", prefix, self.label_counter)
    }

    fn lower_function(&mut self, f: &hir::FnItem) -> Result<IRFunction, LowerError> {
        let params: Vec<Value> = f
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| Value {
                id: ValueId(i as u32),
                ty: lower_type(&p.ty),
                name: p.name.as_str().to_string(),
                is_constant: false,
                constant: None,
            })
            .collect();
        let return_type = lower_type(&f.ret_type);
        self.builder.create_function(f.name.as_str(), params.clone(), return_type.clone());
        let entry = self.builder.create_block("entry");
        self.builder.set_insert_point(entry);

        for (param, hir_param) in params.iter().zip(&f.params) {
            let slot = self.builder.emit_alloca(param.ty.clone(), hir_param.name.as_str());
            self.builder.emit_store(param.clone(), slot.clone());
            self.locals.insert(hir_param.def_id, slot);
        }

        let result = self.lower_block(&f.body)?;
        if !self.builder.is_current_block_terminated() {
            if matches!(return_type, IRType::Void) {
                self.builder.emit_ret(None);
            } else if let Some(v) = result {
                self.builder.emit_ret(Some(v));
            } else {
                self.builder.emit_unreachable();
            }
        }
        Ok(self.builder.finish_function())
    }

    /// Lowers a block, returning the value of its trailing expression (if
    /// any). Every statement is lowered for effect; `Stmt::Return`,
    /// `Break`, and `Continue` terminate the current block, after which
    /// remaining statements in the same block are unreachable and are
    /// skipped (spec §4.6 control-flow lowering).
    fn lower_block(&mut self, block: &hir::Block) -> Result<Option<Value>, LowerError> {
        for stmt in &block.stmts {
            if self.builder.is_current_block_terminated() {
                break;
            }
            self.lower_stmt(stmt)?;
        }
        if self.builder.is_current_block_terminated() {
            return Ok(None);
        }
        match &block.trailing {
            Some(expr) => Ok(Some(self.lower_expr(expr)?)),
            None => Ok(None),
        }
    }

    fn lower_stmt(&mut self, stmt: &hir::Stmt) -> Result<(), LowerError> {
        match stmt {
            hir::Stmt::Let { pattern, init, .. } => {
                let value = match init {
                    Some(e) => Some(self.lower_expr(e)?),
                    None => None,
                };
                self.bind_pattern(pattern, value)?;
                Ok(())
            }
            hir::Stmt::Expr(e) => {
                self.lower_expr(e)?;
                Ok(())
            }
            hir::Stmt::Return(e) => {
                let value = match e {
                    Some(e) => Some(self.lower_expr(e)?),
                    None => None,
                };
                self.builder.emit_ret(value);
                Ok(())
            }
            hir::Stmt::If { cond, then_block, else_clause } => {
                self.lower_if_stmt(cond, then_block, else_clause.as_deref())
            }
            hir::Stmt::While { cond, body, label } => self.lower_while(cond, body, *label),
            hir::Stmt::For { pattern, iter, body, label } => {
                self.lower_for(pattern, iter, body, *label)
            }
            hir::Stmt::Loop { body, label } => self.lower_loop(body, *label),
            hir::Stmt::Break(value, label) => {
                let target = self.find_loop(*label, true)?;
                if let Some(v) = value {
                    self.lower_expr(v)?;
                }
                self.builder.emit_br(target);
                Ok(())
            }
            hir::Stmt::Continue(label) => {
                let target = self.find_loop(*label, false)?;
                self.builder.emit_br(target);
                Ok(())
            }
        }
    }

    fn find_loop(&self, label: Option<hir::LabelId>, is_break: bool) -> Result<BlockId, LowerError> {
        let frame = match label {
            Some(l) => self.loop_stack.iter().rev().find(|f| f.label == Some(l)),
            None => self.loop_stack.last(),
        };
        let frame = frame.ok_or_else(|| LowerError::Unsupported("break/continue outside a loop".into()))?;
        Ok(if is_break { frame.break_target } else { frame.continue_target })
    }

    fn lower_if_stmt(
        &mut self,
        cond: &hir::Expr,
        then_block: &hir::Block,
        else_clause: Option<&hir::ElseClause>,
    ) -> Result<(), LowerError> {
        let cond_value = self.lower_expr(cond)?;
        let then_bb = self.builder.create_block("if.then");
        let else_bb = self.builder.create_block("if.else");
        let merge_bb = self.builder.create_block("if.end");
        self.builder.emit_cond_br(cond_value, then_bb, else_bb);

        self.builder.set_insert_point(then_bb);
        self.lower_block(then_block)?;
        if !self.builder.is_current_block_terminated() {
            self.builder.emit_br(merge_bb);
        }

        self.builder.set_insert_point(else_bb);
        match else_clause {
            Some(hir::ElseClause::Block(b)) => {
                self.lower_block(b)?;
            }
            Some(hir::ElseClause::If(stmt)) => {
                self.lower_stmt(stmt)?;
            }
            None => {}
        }
        if !self.builder.is_current_block_terminated() {
            self.builder.emit_br(merge_bb);
        }

        self.builder.set_insert_point(merge_bb);
        Ok(())
    }

    fn lower_while(&mut self, cond: &hir::Expr, body: &hir::Block, label: Option<hir::LabelId>) -> Result<(), LowerError> {
        let header = self.builder.create_block("while.cond");
        let body_bb = self.builder.create_block("while.body");
        let end_bb = self.builder.create_block("while.end");

        self.builder.emit_br(header);
        self.builder.set_insert_point(header);
        let cond_value = self.lower_expr(cond)?;
        self.builder.emit_cond_br(cond_value, body_bb, end_bb);

        self.builder.set_insert_point(body_bb);
        self.loop_stack.push(LoopContext { continue_target: header, break_target: end_bb, label });
        self.lower_block(body)?;
        self.loop_stack.pop();
        if !self.builder.is_current_block_terminated() {
            self.builder.emit_br(header);
        }

        self.builder.set_insert_point(end_bb);
        Ok(())
    }

    fn lower_loop(&mut self, body: &hir::Block, label: Option<hir::LabelId>) -> Result<(), LowerError> {
        let body_bb = self.builder.create_block("loop.body");
        let end_bb = self.builder.create_block("loop.end");
        self.builder.emit_br(body_bb);
        self.builder.set_insert_point(body_bb);
        self.loop_stack.push(LoopContext { continue_target: body_bb, break_target: end_bb, label });
        self.lower_block(body)?;
        self.loop_stack.pop();
        if !self.builder.is_current_block_terminated() {
            self.builder.emit_br(body_bb);
        }
        self.builder.set_insert_point(end_bb);
        Ok(())
    }

    /// `for pattern in start..end { body }`. General iterator protocols
    /// are out of scope (spec §1 treats only ranges as iterable without a
    /// runtime); any other iterable is rejected here rather than silently
    /// mis-lowered.
    fn lower_for(
        &mut self,
        pattern: &hir::Pattern,
        iter: &hir::Expr,
        body: &hir::Block,
        label: Option<hir::LabelId>,
    ) -> Result<(), LowerError> {
        let (start, end, inclusive) = match iter {
            hir::Expr::Range { start: Some(s), end: Some(e), inclusive, .. } => {
                (self.lower_expr(s)?, self.lower_expr(e)?, *inclusive)
            }
            _ => return Err(LowerError::Unsupported("for loops only support bounded ranges".into())),
        };
        let counter_ty = start.ty.clone();
        let counter = self.builder.emit_alloca(counter_ty.clone(), "for.counter");
        self.builder.emit_store(start, counter.clone());

        let header = self.builder.create_block("for.cond");
        let body_bb = self.builder.create_block("for.body");
        let end_bb = self.builder.create_block("for.end");

        self.builder.emit_br(header);
        self.builder.set_insert_point(header);
        let current = self.builder.emit_load(counter.clone());
        let cond_value = if inclusive {
            self.builder.emit_le(current.clone(), end.clone())
        } else {
            self.builder.emit_lt(current.clone(), end.clone())
        };
        self.builder.emit_cond_br(cond_value, body_bb, end_bb);

        self.builder.set_insert_point(body_bb);
        let bound = self.builder.emit_load(counter.clone());
        self.bind_pattern(pattern, Some(bound))?;
        self.loop_stack.push(LoopContext { continue_target: header, break_target: end_bb, label });
        self.lower_block(body)?;
        self.loop_stack.pop();
        if !self.builder.is_current_block_terminated() {
            let one = self.builder.const_int(counter_ty, 1);
            let loaded = self.builder.emit_load(counter.clone());
            let next = self.builder.emit_add(loaded, one);
            self.builder.emit_store(next, counter.clone());
            self.builder.emit_br(header);
        }

        self.builder.set_insert_point(end_bb);
        Ok(())
    }

    /// Bind every name introduced by `pattern` to a fresh alloca holding
    /// `value`. Patterns that can fail (literal/variant patterns) have no
    /// business inside a `let`/`for` binding position; the resolver
    /// already rejects those, so only irrefutable shapes reach here.
    fn bind_pattern(&mut self, pattern: &hir::Pattern, value: Option<Value>) -> Result<(), LowerError> {
        match pattern {
            hir::Pattern::Wildcard => Ok(()),
            hir::Pattern::Binding { def_id, name, ty, .. } => {
                let ir_ty = lower_type(ty);
                let slot = self.builder.emit_alloca(ir_ty, name.as_str());
                if let Some(v) = value {
                    self.builder.emit_store(v, slot.clone());
                }
                self.locals.insert(*def_id, slot);
                Ok(())
            }
            hir::Pattern::Tuple(elements) => {
                let value = value.ok_or_else(|| LowerError::Unsupported("tuple pattern needs a value".into()))?;
                for (i, elem) in elements.iter().enumerate() {
                    let field_ty = match &value.ty {
                        IRType::Tuple(ts) => ts.get(i).cloned().unwrap_or(IRType::Void),
                        _ => IRType::Void,
                    };
                    let extracted = self.builder.emit_extract_value(value.clone(), i as u32, field_ty);
                    self.bind_pattern(elem, Some(extracted))?;
                }
                Ok(())
            }
            other => Err(LowerError::Unsupported(format!("pattern not valid in a binding position: {:?}", other))),
        }
    }

    fn lower_expr(&mut self, expr: &hir::Expr) -> Result<Value, LowerError> {
        match expr {
            hir::Expr::Literal { lit, ty } => self.lower_literal(lit, ty),
            hir::Expr::Var { def_id, .. } => {
                let slot = self
                    .locals
                    .get(def_id)
                    .cloned()
                    .ok_or_else(|| LowerError::Unsupported("reference to an unbound variable".into()))?;
                Ok(self.builder.emit_load(slot))
            }
            hir::Expr::Binary { op, left, right, ty } => self.lower_binary(*op, left, right, ty),
            hir::Expr::Unary { op, expr, ty } => self.lower_unary(*op, expr, ty),
            hir::Expr::Call { callee, args, ty } => {
                let arg_values: Result<Vec<_>, _> = args.iter().map(|a| self.lower_expr(a)).collect();
                let arg_values = arg_values?;
                let ir_ty = lower_type(ty);
                Ok(self
                    .builder
                    .emit_call(callee.as_str(), arg_values, ir_ty.clone())
                    .unwrap_or_else(|| self.builder.const_int(IRType::Void, 0)))
            }
            hir::Expr::MethodCall { receiver, method, args, ty } => {
                let recv = self.lower_expr(receiver)?;
                let mut arg_values = vec![recv];
                for a in args {
                    arg_values.push(self.lower_expr(a)?);
                }
                let ir_ty = lower_type(ty);
                Ok(self
                    .builder
                    .emit_call(method.as_str(), arg_values, ir_ty.clone())
                    .unwrap_or_else(|| self.builder.const_int(IRType::Void, 0)))
            }
            hir::Expr::Field { .. } => {
                let field_ptr = self.lower_place(expr)?;
                Ok(self.builder.emit_load(field_ptr))
            }
            hir::Expr::Index { object, index, ty } => {
                let base = self.addressable(object)?;
                let idx = self.lower_expr(index)?;
                let elem_ty = lower_type(ty);
                let ptr = self.builder.emit_get_element_ptr(base, idx, elem_ty);
                Ok(self.builder.emit_load(ptr))
            }
            hir::Expr::Slice { object, start, end, ty } => {
                let base = self.addressable(object)?;
                let elem_ty = match lower_type(ty) {
                    IRType::Slice(t) => *t,
                    other => other,
                };
                let start_val = match start {
                    Some(e) => self.lower_expr(e)?,
                    None => self.builder.const_int(IRType::I64, 0),
                };
                let ptr = self.builder.emit_get_element_ptr(base.clone(), start_val.clone(), elem_ty);
                let len = match end {
                    Some(e) => {
                        let end_val = self.lower_expr(e)?;
                        self.builder.emit_sub(end_val, start_val)
                    }
                    None => {
                        let total = match &base.ty {
                            IRType::Pointer(inner) => match inner.as_ref() {
                                IRType::Array(_, n) => *n as i64,
                                _ => 0,
                            },
                            _ => 0,
                        };
                        let total_val = self.builder.const_int(IRType::I64, total);
                        self.builder.emit_sub(total_val, start_val)
                    }
                };
                Ok(self.builder.emit_array_init(vec![ptr, len], lower_type(ty)))
            }
            hir::Expr::Block(b) => {
                Ok(self.lower_block(b)?.unwrap_or_else(|| self.builder.const_int(IRType::Void, 0)))
            }
            hir::Expr::If { cond, then_expr, else_expr, ty } => {
                self.lower_if_expr(cond, then_expr, else_expr.as_deref(), ty)
            }
            hir::Expr::Match { scrutinee, arms, ty } => self.lower_match(scrutinee, arms, ty),
            hir::Expr::Assign { op, place, value } => self.lower_assign(*op, place, value),
            hir::Expr::Tuple { elements, ty } => {
                let mut values = Vec::new();
                for e in elements {
                    values.push(self.lower_expr(e)?);
                }
                Ok(self.builder.emit_array_init(values, lower_type(ty)))
            }
            hir::Expr::Array { elements, ty } => {
                let mut values = Vec::new();
                for e in elements {
                    values.push(self.lower_expr(e)?);
                }
                Ok(self.builder.emit_array_init(values, lower_type(ty)))
            }
            hir::Expr::Range { start, end, .. } => {
                let s = match start {
                    Some(e) => self.lower_expr(e)?,
                    None => self.builder.const_int(IRType::I64, 0),
                };
                let e = match end {
                    Some(e) => self.lower_expr(e)?,
                    None => self.builder.const_int(IRType::I64, 0),
                };
                Ok(self.builder.emit_array_init(vec![s, e], IRType::Tuple(vec![IRType::I64, IRType::I64])))
            }
            hir::Expr::Cast { expr, ty } => self.lower_cast(expr, ty),
            hir::Expr::StructLiteral { name, fields, ty } => {
                let layout_order = self.structs.get(name).map(|s| s.fields.iter().map(|f| f.name).collect::<Vec<_>>());
                let mut ordered = Vec::new();
                if let Some(order) = layout_order {
                    for field_name in order {
                        let (_, expr) = fields.iter().find(|(n, _)| *n == field_name).expect("resolver guarantees every field is present");
                        ordered.push(self.lower_expr(expr)?);
                    }
                } else {
                    for (_, expr) in fields {
                        ordered.push(self.lower_expr(expr)?);
                    }
                }
                Ok(self.builder.emit_struct_init(name.as_str(), ordered, lower_type(ty)))
            }
            hir::Expr::Move { expr, .. } => self.lower_expr(expr),
            hir::Expr::Try { expr, ty } => self.lower_try(expr, ty),
            // async/await/spawn have no runtime in this phase (spec §5
            // non-goal): the future's body, the awaited value, and the
            // spawned task are all evaluated inline as plain expressions.
            hir::Expr::Async { body, .. } => {
                Ok(self.lower_block(body)?.unwrap_or_else(|| self.builder.const_int(IRType::Void, 0)))
            }
            hir::Expr::Await { expr, .. } => self.lower_expr(expr),
            hir::Expr::Spawn { expr, .. } => self.lower_expr(expr),
        }
    }

    fn field_index(&self, object: &hir::Expr, field: Symbol) -> u32 {
        if let Type::Struct(name, _) = object.ty() {
            if let Some(s) = self.structs.get(&name) {
                if let Some(i) = s.fields.iter().position(|f| f.name == field) {
                    return i as u32;
                }
            }
        }
        0
    }

    /// Compute the address of an lvalue expression, for `Assign`'s target
    /// and for `Field`'s base-is-already-addressable fast path.
    fn lower_place(&mut self, expr: &hir::Expr) -> Result<Value, LowerError> {
        match expr {
            hir::Expr::Var { def_id, .. } => self
                .locals
                .get(def_id)
                .cloned()
                .ok_or_else(|| LowerError::Unsupported("assignment to a non-local binding".into())),
            hir::Expr::Field { object, field, ty } => {
                let base_ptr = self.addressable(object)?;
                let index = self.field_index(object, *field);
                Ok(self.builder.emit_get_field(base_ptr, index, lower_type(ty)))
            }
            hir::Expr::Index { object, index, ty } => {
                let base = self.addressable(object)?;
                let idx = self.lower_expr(index)?;
                Ok(self.builder.emit_get_element_ptr(base, idx, lower_type(ty)))
            }
            hir::Expr::Unary { op: hir::UnOp::Deref, expr, .. } => self.lower_expr(expr),
            _ => Err(LowerError::Unsupported("expression is not assignable".into())),
        }
    }

    /// The pointer to use as a GEP/field base: the expression's own
    /// address if it's an lvalue, otherwise its value spilled to a fresh
    /// alloca (needed when the base is itself a temporary, e.g. a
    /// function call returning a struct).
    fn addressable(&mut self, expr: &hir::Expr) -> Result<Value, LowerError> {
        if let Ok(ptr) = self.lower_place(expr) {
            return Ok(ptr);
        }
        let value = self.lower_expr(expr)?;
        let ty = value.ty.clone();
        let slot = self.builder.emit_alloca(ty, "tmp");
        self.builder.emit_store(value, slot.clone());
        Ok(slot)
    }

    fn lower_assign(&mut self, op: Option<hir::BinOp>, place: &hir::Expr, value: &hir::Expr) -> Result<Value, LowerError> {
        let ptr = self.lower_place(place)?;
        let rhs = self.lower_expr(value)?;
        let to_store = match op {
            Some(op) => {
                let current = self.builder.emit_load(ptr.clone());
                self.lower_binop_values(op, current, rhs)
            }
            None => rhs,
        };
        self.builder.emit_store(to_store, ptr);
        Ok(self.builder.const_int(IRType::Void, 0))
    }

    fn lower_literal(&mut self, lit: &hir::Literal, ty: &Type) -> Result<Value, LowerError> {
        let ir_ty = lower_type(ty);
        Ok(match lit {
            hir::Literal::Int(n) => self.builder.const_int(ir_ty, *n),
            hir::Literal::Float(f) => self.builder.const_float(ir_ty, *f),
            hir::Literal::String(s) => self.builder.const_string(s.as_str()),
            hir::Literal::Char(c) => self.builder.const_uint(ir_ty, *c as u64),
            hir::Literal::Bool(b) => self.builder.const_bool(*b),
            hir::Literal::Unit => self.builder.const_int(IRType::Void, 0),
        })
    }

    fn lower_binop_values(&mut self, op: hir::BinOp, l: Value, r: Value) -> Value {
        use hir::BinOp::*;
        match op {
            Add => self.builder.emit_add(l, r),
            Sub => self.builder.emit_sub(l, r),
            Mul => self.builder.emit_mul(l, r),
            Div => self.builder.emit_div(l, r),
            Mod => self.builder.emit_mod(l, r),
            Eq => self.builder.emit_eq(l, r),
            Ne => self.builder.emit_ne(l, r),
            Lt => self.builder.emit_lt(l, r),
            Gt => self.builder.emit_gt(l, r),
            Le => self.builder.emit_le(l, r),
            Ge => self.builder.emit_ge(l, r),
            And => self.builder.emit_logic_and(l, r),
            Or => self.builder.emit_logic_or(l, r),
            BitAnd => self.builder.emit_bit_and(l, r),
            BitOr => self.builder.emit_bit_or(l, r),
            BitXor => self.builder.emit_bit_xor(l, r),
            Shl => self.builder.emit_shl(l, r),
            Shr => self.builder.emit_shr(l, r),
        }
    }

    /// `&&`/`||` short-circuit (spec §4.6): the right operand is only
    /// evaluated in its own block, reached conditionally, and its value
    /// joins with the left operand's via a phi at the merge point.
    fn lower_binary(&mut self, op: hir::BinOp, left: &hir::Expr, right: &hir::Expr, ty: &Type) -> Result<Value, LowerError> {
        if matches!(op, hir::BinOp::And | hir::BinOp::Or) {
            let lhs = self.lower_expr(left)?;
            let entry = self.builder.current_block();
            let rhs_bb = self.builder.create_block(if op == hir::BinOp::And { "and.rhs" } else { "or.rhs" });
            let merge_bb = self.builder.create_block("logic.end");
            if op == hir::BinOp::And {
                self.builder.emit_cond_br(lhs.clone(), rhs_bb, merge_bb);
            } else {
                self.builder.emit_cond_br(lhs.clone(), merge_bb, rhs_bb);
            }
            self.builder.set_insert_point(rhs_bb);
            let rhs = self.lower_expr(right)?;
            let rhs_end = self.builder.current_block();
            if !self.builder.is_current_block_terminated() {
                self.builder.emit_br(merge_bb);
            }
            self.builder.set_insert_point(merge_bb);
            return Ok(self.builder.emit_phi(IRType::Bool, vec![(lhs, entry), (rhs, rhs_end)]));
        }
        let l = self.lower_expr(left)?;
        let r = self.lower_expr(right)?;
        let _ = ty;
        Ok(self.lower_binop_values(op, l, r))
    }

    fn lower_unary(&mut self, op: hir::UnOp, expr: &hir::Expr, ty: &Type) -> Result<Value, LowerError> {
        match op {
            hir::UnOp::Neg => {
                let v = self.lower_expr(expr)?;
                Ok(self.builder.emit_neg(v))
            }
            hir::UnOp::Not => {
                let v = self.lower_expr(expr)?;
                Ok(self.builder.emit_logic_not(v))
            }
            hir::UnOp::BitNot => {
                let v = self.lower_expr(expr)?;
                Ok(self.builder.emit_bit_not(v))
            }
            hir::UnOp::Deref => {
                let v = self.lower_expr(expr)?;
                Ok(self.builder.emit_load(v))
            }
            hir::UnOp::Ref(_) => {
                let _ = ty;
                self.lower_place(expr).or_else(|_| self.lower_expr(expr))
            }
        }
    }

    fn lower_if_expr(
        &mut self,
        cond: &hir::Expr,
        then_expr: &hir::Expr,
        else_expr: Option<&hir::Expr>,
        ty: &Type,
    ) -> Result<Value, LowerError> {
        let cond_value = self.lower_expr(cond)?;
        let then_bb = self.builder.create_block("if.then");
        let else_bb = self.builder.create_block("if.else");
        let merge_bb = self.builder.create_block("if.end");
        self.builder.emit_cond_br(cond_value, then_bb, else_bb);

        self.builder.set_insert_point(then_bb);
        let then_value = self.lower_expr(then_expr)?;
        let then_end = self.builder.current_block();
        if !self.builder.is_current_block_terminated() {
            self.builder.emit_br(merge_bb);
        }

        self.builder.set_insert_point(else_bb);
        let else_value = match else_expr {
            Some(e) => self.lower_expr(e)?,
            None => self.builder.const_int(IRType::Void, 0),
        };
        let else_end = self.builder.current_block();
        if !self.builder.is_current_block_terminated() {
            self.builder.emit_br(merge_bb);
        }

        self.builder.set_insert_point(merge_bb);
        Ok(self.builder.emit_phi(lower_type(ty), vec![(then_value, then_end), (else_value, else_end)]))
    }

    fn lower_cast(&mut self, expr: &hir::Expr, ty: &Type) -> Result<Value, LowerError> {
        let value = self.lower_expr(expr)?;
        let target = lower_type(ty);
        let opcode = match (&value.ty, &target) {
            (a, b) if a.is_integer() && b.is_integer() => Opcode::IntCast,
            (a, b) if a.is_float() && b.is_float() => Opcode::FloatCast,
            (a, b) if a.is_integer() && b.is_float() => Opcode::IntToFloat,
            (a, b) if a.is_float() && b.is_integer() => Opcode::FloatToInt,
            _ => Opcode::Bitcast,
        };
        Ok(self.builder.emit_cast(opcode, value, target))
    }

    /// `expr?` (spec §4.6): branch on the `Result`/`Option` discriminant
    /// (field 0), returning early through an implicit `Ret` when it
    /// signals `Err`/`None`, otherwise continuing with the unwrapped
    /// payload (field 1).
    fn lower_try(&mut self, expr: &hir::Expr, ty: &Type) -> Result<Value, LowerError> {
        let wrapped = self.lower_expr(expr)?;
        let wrapped_ty = wrapped.ty.clone();
        let tag = self.builder.emit_get_field(wrapped.clone(), 0, IRType::I32);
        let tag_value = self.builder.emit_load(tag);
        let zero = self.builder.const_int(IRType::I32, 0);
        let is_ok = self.builder.emit_eq(tag_value, zero);

        let continue_bb = self.builder.create_block("try.ok");
        let early_return_bb = self.builder.create_block("try.err");
        self.builder.emit_cond_br(is_ok, continue_bb, early_return_bb);

        self.builder.set_insert_point(early_return_bb);
        self.builder.emit_ret(Some(wrapped.clone()));

        self.builder.set_insert_point(continue_bb);
        let payload_ty = lower_type(ty);
        let _ = wrapped_ty;
        let payload_ptr = self.builder.emit_get_field(wrapped, 1, payload_ty.clone());
        Ok(self.builder.emit_load(payload_ptr))
    }

    /// Lowers `match` as a chain of discriminant/value compares, each
    /// arm evaluated in its own block and joined at a common merge point
    /// via phi, mirroring how `if`/`else if` chains already lower (spec
    /// §4.6). Guards are folded into the compare for that arm.
    fn lower_match(&mut self, scrutinee: &hir::Expr, arms: &[hir::Arm], ty: &Type) -> Result<Value, LowerError> {
        let scrutinee_value = self.lower_expr(scrutinee)?;
        let merge_bb = self.builder.create_block("match.end");
        let mut incoming = Vec::new();
        let mut next_check_bb: Option<BlockId> = None;

        for (i, arm) in arms.iter().enumerate() {
            let is_last = i == arms.len() - 1;
            let check_bb = next_check_bb.take().unwrap_or_else(|| self.builder.current_block());
            self.builder.set_insert_point(check_bb);

            let arm_bb = self.builder.create_block("match.arm");
            let fallthrough_bb = if is_last {
                merge_bb
            } else {
                self.builder.create_block("match.check")
            };

            let cond = self.lower_pattern_test(&arm.pattern, &scrutinee_value)?;
            let full_cond = match &arm.guard {
                Some(guard) => {
                    self.builder.set_insert_point(check_bb);
                    let guard_value = self.lower_expr(guard)?;
                    self.builder.emit_logic_and(cond, guard_value)
                }
                None => cond,
            };
            self.builder.emit_cond_br(full_cond, arm_bb, fallthrough_bb);

            self.builder.set_insert_point(arm_bb);
            self.bind_pattern_bindings(&arm.pattern, &scrutinee_value)?;
            let arm_value = self.lower_expr(&arm.body)?;
            let arm_end = self.builder.current_block();
            if !self.builder.is_current_block_terminated() {
                self.builder.emit_br(merge_bb);
                incoming.push((arm_value, arm_end));
            }

            if !is_last {
                next_check_bb = Some(fallthrough_bb);
            }
        }

        self.builder.set_insert_point(merge_bb);
        if incoming.is_empty() {
            self.builder.emit_unreachable();
            return Ok(self.builder.const_int(IRType::Void, 0));
        }
        Ok(self.builder.emit_phi(lower_type(ty), incoming))
    }

    /// Emits the boolean test for whether `scrutinee` matches `pattern`,
    /// without side effects beyond the comparison itself.
    fn lower_pattern_test(&mut self, pattern: &hir::Pattern, scrutinee: &Value) -> Result<Value, LowerError> {
        match pattern {
            hir::Pattern::Wildcard | hir::Pattern::Binding { .. } => Ok(self.builder.const_bool(true)),
            hir::Pattern::Literal(lit) => {
                let ty = scrutinee.ty.clone();
                let lit_value = match lit {
                    hir::Literal::Int(n) => self.builder.const_int(ty, *n),
                    hir::Literal::Bool(b) => self.builder.const_bool(*b),
                    hir::Literal::Char(c) => self.builder.const_uint(ty, *c as u64),
                    hir::Literal::Float(f) => self.builder.const_float(ty, *f),
                    hir::Literal::String(s) => self.builder.const_string(s.as_str()),
                    hir::Literal::Unit => self.builder.const_int(IRType::Void, 0),
                };
                Ok(self.builder.emit_eq(scrutinee.clone(), lit_value))
            }
            hir::Pattern::Variant { enum_name, variant } | hir::Pattern::TupleVariant { enum_name, variant, .. } => {
                self.variant_tag_test(enum_name, *variant, scrutinee)
            }
            hir::Pattern::StructVariant { enum_name, variant, .. } => match variant {
                Some(v) => self.variant_tag_test(enum_name, *v, scrutinee),
                None => Ok(self.builder.const_bool(true)),
            },
            hir::Pattern::Tuple(elements) => {
                let mut cond = self.builder.const_bool(true);
                if let IRType::Tuple(field_tys) = scrutinee.ty.clone() {
                    for (i, elem) in elements.iter().enumerate() {
                        let field_ty = field_tys.get(i).cloned().unwrap_or(IRType::Void);
                        let field_value = self.builder.emit_extract_value(scrutinee.clone(), i as u32, field_ty);
                        let elem_cond = self.lower_pattern_test(elem, &field_value)?;
                        cond = self.builder.emit_logic_and(cond, elem_cond);
                    }
                }
                Ok(cond)
            }
            hir::Pattern::Range(lo, hi, inclusive) => {
                let lo_value = self.literal_pattern_value(lo, &scrutinee.ty)?;
                let hi_value = self.literal_pattern_value(hi, &scrutinee.ty)?;
                let ge = self.builder.emit_ge(scrutinee.clone(), lo_value);
                let hi_cmp = if *inclusive {
                    self.builder.emit_le(scrutinee.clone(), hi_value)
                } else {
                    self.builder.emit_lt(scrutinee.clone(), hi_value)
                };
                Ok(self.builder.emit_logic_and(ge, hi_cmp))
            }
            hir::Pattern::Or(alts) => {
                let mut cond = self.builder.const_bool(false);
                for alt in alts {
                    let alt_cond = self.lower_pattern_test(alt, scrutinee)?;
                    cond = self.builder.emit_logic_or(cond, alt_cond);
                }
                Ok(cond)
            }
        }
    }

    fn literal_pattern_value(&mut self, pattern: &hir::Pattern, ty: &IRType) -> Result<Value, LowerError> {
        match pattern {
            hir::Pattern::Literal(hir::Literal::Int(n)) => Ok(self.builder.const_int(ty.clone(), *n)),
            hir::Pattern::Literal(hir::Literal::Char(c)) => Ok(self.builder.const_uint(ty.clone(), *c as u64)),
            _ => Err(LowerError::Unsupported("range pattern bound must be an integer or char literal".into())),
        }
    }

    fn variant_tag_test(&mut self, enum_name: &Symbol, variant: Symbol, scrutinee: &Value) -> Result<Value, LowerError> {
        let index = self
            .enums
            .get(enum_name)
            .and_then(|e| e.variants.iter().position(|v| *v == variant))
            .unwrap_or(0) as i64;
        let tag_ptr = self.builder.emit_get_field(scrutinee.clone(), 0, IRType::I32);
        let tag = self.builder.emit_load(tag_ptr);
        let expected = self.builder.const_int(IRType::I32, index);
        Ok(self.builder.emit_eq(tag, expected))
    }

    /// Binds every name a (now known-matching) pattern introduces, for
    /// use inside the arm body. Tuple-variant field `i` lives at payload
    /// slot `i`, a struct-variant field at the slot matching its
    /// declared order, mirroring [`lower_match`]'s tag-then-payload
    /// struct layout (see [`lower_type`]'s note on `Option`/`Result`).
    fn bind_pattern_bindings(&mut self, pattern: &hir::Pattern, scrutinee: &Value) -> Result<(), LowerError> {
        match pattern {
            hir::Pattern::Binding { def_id, name, ty, .. } => {
                let ir_ty = lower_type(ty);
                let slot = self.builder.emit_alloca(ir_ty, name.as_str());
                self.builder.emit_store(scrutinee.clone(), slot.clone());
                self.locals.insert(*def_id, slot);
                Ok(())
            }
            hir::Pattern::TupleVariant { elements, .. } => {
                for (i, elem) in elements.iter().enumerate() {
                    let field_ptr = self.builder.emit_get_field(scrutinee.clone(), (i + 1) as u32, IRType::Void);
                    let field_value = self.builder.emit_load(field_ptr);
                    self.bind_pattern_bindings(elem, &field_value)?;
                }
                Ok(())
            }
            hir::Pattern::StructVariant { fields, .. } => {
                for (i, (_, pat)) in fields.iter().enumerate() {
                    let field_ptr = self.builder.emit_get_field(scrutinee.clone(), (i + 1) as u32, IRType::Void);
                    let field_value = self.builder.emit_load(field_ptr);
                    self.bind_pattern_bindings(pat, &field_value)?;
                }
                Ok(())
            }
            hir::Pattern::Tuple(elements) => {
                if let IRType::Tuple(field_tys) = scrutinee.ty.clone() {
                    for (i, elem) in elements.iter().enumerate() {
                        let field_ty = field_tys.get(i).cloned().unwrap_or(IRType::Void);
                        let field_value = self.builder.emit_extract_value(scrutinee.clone(), i as u32, field_ty);
                        self.bind_pattern_bindings(elem, &field_value)?;
                    }
                }
                Ok(())
            }
            hir::Pattern::Or(alts) => {
                if let Some(first) = alts.first() {
                    self.bind_pattern_bindings(first, scrutinee)?;
                }
                Ok(())
            }
            hir::Pattern::Wildcard | hir::Pattern::Literal(_) | hir::Pattern::Variant { .. } | hir::Pattern::Range(..) => Ok(()),
        }
    }
}
