//! corvus-mono - Generic monomorphization (spec §4.5).
//!
//! Consumes the resolver's typed items plus its instantiation set — every
//! `(generic function name, concrete type args)` pair actually observed at
//! a call site — and produces a module with no remaining generic function
//! declarations: each instantiation gets its own cloned, substituted,
//! mangled copy, and every call site that targets a generic function is
//! rewritten to call the specific specialization it resolved to.
//!
//! The instantiation set isn't closed under transitivity up front (a
//! generic function calling another generic function only records the
//! inner call's concrete args once the outer one is itself a concrete
//! instantiation), so [`Monomorphizer::run`] drains a work queue and lets
//! specializing one function push further instantiations onto it.

use corvus_sem::hir;
use corvus_sem::resolver::ResolveOutput;
use corvus_sem::types::Type;
use corvus_util::{DefIdGenerator, FxHashMap, FxHashSet, Symbol};
use std::collections::VecDeque;

/// Deterministic name mangling, following `original_source`'s
/// `mangle_type`/`mangle_name` exactly (spec.md §4.5's table): primitive
/// names fold to their short form, `&T` becomes `RefT`, and a function
/// with zero type arguments keeps its name unchanged.
pub fn mangle_name(name: Symbol, type_args: &[Type]) -> String {
    if type_args.is_empty() {
        return name.as_str().to_string();
    }
    let args = type_args
        .iter()
        .map(Type::mangle)
        .collect::<Vec<_>>()
        .join("_");
    format!("{}__{}", name.as_str(), args)
}

fn unify_generic(declared: &Type, actual: &Type, bindings: &mut FxHashMap<Symbol, Type>) {
    match (declared, actual) {
        (Type::Generic(name, _), _) => {
            bindings.entry(*name).or_insert_with(|| actual.clone());
        }
        (Type::Reference(d, _), Type::Reference(a, _)) => unify_generic(d, a, bindings),
        (Type::Tuple(ds), Type::Tuple(as_)) => {
            for (d, a) in ds.iter().zip(as_) {
                unify_generic(d, a, bindings);
            }
        }
        (Type::Array(d, _), Type::Array(a, _)) => unify_generic(d, a, bindings),
        (Type::Slice(d), Type::Slice(a)) => unify_generic(d, a, bindings),
        (Type::Option(d), Type::Option(a)) => unify_generic(d, a, bindings),
        (Type::Result(d1, d2), Type::Result(a1, a2)) => {
            unify_generic(d1, a1, bindings);
            unify_generic(d2, a2, bindings);
        }
        (Type::Struct(_, ds), Type::Struct(_, as_)) | (Type::Enum(_, ds), Type::Enum(_, as_)) => {
            for (d, a) in ds.iter().zip(as_) {
                unify_generic(d, a, bindings);
            }
        }
        _ => {}
    }
}

fn substitute_all(ty: &Type, bindings: &FxHashMap<Symbol, Type>) -> Type {
    let mut result = ty.clone();
    for (name, concrete) in bindings {
        result = result.substitute(*name, concrete);
    }
    result
}

/// Clones each generic declaration once per distinct concrete instantiation
/// observed by the resolver, and rewrites every call site to the mangled
/// specialization it resolves to. Driven by a work queue rather than a
/// single pass so that instantiating `foo<i32>`, which internally calls
/// `bar<T>`, discovers and schedules `bar<i32>` too (spec.md §4.5's
/// "closed under transitivity" requirement).
pub struct Monomorphizer {
    def_ids: DefIdGenerator,
    generic_fns: FxHashMap<Symbol, hir::FnItem>,
    instantiated: FxHashSet<String>,
}

impl Monomorphizer {
    pub fn new() -> Self {
        Self {
            def_ids: DefIdGenerator::new(),
            generic_fns: FxHashMap::default(),
            instantiated: FxHashSet::default(),
        }
    }

    pub fn run(mut self, output: ResolveOutput) -> Vec<hir::Item> {
        let mut kept: Vec<hir::Item> = Vec::with_capacity(output.items.len());
        for item in output.items {
            match item {
                hir::Item::Function(f) if !f.generics.params.is_empty() => {
                    self.generic_fns.insert(f.name, f);
                }
                hir::Item::Impl(mut imp) => {
                    // Generic methods live in the same flat name space as
                    // generic functions (spec.md §4.5 doesn't distinguish
                    // them) so the resolver's method-call instantiations,
                    // which only record the plain method name, resolve
                    // against the same map a `Call` would.
                    let mut retained = Vec::with_capacity(imp.methods.len());
                    for method in imp.methods {
                        if method.generics.params.is_empty() {
                            retained.push(method);
                        } else {
                            self.generic_fns.insert(method.name, method);
                        }
                    }
                    imp.methods = retained;
                    kept.push(hir::Item::Impl(imp));
                }
                other => kept.push(other),
            }
        }

        let mut queue: VecDeque<(Symbol, Vec<Type>)> = output.instantiations.into();

        // Call sites inside code that isn't itself being specialized (plain
        // functions, non-generic methods) still need their callee renamed
        // to whatever mangled specialization they resolve to.
        for item in &mut kept {
            match item {
                hir::Item::Function(f) => {
                    rewrite_block(&mut f.body, &FxHashMap::default(), &self.generic_fns, &mut queue);
                }
                hir::Item::Impl(imp) => {
                    for method in &mut imp.methods {
                        rewrite_block(&mut method.body, &FxHashMap::default(), &self.generic_fns, &mut queue);
                    }
                }
                _ => {}
            }
        }

        let mut result = kept;
        while let Some((name, args)) = queue.pop_front() {
            let mangled = mangle_name(name, &args);
            if self.instantiated.contains(&mangled) {
                continue;
            }
            let Some(decl) = self.generic_fns.get(&name).cloned() else {
                tracing::warn!(
                    function = name.as_str(),
                    "monomorphization requested for a generic declaration that no longer exists; skipping"
                );
                continue;
            };
            self.instantiated.insert(mangled.clone());

            let mut bindings = FxHashMap::default();
            for (param, concrete) in decl.generics.params.iter().zip(&args) {
                bindings.insert(param.name, concrete.clone());
            }

            let mut specialized = decl;
            specialized.def_id = self.def_ids.next();
            specialized.name = Symbol::intern(&mangled);
            specialized.generics.params.clear();
            specialized.generics.where_clause.clear();
            for param in &mut specialized.params {
                param.ty = substitute_all(&param.ty, &bindings);
            }
            specialized.ret_type = substitute_all(&specialized.ret_type, &bindings);
            rewrite_block(&mut specialized.body, &bindings, &self.generic_fns, &mut queue);

            // Specializations of methods are emitted as free functions too:
            // `MethodCall` lowering already calls by name with the receiver
            // as the first argument (self is `decl.params[0]`), so a
            // mangled method needs no different shape than a mangled
            // function.
            result.push(hir::Item::Function(specialized));
        }

        result
    }
}

impl Default for Monomorphizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Substitutes generic params throughout a block (every type-bearing field:
/// parameter types already done by the caller, so here it's let bindings,
/// patterns, and nested expressions) and rewrites any call inside it that
/// targets a generic function, queuing the concrete instantiation it needs.
fn rewrite_block(
    block: &mut hir::Block,
    bindings: &FxHashMap<Symbol, Type>,
    generic_fns: &FxHashMap<Symbol, hir::FnItem>,
    queue: &mut VecDeque<(Symbol, Vec<Type>)>,
) {
    block.ty = substitute_all(&block.ty, bindings);
    for stmt in &mut block.stmts {
        rewrite_stmt(stmt, bindings, generic_fns, queue);
    }
    if let Some(trailing) = &mut block.trailing {
        rewrite_expr(trailing, bindings, generic_fns, queue);
    }
}

fn rewrite_stmt(
    stmt: &mut hir::Stmt,
    bindings: &FxHashMap<Symbol, Type>,
    generic_fns: &FxHashMap<Symbol, hir::FnItem>,
    queue: &mut VecDeque<(Symbol, Vec<Type>)>,
) {
    match stmt {
        hir::Stmt::Let { pattern, ty, init, .. } => {
            rewrite_pattern(pattern, bindings);
            *ty = substitute_all(ty, bindings);
            if let Some(init) = init {
                rewrite_expr(init, bindings, generic_fns, queue);
            }
        }
        hir::Stmt::Expr(e) => rewrite_expr(e, bindings, generic_fns, queue),
        hir::Stmt::Return(e) => {
            if let Some(e) = e {
                rewrite_expr(e, bindings, generic_fns, queue);
            }
        }
        hir::Stmt::If { cond, then_block, else_clause } => {
            rewrite_expr(cond, bindings, generic_fns, queue);
            rewrite_block(then_block, bindings, generic_fns, queue);
            if let Some(else_clause) = else_clause {
                rewrite_else(else_clause, bindings, generic_fns, queue);
            }
        }
        hir::Stmt::While { cond, body, .. } => {
            rewrite_expr(cond, bindings, generic_fns, queue);
            rewrite_block(body, bindings, generic_fns, queue);
        }
        hir::Stmt::For { pattern, iter, body, .. } => {
            rewrite_pattern(pattern, bindings);
            rewrite_expr(iter, bindings, generic_fns, queue);
            rewrite_block(body, bindings, generic_fns, queue);
        }
        hir::Stmt::Loop { body, .. } => rewrite_block(body, bindings, generic_fns, queue),
        hir::Stmt::Break(e, _) => {
            if let Some(e) = e {
                rewrite_expr(e, bindings, generic_fns, queue);
            }
        }
        hir::Stmt::Continue(_) => {}
    }
}

fn rewrite_else(
    clause: &mut hir::ElseClause,
    bindings: &FxHashMap<Symbol, Type>,
    generic_fns: &FxHashMap<Symbol, hir::FnItem>,
    queue: &mut VecDeque<(Symbol, Vec<Type>)>,
) {
    match clause {
        hir::ElseClause::Block(b) => rewrite_block(b, bindings, generic_fns, queue),
        hir::ElseClause::If(s) => rewrite_stmt(s, bindings, generic_fns, queue),
    }
}

fn rewrite_pattern(pattern: &mut hir::Pattern, bindings: &FxHashMap<Symbol, Type>) {
    match pattern {
        hir::Pattern::Binding { ty, .. } => *ty = substitute_all(ty, bindings),
        hir::Pattern::TupleVariant { elements, .. } => {
            for e in elements {
                rewrite_pattern(e, bindings);
            }
        }
        hir::Pattern::StructVariant { fields, .. } => {
            for (_, p) in fields {
                rewrite_pattern(p, bindings);
            }
        }
        hir::Pattern::Tuple(ps) | hir::Pattern::Or(ps) => {
            for p in ps {
                rewrite_pattern(p, bindings);
            }
        }
        hir::Pattern::Range(a, b, _) => {
            rewrite_pattern(a, bindings);
            rewrite_pattern(b, bindings);
        }
        hir::Pattern::Wildcard | hir::Pattern::Literal(_) | hir::Pattern::Variant { .. } => {}
    }
}

/// Rewrites one expression tree in place. The only node that actually
/// changes shape is `Call`: if its callee names a generic declaration, the
/// concrete argument types (already substituted by the time we reach this
/// call, since we rewrite bottom-up) tell us exactly which specialization
/// it needs, so we queue that instantiation and repoint the callee at its
/// mangled name.
fn rewrite_expr(
    expr: &mut hir::Expr,
    bindings: &FxHashMap<Symbol, Type>,
    generic_fns: &FxHashMap<Symbol, hir::FnItem>,
    queue: &mut VecDeque<(Symbol, Vec<Type>)>,
) {
    match expr {
        hir::Expr::Literal { ty, .. } => *ty = substitute_all(ty, bindings),
        hir::Expr::Var { ty, .. } => *ty = substitute_all(ty, bindings),
        hir::Expr::Binary { left, right, ty, .. } => {
            rewrite_expr(left, bindings, generic_fns, queue);
            rewrite_expr(right, bindings, generic_fns, queue);
            *ty = substitute_all(ty, bindings);
        }
        hir::Expr::Unary { expr: inner, ty, .. } => {
            rewrite_expr(inner, bindings, generic_fns, queue);
            *ty = substitute_all(ty, bindings);
        }
        hir::Expr::Call { callee, args, ty } => {
            for arg in args.iter_mut() {
                rewrite_expr(arg, bindings, generic_fns, queue);
            }
            *ty = substitute_all(ty, bindings);
            if let Some(decl) = generic_fns.get(callee) {
                let mut call_bindings = FxHashMap::default();
                for (param, arg) in decl.params.iter().zip(args.iter()) {
                    unify_generic(&param.ty, &arg.ty(), &mut call_bindings);
                }
                let concrete: Vec<Type> = decl
                    .generics
                    .params
                    .iter()
                    .map(|g| call_bindings.get(&g.name).cloned().unwrap_or(Type::Unknown))
                    .collect();
                let mangled = mangle_name(*callee, &concrete);
                queue.push_back((*callee, concrete));
                *callee = Symbol::intern(&mangled);
            }
        }
        hir::Expr::MethodCall { receiver, method, args, ty } => {
            rewrite_expr(receiver, bindings, generic_fns, queue);
            for arg in args.iter_mut() {
                rewrite_expr(arg, bindings, generic_fns, queue);
            }
            *ty = substitute_all(ty, bindings);
            if let Some(decl) = generic_fns.get(method) {
                let mut call_bindings = FxHashMap::default();
                for (param, arg) in decl.params.iter().skip(1).zip(args.iter()) {
                    unify_generic(&param.ty, &arg.ty(), &mut call_bindings);
                }
                let concrete: Vec<Type> = decl
                    .generics
                    .params
                    .iter()
                    .map(|g| call_bindings.get(&g.name).cloned().unwrap_or(Type::Unknown))
                    .collect();
                let mangled = mangle_name(*method, &concrete);
                queue.push_back((*method, concrete));
                *method = Symbol::intern(&mangled);
            }
        }
        hir::Expr::Field { object, ty, .. } => {
            rewrite_expr(object, bindings, generic_fns, queue);
            *ty = substitute_all(ty, bindings);
        }
        hir::Expr::Index { object, index, ty, .. } => {
            rewrite_expr(object, bindings, generic_fns, queue);
            rewrite_expr(index, bindings, generic_fns, queue);
            *ty = substitute_all(ty, bindings);
        }
        hir::Expr::Slice { object, start, end, ty } => {
            rewrite_expr(object, bindings, generic_fns, queue);
            if let Some(s) = start {
                rewrite_expr(s, bindings, generic_fns, queue);
            }
            if let Some(e) = end {
                rewrite_expr(e, bindings, generic_fns, queue);
            }
            *ty = substitute_all(ty, bindings);
        }
        hir::Expr::Block(b) => rewrite_block(b, bindings, generic_fns, queue),
        hir::Expr::If { cond, then_expr, else_expr, ty } => {
            rewrite_expr(cond, bindings, generic_fns, queue);
            rewrite_expr(then_expr, bindings, generic_fns, queue);
            if let Some(e) = else_expr {
                rewrite_expr(e, bindings, generic_fns, queue);
            }
            *ty = substitute_all(ty, bindings);
        }
        hir::Expr::Match { scrutinee, arms, ty } => {
            rewrite_expr(scrutinee, bindings, generic_fns, queue);
            for arm in arms {
                rewrite_pattern(&mut arm.pattern, bindings);
                if let Some(guard) = &mut arm.guard {
                    rewrite_expr(guard, bindings, generic_fns, queue);
                }
                rewrite_expr(&mut arm.body, bindings, generic_fns, queue);
            }
            *ty = substitute_all(ty, bindings);
        }
        hir::Expr::Assign { place, value, .. } => {
            rewrite_expr(place, bindings, generic_fns, queue);
            rewrite_expr(value, bindings, generic_fns, queue);
        }
        hir::Expr::Tuple { elements, ty } | hir::Expr::Array { elements, ty } => {
            for e in elements {
                rewrite_expr(e, bindings, generic_fns, queue);
            }
            *ty = substitute_all(ty, bindings);
        }
        hir::Expr::Range { start, end, ty, .. } => {
            if let Some(s) = start {
                rewrite_expr(s, bindings, generic_fns, queue);
            }
            if let Some(e) = end {
                rewrite_expr(e, bindings, generic_fns, queue);
            }
            *ty = substitute_all(ty, bindings);
        }
        hir::Expr::Cast { expr: inner, ty } => {
            rewrite_expr(inner, bindings, generic_fns, queue);
            *ty = substitute_all(ty, bindings);
        }
        hir::Expr::StructLiteral { fields, ty, .. } => {
            for (_, e) in fields {
                rewrite_expr(e, bindings, generic_fns, queue);
            }
            *ty = substitute_all(ty, bindings);
        }
        hir::Expr::Move { expr: inner, ty }
        | hir::Expr::Try { expr: inner, ty }
        | hir::Expr::Await { expr: inner, ty }
        | hir::Expr::Spawn { expr: inner, ty } => {
            rewrite_expr(inner, bindings, generic_fns, queue);
            *ty = substitute_all(ty, bindings);
        }
        hir::Expr::Async { body, ty } => {
            rewrite_block(body, bindings, generic_fns, queue);
            *ty = substitute_all(ty, bindings);
        }
    }
}
