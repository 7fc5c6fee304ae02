//! Name resolution, type checking, and ownership checking (spec §4.1–§4.4).
//!
//! A single structural walk over the AST: no Hindley-Milner unification
//! variables, no deferred constraint solving. Every expression's type is
//! derived directly from its subexpressions' types by the rule for its
//! node kind, the same way the grammar itself is structural. Ownership
//! checks run interleaved with type checking, not as a separate pass,
//! since both need the same scope walk.

use corvus_par::ast;
use corvus_util::{DefId, DefIdGenerator, FxHashMap, Handler, Span, Symbol};

use crate::hir;
use crate::ownership::OwnershipTracker;
use crate::scope::{RibKind, ScopeTree};
use crate::types::Type;

#[derive(Debug, Clone)]
struct FnSigInfo {
    def_id: DefId,
    generics: Vec<Symbol>,
    params: Vec<Type>,
    ret: Type,
    module: Symbol,
    is_public: bool,
}

#[derive(Debug, Clone)]
enum VariantDataInfo {
    Unit,
    Tuple(Vec<Type>),
    Struct(Vec<(Symbol, Type)>),
}

#[derive(Debug, Clone)]
struct StructInfo {
    def_id: DefId,
    generics: Vec<Symbol>,
    fields: Vec<(Symbol, Type, bool)>,
    module: Symbol,
}

#[derive(Debug, Clone)]
struct EnumInfo {
    def_id: DefId,
    generics: Vec<Symbol>,
    variants: Vec<(Symbol, VariantDataInfo)>,
}

#[derive(Debug, Clone)]
struct TraitInfo {
    def_id: DefId,
    methods: FxHashMap<Symbol, FnSigInfo>,
    has_default: FxHashMap<Symbol, bool>,
}

#[derive(Debug, Clone)]
struct ImplInfo {
    trait_name: Option<Symbol>,
    self_ty_name: Symbol,
    methods: FxHashMap<Symbol, FnSigInfo>,
}

/// The resolver's public result: typed items plus the instantiation set
/// the monomorphizer closes over (spec §4.5/§9): one entry per distinct
/// `(generic function or method name, concrete type arguments)` pair
/// actually observed at a call site.
pub struct ResolveOutput {
    pub items: Vec<hir::Item>,
    pub instantiations: Vec<(Symbol, Vec<Type>)>,
}

pub struct Resolver<'a> {
    handler: &'a Handler,
    def_ids: DefIdGenerator,
    scopes: ScopeTree,
    ownership: OwnershipTracker,
    var_types: FxHashMap<DefId, Type>,

    structs: FxHashMap<Symbol, StructInfo>,
    enums: FxHashMap<Symbol, EnumInfo>,
    traits: FxHashMap<Symbol, TraitInfo>,
    impls: Vec<ImplInfo>,
    fns: FxHashMap<Symbol, FnSigInfo>,
    /// Every impl/trait method's signature, keyed by `(self type name,
    /// method name)` so the pass-2 body walk reuses the exact `FnSigInfo`
    /// (and `DefId`) pass-1 recorded in `impls`/`traits` for it, instead of
    /// allocating a second, disagreeing one.
    methods_by_owner: FxHashMap<(Symbol, Symbol), FnSigInfo>,

    /// Scope depth each binding was declared at (spec §4.4 lifetime rule).
    scope_depth: FxHashMap<DefId, u32>,

    generic_scope: Vec<Symbol>,
    ret_type_stack: Vec<Type>,
    loop_labels: Vec<Option<hir::LabelId>>,
    label_counter: u32,

    instantiations: Vec<(Symbol, Vec<Type>)>,

    /// Name of the module currently being resolved (spec §4.3). Defaults to
    /// `"main"` for single-module programs; `resolve_module` overrides it
    /// per call so a single `Resolver` can check visibility across several
    /// modules resolved back to back, the way a multi-file build would.
    module_name: Symbol,
}

impl<'a> Resolver<'a> {
    pub fn new(handler: &'a Handler) -> Self {
        let mut resolver = Self::new_empty(handler);
        resolver.register_intrinsics();
        resolver
    }

    fn new_empty(handler: &'a Handler) -> Self {
        Self {
            handler,
            def_ids: DefIdGenerator::new(),
            scopes: ScopeTree::new(),
            ownership: OwnershipTracker::new(),
            var_types: FxHashMap::default(),
            structs: FxHashMap::default(),
            enums: FxHashMap::default(),
            traits: FxHashMap::default(),
            impls: Vec::new(),
            fns: FxHashMap::default(),
            methods_by_owner: FxHashMap::default(),
            scope_depth: FxHashMap::default(),
            generic_scope: Vec::new(),
            ret_type_stack: Vec::new(),
            loop_labels: Vec::new(),
            label_counter: 0,
            instantiations: Vec::new(),
            module_name: Symbol::intern("main"),
        }
    }

    fn error(&self, message: impl Into<String>) {
        self.handler.build_error(Span::DUMMY, message).emit(self.handler);
    }

    /// Pre-declare the intrinsic functions every program gets at the root
    /// scope without an explicit declaration (spec §4.1): `drop`, `panic`
    /// (typed `Never` so a call to it participates in always-returns
    /// analysis the same as an explicit `return`), `assert`, and `range`
    /// for numeric iteration.
    fn register_intrinsics(&mut self) {
        let module = self.module_name;
        let mut intrinsic = |name: &str, params: Vec<Type>, ret: Type| {
            self.fns.insert(
                Symbol::intern(name),
                FnSigInfo {
                    def_id: self.def_ids.next(),
                    generics: Vec::new(),
                    params,
                    ret,
                    module,
                    is_public: true,
                },
            );
        };
        intrinsic("drop", vec![Type::Unknown], Type::Void);
        intrinsic("panic", vec![Type::String], Type::Never);
        intrinsic("assert", vec![Type::Bool], Type::Void);
        intrinsic(
            "range",
            vec![Type::I32, Type::I32],
            Type::Struct(Symbol::intern("Range"), vec![Type::I32]),
        );
    }

    /// Resolve a single module's AST, checking visibility against every
    /// module resolved so far on this same `Resolver` (structs, fields, and
    /// functions keep the name of the module that declared them).
    pub fn resolve_module(&mut self, module_name: Symbol, ast: &ast::Ast) -> ResolveOutput {
        self.module_name = module_name;
        self.resolve(ast)
    }

    pub fn resolve(&mut self, ast: &ast::Ast) -> ResolveOutput {
        self.collect_signatures(ast);
        let mut items = Vec::new();
        for item in ast {
            if let Some(resolved) = self.resolve_item(item) {
                items.push(resolved);
            }
        }
        for (message, _span) in self.ownership.errors().to_vec() {
            self.error(message);
        }
        ResolveOutput {
            items,
            instantiations: std::mem::take(&mut self.instantiations),
        }
    }

    // ----- pass 1: forward-declare every named thing so order doesn't matter -----

    fn collect_signatures(&mut self, ast: &ast::Ast) {
        for item in ast {
            match item {
                ast::Item::Struct(s) => {
                    let def_id = self.def_ids.next();
                    let generics: Vec<Symbol> = s.generics.iter().map(|g| g.name).collect();
                    let fields: Vec<(Symbol, Type, bool)> = s
                        .fields
                        .iter()
                        .map(|f| {
                            (
                                f.name,
                                self.ast_type_to_type(&f.ty, &generics),
                                f.visibility == ast::Visibility::Public,
                            )
                        })
                        .collect();
                    let mut seen_fields = std::collections::HashSet::new();
                    for (name, _, _) in &fields {
                        if !seen_fields.insert(*name) {
                            self.error(format!("duplicate name `{}` in this scope", name.as_str()));
                        }
                    }
                    if self.structs.contains_key(&s.name) {
                        self.error(format!("duplicate name `{}` in this scope", s.name.as_str()));
                    }
                    self.structs.insert(
                        s.name,
                        StructInfo {
                            def_id,
                            generics,
                            fields,
                            module: self.module_name,
                        },
                    );
                }
                ast::Item::Enum(e) => {
                    let def_id = self.def_ids.next();
                    let generics: Vec<Symbol> = e.generics.iter().map(|g| g.name).collect();
                    let variants = e
                        .variants
                        .iter()
                        .map(|v| {
                            let data = match &v.data {
                                ast::VariantData::Unit => VariantDataInfo::Unit,
                                ast::VariantData::Tuple(ts) => VariantDataInfo::Tuple(
                                    ts.iter().map(|t| self.ast_type_to_type(t, &generics)).collect(),
                                ),
                                ast::VariantData::Struct(fs) => VariantDataInfo::Struct(
                                    fs.iter()
                                        .map(|f| (f.name, self.ast_type_to_type(&f.ty, &generics)))
                                        .collect(),
                                ),
                            };
                            (v.name, data)
                        })
                        .collect();
                    if self.enums.contains_key(&e.name) {
                        self.error(format!("duplicate name `{}` in this scope", e.name.as_str()));
                    }
                    self.enums.insert(
                        e.name,
                        EnumInfo {
                            def_id,
                            generics,
                            variants,
                        },
                    );
                }
                ast::Item::Fn(f) => {
                    let info = self.fn_sig_info(f);
                    if self.fns.contains_key(&f.name) {
                        self.error(format!("duplicate name `{}` in this scope", f.name.as_str()));
                    }
                    self.fns.insert(f.name, info);
                }
                ast::Item::Trait(t) => {
                    let def_id = self.def_ids.next();
                    let generics: Vec<Symbol> = t.generics.iter().map(|g| g.name).collect();
                    let mut methods = FxHashMap::default();
                    let mut has_default = FxHashMap::default();
                    for member in &t.items {
                        if let ast::TraitMember::Method(sig) = member {
                            let params = sig
                                .params
                                .iter()
                                .map(|p| self.ast_type_to_type(&p.ty, &generics))
                                .collect();
                            let ret = sig
                                .ret_type
                                .as_ref()
                                .map(|t| self.ast_type_to_type(t, &generics))
                                .unwrap_or(Type::Void);
                            methods.insert(
                                sig.name,
                                FnSigInfo {
                                    def_id: self.def_ids.next(),
                                    generics: generics.clone(),
                                    params,
                                    ret,
                                    module: self.module_name,
                                    is_public: true,
                                },
                            );
                            has_default.insert(sig.name, false);
                        }
                    }
                    if self.traits.contains_key(&t.name) {
                        self.error(format!("duplicate name `{}` in this scope", t.name.as_str()));
                    }
                    self.traits.insert(
                        t.name,
                        TraitInfo {
                            def_id,
                            methods,
                            has_default,
                        },
                    );
                }
                ast::Item::Impl(i) => {
                    let self_ty_name = path_last_ident(&ast_type_path(&i.self_ty));
                    let trait_name = i.trait_ref.as_ref().map(|t| path_last_ident(&ast_type_path(t)));
                    let mut methods = FxHashMap::default();
                    for member in &i.items {
                        if let ast::ImplMember::Method(f) = member {
                            let info = self.fn_sig_info(f);
                            self.methods_by_owner.insert((self_ty_name, f.name), info.clone());
                            methods.insert(f.name, info);
                        }
                    }
                    self.impls.push(ImplInfo {
                        trait_name,
                        self_ty_name,
                        methods,
                    });
                }
                _ => {}
            }
        }
    }

    fn fn_sig_info(&mut self, f: &ast::FnItem) -> FnSigInfo {
        let generics: Vec<Symbol> = f.generics.iter().map(|g| g.name).collect();
        let params = f
            .params
            .iter()
            .map(|p| self.ast_type_to_type(&p.ty, &generics))
            .collect();
        let ret = f
            .ret_type
            .as_ref()
            .map(|t| self.ast_type_to_type(t, &generics))
            .unwrap_or(Type::Void);
        FnSigInfo {
            def_id: self.def_ids.next(),
            generics,
            params,
            ret,
            module: self.module_name,
            is_public: f.visibility == ast::Visibility::Public,
        }
    }

    // ----- type conversion -----

    fn ast_type_to_type(&self, ty: &ast::Type, generics: &[Symbol]) -> Type {
        match ty {
            ast::Type::Unit => Type::Void,
            ast::Type::Never => Type::Never,
            ast::Type::Inferred => Type::Unknown,
            ast::Type::Reference(t, m) => Type::Reference(
                Box::new(self.ast_type_to_type(t, generics)),
                *m == ast::Mutability::Mutable,
            ),
            // The spec's Type lattice has no raw-pointer variant; a `*T`/`*mut T`
            // carries the same runtime shape as `&T` here.
            ast::Type::Pointer(t, m) => Type::Reference(
                Box::new(self.ast_type_to_type(t, generics)),
                *m == ast::Mutability::Mutable,
            ),
            ast::Type::Slice(t) => Type::Slice(Box::new(self.ast_type_to_type(t, generics))),
            ast::Type::Array(t, n) => Type::Array(Box::new(self.ast_type_to_type(t, generics)), *n),
            ast::Type::Tuple(ts) => {
                Type::Tuple(ts.iter().map(|t| self.ast_type_to_type(t, generics)).collect())
            }
            ast::Type::Fn(params, ret) => Type::Fn(
                params.iter().map(|t| self.ast_type_to_type(t, generics)).collect(),
                Box::new(self.ast_type_to_type(ret, generics)),
            ),
            ast::Type::TraitObject(_) | ast::Type::ImplTrait(_) => Type::Unknown,
            ast::Type::Path(p) => self.named_type(p, &[], generics),
            ast::Type::Generic(base, args) => {
                let path = ast_type_path(base);
                self.named_type(&path, args, generics)
            }
        }
    }

    fn named_type(&self, path: &ast::Path, args: &[ast::Type], generics: &[Symbol]) -> Type {
        let name = path_last_ident(path);
        let name_str = name.as_str();
        match name_str {
            "i8" => Type::I8,
            "i16" => Type::I16,
            "i32" => Type::I32,
            "i64" => Type::I64,
            "i128" => Type::I128,
            "isize" => Type::ISIZE,
            "u8" => Type::U8,
            "u16" => Type::U16,
            "u32" => Type::U32,
            "u64" => Type::U64,
            "u128" => Type::U128,
            "usize" => Type::USIZE,
            "f32" => Type::F32,
            "f64" => Type::F64,
            "f128" => Type::F128,
            "bool" => Type::Bool,
            "char" => Type::Char,
            "str" | "String" => Type::String,
            "Option" => {
                let inner = args
                    .first()
                    .map(|t| self.ast_type_to_type(t, generics))
                    .unwrap_or(Type::Unknown);
                Type::Option(Box::new(inner))
            }
            "Result" => {
                let ok = args
                    .first()
                    .map(|t| self.ast_type_to_type(t, generics))
                    .unwrap_or(Type::Unknown);
                let err = args
                    .get(1)
                    .map(|t| self.ast_type_to_type(t, generics))
                    .unwrap_or(Type::Unknown);
                Type::Result(Box::new(ok), Box::new(err))
            }
            _ if generics.contains(&name) => Type::Generic(name, Vec::new()),
            _ if self.structs.contains_key(&name) => {
                Type::Struct(name, args.iter().map(|t| self.ast_type_to_type(t, generics)).collect())
            }
            _ if self.enums.contains_key(&name) => {
                Type::Enum(name, args.iter().map(|t| self.ast_type_to_type(t, generics)).collect())
            }
            _ => {
                // Unknown at this point in the walk (forward reference or
                // a bare generic param not yet registered): still record
                // the name so later lookups (struct literals, calls) can
                // recover it structurally.
                Type::Generic(name, Vec::new())
            }
        }
    }

    // ----- pass 2: resolve bodies -----

    fn resolve_item(&mut self, item: &ast::Item) -> Option<hir::Item> {
        match item {
            ast::Item::Fn(f) => Some(hir::Item::Function(self.resolve_fn_item(f, None))),
            ast::Item::Struct(s) => Some(hir::Item::Struct(self.resolve_struct_item(s))),
            ast::Item::Enum(e) => Some(hir::Item::Enum(self.resolve_enum_item(e))),
            ast::Item::Trait(t) => Some(hir::Item::Trait(self.resolve_trait_item(t))),
            ast::Item::Impl(i) => Some(hir::Item::Impl(self.resolve_impl_item(i))),
            ast::Item::Use(_) | ast::Item::Const(_) | ast::Item::Static(_) => None,
        }
    }

    fn resolve_struct_item(&self, s: &ast::StructItem) -> hir::StructItem {
        let info = self.structs.get(&s.name).expect("collected in pass 1");
        hir::StructItem {
            def_id: info.def_id,
            name: s.name,
            generics: hir::GenericParams {
                params: info
                    .generics
                    .iter()
                    .map(|g| hir::GenericParam {
                        name: *g,
                        bounds: Vec::new(),
                    })
                    .collect(),
                where_clause: Vec::new(),
            },
            fields: info
                .fields
                .iter()
                .zip(&s.fields)
                .map(|((name, ty, _), f)| hir::FieldDef {
                    name: *name,
                    ty: ty.clone(),
                    is_public: f.visibility == ast::Visibility::Public,
                })
                .collect(),
            is_public: s.visibility == ast::Visibility::Public,
        }
    }

    fn resolve_enum_item(&self, e: &ast::EnumItem) -> hir::EnumItem {
        let info = self.enums.get(&e.name).expect("collected in pass 1");
        hir::EnumItem {
            def_id: info.def_id,
            name: e.name,
            generics: hir::GenericParams {
                params: info
                    .generics
                    .iter()
                    .map(|g| hir::GenericParam {
                        name: *g,
                        bounds: Vec::new(),
                    })
                    .collect(),
                where_clause: Vec::new(),
            },
            variants: info
                .variants
                .iter()
                .map(|(name, data)| hir::VariantDef {
                    name: *name,
                    data: match data {
                        VariantDataInfo::Unit => hir::VariantData::Unit,
                        VariantDataInfo::Tuple(ts) => hir::VariantData::Tuple(ts.clone()),
                        VariantDataInfo::Struct(fs) => hir::VariantData::Struct(
                            fs.iter()
                                .map(|(n, t)| hir::FieldDef {
                                    name: *n,
                                    ty: t.clone(),
                                    is_public: true,
                                })
                                .collect(),
                        ),
                    },
                })
                .collect(),
            is_public: e.visibility == ast::Visibility::Public,
        }
    }

    fn resolve_trait_item(&mut self, t: &ast::TraitItem) -> hir::TraitItem {
        let info = self.traits.get(&t.name).cloned().expect("collected in pass 1");
        self.generic_scope.extend(info.generics.iter().copied());
        let methods = t
            .items
            .iter()
            .filter_map(|member| match member {
                ast::TraitMember::Method(sig) => {
                    let fsig = info.methods.get(&sig.name).cloned().unwrap();
                    Some(hir::TraitMethod {
                        name: sig.name,
                        sig: hir::FnSig {
                            params: sig
                                .params
                                .iter()
                                .zip(&fsig.params)
                                .map(|(p, ty)| hir::Param {
                                    def_id: self.def_ids.next(),
                                    name: p.name,
                                    ty: ty.clone(),
                                    is_mut: p.mutable,
                                })
                                .collect(),
                            ret_type: fsig.ret,
                        },
                        default_body: None,
                    })
                }
                _ => None,
            })
            .collect();
        self.generic_scope.truncate(self.generic_scope.len() - info.generics.len());
        hir::TraitItem {
            def_id: info.def_id,
            name: t.name,
            generics: hir::GenericParams {
                params: info
                    .generics
                    .iter()
                    .map(|g| hir::GenericParam {
                        name: *g,
                        bounds: Vec::new(),
                    })
                    .collect(),
                where_clause: Vec::new(),
            },
            methods,
            assoc_types: Vec::new(),
        }
    }

    fn resolve_impl_item(&mut self, i: &ast::ImplItem) -> hir::ImplItem {
        let self_ty_name = path_last_ident(&ast_type_path(&i.self_ty));
        let trait_name = i.trait_ref.as_ref().map(|t| path_last_ident(&ast_type_path(t)));
        if let Some(tn) = trait_name {
            let trait_is_local = self.traits.contains_key(&tn);
            let self_ty_is_local = self.structs.contains_key(&self_ty_name) || self.enums.contains_key(&self_ty_name);
            if !trait_is_local && !self_ty_is_local {
                self.error(format!(
                    "impl of external trait `{}` for external type `{}` violates the orphan rule",
                    tn.as_str(),
                    self_ty_name.as_str()
                ));
            }
        }
        let generics: Vec<Symbol> = i.generics.iter().map(|g| g.name).collect();
        self.generic_scope.extend(generics.iter().copied());
        let self_ty = self.ast_type_to_type(&i.self_ty, &generics);
        let methods = i
            .items
            .iter()
            .filter_map(|member| match member {
                ast::ImplMember::Method(f) => Some(self.resolve_fn_item(f, Some(self_ty_name))),
                _ => None,
            })
            .collect();
        self.generic_scope.truncate(self.generic_scope.len() - generics.len());
        hir::ImplItem {
            def_id: self.def_ids.next(),
            generics: hir::GenericParams {
                params: generics
                    .iter()
                    .map(|g| hir::GenericParam {
                        name: *g,
                        bounds: Vec::new(),
                    })
                    .collect(),
                where_clause: Vec::new(),
            },
            trait_name,
            self_ty,
            methods,
            assoc_types: Vec::new(),
        }
    }

    fn resolve_fn_item(&mut self, f: &ast::FnItem, owner: Option<Symbol>) -> hir::FnItem {
        let info = match owner {
            Some(owner) => self
                .methods_by_owner
                .get(&(owner, f.name))
                .cloned()
                .unwrap_or_else(|| self.fn_sig_info(f)),
            None => self.fns.get(&f.name).cloned().unwrap_or_else(|| self.fn_sig_info(f)),
        };
        self.generic_scope.extend(info.generics.iter().copied());
        self.scopes.enter_scope(RibKind::Function);

        let params: Vec<hir::Param> = f
            .params
            .iter()
            .zip(&info.params)
            .map(|(p, ty)| {
                let def_id = self.def_ids.next();
                if !self.scopes.add_binding(p.name, def_id) {
                    self.error(format!("duplicate name `{}` in this scope", p.name.as_str()));
                }
                self.var_types.insert(def_id, ty.clone());
                self.ownership.declare(def_id);
                self.scope_depth.insert(def_id, self.scopes.depth());
                hir::Param {
                    def_id,
                    name: p.name,
                    ty: ty.clone(),
                    is_mut: p.mutable,
                }
            })
            .collect();

        self.ret_type_stack.push(info.ret.clone());
        let body = self.resolve_block(&f.body);
        self.ret_type_stack.pop();

        if info.ret != Type::Void && !block_diverges(&body) && !types_compatible(&body.ty, &info.ret) {
            self.error(format!(
                "function `{}` must return `{}` on every path, found `{}`",
                f.name.as_str(),
                info.ret,
                body.ty
            ));
        }

        self.scopes.exit_scope();
        self.generic_scope.truncate(self.generic_scope.len() - info.generics.len());

        hir::FnItem {
            def_id: info.def_id,
            name: f.name,
            generics: hir::GenericParams {
                params: info
                    .generics
                    .iter()
                    .map(|g| hir::GenericParam {
                        name: *g,
                        bounds: Vec::new(),
                    })
                    .collect(),
                where_clause: Vec::new(),
            },
            params,
            ret_type: info.ret,
            body,
            is_async: f.async_kw,
            is_public: f.visibility == ast::Visibility::Public,
        }
    }

    // ----- statements / blocks -----

    fn resolve_block(&mut self, block: &ast::Block) -> hir::Block {
        self.scopes.enter_scope(RibKind::Block);
        let mut stmts = Vec::with_capacity(block.stmts.len());
        let mut reported_unreachable = false;
        for (idx, s) in block.stmts.iter().enumerate() {
            let resolved = self.resolve_stmt(s);
            if stmt_diverges(&resolved) && !reported_unreachable {
                let has_more = idx + 1 < block.stmts.len() || block.trailing.is_some();
                if has_more {
                    self.error("unreachable code after a statement that always returns".to_string());
                    reported_unreachable = true;
                }
            }
            stmts.push(resolved);
        }
        let trailing = block.trailing.as_ref().map(|e| Box::new(self.resolve_expr(e)));
        let ty = trailing.as_ref().map(|e: &Box<hir::Expr>| e.ty()).unwrap_or(Type::Void);
        self.scopes.exit_scope();
        hir::Block { stmts, trailing, ty }
    }

    fn resolve_stmt(&mut self, stmt: &ast::Stmt) -> hir::Stmt {
        match stmt {
            ast::Stmt::Let(l) => {
                let init = l.init.as_ref().map(|e| self.resolve_expr(e));
                let declared = l.ty.as_ref().map(|t| self.ast_type_to_type(t, &self.generic_scope.clone()));
                let ty = declared
                    .or_else(|| init.as_ref().map(|e| e.ty()))
                    .unwrap_or(Type::Unknown);
                if let (Some(d), Some(i)) = (&declared, &init) {
                    if !types_compatible(d, &i.ty()) {
                        self.error(format!("expected `{}`, found `{}`", d, i.ty()));
                    }
                }
                if let Some(init_ast) = &l.init {
                    self.check_dangling_reference(self.scopes.depth(), init_ast);
                }
                let pattern = self.resolve_pattern(&l.pattern, &ty, l.mutable);
                hir::Stmt::Let {
                    pattern,
                    ty,
                    is_mut: l.mutable,
                    init,
                }
            }
            ast::Stmt::Expr(e) => hir::Stmt::Expr(self.resolve_expr(e)),
            ast::Stmt::Return(e) => {
                let resolved = e.as_ref().map(|e| self.resolve_expr(e));
                if let Some(expected) = self.ret_type_stack.last().cloned() {
                    let found = resolved.as_ref().map(|e| e.ty()).unwrap_or(Type::Void);
                    if !types_compatible(&expected, &found) {
                        self.error(format!("expected return type `{}`, found `{}`", expected, found));
                    }
                }
                hir::Stmt::Return(resolved)
            }
            ast::Stmt::If(i) => {
                let cond = self.resolve_expr(&i.cond);
                self.check_bool(&cond);
                let pre = self.ownership.snapshot();
                let then_block = self.resolve_block(&i.then_block);
                let then_snap = self.ownership.snapshot();
                self.ownership.restore(pre.clone());
                let else_clause = i.else_clause.as_ref().map(|c| Box::new(self.resolve_else_clause(c)));
                let else_snap = self.ownership.snapshot();
                self.ownership.join_branches(&then_snap, &else_snap, Span::DUMMY);
                hir::Stmt::If {
                    cond,
                    then_block,
                    else_clause,
                }
            }
            ast::Stmt::While(w) => {
                let cond = self.resolve_expr(&w.cond);
                self.check_bool(&cond);
                let label = w.label.map(|_| self.fresh_label());
                self.loop_labels.push(label);
                let pre = self.ownership.snapshot();
                let body = self.resolve_block(&w.body);
                let post = self.ownership.snapshot();
                self.ownership.check_loop_reentry(&pre, &post, Span::DUMMY);
                self.loop_labels.pop();
                hir::Stmt::While { cond, body, label }
            }
            ast::Stmt::For(f) => {
                let iter = self.resolve_expr(&f.iter);
                let elem_ty = iter_elem_type(&iter.ty());
                self.scopes.enter_scope(RibKind::Loop(None));
                let pattern = self.resolve_pattern(&f.pattern, &elem_ty, false);
                let label = f.label.map(|_| self.fresh_label());
                self.loop_labels.push(label);
                let pre = self.ownership.snapshot();
                let body = self.resolve_block(&f.body);
                let post = self.ownership.snapshot();
                self.ownership.check_loop_reentry(&pre, &post, Span::DUMMY);
                self.loop_labels.pop();
                self.scopes.exit_scope();
                hir::Stmt::For { pattern, iter, body, label }
            }
            ast::Stmt::Break(label_name) => {
                hir::Stmt::Break(None, self.resolve_label(*label_name, "break"))
            }
            ast::Stmt::Continue(label_name) => {
                hir::Stmt::Continue(self.resolve_label(*label_name, "continue"))
            }
            ast::Stmt::Item(item) => {
                // Nested item statements only matter for their side effect on
                // the signature tables; re-run the same collection step.
                self.collect_signatures(&vec![item.clone()]);
                if let Some(resolved) = self.resolve_item(item) {
                    hir::Stmt::Expr(match resolved {
                        hir::Item::Function(_) => hir::Expr::Literal {
                            lit: hir::Literal::Unit,
                            ty: Type::Void,
                        },
                        _ => hir::Expr::Literal {
                            lit: hir::Literal::Unit,
                            ty: Type::Void,
                        },
                    })
                } else {
                    hir::Stmt::Expr(hir::Expr::Literal {
                        lit: hir::Literal::Unit,
                        ty: Type::Void,
                    })
                }
            }
        }
    }

    fn resolve_else_clause(&mut self, clause: &ast::ElseClause) -> hir::ElseClause {
        match clause {
            ast::ElseClause::Block(b) => hir::ElseClause::Block(self.resolve_block(b)),
            ast::ElseClause::If(i) => {
                hir::ElseClause::If(Box::new(self.resolve_stmt(&ast::Stmt::If(i.clone()))))
            }
        }
    }

    fn fresh_label(&mut self) -> hir::LabelId {
        let id = hir::LabelId(self.label_counter);
        self.label_counter += 1;
        id
    }

    fn resolve_label(&self, _label_name: Option<Symbol>, kind: &str) -> Option<hir::LabelId> {
        if self.loop_labels.is_empty() {
            self.error(format!("`{}` outside of a loop", kind));
            return None;
        }
        self.loop_labels.last().copied().flatten()
    }

    fn check_bool(&self, e: &hir::Expr) {
        if e.ty() != Type::Bool {
            self.error(format!("expected `bool`, found `{}`", e.ty()));
        }
    }

    // ----- expressions -----

    fn resolve_expr(&mut self, expr: &ast::Expr) -> hir::Expr {
        match expr {
            ast::Expr::Literal(lit) => {
                let (hlit, ty) = self.resolve_literal(lit);
                hir::Expr::Literal { lit: hlit, ty }
            }
            ast::Expr::Path(path) => self.resolve_path_expr(path),
            ast::Expr::Binary(b) => self.resolve_binary(b),
            ast::Expr::Unary(u) => self.resolve_unary(u),
            ast::Expr::Call(c) => self.resolve_call(c),
            ast::Expr::MethodCall(m) => self.resolve_method_call(m),
            ast::Expr::Field(f) => self.resolve_field(f),
            ast::Expr::Index(i) => {
                let object = Box::new(self.resolve_expr(&i.object));
                let index = Box::new(self.resolve_expr(&i.index));
                let ty = match object.ty() {
                    Type::Array(t, _) | Type::Slice(t) => *t,
                    Type::Reference(inner, _) => match *inner {
                        Type::Array(t, _) | Type::Slice(t) => *t,
                        other => {
                            self.error(format!("type `{}` cannot be indexed", other));
                            Type::Unknown
                        }
                    },
                    other => {
                        self.error(format!("type `{}` cannot be indexed", other));
                        Type::Unknown
                    }
                };
                hir::Expr::Index { object, index, ty }
            }
            ast::Expr::Slice(s) => {
                let object = Box::new(self.resolve_expr(&s.object));
                let start = s.start.as_ref().map(|e| Box::new(self.resolve_expr(e)));
                let end = s.end.as_ref().map(|e| Box::new(self.resolve_expr(e)));
                for bound in start.iter().chain(end.iter()) {
                    if !bound.ty().is_numeric() {
                        self.error(format!("slice bound must be numeric, found `{}`", bound.ty()));
                    }
                }
                let elem_ty = match object.ty() {
                    Type::Array(t, _) | Type::Slice(t) => *t,
                    Type::Reference(inner, _) => match *inner {
                        Type::Array(t, _) | Type::Slice(t) => *t,
                        other => {
                            self.error(format!("type `{}` cannot be sliced", other));
                            Type::Unknown
                        }
                    },
                    other => {
                        self.error(format!("type `{}` cannot be sliced", other));
                        Type::Unknown
                    }
                };
                hir::Expr::Slice {
                    object,
                    start,
                    end,
                    ty: Type::Slice(Box::new(elem_ty)),
                }
            }
            ast::Expr::Block(b) => hir::Expr::Block(Box::new(self.resolve_block(b))),
            ast::Expr::If(i) => self.resolve_if_expr(i),
            ast::Expr::Match(m) => self.resolve_match(m),
            ast::Expr::Closure(_) => {
                // Closures lower to a synthetic function in the IR builder;
                // the resolver only needs a stand-in callable type here.
                hir::Expr::Literal {
                    lit: hir::Literal::Unit,
                    ty: Type::Fn(Vec::new(), Box::new(Type::Void)),
                }
            }
            ast::Expr::Assign(a) => self.resolve_assign(a, None),
            ast::Expr::CompoundAssign(c) => {
                let op = c.op;
                hir::Expr::Assign {
                    op: Some(op),
                    place: Box::new(self.resolve_expr(&c.place)),
                    value: Box::new(self.resolve_expr(&c.value)),
                }
            }
            ast::Expr::Return(e) => {
                // Resolved only for its side effects (ownership tracking,
                // nested diagnostics); a `return` expression's own type is
                // always `never`.
                if let Some(e) = e {
                    self.resolve_expr(e);
                }
                hir::Expr::Literal {
                    lit: hir::Literal::Unit,
                    ty: Type::Never,
                }
            }
            ast::Expr::Break(value, label_name) => {
                if let Some(e) = value {
                    self.resolve_expr(e);
                }
                self.resolve_label(*label_name, "break");
                hir::Expr::Literal {
                    lit: hir::Literal::Unit,
                    ty: Type::Never,
                }
            }
            ast::Expr::Continue(label_name) => {
                self.resolve_label(*label_name, "continue");
                hir::Expr::Literal {
                    lit: hir::Literal::Unit,
                    ty: Type::Never,
                }
            }
            ast::Expr::Tuple(es) => {
                let elements: Vec<hir::Expr> = es.iter().map(|e| self.resolve_expr(e)).collect();
                let ty = Type::Tuple(elements.iter().map(|e| e.ty()).collect());
                hir::Expr::Tuple { elements, ty }
            }
            ast::Expr::Array(es) => {
                let elements: Vec<hir::Expr> = es.iter().map(|e| self.resolve_expr(e)).collect();
                let elem_ty = elements.first().map(|e| e.ty()).unwrap_or(Type::Unknown);
                let n = elements.len();
                hir::Expr::Array {
                    elements,
                    ty: Type::Array(Box::new(elem_ty), n),
                }
            }
            ast::Expr::Range(r) => {
                let start = r.start.as_ref().map(|e| Box::new(self.resolve_expr(e)));
                let end = r.end.as_ref().map(|e| Box::new(self.resolve_expr(e)));
                let elem_ty = start
                    .as_ref()
                    .map(|e| e.ty())
                    .or_else(|| end.as_ref().map(|e| e.ty()))
                    .unwrap_or(Type::USIZE);
                hir::Expr::Range {
                    start,
                    end,
                    inclusive: r.inclusive,
                    ty: Type::Struct(Symbol::intern("Range"), vec![elem_ty]),
                }
            }
            ast::Expr::Cast(e, ty) => {
                let inner = self.resolve_expr(e);
                let target = self.ast_type_to_type(ty, &self.generic_scope.clone());
                if !inner.ty().is_numeric() || !target.is_numeric() {
                    if inner.ty() != target {
                        self.error(format!("cannot cast `{}` as `{}`", inner.ty(), target));
                    }
                }
                hir::Expr::Cast {
                    expr: Box::new(inner),
                    ty: target,
                }
            }
            ast::Expr::Async(a) => hir::Expr::Async {
                body: Box::new(self.resolve_block(&a.body)),
                ty: Type::Unknown,
            },
            ast::Expr::Await(e) => {
                let inner = self.resolve_expr(e);
                let ty = inner.ty();
                hir::Expr::Await {
                    expr: Box::new(inner),
                    ty,
                }
            }
            ast::Expr::StructLiteral(s) => self.resolve_struct_literal(s),
            ast::Expr::EnumVariant(v) => self.resolve_enum_variant(v),
            ast::Expr::Move(e) => {
                let inner = self.resolve_expr(e);
                let ty = inner.ty();
                hir::Expr::Move {
                    expr: Box::new(inner),
                    ty,
                }
            }
            ast::Expr::Try(e) => self.resolve_try(e),
            ast::Expr::Spawn(e) => {
                let inner = self.resolve_expr(e);
                let ty = inner.ty();
                hir::Expr::Spawn {
                    expr: Box::new(inner),
                    ty,
                }
            }
        }
    }

    fn resolve_literal(&self, lit: &ast::Literal) -> (hir::Literal, Type) {
        match lit {
            ast::Literal::Int(v) => (hir::Literal::Int(*v), Type::I32),
            ast::Literal::Float(v) => (hir::Literal::Float(*v), Type::F64),
            ast::Literal::String(s) => (hir::Literal::String(*s), Type::String),
            ast::Literal::Char(c) => (hir::Literal::Char(*c), Type::Char),
            ast::Literal::Bool(b) => (hir::Literal::Bool(*b), Type::Bool),
            ast::Literal::Unit => (hir::Literal::Unit, Type::Void),
        }
    }

    fn resolve_path_expr(&mut self, path: &ast::Path) -> hir::Expr {
        if path.segments.len() == 1 {
            let name = path.segments[0].ident;
            if let Some(def_id) = self.scopes.resolve(name) {
                let ty = self.var_types.get(&def_id).cloned().unwrap_or(Type::Unknown);
                self.ownership.use_value(def_id, ty.is_copy(), Span::DUMMY);
                return hir::Expr::Var { def_id, ty };
            }
            self.error(format!("undefined variable `{}`", name.as_str()));
            return hir::Expr::Var {
                def_id: DefId::DUMMY,
                ty: Type::Unknown,
            };
        }
        // Multi-segment path used as a value: most commonly a unit enum
        // variant (`Color::Red`).
        let enum_name = path.segments[0].ident;
        let variant_name = path.segments[1].ident;
        if let Some(info) = self.enums.get(&enum_name).cloned() {
            if info.variants.iter().any(|(n, _)| *n == variant_name) {
                return hir::Expr::StructLiteral {
                    name: variant_name,
                    fields: Vec::new(),
                    ty: Type::Enum(enum_name, Vec::new()),
                };
            }
        }
        self.error(format!("unresolved path `{}::{}`", enum_name.as_str(), variant_name.as_str()));
        hir::Expr::Var {
            def_id: DefId::DUMMY,
            ty: Type::Unknown,
        }
    }

    fn resolve_binary(&mut self, b: &ast::BinaryExpr) -> hir::Expr {
        let left = self.resolve_expr(&b.left);
        let right = self.resolve_expr(&b.right);
        let op = convert_binop(b.op);
        let ty = self.binop_result_type(op, &left.ty(), &right.ty());
        hir::Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        }
    }

    fn binop_result_type(&self, op: hir::BinOp, l: &Type, r: &Type) -> Type {
        use hir::BinOp::*;
        match op {
            Add | Sub | Mul | Div | Mod => match Type::unify_never(l.clone(), r.clone()) {
                Some(t) if t.is_numeric() => t,
                Some(t) => {
                    self.error(format!("arithmetic not supported for `{}`", t));
                    Type::Unknown
                }
                None => {
                    self.error(format!("mismatched types `{}` and `{}`", l, r));
                    Type::Unknown
                }
            },
            BitAnd | BitOr | BitXor | Shl | Shr => {
                if l.is_integer() && r.is_integer() {
                    l.clone()
                } else {
                    self.error("bitwise operators require integer operands".to_string());
                    Type::Unknown
                }
            }
            Eq | Ne | Lt | Gt | Le | Ge => {
                if Type::unify_never(l.clone(), r.clone()).is_none() {
                    self.error(format!("cannot compare `{}` with `{}`", l, r));
                }
                Type::Bool
            }
            And | Or => {
                if *l != Type::Bool || *r != Type::Bool {
                    self.error("logical operators require `bool` operands".to_string());
                }
                Type::Bool
            }
        }
    }

    fn resolve_unary(&mut self, u: &ast::UnaryExpr) -> hir::Expr {
        match u.op {
            ast::UnOp::Ref(is_mut) => {
                if let Some(def_id) = place_def_id(&u.expr, &self.scopes) {
                    if is_mut {
                        self.ownership.borrow_exclusive(def_id, Span::DUMMY);
                    } else {
                        self.ownership.borrow_shared(def_id, Span::DUMMY);
                    }
                }
                let inner = self.resolve_expr_no_move(&u.expr);
                let ty = Type::Reference(Box::new(inner.ty()), is_mut);
                if let Some(def_id) = place_def_id(&u.expr, &self.scopes) {
                    self.ownership.release_borrow(def_id);
                }
                hir::Expr::Unary {
                    op: hir::UnOp::Ref(is_mut),
                    expr: Box::new(inner),
                    ty,
                }
            }
            _ => {
                let inner = self.resolve_expr(&u.expr);
                let op = convert_unop(u.op);
                let ty = match op {
                    hir::UnOp::Neg => {
                        if !inner.ty().is_numeric() {
                            self.error(format!("cannot negate `{}`", inner.ty()));
                        }
                        inner.ty()
                    }
                    hir::UnOp::Not => {
                        if inner.ty() != Type::Bool {
                            self.error(format!("cannot apply `!` to `{}`", inner.ty()));
                        }
                        Type::Bool
                    }
                    hir::UnOp::BitNot => inner.ty(),
                    hir::UnOp::Deref => match inner.ty() {
                        Type::Reference(t, _) => *t,
                        other => {
                            self.error(format!("type `{}` cannot be dereferenced", other));
                            Type::Unknown
                        }
                    },
                    hir::UnOp::Ref(_) => unreachable!(),
                };
                hir::Expr::Unary {
                    op,
                    expr: Box::new(inner),
                    ty,
                }
            }
        }
    }

    /// Resolve an expression for use as a borrow's place without recording
    /// a move of it (a `&x` never consumes `x`).
    fn resolve_expr_no_move(&mut self, expr: &ast::Expr) -> hir::Expr {
        if let ast::Expr::Path(path) = expr {
            if path.segments.len() == 1 {
                let name = path.segments[0].ident;
                if let Some(def_id) = self.scopes.resolve(name) {
                    let ty = self.var_types.get(&def_id).cloned().unwrap_or(Type::Unknown);
                    return hir::Expr::Var { def_id, ty };
                }
            }
        }
        self.resolve_expr(expr)
    }

    fn resolve_call(&mut self, call: &ast::CallExpr) -> hir::Expr {
        let args: Vec<hir::Expr> = call.args.iter().map(|a| self.resolve_expr(a)).collect();
        if let ast::Expr::Path(path) = &*call.func {
            if path.segments.len() == 1 {
                let name = path.segments[0].ident;
                if let Some(info) = self.fns.get(&name).cloned() {
                    if !info.is_public && info.module != self.module_name {
                        self.error(format!("function `{}` is private", name.as_str()));
                    }
                    return self.apply_fn(name, &info, args);
                }
                self.error(format!("call to undefined function `{}`", name.as_str()));
                return hir::Expr::Call {
                    callee: name,
                    args,
                    ty: Type::Unknown,
                };
            }
            let self_ty_name = path.segments[path.segments.len() - 2].ident;
            let method = path.segments[path.segments.len() - 1].ident;
            if let Some(info) = self.lookup_assoc_method(self_ty_name, method) {
                return self.apply_fn(method, &info, args);
            }
            self.error(format!(
                "no associated function `{}::{}`",
                self_ty_name.as_str(),
                method.as_str()
            ));
            return hir::Expr::Call {
                callee: method,
                args,
                ty: Type::Unknown,
            };
        }
        let callee_expr = self.resolve_expr(&call.func);
        let ret = match callee_expr.ty() {
            Type::Fn(_, ret) => *ret,
            other => {
                self.error(format!("type `{}` is not callable", other));
                Type::Unknown
            }
        };
        hir::Expr::Call {
            callee: Symbol::intern("<closure>"),
            args,
            ty: ret,
        }
    }

    /// Reject assigning a reference whose source lives in a scope strictly
    /// inside the target binding's scope (spec §4.4 lifetime rule): once
    /// that inner scope exits, the reference would dangle.
    fn check_dangling_reference(&mut self, target_depth: u32, init: &ast::Expr) {
        if let ast::Expr::Unary(u) = init {
            if let ast::UnOp::Ref(_) = u.op {
                if let Some(source_id) = place_def_id(&u.expr, &self.scopes) {
                    if let Some(&source_depth) = self.scope_depth.get(&source_id) {
                        if source_depth > target_depth {
                            self.error("borrowed value does not live long enough".to_string());
                        }
                    }
                }
            }
        }
    }

    fn apply_fn(&mut self, name: Symbol, info: &FnSigInfo, args: Vec<hir::Expr>) -> hir::Expr {
        if args.len() != info.params.len() {
            self.error(format!(
                "function `{}` expects {} argument(s), found {}",
                name.as_str(),
                info.params.len(),
                args.len()
            ));
        }
        let mut bindings = FxHashMap::default();
        for (param_ty, arg) in info.params.iter().zip(&args) {
            unify_generic(param_ty, &arg.ty(), &mut bindings);
        }
        if !info.generics.is_empty() {
            let concrete: Vec<Type> = info
                .generics
                .iter()
                .map(|g| bindings.get(g).cloned().unwrap_or(Type::Unknown))
                .collect();
            self.instantiations.push((name, concrete));
        }
        let ret = substitute_all(&info.ret, &bindings);
        hir::Expr::Call {
            callee: name,
            args,
            ty: ret,
        }
    }

    fn lookup_assoc_method(&self, self_ty_name: Symbol, method: Symbol) -> Option<FnSigInfo> {
        // Inherent impls win over trait impls when both provide the same
        // method name for this type (resolver policy, recorded in the
        // grounding ledger).
        self.impls
            .iter()
            .filter(|i| i.self_ty_name == self_ty_name && i.trait_name.is_none())
            .find_map(|i| i.methods.get(&method).cloned())
            .or_else(|| {
                self.impls
                    .iter()
                    .filter(|i| i.self_ty_name == self_ty_name && i.trait_name.is_some())
                    .find_map(|i| i.methods.get(&method).cloned())
            })
    }

    fn resolve_method_call(&mut self, m: &ast::MethodCallExpr) -> hir::Expr {
        let receiver = self.resolve_expr(&m.receiver);
        let args: Vec<hir::Expr> = m.call_args.iter().map(|a| self.resolve_expr(a)).collect();
        let mut receiver_ty = receiver.ty();
        while let Type::Reference(inner, _) = receiver_ty {
            receiver_ty = *inner;
        }
        let self_ty_name = match &receiver_ty {
            Type::Struct(n, _) | Type::Enum(n, _) => Some(*n),
            _ => None,
        };
        let ty = if let Some(name) = self_ty_name {
            if let Some(info) = self.lookup_assoc_method(name, m.method) {
                if !info.generics.is_empty() {
                    let mut bindings = FxHashMap::default();
                    for (param_ty, arg) in info.params.iter().skip(1).zip(&args) {
                        unify_generic(param_ty, &arg.ty(), &mut bindings);
                    }
                    let concrete: Vec<Type> = info
                        .generics
                        .iter()
                        .map(|g| bindings.get(g).cloned().unwrap_or(Type::Unknown))
                        .collect();
                    self.instantiations.push((m.method, concrete));
                    substitute_all(&info.ret, &bindings)
                } else {
                    info.ret
                }
            } else {
                self.error(format!(
                    "no method `{}` found for type `{}`",
                    m.method.as_str(),
                    name.as_str()
                ));
                Type::Unknown
            }
        } else {
            Type::Unknown
        };
        hir::Expr::MethodCall {
            receiver: Box::new(receiver),
            method: m.method,
            args,
            ty,
        }
    }

    fn resolve_field(&mut self, f: &ast::FieldExpr) -> hir::Expr {
        let object = self.resolve_expr(&f.object);
        let mut obj_ty = object.ty();
        while let Type::Reference(inner, _) = obj_ty {
            obj_ty = *inner;
        }
        let ty = match &obj_ty {
            Type::Struct(name, _) => match self.structs.get(name) {
                Some(info) => match info.fields.iter().find(|(n, _, _)| *n == f.field) {
                    Some((_, ty, is_public)) => {
                        if !is_public && info.module != self.module_name {
                            self.error(format!(
                                "field `{}` is private",
                                f.field.as_str()
                            ));
                        }
                        ty.clone()
                    }
                    None => {
                        self.error(format!("no field `{}` on type `{}`", f.field.as_str(), name.as_str()));
                        Type::Unknown
                    }
                },
                None => {
                    self.error(format!("no field `{}` on type `{}`", f.field.as_str(), name.as_str()));
                    Type::Unknown
                }
            },
            Type::Tuple(ts) => {
                let idx: usize = f.field.as_str().parse().unwrap_or(usize::MAX);
                ts.get(idx).cloned().unwrap_or(Type::Unknown)
            }
            other => {
                self.error(format!("type `{}` has no fields", other));
                Type::Unknown
            }
        };
        hir::Expr::Field {
            object: Box::new(object),
            field: f.field,
            ty,
        }
    }

    fn resolve_if_expr(&mut self, i: &ast::IfExpr) -> hir::Expr {
        let cond = self.resolve_expr(&i.cond);
        self.check_bool(&cond);
        let pre = self.ownership.snapshot();
        let then_block = self.resolve_block(&i.then_block);
        let then_ty = then_block.ty.clone();
        let then_expr = hir::Expr::Block(Box::new(then_block));
        let then_snap = self.ownership.snapshot();
        self.ownership.restore(pre);
        let else_expr = i.else_block.as_ref().map(|e| Box::new(self.resolve_expr(e)));
        let else_snap = self.ownership.snapshot();
        self.ownership.join_branches(&then_snap, &else_snap, Span::DUMMY);
        let ty = match &else_expr {
            Some(e) => Type::unify_never(then_ty.clone(), e.ty()).unwrap_or_else(|| {
                self.error(format!("if/else arms have different types: `{}` vs `{}`", then_ty, e.ty()));
                then_ty.clone()
            }),
            None => Type::Void,
        };
        hir::Expr::If {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr,
            ty,
        }
    }

    fn resolve_match(&mut self, m: &ast::MatchExpr) -> hir::Expr {
        let scrutinee = self.resolve_expr(&m.scrutinee);
        let scrutinee_ty = scrutinee.ty();
        let mut arms = Vec::new();
        let mut result_ty: Option<Type> = None;
        let mut has_catchall = false;
        let mut covered_variants: Vec<Symbol> = Vec::new();
        for arm in &m.arms {
            self.scopes.enter_scope(RibKind::Block);
            let pattern = self.resolve_pattern(&arm.pattern, &scrutinee_ty, false);
            match &pattern {
                hir::Pattern::Wildcard | hir::Pattern::Binding { .. } => has_catchall = true,
                hir::Pattern::Variant { variant, .. } | hir::Pattern::TupleVariant { variant, .. } => {
                    covered_variants.push(*variant);
                }
                _ => {}
            }
            let guard = arm.guard.as_ref().map(|g| self.resolve_expr(g));
            let body = self.resolve_expr(&arm.body);
            result_ty = Some(match result_ty.take() {
                Some(prev) => Type::unify_never(prev.clone(), body.ty()).unwrap_or(prev),
                None => body.ty(),
            });
            self.scopes.exit_scope();
            arms.push(hir::Arm { pattern, guard, body });
        }
        if !has_catchall {
            if let Type::Enum(name, _) = &scrutinee_ty {
                if let Some(info) = self.enums.get(name) {
                    let missing: Vec<&str> = info
                        .variants
                        .iter()
                        .filter(|(v, _)| !covered_variants.contains(v))
                        .map(|(v, _)| v.as_str())
                        .collect();
                    if !missing.is_empty() {
                        self.error(format!(
                            "match on `{}` is not exhaustive, missing: {}",
                            name.as_str(),
                            missing.join(", ")
                        ));
                    }
                }
            } else {
                self.error("match is not exhaustive, add a wildcard `_` arm".to_string());
            }
        }
        hir::Expr::Match {
            scrutinee: Box::new(scrutinee),
            arms,
            ty: result_ty.unwrap_or(Type::Void),
        }
    }

    fn resolve_pattern(&mut self, pattern: &ast::Pattern, scrutinee_ty: &Type, is_mut: bool) -> hir::Pattern {
        match pattern {
            ast::Pattern::Wildcard => hir::Pattern::Wildcard,
            ast::Pattern::Ident(name, mutability) => {
                let def_id = self.def_ids.next();
                if !self.scopes.add_binding(*name, def_id) {
                    self.error(format!("duplicate name `{}` in this scope", name.as_str()));
                }
                self.var_types.insert(def_id, scrutinee_ty.clone());
                self.ownership.declare(def_id);
                self.scope_depth.insert(def_id, self.scopes.depth());
                hir::Pattern::Binding {
                    def_id,
                    name: *name,
                    ty: scrutinee_ty.clone(),
                    is_mut: is_mut || *mutability == ast::Mutability::Mutable,
                }
            }
            ast::Pattern::Literal(lit) => hir::Pattern::Literal(self.resolve_literal(lit).0),
            ast::Pattern::Path(path) => {
                if path.segments.len() >= 2 {
                    let enum_name = path.segments[path.segments.len() - 2].ident;
                    let variant = path.segments[path.segments.len() - 1].ident;
                    hir::Pattern::Variant { enum_name, variant }
                } else {
                    hir::Pattern::Wildcard
                }
            }
            ast::Pattern::TupleStruct(path, pats) => {
                let enum_name = if path.segments.len() >= 2 {
                    path.segments[path.segments.len() - 2].ident
                } else {
                    path.segments[0].ident
                };
                let variant = path.segments[path.segments.len() - 1].ident;
                let field_tys = self.variant_tuple_types(enum_name, variant);
                let elements = pats
                    .iter()
                    .enumerate()
                    .map(|(idx, p)| {
                        let ty = field_tys.get(idx).cloned().unwrap_or(Type::Unknown);
                        self.resolve_pattern(p, &ty, is_mut)
                    })
                    .collect();
                hir::Pattern::TupleVariant {
                    enum_name,
                    variant,
                    elements,
                }
            }
            ast::Pattern::Struct(path, fields) => {
                let name = path_last_ident(path);
                let struct_fields = self.structs.get(&name).map(|i| i.fields.clone());
                let fields = fields
                    .iter()
                    .map(|fp| {
                        let ty = struct_fields
                            .as_ref()
                            .and_then(|fs| fs.iter().find(|(n, _, _)| *n == fp.field).map(|(_, t, _)| t.clone()))
                            .unwrap_or(Type::Unknown);
                        (fp.field, self.resolve_pattern(&fp.pattern, &ty, is_mut))
                    })
                    .collect();
                hir::Pattern::StructVariant {
                    enum_name: name,
                    variant: None,
                    fields,
                }
            }
            ast::Pattern::Tuple(pats) => {
                let elem_types = match scrutinee_ty {
                    Type::Tuple(ts) => ts.clone(),
                    _ => vec![Type::Unknown; pats.len()],
                };
                hir::Pattern::Tuple(
                    pats.iter()
                        .enumerate()
                        .map(|(idx, p)| {
                            let ty = elem_types.get(idx).cloned().unwrap_or(Type::Unknown);
                            self.resolve_pattern(p, &ty, is_mut)
                        })
                        .collect(),
                )
            }
            ast::Pattern::Slice(pats) => {
                let elem_ty = match scrutinee_ty {
                    Type::Slice(t) | Type::Array(t, _) => (**t).clone(),
                    _ => Type::Unknown,
                };
                hir::Pattern::Tuple(pats.iter().map(|p| self.resolve_pattern(p, &elem_ty, is_mut)).collect())
            }
            ast::Pattern::Range(lo, hi, inclusive) => hir::Pattern::Range(
                Box::new(self.resolve_pattern(lo, scrutinee_ty, is_mut)),
                Box::new(self.resolve_pattern(hi, scrutinee_ty, is_mut)),
                *inclusive,
            ),
            ast::Pattern::Or(pats) => {
                hir::Pattern::Or(pats.iter().map(|p| self.resolve_pattern(p, scrutinee_ty, is_mut)).collect())
            }
        }
    }

    fn variant_tuple_types(&self, enum_name: Symbol, variant: Symbol) -> Vec<Type> {
        self.enums
            .get(&enum_name)
            .and_then(|info| info.variants.iter().find(|(n, _)| *n == variant))
            .map(|(_, data)| match data {
                VariantDataInfo::Tuple(ts) => ts.clone(),
                _ => Vec::new(),
            })
            .unwrap_or_default()
    }

    fn resolve_assign(&mut self, a: &ast::AssignExpr, _op: Option<hir::BinOp>) -> hir::Expr {
        let place = self.resolve_expr_no_move(&a.place);
        let value = self.resolve_expr(&a.value);
        if !types_compatible(&place.ty(), &value.ty()) {
            self.error(format!("cannot assign `{}` to place of type `{}`", value.ty(), place.ty()));
        }
        if let Some(def_id) = place_def_id(&a.place, &self.scopes) {
            let target_depth = self.scope_depth.get(&def_id).copied().unwrap_or_else(|| self.scopes.depth());
            self.check_dangling_reference(target_depth, &a.value);
            self.ownership.forget(def_id);
            self.ownership.declare(def_id);
        }
        hir::Expr::Assign {
            op: None,
            place: Box::new(place),
            value: Box::new(value),
        }
    }

    fn resolve_struct_literal(&mut self, s: &ast::StructLiteralExpr) -> hir::Expr {
        let name = path_last_ident(&s.path);
        let info = self.structs.get(&name).cloned();
        let fields: Vec<(Symbol, hir::Expr)> = s
            .fields
            .iter()
            .map(|f| (f.name, self.resolve_expr(&f.expr)))
            .collect();
        if let Some(info) = &info {
            for (field_name, field_ty, _) in &info.fields {
                match fields.iter().find(|(n, _)| n == field_name) {
                    Some((_, e)) if !types_compatible(field_ty, &e.ty()) => {
                        self.error(format!(
                            "field `{}` expects `{}`, found `{}`",
                            field_name.as_str(),
                            field_ty,
                            e.ty()
                        ));
                    }
                    Some(_) => {}
                    None if s.base.is_none() => {
                        self.error(format!("missing field `{}` in struct literal", field_name.as_str()));
                    }
                    None => {}
                }
            }
            for (given_name, _) in &fields {
                if !info.fields.iter().any(|(n, _, _)| n == given_name) {
                    self.error(format!("unknown field `{}`", given_name.as_str()));
                }
            }
        } else {
            self.error(format!("undefined struct `{}`", name.as_str()));
        }
        let generic_args: Vec<Type> = s
            .generics
            .clone()
            .unwrap_or_default()
            .iter()
            .map(|t| self.ast_type_to_type(t, &self.generic_scope.clone()))
            .collect();
        hir::Expr::StructLiteral {
            name,
            fields,
            ty: Type::Struct(name, generic_args),
        }
    }

    fn resolve_enum_variant(&mut self, v: &ast::EnumVariantExpr) -> hir::Expr {
        let enum_name = path_last_ident(&v.path);
        let fields = match &v.data {
            ast::EnumVariantData::Unit => Vec::new(),
            ast::EnumVariantData::Tuple(es) => es
                .iter()
                .enumerate()
                .map(|(idx, e)| (Symbol::intern(&idx.to_string()), self.resolve_expr(e)))
                .collect(),
            ast::EnumVariantData::Struct(fs) => {
                fs.iter().map(|f| (f.name, self.resolve_expr(&f.expr))).collect()
            }
        };
        if self.enums.get(&enum_name).is_none() {
            self.error(format!("undefined enum `{}`", enum_name.as_str()));
        }
        hir::Expr::StructLiteral {
            name: v.variant,
            fields,
            ty: Type::Enum(enum_name, Vec::new()),
        }
    }

    fn resolve_try(&mut self, e: &ast::Expr) -> hir::Expr {
        let inner = self.resolve_expr(e);
        let fn_ret = self.ret_type_stack.last().cloned().unwrap_or(Type::Unknown);
        let ty = match (&inner.ty(), &fn_ret) {
            (Type::Result(ok, _), Type::Result(_, _)) => (**ok).clone(),
            (Type::Option(ok), Type::Option(_)) => (**ok).clone(),
            (Type::Result(..), _) | (Type::Option(..), _) => {
                self.error("`?` operator's wrapper kind must match the function's return type".to_string());
                Type::Unknown
            }
            (other, _) => {
                self.error(format!("`?` cannot be applied to `{}`", other));
                Type::Unknown
            }
        };
        hir::Expr::Try {
            expr: Box::new(inner),
            ty,
        }
    }
}

fn convert_binop(op: ast::BinOp) -> hir::BinOp {
    match op {
        ast::BinOp::Add => hir::BinOp::Add,
        ast::BinOp::Sub => hir::BinOp::Sub,
        ast::BinOp::Mul => hir::BinOp::Mul,
        ast::BinOp::Div => hir::BinOp::Div,
        ast::BinOp::Mod => hir::BinOp::Mod,
        ast::BinOp::Eq => hir::BinOp::Eq,
        ast::BinOp::Ne => hir::BinOp::Ne,
        ast::BinOp::Lt => hir::BinOp::Lt,
        ast::BinOp::Gt => hir::BinOp::Gt,
        ast::BinOp::Le => hir::BinOp::Le,
        ast::BinOp::Ge => hir::BinOp::Ge,
        ast::BinOp::And => hir::BinOp::And,
        ast::BinOp::Or => hir::BinOp::Or,
        ast::BinOp::BitAnd => hir::BinOp::BitAnd,
        ast::BinOp::BitOr => hir::BinOp::BitOr,
        ast::BinOp::BitXor => hir::BinOp::BitXor,
        ast::BinOp::Shl => hir::BinOp::Shl,
        ast::BinOp::Shr => hir::BinOp::Shr,
    }
}

fn convert_unop(op: ast::UnOp) -> hir::UnOp {
    match op {
        ast::UnOp::Neg => hir::UnOp::Neg,
        ast::UnOp::Not => hir::UnOp::Not,
        ast::UnOp::BitNot => hir::UnOp::BitNot,
        ast::UnOp::Deref => hir::UnOp::Deref,
        ast::UnOp::Ref(m) => hir::UnOp::Ref(m),
    }
}

fn path_last_ident(path: &ast::Path) -> Symbol {
    path.segments.last().map(|s| s.ident).unwrap_or_else(|| Symbol::intern(""))
}

fn ast_type_path(ty: &ast::Type) -> ast::Path {
    match ty {
        ast::Type::Path(p) => p.clone(),
        ast::Type::Generic(base, _) => ast_type_path(base),
        _ => ast::Path { segments: Vec::new() },
    }
}

/// `a` and `b` are compatible if equal, or either is `Never` (which absorbs
/// into the other per spec §4.2), or either side is still `Unknown`
/// (deferred to a generic bound we didn't solve further).
fn types_compatible(a: &Type, b: &Type) -> bool {
    a == b || *a == Type::Never || *b == Type::Never || *a == Type::Unknown || *b == Type::Unknown
}

fn block_diverges(block: &hir::Block) -> bool {
    block.stmts.iter().any(stmt_diverges) || block.trailing.as_ref().map(|e| e.ty() == Type::Never).unwrap_or(false)
}

fn stmt_diverges(stmt: &hir::Stmt) -> bool {
    match stmt {
        hir::Stmt::Return(_) | hir::Stmt::Break(..) | hir::Stmt::Continue(_) => true,
        hir::Stmt::Loop { body, .. } => !contains_break(body),
        hir::Stmt::Expr(e) => e.ty() == Type::Never,
        hir::Stmt::If {
            then_block,
            else_clause: Some(else_clause),
            ..
        } => {
            block_diverges(then_block)
                && match else_clause.as_ref() {
                    hir::ElseClause::Block(b) => block_diverges(b),
                    hir::ElseClause::If(s) => stmt_diverges(s),
                }
        }
        _ => false,
    }
}

/// Whether `block` contains a `break` that targets its own enclosing loop
/// (breaks nested inside a further loop belong to that inner loop, not this
/// one, so this does not recurse into `While`/`For`/`Loop` bodies).
fn contains_break(block: &hir::Block) -> bool {
    block.stmts.iter().any(stmt_contains_break)
}

fn stmt_contains_break(stmt: &hir::Stmt) -> bool {
    match stmt {
        hir::Stmt::Break(..) => true,
        hir::Stmt::If {
            then_block,
            else_clause,
            ..
        } => {
            contains_break(then_block)
                || matches!(
                    else_clause.as_deref(),
                    Some(hir::ElseClause::Block(b)) if contains_break(b)
                )
                || matches!(
                    else_clause.as_deref(),
                    Some(hir::ElseClause::If(s)) if stmt_contains_break(s)
                )
        }
        hir::Stmt::Expr(hir::Expr::Block(b)) => contains_break(b),
        _ => false,
    }
}

fn iter_elem_type(iter_ty: &Type) -> Type {
    match iter_ty {
        Type::Array(t, _) | Type::Slice(t) => (**t).clone(),
        Type::Struct(name, args) if name.as_str() == "Range" => {
            args.first().cloned().unwrap_or(Type::USIZE)
        }
        _ => Type::Unknown,
    }
}

fn place_def_id(expr: &ast::Expr, scopes: &ScopeTree) -> Option<DefId> {
    match expr {
        ast::Expr::Path(path) if path.segments.len() == 1 => scopes.resolve(path.segments[0].ident),
        _ => None,
    }
}

/// Structural unification used at call sites to recover generic bindings
/// from the shape of the actual argument type (spec §4.5 closes over the
/// same bindings this collects).
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
