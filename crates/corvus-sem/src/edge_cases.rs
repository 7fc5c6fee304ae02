//! Integration-style tests exercising the resolver end to end against
//! hand-built ASTs, plus scope-tree edge cases not covered by the unit
//! tests colocated with each module.

use crate::resolver::Resolver;
use crate::scope::{RibKind, ScopeTree};
use crate::types::Type;
use corvus_par::ast;
use corvus_util::{DefIdGenerator, Handler, Span, Symbol};

// ----- scope tree -----

#[test]
fn resolve_finds_binding_in_enclosing_scope() {
    let gen = DefIdGenerator::new();
    let mut tree = ScopeTree::new();
    let x = Symbol::intern("x");
    let def_id = gen.next();
    tree.add_binding(x, def_id);

    tree.enter_scope(RibKind::Block);
    assert_eq!(tree.resolve(x), Some(def_id));
    tree.exit_scope();
}

#[test]
fn inner_binding_shadows_outer() {
    let gen = DefIdGenerator::new();
    let mut tree = ScopeTree::new();
    let x = Symbol::intern("x");
    let outer = gen.next();
    tree.add_binding(x, outer);

    tree.enter_scope(RibKind::Block);
    let inner = gen.next();
    tree.add_binding(x, inner);
    assert_eq!(tree.resolve(x), Some(inner));
    tree.exit_scope();

    assert_eq!(tree.resolve(x), Some(outer));
}

#[test]
fn exiting_scope_drops_its_bindings() {
    let gen = DefIdGenerator::new();
    let mut tree = ScopeTree::new();
    let x = Symbol::intern("x");

    tree.enter_scope(RibKind::Block);
    tree.add_binding(x, gen.next());
    tree.exit_scope();

    assert_eq!(tree.resolve(x), None);
}

#[test]
fn unresolved_name_returns_none() {
    let tree = ScopeTree::new();
    assert_eq!(tree.resolve(Symbol::intern("nowhere")), None);
}

#[test]
fn function_rib_still_sees_module_bindings() {
    let gen = DefIdGenerator::new();
    let mut tree = ScopeTree::new();
    let f = Symbol::intern("helper");
    let def_id = gen.next();
    tree.add_binding(f, def_id);

    tree.enter_scope(RibKind::Function);
    assert_eq!(tree.resolve(f), Some(def_id));
    tree.exit_scope();
}

#[test]
fn nested_loop_ribs_each_see_the_outer_binding() {
    let gen = DefIdGenerator::new();
    let mut tree = ScopeTree::new();
    let x = Symbol::intern("x");
    tree.add_binding(x, gen.next());

    tree.enter_scope(RibKind::Loop(None));
    tree.enter_scope(RibKind::Loop(None));
    assert!(tree.resolve(x).is_some());
    tree.exit_scope();
    tree.exit_scope();
}

// ----- AST fixture helpers -----

fn ty_path(name: &str) -> ast::Type {
    ast::Type::Path(ast::Path {
        segments: vec![ast::PathSegment {
            ident: Symbol::intern(name),
            args: None,
        }],
    })
}

fn path_expr(name: &str) -> ast::Expr {
    ast::Expr::Path(ast::Path {
        segments: vec![ast::PathSegment {
            ident: Symbol::intern(name),
            args: None,
        }],
    })
}

fn int_lit(v: i64) -> ast::Expr {
    ast::Expr::Literal(ast::Literal::Int(v))
}

fn binary(op: ast::BinOp, left: ast::Expr, right: ast::Expr) -> ast::Expr {
    ast::Expr::Binary(ast::BinaryExpr {
        left: Box::new(left),
        op,
        right: Box::new(right),
        span: Span::DUMMY,
    })
}

fn block_expr(stmts: Vec<ast::Stmt>, trailing: Option<ast::Expr>) -> ast::Block {
    ast::Block {
        stmts,
        trailing: trailing.map(Box::new),
        span: Span::DUMMY,
    }
}

fn param(name: &str, ty: &str) -> ast::Param {
    ast::Param {
        name: Symbol::intern(name),
        ty: ty_path(ty),
        mutable: false,
    }
}

fn fn_item(name: &str, params: Vec<ast::Param>, ret: &str, body: ast::Block) -> ast::FnItem {
    ast::FnItem {
        name: Symbol::intern(name),
        generics: Vec::new(),
        params,
        ret_type: Some(ty_path(ret)),
        body,
        visibility: ast::Visibility::Private,
        span: Span::DUMMY,
        async_kw: false,
        where_clause: None,
    }
}

fn let_stmt(name: &str, ty: Option<&str>, init: ast::Expr, mutable: bool) -> ast::Stmt {
    ast::Stmt::Let(ast::LetStmt {
        pattern: ast::Pattern::Ident(Symbol::intern(name), ast::Mutability::Immutable),
        ty: ty.map(ty_path),
        init: Some(init),
        mutable,
    })
}

// ----- resolver: happy paths -----

#[test]
fn simple_arithmetic_function_resolves_cleanly() {
    let handler = Handler::new();
    let body = block_expr(
        Vec::new(),
        Some(binary(ast::BinOp::Add, path_expr("a"), path_expr("b"))),
    );
    let ast: ast::Ast = vec![ast::Item::Fn(fn_item(
        "add",
        vec![param("a", "i32"), param("b", "i32")],
        "i32",
        body,
    ))];

    let output = Resolver::new(&handler).resolve(&ast);
    assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    assert_eq!(output.items.len(), 1);
}

#[test]
fn let_binding_is_visible_in_trailing_expression() {
    let handler = Handler::new();
    let body = block_expr(
        vec![let_stmt("x", Some("i32"), int_lit(42), false)],
        Some(path_expr("x")),
    );
    let ast: ast::Ast = vec![ast::Item::Fn(fn_item("main", Vec::new(), "i32", body))];

    Resolver::new(&handler).resolve(&ast);
    assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
}

// ----- resolver: error paths -----

#[test]
fn undefined_variable_is_reported() {
    let handler = Handler::new();
    let body = block_expr(Vec::new(), Some(path_expr("ghost")));
    let ast: ast::Ast = vec![ast::Item::Fn(fn_item("main", Vec::new(), "i32", body))];

    Resolver::new(&handler).resolve(&ast);
    assert!(handler.has_errors());
}

#[test]
fn call_to_undefined_function_is_reported() {
    let handler = Handler::new();
    let call = ast::Expr::Call(ast::CallExpr {
        func: Box::new(path_expr("nowhere")),
        args: Vec::new(),
        span: Span::DUMMY,
        generics: None,
    });
    let body = block_expr(Vec::new(), Some(call));
    let ast: ast::Ast = vec![ast::Item::Fn(fn_item("main", Vec::new(), "i32", body))];

    Resolver::new(&handler).resolve(&ast);
    assert!(handler.has_errors());
}

#[test]
fn mismatched_arithmetic_operands_are_reported() {
    let handler = Handler::new();
    let body = block_expr(
        Vec::new(),
        Some(binary(
            ast::BinOp::Add,
            int_lit(1),
            ast::Expr::Literal(ast::Literal::Bool(true)),
        )),
    );
    let ast: ast::Ast = vec![ast::Item::Fn(fn_item("main", Vec::new(), "i32", body))];

    Resolver::new(&handler).resolve(&ast);
    assert!(handler.has_errors());
}

#[test]
fn using_a_moved_value_twice_is_reported() {
    let handler = Handler::new();
    // fn main() -> String { let s: String = "hi"; let t = s; s }
    // The second use of `s` after it moved into `t` must be flagged.
    let body = block_expr(
        vec![
            let_stmt(
                "s",
                Some("String"),
                ast::Expr::Literal(ast::Literal::String(Symbol::intern("hi"))),
                false,
            ),
            let_stmt("t", None, path_expr("s"), false),
        ],
        Some(path_expr("s")),
    );
    let ast: ast::Ast = vec![ast::Item::Fn(fn_item("main", Vec::new(), "String", body))];

    Resolver::new(&handler).resolve(&ast);
    assert!(handler.has_errors());
}

#[test]
fn copy_type_can_be_used_after_first_use() {
    let handler = Handler::new();
    let body = block_expr(
        vec![
            let_stmt("n", Some("i32"), int_lit(1), false),
            let_stmt("m", None, path_expr("n"), false),
        ],
        Some(path_expr("n")),
    );
    let ast: ast::Ast = vec![ast::Item::Fn(fn_item("main", Vec::new(), "i32", body))];

    Resolver::new(&handler).resolve(&ast);
    assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
}

#[test]
fn struct_literal_resolves_against_its_declared_fields() {
    let handler = Handler::new();
    let struct_item = ast::StructItem {
        name: Symbol::intern("Point"),
        generics: Vec::new(),
        fields: vec![
            ast::Field {
                name: Symbol::intern("x"),
                ty: ty_path("i32"),
                visibility: ast::Visibility::Public,
            },
            ast::Field {
                name: Symbol::intern("y"),
                ty: ty_path("i32"),
                visibility: ast::Visibility::Public,
            },
        ],
        visibility: ast::Visibility::Public,
        span: Span::DUMMY,
        where_clause: None,
    };
    let literal = ast::Expr::StructLiteral(Box::new(ast::StructLiteralExpr {
        path: ast::Path {
            segments: vec![ast::PathSegment {
                ident: Symbol::intern("Point"),
                args: None,
            }],
        },
        generics: None,
        fields: vec![
            ast::StructField {
                name: Symbol::intern("x"),
                expr: int_lit(1),
                is_shorthand: false,
            },
            ast::StructField {
                name: Symbol::intern("y"),
                expr: int_lit(2),
                is_shorthand: false,
            },
        ],
        base: None,
    }));
    let body = block_expr(Vec::new(), Some(literal));
    let ast: ast::Ast = vec![
        ast::Item::Struct(struct_item),
        ast::Item::Fn(fn_item("make_point", Vec::new(), "Point", body)),
    ];

    let output = Resolver::new(&handler).resolve(&ast);
    assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    assert_eq!(output.items.len(), 2);
}

#[test]
fn undefined_struct_literal_is_reported() {
    let handler = Handler::new();
    let literal = ast::Expr::StructLiteral(Box::new(ast::StructLiteralExpr {
        path: ast::Path {
            segments: vec![ast::PathSegment {
                ident: Symbol::intern("Ghost"),
                args: None,
            }],
        },
        generics: None,
        fields: Vec::new(),
        base: None,
    }));
    let body = block_expr(Vec::new(), Some(literal));
    let ast: ast::Ast = vec![ast::Item::Fn(fn_item("main", Vec::new(), "i32", body))];

    Resolver::new(&handler).resolve(&ast);
    assert!(handler.has_errors());
}

#[test]
fn generic_function_call_site_records_an_instantiation() {
    let handler = Handler::new();
    let identity = ast::FnItem {
        name: Symbol::intern("identity"),
        generics: vec![ast::GenericParam {
            name: Symbol::intern("T"),
            bounds: Vec::new(),
        }],
        params: vec![param("x", "T")],
        ret_type: Some(ty_path("T")),
        body: block_expr(Vec::new(), Some(path_expr("x"))),
        visibility: ast::Visibility::Private,
        span: Span::DUMMY,
        async_kw: false,
        where_clause: None,
    };
    let call = ast::Expr::Call(ast::CallExpr {
        func: Box::new(path_expr("identity")),
        args: vec![int_lit(7)],
        span: Span::DUMMY,
        generics: None,
    });
    let main = fn_item("main", Vec::new(), "i32", block_expr(Vec::new(), Some(call)));

    let ast: ast::Ast = vec![ast::Item::Fn(identity), ast::Item::Fn(main)];
    let output = Resolver::new(&handler).resolve(&ast);
    assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    assert!(
        output
            .instantiations
            .iter()
            .any(|(name, tys)| name.as_str() == "identity" && tys == &vec![Type::I32]),
        "expected an `identity::<i32>` instantiation, got {:?}",
        output.instantiations
    );
}

// ----- resolver: cross-module visibility -----

fn point_struct(x_vis: ast::Visibility, y_vis: ast::Visibility) -> ast::Item {
    ast::Item::Struct(ast::StructItem {
        name: Symbol::intern("Point"),
        generics: Vec::new(),
        fields: vec![
            ast::Field {
                name: Symbol::intern("x"),
                ty: ty_path("i32"),
                visibility: x_vis,
            },
            ast::Field {
                name: Symbol::intern("y"),
                ty: ty_path("i32"),
                visibility: y_vis,
            },
        ],
        visibility: ast::Visibility::Public,
        span: Span::DUMMY,
        where_clause: None,
    })
}

fn field_access(object: ast::Expr, field: &str) -> ast::Expr {
    ast::Expr::Field(ast::FieldExpr {
        object: Box::new(object),
        field: Symbol::intern(field),
        span: Span::DUMMY,
    })
}

fn point_literal() -> ast::Expr {
    ast::Expr::StructLiteral(Box::new(ast::StructLiteralExpr {
        path: ast::Path {
            segments: vec![ast::PathSegment {
                ident: Symbol::intern("Point"),
                args: None,
            }],
        },
        generics: None,
        fields: vec![
            ast::StructField {
                name: Symbol::intern("x"),
                expr: int_lit(1),
                is_shorthand: false,
            },
            ast::StructField {
                name: Symbol::intern("y"),
                expr: int_lit(2),
                is_shorthand: false,
            },
        ],
        base: None,
    }))
}

#[test]
fn private_field_access_from_another_module_is_reported() {
    let handler = Handler::new();
    let module_a: ast::Ast = vec![point_struct(ast::Visibility::Public, ast::Visibility::Private)];
    let body = block_expr(
        vec![let_stmt("p", Some("Point"), point_literal(), false)],
        Some(field_access(path_expr("p"), "y")),
    );
    let module_b: ast::Ast = vec![ast::Item::Fn(fn_item("use_point", Vec::new(), "i32", body))];

    let mut resolver = Resolver::new(&handler);
    resolver.resolve_module(Symbol::intern("a"), &module_a);
    resolver.resolve_module(Symbol::intern("b"), &module_b);
    assert!(handler.has_errors(), "private field `y` should be rejected from module b");
}

#[test]
fn public_field_access_from_another_module_is_permitted() {
    let handler = Handler::new();
    let module_a: ast::Ast = vec![point_struct(ast::Visibility::Public, ast::Visibility::Public)];
    let body = block_expr(
        vec![let_stmt("p", Some("Point"), point_literal(), false)],
        Some(field_access(path_expr("p"), "y")),
    );
    let module_b: ast::Ast = vec![ast::Item::Fn(fn_item("use_point", Vec::new(), "i32", body))];

    let mut resolver = Resolver::new(&handler);
    resolver.resolve_module(Symbol::intern("a"), &module_a);
    let output = resolver.resolve_module(Symbol::intern("b"), &module_b);
    assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
    assert_eq!(output.items.len(), 1);
}

#[test]
fn private_field_access_within_same_module_is_permitted() {
    let handler = Handler::new();
    let body = block_expr(
        vec![let_stmt("p", Some("Point"), point_literal(), false)],
        Some(field_access(path_expr("p"), "y")),
    );
    let ast: ast::Ast = vec![
        point_struct(ast::Visibility::Public, ast::Visibility::Private),
        ast::Item::Fn(fn_item("use_point", Vec::new(), "i32", body)),
    ];

    Resolver::new(&handler).resolve(&ast);
    assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
}

#[test]
fn private_function_call_from_another_module_is_reported() {
    let handler = Handler::new();
    let secret = ast::FnItem {
        name: Symbol::intern("secret"),
        generics: Vec::new(),
        params: Vec::new(),
        ret_type: Some(ty_path("i32")),
        body: block_expr(Vec::new(), Some(int_lit(1))),
        visibility: ast::Visibility::Private,
        span: Span::DUMMY,
        async_kw: false,
        where_clause: None,
    };
    let module_a: ast::Ast = vec![ast::Item::Fn(secret)];
    let call = ast::Expr::Call(ast::CallExpr {
        func: Box::new(path_expr("secret")),
        args: Vec::new(),
        span: Span::DUMMY,
        generics: None,
    });
    let module_b: ast::Ast = vec![ast::Item::Fn(fn_item(
        "use_secret",
        Vec::new(),
        "i32",
        block_expr(Vec::new(), Some(call)),
    ))];

    let mut resolver = Resolver::new(&handler);
    resolver.resolve_module(Symbol::intern("a"), &module_a);
    resolver.resolve_module(Symbol::intern("b"), &module_b);
    assert!(handler.has_errors(), "private function `secret` should be rejected from module b");
}

// ----- resolver: intrinsics and unreachable code -----

fn ref_expr(inner: ast::Expr, is_mut: bool) -> ast::Expr {
    ast::Expr::Unary(ast::UnaryExpr {
        op: ast::UnOp::Ref(is_mut),
        expr: Box::new(inner),
        span: Span::DUMMY,
    })
}

#[test]
fn panic_call_type_checks_as_never_and_satisfies_non_void_return() {
    let handler = Handler::new();
    let call = ast::Expr::Call(ast::CallExpr {
        func: Box::new(path_expr("panic")),
        args: vec![ast::Expr::Literal(ast::Literal::String(Symbol::intern("unreachable")))],
        span: Span::DUMMY,
        generics: None,
    });
    let body = block_expr(Vec::new(), Some(call));
    let ast: ast::Ast = vec![ast::Item::Fn(fn_item("always_panics", Vec::new(), "i32", body))];

    Resolver::new(&handler).resolve(&ast);
    assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
}

#[test]
fn code_after_panic_is_reported_unreachable() {
    let handler = Handler::new();
    let call = ast::Expr::Call(ast::CallExpr {
        func: Box::new(path_expr("panic")),
        args: vec![ast::Expr::Literal(ast::Literal::String(Symbol::intern("boom")))],
        span: Span::DUMMY,
        generics: None,
    });
    let body = block_expr(
        vec![ast::Stmt::Expr(call), let_stmt("x", Some("i32"), int_lit(1), false)],
        Some(path_expr("x")),
    );
    let ast: ast::Ast = vec![ast::Item::Fn(fn_item("main", Vec::new(), "i32", body))];

    Resolver::new(&handler).resolve(&ast);
    assert!(handler.has_errors(), "statement after an unconditional panic must be unreachable");
}

#[test]
fn assigning_a_reference_to_an_inner_scope_binding_is_reported() {
    let handler = Handler::new();
    let inner_block = block_expr(
        vec![
            let_stmt("y", Some("i32"), int_lit(1), false),
            ast::Stmt::Expr(ast::Expr::Assign(ast::AssignExpr {
                place: Box::new(path_expr("r")),
                value: Box::new(ref_expr(path_expr("y"), false)),
            })),
        ],
        None,
    );
    let body = block_expr(
        vec![
            let_stmt("r", None, ref_expr(path_expr("p"), false), true),
            ast::Stmt::Expr(ast::Expr::Block(inner_block)),
        ],
        Some(int_lit(0)),
    );
    let ast: ast::Ast = vec![ast::Item::Fn(fn_item("f", vec![param("p", "i32")], "i32", body))];

    Resolver::new(&handler).resolve(&ast);
    assert!(handler.has_errors(), "`r` would dangle once the inner block holding `y` exits");
}

#[test]
fn reference_to_an_outer_binding_from_an_inner_scope_is_permitted() {
    let handler = Handler::new();
    let inner_block = block_expr(
        vec![let_stmt("r", None, ref_expr(path_expr("p"), false), false)],
        None,
    );
    let body = block_expr(vec![ast::Stmt::Expr(ast::Expr::Block(inner_block))], Some(int_lit(0)));
    let ast: ast::Ast = vec![ast::Item::Fn(fn_item("f", vec![param("p", "i32")], "i32", body))];

    Resolver::new(&handler).resolve(&ast);
    assert!(!handler.has_errors(), "{:?}", handler.diagnostics());
}
