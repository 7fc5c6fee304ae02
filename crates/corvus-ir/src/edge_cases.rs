//! End-to-end lowering tests: hand-built HIR fixtures run through the
//! full `lower_module` -> `verify_module` -> `optimize_module` pipeline,
//! plus printer round trips not covered by the unit tests colocated with
//! each module.

use crate::lower::lower_module;
use crate::opt::optimize_module;
use crate::printer::print_module;
use crate::verify::verify_module;
use corvus_sem::hir;
use corvus_sem::types::Type;
use corvus_util::{DefId, Symbol};

fn int_ty() -> Type {
    Type::I32
}

fn param(def_id: u32, name: &str, ty: Type) -> hir::Param {
    hir::Param { def_id: DefId(def_id), name: Symbol::intern(name), ty, is_mut: false }
}

fn var(def_id: u32, ty: Type) -> hir::Expr {
    hir::Expr::Var { def_id: DefId(def_id), ty }
}

fn int_lit(n: i64) -> hir::Expr {
    hir::Expr::Literal { lit: hir::Literal::Int(n), ty: int_ty() }
}

fn block(trailing: hir::Expr) -> hir::Block {
    hir::Block { stmts: Vec::new(), trailing: Some(Box::new(trailing)), ty: int_ty() }
}

fn fn_item(name: &str, params: Vec<hir::Param>, ret: Type, body: hir::Block) -> hir::Item {
    hir::Item::Function(hir::FnItem {
        def_id: DefId(100),
        name: Symbol::intern(name),
        generics: hir::GenericParams::default(),
        params,
        ret_type: ret,
        body,
        is_async: false,
        is_public: true,
    })
}

#[test]
fn identity_function_lowers_and_verifies_cleanly() {
    let items = vec![fn_item("identity", vec![param(0, "x", int_ty())], int_ty(), block(var(0, int_ty())))];
    let module = lower_module("m", &items).expect("lowering should succeed");
    let errors = verify_module(&module);
    assert!(errors.is_empty(), "{:?}", errors);

    let text = print_module(&module);
    assert!(text.contains("func @identity(i32 %x) -> i32"));
}

#[test]
fn constant_arithmetic_folds_to_a_single_return_value() {
    let expr = hir::Expr::Binary {
        op: hir::BinOp::Add,
        left: Box::new(int_lit(10)),
        right: Box::new(hir::Expr::Binary {
            op: hir::BinOp::Mul,
            left: Box::new(int_lit(7)),
            right: Box::new(int_lit(2)),
            ty: int_ty(),
        }),
        ty: int_ty(),
    };
    let items = vec![fn_item("answer", vec![], int_ty(), block(expr))];
    let mut module = lower_module("m", &items).expect("lowering should succeed");
    optimize_module(&mut module);

    assert!(verify_module(&module).is_empty());
    let func = &module.functions[0];
    let entry = func.entry;
    let ret = func.blocks[entry].instructions.last().unwrap();
    assert_eq!(ret.operands[0].as_int(), Some(24));
}

#[test]
fn if_expression_merges_through_a_phi_and_verifies() {
    let cond = hir::Expr::Literal { lit: hir::Literal::Bool(true), ty: Type::Bool };
    let if_expr = hir::Expr::If {
        cond: Box::new(cond),
        then_expr: Box::new(int_lit(1)),
        else_expr: Some(Box::new(int_lit(0))),
        ty: int_ty(),
    };
    let items = vec![fn_item("pick", vec![], int_ty(), block(if_expr))];
    let module = lower_module("m", &items).expect("lowering should succeed");
    assert!(verify_module(&module).is_empty());

    let text = print_module(&module);
    assert!(text.contains("phi i32"));
}

#[test]
fn while_loop_lowers_with_correct_back_edge_and_verifies() {
    let body = hir::Stmt::While {
        cond: hir::Expr::Literal { lit: hir::Literal::Bool(false), ty: Type::Bool },
        body: hir::Block { stmts: Vec::new(), trailing: None, ty: Type::Void },
        label: None,
    };
    let fn_body = hir::Block { stmts: vec![body], trailing: None, ty: Type::Void };
    let items = vec![fn_item("spin", vec![], Type::Void, fn_body)];
    let module = lower_module("m", &items).expect("lowering should succeed");
    let errors = verify_module(&module);
    assert!(errors.is_empty(), "{:?}", errors);

    let func = &module.functions[0];
    assert!(func.blocks.len() >= 3, "expected header/body/end blocks");
}

#[test]
fn struct_field_read_goes_through_get_field() {
    let struct_item = hir::Item::Struct(hir::StructItem {
        def_id: DefId(1),
        name: Symbol::intern("Point"),
        generics: hir::GenericParams::default(),
        fields: vec![
            hir::FieldDef { name: Symbol::intern("x"), ty: int_ty(), is_public: true },
            hir::FieldDef { name: Symbol::intern("y"), ty: int_ty(), is_public: true },
        ],
        is_public: true,
    });
    let point_ty = Type::Struct(Symbol::intern("Point"), Vec::new());
    let field_expr = hir::Expr::Field {
        object: Box::new(var(0, point_ty.clone())),
        field: Symbol::intern("y"),
        ty: int_ty(),
    };
    let get_y_fn = fn_item("get_y", vec![param(0, "p", point_ty)], int_ty(), block(field_expr));
    let items = vec![struct_item, get_y_fn];

    let module = lower_module("m", &items).expect("lowering should succeed");
    assert_eq!(module.struct_layouts.len(), 1);
    assert_eq!(module.struct_layouts[0].fields.len(), 2);
    let errors = verify_module(&module);
    assert!(errors.is_empty(), "{:?}", errors);

    let func = module.find_function("get_y").unwrap();
    let entry = func.entry;
    assert!(func.blocks[entry].instructions.iter().any(|i| i.opcode == crate::ir::Opcode::GetField));
}

#[test]
fn break_outside_a_loop_is_rejected_instead_of_miscompiled() {
    let fn_body = hir::Block { stmts: vec![hir::Stmt::Break(None, None)], trailing: None, ty: Type::Void };
    let items = vec![fn_item("bad", vec![], Type::Void, fn_body)];
    let result = lower_module("m", &items);
    assert!(result.is_err());
}

#[test]
fn inlining_a_trivial_helper_then_folding_proves_the_call_is_gone() {
    let double_body = block(hir::Expr::Binary {
        op: hir::BinOp::Mul,
        left: Box::new(var(0, int_ty())),
        right: Box::new(int_lit(2)),
        ty: int_ty(),
    });
    let double_fn = hir::Item::Function(hir::FnItem {
        def_id: DefId(1),
        name: Symbol::intern("double"),
        generics: hir::GenericParams::default(),
        params: vec![param(0, "n", int_ty())],
        ret_type: int_ty(),
        body: double_body,
        is_async: false,
        is_public: false,
    });
    let call_expr = hir::Expr::Call { callee: Symbol::intern("double"), args: vec![int_lit(21)], ty: int_ty() };
    let main_fn = fn_item("main", vec![], int_ty(), block(call_expr));
    let items = vec![main_fn, double_fn];

    let mut module = lower_module("m", &items).expect("lowering should succeed");
    optimize_module(&mut module);
    assert!(verify_module(&module).is_empty());

    let main = module.find_function("main").unwrap();
    let entry = main.entry;
    let ret = main.blocks[entry].instructions.last().unwrap();
    assert_eq!(ret.operands[0].as_int(), Some(42));
}
