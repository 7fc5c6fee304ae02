//! CodeGen Crate Integration Tests
//!
//! Unit and integration tests for LLVM IR generation, type mapping, and code emission.

use crate::*;
use corvus_sem::{FloatWidth, Type};
use inkwell::context::Context;
use inkwell::OptimizationLevel;

#[test]
fn test_llvm_backend_creation() {
    let context = Context::create();
    let backend = LlvmBackend::new(
        &context,
        "test_module",
        "x86_64-unknown-linux-gnu".to_string(),
        OptimizationLevel::None,
    );

    assert_eq!(backend.target_triple, "x86_64-unknown-linux-gnu");
    assert_eq!(backend.opt_level, OptimizationLevel::None);
}

#[test]
fn test_emit_empty_module() {
    let context = Context::create();
    let backend = LlvmBackend::new(
        &context,
        "test",
        "x86_64-unknown-linux-gnu".to_string(),
        OptimizationLevel::None,
    );

    let ir = backend.emit_llvm_ir();

    assert!(ir.contains("target triple"));
    assert!(ir.contains("x86_64-unknown-linux-gnu"));
}

#[test]
fn test_type_mapper_int_types() {
    let context = Context::create();
    let mapper = TypeMapper::new(&context);

    let llvm_ty = mapper.map_to_basic(&Type::I64);
    assert_eq!(llvm_ty.into_int_type().get_bit_width(), 64);

    let llvm_ty = mapper.map_to_basic(&Type::I8);
    assert_eq!(llvm_ty.into_int_type().get_bit_width(), 8);

    let llvm_ty = mapper.map_to_basic(&Type::I16);
    assert_eq!(llvm_ty.into_int_type().get_bit_width(), 16);

    let llvm_ty = mapper.map_to_basic(&Type::I32);
    assert_eq!(llvm_ty.into_int_type().get_bit_width(), 32);
}

#[test]
fn test_type_mapper_unsigned_types() {
    let context = Context::create();
    let mapper = TypeMapper::new(&context);

    let llvm_ty = mapper.map_to_basic(&Type::U64);
    assert_eq!(llvm_ty.into_int_type().get_bit_width(), 64);

    let llvm_ty = mapper.map_to_basic(&Type::U8);
    assert_eq!(llvm_ty.into_int_type().get_bit_width(), 8);

    let llvm_ty = mapper.map_to_basic(&Type::U16);
    assert_eq!(llvm_ty.into_int_type().get_bit_width(), 16);

    let llvm_ty = mapper.map_to_basic(&Type::U32);
    assert_eq!(llvm_ty.into_int_type().get_bit_width(), 32);
}

#[test]
fn test_type_mapper_float_types() {
    let context = Context::create();
    let mapper = TypeMapper::new(&context);

    let llvm_ty = mapper.map_to_basic(&Type::Float(FloatWidth::W64));
    assert!(llvm_ty.is_float_type());
    assert_eq!(llvm_ty.into_float_type().get_bit_width(), 64);

    let llvm_ty = mapper.map_to_basic(&Type::Float(FloatWidth::W32));
    assert!(llvm_ty.is_float_type());
    assert_eq!(llvm_ty.into_float_type().get_bit_width(), 32);
}

#[test]
fn test_type_mapper_bool_type() {
    let context = Context::create();
    let mapper = TypeMapper::new(&context);

    let llvm_ty = mapper.map_to_basic(&Type::Bool);
    assert_eq!(llvm_ty.into_int_type().get_bit_width(), 1);
}

#[test]
fn test_type_mapper_array_type() {
    let context = Context::create();
    let mapper = TypeMapper::new(&context);

    let array_ty = Type::Array(Box::new(Type::I64), 10);
    let llvm_ty = mapper.map_to_basic(&array_ty);
    assert!(llvm_ty.is_array_type());
}

#[test]
fn test_type_mapper_reference_type() {
    let context = Context::create();
    let mapper = TypeMapper::new(&context);

    let ref_ty = Type::Reference(Box::new(Type::I64), false);
    let llvm_ty = mapper.map_to_basic(&ref_ty);
    assert!(llvm_ty.is_pointer_type());

    let mut_ref_ty = Type::Reference(Box::new(Type::I64), true);
    let llvm_mut_ty = mapper.map_to_basic(&mut_ref_ty);
    assert!(llvm_mut_ty.is_pointer_type());
}

#[test]
fn test_type_mapper_fn_type() {
    let context = Context::create();
    let mapper = TypeMapper::new(&context);

    let fn_ty = Type::Fn(vec![Type::I32], Box::new(Type::I64));
    let llvm_ty = mapper.map_to_basic(&fn_ty);
    assert!(llvm_ty.is_pointer_type());
}

#[test]
fn test_type_mapper_tuple_type() {
    let context = Context::create();
    let mapper = TypeMapper::new(&context);

    let tuple_ty = Type::Tuple(vec![Type::I32, Type::Bool]);
    let llvm_ty = mapper.map_to_basic(&tuple_ty);
    assert!(llvm_ty.is_struct_type());
}

#[test]
fn test_type_size_calculations() {
    let context = Context::create();
    let mapper = TypeMapper::new(&context);

    assert_eq!(mapper.size_of(&Type::I8), 1);
    assert_eq!(mapper.size_of(&Type::I16), 2);
    assert_eq!(mapper.size_of(&Type::I32), 4);
    assert_eq!(mapper.size_of(&Type::I64), 8);
    assert_eq!(mapper.size_of(&Type::Float(FloatWidth::W64)), 8);
}

#[test]
fn test_type_alignment_calculations() {
    let context = Context::create();
    let mapper = TypeMapper::new(&context);

    assert_eq!(mapper.alignment_of(&Type::I8), 1);
    assert_eq!(mapper.alignment_of(&Type::I16), 2);
    assert_eq!(mapper.alignment_of(&Type::I32), 4);
    assert_eq!(mapper.alignment_of(&Type::I64), 8);
}

#[test]
#[should_panic(expected = "unresolved generic")]
fn test_type_mapper_rejects_generic() {
    let context = Context::create();
    let mapper = TypeMapper::new(&context);
    let generic_ty = Type::Generic(corvus_util::Symbol::intern("T"), vec![]);
    mapper.map_to_basic(&generic_ty);
}

#[test]
fn test_compile_lir_function() {
    use corvus_lir::{Function as LirFunction, Instruction};

    let context = Context::create();
    let mut backend = LlvmBackend::new(
        &context,
        "test",
        "x86_64-unknown-linux-gnu".to_string(),
        OptimizationLevel::None,
    );

    let mut lir_func = LirFunction::new(corvus_util::Symbol::intern("simple_fn"));
    lir_func.instructions.push(Instruction::Label {
        name: ".Lbb0".to_string(),
    });
    lir_func.instructions.push(Instruction::Ret { value: None });

    let func_val = backend.compile_function(&lir_func).unwrap();
    assert_eq!(func_val.get_name().to_str(), Ok("simple_fn"));
}

#[test]
fn test_write_ir_to_file() {
    use std::fs;
    use std::path::PathBuf;

    let context = Context::create();
    let backend = LlvmBackend::new(
        &context,
        "test",
        "x86_64-unknown-linux-gnu".to_string(),
        OptimizationLevel::None,
    );

    let temp_path = PathBuf::from("/tmp/test_corvus_gen_ir.ll");
    let result = backend.write_ir_to_file(&temp_path);

    assert!(result.is_ok());
    assert!(temp_path.exists());

    let _ = fs::remove_file(&temp_path);
}

#[test]
fn test_optimization_levels() {
    let context = Context::create();

    let backend_none = LlvmBackend::new(
        &context,
        "test",
        "x86_64".to_string(),
        OptimizationLevel::None,
    );
    assert_eq!(backend_none.opt_level, OptimizationLevel::None);

    let backend_default = LlvmBackend::new(
        &context,
        "test",
        "x86_64".to_string(),
        OptimizationLevel::Default,
    );
    assert_eq!(backend_default.opt_level, OptimizationLevel::Default);
}
