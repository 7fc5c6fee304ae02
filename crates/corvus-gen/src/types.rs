//! Type Mapping for LLVM IR Generation
//!
//! Maps the resolved `corvus_sem::Type` lattice onto LLVM IR types. Generics
//! must already be monomorphized away before reaching this layer - `Generic`
//! and `Unknown` have no LLVM representation and are rejected.

use corvus_sem::{FloatWidth, IntWidth, Type};
use inkwell::context::Context;
use inkwell::types::{BasicTypeEnum, StructType};

pub struct TypeMapper<'ctx> {
    pub context: &'ctx Context,
}

impl<'ctx> TypeMapper<'ctx> {
    pub fn new(context: &'ctx Context) -> Self {
        Self { context }
    }

    /// Map a resolved type to its LLVM basic type.
    pub fn map_to_basic(&self, ty: &Type) -> BasicTypeEnum<'ctx> {
        match ty {
            Type::Int(width, _) => self.int_type_for_width(*width).into(),
            Type::Float(FloatWidth::W32) => self.context.f32_type().into(),
            Type::Float(FloatWidth::W64) => self.context.f64_type().into(),
            Type::Float(FloatWidth::W128) => self.context.f128_type().into(),
            Type::Bool => self.context.bool_type().into(),
            Type::Char => self.context.i32_type().into(),
            Type::String => self.context.ptr_type(inkwell::AddressSpace::default()).into(),
            Type::Void | Type::Never => self.context.i8_type().into(),
            Type::Reference(_, _) => self.context.ptr_type(inkwell::AddressSpace::default()).into(),
            Type::Tuple(elems) => self.struct_type_for(elems).into(),
            Type::Array(elem, len) => {
                let elem_ty = self.map_to_basic(elem);
                elem_ty.array_type(*len as u32).into()
            },
            Type::Slice(_) => {
                // Fat pointer: {ptr, len}. No LLVM primitive for this, so
                // model it as the two-field struct a real backend would lower it to.
                let ptr = self.context.ptr_type(inkwell::AddressSpace::default());
                let len = self.context.i64_type();
                self.context
                    .struct_type(&[ptr.into(), len.into()], false)
                    .into()
            },
            Type::Fn(params, ret) => {
                let param_types: Vec<_> = params.iter().map(|p| self.map_to_basic(p).into()).collect();
                let ret_ty = self.map_to_basic(ret);
                ret_ty
                    .fn_type(&param_types, false)
                    .ptr_type(inkwell::AddressSpace::default())
                    .into()
            },
            Type::Struct(_, fields) => self.struct_type_for(fields).into(),
            Type::Enum(_, variants) => {
                // Tagged union: {i32 discriminant, largest-payload-sized blob}.
                let payload_size = variants
                    .iter()
                    .map(|v| self.size_of(v))
                    .max()
                    .unwrap_or(0);
                let payload = self.context.i8_type().array_type(payload_size as u32);
                self.context
                    .struct_type(&[self.context.i32_type().into(), payload.into()], false)
                    .into()
            },
            Type::Option(inner) => {
                let payload = self.map_to_basic(inner);
                self.context
                    .struct_type(&[self.context.i32_type().into(), payload.into()], false)
                    .into()
            },
            Type::Result(ok, err) => {
                let payload_size = self.size_of(ok).max(self.size_of(err));
                let payload = self.context.i8_type().array_type(payload_size as u32);
                self.context
                    .struct_type(&[self.context.i32_type().into(), payload.into()], false)
                    .into()
            },
            Type::Generic(name, _) => {
                panic!("unresolved generic parameter '{}' reached code generation", name.as_str())
            },
            Type::Unknown => panic!("unresolved type reached code generation"),
        }
    }

    fn int_type_for_width(&self, width: IntWidth) -> inkwell::types::IntType<'ctx> {
        match width {
            IntWidth::W8 => self.context.i8_type(),
            IntWidth::W16 => self.context.i16_type(),
            IntWidth::W32 => self.context.i32_type(),
            IntWidth::W64 => self.context.i64_type(),
            IntWidth::W128 => self.context.i128_type(),
            IntWidth::Ptr => self.context.i64_type(),
        }
    }

    fn struct_type_for(&self, fields: &[Type]) -> StructType<'ctx> {
        let field_types: Vec<_> = fields.iter().map(|f| self.map_to_basic(f)).collect();
        self.context.struct_type(&field_types, false)
    }

    /// Size in bytes, matching the System V AMD64 data layout.
    pub fn size_of(&self, ty: &Type) -> u64 {
        match ty {
            Type::Int(width, _) => Self::int_width_bytes(*width),
            Type::Float(FloatWidth::W32) => 4,
            Type::Float(FloatWidth::W64) => 8,
            Type::Float(FloatWidth::W128) => 16,
            Type::Bool => 1,
            Type::Char => 4,
            Type::String | Type::Reference(..) => 8,
            Type::Void | Type::Never => 0,
            Type::Tuple(elems) | Type::Struct(_, elems) => {
                elems.iter().map(|e| self.size_of(e)).sum()
            },
            Type::Array(elem, len) => self.size_of(elem) * *len as u64,
            Type::Slice(_) => 16, // {ptr, len}
            Type::Fn(..) => 8,
            Type::Enum(_, variants) => {
                4 + variants.iter().map(|v| self.size_of(v)).max().unwrap_or(0)
            },
            Type::Option(inner) => 4 + self.size_of(inner),
            Type::Result(ok, err) => 4 + self.size_of(ok).max(self.size_of(err)),
            Type::Generic(..) | Type::Unknown => 0,
        }
    }

    /// Natural alignment in bytes.
    pub fn alignment_of(&self, ty: &Type) -> u64 {
        match ty {
            Type::Int(width, _) => Self::int_width_bytes(*width),
            Type::Float(FloatWidth::W32) => 4,
            Type::Float(FloatWidth::W64) => 8,
            Type::Float(FloatWidth::W128) => 16,
            Type::Bool => 1,
            Type::Char => 4,
            Type::String | Type::Reference(..) | Type::Fn(..) => 8,
            Type::Void | Type::Never => 1,
            Type::Tuple(elems) | Type::Struct(_, elems) => {
                elems.iter().map(|e| self.alignment_of(e)).max().unwrap_or(1)
            },
            Type::Array(elem, _) => self.alignment_of(elem),
            Type::Slice(_) => 8,
            Type::Enum(_, variants) => variants.iter().map(|v| self.alignment_of(v)).max().unwrap_or(4).max(4),
            Type::Option(inner) => self.alignment_of(inner).max(4),
            Type::Result(ok, err) => self.alignment_of(ok).max(self.alignment_of(err)).max(4),
            Type::Generic(..) | Type::Unknown => 1,
        }
    }

    fn int_width_bytes(width: IntWidth) -> u64 {
        match width {
            IntWidth::W8 => 1,
            IntWidth::W16 => 2,
            IntWidth::W32 => 4,
            IntWidth::W64 => 8,
            IntWidth::W128 => 16,
            IntWidth::Ptr => 8,
        }
    }
}
