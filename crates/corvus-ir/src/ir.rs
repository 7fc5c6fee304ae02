//! The SSA intermediate representation (spec §3, §6).
//!
//! Distinct from `corvus_sem::Type`: `IRType` is the representation the
//! lowerer, verifier, and optimizer actually operate on, with explicit
//! widths and no generics (monomorphization has already removed them by
//! the time anything reaches this crate). [`lower_type`] is the one-way
//! bridge from the semantic lattice.

use corvus_util::{Idx, IndexVec};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IRType {
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    I128,
    U8,
    U16,
    U32,
    U64,
    U128,
    F32,
    F64,
    F128,
    Never,
    Pointer(Box<IRType>),
    Array(Box<IRType>, usize),
    Struct(String, Vec<IRType>),
    Tuple(Vec<IRType>),
    Slice(Box<IRType>),
    Function(Vec<IRType>, Box<IRType>),
    Enum(String),
}

impl IRType {
    pub fn ptr(pointee: IRType) -> IRType {
        IRType::Pointer(Box::new(pointee))
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            IRType::I8
                | IRType::I16
                | IRType::I32
                | IRType::I64
                | IRType::I128
                | IRType::U8
                | IRType::U16
                | IRType::U32
                | IRType::U64
                | IRType::U128
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, IRType::F32 | IRType::F64 | IRType::F128)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, IRType::I8 | IRType::I16 | IRType::I32 | IRType::I64 | IRType::I128)
    }

    /// Bit width of an integer type; used by constant folding's wraparound
    /// arithmetic (spec §8 boundary behaviors).
    pub fn int_width(&self) -> Option<u32> {
        match self {
            IRType::I8 | IRType::U8 => Some(8),
            IRType::I16 | IRType::U16 => Some(16),
            IRType::I32 | IRType::U32 => Some(32),
            IRType::I64 | IRType::U64 => Some(64),
            IRType::I128 | IRType::U128 => Some(128),
            _ => None,
        }
    }
}

impl fmt::Display for IRType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IRType::Void => write!(f, "void"),
            IRType::Bool => write!(f, "bool"),
            IRType::I8 => write!(f, "i8"),
            IRType::I16 => write!(f, "i16"),
            IRType::I32 => write!(f, "i32"),
            IRType::I64 => write!(f, "i64"),
            IRType::I128 => write!(f, "i128"),
            IRType::U8 => write!(f, "u8"),
            IRType::U16 => write!(f, "u16"),
            IRType::U32 => write!(f, "u32"),
            IRType::U64 => write!(f, "u64"),
            IRType::U128 => write!(f, "u128"),
            IRType::F32 => write!(f, "f32"),
            IRType::F64 => write!(f, "f64"),
            IRType::F128 => write!(f, "f128"),
            IRType::Never => write!(f, "never"),
            IRType::Pointer(p) => write!(f, "&{}", p),
            IRType::Array(t, n) => write!(f, "[{}; {}]", t, n),
            IRType::Struct(name, _) => write!(f, "{}", name),
            IRType::Enum(name) => write!(f, "{}", name),
            IRType::Slice(t) => write!(f, "&[{}]", t),
            IRType::Function(params, ret) => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            IRType::Tuple(ts) => {
                write!(f, "(")?;
                for (i, t) in ts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub u32);

impl Idx for ValueId {
    fn from_usize(idx: usize) -> Self {
        ValueId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
    String(String),
}

/// An SSA value: either the result of an instruction, a function
/// parameter, or a constant (spec §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    pub id: ValueId,
    pub ty: IRType,
    pub name: String,
    pub is_constant: bool,
    pub constant: Option<ConstantValue>,
}

impl Value {
    pub fn constant(id: ValueId, ty: IRType, value: ConstantValue) -> Self {
        let name = match &value {
            ConstantValue::Int(n) => n.to_string(),
            ConstantValue::UInt(n) => n.to_string(),
            ConstantValue::Float(n) => n.to_string(),
            ConstantValue::Bool(b) => b.to_string(),
            ConstantValue::String(s) => format!("\"{}\"", s),
        };
        Value { id, ty, name, is_constant: true, constant: Some(value) }
    }

    pub fn display_name(&self) -> String {
        if self.is_constant {
            self.name.clone()
        } else {
            format!("%{}", self.name)
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match &self.constant {
            Some(ConstantValue::Int(n)) => Some(*n),
            Some(ConstantValue::UInt(n)) => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match &self.constant {
            Some(ConstantValue::Float(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match &self.constant {
            Some(ConstantValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    BitNot,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical
    LogicAnd,
    LogicOr,
    LogicNot,
    // Memory
    Alloca,
    Load,
    Store,
    GetElementPtr,
    GetField,
    // Casts
    IntCast,
    FloatCast,
    IntToFloat,
    FloatToInt,
    Bitcast,
    // Control flow
    Br,
    CondBr,
    Switch,
    Ret,
    Unreachable,
    // Calls
    Call,
    CallIndirect,
    // SSA
    Phi,
    // Aggregates
    InsertValue,
    ExtractValue,
    ArrayInit,
    StructInit,
}

impl Opcode {
    /// Instructions whose removal would change observable behavior (spec
    /// §4.9): DCE must never delete these even when their result is unused.
    pub fn has_side_effects(self) -> bool {
        matches!(
            self,
            Opcode::Store
                | Opcode::Call
                | Opcode::CallIndirect
                | Opcode::Br
                | Opcode::CondBr
                | Opcode::Switch
                | Opcode::Ret
                | Opcode::Unreachable
        )
    }

    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            Opcode::Br | Opcode::CondBr | Opcode::Switch | Opcode::Ret | Opcode::Unreachable
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Opcode::Add => "add",
            Opcode::Sub => "sub",
            Opcode::Mul => "mul",
            Opcode::Div => "div",
            Opcode::Mod => "mod",
            Opcode::Neg => "neg",
            Opcode::BitAnd => "and",
            Opcode::BitOr => "or",
            Opcode::BitXor => "xor",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
            Opcode::BitNot => "not",
            Opcode::Eq => "eq",
            Opcode::Ne => "ne",
            Opcode::Lt => "lt",
            Opcode::Le => "le",
            Opcode::Gt => "gt",
            Opcode::Ge => "ge",
            Opcode::LogicAnd => "logic_and",
            Opcode::LogicOr => "logic_or",
            Opcode::LogicNot => "logic_not",
            Opcode::Alloca => "alloca",
            Opcode::Load => "load",
            Opcode::Store => "store",
            Opcode::GetElementPtr => "getelementptr",
            Opcode::GetField => "getfield",
            Opcode::IntCast => "intcast",
            Opcode::FloatCast => "floatcast",
            Opcode::IntToFloat => "int2float",
            Opcode::FloatToInt => "float2int",
            Opcode::Bitcast => "bitcast",
            Opcode::Br => "br",
            Opcode::CondBr => "condbr",
            Opcode::Switch => "switch",
            Opcode::Ret => "ret",
            Opcode::Unreachable => "unreachable",
            Opcode::Call => "call",
            Opcode::CallIndirect => "call_indirect",
            Opcode::Phi => "phi",
            Opcode::InsertValue => "insertvalue",
            Opcode::ExtractValue => "extractvalue",
            Opcode::ArrayInit => "arrayinit",
            Opcode::StructInit => "structinit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

impl Idx for BlockId {
    fn from_usize(idx: usize) -> Self {
        BlockId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub result: Option<Value>,
    pub operands: Vec<Value>,
    pub ty: IRType,
    pub callee_name: Option<String>,
    pub field_index: Option<u32>,
    pub true_block: Option<BlockId>,
    pub false_block: Option<BlockId>,
    pub switch_targets: Vec<(i64, BlockId)>,
    pub switch_otherwise: Option<BlockId>,
    pub phi_incoming: Vec<(Value, BlockId)>,
    pub line: u32,
    pub column: u32,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Instruction {
            opcode,
            result: None,
            operands: Vec::new(),
            ty: IRType::Void,
            callee_name: None,
            field_index: None,
            true_block: None,
            false_block: None,
            switch_targets: Vec::new(),
            switch_otherwise: None,
            phi_incoming: Vec::new(),
            line: 0,
            column: 0,
        }
    }

    /// Every basic-block-local target this instruction can branch to,
    /// used to rebuild predecessor/successor edges and by DCE's
    /// reachability sweep (spec §4.9).
    pub fn branch_targets(&self) -> Vec<BlockId> {
        let mut targets = Vec::new();
        if let Some(t) = self.true_block {
            targets.push(t);
        }
        if let Some(f) = self.false_block {
            targets.push(f);
        }
        for (_, b) in &self.switch_targets {
            targets.push(*b);
        }
        if let Some(o) = self.switch_otherwise {
            targets.push(o);
        }
        targets
    }
}

#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: BlockId,
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub predecessors: Vec<BlockId>,
    pub successors: Vec<BlockId>,
}

impl BasicBlock {
    pub fn new(id: BlockId, label: String) -> Self {
        BasicBlock { id, label, instructions: Vec::new(), predecessors: Vec::new(), successors: Vec::new() }
    }

    pub fn is_terminated(&self) -> bool {
        self.instructions.last().is_some_and(|i| i.opcode.is_terminator())
    }

    pub fn terminator(&self) -> Option<&Instruction> {
        self.instructions.last().filter(|i| i.opcode.is_terminator())
    }
}

#[derive(Debug, Clone)]
pub struct IRFunction {
    pub name: String,
    pub parameters: Vec<Value>,
    pub return_type: IRType,
    pub blocks: IndexVec<BlockId, BasicBlock>,
    pub entry: BlockId,
}

impl IRFunction {
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id]
    }
}

#[derive(Debug, Clone)]
pub struct StructLayout {
    pub name: String,
    pub fields: Vec<(String, IRType)>,
}

#[derive(Debug, Clone)]
pub struct IRModule {
    pub name: String,
    pub functions: Vec<IRFunction>,
    pub struct_layouts: Vec<StructLayout>,
}

impl IRModule {
    pub fn new(name: impl Into<String>) -> Self {
        IRModule { name: name.into(), functions: Vec::new(), struct_layouts: Vec::new() }
    }

    pub fn find_function(&self, name: &str) -> Option<&IRFunction> {
        self.functions.iter().find(|f| f.name == name)
    }
}
