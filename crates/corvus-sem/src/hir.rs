//! Resolved, typed tree produced by the resolver (spec §3, §4.2).
//!
//! Every expression node carries its computed [`Type`]; every statement is
//! paired with an "always-returns" bit by the resolver (not stored on the
//! node itself — see `Resolver::resolve_stmt`). Shapes mirror
//! `corvus_par::ast` one-for-one so lowering never has to re-derive
//! structure the parser already gave us; the difference is that every name
//! has become a [`DefId`] and every type name has become a [`Type`].

use crate::types::Type;
use corvus_util::{DefId, Idx, Symbol};

/// Identifies a loop label (`'outer: while ...`) for labeled break/continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelId(pub u32);

impl Idx for LabelId {
    fn from_usize(idx: usize) -> Self {
        LabelId(idx as u32)
    }
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
pub enum Item {
    Function(FnItem),
    Struct(StructItem),
    Enum(EnumItem),
    Trait(TraitItem),
    Impl(ImplItem),
}

#[derive(Debug, Clone)]
pub struct FnItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub generics: GenericParams,
    pub params: Vec<Param>,
    pub ret_type: Type,
    pub body: Block,
    pub is_async: bool,
    pub is_public: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GenericParams {
    pub params: Vec<GenericParam>,
    pub where_clause: Vec<WherePredicate>,
}

#[derive(Debug, Clone)]
pub struct GenericParam {
    pub name: Symbol,
    pub bounds: Vec<Symbol>,
}

#[derive(Debug, Clone)]
pub struct WherePredicate {
    pub type_param: Symbol,
    pub bounds: Vec<Symbol>,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub def_id: DefId,
    pub name: Symbol,
    pub ty: Type,
    pub is_mut: bool,
}

#[derive(Debug, Clone)]
pub struct StructItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub generics: GenericParams,
    pub fields: Vec<FieldDef>,
    pub is_public: bool,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: Symbol,
    pub ty: Type,
    pub is_public: bool,
}

#[derive(Debug, Clone)]
pub struct EnumItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub generics: GenericParams,
    pub variants: Vec<VariantDef>,
    pub is_public: bool,
}

#[derive(Debug, Clone)]
pub struct VariantDef {
    pub name: Symbol,
    pub data: VariantData,
}

#[derive(Debug, Clone)]
pub enum VariantData {
    Unit,
    Tuple(Vec<Type>),
    Struct(Vec<FieldDef>),
}

#[derive(Debug, Clone)]
pub struct TraitItem {
    pub def_id: DefId,
    pub name: Symbol,
    pub generics: GenericParams,
    pub methods: Vec<TraitMethod>,
    pub assoc_types: Vec<(Symbol, Option<Type>)>,
}

#[derive(Debug, Clone)]
pub struct TraitMethod {
    pub name: Symbol,
    pub sig: FnSig,
    pub default_body: Option<Block>,
}

#[derive(Debug, Clone)]
pub struct FnSig {
    pub params: Vec<Param>,
    pub ret_type: Type,
}

#[derive(Debug, Clone)]
pub struct ImplItem {
    pub def_id: DefId,
    pub generics: GenericParams,
    pub trait_name: Option<Symbol>,
    pub self_ty: Type,
    pub methods: Vec<FnItem>,
    pub assoc_types: Vec<(Symbol, Type)>,
}

/// Function body: a block whose trailing expression (if any) is the
/// implicit return value, matching `corvus_par::ast::Block`.
#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub trailing: Option<Box<Expr>>,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let {
        pattern: Pattern,
        ty: Type,
        is_mut: bool,
        init: Option<Expr>,
    },
    Expr(Expr),
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_block: Block,
        else_clause: Option<Box<ElseClause>>,
    },
    While {
        cond: Expr,
        body: Block,
        label: Option<LabelId>,
    },
    For {
        pattern: Pattern,
        iter: Expr,
        body: Block,
        label: Option<LabelId>,
    },
    Loop {
        body: Block,
        label: Option<LabelId>,
    },
    Break(Option<Expr>, Option<LabelId>),
    Continue(Option<LabelId>),
}

#[derive(Debug, Clone)]
pub enum ElseClause {
    Block(Block),
    If(Box<Stmt>),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal {
        lit: Literal,
        ty: Type,
    },
    Var {
        def_id: DefId,
        ty: Type,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        ty: Type,
    },
    Unary {
        op: UnOp,
        expr: Box<Expr>,
        ty: Type,
    },
    Call {
        callee: Symbol,
        args: Vec<Expr>,
        ty: Type,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: Symbol,
        args: Vec<Expr>,
        ty: Type,
    },
    Field {
        object: Box<Expr>,
        field: Symbol,
        ty: Type,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        ty: Type,
    },
    Slice {
        object: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        ty: Type,
    },
    Block(Box<Block>),
    If {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Option<Box<Expr>>,
        ty: Type,
    },
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<Arm>,
        ty: Type,
    },
    Assign {
        op: Option<BinOp>,
        place: Box<Expr>,
        value: Box<Expr>,
    },
    Tuple {
        elements: Vec<Expr>,
        ty: Type,
    },
    Array {
        elements: Vec<Expr>,
        ty: Type,
    },
    Range {
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
        inclusive: bool,
        ty: Type,
    },
    Cast {
        expr: Box<Expr>,
        ty: Type,
    },
    StructLiteral {
        name: Symbol,
        fields: Vec<(Symbol, Expr)>,
        ty: Type,
    },
    Move {
        expr: Box<Expr>,
        ty: Type,
    },
    Try {
        expr: Box<Expr>,
        ty: Type,
    },
    Async {
        body: Box<Block>,
        ty: Type,
    },
    Await {
        expr: Box<Expr>,
        ty: Type,
    },
    Spawn {
        expr: Box<Expr>,
        ty: Type,
    },
}

impl Expr {
    pub fn ty(&self) -> Type {
        match self {
            Expr::Literal { ty, .. }
            | Expr::Var { ty, .. }
            | Expr::Binary { ty, .. }
            | Expr::Unary { ty, .. }
            | Expr::Call { ty, .. }
            | Expr::MethodCall { ty, .. }
            | Expr::Field { ty, .. }
            | Expr::Index { ty, .. }
            | Expr::Slice { ty, .. }
            | Expr::If { ty, .. }
            | Expr::Match { ty, .. }
            | Expr::Tuple { ty, .. }
            | Expr::Array { ty, .. }
            | Expr::Range { ty, .. }
            | Expr::Cast { ty, .. }
            | Expr::StructLiteral { ty, .. }
            | Expr::Move { ty, .. }
            | Expr::Try { ty, .. }
            | Expr::Async { ty, .. }
            | Expr::Await { ty, .. }
            | Expr::Spawn { ty, .. } => ty.clone(),
            Expr::Block(b) => b.ty.clone(),
            Expr::Assign { .. } => Type::Void,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(Symbol),
    Char(char),
    Bool(bool),
    Unit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
    BitNot,
    Deref,
    Ref(bool),
}

#[derive(Debug, Clone)]
pub enum Pattern {
    Wildcard,
    Binding {
        def_id: DefId,
        name: Symbol,
        ty: Type,
        is_mut: bool,
    },
    Literal(Literal),
    /// A bare enum-variant or unit-struct path pattern.
    Variant {
        enum_name: Symbol,
        variant: Symbol,
    },
    TupleVariant {
        enum_name: Symbol,
        variant: Symbol,
        elements: Vec<Pattern>,
    },
    StructVariant {
        enum_name: Symbol,
        variant: Option<Symbol>,
        fields: Vec<(Symbol, Pattern)>,
    },
    Tuple(Vec<Pattern>),
    Range(Box<Pattern>, Box<Pattern>, bool),
    Or(Vec<Pattern>),
}

#[derive(Debug, Clone)]
pub struct Arm {
    pub pattern: Pattern,
    pub guard: Option<Expr>,
    pub body: Expr,
}
