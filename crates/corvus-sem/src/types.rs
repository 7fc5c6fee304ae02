//! The semantic `Type` lattice (spec data model, distinct from `corvus_par::ast::Type`,
//! which is still syntactic: a path name the resolver has not yet looked up).
//!
//! Two types are equal iff their tags match and their children are equal
//! structurally — `#[derive(PartialEq)]` gives us that for free since every
//! variant's payload is itself structurally comparable.

use corvus_util::Symbol;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
    W128,
    Ptr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    W32,
    W64,
    W128,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Int(IntWidth, bool), // bool = signed
    Float(FloatWidth),
    Bool,
    Char,
    String,
    Void,
    Never,
    /// Not yet determined; only legal where the resolver defers to a generic
    /// bound in a trait-default body (spec P1).
    Unknown,
    Reference(Box<Type>, bool), // bool = is_mut
    Tuple(Vec<Type>),
    Array(Box<Type>, usize),
    Slice(Box<Type>),
    Fn(Vec<Type>, Box<Type>),
    Struct(Symbol, Vec<Type>),
    Enum(Symbol, Vec<Type>),
    Option(Box<Type>),
    Result(Box<Type>, Box<Type>),
    /// An unresolved generic parameter, carried by name plus its bounds
    /// (trait names) so call-site unification can check them.
    Generic(Symbol, Vec<Symbol>),
}

impl Type {
    pub const I8: Type = Type::Int(IntWidth::W8, true);
    pub const I16: Type = Type::Int(IntWidth::W16, true);
    pub const I32: Type = Type::Int(IntWidth::W32, true);
    pub const I64: Type = Type::Int(IntWidth::W64, true);
    pub const I128: Type = Type::Int(IntWidth::W128, true);
    pub const ISIZE: Type = Type::Int(IntWidth::Ptr, true);
    pub const U8: Type = Type::Int(IntWidth::W8, false);
    pub const U16: Type = Type::Int(IntWidth::W16, false);
    pub const U32: Type = Type::Int(IntWidth::W32, false);
    pub const U64: Type = Type::Int(IntWidth::W64, false);
    pub const U128: Type = Type::Int(IntWidth::W128, false);
    pub const USIZE: Type = Type::Int(IntWidth::Ptr, false);
    pub const F32: Type = Type::Float(FloatWidth::W32);
    pub const F64: Type = Type::Float(FloatWidth::W64);
    pub const F128: Type = Type::Float(FloatWidth::W128);

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int(..) | Type::Float(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::Int(..))
    }

    /// Copy-kind types skip the `Moved` ownership state (spec §3, §4.4).
    pub fn is_copy(&self) -> bool {
        matches!(
            self,
            Type::Int(..)
                | Type::Float(_)
                | Type::Bool
                | Type::Char
                | Type::Reference(..)
                | Type::Void
                | Type::Never
        )
    }

    /// `never` absorbs into any enclosing context (spec §4.2): substitute it
    /// for the type of the other branch wherever the two meet.
    pub fn unify_never(a: Type, b: Type) -> Option<Type> {
        match (&a, &b) {
            (Type::Never, _) => Some(b),
            (_, Type::Never) => Some(a),
            _ if a == b => Some(a),
            _ => None,
        }
    }

    /// Substitute each occurrence of a named generic parameter with a
    /// concrete type. Used both by call-site unification and by the
    /// monomorphizer's cloning pass.
    pub fn substitute(&self, name: Symbol, with: &Type) -> Type {
        match self {
            Type::Generic(n, _) if *n == name => with.clone(),
            Type::Reference(t, m) => Type::Reference(Box::new(t.substitute(name, with)), *m),
            Type::Tuple(ts) => Type::Tuple(ts.iter().map(|t| t.substitute(name, with)).collect()),
            Type::Array(t, n) => Type::Array(Box::new(t.substitute(name, with)), *n),
            Type::Slice(t) => Type::Slice(Box::new(t.substitute(name, with))),
            Type::Fn(ps, r) => Type::Fn(
                ps.iter().map(|t| t.substitute(name, with)).collect(),
                Box::new(r.substitute(name, with)),
            ),
            Type::Struct(n, args) => Type::Struct(
                *n,
                args.iter().map(|t| t.substitute(name, with)).collect(),
            ),
            Type::Enum(n, args) => {
                Type::Enum(*n, args.iter().map(|t| t.substitute(name, with)).collect())
            }
            Type::Option(t) => Type::Option(Box::new(t.substitute(name, with))),
            Type::Result(t, e) => Type::Result(
                Box::new(t.substitute(name, with)),
                Box::new(e.substitute(name, with)),
            ),
            other => other.clone(),
        }
    }

    /// True if `self` still mentions a bare generic parameter anywhere.
    pub fn is_generic(&self) -> bool {
        match self {
            Type::Generic(..) => true,
            Type::Reference(t, _) | Type::Array(t, _) | Type::Slice(t) | Type::Option(t) => {
                t.is_generic()
            }
            Type::Tuple(ts) => ts.iter().any(Type::is_generic),
            Type::Fn(ps, r) => ps.iter().any(Type::is_generic) || r.is_generic(),
            Type::Struct(_, args) | Type::Enum(_, args) => args.iter().any(Type::is_generic),
            Type::Result(t, e) => t.is_generic() || e.is_generic(),
            _ => false,
        }
    }

    /// Mangled encoding used by the monomorphizer's name scheme (spec §4.5).
    pub fn mangle(&self) -> String {
        match self {
            Type::Int(IntWidth::W8, true) => "i8".into(),
            Type::Int(IntWidth::W16, true) => "i16".into(),
            Type::Int(IntWidth::W32, true) => "i32".into(),
            Type::Int(IntWidth::W64, true) => "i64".into(),
            Type::Int(IntWidth::W128, true) => "i128".into(),
            Type::Int(IntWidth::Ptr, true) => "isize".into(),
            Type::Int(IntWidth::W8, false) => "u8".into(),
            Type::Int(IntWidth::W16, false) => "u16".into(),
            Type::Int(IntWidth::W32, false) => "u32".into(),
            Type::Int(IntWidth::W64, false) => "u64".into(),
            Type::Int(IntWidth::W128, false) => "u128".into(),
            Type::Int(IntWidth::Ptr, false) => "usize".into(),
            Type::Float(FloatWidth::W32) => "f32".into(),
            Type::Float(FloatWidth::W64) => "f64".into(),
            Type::Float(FloatWidth::W128) => "f128".into(),
            Type::Bool => "bool".into(),
            Type::Char => "char".into(),
            Type::String => "str".into(),
            Type::Void => "void".into(),
            Type::Never => "never".into(),
            Type::Reference(t, _) => format!("Ref{}", t.mangle()),
            Type::Tuple(ts) => ts.iter().map(Type::mangle).collect::<Vec<_>>().join("_"),
            Type::Array(t, n) => format!("{}_{}", t.mangle(), n),
            Type::Slice(t) => format!("slice_{}", t.mangle()),
            Type::Struct(name, args) | Type::Enum(name, args) => {
                if args.is_empty() {
                    name.as_str().to_string()
                } else {
                    format!(
                        "{}_{}",
                        name.as_str(),
                        args.iter().map(Type::mangle).collect::<Vec<_>>().join("_")
                    )
                }
            }
            Type::Option(t) => format!("Option_{}", t.mangle()),
            Type::Result(t, e) => format!("Result_{}_{}", t.mangle(), e.mangle()),
            Type::Generic(name, _) => name.as_str().to_string(),
            Type::Fn(..) => "fn".into(),
            Type::Unknown => "unknown".into(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Reference(t, true) => write!(f, "&mut {}", t),
            Type::Reference(t, false) => write!(f, "&{}", t),
            Type::Tuple(ts) => {
                write!(f, "(")?;
                for (i, t) in ts.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", t)?;
                }
                write!(f, ")")
            }
            Type::Array(t, n) => write!(f, "[{}; {}]", t, n),
            Type::Slice(t) => write!(f, "[{}]", t),
            Type::Struct(n, args) | Type::Enum(n, args) => {
                write!(f, "{}", n.as_str())?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (i, a) in args.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", a)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            Type::Option(t) => write!(f, "Option<{}>", t),
            Type::Result(t, e) => write!(f, "Result<{}, {}>", t, e),
            Type::Generic(n, _) => write!(f, "{}", n.as_str()),
            Type::Fn(params, ret) => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            _ => write!(f, "{}", self.mangle()),
        }
    }
}
