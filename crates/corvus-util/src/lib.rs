//! corvus-util - Core Utilities and Foundation Types
//!
//! Foundation types shared by every phase of the compiler: interned
//! [`Symbol`]s, typed-index collections ([`IndexVec`]/[`Idx`]), source
//! [`Span`]s backed by a [`span::SourceMap`], the [`diagnostic::Handler`]
//! machinery used to report errors, and [`def_id::DefId`] allocation.
//!
//! Each concern lives in its own submodule; this crate root only wires
//! them together and re-exports the types call sites reach for most.

pub mod def_id;
pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use def_id::{DefId, DefIdGenerator};
pub use diagnostic::{Diagnostic, DiagnosticBuilder, DiagnosticCode, Handler, Level, SourceSnippet};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, SourceFile, SourceMap, Span};
pub use symbol::Symbol;

pub use rustc_hash::{FxHashMap, FxHashSet};
