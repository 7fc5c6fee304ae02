//! corvus-sem - Name resolution, type checking, and ownership checking.
//!
//! Pipeline position: takes the AST from `corvus_par`, produces a typed
//! [`hir`] tree plus the generic-instantiation set `corvus-mono` needs to
//! monomorphize. Three concerns are interleaved in a single walk rather
//! than run as separate passes:
//!
//! - name resolution (`scope`): every identifier becomes a `DefId`.
//! - type checking (`types`): every expression's type is derived
//!   structurally from its subexpressions, no unification variables.
//! - ownership checking (`ownership`): a flow-sensitive move/borrow state
//!   machine walked alongside type checking, since both need the same
//!   control-flow structure (branches, loops).
//!
//! [`resolver::Resolver`] is the entry point; it owns all three and
//! returns a [`resolver::ResolveOutput`].

pub mod hir;
pub mod ownership;
pub mod resolver;
pub mod scope;
pub mod types;

#[cfg(test)]
mod edge_cases;

pub use ownership::{OwnershipState, OwnershipTracker};
pub use resolver::{ResolveOutput, Resolver};
pub use scope::{RibKind, ScopeTree};
pub use types::Type;
