//! HIR to IR lowering (spec §4.6). The resolver/monomorphizer have already
//! resolved every name to a [`corvus_util::DefId`] and every type to a
//! concrete `corvus_sem::Type`; lowering's only job is to turn structured
//! control flow into basic blocks and every intermediate result into an
//! SSA value.

mod hir_to_ir;

pub use hir_to_ir::{lower_module, lower_type, LowerError};
