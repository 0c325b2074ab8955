#![forbid(unsafe_code)]

//! Umbrella crate re-exporting the instruction-selection stack: the source
//! IR ([`ssa`]), the target IR ([`ir`]), hardware-generation knowledge
//! ([`hw`]), and the selection pass itself ([`isel`]).

pub use prism_hw as hw;
pub use prism_ir as ir;
pub use prism_isel as isel;
pub use prism_ssa as ssa;
