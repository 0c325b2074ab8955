#![forbid(unsafe_code)]

//! Structured SSA source IR consumed by instruction selection.
//!
//! This is the contract with the upstream front end: a function body made of
//! nested regions (straight-line instructions, `if` items with merge phis,
//! `loop` items with header phis, `break`/`continue` items), where every
//! value already carries its thread-divergence bit and, for integers, an
//! optional conservative unsigned upper bound. The analyses that produce
//! those annotations are not part of this crate; their results are trusted.

mod builder;
mod function;
mod inst;
mod types;

pub use builder::{BuildError, FunctionBuilder};
pub use function::{Function, IfCf, IfPhi, Item, LoopCf, LoopPhi, Param, Region};
pub use inst::{
    AtomicOp, BinOp, CmpOp, Convert, CrossLaneOp, ImageDim, Inst, MemSpace, ReduceOp, SampleMode,
    TernOp, UnOp,
};
pub use types::{ValueId, ValueInfo, ValueType};
