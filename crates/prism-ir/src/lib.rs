#![forbid(unsafe_code)]

//! Wavefront-oriented target IR produced by instruction selection.
//!
//! The model is deliberately flat: a [`Program`] owns a vector of [`Block`]s,
//! blocks own their [`Instruction`]s, and everything else ([`Temp`],
//! [`Operand`], block indices in edge lists) is a plain copyable value. The
//! two edge sets per block, *logical* (structured value flow) and *linear*
//! (the literal predicated branch graph), are index references into the
//! owning program, never pointers, because loops make the graph cyclic.

mod block;
mod instr;
mod op;
mod operand;
mod print;
mod program;
mod regclass;
mod validate;

pub use block::{add_linear_edge, add_logical_edge, Block, BlockKind};
pub use instr::{
    Barrier, BufInfo, CachePolicy, DsInfo, FlatInfo, ImageDim, InstrExtra, Instruction, MemScope,
    MemSync, MimgInfo, ReduceKind, ReduceOp, SmemInfo, StorageSet,
};
pub use op::{Format, Op};
pub use operand::{DefFlags, Definition, Operand, OperandFlags, PhysReg};
pub use print::print_program;
pub use program::Program;
pub use regclass::{RegClass, RegKind, Temp};
pub use validate::{validate, ValidateError};
