use bitflags::bitflags;

use crate::op::Op;
use crate::operand::{Definition, Operand};

bitflags! {
    /// Storage classes a memory operation may touch, for ordering purposes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StorageSet: u8 {
        const BUFFER = 1 << 0;
        const SHARED = 1 << 1;
        const GLOBAL = 1 << 2;
        const SCRATCH = 1 << 3;
        const IMAGE = 1 << 4;
    }
}

/// How far a memory operation's ordering obligations reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemScope {
    #[default]
    Wave,
    Workgroup,
    Device,
}

/// Memory-ordering tag carried on memory and barrier instructions; consumed
/// by the downstream scheduler, never interpreted here beyond printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemSync {
    pub storage: StorageSet,
    pub scope: MemScope,
    pub atomic: bool,
    pub volatile: bool,
}

impl MemSync {
    pub fn plain(storage: StorageSet) -> MemSync {
        MemSync {
            storage,
            ..MemSync::default()
        }
    }

    pub fn atomic(storage: StorageSet, scope: MemScope) -> MemSync {
        MemSync {
            storage,
            scope,
            atomic: true,
            volatile: false,
        }
    }
}

/// Cache-bypass bits on per-lane memory operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachePolicy {
    pub glc: bool,
    pub slc: bool,
    pub dlc: bool,
}

/// Scalar-memory payload. The byte offset rides as the trailing constant
/// operand, so only ordering/cache state lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SmemInfo {
    pub sync: MemSync,
    pub glc: bool,
}

/// Structured-buffer payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufInfo {
    /// Immediate byte offset encoded in the instruction.
    pub offset: u32,
    /// Per-lane byte offset operand is present.
    pub offen: bool,
    /// Per-lane structure index operand is present.
    pub idxen: bool,
    pub cache: CachePolicy,
    pub sync: MemSync,
}

/// Shared-memory payload: dual offsets for the paired `ds_*2_*` forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DsInfo {
    pub offset0: u16,
    pub offset1: u16,
    pub gds: bool,
    pub sync: MemSync,
}

/// Global/scratch payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlatInfo {
    /// Signed immediate byte offset (zero where the generation lacks the
    /// field entirely).
    pub offset: i32,
    pub cache: CachePolicy,
    pub sync: MemSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageDim {
    Dim1D,
    Dim2D,
    Dim3D,
    Cube,
    Dim1DArray,
    Dim2DArray,
}

/// Image-operation payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MimgInfo {
    /// Component-enable mask of the destination/data value.
    pub dmask: u8,
    pub dim: ImageDim,
    /// Coordinates are unnormalized integers.
    pub unrm: bool,
    pub cache: CachePolicy,
    pub sync: MemSync,
}

/// Arithmetic carried by a pseudo-reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    IAdd,
    IMul,
    IMin,
    IMax,
    UMin,
    UMax,
    And,
    Or,
    Xor,
    FAdd,
    FMul,
    FMin,
    FMax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceKind {
    Reduce,
    InclusiveScan,
    ExclusiveScan,
}

/// Explicit wavefront barrier payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Barrier {
    pub sync: MemSync,
    pub scope: MemScope,
}

/// Opcode-family-specific payload attached to an [`Instruction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstrExtra {
    #[default]
    None,
    Smem(SmemInfo),
    Buf(BufInfo),
    Ds(DsInfo),
    Flat(FlatInfo),
    Mimg(MimgInfo),
    /// Taken-branch target block index; the fallthrough successor is the
    /// other entry in the block's linear successor list.
    Branch {
        target: u32,
    },
    Reduce {
        op: ReduceOp,
        kind: ReduceKind,
        cluster_size: u32,
    },
    Barrier(Barrier),
}

/// One target-IR instruction. Owned exclusively by its containing block.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub op: Op,
    pub operands: Vec<Operand>,
    pub defs: Vec<Definition>,
    pub extra: InstrExtra,
}

impl Instruction {
    pub fn new(op: Op, operands: Vec<Operand>, defs: Vec<Definition>) -> Instruction {
        Instruction {
            op,
            operands,
            defs,
            extra: InstrExtra::None,
        }
    }

    pub fn with_extra(
        op: Op,
        operands: Vec<Operand>,
        defs: Vec<Definition>,
        extra: InstrExtra,
    ) -> Instruction {
        Instruction {
            op,
            operands,
            defs,
            extra,
        }
    }

    pub fn branch_target(&self) -> Option<u32> {
        match self.extra {
            InstrExtra::Branch { target } => Some(target),
            _ => None,
        }
    }

    /// First definition's temp, for the common single-def case.
    pub fn def_temp(&self) -> Option<crate::Temp> {
        self.defs.first().map(|d| d.temp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Operand, RegClass};

    #[test]
    fn branch_payload_roundtrip() {
        let i = Instruction::with_extra(
            Op::PBranch,
            vec![],
            vec![],
            InstrExtra::Branch { target: 7 },
        );
        assert_eq!(i.branch_target(), Some(7));
        assert_eq!(
            Instruction::new(Op::VMovB32, vec![Operand::undef(RegClass::V1)], vec![])
                .branch_target(),
            None
        );
    }
}
