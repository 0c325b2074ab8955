//! Target opcodes, grouped by encoding format.
//!
//! Selection only ever emits opcodes from this closed set; downstream stages
//! match on it exhaustively. Pseudo-opcodes (`P*`) have no hardware encoding
//! and are expanded after register allocation.

/// Encoding format of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Sop1,
    Sop2,
    Sopk,
    Sopc,
    Sopp,
    Smem,
    Vop1,
    Vop2,
    Vop3,
    Vop3p,
    Vopc,
    Ds,
    Mubuf,
    Global,
    Scratch,
    Mimg,
    Pseudo,
    PseudoBranch,
    PseudoReduction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum Op {
    // ---- SOP2: scalar ALU, two sources ----
    SAddU32,
    SAddcU32,
    SSubU32,
    SSubbU32,
    SAddI32,
    SSubI32,
    SMulI32,
    SMulHiU32,
    SMulHiI32,
    SAndB32,
    SAndB64,
    SOrB32,
    SOrB64,
    SXorB32,
    SXorB64,
    SAndn2B32,
    SAndn2B64,
    SOrn2B64,
    SLshlB32,
    SLshlB64,
    SLshrB32,
    SLshrB64,
    SAshrI32,
    SAshrI64,
    SBfeU32,
    SBfeI32,
    SBfeU64,
    SMinU32,
    SMinI32,
    SMaxU32,
    SMaxI32,
    SCselectB32,
    SCselectB64,
    SAbsdiffI32,

    // ---- SOP1 ----
    SMovB32,
    SMovB64,
    SNotB32,
    SNotB64,
    SWqmB32,
    SWqmB64,
    SBrevB32,
    SBcnt1I32B32,
    SBcnt1I32B64,
    SFf1I32B32,
    SFf1I32B64,
    SFlbitI32B32,
    SSextI32I8,
    SSextI32I16,
    SAndSaveexecB32,
    SAndSaveexecB64,
    SOrSaveexecB32,
    SOrSaveexecB64,

    // ---- SOPK ----
    SMovkI32,

    // ---- SOPC: scalar compares writing scc ----
    SCmpEqU32,
    SCmpLgU32,
    SCmpLtU32,
    SCmpLeU32,
    SCmpGtU32,
    SCmpGeU32,
    SCmpEqI32,
    SCmpLgI32,
    SCmpLtI32,
    SCmpLeI32,
    SCmpGtI32,
    SCmpGeI32,
    SCmpEqU64,
    SCmpLgU64,

    // ---- SOPP ----
    SEndpgm,
    SBarrier,

    // ---- SMEM: scalar memory ----
    SLoadDword,
    SLoadDwordx2,
    SLoadDwordx4,
    SLoadDwordx8,
    SLoadDwordx16,
    SBufferLoadDword,
    SBufferLoadDwordx2,
    SBufferLoadDwordx4,
    SBufferLoadDwordx8,
    SBufferLoadDwordx16,
    SStoreDword,
    SStoreDwordx2,
    SStoreDwordx4,
    SBufferStoreDword,
    SBufferStoreDwordx2,
    SBufferStoreDwordx4,

    // ---- VOP2: vector ALU, two sources ----
    VAddF16,
    VSubF16,
    VMulF16,
    VAddF32,
    VSubF32,
    VSubrevF32,
    VMulF32,
    VMinF32,
    VMaxF32,
    VAddU32,
    VSubU32,
    VSubrevU32,
    VAddCoU32,
    VSubCoU32,
    VSubrevCoU32,
    VAddcCoU32,
    VSubbCoU32,
    VAddU16,
    VSubU16,
    VMulLoU16,
    VAndB32,
    VOrB32,
    VXorB32,
    VLshlrevB32,
    VLshrrevB32,
    VAshrrevI32,
    VLshlrevB16,
    VLshrrevB16,
    VAshrrevI16,
    VMinU32,
    VMaxU32,
    VMinI32,
    VMaxI32,
    VMinU16,
    VMaxU16,
    VMinI16,
    VMaxI16,
    VMulU32U24,
    VMulHiU32U24,
    VMulI32I24,
    VCndmaskB32,

    // ---- VOP1 ----
    VMovB32,
    VNotB32,
    VBfrevB32,
    VRcpF32,
    VRcpF64,
    VRsqF32,
    VSqrtF32,
    VSqrtF64,
    VLogF32,
    VExpF32,
    VSinF32,
    VCosF32,
    VFloorF32,
    VCeilF32,
    VTruncF32,
    VRndneF32,
    VFractF32,
    VFloorF64,
    VCeilF64,
    VTruncF64,
    VRndneF64,
    VFractF64,
    VCvtF32I32,
    VCvtF32U32,
    VCvtI32F32,
    VCvtU32F32,
    VCvtF64F32,
    VCvtF32F64,
    VCvtF64I32,
    VCvtF64U32,
    VCvtI32F64,
    VCvtU32F64,
    VCvtF32F16,
    VCvtF16F32,
    VCvtF32Ubyte0,
    VFfbhU32,
    VFfblB32,
    VReadfirstlaneB32,

    // ---- VOPC: vector compares writing a lane mask ----
    VCmpEqF16,
    VCmpNeqF16,
    VCmpLtF16,
    VCmpLeF16,
    VCmpGtF16,
    VCmpGeF16,
    VCmpEqF32,
    VCmpNeqF32,
    VCmpLtF32,
    VCmpLeF32,
    VCmpGtF32,
    VCmpGeF32,
    VCmpOF32,
    VCmpUF32,
    VCmpEqF64,
    VCmpNeqF64,
    VCmpLtF64,
    VCmpLeF64,
    VCmpGtF64,
    VCmpGeF64,
    VCmpEqI32,
    VCmpNeI32,
    VCmpLtI32,
    VCmpLeI32,
    VCmpGtI32,
    VCmpGeI32,
    VCmpEqU32,
    VCmpNeU32,
    VCmpLtU32,
    VCmpLeU32,
    VCmpGtU32,
    VCmpGeU32,
    VCmpEqI64,
    VCmpNeI64,
    VCmpLtI64,
    VCmpLeI64,
    VCmpGtI64,
    VCmpGeI64,
    VCmpEqU64,
    VCmpNeU64,
    VCmpLtU64,
    VCmpLeU64,
    VCmpGtU64,
    VCmpGeU64,
    VCmpEqU16,
    VCmpNeU16,
    VCmpLtU16,
    VCmpLeU16,
    VCmpGtU16,
    VCmpGeU16,
    VCmpEqI16,
    VCmpNeI16,
    VCmpLtI16,
    VCmpLeI16,
    VCmpGtI16,
    VCmpGeI16,

    // ---- VOP3 ----
    VMadF32,
    VFmaF16,
    VFmaF32,
    VFmaF64,
    VAddF64,
    VMulF64,
    VMinF64,
    VMaxF64,
    VMulLoU32,
    VMulHiU32,
    VMulHiI32,
    VBfeU32,
    VBfeI32,
    VBfiB32,
    VAlignbitB32,
    VAlignbyteB32,
    VLshlAddU32,
    VAdd3U32,
    VMed3F32,
    VMed3I32,
    VMed3U32,
    VPermB32,
    VMbcntLoU32B32,
    VMbcntHiU32B32,
    VBcntU32B32,
    VLshlrevB64,
    VLshrrevB64,
    VAshrrevI64,
    VReadlaneB32,
    VWritelaneB32,

    // ---- VOP3P: packed 16-bit ----
    VPkAddF16,
    VPkMulF16,
    VPkFmaF16,
    VPkAddU16,
    VPkSubU16,
    VPkMulLoU16,

    // ---- DS: shared memory ----
    DsReadU8,
    DsReadI8,
    DsReadU16,
    DsReadI16,
    DsReadB32,
    DsReadB64,
    DsReadB96,
    DsReadB128,
    DsRead2B32,
    DsRead2B64,
    DsWriteB8,
    DsWriteB16,
    DsWriteB32,
    DsWriteB64,
    DsWriteB96,
    DsWriteB128,
    DsWrite2B32,
    DsWrite2B64,
    DsAddU32,
    DsSubU32,
    DsMinI32,
    DsMaxI32,
    DsMinU32,
    DsMaxU32,
    DsAndB32,
    DsOrB32,
    DsXorB32,
    DsWrxchgRtnB32,
    DsCmpstRtnB32,
    DsAddU64,
    DsCmpstRtnB64,
    DsSwizzleB32,
    DsPermuteB32,
    DsBpermuteB32,

    // ---- MUBUF: per-lane structured-buffer memory ----
    BufferLoadUbyte,
    BufferLoadSbyte,
    BufferLoadUshort,
    BufferLoadSshort,
    BufferLoadDword,
    BufferLoadDwordx2,
    BufferLoadDwordx3,
    BufferLoadDwordx4,
    BufferStoreByte,
    BufferStoreShort,
    BufferStoreDword,
    BufferStoreDwordx2,
    BufferStoreDwordx3,
    BufferStoreDwordx4,
    BufferAtomicSwap,
    BufferAtomicCmpswap,
    BufferAtomicAdd,
    BufferAtomicSub,
    BufferAtomicSmin,
    BufferAtomicUmin,
    BufferAtomicSmax,
    BufferAtomicUmax,
    BufferAtomicAnd,
    BufferAtomicOr,
    BufferAtomicXor,
    BufferAtomicSwapX2,
    BufferAtomicCmpswapX2,
    BufferAtomicAddX2,

    // ---- GLOBAL: raw global memory ----
    GlobalLoadUbyte,
    GlobalLoadSbyte,
    GlobalLoadUshort,
    GlobalLoadSshort,
    GlobalLoadDword,
    GlobalLoadDwordx2,
    GlobalLoadDwordx3,
    GlobalLoadDwordx4,
    GlobalStoreByte,
    GlobalStoreShort,
    GlobalStoreDword,
    GlobalStoreDwordx2,
    GlobalStoreDwordx3,
    GlobalStoreDwordx4,
    GlobalAtomicSwap,
    GlobalAtomicCmpswap,
    GlobalAtomicAdd,
    GlobalAtomicSub,
    GlobalAtomicSmin,
    GlobalAtomicUmin,
    GlobalAtomicSmax,
    GlobalAtomicUmax,
    GlobalAtomicAnd,
    GlobalAtomicOr,
    GlobalAtomicXor,
    GlobalAtomicSwapX2,
    GlobalAtomicCmpswapX2,
    GlobalAtomicAddX2,

    // ---- SCRATCH: per-lane stack memory ----
    ScratchLoadUbyte,
    ScratchLoadSbyte,
    ScratchLoadUshort,
    ScratchLoadSshort,
    ScratchLoadDword,
    ScratchLoadDwordx2,
    ScratchLoadDwordx3,
    ScratchLoadDwordx4,
    ScratchStoreByte,
    ScratchStoreShort,
    ScratchStoreDword,
    ScratchStoreDwordx2,
    ScratchStoreDwordx3,
    ScratchStoreDwordx4,

    // ---- MIMG: image operations ----
    ImageSample,
    ImageSampleL,
    ImageSampleB,
    ImageSampleD,
    ImageSampleC,
    ImageSampleCL,
    ImageLoad,
    ImageLoadMip,
    ImageStore,
    ImageStoreMip,
    ImageAtomicSwap,
    ImageAtomicCmpswap,
    ImageAtomicAdd,
    ImageAtomicSub,
    ImageAtomicSmin,
    ImageAtomicUmin,
    ImageAtomicSmax,
    ImageAtomicUmax,
    ImageAtomicAnd,
    ImageAtomicOr,
    ImageAtomicXor,

    // ---- Pseudo ----
    PParallelcopy,
    PStartpgm,
    PPhi,
    PLinearPhi,
    PAsUniform,
    PCreateVector,
    PExtractVector,
    PSplitVector,
    PLogicalStart,
    PLogicalEnd,
    PDiscardIf,
    PExitEarlyIf,

    // ---- Pseudo branches ----
    PBranch,
    PCbranch,
    PCbranchZ,
    PCbranchNz,

    // ---- Pseudo reductions (expanded post-RA) ----
    PReduce,
    PInclusiveScan,
    PExclusiveScan,
}

impl Op {
    pub fn format(self) -> Format {
        use Op::*;
        match self {
            SAddU32 | SAddcU32 | SSubU32 | SSubbU32 | SAddI32 | SSubI32 | SMulI32 | SMulHiU32
            | SMulHiI32 | SAndB32 | SAndB64 | SOrB32 | SOrB64 | SXorB32 | SXorB64 | SAndn2B32
            | SAndn2B64 | SOrn2B64 | SLshlB32 | SLshlB64 | SLshrB32 | SLshrB64 | SAshrI32
            | SAshrI64 | SBfeU32 | SBfeI32 | SBfeU64 | SMinU32 | SMinI32 | SMaxU32 | SMaxI32
            | SCselectB32 | SCselectB64 | SAbsdiffI32 => Format::Sop2,

            SMovB32 | SMovB64 | SNotB32 | SNotB64 | SWqmB32 | SWqmB64 | SBrevB32 | SBcnt1I32B32
            | SBcnt1I32B64 | SFf1I32B32 | SFf1I32B64 | SFlbitI32B32 | SSextI32I8 | SSextI32I16
            | SAndSaveexecB32 | SAndSaveexecB64 | SOrSaveexecB32 | SOrSaveexecB64 => Format::Sop1,

            SMovkI32 => Format::Sopk,

            SCmpEqU32 | SCmpLgU32 | SCmpLtU32 | SCmpLeU32 | SCmpGtU32 | SCmpGeU32 | SCmpEqI32
            | SCmpLgI32 | SCmpLtI32 | SCmpLeI32 | SCmpGtI32 | SCmpGeI32 | SCmpEqU64
            | SCmpLgU64 => Format::Sopc,

            SEndpgm | SBarrier => Format::Sopp,

            SLoadDword | SLoadDwordx2 | SLoadDwordx4 | SLoadDwordx8 | SLoadDwordx16
            | SBufferLoadDword | SBufferLoadDwordx2 | SBufferLoadDwordx4 | SBufferLoadDwordx8
            | SBufferLoadDwordx16 | SStoreDword | SStoreDwordx2 | SStoreDwordx4
            | SBufferStoreDword | SBufferStoreDwordx2 | SBufferStoreDwordx4 => Format::Smem,

            VAddF16 | VSubF16 | VMulF16 | VAddF32 | VSubF32 | VSubrevF32 | VMulF32 | VMinF32
            | VMaxF32 | VAddU32 | VSubU32 | VSubrevU32 | VAddCoU32 | VSubCoU32 | VSubrevCoU32
            | VAddcCoU32 | VSubbCoU32 | VAddU16 | VSubU16 | VMulLoU16 | VAndB32 | VOrB32
            | VXorB32 | VLshlrevB32 | VLshrrevB32 | VAshrrevI32 | VLshlrevB16 | VLshrrevB16
            | VAshrrevI16 | VMinU32 | VMaxU32 | VMinI32 | VMaxI32 | VMinU16 | VMaxU16 | VMinI16
            | VMaxI16 | VMulU32U24 | VMulHiU32U24 | VMulI32I24 | VCndmaskB32 => Format::Vop2,

            VMovB32 | VNotB32 | VBfrevB32 | VRcpF32 | VRcpF64 | VRsqF32 | VSqrtF32 | VSqrtF64
            | VLogF32 | VExpF32 | VSinF32 | VCosF32 | VFloorF32 | VCeilF32 | VTruncF32
            | VRndneF32 | VFractF32 | VFloorF64 | VCeilF64 | VTruncF64 | VRndneF64 | VFractF64
            | VCvtF32I32 | VCvtF32U32 | VCvtI32F32 | VCvtU32F32 | VCvtF64F32 | VCvtF32F64
            | VCvtF64I32 | VCvtF64U32 | VCvtI32F64 | VCvtU32F64 | VCvtF32F16 | VCvtF16F32
            | VCvtF32Ubyte0 | VFfbhU32 | VFfblB32 | VReadfirstlaneB32 => Format::Vop1,

            VCmpEqF16 | VCmpNeqF16 | VCmpLtF16 | VCmpLeF16 | VCmpGtF16 | VCmpGeF16 | VCmpEqF32
            | VCmpNeqF32 | VCmpLtF32 | VCmpLeF32 | VCmpGtF32 | VCmpGeF32 | VCmpOF32 | VCmpUF32
            | VCmpEqF64 | VCmpNeqF64 | VCmpLtF64 | VCmpLeF64 | VCmpGtF64 | VCmpGeF64
            | VCmpEqI32 | VCmpNeI32 | VCmpLtI32 | VCmpLeI32 | VCmpGtI32 | VCmpGeI32 | VCmpEqU32
            | VCmpNeU32 | VCmpLtU32 | VCmpLeU32 | VCmpGtU32 | VCmpGeU32 | VCmpEqI64 | VCmpNeI64
            | VCmpLtI64 | VCmpLeI64 | VCmpGtI64 | VCmpGeI64 | VCmpEqU64 | VCmpNeU64 | VCmpLtU64
            | VCmpLeU64 | VCmpGtU64 | VCmpGeU64 | VCmpEqU16 | VCmpNeU16 | VCmpLtU16 | VCmpLeU16
            | VCmpGtU16 | VCmpGeU16 | VCmpEqI16 | VCmpNeI16 | VCmpLtI16 | VCmpLeI16 | VCmpGtI16
            | VCmpGeI16 => Format::Vopc,

            VMadF32 | VFmaF16 | VFmaF32 | VFmaF64 | VAddF64 | VMulF64 | VMinF64 | VMaxF64
            | VMulLoU32 | VMulHiU32 | VMulHiI32 | VBfeU32 | VBfeI32 | VBfiB32 | VAlignbitB32
            | VAlignbyteB32 | VLshlAddU32 | VAdd3U32 | VMed3F32 | VMed3I32 | VMed3U32
            | VPermB32 | VMbcntLoU32B32 | VMbcntHiU32B32 | VBcntU32B32 | VLshlrevB64 | VLshrrevB64
            | VAshrrevI64 | VReadlaneB32 | VWritelaneB32 => Format::Vop3,

            VPkAddF16 | VPkMulF16 | VPkFmaF16 | VPkAddU16 | VPkSubU16 | VPkMulLoU16 => {
                Format::Vop3p
            }

            DsReadU8 | DsReadI8 | DsReadU16 | DsReadI16 | DsReadB32 | DsReadB64 | DsReadB96
            | DsReadB128 | DsRead2B32 | DsRead2B64 | DsWriteB8 | DsWriteB16 | DsWriteB32
            | DsWriteB64 | DsWriteB96 | DsWriteB128 | DsWrite2B32 | DsWrite2B64 | DsAddU32
            | DsSubU32 | DsMinI32 | DsMaxI32 | DsMinU32 | DsMaxU32 | DsAndB32 | DsOrB32
            | DsXorB32 | DsWrxchgRtnB32 | DsCmpstRtnB32 | DsAddU64 | DsCmpstRtnB64
            | DsSwizzleB32 | DsPermuteB32 | DsBpermuteB32 => Format::Ds,

            BufferLoadUbyte | BufferLoadSbyte | BufferLoadUshort | BufferLoadSshort
            | BufferLoadDword | BufferLoadDwordx2 | BufferLoadDwordx3 | BufferLoadDwordx4
            | BufferStoreByte | BufferStoreShort | BufferStoreDword | BufferStoreDwordx2
            | BufferStoreDwordx3 | BufferStoreDwordx4 | BufferAtomicSwap | BufferAtomicCmpswap
            | BufferAtomicAdd | BufferAtomicSub | BufferAtomicSmin | BufferAtomicUmin
            | BufferAtomicSmax | BufferAtomicUmax | BufferAtomicAnd | BufferAtomicOr
            | BufferAtomicXor | BufferAtomicSwapX2 | BufferAtomicCmpswapX2 | BufferAtomicAddX2 => {
                Format::Mubuf
            }

            GlobalLoadUbyte | GlobalLoadSbyte | GlobalLoadUshort | GlobalLoadSshort
            | GlobalLoadDword | GlobalLoadDwordx2 | GlobalLoadDwordx3 | GlobalLoadDwordx4
            | GlobalStoreByte | GlobalStoreShort | GlobalStoreDword | GlobalStoreDwordx2
            | GlobalStoreDwordx3 | GlobalStoreDwordx4 | GlobalAtomicSwap | GlobalAtomicCmpswap
            | GlobalAtomicAdd | GlobalAtomicSub | GlobalAtomicSmin | GlobalAtomicUmin
            | GlobalAtomicSmax | GlobalAtomicUmax | GlobalAtomicAnd | GlobalAtomicOr
            | GlobalAtomicXor | GlobalAtomicSwapX2 | GlobalAtomicCmpswapX2 | GlobalAtomicAddX2 => {
                Format::Global
            }

            ScratchLoadUbyte | ScratchLoadSbyte | ScratchLoadUshort | ScratchLoadSshort
            | ScratchLoadDword | ScratchLoadDwordx2 | ScratchLoadDwordx3 | ScratchLoadDwordx4
            | ScratchStoreByte | ScratchStoreShort | ScratchStoreDword | ScratchStoreDwordx2
            | ScratchStoreDwordx3 | ScratchStoreDwordx4 => Format::Scratch,

            ImageSample | ImageSampleL | ImageSampleB | ImageSampleD | ImageSampleC
            | ImageSampleCL | ImageLoad | ImageLoadMip | ImageStore | ImageStoreMip
            | ImageAtomicSwap | ImageAtomicCmpswap | ImageAtomicAdd | ImageAtomicSub
            | ImageAtomicSmin | ImageAtomicUmin | ImageAtomicSmax | ImageAtomicUmax
            | ImageAtomicAnd | ImageAtomicOr | ImageAtomicXor => Format::Mimg,

            PParallelcopy | PStartpgm | PPhi | PLinearPhi | PAsUniform | PCreateVector
            | PExtractVector | PSplitVector | PLogicalStart | PLogicalEnd | PDiscardIf
            | PExitEarlyIf => Format::Pseudo,

            PBranch | PCbranch | PCbranchZ | PCbranchNz => Format::PseudoBranch,

            PReduce | PInclusiveScan | PExclusiveScan => Format::PseudoReduction,
        }
    }

    pub fn is_phi(self) -> bool {
        matches!(self, Op::PPhi | Op::PLinearPhi)
    }

    pub fn is_branch(self) -> bool {
        self.format() == Format::PseudoBranch
    }

    /// Whether this opcode touches memory (used for sync/ordering payloads).
    pub fn is_memory(self) -> bool {
        matches!(
            self.format(),
            Format::Smem | Format::Ds | Format::Mubuf | Format::Global | Format::Scratch
                | Format::Mimg
        )
    }

    /// Assembly-style mnemonic, used by the IR printer.
    pub fn name(self) -> &'static str {
        use Op::*;
        match self {
            SAddU32 => "s_add_u32",
            SAddcU32 => "s_addc_u32",
            SSubU32 => "s_sub_u32",
            SSubbU32 => "s_subb_u32",
            SAddI32 => "s_add_i32",
            SSubI32 => "s_sub_i32",
            SMulI32 => "s_mul_i32",
            SMulHiU32 => "s_mul_hi_u32",
            SMulHiI32 => "s_mul_hi_i32",
            SAndB32 => "s_and_b32",
            SAndB64 => "s_and_b64",
            SOrB32 => "s_or_b32",
            SOrB64 => "s_or_b64",
            SXorB32 => "s_xor_b32",
            SXorB64 => "s_xor_b64",
            SAndn2B32 => "s_andn2_b32",
            SAndn2B64 => "s_andn2_b64",
            SOrn2B64 => "s_orn2_b64",
            SLshlB32 => "s_lshl_b32",
            SLshlB64 => "s_lshl_b64",
            SLshrB32 => "s_lshr_b32",
            SLshrB64 => "s_lshr_b64",
            SAshrI32 => "s_ashr_i32",
            SAshrI64 => "s_ashr_i64",
            SBfeU32 => "s_bfe_u32",
            SBfeI32 => "s_bfe_i32",
            SBfeU64 => "s_bfe_u64",
            SMinU32 => "s_min_u32",
            SMinI32 => "s_min_i32",
            SMaxU32 => "s_max_u32",
            SMaxI32 => "s_max_i32",
            SCselectB32 => "s_cselect_b32",
            SCselectB64 => "s_cselect_b64",
            SAbsdiffI32 => "s_absdiff_i32",
            SMovB32 => "s_mov_b32",
            SMovB64 => "s_mov_b64",
            SNotB32 => "s_not_b32",
            SNotB64 => "s_not_b64",
            SWqmB32 => "s_wqm_b32",
            SWqmB64 => "s_wqm_b64",
            SBrevB32 => "s_brev_b32",
            SBcnt1I32B32 => "s_bcnt1_i32_b32",
            SBcnt1I32B64 => "s_bcnt1_i32_b64",
            SFf1I32B32 => "s_ff1_i32_b32",
            SFf1I32B64 => "s_ff1_i32_b64",
            SFlbitI32B32 => "s_flbit_i32_b32",
            SSextI32I8 => "s_sext_i32_i8",
            SSextI32I16 => "s_sext_i32_i16",
            SAndSaveexecB32 => "s_and_saveexec_b32",
            SAndSaveexecB64 => "s_and_saveexec_b64",
            SOrSaveexecB32 => "s_or_saveexec_b32",
            SOrSaveexecB64 => "s_or_saveexec_b64",
            SMovkI32 => "s_movk_i32",
            SCmpEqU32 => "s_cmp_eq_u32",
            SCmpLgU32 => "s_cmp_lg_u32",
            SCmpLtU32 => "s_cmp_lt_u32",
            SCmpLeU32 => "s_cmp_le_u32",
            SCmpGtU32 => "s_cmp_gt_u32",
            SCmpGeU32 => "s_cmp_ge_u32",
            SCmpEqI32 => "s_cmp_eq_i32",
            SCmpLgI32 => "s_cmp_lg_i32",
            SCmpLtI32 => "s_cmp_lt_i32",
            SCmpLeI32 => "s_cmp_le_i32",
            SCmpGtI32 => "s_cmp_gt_i32",
            SCmpGeI32 => "s_cmp_ge_i32",
            SCmpEqU64 => "s_cmp_eq_u64",
            SCmpLgU64 => "s_cmp_lg_u64",
            SEndpgm => "s_endpgm",
            SBarrier => "s_barrier",
            SLoadDword => "s_load_dword",
            SLoadDwordx2 => "s_load_dwordx2",
            SLoadDwordx4 => "s_load_dwordx4",
            SLoadDwordx8 => "s_load_dwordx8",
            SLoadDwordx16 => "s_load_dwordx16",
            SBufferLoadDword => "s_buffer_load_dword",
            SBufferLoadDwordx2 => "s_buffer_load_dwordx2",
            SBufferLoadDwordx4 => "s_buffer_load_dwordx4",
            SBufferLoadDwordx8 => "s_buffer_load_dwordx8",
            SBufferLoadDwordx16 => "s_buffer_load_dwordx16",
            SStoreDword => "s_store_dword",
            SStoreDwordx2 => "s_store_dwordx2",
            SStoreDwordx4 => "s_store_dwordx4",
            SBufferStoreDword => "s_buffer_store_dword",
            SBufferStoreDwordx2 => "s_buffer_store_dwordx2",
            SBufferStoreDwordx4 => "s_buffer_store_dwordx4",
            VAddF16 => "v_add_f16",
            VSubF16 => "v_sub_f16",
            VMulF16 => "v_mul_f16",
            VAddF32 => "v_add_f32",
            VSubF32 => "v_sub_f32",
            VSubrevF32 => "v_subrev_f32",
            VMulF32 => "v_mul_f32",
            VMinF32 => "v_min_f32",
            VMaxF32 => "v_max_f32",
            VAddU32 => "v_add_u32",
            VSubU32 => "v_sub_u32",
            VSubrevU32 => "v_subrev_u32",
            VAddCoU32 => "v_add_co_u32",
            VSubCoU32 => "v_sub_co_u32",
            VSubrevCoU32 => "v_subrev_co_u32",
            VAddcCoU32 => "v_addc_co_u32",
            VSubbCoU32 => "v_subb_co_u32",
            VAddU16 => "v_add_u16",
            VSubU16 => "v_sub_u16",
            VMulLoU16 => "v_mul_lo_u16",
            VAndB32 => "v_and_b32",
            VOrB32 => "v_or_b32",
            VXorB32 => "v_xor_b32",
            VLshlrevB32 => "v_lshlrev_b32",
            VLshrrevB32 => "v_lshrrev_b32",
            VAshrrevI32 => "v_ashrrev_i32",
            VLshlrevB16 => "v_lshlrev_b16",
            VLshrrevB16 => "v_lshrrev_b16",
            VAshrrevI16 => "v_ashrrev_i16",
            VMinU32 => "v_min_u32",
            VMaxU32 => "v_max_u32",
            VMinI32 => "v_min_i32",
            VMaxI32 => "v_max_i32",
            VMinU16 => "v_min_u16",
            VMaxU16 => "v_max_u16",
            VMinI16 => "v_min_i16",
            VMaxI16 => "v_max_i16",
            VMulU32U24 => "v_mul_u32_u24",
            VMulHiU32U24 => "v_mul_hi_u32_u24",
            VMulI32I24 => "v_mul_i32_i24",
            VCndmaskB32 => "v_cndmask_b32",
            VMovB32 => "v_mov_b32",
            VNotB32 => "v_not_b32",
            VBfrevB32 => "v_bfrev_b32",
            VRcpF32 => "v_rcp_f32",
            VRcpF64 => "v_rcp_f64",
            VRsqF32 => "v_rsq_f32",
            VSqrtF32 => "v_sqrt_f32",
            VSqrtF64 => "v_sqrt_f64",
            VLogF32 => "v_log_f32",
            VExpF32 => "v_exp_f32",
            VSinF32 => "v_sin_f32",
            VCosF32 => "v_cos_f32",
            VFloorF32 => "v_floor_f32",
            VCeilF32 => "v_ceil_f32",
            VTruncF32 => "v_trunc_f32",
            VRndneF32 => "v_rndne_f32",
            VFractF32 => "v_fract_f32",
            VFloorF64 => "v_floor_f64",
            VCeilF64 => "v_ceil_f64",
            VTruncF64 => "v_trunc_f64",
            VRndneF64 => "v_rndne_f64",
            VFractF64 => "v_fract_f64",
            VCvtF32I32 => "v_cvt_f32_i32",
            VCvtF32U32 => "v_cvt_f32_u32",
            VCvtI32F32 => "v_cvt_i32_f32",
            VCvtU32F32 => "v_cvt_u32_f32",
            VCvtF64F32 => "v_cvt_f64_f32",
            VCvtF32F64 => "v_cvt_f32_f64",
            VCvtF64I32 => "v_cvt_f64_i32",
            VCvtF64U32 => "v_cvt_f64_u32",
            VCvtI32F64 => "v_cvt_i32_f64",
            VCvtU32F64 => "v_cvt_u32_f64",
            VCvtF32F16 => "v_cvt_f32_f16",
            VCvtF16F32 => "v_cvt_f16_f32",
            VCvtF32Ubyte0 => "v_cvt_f32_ubyte0",
            VFfbhU32 => "v_ffbh_u32",
            VFfblB32 => "v_ffbl_b32",
            VReadfirstlaneB32 => "v_readfirstlane_b32",
            VCmpEqF16 => "v_cmp_eq_f16",
            VCmpNeqF16 => "v_cmp_neq_f16",
            VCmpLtF16 => "v_cmp_lt_f16",
            VCmpLeF16 => "v_cmp_le_f16",
            VCmpGtF16 => "v_cmp_gt_f16",
            VCmpGeF16 => "v_cmp_ge_f16",
            VCmpEqF32 => "v_cmp_eq_f32",
            VCmpNeqF32 => "v_cmp_neq_f32",
            VCmpLtF32 => "v_cmp_lt_f32",
            VCmpLeF32 => "v_cmp_le_f32",
            VCmpGtF32 => "v_cmp_gt_f32",
            VCmpGeF32 => "v_cmp_ge_f32",
            VCmpOF32 => "v_cmp_o_f32",
            VCmpUF32 => "v_cmp_u_f32",
            VCmpEqF64 => "v_cmp_eq_f64",
            VCmpNeqF64 => "v_cmp_neq_f64",
            VCmpLtF64 => "v_cmp_lt_f64",
            VCmpLeF64 => "v_cmp_le_f64",
            VCmpGtF64 => "v_cmp_gt_f64",
            VCmpGeF64 => "v_cmp_ge_f64",
            VCmpEqI32 => "v_cmp_eq_i32",
            VCmpNeI32 => "v_cmp_ne_i32",
            VCmpLtI32 => "v_cmp_lt_i32",
            VCmpLeI32 => "v_cmp_le_i32",
            VCmpGtI32 => "v_cmp_gt_i32",
            VCmpGeI32 => "v_cmp_ge_i32",
            VCmpEqU32 => "v_cmp_eq_u32",
            VCmpNeU32 => "v_cmp_ne_u32",
            VCmpLtU32 => "v_cmp_lt_u32",
            VCmpLeU32 => "v_cmp_le_u32",
            VCmpGtU32 => "v_cmp_gt_u32",
            VCmpGeU32 => "v_cmp_ge_u32",
            VCmpEqI64 => "v_cmp_eq_i64",
            VCmpNeI64 => "v_cmp_ne_i64",
            VCmpLtI64 => "v_cmp_lt_i64",
            VCmpLeI64 => "v_cmp_le_i64",
            VCmpGtI64 => "v_cmp_gt_i64",
            VCmpGeI64 => "v_cmp_ge_i64",
            VCmpEqU64 => "v_cmp_eq_u64",
            VCmpNeU64 => "v_cmp_ne_u64",
            VCmpLtU64 => "v_cmp_lt_u64",
            VCmpLeU64 => "v_cmp_le_u64",
            VCmpGtU64 => "v_cmp_gt_u64",
            VCmpGeU64 => "v_cmp_ge_u64",
            VCmpEqU16 => "v_cmp_eq_u16",
            VCmpNeU16 => "v_cmp_ne_u16",
            VCmpLtU16 => "v_cmp_lt_u16",
            VCmpLeU16 => "v_cmp_le_u16",
            VCmpGtU16 => "v_cmp_gt_u16",
            VCmpGeU16 => "v_cmp_ge_u16",
            VCmpEqI16 => "v_cmp_eq_i16",
            VCmpNeI16 => "v_cmp_ne_i16",
            VCmpLtI16 => "v_cmp_lt_i16",
            VCmpLeI16 => "v_cmp_le_i16",
            VCmpGtI16 => "v_cmp_gt_i16",
            VCmpGeI16 => "v_cmp_ge_i16",
            VMadF32 => "v_mad_f32",
            VFmaF16 => "v_fma_f16",
            VFmaF32 => "v_fma_f32",
            VFmaF64 => "v_fma_f64",
            VAddF64 => "v_add_f64",
            VMulF64 => "v_mul_f64",
            VMinF64 => "v_min_f64",
            VMaxF64 => "v_max_f64",
            VMulLoU32 => "v_mul_lo_u32",
            VMulHiU32 => "v_mul_hi_u32",
            VMulHiI32 => "v_mul_hi_i32",
            VBfeU32 => "v_bfe_u32",
            VBfeI32 => "v_bfe_i32",
            VBfiB32 => "v_bfi_b32",
            VAlignbitB32 => "v_alignbit_b32",
            VAlignbyteB32 => "v_alignbyte_b32",
            VLshlAddU32 => "v_lshl_add_u32",
            VAdd3U32 => "v_add3_u32",
            VMed3F32 => "v_med3_f32",
            VMed3I32 => "v_med3_i32",
            VMed3U32 => "v_med3_u32",
            VPermB32 => "v_perm_b32",
            VMbcntLoU32B32 => "v_mbcnt_lo_u32_b32",
            VMbcntHiU32B32 => "v_mbcnt_hi_u32_b32",
            VBcntU32B32 => "v_bcnt_u32_b32",
            VLshlrevB64 => "v_lshlrev_b64",
            VLshrrevB64 => "v_lshrrev_b64",
            VAshrrevI64 => "v_ashrrev_i64",
            VReadlaneB32 => "v_readlane_b32",
            VWritelaneB32 => "v_writelane_b32",
            VPkAddF16 => "v_pk_add_f16",
            VPkMulF16 => "v_pk_mul_f16",
            VPkFmaF16 => "v_pk_fma_f16",
            VPkAddU16 => "v_pk_add_u16",
            VPkSubU16 => "v_pk_sub_u16",
            VPkMulLoU16 => "v_pk_mul_lo_u16",
            DsReadU8 => "ds_read_u8",
            DsReadI8 => "ds_read_i8",
            DsReadU16 => "ds_read_u16",
            DsReadI16 => "ds_read_i16",
            DsReadB32 => "ds_read_b32",
            DsReadB64 => "ds_read_b64",
            DsReadB96 => "ds_read_b96",
            DsReadB128 => "ds_read_b128",
            DsRead2B32 => "ds_read2_b32",
            DsRead2B64 => "ds_read2_b64",
            DsWriteB8 => "ds_write_b8",
            DsWriteB16 => "ds_write_b16",
            DsWriteB32 => "ds_write_b32",
            DsWriteB64 => "ds_write_b64",
            DsWriteB96 => "ds_write_b96",
            DsWriteB128 => "ds_write_b128",
            DsWrite2B32 => "ds_write2_b32",
            DsWrite2B64 => "ds_write2_b64",
            DsAddU32 => "ds_add_u32",
            DsSubU32 => "ds_sub_u32",
            DsMinI32 => "ds_min_i32",
            DsMaxI32 => "ds_max_i32",
            DsMinU32 => "ds_min_u32",
            DsMaxU32 => "ds_max_u32",
            DsAndB32 => "ds_and_b32",
            DsOrB32 => "ds_or_b32",
            DsXorB32 => "ds_xor_b32",
            DsWrxchgRtnB32 => "ds_wrxchg_rtn_b32",
            DsCmpstRtnB32 => "ds_cmpst_rtn_b32",
            DsAddU64 => "ds_add_u64",
            DsCmpstRtnB64 => "ds_cmpst_rtn_b64",
            DsSwizzleB32 => "ds_swizzle_b32",
            DsPermuteB32 => "ds_permute_b32",
            DsBpermuteB32 => "ds_bpermute_b32",
            BufferLoadUbyte => "buffer_load_ubyte",
            BufferLoadSbyte => "buffer_load_sbyte",
            BufferLoadUshort => "buffer_load_ushort",
            BufferLoadSshort => "buffer_load_sshort",
            BufferLoadDword => "buffer_load_dword",
            BufferLoadDwordx2 => "buffer_load_dwordx2",
            BufferLoadDwordx3 => "buffer_load_dwordx3",
            BufferLoadDwordx4 => "buffer_load_dwordx4",
            BufferStoreByte => "buffer_store_byte",
            BufferStoreShort => "buffer_store_short",
            BufferStoreDword => "buffer_store_dword",
            BufferStoreDwordx2 => "buffer_store_dwordx2",
            BufferStoreDwordx3 => "buffer_store_dwordx3",
            BufferStoreDwordx4 => "buffer_store_dwordx4",
            BufferAtomicSwap => "buffer_atomic_swap",
            BufferAtomicCmpswap => "buffer_atomic_cmpswap",
            BufferAtomicAdd => "buffer_atomic_add",
            BufferAtomicSub => "buffer_atomic_sub",
            BufferAtomicSmin => "buffer_atomic_smin",
            BufferAtomicUmin => "buffer_atomic_umin",
            BufferAtomicSmax => "buffer_atomic_smax",
            BufferAtomicUmax => "buffer_atomic_umax",
            BufferAtomicAnd => "buffer_atomic_and",
            BufferAtomicOr => "buffer_atomic_or",
            BufferAtomicXor => "buffer_atomic_xor",
            BufferAtomicSwapX2 => "buffer_atomic_swap_x2",
            BufferAtomicCmpswapX2 => "buffer_atomic_cmpswap_x2",
            BufferAtomicAddX2 => "buffer_atomic_add_x2",
            GlobalLoadUbyte => "global_load_ubyte",
            GlobalLoadSbyte => "global_load_sbyte",
            GlobalLoadUshort => "global_load_ushort",
            GlobalLoadSshort => "global_load_sshort",
            GlobalLoadDword => "global_load_dword",
            GlobalLoadDwordx2 => "global_load_dwordx2",
            GlobalLoadDwordx3 => "global_load_dwordx3",
            GlobalLoadDwordx4 => "global_load_dwordx4",
            GlobalStoreByte => "global_store_byte",
            GlobalStoreShort => "global_store_short",
            GlobalStoreDword => "global_store_dword",
            GlobalStoreDwordx2 => "global_store_dwordx2",
            GlobalStoreDwordx3 => "global_store_dwordx3",
            GlobalStoreDwordx4 => "global_store_dwordx4",
            GlobalAtomicSwap => "global_atomic_swap",
            GlobalAtomicCmpswap => "global_atomic_cmpswap",
            GlobalAtomicAdd => "global_atomic_add",
            GlobalAtomicSub => "global_atomic_sub",
            GlobalAtomicSmin => "global_atomic_smin",
            GlobalAtomicUmin => "global_atomic_umin",
            GlobalAtomicSmax => "global_atomic_smax",
            GlobalAtomicUmax => "global_atomic_umax",
            GlobalAtomicAnd => "global_atomic_and",
            GlobalAtomicOr => "global_atomic_or",
            GlobalAtomicXor => "global_atomic_xor",
            GlobalAtomicSwapX2 => "global_atomic_swap_x2",
            GlobalAtomicCmpswapX2 => "global_atomic_cmpswap_x2",
            GlobalAtomicAddX2 => "global_atomic_add_x2",
            ScratchLoadUbyte => "scratch_load_ubyte",
            ScratchLoadSbyte => "scratch_load_sbyte",
            ScratchLoadUshort => "scratch_load_ushort",
            ScratchLoadSshort => "scratch_load_sshort",
            ScratchLoadDword => "scratch_load_dword",
            ScratchLoadDwordx2 => "scratch_load_dwordx2",
            ScratchLoadDwordx3 => "scratch_load_dwordx3",
            ScratchLoadDwordx4 => "scratch_load_dwordx4",
            ScratchStoreByte => "scratch_store_byte",
            ScratchStoreShort => "scratch_store_short",
            ScratchStoreDword => "scratch_store_dword",
            ScratchStoreDwordx2 => "scratch_store_dwordx2",
            ScratchStoreDwordx3 => "scratch_store_dwordx3",
            ScratchStoreDwordx4 => "scratch_store_dwordx4",
            ImageSample => "image_sample",
            ImageSampleL => "image_sample_l",
            ImageSampleB => "image_sample_b",
            ImageSampleD => "image_sample_d",
            ImageSampleC => "image_sample_c",
            ImageSampleCL => "image_sample_c_l",
            ImageLoad => "image_load",
            ImageLoadMip => "image_load_mip",
            ImageStore => "image_store",
            ImageStoreMip => "image_store_mip",
            ImageAtomicSwap => "image_atomic_swap",
            ImageAtomicCmpswap => "image_atomic_cmpswap",
            ImageAtomicAdd => "image_atomic_add",
            ImageAtomicSub => "image_atomic_sub",
            ImageAtomicSmin => "image_atomic_smin",
            ImageAtomicUmin => "image_atomic_umin",
            ImageAtomicSmax => "image_atomic_smax",
            ImageAtomicUmax => "image_atomic_umax",
            ImageAtomicAnd => "image_atomic_and",
            ImageAtomicOr => "image_atomic_or",
            ImageAtomicXor => "image_atomic_xor",
            PParallelcopy => "p_parallelcopy",
            PStartpgm => "p_startpgm",
            PPhi => "p_phi",
            PLinearPhi => "p_linear_phi",
            PAsUniform => "p_as_uniform",
            PCreateVector => "p_create_vector",
            PExtractVector => "p_extract_vector",
            PSplitVector => "p_split_vector",
            PLogicalStart => "p_logical_start",
            PLogicalEnd => "p_logical_end",
            PDiscardIf => "p_discard_if",
            PExitEarlyIf => "p_exit_early_if",
            PBranch => "p_branch",
            PCbranch => "p_cbranch",
            PCbranchZ => "p_cbranch_z",
            PCbranchNz => "p_cbranch_nz",
            PReduce => "p_reduce",
            PInclusiveScan => "p_inclusive_scan",
            PExclusiveScan => "p_exclusive_scan",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_classification() {
        assert_eq!(Op::SAddU32.format(), Format::Sop2);
        assert_eq!(Op::VCmpLtF32.format(), Format::Vopc);
        assert_eq!(Op::PPhi.format(), Format::Pseudo);
        assert_eq!(Op::PBranch.format(), Format::PseudoBranch);
        assert_eq!(Op::BufferLoadDwordx3.format(), Format::Mubuf);
        assert!(Op::DsReadB64.is_memory());
        assert!(!Op::VAddF32.is_memory());
    }

    #[test]
    fn names_are_assembly_style() {
        assert_eq!(Op::SCselectB32.name(), "s_cselect_b32");
        assert_eq!(Op::VCvtF32F16.name(), "v_cvt_f32_f16");
        assert_eq!(Op::PCreateVector.name(), "p_create_vector");
    }
}
