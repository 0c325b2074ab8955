//! Memory operation lowering: the five storage backends behind the generic
//! access splitter, plus atomics.

use prism_hw::{buffer_caps, global_caps, scratch_caps, shared_caps, smem_caps, TransferCaps};
use prism_ir::{
    BufInfo, CachePolicy, Definition, DsInfo, FlatInfo, InstrExtra, Instruction, MemScope, MemSync,
    Op, Operand, RegClass, RegKind, SmemInfo, StorageSet, Temp,
};
use prism_ssa::{AtomicOp, MemSpace, ValueId};

use super::{split_halves, trunc_to, vector_temp};
use crate::ctx::Context;
use crate::error::{defect, unsupported, SelectError};
use crate::memory::{recombine_parts, split_load, split_store, TransferBackend};

fn storage_of(space: MemSpace) -> StorageSet {
    match space {
        MemSpace::Uniform => StorageSet::BUFFER,
        MemSpace::Buffer => StorageSet::BUFFER,
        MemSpace::Shared => StorageSet::SHARED,
        MemSpace::Global => StorageSet::GLOBAL,
        MemSpace::Stack => StorageSet::SCRATCH,
    }
}

/// 32-bit vector add that works on generations with and without the
/// carry-less opcode.
fn vadd32(ctx: &mut Context, a: Operand, b: Operand) -> Temp {
    if ctx.program.gen.has_carryless_add() {
        ctx.bld().vop2(Op::VAddU32, RegClass::V1, a, b)
    } else {
        ctx.bld().vop2_carry(Op::VAddCoU32, RegClass::V1, a, b).0
    }
}

/// 64-bit vector add of a 32-bit constant.
fn vadd64_const(ctx: &mut Context, addr: Temp, excess: u32) -> Temp {
    let (lo, hi) = split_halves(ctx, addr);
    let mut bld = ctx.bld();
    let (nlo, carry) = bld.vop2_carry(
        Op::VAddCoU32,
        RegClass::V1,
        Operand::temp(lo),
        Operand::c32(excess),
    );
    let (nhi, _) = bld.vop2_carry_in(
        Op::VAddcCoU32,
        RegClass::V1,
        Operand::temp(hi),
        Operand::zero(4),
        Operand::temp(carry),
    );
    ctx.create_vector(RegClass::V2, &[nlo, nhi])
}

// ---- scalar (uniform) memory ----

struct SmemBackend {
    /// 64-bit pointer, or a 16-byte resource descriptor for buffer form.
    base: Temp,
    /// Extra scalar offset operand (register or constant zero).
    soffset: Operand,
    buffer: bool,
    storing: bool,
    sync: MemSync,
}

impl TransferBackend for SmemBackend {
    fn name(&self) -> &'static str {
        "scalar-memory"
    }

    fn caps(&self) -> TransferCaps {
        let mut caps = smem_caps(prism_hw::Generation::Gfx9);
        if self.storing {
            // Stores stop at four dwords.
            caps.max_transfer_bytes = 16;
        }
        caps
    }

    fn rebase(&mut self, ctx: &mut Context, excess: u32) -> Result<(), SelectError> {
        // Fold into the extra scalar offset; the base stays untouched.
        let mut bld = ctx.bld();
        let s = bld.sop2(Op::SAddU32, RegClass::S1, self.soffset, Operand::c32(excess));
        self.soffset = Operand::temp(s);
        Ok(())
    }

    fn emit_load(
        &mut self,
        ctx: &mut Context,
        offset: u32,
        bytes: u32,
    ) -> Result<(Temp, u32), SelectError> {
        let op = match (self.buffer, bytes) {
            (false, 4) => Op::SLoadDword,
            (false, 8) => Op::SLoadDwordx2,
            (false, 16) => Op::SLoadDwordx4,
            (false, 32) => Op::SLoadDwordx8,
            (false, 64) => Op::SLoadDwordx16,
            (true, 4) => Op::SBufferLoadDword,
            (true, 8) => Op::SBufferLoadDwordx2,
            (true, 16) => Op::SBufferLoadDwordx4,
            (true, 32) => Op::SBufferLoadDwordx8,
            (true, 64) => Op::SBufferLoadDwordx16,
            _ => unreachable!("splitter only requests supported scalar widths"),
        };
        let mut bld = ctx.bld();
        let dst = bld.tmp(RegClass::scalar_bytes(bytes));
        bld.push(Instruction::with_extra(
            op,
            vec![Operand::temp(self.base), self.soffset, Operand::c32(offset)],
            vec![Definition::of(dst)],
            InstrExtra::Smem(SmemInfo {
                sync: self.sync,
                glc: false,
            }),
        ));
        Ok((dst, bytes))
    }

    fn emit_store(
        &mut self,
        ctx: &mut Context,
        offset: u32,
        bytes: u32,
        data: Temp,
    ) -> Result<(), SelectError> {
        if !ctx.program.gen.has_smem_stores() {
            return Err(unsupported(
                ctx.program.gen,
                "scalar-memory stores were removed on this generation",
            ));
        }
        let op = match (self.buffer, bytes) {
            (false, 4) => Op::SStoreDword,
            (false, 8) => Op::SStoreDwordx2,
            (false, 16) => Op::SStoreDwordx4,
            (true, 4) => Op::SBufferStoreDword,
            (true, 8) => Op::SBufferStoreDwordx2,
            (true, 16) => Op::SBufferStoreDwordx4,
            _ => unreachable!("splitter only requests supported scalar widths"),
        };
        let mut bld = ctx.bld();
        bld.push(Instruction::with_extra(
            op,
            vec![
                Operand::temp(data),
                Operand::temp(self.base),
                self.soffset,
                Operand::c32(offset),
            ],
            vec![],
            InstrExtra::Smem(SmemInfo {
                sync: self.sync,
                glc: true,
            }),
        ));
        Ok(())
    }
}

// ---- per-lane structured-buffer memory ----

struct BufferBackend {
    desc: Temp,
    voffset: Temp,
    sync: MemSync,
}

impl BufferBackend {
    fn info(&self, offset: u32) -> InstrExtra {
        InstrExtra::Buf(BufInfo {
            offset,
            offen: true,
            idxen: false,
            cache: CachePolicy::default(),
            sync: self.sync,
        })
    }
}

impl TransferBackend for BufferBackend {
    fn name(&self) -> &'static str {
        "buffer-memory"
    }

    fn caps(&self) -> TransferCaps {
        buffer_caps(prism_hw::Generation::Gfx9)
    }

    fn rebase(&mut self, ctx: &mut Context, excess: u32) -> Result<(), SelectError> {
        self.voffset = vadd32(ctx, Operand::temp(self.voffset), Operand::c32(excess));
        Ok(())
    }

    fn emit_load(
        &mut self,
        ctx: &mut Context,
        offset: u32,
        bytes: u32,
    ) -> Result<(Temp, u32), SelectError> {
        let op = match bytes {
            1 => Op::BufferLoadUbyte,
            2 => Op::BufferLoadUshort,
            4 => Op::BufferLoadDword,
            8 => Op::BufferLoadDwordx2,
            12 => Op::BufferLoadDwordx3,
            16 => Op::BufferLoadDwordx4,
            _ => unreachable!("splitter only requests supported buffer widths"),
        };
        let dst = emit_lane_load(
            ctx,
            op,
            bytes,
            vec![
                Operand::temp(self.desc),
                Operand::temp(self.voffset),
                Operand::zero(4),
            ],
            self.info(offset),
        );
        Ok((dst, bytes))
    }

    fn emit_store(
        &mut self,
        ctx: &mut Context,
        offset: u32,
        bytes: u32,
        data: Temp,
    ) -> Result<(), SelectError> {
        let op = match bytes {
            1 => Op::BufferStoreByte,
            2 => Op::BufferStoreShort,
            4 => Op::BufferStoreDword,
            8 => Op::BufferStoreDwordx2,
            12 => Op::BufferStoreDwordx3,
            16 => Op::BufferStoreDwordx4,
            _ => unreachable!("splitter only requests supported buffer widths"),
        };
        let extra = self.info(offset);
        let mut bld = ctx.bld();
        bld.push(Instruction::with_extra(
            op,
            vec![
                Operand::temp(self.desc),
                Operand::temp(self.voffset),
                Operand::zero(4),
                Operand::temp(data),
            ],
            vec![],
            extra,
        ));
        Ok(())
    }
}

/// Per-lane load with the sub-word register-slice nuance: generations with
/// d16 register slices land 1/2-byte results directly in a narrow class;
/// older ones zero-extend into a full dword, so the narrow value is carved
/// out explicitly.
fn emit_lane_load(
    ctx: &mut Context,
    op: Op,
    bytes: u32,
    operands: Vec<Operand>,
    extra: InstrExtra,
) -> Temp {
    let subword_native = ctx.program.gen.has_subword_memory();
    let load_rc = if bytes < 4 && !subword_native {
        RegClass::V1
    } else {
        RegClass::vector_bytes(bytes)
    };
    let mut bld = ctx.bld();
    let wide = bld.tmp(load_rc);
    bld.push(Instruction::with_extra(
        op,
        operands,
        vec![Definition::of(wide)],
        extra,
    ));
    if load_rc.bytes() == bytes {
        wide
    } else {
        trunc_to(ctx, wide, RegClass::vector_bytes(bytes))
    }
}

// ---- shared (workgroup) memory ----

struct SharedBackend {
    addr: Temp,
    sync: MemSync,
}

impl SharedBackend {
    fn info(&self, offset: u32) -> InstrExtra {
        InstrExtra::Ds(DsInfo {
            offset0: offset as u16,
            offset1: 0,
            gds: false,
            sync: self.sync,
        })
    }
}

impl TransferBackend for SharedBackend {
    fn name(&self) -> &'static str {
        "shared-memory"
    }

    fn caps(&self) -> TransferCaps {
        shared_caps(prism_hw::Generation::Gfx9)
    }

    fn rebase(&mut self, ctx: &mut Context, excess: u32) -> Result<(), SelectError> {
        self.addr = vadd32(ctx, Operand::temp(self.addr), Operand::c32(excess));
        Ok(())
    }

    fn emit_load(
        &mut self,
        ctx: &mut Context,
        offset: u32,
        bytes: u32,
    ) -> Result<(Temp, u32), SelectError> {
        let op = match bytes {
            1 => Op::DsReadU8,
            2 => Op::DsReadU16,
            4 => Op::DsReadB32,
            8 => Op::DsReadB64,
            12 => Op::DsReadB96,
            16 => Op::DsReadB128,
            _ => unreachable!("splitter only requests supported shared widths"),
        };
        let dst = emit_lane_load(
            ctx,
            op,
            bytes,
            vec![Operand::temp(self.addr)],
            self.info(offset),
        );
        Ok((dst, bytes))
    }

    fn emit_store(
        &mut self,
        ctx: &mut Context,
        offset: u32,
        bytes: u32,
        data: Temp,
    ) -> Result<(), SelectError> {
        let op = match bytes {
            1 => Op::DsWriteB8,
            2 => Op::DsWriteB16,
            4 => Op::DsWriteB32,
            8 => Op::DsWriteB64,
            12 => Op::DsWriteB96,
            16 => Op::DsWriteB128,
            _ => unreachable!("splitter only requests supported shared widths"),
        };
        let extra = self.info(offset);
        let mut bld = ctx.bld();
        bld.push(Instruction::with_extra(
            op,
            vec![Operand::temp(self.addr), Operand::temp(data)],
            vec![],
            extra,
        ));
        Ok(())
    }
}

// ---- raw global / per-lane stack memory ----

struct FlatBackend {
    /// 64-bit per-lane address for global, 32-bit private offset for stack.
    addr: Temp,
    scratch: bool,
    sync: MemSync,
    caps: TransferCaps,
}

impl FlatBackend {
    fn info(&self, offset: u32) -> InstrExtra {
        InstrExtra::Flat(FlatInfo {
            offset: offset as i32,
            cache: CachePolicy::default(),
            sync: self.sync,
        })
    }
}

impl TransferBackend for FlatBackend {
    fn name(&self) -> &'static str {
        if self.scratch {
            "stack-memory"
        } else {
            "global-memory"
        }
    }

    fn caps(&self) -> TransferCaps {
        self.caps
    }

    fn rebase(&mut self, ctx: &mut Context, excess: u32) -> Result<(), SelectError> {
        self.addr = if self.scratch {
            vadd32(ctx, Operand::temp(self.addr), Operand::c32(excess))
        } else {
            vadd64_const(ctx, self.addr, excess)
        };
        Ok(())
    }

    fn emit_load(
        &mut self,
        ctx: &mut Context,
        offset: u32,
        bytes: u32,
    ) -> Result<(Temp, u32), SelectError> {
        let op = match (self.scratch, bytes) {
            (false, 1) => Op::GlobalLoadUbyte,
            (false, 2) => Op::GlobalLoadUshort,
            (false, 4) => Op::GlobalLoadDword,
            (false, 8) => Op::GlobalLoadDwordx2,
            (false, 12) => Op::GlobalLoadDwordx3,
            (false, 16) => Op::GlobalLoadDwordx4,
            (true, 1) => Op::ScratchLoadUbyte,
            (true, 2) => Op::ScratchLoadUshort,
            (true, 4) => Op::ScratchLoadDword,
            (true, 8) => Op::ScratchLoadDwordx2,
            (true, 12) => Op::ScratchLoadDwordx3,
            (true, 16) => Op::ScratchLoadDwordx4,
            _ => unreachable!("splitter only requests supported flat widths"),
        };
        let dst = emit_lane_load(
            ctx,
            op,
            bytes,
            vec![Operand::temp(self.addr)],
            self.info(offset),
        );
        Ok((dst, bytes))
    }

    fn emit_store(
        &mut self,
        ctx: &mut Context,
        offset: u32,
        bytes: u32,
        data: Temp,
    ) -> Result<(), SelectError> {
        let op = match (self.scratch, bytes) {
            (false, 1) => Op::GlobalStoreByte,
            (false, 2) => Op::GlobalStoreShort,
            (false, 4) => Op::GlobalStoreDword,
            (false, 8) => Op::GlobalStoreDwordx2,
            (false, 12) => Op::GlobalStoreDwordx3,
            (false, 16) => Op::GlobalStoreDwordx4,
            (true, 1) => Op::ScratchStoreByte,
            (true, 2) => Op::ScratchStoreShort,
            (true, 4) => Op::ScratchStoreDword,
            (true, 8) => Op::ScratchStoreDwordx2,
            (true, 12) => Op::ScratchStoreDwordx3,
            (true, 16) => Op::ScratchStoreDwordx4,
            _ => unreachable!("splitter only requests supported flat widths"),
        };
        let extra = self.info(offset);
        let mut bld = ctx.bld();
        bld.push(Instruction::with_extra(
            op,
            vec![Operand::temp(self.addr), Operand::temp(data)],
            vec![],
            extra,
        ));
        Ok(())
    }
}

// ---- drivers ----

#[allow(clippy::too_many_arguments)]
pub(super) fn load(
    ctx: &mut Context,
    dst: ValueId,
    space: MemSpace,
    resource: Option<ValueId>,
    addr: ValueId,
    const_offset: u32,
    align: u32,
) -> Result<(), SelectError> {
    let rc = ctx.classes.rc(dst);
    let sync = MemSync::plain(storage_of(space));
    let parts = match space {
        MemSpace::Uniform => {
            let (base, soffset, buffer) = match resource {
                Some(desc) => {
                    let d = ctx.temp_of(desc);
                    (d, ctx.op(addr), true)
                }
                None => (ctx.temp_of(addr), Operand::zero(4), false),
            };
            if base.rc().is_vector() {
                return Err(defect(addr, "uniform-memory address must be scalar"));
            }
            let mut backend = SmemBackend {
                base,
                soffset,
                buffer,
                storing: false,
                sync,
            };
            split_load(ctx, &mut backend, rc.bytes(), align, const_offset, RegKind::Scalar)?
        }
        MemSpace::Buffer => {
            let Some(resource) = resource else {
                return Err(defect(dst, "buffer access without a descriptor"));
            };
            let desc = ctx.temp_of(resource);
            let voffset = vector_temp(ctx, addr);
            let mut backend = BufferBackend {
                desc,
                voffset,
                sync,
            };
            split_load(ctx, &mut backend, rc.bytes(), align, const_offset, RegKind::Vector)?
        }
        MemSpace::Shared => {
            let a = vector_temp(ctx, addr);
            let mut backend = SharedBackend { addr: a, sync };
            split_load(ctx, &mut backend, rc.bytes(), align, const_offset, RegKind::Vector)?
        }
        MemSpace::Global | MemSpace::Stack => {
            let scratch = space == MemSpace::Stack;
            let a = vector_temp(ctx, addr);
            let caps = if scratch {
                scratch_caps(ctx.program.gen)
            } else {
                global_caps(ctx.program.gen)
            };
            let mut backend = FlatBackend {
                addr: a,
                scratch,
                sync,
                caps,
            };
            split_load(ctx, &mut backend, rc.bytes(), align, const_offset, RegKind::Vector)?
        }
    };
    let t = recombine_parts(ctx, rc, parts);
    ctx.bind(dst, t);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(super) fn store(
    ctx: &mut Context,
    space: MemSpace,
    resource: Option<ValueId>,
    addr: ValueId,
    value: ValueId,
    const_offset: u32,
    align: u32,
) -> Result<(), SelectError> {
    let sync = MemSync::plain(storage_of(space));
    match space {
        MemSpace::Uniform => {
            let data = ctx.temp_of(value);
            if data.rc().is_vector() {
                return Err(defect(value, "uniform-memory stores take scalar data"));
            }
            let (base, soffset, buffer) = match resource {
                Some(desc) => {
                    let d = ctx.temp_of(desc);
                    (d, ctx.op(addr), true)
                }
                None => (ctx.temp_of(addr), Operand::zero(4), false),
            };
            let mut backend = SmemBackend {
                base,
                soffset,
                buffer,
                storing: true,
                sync,
            };
            split_store(ctx, &mut backend, data, align, const_offset)
        }
        MemSpace::Buffer => {
            let Some(resource) = resource else {
                return Err(defect(value, "buffer access without a descriptor"));
            };
            let data = vector_temp(ctx, value);
            let desc = ctx.temp_of(resource);
            let voffset = vector_temp(ctx, addr);
            let mut backend = BufferBackend {
                desc,
                voffset,
                sync,
            };
            split_store(ctx, &mut backend, data, align, const_offset)
        }
        MemSpace::Shared => {
            let data = vector_temp(ctx, value);
            let a = vector_temp(ctx, addr);
            let mut backend = SharedBackend { addr: a, sync };
            split_store(ctx, &mut backend, data, align, const_offset)
        }
        MemSpace::Global | MemSpace::Stack => {
            let scratch = space == MemSpace::Stack;
            let data = vector_temp(ctx, value);
            let a = vector_temp(ctx, addr);
            let caps = if scratch {
                scratch_caps(ctx.program.gen)
            } else {
                global_caps(ctx.program.gen)
            };
            let mut backend = FlatBackend {
                addr: a,
                scratch,
                sync,
                caps,
            };
            split_store(ctx, &mut backend, data, align, const_offset)
        }
    }
}

fn buffer_atomic_op(op: AtomicOp, wide: bool) -> Option<Op> {
    Some(match (op, wide) {
        (AtomicOp::Swap, false) => Op::BufferAtomicSwap,
        (AtomicOp::CmpSwap, false) => Op::BufferAtomicCmpswap,
        (AtomicOp::Add, false) => Op::BufferAtomicAdd,
        (AtomicOp::Sub, false) => Op::BufferAtomicSub,
        (AtomicOp::SMin, false) => Op::BufferAtomicSmin,
        (AtomicOp::UMin, false) => Op::BufferAtomicUmin,
        (AtomicOp::SMax, false) => Op::BufferAtomicSmax,
        (AtomicOp::UMax, false) => Op::BufferAtomicUmax,
        (AtomicOp::And, false) => Op::BufferAtomicAnd,
        (AtomicOp::Or, false) => Op::BufferAtomicOr,
        (AtomicOp::Xor, false) => Op::BufferAtomicXor,
        (AtomicOp::Swap, true) => Op::BufferAtomicSwapX2,
        (AtomicOp::CmpSwap, true) => Op::BufferAtomicCmpswapX2,
        (AtomicOp::Add, true) => Op::BufferAtomicAddX2,
        _ => return None,
    })
}

fn global_atomic_op(op: AtomicOp, wide: bool) -> Option<Op> {
    Some(match (op, wide) {
        (AtomicOp::Swap, false) => Op::GlobalAtomicSwap,
        (AtomicOp::CmpSwap, false) => Op::GlobalAtomicCmpswap,
        (AtomicOp::Add, false) => Op::GlobalAtomicAdd,
        (AtomicOp::Sub, false) => Op::GlobalAtomicSub,
        (AtomicOp::SMin, false) => Op::GlobalAtomicSmin,
        (AtomicOp::UMin, false) => Op::GlobalAtomicUmin,
        (AtomicOp::SMax, false) => Op::GlobalAtomicSmax,
        (AtomicOp::UMax, false) => Op::GlobalAtomicUmax,
        (AtomicOp::And, false) => Op::GlobalAtomicAnd,
        (AtomicOp::Or, false) => Op::GlobalAtomicOr,
        (AtomicOp::Xor, false) => Op::GlobalAtomicXor,
        (AtomicOp::Swap, true) => Op::GlobalAtomicSwapX2,
        (AtomicOp::CmpSwap, true) => Op::GlobalAtomicCmpswapX2,
        (AtomicOp::Add, true) => Op::GlobalAtomicAddX2,
        _ => return None,
    })
}

fn shared_atomic_op(op: AtomicOp, wide: bool) -> Option<Op> {
    Some(match (op, wide) {
        (AtomicOp::Swap, false) => Op::DsWrxchgRtnB32,
        (AtomicOp::CmpSwap, false) => Op::DsCmpstRtnB32,
        (AtomicOp::Add, false) => Op::DsAddU32,
        (AtomicOp::Sub, false) => Op::DsSubU32,
        (AtomicOp::SMin, false) => Op::DsMinI32,
        (AtomicOp::UMin, false) => Op::DsMinU32,
        (AtomicOp::SMax, false) => Op::DsMaxI32,
        (AtomicOp::UMax, false) => Op::DsMaxU32,
        (AtomicOp::And, false) => Op::DsAndB32,
        (AtomicOp::Or, false) => Op::DsOrB32,
        (AtomicOp::Xor, false) => Op::DsXorB32,
        (AtomicOp::Add, true) => Op::DsAddU64,
        (AtomicOp::CmpSwap, true) => Op::DsCmpstRtnB64,
        _ => return None,
    })
}

#[allow(clippy::too_many_arguments)]
pub(super) fn atomic(
    ctx: &mut Context,
    dst: Option<ValueId>,
    space: MemSpace,
    op: AtomicOp,
    resource: Option<ValueId>,
    addr: ValueId,
    data: ValueId,
    compare: Option<ValueId>,
) -> Result<(), SelectError> {
    let bytes = ctx.func.value(data).ty.bytes();
    if bytes != 4 && bytes != 8 {
        return Err(defect(data, "atomics operate on 32- or 64-bit values"));
    }
    let wide = bytes == 8;
    let scope = if space == MemSpace::Shared {
        MemScope::Workgroup
    } else {
        MemScope::Device
    };
    let sync = MemSync::atomic(storage_of(space), scope);
    if op == AtomicOp::CmpSwap && compare.is_none() {
        return Err(defect(data, "compare-swap without a compare operand"));
    }

    let data_t = vector_temp(ctx, data);
    // Compare-swap carries (new, compare) as one combined source.
    let payload = match compare {
        Some(c) if space != MemSpace::Shared => {
            let cmp_t = vector_temp(ctx, c);
            let combined_rc = RegClass::vector_bytes(bytes * 2);
            ctx.create_vector(combined_rc, &[data_t, cmp_t])
        }
        _ => data_t,
    };

    let returns = dst.is_some();
    let dst_def = |ctx: &mut Context| -> Vec<Definition> {
        match dst {
            Some(d) => {
                let t = ctx.program.alloc_temp(RegClass::vector_bytes(bytes));
                vec![Definition::of(t)]
            }
            None => vec![],
        }
    };

    let (instr, defs) = match space {
        MemSpace::Buffer => {
            let Some(resource) = resource else {
                return Err(defect(data, "buffer access without a descriptor"));
            };
            let opcode = buffer_atomic_op(op, wide)
                .ok_or_else(|| unsupported(ctx.program.gen, "64-bit buffer atomic variant"))?;
            let desc = ctx.temp_of(resource);
            let voffset = vector_temp(ctx, addr);
            let defs = dst_def(ctx);
            (
                Instruction::with_extra(
                    opcode,
                    vec![
                        Operand::temp(desc),
                        Operand::temp(voffset),
                        Operand::zero(4),
                        Operand::temp(payload),
                    ],
                    defs.clone(),
                    InstrExtra::Buf(BufInfo {
                        offset: 0,
                        offen: true,
                        idxen: false,
                        cache: CachePolicy {
                            glc: returns,
                            ..CachePolicy::default()
                        },
                        sync,
                    }),
                ),
                defs,
            )
        }
        MemSpace::Global => {
            let opcode = global_atomic_op(op, wide)
                .ok_or_else(|| unsupported(ctx.program.gen, "64-bit global atomic variant"))?;
            let a = vector_temp(ctx, addr);
            let defs = dst_def(ctx);
            (
                Instruction::with_extra(
                    opcode,
                    vec![Operand::temp(a), Operand::temp(payload)],
                    defs.clone(),
                    InstrExtra::Flat(FlatInfo {
                        offset: 0,
                        cache: CachePolicy {
                            glc: returns,
                            ..CachePolicy::default()
                        },
                        sync,
                    }),
                ),
                defs,
            )
        }
        MemSpace::Shared => {
            let opcode = shared_atomic_op(op, wide)
                .ok_or_else(|| unsupported(ctx.program.gen, "64-bit shared atomic variant"))?;
            let a = vector_temp(ctx, addr);
            let mut operands = vec![Operand::temp(a)];
            if let Some(c) = compare {
                let cmp_t = vector_temp(ctx, c);
                operands.push(Operand::temp(cmp_t));
            }
            operands.push(Operand::temp(data_t));
            let defs = dst_def(ctx);
            (
                Instruction::with_extra(
                    opcode,
                    operands,
                    defs.clone(),
                    InstrExtra::Ds(DsInfo {
                        offset0: 0,
                        offset1: 0,
                        gds: false,
                        sync,
                    }),
                ),
                defs,
            )
        }
        MemSpace::Uniform | MemSpace::Stack => {
            return Err(defect(data, "no atomics on this storage backend"));
        }
    };
    ctx.bld().push(instr);
    if let (Some(d), Some(def)) = (dst, defs.first()) {
        ctx.bind(d, def.temp());
    }
    Ok(())
}
