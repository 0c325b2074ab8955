//! Per-operation instruction selection.
//!
//! One handler per source-operation family, dispatched from a single
//! exhaustive match. Every handler obeys the same contract: the destination
//! temp carries exactly the register class committed by inference, scalar
//! operands feeding vector operations are promoted through an explicit
//! broadcast, and anything without a lowering on the requested generation is
//! a fatal error rather than a silent no-op.

mod arith;
mod cmp;
mod convert;
mod crosslane;
mod image;
mod mem;
mod vecops;

use prism_ir::{
    Barrier, InstrExtra, Instruction, MemScope, MemSync, Op, Operand, RegClass, RegKind,
    StorageSet, Temp,
};
use prism_ssa::{Inst, ValueId};

use crate::cfg;
use crate::ctx::Context;
use crate::error::{defect, SelectError};

pub fn visit_inst(ctx: &mut Context, inst: &Inst) -> Result<(), SelectError> {
    match inst {
        Inst::Const { dst, bits } => lower_const(ctx, *dst, *bits),
        Inst::Undef { dst } => {
            let rc = ctx.classes.rc(*dst);
            let t = ctx.bld().copy(rc, Operand::undef(rc));
            ctx.bind(*dst, t);
            Ok(())
        }
        Inst::Unary { dst, op, src } => arith::unary(ctx, *dst, *op, *src),
        Inst::Binary { dst, op, lhs, rhs } => arith::binary(ctx, *dst, *op, *lhs, *rhs),
        Inst::Ternary { dst, op, a, b, c } => arith::ternary(ctx, *dst, *op, *a, *b, *c),
        Inst::Compare { dst, op, lhs, rhs } => cmp::compare(ctx, *dst, *op, *lhs, *rhs),
        Inst::Select {
            dst,
            cond,
            if_true,
            if_false,
        } => cmp::select(ctx, *dst, *cond, *if_true, *if_false),
        Inst::Convert { dst, op, src } => convert::convert(ctx, *dst, *op, *src),
        Inst::Vec { dst, srcs } => vecops::build_vec(ctx, *dst, srcs),
        Inst::Extract { dst, src, index } => vecops::extract(ctx, *dst, *src, *index),
        Inst::CrossLane {
            dst,
            op,
            src,
            lane,
            data,
        } => crosslane::cross_lane(ctx, *dst, *op, *src, *lane, *data),
        Inst::Load {
            dst,
            space,
            resource,
            addr,
            const_offset,
            align,
        } => mem::load(ctx, *dst, *space, *resource, *addr, *const_offset, *align),
        Inst::Store {
            space,
            resource,
            addr,
            value,
            const_offset,
            align,
        } => mem::store(ctx, *space, *resource, *addr, *value, *const_offset, *align),
        Inst::Atomic {
            dst,
            space,
            op,
            resource,
            addr,
            data,
            compare,
        } => mem::atomic(ctx, *dst, *space, *op, *resource, *addr, *data, *compare),
        Inst::ImageSample {
            dst,
            image,
            sampler,
            coords,
            dim,
            mode,
            dref,
        } => image::sample(ctx, *dst, *image, *sampler, *coords, *dim, *mode, *dref),
        Inst::ImageLoad {
            dst,
            image,
            coords,
            dim,
            mip,
        } => image::load(ctx, *dst, *image, *coords, *dim, *mip),
        Inst::ImageStore {
            image,
            coords,
            value,
            dim,
            mip,
        } => image::store(ctx, *image, *coords, *value, *dim, *mip),
        Inst::ImageAtomic {
            dst,
            image,
            coords,
            dim,
            op,
            data,
            compare,
        } => image::atomic(ctx, *dst, *image, *coords, *dim, *op, *data, *compare),
        Inst::Discard { cond } => cfg::lower_discard(ctx, *cond),
        Inst::Barrier => {
            let sync = MemSync::plain(StorageSet::SHARED | StorageSet::GLOBAL | StorageSet::BUFFER);
            ctx.bld().push(Instruction::with_extra(
                Op::SBarrier,
                vec![],
                vec![],
                InstrExtra::Barrier(Barrier {
                    sync,
                    scope: MemScope::Workgroup,
                }),
            ));
            Ok(())
        }
    }
}

fn lower_const(ctx: &mut Context, dst: ValueId, bits: u64) -> Result<(), SelectError> {
    let ty = ctx.func.value(dst).ty;
    let rc = ctx.classes.rc(dst);
    if ty.is_bool() {
        let t = if ctx.classes.is_mask_bool(dst) {
            // A constant lane mask is either the active set or nothing.
            let mut bld = ctx.bld();
            if bits != 0 {
                let exec = bld.exec();
                bld.copy(rc, exec)
            } else {
                bld.copy(rc, Operand::zero(rc.bytes()))
            }
        } else {
            let v = if bits != 0 { 1 } else { 0 };
            ctx.bld().sop1(Op::SMovB32, rc, Operand::c32(v))
        };
        ctx.bind(dst, t);
        return Ok(());
    }
    if ty.comps != 1 {
        return Err(defect(dst, "composite constants must be built per component"));
    }
    let t = match (rc.kind(), rc.bytes() > 4) {
        (RegKind::Scalar, false) => ctx.bld().sop1(Op::SMovB32, rc, Operand::c32(bits as u32)),
        (RegKind::Scalar, true) => ctx.bld().sop1(Op::SMovB64, rc, Operand::c64(bits)),
        (RegKind::Vector | RegKind::LinearVector, false) => {
            ctx.bld().vop1(Op::VMovB32, rc, Operand::c32(bits as u32))
        }
        (RegKind::Vector | RegKind::LinearVector, true) => {
            let lo = ctx
                .bld()
                .vop1(Op::VMovB32, RegClass::V1, Operand::c32(bits as u32));
            let hi = ctx
                .bld()
                .vop1(Op::VMovB32, RegClass::V1, Operand::c32((bits >> 32) as u32));
            ctx.create_vector(rc, &[lo, hi])
        }
    };
    ctx.bind(dst, t);
    Ok(())
}

/// Operand for `v` as per-lane data: vector values pass through, uniform
/// values get an explicit broadcast (one per dword for wide values).
pub(crate) fn vector_temp(ctx: &mut Context, v: ValueId) -> Temp {
    let t = ctx.temp_of(v);
    if t.rc().is_vector() {
        return t;
    }
    broadcast_temp(ctx, t)
}

/// Broadcast a scalar temp into a vector temp of the same width.
pub(crate) fn broadcast_temp(ctx: &mut Context, t: Temp) -> Temp {
    if t.bytes() <= 4 {
        let rc = RegClass::vector_bytes(t.bytes());
        return ctx.bld().vop1(Op::VMovB32, rc, Operand::temp(t));
    }
    let dwords = ctx.split_dwords(t);
    let parts: Vec<Temp> = dwords
        .iter()
        .map(|&d| ctx.bld().broadcast(Operand::temp(d)))
        .collect();
    ctx.create_vector(RegClass::vector_bytes(t.bytes()), &parts)
}

/// The two dwords of a 64-bit value, vectorizing first when the consumer is
/// per-lane.
pub(crate) fn halves(ctx: &mut Context, v: ValueId, as_vector: bool) -> (Temp, Temp) {
    let t = if as_vector {
        vector_temp(ctx, v)
    } else {
        ctx.temp_of(v)
    };
    split_halves(ctx, t)
}

pub(crate) fn split_halves(ctx: &mut Context, t: Temp) -> (Temp, Temp) {
    debug_assert_eq!(t.bytes(), 8);
    let parts = ctx.split_vector(t, &[4, 4]);
    (parts[0], parts[1])
}

/// Materialize an f64 constant in a vector pair.
pub(crate) fn f64_const(ctx: &mut Context, v: f64) -> Temp {
    let bits = v.to_bits();
    let mut bld = ctx.bld();
    let lo = bld.vop1(Op::VMovB32, RegClass::V1, Operand::c32(bits as u32));
    let hi = bld.vop1(Op::VMovB32, RegClass::V1, Operand::c32((bits >> 32) as u32));
    ctx.create_vector(RegClass::V2, &[lo, hi])
}

/// Narrow a dword result to a sub-word class through an explicit extract;
/// sub-word values always live in the low bits of their slice.
pub(crate) fn trunc_to(ctx: &mut Context, t: Temp, rc: RegClass) -> Temp {
    if rc.bytes() >= 4 {
        debug_assert_eq!(rc.bytes(), t.bytes());
        return t;
    }
    let bits = rc.bytes() * 8;
    let mut bld = ctx.bld();
    match rc.kind() {
        RegKind::Scalar => bld.sop2(Op::SBfeU32, rc, Operand::temp(t), Operand::c32(bits << 16)),
        _ => bld.vop3(
            Op::VBfeU32,
            rc,
            vec![Operand::temp(t), Operand::c32(0), Operand::c32(bits)],
        ),
    }
}
