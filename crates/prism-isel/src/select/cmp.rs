//! Comparison and select lowering.
//!
//! Divergent booleans are lane masks; uniform booleans are 0/1 scalars. The
//! two representations never mix implicitly; every crossing goes through
//! `mask_to_bool` or `bool_mask`.

use prism_ir::{Op, Operand, RegClass, Temp};
use prism_ssa::{CmpOp, ValueId};

use super::{split_halves, vector_temp, broadcast_temp};
use crate::ctx::Context;
use crate::error::{defect, SelectError};

/// Collapse a lane mask into a uniform 0/1 boolean: any active lane set?
pub(super) fn mask_to_bool(ctx: &mut Context, mask: Temp) -> Temp {
    let lm = ctx.program.lane_mask();
    let wide = lm == RegClass::S2;
    let mut bld = ctx.bld();
    let exec = bld.exec();
    let live = bld.mask_op(Op::SAndB32, Op::SAndB64, Operand::temp(mask), exec);
    bld.sopc(
        if wide { Op::SCmpLgU64 } else { Op::SCmpLgU32 },
        Operand::temp(live),
        Operand::zero(lm.bytes()),
    );
    bld.cselect(Op::SCselectB32, RegClass::S1, Operand::c32(1), Operand::zero(4))
}

/// Mask operand for any boolean value; uniform booleans widen to either the
/// full active set or the empty mask.
pub(super) fn bool_mask(ctx: &mut Context, v: ValueId) -> Temp {
    let t = ctx.temp_of(v);
    if ctx.classes.is_mask_bool(v) {
        return t;
    }
    let lm = ctx.program.lane_mask();
    let mut bld = ctx.bld();
    bld.sopc(Op::SCmpLgU32, Operand::temp(t), Operand::zero(4));
    let exec = bld.exec();
    let op = if lm == RegClass::S1 {
        Op::SCselectB32
    } else {
        Op::SCselectB64
    };
    bld.cselect(op, lm, exec, Operand::zero(lm.bytes()))
}

fn float_cmp_op(op: CmpOp, bits: u32) -> Op {
    match (op, bits) {
        (CmpOp::FEq, 16) => Op::VCmpEqF16,
        (CmpOp::FNe, 16) => Op::VCmpNeqF16,
        (CmpOp::FLt, 16) => Op::VCmpLtF16,
        (CmpOp::FLe, 16) => Op::VCmpLeF16,
        (CmpOp::FGt, 16) => Op::VCmpGtF16,
        (CmpOp::FGe, 16) => Op::VCmpGeF16,
        (CmpOp::FEq, 32) => Op::VCmpEqF32,
        (CmpOp::FNe, 32) => Op::VCmpNeqF32,
        (CmpOp::FLt, 32) => Op::VCmpLtF32,
        (CmpOp::FLe, 32) => Op::VCmpLeF32,
        (CmpOp::FGt, 32) => Op::VCmpGtF32,
        (CmpOp::FGe, 32) => Op::VCmpGeF32,
        (CmpOp::FEq, _) => Op::VCmpEqF64,
        (CmpOp::FNe, _) => Op::VCmpNeqF64,
        (CmpOp::FLt, _) => Op::VCmpLtF64,
        (CmpOp::FLe, _) => Op::VCmpLeF64,
        (CmpOp::FGt, _) => Op::VCmpGtF64,
        (CmpOp::FGe, _) => Op::VCmpGeF64,
        _ => unreachable!("integer predicate on the float path"),
    }
}

fn int_cmp_op(op: CmpOp, bits: u32) -> Op {
    match (op, bits) {
        (CmpOp::IEq, 16) => Op::VCmpEqI16,
        (CmpOp::INe, 16) => Op::VCmpNeI16,
        (CmpOp::ILt, 16) => Op::VCmpLtI16,
        (CmpOp::ILe, 16) => Op::VCmpLeI16,
        (CmpOp::IGt, 16) => Op::VCmpGtI16,
        (CmpOp::IGe, 16) => Op::VCmpGeI16,
        (CmpOp::ULt, 16) => Op::VCmpLtU16,
        (CmpOp::ULe, 16) => Op::VCmpLeU16,
        (CmpOp::UGt, 16) => Op::VCmpGtU16,
        (CmpOp::UGe, 16) => Op::VCmpGeU16,
        (CmpOp::IEq, 32) => Op::VCmpEqI32,
        (CmpOp::INe, 32) => Op::VCmpNeI32,
        (CmpOp::ILt, 32) => Op::VCmpLtI32,
        (CmpOp::ILe, 32) => Op::VCmpLeI32,
        (CmpOp::IGt, 32) => Op::VCmpGtI32,
        (CmpOp::IGe, 32) => Op::VCmpGeI32,
        (CmpOp::ULt, 32) => Op::VCmpLtU32,
        (CmpOp::ULe, 32) => Op::VCmpLeU32,
        (CmpOp::UGt, 32) => Op::VCmpGtU32,
        (CmpOp::UGe, 32) => Op::VCmpGeU32,
        (CmpOp::IEq, _) => Op::VCmpEqI64,
        (CmpOp::INe, _) => Op::VCmpNeI64,
        (CmpOp::ILt, _) => Op::VCmpLtI64,
        (CmpOp::ILe, _) => Op::VCmpLeI64,
        (CmpOp::IGt, _) => Op::VCmpGtI64,
        (CmpOp::IGe, _) => Op::VCmpGeI64,
        (CmpOp::ULt, _) => Op::VCmpLtU64,
        (CmpOp::ULe, _) => Op::VCmpLeU64,
        (CmpOp::UGt, _) => Op::VCmpGtU64,
        (CmpOp::UGe, _) => Op::VCmpGeU64,
        _ => unreachable!("float predicate on the integer path"),
    }
}

fn scalar_int_cmp_op(op: CmpOp) -> Op {
    match op {
        CmpOp::IEq => Op::SCmpEqI32,
        CmpOp::INe => Op::SCmpLgI32,
        CmpOp::ILt => Op::SCmpLtI32,
        CmpOp::ILe => Op::SCmpLeI32,
        CmpOp::IGt => Op::SCmpGtI32,
        CmpOp::IGe => Op::SCmpGeI32,
        CmpOp::ULt => Op::SCmpLtU32,
        CmpOp::ULe => Op::SCmpLeU32,
        CmpOp::UGt => Op::SCmpGtU32,
        CmpOp::UGe => Op::SCmpGeU32,
        _ => unreachable!(),
    }
}

pub(super) fn compare(
    ctx: &mut Context,
    dst: ValueId,
    op: CmpOp,
    lhs: ValueId,
    rhs: ValueId,
) -> Result<(), SelectError> {
    let sty = ctx.func.value(lhs).ty;
    let bits = sty.comp_bits;
    let wants_mask = ctx.classes.is_mask_bool(dst);

    if op.is_float() {
        let a = vector_temp(ctx, lhs);
        let b = vector_temp(ctx, rhs);
        let mask = ctx
            .bld()
            .vopc(float_cmp_op(op, bits), Operand::temp(a), Operand::temp(b));
        let t = if wants_mask {
            mask
        } else {
            mask_to_bool(ctx, mask)
        };
        ctx.bind(dst, t);
        return Ok(());
    }

    // Integer predicates.
    if !wants_mask {
        // Uniform operands, uniform result: the scalar comparison unit.
        let t = match bits {
            32 => {
                let a = ctx.op(lhs);
                let b = ctx.op(rhs);
                let mut bld = ctx.bld();
                bld.sopc(scalar_int_cmp_op(op), a, b);
                bld.cselect(Op::SCselectB32, RegClass::S1, Operand::c32(1), Operand::zero(4))
            }
            64 if matches!(op, CmpOp::IEq | CmpOp::INe) => {
                let a = ctx.op(lhs);
                let b = ctx.op(rhs);
                let sop = if op == CmpOp::IEq {
                    Op::SCmpEqU64
                } else {
                    Op::SCmpLgU64
                };
                let mut bld = ctx.bld();
                bld.sopc(sop, a, b);
                bld.cselect(Op::SCselectB32, RegClass::S1, Operand::c32(1), Operand::zero(4))
            }
            64 => {
                // No scalar ordered 64-bit compare: go through the vector
                // unit and collapse. The second source must be per-lane.
                let a = ctx.temp_of(lhs);
                let b = ctx.temp_of(rhs);
                let vb = broadcast_temp(ctx, b);
                let mask = ctx
                    .bld()
                    .vopc(int_cmp_op(op, 64), Operand::temp(a), Operand::temp(vb));
                mask_to_bool(ctx, mask)
            }
            _ => return Err(defect(dst, "sub-word uniform compare")),
        };
        ctx.bind(dst, t);
        return Ok(());
    }

    let (a, b, cmp) = match bits {
        8 => {
            let signed = matches!(op, CmpOp::ILt | CmpOp::ILe | CmpOp::IGt | CmpOp::IGe);
            let wa = widen_cmp_operand(ctx, lhs, signed);
            let wb = widen_cmp_operand(ctx, rhs, signed);
            (wa, wb, int_cmp_op(op, 32))
        }
        _ => {
            let a = vector_temp(ctx, lhs);
            let b = vector_temp(ctx, rhs);
            (a, b, int_cmp_op(op, bits))
        }
    };
    let mask = ctx.bld().vopc(cmp, Operand::temp(a), Operand::temp(b));
    ctx.bind(dst, mask);
    Ok(())
}

fn widen_cmp_operand(ctx: &mut Context, v: ValueId, signed: bool) -> Temp {
    let t = vector_temp(ctx, v);
    if t.bytes() >= 4 {
        return t;
    }
    let op = if signed { Op::VBfeI32 } else { Op::VBfeU32 };
    ctx.bld().vop3(
        op,
        RegClass::V1,
        vec![
            Operand::temp(t),
            Operand::c32(0),
            Operand::c32(t.bytes() * 8),
        ],
    )
}

pub(super) fn select(
    ctx: &mut Context,
    dst: ValueId,
    cond: ValueId,
    if_true: ValueId,
    if_false: ValueId,
) -> Result<(), SelectError> {
    let rc = ctx.classes.rc(dst);
    let ty = ctx.func.value(dst).ty;
    let cond_is_mask = ctx.classes.is_mask_bool(cond);

    if ty.is_bool() {
        let t = if ctx.classes.is_mask_bool(dst) {
            // Mask-level select: (t & c) | (f & ~c).
            let c = bool_mask(ctx, cond);
            let tm = bool_mask(ctx, if_true);
            let fm = bool_mask(ctx, if_false);
            let mut bld = ctx.bld();
            let picked = bld.mask_op(
                Op::SAndB32,
                Op::SAndB64,
                Operand::temp(tm),
                Operand::temp(c),
            );
            let kept = bld.mask_op(
                Op::SAndn2B32,
                Op::SAndn2B64,
                Operand::temp(fm),
                Operand::temp(c),
            );
            bld.mask_op(
                Op::SOrB32,
                Op::SOrB64,
                Operand::temp(picked),
                Operand::temp(kept),
            )
        } else {
            let c = ctx.op(cond);
            let tv = ctx.op(if_true);
            let fv = ctx.op(if_false);
            let mut bld = ctx.bld();
            bld.sopc(Op::SCmpLgU32, c, Operand::zero(4));
            bld.cselect(Op::SCselectB32, rc, tv, fv)
        };
        ctx.bind(dst, t);
        return Ok(());
    }

    if !rc.is_vector() {
        debug_assert!(!cond_is_mask, "uniform select on a divergent condition");
        let c = ctx.op(cond);
        let tv = ctx.op(if_true);
        let fv = ctx.op(if_false);
        let mut bld = ctx.bld();
        bld.sopc(Op::SCmpLgU32, c, Operand::zero(4));
        let op = if rc.bytes() > 4 {
            Op::SCselectB64
        } else {
            Op::SCselectB32
        };
        let t = bld.cselect(op, rc, tv, fv);
        ctx.bind(dst, t);
        return Ok(());
    }

    // Per-lane select, one dword at a time.
    let mask = bool_mask(ctx, cond);
    let tv = vector_temp(ctx, if_true);
    let fv = vector_temp(ctx, if_false);
    let t = if rc.bytes() <= 4 {
        let picked = ctx
            .bld()
            .cndmask(Operand::temp(fv), Operand::temp(tv), Operand::temp(mask));
        if rc.bytes() < 4 {
            super::trunc_to(ctx, picked, rc)
        } else {
            picked
        }
    } else {
        let (tlo, thi) = split_halves(ctx, tv);
        let (flo, fhi) = split_halves(ctx, fv);
        let mut bld = ctx.bld();
        let lo = bld.cndmask(Operand::temp(flo), Operand::temp(tlo), Operand::temp(mask));
        let hi = bld.cndmask(Operand::temp(fhi), Operand::temp(thi), Operand::temp(mask));
        ctx.create_vector(rc, &[lo, hi])
    };
    ctx.bind(dst, t);
    Ok(())
}
