//! Arithmetic, logic, and bit-manipulation lowering.

use prism_hw::Generation;
use prism_ir::{Op, Operand, RegClass, Temp};
use prism_ssa::{BinOp, TernOp, UnOp, ValueId};

use super::{split_halves, trunc_to, vector_temp};
use crate::ctx::Context;
use crate::error::{defect, unsupported, SelectError};

/// Widen a sub-word vector operand to a full dword, zero- or sign-extending.
fn widen_vec(ctx: &mut Context, v: ValueId, signed: bool) -> Temp {
    let t = vector_temp(ctx, v);
    if t.bytes() >= 4 {
        return t;
    }
    let bits = t.bytes() * 8;
    let op = if signed { Op::VBfeI32 } else { Op::VBfeU32 };
    ctx.bld().vop3(
        op,
        RegClass::V1,
        vec![Operand::temp(t), Operand::c32(0), Operand::c32(bits)],
    )
}

/// `cvt(f32 op)` wrapper for f16 operations without a native opcode.
fn via_f32<F>(ctx: &mut Context, rc: RegClass, srcs: &[Temp], f: F) -> Temp
where
    F: FnOnce(&mut Context, &[Operand]) -> Temp,
{
    let ups: Vec<Operand> = srcs
        .iter()
        .map(|&s| {
            let up = ctx
                .bld()
                .vop1(Op::VCvtF32F16, RegClass::V1, Operand::temp(s));
            Operand::temp(up)
        })
        .collect();
    let wide = f(ctx, &ups);
    ctx.bld().vop1(Op::VCvtF16F32, rc, Operand::temp(wide))
}

pub(super) fn unary(ctx: &mut Context, dst: ValueId, op: UnOp, src: ValueId) -> Result<(), SelectError> {
    let ty = ctx.func.value(dst).ty;
    let rc = ctx.classes.rc(dst);
    let gen = ctx.program.gen;

    // Packed f16 pairs only support the sign-bit operations directly; the
    // rest must arrive scalarized.
    if ty.comps == 2 && ty.comp_bits == 16 {
        let t = match op {
            UnOp::FNeg => {
                let s = vector_temp(ctx, src);
                ctx.bld()
                    .vop2(Op::VXorB32, rc, Operand::temp(s), Operand::c32(0x8000_8000))
            }
            UnOp::FAbs => {
                let s = vector_temp(ctx, src);
                ctx.bld()
                    .vop2(Op::VAndB32, rc, Operand::temp(s), Operand::c32(0x7fff_7fff))
            }
            _ => return Err(defect(dst, "packed ALU beyond neg/abs must be scalarized")),
        };
        ctx.bind(dst, t);
        return Ok(());
    }
    if ty.comps != 1 {
        return Err(defect(dst, "multi-component ALU must be scalarized"));
    }
    if !ty.is_alu_width() {
        return Err(defect(dst, "non-power-of-two ALU width"));
    }

    let t = match op {
        UnOp::INeg => ineg(ctx, rc, src, gen)?,
        UnOp::INot => inot(ctx, rc, src),
        UnOp::FNeg => float_sign_op(ctx, rc, src, ty.comp_bits, Op::VXorB32, 1 << 31, 0x8000),
        UnOp::FAbs => float_sign_op(ctx, rc, src, ty.comp_bits, Op::VAndB32, !(1u32 << 31), 0x7fff),
        UnOp::FSqrt => float_unop(ctx, rc, src, ty.comp_bits, Op::VSqrtF32, Some(Op::VSqrtF64))?,
        UnOp::FRcp => float_unop(ctx, rc, src, ty.comp_bits, Op::VRcpF32, Some(Op::VRcpF64))?,
        UnOp::FRsq => match ty.comp_bits {
            64 => {
                // No native 64-bit rsq: rcp(sqrt(x)).
                let s = vector_temp(ctx, src);
                let root = ctx.bld().vop1(Op::VSqrtF64, RegClass::V2, Operand::temp(s));
                ctx.bld().vop1(Op::VRcpF64, rc, Operand::temp(root))
            }
            _ => float_unop(ctx, rc, src, ty.comp_bits, Op::VRsqF32, None)?,
        },
        UnOp::FLog2 => float_unop(ctx, rc, src, ty.comp_bits, Op::VLogF32, None)?,
        UnOp::FExp2 => float_unop(ctx, rc, src, ty.comp_bits, Op::VExpF32, None)?,
        UnOp::FSin => sincos(ctx, rc, src, ty.comp_bits, Op::VSinF32)?,
        UnOp::FCos => sincos(ctx, rc, src, ty.comp_bits, Op::VCosF32)?,
        UnOp::FSat => fsat(ctx, rc, src, ty.comp_bits)?,
        UnOp::FFloor => float_unop(ctx, rc, src, ty.comp_bits, Op::VFloorF32, Some(Op::VFloorF64))?,
        UnOp::FCeil => float_unop(ctx, rc, src, ty.comp_bits, Op::VCeilF32, Some(Op::VCeilF64))?,
        UnOp::FTrunc => float_unop(ctx, rc, src, ty.comp_bits, Op::VTruncF32, Some(Op::VTruncF64))?,
        UnOp::FRound => float_unop(ctx, rc, src, ty.comp_bits, Op::VRndneF32, Some(Op::VRndneF64))?,
        UnOp::FFract => float_unop(ctx, rc, src, ty.comp_bits, Op::VFractF32, Some(Op::VFractF64))?,
        UnOp::BitReverse => match (rc.is_vector(), ty.comp_bits) {
            (false, 32) => {
                let s = ctx.op(src);
                ctx.bld().sop1(Op::SBrevB32, rc, s)
            }
            (true, 32) => {
                let s = vector_temp(ctx, src);
                ctx.bld().vop1(Op::VBfrevB32, rc, Operand::temp(s))
            }
            (is_vec, 64) => {
                // Reverse each half and swap them.
                let t = if is_vec {
                    vector_temp(ctx, src)
                } else {
                    ctx.temp_of(src)
                };
                let (lo, hi) = split_halves(ctx, t);
                let (rlo, rhi) = if is_vec {
                    let a = ctx.bld().vop1(Op::VBfrevB32, RegClass::V1, Operand::temp(lo));
                    let b = ctx.bld().vop1(Op::VBfrevB32, RegClass::V1, Operand::temp(hi));
                    (a, b)
                } else {
                    let a = ctx.bld().sop1(Op::SBrevB32, RegClass::S1, Operand::temp(lo));
                    let b = ctx.bld().sop1(Op::SBrevB32, RegClass::S1, Operand::temp(hi));
                    (a, b)
                };
                ctx.create_vector(rc, &[rhi, rlo])
            }
            _ => return Err(unsupported(gen, "sub-word bit reverse")),
        },
        UnOp::BitCount => bit_count(ctx, rc, src, ty.comp_bits)?,
        UnOp::FindLsb => find_bit(ctx, rc, src, ty.comp_bits, false)?,
        UnOp::FindMsb => find_bit(ctx, rc, src, ty.comp_bits, true)?,
    };
    ctx.bind(dst, t);
    Ok(())
}

fn ineg(ctx: &mut Context, rc: RegClass, src: ValueId, gen: Generation) -> Result<Temp, SelectError> {
    match (rc.is_vector(), rc.bytes()) {
        (false, 4) => {
            let s = ctx.op(src);
            Ok(ctx.bld().sop2(Op::SSubI32, rc, Operand::zero(4), s))
        }
        (false, 8) => {
            let t = ctx.temp_of(src);
            let (lo, hi) = split_halves(ctx, t);
            let mut bld = ctx.bld();
            let nlo = bld.sop2(Op::SSubU32, RegClass::S1, Operand::zero(4), Operand::temp(lo));
            let nhi = bld.sop2_carry(Op::SSubbU32, RegClass::S1, Operand::zero(4), Operand::temp(hi));
            Ok(ctx.create_vector(rc, &[nlo, nhi]))
        }
        (true, 8) => {
            let t = vector_temp(ctx, src);
            let (lo, hi) = split_halves(ctx, t);
            let mut bld = ctx.bld();
            let (nlo, borrow) =
                bld.vop2_carry(Op::VSubCoU32, RegClass::V1, Operand::zero(4), Operand::temp(lo));
            let (nhi, _) = bld.vop2_carry_in(
                Op::VSubbCoU32,
                RegClass::V1,
                Operand::zero(4),
                Operand::temp(hi),
                Operand::temp(borrow),
            );
            Ok(ctx.create_vector(rc, &[nlo, nhi]))
        }
        (true, _) => {
            let wide = widen_vec(ctx, src, true);
            let neg = if gen.has_carryless_add() {
                ctx.bld()
                    .vop2(Op::VSubU32, RegClass::V1, Operand::zero(4), Operand::temp(wide))
            } else {
                ctx.bld()
                    .vop2_carry(Op::VSubCoU32, RegClass::V1, Operand::zero(4), Operand::temp(wide))
                    .0
            };
            Ok(trunc_to(ctx, neg, rc))
        }
        _ => Err(defect(src, "scalar sub-word negate")),
    }
}

fn inot(ctx: &mut Context, rc: RegClass, src: ValueId) -> Temp {
    match (rc.is_vector(), rc.bytes() > 4) {
        (false, false) => {
            let s = ctx.op(src);
            ctx.bld().sop1(Op::SNotB32, rc, s)
        }
        (false, true) => {
            let s = ctx.op(src);
            ctx.bld().sop1(Op::SNotB64, rc, s)
        }
        (true, false) => {
            let s = vector_temp(ctx, src);
            let full = ctx.bld().vop1(Op::VNotB32, RegClass::V1, Operand::temp(s));
            trunc_to(ctx, full, rc)
        }
        (true, true) => {
            let t = vector_temp(ctx, src);
            let (lo, hi) = split_halves(ctx, t);
            let nlo = ctx.bld().vop1(Op::VNotB32, RegClass::V1, Operand::temp(lo));
            let nhi = ctx.bld().vop1(Op::VNotB32, RegClass::V1, Operand::temp(hi));
            ctx.create_vector(rc, &[nlo, nhi])
        }
    }
}

/// Sign-bit manipulation for neg/abs; floats are always vector-class.
fn float_sign_op(
    ctx: &mut Context,
    rc: RegClass,
    src: ValueId,
    bits: u32,
    op: Op,
    mask32: u32,
    mask16: u32,
) -> Temp {
    match bits {
        16 => {
            let s = vector_temp(ctx, src);
            ctx.bld().vop2(op, rc, Operand::temp(s), Operand::c32(mask16))
        }
        32 => {
            let s = vector_temp(ctx, src);
            ctx.bld().vop2(op, rc, Operand::temp(s), Operand::c32(mask32))
        }
        _ => {
            let t = vector_temp(ctx, src);
            let (lo, hi) = split_halves(ctx, t);
            let nhi = ctx
                .bld()
                .vop2(op, RegClass::V1, Operand::temp(hi), Operand::c32(mask32));
            ctx.create_vector(rc, &[lo, nhi])
        }
    }
}

fn float_unop(
    ctx: &mut Context,
    rc: RegClass,
    src: ValueId,
    bits: u32,
    op32: Op,
    op64: Option<Op>,
) -> Result<Temp, SelectError> {
    let s = vector_temp(ctx, src);
    match bits {
        32 => Ok(ctx.bld().vop1(op32, rc, Operand::temp(s))),
        64 => match op64 {
            Some(op) => Ok(ctx.bld().vop1(op, rc, Operand::temp(s))),
            None => Err(unsupported(ctx.program.gen, "64-bit transcendental")),
        },
        16 => Ok(via_f32(ctx, rc, &[s], |ctx, ups| {
            ctx.bld().vop1(op32, RegClass::V1, ups[0])
        })),
        _ => Err(defect(src, "float width")),
    }
}

/// The hardware trig units take revolutions, not radians: scale by 1/2pi
/// before the opcode.
fn sincos(
    ctx: &mut Context,
    rc: RegClass,
    src: ValueId,
    bits: u32,
    op32: Op,
) -> Result<Temp, SelectError> {
    let two_pi_inv = Operand::c32((0.159_154_94_f32).to_bits());
    match bits {
        32 => {
            let s = vector_temp(ctx, src);
            let mut bld = ctx.bld();
            let scaled = bld.vop2(Op::VMulF32, RegClass::V1, Operand::temp(s), two_pi_inv);
            Ok(bld.vop1(op32, rc, Operand::temp(scaled)))
        }
        16 => {
            let s = vector_temp(ctx, src);
            Ok(via_f32(ctx, rc, &[s], |ctx, ups| {
                let mut bld = ctx.bld();
                let scaled = bld.vop2(Op::VMulF32, RegClass::V1, ups[0], two_pi_inv);
                bld.vop1(op32, RegClass::V1, Operand::temp(scaled))
            }))
        }
        _ => Err(unsupported(ctx.program.gen, "64-bit trigonometry")),
    }
}

/// Clamp to [0, 1] with a single median when the width allows it.
fn fsat(ctx: &mut Context, rc: RegClass, src: ValueId, bits: u32) -> Result<Temp, SelectError> {
    match bits {
        32 => {
            let s = vector_temp(ctx, src);
            Ok(ctx.bld().vop3(
                Op::VMed3F32,
                rc,
                vec![
                    Operand::temp(s),
                    Operand::zero(4),
                    Operand::c32(1.0f32.to_bits()),
                ],
            ))
        }
        16 => {
            let s = vector_temp(ctx, src);
            Ok(via_f32(ctx, rc, &[s], |ctx, ups| {
                ctx.bld().vop3(
                    Op::VMed3F32,
                    RegClass::V1,
                    vec![ups[0], Operand::zero(4), Operand::c32(1.0f32.to_bits())],
                )
            }))
        }
        64 => {
            // No 64-bit median: clamp through max then min.
            let s = vector_temp(ctx, src);
            let one = super::f64_const(ctx, 1.0);
            let zero = super::f64_const(ctx, 0.0);
            let mut bld = ctx.bld();
            let low = bld.vop3(
                Op::VMaxF64,
                RegClass::V2,
                vec![Operand::temp(s), Operand::temp(zero)],
            );
            Ok(bld.vop3(
                Op::VMinF64,
                rc,
                vec![Operand::temp(low), Operand::temp(one)],
            ))
        }
        _ => Err(defect(src, "float width")),
    }
}

fn bit_count(ctx: &mut Context, rc: RegClass, src: ValueId, bits: u32) -> Result<Temp, SelectError> {
    let src_bytes = ctx.func.value(src).ty.bytes();
    match (rc.is_vector(), bits) {
        (false, 32) => {
            let s = ctx.op(src);
            Ok(ctx.bld().sop1(if src_bytes > 4 { Op::SBcnt1I32B64 } else { Op::SBcnt1I32B32 }, rc, s))
        }
        (true, 32) if src_bytes <= 4 => {
            let s = vector_temp(ctx, src);
            Ok(ctx
                .bld()
                .vop3(Op::VBcntU32B32, rc, vec![Operand::temp(s), Operand::zero(4)]))
        }
        (true, 32) => {
            let t = vector_temp(ctx, src);
            let (lo, hi) = split_halves(ctx, t);
            let mut bld = ctx.bld();
            let c0 = bld.vop3(
                Op::VBcntU32B32,
                RegClass::V1,
                vec![Operand::temp(lo), Operand::zero(4)],
            );
            Ok(bld.vop3(
                Op::VBcntU32B32,
                rc,
                vec![Operand::temp(hi), Operand::temp(c0)],
            ))
        }
        _ => Err(defect(src, "bit count result is 32-bit")),
    }
}

fn find_bit(
    ctx: &mut Context,
    rc: RegClass,
    src: ValueId,
    bits: u32,
    msb: bool,
) -> Result<Temp, SelectError> {
    let src_bytes = ctx.func.value(src).ty.bytes();
    if bits != 32 {
        return Err(defect(src, "find-bit result is 32-bit"));
    }
    if !rc.is_vector() {
        let s = ctx.op(src);
        let op = match (msb, src_bytes > 4) {
            (false, false) => Op::SFf1I32B32,
            (false, true) => Op::SFf1I32B64,
            (true, false) => Op::SFlbitI32B32,
            (true, true) => return Err(unsupported(ctx.program.gen, "64-bit scalar find-msb")),
        };
        return Ok(ctx.bld().sop1(op, rc, s));
    }
    let op = if msb { Op::VFfbhU32 } else { Op::VFfblB32 };
    if src_bytes <= 4 {
        let s = vector_temp(ctx, src);
        return Ok(ctx.bld().vop1(op, rc, Operand::temp(s)));
    }
    // 64-bit: search one half, fall back to the other with a +32 bias.
    let t = vector_temp(ctx, src);
    let (lo, hi) = split_halves(ctx, t);
    let (first, second) = if msb { (hi, lo) } else { (lo, hi) };
    let mut bld = ctx.bld();
    let a = bld.vop1(op, RegClass::V1, Operand::temp(first));
    let b = bld.vop1(op, RegClass::V1, Operand::temp(second));
    let b32 = bld.vop2(Op::VAddU32, RegClass::V1, Operand::temp(b), Operand::c32(32));
    let none = bld.vopc(Op::VCmpEqU32, Operand::temp(a), Operand::c32(u32::MAX));
    let mut bld = ctx.bld();
    let sel = bld.cndmask(Operand::temp(a), Operand::temp(b32), Operand::temp(none));
    debug_assert_eq!(rc, RegClass::V1);
    Ok(sel)
}

pub(super) fn binary(
    ctx: &mut Context,
    dst: ValueId,
    op: BinOp,
    lhs: ValueId,
    rhs: ValueId,
) -> Result<(), SelectError> {
    let ty = ctx.func.value(dst).ty;
    let rc = ctx.classes.rc(dst);
    let gen = ctx.program.gen;

    if ty.comps == 2 && ty.comp_bits == 16 {
        let t = packed_binary(ctx, rc, op, lhs, rhs)?;
        ctx.bind(dst, t);
        return Ok(());
    }
    if ty.comps != 1 {
        return Err(defect(dst, "multi-component ALU must be scalarized"));
    }
    if !ty.is_alu_width() {
        return Err(defect(dst, "non-power-of-two ALU width"));
    }

    let t = if op.is_float() {
        float_binary(ctx, rc, op, lhs, rhs, ty.comp_bits)?
    } else {
        match ty.comp_bits {
            32 => int32_binary(ctx, rc, op, lhs, rhs, gen)?,
            64 => int64_binary(ctx, rc, op, lhs, rhs, gen)?,
            16 if rc.is_vector() => int16_binary(ctx, rc, op, lhs, rhs)?,
            8 if rc.is_vector() => int8_binary(ctx, rc, op, lhs, rhs, gen)?,
            _ => return Err(defect(dst, "sub-word scalar ALU")),
        }
    };
    ctx.bind(dst, t);
    Ok(())
}

fn packed_binary(
    ctx: &mut Context,
    rc: RegClass,
    op: BinOp,
    lhs: ValueId,
    rhs: ValueId,
) -> Result<Temp, SelectError> {
    let gen = ctx.program.gen;
    let pk = match op {
        BinOp::FAdd => Some(Op::VPkAddF16),
        BinOp::FMul => Some(Op::VPkMulF16),
        BinOp::IAdd => Some(Op::VPkAddU16),
        BinOp::ISub => Some(Op::VPkSubU16),
        BinOp::IMul => Some(Op::VPkMulLoU16),
        _ => None,
    };
    let a = vector_temp(ctx, lhs);
    let b = vector_temp(ctx, rhs);
    match pk {
        Some(pk) if gen.has_packed_fp16() => Ok(ctx
            .bld()
            .vop3(pk, rc, vec![Operand::temp(a), Operand::temp(b)])),
        Some(_) => {
            // Pre-packed-ALU generations process the two halves separately
            // and reassemble with a bitfield insert.
            let half_op = match op {
                BinOp::FAdd => Op::VAddF16,
                BinOp::FMul => Op::VMulF16,
                BinOp::IAdd => Op::VAddU16,
                BinOp::ISub => Op::VSubU16,
                BinOp::IMul => Op::VMulLoU16,
                _ => unreachable!(),
            };
            let mut bld = ctx.bld();
            let lo = bld.vop2(half_op, RegClass::V1, Operand::temp(a), Operand::temp(b));
            let ah = bld.vop2(
                Op::VLshrrevB32,
                RegClass::V1,
                Operand::c32(16),
                Operand::temp(a),
            );
            let bh = bld.vop2(
                Op::VLshrrevB32,
                RegClass::V1,
                Operand::c32(16),
                Operand::temp(b),
            );
            let hi = bld.vop2(half_op, RegClass::V1, Operand::temp(ah), Operand::temp(bh));
            let hi_shifted = bld.vop2(
                Op::VLshlrevB32,
                RegClass::V1,
                Operand::c32(16),
                Operand::temp(hi),
            );
            Ok(bld.vop3(
                Op::VBfiB32,
                rc,
                vec![
                    Operand::c32(0xffff),
                    Operand::temp(lo),
                    Operand::temp(hi_shifted),
                ],
            ))
        }
        None => Err(unsupported(gen, "packed 16-bit operation")),
    }
}

fn float_binary(
    ctx: &mut Context,
    rc: RegClass,
    op: BinOp,
    lhs: ValueId,
    rhs: ValueId,
    bits: u32,
) -> Result<Temp, SelectError> {
    let a = vector_temp(ctx, lhs);
    let b = vector_temp(ctx, rhs);
    let (op16, op32, op64) = match op {
        BinOp::FAdd => (Op::VAddF16, Op::VAddF32, Some(Op::VAddF64)),
        BinOp::FSub => (Op::VSubF16, Op::VSubF32, None),
        BinOp::FMul => (Op::VMulF16, Op::VMulF32, Some(Op::VMulF64)),
        BinOp::FMin => (Op::VMinF32, Op::VMinF32, Some(Op::VMinF64)),
        BinOp::FMax => (Op::VMaxF32, Op::VMaxF32, Some(Op::VMaxF64)),
        _ => unreachable!("float_binary on an integer op"),
    };
    match bits {
        16 if matches!(op, BinOp::FMin | BinOp::FMax) => Ok(via_f32(ctx, rc, &[a, b], |ctx, u| {
            ctx.bld().vop2(op32, RegClass::V1, u[0], u[1])
        })),
        16 => Ok(ctx.bld().vop2(op16, rc, Operand::temp(a), Operand::temp(b))),
        32 => Ok(ctx.bld().vop2(op32, rc, Operand::temp(a), Operand::temp(b))),
        64 => match (op, op64) {
            (_, Some(o)) => Ok(ctx
                .bld()
                .vop3(o, rc, vec![Operand::temp(a), Operand::temp(b)])),
            (BinOp::FSub, None) => {
                // a - b as a + (-b): flip b's sign bit.
                let (blo, bhi) = split_halves(ctx, b);
                let nhi = ctx.bld().vop2(
                    Op::VXorB32,
                    RegClass::V1,
                    Operand::temp(bhi),
                    Operand::c32(1 << 31),
                );
                let nb = ctx.create_vector(RegClass::V2, &[blo, nhi]);
                Ok(ctx.bld().vop3(
                    Op::VAddF64,
                    rc,
                    vec![Operand::temp(a), Operand::temp(nb)],
                ))
            }
            _ => Err(unsupported(ctx.program.gen, "64-bit float operation")),
        },
        _ => Err(defect(lhs, "float width")),
    }
}

/// Both operand ranges fit 24 bits, so the cheaper 24-bit multiply applies.
fn fits_mul24(ctx: &Context, lhs: ValueId, rhs: ValueId) -> bool {
    let fits = |v: ValueId| {
        ctx.func
            .value(v)
            .range_max
            .is_some_and(|m| m < (1 << 24))
    };
    fits(lhs) && fits(rhs)
}

fn int32_binary(
    ctx: &mut Context,
    rc: RegClass,
    op: BinOp,
    lhs: ValueId,
    rhs: ValueId,
    gen: Generation,
) -> Result<Temp, SelectError> {
    if !rc.is_vector() {
        let a = ctx.op(lhs);
        let b = ctx.op(rhs);
        let sop = match op {
            BinOp::IAdd => Op::SAddU32,
            BinOp::ISub => Op::SSubU32,
            BinOp::IMul => Op::SMulI32,
            BinOp::UMulHi if gen >= Generation::Gfx9 => Op::SMulHiU32,
            BinOp::IMulHi if gen >= Generation::Gfx9 => Op::SMulHiI32,
            BinOp::UMulHi | BinOp::IMulHi => {
                // No scalar high multiply here: compute per lane, read back.
                let signed = matches!(op, BinOp::IMulHi);
                let va = ctx.bld().broadcast(a);
                let v = ctx.bld().vop3(
                    if signed { Op::VMulHiI32 } else { Op::VMulHiU32 },
                    RegClass::V1,
                    vec![Operand::temp(va), b],
                );
                return Ok(ctx.bld().readfirstlane(Operand::temp(v)));
            }
            BinOp::IAnd => Op::SAndB32,
            BinOp::IOr => Op::SOrB32,
            BinOp::IXor => Op::SXorB32,
            BinOp::IShl => Op::SLshlB32,
            BinOp::UShr => Op::SLshrB32,
            BinOp::IAshr => Op::SAshrI32,
            BinOp::UMin => Op::SMinU32,
            BinOp::UMax => Op::SMaxU32,
            BinOp::IMin => Op::SMinI32,
            BinOp::IMax => Op::SMaxI32,
            _ => unreachable!(),
        };
        return Ok(ctx.bld().sop2(sop, rc, a, b));
    }

    let a = vector_temp(ctx, lhs);
    let b = vector_temp(ctx, rhs);
    let (a, b) = (Operand::temp(a), Operand::temp(b));
    let t = match op {
        BinOp::IAdd if gen.has_carryless_add() => ctx.bld().vop2(Op::VAddU32, rc, a, b),
        BinOp::IAdd => ctx.bld().vop2_carry(Op::VAddCoU32, rc, a, b).0,
        BinOp::ISub if gen.has_carryless_add() => ctx.bld().vop2(Op::VSubU32, rc, a, b),
        BinOp::ISub => ctx.bld().vop2_carry(Op::VSubCoU32, rc, a, b).0,
        BinOp::IMul if fits_mul24(ctx, lhs, rhs) => ctx.bld().vop2(Op::VMulU32U24, rc, a, b),
        BinOp::IMul => ctx.bld().vop3(Op::VMulLoU32, rc, vec![a, b]),
        BinOp::UMulHi if fits_mul24(ctx, lhs, rhs) => ctx.bld().vop2(Op::VMulHiU32U24, rc, a, b),
        BinOp::UMulHi => ctx.bld().vop3(Op::VMulHiU32, rc, vec![a, b]),
        BinOp::IMulHi => ctx.bld().vop3(Op::VMulHiI32, rc, vec![a, b]),
        BinOp::IAnd => ctx.bld().vop2(Op::VAndB32, rc, a, b),
        BinOp::IOr => ctx.bld().vop2(Op::VOrB32, rc, a, b),
        BinOp::IXor => ctx.bld().vop2(Op::VXorB32, rc, a, b),
        // Vector shifts take the count first.
        BinOp::IShl => ctx.bld().vop2(Op::VLshlrevB32, rc, b, a),
        BinOp::UShr => ctx.bld().vop2(Op::VLshrrevB32, rc, b, a),
        BinOp::IAshr => ctx.bld().vop2(Op::VAshrrevI32, rc, b, a),
        BinOp::UMin => ctx.bld().vop2(Op::VMinU32, rc, a, b),
        BinOp::UMax => ctx.bld().vop2(Op::VMaxU32, rc, a, b),
        BinOp::IMin => ctx.bld().vop2(Op::VMinI32, rc, a, b),
        BinOp::IMax => ctx.bld().vop2(Op::VMaxI32, rc, a, b),
        _ => unreachable!(),
    };
    Ok(t)
}

fn int16_binary(
    ctx: &mut Context,
    rc: RegClass,
    op: BinOp,
    lhs: ValueId,
    rhs: ValueId,
) -> Result<Temp, SelectError> {
    let a = vector_temp(ctx, lhs);
    let b = vector_temp(ctx, rhs);
    let (a, b) = (Operand::temp(a), Operand::temp(b));
    let t = match op {
        BinOp::IAdd => ctx.bld().vop2(Op::VAddU16, rc, a, b),
        BinOp::ISub => ctx.bld().vop2(Op::VSubU16, rc, a, b),
        BinOp::IMul => ctx.bld().vop2(Op::VMulLoU16, rc, a, b),
        BinOp::IAnd => {
            let full = ctx.bld().vop2(Op::VAndB32, RegClass::V1, a, b);
            trunc_to(ctx, full, rc)
        }
        BinOp::IOr => {
            let full = ctx.bld().vop2(Op::VOrB32, RegClass::V1, a, b);
            trunc_to(ctx, full, rc)
        }
        BinOp::IXor => {
            let full = ctx.bld().vop2(Op::VXorB32, RegClass::V1, a, b);
            trunc_to(ctx, full, rc)
        }
        BinOp::IShl => ctx.bld().vop2(Op::VLshlrevB16, rc, b, a),
        BinOp::UShr => ctx.bld().vop2(Op::VLshrrevB16, rc, b, a),
        BinOp::IAshr => ctx.bld().vop2(Op::VAshrrevI16, rc, b, a),
        BinOp::UMin => ctx.bld().vop2(Op::VMinU16, rc, a, b),
        BinOp::UMax => ctx.bld().vop2(Op::VMaxU16, rc, a, b),
        BinOp::IMin => ctx.bld().vop2(Op::VMinI16, rc, a, b),
        BinOp::IMax => ctx.bld().vop2(Op::VMaxI16, rc, a, b),
        BinOp::UMulHi | BinOp::IMulHi => {
            // Widen, multiply in 32 bits, take the upper half of the 16-bit
            // product space.
            let signed = matches!(op, BinOp::IMulHi);
            let wa = widen_vec(ctx, lhs, signed);
            let wb = widen_vec(ctx, rhs, signed);
            let prod = ctx.bld().vop3(
                Op::VMulLoU32,
                RegClass::V1,
                vec![Operand::temp(wa), Operand::temp(wb)],
            );
            let hi = ctx.bld().vop2(
                Op::VLshrrevB32,
                RegClass::V1,
                Operand::c32(16),
                Operand::temp(prod),
            );
            trunc_to(ctx, hi, rc)
        }
        _ => return Err(defect(lhs, "float op on integer path")),
    };
    Ok(t)
}

/// 8-bit ALU has no direct opcodes on any generation: widen to a dword,
/// operate, and extract the low byte back out.
fn int8_binary(
    ctx: &mut Context,
    rc: RegClass,
    op: BinOp,
    lhs: ValueId,
    rhs: ValueId,
    gen: Generation,
) -> Result<Temp, SelectError> {
    let signed = matches!(op, BinOp::IAshr | BinOp::IMin | BinOp::IMax | BinOp::IMulHi);
    let wa = widen_vec(ctx, lhs, signed);
    let wb = widen_vec(ctx, rhs, signed);
    let (a, b) = (Operand::temp(wa), Operand::temp(wb));
    let full = match op {
        BinOp::IAdd if gen.has_carryless_add() => ctx.bld().vop2(Op::VAddU32, RegClass::V1, a, b),
        BinOp::IAdd => ctx.bld().vop2_carry(Op::VAddCoU32, RegClass::V1, a, b).0,
        BinOp::ISub if gen.has_carryless_add() => ctx.bld().vop2(Op::VSubU32, RegClass::V1, a, b),
        BinOp::ISub => ctx.bld().vop2_carry(Op::VSubCoU32, RegClass::V1, a, b).0,
        BinOp::IMul => ctx.bld().vop2(Op::VMulU32U24, RegClass::V1, a, b),
        BinOp::IAnd => ctx.bld().vop2(Op::VAndB32, RegClass::V1, a, b),
        BinOp::IOr => ctx.bld().vop2(Op::VOrB32, RegClass::V1, a, b),
        BinOp::IXor => ctx.bld().vop2(Op::VXorB32, RegClass::V1, a, b),
        BinOp::IShl => ctx.bld().vop2(Op::VLshlrevB32, RegClass::V1, b, a),
        BinOp::UShr => ctx.bld().vop2(Op::VLshrrevB32, RegClass::V1, b, a),
        BinOp::IAshr => ctx.bld().vop2(Op::VAshrrevI32, RegClass::V1, b, a),
        BinOp::UMin => ctx.bld().vop2(Op::VMinU32, RegClass::V1, a, b),
        BinOp::UMax => ctx.bld().vop2(Op::VMaxU32, RegClass::V1, a, b),
        BinOp::IMin => ctx.bld().vop2(Op::VMinI32, RegClass::V1, a, b),
        BinOp::IMax => ctx.bld().vop2(Op::VMaxI32, RegClass::V1, a, b),
        BinOp::UMulHi | BinOp::IMulHi => {
            let prod = ctx.bld().vop2(Op::VMulU32U24, RegClass::V1, a, b);
            ctx.bld().vop2(
                Op::VLshrrevB32,
                RegClass::V1,
                Operand::c32(8),
                Operand::temp(prod),
            )
        }
        _ => return Err(defect(lhs, "float op on integer path")),
    };
    Ok(trunc_to(ctx, full, rc))
}

fn int64_binary(
    ctx: &mut Context,
    rc: RegClass,
    op: BinOp,
    lhs: ValueId,
    rhs: ValueId,
    gen: Generation,
) -> Result<Temp, SelectError> {
    let vector = rc.is_vector();
    match op {
        BinOp::IAnd | BinOp::IOr | BinOp::IXor if !vector => {
            let a = ctx.op(lhs);
            let b = ctx.op(rhs);
            let sop = match op {
                BinOp::IAnd => Op::SAndB64,
                BinOp::IOr => Op::SOrB64,
                _ => Op::SXorB64,
            };
            return Ok(ctx.bld().sop2(sop, rc, a, b));
        }
        BinOp::IShl | BinOp::UShr | BinOp::IAshr if !vector => {
            let a = ctx.op(lhs);
            let b = shift_amount(ctx, rhs);
            let sop = match op {
                BinOp::IShl => Op::SLshlB64,
                BinOp::UShr => Op::SLshrB64,
                _ => Op::SAshrI64,
            };
            return Ok(ctx.bld().sop2(sop, rc, a, b));
        }
        BinOp::IShl | BinOp::UShr | BinOp::IAshr => {
            let a = vector_temp(ctx, lhs);
            let b = shift_amount(ctx, rhs);
            let vop = match op {
                BinOp::IShl => Op::VLshlrevB64,
                BinOp::UShr => Op::VLshrrevB64,
                _ => Op::VAshrrevI64,
            };
            return Ok(ctx.bld().vop3(vop, rc, vec![b, Operand::temp(a)]));
        }
        _ => {}
    }

    let (alo, ahi) = super::halves(ctx, lhs, vector);
    let (blo, bhi) = super::halves(ctx, rhs, vector);
    match op {
        BinOp::IAdd | BinOp::ISub => {
            let sub = matches!(op, BinOp::ISub);
            if vector {
                let mut bld = ctx.bld();
                let (lo_op, hi_op) = if sub {
                    (Op::VSubCoU32, Op::VSubbCoU32)
                } else {
                    (Op::VAddCoU32, Op::VAddcCoU32)
                };
                let (lo, carry) =
                    bld.vop2_carry(lo_op, RegClass::V1, Operand::temp(alo), Operand::temp(blo));
                let (hi, _) = bld.vop2_carry_in(
                    hi_op,
                    RegClass::V1,
                    Operand::temp(ahi),
                    Operand::temp(bhi),
                    Operand::temp(carry),
                );
                Ok(ctx.create_vector(rc, &[lo, hi]))
            } else {
                let mut bld = ctx.bld();
                let (lo_op, hi_op) = if sub {
                    (Op::SSubU32, Op::SSubbU32)
                } else {
                    (Op::SAddU32, Op::SAddcU32)
                };
                let lo = bld.sop2(lo_op, RegClass::S1, Operand::temp(alo), Operand::temp(blo));
                let hi =
                    bld.sop2_carry(hi_op, RegClass::S1, Operand::temp(ahi), Operand::temp(bhi));
                Ok(ctx.create_vector(rc, &[lo, hi]))
            }
        }
        BinOp::IAnd | BinOp::IOr | BinOp::IXor => {
            let vop = match op {
                BinOp::IAnd => Op::VAndB32,
                BinOp::IOr => Op::VOrB32,
                _ => Op::VXorB32,
            };
            let mut bld = ctx.bld();
            let lo = bld.vop2(vop, RegClass::V1, Operand::temp(alo), Operand::temp(blo));
            let hi = bld.vop2(vop, RegClass::V1, Operand::temp(ahi), Operand::temp(bhi));
            Ok(ctx.create_vector(rc, &[lo, hi]))
        }
        BinOp::IMul => {
            // lo = alo*blo; hi = mulhi(alo,blo) + alo*bhi + ahi*blo.
            if vector {
                let mut bld = ctx.bld();
                let lo = bld.vop3(
                    Op::VMulLoU32,
                    RegClass::V1,
                    vec![Operand::temp(alo), Operand::temp(blo)],
                );
                let carry = bld.vop3(
                    Op::VMulHiU32,
                    RegClass::V1,
                    vec![Operand::temp(alo), Operand::temp(blo)],
                );
                let cross0 = bld.vop3(
                    Op::VMulLoU32,
                    RegClass::V1,
                    vec![Operand::temp(alo), Operand::temp(bhi)],
                );
                let cross1 = bld.vop3(
                    Op::VMulLoU32,
                    RegClass::V1,
                    vec![Operand::temp(ahi), Operand::temp(blo)],
                );
                let hi = if gen >= Generation::Gfx9 {
                    let s = bld.vop3(
                        Op::VAdd3U32,
                        RegClass::V1,
                        vec![
                            Operand::temp(carry),
                            Operand::temp(cross0),
                            Operand::temp(cross1),
                        ],
                    );
                    s
                } else {
                    let s = bld.vop2_carry(
                        Op::VAddCoU32,
                        RegClass::V1,
                        Operand::temp(carry),
                        Operand::temp(cross0),
                    );
                    bld.vop2_carry(
                        Op::VAddCoU32,
                        RegClass::V1,
                        Operand::temp(s.0),
                        Operand::temp(cross1),
                    )
                    .0
                };
                Ok(ctx.create_vector(rc, &[lo, hi]))
            } else {
                if gen < Generation::Gfx9 {
                    return Err(unsupported(gen, "64-bit scalar multiply needs s_mul_hi"));
                }
                let mut bld = ctx.bld();
                let lo = bld.sop2(Op::SMulI32, RegClass::S1, Operand::temp(alo), Operand::temp(blo));
                let carry =
                    bld.sop2(Op::SMulHiU32, RegClass::S1, Operand::temp(alo), Operand::temp(blo));
                let cross0 =
                    bld.sop2(Op::SMulI32, RegClass::S1, Operand::temp(alo), Operand::temp(bhi));
                let cross1 =
                    bld.sop2(Op::SMulI32, RegClass::S1, Operand::temp(ahi), Operand::temp(blo));
                let s0 = bld.sop2(
                    Op::SAddU32,
                    RegClass::S1,
                    Operand::temp(carry),
                    Operand::temp(cross0),
                );
                let hi = bld.sop2(
                    Op::SAddU32,
                    RegClass::S1,
                    Operand::temp(s0),
                    Operand::temp(cross1),
                );
                Ok(ctx.create_vector(rc, &[lo, hi]))
            }
        }
        BinOp::UMin | BinOp::UMax | BinOp::IMin | BinOp::IMax => {
            if !vector {
                return Err(unsupported(gen, "64-bit scalar min/max"));
            }
            let cmp_op = match op {
                BinOp::UMin => Op::VCmpLtU64,
                BinOp::UMax => Op::VCmpGtU64,
                BinOp::IMin => Op::VCmpLtI64,
                _ => Op::VCmpGtI64,
            };
            let a = ctx.create_vector(RegClass::V2, &[alo, ahi]);
            let b = ctx.create_vector(RegClass::V2, &[blo, bhi]);
            let mask = ctx
                .bld()
                .vopc(cmp_op, Operand::temp(a), Operand::temp(b));
            let mut bld = ctx.bld();
            let lo = bld.cndmask(Operand::temp(blo), Operand::temp(alo), Operand::temp(mask));
            let hi = bld.cndmask(Operand::temp(bhi), Operand::temp(ahi), Operand::temp(mask));
            Ok(ctx.create_vector(rc, &[lo, hi]))
        }
        BinOp::UMulHi | BinOp::IMulHi => Err(unsupported(gen, "64-bit high multiply")),
        _ => unreachable!("float op routed to float_binary"),
    }
}

/// Shift counts are consumed as the low dword regardless of the declared
/// operand width.
fn shift_amount(ctx: &mut Context, v: ValueId) -> Operand {
    let t = ctx.temp_of(v);
    if t.bytes() <= 4 {
        return Operand::temp(t);
    }
    let (lo, _) = split_halves(ctx, t);
    Operand::temp(lo)
}

pub(super) fn ternary(
    ctx: &mut Context,
    dst: ValueId,
    op: TernOp,
    a: ValueId,
    b: ValueId,
    c: ValueId,
) -> Result<(), SelectError> {
    let ty = ctx.func.value(dst).ty;
    let rc = ctx.classes.rc(dst);
    let gen = ctx.program.gen;

    if ty.comps == 2 && ty.comp_bits == 16 {
        if op != TernOp::FFma {
            return Err(defect(dst, "packed ternary beyond fma"));
        }
        if !gen.has_packed_fp16() {
            return Err(unsupported(gen, "packed fma"));
        }
        let va = vector_temp(ctx, a);
        let vb = vector_temp(ctx, b);
        let vc = vector_temp(ctx, c);
        let t = ctx.bld().vop3(
            Op::VPkFmaF16,
            rc,
            vec![Operand::temp(va), Operand::temp(vb), Operand::temp(vc)],
        );
        ctx.bind(dst, t);
        return Ok(());
    }
    if ty.comps != 1 {
        return Err(defect(dst, "multi-component ALU must be scalarized"));
    }

    let t = match op {
        TernOp::FFma => {
            let va = vector_temp(ctx, a);
            let vb = vector_temp(ctx, b);
            let vc = vector_temp(ctx, c);
            let ops = vec![Operand::temp(va), Operand::temp(vb), Operand::temp(vc)];
            match ty.comp_bits {
                16 => ctx.bld().vop3(Op::VFmaF16, rc, ops),
                32 => ctx.bld().vop3(Op::VFmaF32, rc, ops),
                64 => ctx.bld().vop3(Op::VFmaF64, rc, ops),
                _ => return Err(defect(dst, "float width")),
            }
        }
        TernOp::UBfe | TernOp::IBfe => {
            let signed = op == TernOp::IBfe;
            if rc.is_vector() {
                let val = vector_temp(ctx, a);
                let off = vector_temp(ctx, b);
                let width = vector_temp(ctx, c);
                ctx.bld().vop3(
                    if signed { Op::VBfeI32 } else { Op::VBfeU32 },
                    rc,
                    vec![
                        Operand::temp(val),
                        Operand::temp(off),
                        Operand::temp(width),
                    ],
                )
            } else {
                // The scalar form packs offset | width<<16 into one source.
                let val = ctx.op(a);
                let off = ctx.op(b);
                let width = ctx.op(c);
                let mut bld = ctx.bld();
                let wshift = bld.sop2(Op::SLshlB32, RegClass::S1, width, Operand::c32(16));
                let packed = bld.sop2(Op::SOrB32, RegClass::S1, off, Operand::temp(wshift));
                bld.sop2(
                    if signed { Op::SBfeI32 } else { Op::SBfeU32 },
                    rc,
                    val,
                    Operand::temp(packed),
                )
            }
        }
        TernOp::Bfi => {
            // dst = (a & b) | (c & ~b): the hardware op wants the mask first.
            if rc.is_vector() {
                let va = vector_temp(ctx, a);
                let vb = vector_temp(ctx, b);
                let vc = vector_temp(ctx, c);
                ctx.bld().vop3(
                    Op::VBfiB32,
                    rc,
                    vec![Operand::temp(vb), Operand::temp(va), Operand::temp(vc)],
                )
            } else {
                let oa = ctx.op(a);
                let ob = ctx.op(b);
                let oc = ctx.op(c);
                let mut bld = ctx.bld();
                let picked = bld.sop2(Op::SAndB32, RegClass::S1, oa, ob);
                let kept = bld.sop2(Op::SAndn2B32, RegClass::S1, oc, ob);
                bld.sop2(Op::SOrB32, rc, Operand::temp(picked), Operand::temp(kept))
            }
        }
    };
    ctx.bind(dst, t);
    Ok(())
}
