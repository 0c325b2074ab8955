//! Numeric conversion lowering.

use prism_ir::{Op, Operand, RegClass, Temp};
use prism_ssa::{Convert, ValueId};

use super::{broadcast_temp, f64_const, split_halves, trunc_to, vector_temp};
use crate::ctx::Context;
use crate::error::{defect, unsupported, SelectError};

pub(super) fn convert(
    ctx: &mut Context,
    dst: ValueId,
    op: Convert,
    src: ValueId,
) -> Result<(), SelectError> {
    let sbits = ctx.func.value(src).ty.comp_bits;
    let dbits = ctx.func.value(dst).ty.comp_bits;
    let rc = ctx.classes.rc(dst);

    let t = match op {
        Convert::SIntToSInt => resize_int(ctx, dst, src, sbits, dbits, true)?,
        Convert::UIntToUInt => resize_int(ctx, dst, src, sbits, dbits, false)?,
        Convert::SIntToFloat => int_to_float(ctx, dst, src, sbits, dbits, true)?,
        Convert::UIntToFloat => int_to_float(ctx, dst, src, sbits, dbits, false)?,
        Convert::FloatToSInt => float_to_int(ctx, dst, src, sbits, dbits, true)?,
        Convert::FloatToUInt => float_to_int(ctx, dst, src, sbits, dbits, false)?,
        Convert::FloatToFloat => float_to_float(ctx, src, sbits, dbits, rc)?,
    };
    ctx.bind(dst, t);
    Ok(())
}

/// Sign/zero extension and truncation between integer widths.
fn resize_int(
    ctx: &mut Context,
    dst: ValueId,
    src: ValueId,
    sbits: u32,
    dbits: u32,
    signed: bool,
) -> Result<Temp, SelectError> {
    let rc = ctx.classes.rc(dst);
    if sbits == dbits {
        let t = ctx.temp_of(src);
        if t.rc() == rc {
            return Ok(t);
        }
        if rc.is_vector() && !t.rc().is_vector() {
            return Ok(broadcast_temp(ctx, t));
        }
        return Ok(ctx.bld().copy(rc, Operand::temp(t)));
    }

    if !rc.is_vector() {
        // Scalar resizes.
        let t = ctx.temp_of(src);
        return Ok(match (sbits, dbits) {
            (8, 32) | (8, 16) if signed => {
                let full = ctx.bld().sop1(Op::SSextI32I8, RegClass::S1, Operand::temp(t));
                narrow_scalar(ctx, full, rc)
            }
            (16, 32) if signed => ctx.bld().sop1(Op::SSextI32I16, rc, Operand::temp(t)),
            (8, 32) | (8, 16) | (16, 32) => {
                let mask = (1u32 << sbits) - 1;
                let full = ctx
                    .bld()
                    .sop2(Op::SAndB32, RegClass::S1, Operand::temp(t), Operand::c32(mask));
                narrow_scalar(ctx, full, rc)
            }
            (32, 64) | (16, 64) | (8, 64) => {
                let lo = if sbits == 32 {
                    t
                } else {
                    // Recurse through the 32-bit form first.
                    let lo_rc = RegClass::S1;
                    if signed {
                        let op = if sbits == 8 {
                            Op::SSextI32I8
                        } else {
                            Op::SSextI32I16
                        };
                        ctx.bld().sop1(op, lo_rc, Operand::temp(t))
                    } else {
                        let mask = (1u32 << sbits) - 1;
                        ctx.bld()
                            .sop2(Op::SAndB32, lo_rc, Operand::temp(t), Operand::c32(mask))
                    }
                };
                let hi = if signed {
                    ctx.bld()
                        .sop2(Op::SAshrI32, RegClass::S1, Operand::temp(lo), Operand::c32(31))
                } else {
                    ctx.bld().sconst(0)
                };
                ctx.create_vector(rc, &[lo, hi])
            }
            (64, _) => {
                let (lo, _) = split_halves(ctx, t);
                narrow_scalar(ctx, lo, rc)
            }
            (32, 16) | (32, 8) | (16, 8) => narrow_scalar(ctx, t, rc),
            _ => return Err(defect(dst, "integer resize widths")),
        });
    }

    // Vector resizes.
    let t = vector_temp(ctx, src);
    Ok(match (sbits.cmp(&dbits), dbits) {
        (std::cmp::Ordering::Less, 64) => {
            let lo = if sbits == 32 {
                t
            } else {
                widen32(ctx, t, signed)
            };
            let hi = if signed {
                ctx.bld().vop2(
                    Op::VAshrrevI32,
                    RegClass::V1,
                    Operand::c32(31),
                    Operand::temp(lo),
                )
            } else {
                ctx.bld().broadcast(Operand::zero(4))
            };
            ctx.create_vector(rc, &[lo, hi])
        }
        (std::cmp::Ordering::Less, _) => {
            let full = widen32(ctx, t, signed);
            trunc_to(ctx, full, rc)
        }
        (std::cmp::Ordering::Greater, _) => {
            let narrow = if sbits == 64 {
                split_halves(ctx, t).0
            } else {
                t
            };
            trunc_to_any(ctx, narrow, rc)
        }
        (std::cmp::Ordering::Equal, _) => unreachable!("handled above"),
    })
}

fn widen32(ctx: &mut Context, t: Temp, signed: bool) -> Temp {
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

fn trunc_to_any(ctx: &mut Context, t: Temp, rc: RegClass) -> Temp {
    if rc.bytes() == t.bytes() {
        return t;
    }
    if rc.bytes() < 4 {
        return trunc_to(ctx, t, rc);
    }
    ctx.bld().copy(rc, Operand::temp(t))
}

/// Scalar registers are dword-granular: a "16-bit" scalar keeps its rounded
/// class, so narrowing below a dword is just a copy of the masked value.
fn narrow_scalar(ctx: &mut Context, t: Temp, rc: RegClass) -> Temp {
    if t.rc() == rc {
        t
    } else {
        ctx.bld().copy(rc, Operand::temp(t))
    }
}

fn int_to_float(
    ctx: &mut Context,
    dst: ValueId,
    src: ValueId,
    sbits: u32,
    dbits: u32,
    signed: bool,
) -> Result<Temp, SelectError> {
    let rc = ctx.classes.rc(dst);
    let gen = ctx.program.gen;
    let s = vector_temp(ctx, src);

    // Normalize the integer to 32 or 64 bits first.
    let s32 = match sbits {
        8 | 16 => Some(widen32(ctx, s, signed)),
        32 => Some(s),
        64 => None,
        _ => return Err(defect(dst, "integer width")),
    };

    match (s32, dbits) {
        (Some(i), 32) => Ok(ctx.bld().vop1(
            if signed { Op::VCvtF32I32 } else { Op::VCvtF32U32 },
            rc,
            Operand::temp(i),
        )),
        (Some(i), 64) => Ok(ctx.bld().vop1(
            if signed { Op::VCvtF64I32 } else { Op::VCvtF64U32 },
            rc,
            Operand::temp(i),
        )),
        (Some(i), 16) => {
            let f = ctx.bld().vop1(
                if signed { Op::VCvtF32I32 } else { Op::VCvtF32U32 },
                RegClass::V1,
                Operand::temp(i),
            );
            Ok(ctx.bld().vop1(Op::VCvtF16F32, rc, Operand::temp(f)))
        }
        (None, 64) => {
            // 64-bit integer: hi * 2^32 + lo, fused to keep the rounding
            // single.
            let (lo, hi) = split_halves(ctx, s);
            let mut bld = ctx.bld();
            let chi = bld.vop1(
                if signed { Op::VCvtF64I32 } else { Op::VCvtF64U32 },
                RegClass::V2,
                Operand::temp(hi),
            );
            let clo = bld.vop1(Op::VCvtF64U32, RegClass::V2, Operand::temp(lo));
            let two32 = f64_const(ctx, 4294967296.0);
            Ok(ctx.bld().vop3(
                Op::VFmaF64,
                rc,
                vec![Operand::temp(chi), Operand::temp(two32), Operand::temp(clo)],
            ))
        }
        (None, 32) => {
            // Via f64 so the double rounding stays within f32 precision for
            // every 64-bit input.
            let (lo, hi) = split_halves(ctx, s);
            let mut bld = ctx.bld();
            let chi = bld.vop1(
                if signed { Op::VCvtF64I32 } else { Op::VCvtF64U32 },
                RegClass::V2,
                Operand::temp(hi),
            );
            let clo = bld.vop1(Op::VCvtF64U32, RegClass::V2, Operand::temp(lo));
            let two32 = f64_const(ctx, 4294967296.0);
            let wide = ctx.bld().vop3(
                Op::VFmaF64,
                RegClass::V2,
                vec![Operand::temp(chi), Operand::temp(two32), Operand::temp(clo)],
            );
            Ok(ctx.bld().vop1(Op::VCvtF32F64, rc, Operand::temp(wide)))
        }
        _ => Err(unsupported(gen, "integer-to-float width combination")),
    }
}

fn float_to_int(
    ctx: &mut Context,
    dst: ValueId,
    src: ValueId,
    sbits: u32,
    dbits: u32,
    signed: bool,
) -> Result<Temp, SelectError> {
    let rc = ctx.classes.rc(dst);
    let s = vector_temp(ctx, src);

    // Normalize the float to 32 or 64 bits.
    let (f, fbits) = match sbits {
        16 => (
            ctx.bld().vop1(Op::VCvtF32F16, RegClass::V1, Operand::temp(s)),
            32,
        ),
        32 => (s, 32),
        64 => (s, 64),
        _ => return Err(defect(dst, "float width")),
    };

    let to_scalar = !rc.is_vector();
    let produced = match (fbits, dbits) {
        (32, d) if d <= 32 => {
            let full = ctx.bld().vop1(
                if signed { Op::VCvtI32F32 } else { Op::VCvtU32F32 },
                RegClass::V1,
                Operand::temp(f),
            );
            narrow_int_result(ctx, full, d, rc, to_scalar)
        }
        (64, d) if d <= 32 => {
            let full = ctx.bld().vop1(
                if signed { Op::VCvtI32F64 } else { Op::VCvtU32F64 },
                RegClass::V1,
                Operand::temp(f),
            );
            narrow_int_result(ctx, full, d, rc, to_scalar)
        }
        (_, 64) => {
            // Split the value into a high dword scaled by 2^-32 and the
            // remainder, converting each half separately.
            let wide = if fbits == 32 {
                ctx.bld().vop1(Op::VCvtF64F32, RegClass::V2, Operand::temp(f))
            } else {
                f
            };
            let t = ctx.bld().vop1(Op::VTruncF64, RegClass::V2, Operand::temp(wide));
            let inv32 = f64_const(ctx, 1.0 / 4294967296.0);
            let scaled = ctx.bld().vop3(
                Op::VMulF64,
                RegClass::V2,
                vec![Operand::temp(t), Operand::temp(inv32)],
            );
            let hi_f = ctx
                .bld()
                .vop1(Op::VFloorF64, RegClass::V2, Operand::temp(scaled));
            let hi = ctx.bld().vop1(
                if signed { Op::VCvtI32F64 } else { Op::VCvtU32F64 },
                RegClass::V1,
                Operand::temp(hi_f),
            );
            let neg32 = f64_const(ctx, -4294967296.0);
            let lo_f = ctx.bld().vop3(
                Op::VFmaF64,
                RegClass::V2,
                vec![Operand::temp(hi_f), Operand::temp(neg32), Operand::temp(t)],
            );
            let lo = ctx
                .bld()
                .vop1(Op::VCvtU32F64, RegClass::V1, Operand::temp(lo_f));
            let v = ctx.create_vector(RegClass::V2, &[lo, hi]);
            if to_scalar {
                uniformize(ctx, v, rc)
            } else {
                v
            }
        }
        _ => return Err(unsupported(ctx.program.gen, "float-to-integer width")),
    };
    Ok(produced)
}

fn narrow_int_result(ctx: &mut Context, full: Temp, dbits: u32, rc: RegClass, to_scalar: bool) -> Temp {
    if to_scalar {
        return uniformize(ctx, full, rc);
    }
    if dbits >= 32 {
        full
    } else {
        trunc_to(ctx, full, rc)
    }
}

/// Bring a provably uniform per-lane value back into scalar registers.
fn uniformize(ctx: &mut Context, t: Temp, rc: RegClass) -> Temp {
    let mut bld = ctx.bld();
    let dst = bld.tmp(rc);
    bld.pseudo(
        Op::PAsUniform,
        vec![Operand::temp(t)],
        vec![prism_ir::Definition::of(dst)],
    );
    dst
}

fn float_to_float(
    ctx: &mut Context,
    src: ValueId,
    sbits: u32,
    dbits: u32,
    rc: RegClass,
) -> Result<Temp, SelectError> {
    let s = vector_temp(ctx, src);
    Ok(match (sbits, dbits) {
        (16, 32) => ctx.bld().vop1(Op::VCvtF32F16, rc, Operand::temp(s)),
        (32, 16) => ctx.bld().vop1(Op::VCvtF16F32, rc, Operand::temp(s)),
        (32, 64) => ctx.bld().vop1(Op::VCvtF64F32, rc, Operand::temp(s)),
        (64, 32) => ctx.bld().vop1(Op::VCvtF32F64, rc, Operand::temp(s)),
        (16, 64) => {
            let mid = ctx.bld().vop1(Op::VCvtF32F16, RegClass::V1, Operand::temp(s));
            ctx.bld().vop1(Op::VCvtF64F32, rc, Operand::temp(mid))
        }
        (64, 16) => {
            let mid = ctx.bld().vop1(Op::VCvtF32F64, RegClass::V1, Operand::temp(s));
            ctx.bld().vop1(Op::VCvtF16F32, rc, Operand::temp(mid))
        }
        _ => {
            let t = ctx.temp_of(src);
            if t.rc() == rc {
                t
            } else {
                ctx.bld().copy(rc, Operand::temp(t))
            }
        }
    })
}

