//! Composite build/extract lowering, backed by the composite-value cache.

use prism_ir::{Op, Operand, RegClass, RegKind, Temp};
use prism_ssa::ValueId;

use super::broadcast_temp;
use crate::ctx::Context;
use crate::error::{defect, SelectError};

pub(super) fn build_vec(ctx: &mut Context, dst: ValueId, srcs: &[ValueId]) -> Result<(), SelectError> {
    let rc = ctx.classes.rc(dst);
    let comp_bits = ctx.func.value(dst).ty.comp_bits;
    if srcs.is_empty() {
        return Err(defect(dst, "empty composite"));
    }
    if rc.kind() == RegKind::Scalar && comp_bits < 32 {
        // Scalar registers are dword-granular, so sub-word components are
        // packed by hand.
        let t = pack_scalar(ctx, rc, comp_bits, srcs);
        ctx.bind(dst, t);
        return Ok(());
    }
    let parts: Vec<Temp> = srcs
        .iter()
        .map(|&s| {
            let t = ctx.temp_of(s);
            if rc.is_vector() && !t.rc().is_vector() {
                broadcast_temp(ctx, t)
            } else {
                t
            }
        })
        .collect();
    let t = ctx.create_vector(rc, &parts);
    ctx.bind(dst, t);
    Ok(())
}

/// Shift/or sub-word uniform components into their dword slots.
fn pack_scalar(ctx: &mut Context, rc: RegClass, comp_bits: u32, srcs: &[ValueId]) -> Temp {
    let mask = (1u32 << comp_bits) - 1;
    let mut dwords: Vec<Temp> = Vec::new();
    let per_dword = 32 / comp_bits;
    for chunk in srcs.chunks(per_dword as usize) {
        let mut acc: Option<Temp> = None;
        for (i, &s) in chunk.iter().enumerate() {
            let raw = ctx.op(s);
            let mut bld = ctx.bld();
            let masked = bld.sop2(Op::SAndB32, RegClass::S1, raw, Operand::c32(mask));
            let placed = if i == 0 {
                masked
            } else {
                bld.sop2(
                    Op::SLshlB32,
                    RegClass::S1,
                    Operand::temp(masked),
                    Operand::c32(i as u32 * comp_bits),
                )
            };
            acc = Some(match acc {
                None => placed,
                Some(prev) => bld.sop2(
                    Op::SOrB32,
                    RegClass::S1,
                    Operand::temp(prev),
                    Operand::temp(placed),
                ),
            });
        }
        dwords.push(acc.expect("chunks are never empty"));
    }
    if dwords.len() == 1 && rc == RegClass::S1 {
        dwords[0]
    } else {
        ctx.create_vector(rc, &dwords)
    }
}

pub(super) fn extract(
    ctx: &mut Context,
    dst: ValueId,
    src: ValueId,
    index: u32,
) -> Result<(), SelectError> {
    let rc = ctx.classes.rc(dst);
    let comp_bytes = ctx.func.value(dst).ty.bytes();
    let src_t = ctx.temp_of(src);
    if (index + 1) * comp_bytes > src_t.bytes() {
        return Err(defect(dst, "component index out of range"));
    }

    let t = if rc.kind() == RegKind::Scalar && comp_bytes < 4 {
        // Scalar components are dword-granular: pull the containing dword
        // and shift the piece down.
        let byte_start = index * comp_bytes;
        let dword = ctx.extract_component(src_t, byte_start / 4, 4);
        let within = byte_start % 4;
        let mut bld = ctx.bld();
        bld.sop2(
            Op::SBfeU32,
            RegClass::S1,
            Operand::temp(dword),
            Operand::c32((comp_bytes * 8) << 16 | within * 8),
        )
    } else {
        let extracted = ctx.extract_component(src_t, index, comp_bytes);
        if extracted.rc() == rc {
            extracted
        } else if rc.is_vector() && !extracted.rc().is_vector() {
            broadcast_temp(ctx, extracted)
        } else {
            ctx.bld().copy(rc, Operand::temp(extracted))
        }
    };
    ctx.bind(dst, t);
    Ok(())
}
