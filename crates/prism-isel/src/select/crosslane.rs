//! Cross-lane operation lowering.
//!
//! Reductions and scans are emitted as single pseudo-instructions with their
//! scratch registers pre-declared; the post-allocation expander turns them
//! into the generation-specific shuffle sequences. Everything else maps to
//! direct lane-access opcodes.

use prism_ir::{
    Definition, DsInfo, InstrExtra, Instruction, Op, Operand, RegClass, ReduceKind, Temp,
};
use prism_ssa::{CrossLaneOp, ReduceOp, ValueId};

use super::cmp::bool_mask;
use super::vector_temp;
use crate::ctx::Context;
use crate::error::{defect, SelectError};

fn map_reduce_op(op: ReduceOp) -> prism_ir::ReduceOp {
    match op {
        ReduceOp::IAdd => prism_ir::ReduceOp::IAdd,
        ReduceOp::IMul => prism_ir::ReduceOp::IMul,
        ReduceOp::IMin => prism_ir::ReduceOp::IMin,
        ReduceOp::IMax => prism_ir::ReduceOp::IMax,
        ReduceOp::UMin => prism_ir::ReduceOp::UMin,
        ReduceOp::UMax => prism_ir::ReduceOp::UMax,
        ReduceOp::And => prism_ir::ReduceOp::And,
        ReduceOp::Or => prism_ir::ReduceOp::Or,
        ReduceOp::Xor => prism_ir::ReduceOp::Xor,
        ReduceOp::FAdd => prism_ir::ReduceOp::FAdd,
        ReduceOp::FMul => prism_ir::ReduceOp::FMul,
        ReduceOp::FMin => prism_ir::ReduceOp::FMin,
        ReduceOp::FMax => prism_ir::ReduceOp::FMax,
    }
}

pub(super) fn cross_lane(
    ctx: &mut Context,
    dst: ValueId,
    op: CrossLaneOp,
    src: ValueId,
    lane: Option<ValueId>,
    data: Option<ValueId>,
) -> Result<(), SelectError> {
    let rc = ctx.classes.rc(dst);
    match op {
        CrossLaneOp::ReadFirstLane => {
            let t = ctx.temp_of(src);
            let result = if !t.rc().is_vector() {
                // Already uniform; keep the value.
                if t.rc() == rc {
                    t
                } else {
                    ctx.bld().copy(rc, Operand::temp(t))
                }
            } else if t.bytes() <= 4 {
                let r = ctx.bld().readfirstlane(Operand::temp(t));
                if r.rc() == rc {
                    r
                } else {
                    ctx.bld().copy(rc, Operand::temp(r))
                }
            } else {
                let dwords = ctx.split_dwords(t);
                let parts: Vec<Temp> = dwords
                    .iter()
                    .map(|&d| ctx.bld().readfirstlane(Operand::temp(d)))
                    .collect();
                ctx.create_vector(rc, &parts)
            };
            ctx.bind(dst, result);
        }
        CrossLaneOp::ReadLane => {
            let Some(lane) = lane else {
                return Err(defect(dst, "read-lane without a lane operand"));
            };
            // The lane index must be uniform; a divergent index is resolved
            // to the first active lane's choice.
            let lane_op = uniform_lane(ctx, lane);
            let t = vector_temp(ctx, src);
            let result = if t.bytes() <= 4 {
                ctx.bld()
                    .vop3(Op::VReadlaneB32, rc, vec![Operand::temp(t), lane_op])
            } else {
                let dwords = ctx.split_dwords(t);
                let parts: Vec<Temp> = dwords
                    .iter()
                    .map(|&d| {
                        ctx.bld().vop3(
                            Op::VReadlaneB32,
                            RegClass::S1,
                            vec![Operand::temp(d), lane_op],
                        )
                    })
                    .collect();
                ctx.create_vector(rc, &parts)
            };
            ctx.bind(dst, result);
        }
        CrossLaneOp::WriteLane => {
            let (Some(lane), Some(data)) = (lane, data) else {
                return Err(defect(dst, "write-lane needs lane and data operands"));
            };
            let lane_op = uniform_lane(ctx, lane);
            let data_op = uniform_lane(ctx, data);
            let t = vector_temp(ctx, src);
            if t.bytes() > 4 {
                return Err(defect(dst, "write-lane beyond one dword"));
            }
            // The old per-lane value rides as a tied third source; the
            // allocator must place it in the destination register.
            let result = ctx.bld().vop3(
                Op::VWritelaneB32,
                rc,
                vec![data_op, lane_op, Operand::temp(t)],
            );
            ctx.bind(dst, result);
        }
        CrossLaneOp::Shuffle => {
            let Some(lane) = lane else {
                return Err(defect(dst, "shuffle without a lane-index operand"));
            };
            let s = vector_temp(ctx, src);
            if s.bytes() > 4 {
                return Err(defect(dst, "shuffle beyond one dword"));
            }
            // The permute unit is byte-addressed: lane index times four.
            let idx = vector_temp(ctx, lane);
            let mut bld = ctx.bld();
            let addr = bld.vop2(
                Op::VLshlrevB32,
                RegClass::V1,
                Operand::c32(2),
                Operand::temp(idx),
            );
            let dst_t = bld.tmp(rc);
            bld.push(Instruction::with_extra(
                Op::DsBpermuteB32,
                vec![Operand::temp(addr), Operand::temp(s)],
                vec![Definition::of(dst_t)],
                InstrExtra::Ds(DsInfo::default()),
            ));
            ctx.bind(dst, dst_t);
        }
        CrossLaneOp::Ballot => {
            let mask = bool_mask(ctx, src);
            let mut bld = ctx.bld();
            let exec = bld.exec();
            let t = bld.mask_op(Op::SAndB32, Op::SAndB64, Operand::temp(mask), exec);
            ctx.bind(dst, t);
        }
        CrossLaneOp::Reduce(rop)
        | CrossLaneOp::InclusiveScan(rop)
        | CrossLaneOp::ExclusiveScan(rop) => {
            let kind = match op {
                CrossLaneOp::Reduce(_) => ReduceKind::Reduce,
                CrossLaneOp::InclusiveScan(_) => ReduceKind::InclusiveScan,
                _ => ReduceKind::ExclusiveScan,
            };
            let pseudo = match kind {
                ReduceKind::Reduce => Op::PReduce,
                ReduceKind::InclusiveScan => Op::PInclusiveScan,
                ReduceKind::ExclusiveScan => Op::PExclusiveScan,
            };
            let s = vector_temp(ctx, src);
            let lm = ctx.program.lane_mask();
            let cluster_size = ctx.program.wave_size.lanes();
            let mut bld = ctx.bld();
            let dst_t = bld.tmp(rc);
            // The expander needs a linear per-lane scratch the width of the
            // source and a scalar scratch mask; both live across the whole
            // shuffle sequence, so they are declared here.
            let vtmp = bld.tmp(RegClass::linear(s.rc().dwords()));
            let stmp = bld.tmp(lm);
            bld.push(Instruction::with_extra(
                pseudo,
                vec![Operand::temp(s)],
                vec![
                    Definition::of(dst_t),
                    Definition::of(vtmp),
                    Definition::of(stmp),
                ],
                InstrExtra::Reduce {
                    op: map_reduce_op(rop),
                    kind,
                    cluster_size,
                },
            ));
            ctx.bind(dst, dst_t);
        }
    }
    Ok(())
}

/// Uniform lane-index operand; divergent indices collapse to the first
/// active lane's value.
fn uniform_lane(ctx: &mut Context, lane: ValueId) -> Operand {
    let t = ctx.temp_of(lane);
    if !t.rc().is_vector() {
        return Operand::temp(t);
    }
    let r = ctx.bld().readfirstlane(Operand::temp(t));
    Operand::temp(r)
}
