//! Register-class inference.
//!
//! Before any instruction is emitted, every source value is assigned the
//! storage class its result will live in: wave-uniform scalar or per-lane
//! vector. The default rule follows the divergence annotation; certain
//! operation families are hard-pinned to vector regardless (float ALU, which
//! has no scalar opcodes; sub-32-bit packed arithmetic; per-lane memory
//! results; cross-lane vector data). Classes only ever escalate scalar →
//! vector, so the phi fixed-point below runs over a two-level lattice and
//! terminates structurally.

use prism_hw::WaveSize;
use prism_ir::{RegClass, RegKind};
use prism_ssa::{
    BinOp, CrossLaneOp, Function, Inst, Item, MemSpace, Region, TernOp, UnOp, ValueId, ValueType,
};

use crate::error::{defect, SelectError};

/// Result of inference: per-value class plus, for booleans, whether the value
/// is a lane mask (divergent boolean) rather than a uniform 0/1 scalar.
#[derive(Debug)]
pub struct RegClassMap {
    classes: Vec<RegClass>,
    mask_bool: Vec<bool>,
    lane_mask: RegClass,
}

impl RegClassMap {
    pub fn rc(&self, v: ValueId) -> RegClass {
        self.classes[v.index()]
    }

    pub fn is_vector(&self, v: ValueId) -> bool {
        self.classes[v.index()].is_vector()
    }

    /// Whether a boolean value lives in a whole lane mask.
    pub fn is_mask_bool(&self, v: ValueId) -> bool {
        self.mask_bool[v.index()]
    }

    pub fn lane_mask(&self) -> RegClass {
        self.lane_mask
    }
}

/// Whether this ALU operation computes in floating point (and therefore has
/// no scalar-unit encoding on any supported generation).
fn unop_is_float(op: UnOp) -> bool {
    matches!(
        op,
        UnOp::FNeg
            | UnOp::FAbs
            | UnOp::FSqrt
            | UnOp::FRsq
            | UnOp::FRcp
            | UnOp::FLog2
            | UnOp::FExp2
            | UnOp::FSin
            | UnOp::FCos
            | UnOp::FFloor
            | UnOp::FCeil
            | UnOp::FTrunc
            | UnOp::FRound
            | UnOp::FFract
            | UnOp::FSat
    )
}

struct Inference<'a> {
    func: &'a Function,
    lane_mask: RegClass,
    classes: Vec<Option<RegClass>>,
    mask_bool: Vec<bool>,
    /// Set when a phi's resolved class changed during the current sweep.
    phi_changed: bool,
}

pub fn infer_reg_classes(func: &Function, wave_size: WaveSize) -> Result<RegClassMap, SelectError> {
    let lane_mask = match wave_size {
        WaveSize::Wave32 => RegClass::S1,
        WaveSize::Wave64 => RegClass::S2,
    };
    let n = func.value_count() as usize;
    let mut inf = Inference {
        func,
        lane_mask,
        classes: vec![None; n],
        mask_bool: vec![false; n],
        phi_changed: false,
    };

    for param in &func.params {
        inf.assign_default(param.value);
    }

    // Phi operands may reference values classified later (loop back edges),
    // and an escalation there can propagate forward again, so sweep the whole
    // body until no phi changes. The lattice has height two, so this is
    // bounded by the phi count.
    loop {
        inf.phi_changed = false;
        inf.visit_region(&func.body)?;
        if !inf.phi_changed {
            break;
        }
    }

    let classes = inf
        .classes
        .iter()
        .enumerate()
        .map(|(i, c)| {
            c.ok_or_else(|| {
                defect(
                    ValueId(i as u32),
                    "value never received a register class; dead or malformed source",
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RegClassMap {
        classes,
        mask_bool: inf.mask_bool,
        lane_mask,
    })
}

impl Inference<'_> {
    fn default_class(&self, v: ValueId) -> RegClass {
        let info = self.func.value(v);
        class_for(info.ty, info.divergent, self.lane_mask)
    }

    fn assign_default(&mut self, v: ValueId) {
        let rc = self.default_class(v);
        self.mask_bool[v.index()] = self.func.value(v).ty.is_bool() && self.func.value(v).divergent;
        self.set(v, rc);
    }

    fn set(&mut self, v: ValueId, rc: RegClass) {
        self.classes[v.index()] = Some(rc);
    }

    /// Escalate `v` to vector storage, keeping its byte size.
    fn force_vector(&mut self, v: ValueId) {
        let ty = self.func.value(v).ty;
        debug_assert!(!ty.is_bool(), "booleans escalate to mask, not vector");
        self.set(v, RegClass::vector_bytes(ty.bytes()));
    }

    fn is_vector(&self, v: ValueId) -> bool {
        matches!(self.classes[v.index()], Some(rc) if rc.is_vector())
    }

    /// Whether any already-classified source is vector.
    fn any_vector(&self, srcs: &[ValueId]) -> bool {
        srcs.iter().any(|&s| self.is_vector(s))
    }

    fn assign_alu(&mut self, dst: ValueId, srcs: &[ValueId], pin_vector: bool) {
        let ty = self.func.value(dst).ty;
        if ty.is_bool() {
            // Boolean results: a mask if annotated divergent or any source
            // bool is already a mask.
            let mask = self.func.value(dst).divergent
                || srcs
                    .iter()
                    .any(|&s| self.func.value(s).ty.is_bool() && self.mask_bool[s.index()]);
            self.mask_bool[dst.index()] = mask;
            self.set(dst, if mask { self.lane_mask } else { RegClass::S1 });
            return;
        }
        if pin_vector || self.func.value(dst).divergent || self.any_vector(srcs) {
            self.force_vector(dst);
        } else {
            self.set(dst, class_for(ty, false, self.lane_mask));
        }
    }

    fn visit_region(&mut self, region: &Region) -> Result<(), SelectError> {
        for item in &region.items {
            match item {
                Item::Inst(inst) => self.visit_inst(inst)?,
                Item::If(ifcf) => {
                    self.visit_region(&ifcf.then_region)?;
                    self.visit_region(&ifcf.else_region)?;
                    for phi in &ifcf.phis {
                        let before = self.classes[phi.dst.index()];
                        self.assign_alu(phi.dst, &[phi.then_value, phi.else_value], false);
                        if before != self.classes[phi.dst.index()] {
                            self.phi_changed = true;
                        }
                    }
                }
                Item::Loop(lp) => {
                    // Header phis first (the body reads their dsts), using
                    // whatever the continue value resolved to last sweep.
                    for phi in &lp.phis {
                        let before = self.classes[phi.dst.index()];
                        self.assign_alu(phi.dst, &[phi.init, phi.cont], false);
                        if before != self.classes[phi.dst.index()] {
                            self.phi_changed = true;
                        }
                    }
                    self.visit_region(&lp.body)?;
                    // Re-join after the body so an escalated continue value is
                    // visible this sweep, not just the next one.
                    for phi in &lp.phis {
                        let before = self.classes[phi.dst.index()];
                        self.assign_alu(phi.dst, &[phi.init, phi.cont], false);
                        if before != self.classes[phi.dst.index()] {
                            self.phi_changed = true;
                        }
                    }
                }
                Item::Break { .. } | Item::Continue { .. } => {}
            }
        }
        Ok(())
    }

    fn visit_inst(&mut self, inst: &Inst) -> Result<(), SelectError> {
        match inst {
            Inst::Const { dst, .. } | Inst::Undef { dst } => self.assign_default(*dst),
            Inst::Unary { dst, op, src } => {
                let subword = self.func.value(*dst).ty.comp_bits < 32
                    && !self.func.value(*dst).ty.is_bool();
                self.assign_alu(*dst, &[*src], unop_is_float(*op) || subword);
            }
            Inst::Binary { dst, op, lhs, rhs } => {
                let subword = self.func.value(*dst).ty.comp_bits < 32
                    && !self.func.value(*dst).ty.is_bool();
                self.assign_alu(*dst, &[*lhs, *rhs], op.is_float() || subword);
            }
            Inst::Ternary { dst, op, a, b, c } => {
                let pin = matches!(op, TernOp::FFma)
                    || (self.func.value(*dst).ty.comp_bits < 32
                        && !self.func.value(*dst).ty.is_bool());
                self.assign_alu(*dst, &[*a, *b, *c], pin);
            }
            Inst::Compare { dst, lhs, rhs, .. } => {
                self.assign_alu(*dst, &[*lhs, *rhs], false);
                // A compare of per-lane data always yields a mask, even if the
                // annotation claims uniformity (the sources live per lane).
                if self.any_vector(&[*lhs, *rhs]) && !self.mask_bool[dst.index()] {
                    let before = self.classes[dst.index()];
                    self.mask_bool[dst.index()] = true;
                    self.set(*dst, self.lane_mask);
                    if before != self.classes[dst.index()] {
                        self.phi_changed = true;
                    }
                }
            }
            Inst::Select {
                dst,
                cond,
                if_true,
                if_false,
            } => {
                let pin = self.mask_bool[cond.index()] && !self.func.value(*dst).ty.is_bool();
                self.assign_alu(*dst, &[*if_true, *if_false], pin);
            }
            Inst::Convert { dst, op, src } => {
                let to_float = matches!(
                    op,
                    prism_ssa::Convert::SIntToFloat
                        | prism_ssa::Convert::UIntToFloat
                        | prism_ssa::Convert::FloatToFloat
                );
                let from_float = matches!(
                    op,
                    prism_ssa::Convert::FloatToSInt
                        | prism_ssa::Convert::FloatToUInt
                        | prism_ssa::Convert::FloatToFloat
                );
                self.assign_alu(*dst, &[*src], to_float || from_float);
            }
            Inst::Vec { dst, srcs } => self.assign_alu(*dst, srcs, false),
            Inst::Extract { dst, src, .. } => self.assign_alu(*dst, &[*src], false),
            Inst::CrossLane { dst, op, .. } => match op {
                // Uniformizing operations produce scalars by construction.
                CrossLaneOp::ReadFirstLane | CrossLaneOp::ReadLane => {
                    let ty = self.func.value(*dst).ty;
                    self.set(*dst, scalar_class(ty));
                }
                CrossLaneOp::Ballot => {
                    self.mask_bool[dst.index()] = false;
                    self.set(*dst, self.lane_mask);
                }
                CrossLaneOp::WriteLane | CrossLaneOp::Shuffle => {
                    self.assign_alu(*dst, &[], true)
                }
                CrossLaneOp::Reduce(_) => {
                    let ty = self.func.value(*dst).ty;
                    self.set(*dst, scalar_class(ty));
                }
                CrossLaneOp::InclusiveScan(_) | CrossLaneOp::ExclusiveScan(_) => {
                    self.assign_alu(*dst, &[], true)
                }
            },
            Inst::Load { dst, space, .. } => match space {
                MemSpace::Uniform => {
                    if self.func.value(*dst).divergent {
                        return Err(defect(
                            *dst,
                            "uniform-memory load annotated divergent; the front end must \
                             route per-lane data through buffer or global space",
                        ));
                    }
                    let ty = self.func.value(*dst).ty;
                    self.set(*dst, scalar_class(ty));
                }
                // Per-lane-indexed storage: results are per lane no matter
                // what the divergence bit says.
                MemSpace::Buffer | MemSpace::Shared | MemSpace::Global | MemSpace::Stack => {
                    self.assign_alu(*dst, &[], true)
                }
            },
            Inst::Store { .. } => {}
            Inst::Atomic { dst, .. } | Inst::ImageAtomic { dst, .. } => {
                if let Some(dst) = dst {
                    self.assign_alu(*dst, &[], true);
                }
            }
            Inst::ImageSample { dst, .. } | Inst::ImageLoad { dst, .. } => {
                self.assign_alu(*dst, &[], true)
            }
            Inst::ImageStore { .. } | Inst::Discard { .. } | Inst::Barrier => {}
        }
        Ok(())
    }
}

fn class_for(ty: ValueType, divergent: bool, lane_mask: RegClass) -> RegClass {
    if ty.is_bool() {
        return if divergent { lane_mask } else { RegClass::S1 };
    }
    if divergent {
        RegClass::vector_bytes(ty.bytes())
    } else {
        scalar_class(ty)
    }
}

/// Scalar classes are dword-granular; sub-dword logical sizes round up.
fn scalar_class(ty: ValueType) -> RegClass {
    RegClass::of(RegKind::Scalar, ty.bytes().next_multiple_of(4))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_ssa::{CmpOp, FunctionBuilder, ValueInfo};

    fn wave64() -> WaveSize {
        WaveSize::Wave64
    }

    #[test]
    fn uniform_int_stays_scalar() {
        let mut fb = FunctionBuilder::new("t");
        let a = fb.param("a", ValueInfo::uniform(ValueType::scalar(32)));
        let b = fb.param("b", ValueInfo::uniform(ValueType::scalar(32)));
        let s = fb.binary(BinOp::IAdd, a, b);
        let func = fb.finish().unwrap();
        let map = infer_reg_classes(&func, wave64()).unwrap();
        assert_eq!(map.rc(s), RegClass::S1);
    }

    #[test]
    fn vector_sources_escalate() {
        let mut fb = FunctionBuilder::new("t");
        let a = fb.param("a", ValueInfo::uniform(ValueType::scalar(32)));
        let b = fb.param("b", ValueInfo::divergent(ValueType::scalar(32)));
        let s = fb.binary(BinOp::IAdd, a, b);
        let func = fb.finish().unwrap();
        let map = infer_reg_classes(&func, wave64()).unwrap();
        assert_eq!(map.rc(s), RegClass::V1);
        assert_eq!(map.rc(a), RegClass::S1);
    }

    #[test]
    fn float_alu_is_pinned_to_vector() {
        let mut fb = FunctionBuilder::new("t");
        let a = fb.param("a", ValueInfo::uniform(ValueType::scalar(32)));
        let s = fb.binary(BinOp::FAdd, a, a);
        let func = fb.finish().unwrap();
        let map = infer_reg_classes(&func, wave64()).unwrap();
        assert_eq!(map.rc(s), RegClass::V1);
    }

    #[test]
    fn divergent_bool_is_a_lane_mask() {
        let mut fb = FunctionBuilder::new("t");
        let a = fb.param("a", ValueInfo::divergent(ValueType::scalar(32)));
        let c = fb.compare(CmpOp::ULt, a, a);
        let func = fb.finish().unwrap();
        let map = infer_reg_classes(&func, wave64()).unwrap();
        assert_eq!(map.rc(c), RegClass::S2);
        assert!(map.is_mask_bool(c));
    }

    #[test]
    fn loop_phi_escalation_reaches_fixed_point() {
        // Loop-carried value starts uniform but is re-fed a vector value from
        // the body; the phi (and its users) must end up vector.
        let mut fb = FunctionBuilder::new("t");
        let init = fb.param("init", ValueInfo::uniform(ValueType::scalar(32)));
        let tid = fb.param("tid", ValueInfo::divergent(ValueType::scalar(32)));
        // Deliberately annotated uniform: only class escalation through the
        // continue edge can make it vector.
        let carried = fb.value(ValueInfo::uniform(ValueType::scalar(32)));
        fb.begin_loop();
        let next = fb.binary(BinOp::IAdd, carried, tid);
        let cond = fb.compare(CmpOp::UGt, next, init);
        fb.break_(Some(cond));
        fb.end_loop(vec![prism_ssa::LoopPhi {
            dst: carried,
            init,
            cont: next,
        }])
        .unwrap();
        let func = fb.finish().unwrap();
        let map = infer_reg_classes(&func, wave64()).unwrap();
        assert_eq!(map.rc(carried), RegClass::V1);
        assert_eq!(map.rc(next), RegClass::V1);
    }
}
