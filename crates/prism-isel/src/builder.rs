//! Thin instruction-emission façade.
//!
//! A [`Builder`] borrows the program, appends to one block, and allocates
//! fresh temps. It is created per emission site and holds no other state, so
//! every component funnels through the same small surface.

use prism_ir::{
    Definition, Format, InstrExtra, Instruction, Op, Operand, PhysReg, Program, RegClass, Temp,
};

/// Class used for the scalar condition code at def/use sites.
pub const SCC_RC: RegClass = RegClass::scalar_bytes(1);

pub struct Builder<'a> {
    pub program: &'a mut Program,
    pub block: u32,
}

impl<'a> Builder<'a> {
    pub fn new(program: &'a mut Program, block: u32) -> Builder<'a> {
        Builder { program, block }
    }

    pub fn lane_mask(&self) -> RegClass {
        self.program.lane_mask()
    }

    pub fn tmp(&mut self, rc: RegClass) -> Temp {
        self.program.alloc_temp(rc)
    }

    pub fn push(&mut self, instr: Instruction) {
        self.program
            .block_mut(self.block)
            .instructions
            .push(instr);
    }

    /// Current exec mask as an operand.
    pub fn exec(&self) -> Operand {
        Operand::fixed(PhysReg::EXEC, self.program.lane_mask())
    }

    pub fn scc(&self) -> Operand {
        Operand::fixed(PhysReg::SCC, SCC_RC)
    }

    fn scc_def(&mut self) -> Definition {
        let t = self.tmp(SCC_RC);
        Definition::fixed(t, PhysReg::SCC)
    }

    // ---- scalar ALU ----

    pub fn sop1(&mut self, op: Op, rc: RegClass, src: Operand) -> Temp {
        debug_assert_eq!(op.format(), Format::Sop1);
        let dst = self.tmp(rc);
        self.push(Instruction::new(op, vec![src], vec![Definition::of(dst)]));
        dst
    }

    /// Two-source scalar ALU; defines the result and the condition code.
    pub fn sop2(&mut self, op: Op, rc: RegClass, a: Operand, b: Operand) -> Temp {
        debug_assert_eq!(op.format(), Format::Sop2);
        let dst = self.tmp(rc);
        let scc = self.scc_def();
        self.push(Instruction::new(
            op,
            vec![a, b],
            vec![Definition::of(dst), scc],
        ));
        dst
    }

    /// Carry-consuming scalar add/sub; the condition code is both read and
    /// redefined.
    pub fn sop2_carry(&mut self, op: Op, rc: RegClass, a: Operand, b: Operand) -> Temp {
        debug_assert_eq!(op.format(), Format::Sop2);
        let dst = self.tmp(rc);
        let scc_in = self.scc();
        let scc = self.scc_def();
        self.push(Instruction::new(
            op,
            vec![a, b, scc_in],
            vec![Definition::of(dst), scc],
        ));
        dst
    }

    /// Scalar compare; returns the condition-code temp.
    pub fn sopc(&mut self, op: Op, a: Operand, b: Operand) -> Temp {
        debug_assert_eq!(op.format(), Format::Sopc);
        let scc = self.tmp(SCC_RC);
        self.push(Instruction::new(
            op,
            vec![a, b],
            vec![Definition::fixed(scc, PhysReg::SCC)],
        ));
        scc
    }

    /// Conditional scalar select reading the condition code.
    pub fn cselect(&mut self, op: Op, rc: RegClass, a: Operand, b: Operand) -> Temp {
        debug_assert!(matches!(op, Op::SCselectB32 | Op::SCselectB64));
        let dst = self.tmp(rc);
        let scc = self.scc();
        self.push(Instruction::new(
            op,
            vec![a, b, scc],
            vec![Definition::of(dst)],
        ));
        dst
    }

    // ---- vector ALU ----

    pub fn vop1(&mut self, op: Op, rc: RegClass, src: Operand) -> Temp {
        debug_assert_eq!(op.format(), Format::Vop1);
        let dst = self.tmp(rc);
        self.push(Instruction::new(op, vec![src], vec![Definition::of(dst)]));
        dst
    }

    pub fn vop2(&mut self, op: Op, rc: RegClass, a: Operand, b: Operand) -> Temp {
        debug_assert_eq!(op.format(), Format::Vop2);
        let dst = self.tmp(rc);
        self.push(Instruction::new(op, vec![a, b], vec![Definition::of(dst)]));
        dst
    }

    /// Carry-producing vector add/sub; returns `(result, carry_mask)`.
    pub fn vop2_carry(&mut self, op: Op, rc: RegClass, a: Operand, b: Operand) -> (Temp, Temp) {
        debug_assert_eq!(op.format(), Format::Vop2);
        let dst = self.tmp(rc);
        let carry = self.tmp(self.lane_mask());
        self.push(Instruction::new(
            op,
            vec![a, b],
            vec![Definition::of(dst), Definition::of(carry)],
        ));
        (dst, carry)
    }

    /// Carry-consuming, carry-producing vector add/sub.
    pub fn vop2_carry_in(
        &mut self,
        op: Op,
        rc: RegClass,
        a: Operand,
        b: Operand,
        carry_in: Operand,
    ) -> (Temp, Temp) {
        debug_assert_eq!(op.format(), Format::Vop2);
        let dst = self.tmp(rc);
        let carry = self.tmp(self.lane_mask());
        self.push(Instruction::new(
            op,
            vec![a, b, carry_in],
            vec![Definition::of(dst), Definition::of(carry)],
        ));
        (dst, carry)
    }

    pub fn vop3(&mut self, op: Op, rc: RegClass, operands: Vec<Operand>) -> Temp {
        debug_assert!(matches!(op.format(), Format::Vop3 | Format::Vop3p));
        let dst = self.tmp(rc);
        self.push(Instruction::new(op, operands, vec![Definition::of(dst)]));
        dst
    }

    /// Vector compare producing a lane mask.
    pub fn vopc(&mut self, op: Op, a: Operand, b: Operand) -> Temp {
        debug_assert_eq!(op.format(), Format::Vopc);
        let dst = self.tmp(self.lane_mask());
        self.push(Instruction::new(op, vec![a, b], vec![Definition::of(dst)]));
        dst
    }

    /// `dst = cond ? if_true : if_false` per lane.
    pub fn cndmask(&mut self, if_false: Operand, if_true: Operand, cond: Operand) -> Temp {
        let dst = self.tmp(RegClass::V1);
        self.push(Instruction::new(
            Op::VCndmaskB32,
            vec![if_false, if_true, cond],
            vec![Definition::of(dst)],
        ));
        dst
    }

    // ---- copies / materialization ----

    /// Materialize any operand into a register of the given class.
    pub fn copy(&mut self, rc: RegClass, src: Operand) -> Temp {
        let dst = self.tmp(rc);
        self.push(Instruction::new(
            Op::PParallelcopy,
            vec![src],
            vec![Definition::of(dst)],
        ));
        dst
    }

    /// Scalar 32-bit constant.
    pub fn sconst(&mut self, value: u32) -> Temp {
        self.sop1(Op::SMovB32, RegClass::S1, Operand::c32(value))
    }

    /// Broadcast a uniform operand into a per-lane register. This is the only
    /// scalar-to-vector promotion path; nothing coerces silently.
    pub fn broadcast(&mut self, src: Operand) -> Temp {
        debug_assert!(src.bytes() <= 4, "broadcast one dword at a time");
        self.vop1(Op::VMovB32, RegClass::V1, src)
    }

    /// Read lane zero's value back into a scalar register (one dword).
    pub fn readfirstlane(&mut self, src: Operand) -> Temp {
        self.vop1(Op::VReadfirstlaneB32, RegClass::S1, src)
    }

    // ---- pseudo / control ----

    pub fn pseudo(&mut self, op: Op, operands: Vec<Operand>, defs: Vec<Definition>) {
        debug_assert_eq!(op.format(), Format::Pseudo);
        self.push(Instruction::new(op, operands, defs));
    }

    pub fn branch(&mut self, target: u32) {
        self.push(Instruction::with_extra(
            Op::PBranch,
            vec![],
            vec![],
            InstrExtra::Branch { target },
        ));
    }

    /// Conditional branch on a mask or condition-code operand.
    pub fn cbranch(&mut self, op: Op, cond: Operand, target: u32) {
        debug_assert!(matches!(op, Op::PCbranch | Op::PCbranchZ | Op::PCbranchNz));
        self.push(Instruction::with_extra(
            op,
            vec![cond],
            vec![],
            InstrExtra::Branch { target },
        ));
    }

    // ---- exec-mask manipulation ----

    /// `saved = exec; exec &= mask`. Returns the saved mask temp.
    pub fn save_exec_and(&mut self, mask: Operand) -> Temp {
        let lm = self.lane_mask();
        let op = if lm == RegClass::S1 {
            Op::SAndSaveexecB32
        } else {
            Op::SAndSaveexecB64
        };
        let saved = self.tmp(lm);
        let exec = self.tmp(lm);
        let scc = self.scc_def();
        self.push(Instruction::new(
            op,
            vec![mask],
            vec![
                Definition::of(saved),
                Definition::fixed(exec, PhysReg::EXEC),
                scc,
            ],
        ));
        saved
    }

    /// `exec = op(a, b)` for the wave's mask width; returns the exec temp.
    pub fn exec_write(&mut self, op32: Op, op64: Op, a: Operand, b: Operand) -> Temp {
        let lm = self.lane_mask();
        let op = if lm == RegClass::S1 { op32 } else { op64 };
        let exec = self.tmp(lm);
        let scc = self.scc_def();
        self.push(Instruction::new(
            op,
            vec![a, b],
            vec![Definition::fixed(exec, PhysReg::EXEC), scc],
        ));
        exec
    }

    /// `exec = src` (mask restore).
    pub fn exec_restore(&mut self, src: Operand) -> Temp {
        let lm = self.lane_mask();
        let op = if lm == RegClass::S1 {
            Op::SMovB32
        } else {
            Op::SMovB64
        };
        let exec = self.tmp(lm);
        self.push(Instruction::new(
            op,
            vec![src],
            vec![Definition::fixed(exec, PhysReg::EXEC)],
        ));
        exec
    }

    /// Mask-width and/or/andn2 helper picking the 32- or 64-bit opcode.
    pub fn mask_op(&mut self, op32: Op, op64: Op, a: Operand, b: Operand) -> Temp {
        let lm = self.lane_mask();
        let op = if lm == RegClass::S1 { op32 } else { op64 };
        self.sop2(op, lm, a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_hw::{Generation, WaveSize};
    use prism_ir::BlockKind;

    #[test]
    fn sop2_defines_result_and_scc() {
        let mut program = Program::new(Generation::Gfx9, WaveSize::Wave64);
        let block = program.create_block(BlockKind::TOP_LEVEL);
        let mut b = Builder::new(&mut program, block);
        let t = b.sop2(Op::SAddU32, RegClass::S1, Operand::c32(1), Operand::c32(2));
        let instr = &program.block(block).instructions[0];
        assert_eq!(instr.defs.len(), 2);
        assert_eq!(instr.defs[0].temp(), t);
        assert_eq!(instr.defs[1].fixed_reg(), Some(PhysReg::SCC));
    }

    #[test]
    fn save_exec_defines_exec() {
        let mut program = Program::new(Generation::Gfx9, WaveSize::Wave64);
        let block = program.create_block(BlockKind::TOP_LEVEL);
        let mut b = Builder::new(&mut program, block);
        let mask = b.tmp(RegClass::S2);
        b.save_exec_and(Operand::temp(mask));
        let instr = &program.block(block).instructions[0];
        assert_eq!(instr.op, Op::SAndSaveexecB64);
        assert_eq!(instr.defs[1].fixed_reg(), Some(PhysReg::EXEC));
    }

    #[test]
    fn wave32_uses_b32_mask_ops() {
        let mut program = Program::new(Generation::Gfx10, WaveSize::Wave32);
        let block = program.create_block(BlockKind::TOP_LEVEL);
        let mut b = Builder::new(&mut program, block);
        let m = b.tmp(RegClass::S1);
        b.mask_op(Op::SAndB32, Op::SAndB64, Operand::temp(m), b.exec());
        assert_eq!(program.block(block).instructions[0].op, Op::SAndB32);
    }
}
