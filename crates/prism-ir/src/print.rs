//! Human-readable program listing, for diagnostics and tests.
//!
//! The format is stable enough for tests to match substrings against; it is
//! not a serialization format.

use std::fmt;

use crate::block::{Block, BlockKind};
use crate::instr::{InstrExtra, Instruction};
use crate::program::Program;

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, def) in self.defs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{def}")?;
        }
        if !self.defs.is_empty() {
            write!(f, " = ")?;
        }
        write!(f, "{}", self.op.name())?;
        for (i, opnd) in self.operands.iter().enumerate() {
            write!(f, "{} {opnd}", if i == 0 { "" } else { "," })?;
        }
        match self.extra {
            InstrExtra::None => {}
            InstrExtra::Branch { target } => write!(f, " BB{target}")?,
            InstrExtra::Smem(info) => {
                if info.glc {
                    write!(f, " glc")?;
                }
            }
            InstrExtra::Buf(info) => {
                if info.offset != 0 {
                    write!(f, " offset:{}", info.offset)?;
                }
                if info.offen {
                    write!(f, " offen")?;
                }
                if info.idxen {
                    write!(f, " idxen")?;
                }
            }
            InstrExtra::Ds(info) => {
                if info.offset1 != 0 {
                    write!(f, " offset0:{} offset1:{}", info.offset0, info.offset1)?;
                } else if info.offset0 != 0 {
                    write!(f, " offset:{}", info.offset0)?;
                }
            }
            InstrExtra::Flat(info) => {
                if info.offset != 0 {
                    write!(f, " offset:{}", info.offset)?;
                }
            }
            InstrExtra::Mimg(info) => {
                write!(f, " dmask:{:#x}", info.dmask)?;
                if info.unrm {
                    write!(f, " unrm")?;
                }
            }
            InstrExtra::Reduce {
                op,
                kind,
                cluster_size,
            } => {
                write!(f, " {op:?}/{kind:?}")?;
                if cluster_size != 0 {
                    write!(f, " cluster:{cluster_size}")?;
                }
            }
            InstrExtra::Barrier(b) => write!(f, " scope:{:?}", b.scope)?,
        }
        Ok(())
    }
}

fn kind_names(kind: BlockKind) -> Vec<&'static str> {
    let mut names = Vec::new();
    let pairs = [
        (BlockKind::TOP_LEVEL, "top-level"),
        (BlockKind::LOOP_HEADER, "loop-header"),
        (BlockKind::LOOP_EXIT, "loop-exit"),
        (BlockKind::MERGE, "merge"),
        (BlockKind::INVERT, "invert"),
        (BlockKind::BRANCH, "branch"),
        (BlockKind::CONTINUE, "continue"),
        (BlockKind::BREAK, "break"),
        (BlockKind::UNIFORM, "uniform"),
    ];
    for (flag, name) in pairs {
        if kind.contains(flag) {
            names.push(name);
        }
    }
    names
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &Block) -> fmt::Result {
    write!(f, "BB{}", block.index)?;
    let names = kind_names(block.kind);
    if !names.is_empty() {
        write!(f, " [{}]", names.join(", "))?;
    }
    if block.loop_depth > 0 {
        write!(f, " depth:{}", block.loop_depth)?;
    }
    writeln!(f)?;
    writeln!(
        f,
        "/* logical preds: {:?} / linear preds: {:?} */",
        block.logical_preds, block.linear_preds
    )?;
    for instr in &block.instructions {
        writeln!(f, "\t{instr}")?;
    }
    Ok(())
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "program ({:?}, wave{})",
            self.gen,
            self.wave_size.lanes()
        )?;
        for block in &self.blocks {
            write_block(f, block)?;
        }
        Ok(())
    }
}

/// Convenience wrapper used by tests and diagnostics.
pub fn print_program(program: &Program) -> String {
    program.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Definition, Op, Operand, RegClass};
    use prism_hw::{Generation, WaveSize};

    #[test]
    fn listing_contains_defs_and_mnemonics() {
        let mut p = Program::new(Generation::Gfx9, WaveSize::Wave64);
        let b = p.create_block(BlockKind::TOP_LEVEL);
        let t = p.alloc_temp(RegClass::S1);
        p.block_mut(b).instructions.push(Instruction::new(
            Op::SAddU32,
            vec![Operand::c32(1), Operand::c32(2)],
            vec![Definition::of(t)],
        ));
        let text = print_program(&p);
        assert!(text.contains("BB0 [top-level]"));
        assert!(text.contains("s1: %0 = s_add_u32 1, 2"));
    }
}
