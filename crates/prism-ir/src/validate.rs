//! Structural validation of a selected program.
//!
//! This enforces the output contract selection promises its downstream
//! consumers: a closed dual graph, well-formed phis, and a single definition
//! per temp. Violations are compiler defects, so callers typically treat an
//! `Err` here as fatal.

use thiserror::Error;

use crate::op::Op;
use crate::program::Program;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidateError {
    #[error("block BB{block}: edge references out-of-range block BB{target}")]
    DanglingEdge { block: u32, target: u32 },
    #[error("block BB{block}: edge to BB{target} is not mirrored on the other endpoint")]
    AsymmetricEdge { block: u32, target: u32 },
    #[error("block BB{block} is unreachable on the linear graph")]
    UnreachableBlock { block: u32 },
    #[error("logical edge BB{from} -> BB{to} has no corresponding linear path")]
    LogicalWithoutLinearPath { from: u32, to: u32 },
    #[error("invert block BB{block} participates in the logical graph")]
    InvertOnLogicalGraph { block: u32 },
    #[error(
        "phi in BB{block} has {operands} operands but the block has {preds} {graph} predecessors"
    )]
    PhiArityMismatch {
        block: u32,
        operands: usize,
        preds: usize,
        graph: &'static str,
    },
    #[error("phi in BB{block} appears after a non-phi instruction")]
    PhiNotAtBlockStart { block: u32 },
    #[error("temp %{id} is defined {count} times")]
    MultipleDefinitions { id: u32, count: usize },
    #[error("temp %{id} is used but never defined")]
    UseWithoutDef { id: u32 },
    #[error("temp %{id} carries class {found} but the program table says {expected}")]
    ClassTableMismatch {
        id: u32,
        found: String,
        expected: String,
    },
}

pub fn validate(program: &Program) -> Result<(), ValidateError> {
    check_edges(program)?;
    check_linear_reachability(program)?;
    check_logical_subset(program)?;
    check_phis(program)?;
    check_defs(program)?;
    Ok(())
}

#[derive(Clone, Copy)]
enum EdgeList {
    LogicalSuccs,
    LogicalPreds,
    LinearSuccs,
    LinearPreds,
}

impl EdgeList {
    fn of<'a>(self, block: &'a crate::block::Block) -> &'a [u32] {
        match self {
            EdgeList::LogicalSuccs => &block.logical_succs,
            EdgeList::LogicalPreds => &block.logical_preds,
            EdgeList::LinearSuccs => &block.linear_succs,
            EdgeList::LinearPreds => &block.linear_preds,
        }
    }

    fn mirror(self) -> EdgeList {
        match self {
            EdgeList::LogicalSuccs => EdgeList::LogicalPreds,
            EdgeList::LogicalPreds => EdgeList::LogicalSuccs,
            EdgeList::LinearSuccs => EdgeList::LinearPreds,
            EdgeList::LinearPreds => EdgeList::LinearSuccs,
        }
    }
}

fn check_edges(program: &Program) -> Result<(), ValidateError> {
    let n = program.blocks.len() as u32;
    let lists = [
        EdgeList::LogicalSuccs,
        EdgeList::LogicalPreds,
        EdgeList::LinearSuccs,
        EdgeList::LinearPreds,
    ];
    for block in &program.blocks {
        for list in lists {
            for &target in list.of(block) {
                if target >= n {
                    return Err(ValidateError::DanglingEdge {
                        block: block.index,
                        target,
                    });
                }
                if !list.mirror().of(program.block(target)).contains(&block.index) {
                    return Err(ValidateError::AsymmetricEdge {
                        block: block.index,
                        target,
                    });
                }
            }
        }
        if !block.is_logical()
            && (!block.logical_preds.is_empty() || !block.logical_succs.is_empty())
        {
            return Err(ValidateError::InvertOnLogicalGraph {
                block: block.index,
            });
        }
    }
    Ok(())
}

fn linear_reachable(program: &Program) -> Vec<bool> {
    let mut seen = vec![false; program.blocks.len()];
    let mut stack = vec![program.entry()];
    while let Some(idx) = stack.pop() {
        if std::mem::replace(&mut seen[idx as usize], true) {
            continue;
        }
        for &succ in &program.block(idx).linear_succs {
            if !seen[succ as usize] {
                stack.push(succ);
            }
        }
    }
    seen
}

fn check_linear_reachability(program: &Program) -> Result<(), ValidateError> {
    for (idx, reachable) in linear_reachable(program).iter().enumerate() {
        if !reachable {
            return Err(ValidateError::UnreachableBlock { block: idx as u32 });
        }
    }
    Ok(())
}

/// Every logical edge must be realizable as a linear path.
fn check_logical_subset(program: &Program) -> Result<(), ValidateError> {
    for block in &program.blocks {
        for &to in &block.logical_succs {
            if !linear_path_exists(program, block.index, to) {
                return Err(ValidateError::LogicalWithoutLinearPath {
                    from: block.index,
                    to,
                });
            }
        }
    }
    Ok(())
}

fn linear_path_exists(program: &Program, from: u32, to: u32) -> bool {
    let mut seen = vec![false; program.blocks.len()];
    let mut stack = vec![from];
    while let Some(idx) = stack.pop() {
        if std::mem::replace(&mut seen[idx as usize], true) {
            continue;
        }
        for &succ in &program.block(idx).linear_succs {
            if succ == to {
                return true;
            }
            if !seen[succ as usize] {
                stack.push(succ);
            }
        }
    }
    false
}

fn check_phis(program: &Program) -> Result<(), ValidateError> {
    for block in &program.blocks {
        let mut past_phis = false;
        for instr in &block.instructions {
            if !instr.op.is_phi() {
                past_phis = true;
                continue;
            }
            if past_phis {
                return Err(ValidateError::PhiNotAtBlockStart {
                    block: block.index,
                });
            }
            let (preds, graph) = match instr.op {
                Op::PPhi => (&block.logical_preds, "logical"),
                Op::PLinearPhi => (&block.linear_preds, "linear"),
                _ => unreachable!(),
            };
            if instr.operands.len() != preds.len() {
                return Err(ValidateError::PhiArityMismatch {
                    block: block.index,
                    operands: instr.operands.len(),
                    preds: preds.len(),
                    graph,
                });
            }
        }
    }
    Ok(())
}

fn check_defs(program: &Program) -> Result<(), ValidateError> {
    let mut def_counts = vec![0usize; program.temp_count() as usize];
    for block in &program.blocks {
        for instr in &block.instructions {
            for def in &instr.defs {
                let t = def.temp();
                def_counts[t.id() as usize] += 1;
                if t.rc() != program.temp_rc(t.id()) {
                    return Err(ValidateError::ClassTableMismatch {
                        id: t.id(),
                        found: t.rc().to_string(),
                        expected: program.temp_rc(t.id()).to_string(),
                    });
                }
            }
        }
    }
    for (id, &count) in def_counts.iter().enumerate() {
        if count > 1 {
            return Err(ValidateError::MultipleDefinitions {
                id: id as u32,
                count,
            });
        }
    }
    for block in &program.blocks {
        for instr in &block.instructions {
            for opnd in &instr.operands {
                if let Some(t) = opnd.as_temp() {
                    if def_counts[t.id() as usize] == 0 {
                        return Err(ValidateError::UseWithoutDef { id: t.id() });
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{add_linear_edge, add_logical_edge, BlockKind};
    use pretty_assertions::assert_eq;
    use crate::{Definition, Instruction, Operand, RegClass};
    use prism_hw::{Generation, WaveSize};

    fn two_block_program() -> Program {
        let mut p = Program::new(Generation::Gfx9, WaveSize::Wave64);
        p.create_block(BlockKind::TOP_LEVEL);
        p.create_block(BlockKind::TOP_LEVEL);
        add_logical_edge(&mut p.blocks, 0, 1);
        add_linear_edge(&mut p.blocks, 0, 1);
        p
    }

    #[test]
    fn accepts_minimal_program() {
        assert_eq!(validate(&two_block_program()), Ok(()));
    }

    #[test]
    fn rejects_dangling_edge() {
        let mut p = two_block_program();
        p.block_mut(1).linear_succs.push(9);
        assert!(matches!(
            validate(&p),
            Err(ValidateError::DanglingEdge { target: 9, .. })
        ));
    }

    #[test]
    fn rejects_phi_arity_mismatch() {
        let mut p = two_block_program();
        let t = p.alloc_temp(RegClass::S1);
        p.block_mut(1).instructions.push(Instruction::new(
            crate::Op::PPhi,
            vec![Operand::c32(0), Operand::c32(1)],
            vec![Definition::of(t)],
        ));
        assert!(matches!(
            validate(&p),
            Err(ValidateError::PhiArityMismatch { operands: 2, preds: 1, .. })
        ));
    }

    #[test]
    fn rejects_double_definition() {
        let mut p = two_block_program();
        let t = p.alloc_temp(RegClass::S1);
        for b in [0, 1] {
            p.block_mut(b).instructions.push(Instruction::new(
                crate::Op::SMovB32,
                vec![Operand::c32(0)],
                vec![Definition::of(t)],
            ));
        }
        assert!(matches!(
            validate(&p),
            Err(ValidateError::MultipleDefinitions { count: 2, .. })
        ));
    }
}
