//! Control-flow reconstruction: dual graphs, exec-mask discipline, loops.

use pretty_assertions::assert_eq;
use prism_hw::Generation;
use prism_ir::{print_program, validate, Block, BlockKind, InstrExtra, Op, PhysReg, Program};
use prism_isel::{select_function, SelectOptions};
use prism_ssa::{BinOp, CmpOp, Function, FunctionBuilder, IfPhi, LoopPhi, ValueInfo, ValueType};

fn select(func: &Function, gen: Generation) -> Program {
    let program = select_function(func, gen, &SelectOptions::default()).expect("selection succeeds");
    validate(&program).expect("selected program validates");
    program
}

fn blocks_with(program: &Program, kind: BlockKind) -> Vec<&Block> {
    program
        .blocks
        .iter()
        .filter(|b| b.kind.contains(kind))
        .collect()
}

/// Uniform `if (c) { x = a+b } else { x = a-b }` with scalar inputs: a plain
/// two-way branch, one merge block with a scalar phi, and no exec-mask
/// traffic whatsoever.
#[test]
fn uniform_if_lowers_without_masks() {
    let mut fb = FunctionBuilder::new("uniform_if");
    let a = fb.param("a", ValueInfo::uniform(ValueType::scalar(32)));
    let b = fb.param("b", ValueInfo::uniform(ValueType::scalar(32)));
    let c = fb.compare(CmpOp::ULt, a, b);
    fb.begin_if(c);
    let x = fb.binary(BinOp::IAdd, a, b);
    fb.begin_else().unwrap();
    let y = fb.binary(BinOp::ISub, a, b);
    let m = fb.value(ValueInfo::uniform(ValueType::scalar(32)));
    fb.end_if(vec![IfPhi {
        dst: m,
        then_value: x,
        else_value: y,
    }])
    .unwrap();
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(!listing.contains("exec"), "no exec traffic:\n{listing}");
    assert!(!listing.contains("saveexec"));
    assert!(blocks_with(&program, BlockKind::INVERT).is_empty());

    let merges = blocks_with(&program, BlockKind::MERGE);
    assert_eq!(merges.len(), 1);
    let merge = merges[0];
    assert_eq!(merge.logical_preds.len(), 2);
    assert_eq!(merge.logical_preds, merge.linear_preds);
    let phi = &merge.instructions[0];
    assert_eq!(phi.op, Op::PPhi);
    assert_eq!(phi.operands.len(), 2);
    assert!(phi.defs[0].rc().is_scalar(), "scalar-only phi");
}

/// Divergent conditionals get the invert block, and it lives on the linear
/// graph only.
#[test]
fn divergent_if_builds_the_dual_graph() {
    let mut fb = FunctionBuilder::new("divergent_if");
    let a = fb.param("a", ValueInfo::uniform(ValueType::scalar(32)));
    let tid = fb.param("tid", ValueInfo::divergent(ValueType::scalar(32)));
    let c = fb.compare(CmpOp::ULt, tid, a);
    fb.begin_if(c);
    let x = fb.binary(BinOp::IAdd, tid, a);
    fb.begin_else().unwrap();
    let y = fb.binary(BinOp::ISub, tid, a);
    let m = fb.value(ValueInfo::divergent(ValueType::scalar(32)));
    fb.end_if(vec![IfPhi {
        dst: m,
        then_value: x,
        else_value: y,
    }])
    .unwrap();
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("s_and_saveexec_b64"), "{listing}");

    let inverts = blocks_with(&program, BlockKind::INVERT);
    assert_eq!(inverts.len(), 1);
    let invert = inverts[0];
    assert!(invert.logical_preds.is_empty() && invert.logical_succs.is_empty());
    assert_eq!(invert.linear_preds.len(), 2);

    let merges = blocks_with(&program, BlockKind::MERGE);
    assert_eq!(merges.len(), 1);
    let merge = merges[0];
    // Logical predecessors are the two sides; linear predecessors go through
    // the invert block.
    assert_eq!(merge.logical_preds.len(), 2);
    assert!(merge.linear_preds.contains(&invert.index));
    let value_phi = merge
        .instructions
        .iter()
        .find(|i| i.op == Op::PPhi)
        .expect("merge phi");
    assert!(value_phi.defs[0].rc().is_vector());
}

/// A loop whose only exit behavior is an unconditional trailing continue:
/// the header merge has exactly (entry, continue) operands and there is no
/// loop-exit block at all.
#[test]
fn endless_continue_loop_has_no_exit_edges() {
    let mut fb = FunctionBuilder::new("endless");
    let zero = fb.param("zero", ValueInfo::uniform(ValueType::scalar(32)));
    let tid = fb.param("tid", ValueInfo::divergent(ValueType::scalar(32)));
    let carried = fb.value(ValueInfo::divergent(ValueType::scalar(32)));
    fb.begin_loop();
    let next = fb.binary(BinOp::IAdd, carried, tid);
    fb.continue_(None);
    fb.end_loop(vec![LoopPhi {
        dst: carried,
        init: zero,
        cont: next,
    }])
    .unwrap();
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let headers = blocks_with(&program, BlockKind::LOOP_HEADER);
    assert_eq!(headers.len(), 1);
    let header = headers[0];
    let phi = &header.instructions[0];
    assert_eq!(phi.op, Op::PPhi);
    assert_eq!(phi.operands.len(), 2, "entry value and continue value");
    assert_eq!(header.logical_preds.len(), 2);

    assert!(blocks_with(&program, BlockKind::LOOP_EXIT).is_empty());
    // Nothing follows an endless loop, so there is no epilogue either.
    assert!(!print_program(&program).contains("s_endpgm"));
}

/// Uniform breaks are plain branches: loop exit exists, no mask traffic.
#[test]
fn uniform_break_is_a_direct_branch() {
    let mut fb = FunctionBuilder::new("uniform_break");
    let limit = fb.param("limit", ValueInfo::uniform(ValueType::scalar(32)));
    let one = fb.param("one", ValueInfo::uniform(ValueType::scalar(32)));
    let carried = fb.value(ValueInfo::uniform(ValueType::scalar(32)));
    fb.begin_loop();
    let next = fb.binary(BinOp::IAdd, carried, one);
    let done = fb.compare(CmpOp::UGe, next, limit);
    fb.break_(Some(done));
    fb.end_loop(vec![LoopPhi {
        dst: carried,
        init: one,
        cont: next,
    }])
    .unwrap();
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(!listing.contains("saveexec"), "{listing}");
    assert!(!listing.contains("s_andn2"), "{listing}");
    assert_eq!(blocks_with(&program, BlockKind::LOOP_EXIT).len(), 1);
    assert!(listing.contains("p_cbranch_nz"));
}

/// Divergent break: lanes accumulate into the exit mask, the loop tail tests
/// for an empty exec, and the exit block re-forms exec from the mask.
#[test]
fn divergent_break_accumulates_and_restores() {
    let mut fb = FunctionBuilder::new("divergent_break");
    let limit = fb.param("limit", ValueInfo::uniform(ValueType::scalar(32)));
    let tid = fb.param("tid", ValueInfo::divergent(ValueType::scalar(32)));
    let carried = fb.value(ValueInfo::divergent(ValueType::scalar(32)));
    fb.begin_loop();
    let next = fb.binary(BinOp::IAdd, carried, tid);
    let done = fb.compare(CmpOp::UGe, next, limit);
    fb.break_(Some(done));
    fb.end_loop(vec![LoopPhi {
        dst: carried,
        init: limit,
        cont: next,
    }])
    .unwrap();
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let exits = blocks_with(&program, BlockKind::LOOP_EXIT);
    assert_eq!(exits.len(), 1);
    let exit = exits[0];

    // The tail's empty-mask test targets the exit block.
    let mut found_empty_test = false;
    for block in &program.blocks {
        for instr in &block.instructions {
            if instr.op == Op::PCbranchZ
                && instr.extra == (InstrExtra::Branch { target: exit.index })
            {
                assert!(instr.operands[0].is_fixed(), "tests exec itself");
                found_empty_test = true;
            }
        }
    }
    assert!(found_empty_test);

    // Exec is restored from the accumulated mask at the exit.
    assert!(exit
        .instructions
        .iter()
        .any(|i| i.defs.first().and_then(|d| d.fixed_reg()) == Some(PhysReg::EXEC)));
}

/// A lane-kill inside a loop forces the explicit is-mask-empty exit even
/// when every break is divergent and might never fire.
#[test]
fn kill_in_loop_forces_empty_mask_exit() {
    let mut fb = FunctionBuilder::new("kill_loop");
    let kill = fb.param("kill", ValueInfo::divergent(ValueType::BOOL));
    let stop = fb.param("stop", ValueInfo::divergent(ValueType::BOOL));
    fb.begin_loop();
    fb.push(prism_ssa::Inst::Discard { cond: Some(kill) });
    fb.break_(Some(stop));
    fb.end_loop(vec![]).unwrap();
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("p_discard_if"), "{listing}");

    let exits = blocks_with(&program, BlockKind::LOOP_EXIT);
    assert_eq!(exits.len(), 1);
    let exit = exits[0];
    let empty_exit_exists = program.blocks.iter().any(|b| {
        b.instructions.iter().any(|i| {
            i.op == Op::PCbranchZ && i.extra == (InstrExtra::Branch { target: exit.index })
        })
    });
    assert!(empty_exit_exists, "explicit empty-mask exit edge:\n{listing}");
}

/// A kill in an otherwise fully uniform loop still inserts the empty-mask
/// test; the uniform break alone would spin forever once every lane is dead.
#[test]
fn kill_in_uniform_loop_still_gets_the_check() {
    let mut fb = FunctionBuilder::new("kill_uniform_loop");
    let kill = fb.param("kill", ValueInfo::divergent(ValueType::BOOL));
    let stop = fb.param("stop", ValueInfo::uniform(ValueType::BOOL));
    fb.begin_loop();
    fb.push(prism_ssa::Inst::Discard { cond: Some(kill) });
    fb.break_(Some(stop));
    fb.end_loop(vec![]).unwrap();
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("p_cbranch_z exec"), "{listing}");
}

/// Top-level kill outside any loop exits the wave early instead.
#[test]
fn top_level_kill_exits_early() {
    let mut fb = FunctionBuilder::new("kill_top");
    let kill = fb.param("kill", ValueInfo::divergent(ValueType::BOOL));
    fb.push(prism_ssa::Inst::Discard { cond: Some(kill) });
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("p_exit_early_if"), "{listing}");
}

/// Nested divergence makes the enclosing loop's exits divergent even when
/// their own conditions are uniform.
#[test]
fn uniform_break_under_divergent_if_uses_masks() {
    let mut fb = FunctionBuilder::new("nested");
    let tid = fb.param("tid", ValueInfo::divergent(ValueType::scalar(32)));
    let limit = fb.param("limit", ValueInfo::uniform(ValueType::scalar(32)));
    fb.begin_loop();
    let c = fb.compare(CmpOp::ULt, tid, limit);
    fb.begin_if(c);
    fb.break_(None);
    fb.begin_else().unwrap();
    fb.end_if(vec![]).unwrap();
    fb.continue_(None);
    fb.end_loop(vec![]).unwrap();
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    // The break inside the divergent side must go through the mask
    // discipline, not a direct branch.
    assert!(listing.contains("s_andn2_b64"), "{listing}");
    assert_eq!(blocks_with(&program, BlockKind::LOOP_EXIT).len(), 1);
}
