//! End-to-end selection over straight-line functions.

use prism_hw::{Generation, WaveSize};
use prism_ir::{print_program, validate, Op, Program};
use prism_isel::{infer_reg_classes, select_function, SelectError, SelectOptions};
use prism_ssa::{BinOp, Function, FunctionBuilder, UnOp, ValueInfo, ValueType};

fn select(func: &Function, gen: Generation) -> Program {
    // Pass traces show up under --nocapture when a test goes wrong.
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let program = select_function(func, gen, &SelectOptions::default()).expect("selection succeeds");
    validate(&program).expect("selected program validates");
    program
}

#[test]
fn uniform_add_stays_on_the_scalar_unit() {
    let mut fb = FunctionBuilder::new("uniform_add");
    let a = fb.param("a", ValueInfo::uniform(ValueType::scalar(32)));
    let b = fb.param("b", ValueInfo::uniform(ValueType::scalar(32)));
    fb.binary(BinOp::IAdd, a, b);
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("s_add_u32"));
    assert!(!listing.contains("v_add"), "no vector ALU for uniform data:\n{listing}");
    assert!(listing.contains("s_endpgm"));
}

#[test]
fn entry_marker_defines_every_parameter() {
    let mut fb = FunctionBuilder::new("params");
    fb.param("a", ValueInfo::uniform(ValueType::scalar(32)));
    fb.param("tid", ValueInfo::divergent(ValueType::scalar(32)));
    fb.param("ptr", ValueInfo::uniform(ValueType::scalar(64)));
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let entry = &program.block(0).instructions[0];
    assert_eq!(entry.op, Op::PStartpgm);
    assert_eq!(entry.defs.len(), 3);
}

#[test]
fn scalar_operand_is_broadcast_into_vector_alu() {
    let mut fb = FunctionBuilder::new("promote");
    let a = fb.param("a", ValueInfo::uniform(ValueType::scalar(32)));
    let tid = fb.param("tid", ValueInfo::divergent(ValueType::scalar(32)));
    fb.binary(BinOp::IAdd, a, tid);
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("v_mov_b32"), "explicit broadcast:\n{listing}");
    assert!(listing.contains("v_add_u32"));
}

#[test]
fn gfx8_integer_add_carries_a_mask_definition() {
    let mut fb = FunctionBuilder::new("gfx8_add");
    let a = fb.param("a", ValueInfo::divergent(ValueType::scalar(32)));
    let b = fb.param("b", ValueInfo::divergent(ValueType::scalar(32)));
    fb.binary(BinOp::IAdd, a, b);
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx8);
    let listing = print_program(&program);
    assert!(listing.contains("v_add_co_u32"), "{listing}");
    assert!(!listing.contains("v_add_u32 "), "carry-less form needs Gfx9:\n{listing}");
}

#[test]
fn register_classes_only_escalate_toward_vector() {
    let mut fb = FunctionBuilder::new("monotone");
    let a = fb.param("a", ValueInfo::uniform(ValueType::scalar(32)));
    let tid = fb.param("tid", ValueInfo::divergent(ValueType::scalar(32)));
    let x = fb.binary(BinOp::IAdd, a, tid);
    let y = fb.binary(BinOp::IAdd, x, a);
    let z = fb.binary(BinOp::IAdd, a, a);
    let func = fb.finish().unwrap();

    let map = infer_reg_classes(&func, WaveSize::Wave64).unwrap();
    assert!(map.rc(x).is_vector());
    assert!(map.rc(y).is_vector(), "a vector source forces a vector result");
    assert!(map.rc(z).is_scalar(), "purely uniform chains stay scalar");
}

#[test]
fn range_annotations_narrow_the_multiply() {
    let mut fb = FunctionBuilder::new("mul24");
    let a = fb.param(
        "a",
        ValueInfo::divergent(ValueType::scalar(32)).with_range(1 << 20),
    );
    let b = fb.param(
        "b",
        ValueInfo::divergent(ValueType::scalar(32)).with_range(255),
    );
    fb.binary(BinOp::IMul, a, b);
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("v_mul_u32_u24"), "{listing}");
    assert!(!listing.contains("v_mul_lo_u32"));
}

#[test]
fn unbounded_multiply_keeps_the_full_opcode() {
    let mut fb = FunctionBuilder::new("mul32");
    let a = fb.param("a", ValueInfo::divergent(ValueType::scalar(32)));
    let b = fb.param("b", ValueInfo::divergent(ValueType::scalar(32)));
    fb.binary(BinOp::IMul, a, b);
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    assert!(print_program(&program).contains("v_mul_lo_u32"));
}

#[test]
fn sixty_four_bit_add_is_a_carry_chain() {
    let mut fb = FunctionBuilder::new("add64");
    let a = fb.param("a", ValueInfo::divergent(ValueType::scalar(64)));
    let b = fb.param("b", ValueInfo::divergent(ValueType::scalar(64)));
    fb.binary(BinOp::IAdd, a, b);
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("v_add_co_u32"));
    assert!(listing.contains("v_addc_co_u32"));
    assert!(listing.contains("p_create_vector"));
}

#[test]
fn missing_lowering_is_a_fatal_error() {
    let mut fb = FunctionBuilder::new("log64");
    let a = fb.param("a", ValueInfo::divergent(ValueType::scalar(64)));
    fb.unary(UnOp::FLog2, a);
    let func = fb.finish().unwrap();

    let err = select_function(&func, Generation::Gfx9, &SelectOptions::default()).unwrap_err();
    assert!(matches!(err, SelectError::Unsupported { .. }));
}

#[test]
fn wave32_needs_a_capable_generation() {
    let fb = FunctionBuilder::new("w32");
    let func = fb.finish().unwrap();
    let opts = SelectOptions {
        wave_size: Some(WaveSize::Wave32),
    };
    assert!(matches!(
        select_function(&func, Generation::Gfx9, &opts),
        Err(SelectError::Unsupported { .. })
    ));
    let program = select_function(&func, Generation::Gfx10, &opts).unwrap();
    assert_eq!(program.lane_mask(), prism_ir::RegClass::S1);
}

#[test]
fn saturate_uses_the_median_opcode() {
    let mut fb = FunctionBuilder::new("sat");
    let a = fb.param("a", ValueInfo::divergent(ValueType::scalar(32)));
    fb.unary(UnOp::FSat, a);
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    assert!(print_program(&program).contains("v_med3_f32"));
}

#[test]
fn sine_is_prescaled_to_revolutions() {
    let mut fb = FunctionBuilder::new("sin");
    let a = fb.param("a", ValueInfo::divergent(ValueType::scalar(32)));
    fb.unary(UnOp::FSin, a);
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("v_mul_f32"), "{listing}");
    assert!(listing.contains("v_sin_f32"));
}

#[test]
fn shuffle_goes_through_the_permute_unit() {
    let mut fb = FunctionBuilder::new("shuffle");
    let v = fb.param("v", ValueInfo::divergent(ValueType::scalar(32)));
    let idx = fb.param("idx", ValueInfo::divergent(ValueType::scalar(32)));
    let dst = fb.value(ValueInfo::divergent(ValueType::scalar(32)));
    fb.push(prism_ssa::Inst::CrossLane {
        dst,
        op: prism_ssa::CrossLaneOp::Shuffle,
        src: v,
        lane: Some(idx),
        data: None,
    });
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("ds_bpermute_b32"), "{listing}");
    assert!(listing.contains("v_lshlrev_b32"), "byte-addressed lane index");
}

#[test]
fn reduction_declares_its_scratch_registers() {
    let mut fb = FunctionBuilder::new("reduce");
    let v = fb.param("v", ValueInfo::divergent(ValueType::scalar(32)));
    let dst = fb.value(ValueInfo::uniform(ValueType::scalar(32)));
    fb.push(prism_ssa::Inst::CrossLane {
        dst,
        op: prism_ssa::CrossLaneOp::Reduce(prism_ssa::ReduceOp::IAdd),
        src: v,
        lane: None,
        data: None,
    });
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let reduce = program
        .blocks
        .iter()
        .flat_map(|b| &b.instructions)
        .find(|i| i.op == prism_ir::Op::PReduce)
        .expect("reduction pseudo");
    assert_eq!(reduce.defs.len(), 3, "result, per-lane scratch, mask scratch");
    assert!(reduce.defs[0].rc().is_scalar());
    assert!(reduce.defs[1].rc().is_linear(), "scratch survives divergence");
}

#[test]
fn float_compare_with_uniform_result_collapses_the_mask() {
    let mut fb = FunctionBuilder::new("fcmp_uniform");
    let a = fb.param("a", ValueInfo::uniform(ValueType::scalar(32)));
    let c = fb.compare(prism_ssa::CmpOp::FLt, a, a);
    let func = fb.finish().unwrap();

    let map = infer_reg_classes(&func, WaveSize::Wave64).unwrap();
    assert!(!map.is_mask_bool(c), "uniform annotation wins for the bool");
    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("v_cmp_lt_f32"), "{listing}");
    assert!(listing.contains("s_cselect_b32"), "mask collapses to 0/1:\n{listing}");
}
