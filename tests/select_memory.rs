//! Memory lowering through the access splitter and its storage backends.

use pretty_assertions::assert_eq;
use prism_hw::Generation;
use prism_ir::{print_program, validate, Program};
use prism_isel::{select_function, SelectOptions};
use prism_ssa::{AtomicOp, Function, FunctionBuilder, Inst, MemSpace, ValueInfo, ValueType};

fn select(func: &Function, gen: Generation) -> Program {
    let program = select_function(func, gen, &SelectOptions::default()).expect("selection succeeds");
    validate(&program).expect("selected program validates");
    program
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

/// A 24-byte uniform load against the 64-byte scalar backend tiles as
/// 16 + 8 and recombines into one composite.
#[test]
fn wide_uniform_load_splits_power_of_two() {
    let mut fb = FunctionBuilder::new("smem24");
    let ptr = fb.param("ptr", ValueInfo::uniform(ValueType::scalar(64)));
    let dst = fb.value(ValueInfo::uniform(ValueType::vec(32, 6)));
    fb.push(Inst::Load {
        dst,
        space: MemSpace::Uniform,
        resource: None,
        addr: ptr,
        const_offset: 0,
        align: 4,
    });
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert_eq!(count(&listing, "s_load_dwordx4"), 1, "{listing}");
    assert_eq!(count(&listing, "s_load_dwordx2"), 1, "{listing}");
    assert!(listing.contains("p_create_vector"));
}

/// The 24-byte per-lane case from the transfer-splitting contract: eight
/// 3-byte components against a 16-byte backend become exactly two transfers
/// of 16 and 8 bytes.
#[test]
fn packed_component_buffer_load_splits_16_8() {
    let mut fb = FunctionBuilder::new("buf24");
    let desc = fb.param("desc", ValueInfo::uniform(ValueType::vec(32, 4)));
    let off = fb.param("off", ValueInfo::divergent(ValueType::scalar(32)));
    let dst = fb.value(ValueInfo::divergent(ValueType::vec(24, 8)));
    fb.push(Inst::Load {
        dst,
        space: MemSpace::Buffer,
        resource: Some(desc),
        addr: off,
        const_offset: 0,
        align: 4,
    });
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert_eq!(count(&listing, "buffer_load_dwordx4"), 1, "{listing}");
    assert_eq!(count(&listing, "buffer_load_dwordx2"), 1, "{listing}");
    assert!(!listing.contains("buffer_load_dwordx3"));
}

/// Asking for the same component decomposition twice emits the split once;
/// the composite cache answers the second request.
#[test]
fn component_extraction_is_cached() {
    let mut fb = FunctionBuilder::new("cache");
    let desc = fb.param("desc", ValueInfo::uniform(ValueType::vec(32, 4)));
    let off = fb.param("off", ValueInfo::divergent(ValueType::scalar(32)));
    let v = fb.value(ValueInfo::divergent(ValueType::vec(32, 4)));
    fb.push(Inst::Load {
        dst: v,
        space: MemSpace::Buffer,
        resource: Some(desc),
        addr: off,
        const_offset: 0,
        align: 4,
    });
    let e0 = fb.value(ValueInfo::divergent(ValueType::scalar(32)));
    fb.push(Inst::Extract {
        dst: e0,
        src: v,
        index: 1,
    });
    let e1 = fb.value(ValueInfo::divergent(ValueType::scalar(32)));
    fb.push(Inst::Extract {
        dst: e1,
        src: v,
        index: 1,
    });
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert_eq!(count(&listing, "p_split_vector"), 1, "{listing}");
    assert_eq!(count(&listing, "p_extract_vector"), 0, "{listing}");
}

/// A 12-byte shared-memory store tiles as 8 + 4.
#[test]
fn shared_store_splits_like_loads() {
    let mut fb = FunctionBuilder::new("lds12");
    let addr = fb.param("addr", ValueInfo::divergent(ValueType::scalar(32)));
    let data = fb.param("data", ValueInfo::divergent(ValueType::vec(32, 3)));
    fb.push(Inst::Store {
        space: MemSpace::Shared,
        resource: None,
        addr,
        value: data,
        const_offset: 0,
        align: 4,
    });
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert_eq!(count(&listing, "ds_write_b64"), 1, "{listing}");
    assert_eq!(count(&listing, "ds_write_b32"), 1, "{listing}");
}

/// Gfx8's global instructions have no offset field at all: every constant
/// offset folds into the 64-bit address.
#[test]
fn gfx8_global_offset_is_materialized() {
    let mut fb = FunctionBuilder::new("gfx8_global");
    let addr = fb.param("addr", ValueInfo::divergent(ValueType::scalar(64)));
    let dst = fb.value(ValueInfo::divergent(ValueType::scalar(32)));
    fb.push(Inst::Load {
        dst,
        space: MemSpace::Global,
        resource: None,
        addr,
        const_offset: 16,
        align: 4,
    });
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx8);
    let listing = print_program(&program);
    assert!(listing.contains("global_load_dword"), "{listing}");
    assert!(listing.contains("v_addc_co_u32"), "address rebase:\n{listing}");
    assert!(!listing.contains("offset:16"));
}

/// The same load on Gfx9 keeps the offset in the instruction.
#[test]
fn gfx9_global_offset_is_encoded() {
    let mut fb = FunctionBuilder::new("gfx9_global");
    let addr = fb.param("addr", ValueInfo::divergent(ValueType::scalar(64)));
    let dst = fb.value(ValueInfo::divergent(ValueType::scalar(32)));
    fb.push(Inst::Load {
        dst,
        space: MemSpace::Global,
        resource: None,
        addr,
        const_offset: 16,
        align: 4,
    });
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("offset:16"), "{listing}");
    assert!(!listing.contains("v_addc_co_u32"));
}

/// Sub-word loads on a pre-d16 generation widen through a dword and carve
/// the narrow value out explicitly.
#[test]
fn gfx8_subword_load_extracts_from_a_dword() {
    let mut fb = FunctionBuilder::new("gfx8_u8");
    let desc = fb.param("desc", ValueInfo::uniform(ValueType::vec(32, 4)));
    let off = fb.param("off", ValueInfo::divergent(ValueType::scalar(32)));
    let dst = fb.value(ValueInfo::divergent(ValueType::scalar(8)));
    fb.push(Inst::Load {
        dst,
        space: MemSpace::Buffer,
        resource: Some(desc),
        addr: off,
        const_offset: 0,
        align: 1,
    });
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx8);
    let listing = print_program(&program);
    assert!(listing.contains("buffer_load_ubyte"), "{listing}");
    assert!(listing.contains("v_bfe_u32"), "explicit carve-out:\n{listing}");

    // Gfx9 lands the byte in a sub-word slice directly.
    let program9 = select(&func, Generation::Gfx9);
    let listing9 = print_program(&program9);
    assert!(listing9.contains("buffer_load_ubyte"));
    assert!(!listing9.contains("v_bfe_u32"), "{listing9}");
}

#[test]
fn shared_atomic_returns_the_old_value() {
    let mut fb = FunctionBuilder::new("lds_atomic");
    let addr = fb.param("addr", ValueInfo::divergent(ValueType::scalar(32)));
    let data = fb.param("data", ValueInfo::divergent(ValueType::scalar(32)));
    let old = fb.value(ValueInfo::divergent(ValueType::scalar(32)));
    fb.push(Inst::Atomic {
        dst: Some(old),
        space: MemSpace::Shared,
        op: AtomicOp::Add,
        resource: None,
        addr,
        data,
        compare: None,
    });
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("= ds_add_u32"), "{listing}");
}

#[test]
fn buffer_compare_swap_packs_its_payload() {
    let mut fb = FunctionBuilder::new("buf_cmpswap");
    let desc = fb.param("desc", ValueInfo::uniform(ValueType::vec(32, 4)));
    let off = fb.param("off", ValueInfo::divergent(ValueType::scalar(32)));
    let data = fb.param("data", ValueInfo::divergent(ValueType::scalar(32)));
    let cmp = fb.param("cmp", ValueInfo::divergent(ValueType::scalar(32)));
    fb.push(Inst::Atomic {
        dst: None,
        space: MemSpace::Buffer,
        op: AtomicOp::CmpSwap,
        resource: Some(desc),
        addr: off,
        data,
        compare: Some(cmp),
    });
    let func = fb.finish().unwrap();

    let program = select(&func, Generation::Gfx9);
    let listing = print_program(&program);
    assert!(listing.contains("buffer_atomic_cmpswap"), "{listing}");
    assert!(listing.contains("p_create_vector"), "combined (new, compare) payload");
}

#[test]
fn stack_atomics_are_rejected() {
    let mut fb = FunctionBuilder::new("stack_atomic");
    let addr = fb.param("addr", ValueInfo::divergent(ValueType::scalar(32)));
    let data = fb.param("data", ValueInfo::divergent(ValueType::scalar(32)));
    fb.push(Inst::Atomic {
        dst: None,
        space: MemSpace::Stack,
        op: AtomicOp::Add,
        resource: None,
        addr,
        data,
        compare: None,
    });
    let func = fb.finish().unwrap();

    assert!(select_function(&func, Generation::Gfx9, &SelectOptions::default()).is_err());
}
