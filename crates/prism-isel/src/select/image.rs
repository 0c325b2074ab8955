//! Image (texture) operation lowering.
//!
//! The address vector is assembled in the hardware's operand order (depth
//! reference, then derivatives or bias, then coordinates, then the explicit
//! level), and every image operation carries its component-enable mask and
//! dimensionality in the payload.

use prism_ir::{
    CachePolicy, Definition, ImageDim, InstrExtra, Instruction, MemScope, MemSync, MimgInfo, Op,
    Operand, RegClass, StorageSet, Temp,
};
use prism_ssa::{AtomicOp, SampleMode, ValueId};

use super::vector_temp;
use crate::ctx::Context;
use crate::error::{defect, unsupported, SelectError};

fn map_dim(dim: prism_ssa::ImageDim) -> ImageDim {
    match dim {
        prism_ssa::ImageDim::Dim1D => ImageDim::Dim1D,
        prism_ssa::ImageDim::Dim2D => ImageDim::Dim2D,
        prism_ssa::ImageDim::Dim3D => ImageDim::Dim3D,
        prism_ssa::ImageDim::Cube => ImageDim::Cube,
        prism_ssa::ImageDim::Dim1DArray => ImageDim::Dim1DArray,
        prism_ssa::ImageDim::Dim2DArray => ImageDim::Dim2DArray,
    }
}

fn dmask_for(comps: u32) -> u8 {
    ((1u32 << comps) - 1) as u8
}

fn image_sync() -> MemSync {
    MemSync::plain(StorageSet::IMAGE)
}

/// Concatenate address pieces into one vector register group.
fn build_vaddr(ctx: &mut Context, parts: &[Temp]) -> Temp {
    let bytes: u32 = parts.iter().map(|p| p.bytes()).sum();
    ctx.create_vector(RegClass::vector_bytes(bytes), parts)
}

#[allow(clippy::too_many_arguments)]
pub(super) fn sample(
    ctx: &mut Context,
    dst: ValueId,
    image: ValueId,
    sampler: ValueId,
    coords: ValueId,
    dim: prism_ssa::ImageDim,
    mode: SampleMode,
    dref: Option<ValueId>,
) -> Result<(), SelectError> {
    let rc = ctx.classes.rc(dst);
    let comps = ctx.func.value(dst).ty.comps;
    let desc = ctx.temp_of(image);
    let samp = ctx.temp_of(sampler);
    if desc.rc().is_vector() || samp.rc().is_vector() {
        return Err(defect(dst, "image and sampler descriptors must be uniform"));
    }

    let opcode = match (dref.is_some(), &mode) {
        (false, SampleMode::Auto) => Op::ImageSample,
        (false, SampleMode::Level(_)) => Op::ImageSampleL,
        (false, SampleMode::Bias(_)) => Op::ImageSampleB,
        (false, SampleMode::Grad { .. }) => Op::ImageSampleD,
        (true, SampleMode::Auto) => Op::ImageSampleC,
        (true, SampleMode::Level(_)) => Op::ImageSampleCL,
        (true, _) => {
            return Err(unsupported(
                ctx.program.gen,
                "depth-compare sample with bias or gradients",
            ))
        }
    };

    let mut addr_parts: Vec<Temp> = Vec::new();
    if let Some(d) = dref {
        addr_parts.push(vector_temp(ctx, d));
    }
    match mode {
        SampleMode::Bias(b) => addr_parts.push(vector_temp(ctx, b)),
        SampleMode::Grad { ddx, ddy } => {
            addr_parts.push(vector_temp(ctx, ddx));
            addr_parts.push(vector_temp(ctx, ddy));
        }
        SampleMode::Auto | SampleMode::Level(_) => {}
    }
    addr_parts.push(vector_temp(ctx, coords));
    if let SampleMode::Level(l) = mode {
        addr_parts.push(vector_temp(ctx, l));
    }
    let vaddr = build_vaddr(ctx, &addr_parts);

    let mut bld = ctx.bld();
    let dst_t = bld.tmp(rc);
    bld.push(Instruction::with_extra(
        opcode,
        vec![
            Operand::temp(desc),
            Operand::temp(samp),
            Operand::temp(vaddr),
        ],
        vec![Definition::of(dst_t)],
        InstrExtra::Mimg(MimgInfo {
            dmask: dmask_for(comps),
            dim: map_dim(dim),
            unrm: false,
            cache: CachePolicy::default(),
            sync: image_sync(),
        }),
    ));
    ctx.bind(dst, dst_t);
    Ok(())
}

pub(super) fn load(
    ctx: &mut Context,
    dst: ValueId,
    image: ValueId,
    coords: ValueId,
    dim: prism_ssa::ImageDim,
    mip: Option<ValueId>,
) -> Result<(), SelectError> {
    let rc = ctx.classes.rc(dst);
    let comps = ctx.func.value(dst).ty.comps;
    let desc = ctx.temp_of(image);
    if desc.rc().is_vector() {
        return Err(defect(dst, "image descriptor must be uniform"));
    }
    let opcode = if mip.is_some() {
        Op::ImageLoadMip
    } else {
        Op::ImageLoad
    };
    let mut addr_parts = vec![vector_temp(ctx, coords)];
    if let Some(m) = mip {
        addr_parts.push(vector_temp(ctx, m));
    }
    let vaddr = build_vaddr(ctx, &addr_parts);

    let mut bld = ctx.bld();
    let dst_t = bld.tmp(rc);
    bld.push(Instruction::with_extra(
        opcode,
        vec![Operand::temp(desc), Operand::temp(vaddr)],
        vec![Definition::of(dst_t)],
        InstrExtra::Mimg(MimgInfo {
            dmask: dmask_for(comps),
            dim: map_dim(dim),
            unrm: true,
            cache: CachePolicy::default(),
            sync: image_sync(),
        }),
    ));
    ctx.bind(dst, dst_t);
    Ok(())
}

pub(super) fn store(
    ctx: &mut Context,
    image: ValueId,
    coords: ValueId,
    value: ValueId,
    dim: prism_ssa::ImageDim,
    mip: Option<ValueId>,
) -> Result<(), SelectError> {
    let comps = ctx.func.value(value).ty.comps;
    let desc = ctx.temp_of(image);
    if desc.rc().is_vector() {
        return Err(defect(value, "image descriptor must be uniform"));
    }
    let opcode = if mip.is_some() {
        Op::ImageStoreMip
    } else {
        Op::ImageStore
    };
    let data = vector_temp(ctx, value);
    let mut addr_parts = vec![vector_temp(ctx, coords)];
    if let Some(m) = mip {
        addr_parts.push(vector_temp(ctx, m));
    }
    let vaddr = build_vaddr(ctx, &addr_parts);

    let mut bld = ctx.bld();
    bld.push(Instruction::with_extra(
        opcode,
        vec![
            Operand::temp(data),
            Operand::temp(desc),
            Operand::temp(vaddr),
        ],
        vec![],
        InstrExtra::Mimg(MimgInfo {
            dmask: dmask_for(comps),
            dim: map_dim(dim),
            unrm: true,
            cache: CachePolicy::default(),
            sync: image_sync(),
        }),
    ));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(super) fn atomic(
    ctx: &mut Context,
    dst: Option<ValueId>,
    image: ValueId,
    coords: ValueId,
    dim: prism_ssa::ImageDim,
    op: AtomicOp,
    data: ValueId,
    compare: Option<ValueId>,
) -> Result<(), SelectError> {
    let bytes = ctx.func.value(data).ty.bytes();
    if bytes != 4 {
        return Err(defect(data, "image atomics operate on 32-bit values"));
    }
    let desc = ctx.temp_of(image);
    if desc.rc().is_vector() {
        return Err(defect(data, "image descriptor must be uniform"));
    }
    let opcode = match op {
        AtomicOp::Swap => Op::ImageAtomicSwap,
        AtomicOp::CmpSwap => Op::ImageAtomicCmpswap,
        AtomicOp::Add => Op::ImageAtomicAdd,
        AtomicOp::Sub => Op::ImageAtomicSub,
        AtomicOp::SMin => Op::ImageAtomicSmin,
        AtomicOp::UMin => Op::ImageAtomicUmin,
        AtomicOp::SMax => Op::ImageAtomicSmax,
        AtomicOp::UMax => Op::ImageAtomicUmax,
        AtomicOp::And => Op::ImageAtomicAnd,
        AtomicOp::Or => Op::ImageAtomicOr,
        AtomicOp::Xor => Op::ImageAtomicXor,
    };

    let data_t = vector_temp(ctx, data);
    let payload = match compare {
        Some(c) => {
            if op != AtomicOp::CmpSwap {
                return Err(defect(data, "compare operand on a non-cmpswap atomic"));
            }
            let cmp_t = vector_temp(ctx, c);
            ctx.create_vector(RegClass::V2, &[data_t, cmp_t])
        }
        None if op == AtomicOp::CmpSwap => {
            return Err(defect(data, "compare-swap without a compare operand"))
        }
        None => data_t,
    };
    let vaddr = {
        let c = vector_temp(ctx, coords);
        build_vaddr(ctx, &[c])
    };

    let returns = dst.is_some();
    let defs: Vec<Definition> = match dst {
        Some(_) => {
            let t = ctx.program.alloc_temp(RegClass::V1);
            vec![Definition::of(t)]
        }
        None => vec![],
    };
    let mut bld = ctx.bld();
    bld.push(Instruction::with_extra(
        opcode,
        vec![
            Operand::temp(payload),
            Operand::temp(desc),
            Operand::temp(vaddr),
        ],
        defs.clone(),
        InstrExtra::Mimg(MimgInfo {
            dmask: if op == AtomicOp::CmpSwap { 0x3 } else { 0x1 },
            dim: map_dim(dim),
            unrm: true,
            cache: CachePolicy {
                glc: returns,
                ..CachePolicy::default()
            },
            sync: MemSync::atomic(StorageSet::IMAGE, MemScope::Device),
        }),
    ));
    if let (Some(d), Some(def)) = (dst, defs.first()) {
        ctx.bind(d, def.temp());
    }
    Ok(())
}
