#![forbid(unsafe_code)]

//! Instruction selection: lowers a structured, divergence-annotated SSA
//! function into the wavefront-oriented target IR.
//!
//! The pass runs in four cooperating pieces. Register-class inference first
//! commits every source value to scalar or vector storage. The control-flow
//! reconstructor then walks the structured body, building the dual
//! logical/linear block graph with exact exec-mask discipline, and hands
//! each straight-line instruction to the per-operation selector, which emits
//! target instructions through the shared builder. Memory operations go
//! through a storage-agnostic access splitter parameterized by per-backend
//! capability records.
//!
//! The pass is single-threaded and deterministic; all mutable state hangs
//! off one [`Context`](ctx::Context) owning the program under construction.

mod builder;
mod cfg;
mod ctx;
mod error;
mod memory;
mod regclass;
mod select;

use prism_hw::{Generation, WaveSize};
use prism_ir::{BlockKind, Definition, Instruction, Op, Program};
use prism_ssa::Function;
use tracing::debug;

pub use builder::Builder;
pub use error::SelectError;
pub use regclass::{infer_reg_classes, RegClassMap};

/// Selection configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectOptions {
    /// Wave size override; defaults to wave64. Wave32 requires a generation
    /// that supports it.
    pub wave_size: Option<WaveSize>,
}

/// Lower one function to a complete target-IR program.
pub fn select_function(
    func: &Function,
    gen: Generation,
    options: &SelectOptions,
) -> Result<Program, SelectError> {
    let wave_size = match options.wave_size {
        Some(w) => {
            if w == WaveSize::Wave32 && !gen.has_wave32() {
                return Err(SelectError::Unsupported {
                    gen,
                    message: "wave32 dispatch".into(),
                });
            }
            w
        }
        None => WaveSize::Wave64,
    };
    debug!(name = %func.name, ?gen, lanes = wave_size.lanes(), "selecting function");

    let classes = regclass::infer_reg_classes(func, wave_size)?;
    let mut program = Program::new(gen, wave_size);
    let entry = program.create_block(BlockKind::TOP_LEVEL | BlockKind::UNIFORM);
    debug_assert_eq!(entry, program.entry());

    let mut ctx = ctx::Context::new(func, program, classes);

    // Parameters materialize as the definitions of the entry marker.
    let param_defs: Vec<Definition> = func
        .params
        .iter()
        .map(|p| Definition::of(ctx.temp_of(p.value)))
        .collect();
    ctx.bld().pseudo(Op::PStartpgm, vec![], param_defs);

    let term = cfg::visit_region(&mut ctx, &func.body)?;
    if term != cfg::Terminated::Linear {
        ctx.bld().push(Instruction::new(Op::SEndpgm, vec![], vec![]));
    }

    debug!(
        blocks = ctx.program.blocks.len(),
        temps = ctx.program.temp_count(),
        "selection finished"
    );
    Ok(ctx.program)
}
