//! Control-flow reconstruction.
//!
//! Structured `if`/`loop` constructs are rebuilt as a dual graph: *logical*
//! edges carry value flow (and phis), *linear* edges describe the literal
//! predicated branches, including convergence-only blocks that exist purely
//! so the branch graph joins without a critical edge. Divergent conditions
//! get the full exec-mask discipline; uniform conditions degenerate to plain
//! two-way branches with no mask traffic.
//!
//! The divergent-if discipline: entry saves exec and restricts it to the
//! condition; each side captures its final exec (which already excludes any
//! lanes removed by nested breaks or kills); the invert block flips exec to
//! the else lanes; the merge re-forms exec as the union of the two captured
//! masks. The captures flow through linear phis in the invert and merge
//! blocks, which is the entire reason those blocks exist on the linear graph
//! only.
//!
//! Loop exits are resolved in a second pass: a `break` records a pending
//! edge, and when the loop-exit block finally exists every pending branch is
//! patched and the header's merge instructions get one operand per
//! predecessor that actually materialized. Lane masks accumulated on
//! different sides of an `if` inside a loop (exit and continue bookkeeping)
//! are reconciled with freshly synthesized linear phis at each join.

use prism_ir::{
    add_linear_edge, add_logical_edge, BlockKind, Definition, InstrExtra, Op, Operand, PhysReg,
    RegClass, Temp,
};
use prism_ssa::{IfCf, Item, LoopCf, Region, ValueId};
use tracing::trace;

use crate::ctx::Context;
use crate::error::{defect, SelectError};
use crate::select;

/// How lowering of a region ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminated {
    /// Fell off the end; the caller emits the fall-through edge.
    No,
    /// An unconditional divergent exit removed every lane from the logical
    /// path, but linear execution still falls through (exec-predicated).
    LogicalOnly,
    /// An unconditional uniform transfer; nothing falls through at all.
    Linear,
}

impl Terminated {
    fn falls_linear(self) -> bool {
        !matches!(self, Terminated::Linear)
    }

    fn falls_logical(self) -> bool {
        matches!(self, Terminated::No)
    }
}

/// A branch emitted before its target block exists.
#[derive(Debug, Clone, Copy)]
struct PendingExit {
    block: u32,
    instr: usize,
    /// Exit mask to restore from if this is the tail empty-mask exit.
    exit_mask: Option<Temp>,
    /// Whether the site also takes a logical edge to the exit.
    logical: bool,
}

/// Per-loop reconstruction state.
#[derive(Debug)]
pub struct LoopFrame {
    header: u32,
    divergent: bool,
    /// Instruction indices of the value phis in the header, paired with the
    /// source values they merge.
    header_phis: Vec<(usize, ValueId, ValueId)>,
    /// Index of the exit-mask linear phi in the header (divergent only).
    exit_mask_phi: Option<usize>,
    /// Mask before the loop (divergent only).
    exit_mask_init: Option<Temp>,
    /// Lanes that have left the loop, as currently accumulated.
    cur_exit_mask: Option<Temp>,
    /// Lanes parked by a divergent continue this iteration.
    cur_cont_mask: Option<Temp>,
    /// Pending branch-based exits (uniform breaks, the tail empty-mask test).
    breaks: Vec<PendingExit>,
    /// Break sites that take only a logical edge to the exit.
    logical_exits: Vec<u32>,
    /// Back-edge predecessors, with the exit mask live at each.
    continues: Vec<(u32, Option<Temp>)>,
}

/// One entry per open structured construct.
#[derive(Debug)]
pub struct CfEntry {
    pub is_loop: bool,
    /// The branch condition at this level is divergent.
    pub divergent: bool,
    /// A lane-kill may have emptied exec somewhere under this construct.
    pub exec_potentially_empty: bool,
    /// Some nested exit under this construct is divergent.
    pub divergent_exit: bool,
    frame: Option<LoopFrame>,
}

/// Transient bookkeeping stack for open constructs; scoped to one function
/// and discarded when lowering finishes.
#[derive(Debug, Default)]
pub struct CfState {
    pub stack: Vec<CfEntry>,
}

impl CfState {
    pub fn loop_depth(&self) -> u16 {
        self.stack.iter().filter(|e| e.is_loop).count() as u16
    }

    pub fn in_divergent_cf(&self) -> bool {
        self.stack.iter().any(|e| e.divergent)
    }

    fn innermost_loop(&self) -> Option<usize> {
        self.stack.iter().rposition(|e| e.is_loop)
    }

    /// Mark every open construct as possibly running with an empty exec mask.
    /// The flag clears by scope exit: once the stack is empty again, control
    /// is back in fully-uniform top-level flow.
    pub fn set_exec_potentially_empty(&mut self) {
        for e in &mut self.stack {
            e.exec_potentially_empty = true;
        }
    }

    fn frame(&self, li: usize) -> &LoopFrame {
        self.stack[li].frame.as_ref().expect("loop entry has a frame")
    }

    fn frame_mut(&mut self, li: usize) -> &mut LoopFrame {
        self.stack[li].frame.as_mut().expect("loop entry has a frame")
    }
}

/// Threaded lane-mask state captured at a point of the linear program: the
/// exit and continue accumulators of every open loop. Reconciled with linear
/// phis wherever linear paths join.
type MaskSnapshot = Vec<(usize, Option<Temp>, Option<Temp>)>;

fn snapshot_masks(ctx: &Context) -> MaskSnapshot {
    ctx.cf
        .stack
        .iter()
        .enumerate()
        .filter(|(_, e)| e.is_loop)
        .map(|(i, e)| {
            let f = e.frame.as_ref().expect("loop entry has a frame");
            (i, f.cur_exit_mask, f.cur_cont_mask)
        })
        .collect()
}

fn restore_masks(ctx: &mut Context, snap: &MaskSnapshot) {
    for &(i, exit, cont) in snap {
        let f = ctx.cf.frame_mut(i);
        f.cur_exit_mask = exit;
        f.cur_cont_mask = cont;
    }
}

/// Merge threaded masks at `block`, whose linear predecessors are `preds`
/// (in linear-pred order) with the snapshot each carries. Slots where every
/// predecessor agrees resolve to the shared value; the rest get a freshly
/// synthesized linear phi.
fn reconcile_masks(ctx: &mut Context, preds: &[(u32, MaskSnapshot)]) {
    if preds.is_empty() {
        return;
    }
    let lm = ctx.program.lane_mask();
    let slots = preds[0].1.len();
    for slot in 0..slots {
        let stack_idx = preds[0].1[slot].0;
        for field in 0..2 {
            let vals: Vec<Option<Temp>> = preds
                .iter()
                .map(|(_, s)| if field == 0 { s[slot].1 } else { s[slot].2 })
                .collect();
            let merged = if vals.iter().all(|v| *v == vals[0]) {
                vals[0]
            } else {
                let operands = vals
                    .iter()
                    .map(|v| match v {
                        Some(t) => Operand::temp(*t),
                        None => Operand::zero(lm.bytes()),
                    })
                    .collect();
                let mut bld = ctx.bld();
                let dst = bld.tmp(lm);
                bld.pseudo(Op::PLinearPhi, operands, vec![Definition::of(dst)]);
                Some(dst)
            };
            let f = ctx.cf.frame_mut(stack_idx);
            if field == 0 {
                f.cur_exit_mask = merged;
            } else {
                f.cur_cont_mask = merged;
            }
        }
    }
}

/// Base kind for a block created in the current context.
fn ambient_kind(ctx: &Context) -> BlockKind {
    let mut kind = BlockKind::empty();
    if ctx.cf.stack.is_empty() {
        kind |= BlockKind::TOP_LEVEL;
    }
    if !ctx.cf.in_divergent_cf() {
        kind |= BlockKind::UNIFORM;
    }
    kind
}

fn new_block(ctx: &mut Context, extra: BlockKind) -> u32 {
    let kind = ambient_kind(ctx) | extra;
    let depth = ctx.cf.loop_depth();
    let idx = ctx.program.create_block(kind);
    ctx.program.block_mut(idx).loop_depth = depth;
    idx
}

fn patch_branch(ctx: &mut Context, block: u32, instr: usize, target: u32) {
    let i = &mut ctx.program.block_mut(block).instructions[instr];
    debug_assert!(matches!(i.extra, InstrExtra::Branch { target: u32::MAX }));
    i.extra = InstrExtra::Branch { target };
}

fn last_instr(ctx: &Context, block: u32) -> usize {
    ctx.program.block(block).instructions.len() - 1
}

/// Lower a structured region into the current block, creating successor
/// blocks as needed. This is the driver that hands each straight-line
/// instruction to the per-operation selector, in program order.
pub fn visit_region(ctx: &mut Context, region: &Region) -> Result<Terminated, SelectError> {
    for (i, item) in region.items.iter().enumerate() {
        let terminated = match item {
            Item::Inst(inst) => {
                select::visit_inst(ctx, inst)?;
                Terminated::No
            }
            Item::If(ifcf) => visit_if(ctx, ifcf)?,
            Item::Loop(lp) => visit_loop(ctx, lp)?,
            Item::Break { cond } => visit_break(ctx, *cond)?,
            Item::Continue { cond } => visit_continue(ctx, *cond)?,
        };
        if terminated != Terminated::No {
            if i + 1 != region.items.len() {
                // Items after an unconditional transfer are unreachable; the
                // front end is contractually required not to emit them.
                return Err(defect(
                    ValueId(0),
                    "unreachable items after an unconditional break/continue",
                ));
            }
            return Ok(terminated);
        }
    }
    Ok(Terminated::No)
}

fn visit_if(ctx: &mut Context, ifcf: &IfCf) -> Result<Terminated, SelectError> {
    if ctx.classes.is_mask_bool(ifcf.cond) {
        visit_divergent_if(ctx, ifcf)
    } else {
        visit_uniform_if(ctx, ifcf)
    }
}

/// Uniform conditional: a plain two-way branch on the scalar condition, a
/// single merge block, and no exec-mask traffic at all.
fn visit_uniform_if(ctx: &mut Context, ifcf: &IfCf) -> Result<Terminated, SelectError> {
    trace!(cond = %ifcf.cond, "uniform if");
    let cond = ctx.op(ifcf.cond);
    let branch_block = ctx.cur_block;
    ctx.program.block_mut(branch_block).kind |= BlockKind::BRANCH;

    ctx.cf.stack.push(CfEntry {
        is_loop: false,
        divergent: false,
        exec_potentially_empty: false,
        divergent_exit: false,
        frame: None,
    });
    let start_masks = snapshot_masks(ctx);

    // Branch to the else side when the condition is zero; fall through to
    // then. The else target is patched once its block exists.
    let mut bld = ctx.bld();
    bld.sopc(Op::SCmpLgU32, cond, Operand::zero(4));
    let scc = bld.scc();
    bld.cbranch(Op::PCbranchZ, scc, u32::MAX);
    let cbranch_at = last_instr(ctx, branch_block);

    let then_block = new_block(ctx, BlockKind::empty());
    add_logical_edge(&mut ctx.program.blocks, branch_block, then_block);
    add_linear_edge(&mut ctx.program.blocks, branch_block, then_block);
    ctx.cur_block = then_block;
    let then_term = visit_region(ctx, &ifcf.then_region)?;
    let then_end = ctx.cur_block;
    let then_masks = snapshot_masks(ctx);
    let then_branch_at = if then_term.falls_linear() {
        ctx.bld().branch(u32::MAX);
        Some(last_instr(ctx, then_end))
    } else {
        None
    };

    // The else side starts from the same mask state as the then side did;
    // the two run on disjoint linear paths.
    restore_masks(ctx, &start_masks);
    let else_block = new_block(ctx, BlockKind::empty());
    patch_branch(ctx, branch_block, cbranch_at, else_block);
    add_logical_edge(&mut ctx.program.blocks, branch_block, else_block);
    add_linear_edge(&mut ctx.program.blocks, branch_block, else_block);
    ctx.cur_block = else_block;
    let else_term = visit_region(ctx, &ifcf.else_region)?;
    let else_end = ctx.cur_block;
    let else_masks = snapshot_masks(ctx);

    let entry = ctx.cf.stack.pop().expect("if entry pushed above");
    if let Some(parent) = ctx.cf.stack.last_mut() {
        parent.exec_potentially_empty |= entry.exec_potentially_empty;
        parent.divergent_exit |= entry.divergent_exit;
    }

    if !then_term.falls_linear() && !else_term.falls_linear() {
        if !ifcf.phis.is_empty() {
            return Err(defect(
                ifcf.phis[0].dst,
                "merge phi on an if with no falling-through side",
            ));
        }
        return Ok(Terminated::Linear);
    }

    let merge = new_block(ctx, BlockKind::MERGE);
    let mut mask_preds = Vec::new();
    if let Some(at) = then_branch_at {
        patch_branch(ctx, then_end, at, merge);
        add_linear_edge(&mut ctx.program.blocks, then_end, merge);
        mask_preds.push((then_end, then_masks));
    }
    if else_term.falls_linear() {
        ctx.bld().branch(merge);
        add_linear_edge(&mut ctx.program.blocks, else_end, merge);
        mask_preds.push((else_end, else_masks));
    }
    if then_term.falls_logical() {
        add_logical_edge(&mut ctx.program.blocks, then_end, merge);
    }
    if else_term.falls_logical() {
        add_logical_edge(&mut ctx.program.blocks, else_end, merge);
    }
    ctx.cur_block = merge;
    reconcile_masks(ctx, &mask_preds);

    if !ifcf.phis.is_empty() && !(then_term.falls_logical() && else_term.falls_logical()) {
        return Err(defect(
            ifcf.phis[0].dst,
            "merge phi on an if with only one logically live side",
        ));
    }
    for phi in &ifcf.phis {
        let then_op = ctx.op(phi.then_value);
        let else_op = ctx.op(phi.else_value);
        let dst = ctx.temp_of(phi.dst);
        ctx.bld()
            .pseudo(Op::PPhi, vec![then_op, else_op], vec![Definition::of(dst)]);
    }
    Ok(Terminated::No)
}

/// Divergent conditional: both sides execute under restricted exec.
///
/// Linear layout (logical edges skip the invert block entirely):
///
/// ```text
///   branch --+--> then ... --+--> invert --+--> else ... --+--> merge
///            |               |             |               |
///            +---------------+--> invert   +---------------+--> merge
/// ```
fn visit_divergent_if(ctx: &mut Context, ifcf: &IfCf) -> Result<Terminated, SelectError> {
    trace!(cond = %ifcf.cond, "divergent if");
    let mask = ctx.op(ifcf.cond);
    let branch_block = ctx.cur_block;
    ctx.program.block_mut(branch_block).kind |= BlockKind::BRANCH;
    let lm = ctx.program.lane_mask();

    // exec := exec & cond, remembering the entry mask. Skip the whole then
    // side when no lane takes it.
    let mut bld = ctx.bld();
    let saved = bld.save_exec_and(mask);
    let exec = bld.exec();
    bld.cbranch(Op::PCbranchZ, exec, u32::MAX);
    let skip_then_at = last_instr(ctx, branch_block);

    ctx.cf.stack.push(CfEntry {
        is_loop: false,
        divergent: true,
        exec_potentially_empty: false,
        divergent_exit: false,
        frame: None,
    });
    let start_masks = snapshot_masks(ctx);

    let then_block = new_block(ctx, BlockKind::empty());
    add_logical_edge(&mut ctx.program.blocks, branch_block, then_block);
    add_linear_edge(&mut ctx.program.blocks, branch_block, then_block);
    ctx.cur_block = then_block;
    ctx.bld().pseudo(Op::PLogicalStart, vec![], vec![]);
    let then_term = visit_region(ctx, &ifcf.then_region)?;
    if !then_term.falls_linear() {
        // Only a nested construct that never terminates (an endless loop)
        // can end a divergent side without linear fall-through; the exec
        // discipline has no join to reconverge at.
        return Err(defect(
            ifcf.cond,
            "non-terminating construct inside a divergent conditional",
        ));
    }
    let then_end = ctx.cur_block;
    let then_masks = snapshot_masks(ctx);
    ctx.bld().pseudo(Op::PLogicalEnd, vec![], vec![]);
    // Capture the then side's final exec: nested breaks and kills have
    // already removed their lanes from it.
    let then_exec = {
        let mut bld = ctx.bld();
        let exec = bld.exec();
        bld.copy(lm, exec)
    };
    ctx.bld().branch(u32::MAX);
    let then_branch_at = last_instr(ctx, then_end);

    // Invert block: linear-only convergence point flipping exec to the else
    // lanes. Its linear phis carry the then side's captured state past the
    // skip-then edge (on which the then side never ran).
    let invert = new_block(ctx, BlockKind::INVERT);
    patch_branch(ctx, branch_block, skip_then_at, invert);
    add_linear_edge(&mut ctx.program.blocks, branch_block, invert);
    patch_branch(ctx, then_end, then_branch_at, invert);
    add_linear_edge(&mut ctx.program.blocks, then_end, invert);
    ctx.cur_block = invert;
    let then_exec_m = {
        let mut bld = ctx.bld();
        let dst = bld.tmp(lm);
        bld.pseudo(
            Op::PLinearPhi,
            vec![Operand::zero(lm.bytes()), Operand::temp(then_exec)],
            vec![Definition::of(dst)],
        );
        dst
    };
    reconcile_masks(
        ctx,
        &[(branch_block, start_masks), (then_end, then_masks)],
    );
    let invert_masks = snapshot_masks(ctx);
    let mut bld = ctx.bld();
    bld.exec_write(Op::SAndn2B32, Op::SAndn2B64, Operand::temp(saved), mask);
    let exec = bld.exec();
    bld.cbranch(Op::PCbranchZ, exec, u32::MAX);
    let skip_else_at = last_instr(ctx, invert);

    let else_block = new_block(ctx, BlockKind::empty());
    add_logical_edge(&mut ctx.program.blocks, branch_block, else_block);
    add_linear_edge(&mut ctx.program.blocks, invert, else_block);
    ctx.cur_block = else_block;
    ctx.bld().pseudo(Op::PLogicalStart, vec![], vec![]);
    let else_term = visit_region(ctx, &ifcf.else_region)?;
    if !else_term.falls_linear() {
        return Err(defect(
            ifcf.cond,
            "non-terminating construct inside a divergent conditional",
        ));
    }
    let else_end = ctx.cur_block;
    let else_masks = snapshot_masks(ctx);
    ctx.bld().pseudo(Op::PLogicalEnd, vec![], vec![]);
    let else_exec = {
        let mut bld = ctx.bld();
        let exec = bld.exec();
        bld.copy(lm, exec)
    };
    ctx.bld().branch(u32::MAX);
    let else_branch_at = last_instr(ctx, else_end);

    let entry = ctx.cf.stack.pop().expect("if entry pushed above");
    if let Some(parent) = ctx.cf.stack.last_mut() {
        parent.exec_potentially_empty |= entry.exec_potentially_empty;
        parent.divergent_exit |= entry.divergent_exit;
    }

    // Merge: phis first (linear exec/mask merges and the value phis), then
    // exec is re-formed as the union of the two sides' survivors.
    let merge = new_block(ctx, BlockKind::MERGE);
    patch_branch(ctx, invert, skip_else_at, merge);
    add_linear_edge(&mut ctx.program.blocks, invert, merge);
    patch_branch(ctx, else_end, else_branch_at, merge);
    add_linear_edge(&mut ctx.program.blocks, else_end, merge);
    if then_term.falls_logical() {
        add_logical_edge(&mut ctx.program.blocks, then_end, merge);
    }
    if else_term.falls_logical() {
        add_logical_edge(&mut ctx.program.blocks, else_end, merge);
    }
    ctx.cur_block = merge;

    let else_exec_m = {
        let mut bld = ctx.bld();
        let dst = bld.tmp(lm);
        bld.pseudo(
            Op::PLinearPhi,
            vec![Operand::zero(lm.bytes()), Operand::temp(else_exec)],
            vec![Definition::of(dst)],
        );
        dst
    };
    reconcile_masks(
        ctx,
        &[(invert, invert_masks), (else_end, else_masks)],
    );
    if !ifcf.phis.is_empty() && !(then_term.falls_logical() && else_term.falls_logical()) {
        return Err(defect(
            ifcf.phis[0].dst,
            "merge phi on a divergent if with a logically terminated side",
        ));
    }
    for phi in &ifcf.phis {
        let then_op = ctx.op(phi.then_value);
        let else_op = ctx.op(phi.else_value);
        let dst = ctx.temp_of(phi.dst);
        ctx.bld()
            .pseudo(Op::PPhi, vec![then_op, else_op], vec![Definition::of(dst)]);
    }
    ctx.bld().exec_write(
        Op::SOrB32,
        Op::SOrB64,
        Operand::temp(then_exec_m),
        Operand::temp(else_exec_m),
    );

    // Both sides logically dead can only happen when each ended in an
    // unconditional divergent loop exit; the merge then simply carries an
    // empty exec until the enclosing loop tail notices.
    Ok(if then_term.falls_logical() || else_term.falls_logical() {
        Terminated::No
    } else {
        Terminated::LogicalOnly
    })
}

/// Whether any exit (break/continue) of this loop runs under divergent
/// control: a conditional exit on a lane mask, or any exit nested inside a
/// divergent `if` within the loop body. Nested loops keep their exits to
/// themselves.
fn region_has_divergent_exit(ctx: &Context, region: &Region, under_divergent: bool) -> bool {
    region.items.iter().any(|item| match item {
        Item::Break { cond } | Item::Continue { cond } => {
            under_divergent || cond.is_some_and(|c| ctx.classes.is_mask_bool(c))
        }
        Item::If(ifcf) => {
            let div = under_divergent || ctx.classes.is_mask_bool(ifcf.cond);
            region_has_divergent_exit(ctx, &ifcf.then_region, div)
                || region_has_divergent_exit(ctx, &ifcf.else_region, div)
        }
        Item::Loop(_) | Item::Inst(_) => false,
    })
}

fn visit_loop(ctx: &mut Context, lp: &LoopCf) -> Result<Terminated, SelectError> {
    let divergent = ctx.cf.in_divergent_cf() || region_has_divergent_exit(ctx, &lp.body, false);
    trace!(divergent, "loop");
    let lm = ctx.program.lane_mask();

    let preheader = ctx.cur_block;
    // Divergent loops track which lanes have left; at entry, none have.
    let exit_mask_init = if divergent {
        let mut bld = ctx.bld();
        let op = if lm == RegClass::S1 {
            Op::SMovB32
        } else {
            Op::SMovB64
        };
        Some(bld.sop1(op, lm, Operand::zero(lm.bytes())))
    } else {
        None
    };
    ctx.bld().branch(u32::MAX);
    let pre_branch_at = last_instr(ctx, preheader);

    let mut frame = LoopFrame {
        header: 0,
        divergent,
        header_phis: Vec::new(),
        exit_mask_phi: None,
        exit_mask_init,
        cur_exit_mask: None,
        cur_cont_mask: None,
        breaks: Vec::new(),
        logical_exits: Vec::new(),
        continues: Vec::new(),
    };
    ctx.cf.stack.push(CfEntry {
        is_loop: true,
        divergent,
        exec_potentially_empty: false,
        divergent_exit: divergent,
        frame: None,
    });

    // The header is created first, with provisional merge instructions
    // carrying only their entry operand. Continue-edge operands are
    // reconciled after the body is lowered, when the set of continue
    // predecessors is known.
    let header = new_block(ctx, BlockKind::LOOP_HEADER | BlockKind::MERGE);
    frame.header = header;
    patch_branch(ctx, preheader, pre_branch_at, header);
    add_logical_edge(&mut ctx.program.blocks, preheader, header);
    add_linear_edge(&mut ctx.program.blocks, preheader, header);
    ctx.cur_block = header;

    for phi in &lp.phis {
        let init = ctx.op(phi.init);
        let dst = ctx.temp_of(phi.dst);
        ctx.bld()
            .pseudo(Op::PPhi, vec![init], vec![Definition::of(dst)]);
        frame
            .header_phis
            .push((last_instr(ctx, header), phi.init, phi.cont));
    }
    if let Some(init) = exit_mask_init {
        let mut bld = ctx.bld();
        let dst = bld.tmp(lm);
        bld.pseudo(
            Op::PLinearPhi,
            vec![Operand::temp(init)],
            vec![Definition::of(dst)],
        );
        frame.exit_mask_phi = Some(last_instr(ctx, header));
        frame.cur_exit_mask = Some(dst);
    }
    let li = ctx.cf.stack.len() - 1;
    ctx.cf.stack[li].frame = Some(frame);

    let body_term = visit_region(ctx, &lp.body)?;
    if body_term.falls_linear() {
        lower_loop_tail(ctx, li);
    }

    let entry = ctx.cf.stack.pop().expect("loop entry");
    let frame = entry.frame.expect("loop frame");
    if let Some(parent) = ctx.cf.stack.last_mut() {
        parent.exec_potentially_empty |= entry.exec_potentially_empty;
        parent.divergent_exit |= entry.divergent_exit;
    }

    // Reconcile the header merges. Value phis resolve to the single continue
    // value (every continue path agrees by SSA construction); the exit-mask
    // phi takes each path's own accumulated mask.
    let continue_count = frame.continues.len();
    for &(at, init, cont) in &frame.header_phis {
        let init_op = ctx.op(init);
        let cont_op = ctx.op(cont);
        let mut operands = vec![init_op];
        operands.extend(std::iter::repeat_n(cont_op, continue_count));
        ctx.program.block_mut(frame.header).instructions[at].operands = operands;
    }
    if let Some(at) = frame.exit_mask_phi {
        let mut operands = vec![Operand::temp(
            frame.exit_mask_init.expect("divergent loop"),
        )];
        for &(_, mask) in &frame.continues {
            operands.push(Operand::temp(mask.expect("divergent loop threads masks")));
        }
        ctx.program.block_mut(frame.header).instructions[at].operands = operands;
    }

    if frame.breaks.is_empty() && frame.logical_exits.is_empty() {
        // No exit anywhere: the loop never terminates and there is nothing
        // to fall through to. The header's merges were already reconciled.
        return Ok(Terminated::Linear);
    }

    let exit = new_block(ctx, BlockKind::LOOP_EXIT);
    let mut exit_masks = Vec::new();
    for pending in &frame.breaks {
        patch_branch(ctx, pending.block, pending.instr, exit);
        add_linear_edge(&mut ctx.program.blocks, pending.block, exit);
        if pending.logical {
            add_logical_edge(&mut ctx.program.blocks, pending.block, exit);
        }
        exit_masks.push(pending.exit_mask);
    }
    for &block in &frame.logical_exits {
        add_logical_edge(&mut ctx.program.blocks, block, exit);
    }
    ctx.cur_block = exit;

    if frame.divergent && exit_masks.iter().any(|m| m.is_some()) {
        // Re-enable the lanes that left the loop. Several tail tests can
        // reach the exit with differently accumulated masks; they merge
        // through a linear phi in exit-predecessor order.
        let masks: Vec<Temp> = exit_masks
            .iter()
            .map(|m| m.expect("divergent loop exits all carry masks"))
            .collect();
        let restored = if masks.len() == 1 {
            masks[0]
        } else {
            let lm = ctx.program.lane_mask();
            let operands = masks.iter().map(|&m| Operand::temp(m)).collect();
            let mut bld = ctx.bld();
            let dst = bld.tmp(lm);
            bld.pseudo(Op::PLinearPhi, operands, vec![Definition::of(dst)]);
            dst
        };
        ctx.bld().exec_restore(Operand::temp(restored));
    }
    Ok(Terminated::No)
}

/// Close out one loop iteration: re-enable parked lanes, test for an empty
/// mask if anything could have emptied it, and take the back edge.
fn lower_loop_tail(ctx: &mut Context, li: usize) {
    if let Some(mask) = ctx.cf.frame(li).cur_cont_mask {
        let exec = ctx.bld().exec();
        ctx.bld()
            .exec_write(Op::SOrB32, Op::SOrB64, exec, Operand::temp(mask));
        ctx.cf.frame_mut(li).cur_cont_mask = None;
    }

    let block = ctx.cur_block;
    ctx.program.block_mut(block).kind |= BlockKind::CONTINUE;
    let needs_empty_test = {
        let e = &ctx.cf.stack[li];
        let f = e.frame.as_ref().expect("loop frame");
        (f.divergent && (!f.breaks.is_empty() || !f.logical_exits.is_empty()))
            || e.exec_potentially_empty
    };
    if needs_empty_test {
        let exit_mask = ctx.cf.frame(li).cur_exit_mask;
        let exec = ctx.bld().exec();
        ctx.bld().cbranch(Op::PCbranchZ, exec, u32::MAX);
        let at = last_instr(ctx, block);
        ctx.cf.frame_mut(li).breaks.push(PendingExit {
            block,
            instr: at,
            exit_mask,
            logical: false,
        });
    }

    let header = ctx.cf.frame(li).header;
    ctx.bld().branch(header);
    add_logical_edge(&mut ctx.program.blocks, block, header);
    add_linear_edge(&mut ctx.program.blocks, block, header);
    let exit_mask = ctx.cf.frame(li).cur_exit_mask;
    ctx.cf.frame_mut(li).continues.push((block, exit_mask));
}

fn visit_break(ctx: &mut Context, cond: Option<ValueId>) -> Result<Terminated, SelectError> {
    let Some(li) = ctx.cf.innermost_loop() else {
        return Err(defect(cond.unwrap_or(ValueId(0)), "break outside any loop"));
    };
    if ctx.cf.frame(li).divergent {
        ctx.cf.stack[li].divergent_exit = true;
        lower_divergent_break(ctx, li, cond)
    } else {
        lower_uniform_break(ctx, li, cond)
    }
}

/// Uniform break: a direct branch with no mask overhead. Purely an
/// optimization over the masked form; legal because neither the loop nor
/// any conditional between the loop and this site is divergent.
fn lower_uniform_break(
    ctx: &mut Context,
    li: usize,
    cond: Option<ValueId>,
) -> Result<Terminated, SelectError> {
    let block = ctx.cur_block;
    ctx.program.block_mut(block).kind |= BlockKind::BREAK;
    match cond {
        None => {
            ctx.bld().branch(u32::MAX);
            let at = last_instr(ctx, block);
            ctx.cf.frame_mut(li).breaks.push(PendingExit {
                block,
                instr: at,
                exit_mask: None,
                logical: true,
            });
            Ok(Terminated::Linear)
        }
        Some(c) => {
            let cond_op = ctx.op(c);
            let mut bld = ctx.bld();
            bld.sopc(Op::SCmpLgU32, cond_op, Operand::zero(4));
            let scc = bld.scc();
            bld.cbranch(Op::PCbranchNz, scc, u32::MAX);
            let at = last_instr(ctx, block);
            ctx.cf.frame_mut(li).breaks.push(PendingExit {
                block,
                instr: at,
                exit_mask: None,
                logical: true,
            });
            let rest = new_block(ctx, BlockKind::empty());
            add_logical_edge(&mut ctx.program.blocks, block, rest);
            add_linear_edge(&mut ctx.program.blocks, block, rest);
            ctx.cur_block = rest;
            Ok(Terminated::No)
        }
    }
}

/// Divergent break: the taken lanes leave exec and accumulate into the
/// loop's exit mask. No branch is emitted here: lanes parked by enclosing
/// divergent conditionals may still have work in this iteration, so the
/// empty-mask test lives at the loop tail.
fn lower_divergent_break(
    ctx: &mut Context,
    li: usize,
    cond: Option<ValueId>,
) -> Result<Terminated, SelectError> {
    let block = ctx.cur_block;
    ctx.program.block_mut(block).kind |= BlockKind::BREAK;
    let cur_mask = ctx
        .cf
        .frame(li)
        .cur_exit_mask
        .expect("divergent loop tracks an exit mask");

    let (new_mask, unconditional) = match cond {
        None => {
            let exec = ctx.bld().exec();
            let m = ctx
                .bld()
                .mask_op(Op::SOrB32, Op::SOrB64, Operand::temp(cur_mask), exec);
            let exec2 = ctx.bld().exec();
            ctx.bld()
                .exec_write(Op::SAndn2B32, Op::SAndn2B64, exec2, exec2);
            (m, true)
        }
        Some(c) => {
            let cond_op = mask_operand(ctx, c)?;
            let mut bld = ctx.bld();
            let exec = bld.exec();
            // Masks can carry stale bits for currently inactive lanes; the
            // taken set is always intersected with exec.
            let taken = bld.mask_op(Op::SAndB32, Op::SAndB64, cond_op, exec);
            let m = bld.mask_op(
                Op::SOrB32,
                Op::SOrB64,
                Operand::temp(cur_mask),
                Operand::temp(taken),
            );
            bld.exec_write(Op::SAndn2B32, Op::SAndn2B64, exec, Operand::temp(taken));
            (m, false)
        }
    };
    let frame = ctx.cf.frame_mut(li);
    frame.cur_exit_mask = Some(new_mask);
    frame.logical_exits.push(block);
    Ok(if unconditional {
        Terminated::LogicalOnly
    } else {
        Terminated::No
    })
}

fn visit_continue(ctx: &mut Context, cond: Option<ValueId>) -> Result<Terminated, SelectError> {
    let Some(li) = ctx.cf.innermost_loop() else {
        return Err(defect(
            cond.unwrap_or(ValueId(0)),
            "continue outside any loop",
        ));
    };
    let frame_divergent = ctx.cf.frame(li).divergent;

    let site_divergent = ctx.cf.stack[li + 1..].iter().any(|e| e.divergent);
    match cond {
        None if !site_divergent => {
            // All active lanes take the back edge together and parked lanes
            // are re-enabled on the way; a plain branch suffices.
            ctx.program.block_mut(ctx.cur_block).kind |= BlockKind::CONTINUE;
            lower_loop_tail(ctx, li);
            Ok(Terminated::Linear)
        }
        None => {
            // Under a divergent conditional, other lanes still have work in
            // this iteration: park every active lane until the tail.
            ctx.cf.stack[li].divergent_exit = true;
            let cur = ctx.cf.frame(li).cur_cont_mask;
            let mut bld = ctx.bld();
            let exec = bld.exec();
            let parked = match cur {
                Some(m) => bld.mask_op(Op::SOrB32, Op::SOrB64, Operand::temp(m), exec),
                None => bld.copy(bld.lane_mask(), exec),
            };
            bld.exec_write(Op::SAndn2B32, Op::SAndn2B64, exec, exec);
            ctx.cf.frame_mut(li).cur_cont_mask = Some(parked);
            Ok(Terminated::LogicalOnly)
        }
        Some(c) if !frame_divergent => {
            // Uniform conditional continue: branch straight to the header
            // when taken.
            let cond_op = ctx.op(c);
            let block = ctx.cur_block;
            ctx.program.block_mut(block).kind |= BlockKind::CONTINUE;
            let header = ctx.cf.frame(li).header;
            let mut bld = ctx.bld();
            bld.sopc(Op::SCmpLgU32, cond_op, Operand::zero(4));
            let scc = bld.scc();
            bld.cbranch(Op::PCbranchNz, scc, header);
            add_logical_edge(&mut ctx.program.blocks, block, header);
            add_linear_edge(&mut ctx.program.blocks, block, header);
            let exit_mask = ctx.cf.frame(li).cur_exit_mask;
            ctx.cf.frame_mut(li).continues.push((block, exit_mask));
            let rest = new_block(ctx, BlockKind::empty());
            add_logical_edge(&mut ctx.program.blocks, block, rest);
            add_linear_edge(&mut ctx.program.blocks, block, rest);
            ctx.cur_block = rest;
            Ok(Terminated::No)
        }
        Some(c) => {
            // Divergent conditional continue: park the taken lanes; they
            // rejoin at the loop tail.
            ctx.cf.stack[li].divergent_exit = true;
            let cond_op = mask_operand(ctx, c)?;
            let cur = ctx.cf.frame(li).cur_cont_mask;
            let mut bld = ctx.bld();
            let exec = bld.exec();
            let taken = bld.mask_op(Op::SAndB32, Op::SAndB64, cond_op, exec);
            let parked = match cur {
                Some(m) => bld.mask_op(
                    Op::SOrB32,
                    Op::SOrB64,
                    Operand::temp(m),
                    Operand::temp(taken),
                ),
                None => taken,
            };
            bld.exec_write(Op::SAndn2B32, Op::SAndn2B64, exec, Operand::temp(taken));
            ctx.cf.frame_mut(li).cur_cont_mask = Some(parked);
            Ok(Terminated::No)
        }
    }
}

/// Lane-kill lowering. The killed lanes leave exec immediately; because an
/// emptied mask would make every exec-predicated loop exit unreachable, the
/// enclosing loops are flagged so their tails test for it, and a top-level
/// kill exits the program early.
pub fn lower_discard(ctx: &mut Context, cond: Option<ValueId>) -> Result<(), SelectError> {
    let taken = match cond {
        Some(c) => {
            let cond_op = mask_operand(ctx, c)?;
            let mut bld = ctx.bld();
            let exec = bld.exec();
            let t = bld.mask_op(Op::SAndB32, Op::SAndB64, cond_op, exec);
            Operand::temp(t)
        }
        None => ctx.bld().exec(),
    };
    {
        let lm = ctx.program.lane_mask();
        let mut bld = ctx.bld();
        let exec_t = bld.tmp(lm);
        bld.pseudo(
            Op::PDiscardIf,
            vec![taken],
            vec![Definition::fixed(exec_t, PhysReg::EXEC)],
        );
    }
    ctx.cf.set_exec_potentially_empty();

    if ctx.cf.innermost_loop().is_none() && !ctx.cf.in_divergent_cf() {
        // Fully uniform top level: if everything is dead, stop running the
        // wave at all. Expanded to a real branch after allocation.
        let exec = ctx.bld().exec();
        ctx.bld().pseudo(Op::PExitEarlyIf, vec![exec], vec![]);
    }
    Ok(())
}

/// Operand for a boolean value used as a lane mask. Uniform booleans are
/// widened against exec: a uniform true covers every active lane, a uniform
/// false none of them.
fn mask_operand(ctx: &mut Context, c: ValueId) -> Result<Operand, SelectError> {
    if ctx.classes.is_mask_bool(c) {
        return Ok(ctx.op(c));
    }
    let cond_op = ctx.op(c);
    let mut bld = ctx.bld();
    bld.sopc(Op::SCmpLgU32, cond_op, Operand::zero(4));
    let lm = bld.lane_mask();
    let exec = bld.exec();
    let op = if lm == RegClass::S1 {
        Op::SCselectB32
    } else {
        Op::SCselectB64
    };
    let mask = bld.cselect(op, lm, exec, Operand::zero(lm.bytes()));
    Ok(Operand::temp(mask))
}
