//! Generic memory-access splitting.
//!
//! A logical transfer of N components is decomposed into hardware transfers
//! the storage backend can actually encode, then recombined into (or split
//! out of) the composite value. The splitter itself is storage-agnostic:
//! everything backend-specific arrives through [`TransferBackend`], whose
//! capability record bounds transfer width, sub-word support, and the
//! encodable constant-offset window.

use prism_hw::TransferCaps;
use prism_ir::{Op, Operand, RegClass, RegKind, Temp};
use tracing::trace;

use crate::ctx::Context;
use crate::error::SelectError;

/// One storage backend, wrapped around whatever address state it carries
/// (descriptor, base pointer, per-lane offset).
pub trait TransferBackend {
    fn name(&self) -> &'static str;

    fn caps(&self) -> TransferCaps;

    /// Fold `excess` bytes into the address expression; subsequent offsets
    /// are relative to the rebased address.
    fn rebase(&mut self, ctx: &mut Context, excess: u32) -> Result<(), SelectError>;

    /// Emit one load of `bytes` at constant `offset`. `bytes` is a power of
    /// two within the capability record (or a widened dword for a sub-word
    /// request the splitter already validated). Returns the result temp and
    /// the bytes actually transferred.
    fn emit_load(
        &mut self,
        ctx: &mut Context,
        offset: u32,
        bytes: u32,
    ) -> Result<(Temp, u32), SelectError>;

    /// Emit one store of `bytes` of `data` at constant `offset`.
    fn emit_store(
        &mut self,
        ctx: &mut Context,
        offset: u32,
        bytes: u32,
        data: Temp,
    ) -> Result<(), SelectError>;
}

/// Alignment of the access at `progress` bytes past its start.
fn align_at(base_align: u32, progress: u32) -> u32 {
    let a = base_align.max(1);
    if progress == 0 {
        a
    } else {
        a.min(1 << progress.trailing_zeros())
    }
}

fn largest_pow2_at_most(v: u32) -> u32 {
    debug_assert!(v > 0);
    1 << (31 - v.leading_zeros())
}

/// Width of the next transfer at `progress`, honoring the remaining byte
/// count, the backend maximum, and the address alignment (only alignments
/// below a dword force narrowing; dword-aligned wide transfers are fine).
fn next_width(caps: TransferCaps, remaining: u32, al: u32) -> u32 {
    let mut want = largest_pow2_at_most(remaining.min(caps.max_transfer_bytes));
    if al < 4 {
        want = want.min(largest_pow2_at_most(al));
    }
    want
}

/// Shared offset-window state: folds oversized constant offsets into the
/// address via [`TransferBackend::rebase`], keeping the encodable remainder.
struct OffsetWindow {
    rebased: u32,
}

impl OffsetWindow {
    fn new() -> OffsetWindow {
        OffsetWindow { rebased: 0 }
    }

    fn resolve(
        &mut self,
        ctx: &mut Context,
        backend: &mut dyn TransferBackend,
        absolute: u32,
    ) -> Result<u32, SelectError> {
        let window = backend.caps().max_constant_offset;
        let mut eff = absolute - self.rebased;
        if eff > window {
            // `eff > window` implies window < u32::MAX, so the +1 is safe.
            // A zero window folds the entire offset every time.
            let excess = eff - eff % (window + 1);
            backend.rebase(ctx, excess)?;
            self.rebased += excess;
            eff -= excess;
        }
        Ok(eff)
    }
}

/// Decompose a load of `total` bytes (alignment `align`, starting at
/// constant `offset`) into backend transfers. Returns the parts in address
/// order; their sizes tile `[0, total)` except that the final part may
/// extend past `total` when the backend widened a tail (the recombiner
/// trims it).
pub fn split_load(
    ctx: &mut Context,
    backend: &mut dyn TransferBackend,
    total: u32,
    align: u32,
    offset: u32,
    result_kind: RegKind,
) -> Result<Vec<Temp>, SelectError> {
    debug_assert!(total > 0);
    let caps = backend.caps();
    let mut window = OffsetWindow::new();
    let mut parts = Vec::new();
    let mut done = 0u32;

    while done < total {
        let remaining = total - done;
        let al = align_at(align, done);
        let want = next_width(caps, remaining, al);
        let eff = window.resolve(ctx, backend, offset + done)?;

        let (part, advanced) = if want < 4 && !caps.supports_subword_transfer {
            // Sub-word request against a word-only backend: load the
            // containing dword and extract. Requires the address itself to
            // be dword-aligned here; a backend that is both word-only and
            // fed sub-dword-aligned data cannot represent the access at all.
            if al < 4 {
                return Err(SelectError::Capability {
                    backend: backend.name(),
                    needed: want,
                    max: 4,
                });
            }
            let (whole, got) = backend.emit_load(ctx, eff, 4)?;
            debug_assert_eq!(got, 4);
            let keep = want.min(remaining);
            (extract_low_bytes(ctx, whole, keep, result_kind), keep)
        } else {
            let (t, got) = backend.emit_load(ctx, eff, want)?;
            debug_assert!(got > 0, "backend transferred nothing");
            (t, got.min(remaining))
        };
        trace!(backend = backend.name(), offset = eff, bytes = advanced, "transfer");
        parts.push(part);
        done += advanced;
    }
    Ok(parts)
}

/// Concatenate load parts into the destination class, trimming a widened
/// tail, and populate the composite cache.
pub fn recombine_parts(ctx: &mut Context, dst_rc: RegClass, parts: Vec<Temp>) -> Temp {
    let total = dst_rc.bytes();
    let sum: u32 = parts.iter().map(|p| p.bytes()).sum();
    debug_assert!(sum >= total, "parts cover the whole destination");
    let mut parts = parts;
    if sum > total {
        let last = parts.pop().expect("at least one part");
        let extra = sum - total;
        let keep = last.bytes() - extra;
        let trimmed = ctx.split_vector(last, &[keep, extra])[0];
        parts.push(trimmed);
    }
    if parts.len() == 1 && parts[0].rc() == dst_rc {
        return parts[0];
    }
    ctx.create_vector(dst_rc, &parts)
}

/// Decompose a store of `data` the same way. Sub-word stores require native
/// sub-word support; a word-only backend cannot read-modify-write.
pub fn split_store(
    ctx: &mut Context,
    backend: &mut dyn TransferBackend,
    data: Temp,
    align: u32,
    offset: u32,
) -> Result<(), SelectError> {
    let total = data.bytes();
    debug_assert!(total > 0);
    let caps = backend.caps();
    let mut window = OffsetWindow::new();
    let mut done = 0u32;

    while done < total {
        let remaining = total - done;
        let al = align_at(align, done);
        let want = next_width(caps, remaining, al);
        if want < 4 && !caps.supports_subword_transfer {
            return Err(SelectError::Capability {
                backend: backend.name(),
                needed: want,
                max: 4,
            });
        }
        let eff = window.resolve(ctx, backend, offset + done)?;
        let part = extract_byte_range(ctx, data, done, want);
        backend.emit_store(ctx, eff, want, part)?;
        trace!(backend = backend.name(), offset = eff, bytes = want, "transfer");
        done += want;
    }
    Ok(())
}

/// Low `keep` bytes of a dword temp, as a fresh narrow temp.
fn extract_low_bytes(ctx: &mut Context, whole: Temp, keep: u32, kind: RegKind) -> Temp {
    if keep == whole.bytes() {
        return whole;
    }
    let rc = RegClass::of(kind, keep);
    let mut bld = ctx.bld();
    match kind {
        RegKind::Scalar => {
            // s_bfe packs offset | width<<16 into the second source.
            bld.sop2(
                Op::SBfeU32,
                rc,
                Operand::temp(whole),
                Operand::c32((keep * 8) << 16),
            )
        }
        RegKind::Vector | RegKind::LinearVector => bld.vop3(
            Op::VBfeU32,
            rc,
            vec![Operand::temp(whole), Operand::c32(0), Operand::c32(keep * 8)],
        ),
    }
}

/// Slice `[start, start+len)` out of a composite value.
pub fn extract_byte_range(ctx: &mut Context, data: Temp, start: u32, len: u32) -> Temp {
    if start == 0 && len == data.bytes() {
        return data;
    }
    let mut sizes = Vec::new();
    if start > 0 {
        sizes.push(start);
    }
    sizes.push(len);
    let rest = data.bytes() - start - len;
    if rest > 0 {
        sizes.push(rest);
    }
    let parts = ctx.split_vector(data, &sizes);
    parts[if start > 0 { 1 } else { 0 }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ctx::Context;
    use crate::regclass::infer_reg_classes;
    use pretty_assertions::assert_eq;
    use prism_hw::{Generation, WaveSize};
    use prism_ir::{BlockKind, Program};
    use prism_ssa::{Function, FunctionBuilder};

    /// Records every transfer instead of emitting real instructions, so the
    /// tiling properties can be checked directly.
    struct MockBackend {
        caps: TransferCaps,
        loads: Vec<(u32, u32)>,
        stores: Vec<(u32, u32)>,
        rebases: Vec<u32>,
    }

    impl MockBackend {
        fn new(caps: TransferCaps) -> MockBackend {
            MockBackend {
                caps,
                loads: Vec::new(),
                stores: Vec::new(),
                rebases: Vec::new(),
            }
        }
    }

    impl TransferBackend for MockBackend {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn caps(&self) -> TransferCaps {
            self.caps
        }

        fn rebase(&mut self, _ctx: &mut Context, excess: u32) -> Result<(), SelectError> {
            self.rebases.push(excess);
            Ok(())
        }

        fn emit_load(
            &mut self,
            ctx: &mut Context,
            offset: u32,
            bytes: u32,
        ) -> Result<(Temp, u32), SelectError> {
            self.loads.push((offset, bytes));
            Ok((ctx.program.alloc_temp(RegClass::vector_bytes(bytes)), bytes))
        }

        fn emit_store(
            &mut self,
            _ctx: &mut Context,
            offset: u32,
            bytes: u32,
            _data: Temp,
        ) -> Result<(), SelectError> {
            self.stores.push((offset, bytes));
            Ok(())
        }
    }

    fn empty_func() -> Function {
        FunctionBuilder::new("t").finish().unwrap()
    }

    fn ctx_for(func: &Function) -> Context<'_> {
        let classes = infer_reg_classes(func, WaveSize::Wave64).unwrap();
        let mut program = Program::new(Generation::Gfx9, WaveSize::Wave64);
        program.create_block(BlockKind::TOP_LEVEL);
        Context::new(func, program, classes)
    }

    fn tile_check(transfers: &[(u32, u32)], rebases: &[u32], start: u32, total: u32) {
        let mut expected = start as u64;
        let mut rebased = 0u64;
        let mut ri = rebases.iter();
        for &(off, bytes) in transfers {
            // Offsets are relative to the rebased address.
            let mut abs = rebased + off as u64;
            while abs != expected {
                let r = *ri.next().expect("gap not explained by a rebase") as u64;
                rebased += r;
                abs = rebased + off as u64;
            }
            expected += bytes as u64;
        }
        assert_eq!(expected, start as u64 + total as u64, "no gap, no overlap");
    }

    #[test]
    fn example_24_byte_load_splits_16_8() {
        let func = empty_func();
        let mut ctx = ctx_for(&func);
        let mut backend = MockBackend::new(TransferCaps {
            max_transfer_bytes: 16,
            supports_subword_transfer: false,
            max_constant_offset: 4095,
        });
        let parts = split_load(&mut ctx, &mut backend, 24, 4, 0, RegKind::Vector).unwrap();
        assert_eq!(backend.loads, vec![(0, 16), (16, 8)]);
        assert_eq!(parts.len(), 2);
        tile_check(&backend.loads, &backend.rebases, 0, 24);
    }

    #[test]
    fn low_alignment_narrows_transfers() {
        let func = empty_func();
        let mut ctx = ctx_for(&func);
        let mut backend = MockBackend::new(TransferCaps {
            max_transfer_bytes: 16,
            supports_subword_transfer: true,
            max_constant_offset: 4095,
        });
        // A 2-aligned base never becomes dword-aligned at any progress, so
        // the whole access tiles in 2-byte pieces.
        let parts = split_load(&mut ctx, &mut backend, 8, 2, 0, RegKind::Vector).unwrap();
        assert_eq!(backend.loads, vec![(0, 2), (2, 2), (4, 2), (6, 2)]);
        assert_eq!(parts.len(), 4);
        tile_check(&backend.loads, &backend.rebases, 0, 8);
    }

    #[test]
    fn oversized_offset_is_rebased() {
        let func = empty_func();
        let mut ctx = ctx_for(&func);
        let mut backend = MockBackend::new(TransferCaps {
            max_transfer_bytes: 4,
            supports_subword_transfer: false,
            max_constant_offset: 7,
        });
        split_load(&mut ctx, &mut backend, 12, 4, 4, RegKind::Vector).unwrap();
        // Offsets 4, 8, 12 against a 3-bit window: 8 and 12 fold.
        assert!(!backend.rebases.is_empty());
        for &(off, _) in &backend.loads {
            assert!(off <= 7);
        }
        tile_check(&backend.loads, &backend.rebases, 4, 12);
    }

    #[test]
    fn zero_window_folds_every_offset() {
        let func = empty_func();
        let mut ctx = ctx_for(&func);
        let mut backend = MockBackend::new(TransferCaps {
            max_transfer_bytes: 16,
            supports_subword_transfer: true,
            max_constant_offset: 0,
        });
        split_load(&mut ctx, &mut backend, 32, 4, 0, RegKind::Vector).unwrap();
        for &(off, _) in &backend.loads {
            assert_eq!(off, 0);
        }
        tile_check(&backend.loads, &backend.rebases, 0, 32);
    }

    #[test]
    fn subword_tail_widens_on_word_only_backend() {
        let func = empty_func();
        let mut ctx = ctx_for(&func);
        let mut backend = MockBackend::new(TransferCaps {
            max_transfer_bytes: 64,
            supports_subword_transfer: false,
            max_constant_offset: 1 << 20,
        });
        // 6 bytes, 4-aligned: a dword plus a widened dword extract.
        let parts = split_load(&mut ctx, &mut backend, 6, 4, 0, RegKind::Scalar).unwrap();
        assert_eq!(backend.loads, vec![(0, 4), (4, 4)]);
        let sizes: Vec<u32> = parts.iter().map(|p| p.bytes()).collect();
        assert_eq!(sizes, vec![4, 2]);
    }

    #[test]
    fn byte_aligned_word_only_backend_is_a_capability_error() {
        let func = empty_func();
        let mut ctx = ctx_for(&func);
        let mut backend = MockBackend::new(TransferCaps {
            max_transfer_bytes: 16,
            supports_subword_transfer: false,
            max_constant_offset: 4095,
        });
        let err = split_load(&mut ctx, &mut backend, 3, 1, 0, RegKind::Vector).unwrap_err();
        assert!(matches!(err, SelectError::Capability { .. }));
    }

    #[test]
    fn store_splits_like_load() {
        let func = empty_func();
        let mut ctx = ctx_for(&func);
        let data = ctx.program.alloc_temp(RegClass::vector_bytes(24));
        let mut backend = MockBackend::new(TransferCaps {
            max_transfer_bytes: 16,
            supports_subword_transfer: true,
            max_constant_offset: 4095,
        });
        split_store(&mut ctx, &mut backend, data, 4, 0).unwrap();
        assert_eq!(backend.stores, vec![(0, 16), (16, 8)]);
        tile_check(&backend.stores, &backend.rebases, 0, 24);
    }

    #[test]
    fn subword_store_without_support_fails() {
        let func = empty_func();
        let mut ctx = ctx_for(&func);
        let data = ctx.program.alloc_temp(RegClass::vector_bytes(2));
        let mut backend = MockBackend::new(TransferCaps {
            max_transfer_bytes: 16,
            supports_subword_transfer: false,
            max_constant_offset: 4095,
        });
        let err = split_store(&mut ctx, &mut backend, data, 2, 0).unwrap_err();
        assert!(matches!(err, SelectError::Capability { .. }));
    }
}
