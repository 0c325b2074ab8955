//! Shared selection state: the program being built, the SSA-to-temp map, and
//! the composite-value cache.

use hashbrown::HashMap;
use prism_ir::{Definition, Op, Operand, Program, RegClass, Temp};
use prism_ssa::{Function, ValueId};

use crate::builder::Builder;
use crate::cfg::CfState;
use crate::regclass::RegClassMap;

pub struct Context<'a> {
    pub func: &'a Function,
    pub program: Program,
    pub classes: RegClassMap,
    pub cur_block: u32,
    pub cf: CfState,
    vals: Vec<Option<Temp>>,
    /// Composite-value cache: temp id -> already-materialized components.
    /// Populated the first time a composite is built or split; never
    /// invalidated (single assignment), dropped with the context.
    components: HashMap<u32, Vec<Temp>>,
}

impl<'a> Context<'a> {
    pub fn new(func: &'a Function, program: Program, classes: RegClassMap) -> Context<'a> {
        Context {
            func,
            program,
            classes,
            cur_block: 0,
            cf: CfState::default(),
            vals: vec![None; func.value_count() as usize],
            components: HashMap::new(),
        }
    }

    pub fn bld(&mut self) -> Builder<'_> {
        Builder::new(&mut self.program, self.cur_block)
    }

    /// Temp holding an SSA value, allocating on first touch. Loop-header phis
    /// reference their destination before the defining instruction is built,
    /// so allocation cannot be tied to definition order.
    pub fn temp_of(&mut self, v: ValueId) -> Temp {
        if let Some(t) = self.vals[v.index()] {
            return t;
        }
        let t = self.program.alloc_temp(self.classes.rc(v));
        self.vals[v.index()] = Some(t);
        t
    }

    pub fn op(&mut self, v: ValueId) -> Operand {
        Operand::temp(self.temp_of(v))
    }

    /// Bind an SSA value to the temp that computes it. The temp's class must
    /// be exactly the class inference committed to; a mismatch is a selector
    /// bug.
    pub fn bind(&mut self, v: ValueId, t: Temp) {
        assert_eq!(
            t.rc(),
            self.classes.rc(v),
            "selected {v} into the wrong register class"
        );
        debug_assert!(
            self.vals[v.index()].is_none(),
            "value {v} selected twice"
        );
        self.vals[v.index()] = Some(t);
    }

    pub fn is_divergent(&self, v: ValueId) -> bool {
        self.func.is_divergent(v)
    }

    // ---- composite-value cache ----

    /// Record the components of a composite temp.
    ///
    /// The byte sizes must tile the composite exactly; a mismatch means some
    /// caller split or built a vector inconsistently, which is a compiler
    /// bug, not an input error.
    pub fn cache_components(&mut self, whole: Temp, parts: Vec<Temp>) {
        let sum: u32 = parts.iter().map(|p| p.bytes()).sum();
        assert_eq!(
            sum,
            whole.bytes(),
            "composite cache entry does not tile {whole} ({} bytes)",
            whole.bytes()
        );
        self.components.entry(whole.id()).or_insert(parts);
    }

    pub fn cached_components(&self, whole: Temp) -> Option<&[Temp]> {
        self.components.get(&whole.id()).map(|v| v.as_slice())
    }

    /// Build a composite from parts, caching the decomposition. Single-part
    /// requests collapse to the part itself.
    pub fn create_vector(&mut self, rc: RegClass, parts: &[Temp]) -> Temp {
        if parts.len() == 1 && parts[0].rc() == rc {
            return parts[0];
        }
        let operands = parts.iter().map(|&p| Operand::temp(p)).collect();
        let mut bld = self.bld();
        let dst = bld.tmp(rc);
        bld.pseudo(Op::PCreateVector, operands, vec![Definition::of(dst)]);
        self.cache_components(dst, parts.to_vec());
        dst
    }

    /// Split a composite into `part_sizes.len()` pieces of the given byte
    /// sizes, reusing the cached decomposition when it matches.
    pub fn split_vector(&mut self, whole: Temp, part_sizes: &[u32]) -> Vec<Temp> {
        if let Some(cached) = self.components.get(&whole.id()) {
            let sizes: Vec<u32> = cached.iter().map(|t| t.bytes()).collect();
            if sizes == part_sizes {
                return cached.clone();
            }
        }
        let kind = whole.rc().kind();
        let mut bld = self.bld();
        let parts: Vec<Temp> = part_sizes
            .iter()
            .map(|&sz| bld.tmp(RegClass::of(kind, sz)))
            .collect();
        let defs = parts.iter().map(|&p| Definition::of(p)).collect();
        bld.pseudo(Op::PSplitVector, vec![Operand::temp(whole)], defs);
        self.cache_components(whole, parts.clone());
        parts
    }

    /// Extract one component of a composite. When the composite divides
    /// evenly into `comp_bytes` pieces the whole decomposition is
    /// materialized once and cached, so repeated extracts return the same
    /// temps without emitting anything new.
    pub fn extract_component(&mut self, whole: Temp, index: u32, comp_bytes: u32) -> Temp {
        if index == 0 && comp_bytes == whole.bytes() {
            return whole;
        }
        if let Some(cached) = self.components.get(&whole.id()) {
            if cached.iter().all(|t| t.bytes() == comp_bytes) {
                if let Some(&t) = cached.get(index as usize) {
                    return t;
                }
            }
        }
        if whole.bytes() % comp_bytes == 0 && self.components.get(&whole.id()).is_none() {
            let sizes = vec![comp_bytes; (whole.bytes() / comp_bytes) as usize];
            let parts = self.split_vector(whole, &sizes);
            return parts[index as usize];
        }
        let kind = whole.rc().kind();
        let mut bld = self.bld();
        let dst = bld.tmp(RegClass::of(kind, comp_bytes));
        bld.pseudo(
            Op::PExtractVector,
            vec![Operand::temp(whole), Operand::c32(index)],
            vec![Definition::of(dst)],
        );
        dst
    }

    /// Split a multi-dword temp into single dwords (the common recombination
    /// granularity). A sub-dword tail becomes its own final piece.
    pub fn split_dwords(&mut self, whole: Temp) -> Vec<Temp> {
        if whole.bytes() <= 4 {
            return vec![whole];
        }
        let mut sizes = vec![4u32; (whole.bytes() / 4) as usize];
        if whole.bytes() % 4 != 0 {
            sizes.push(whole.bytes() % 4);
        }
        self.split_vector(whole, &sizes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regclass::infer_reg_classes;
    use prism_hw::{Generation, WaveSize};
    use prism_ir::BlockKind;
    use prism_ssa::{FunctionBuilder, ValueInfo, ValueType};

    fn ctx_for(func: &Function) -> Context<'_> {
        let classes = infer_reg_classes(func, WaveSize::Wave64).unwrap();
        let mut program = Program::new(Generation::Gfx9, WaveSize::Wave64);
        program.create_block(BlockKind::TOP_LEVEL);
        Context::new(func, program, classes)
    }

    #[test]
    fn split_twice_returns_identical_temps() {
        let mut fb = FunctionBuilder::new("t");
        fb.param("v", ValueInfo::divergent(ValueType::vec(32, 4)));
        let func = fb.finish().unwrap();
        let mut ctx = ctx_for(&func);
        let whole = ctx.program.alloc_temp(RegClass::V4);
        let a = ctx.split_vector(whole, &[4, 4, 4, 4]);
        let instrs_after_first = ctx.program.block(0).instructions.len();
        let b = ctx.split_vector(whole, &[4, 4, 4, 4]);
        assert_eq!(a, b);
        assert_eq!(ctx.program.block(0).instructions.len(), instrs_after_first);
    }

    #[test]
    #[should_panic(expected = "does not tile")]
    fn mismatched_cache_entry_asserts() {
        let fb = FunctionBuilder::new("t");
        let func = fb.finish().unwrap();
        let mut ctx = ctx_for(&func);
        let whole = ctx.program.alloc_temp(RegClass::V2);
        let part = ctx.program.alloc_temp(RegClass::V1);
        ctx.cache_components(whole, vec![part]);
    }
}
