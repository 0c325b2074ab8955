#![forbid(unsafe_code)]

//! Hardware-generation knowledge shared by the instruction selector.
//!
//! This crate exists so the IR model and the selection stage agree on what a
//! given chip generation can encode without either of them reaching into
//! encoder-level detail. Everything here is a plain constant or a predicate on
//! [`Generation`]; no instruction encodings live in this crate.

/// Supported chip generations, oldest first.
///
/// The ordering is meaningful: features are cumulative, so capability checks
/// are written as `gen >= Generation::Gfx9` rather than per-generation match
/// arms wherever the hardware actually behaves that way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Generation {
    Gfx8,
    Gfx9,
    Gfx10,
    Gfx11,
}

impl Generation {
    /// Packed 16-bit ALU opcodes (`v_pk_*`) exist.
    pub fn has_packed_fp16(self) -> bool {
        self >= Generation::Gfx9
    }

    /// Buffer/global/scratch transfers can read or write 1/2-byte quantities
    /// directly into a sub-word register slice (`d16` variants). Before this,
    /// sub-word memory results arrive in the low bits of a full dword and the
    /// caller extracts.
    pub fn has_subword_memory(self) -> bool {
        self >= Generation::Gfx9
    }

    /// `global_*`/`scratch_*` addressing carries a signed 13-bit immediate
    /// offset. On Gfx8 the offset field does not exist at all.
    pub fn has_flat_offsets(self) -> bool {
        self >= Generation::Gfx9
    }

    /// Cross-lane `v_permlane*` data movement exists.
    pub fn has_permlane(self) -> bool {
        self >= Generation::Gfx10
    }

    /// Wave32 mode is selectable (compute dispatch may run 32-lane waves).
    pub fn has_wave32(self) -> bool {
        self >= Generation::Gfx10
    }

    /// Scalar-memory stores exist on this generation.
    ///
    /// Gfx8/Gfx9 expose `s_store_dword*`; they were removed again afterwards,
    /// so uniform stores on Gfx10+ must go through a per-lane path.
    pub fn has_smem_stores(self) -> bool {
        self <= Generation::Gfx9
    }

    /// Carry-less 32-bit integer add/sub (`v_add_u32` without an implicit
    /// carry-out definition). Gfx8 only has the carry-out forms.
    pub fn has_carryless_add(self) -> bool {
        self >= Generation::Gfx9
    }

    /// Shared-memory reads/writes of 96/128 bits in one `ds` operation.
    pub fn has_wide_shared_transfers(self) -> bool {
        self >= Generation::Gfx9
    }
}

/// Lanes per wavefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaveSize {
    Wave32,
    Wave64,
}

impl WaveSize {
    pub fn lanes(self) -> u32 {
        match self {
            WaveSize::Wave32 => 32,
            WaveSize::Wave64 => 64,
        }
    }

    /// Byte width of one lane mask (and therefore of every divergent boolean).
    pub fn mask_bytes(self) -> u32 {
        match self {
            WaveSize::Wave32 => 4,
            WaveSize::Wave64 => 8,
        }
    }
}

/// What one storage backend can do in a single hardware transfer.
///
/// This record is the only place backend-specific memory knowledge enters the
/// generic access splitter; everything else about a backend lives in its
/// transfer-emission callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCaps {
    /// Largest single transfer, in bytes. Always a power of two.
    pub max_transfer_bytes: u32,
    /// Whether 1/2-byte transfers land in a sub-word register slice natively.
    /// When false, sub-word requests are widened and the splitter plans a
    /// post-transfer extract.
    pub supports_subword_transfer: bool,
    /// Largest constant byte offset encodable in the instruction itself.
    /// Offsets beyond this are folded into the address by the splitter.
    pub max_constant_offset: u32,
}

/// Scalar (uniform) memory: up to 16 dwords per load, dword-granular only,
/// 20-bit unsigned immediate offset.
pub fn smem_caps(_gen: Generation) -> TransferCaps {
    TransferCaps {
        max_transfer_bytes: 64,
        supports_subword_transfer: false,
        max_constant_offset: (1 << 20) - 1,
    }
}

/// Per-lane structured-buffer memory: up to 4 dwords, byte/short transfers
/// native on every generation, 12-bit unsigned immediate offset.
pub fn buffer_caps(_gen: Generation) -> TransferCaps {
    TransferCaps {
        max_transfer_bytes: 16,
        supports_subword_transfer: true,
        max_constant_offset: (1 << 12) - 1,
    }
}

/// Shared (workgroup-local) memory: 16-bit unsigned offset; wide 96/128-bit
/// accesses only from Gfx9.
pub fn shared_caps(gen: Generation) -> TransferCaps {
    TransferCaps {
        max_transfer_bytes: if gen.has_wide_shared_transfers() { 16 } else { 8 },
        supports_subword_transfer: true,
        max_constant_offset: (1 << 16) - 1,
    }
}

/// Raw global memory: signed 13-bit offset from Gfx9 (we only hand the
/// splitter the non-negative half); no offset field at all on Gfx8.
pub fn global_caps(gen: Generation) -> TransferCaps {
    TransferCaps {
        max_transfer_bytes: 16,
        supports_subword_transfer: true,
        max_constant_offset: if gen.has_flat_offsets() { (1 << 12) - 1 } else { 0 },
    }
}

/// Per-lane stack (scratch) memory: same offset shape as global.
pub fn scratch_caps(gen: Generation) -> TransferCaps {
    TransferCaps {
        max_transfer_bytes: 16,
        supports_subword_transfer: true,
        max_constant_offset: if gen.has_flat_offsets() { (1 << 12) - 1 } else { 0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_are_ordered() {
        assert!(Generation::Gfx8 < Generation::Gfx9);
        assert!(Generation::Gfx10 >= Generation::Gfx9);
        assert!(Generation::Gfx11.has_permlane());
        assert!(!Generation::Gfx8.has_packed_fp16());
    }

    #[test]
    fn caps_are_powers_of_two() {
        for gen in [
            Generation::Gfx8,
            Generation::Gfx9,
            Generation::Gfx10,
            Generation::Gfx11,
        ] {
            for caps in [
                smem_caps(gen),
                buffer_caps(gen),
                shared_caps(gen),
                global_caps(gen),
                scratch_caps(gen),
            ] {
                assert!(caps.max_transfer_bytes.is_power_of_two());
            }
        }
    }

    #[test]
    fn gfx8_global_has_no_offset_field() {
        assert_eq!(global_caps(Generation::Gfx8).max_constant_offset, 0);
        assert_eq!(global_caps(Generation::Gfx9).max_constant_offset, 4095);
    }
}
