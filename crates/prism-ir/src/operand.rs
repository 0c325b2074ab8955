use std::fmt;

use bitflags::bitflags;

use crate::regclass::{RegClass, Temp};

/// A fixed physical register location.
///
/// Only calling-convention boundaries and the architectural special registers
/// use these before allocation; ordinary values stay virtual. The numbering
/// follows the hardware's flat register file: scalar registers first, vector
/// registers from 256 up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhysReg(pub u32);

impl PhysReg {
    pub const VCC: PhysReg = PhysReg(106);
    pub const M0: PhysReg = PhysReg(124);
    pub const EXEC_LO: PhysReg = PhysReg(126);
    pub const EXEC_HI: PhysReg = PhysReg(127);
    pub const EXEC: PhysReg = PhysReg(126);
    pub const SCC: PhysReg = PhysReg(253);

    pub const fn is_vector(self) -> bool {
        self.0 >= 256
    }
}

impl fmt::Display for PhysReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PhysReg::VCC => write!(f, "vcc"),
            PhysReg::M0 => write!(f, "m0"),
            PhysReg::EXEC => write!(f, "exec"),
            PhysReg::EXEC_HI => write!(f, "exec_hi"),
            PhysReg::SCC => write!(f, "scc"),
            PhysReg(r) if r >= 256 => write!(f, "v{}", r - 256),
            PhysReg(r) => write!(f, "s{r}"),
        }
    }
}

bitflags! {
    /// Advisory use-site flags consumed by the downstream allocator.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OperandFlags: u8 {
        /// The instruction may clobber this use after some definitions are
        /// already written; the allocator must not overlap them.
        const LATE_KILL = 1 << 0;
        /// This use is statically known to be the last one.
        const KILL = 1 << 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperandKind {
    Temp(Temp),
    Const { value: u64, bytes: u32 },
    Fixed { reg: PhysReg, rc: RegClass },
    Undef(RegClass),
}

/// A use-site reference: virtual register, inline constant, fixed physical
/// location, or undefined filler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    kind: OperandKind,
    flags: OperandFlags,
}

impl Operand {
    pub fn temp(t: Temp) -> Operand {
        Operand {
            kind: OperandKind::Temp(t),
            flags: OperandFlags::default(),
        }
    }

    /// A constant of an explicit byte width.
    pub fn constant(value: u64, bytes: u32) -> Operand {
        debug_assert!(matches!(bytes, 1 | 2 | 4 | 8), "constant width {bytes}");
        Operand {
            kind: OperandKind::Const { value, bytes },
            flags: OperandFlags::default(),
        }
    }

    pub fn c32(value: u32) -> Operand {
        Operand::constant(value as u64, 4)
    }

    pub fn c64(value: u64) -> Operand {
        Operand::constant(value, 8)
    }

    pub fn zero(bytes: u32) -> Operand {
        Operand::constant(0, bytes)
    }

    pub fn fixed(reg: PhysReg, rc: RegClass) -> Operand {
        Operand {
            kind: OperandKind::Fixed { reg, rc },
            flags: OperandFlags::default(),
        }
    }

    pub fn undef(rc: RegClass) -> Operand {
        Operand {
            kind: OperandKind::Undef(rc),
            flags: OperandFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: OperandFlags) -> Operand {
        self.flags |= flags;
        self
    }

    pub fn flags(&self) -> OperandFlags {
        self.flags
    }

    pub fn as_temp(&self) -> Option<Temp> {
        match self.kind {
            OperandKind::Temp(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_const(&self) -> Option<u64> {
        match self.kind {
            OperandKind::Const { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn is_temp(&self) -> bool {
        matches!(self.kind, OperandKind::Temp(_))
    }

    pub fn is_const(&self) -> bool {
        matches!(self.kind, OperandKind::Const { .. })
    }

    pub fn is_undef(&self) -> bool {
        matches!(self.kind, OperandKind::Undef(_))
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.kind, OperandKind::Fixed { .. })
    }

    /// Register class of the referenced value, for constants the class a
    /// materialization would get (scalar, since constants are uniform).
    pub fn rc(&self) -> RegClass {
        match self.kind {
            OperandKind::Temp(t) => t.rc(),
            OperandKind::Const { bytes, .. } => RegClass::scalar_bytes(bytes),
            OperandKind::Fixed { rc, .. } => rc,
            OperandKind::Undef(rc) => rc,
        }
    }

    pub fn bytes(&self) -> u32 {
        self.rc().bytes()
    }

    /// Whether this constant fits the hardware's inline-constant encoding:
    /// small signed integers and a fixed set of float literals. Anything else
    /// must be materialized through an explicit move or a literal slot.
    pub fn is_inline_constant(&self) -> bool {
        let OperandKind::Const { value, bytes } = self.kind else {
            return false;
        };
        is_inline_int(value, bytes) || is_inline_float(value, bytes)
    }
}

fn is_inline_int(value: u64, bytes: u32) -> bool {
    let signed = match bytes {
        1 => value as u8 as i8 as i64,
        2 => value as u16 as i16 as i64,
        4 => value as u32 as i32 as i64,
        _ => value as i64,
    };
    (-16..=64).contains(&signed)
}

fn is_inline_float(value: u64, bytes: u32) -> bool {
    const LITERALS: [f64; 8] = [0.5, -0.5, 1.0, -1.0, 2.0, -2.0, 4.0, -4.0];
    match bytes {
        2 => LITERALS
            .iter()
            .any(|&l| half::f16::from_f64(l).to_bits() == value as u16),
        4 => LITERALS
            .iter()
            .any(|&l| (l as f32).to_bits() == value as u32),
        8 => LITERALS.iter().any(|&l| l.to_bits() == value),
        _ => false,
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OperandKind::Temp(t) => write!(f, "{t}"),
            OperandKind::Const { value, bytes } => {
                if value < 10 {
                    write!(f, "{value}")
                } else {
                    write!(f, "{:#x}", value & mask_for(bytes))
                }
            }
            OperandKind::Fixed { reg, .. } => write!(f, "{reg}"),
            OperandKind::Undef(_) => write!(f, "undef"),
        }
    }
}

fn mask_for(bytes: u32) -> u64 {
    if bytes >= 8 {
        u64::MAX
    } else {
        (1u64 << (bytes * 8)) - 1
    }
}

bitflags! {
    /// Def-site modifier flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DefFlags: u8 {
        /// The result must not be contracted/reassociated downstream.
        const PRECISE = 1 << 0;
        /// No unsigned wrap is possible; cheaper address folding may apply.
        const NUW = 1 << 1;
    }
}

/// A def-site descriptor: the produced temp, an optional fixed location and
/// modifier flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Definition {
    temp: Temp,
    fixed: Option<PhysReg>,
    flags: DefFlags,
}

impl Definition {
    pub fn of(temp: Temp) -> Definition {
        Definition {
            temp,
            fixed: None,
            flags: DefFlags::default(),
        }
    }

    pub fn fixed(temp: Temp, reg: PhysReg) -> Definition {
        Definition {
            temp,
            fixed: Some(reg),
            flags: DefFlags::default(),
        }
    }

    pub fn with_flags(mut self, flags: DefFlags) -> Definition {
        self.flags |= flags;
        self
    }

    pub fn temp(&self) -> Temp {
        self.temp
    }

    pub fn fixed_reg(&self) -> Option<PhysReg> {
        self.fixed
    }

    pub fn flags(&self) -> DefFlags {
        self.flags
    }

    pub fn rc(&self) -> RegClass {
        self.temp.rc()
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.temp.rc(), self.temp)?;
        if let Some(reg) = self.fixed {
            write!(f, "@{reg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_constant_ranges() {
        assert!(Operand::c32(0).is_inline_constant());
        assert!(Operand::c32(64).is_inline_constant());
        assert!(Operand::c32((-16i32) as u32).is_inline_constant());
        assert!(!Operand::c32(65).is_inline_constant());
        assert!(!Operand::c32((-17i32) as u32).is_inline_constant());
        assert!(Operand::c32(1.0f32.to_bits()).is_inline_constant());
        assert!(Operand::c32((-4.0f32).to_bits()).is_inline_constant());
        assert!(!Operand::c32(3.0f32.to_bits()).is_inline_constant());
        let half_one = half::f16::from_f64(1.0).to_bits() as u64;
        assert!(Operand::constant(half_one, 2).is_inline_constant());
    }

    #[test]
    fn operand_display() {
        assert_eq!(Operand::c32(7).to_string(), "7");
        assert_eq!(Operand::c32(0xdead).to_string(), "0xdead");
        assert_eq!(
            Operand::fixed(PhysReg::EXEC, RegClass::S2).to_string(),
            "exec"
        );
    }
}
