use std::fmt;

/// Storage kind of a virtual register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegKind {
    /// One value per wavefront, held in a scalar register.
    Scalar,
    /// One value per lane.
    Vector,
    /// Per-lane storage whose live range must survive divergent control flow
    /// unchanged (the allocator treats its lifetime linearly, ignoring the
    /// logical graph). Used for reduction scratch and values carried across
    /// divergent breaks.
    LinearVector,
}

/// Register class: storage kind plus byte size.
///
/// Sizes are byte-granular so sub-dword values (8/16-bit ALU, packed halves)
/// can be represented; most classes in practice are whole dwords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegClass {
    kind: RegKind,
    bytes: u32,
}

impl RegClass {
    pub const S1: RegClass = RegClass::scalar(1);
    pub const S2: RegClass = RegClass::scalar(2);
    pub const S3: RegClass = RegClass::scalar(3);
    pub const S4: RegClass = RegClass::scalar(4);
    pub const S8: RegClass = RegClass::scalar(8);
    pub const S16: RegClass = RegClass::scalar(16);
    pub const V1: RegClass = RegClass::vector(1);
    pub const V2: RegClass = RegClass::vector(2);
    pub const V3: RegClass = RegClass::vector(3);
    pub const V4: RegClass = RegClass::vector(4);

    /// Scalar class of `dwords` whole dwords.
    pub const fn scalar(dwords: u32) -> RegClass {
        RegClass {
            kind: RegKind::Scalar,
            bytes: dwords * 4,
        }
    }

    /// Vector class of `dwords` whole dwords.
    pub const fn vector(dwords: u32) -> RegClass {
        RegClass {
            kind: RegKind::Vector,
            bytes: dwords * 4,
        }
    }

    /// Linear-vector class of `dwords` whole dwords.
    pub const fn linear(dwords: u32) -> RegClass {
        RegClass {
            kind: RegKind::LinearVector,
            bytes: dwords * 4,
        }
    }

    /// Byte-granular vector class (sub-dword allowed).
    pub const fn vector_bytes(bytes: u32) -> RegClass {
        RegClass {
            kind: RegKind::Vector,
            bytes,
        }
    }

    /// Byte-granular scalar class. Scalar registers are dword-addressed, so a
    /// sub-dword scalar still occupies a full dword; we keep the logical byte
    /// size for splitter bookkeeping.
    pub const fn scalar_bytes(bytes: u32) -> RegClass {
        RegClass {
            kind: RegKind::Scalar,
            bytes,
        }
    }

    pub const fn of(kind: RegKind, bytes: u32) -> RegClass {
        RegClass { kind, bytes }
    }

    pub const fn kind(self) -> RegKind {
        self.kind
    }

    pub const fn bytes(self) -> u32 {
        self.bytes
    }

    /// Size in dwords, rounding sub-dword classes up.
    pub const fn dwords(self) -> u32 {
        self.bytes.div_ceil(4)
    }

    pub const fn is_scalar(self) -> bool {
        matches!(self.kind, RegKind::Scalar)
    }

    pub const fn is_vector(self) -> bool {
        matches!(self.kind, RegKind::Vector | RegKind::LinearVector)
    }

    pub const fn is_linear(self) -> bool {
        matches!(self.kind, RegKind::LinearVector)
    }

    pub const fn is_subdword(self) -> bool {
        self.bytes % 4 != 0
    }

    /// The same size in the other storage kind.
    pub const fn as_kind(self, kind: RegKind) -> RegClass {
        RegClass {
            kind,
            bytes: self.bytes,
        }
    }

    /// The same size as a plain vector class.
    pub const fn as_vector(self) -> RegClass {
        self.as_kind(RegKind::Vector)
    }

    /// The same size as a scalar class.
    pub const fn as_scalar(self) -> RegClass {
        self.as_kind(RegKind::Scalar)
    }

    /// Resized copy of this class.
    pub const fn resized(self, bytes: u32) -> RegClass {
        RegClass {
            kind: self.kind,
            bytes,
        }
    }
}

impl fmt::Display for RegClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            RegKind::Scalar => "s",
            RegKind::Vector => "v",
            RegKind::LinearVector => "lv",
        };
        if self.is_subdword() {
            write!(f, "{prefix}{}b", self.bytes)
        } else {
            write!(f, "{prefix}{}", self.dwords())
        }
    }
}

/// A virtual register: dense id plus register class.
///
/// Temps are created exactly once (by [`crate::Program::alloc_temp`]) and
/// copied by value everywhere else; the id is the key into the program's
/// class side table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Temp {
    id: u32,
    rc: RegClass,
}

impl Temp {
    pub(crate) const fn new(id: u32, rc: RegClass) -> Temp {
        Temp { id, rc }
    }

    pub const fn id(self) -> u32 {
        self.id
    }

    pub const fn rc(self) -> RegClass {
        self.rc
    }

    pub const fn bytes(self) -> u32 {
        self.rc.bytes()
    }

    pub const fn kind(self) -> RegKind {
        self.rc.kind()
    }
}

impl fmt::Display for Temp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dword_rounding() {
        assert_eq!(RegClass::vector_bytes(2).dwords(), 1);
        assert_eq!(RegClass::vector_bytes(6).dwords(), 2);
        assert_eq!(RegClass::V3.bytes(), 12);
        assert!(RegClass::vector_bytes(2).is_subdword());
        assert!(!RegClass::V2.is_subdword());
    }

    #[test]
    fn display_forms() {
        assert_eq!(RegClass::S2.to_string(), "s2");
        assert_eq!(RegClass::vector_bytes(2).to_string(), "v2b");
        assert_eq!(RegClass::linear(1).to_string(), "lv1");
    }
}
