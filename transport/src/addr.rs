//! Wire-level addressing types for the one-sided transport interface.

pub type UnitId = usize;
pub type SegmentId = u64;

/// Element datatypes the transport can move natively. Anything not listed here is moved as an
/// opaque byte blob and must go through a custom-type/op pair for reductions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    I32,
    I64,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Custom(u32),
}

/// The `(segment, unit, offset)` triple naming one element of global memory. `RawGlobalPtr::NULL`
/// is the distinguished sentinel value (`GPTR_NULL`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawGlobalPtr {
    pub segment: SegmentId,
    pub unit: UnitId,
    pub offset: usize,
}

impl RawGlobalPtr {
    pub const NULL: RawGlobalPtr = RawGlobalPtr {
        segment: SegmentId::MAX,
        unit: UnitId::MAX,
        offset: usize::MAX,
    };

    pub const fn is_null(&self) -> bool {
        self.segment == Self::NULL.segment
            && self.unit == Self::NULL.unit
            && self.offset == Self::NULL.offset
    }

    /// `gptr_setunit` — rebind to a different owning unit, same segment and offset.
    pub const fn gptr_setunit(self, unit: UnitId) -> Self {
        RawGlobalPtr { unit, ..self }
    }

    /// `gptr_setaddr` — rebind to an absolute byte offset within the unit's local portion.
    pub const fn gptr_setaddr(self, offset: usize) -> Self {
        RawGlobalPtr { offset, ..self }
    }

    /// `gptr_incaddr` — advance the byte offset in place; never crosses a unit boundary (that is
    /// the pattern's job, not the transport's — see `pgas::memory::GlobalPointer::add`).
    pub const fn gptr_incaddr(self, bytes: usize) -> Self {
        RawGlobalPtr {
            offset: self.offset + bytes,
            ..self
        }
    }

    /// `gptr_getaddr` — read the byte offset back out.
    pub const fn gptr_getaddr(&self) -> usize {
        self.offset
    }
}

impl Default for RawGlobalPtr {
    fn default() -> Self {
        Self::NULL
    }
}
