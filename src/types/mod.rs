// src/types/mod.rs
//
// Interned first-order types addressed by TypeId handles.
//
// The table owns one descriptor per live id. Compound descriptors
// (bitvector, tuple, function) are hash-consed, so structural equality
// collapses to id equality; scalar and uninterpreted sorts are nominal
// and every construction yields a fresh id.

use std::rc::Rc;

use smallvec::SmallVec;

mod gc;
mod hcons;
mod lattice;
mod symbols;
pub mod table;

/// Handle to an interned type (Copy, trivial Eq/Hash).
///
/// Ids are stable for the lifetime of the type: the table never renumbers
/// a slot, only reuses it after the type has been garbage collected.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TypeId(u32);

impl TypeId {
    pub(crate) fn new(index: u32) -> Self {
        TypeId(index)
    }

    /// Get the raw index (for debugging/serialization)
    pub fn index(self) -> u32 {
        self.0
    }
}

/// The boolean type, installed at table creation.
pub const BOOL: TypeId = TypeId(0);
/// The integer type, installed at table creation.
pub const INT: TypeId = TypeId(1);
/// The real type, installed at table creation.
pub const REAL: TypeId = TypeId(2);

/// SmallVec for type children - inline up to 4 (covers most tuples and domains)
pub type TypeIdVec = SmallVec<[TypeId; 4]>;

/// Shape of a live type.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TypeKind {
    Bool,
    Int,
    Real,
    /// Fixed-width bitvector, `1 <= width <= MAX_BITVECTOR_WIDTH`.
    Bitvector(u32),
    /// Finite enumerated sort of the given size. Nominal: two scalar
    /// sorts of equal size are distinct types.
    Scalar(u32),
    /// Opaque infinite sort. Nominal.
    Uninterpreted,
    Tuple(TypeIdVec),
    /// Total function from a fixed domain to a range.
    Function { domain: TypeIdVec, range: TypeId },
}

/// Compact cardinality classification of a type.
///
/// The low five bits are a pure function of the type's structure; the
/// sixth bit is the garbage collector's mark and is never visible to
/// callers.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct TypeFlags(u8);

const FINITE: u8 = 0x01;
const UNIT: u8 = 0x02;
const SMALL: u8 = 0x04;
const MAXIMAL: u8 = 0x08;
const MINIMAL: u8 = 0x10;
const GC_MARK: u8 = 0x20;

// bits that participate in structural derivation (everything but the mark)
const DERIVED: u8 = FINITE | UNIT | SMALL | MAXIMAL | MINIMAL;
const CARD: u8 = FINITE | UNIT | SMALL;
const MINMAX: u8 = MAXIMAL | MINIMAL;

impl TypeFlags {
    /// Singleton type: finite, exact cardinality 1, top and bottom of its
    /// own lattice position.
    pub(crate) const UNIT_FLAGS: TypeFlags = TypeFlags(FINITE | UNIT | SMALL | MAXIMAL | MINIMAL);
    /// Finite with an exact 32-bit cardinality.
    pub(crate) const SMALL_FLAGS: TypeFlags = TypeFlags(FINITE | SMALL | MAXIMAL | MINIMAL);
    /// Finite but past exact 32-bit arithmetic.
    pub(crate) const LARGE_FLAGS: TypeFlags = TypeFlags(FINITE | MAXIMAL | MINIMAL);
    /// Infinite.
    pub(crate) const INFINITE_FLAGS: TypeFlags = TypeFlags(MAXIMAL | MINIMAL);

    /// Cardinality is exact and finite.
    pub fn is_finite(self) -> bool {
        self.0 & FINITE != 0
    }

    /// Cardinality is exactly 1.
    pub fn is_unit(self) -> bool {
        self.0 & UNIT != 0
    }

    /// Cardinality is known exactly and fits in 32 bits.
    pub fn is_small(self) -> bool {
        self.0 & SMALL != 0
    }

    /// No strict supertype exists at this lattice position.
    pub fn is_maximal(self) -> bool {
        self.0 & MAXIMAL != 0
    }

    /// No strict subtype exists at this lattice position.
    pub fn is_minimal(self) -> bool {
        self.0 & MINIMAL != 0
    }

    pub(crate) fn without_maximal(self) -> TypeFlags {
        TypeFlags(self.0 & !MAXIMAL)
    }

    pub(crate) fn without_minimal(self) -> TypeFlags {
        TypeFlags(self.0 & !MINIMAL)
    }

    /// Bitwise AND over the derived bits; the identity is `UNIT_FLAGS`.
    pub(crate) fn conjunct(self, other: TypeFlags) -> TypeFlags {
        TypeFlags(self.0 & other.0 & DERIVED)
    }

    pub(crate) fn card_bits(self) -> TypeFlags {
        TypeFlags(self.0 & CARD)
    }

    pub(crate) fn minmax_bits(self) -> TypeFlags {
        TypeFlags(self.0 & MINMAX)
    }

    pub(crate) fn union(self, other: TypeFlags) -> TypeFlags {
        TypeFlags(self.0 | other.0)
    }

    pub(crate) fn derived(self) -> TypeFlags {
        TypeFlags(self.0 & DERIVED)
    }

    pub(crate) fn is_marked(self) -> bool {
        self.0 & GC_MARK != 0
    }

    pub(crate) fn set_mark(&mut self) {
        self.0 |= GC_MARK;
    }

    pub(crate) fn clear_mark(&mut self) {
        self.0 &= !GC_MARK;
    }
}

/// Per-slot state: shape, cardinality classification, and the display
/// name recorded at first naming.
#[derive(Clone, Debug)]
pub(crate) struct TypeDescriptor {
    pub kind: TypeKind,
    pub card: u32,
    pub flags: TypeFlags,
    pub name: Option<Rc<str>>,
}
