// src/types/hcons.rs
//
// Structural uniqueness index for bitvector, tuple, and function types.
//
// The index stores bare ids; hashing and equality go through the
// descriptor store, so lookups are parameterized over a borrow of the
// query shape and never need a descriptor to be built first. The same
// structural hash is recomputed from a live descriptor when the garbage
// collector removes an entry, so the two paths must agree.

use hashbrown::HashTable;

use super::{TypeDescriptor, TypeId, TypeKind};
use crate::util::IndexedTable;
use crate::util::hash;

const BITVECTOR_SEED: u32 = 0x7838abe2;
const TUPLE_SEED: u32 = 0x8193ea92;
const FUNCTION_SEED: u32 = 0x5ad7b72f;

/// Borrowed query shape for a hash-cons lookup.
pub(crate) enum Shape<'a> {
    Bitvector(u32),
    Tuple(&'a [TypeId]),
    Function { domain: &'a [TypeId], range: TypeId },
}

impl Shape<'_> {
    pub(crate) fn hash(&self) -> u32 {
        match *self {
            Shape::Bitvector(width) => hash::hash_pair(width, 0, BITVECTOR_SEED),
            Shape::Tuple(elems) => hash::hash_words(&id_words(elems), TUPLE_SEED),
            Shape::Function { domain, range } => {
                let h = hash::hash_words(&id_words(domain), FUNCTION_SEED);
                hash::hash_pair(range.index(), 0, h)
            }
        }
    }
}

fn id_words(ids: &[TypeId]) -> smallvec::SmallVec<[u32; 8]> {
    ids.iter().map(|id| id.index()).collect()
}

/// The consable shape of a live descriptor, if its kind is hash-consed.
pub(crate) fn shape_of(desc: &TypeDescriptor) -> Option<Shape<'_>> {
    match &desc.kind {
        TypeKind::Bitvector(width) => Some(Shape::Bitvector(*width)),
        TypeKind::Tuple(elems) => Some(Shape::Tuple(elems)),
        TypeKind::Function { domain, range } => Some(Shape::Function {
            domain,
            range: *range,
        }),
        _ => None,
    }
}

fn structural_hash(store: &IndexedTable<TypeDescriptor>, id: TypeId) -> Option<u32> {
    let desc = store.get(id.index())?;
    shape_of(desc).map(|shape| shape.hash())
}

fn shape_matches(store: &IndexedTable<TypeDescriptor>, cand: TypeId, shape: &Shape<'_>) -> bool {
    let Some(desc) = store.get(cand.index()) else {
        return false;
    };
    match (&desc.kind, shape) {
        (TypeKind::Bitvector(width), Shape::Bitvector(query)) => width == query,
        (TypeKind::Tuple(elems), Shape::Tuple(query)) => elems.as_slice() == *query,
        (
            TypeKind::Function { domain, range },
            Shape::Function {
                domain: query_domain,
                range: query_range,
            },
        ) => range == query_range && domain.as_slice() == *query_domain,
        _ => false,
    }
}

pub(crate) struct HconsIndex {
    table: HashTable<TypeId>,
}

impl HconsIndex {
    pub(crate) fn new() -> Self {
        Self {
            table: HashTable::new(),
        }
    }

    /// Look up an existing id with the given shape.
    pub(crate) fn find(
        &self,
        store: &IndexedTable<TypeDescriptor>,
        hash: u32,
        shape: &Shape<'_>,
    ) -> Option<TypeId> {
        self.table
            .find(hash as u64, |&cand| shape_matches(store, cand, shape))
            .copied()
    }

    /// Record a freshly built id under the hash of its shape. The id's
    /// descriptor must already be in the store.
    pub(crate) fn insert(
        &mut self,
        store: &IndexedTable<TypeDescriptor>,
        hash: u32,
        id: TypeId,
    ) {
        self.table.insert_unique(hash as u64, id, |&cand| {
            structural_hash(store, cand).expect("hash-consed id lost its descriptor") as u64
        });
    }

    /// Drop the entry for `id`, recomputing its hash from the still-live
    /// descriptor. No-op for kinds that are not hash-consed.
    pub(crate) fn remove(&mut self, store: &IndexedTable<TypeDescriptor>, id: TypeId) {
        let Some(h) = structural_hash(store, id) else {
            return;
        };
        if let Ok(entry) = self.table.find_entry(h as u64, |&cand| cand == id) {
            entry.remove();
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.table.len()
    }
}
