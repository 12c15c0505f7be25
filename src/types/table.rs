// src/types/table.rs
//
// The type table: descriptor store, constructors, and cardinality
// queries. Compound constructors are hash-consed through the structural
// index; scalar and uninterpreted constructors mint a fresh nominal id
// on every call.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::hcons::{HconsIndex, Shape};
use super::symbols::SymbolTable;
use super::{BOOL, INT, REAL, TypeDescriptor, TypeFlags, TypeId, TypeIdVec, TypeKind};
use crate::limits::{MAX_ARITY, MAX_BITVECTOR_WIDTH};
use crate::util::IndexedTable;

/// Table of interned first-order types.
///
/// One table is owned by one solver context; all operations take `&self`
/// or `&mut self` and there is no internal locking. Dropping the table
/// releases every descriptor and name reference it holds.
pub struct TypeTable {
    pub(crate) store: IndexedTable<TypeDescriptor>,
    pub(crate) hcons: HconsIndex,
    pub(crate) symbols: SymbolTable,
    pub(crate) join_cache: FxHashMap<(TypeId, TypeId), Option<TypeId>>,
    pub(crate) meet_cache: FxHashMap<(TypeId, TypeId), Option<TypeId>>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Create a table with room for `n` types, with bool/int/real
    /// pre-installed at their fixed ids.
    pub fn with_capacity(n: u32) -> Self {
        let mut table = Self {
            store: IndexedTable::with_capacity(n),
            hcons: HconsIndex::new(),
            symbols: SymbolTable::new(),
            join_cache: FxHashMap::default(),
            meet_cache: FxHashMap::default(),
        };
        table.install_primitives();
        table
    }

    fn install_primitives(&mut self) {
        let bool_id = self.insert(TypeDescriptor {
            kind: TypeKind::Bool,
            card: 2,
            flags: TypeFlags::SMALL_FLAGS,
            name: None,
        });
        debug_assert_eq!(bool_id, BOOL);

        // int has supertypes (real) so it is not maximal; real has
        // subtypes (int) so it is not minimal
        let int_id = self.insert(TypeDescriptor {
            kind: TypeKind::Int,
            card: u32::MAX,
            flags: TypeFlags::INFINITE_FLAGS.without_maximal(),
            name: None,
        });
        debug_assert_eq!(int_id, INT);

        let real_id = self.insert(TypeDescriptor {
            kind: TypeKind::Real,
            card: u32::MAX,
            flags: TypeFlags::INFINITE_FLAGS.without_minimal(),
            name: None,
        });
        debug_assert_eq!(real_id, REAL);
    }

    fn insert(&mut self, desc: TypeDescriptor) -> TypeId {
        TypeId::new(self.store.alloc(desc))
    }

    #[track_caller]
    pub(crate) fn desc(&self, id: TypeId) -> &TypeDescriptor {
        self.store
            .get(id.index())
            .expect("operation on a dead type id")
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    /// The bitvector type of the given width. Hash-consed: equal widths
    /// always return the same id.
    pub fn bv_type(&mut self, width: u32) -> TypeId {
        assert!(
            width >= 1 && width <= MAX_BITVECTOR_WIDTH,
            "bitvector width out of range: {}",
            width
        );
        let shape = Shape::Bitvector(width);
        let hash = shape.hash();
        if let Some(id) = self.hcons.find(&self.store, hash, &shape) {
            return id;
        }

        let (card, flags) = if width < 32 {
            (1u32 << width, TypeFlags::SMALL_FLAGS)
        } else {
            (u32::MAX, TypeFlags::LARGE_FLAGS)
        };
        let id = self.insert(TypeDescriptor {
            kind: TypeKind::Bitvector(width),
            card,
            flags,
            name: None,
        });
        self.hcons.insert(&self.store, hash, id);
        id
    }

    /// The tuple type over `elems`. Hash-consed.
    pub fn tuple_type(&mut self, elems: &[TypeId]) -> TypeId {
        assert!(
            (1..=MAX_ARITY).contains(&elems.len()),
            "tuple arity out of range: {}",
            elems.len()
        );
        debug_assert!(elems.iter().all(|&e| self.is_live(e)));
        let shape = Shape::Tuple(elems);
        let hash = shape.hash();
        if let Some(id) = self.hcons.find(&self.store, hash, &shape) {
            return id;
        }

        let (card, flags) = self.tuple_card(elems);
        let id = self.insert(TypeDescriptor {
            kind: TypeKind::Tuple(TypeIdVec::from_slice(elems)),
            card,
            flags,
            name: None,
        });
        self.hcons.insert(&self.store, hash, id);
        id
    }

    /// The total-function type `domain -> range`. Hash-consed.
    pub fn function_type(&mut self, domain: &[TypeId], range: TypeId) -> TypeId {
        assert!(
            (1..=MAX_ARITY).contains(&domain.len()),
            "function arity out of range: {}",
            domain.len()
        );
        debug_assert!(domain.iter().all(|&e| self.is_live(e)) && self.is_live(range));
        let shape = Shape::Function { domain, range };
        let hash = shape.hash();
        if let Some(id) = self.hcons.find(&self.store, hash, &shape) {
            return id;
        }

        let (card, flags) = self.function_card(domain, range);
        let id = self.insert(TypeDescriptor {
            kind: TypeKind::Function {
                domain: TypeIdVec::from_slice(domain),
                range,
            },
            card,
            flags,
            name: None,
        });
        self.hcons.insert(&self.store, hash, id);
        id
    }

    /// A fresh scalar sort with `size` elements. Nominal: two calls with
    /// equal sizes return distinct ids.
    pub fn new_scalar_type(&mut self, size: u32) -> TypeId {
        assert!(size >= 1, "scalar size must be positive");
        let flags = if size == 1 {
            TypeFlags::UNIT_FLAGS
        } else {
            TypeFlags::SMALL_FLAGS
        };
        self.insert(TypeDescriptor {
            kind: TypeKind::Scalar(size),
            card: size,
            flags,
            name: None,
        })
    }

    /// A fresh uninterpreted sort: opaque, infinite, both maximal and
    /// minimal. Nominal.
    pub fn new_uninterpreted_type(&mut self) -> TypeId {
        self.insert(TypeDescriptor {
            kind: TypeKind::Uninterpreted,
            card: u32::MAX,
            flags: TypeFlags::INFINITE_FLAGS,
            name: None,
        })
    }

    // ========================================================================
    // Flag and cardinality derivation
    // ========================================================================

    pub(crate) fn flags_of(&self, id: TypeId) -> TypeFlags {
        self.desc(id).flags.derived()
    }

    /// Conjunction of the derived flags of `ids`: finite iff all finite,
    /// unit iff all unit, and so on.
    fn flags_conjunct(&self, ids: &[TypeId]) -> TypeFlags {
        ids.iter()
            .fold(TypeFlags::UNIT_FLAGS, |acc, &id| acc.conjunct(self.desc(id).flags))
    }

    /// Product of the cardinalities of `ids`. Stops multiplying once the
    /// product leaves 32-bit range, so any value above `u32::MAX` just
    /// means overflow.
    fn card_product(&self, ids: &[TypeId]) -> u64 {
        let mut product: u64 = 1;
        for &id in ids {
            product *= self.card_of(id) as u64;
            if product > u32::MAX as u64 {
                break;
            }
        }
        product
    }

    fn tuple_card(&self, elems: &[TypeId]) -> (u32, TypeFlags) {
        let flags = self.flags_conjunct(elems);
        if flags == TypeFlags::UNIT_FLAGS {
            return (1, flags);
        }
        if flags == TypeFlags::SMALL_FLAGS {
            let product = self.card_product(elems);
            if product > u32::MAX as u64 {
                // product does not fit in 32 bits: card is no longer exact
                return (u32::MAX, TypeFlags::LARGE_FLAGS);
            }
            return (product as u32, flags);
        }
        (u32::MAX, flags)
    }

    /// Cardinality of `range ^ (product of domain cards)`; only called
    /// when the range is small and every domain is small or unit.
    fn function_card_power(&self, domain: &[TypeId], range: TypeId) -> u64 {
        let dom = self.card_product(domain);
        if dom >= 32 {
            // the range has at least two elements, so range^dom cannot
            // fit in 32 bits
            return u32::MAX as u64 + 1;
        }
        let base = self.card_of(range) as u64;
        debug_assert!(base >= 2 && dom >= 1);
        let mut power = base;
        let mut exp = dom;
        while exp > 1 {
            power *= base;
            if power > u32::MAX as u64 {
                break;
            }
            exp -= 1;
        }
        power
    }

    fn function_card(&self, domain: &[TypeId], range: TypeId) -> (u32, TypeFlags) {
        // unit/maximal/minimal come from the range alone
        let range_flags = self.flags_of(range);
        let minmax = range_flags.minmax_bits();

        let mut flags = range_flags;
        if flags.is_finite() && !flags.is_unit() {
            flags = flags.conjunct(self.flags_conjunct(domain));
        }

        let (card, flags) = if flags == TypeFlags::UNIT_FLAGS {
            // singleton range: there is exactly one total function
            (1, flags)
        } else if flags == TypeFlags::SMALL_FLAGS {
            let power = self.function_card_power(domain, range);
            if power > u32::MAX as u64 {
                (u32::MAX, TypeFlags::LARGE_FLAGS)
            } else {
                (power as u32, flags)
            }
        } else {
            (u32::MAX, flags)
        };

        (card, minmax.union(flags.card_bits()))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Shape of a live type. Callers dispatch on the returned kind.
    #[track_caller]
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.desc(id).kind
    }

    /// Cardinality, saturated at `u32::MAX`.
    pub fn card_of(&self, id: TypeId) -> u32 {
        self.desc(id).card
    }

    pub fn is_finite(&self, id: TypeId) -> bool {
        self.desc(id).flags.is_finite()
    }

    pub fn is_unit(&self, id: TypeId) -> bool {
        self.desc(id).flags.is_unit()
    }

    pub fn is_small(&self, id: TypeId) -> bool {
        self.desc(id).flags.is_small()
    }

    pub fn is_maximal(&self, id: TypeId) -> bool {
        self.desc(id).flags.is_maximal()
    }

    pub fn is_minimal(&self, id: TypeId) -> bool {
        self.desc(id).flags.is_minimal()
    }

    /// Whether `id` currently names a live type.
    pub fn is_live(&self, id: TypeId) -> bool {
        self.store.contains(id.index())
    }

    /// Number of live types, primitives included.
    pub fn live_types(&self) -> u32 {
        self.store.live_count()
    }

    /// Width of a bitvector type.
    #[track_caller]
    pub fn bv_size(&self, id: TypeId) -> u32 {
        match self.kind(id) {
            TypeKind::Bitvector(width) => *width,
            kind => panic!("bv_size on {:?}", kind),
        }
    }

    #[track_caller]
    pub fn tuple_arity(&self, id: TypeId) -> usize {
        self.tuple_elems(id).len()
    }

    #[track_caller]
    pub fn tuple_elem(&self, id: TypeId, i: usize) -> TypeId {
        self.tuple_elems(id)[i]
    }

    #[track_caller]
    pub fn tuple_elems(&self, id: TypeId) -> &[TypeId] {
        match self.kind(id) {
            TypeKind::Tuple(elems) => elems,
            kind => panic!("tuple_elems on {:?}", kind),
        }
    }

    #[track_caller]
    pub fn function_arity(&self, id: TypeId) -> usize {
        self.function_domains(id).len()
    }

    #[track_caller]
    pub fn function_domain(&self, id: TypeId, i: usize) -> TypeId {
        self.function_domains(id)[i]
    }

    #[track_caller]
    pub fn function_domains(&self, id: TypeId) -> &[TypeId] {
        match self.kind(id) {
            TypeKind::Function { domain, .. } => domain,
            kind => panic!("function_domains on {:?}", kind),
        }
    }

    #[track_caller]
    pub fn function_range(&self, id: TypeId) -> TypeId {
        match self.kind(id) {
            TypeKind::Function { range, .. } => *range,
            kind => panic!("function_range on {:?}", kind),
        }
    }

    /// Cardinality of the product `ids[0] x ... x ids[n-1]`, saturated at
    /// `u32::MAX`, without building the tuple type.
    pub fn card_of_product(&self, ids: &[TypeId]) -> u32 {
        self.card_product(ids).min(u32::MAX as u64) as u32
    }

    /// Cardinality of a function type's domain, saturated.
    pub fn card_of_domain(&self, id: TypeId) -> u32 {
        self.card_of_product(self.function_domains(id))
    }

    /// Cardinality of a function type's range, saturated.
    pub fn card_of_range(&self, id: TypeId) -> u32 {
        self.card_of(self.function_range(id))
    }

    /// Whether every domain component of a function type is finite.
    pub fn has_finite_domain(&self, id: TypeId) -> bool {
        self.flags_conjunct(self.function_domains(id)).is_finite()
    }

    /// Whether a function type's range is finite.
    pub fn has_finite_range(&self, id: TypeId) -> bool {
        self.is_finite(self.function_range(id))
    }

    // ========================================================================
    // Naming
    // ========================================================================

    /// Bind `name` to `id`, shadowing any current binding of the same
    /// name. The first name a type is ever given becomes its display
    /// name and stays even if the binding is later removed or shadowed;
    /// lookup always follows the newest binding.
    pub fn set_name(&mut self, id: TypeId, name: Rc<str>) {
        let desc = self
            .store
            .get_mut(id.index())
            .expect("set_name on a dead type id");
        if desc.name.is_none() {
            desc.name = Some(name.clone());
        }
        self.symbols.bind(name, id);
    }

    /// The type currently bound to `name`.
    pub fn lookup_name(&self, name: &str) -> Option<TypeId> {
        self.symbols.lookup(name)
    }

    /// Remove the newest binding of `name`, revealing the shadowed one
    /// if any.
    pub fn remove_name(&mut self, name: &str) {
        self.symbols.unbind(name);
    }

    /// The display name recorded when the type was first named.
    pub fn name_of(&self, id: TypeId) -> Option<&str> {
        self.desc(id).name.as_deref()
    }

    /// Render a type for error messages, preferring its display name.
    pub fn display(&self, id: TypeId) -> String {
        let desc = self.desc(id);
        if let Some(name) = &desc.name {
            return name.to_string();
        }
        match &desc.kind {
            TypeKind::Bool => "bool".to_string(),
            TypeKind::Int => "int".to_string(),
            TypeKind::Real => "real".to_string(),
            TypeKind::Bitvector(width) => format!("(bitvector {})", width),
            TypeKind::Scalar(size) => format!("scalar{}#{}", size, id.index()),
            TypeKind::Uninterpreted => format!("sort#{}", id.index()),
            TypeKind::Tuple(elems) => {
                let parts: Vec<String> = elems.iter().map(|&e| self.display(e)).collect();
                format!("({})", parts.join(", "))
            }
            TypeKind::Function { domain, range } => {
                let parts: Vec<String> = domain.iter().map(|&d| self.display(d)).collect();
                format!("({}) -> {}", parts.join(", "), self.display(*range))
            }
        }
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}
