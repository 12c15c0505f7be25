// src/types/lattice.rs
//
// Least upper bound and greatest lower bound in the subtype lattice.
//
// The subtype order is int <= real, lifted componentwise through tuples
// (covariant) and through function ranges (covariant, with domains
// invariant); everything else is only comparable to itself. Both bounds
// share one skeleton: a cheap path for leaves and mismatched shapes,
// then a memoized structural recursion. Incompatible pairs are cached
// too, so repeated compatibility probes stay cheap.

use super::table::TypeTable;
use super::{INT, REAL, TypeId, TypeIdVec, TypeKind};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum Bound {
    Join,
    Meet,
}

/// Outcome of the cheap path: either a final answer, or a pair of
/// same-shape compound types that needs structural recursion.
enum Quick {
    Resolved(Option<TypeId>),
    Structural,
}

impl TypeTable {
    /// Least common supertype of `t1` and `t2`, or `None` if they have
    /// no common supertype. May create new compound types.
    pub fn join(&mut self, t1: TypeId, t2: TypeId) -> Option<TypeId> {
        self.bound(Bound::Join, t1, t2)
    }

    /// Greatest common subtype of `t1` and `t2`, or `None` if they have
    /// no common subtype. May create new compound types.
    pub fn meet(&mut self, t1: TypeId, t2: TypeId) -> Option<TypeId> {
        self.bound(Bound::Meet, t1, t2)
    }

    /// Whether `t1` is a subtype of `t2`. Implemented through `join`, so
    /// this may create new types as a side effect.
    pub fn is_subtype(&mut self, t1: TypeId, t2: TypeId) -> bool {
        self.join(t1, t2) == Some(t2)
    }

    /// Whether `t1` and `t2` have a common supertype.
    pub fn compatible(&mut self, t1: TypeId, t2: TypeId) -> bool {
        self.join(t1, t2).is_some()
    }

    fn bound(&mut self, op: Bound, t1: TypeId, t2: TypeId) -> Option<TypeId> {
        debug_assert!(self.is_live(t1) && self.is_live(t2));

        match self.quick_bound(op, t1, t2) {
            Quick::Resolved(result) => result,
            Quick::Structural => {
                // the bounds are symmetric: normalize so the smaller id
                // comes first before touching the cache
                let key = if t1 < t2 { (t1, t2) } else { (t2, t1) };
                if let Some(&cached) = self.cache(op).get(&key) {
                    return cached;
                }
                let result = self.structural_bound(op, key.0, key.1);
                self.cache(op).insert(key, result);
                result
            }
        }
    }

    fn cache(&mut self, op: Bound) -> &mut rustc_hash::FxHashMap<(TypeId, TypeId), Option<TypeId>> {
        match op {
            Bound::Join => &mut self.join_cache,
            Bound::Meet => &mut self.meet_cache,
        }
    }

    fn quick_bound(&self, op: Bound, t1: TypeId, t2: TypeId) -> Quick {
        if t1 == t2 {
            return Quick::Resolved(Some(t1));
        }
        if (t1 == INT && t2 == REAL) || (t1 == REAL && t2 == INT) {
            let result = match op {
                Bound::Join => REAL,
                Bound::Meet => INT,
            };
            return Quick::Resolved(Some(result));
        }
        match (self.kind(t1), self.kind(t2)) {
            (TypeKind::Tuple(a), TypeKind::Tuple(b)) if a.len() == b.len() => Quick::Structural,
            (TypeKind::Function { domain: a, .. }, TypeKind::Function { domain: b, .. })
                if a.len() == b.len() =>
            {
                Quick::Structural
            }
            _ => Quick::Resolved(None),
        }
    }

    fn structural_bound(&mut self, op: Bound, t1: TypeId, t2: TypeId) -> Option<TypeId> {
        match (self.kind(t1).clone(), self.kind(t2).clone()) {
            (TypeKind::Tuple(a), TypeKind::Tuple(b)) => {
                let mut elems = TypeIdVec::with_capacity(a.len());
                for (&x, &y) in a.iter().zip(b.iter()) {
                    elems.push(self.bound(op, x, y)?);
                }
                Some(self.tuple_type(&elems))
            }
            (
                TypeKind::Function {
                    domain: d1,
                    range: r1,
                },
                TypeKind::Function {
                    domain: d2,
                    range: r2,
                },
            ) => {
                // domains are invariant: the bound exists only for
                // identical domains
                if d1 != d2 {
                    return None;
                }
                let range = self.bound(op, r1, r2)?;
                Some(self.function_type(&d1, range))
            }
            _ => unreachable!("cheap path only defers same-shape compounds"),
        }
    }
}
