// src/types/gc.rs
//
// Mark-and-sweep over the type table.
//
// Roots are the three primitives, every symbol-table binding (shadowed
// bindings included), and any id the caller pinned with `mark` before
// invoking `gc`. Sweeping removes the hash-cons entry of each dead type
// while its descriptor is still readable, then erases the descriptor and
// splices the slot onto the free list. Join/meet cache entries that
// mention a dead id are evicted.

use super::table::TypeTable;
use super::{BOOL, INT, REAL, TypeId, TypeIdVec, TypeKind};

impl TypeTable {
    /// Pin `id` as a garbage-collection root for the next `gc` call.
    /// External structures holding type ids (terms, assertions, models)
    /// must pin them before collecting; marks are consumed by `gc`.
    pub fn mark(&mut self, id: TypeId) {
        self.store
            .get_mut(id.index())
            .expect("mark on a dead type id")
            .flags
            .set_mark();
    }

    /// Delete every type not reachable from a root and evict stale
    /// lattice cache entries.
    pub fn gc(&mut self) {
        // roots: symbol-table bindings and the primitives
        let roots: Vec<TypeId> = self.symbols.bound_ids().collect();
        for id in roots {
            self.mark(id);
        }
        for id in [BOOL, INT, REAL] {
            self.mark(id);
        }

        self.propagate_marks();

        // sweep in id order, clearing marks on the survivors
        let mut reclaimed = 0u32;
        for i in 0..self.store.slot_count() {
            let id = TypeId::new(i);
            let Some(desc) = self.store.get(i) else {
                continue;
            };
            if desc.flags.is_marked() {
                self.store.get_mut(i).expect("marked slot").flags.clear_mark();
            } else {
                self.hcons.remove(&self.store, id);
                self.store.free(i);
                reclaimed += 1;
            }
        }

        self.purge_caches();

        tracing::debug!(
            live = self.store.live_count(),
            reclaimed,
            "type table gc"
        );
    }

    /// Extend the mark set to everything reachable from a marked id.
    fn propagate_marks(&mut self) {
        let mut work: Vec<TypeId> = Vec::new();
        for (i, desc) in self.store.iter() {
            if desc.flags.is_marked() {
                work.push(TypeId::new(i));
            }
        }

        while let Some(id) = work.pop() {
            let children: TypeIdVec = match &self.desc(id).kind {
                TypeKind::Tuple(elems) => elems.clone(),
                TypeKind::Function { domain, range } => {
                    let mut children = domain.clone();
                    children.push(*range);
                    children
                }
                _ => continue,
            };
            for child in children {
                let desc = self
                    .store
                    .get_mut(child.index())
                    .expect("live type references a dead child");
                if !desc.flags.is_marked() {
                    desc.flags.set_mark();
                    work.push(child);
                }
            }
        }
    }

    /// Drop every cache entry whose key ids or cached result died in the
    /// sweep. Negative entries are dropped along with them.
    fn purge_caches(&mut self) {
        let store = &self.store;
        let keep = |key: &(TypeId, TypeId), value: &mut Option<TypeId>| {
            store.contains(key.0.index())
                && store.contains(key.1.index())
                && value.is_some_and(|id| store.contains(id.index()))
        };
        self.join_cache.retain(keep);
        self.meet_cache.retain(keep);
    }
}
