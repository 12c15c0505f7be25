// src/types/symbols.rs
//
// Name -> type bindings with shadowing.
//
// Each name keys a stack of bindings: binding a bound name shadows the
// previous binding instead of replacing it, and removal pops the top of
// the stack. Every live binding owns one reference to its name; dropping
// the binding releases exactly that reference.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::TypeId;

pub(crate) struct SymbolTable {
    bindings: FxHashMap<String, Vec<(Rc<str>, TypeId)>>,
}

impl SymbolTable {
    pub(crate) fn new() -> Self {
        Self {
            bindings: FxHashMap::default(),
        }
    }

    /// Push a binding for `name`, shadowing any earlier binding.
    pub(crate) fn bind(&mut self, name: Rc<str>, id: TypeId) {
        let stack = self.bindings.entry(name.as_ref().to_string()).or_default();
        if !stack.is_empty() {
            tracing::trace!(name = %name, id = id.index(), "shadowing type name");
        }
        stack.push((name, id));
    }

    /// The binding currently in effect for `name`.
    pub(crate) fn lookup(&self, name: &str) -> Option<TypeId> {
        self.bindings
            .get(name)
            .and_then(|stack| stack.last())
            .map(|&(_, id)| id)
    }

    /// Pop the topmost binding for `name`, revealing the shadowed one if
    /// any. Returns the unbound id.
    pub(crate) fn unbind(&mut self, name: &str) -> Option<TypeId> {
        let stack = self.bindings.get_mut(name)?;
        let (_, id) = stack.pop()?;
        if stack.is_empty() {
            self.bindings.remove(name);
        }
        Some(id)
    }

    /// Every bound id, shadowed bindings included. GC roots.
    pub(crate) fn bound_ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.bindings
            .values()
            .flat_map(|stack| stack.iter().map(|&(_, id)| id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_unbound_name_is_none() {
        let table = SymbolTable::new();
        assert_eq!(table.lookup("T"), None);
    }

    #[test]
    fn bind_shadows_and_unbind_reveals() {
        let mut table = SymbolTable::new();
        let name: Rc<str> = Rc::from("T");
        table.bind(name.clone(), TypeId::new(5));
        table.bind(name.clone(), TypeId::new(9));

        assert_eq!(table.lookup("T"), Some(TypeId::new(9)));
        assert_eq!(table.unbind("T"), Some(TypeId::new(9)));
        assert_eq!(table.lookup("T"), Some(TypeId::new(5)));
        assert_eq!(table.unbind("T"), Some(TypeId::new(5)));
        assert_eq!(table.lookup("T"), None);
        assert_eq!(table.unbind("T"), None);
    }

    #[test]
    fn each_binding_holds_one_name_reference() {
        let mut table = SymbolTable::new();
        let name: Rc<str> = Rc::from("T");
        assert_eq!(Rc::strong_count(&name), 1);

        table.bind(name.clone(), TypeId::new(5));
        table.bind(name.clone(), TypeId::new(9));
        assert_eq!(Rc::strong_count(&name), 3);

        table.unbind("T");
        assert_eq!(Rc::strong_count(&name), 2);
        table.unbind("T");
        assert_eq!(Rc::strong_count(&name), 1);
    }

    #[test]
    fn bound_ids_includes_shadowed_bindings() {
        let mut table = SymbolTable::new();
        table.bind(Rc::from("T"), TypeId::new(5));
        table.bind(Rc::from("T"), TypeId::new(9));
        table.bind(Rc::from("U"), TypeId::new(7));

        let mut ids: Vec<u32> = table.bound_ids().map(TypeId::index).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![5, 7, 9]);
    }
}
