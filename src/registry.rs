//! Per-document function registry (`§4.3`). A document owns one registry;
//! every node derived from its root carries a shared reference to it,
//! following the "shared ownership, never an owning parent pointer"
//! strategy from spec design notes (`§9`).

use std::collections::HashMap;
use std::rc::Rc;

use crate::node::Node;

/// A registered path function: `(Node) -> Node`.
pub type PathFn = Rc<dyn Fn(Node) -> Node>;

#[derive(Default)]
pub struct FunctionRegistry {
    funcs: HashMap<String, PathFn>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, f: impl Fn(Node) -> Node + 'static) {
        self.funcs.insert(name.into(), Rc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<PathFn> {
        self.funcs.get(name).cloned()
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.funcs.remove(name).is_some()
    }

    /// A read-only snapshot of registered names; mutating the returned
    /// vector does not affect the registry.
    pub fn names(&self) -> Vec<String> {
        self.funcs.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_get_remove_round_trip() {
        let mut reg = FunctionRegistry::new();
        assert!(reg.get("double").is_none());
        reg.register("double", |n| n);
        assert!(reg.get("double").is_some());
        assert_eq!(reg.names(), vec!["double".to_string()]);
        assert!(reg.remove("double"));
        assert!(!reg.remove("double"));
    }

    #[test]
    fn names_snapshot_is_independent_of_registry() {
        let mut reg = FunctionRegistry::new();
        reg.register("a", |n| n);
        let mut snap = reg.names();
        snap.push("b".to_string());
        assert_eq!(reg.names(), vec!["a".to_string()]);
    }
}
