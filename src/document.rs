//! Document lifecycle (`§4.5`): lazy parse → read-only view → copy-on-write
//! materialization on first mutation. Grounded on
//! `json-joy-core/src/model/view.rs`'s split between an immutable source
//! payload and a decoded/materialized view, adapted here to a JSON tree
//! instead of a CRDT binary.
//!
//! Full streaming/incremental parsing is a declared Non-goal (`spec.md §1`),
//! so `parse` eagerly decodes the whole tree; "lazy" vs "materialized" is
//! tracked as a COW-visible flag rather than deferred parsing. This keeps
//! the `is_materialized` probe and the round-trip/idempotence properties in
//! `§8` straightforward to satisfy without reintroducing streaming parsing
//! through the back door.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use serde_json::Value;

use crate::error::{Error, ErrorKind};
use crate::path::ast::Path;
use crate::registry::FunctionRegistry;

pub struct Document {
    value: RefCell<Value>,
    materialized: Cell<bool>,
    registry: RefCell<FunctionRegistry>,
    path_cache: RefCell<HashMap<String, Rc<Path>>>,
}

impl Document {
    pub fn parse(text: &str) -> Result<Rc<Self>, Error> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::new(ErrorKind::ParseError(e.to_string())))?;
        Ok(Rc::new(Self::from_value(value)))
    }

    pub fn parse_bytes(bytes: &[u8]) -> Result<Rc<Self>, Error> {
        let value: Value = serde_json::from_slice(bytes)
            .map_err(|e| Error::new(ErrorKind::ParseError(e.to_string())))?;
        Ok(Rc::new(Self::from_value(value)))
    }

    pub fn from_value(value: Value) -> Self {
        Self {
            value: RefCell::new(value),
            materialized: Cell::new(false),
            registry: RefCell::new(FunctionRegistry::new()),
            path_cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn is_materialized(&self) -> bool {
        self.materialized.get()
    }

    /// Idempotent transition to materialized (mutable) mode.
    pub fn materialize(&self) {
        self.materialized.set(true);
    }

    pub fn value(&self) -> std::cell::Ref<'_, Value> {
        self.value.borrow()
    }

    pub fn value_mut(&self) -> Result<std::cell::RefMut<'_, Value>, Error> {
        self.materialize();
        Ok(self.value.borrow_mut())
    }

    pub fn registry(&self) -> &RefCell<FunctionRegistry> {
        &self.registry
    }

    /// Fetch a compiled path from cache, or parse, cache, and return it.
    pub fn compile_path(&self, path_str: &str) -> Result<Rc<Path>, Error> {
        if let Some(cached) = self.path_cache.borrow().get(path_str) {
            return Ok(cached.clone());
        }
        let ops = crate::path::parser::parse(path_str)?;
        let rc = Rc::new(ops);
        self.path_cache
            .borrow_mut()
            .insert(path_str.to_string(), rc.clone());
        Ok(rc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_starts_unmaterialized() {
        let doc = Document::parse(r#"{"a":1}"#).unwrap();
        assert!(!doc.is_materialized());
    }

    #[test]
    fn materialize_is_idempotent() {
        let doc = Document::parse(r#"{"a":1}"#).unwrap();
        doc.materialize();
        doc.materialize();
        assert!(doc.is_materialized());
    }

    #[test]
    fn value_mut_materializes_as_side_effect() {
        let doc = Document::parse(r#"{"a":1}"#).unwrap();
        assert!(!doc.is_materialized());
        let _ = doc.value_mut().unwrap();
        assert!(doc.is_materialized());
    }

    #[test]
    fn compile_path_is_cached() {
        let doc = Document::parse(r#"{"a":1}"#).unwrap();
        let p1 = doc.compile_path("/a").unwrap();
        let p2 = doc.compile_path("/a").unwrap();
        assert!(Rc::ptr_eq(&p1, &p2));
    }

    #[test]
    fn parse_error_surfaces_as_parse_error() {
        let err = Document::parse("{not json}").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ParseError(_)));
    }
}
