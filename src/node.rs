//! The unified node handle (`§5`): accessors, navigation, iteration,
//! conversions, mutation, functional ops, and the registry surface. Every
//! operation that can fail records its error on the returned node instead
//! of raising, so chains short-circuit (first-wins) without panicking
//! (`§7`). Grounded on `json-joy-json-path`'s path-result wrapper plus the
//! `materialize`/COW split lifted from `json-joy-core`'s document view.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::breadcrumb::{self, Breadcrumb, Segment};
use crate::document::Document;
use crate::error::{Error, ErrorKind};
use crate::path::eval;

/// The discriminant reported by [`Node::kind`]. `Invalid` covers both an
/// explicit in-band error and a stale breadcrumb that no longer resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Object,
    Array,
    String,
    Number,
    Bool,
    Null,
    Invalid,
}

impl Kind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Object(_) => Kind::Object,
            Value::Array(_) => Kind::Array,
            Value::String(_) => Kind::String,
            Value::Number(_) => Kind::Number,
            Value::Bool(_) => Kind::Bool,
            Value::Null => Kind::Null,
        }
    }
}

/// What a node currently refers to (`§3`).
#[derive(Debug, Clone)]
pub enum NodeRef {
    /// A live position in the document tree, resolved against the root on
    /// every access rather than cached — this is what makes a stale handle
    /// correctly report "not found" after the position is removed.
    Tree(Breadcrumb),
    /// A Result-Array: an Array-kinded node whose backing collection lives
    /// outside the tree (recursive descent, wildcard-on-object, slice,
    /// filter). `origin` is kept only for diagnostics.
    Result { items: Rc<Vec<Value>>, origin: Breadcrumb },
    /// A standalone value with no stable tree position (an element plucked
    /// out of a Result-Array, or the output of `filter`/`map`). Navigable,
    /// but never a mutation target.
    Single(Value),
}

/// A handle onto one position (or detached value) within a [`Document`].
#[derive(Clone)]
pub struct Node {
    doc: Rc<Document>,
    inner: NodeRef,
    error: Option<Error>,
}

impl Node {
    pub(crate) fn from_parts(doc: Rc<Document>, inner: NodeRef, error: Option<Error>) -> Self {
        Self { doc, inner, error }
    }

    pub(crate) fn into_parts(self) -> (NodeRef, Option<Error>) {
        (self.inner, self.error)
    }

    /// Build the root node of a document. Exposed directly (rather than
    /// only through [`crate::parse`]) so callers that already hold a
    /// [`Document`] — e.g. to inspect [`Document::is_materialized`]
    /// alongside its root node — don't need to re-parse.
    pub fn root(doc: Rc<Document>) -> Self {
        Self {
            doc,
            inner: NodeRef::Tree(Vec::new()),
            error: None,
        }
    }

    pub(crate) fn single(doc: Rc<Document>, value: Value) -> Self {
        Self {
            doc,
            inner: NodeRef::Single(value),
            error: None,
        }
    }

    pub(crate) fn invalid(doc: Rc<Document>, err: Error) -> Self {
        Self {
            doc,
            inner: NodeRef::Tree(Vec::new()),
            error: Some(err),
        }
    }

    fn chained(&self, err: Error) -> Self {
        Self::invalid(self.doc.clone(), err)
    }

    fn origin(&self) -> Breadcrumb {
        match &self.inner {
            NodeRef::Tree(bc) => bc.clone(),
            NodeRef::Result { origin, .. } => origin.clone(),
            NodeRef::Single(_) => Vec::new(),
        }
    }

    /// Resolve the current value this node denotes. For a `Result` node
    /// this is the collection itself, represented as a JSON array.
    fn resolve_value(&self) -> Result<Value, Error> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        match &self.inner {
            NodeRef::Tree(bc) => {
                let root = self.doc.value();
                breadcrumb::resolve(&root, bc)
                    .cloned()
                    .ok_or_else(|| Error::at(ErrorKind::PathNotFound("<stale>".to_string()), breadcrumb::render(bc)))
            }
            NodeRef::Result { items, .. } => Ok(Value::Array(items.as_ref().clone())),
            NodeRef::Single(v) => Ok(v.clone()),
        }
    }

    // -- Accessors (`§5`) ----------------------------------------------

    pub fn kind(&self) -> Kind {
        self.resolve_value().map(|v| Kind::of(&v)).unwrap_or(Kind::Invalid)
    }

    pub fn is_valid(&self) -> bool {
        self.resolve_value().is_ok()
    }

    pub fn error(&self) -> Option<Error> {
        self.resolve_value().err()
    }

    pub fn path(&self) -> String {
        breadcrumb::render(&self.origin())
    }

    /// Canonical text of the referenced subtree, or `"null"` if the node
    /// is invalid (lenient, like the other zero-value conversions).
    pub fn raw(&self) -> String {
        let v = self.resolve_value().unwrap_or(Value::Null);
        crate::format::to_canonical_string(&v)
    }

    // -- Navigation (`§5`) -----------------------------------------------

    pub fn get(&self, key: &str) -> Self {
        self.step(crate::path::ast::Op::GetKey(key.to_string()))
    }

    pub fn index(&self, i: i64) -> Self {
        self.step(crate::path::ast::Op::IndexAt(i))
    }

    pub fn query(&self, path_str: &str) -> Self {
        if let Some(err) = &self.error {
            return self.chained(err.clone());
        }
        let ops = match self.doc.compile_path(path_str) {
            Ok(ops) => ops,
            Err(err) => return self.chained(err),
        };
        match eval::evaluate(&self.doc, self.inner.clone(), &ops) {
            Ok(inner) => Self::from_parts(self.doc.clone(), inner, None),
            Err(err) => self.chained(err),
        }
    }

    fn step(&self, op: crate::path::ast::Op) -> Self {
        if let Some(err) = &self.error {
            return self.chained(err.clone());
        }
        match eval::evaluate(&self.doc, self.inner.clone(), std::slice::from_ref(&op)) {
            Ok(inner) => Self::from_parts(self.doc.clone(), inner, None),
            Err(err) => self.chained(err),
        }
    }

    // -- Iteration (`§5`) -------------------------------------------------

    /// `key` is `Some` when iterating an object, `None` when iterating an
    /// array (in which case the position is the array index).
    pub fn for_each(&self, mut f: impl FnMut(Option<&str>, Node)) {
        let Ok(v) = self.resolve_value() else {
            return;
        };
        match v {
            Value::Object(map) => {
                for (k, child) in map.iter() {
                    let node = self.child_node(Some(k.as_str()), None, child.clone());
                    f(Some(k), node);
                }
            }
            Value::Array(arr) => {
                for (i, child) in arr.iter().enumerate() {
                    let node = self.child_node(None, Some(i), child.clone());
                    f(None, node);
                }
            }
            _ => {}
        }
    }

    fn child_node(&self, key: Option<&str>, index: Option<usize>, value: Value) -> Node {
        match &self.inner {
            NodeRef::Tree(bc) => {
                let mut nb = bc.clone();
                match (key, index) {
                    (Some(k), _) => nb.push(Segment::Key(k.to_string())),
                    (_, Some(i)) => nb.push(Segment::Index(i)),
                    _ => {}
                }
                Node::from_parts(self.doc.clone(), NodeRef::Tree(nb), None)
            }
            _ => Node::single(self.doc.clone(), value),
        }
    }

    pub fn len(&self) -> usize {
        match self.resolve_value() {
            Ok(Value::Array(a)) => a.len(),
            Ok(Value::Object(m)) => m.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- Conversions (`§5`, `§7`) -----------------------------------------
    //
    // Each conversion has a lenient variant (plain name, returns the
    // kind's zero value on mismatch) and a strict `must_*` variant that
    // panics on mismatch or invalidity.

    pub fn as_string(&self) -> String {
        match self.resolve_value() {
            Ok(Value::String(s)) => s,
            _ => String::new(),
        }
    }

    pub fn must_as_string(&self) -> String {
        match self.resolve_value() {
            Ok(Value::String(s)) => s,
            Ok(v) => panic!("node is not a string: {v}"),
            Err(e) => panic!("{e}"),
        }
    }

    /// Coerce a value to a double: numbers convert directly, numeric-looking
    /// strings are parsed (`§7` `ConversionError`), anything else is a
    /// `KindMismatch`.
    fn coerce_f64(v: &Value) -> Result<f64, Error> {
        match v {
            Value::Number(n) => Ok(n.as_f64().unwrap_or(0.0)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::new(ErrorKind::ConversionError(format!("cannot convert {s:?} to a number")))),
            other => Err(Error::new(ErrorKind::KindMismatch(format!(
                "expected a number, found {}",
                Kind::of(other).label()
            )))),
        }
    }

    /// Integer counterpart of [`Node::coerce_f64`]; strings that parse as an
    /// integer keep exact precision, falling back to double-then-truncate.
    fn coerce_i64(v: &Value) -> Result<i64, Error> {
        match v {
            Value::Number(n) => Ok(n.as_i64().unwrap_or_else(|| n.as_f64().unwrap_or(0.0) as i64)),
            Value::String(s) => {
                let t = s.trim();
                if let Ok(i) = t.parse::<i64>() {
                    Ok(i)
                } else if let Ok(f) = t.parse::<f64>() {
                    Ok(f as i64)
                } else {
                    Err(Error::new(ErrorKind::ConversionError(format!(
                        "cannot convert {s:?} to a number"
                    ))))
                }
            }
            other => Err(Error::new(ErrorKind::KindMismatch(format!(
                "expected a number, found {}",
                Kind::of(other).label()
            )))),
        }
    }

    pub fn as_float(&self) -> f64 {
        self.resolve_value().ok().and_then(|v| Self::coerce_f64(&v).ok()).unwrap_or(0.0)
    }

    pub fn must_as_float(&self) -> f64 {
        match self.resolve_value() {
            Ok(v) => Self::coerce_f64(&v).unwrap_or_else(|e| panic!("{e}")),
            Err(e) => panic!("{e}"),
        }
    }

    pub fn as_int(&self) -> i64 {
        self.resolve_value().ok().and_then(|v| Self::coerce_i64(&v).ok()).unwrap_or(0)
    }

    pub fn must_as_int(&self) -> i64 {
        match self.resolve_value() {
            Ok(v) => Self::coerce_i64(&v).unwrap_or_else(|e| panic!("{e}")),
            Err(e) => panic!("{e}"),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self.resolve_value() {
            Ok(Value::Bool(b)) => b,
            _ => false,
        }
    }

    pub fn must_as_bool(&self) -> bool {
        match self.resolve_value() {
            Ok(Value::Bool(b)) => b,
            Ok(v) => panic!("node is not a bool: {v}"),
            Err(e) => panic!("{e}"),
        }
    }

    fn parse_time(v: &Value) -> Option<DateTime<Utc>> {
        match v {
            Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc)),
            _ => None,
        }
    }

    pub fn as_time(&self) -> DateTime<Utc> {
        self.resolve_value()
            .ok()
            .and_then(|v| Self::parse_time(&v))
            .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap())
    }

    pub fn must_as_time(&self) -> DateTime<Utc> {
        match self.resolve_value() {
            Ok(v) => Self::parse_time(&v).unwrap_or_else(|| panic!("node is not an RFC 3339 timestamp: {v}")),
            Err(e) => panic!("{e}"),
        }
    }

    pub fn as_array(&self) -> Vec<Node> {
        match self.resolve_value() {
            Ok(Value::Array(_)) => self.collect_children(),
            _ => Vec::new(),
        }
    }

    pub fn must_as_array(&self) -> Vec<Node> {
        match self.resolve_value() {
            Ok(Value::Array(_)) => self.collect_children(),
            Ok(v) => panic!("node is not an array: {v}"),
            Err(e) => panic!("{e}"),
        }
    }

    fn collect_children(&self) -> Vec<Node> {
        let mut out = Vec::new();
        self.for_each(|_, node| out.push(node));
        out
    }

    pub fn as_map(&self) -> Vec<(String, Node)> {
        match self.resolve_value() {
            Ok(Value::Object(_)) => self.collect_entries(),
            _ => Vec::new(),
        }
    }

    pub fn must_as_map(&self) -> Vec<(String, Node)> {
        match self.resolve_value() {
            Ok(Value::Object(_)) => self.collect_entries(),
            Ok(v) => panic!("node is not an object: {v}"),
            Err(e) => panic!("{e}"),
        }
    }

    fn collect_entries(&self) -> Vec<(String, Node)> {
        let mut out = Vec::new();
        self.for_each(|key, node| {
            if let Some(k) = key {
                out.push((k.to_string(), node));
            }
        });
        out
    }

    pub fn as_interface(&self) -> Value {
        self.resolve_value().unwrap_or(Value::Null)
    }

    pub fn must_as_interface(&self) -> Value {
        match self.resolve_value() {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }

    /// `(value, ok)` without the strict/lenient wrapping of [`Node::as_float`].
    pub fn raw_float(&self) -> (f64, bool) {
        match self.resolve_value().ok().and_then(|v| Self::coerce_f64(&v).ok()) {
            Some(f) => (f, true),
            None => (0.0, false),
        }
    }

    /// `(value, ok)` without the strict/lenient wrapping of [`Node::as_string`].
    pub fn raw_string(&self) -> (String, bool) {
        match self.resolve_value() {
            Ok(Value::String(s)) => (s, true),
            _ => (String::new(), false),
        }
    }

    // -- Mutation (`§5`, `§9` Open Question 2) ----------------------------

    /// `set` requires the node to be a live tree position of kind Object;
    /// any other kind — including Array, per the resolution of Open
    /// Question 2 — fails with `KindMismatch` and performs no mutation.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Self {
        if let Some(err) = &self.error {
            return self.chained(err.clone());
        }
        let bc = match &self.inner {
            NodeRef::Tree(bc) => bc.clone(),
            _ => {
                return self.chained(Error::new(ErrorKind::UnsupportedOperation(
                    "set requires a tree position".to_string(),
                )))
            }
        };
        let value = value.into();
        let result = (|| -> Result<Breadcrumb, Error> {
            let mut root = self.doc.value_mut()?;
            let target = breadcrumb::resolve_mut(&mut root, &bc)
                .ok_or_else(|| Error::at(ErrorKind::PathNotFound(key.to_string()), breadcrumb::render(&bc)))?;
            match target {
                Value::Object(map) => {
                    map.insert(key.to_string(), value);
                    let mut nb = bc.clone();
                    nb.push(Segment::Key(key.to_string()));
                    Ok(nb)
                }
                _ => Err(Error::at(
                    ErrorKind::KindMismatch("set requires an object".to_string()),
                    breadcrumb::render(&bc),
                )),
            }
        })();
        match result {
            Ok(nb) => Node::from_parts(self.doc.clone(), NodeRef::Tree(nb), None),
            Err(err) => self.chained(err),
        }
    }

    /// `append` requires the node to be a live tree position of kind Array.
    pub fn append(&self, value: impl Into<Value>) -> Self {
        if let Some(err) = &self.error {
            return self.chained(err.clone());
        }
        let bc = match &self.inner {
            NodeRef::Tree(bc) => bc.clone(),
            _ => {
                return self.chained(Error::new(ErrorKind::UnsupportedOperation(
                    "append requires a tree position".to_string(),
                )))
            }
        };
        let value = value.into();
        let result = (|| -> Result<Breadcrumb, Error> {
            let mut root = self.doc.value_mut()?;
            let target = breadcrumb::resolve_mut(&mut root, &bc)
                .ok_or_else(|| Error::at(ErrorKind::PathNotFound("[append]".to_string()), breadcrumb::render(&bc)))?;
            match target {
                Value::Array(arr) => {
                    arr.push(value);
                    let mut nb = bc.clone();
                    nb.push(Segment::Index(arr.len() - 1));
                    Ok(nb)
                }
                _ => Err(Error::at(
                    ErrorKind::UnsupportedOperation("append requires an array".to_string()),
                    breadcrumb::render(&bc),
                )),
            }
        })();
        match result {
            Ok(nb) => Node::from_parts(self.doc.clone(), NodeRef::Tree(nb), None),
            Err(err) => self.chained(err),
        }
    }

    // -- Functional ops (`§5`) ---------------------------------------------

    fn elements(&self) -> Result<Vec<Value>, Error> {
        match self.resolve_value()? {
            Value::Array(a) => Ok(a),
            v => Err(Error::new(ErrorKind::KindMismatch(format!(
                "expected an array, found {}",
                Kind::of(&v).label()
            )))),
        }
    }

    pub fn filter(&self, pred: impl Fn(&Node) -> bool) -> Self {
        if let Some(err) = &self.error {
            return self.chained(err.clone());
        }
        match self.elements() {
            Err(err) => self.chained(err),
            Ok(elems) => {
                let kept = elems
                    .into_iter()
                    .filter(|v| pred(&Node::single(self.doc.clone(), v.clone())))
                    .collect();
                Node::from_parts(
                    self.doc.clone(),
                    NodeRef::Result {
                        items: Rc::new(kept),
                        origin: self.origin(),
                    },
                    None,
                )
            }
        }
    }

    pub fn map(&self, xf: impl Fn(&Node) -> Value) -> Self {
        if let Some(err) = &self.error {
            return self.chained(err.clone());
        }
        match self.elements() {
            Err(err) => self.chained(err),
            Ok(elems) => {
                let mapped = elems
                    .into_iter()
                    .map(|v| xf(&Node::single(self.doc.clone(), v)))
                    .collect();
                Node::from_parts(
                    self.doc.clone(),
                    NodeRef::Result {
                        items: Rc::new(mapped),
                        origin: self.origin(),
                    },
                    None,
                )
            }
        }
    }

    // -- Registry (`§4.3`, `§5`) -------------------------------------------

    pub fn register_func(&self, name: impl Into<String>, f: impl Fn(Node) -> Node + 'static) -> Self {
        self.doc.registry().borrow_mut().register(name, f);
        self.clone()
    }

    pub fn call_func(&self, name: &str) -> Self {
        self.step(crate::path::ast::Op::CallFunc(name.to_string()))
    }

    pub fn remove_func(&self, name: &str) -> Self {
        self.doc.registry().borrow_mut().remove(name);
        self.clone()
    }

    pub fn get_funcs(&self) -> Vec<String> {
        self.doc.registry().borrow().names()
    }
}

impl Kind {
    fn label(&self) -> &'static str {
        match self {
            Kind::Object => "object",
            Kind::Array => "array",
            Kind::String => "string",
            Kind::Number => "number",
            Kind::Bool => "bool",
            Kind::Null => "null",
            Kind::Invalid => "invalid",
        }
    }
}
