//! Query evaluator (`§4.2`): executes an operation list against a
//! [`NodeRef`], producing a new `NodeRef`. Grounded on
//! `json-joy-json-path/src/eval.rs`'s `JsonPathEval` (pre-order recursive
//! descent, per-selector dispatch, filter-expression evaluation), adapted
//! to this crate's op set and fan-out/registry rules (`§4.2`, `§4.3`).

use std::rc::Rc;

use serde_json::Value;

use super::ast::{CmpOp, FilterExpr, Literal, Op, Operand, RelStep};
use crate::breadcrumb::{self, Breadcrumb, Segment};
use crate::document::Document;
use crate::error::{Error, ErrorKind};
use crate::node::{Node, NodeRef};

pub fn evaluate(doc: &Rc<Document>, start: NodeRef, ops: &[Op]) -> Result<NodeRef, Error> {
    let mut current = start;
    for op in ops {
        current = step(doc, current, op)?;
    }
    Ok(current)
}

fn normalize_index(i: i64, len: usize) -> Option<usize> {
    let resolved = if i < 0 { len as i64 + i } else { i };
    if resolved < 0 || resolved as usize >= len {
        None
    } else {
        Some(resolved as usize)
    }
}

/// Resolve each explicitly-given slice bound and validate it falls in
/// `[0, len]` (inclusive); default bounds never error. Returns the clamped
/// `(lo, hi)` pair or an `IndexOutOfRange` error. See `§4.2` Slice rule.
fn resolve_slice_bounds(lo: Option<i64>, hi: Option<i64>, len: usize) -> Result<(usize, usize), Error> {
    let resolve_bound = |b: i64, len: usize| -> i64 {
        if b < 0 {
            len as i64 + b
        } else {
            b
        }
    };
    let lo_resolved = match lo {
        Some(b) => {
            let r = resolve_bound(b, len);
            if r < 0 || r > len as i64 {
                return Err(Error::new(ErrorKind::IndexOutOfRange(format!(
                    "slice start {b} out of range for length {len}"
                ))));
            }
            r as usize
        }
        None => 0,
    };
    let hi_resolved = match hi {
        Some(b) => {
            let r = resolve_bound(b, len);
            if r < 0 || r > len as i64 {
                return Err(Error::new(ErrorKind::IndexOutOfRange(format!(
                    "slice end {b} out of range for length {len}"
                ))));
            }
            r as usize
        }
        None => len,
    };
    if lo_resolved > hi_resolved {
        return Err(Error::new(ErrorKind::IndexOutOfRange(format!(
            "slice start {lo_resolved} is past end {hi_resolved}"
        ))));
    }
    Ok((lo_resolved, hi_resolved))
}

fn step(doc: &Rc<Document>, current: NodeRef, op: &Op) -> Result<NodeRef, Error> {
    match op {
        Op::GetKey(key) => get_key(doc, current, key),
        Op::IndexAt(i) => index_at(doc, current, *i),
        Op::Slice(lo, hi) => slice(doc, current, *lo, *hi),
        Op::Wildcard => wildcard(doc, current),
        Op::RecursiveDescent(target) => recursive_descent(doc, current, target.as_ref()),
        Op::Parent => parent(current),
        Op::CallFunc(name) => call_func(doc, current, name),
        Op::Filter(expr) => filter(doc, current, expr),
    }
}

fn get_key(doc: &Rc<Document>, current: NodeRef, key: &str) -> Result<NodeRef, Error> {
    match current {
        NodeRef::Tree(bc) => {
            let root = doc.value();
            let v = breadcrumb::resolve(&root, &bc)
                .ok_or_else(|| Error::at(ErrorKind::PathNotFound(key.to_string()), breadcrumb::render(&bc)))?;
            match v {
                Value::Object(map) => {
                    if map.contains_key(key) {
                        let mut nb = bc.clone();
                        nb.push(Segment::Key(key.to_string()));
                        Ok(NodeRef::Tree(nb))
                    } else {
                        Err(Error::at(ErrorKind::PathNotFound(key.to_string()), breadcrumb::render(&bc)))
                    }
                }
                _ => Err(Error::at(
                    ErrorKind::KindMismatch(format!("get_key({key}) requires an object")),
                    breadcrumb::render(&bc),
                )),
            }
        }
        NodeRef::Result { items, origin } => {
            // Fan-out (§4.2): apply element-wise, dropping elements that
            // aren't objects or lack `key` rather than erroring on the
            // whole collection. Lets a query like "collect all price
            // fields" succeed over a heterogeneous array (§7).
            let out: Vec<Value> = items
                .iter()
                .filter_map(|v| v.as_object().and_then(|m| m.get(key)).cloned())
                .collect();
            Ok(NodeRef::Result {
                items: Rc::new(out),
                origin,
            })
        }
        NodeRef::Single(v) => match v {
            Value::Object(map) => map
                .get(key)
                .cloned()
                .map(NodeRef::Single)
                .ok_or_else(|| Error::new(ErrorKind::PathNotFound(key.to_string()))),
            _ => Err(Error::new(ErrorKind::KindMismatch(format!(
                "get_key({key}) requires an object"
            )))),
        },
    }
}

fn index_at(doc: &Rc<Document>, current: NodeRef, i: i64) -> Result<NodeRef, Error> {
    match current {
        NodeRef::Tree(bc) => {
            let root = doc.value();
            let v = breadcrumb::resolve(&root, &bc)
                .ok_or_else(|| Error::at(ErrorKind::PathNotFound(format!("[{i}]")), breadcrumb::render(&bc)))?;
            match v {
                Value::Array(arr) => match normalize_index(i, arr.len()) {
                    Some(idx) => {
                        let mut nb = bc.clone();
                        nb.push(Segment::Index(idx));
                        Ok(NodeRef::Tree(nb))
                    }
                    None => Err(Error::at(
                        ErrorKind::IndexOutOfRange(format!("index {i} out of range for length {}", arr.len())),
                        breadcrumb::render(&bc),
                    )),
                },
                _ => Err(Error::at(
                    ErrorKind::KindMismatch("index_at requires an array".to_string()),
                    breadcrumb::render(&bc),
                )),
            }
        }
        NodeRef::Result { items, origin } => match normalize_index(i, items.len()) {
            Some(idx) => Ok(NodeRef::Single(items[idx].clone())),
            None => Err(Error::at(
                ErrorKind::IndexOutOfRange(format!("index {i} out of range for length {}", items.len())),
                breadcrumb::render(&origin),
            )),
        },
        NodeRef::Single(v) => match v {
            Value::Array(arr) => match normalize_index(i, arr.len()) {
                Some(idx) => Ok(NodeRef::Single(arr[idx].clone())),
                None => Err(Error::new(ErrorKind::IndexOutOfRange(format!(
                    "index {i} out of range for length {}",
                    arr.len()
                )))),
            },
            _ => Err(Error::new(ErrorKind::KindMismatch(
                "index_at requires an array".to_string(),
            ))),
        },
    }
}

fn slice_array(arr: &[Value], lo: Option<i64>, hi: Option<i64>) -> Result<Vec<Value>, Error> {
    let (lo, hi) = resolve_slice_bounds(lo, hi, arr.len())?;
    Ok(arr[lo..hi].to_vec())
}

fn slice(doc: &Rc<Document>, current: NodeRef, lo: Option<i64>, hi: Option<i64>) -> Result<NodeRef, Error> {
    match current {
        NodeRef::Tree(bc) => {
            let root = doc.value();
            let v = breadcrumb::resolve(&root, &bc)
                .ok_or_else(|| Error::at(ErrorKind::PathNotFound("[slice]".to_string()), breadcrumb::render(&bc)))?;
            match v {
                Value::Array(arr) => {
                    let items = slice_array(arr, lo, hi).map_err(|e| e.with_path(breadcrumb::render(&bc)))?;
                    Ok(NodeRef::Result {
                        items: Rc::new(items),
                        origin: bc,
                    })
                }
                _ => Err(Error::at(
                    ErrorKind::KindMismatch("slice requires an array".to_string()),
                    breadcrumb::render(&bc),
                )),
            }
        }
        NodeRef::Result { items, origin } => {
            let sliced = slice_array(&items, lo, hi).map_err(|e| e.with_path(breadcrumb::render(&origin)))?;
            Ok(NodeRef::Result {
                items: Rc::new(sliced),
                origin,
            })
        }
        NodeRef::Single(Value::Array(arr)) => {
            let items = slice_array(&arr, lo, hi)?;
            Ok(NodeRef::Result {
                items: Rc::new(items),
                origin: Breadcrumb::new(),
            })
        }
        NodeRef::Single(_) => Err(Error::new(ErrorKind::KindMismatch(
            "slice requires an array".to_string(),
        ))),
    }
}

fn wildcard(doc: &Rc<Document>, current: NodeRef) -> Result<NodeRef, Error> {
    match current {
        NodeRef::Tree(bc) => {
            let root = doc.value();
            let v = breadcrumb::resolve(&root, &bc)
                .ok_or_else(|| Error::at(ErrorKind::PathNotFound("[*]".to_string()), breadcrumb::render(&bc)))?;
            match v {
                Value::Object(map) => Ok(NodeRef::Result {
                    items: Rc::new(map.values().cloned().collect()),
                    origin: bc,
                }),
                Value::Array(_) => Ok(NodeRef::Tree(bc)),
                _ => Err(Error::at(
                    ErrorKind::KindMismatch("wildcard requires an object or array".to_string()),
                    breadcrumb::render(&bc),
                )),
            }
        }
        // A Result-Array is already Array-kind: wildcard on it is identity.
        r @ NodeRef::Result { .. } => Ok(r),
        NodeRef::Single(v) => match v {
            Value::Object(map) => Ok(NodeRef::Result {
                items: Rc::new(map.values().cloned().collect()),
                origin: Breadcrumb::new(),
            }),
            Value::Array(arr) => Ok(NodeRef::Single(Value::Array(arr))),
            _ => Err(Error::new(ErrorKind::KindMismatch(
                "wildcard requires an object or array".to_string(),
            ))),
        },
    }
}

fn parent(current: NodeRef) -> Result<NodeRef, Error> {
    match current {
        NodeRef::Tree(bc) => {
            if bc.is_empty() {
                Err(Error::new(ErrorKind::PathNotFound("..".to_string())))
            } else {
                let mut nb = bc;
                nb.pop();
                Ok(NodeRef::Tree(nb))
            }
        }
        // Open Question 4 (spec.md §9): parent navigation on a Result-Array
        // or a detached value is undefined upstream; we yield invalid.
        NodeRef::Result { .. } | NodeRef::Single(_) => Err(Error::new(ErrorKind::UnsupportedOperation(
            "parent navigation is undefined on a result collection".to_string(),
        ))),
    }
}

fn call_func(doc: &Rc<Document>, current: NodeRef, name: &str) -> Result<NodeRef, Error> {
    let f = doc
        .registry()
        .borrow()
        .get(name)
        .ok_or_else(|| Error::new(ErrorKind::UnknownFunction(name.to_string())))?;
    let input = Node::from_parts(doc.clone(), current, None);
    let output = f(input);
    match output.into_parts() {
        (inner, None) => Ok(inner),
        (_, Some(err)) => Err(err),
    }
}

fn recursive_descent(doc: &Rc<Document>, current: NodeRef, target: &Op) -> Result<NodeRef, Error> {
    let origin = match &current {
        NodeRef::Tree(bc) => bc.clone(),
        NodeRef::Result { origin, .. } => origin.clone(),
        NodeRef::Single(_) => Breadcrumb::new(),
    };
    let root_value;
    let start_value: &Value = match &current {
        NodeRef::Tree(bc) => {
            root_value = doc.value();
            breadcrumb::resolve(&root_value, bc)
                .ok_or_else(|| Error::at(ErrorKind::PathNotFound("[//]".to_string()), breadcrumb::render(bc)))?
        }
        NodeRef::Single(v) => v,
        NodeRef::Result { .. } => {
            // Recursive descent starting from a Result-Array descends into
            // each element independently and flattens the collections.
            let items = match &current {
                NodeRef::Result { items, .. } => items.clone(),
                _ => unreachable!(),
            };
            let mut out = Vec::new();
            for item in items.iter() {
                collect_recursive(doc, item, target, &mut out)?;
            }
            return Ok(NodeRef::Result {
                items: Rc::new(out),
                origin,
            });
        }
    };

    let mut out = Vec::new();
    collect_recursive(doc, start_value, target, &mut out)?;
    Ok(NodeRef::Result {
        items: Rc::new(out),
        origin,
    })
}

fn collect_recursive(doc: &Rc<Document>, value: &Value, target: &Op, out: &mut Vec<Value>) -> Result<(), Error> {
    if let Some(mut matched) = try_apply_single(doc, value, target)? {
        out.append(&mut matched);
    }
    match value {
        Value::Object(map) => {
            for child in map.values() {
                collect_recursive(doc, child, target, out)?;
            }
        }
        Value::Array(arr) => {
            for child in arr {
                collect_recursive(doc, child, target, out)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Apply `op` to a single detached value, for use inside recursive
/// descent. Returns `Ok(None)` when the op simply doesn't match at this
/// node (dropped silently, per the recursive-descent collection rule),
/// and `Err` only for genuine faults (e.g. an unknown function).
fn try_apply_single(doc: &Rc<Document>, value: &Value, op: &Op) -> Result<Option<Vec<Value>>, Error> {
    match op {
        Op::GetKey(k) => Ok(value.as_object().and_then(|m| m.get(k)).cloned().map(|v| vec![v])),
        Op::IndexAt(i) => Ok(value
            .as_array()
            .and_then(|a| normalize_index(*i, a.len()).map(|idx| a[idx].clone()))
            .map(|v| vec![v])),
        Op::Wildcard => Ok(match value {
            Value::Object(m) => Some(m.values().cloned().collect()),
            Value::Array(a) => Some(a.clone()),
            _ => None,
        }),
        Op::Slice(lo, hi) => Ok(value.as_array().and_then(|a| slice_array(a, *lo, *hi).ok())),
        Op::Filter(expr) => Ok(value.as_array().map(|a| {
            a.iter()
                .filter(|e| eval_filter(expr, e))
                .cloned()
                .collect::<Vec<_>>()
        })),
        Op::CallFunc(name) => match doc.registry().borrow().get(name) {
            None => Ok(None),
            Some(f) => {
                let input = Node::from_parts(doc.clone(), NodeRef::Single(value.clone()), None);
                let (inner, err) = f(input).into_parts();
                if err.is_some() {
                    return Ok(None);
                }
                Ok(Some(match inner {
                    NodeRef::Single(v) => vec![v],
                    NodeRef::Result { items, .. } => items.as_ref().clone(),
                    NodeRef::Tree(bc) => {
                        let root = doc.value();
                        breadcrumb::resolve(&root, &bc).cloned().map(|v| vec![v]).unwrap_or_default()
                    }
                }))
            }
        },
        Op::Parent | Op::RecursiveDescent(_) => Ok(None),
    }
}

fn filter(doc: &Rc<Document>, current: NodeRef, expr: &FilterExpr) -> Result<NodeRef, Error> {
    match current {
        NodeRef::Tree(bc) => {
            let root = doc.value();
            let v = breadcrumb::resolve(&root, &bc)
                .ok_or_else(|| Error::at(ErrorKind::PathNotFound("[?(...)]".to_string()), breadcrumb::render(&bc)))?;
            match v {
                Value::Array(arr) => {
                    let items = arr.iter().filter(|e| eval_filter(expr, e)).cloned().collect();
                    Ok(NodeRef::Result {
                        items: Rc::new(items),
                        origin: bc,
                    })
                }
                _ => Err(Error::at(
                    ErrorKind::KindMismatch("filter requires an array".to_string()),
                    breadcrumb::render(&bc),
                )),
            }
        }
        NodeRef::Result { items, origin } => {
            let kept = items.iter().filter(|e| eval_filter(expr, e)).cloned().collect();
            Ok(NodeRef::Result {
                items: Rc::new(kept),
                origin,
            })
        }
        NodeRef::Single(Value::Array(arr)) => {
            let kept = arr.iter().filter(|e| eval_filter(expr, e)).cloned().collect();
            Ok(NodeRef::Result {
                items: Rc::new(kept),
                origin: Breadcrumb::new(),
            })
        }
        NodeRef::Single(_) => Err(Error::new(ErrorKind::KindMismatch(
            "filter requires an array".to_string(),
        ))),
    }
}

fn resolve_operand(operand: &Operand, current: &Value) -> Option<Value> {
    match operand {
        Operand::Literal(lit) => Some(literal_to_value(lit)),
        Operand::Current(steps) => {
            let mut v = current;
            for step in steps {
                v = match (v, step) {
                    (Value::Object(m), RelStep::Key(k)) => m.get(k)?,
                    (Value::Array(a), RelStep::Index(i)) => {
                        let idx = normalize_index(*i, a.len())?;
                        &a[idx]
                    }
                    _ => return None,
                };
            }
            Some(v.clone())
        }
    }
}

fn literal_to_value(lit: &Literal) -> Value {
    match lit {
        Literal::Number(n) => serde_json::Number::from_f64(*n)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
    }
}

fn truthy(v: &Option<Value>) -> bool {
    match v {
        None => false,
        Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Object(_)) | Some(Value::Array(_)) => true,
    }
}

fn compare(op: CmpOp, l: &Option<Value>, r: &Option<Value>) -> bool {
    match (l, r) {
        (Some(a), Some(b)) => match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                let (xf, yf) = (x.as_f64().unwrap_or(f64::NAN), y.as_f64().unwrap_or(f64::NAN));
                match op {
                    CmpOp::Eq => xf == yf,
                    CmpOp::Ne => xf != yf,
                    CmpOp::Lt => xf < yf,
                    CmpOp::Le => xf <= yf,
                    CmpOp::Gt => xf > yf,
                    CmpOp::Ge => xf >= yf,
                }
            }
            (Value::String(x), Value::String(y)) => match op {
                CmpOp::Eq => x == y,
                CmpOp::Ne => x != y,
                CmpOp::Lt => x < y,
                CmpOp::Le => x <= y,
                CmpOp::Gt => x > y,
                CmpOp::Ge => x >= y,
            },
            (Value::Bool(x), Value::Bool(y)) => match op {
                CmpOp::Eq => x == y,
                CmpOp::Ne => x != y,
                _ => false,
            },
            _ => matches!(op, CmpOp::Ne),
        },
        (None, None) => matches!(op, CmpOp::Eq),
        _ => matches!(op, CmpOp::Ne),
    }
}

pub(crate) fn eval_filter(expr: &FilterExpr, current: &Value) -> bool {
    match expr {
        FilterExpr::Or(l, r) => eval_filter(l, current) || eval_filter(r, current),
        FilterExpr::And(l, r) => eval_filter(l, current) && eval_filter(r, current),
        FilterExpr::Not(e) => !eval_filter(e, current),
        FilterExpr::Cmp(left, None) => truthy(&resolve_operand(left, current)),
        FilterExpr::Cmp(left, Some((op, right))) => {
            let lv = resolve_operand(left, current);
            let rv = resolve_operand(right, current);
            compare(*op, &lv, &rv)
        }
    }
}
