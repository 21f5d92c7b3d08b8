//! Native value mapping at the boundary (`§6`): `from_native`/`as_interface`.
//!
//! This crate uses `serde_json::Value` itself as the "native domain value"
//! rather than introducing a second parallel value type: it already has
//! exactly the shape the `§6` mapping table calls for (insertion-ordered
//! object, ordered array, UTF-8 string, a `Number` distinguishing integer-
//! from fractional-valued doubles via `as_i64`/`as_f64`, bool, and an
//! explicit `Null` sentinel). [`crate::node::Node::as_interface`] and
//! [`crate::from_native`] are thin wrappers around this identity, so the
//! round-trip law in `§8` (`from_native(x).as_interface() == x`) holds by
//! construction for every `serde_json::Value`.

use serde_json::Value;

/// Build a detached node from a native value, per the `§6` entry point.
/// Infallible: every `serde_json::Value` is already a valid native value
/// under this crate's boundary mapping, so there is no error to surface.
pub fn from_value(doc: std::rc::Rc<crate::document::Document>, value: Value) -> crate::node::Node {
    crate::node::Node::single(doc, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use serde_json::json;

    #[test]
    fn round_trips_through_as_interface() {
        let doc = Document::parse("null").unwrap();
        for value in [
            json!({"a": 1, "b": [1, 2, 3]}),
            json!([1, 2.5, "x", true, null]),
            json!("plain string"),
            json!(42),
            json!(2.5),
            json!(true),
            json!(null),
        ] {
            let node = from_value(doc.clone(), value.clone());
            assert_eq!(node.as_interface(), value);
        }
    }

    #[test]
    fn integer_valued_numbers_stay_integers() {
        let doc = Document::parse("null").unwrap();
        let node = from_value(doc, json!(7));
        assert_eq!(node.as_interface(), json!(7));
        assert!(node.as_interface().as_i64().is_some());
    }
}
