//! A unified JSON node: a path-query engine, a uniform node handle, and a
//! lazy/copy-on-write document lifecycle, all built on `serde_json::Value`
//! as the value model.
//!
//! The three entry points are [`parse`], [`parse_bytes`], and
//! [`from_native`]; everything downstream is reached by chaining methods
//! on the returned [`Node`].

pub mod breadcrumb;
pub mod document;
pub mod error;
pub mod format;
mod native;
pub mod node;
pub mod path;
pub mod registry;

pub use document::Document;
pub use error::{Error, ErrorKind, Result};
pub use node::{Kind, Node};

use serde_json::Value;

/// Parse `text` as JSON and return the root node. Parse failures surface
/// directly as a `Result::Err` rather than an invalid node, since there
/// is no document to attach an error slot to (`§6`).
pub fn parse(text: &str) -> Result<Node> {
    Ok(Node::root(Document::parse(text)?))
}

/// Byte-slice counterpart of [`parse`].
pub fn parse_bytes(bytes: &[u8]) -> Result<Node> {
    Ok(Node::root(Document::parse_bytes(bytes)?))
}

/// Build a detached node from an already-decoded native value. Infallible:
/// see `native::from_value` for why this crate's native-value mapping
/// admits no conversion failures.
pub fn from_native(value: impl Into<Value>) -> Node {
    native::from_value(Document::parse("null").unwrap(), value.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_then_navigate() {
        let root = parse(r#"{"a":{"b":[1,2,3]}}"#).unwrap();
        assert_eq!(root.get("a").get("b").index(1).as_int(), 2);
    }

    #[test]
    fn parse_surfaces_malformed_json_directly() {
        assert!(parse("{oops}").is_err());
    }

    #[test]
    fn from_native_round_trips() {
        let n = from_native(json!({"x": 1}));
        assert_eq!(n.as_interface(), json!({"x": 1}));
    }

    // Scenario S1 (spec.md §8): path function filter.
    #[test]
    fn scenario_path_function_filter() {
        let root = parse(
            r#"{"store":{"books":[
                {"title":"Moby Dick","price":8.99},
                {"title":"Clean Code","price":29.99}
            ]}}"#,
        )
        .unwrap();
        let root = root.register_func("cheap", |node| {
            node.filter(|e| e.get("price").as_float() < 20.0)
        });
        let titles = root.query("/store/books[@cheap]/title");
        let values: Vec<String> = titles.as_array().iter().map(|n| n.as_string()).collect();
        assert_eq!(values, vec!["Moby Dick".to_string()]);
    }

    // Scenario S5 (spec.md §8): lazy read, then copy-on-write materialization.
    #[test]
    fn scenario_copy_on_write_materialization() {
        let doc = Document::parse(r#"{"a":1}"#).unwrap();
        let root = Node::root(doc.clone());
        assert_eq!(root.get("a").as_int(), 1);
        assert_eq!(root.get("a").as_int(), 1);
        assert!(!doc.is_materialized());

        root.set("a", 5);
        assert!(doc.is_materialized());
        assert_eq!(root.get("a").as_int(), 5);
    }

    // Scenario S6 (spec.md §8): error stickiness with lenient fallback.
    #[test]
    fn scenario_error_stickiness() {
        let root = parse("{}").unwrap();
        let dangling = root.query("/missing").get("x");
        assert_eq!(dangling.as_int(), 0);
        let err = dangling.error().unwrap();
        assert!(matches!(err.kind, ErrorKind::PathNotFound(_)));
    }
}
