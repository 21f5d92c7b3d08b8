//! Quantified invariants and boundary behaviors (spec.md §8), exercised
//! through the public `jnode` API.

use jnode::{parse, Document};
use serde_json::json;

#[test]
fn round_trip_raw_matches_canonical_formatting() {
    let root = parse(r#"{"b":2,"a":1,"xs":[1,2,3]}"#).unwrap();
    assert_eq!(root.raw(), r#"{"b":2,"a":1,"xs":[1,2,3]}"#);
}

#[test]
fn materialize_is_idempotent_for_raw() {
    let text = r#"{"a":[1,2,{"b":true}]}"#;
    let lazy_raw = jnode::Node::root(Document::parse(text).unwrap()).raw();

    let doc = Document::parse(text).unwrap();
    doc.materialize();
    let materialized_raw = jnode::Node::root(doc).raw();

    assert_eq!(lazy_raw, materialized_raw);
}

#[test]
fn mutation_visibility_after_set() {
    let root = parse(r#"{"a":1}"#).unwrap();
    root.set("a", json!({"nested": [1, 2]}));
    assert_eq!(root.get("a").as_interface(), json!({"nested": [1, 2]}));
}

#[test]
fn error_is_sticky_across_arbitrary_chain_ops() {
    let root = parse(r#"{"a":1}"#).unwrap();
    let broken = root.get("missing");
    let original_error = broken.error().unwrap();

    assert_eq!(broken.get("x").error().unwrap(), original_error);
    assert_eq!(broken.index(0).error().unwrap(), original_error);
    assert_eq!(broken.call_func("whatever").error().unwrap(), original_error);
    assert_eq!(broken.set("k", 1).error().unwrap(), original_error);
}

#[test]
fn insertion_order_preserved_across_parse_and_set() {
    let root = parse(r#"{"z":1,"a":2}"#).unwrap();
    let mut keys: Vec<String> = Vec::new();
    root.for_each(|k, _| keys.push(k.unwrap().to_string()));
    assert_eq!(keys, vec!["z".to_string(), "a".to_string()]);

    // Updating an existing key preserves its position; a new key is appended.
    root.set("z", 9);
    root.set("m", 3);
    let mut keys2: Vec<String> = Vec::new();
    root.for_each(|k, _| keys2.push(k.unwrap().to_string()));
    assert_eq!(keys2, vec!["z".to_string(), "a".to_string(), "m".to_string()]);
}

#[test]
fn empty_object_and_array_boundaries() {
    let root = parse(r#"{"o":{},"xs":[]}"#).unwrap();
    assert_eq!(root.get("o").len(), 0);
    assert_eq!(root.get("xs").len(), 0);
    assert!(root.get("o").as_map().is_empty());
    assert_eq!(root.get("xs").as_array().len(), 0);
}

#[test]
fn deeply_nested_query_ten_levels() {
    let mut text = String::from("1");
    for _ in 0..10 {
        text = format!(r#"{{"n":{text}}}"#);
    }
    let root = parse(&text).unwrap();
    let path = (0..10).map(|_| "n").collect::<Vec<_>>().join("/");
    assert_eq!(root.query(&path).as_int(), 1);
}

#[test]
fn unicode_keys_and_values_round_trip() {
    let root = parse(r#"{"café":"日本語"}"#).unwrap();
    assert_eq!(root.get("café").as_string(), "日本語");
    assert_eq!(root.raw(), r#"{"café":"日本語"}"#);
}

#[test]
fn recursive_descent_with_no_matches_is_empty_not_error() {
    let root = parse(r#"{"a":1,"b":{"c":2}}"#).unwrap();
    let result = root.query("//nonexistent");
    assert!(result.is_valid());
    assert_eq!(result.len(), 0);
}

#[test]
fn parse_is_total_over_arbitrary_path_strings() {
    let root = parse(r#"{"a":1}"#).unwrap();
    for bad in ["", "/", "//", "[", "[?(", "/a/", "/['unterminated", "/a[1:2:3]"] {
        // Must not panic; an invalid path yields an invalid node.
        let result = root.query(bad);
        let _ = result.is_valid();
    }
}

#[test]
fn document_from_bytes() {
    let doc = Document::parse_bytes(br#"{"a":1}"#).unwrap();
    assert_eq!(jnode::Node::root(doc).get("a").as_int(), 1);
}
