//! End-to-end scenarios (spec.md §8, S1-S6), driven entirely through the
//! public `jnode` API.

use jnode::{parse, Document, ErrorKind, Node};
use serde_json::json;

#[test]
fn s1_path_function_filter() {
    let root = parse(
        r#"{"store":{"books":[
            {"title":"Moby Dick","price":8.99},
            {"title":"Clean Code","price":29.99}
        ]}}"#,
    )
    .unwrap();
    let root = root.register_func("cheap", |node| node.filter(|e| e.get("price").as_float() < 20.0));
    let titles = root.query("/store/books[@cheap]/title");
    let values: Vec<String> = titles.as_array().iter().map(Node::as_string).collect();
    assert_eq!(values, vec!["Moby Dick".to_string()]);
}

#[test]
fn s2_recursive_descent() {
    let root = parse(r#"{"a":{"price":1},"b":[{"price":2},{"price":3}]}"#).unwrap();
    let prices = root.query("//price");
    assert_eq!(prices.len(), 3);
    let values: Vec<i64> = prices.as_array().iter().map(Node::as_int).collect();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn s3_slice_with_negatives() {
    let root = parse(r#"{"xs":[10,20,30,40,50]}"#).unwrap();

    let tail = root.query("/xs[-2:]");
    assert_eq!(tail.as_array().iter().map(Node::as_int).collect::<Vec<_>>(), vec![40, 50]);

    let head = root.query("/xs[:-2]");
    assert_eq!(
        head.as_array().iter().map(Node::as_int).collect::<Vec<_>>(),
        vec![10, 20, 30]
    );

    let empty = root.query("/xs[3:3]");
    assert!(empty.is_valid());
    assert_eq!(empty.len(), 0);

    let oob = root.query("/xs[5:6]");
    assert!(!oob.is_valid());
    assert!(matches!(oob.error().unwrap().kind, ErrorKind::IndexOutOfRange(_)));
}

#[test]
fn s4_filter_predicate() {
    let root = parse(
        r#"{"p":[
            {"price":10,"inStock":true},
            {"price":50,"inStock":false},
            {"price":5,"inStock":true}
        ]}"#,
    )
    .unwrap();
    let matched = root.query("/p[?(@.price < 20 && @.inStock == true)]");
    assert_eq!(matched.len(), 2);
    let prices: Vec<i64> = matched.as_array().iter().map(|n| n.get("price").as_int()).collect();
    assert_eq!(prices, vec![10, 5]);
}

#[test]
fn s5_copy_on_write_materialization() {
    let doc = Document::parse(r#"{"a":1}"#).unwrap();
    let root = Node::root(doc.clone());

    assert_eq!(root.get("a").as_int(), 1);
    assert_eq!(root.get("a").as_int(), 1);
    assert!(!doc.is_materialized());

    let updated = root.set("a", 5);
    assert!(doc.is_materialized());
    assert_eq!(updated.as_int(), 5);
    assert_eq!(root.get("a").as_int(), 5);
}

#[test]
fn s6_error_stickiness() {
    let root = parse("{}").unwrap();
    let chained = root.query("/missing").get("x");
    assert_eq!(chained.as_int(), 0);
    assert!(matches!(chained.error().unwrap().kind, ErrorKind::PathNotFound(_)));
}

#[test]
fn from_native_round_trip_law() {
    for value in [
        json!({"a": 1, "b": [1, 2.5, "x"]}),
        json!([]),
        json!({}),
        json!("plain"),
        json!(null),
    ] {
        let node = jnode::from_native(value.clone());
        assert_eq!(node.as_interface(), value);
    }
}
