//! Breadcrumb: the sequence of object keys and array indices recording a
//! node's position from the document root. Grounded on
//! `json-joy-json-path/src/types.rs`'s `PathComponent` /
//! `NormalizedPathSegment` and the rendering helpers in
//! `json-joy-json-path/src/Value.rs` and `value.rs`.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Key(String),
    Index(usize),
}

pub type Breadcrumb = Vec<Segment>;

/// Walk `root` along `crumb`, returning the referenced value or `None` if
/// any step fails to resolve (the position has been removed or was never
/// present).
pub fn resolve<'a>(root: &'a Value, crumb: &[Segment]) -> Option<&'a Value> {
    let mut cur = root;
    for seg in crumb {
        cur = match (cur, seg) {
            (Value::Object(map), Segment::Key(k)) => map.get(k)?,
            (Value::Array(arr), Segment::Index(i)) => arr.get(*i)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Mutable counterpart of [`resolve`].
pub fn resolve_mut<'a>(root: &'a mut Value, crumb: &[Segment]) -> Option<&'a mut Value> {
    let mut cur = root;
    for seg in crumb {
        cur = match (cur, seg) {
            (Value::Object(map), Segment::Key(k)) => map.get_mut(k)?,
            (Value::Array(arr), Segment::Index(i)) => arr.get_mut(*i)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Render a breadcrumb as a bracketed path string, e.g. `$['a'][0]['b c']`.
pub fn render(crumb: &[Segment]) -> String {
    let mut out = String::from("$");
    for seg in crumb {
        match seg {
            Segment::Key(k) => {
                out.push_str("['");
                out.push_str(&k.replace('\\', "\\\\").replace('\'', "\\'"));
                out.push_str("']");
            }
            Segment::Index(i) => {
                out.push('[');
                out.push_str(&i.to_string());
                out.push(']');
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resolves_nested_path() {
        let doc = json!({"a": [1, {"b": 2}]});
        let crumb = vec![Segment::Key("a".into()), Segment::Index(1), Segment::Key("b".into())];
        assert_eq!(resolve(&doc, &crumb), Some(&json!(2)));
    }

    #[test]
    fn resolve_fails_on_missing_key() {
        let doc = json!({"a": 1});
        let crumb = vec![Segment::Key("missing".into())];
        assert_eq!(resolve(&doc, &crumb), None);
    }

    #[test]
    fn renders_mixed_breadcrumb() {
        let crumb = vec![Segment::Key("a".into()), Segment::Index(0)];
        assert_eq!(render(&crumb), "$['a'][0]");
    }
}
