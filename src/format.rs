//! Canonical JSON formatter (`§4.6`): compact, no incidental whitespace,
//! lowercase `null`/`true`/`false`, integers without a decimal point, and
//! the shortest round-tripping representation for doubles. Mirrors the
//! structure of `json-joy/src/json_pretty/mod.rs` (one small pub fn, a
//! single responsibility) but delegates the actual number/string
//! formatting to `serde_json`, which already implements shortest
//! round-trip float formatting and the `"`/`\`/control-character
//! escaping this module's contract requires.

use serde_json::Value;

/// Serialize `value` as canonical compact JSON text.
pub fn to_canonical_string(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
