//! Canonical JSON serialization.
//!
//! Produces compact JSON with object keys sorted lexicographically at every
//! nesting level. This is required in two places: entry-id hashing (the same
//! logical payload must always produce the same byte sequence) and stored
//! scalar payloads (so repeated reconstructions are byte-identical).
//!
//! Rules:
//! - Compact: no whitespace between tokens.
//! - Object keys sorted lexicographically (recursive at every depth).
//! - Arrays preserve element order.
//! - Numbers, strings, booleans, and null serialized normally.

use serde_json::Value;

/// Produce a canonical JSON string from a [`serde_json::Value`].
///
/// Keys at every object level are sorted lexicographically. Output is compact
/// (no extraneous whitespace).
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use trail_core::entry::canonical::canonicalize_json;
///
/// let val = json!({"z": 1, "a": {"c": 3, "b": 2}});
/// assert_eq!(canonicalize_json(&val), r#"{"a":{"b":2,"c":3},"z":1}"#);
/// ```
#[must_use]
pub fn canonicalize_json(value: &Value) -> String {
    let mut buf = String::new();
    write_canonical(value, &mut buf);
    buf
}

fn write_canonical(value: &Value, buf: &mut String) {
    match value {
        Value::Array(items) => {
            buf.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                write_canonical(item, buf);
            }
            buf.push(']');
        }
        Value::Object(map) => {
            let mut fields: Vec<(&String, &Value)> = map.iter().collect();
            fields.sort_unstable_by_key(|(key, _)| key.as_str());

            buf.push('{');
            for (i, (key, val)) in fields.into_iter().enumerate() {
                if i > 0 {
                    buf.push(',');
                }
                buf.push_str(
                    &serde_json::to_string(key).expect("string serialization is infallible"),
                );
                buf.push(':');
                write_canonical(val, buf);
            }
            buf.push('}');
        }
        scalar => write_scalar(scalar, buf),
    }
}

// serde_json's compact form for null/bool/number/string is already canonical.
fn write_scalar(value: &Value, buf: &mut String) {
    buf.push_str(&serde_json::to_string(value).expect("scalar serialization is infallible"));
}
