//! Canonical text rendering
//!
//! Flattens a decoded payload into a deterministic one-line text form used
//! as the display/embedding representation of a message record.

use contracts::TopicPath;
use serde_json::Value;

/// Render the canonical text of a message: topic followed by the flattened
/// `key=value` pairs in sorted order.
pub fn canonical_text(topic: &TopicPath, payload: &Value) -> String {
    let mut pairs = Vec::new();
    flatten("", payload, &mut pairs);
    pairs.sort();

    let mut out = topic.as_str().to_string();
    for pair in pairs {
        out.push(' ');
        out.push_str(&pair);
    }
    out
}

fn flatten(prefix: &str, value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, inner, out);
            }
        }
        Value::Array(items) => {
            for (idx, inner) in items.iter().enumerate() {
                flatten(&format!("{prefix}[{idx}]"), inner, out);
            }
        }
        scalar => out.push(format!("{prefix}={scalar}")),
    }
}
