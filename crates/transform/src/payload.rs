//! Payload transformer
//!
//! Decodes raw payload bytes into a JSON object and applies the mapping's
//! key-rename table at every nesting depth. A message is never dropped for
//! lacking a JSON envelope; anything unparseable is wrapped as
//! `{"value": <original string>}`.

use std::collections::HashMap;

use bytes::Bytes;
use serde_json::{Map, Value};

/// Decode payload bytes into a JSON object.
///
/// Invalid UTF-8 sequences are replaced, never fatal. Payloads that do not
/// parse as JSON, or parse to something other than an object, are wrapped
/// under a `"value"` key.
pub fn decode_payload(payload: &[u8]) -> Value {
    let text = String::from_utf8_lossy(payload);
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(other) => wrap_value(other),
        Err(_) => wrap_value(Value::String(text.trim().to_string())),
    }
}

/// Rename keys at every level of nested objects and arrays.
///
/// Keys absent from `key_mapping` pass through unchanged; values keep
/// their types. Scalars are returned as-is.
pub fn rename_keys(value: Value, key_mapping: &HashMap<String, String>) -> Value {
    match value {
        Value::Object(map) => {
            let mut renamed = Map::with_capacity(map.len());
            for (key, inner) in map {
                let key = key_mapping.get(&key).cloned().unwrap_or(key);
                renamed.insert(key, rename_keys(inner, key_mapping));
            }
            Value::Object(renamed)
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rename_keys(item, key_mapping))
                .collect(),
        ),
        scalar => scalar,
    }
}

/// Transform payload bytes: decode, rename, reserialize.
///
/// Returns the transformed object together with its serialized bytes for
/// republication.
pub fn transform(payload: &[u8], key_mapping: &HashMap<String, String>) -> (Value, Bytes) {
    let decoded = decode_payload(payload);
    let renamed = rename_keys(decoded, key_mapping);
    // Serializing a Value cannot fail; fall back to an empty object anyway
    // rather than panic on the hot path.
    let bytes = serde_json::to_vec(&renamed).unwrap_or_else(|_| b"{}".to_vec());
    (renamed, Bytes::from(bytes))
}

fn wrap_value(value: Value) -> Value {
    let mut map = Map::with_capacity(1);
    map.insert("value".to_string(), value);
    Value::Object(map)
}
