//! Layer merge
//!
//! - Tables: merged by key, recursively
//! - Arrays: replaced wholesale, so an overlay's `default_actions` is the
//!   full new list rather than an extension of the base one
//! - Scalars: later layer wins
//! - `null` in an overlay deletes the key it names

use serde_json::{Map, Value};

/// Merge `overlay` on top of `base`.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                if overlay_value.is_null() {
                    base_map.remove(&key);
                    continue;
                }
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge layers in order, lowest precedence first.
///
/// Always yields a table; no layers gives an empty one.
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers
        .into_iter()
        .fold(Value::Object(Map::new()), deep_merge)
}
