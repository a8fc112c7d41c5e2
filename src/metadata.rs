//! Dot-path patch operations over task metadata.
//!
//! Metadata is an arbitrary-depth JSON object. Every operation here is a pure
//! transform: it takes the current value and returns a new one, so the store
//! can validate and persist the result as a single step. Paths use dot
//! notation for nested traversal, e.g. "details.complexity".

use serde_json::{Map, Value};

/// Read the value at a dot path, if present.
pub fn get_path<'a>(metadata: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = metadata;
    for key in path.split('.') {
        current = current.as_object()?.get(key)?;
    }
    Some(current)
}

/// Set the value at a dot path, creating intermediate objects as needed.
///
/// Any non-object intermediate value along the path is replaced by an object.
pub fn set_path(metadata: &Value, path: &str, value: Value) -> Value {
    let keys: Vec<&str> = path.split('.').collect();
    set_inner(metadata, &keys, value)
}

fn set_inner(current: &Value, keys: &[&str], value: Value) -> Value {
    let mut map = match current.as_object() {
        Some(m) => m.clone(),
        None => Map::new(),
    };
    match keys {
        [] => value,
        [key] => {
            map.insert((*key).to_string(), value);
            Value::Object(map)
        }
        [key, rest @ ..] => {
            let child = map.get(*key).cloned().unwrap_or(Value::Null);
            map.insert((*key).to_string(), set_inner(&child, rest, value));
            Value::Object(map)
        }
    }
}

/// Remove the value at a dot path. Missing paths are a no-op, not an error.
pub fn remove_path(metadata: &Value, path: &str) -> Value {
    let keys: Vec<&str> = path.split('.').collect();
    remove_inner(metadata, &keys)
}

fn remove_inner(current: &Value, keys: &[&str]) -> Value {
    let Some(obj) = current.as_object() else {
        return current.clone();
    };
    let mut map = obj.clone();
    match keys {
        [] => current.clone(),
        [key] => {
            map.remove(*key);
            Value::Object(map)
        }
        [key, rest @ ..] => {
            if let Some(child) = obj.get(*key) {
                map.insert((*key).to_string(), remove_inner(child, rest));
            }
            Value::Object(map)
        }
    }
}

/// Append a value at a dot path.
///
/// An existing array is pushed to; an absent target becomes a one-element
/// array; an existing non-array value is promoted to `[old, new]`.
pub fn append_path(metadata: &Value, path: &str, value: Value) -> Value {
    let appended = match get_path(metadata, path) {
        Some(Value::Array(items)) => {
            let mut items = items.clone();
            items.push(value);
            Value::Array(items)
        }
        Some(existing) => Value::Array(vec![existing.clone(), value]),
        None => Value::Array(vec![value]),
    };
    set_path(metadata, path, appended)
}
