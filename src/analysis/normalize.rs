//! State container normalization
//!
//! A device carries its states under `state` or `states`, either as a bare
//! sequence of entries or wrapped as `{ "values": [...] }`.

use serde_json::Value;

/// Outcome of reading a device's state container
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StateContainer<'a> {
    Entries(&'a [Value]),
    Malformed,
}

/// JSON truthiness: null, false, 0, "", [] and {} are falsy
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Resolve the state entries of a device record.
///
/// `state` is used when truthy, otherwise `states`; neither present means
/// no entries.
pub fn state_container(record: &Value) -> StateContainer<'_> {
    let raw = ["state", "states"]
        .iter()
        .filter_map(|key| record.get(*key))
        .find(|v| is_truthy(v));

    match raw {
        None => StateContainer::Entries(&[]),
        Some(Value::Array(entries)) => StateContainer::Entries(entries),
        Some(Value::Object(map)) => match map.get("values") {
            Some(Value::Array(entries)) => StateContainer::Entries(entries),
            _ => StateContainer::Malformed,
        },
        Some(_) => StateContainer::Malformed,
    }
}
