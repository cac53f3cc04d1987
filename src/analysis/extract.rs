//! Device filtering and field extraction
//!
//! Each extracted field is read from an ordered list of [`FieldSource`]s;
//! the first source holding a usable value wins.

use serde_json::Value;

use crate::types::{DeviceBrief, DEVICE_TYPE_ID};

/// A place a device field may be read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// `description.device.<key>`
    Description(&'static str),
    /// Top-level `<key>`
    Flat(&'static str),
}

use FieldSource::{Description, Flat};

/// Device identifier: `deviceId`, then `id`, then `metadeviceId`
pub const ID_SOURCES: &[FieldSource] = &[Flat("deviceId"), Flat("id"), Flat("metadeviceId")];

/// Device class: nested description, flat `device_class`, then the type id
pub const CLASS_SOURCES: &[FieldSource] = &[
    Description("deviceClass"),
    Flat("device_class"),
    Flat("typeId"),
];

/// Display name: nested description, then flat `friendlyName` and `name`
pub const NAME_SOURCES: &[FieldSource] = &[
    Description("friendlyName"),
    Flat("friendlyName"),
    Flat("name"),
];

/// Class used when no source yields one
pub const UNKNOWN_CLASS: &str = "unknown";

impl FieldSource {
    /// Read this source from a record. Absent or non-object blocks behave
    /// like empty mappings.
    pub fn read(&self, record: &Value) -> Option<String> {
        let raw = match self {
            Description(key) => record
                .get("description")
                .and_then(|d| d.get("device"))
                .and_then(|d| d.get(*key)),
            Flat(key) => record.get(*key),
        };
        raw.and_then(field_text)
    }
}

/// Non-empty strings and numbers count as present
fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// First usable value among `sources`
pub fn first_present(record: &Value, sources: &[FieldSource]) -> Option<String> {
    sources.iter().find_map(|source| source.read(record))
}

/// Whether a record describes an individual device
pub fn is_device(record: &Value) -> bool {
    record.get("typeId").and_then(Value::as_str) == Some(DEVICE_TYPE_ID)
}

/// Identifier for the device at `position` among matched devices
pub fn device_id(record: &Value, position: usize) -> String {
    first_present(record, ID_SOURCES).unwrap_or_else(|| format!("unknown-{}", position))
}

pub fn device_class(record: &Value) -> String {
    first_present(record, CLASS_SOURCES).unwrap_or_else(|| UNKNOWN_CLASS.to_string())
}

pub fn device_name(record: &Value, id: &str) -> String {
    first_present(record, NAME_SOURCES).unwrap_or_else(|| format!("Device {}", id))
}

/// Normalized (id, class, name) triple for one device record
pub fn extract_device(record: &Value, position: usize) -> DeviceBrief {
    let id = device_id(record, position);
    let class = device_class(record);
    let name = device_name(record, &id);
    DeviceBrief { id, class, name }
}

/// All device records of a collection, in input order
pub fn extract_devices(records: &[Value]) -> Vec<DeviceBrief> {
    records
        .iter()
        .filter(|r| is_device(r))
        .enumerate()
        .map(|(position, record)| extract_device(record, position))
        .collect()
}
