//! Function-class aggregation

use std::collections::{BTreeMap, HashSet};

use serde_json::Value;
use tracing::debug;

use crate::types::{Diagnostics, FunctionTable};

use super::normalize::{state_container, StateContainer};

/// Accumulates state entries into the function-class table
#[derive(Debug, Default)]
pub struct FunctionAggregator {
    table: FunctionTable,
    diagnostics: Diagnostics,
    /// (device class, device id, function class) already credited this run
    credited: HashSet<(String, String, String)>,
}

impl FunctionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one device's state entries into its class's buckets.
    ///
    /// `device_count` is credited once per device id and function class for
    /// the whole run, however many entries or records report it.
    pub fn observe_device(&mut self, device_id: &str, device_class: &str, record: &Value) {
        let entries = match state_container(record) {
            StateContainer::Entries(entries) => entries,
            StateContainer::Malformed => {
                debug!(device = device_id, "unreadable state container");
                self.diagnostics.record_malformed_container();
                return;
            }
        };

        for entry in entries {
            let Some(fields) = entry.as_object() else {
                debug!(device = device_id, "state entry is not an object");
                self.diagnostics.record_malformed_entry();
                continue;
            };

            let function_class = match fields.get("functionClass").and_then(Value::as_str) {
                Some(fc) if !fc.is_empty() => fc,
                _ => continue,
            };

            let bucket = self
                .table
                .entry(device_class.to_string())
                .or_default()
                .entry(function_class.to_string())
                .or_default();

            bucket.record(
                fields.get("functionInstance"),
                fields.get("value").unwrap_or(&Value::Null),
            );

            let key = (
                device_class.to_string(),
                device_id.to_string(),
                function_class.to_string(),
            );
            if self.credited.insert(key) {
                bucket.credit_device();
            }
        }
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    pub fn finish(self) -> (FunctionTable, Diagnostics) {
        (self.table, self.diagnostics)
    }
}

/// Number of device classes each function class appears in
pub fn cross_class_usage(table: &FunctionTable) -> BTreeMap<String, usize> {
    let mut usage: BTreeMap<String, usize> = BTreeMap::new();
    for functions in table.values() {
        for function_class in functions.keys() {
            *usage.entry(function_class.clone()).or_insert(0) += 1;
        }
    }
    usage
}
