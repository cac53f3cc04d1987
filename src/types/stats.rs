//! Per-function statistics and diagnostics counters

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;

use super::JsonType;

/// Maximum number of distinct sample values kept per function class
pub const MAX_SAMPLES: usize = 5;

/// Statistics for one function class within one device class
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FunctionStat {
    /// Distinct devices that reported this function class at least once
    pub device_count: usize,
    /// Every state entry, repeats included
    pub state_count: usize,
    /// Distinct non-null `functionInstance` values, sorted
    pub instances: BTreeSet<String>,
    pub value_types: BTreeMap<JsonType, usize>,
    /// Canonical JSON serializations, first-seen order
    pub samples: Vec<String>,
}

impl FunctionStat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one state entry observation
    pub fn record(&mut self, instance: Option<&Value>, value: &Value) {
        self.state_count += 1;

        match instance {
            None | Some(Value::Null) => {}
            Some(Value::String(s)) => {
                self.instances.insert(s.clone());
            }
            Some(other) => {
                self.instances.insert(other.to_string());
            }
        }

        *self.value_types.entry(JsonType::of(value)).or_insert(0) += 1;

        if self.samples.len() < MAX_SAMPLES {
            // sorted-key compact form; equal values dedupe across key orders
            let canonical = canonical_sample(value);
            if !self.samples.contains(&canonical) {
                self.samples.push(canonical);
            }
        }
    }

    /// Credit one more device with this function class
    pub fn credit_device(&mut self) {
        self.device_count += 1;
    }

    /// Value types ordered by descending frequency, ties by type name
    pub fn value_types_by_frequency(&self) -> Vec<(JsonType, usize)> {
        let mut types: Vec<(JsonType, usize)> =
            self.value_types.iter().map(|(t, c)| (*t, *c)).collect();
        types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));
        types
    }

    /// First sample, decoded back to JSON
    pub fn first_sample(&self) -> Option<Value> {
        self.samples
            .first()
            .map(|s| serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone())))
    }
}

/// Shrink a value for sampling: objects keep their five lexicographically
/// smallest keys (not the first five in input order), arrays their first
/// five elements. The result is compact JSON with sorted keys, so the same
/// value always yields the same sample whatever its input key order.
pub fn canonical_sample(value: &Value) -> String {
    let reduced = match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .take(MAX_SAMPLES)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().take(MAX_SAMPLES).cloned().collect()),
        other => other.clone(),
    };
    // serde_json maps are ordered by key, so this output is canonical
    reduced.to_string()
}

/// Counters for input that could not be interpreted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub malformed_state_containers: u64,
    pub malformed_state_entries: u64,
}

impl Diagnostics {
    pub fn record_malformed_container(&mut self) {
        self.malformed_state_containers += 1;
    }

    pub fn record_malformed_entry(&mut self) {
        self.malformed_state_entries += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_counts_and_types() {
        let mut stat = FunctionStat::new();
        stat.record(None, &json!(true));
        stat.record(Some(&json!("heating-target")), &json!(21.5));
        stat.record(Some(&Value::Null), &json!("on"));

        assert_eq!(stat.state_count, 3);
        assert_eq!(stat.device_count, 0);
        assert_eq!(stat.instances.len(), 1);
        assert!(stat.instances.contains("heating-target"));
        assert_eq!(stat.value_types[&JsonType::Boolean], 1);
        assert_eq!(stat.value_types[&JsonType::Number], 1);
        assert_eq!(stat.value_types[&JsonType::String], 1);
    }

    #[test]
    fn test_samples_capped_and_deduplicated() {
        let mut stat = FunctionStat::new();
        for v in ["a", "b", "a", "c", "d", "b", "e", "f", "g"] {
            stat.record(None, &json!(v));
        }
        assert_eq!(stat.samples.len(), MAX_SAMPLES);
        assert_eq!(stat.samples[0], "\"a\"");
        let unique: BTreeSet<&String> = stat.samples.iter().collect();
        assert_eq!(unique.len(), stat.samples.len());
    }

    #[test]
    fn test_canonical_sample_truncates() {
        let obj = json!({"g": 7, "f": 6, "e": 5, "d": 4, "c": 3, "b": 2, "a": 1});
        assert_eq!(
            canonical_sample(&obj),
            r#"{"a":1,"b":2,"c":3,"d":4,"e":5}"#
        );
        assert_eq!(canonical_sample(&json!([1, 2, 3, 4, 5, 6])), "[1,2,3,4,5]");
        assert_eq!(canonical_sample(&json!({"b": 1, "a": 2})), r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn test_samples_ignore_input_key_order() {
        let first: Value = serde_json::from_str(r#"{"r": 1, "g": 2, "b": 3}"#).unwrap();
        let second: Value = serde_json::from_str(r#"{"b": 3, "g": 2, "r": 1}"#).unwrap();
        let mut stat = FunctionStat::new();
        stat.record(None, &first);
        stat.record(None, &second);
        assert_eq!(stat.samples, vec![r#"{"b":3,"g":2,"r":1}"#.to_string()]);
    }

    #[test]
    fn test_value_types_by_frequency_breaks_ties_by_name() {
        let mut stat = FunctionStat::new();
        stat.record(None, &json!("x"));
        stat.record(None, &json!(1));
        stat.record(None, &json!("y"));
        stat.record(None, &json!(false));

        let ordered = stat.value_types_by_frequency();
        assert_eq!(
            ordered,
            vec![
                (JsonType::String, 2),
                (JsonType::Boolean, 1),
                (JsonType::Number, 1)
            ]
        );
    }
}
