//! Summary of an analyzed metadevice corpus

use std::collections::BTreeMap;

use serde::Serialize;

use super::{DeviceBrief, Diagnostics, FunctionStat};

/// Function-class table: device class -> function class -> stats
pub type FunctionTable = BTreeMap<String, BTreeMap<String, FunctionStat>>;

/// Everything the report is rendered from. Built once per run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub device_count: usize,
    pub class_counts: BTreeMap<String, usize>,
    pub devices_index: Vec<DeviceBrief>,
    pub function_stats: FunctionTable,
    /// Number of device classes each function class appears in
    pub function_usage_across_classes: BTreeMap<String, usize>,
    pub diagnostics: Diagnostics,
}

impl Summary {
    /// Device classes by descending device count, ties by class name
    pub fn classes_by_count(&self) -> Vec<(&str, usize)> {
        let mut classes: Vec<(&str, usize)> = self
            .class_counts
            .iter()
            .map(|(class, count)| (class.as_str(), *count))
            .collect();
        classes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        classes
    }

    /// Function classes by descending cross-class occurrence, ties by name
    pub fn common_function_classes(&self, limit: usize) -> Vec<(&str, usize)> {
        let mut usage: Vec<(&str, usize)> = self
            .function_usage_across_classes
            .iter()
            .map(|(fc, occ)| (fc.as_str(), *occ))
            .collect();
        usage.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        usage.truncate(limit);
        usage
    }

    /// Every device class seen, in lexicographic order
    pub fn device_classes(&self) -> Vec<&str> {
        let mut classes: Vec<&str> = self
            .class_counts
            .keys()
            .chain(self.function_stats.keys())
            .map(String::as_str)
            .collect();
        classes.sort_unstable();
        classes.dedup();
        classes
    }

    /// Function classes of one device class by descending device count,
    /// ties by function class name
    pub fn function_classes_of(&self, device_class: &str) -> Vec<(&str, &FunctionStat)> {
        let mut stats: Vec<(&str, &FunctionStat)> = self
            .function_stats
            .get(device_class)
            .map(|table| table.iter().map(|(fc, s)| (fc.as_str(), s)).collect())
            .unwrap_or_default();
        stats.sort_by(|a, b| {
            b.1.device_count
                .cmp(&a.1.device_count)
                .then_with(|| a.0.cmp(b.0))
        });
        stats
    }

    /// Stats for one (device class, function class) pair
    pub fn stat(&self, device_class: &str, function_class: &str) -> Option<&FunctionStat> {
        self.function_stats
            .get(device_class)
            .and_then(|table| table.get(function_class))
    }
}
