//! Metadevice corpus analysis
//!
//! Reads a captured list of metadevice records and folds it into a
//! [`Summary`]: device inventory, per-class function statistics, cross-class
//! usage and diagnostics for data that could not be interpreted.

mod aggregate;
mod compact;
mod extract;
mod normalize;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::report::{self, ReportWriteError};
use crate::types::{CapabilityTable, CapabilityTableError, Summary};

pub use aggregate::{cross_class_usage, FunctionAggregator};
pub use compact::{load_compact, parse_compact, CompactRow};
pub use extract::{
    device_class, device_id, device_name, extract_device, extract_devices, first_present,
    is_device, FieldSource, CLASS_SOURCES, ID_SOURCES, NAME_SOURCES, UNKNOWN_CLASS,
};
pub use normalize::{is_truthy, state_container, StateContainer};

/// Result type for analysis runs
pub type AnalysisResult<T> = Result<T, AnalysisError>;

/// Errors that abort an analysis run
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Input file not found: {0}")]
    InputNotFound(String),

    #[error("Expected input JSON array of metadevices")]
    NotAnArray,

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Capabilities(#[from] CapabilityTableError),

    #[error(transparent)]
    Write(#[from] ReportWriteError),
}

/// A captured collection of metadevice records
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    records: Vec<Value>,
}

impl Corpus {
    pub fn from_records(records: Vec<Value>) -> Self {
        Self { records }
    }

    /// Parse a corpus from JSON text; the root must be an array
    pub fn from_json_str(content: &str, origin: &str) -> AnalysisResult<Self> {
        let root: Value = serde_json::from_str(content).map_err(|source| AnalysisError::Json {
            path: origin.to_string(),
            source,
        })?;
        match root {
            Value::Array(records) => Ok(Self { records }),
            _ => Err(AnalysisError::NotAnArray),
        }
    }

    /// Load a corpus file
    pub fn load(path: impl AsRef<Path>) -> AnalysisResult<Self> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        if !path.exists() {
            return Err(AnalysisError::InputNotFound(origin));
        }
        let content = fs::read_to_string(path).map_err(|source| AnalysisError::Io {
            path: origin.clone(),
            source,
        })?;
        Self::from_json_str(&content, &origin)
    }

    pub fn records(&self) -> &[Value] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summarize(&self) -> Summary {
        analyze(&self.records)
    }
}

/// Build a fresh summary from a list of records
pub fn analyze(records: &[Value]) -> Summary {
    let mut aggregator = FunctionAggregator::new();
    let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut devices_index = Vec::new();

    for (position, record) in records.iter().filter(|r| is_device(r)).enumerate() {
        let brief = extract_device(record, position);
        *class_counts.entry(brief.class.clone()).or_insert(0) += 1;
        aggregator.observe_device(&brief.id, &brief.class, record);
        devices_index.push(brief);
    }

    let (function_stats, diagnostics) = aggregator.finish();
    let function_usage_across_classes = cross_class_usage(&function_stats);

    Summary {
        device_count: devices_index.len(),
        class_counts,
        devices_index,
        function_stats,
        function_usage_across_classes,
        diagnostics,
    }
}

/// Paths for one analyzer run
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub input: PathBuf,
    /// Optional compact listing, loaded for validation only
    pub compact: Option<PathBuf>,
    pub out: PathBuf,
    /// Replaces the built-in capability table when set
    pub capabilities: Option<PathBuf>,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::from("research/05_metadevices_with_state.json"),
            compact: Some(PathBuf::from("research/05b_metadevices_compact.txt")),
            out: PathBuf::from("docs/hubspace_data_reference.md"),
            capabilities: None,
        }
    }
}

/// Load, summarize, render and write. Nothing is written unless the input
/// was read and parsed successfully.
pub fn run(options: &AnalyzeOptions) -> AnalysisResult<Summary> {
    let corpus = Corpus::load(&options.input)?;
    info!(
        input = %options.input.display(),
        records = corpus.len(),
        "loaded metadevice corpus"
    );

    if let Some(compact) = &options.compact {
        match load_compact(compact) {
            Ok(rows) => info!(path = %compact.display(), rows = rows.len(), "loaded compact listing"),
            Err(e) => warn!(path = %compact.display(), error = %e, "could not read compact listing"),
        }
    }

    let capabilities = match &options.capabilities {
        Some(path) => CapabilityTable::from_file(path)?,
        None => CapabilityTable::default(),
    };

    let summary = corpus.summarize();
    let diagnostics = summary.diagnostics;
    if diagnostics.malformed_state_containers > 0 || diagnostics.malformed_state_entries > 0 {
        warn!(
            containers = diagnostics.malformed_state_containers,
            entries = diagnostics.malformed_state_entries,
            "skipped malformed state data"
        );
    }

    let markdown = report::render_markdown(&summary, &capabilities);
    report::write_report(&options.out, &markdown)?;
    info!(
        out = %options.out.display(),
        devices = summary.device_count,
        classes = summary.class_counts.len(),
        "wrote data reference"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::JsonType;
    use serde_json::json;

    fn light(id: &str, states: Value) -> Value {
        json!({
            "typeId": "metadevice.device",
            "deviceId": id,
            "description": {"device": {"deviceClass": "light", "friendlyName": id}},
            "state": states
        })
    }

    #[test]
    fn test_power_bucket_across_two_lights() {
        let records = vec![
            light("a", json!([{"functionClass": "power", "value": true}])),
            light(
                "b",
                json!([
                    {"functionClass": "power", "value": "on"},
                    {"functionClass": "power", "value": "off"}
                ]),
            ),
        ];

        let summary = analyze(&records);
        let power = summary.stat("light", "power").unwrap();
        assert_eq!(power.device_count, 2);
        assert_eq!(power.state_count, 3);
        assert_eq!(power.value_types.len(), 2);
        assert_eq!(power.value_types[&JsonType::Boolean], 1);
        assert_eq!(power.value_types[&JsonType::String], 2);
    }

    #[test]
    fn test_malformed_container_keeps_device_in_index() {
        let records = vec![light("a", json!({"foo": 1}))];
        let summary = analyze(&records);

        assert_eq!(summary.device_count, 1);
        assert_eq!(summary.devices_index.len(), 1);
        assert_eq!(summary.class_counts["light"], 1);
        assert_eq!(summary.diagnostics.malformed_state_containers, 1);
        assert!(summary.function_stats.is_empty());
    }

    #[test]
    fn test_non_device_records_are_ignored() {
        let records = vec![
            json!({"typeId": "metadevice.room", "state": [{"functionClass": "power"}]}),
            json!("not even an object"),
            light("a", json!([])),
        ];
        let summary = analyze(&records);
        assert_eq!(summary.device_count, 1);
        assert!(summary.function_usage_across_classes.is_empty());
    }

    #[test]
    fn test_from_json_str_requires_array() {
        assert!(matches!(
            Corpus::from_json_str(r#"{"devices": []}"#, "inline"),
            Err(AnalysisError::NotAnArray)
        ));
        assert!(matches!(
            Corpus::from_json_str("[1,", "inline"),
            Err(AnalysisError::Json { .. })
        ));
        assert_eq!(Corpus::from_json_str("[]", "inline").unwrap().len(), 0);
    }

    #[test]
    fn test_missing_input_reports_path() {
        let err = Corpus::load("/nonexistent/metadevices.json").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Input file not found: /nonexistent/metadevices.json"
        );
    }
}
