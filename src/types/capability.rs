//! Function class -> Hubitat capability hints

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Suggested Hubitat capability for one function class
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityHint {
    pub capability: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub commands: Vec<String>,
}

impl CapabilityHint {
    fn new(capability: &str, attributes: &[&str], commands: &[&str]) -> Self {
        Self {
            capability: capability.to_string(),
            attributes: attributes.iter().map(|s| s.to_string()).collect(),
            commands: commands.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Lookup table keyed by function class.
///
/// The built-in table covers the common light, fan, lock and thermostat
/// function classes; a JSON file of the same shape replaces it entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityTable {
    hints: BTreeMap<String, CapabilityHint>,
}

impl CapabilityTable {
    /// Empty table, no hints rendered
    pub fn empty() -> Self {
        Self {
            hints: BTreeMap::new(),
        }
    }

    /// Load a table from a JSON object file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CapabilityTableError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| CapabilityTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| CapabilityTableError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn get(&self, function_class: &str) -> Option<&CapabilityHint> {
        self.hints.get(function_class)
    }

    pub fn insert(&mut self, function_class: impl Into<String>, hint: CapabilityHint) {
        self.hints.insert(function_class.into(), hint);
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

impl Default for CapabilityTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.insert("power", CapabilityHint::new("Switch", &["switch"], &["on", "off"]));
        table.insert(
            "brightness",
            CapabilityHint::new("SwitchLevel", &["level"], &["setLevel"]),
        );
        table.insert(
            "color-temperature",
            CapabilityHint::new(
                "ColorTemperature",
                &["colorTemperature"],
                &["setColorTemperature"],
            ),
        );
        table.insert(
            "color-rgb",
            CapabilityHint::new("ColorControl", &["color", "hue", "saturation"], &["setColor"]),
        );
        table.insert(
            "fan-speed",
            CapabilityHint::new("FanControl", &["speed"], &["setSpeed"]),
        );
        table.insert(
            "fan-direction",
            CapabilityHint::new("FanControl", &["direction"], &["setDirection"]),
        );
        table.insert("lock", CapabilityHint::new("Lock", &["lock"], &["lock", "unlock"]));
        table.insert(
            "mode",
            CapabilityHint::new("Thermostat", &["thermostatMode"], &["setThermostatMode"]),
        );
        table.insert(
            "fan-mode",
            CapabilityHint::new(
                "ThermostatFanMode",
                &["thermostatFanMode"],
                &["setThermostatFanMode"],
            ),
        );
        table
    }
}

/// Failure to load a capability table file
#[derive(Debug, thiserror::Error)]
pub enum CapabilityTableError {
    #[error("failed to read capability table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid capability table {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
