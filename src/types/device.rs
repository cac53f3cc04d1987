//! Device and state types shared by the analyzer and the bridge

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `typeId` carried by records that describe an individual device
pub const DEVICE_TYPE_ID: &str = "metadevice.device";

/// Flat index entry for one device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceBrief {
    pub id: String,
    #[serde(rename = "type")]
    pub class: String,
    pub name: String,
}

impl DeviceBrief {
    pub fn new(id: impl Into<String>, class: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            class: class.into(),
            name: name.into(),
        }
    }
}

/// One `{functionClass, functionInstance, value}` triple, as read from or
/// written to a metadevice's state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateValue {
    #[serde(rename = "functionClass")]
    pub function_class: String,
    #[serde(rename = "functionInstance", default)]
    pub function_instance: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl StateValue {
    pub fn new(function_class: impl Into<String>, value: Value) -> Self {
        Self {
            function_class: function_class.into(),
            function_instance: None,
            value,
        }
    }

    pub fn with_instance(mut self, instance: Option<String>) -> Self {
        self.function_instance = instance;
        self
    }

    /// Key used in flattened state maps: `functionClass` or
    /// `functionClass:functionInstance`
    pub fn state_key(&self) -> String {
        match &self.function_instance {
            Some(instance) => format!("{}:{}", self.function_class, instance),
            None => self.function_class.clone(),
        }
    }
}

/// JSON type category of a state value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Boolean,
    Number,
    String,
    Object,
    Array,
    Null,
}

impl JsonType {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Bool(_) => JsonType::Boolean,
            Value::Number(_) => JsonType::Number,
            Value::String(_) => JsonType::String,
            Value::Object(_) => JsonType::Object,
            Value::Array(_) => JsonType::Array,
            Value::Null => JsonType::Null,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::Boolean => "boolean",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Object => "object",
            JsonType::Array => "array",
            JsonType::Null => "null",
        }
    }
}

impl std::fmt::Display for JsonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_type_classification() {
        assert_eq!(JsonType::of(&json!(true)), JsonType::Boolean);
        assert_eq!(JsonType::of(&json!(2.5)), JsonType::Number);
        assert_eq!(JsonType::of(&json!("on")), JsonType::String);
        assert_eq!(JsonType::of(&json!({"r": 1})), JsonType::Object);
        assert_eq!(JsonType::of(&json!([1, 2])), JsonType::Array);
        assert_eq!(JsonType::of(&Value::Null), JsonType::Null);
    }

    #[test]
    fn test_state_value_wire_format() {
        let value = StateValue::new("toggle", json!("on")).with_instance(Some("spigot-1".into()));
        let wire = serde_json::to_value(&value).unwrap();
        assert_eq!(
            wire,
            json!({"functionClass": "toggle", "functionInstance": "spigot-1", "value": "on"})
        );
        assert_eq!(value.state_key(), "toggle:spigot-1");
    }
}
