//! Device-category controllers and typed command dispatch
//!
//! Every category declares a closed set of [`Operation`]s. A command name is
//! parsed into an operation, routed to the controller of the target device's
//! category (or, for uncategorized devices, to the first category in
//! [`DeviceCategory::PRIORITY`] that exposes it) and translated into the
//! state values pushed to the device.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{json, Value};

use crate::analysis::{extract_device, is_device, state_container, StateContainer};
use crate::types::{DeviceBrief, StateValue};

use super::{BridgeError, BridgeResult};

/// Named operations a controller may expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    TurnOn,
    TurnOff,
    SetBrightness,
    SetColorTemperature,
    SetRgb,
    SetSpeed,
    SetDirection,
    Lock,
    Unlock,
    SetMode,
    SetFanMode,
    SetTargetTemperature,
}

impl Operation {
    pub const ALL: [Operation; 12] = [
        Operation::TurnOn,
        Operation::TurnOff,
        Operation::SetBrightness,
        Operation::SetColorTemperature,
        Operation::SetRgb,
        Operation::SetSpeed,
        Operation::SetDirection,
        Operation::Lock,
        Operation::Unlock,
        Operation::SetMode,
        Operation::SetFanMode,
        Operation::SetTargetTemperature,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::TurnOn => "turn_on",
            Operation::TurnOff => "turn_off",
            Operation::SetBrightness => "set_brightness",
            Operation::SetColorTemperature => "set_color_temperature",
            Operation::SetRgb => "set_rgb",
            Operation::SetSpeed => "set_speed",
            Operation::SetDirection => "set_direction",
            Operation::Lock => "lock",
            Operation::Unlock => "unlock",
            Operation::SetMode => "set_mode",
            Operation::SetFanMode => "set_fan_mode",
            Operation::SetTargetTemperature => "set_target_temperature",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| BridgeError::UnsupportedCommand(s.to_string()))
    }
}

/// Device categories with a dedicated controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceCategory {
    Lights,
    Fans,
    Locks,
    Switches,
    Valves,
    Thermostats,
}

impl DeviceCategory {
    /// Order in which controllers are tried for an uncategorized device
    pub const PRIORITY: [DeviceCategory; 6] = [
        DeviceCategory::Lights,
        DeviceCategory::Fans,
        DeviceCategory::Locks,
        DeviceCategory::Switches,
        DeviceCategory::Valves,
        DeviceCategory::Thermostats,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DeviceCategory::Lights => "lights",
            DeviceCategory::Fans => "fans",
            DeviceCategory::Locks => "locks",
            DeviceCategory::Switches => "switches",
            DeviceCategory::Valves => "valves",
            DeviceCategory::Thermostats => "thermostats",
        }
    }

    /// Category owning a device class, if any
    pub fn for_class(device_class: &str) -> Option<Self> {
        match device_class {
            "light" => Some(DeviceCategory::Lights),
            "fan" | "ceiling-fan" | "exhaust-fan" => Some(DeviceCategory::Fans),
            "lock" | "door-lock" => Some(DeviceCategory::Locks),
            "switch" | "power-outlet" | "landscape-transformer" => Some(DeviceCategory::Switches),
            "water-timer" | "valve" => Some(DeviceCategory::Valves),
            "thermostat" | "portable-air-conditioner" => Some(DeviceCategory::Thermostats),
            _ => None,
        }
    }

    pub fn operations(&self) -> &'static [Operation] {
        use Operation::*;
        match self {
            DeviceCategory::Lights => &[
                TurnOn,
                TurnOff,
                SetBrightness,
                SetColorTemperature,
                SetRgb,
            ],
            DeviceCategory::Fans => &[TurnOn, TurnOff, SetSpeed, SetDirection],
            DeviceCategory::Locks => &[Lock, Unlock],
            DeviceCategory::Switches => &[TurnOn, TurnOff],
            DeviceCategory::Valves => &[TurnOn, TurnOff],
            DeviceCategory::Thermostats => &[SetMode, SetFanMode, SetTargetTemperature],
        }
    }

    pub fn supports(&self, op: Operation) -> bool {
        self.operations().contains(&op)
    }

    /// First category in priority order exposing `op`
    pub fn first_exposing(op: Operation) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|c| c.supports(op))
    }

    /// Controller handling `op` for a device of `category`. Categorized
    /// devices only accept their own operations; devices without a category
    /// fall back to the first category in priority order exposing `op`.
    pub fn resolve(category: Option<Self>, op: Operation) -> BridgeResult<Self> {
        match category {
            Some(category) if category.supports(op) => Ok(category),
            Some(category) => Err(BridgeError::UnsupportedCommand(format!(
                "{} on {}",
                op,
                category.name()
            ))),
            None => Self::first_exposing(op)
                .ok_or_else(|| BridgeError::UnsupportedCommand(op.to_string())),
        }
    }

    /// Translate an operation and its arguments into state values
    pub fn translate(&self, op: Operation, args: &Value) -> BridgeResult<Vec<StateValue>> {
        if !self.supports(op) {
            return Err(BridgeError::UnsupportedCommand(format!(
                "{} on {}",
                op,
                self.name()
            )));
        }

        let values = match (self, op) {
            (DeviceCategory::Lights | DeviceCategory::Fans, Operation::TurnOn) => {
                vec![StateValue::new("power", json!("on"))]
            }
            (DeviceCategory::Lights | DeviceCategory::Fans, Operation::TurnOff) => {
                vec![StateValue::new("power", json!("off"))]
            }
            (DeviceCategory::Lights, Operation::SetBrightness) => {
                let level = arg_u64(args, "brightness", 0, 100)?;
                vec![StateValue::new("brightness", json!(level))]
            }
            (DeviceCategory::Lights, Operation::SetColorTemperature) => {
                let kelvin = arg_u64(args, "temperature", 1000, 10000)?;
                vec![
                    StateValue::new("color-mode", json!("white")),
                    StateValue::new("color-temperature", json!(kelvin)),
                ]
            }
            (DeviceCategory::Lights, Operation::SetRgb) => {
                let r = arg_u64(args, "red", 0, 255)?;
                let g = arg_u64(args, "green", 0, 255)?;
                let b = arg_u64(args, "blue", 0, 255)?;
                vec![
                    StateValue::new("color-mode", json!("color")),
                    StateValue::new("color-rgb", json!({"color-rgb": {"r": r, "g": g, "b": b}})),
                ]
            }
            (DeviceCategory::Fans, Operation::SetSpeed) => {
                let speed = arg_str(args, "speed")?;
                vec![StateValue::new("fan-speed", json!(speed))
                    .with_instance(Some("fan-speed".to_string()))]
            }
            (DeviceCategory::Fans, Operation::SetDirection) => {
                let direction = arg_str(args, "direction")?;
                if direction != "forward" && direction != "reverse" {
                    return Err(BridgeError::InvalidArgument(format!(
                        "direction must be forward or reverse, got {}",
                        direction
                    )));
                }
                vec![StateValue::new("fan-direction", json!(direction))
                    .with_instance(Some("fan-direction".to_string()))]
            }
            (DeviceCategory::Locks, Operation::Lock) => {
                vec![StateValue::new("lock-control", json!("locking"))]
            }
            (DeviceCategory::Locks, Operation::Unlock) => {
                vec![StateValue::new("lock-control", json!("unlocking"))]
            }
            (DeviceCategory::Switches, Operation::TurnOn | Operation::TurnOff) => {
                let state = if op == Operation::TurnOn { "on" } else { "off" };
                // multi-outlet devices address each outlet as a toggle instance
                match opt_str(args, "instance") {
                    Some(instance) => vec![StateValue::new("toggle", json!(state))
                        .with_instance(Some(instance))],
                    None => vec![StateValue::new("power", json!(state))],
                }
            }
            (DeviceCategory::Valves, Operation::TurnOn | Operation::TurnOff) => {
                let state = if op == Operation::TurnOn { "on" } else { "off" };
                vec![StateValue::new("toggle", json!(state))
                    .with_instance(opt_str(args, "instance"))]
            }
            (DeviceCategory::Thermostats, Operation::SetMode) => {
                vec![StateValue::new("mode", json!(arg_str(args, "mode")?))]
            }
            (DeviceCategory::Thermostats, Operation::SetFanMode) => {
                vec![StateValue::new("fan-mode", json!(arg_str(args, "fan_mode")?))]
            }
            (DeviceCategory::Thermostats, Operation::SetTargetTemperature) => {
                let temperature = arg_f64(args, "temperature")?;
                let instance =
                    opt_str(args, "instance").unwrap_or_else(|| "heating-target".to_string());
                vec![StateValue::new("temperature", json!(temperature))
                    .with_instance(Some(instance))]
            }
            _ => return Err(BridgeError::UnsupportedCommand(op.to_string())),
        };
        Ok(values)
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn arg<'a>(args: &'a Value, key: &str) -> BridgeResult<&'a Value> {
    args.get(key)
        .filter(|v| !v.is_null())
        .ok_or_else(|| BridgeError::InvalidArgument(format!("missing argument '{}'", key)))
}

fn arg_u64(args: &Value, key: &str, min: u64, max: u64) -> BridgeResult<u64> {
    let value = arg(args, key)?
        .as_u64()
        .ok_or_else(|| BridgeError::InvalidArgument(format!("'{}' must be an integer", key)))?;
    if value < min || value > max {
        return Err(BridgeError::InvalidArgument(format!(
            "'{}' must be between {} and {}",
            key, min, max
        )));
    }
    Ok(value)
}

fn arg_f64(args: &Value, key: &str) -> BridgeResult<f64> {
    arg(args, key)?
        .as_f64()
        .ok_or_else(|| BridgeError::InvalidArgument(format!("'{}' must be a number", key)))
}

fn arg_str(args: &Value, key: &str) -> BridgeResult<String> {
    arg(args, key)?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| BridgeError::InvalidArgument(format!("'{}' must be a string", key)))
}

fn opt_str(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Read state values from a state container (`[...]` or `{values: [...]}`)
pub fn parse_state_values(container: &Value) -> Vec<StateValue> {
    state_values_of(&json!({ "state": container }))
}

/// State values of a device record. Entries without a function class are
/// dropped, as is everything in an unreadable container.
pub fn state_values_of(record: &Value) -> Vec<StateValue> {
    let entries = match state_container(record) {
        StateContainer::Entries(entries) => entries,
        StateContainer::Malformed => return Vec::new(),
    };
    entries
        .iter()
        .filter_map(|entry| {
            let function_class = entry
                .get("functionClass")
                .and_then(Value::as_str)
                .filter(|fc| !fc.is_empty())?;
            let instance = match entry.get("functionInstance") {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            };
            let value = entry.get("value").cloned().unwrap_or(Value::Null);
            Some(StateValue::new(function_class, value).with_instance(instance))
        })
        .collect()
}

/// Flatten state values to `{"functionClass[:instance]": value}`
pub fn state_map(values: &[StateValue]) -> BTreeMap<String, Value> {
    values
        .iter()
        .map(|v| (v.state_key(), v.value.clone()))
        .collect()
}

/// A device as last listed by the bridge
#[derive(Debug, Clone, PartialEq)]
pub struct CachedDevice {
    pub brief: DeviceBrief,
    pub category: Option<DeviceCategory>,
    pub states: Vec<StateValue>,
}

/// Devices of one collection, keyed by id
#[derive(Debug, Clone, Default)]
pub struct DeviceCollection {
    devices: BTreeMap<String, CachedDevice>,
}

impl DeviceCollection {
    pub fn get_device(&self, device_id: &str) -> Option<&CachedDevice> {
        self.devices.get(device_id)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    fn insert(&mut self, device: CachedDevice) {
        self.devices.insert(device.brief.id.clone(), device);
    }
}

#[derive(Debug, Default)]
struct ControllerSet {
    /// Every listed device, in listing order
    order: Vec<String>,
    /// Catch-all collection
    devices: DeviceCollection,
    categories: HashMap<DeviceCategory, DeviceCollection>,
}

/// Device collections of an active bridge session
#[derive(Debug, Default)]
pub struct Controllers {
    inner: RwLock<ControllerSet>,
}

impl Controllers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild every collection from a metadevice listing
    pub fn replace(&self, records: &[Value]) -> usize {
        let mut set = ControllerSet::default();
        for (position, record) in records.iter().filter(|r| is_device(r)).enumerate() {
            let brief = extract_device(record, position);
            let category = DeviceCategory::for_class(&brief.class);
            let device = CachedDevice {
                brief,
                category,
                states: state_values_of(record),
            };

            if let Some(category) = category {
                set.categories
                    .entry(category)
                    .or_default()
                    .insert(device.clone());
            }
            if !set.devices.devices.contains_key(&device.brief.id) {
                set.order.push(device.brief.id.clone());
            }
            set.devices.insert(device);
        }

        let count = set.devices.len();
        *self.inner.write() = set;
        count
    }

    /// Look a device up in the category collections first, then the
    /// catch-all collection
    pub fn get_device(&self, device_id: &str) -> Option<CachedDevice> {
        let set = self.inner.read();
        DeviceCategory::PRIORITY
            .iter()
            .filter_map(|c| set.categories.get(c))
            .find_map(|collection| collection.get_device(device_id))
            .or_else(|| set.devices.get_device(device_id))
            .cloned()
    }

    /// Flat device list in listing order
    pub fn list(&self) -> Vec<DeviceBrief> {
        let set = self.inner.read();
        set.order
            .iter()
            .filter_map(|id| set.devices.get_device(id))
            .map(|d| d.brief.clone())
            .collect()
    }

    pub fn ids(&self) -> BTreeSet<String> {
        self.inner.read().devices.devices.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_operation() {
        assert_eq!("turn_on".parse::<Operation>().unwrap(), Operation::TurnOn);
        assert_eq!(
            "set_target_temperature".parse::<Operation>().unwrap(),
            Operation::SetTargetTemperature
        );
        assert!(matches!(
            "self_destruct".parse::<Operation>(),
            Err(BridgeError::UnsupportedCommand(cmd)) if cmd == "self_destruct"
        ));
    }

    #[test]
    fn test_every_operation_has_a_controller() {
        for op in Operation::ALL {
            assert!(DeviceCategory::first_exposing(op).is_some(), "{}", op);
        }
    }

    #[test]
    fn test_priority_order() {
        assert_eq!(
            DeviceCategory::first_exposing(Operation::TurnOn),
            Some(DeviceCategory::Lights)
        );
        assert_eq!(
            DeviceCategory::first_exposing(Operation::SetSpeed),
            Some(DeviceCategory::Fans)
        );
        assert_eq!(
            DeviceCategory::first_exposing(Operation::Unlock),
            Some(DeviceCategory::Locks)
        );
        assert_eq!(
            DeviceCategory::first_exposing(Operation::SetMode),
            Some(DeviceCategory::Thermostats)
        );
    }

    #[test]
    fn test_resolve_uses_device_category() {
        assert_eq!(
            DeviceCategory::resolve(Some(DeviceCategory::Valves), Operation::TurnOn).unwrap(),
            DeviceCategory::Valves
        );
        assert_eq!(
            DeviceCategory::resolve(Some(DeviceCategory::Switches), Operation::TurnOff).unwrap(),
            DeviceCategory::Switches
        );
        assert!(matches!(
            DeviceCategory::resolve(Some(DeviceCategory::Locks), Operation::TurnOn),
            Err(BridgeError::UnsupportedCommand(_))
        ));
        assert_eq!(
            DeviceCategory::resolve(None, Operation::TurnOn).unwrap(),
            DeviceCategory::Lights
        );
    }

    #[test]
    fn test_translate_valve_and_outlet_instances() {
        let values = DeviceCategory::Valves
            .translate(Operation::TurnOn, &json!({"instance": "spigot-1"}))
            .unwrap();
        assert_eq!(
            values,
            vec![StateValue::new("toggle", json!("on")).with_instance(Some("spigot-1".into()))]
        );

        let values = DeviceCategory::Switches
            .translate(Operation::TurnOff, &json!({"instance": "outlet-2"}))
            .unwrap();
        assert_eq!(values[0].state_key(), "toggle:outlet-2");
        assert_eq!(values[0].value, json!("off"));
    }

    #[test]
    fn test_translate_light_operations() {
        let values = DeviceCategory::Lights
            .translate(Operation::SetBrightness, &json!({"brightness": 55}))
            .unwrap();
        assert_eq!(values, vec![StateValue::new("brightness", json!(55))]);

        let values = DeviceCategory::Lights
            .translate(Operation::SetRgb, &json!({"red": 1, "green": 2, "blue": 3}))
            .unwrap();
        assert_eq!(values[1].value, json!({"color-rgb": {"r": 1, "g": 2, "b": 3}}));
    }

    #[test]
    fn test_translate_rejects_bad_arguments() {
        assert!(matches!(
            DeviceCategory::Lights.translate(Operation::SetBrightness, &json!({"brightness": 101})),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(matches!(
            DeviceCategory::Lights.translate(Operation::SetBrightness, &json!({})),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert!(matches!(
            DeviceCategory::Fans.translate(Operation::SetDirection, &json!({"direction": "up"})),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_translate_unsupported_on_category() {
        assert!(matches!(
            DeviceCategory::Locks.translate(Operation::TurnOn, &json!({})),
            Err(BridgeError::UnsupportedCommand(_))
        ));
    }

    #[test]
    fn test_thermostat_target_defaults_to_heating() {
        let values = DeviceCategory::Thermostats
            .translate(Operation::SetTargetTemperature, &json!({"temperature": 21.5}))
            .unwrap();
        assert_eq!(values[0].function_instance.as_deref(), Some("heating-target"));
        assert_eq!(values[0].value, json!(21.5));
    }

    #[test]
    fn test_controllers_replace_and_lookup() {
        let controllers = Controllers::new();
        let count = controllers.replace(&[
            json!({
                "typeId": "metadevice.device",
                "id": "l1",
                "description": {"device": {"deviceClass": "light", "friendlyName": "Porch"}},
                "state": {"values": [{"functionClass": "power", "value": "on"}]}
            }),
            json!({
                "typeId": "metadevice.device",
                "id": "s1",
                "description": {"device": {"deviceClass": "smoke-detector"}}
            }),
            json!({"typeId": "metadevice.room", "id": "r1"}),
        ]);

        assert_eq!(count, 2);
        let light = controllers.get_device("l1").unwrap();
        assert_eq!(light.category, Some(DeviceCategory::Lights));
        assert_eq!(state_map(&light.states)["power"], json!("on"));

        let detector = controllers.get_device("s1").unwrap();
        assert_eq!(detector.category, None);
        assert!(controllers.get_device("r1").is_none());

        let ids: Vec<String> = controllers.list().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["l1", "s1"]);
    }
}
