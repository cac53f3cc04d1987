//! Offline bridge over a captured metadevice listing
//!
//! The listing file is re-read on every call so edits to it show up as
//! device drift. Pushed state values are kept in memory and layered over
//! the file's states.

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::controllers::state_values_of;
use super::{BridgeError, BridgeResult, CloudBridge};
use crate::analysis::{device_id, is_device, Corpus};
use crate::types::StateValue;

/// [`CloudBridge`] serving a metadevice JSON file
pub struct SnapshotBridge {
    path: PathBuf,
    overlay: RwLock<HashMap<String, Vec<StateValue>>>,
}

impl SnapshotBridge {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            overlay: RwLock::new(HashMap::new()),
        }
    }

    fn load(&self) -> BridgeResult<Vec<Value>> {
        Corpus::load(&self.path)
            .map(|corpus| corpus.records().to_vec())
            .map_err(|e| BridgeError::Snapshot(e.to_string()))
    }

    /// Record of `id` and its merged states
    fn find(&self, id: &str) -> BridgeResult<Option<(Value, Vec<StateValue>)>> {
        let records = self.load()?;
        let found = records
            .into_iter()
            .filter(is_device)
            .enumerate()
            .find(|(position, record)| device_id(record, *position) == id)
            .map(|(_, record)| {
                let states = self.merged_states(id, state_values_of(&record));
                (record, states)
            });
        Ok(found)
    }

    fn merged_states(&self, id: &str, mut states: Vec<StateValue>) -> Vec<StateValue> {
        if let Some(pushed) = self.overlay.read().get(id) {
            for value in pushed {
                match states.iter_mut().find(|s| s.state_key() == value.state_key()) {
                    Some(existing) => existing.value = value.value.clone(),
                    None => states.push(value.clone()),
                }
            }
        }
        states
    }
}

#[async_trait]
impl CloudBridge for SnapshotBridge {
    async fn initialize(&self) -> BridgeResult<()> {
        let records = self.load()?;
        debug!(path = %self.path.display(), records = records.len(), "snapshot bridge ready");
        Ok(())
    }

    async fn list_devices(&self) -> BridgeResult<Vec<Value>> {
        let records = self.load()?;
        let overlay = self.overlay.read();
        if overlay.is_empty() {
            return Ok(records);
        }
        drop(overlay);

        let mut position = 0;
        let mut merged = Vec::with_capacity(records.len());
        for mut record in records {
            if is_device(&record) {
                let id = device_id(&record, position);
                position += 1;
                if self.overlay.read().contains_key(&id) {
                    let states = self.merged_states(&id, state_values_of(&record));
                    if let Value::Object(fields) = &mut record {
                        fields.remove("states");
                        let states = serde_json::to_value(states).unwrap_or_default();
                        fields.insert("state".to_string(), states);
                    }
                }
            }
            merged.push(record);
        }
        Ok(merged)
    }

    async fn device_state(&self, device_id: &str) -> BridgeResult<Vec<StateValue>> {
        self.find(device_id)?
            .map(|(_, states)| states)
            .ok_or_else(|| BridgeError::DeviceNotFound(device_id.to_string()))
    }

    async fn update_state(&self, device_id: &str, values: &[StateValue]) -> BridgeResult<()> {
        if self.find(device_id)?.is_none() {
            return Err(BridgeError::DeviceNotFound(device_id.to_string()));
        }

        let mut overlay = self.overlay.write();
        let pushed = overlay.entry(device_id.to_string()).or_default();
        for value in values {
            match pushed.iter_mut().find(|p| p.state_key() == value.state_key()) {
                Some(existing) => existing.value = value.value.clone(),
                None => pushed.push(value.clone()),
            }
        }
        debug!(device = device_id, values = values.len(), "snapshot state updated");
        Ok(())
    }
}
