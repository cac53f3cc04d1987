//! Active bridge session: controllers, discovery baseline and polling

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::controllers::{state_map, Controllers, DeviceCategory, Operation};
use super::{BridgeError, BridgeResult, CloudBridge};
use crate::types::{DeviceBrief, StateValue};

/// Default controller refresh period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Result of a dispatched command
#[derive(Debug, Clone, Serialize)]
pub struct CommandOutcome {
    pub controller: DeviceCategory,
    pub operation: Operation,
    pub values: Vec<StateValue>,
}

/// Devices found since the previous discovery
#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    pub new_devices: Vec<DeviceBrief>,
    pub total: usize,
}

/// Drift between the discovery baseline and the latest listing
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiscoveryStatus {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub baseline: usize,
    pub current: usize,
}

/// One logged-in bridge with its device collections
pub struct BridgeSession {
    bridge: Arc<dyn CloudBridge>,
    controllers: Controllers,
    baseline: Mutex<BTreeSet<String>>,
    refresh_lock: tokio::sync::Mutex<()>,
    poll_interval: Duration,
}

impl BridgeSession {
    /// Initialize `bridge`, load its devices and prime the discovery baseline
    pub async fn start(
        bridge: Arc<dyn CloudBridge>,
        poll_interval: Duration,
    ) -> BridgeResult<Arc<Self>> {
        bridge.initialize().await?;

        let session = Arc::new(Self {
            bridge,
            controllers: Controllers::new(),
            baseline: Mutex::new(BTreeSet::new()),
            refresh_lock: tokio::sync::Mutex::new(()),
            poll_interval: poll_interval.max(Duration::from_secs(1)),
        });
        let count = session.refresh().await?;
        *session.baseline.lock() = session.controllers.ids();
        info!(devices = count, "bridge session started");
        Ok(session)
    }

    pub fn controllers(&self) -> &Controllers {
        &self.controllers
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Re-list devices and rebuild the controller collections
    pub async fn refresh(&self) -> BridgeResult<usize> {
        let _guard = self.refresh_lock.lock().await;
        let records = self.bridge.list_devices().await?;
        let count = self.controllers.replace(&records);
        debug!(devices = count, "controllers refreshed");
        Ok(count)
    }

    pub fn devices(&self) -> Vec<DeviceBrief> {
        self.controllers.list()
    }

    /// Current state map of a known device
    pub async fn device_state(&self, device_id: &str) -> BridgeResult<BTreeMap<String, Value>> {
        if self.controllers.get_device(device_id).is_none() {
            return Err(BridgeError::DeviceNotFound(device_id.to_string()));
        }
        let values = self.bridge.device_state(device_id).await?;
        Ok(state_map(&values))
    }

    /// Refresh, report devices missing from the baseline, then move the
    /// baseline to the current listing
    pub async fn discover(&self) -> BridgeResult<Discovery> {
        let total = self.refresh().await?;
        let current = self.controllers.ids();

        let mut baseline = self.baseline.lock();
        let new_devices: Vec<DeviceBrief> = self
            .controllers
            .list()
            .into_iter()
            .filter(|d| !baseline.contains(&d.id))
            .collect();
        *baseline = current;

        if !new_devices.is_empty() {
            info!(count = new_devices.len(), "discovered new devices");
        }
        Ok(Discovery { new_devices, total })
    }

    /// Compare the baseline with the last listing without moving it
    pub fn discovery_status(&self) -> DiscoveryStatus {
        let current = self.controllers.ids();
        let baseline = self.baseline.lock();
        DiscoveryStatus {
            added: current.difference(&baseline).cloned().collect(),
            removed: baseline.difference(&current).cloned().collect(),
            baseline: baseline.len(),
            current: current.len(),
        }
    }

    /// Route `cmd` to the controller of the device's category and push the
    /// resulting state values
    pub async fn dispatch(
        &self,
        device_id: &str,
        cmd: &str,
        args: &Value,
    ) -> BridgeResult<CommandOutcome> {
        let operation: Operation = cmd.parse()?;
        let device = self
            .controllers
            .get_device(device_id)
            .ok_or_else(|| BridgeError::DeviceNotFound(device_id.to_string()))?;
        let controller = DeviceCategory::resolve(device.category, operation)?;
        let values = controller.translate(operation, args)?;

        self.bridge.update_state(device_id, &values).await?;
        info!(device = device_id, %controller, %operation, "command dispatched");
        Ok(CommandOutcome {
            controller,
            operation,
            values,
        })
    }

    /// Refresh the controllers every poll interval until the session is
    /// dropped or the task aborted
    pub fn spawn_poller(self: &Arc<Self>) -> JoinHandle<()> {
        let session: Weak<Self> = Arc::downgrade(self);
        let period = self.poll_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(session) = session.upgrade() else {
                    break;
                };
                if let Err(e) = session.refresh().await {
                    warn!(error = %e, "device poll failed");
                }
            }
        })
    }
}
