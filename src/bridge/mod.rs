//! Bridge to the HubSpace / Afero cloud
//!
//! [`CloudBridge`] is the seam between the HTTP façade and whatever holds
//! the devices: the live cloud ([`AferoClient`]) or a captured metadevice
//! listing ([`SnapshotBridge`]). A [`BridgeSession`] wraps one bridge with
//! its device-category [`Controllers`] and discovery baseline.

mod afero;
mod auth;
mod controllers;
mod session;
mod snapshot;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::StateValue;

pub use afero::{AferoClient, AferoConfig};
pub use auth::{extract_auth_code, parse_login_form, LoginForm, Pkce};
pub use controllers::{
    parse_state_values, state_map, state_values_of, CachedDevice, Controllers, DeviceCategory,
    DeviceCollection, Operation,
};
pub use session::{
    BridgeSession, CommandOutcome, Discovery, DiscoveryStatus, DEFAULT_POLL_INTERVAL,
};
pub use snapshot::SnapshotBridge;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors surfaced by the bridge and the command proxy
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("not logged in")]
    NotLoggedIn,

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("unsupported command: {0}")]
    UnsupportedCommand(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

/// Account credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Operations the façade needs from a cloud bridge
#[async_trait]
pub trait CloudBridge: Send + Sync {
    /// Authenticate and resolve whatever the bridge needs before listing
    async fn initialize(&self) -> BridgeResult<()>;

    /// Every metadevice record of the account, states included
    async fn list_devices(&self) -> BridgeResult<Vec<Value>>;

    /// Current state values of one device
    async fn device_state(&self, device_id: &str) -> BridgeResult<Vec<StateValue>>;

    /// Push state values to one device
    async fn update_state(&self, device_id: &str, values: &[StateValue]) -> BridgeResult<()>;
}

/// Where sessions get their bridge from
#[derive(Debug, Clone)]
pub enum BridgeBackend {
    Cloud(AferoConfig),
    /// Offline bridge over a captured metadevice listing
    Snapshot(PathBuf),
}

impl Default for BridgeBackend {
    fn default() -> Self {
        BridgeBackend::Cloud(AferoConfig::default())
    }
}

impl BridgeBackend {
    /// Build an uninitialized bridge for `credentials`
    pub fn connect(&self, credentials: Credentials) -> BridgeResult<Arc<dyn CloudBridge>> {
        match self {
            BridgeBackend::Cloud(config) => {
                Ok(Arc::new(AferoClient::new(config.clone(), credentials)?))
            }
            BridgeBackend::Snapshot(path) => Ok(Arc::new(SnapshotBridge::new(path.clone()))),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            BridgeBackend::Cloud(config) => format!("cloud ({})", config.data_host),
            BridgeBackend::Snapshot(path) => format!("snapshot ({})", path.display()),
        }
    }
}
