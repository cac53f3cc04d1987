//! Server configuration from the environment

use std::net::SocketAddr;
use std::path::PathBuf;

use crate::bridge::BridgeBackend;

/// Environment variable names
pub mod env_vars {
    pub const HOST: &str = "HUBSPACE_BRIDGE_HOST";
    pub const PORT: &str = "HUBSPACE_BRIDGE_PORT";
    pub const SNAPSHOT_PATH: &str = "HUBSPACE_SNAPSHOT_PATH";
    pub const LOG_JSON: &str = "HUBSPACE_LOG_JSON";
}

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

/// Where the HTTP façade listens and which bridge it uses
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Serve a captured metadevice listing instead of the cloud
    pub snapshot: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            snapshot: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a variable lookup; unset, empty or unparsable values keep
    /// their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        Self {
            host: get(env_vars::HOST).unwrap_or(defaults.host),
            port: get(env_vars::PORT)
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            snapshot: get(env_vars::SNAPSHOT_PATH).map(PathBuf::from),
        }
    }

    pub fn address(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn backend(&self) -> BridgeBackend {
        match &self.snapshot {
            Some(path) => BridgeBackend::Snapshot(path.clone()),
            None => BridgeBackend::default(),
        }
    }
}

/// Whether `HUBSPACE_LOG_JSON` asks for JSON log lines
pub fn json_logging() -> bool {
    std::env::var(env_vars::LOG_JSON)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(false)
}
