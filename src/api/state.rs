//! Shared application state of the HTTP façade

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::info;

use crate::bridge::{BridgeBackend, BridgeError, BridgeResult, BridgeSession, Credentials};

/// A session together with its poller
struct ActiveSession {
    session: Arc<BridgeSession>,
    poller: JoinHandle<()>,
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.poller.abort();
    }
}

/// Shared state for request handlers
pub struct AppState {
    /// Where new sessions get their bridge from
    pub backend: BridgeBackend,

    session: RwLock<Option<ActiveSession>>,

    /// Serializes session creation
    login_lock: Mutex<()>,

    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(backend: BridgeBackend) -> Self {
        Self {
            backend,
            session: RwLock::new(None),
            login_lock: Mutex::new(()),
            started_at: Utc::now(),
        }
    }

    /// Start a session for `credentials`, replacing the active one.
    ///
    /// The previous session and its poller survive a failed login.
    pub async fn login(
        &self,
        credentials: Credentials,
        poll_interval: Duration,
    ) -> BridgeResult<()> {
        let _guard = self.login_lock.lock().await;
        let username = credentials.username.clone();

        let bridge = self.backend.connect(credentials)?;
        let session = BridgeSession::start(bridge, poll_interval).await?;
        let poller = session.spawn_poller();

        let previous = self
            .session
            .write()
            .await
            .replace(ActiveSession { session, poller });
        info!(
            username = %username,
            replaced = previous.is_some(),
            "session active"
        );
        Ok(())
    }

    /// The active session, or `NotLoggedIn`
    pub async fn session(&self) -> BridgeResult<Arc<BridgeSession>> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|active| active.session.clone())
            .ok_or(BridgeError::NotLoggedIn)
    }

    pub async fn has_session(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
