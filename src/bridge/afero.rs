//! Live HubSpace / Afero cloud client

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::auth::{perform_login, refresh_tokens, TokenSet};
use super::controllers::parse_state_values;
use super::{BridgeError, BridgeResult, CloudBridge, Credentials};
use crate::types::StateValue;

/// Endpoints and client identity of the HubSpace cloud
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AferoConfig {
    pub auth_host: String,
    pub auth_realm: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub user_agent: String,
    pub api_host: String,
    pub data_host: String,
}

impl Default for AferoConfig {
    fn default() -> Self {
        Self {
            auth_host: "accounts.hubspaceconnect.com".to_string(),
            auth_realm: "thd".to_string(),
            client_id: "hubspace_android".to_string(),
            redirect_uri: "hubspace-app://loginredirect".to_string(),
            user_agent: "Dart/3.1 (dart:io)".to_string(),
            api_host: "api2.afero.net".to_string(),
            data_host: "semantics2.afero.net".to_string(),
        }
    }
}

impl AferoConfig {
    pub fn auth_url(&self, path: &str) -> String {
        format!(
            "https://{}/auth/realms/{}/{}",
            self.auth_host,
            self.auth_realm,
            path.trim_start_matches('/')
        )
    }

    pub fn api_url(&self, path: &str) -> String {
        format!("https://{}/{}", self.api_host, path.trim_start_matches('/'))
    }

    pub fn data_url(&self, path: &str) -> String {
        format!("https://{}/{}", self.data_host, path.trim_start_matches('/'))
    }
}

/// [`CloudBridge`] backed by the HubSpace cloud API
pub struct AferoClient {
    http: reqwest::Client,
    config: AferoConfig,
    credentials: Credentials,
    tokens: Mutex<Option<TokenSet>>,
}

impl AferoClient {
    pub fn new(config: AferoConfig, credentials: Credentials) -> BridgeResult<Self> {
        // login relies on reading redirects rather than following them
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            config,
            credentials,
            tokens: Mutex::new(None),
        })
    }

    /// Access token and account id, refreshing the token when it is about
    /// to expire
    async fn authorized(&self) -> BridgeResult<(String, String)> {
        let mut guard = self.tokens.lock().await;
        let tokens = guard.as_mut().ok_or(BridgeError::NotLoggedIn)?;
        if tokens.needs_refresh() {
            refresh_tokens(&self.http, &self.config, tokens).await?;
        }
        Ok((tokens.access_token.clone(), tokens.account_id.clone()))
    }

    fn metadevice_path(account_id: &str, device_id: &str) -> String {
        format!(
            "v1/accounts/{}/metadevices/{}/state",
            account_id,
            urlencoding::encode(device_id)
        )
    }
}

#[async_trait]
impl CloudBridge for AferoClient {
    async fn initialize(&self) -> BridgeResult<()> {
        let tokens = perform_login(&self.http, &self.config, &self.credentials).await?;
        *self.tokens.lock().await = Some(tokens);
        Ok(())
    }

    async fn list_devices(&self) -> BridgeResult<Vec<Value>> {
        let (token, account_id) = self.authorized().await?;
        let resp = self
            .http
            .get(self.config.data_url(&format!("v1/accounts/{}/metadevices", account_id)))
            .query(&[("expansions", "state")])
            .bearer_auth(token)
            .send()
            .await?;

        let status = resp.status();
        let data: Value = resp.error_for_status()?.json().await?;
        let devices = match data {
            Value::Array(devices) => devices,
            _ => Vec::new(),
        };
        info!(account = %account_id, %status, count = devices.len(), "listed metadevices");
        Ok(devices)
    }

    async fn device_state(&self, device_id: &str) -> BridgeResult<Vec<StateValue>> {
        let (token, account_id) = self.authorized().await?;
        let resp = self
            .http
            .get(self.config.data_url(&Self::metadevice_path(&account_id, device_id)))
            .bearer_auth(token)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(BridgeError::DeviceNotFound(device_id.to_string()));
        }
        let body: Value = resp.error_for_status()?.json().await?;
        debug!(device = device_id, "fetched device state");
        Ok(parse_state_values(&body))
    }

    async fn update_state(&self, device_id: &str, values: &[StateValue]) -> BridgeResult<()> {
        let (token, account_id) = self.authorized().await?;
        let payload = json!({ "metadeviceId": device_id, "values": values });
        let resp = self
            .http
            .put(self.config.data_url(&Self::metadevice_path(&account_id, device_id)))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;

        let status = resp.status();
        info!(device = device_id, %status, values = values.len(), "pushed device state");
        if status == StatusCode::NOT_FOUND {
            return Err(BridgeError::DeviceNotFound(device_id.to_string()));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BridgeError::Upstream(format!("{}: {}", status, text)));
        }
        Ok(())
    }
}
