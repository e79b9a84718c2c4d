//! HTTP implementation of [`AlarmApi`] on top of `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::debug;
use url::Url;

use super::{AlarmApi, AlarmScope, Credential};
use crate::config::{AppConfig, AuthMode};
use crate::error::ConnectorError;
use crate::models::{AlarmList, Organization, RemoteId, UserProfile};

/// Header (or query parameter) carrying the personal access token.
pub const TOKEN_HEADER: &str = "Personal-Access-Token";

/// Settings for [`GroupAlarmClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub api_base: String,
    pub status_url: String,
    pub auth_mode: AuthMode,
    pub timeout: Duration,
}

impl ClientOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            api_base: config.api_base.clone(),
            status_url: config.status_url.clone(),
            auth_mode: config.auth_mode,
            timeout: config.request_timeout(),
        }
    }
}

/// GroupAlarm REST client (API v1).
#[derive(Debug, Clone)]
pub struct GroupAlarmClient {
    http: Client,
    api_base: Url,
    status_url: Url,
    auth_mode: AuthMode,
    credential: Option<Credential>,
}

impl GroupAlarmClient {
    pub fn new(
        options: ClientOptions,
        credential: Option<Credential>,
    ) -> Result<Self, ConnectorError> {
        let http = Client::builder()
            .timeout(options.timeout)
            .user_agent(concat!("groupalarm-connector/", env!("CARGO_PKG_VERSION")))
            .build()?;

        // A trailing slash keeps `join` from dropping the last path segment.
        let api_base = Url::parse(&format!("{}/", options.api_base.trim_end_matches('/')))?;
        let status_url = Url::parse(&options.status_url)?;

        Ok(Self {
            http,
            api_base,
            status_url,
            auth_mode: options.auth_mode,
            credential,
        })
    }

    /// Build a client from application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConnectorError> {
        let credential = config.access_token.clone().and_then(Credential::new);
        Self::new(ClientOptions::from_config(config), credential)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ConnectorError> {
        Ok(self.api_base.join(path)?)
    }

    fn request(&self, method: Method, url: Url) -> Result<RequestBuilder, ConnectorError> {
        let credential = self
            .credential
            .as_ref()
            .ok_or(ConnectorError::MissingCredential)?;

        let builder = self.http.request(method, url);
        Ok(match self.auth_mode {
            AuthMode::Header => builder.header(TOKEN_HEADER, credential.expose()),
            AuthMode::Query => builder.query(&[(TOKEN_HEADER, credential.expose())]),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConnectorError> {
        let url = self.endpoint(path)?;
        let response = self
            .request(Method::GET, url)?
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok();
            return Err(ConnectorError::http_status(status.as_u16(), body));
        }

        let bytes = response.bytes().await?;
        debug!(endpoint = path, bytes = bytes.len(), "GroupAlarm response received");

        serde_json::from_slice(&bytes).map_err(|err| ConnectorError::MalformedResponse {
            endpoint: path.to_string(),
            details: err.to_string(),
        })
    }
}

#[async_trait]
impl AlarmApi for GroupAlarmClient {
    fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    async fn alarms(&self, scope: AlarmScope) -> Result<AlarmList, ConnectorError> {
        self.get_json(scope.path()).await
    }

    async fn user(&self) -> Result<UserProfile, ConnectorError> {
        self.get_json("user").await
    }

    async fn organization(&self, id: &RemoteId) -> Result<Organization, ConnectorError> {
        self.get_json(&format!("organization/{}", id)).await
    }

    async fn set_status(&self, state_id: i64) -> Result<(), ConnectorError> {
        let payload = json!({ "Status": { "id": state_id } });
        let response = self
            .request(Method::POST, self.status_url.clone())?
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            status => {
                let body = response.text().await.ok();
                Err(ConnectorError::http_status(status.as_u16(), body))
            }
        }
    }
}
