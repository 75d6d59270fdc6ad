//! Sibyl HTTP adapter.
//!
//! Implements [`PollingPort`] against the Sibyl REST API: parameters travel as
//! request headers and every response is a `{ success, result, error }` envelope.

use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};

use sibyl_core::{
    config::{normalize_host_url, Config},
    domain::{PollingIdentifier, UpdateContainer},
    errors::{Error, RemoteError},
    ports::PollingPort,
    Result,
};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Slack on top of the server-side long-poll timeout before the request is abandoned.
const POLL_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    #[serde(default)]
    success: bool,
    result: Option<T>,
    error: Option<RemoteError>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<Option<T>> {
        if self.success {
            return Ok(self.result);
        }
        match self.error {
            Some(e) => Err(Error::Remote(e)),
            None => Err(Error::External(
                "request failed without an error payload".to_string(),
            )),
        }
    }
}

#[derive(Clone)]
pub struct SibylHttpClient {
    token: String,
    host_url: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for SibylHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SibylHttpClient")
            .field("host_url", &self.host_url)
            .finish_non_exhaustive()
    }
}

impl SibylHttpClient {
    pub fn new(token: impl Into<String>, host_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("http client build error: {e}")))?;
        Ok(Self {
            token: token.into(),
            host_url: normalize_host_url(host_url)?,
            http,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(cfg.token.clone(), &cfg.host_url)
    }

    pub fn host_url(&self) -> &str {
        &self.host_url
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}{method}", self.host_url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &'static str,
        req: reqwest::RequestBuilder,
    ) -> Result<Option<T>> {
        tracing::debug!(method, "sending request");
        let resp = req
            .header("token", &self.token)
            .send()
            .await
            .map_err(map_transport)?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(map_transport)?;
        let envelope: ApiResponse<T> = serde_json::from_slice(&body).map_err(|e| {
            tracing::debug!(method, %status, error = %e, "response is not an api envelope");
            Error::External(format!(
                "invalid response ({status}): {e}: {}",
                String::from_utf8_lossy(&body).chars().take(200).collect::<String>()
            ))
        })?;
        envelope.into_result().map_err(|e| {
            tracing::debug!(method, %status, error = %e, "request failed");
            e
        })
    }
}

fn map_transport(e: reqwest::Error) -> Error {
    if e.is_connect() {
        Error::TransportRefused(e.to_string())
    } else {
        Error::Transport(e.to_string())
    }
}

#[async_trait]
impl PollingPort for SibylHttpClient {
    async fn start_polling(&self) -> Result<PollingIdentifier> {
        let req = self.http.get(self.endpoint("startPolling"));
        self.send::<PollingIdentifier>("startPolling", req)
            .await?
            .ok_or_else(|| Error::External("startPolling returned no session".to_string()))
    }

    async fn get_updates(
        &self,
        timeout_seconds: u32,
        id: &PollingIdentifier,
    ) -> Result<Option<UpdateContainer>> {
        let req = self
            .http
            .get(self.endpoint("getUpdates"))
            .timeout(Duration::from_secs(u64::from(timeout_seconds)) + POLL_TIMEOUT_MARGIN)
            .header("timeout", timeout_seconds.to_string())
            .header("unique-id", &id.unique_id)
            .header("access-hash", &id.access_hash);
        self.send::<UpdateContainer>("getUpdates", req).await
    }
}
