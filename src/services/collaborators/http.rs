//! JSON-over-HTTP adapters for the capture and analysis engines.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use super::model::{AnalysisHandle, MonitoringStatus, NetworkInterface, NetworkStats, Sample};
use super::{AnalysisEngine, CaptureEngine, CollaboratorError, CollaboratorResult};

/// Thin client bound to one engine's base URL.
#[derive(Debug, Clone)]
struct EngineClient {
    name: &'static str,
    base: Url,
    http: reqwest::Client,
}

impl EngineClient {
    fn new(name: &'static str, mut base: Url, timeout: Duration) -> CollaboratorResult<Self> {
        // `Url::join` replaces the last segment unless the base ends with '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| CollaboratorError::unavailable(name, e.to_string()))?;

        Ok(Self { name, base, http })
    }

    fn endpoint(&self, path: &str) -> CollaboratorResult<Url> {
        self.base
            .join(path)
            .map_err(|e| CollaboratorError::unavailable(self.name, format!("bad endpoint: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> CollaboratorResult<T> {
        let url = self.endpoint(path)?;
        debug!(collaborator = self.name, %url, "GET");
        let resp = self.http.get(url).send().await.map_err(|e| self.transport(e))?;
        self.decode(resp).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> CollaboratorResult<T> {
        let url = self.endpoint(path)?;
        debug!(collaborator = self.name, %url, "POST");
        let resp = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| self.transport(e))?;
        self.decode(resp).await
    }

    async fn health(&self) -> CollaboratorResult<()> {
        let url = self.endpoint("health")?;
        let resp = self.http.get(url).send().await.map_err(|e| self.transport(e))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(CollaboratorError::unavailable(
                self.name,
                format!("health returned {}", resp.status()),
            ))
        }
    }

    fn transport(&self, e: reqwest::Error) -> CollaboratorError {
        warn!(collaborator = self.name, error = %e, "request failed");
        CollaboratorError::unavailable(self.name, e.to_string())
    }

    async fn decode<T: DeserializeOwned>(&self, resp: reqwest::Response) -> CollaboratorResult<T> {
        let status = resp.status();
        if status.is_success() {
            return resp.json::<T>().await.map_err(|e| {
                warn!(collaborator = self.name, error = %e, "undecodable response");
                CollaboratorError::unavailable(self.name, "undecodable response")
            });
        }

        let body = resp.text().await.unwrap_or_default();
        match status {
            s if s.is_client_error() && s != StatusCode::TOO_MANY_REQUESTS => {
                Err(CollaboratorError::Rejected(rejection_message(&body, s)))
            }
            s => {
                warn!(collaborator = self.name, status = %s, "engine error");
                Err(CollaboratorError::unavailable(self.name, format!("status {s}")))
            }
        }
    }
}

/// Prefer the engine's own `{"error": ...}` / `{"detail": ...}` message.
fn rejection_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("detail"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("request rejected ({status})"))
}

#[derive(Debug, Clone)]
pub struct HttpCaptureEngine {
    client: EngineClient,
}

impl HttpCaptureEngine {
    pub fn new(base: Url, timeout: Duration) -> CollaboratorResult<Self> {
        Ok(Self {
            client: EngineClient::new("capture_engine", base, timeout)?,
        })
    }
}

#[async_trait]
impl CaptureEngine for HttpCaptureEngine {
    async fn interfaces(&self) -> CollaboratorResult<Vec<NetworkInterface>> {
        self.client.get_json("interfaces").await
    }

    async fn stats(&self) -> CollaboratorResult<NetworkStats> {
        self.client.get_json("stats").await
    }

    async fn monitoring_status(&self) -> CollaboratorResult<MonitoringStatus> {
        self.client.get_json("monitor/status").await
    }

    async fn start_monitoring(&self, interface: &str) -> CollaboratorResult<MonitoringStatus> {
        self.client
            .post_json("monitor/start", &json!({ "interface": interface }))
            .await
    }

    async fn stop_monitoring(&self) -> CollaboratorResult<MonitoringStatus> {
        self.client.post_json("monitor/stop", &json!({})).await
    }

    async fn probe(&self) -> CollaboratorResult<()> {
        self.client.health().await
    }
}

#[derive(Debug, Clone)]
pub struct HttpAnalysisEngine {
    client: EngineClient,
}

impl HttpAnalysisEngine {
    pub fn new(base: Url, timeout: Duration) -> CollaboratorResult<Self> {
        Ok(Self {
            client: EngineClient::new("analysis_engine", base, timeout)?,
        })
    }
}

#[async_trait]
impl AnalysisEngine for HttpAnalysisEngine {
    async fn submit(&self, sample: Sample) -> CollaboratorResult<AnalysisHandle> {
        self.client.post_json("api/v1/analyze", &sample).await
    }

    async fn probe(&self) -> CollaboratorResult<()> {
        self.client.health().await
    }
}
