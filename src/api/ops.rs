/*
 * Responsibility
 * - GET /health: liveness only, touches nothing
 * - GET /ready: concurrent collaborator probes, each under the probe timeout; always 200
 * - GET /metrics: Prometheus text exposition
 */
use std::future::Future;
use std::time::Duration;

use axum::{
    Json,
    extract::State,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, warn};

use crate::error::AppError;
use crate::state::AppState;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "time": Utc::now() }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeState {
    Up,
    Down,
    Disabled,
}

#[derive(Debug, Serialize)]
pub struct Checks {
    pub data_store: ProbeState,
    pub cache: ProbeState,
    pub capture_engine: ProbeState,
    pub analysis_engine: ProbeState,
}

impl Checks {
    fn all_available(&self) -> bool {
        [
            self.data_store,
            self.cache,
            self.capture_engine,
            self.analysis_engine,
        ]
        .iter()
        .all(|s| *s != ProbeState::Down)
    }
}

#[derive(Debug, Serialize)]
pub struct Readiness {
    pub status: &'static str,
    pub phase: &'static str,
    pub checks: Checks,
}

async fn probe<E, F>(name: &'static str, timeout: Duration, fut: F) -> ProbeState
where
    E: std::fmt::Display,
    F: Future<Output = Result<(), E>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(())) => ProbeState::Up,
        Ok(Err(e)) => {
            warn!(dependency = name, error = %e, "readiness probe failed");
            ProbeState::Down
        }
        Err(_) => {
            warn!(dependency = name, timeout_ms = timeout.as_millis() as u64, "readiness probe timed out");
            ProbeState::Down
        }
    }
}

pub async fn ready(State(state): State<AppState>) -> Json<Readiness> {
    let timeout = state.probe_timeout;
    let collaborators = &state.collaborators;

    let cache = async {
        match &collaborators.cache {
            Some(cache) => probe("cache", timeout, cache.ping()).await,
            None => ProbeState::Disabled,
        }
    };

    let (data_store, cache, capture_engine, analysis_engine) = tokio::join!(
        probe("data_store", timeout, collaborators.data.probe()),
        cache,
        probe("capture_engine", timeout, collaborators.capture.probe()),
        probe("analysis_engine", timeout, collaborators.analysis.probe()),
    );

    let checks = Checks {
        data_store,
        cache,
        capture_engine,
        analysis_engine,
    };
    let status = if checks.all_available() {
        "ready"
    } else {
        "degraded"
    };

    Json(Readiness {
        status,
        phase: state.lifecycle.phase().as_str(),
        checks,
    })
}

pub async fn metrics(State(state): State<AppState>) -> Result<Response, AppError> {
    let body = state.metrics.render().map_err(|e| {
        error!(error = %e, "failed to render metrics");
        AppError::Internal
    })?;

    let mut response = body.into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    Ok(response)
}
