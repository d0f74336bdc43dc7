//! Per-request context threaded through the admission chain and handed to handlers.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, HeaderValue, Method, header, request::Parts};
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::auth::Principal;
use crate::services::collaborators::CollaboratorResult;

/// Rate-limit quota observed for this request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
    pub limit: u32,
    pub remaining: u32,
}

/// Settings the chain needs to build a context.
#[derive(Debug, Clone, Copy)]
pub struct ContextSettings {
    pub request_deadline: Duration,
    pub trust_proxy_headers: bool,
}

/// Owned by exactly one request. The chain keeps the original for response hooks;
/// handlers receive a clone through request extensions.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub method: Method,
    pub path: String,
    pub client: String,
    pub origin: Option<HeaderValue>,
    pub received_at: Instant,
    pub deadline: Instant,
    pub principal: Option<Principal>,
    pub quota: Option<Quota>,
    pub rejected_by: Option<&'static str>,
}

impl RequestContext {
    pub fn new(parts: &Parts, settings: ContextSettings) -> Self {
        let received_at = Instant::now();
        Self {
            request_id: String::new(),
            method: parts.method.clone(),
            path: parts.uri.path().to_string(),
            client: client_key(parts, settings.trust_proxy_headers),
            origin: parts.headers.get(header::ORIGIN).cloned(),
            received_at,
            deadline: received_at + settings.request_deadline,
            principal: None,
            quota: None,
            rejected_by: None,
        }
    }

    pub fn subject(&self) -> Option<Uuid> {
        self.principal.as_ref().map(|p| p.subject_id)
    }

    pub fn principal(&self) -> Result<&Principal, AppError> {
        self.principal
            .as_ref()
            .ok_or(AppError::Unauthorized("authentication required"))
    }

    pub fn require_admin(&self) -> Result<&Principal, AppError> {
        let principal = self.principal()?;
        if principal.is_admin() {
            Ok(principal)
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Run a collaborator call under this request's deadline.
    ///
    /// An elapsed deadline is reported as `UpstreamUnavailable`; nothing is retried.
    pub async fn bounded<T, F>(&self, collaborator: &'static str, call: F) -> Result<T, AppError>
    where
        F: Future<Output = CollaboratorResult<T>>,
    {
        match tokio::time::timeout_at(self.deadline, call).await {
            Ok(result) => result.map_err(AppError::from),
            Err(_) => {
                tracing::warn!(
                    request_id = %self.request_id,
                    collaborator,
                    "collaborator call exceeded request deadline"
                );
                Err(AppError::UpstreamUnavailable(collaborator))
            }
        }
    }
}

/// Rate-limit key: proxy headers when trusted, then the peer address, else "unknown".
fn client_key(parts: &Parts, trust_proxy_headers: bool) -> String {
    if trust_proxy_headers && let Some(ip) = forwarded_client(&parts.headers) {
        return ip;
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_client(headers: &HeaderMap) -> Option<String> {
    let first_hop = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    first_hop
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        })
        .map(str::to_string)
}
