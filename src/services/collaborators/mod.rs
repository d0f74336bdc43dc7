//! Contracts of the services the gateway fronts.
//!
//! Handlers and GraphQL resolvers only see these traits. Adapters:
//! - `memory`: process-local implementations (development, tests)
//! - `http`: JSON-over-HTTP clients for the capture and analysis engines

pub mod http;
pub mod memory;
pub mod model;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::CollaboratorConfig;
use crate::services::cache::{CacheClient, ValkeyClient};

use model::{
    Activity, Alert, AlertFilter, AlertPatch, AnalysisHandle, FirewallRule, MonitoringStatus,
    NetworkInterface, NetworkStats, NewAlert, NewFirewallRule, NewUser, Page, PageRequest, Sample,
    StoreCounters, Threat, User, UserPatch,
};

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("{collaborator} unavailable: {reason}")]
    Unavailable {
        collaborator: &'static str,
        reason: String,
    },
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Conflict(String),
}

impl CollaboratorError {
    pub fn unavailable(collaborator: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            collaborator,
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait DataStore: Send + Sync {
    async fn list_alerts(
        &self,
        filter: AlertFilter,
        page: PageRequest,
    ) -> CollaboratorResult<Page<Alert>>;
    async fn get_alert(&self, id: Uuid) -> CollaboratorResult<Option<Alert>>;
    async fn create_alert(&self, alert: NewAlert) -> CollaboratorResult<Alert>;
    async fn update_alert(&self, id: Uuid, patch: AlertPatch) -> CollaboratorResult<Option<Alert>>;
    async fn delete_alert(&self, id: Uuid) -> CollaboratorResult<bool>;

    async fn list_threats(&self, page: PageRequest) -> CollaboratorResult<Page<Threat>>;
    async fn get_threat(&self, id: Uuid) -> CollaboratorResult<Option<Threat>>;

    async fn list_firewall_rules(&self, page: PageRequest)
    -> CollaboratorResult<Page<FirewallRule>>;
    async fn add_firewall_rule(&self, rule: NewFirewallRule) -> CollaboratorResult<FirewallRule>;
    async fn delete_firewall_rule(&self, id: Uuid) -> CollaboratorResult<bool>;

    async fn list_users(&self, page: PageRequest) -> CollaboratorResult<Page<User>>;
    async fn get_user(&self, id: Uuid) -> CollaboratorResult<Option<User>>;
    async fn create_user(&self, user: NewUser) -> CollaboratorResult<User>;
    async fn update_user(&self, id: Uuid, patch: UserPatch) -> CollaboratorResult<Option<User>>;
    async fn delete_user(&self, id: Uuid) -> CollaboratorResult<bool>;
    /// `Ok(None)` for an unknown email or a wrong password.
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> CollaboratorResult<Option<User>>;

    async fn counters(&self) -> CollaboratorResult<StoreCounters>;
    async fn recent_activity(&self, limit: usize) -> CollaboratorResult<Vec<Activity>>;

    async fn probe(&self) -> CollaboratorResult<()>;
}

#[async_trait]
pub trait CaptureEngine: Send + Sync {
    async fn interfaces(&self) -> CollaboratorResult<Vec<NetworkInterface>>;
    async fn stats(&self) -> CollaboratorResult<NetworkStats>;
    async fn monitoring_status(&self) -> CollaboratorResult<MonitoringStatus>;
    async fn start_monitoring(&self, interface: &str) -> CollaboratorResult<MonitoringStatus>;
    async fn stop_monitoring(&self) -> CollaboratorResult<MonitoringStatus>;
    async fn probe(&self) -> CollaboratorResult<()>;
}

#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    async fn submit(&self, sample: Sample) -> CollaboratorResult<AnalysisHandle>;
    async fn probe(&self) -> CollaboratorResult<()>;
}

/// The set of collaborators a gateway instance talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub data: Arc<dyn DataStore>,
    pub capture: Arc<dyn CaptureEngine>,
    pub analysis: Arc<dyn AnalysisEngine>,
    pub cache: Option<Arc<dyn CacheClient>>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("cache", &self.cache.as_ref().map(|c| c.backend_name()))
            .finish_non_exhaustive()
    }
}

impl Collaborators {
    /// All in-memory, no cache.
    pub fn in_memory() -> Self {
        Self {
            data: Arc::new(memory::MemoryDataStore::seeded()),
            capture: Arc::new(memory::MemoryCaptureEngine::new()),
            analysis: Arc::new(memory::MemoryAnalysisEngine::new()),
            cache: None,
        }
    }

    /// Remote adapters where an endpoint is configured, in-memory otherwise.
    pub fn from_config(config: &CollaboratorConfig) -> CollaboratorResult<Self> {
        let mut collaborators = Self::in_memory();

        if let Some(url) = &config.capture_engine_url {
            info!(url = %url, "using remote capture engine");
            collaborators.capture = Arc::new(http::HttpCaptureEngine::new(
                url.clone(),
                config.timeout,
            )?);
        }

        if let Some(url) = &config.analysis_engine_url {
            info!(url = %url, "using remote analysis engine");
            collaborators.analysis = Arc::new(http::HttpAnalysisEngine::new(
                url.clone(),
                config.timeout,
            )?);
        }

        if let Some(url) = &config.redis_url {
            let client = ValkeyClient::new(url)
                .map_err(|e| CollaboratorError::unavailable("cache", e.to_string()))?;
            info!(backend = client.backend_name(), "cache readiness probe enabled");
            collaborators.cache = Some(Arc::new(client));
        }

        Ok(collaborators)
    }
}
