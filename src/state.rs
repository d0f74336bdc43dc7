/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 *   - token service, collaborators, event hub, metrics, rate limiter, lifecycle, schema
 * - Clone is cheap (Arc / channel handles inside)
 */
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tracing::info;

use crate::config::{BootstrapAdmin, Config};
use crate::graphql::{GatewaySchema, build_schema};
use crate::lifecycle::Lifecycle;
use crate::services::auth::{Role, TokenService, build_token_service};
use crate::services::collaborators::model::NewUser;
use crate::services::collaborators::{CollaboratorError, Collaborators};
use crate::services::events::EventHub;
use crate::services::metrics::GatewayMetrics;
use crate::services::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub collaborators: Collaborators,
    pub events: EventHub,
    pub metrics: Arc<GatewayMetrics>,
    pub limiter: Arc<RateLimiter>,
    pub lifecycle: Lifecycle,
    pub schema: GatewaySchema,
    pub probe_timeout: Duration,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("collaborators", &self.collaborators)
            .field("phase", &self.lifecycle.phase())
            .field("limiter", &self.limiter.policy())
            .finish_non_exhaustive()
    }
}

impl AppState {
    pub fn new(config: &Config, collaborators: Collaborators) -> Result<Self, prometheus::Error> {
        let events = EventHub::new();
        let schema = build_schema(collaborators.clone(), events.clone());

        Ok(Self {
            tokens: build_token_service(&config.auth),
            collaborators,
            events,
            metrics: Arc::new(GatewayMetrics::new()?),
            limiter: Arc::new(RateLimiter::new(config.rate_limit)),
            lifecycle: Lifecycle::new(),
            schema,
            probe_timeout: config.collaborators.timeout,
        })
    }

    /// Adapters chosen from config, plus the bootstrap admin when one is configured.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let collaborators = Collaborators::from_config(&config.collaborators)
            .context("failed to build collaborator adapters")?;
        let state = Self::new(config, collaborators).context("failed to register metrics")?;

        if let Some(admin) = &config.bootstrap_admin {
            state.seed_admin(admin).await?;
        }
        Ok(state)
    }

    async fn seed_admin(&self, admin: &BootstrapAdmin) -> anyhow::Result<()> {
        let created = self
            .collaborators
            .data
            .create_user(NewUser {
                email: admin.email.clone(),
                name: "Administrator".to_string(),
                password: admin.password.clone(),
                role: Role::Admin,
            })
            .await;

        match created {
            Ok(user) => info!(user_id = %user.id, email = %user.email, "bootstrap admin created"),
            Err(CollaboratorError::Conflict(_)) => {
                info!(email = %admin.email, "bootstrap admin already present")
            }
            Err(e) => return Err(e).context("failed to create bootstrap admin"),
        }
        Ok(())
    }
}
