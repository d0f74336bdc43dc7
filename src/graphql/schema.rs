//! The gateway's GraphQL schema.
//!
//! Every field that reads or writes collaborator data needs a Principal in the
//! request data; firewall and monitoring mutations need an admin. Collaborator calls
//! run under the request deadline when the dispatcher supplies a `RequestContext`.

use std::future::Future;

use async_graphql::{
    Context, InputObject, Object, Result, Schema, SimpleObject, Subscription,
};
use futures::{Stream, StreamExt};
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use super::errors::resolver_error;
use crate::error::AppError;
use crate::middleware::RequestContext;
use crate::services::auth::Principal;
use crate::services::collaborators::model::{
    Alert, AlertFilter, AlertPatch, AlertStatus, DashboardStats, FirewallRule, MonitoringStatus,
    NetworkStats, NewAlert, NewFirewallRule, Page, PageRequest, RuleAction, Severity, Threat,
};
use crate::services::collaborators::{CollaboratorResult, Collaborators};
use crate::services::events::{EventHub, GatewayEvent};

pub type GatewaySchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

pub fn build_schema(collaborators: Collaborators, events: EventHub) -> GatewaySchema {
    Schema::build(QueryRoot, MutationRoot, SubscriptionRoot)
        .data(collaborators)
        .data(events)
        .finish()
}

fn principal<'a>(ctx: &'a Context<'_>) -> Result<&'a Principal> {
    ctx.data_opt::<Principal>()
        .ok_or_else(|| resolver_error(AppError::Unauthorized("authentication required")))
}

fn admin<'a>(ctx: &'a Context<'_>) -> Result<&'a Principal> {
    let principal = principal(ctx)?;
    if principal.is_admin() {
        Ok(principal)
    } else {
        Err(resolver_error(AppError::Forbidden))
    }
}

async fn call<T, F>(ctx: &Context<'_>, collaborator: &'static str, fut: F) -> Result<T>
where
    F: Future<Output = CollaboratorResult<T>>,
{
    let result = match ctx.data_opt::<RequestContext>() {
        Some(request) => request.bounded(collaborator, fut).await,
        None => fut.await.map_err(AppError::from),
    };
    result.map_err(resolver_error)
}

#[derive(SimpleObject)]
pub struct PageInfo {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl<T> From<&Page<T>> for PageInfo {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.request.page,
            limit: page.request.limit,
            total: page.total as u64,
            has_next_page: page.has_next(),
            has_previous_page: page.has_previous(),
        }
    }
}

#[derive(SimpleObject)]
pub struct AlertConnection {
    pub items: Vec<Alert>,
    pub page_info: PageInfo,
}

#[derive(SimpleObject)]
pub struct ThreatConnection {
    pub items: Vec<Threat>,
    pub page_info: PageInfo,
}

#[derive(InputObject)]
pub struct CreateAlertInput {
    pub severity: Severity,
    #[graphql(name = "type")]
    pub kind: String,
    pub source_ip: String,
    pub destination_ip: Option<String>,
    pub description: String,
}

#[derive(InputObject)]
pub struct UpdateAlertInput {
    pub status: Option<AlertStatus>,
    pub notes: Option<String>,
}

#[derive(InputObject)]
pub struct FirewallRuleInput {
    pub action: RuleAction,
    pub source_ip: Option<String>,
    pub port: Option<u16>,
    pub protocol: Option<String>,
    pub description: Option<String>,
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn alerts(
        &self,
        ctx: &Context<'_>,
        page: Option<u32>,
        limit: Option<u32>,
        severity: Option<Severity>,
    ) -> Result<AlertConnection> {
        principal(ctx)?;
        let collaborators = ctx.data::<Collaborators>()?;
        let filter = AlertFilter {
            severity,
            status: None,
        };
        let page = call(
            ctx,
            "data_store",
            collaborators
                .data
                .list_alerts(filter, PageRequest::new(page, limit)),
        )
        .await?;

        Ok(AlertConnection {
            page_info: PageInfo::from(&page),
            items: page.items,
        })
    }

    async fn alert(&self, ctx: &Context<'_>, id: Uuid) -> Result<Option<Alert>> {
        principal(ctx)?;
        let collaborators = ctx.data::<Collaborators>()?;
        call(ctx, "data_store", collaborators.data.get_alert(id)).await
    }

    async fn threats(
        &self,
        ctx: &Context<'_>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<ThreatConnection> {
        principal(ctx)?;
        let collaborators = ctx.data::<Collaborators>()?;
        let page = call(
            ctx,
            "data_store",
            collaborators.data.list_threats(PageRequest::new(page, limit)),
        )
        .await?;

        Ok(ThreatConnection {
            page_info: PageInfo::from(&page),
            items: page.items,
        })
    }

    async fn threat(&self, ctx: &Context<'_>, id: Uuid) -> Result<Option<Threat>> {
        principal(ctx)?;
        let collaborators = ctx.data::<Collaborators>()?;
        call(ctx, "data_store", collaborators.data.get_threat(id)).await
    }

    async fn network_stats(&self, ctx: &Context<'_>) -> Result<NetworkStats> {
        principal(ctx)?;
        let collaborators = ctx.data::<Collaborators>()?;
        call(ctx, "capture_engine", collaborators.capture.stats()).await
    }

    async fn dashboard_stats(&self, ctx: &Context<'_>) -> Result<DashboardStats> {
        principal(ctx)?;
        let collaborators = ctx.data::<Collaborators>()?;

        let (counters, network, monitoring) = futures::try_join!(
            call(ctx, "data_store", collaborators.data.counters()),
            call(ctx, "capture_engine", collaborators.capture.stats()),
            call(ctx, "capture_engine", collaborators.capture.monitoring_status()),
        )?;

        Ok(DashboardStats::compose(
            counters,
            &network,
            monitoring.is_running,
        ))
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn create_alert(&self, ctx: &Context<'_>, input: CreateAlertInput) -> Result<Alert> {
        principal(ctx)?;
        if input.source_ip.trim().is_empty() || input.description.trim().is_empty() {
            return Err(resolver_error(AppError::validation(
                "sourceIp and description are required",
            )));
        }

        let collaborators = ctx.data::<Collaborators>()?;
        let alert = call(
            ctx,
            "data_store",
            collaborators.data.create_alert(NewAlert {
                severity: input.severity,
                kind: input.kind,
                source_ip: input.source_ip,
                destination_ip: input.destination_ip,
                description: input.description,
            }),
        )
        .await?;

        ctx.data::<EventHub>()?
            .publish(GatewayEvent::AlertCreated(alert.clone()));
        Ok(alert)
    }

    async fn update_alert(
        &self,
        ctx: &Context<'_>,
        id: Uuid,
        input: UpdateAlertInput,
    ) -> Result<Alert> {
        principal(ctx)?;
        let collaborators = ctx.data::<Collaborators>()?;
        let patch = AlertPatch {
            status: input.status,
            notes: input.notes,
        };

        call(ctx, "data_store", collaborators.data.update_alert(id, patch))
            .await?
            .ok_or_else(|| resolver_error(AppError::not_found("alert")))
    }

    async fn delete_alert(&self, ctx: &Context<'_>, id: Uuid) -> Result<bool> {
        principal(ctx)?;
        let collaborators = ctx.data::<Collaborators>()?;
        call(ctx, "data_store", collaborators.data.delete_alert(id)).await
    }

    async fn add_firewall_rule(
        &self,
        ctx: &Context<'_>,
        input: FirewallRuleInput,
    ) -> Result<FirewallRule> {
        admin(ctx)?;
        let collaborators = ctx.data::<Collaborators>()?;
        let rule = call(
            ctx,
            "data_store",
            collaborators.data.add_firewall_rule(NewFirewallRule {
                action: input.action,
                source_ip: input.source_ip,
                port: input.port,
                protocol: input.protocol,
                description: input.description,
            }),
        )
        .await?;

        ctx.data::<EventHub>()?
            .publish(GatewayEvent::FirewallRuleAdded(rule.clone()));
        Ok(rule)
    }

    async fn delete_firewall_rule(&self, ctx: &Context<'_>, id: Uuid) -> Result<bool> {
        admin(ctx)?;
        let collaborators = ctx.data::<Collaborators>()?;
        call(ctx, "data_store", collaborators.data.delete_firewall_rule(id)).await
    }

    async fn start_monitoring(
        &self,
        ctx: &Context<'_>,
        interface: String,
    ) -> Result<MonitoringStatus> {
        admin(ctx)?;
        let collaborators = ctx.data::<Collaborators>()?;
        let status = call(
            ctx,
            "capture_engine",
            collaborators.capture.start_monitoring(&interface),
        )
        .await?;

        ctx.data::<EventHub>()?
            .publish(GatewayEvent::MonitoringChanged(status.clone()));
        Ok(status)
    }

    async fn stop_monitoring(&self, ctx: &Context<'_>) -> Result<MonitoringStatus> {
        admin(ctx)?;
        let collaborators = ctx.data::<Collaborators>()?;
        let status = call(ctx, "capture_engine", collaborators.capture.stop_monitoring()).await?;

        ctx.data::<EventHub>()?
            .publish(GatewayEvent::MonitoringChanged(status.clone()));
        Ok(status)
    }
}

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    async fn alert_created(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = Alert>> {
        principal(ctx)?;
        let events = BroadcastStream::new(ctx.data::<EventHub>()?.subscribe());

        Ok(events.filter_map(|event| async move {
            match event {
                Ok(GatewayEvent::AlertCreated(alert)) => Some(alert),
                _ => None,
            }
        }))
    }

    async fn monitoring_changed(
        &self,
        ctx: &Context<'_>,
    ) -> Result<impl Stream<Item = MonitoringStatus>> {
        principal(ctx)?;
        let events = BroadcastStream::new(ctx.data::<EventHub>()?.subscribe());

        Ok(events.filter_map(|event| async move {
            match event {
                Ok(GatewayEvent::MonitoringChanged(status)) => Some(status),
                _ => None,
            }
        }))
    }
}
