/*
 * Responsibility
 * - /firewall/rules: list (any caller), add / delete (admin)
 */
use axum::{Json, extract::State, http::StatusCode};
use tracing::info;
use uuid::Uuid;

use crate::api::v1::dto::firewall::AddFirewallRuleRequest;
use crate::api::v1::dto::pagination::{Deleted, Listed, PageQuery};
use crate::api::v1::extractors::{ApiJson, ApiPath, ApiQuery, Ctx};
use crate::error::AppError;
use crate::services::collaborators::model::FirewallRule;
use crate::services::events::GatewayEvent;
use crate::state::AppState;

pub async fn list_rules(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Listed<FirewallRule>>, AppError> {
    let page = ctx
        .bounded(
            "data_store",
            state.collaborators.data.list_firewall_rules(query.request()),
        )
        .await?;
    Ok(Json(Listed::new("rules", page)))
}

pub async fn add_rule(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiJson(req): ApiJson<AddFirewallRuleRequest>,
) -> Result<(StatusCode, Json<FirewallRule>), AppError> {
    let admin = ctx.require_admin()?;
    let rule = req.into_new_rule().map_err(AppError::validation)?;

    let rule = ctx
        .bounded("data_store", state.collaborators.data.add_firewall_rule(rule))
        .await?;

    info!(
        request_id = %ctx.request_id,
        rule_id = %rule.id,
        by = %admin.subject_id,
        "firewall rule added"
    );
    state
        .events
        .publish(GatewayEvent::FirewallRuleAdded(rule.clone()));
    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn delete_rule(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Deleted>, AppError> {
    let admin = ctx.require_admin()?;

    let deleted = ctx
        .bounded("data_store", state.collaborators.data.delete_firewall_rule(id))
        .await?;
    if !deleted {
        return Err(AppError::not_found("firewall rule"));
    }

    info!(request_id = %ctx.request_id, rule_id = %id, by = %admin.subject_id, "firewall rule deleted");
    Ok(Json(Deleted {
        id,
        message: "firewall rule deleted",
    }))
}
