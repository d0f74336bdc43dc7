/*
 * Responsibility
 * - /network: interface listing, live stats (any caller)
 * - monitor/start, monitor/stop (admin), published as monitoring_changed events
 */
use axum::{Json, extract::State};
use serde_json::{Value, json};
use tracing::info;

use crate::api::v1::dto::network::StartMonitoringRequest;
use crate::api::v1::extractors::{ApiJson, Ctx};
use crate::error::AppError;
use crate::services::collaborators::model::MonitoringStatus;
use crate::services::events::GatewayEvent;
use crate::state::AppState;

pub async fn list_interfaces(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> Result<Json<Value>, AppError> {
    let interfaces = ctx
        .bounded("capture_engine", state.collaborators.capture.interfaces())
        .await?;
    Ok(Json(json!({ "interfaces": interfaces })))
}

pub async fn network_stats(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> Result<Json<Value>, AppError> {
    let capture = &state.collaborators.capture;
    let (stats, monitoring) = tokio::try_join!(
        ctx.bounded("capture_engine", capture.stats()),
        ctx.bounded("capture_engine", capture.monitoring_status()),
    )?;
    Ok(Json(json!({ "stats": stats, "monitoring": monitoring })))
}

pub async fn start_monitoring(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiJson(req): ApiJson<StartMonitoringRequest>,
) -> Result<Json<MonitoringStatus>, AppError> {
    let admin = ctx.require_admin()?;
    req.validate().map_err(AppError::validation)?;

    let status = ctx
        .bounded(
            "capture_engine",
            state
                .collaborators
                .capture
                .start_monitoring(req.interface.trim()),
        )
        .await?;

    info!(
        request_id = %ctx.request_id,
        by = %admin.subject_id,
        interface = req.interface.trim(),
        "monitoring started"
    );
    state
        .events
        .publish(GatewayEvent::MonitoringChanged(status.clone()));
    Ok(Json(status))
}

pub async fn stop_monitoring(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> Result<Json<MonitoringStatus>, AppError> {
    let admin = ctx.require_admin()?;

    let status = ctx
        .bounded("capture_engine", state.collaborators.capture.stop_monitoring())
        .await?;

    info!(request_id = %ctx.request_id, by = %admin.subject_id, "monitoring stopped");
    state
        .events
        .publish(GatewayEvent::MonitoringChanged(status.clone()));
    Ok(Json(status))
}
