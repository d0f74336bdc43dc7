/*
 * Responsibility
 * - /alerts CRUD handler
 * - Query/Path/Json through the Api* extractors, DTO validation -> DataStore
 * - New alerts are published to the event hub (WebSocket, GraphQL subscriptions)
 */
use axum::{Json, extract::State, http::StatusCode};
use uuid::Uuid;

use crate::api::v1::dto::alerts::{AlertListQuery, CreateAlertRequest, UpdateAlertRequest};
use crate::api::v1::dto::pagination::{Deleted, Listed};
use crate::api::v1::extractors::{ApiJson, ApiPath, ApiQuery, Authenticated, Ctx};
use crate::error::AppError;
use crate::services::collaborators::model::Alert;
use crate::services::events::GatewayEvent;
use crate::state::AppState;

pub async fn list_alerts(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiQuery(query): ApiQuery<AlertListQuery>,
) -> Result<Json<Listed<Alert>>, AppError> {
    let filter = query.filter().map_err(AppError::validation)?;
    let page = ctx
        .bounded(
            "data_store",
            state
                .collaborators
                .data
                .list_alerts(filter, query.page_request()),
        )
        .await?;

    Ok(Json(Listed::new("alerts", page)))
}

pub async fn get_alert(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Alert>, AppError> {
    ctx.bounded("data_store", state.collaborators.data.get_alert(id))
        .await?
        .map(Json)
        .ok_or(AppError::not_found("alert"))
}

pub async fn create_alert(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Authenticated(principal): Authenticated,
    ApiJson(req): ApiJson<CreateAlertRequest>,
) -> Result<(StatusCode, Json<Alert>), AppError> {
    let new_alert = req.into_new_alert().map_err(AppError::validation)?;
    let alert = ctx
        .bounded("data_store", state.collaborators.data.create_alert(new_alert))
        .await?;

    tracing::info!(
        request_id = %ctx.request_id,
        alert_id = %alert.id,
        created_by = %principal.subject_id,
        severity = %alert.severity,
        "alert created"
    );
    state.events.publish(GatewayEvent::AlertCreated(alert.clone()));

    Ok((StatusCode::CREATED, Json(alert)))
}

pub async fn update_alert(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateAlertRequest>,
) -> Result<Json<Alert>, AppError> {
    let patch = req.into_patch().map_err(AppError::validation)?;

    ctx.bounded("data_store", state.collaborators.data.update_alert(id, patch))
        .await?
        .map(Json)
        .ok_or(AppError::not_found("alert"))
}

pub async fn delete_alert(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Deleted>, AppError> {
    let deleted = ctx
        .bounded("data_store", state.collaborators.data.delete_alert(id))
        .await?;

    if deleted {
        Ok(Json(Deleted {
            id,
            message: "alert deleted",
        }))
    } else {
        Err(AppError::not_found("alert"))
    }
}
