use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::api::v1::extractors::{ApiQuery, Ctx};
use crate::error::AppError;
use crate::services::collaborators::model::DashboardStats;
use crate::state::AppState;

const DEFAULT_ACTIVITY: usize = 10;
const MAX_ACTIVITY: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

pub async fn stats(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> Result<Json<Value>, AppError> {
    let collaborators = &state.collaborators;
    let (counters, network, monitoring) = tokio::try_join!(
        ctx.bounded("data_store", collaborators.data.counters()),
        ctx.bounded("capture_engine", collaborators.capture.stats()),
        ctx.bounded("capture_engine", collaborators.capture.monitoring_status()),
    )?;

    let stats = DashboardStats::compose(counters, &network, monitoring.is_running);
    Ok(Json(json!({ "stats": stats })))
}

pub async fn recent_activity(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiQuery(query): ApiQuery<ActivityQuery>,
) -> Result<Json<Value>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY).clamp(1, MAX_ACTIVITY);
    let activities = ctx
        .bounded("data_store", state.collaborators.data.recent_activity(limit))
        .await?;
    Ok(Json(json!({ "activities": activities })))
}
