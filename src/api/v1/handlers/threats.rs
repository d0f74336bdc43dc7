use axum::{Json, extract::State, http::StatusCode};
use tracing::info;
use uuid::Uuid;

use crate::api::v1::dto::pagination::{Listed, PageQuery};
use crate::api::v1::dto::threats::AnalyzeRequest;
use crate::api::v1::extractors::{ApiJson, ApiPath, ApiQuery, Ctx};
use crate::error::AppError;
use crate::services::collaborators::model::{AnalysisHandle, Threat};
use crate::state::AppState;

pub async fn list_threats(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Listed<Threat>>, AppError> {
    let page = ctx
        .bounded("data_store", state.collaborators.data.list_threats(query.request()))
        .await?;
    Ok(Json(Listed::new("threats", page)))
}

pub async fn get_threat(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Threat>, AppError> {
    ctx.bounded("data_store", state.collaborators.data.get_threat(id))
        .await?
        .map(Json)
        .ok_or(AppError::not_found("threat"))
}

/// Hands the sample to the analysis engine; the verdict arrives later.
pub async fn analyze(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiJson(req): ApiJson<AnalyzeRequest>,
) -> Result<(StatusCode, Json<AnalysisHandle>), AppError> {
    let sample = req.into_sample().map_err(AppError::validation)?;
    let bytes = sample.data.len();

    let handle = ctx
        .bounded("analysis_engine", state.collaborators.analysis.submit(sample))
        .await?;

    info!(
        request_id = %ctx.request_id,
        analysis_id = %handle.analysis_id,
        bytes,
        "sample submitted for analysis"
    );
    Ok((StatusCode::ACCEPTED, Json(handle)))
}
