/*
 * Responsibility
 * - /users handler
 * - list / delete: admin only; get / update: the user themself or an admin
 * - Only admins may change a role
 * - Deleting a user or changing their role withdraws their outstanding tokens
 */
use axum::{Json, extract::State};
use tracing::info;
use uuid::Uuid;

use crate::api::v1::dto::pagination::{Deleted, Listed, PageQuery};
use crate::api::v1::dto::users::{UpdateUserRequest, UserResponse};
use crate::api::v1::extractors::{ApiJson, ApiPath, ApiQuery, Ctx};
use crate::error::AppError;
use crate::state::AppState;

pub async fn list_users(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiQuery(query): ApiQuery<PageQuery>,
) -> Result<Json<Listed<UserResponse>>, AppError> {
    ctx.require_admin()?;

    let page = ctx
        .bounded("data_store", state.collaborators.data.list_users(query.request()))
        .await?;
    Ok(Json(Listed::new("users", page).map(UserResponse::from)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<UserResponse>, AppError> {
    if !ctx.principal()?.can_act_on(user_id) {
        return Err(AppError::Forbidden);
    }

    ctx.bounded("data_store", state.collaborators.data.get_user(user_id))
        .await?
        .map(|u| Json(u.into()))
        .ok_or(AppError::not_found("user"))
}

pub async fn update_user(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let principal = ctx.principal()?;
    if !principal.can_act_on(user_id) {
        return Err(AppError::Forbidden);
    }
    if req.role.is_some() && !principal.is_admin() {
        return Err(AppError::Forbidden);
    }
    req.validate().map_err(AppError::validation)?;

    let prior_role = match req.role {
        Some(_) => ctx
            .bounded("data_store", state.collaborators.data.get_user(user_id))
            .await?
            .map(|u| u.role),
        None => None,
    };

    let user = ctx
        .bounded(
            "data_store",
            state
                .collaborators
                .data
                .update_user(user_id, req.into_patch()),
        )
        .await?
        .ok_or(AppError::not_found("user"))?;

    if prior_role.is_some_and(|role| role != user.role) {
        state.tokens.revoke_subject(user.id).await?;
    }

    info!(request_id = %ctx.request_id, user_id = %user.id, "user updated");
    Ok(Json(user.into()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<Deleted>, AppError> {
    let admin = ctx.require_admin()?;
    if admin.subject_id == user_id {
        return Err(AppError::validation("admins cannot delete themselves"));
    }

    let deleted = ctx
        .bounded("data_store", state.collaborators.data.delete_user(user_id))
        .await?;
    if !deleted {
        return Err(AppError::not_found("user"));
    }
    state.tokens.revoke_subject(user_id).await?;

    info!(request_id = %ctx.request_id, user_id = %user_id, by = %admin.subject_id, "user deleted");
    Ok(Json(Deleted {
        id: user_id,
        message: "user deleted",
    }))
}
