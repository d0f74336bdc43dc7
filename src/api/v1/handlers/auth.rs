/*
 * Responsibility
 * - /auth: login, register, refresh, logout
 * - Public routes: the admission chain does not authenticate them, logout checks its
 *   own bearer (signature only, so logging out twice is harmless)
 */
use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use tracing::info;

use crate::api::v1::dto::auth::{
    LoginRequest, LoginResponse, LogoutRequest, LogoutResponse, RefreshRequest, RegisterRequest,
    RegisterResponse, TokenResponse,
};
use crate::api::v1::extractors::{ApiJson, Ctx};
use crate::error::AppError;
use crate::middleware::auth::bearer_token;
use crate::services::auth::Role;
use crate::services::collaborators::model::NewUser;
use crate::state::AppState;

pub async fn login(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    req.validate().map_err(AppError::validation)?;

    let user = ctx
        .bounded(
            "data_store",
            state
                .collaborators
                .data
                .verify_credentials(req.email.trim(), &req.password),
        )
        .await?
        .ok_or(AppError::Unauthorized("invalid credentials"))?;

    let pair = state.tokens.issue(user.id, user.role).await?;
    info!(request_id = %ctx.request_id, user_id = %user.id, "login succeeded");

    Ok(Json(LoginResponse {
        tokens: TokenResponse::from(pair),
        user: user.into(),
    }))
}

pub async fn register(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    req.validate().map_err(AppError::validation)?;

    let user = ctx
        .bounded(
            "data_store",
            state.collaborators.data.create_user(NewUser {
                email: req.email.trim().to_string(),
                name: req.name.trim().to_string(),
                password: req.password,
                role: Role::User,
            }),
        )
        .await?;
    info!(request_id = %ctx.request_id, user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            message: "user registered",
        }),
    ))
}

pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RefreshRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    if req.refresh_token.is_empty() {
        return Err(AppError::validation("refresh_token is required"));
    }

    let pair = state.tokens.refresh(&req.refresh_token).await?;
    Ok(Json(pair.into()))
}

pub async fn logout(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<LogoutResponse>, AppError> {
    let token = bearer_token(&headers)?.ok_or(AppError::Unauthorized("missing bearer token"))?;
    let claims = state.tokens.inspect(token)?;

    // The body is optional, so it is parsed by hand rather than through ApiJson.
    let req = if body.iter().all(u8::is_ascii_whitespace) {
        LogoutRequest::default()
    } else {
        serde_json::from_slice::<LogoutRequest>(&body)
            .map_err(|e| AppError::validation(format!("invalid logout body: {e}")))?
    };

    state
        .tokens
        .revoke_until(claims.token_id()?, claims.expires_at()?);

    if let Some(refresh_token) = req.refresh_token.filter(|t| !t.is_empty()) {
        let was_outstanding = state.tokens.revoke_refresh(&refresh_token).await?;
        info!(request_id = %ctx.request_id, was_outstanding, "refresh token dropped");
    }

    info!(request_id = %ctx.request_id, subject = %claims.sub, "logged out");
    Ok(Json(LogoutResponse {
        message: "logged out",
    }))
}
