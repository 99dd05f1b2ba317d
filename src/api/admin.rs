// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! Administrative surface. Every mutation appends an [`AdminLogEntry`]
//! naming the acting admin, so the audit trail is written where the
//! change happens.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::ApiError,
    gate::CurrentUser,
    models::{
        Achievement, AdminLogEntry, AvailableTicker, NewAchievement, NewAdminLogEntry, NewTicker,
        NewSubscriptionPlan, SubscriptionPlan, User, UserPatch, WebhookSecret,
    },
    state::AppState,
};

#[derive(Deserialize, IntoParams)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

fn audit(
    state: &AppState,
    admin: &User,
    action: &str,
    target: Option<String>,
    detail: Option<String>,
) -> Result<(), ApiError> {
    state.storage.log_admin_action(NewAdminLogEntry {
        admin_user_id: admin.id.clone(),
        action: action.to_string(),
        target,
        detail,
        timestamp: None,
    })?;
    Ok(())
}

// =============================================================================
// Users
// =============================================================================

#[utoipa::path(
    get,
    path = "/v1/admin/users",
    params(ListQuery),
    tag = "Admin",
    responses((status = 200, body = [User]))
)]
pub async fn list_users(
    CurrentUser(_admin): CurrentUser,
    Query(params): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.storage.list_users(params.limit)?))
}

#[utoipa::path(
    patch,
    path = "/v1/admin/users/{id}",
    params(("id" = String, Path, description = "User id")),
    tag = "Admin",
    request_body = UserPatch,
    responses((status = 200, body = User), (status = 404))
)]
pub async fn update_user(
    CurrentUser(admin): CurrentUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(patch): Json<UserPatch>,
) -> Result<Json<User>, ApiError> {
    let updated = state
        .storage
        .update_user(&id, patch)?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    audit(&state, &admin, "user.update", Some(id), None)?;
    Ok(Json(updated))
}

// =============================================================================
// Audit Log
// =============================================================================

#[utoipa::path(
    get,
    path = "/v1/admin/logs",
    params(ListQuery),
    tag = "Admin",
    responses((status = 200, body = [AdminLogEntry]))
)]
pub async fn list_logs(
    CurrentUser(_admin): CurrentUser,
    Query(params): Query<ListQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminLogEntry>>, ApiError> {
    Ok(Json(state.storage.list_admin_log(params.limit)?))
}

// =============================================================================
// Tickers
// =============================================================================

#[utoipa::path(
    post,
    path = "/v1/admin/tickers",
    tag = "Admin",
    request_body = NewTicker,
    responses((status = 201, body = AvailableTicker), (status = 409, description = "Symbol exists"))
)]
pub async fn create_ticker(
    CurrentUser(admin): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<NewTicker>,
) -> Result<(StatusCode, Json<AvailableTicker>), ApiError> {
    if state.storage.get_ticker(&request.symbol)?.is_some() {
        return Err(ApiError::new(
            StatusCode::CONFLICT,
            "TICKER_EXISTS",
            "Ticker symbol already exists",
        ));
    }
    let ticker = state.storage.create_ticker(request)?;
    audit(
        &state,
        &admin,
        "ticker.create",
        Some(ticker.symbol.clone()),
        None,
    )?;
    Ok((StatusCode::CREATED, Json(ticker)))
}

// =============================================================================
// Webhook Secrets
// =============================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetSecretRequest {
    pub secret: String,
}

#[utoipa::path(
    put,
    path = "/v1/admin/webhook-secrets/{provider}",
    params(("provider" = String, Path, description = "Payment provider name")),
    tag = "Admin",
    request_body = SetSecretRequest,
    responses((status = 200, body = WebhookSecret))
)]
pub async fn set_webhook_secret(
    CurrentUser(admin): CurrentUser,
    Path(provider): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<SetSecretRequest>,
) -> Result<Json<WebhookSecret>, ApiError> {
    let secret = state
        .storage
        .set_webhook_secret(&provider, &request.secret)?;
    // the secret value itself never reaches the audit log
    audit(&state, &admin, "webhook_secret.set", Some(provider), None)?;
    Ok(Json(secret))
}

// =============================================================================
// Achievements & Plans
// =============================================================================

#[utoipa::path(
    post,
    path = "/v1/admin/achievements",
    tag = "Admin",
    request_body = NewAchievement,
    responses((status = 201, body = Achievement))
)]
pub async fn create_achievement(
    CurrentUser(admin): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<NewAchievement>,
) -> Result<(StatusCode, Json<Achievement>), ApiError> {
    let achievement = state.storage.create_achievement(request)?;
    audit(
        &state,
        &admin,
        "achievement.create",
        Some(achievement.code.clone()),
        None,
    )?;
    Ok((StatusCode::CREATED, Json(achievement)))
}

#[utoipa::path(
    post,
    path = "/v1/admin/plans",
    tag = "Admin",
    request_body = NewSubscriptionPlan,
    responses((status = 201, body = SubscriptionPlan))
)]
pub async fn create_plan(
    CurrentUser(admin): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<NewSubscriptionPlan>,
) -> Result<(StatusCode, Json<SubscriptionPlan>), ApiError> {
    let plan = state.storage.create_plan(request)?;
    audit(&state, &admin, "plan.create", Some(plan.id.clone()), None)?;
    Ok((StatusCode::CREATED, Json(plan)))
}
