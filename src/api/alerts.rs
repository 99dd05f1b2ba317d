// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! User price alerts (the custom-alerts feature surface).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    gate::CurrentUser,
    models::{NewUserAlert, UserAlert, UserAlertPatch, UserStatsPatch},
    state::AppState,
};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertRequest {
    pub ticker_symbol: String,
    /// `above` or `below`.
    pub condition: String,
    pub threshold: f64,
}

#[utoipa::path(
    get,
    path = "/v1/alerts",
    tag = "Alerts",
    responses((status = 200, body = [UserAlert]))
)]
pub async fn list_alerts(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserAlert>>, ApiError> {
    Ok(Json(state.storage.list_alerts(&user.id)?))
}

#[utoipa::path(
    post,
    path = "/v1/alerts",
    tag = "Alerts",
    request_body = CreateAlertRequest,
    responses((status = 201, body = UserAlert))
)]
pub async fn create_alert(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateAlertRequest>,
) -> Result<(StatusCode, Json<UserAlert>), ApiError> {
    if state.storage.get_ticker(&request.ticker_symbol)?.is_none() {
        return Err(ApiError::not_found("Unknown ticker"));
    }
    let alert = state.storage.create_alert(NewUserAlert {
        user_id: user.id.clone(),
        ticker_symbol: request.ticker_symbol,
        condition: request.condition,
        threshold: request.threshold,
        is_active: None,
    })?;
    bump_alert_counter(&state, &user.id)?;
    Ok((StatusCode::CREATED, Json(alert)))
}

#[utoipa::path(
    patch,
    path = "/v1/alerts/{id}",
    params(("id" = String, Path, description = "Alert id")),
    tag = "Alerts",
    request_body = UserAlertPatch,
    responses((status = 200, body = UserAlert), (status = 404))
)]
pub async fn update_alert(
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(patch): Json<UserAlertPatch>,
) -> Result<Json<UserAlert>, ApiError> {
    owned_alert(&state, &user.id, &id)?;
    state
        .storage
        .update_alert(&id, patch)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Alert not found"))
}

#[utoipa::path(
    delete,
    path = "/v1/alerts/{id}",
    params(("id" = String, Path, description = "Alert id")),
    tag = "Alerts",
    responses((status = 204), (status = 404))
)]
pub async fn delete_alert(
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    owned_alert(&state, &user.id, &id)?;
    if state.storage.delete_alert(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Alert not found"))
    }
}

fn owned_alert(state: &AppState, user_id: &str, id: &str) -> Result<(), ApiError> {
    let owned = state.storage.list_alerts(user_id)?.iter().any(|a| a.id == id);
    if owned {
        Ok(())
    } else {
        Err(ApiError::not_found("Alert not found"))
    }
}

fn bump_alert_counter(state: &AppState, user_id: &str) -> Result<(), ApiError> {
    let stats = match state.storage.get_user_stats(user_id)? {
        Some(stats) => stats,
        None => state.storage.create_user_stats(user_id)?,
    };
    state.storage.update_user_stats(
        user_id,
        UserStatsPatch {
            alerts_created: Some(stats.alerts_created + 1),
            ..Default::default()
        },
    )?;
    Ok(())
}
