// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! Per-ticker notification subscriptions (distinct from billing tier).
//!
//! A user may hold several subscriptions to the same ticker: each row
//! carries its own delivery-channel configuration.

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
    models::{NewUserSubscription, UserSubscription, UserSubscriptionPatch},
    state::AppState,
};

/// Creation payload; the user id comes from the authenticated identity,
/// never from the body.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateSubscriptionRequest {
    pub ticker_symbol: String,
    #[serde(default)]
    pub max_alerts_per_day: Option<i64>,
    #[serde(default)]
    pub delivery_channel: Option<String>,
}

#[utoipa::path(
    get,
    path = "/v1/subscriptions",
    tag = "Subscriptions",
    responses((status = 200, body = [UserSubscription]))
)]
pub async fn list_subscriptions(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserSubscription>>, ApiError> {
    Ok(Json(state.storage.list_user_subscriptions(&user.id)?))
}

#[utoipa::path(
    post,
    path = "/v1/subscriptions",
    tag = "Subscriptions",
    request_body = CreateSubscriptionRequest,
    responses((status = 201, body = UserSubscription), (status = 404, description = "Unknown ticker"))
)]
pub async fn create_subscription(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<UserSubscription>), ApiError> {
    if state.storage.get_ticker(&request.ticker_symbol)?.is_none() {
        return Err(ApiError::not_found("Unknown ticker"));
    }
    let subscription = state.storage.create_user_subscription(NewUserSubscription {
        user_id: user.id,
        ticker_symbol: request.ticker_symbol,
        max_alerts_per_day: request.max_alerts_per_day,
        is_active: None,
        delivery_channel: request.delivery_channel,
    })?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

#[utoipa::path(
    patch,
    path = "/v1/subscriptions/{id}",
    params(("id" = String, Path, description = "Subscription id")),
    tag = "Subscriptions",
    request_body = UserSubscriptionPatch,
    responses((status = 200, body = UserSubscription), (status = 404))
)]
pub async fn update_subscription(
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(patch): Json<UserSubscriptionPatch>,
) -> Result<Json<UserSubscription>, ApiError> {
    owned_subscription(&state, &user.id, &id)?;
    state
        .storage
        .update_user_subscription(&id, patch)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Subscription not found"))
}

#[utoipa::path(
    delete,
    path = "/v1/subscriptions/{id}",
    params(("id" = String, Path, description = "Subscription id")),
    tag = "Subscriptions",
    responses((status = 204), (status = 404))
)]
pub async fn delete_subscription(
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    owned_subscription(&state, &user.id, &id)?;
    if state.storage.delete_user_subscription(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Subscription not found"))
    }
}

/// A subscription id outside the caller's own rows reads as absent.
fn owned_subscription(state: &AppState, user_id: &str, id: &str) -> Result<(), ApiError> {
    let owned = state
        .storage
        .list_user_subscriptions(user_id)?
        .iter()
        .any(|s| s.id == id);
    if owned {
        Ok(())
    } else {
        Err(ApiError::not_found("Subscription not found"))
    }
}
