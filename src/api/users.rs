// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! The `/v1/me` surface: the authenticated user's own profile, settings,
//! dashboard layout, stats, and achievement progress.

use axum::{extract::State, Json};

use crate::{
    error::ApiError,
    gate::CurrentUser,
    models::{
        DashboardLayout, NewUserSettings, User, UserAchievement, UserSettings, UserSettingsPatch,
        UserStats,
    },
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/v1/me",
    tag = "Me",
    responses((status = 200, body = User), (status = 401, description = "Not authenticated"))
)]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

#[utoipa::path(
    get,
    path = "/v1/me/settings",
    tag = "Me",
    responses((status = 200, body = UserSettings))
)]
pub async fn get_settings(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UserSettings>, ApiError> {
    // settings materialize with defaults on first read
    let settings = match state.storage.get_user_settings(&user.id)? {
        Some(settings) => settings,
        None => state.storage.create_user_settings(NewUserSettings {
            user_id: user.id.clone(),
            ..Default::default()
        })?,
    };
    Ok(Json(settings))
}

#[utoipa::path(
    patch,
    path = "/v1/me/settings",
    tag = "Me",
    request_body = UserSettingsPatch,
    responses((status = 200, body = UserSettings))
)]
pub async fn patch_settings(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(patch): Json<UserSettingsPatch>,
) -> Result<Json<UserSettings>, ApiError> {
    if state.storage.get_user_settings(&user.id)?.is_none() {
        state.storage.create_user_settings(NewUserSettings {
            user_id: user.id.clone(),
            ..Default::default()
        })?;
    }
    let settings = state
        .storage
        .update_user_settings(&user.id, patch)?
        .ok_or_else(|| ApiError::not_found("Settings not found"))?;
    Ok(Json(settings))
}

#[utoipa::path(
    get,
    path = "/v1/me/layout",
    tag = "Me",
    responses((status = 200, body = DashboardLayout), (status = 404, description = "No saved layout"))
)]
pub async fn get_layout(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<DashboardLayout>, ApiError> {
    state
        .storage
        .get_dashboard_layout(&user.id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No saved layout"))
}

#[utoipa::path(
    put,
    path = "/v1/me/layout",
    tag = "Me",
    request_body = Object,
    responses((status = 200, body = DashboardLayout))
)]
pub async fn put_layout(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(layout): Json<serde_json::Value>,
) -> Result<Json<DashboardLayout>, ApiError> {
    Ok(Json(state.storage.save_dashboard_layout(&user.id, layout)?))
}

#[utoipa::path(
    get,
    path = "/v1/me/stats",
    tag = "Me",
    responses((status = 200, body = UserStats))
)]
pub async fn get_stats(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UserStats>, ApiError> {
    let stats = match state.storage.get_user_stats(&user.id)? {
        Some(stats) => stats,
        None => state.storage.create_user_stats(&user.id)?,
    };
    Ok(Json(stats))
}

#[utoipa::path(
    get,
    path = "/v1/me/achievements",
    tag = "Me",
    responses((status = 200, body = [UserAchievement]))
)]
pub async fn list_achievements(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserAchievement>>, ApiError> {
    Ok(Json(state.storage.list_user_achievements(&user.id)?))
}
