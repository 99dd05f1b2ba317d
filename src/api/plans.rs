// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! Public subscription-plan catalog.

use axum::{extract::State, Json};

use crate::{error::ApiError, models::SubscriptionPlan, state::AppState};

#[utoipa::path(
    get,
    path = "/v1/plans",
    tag = "Plans",
    responses((status = 200, body = [SubscriptionPlan]))
)]
pub async fn list_plans(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubscriptionPlan>>, ApiError> {
    let plans = state
        .storage
        .list_plans()?
        .into_iter()
        .filter(|p| p.is_active)
        .collect();
    Ok(Json(plans))
}
