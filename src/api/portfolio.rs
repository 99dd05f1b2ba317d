// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! Portfolio positions and trade log (the payment-gated surface).

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
        NewUserTrade, PortfolioPositionPatch, UserPortfolioPosition, UserStatsPatch, UserTrade,
    },
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/v1/portfolio",
    tag = "Portfolio",
    responses((status = 200, body = [UserPortfolioPosition]))
)]
pub async fn list_portfolio(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserPortfolioPosition>>, ApiError> {
    Ok(Json(state.storage.list_portfolio(&user.id)?))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertPositionRequest {
    pub ticker_symbol: String,
    #[serde(flatten)]
    pub patch: PortfolioPositionPatch,
}

#[utoipa::path(
    put,
    path = "/v1/portfolio",
    tag = "Portfolio",
    request_body = UpsertPositionRequest,
    responses((status = 200, body = UserPortfolioPosition))
)]
pub async fn upsert_position(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<UpsertPositionRequest>,
) -> Result<Json<UserPortfolioPosition>, ApiError> {
    Ok(Json(state.storage.upsert_portfolio_position(
        &user.id,
        &request.ticker_symbol,
        request.patch,
    )?))
}

#[derive(Deserialize, IntoParams)]
pub struct TradeQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/v1/trades",
    params(TradeQuery),
    tag = "Portfolio",
    responses((status = 200, body = [UserTrade]))
)]
pub async fn list_trades(
    CurrentUser(user): CurrentUser,
    Query(params): Query<TradeQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserTrade>>, ApiError> {
    Ok(Json(state.storage.list_trades(&user.id, params.limit)?))
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogTradeRequest {
    pub ticker_symbol: String,
    /// `buy` or `sell`.
    pub side: String,
    pub quantity: f64,
    pub price: f64,
    #[serde(default)]
    pub executed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[utoipa::path(
    post,
    path = "/v1/trades",
    tag = "Portfolio",
    request_body = LogTradeRequest,
    responses((status = 201, body = UserTrade))
)]
pub async fn log_trade(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<LogTradeRequest>,
) -> Result<(StatusCode, Json<UserTrade>), ApiError> {
    let trade = state.storage.create_trade(NewUserTrade {
        user_id: user.id.clone(),
        ticker_symbol: request.ticker_symbol,
        side: request.side,
        quantity: request.quantity,
        price: request.price,
        executed_at: request.executed_at,
    })?;

    let stats = match state.storage.get_user_stats(&user.id)? {
        Some(stats) => stats,
        None => state.storage.create_user_stats(&user.id)?,
    };
    state.storage.update_user_stats(
        &user.id,
        UserStatsPatch {
            trades_logged: Some(stats.trades_logged + 1),
            ..Default::default()
        },
    )?;

    Ok((StatusCode::CREATED, Json(trade)))
}

#[utoipa::path(
    delete,
    path = "/v1/trades/{id}",
    params(("id" = String, Path, description = "Trade id")),
    tag = "Portfolio",
    responses((status = 204), (status = 404))
)]
pub async fn delete_trade(
    CurrentUser(user): CurrentUser,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let owned = state
        .storage
        .list_trades(&user.id, None)?
        .iter()
        .any(|t| t.id == id);
    if !owned {
        return Err(ApiError::not_found("Trade not found"));
    }
    if state.storage.delete_trade(&id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("Trade not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::models::{NewUser, Tier, User};
    use crate::storage::{MemoryStorage, Storage};

    fn state_and_user() -> (AppState, User) {
        let storage = Arc::new(MemoryStorage::new());
        let user = storage
            .create_user(NewUser {
                email: "trader@example.com".into(),
                role: None,
                tier: Some(Tier::Basic),
            })
            .unwrap();
        (AppState::new(storage, "secret"), user)
    }

    #[tokio::test]
    async fn upsert_position_creates_then_merges() {
        let (state, user) = state_and_user();
        let Json(created) = upsert_position(
            CurrentUser(user.clone()),
            State(state.clone()),
            Json(UpsertPositionRequest {
                ticker_symbol: "BTCUSDT".into(),
                patch: PortfolioPositionPatch {
                    quantity: Some(0.25),
                    ..Default::default()
                },
            }),
        )
        .await
        .unwrap();
        assert_eq!(created.quantity, 0.25);

        let Json(merged) = upsert_position(
            CurrentUser(user.clone()),
            State(state.clone()),
            Json(UpsertPositionRequest {
                ticker_symbol: "BTCUSDT".into(),
                patch: PortfolioPositionPatch {
                    avg_entry_price: Some(64000.0),
                    ..Default::default()
                },
            }),
        )
        .await
        .unwrap();
        assert_eq!(merged.id, created.id);
        assert_eq!(merged.quantity, 0.25);

        let Json(positions) = list_portfolio(CurrentUser(user), State(state)).await.unwrap();
        assert_eq!(positions.len(), 1);
    }

    #[tokio::test]
    async fn log_trade_bumps_counter_and_lists_by_recency() {
        let (state, user) = state_and_user();
        let (status, _) = log_trade(
            CurrentUser(user.clone()),
            State(state.clone()),
            Json(LogTradeRequest {
                ticker_symbol: "BTCUSDT".into(),
                side: "buy".into(),
                quantity: 1.0,
                price: 60000.0,
                executed_at: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);

        let stats = state.storage.get_user_stats(&user.id).unwrap().unwrap();
        assert_eq!(stats.trades_logged, 1);
    }

    #[tokio::test]
    async fn delete_rejects_foreign_trade() {
        let (state, user) = state_and_user();
        let foreign = state
            .storage
            .create_trade(NewUserTrade {
                user_id: "someone-else".into(),
                ticker_symbol: "BTCUSDT".into(),
                side: "sell".into(),
                quantity: 1.0,
                price: 61000.0,
                executed_at: None,
            })
            .unwrap();

        let result = delete_trade(CurrentUser(user), Path(foreign.id), State(state)).await;
        assert!(result.is_err());
    }
}
