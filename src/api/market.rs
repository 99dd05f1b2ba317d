// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! Market data reads: tickers, cached OHLC, chart layers, and the signal
//! feed. All read-only; ingestion happens through the admin surface and
//! external pipelines.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::ApiError,
    models::{
        AlertSignal, AvailableTicker, CycleDataPoint, ForecastPoint, HeatmapPoint, OhlcCandle,
    },
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/v1/tickers",
    tag = "Market",
    responses((status = 200, body = [AvailableTicker]))
)]
pub async fn list_tickers(
    State(state): State<AppState>,
) -> Result<Json<Vec<AvailableTicker>>, ApiError> {
    Ok(Json(state.storage.list_tickers()?))
}

#[derive(Deserialize, IntoParams)]
pub struct OhlcQuery {
    /// Candle interval, e.g. `1h` or `1d`.
    #[serde(default = "default_interval")]
    pub interval: String,
    /// Maximum number of candles, newest first.
    #[serde(default)]
    pub limit: Option<usize>,
}

fn default_interval() -> String {
    "1d".to_string()
}

#[utoipa::path(
    get,
    path = "/v1/market/ohlc/{symbol}",
    params(
        ("symbol" = String, Path, description = "Ticker symbol"),
        OhlcQuery
    ),
    tag = "Market",
    responses((status = 200, body = [OhlcCandle]))
)]
pub async fn get_ohlc(
    Path(symbol): Path<String>,
    Query(params): Query<OhlcQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<OhlcCandle>>, ApiError> {
    Ok(Json(
        state.storage.get_ohlc(&symbol, &params.interval, params.limit)?,
    ))
}

#[utoipa::path(
    get,
    path = "/v1/market/heatmap",
    tag = "Market",
    responses((status = 200, body = [HeatmapPoint]))
)]
pub async fn get_heatmap(
    State(state): State<AppState>,
) -> Result<Json<Vec<HeatmapPoint>>, ApiError> {
    Ok(Json(state.storage.get_heatmap()?))
}

#[utoipa::path(
    get,
    path = "/v1/market/cycles",
    tag = "Market",
    responses((status = 200, body = [CycleDataPoint]))
)]
pub async fn get_cycles(
    State(state): State<AppState>,
) -> Result<Json<Vec<CycleDataPoint>>, ApiError> {
    Ok(Json(state.storage.get_cycle_data()?))
}

#[utoipa::path(
    get,
    path = "/v1/market/forecasts",
    tag = "Market",
    responses((status = 200, body = [ForecastPoint]))
)]
pub async fn get_forecasts(
    State(state): State<AppState>,
) -> Result<Json<Vec<ForecastPoint>>, ApiError> {
    Ok(Json(state.storage.get_forecasts()?))
}

#[derive(Deserialize, IntoParams)]
pub struct SignalQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

#[utoipa::path(
    get,
    path = "/v1/signals",
    params(SignalQuery),
    tag = "Market",
    responses((status = 200, body = [AlertSignal]))
)]
pub async fn list_signals(
    Query(params): Query<SignalQuery>,
    State(state): State<AppState>,
) -> Result<Json<Vec<AlertSignal>>, ApiError> {
    Ok(Json(state.storage.list_signals(params.limit)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn seeded_tickers_list_alphabetically() {
        let state = AppState::new(Arc::new(MemoryStorage::seeded()), "secret");
        let Json(tickers) = list_tickers(State(state)).await.unwrap();
        let symbols: Vec<&str> = tickers.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"]);
    }

    #[tokio::test]
    async fn ohlc_defaults_to_daily_interval() {
        let state = AppState::new(Arc::new(MemoryStorage::new()), "secret");
        let Json(candles) = get_ohlc(
            Path("BTCUSDT".into()),
            Query(OhlcQuery {
                interval: default_interval(),
                limit: None,
            }),
            State(state),
        )
        .await
        .unwrap();
        assert!(candles.is_empty());
    }
}
