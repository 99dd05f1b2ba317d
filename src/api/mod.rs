// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! HTTP surface. Routes are grouped by the requirement their gate
//! enforces; the gate itself lives in [`crate::gate`] and each group gets
//! exactly one.

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    entitlement::Requirement,
    error::ErrorBody,
    gate::{gate, GateState},
    models::{
        Achievement, AdminLogEntry, AlertSignal, AvailableTicker, CycleDataPoint, DashboardLayout,
        ForecastPoint, HeatmapPoint, NewAchievement, NewSubscriptionPlan, NewTicker, OhlcCandle,
        SubscriptionPlan, Tier, User, UserAchievement, UserAlert, UserAlertPatch, UserPatch,
        UserPortfolioPosition, UserSettings, UserSettingsPatch, UserStats, UserSubscription,
        UserSubscriptionPatch, UserTrade, WebhookSecret,
    },
    state::AppState,
};

pub mod admin;
pub mod alerts;
pub mod health;
pub mod market;
pub mod plans;
pub mod portfolio;
pub mod subscriptions;
pub mod users;

pub fn router(app: AppState) -> Router {
    let guard = |requirement: Requirement| {
        middleware::from_fn_with_state(GateState::new(app.clone(), requirement), gate)
    };

    let public = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/v1/plans", get(plans::list_plans))
        .with_state(app.clone());

    let authenticated = Router::new()
        .route("/v1/me", get(users::me))
        .route(
            "/v1/me/settings",
            get(users::get_settings).patch(users::patch_settings),
        )
        .route(
            "/v1/me/layout",
            get(users::get_layout).put(users::put_layout),
        )
        .route("/v1/me/stats", get(users::get_stats))
        .route("/v1/me/achievements", get(users::list_achievements))
        .route("/v1/tickers", get(market::list_tickers))
        .route(
            "/v1/subscriptions",
            get(subscriptions::list_subscriptions).post(subscriptions::create_subscription),
        )
        .route(
            "/v1/subscriptions/{id}",
            axum::routing::patch(subscriptions::update_subscription)
                .delete(subscriptions::delete_subscription),
        )
        .layer(guard(Requirement::MinTier(Tier::Free)))
        .with_state(app.clone());

    let charts = Router::new()
        .route("/v1/market/ohlc/{symbol}", get(market::get_ohlc))
        .layer(guard(Requirement::feature("advanced-charts")))
        .with_state(app.clone());

    let heatmap = Router::new()
        .route("/v1/market/heatmap", get(market::get_heatmap))
        .layer(guard(Requirement::feature("market-heatmap")))
        .with_state(app.clone());

    let cycles = Router::new()
        .route("/v1/market/cycles", get(market::get_cycles))
        .layer(guard(Requirement::feature("cycle-analysis")))
        .with_state(app.clone());

    let forecasts = Router::new()
        .route("/v1/market/forecasts", get(market::get_forecasts))
        .layer(guard(Requirement::feature("ai-forecasts")))
        .with_state(app.clone());

    let signals = Router::new()
        .route("/v1/signals", get(market::list_signals))
        .layer(guard(Requirement::feature("trading-signals")))
        .with_state(app.clone());

    let user_alerts = Router::new()
        .route(
            "/v1/alerts",
            get(alerts::list_alerts).post(alerts::create_alert),
        )
        .route(
            "/v1/alerts/{id}",
            axum::routing::patch(alerts::update_alert).delete(alerts::delete_alert),
        )
        .layer(guard(Requirement::feature("custom-alerts")))
        .with_state(app.clone());

    let paid = Router::new()
        .route(
            "/v1/portfolio",
            get(portfolio::list_portfolio).put(portfolio::upsert_position),
        )
        .route(
            "/v1/trades",
            get(portfolio::list_trades).post(portfolio::log_trade),
        )
        .route("/v1/trades/{id}", delete(portfolio::delete_trade))
        .layer(guard(Requirement::PaymentRequired))
        .with_state(app.clone());

    let administration = Router::new()
        .route("/v1/admin/users", get(admin::list_users))
        .route("/v1/admin/users/{id}", axum::routing::patch(admin::update_user))
        .route("/v1/admin/logs", get(admin::list_logs))
        .route("/v1/admin/tickers", post(admin::create_ticker))
        .route(
            "/v1/admin/webhook-secrets/{provider}",
            put(admin::set_webhook_secret),
        )
        .route("/v1/admin/achievements", post(admin::create_achievement))
        .route("/v1/admin/plans", post(admin::create_plan))
        .layer(guard(Requirement::AdminOnly))
        .with_state(app);

    Router::new()
        .merge(public)
        .merge(authenticated)
        .merge(charts)
        .merge(heatmap)
        .merge(cycles)
        .merge(forecasts)
        .merge(signals)
        .merge(user_alerts)
        .merge(paid)
        .merge(administration)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthz,
        plans::list_plans,
        users::me,
        users::get_settings,
        users::patch_settings,
        users::get_layout,
        users::put_layout,
        users::get_stats,
        users::list_achievements,
        market::list_tickers,
        market::get_ohlc,
        market::get_heatmap,
        market::get_cycles,
        market::get_forecasts,
        market::list_signals,
        subscriptions::list_subscriptions,
        subscriptions::create_subscription,
        subscriptions::update_subscription,
        subscriptions::delete_subscription,
        alerts::list_alerts,
        alerts::create_alert,
        alerts::update_alert,
        alerts::delete_alert,
        portfolio::list_portfolio,
        portfolio::upsert_position,
        portfolio::list_trades,
        portfolio::log_trade,
        portfolio::delete_trade,
        admin::list_users,
        admin::update_user,
        admin::list_logs,
        admin::create_ticker,
        admin::set_webhook_secret,
        admin::create_achievement,
        admin::create_plan
    ),
    components(
        schemas(
            User,
            UserPatch,
            UserSettings,
            UserSettingsPatch,
            AvailableTicker,
            NewTicker,
            AlertSignal,
            OhlcCandle,
            HeatmapPoint,
            CycleDataPoint,
            ForecastPoint,
            AdminLogEntry,
            SubscriptionPlan,
            NewSubscriptionPlan,
            UserSubscription,
            UserSubscriptionPatch,
            UserTrade,
            UserPortfolioPosition,
            UserAlert,
            UserAlertPatch,
            DashboardLayout,
            WebhookSecret,
            Achievement,
            NewAchievement,
            UserAchievement,
            UserStats,
            ErrorBody,
            health::Health,
            subscriptions::CreateSubscriptionRequest,
            alerts::CreateAlertRequest,
            portfolio::UpsertPositionRequest,
            portfolio::LogTradeRequest,
            admin::SetSecretRequest
        )
    ),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Plans", description = "Public plan catalog"),
        (name = "Me", description = "The authenticated user's own data"),
        (name = "Market", description = "Tickers, candles, chart layers, signals"),
        (name = "Subscriptions", description = "Per-ticker notification subscriptions"),
        (name = "Alerts", description = "User price alerts"),
        (name = "Portfolio", description = "Positions and trade log"),
        (name = "Admin", description = "Administrative operations")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header::AUTHORIZATION, Request, StatusCode};
    use chrono::Duration;
    use tower::ServiceExt;

    use crate::auth::token;
    use crate::models::{NewUser, Role, SubscriptionStatus, UserPatch};
    use crate::storage::{MemoryStorage, Storage};

    const SECRET: &str = "router-test-secret";

    fn build() -> (Router, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::seeded());
        let router = router(AppState::new(storage.clone(), SECRET));
        (router, storage)
    }

    async fn status_of(router: Router, uri: &str, token: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn health_and_plans_are_public() {
        let (router, _) = build();
        assert_eq!(status_of(router.clone(), "/healthz", None).await, StatusCode::OK);
        assert_eq!(status_of(router, "/v1/plans", None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let (router, _) = build();
        for uri in ["/v1/me", "/v1/tickers", "/v1/signals", "/v1/admin/users"] {
            assert_eq!(
                status_of(router.clone(), uri, None).await,
                StatusCode::UNAUTHORIZED,
                "{uri}"
            );
        }
    }

    #[tokio::test]
    async fn tier_gating_across_route_groups() {
        let (router, storage) = build();
        // seeded demo user is free tier with no subscription
        let demo = storage
            .get_user_by_email("demo@marketgate.dev")
            .unwrap()
            .unwrap();
        let token = token::issue(&demo.id, SECRET, Duration::hours(1)).unwrap();

        assert_eq!(
            status_of(router.clone(), "/v1/me", Some(&token)).await,
            StatusCode::OK
        );
        assert_eq!(
            status_of(router.clone(), "/v1/signals", Some(&token)).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(router, "/v1/portfolio", Some(&token)).await,
            StatusCode::PAYMENT_REQUIRED
        );
    }

    #[tokio::test]
    async fn pro_user_passes_feature_gates_but_not_admin() {
        let (router, storage) = build();
        let pro = storage
            .get_user_by_email("pro@marketgate.dev")
            .unwrap()
            .unwrap();
        assert_eq!(pro.subscription_status, Some(SubscriptionStatus::Active));
        let token = token::issue(&pro.id, SECRET, Duration::hours(1)).unwrap();

        for uri in [
            "/v1/market/heatmap",
            "/v1/market/cycles",
            "/v1/market/forecasts",
            "/v1/signals",
            "/v1/portfolio",
        ] {
            assert_eq!(
                status_of(router.clone(), uri, Some(&token)).await,
                StatusCode::OK,
                "{uri}"
            );
        }
        assert_eq!(
            status_of(router, "/v1/admin/users", Some(&token)).await,
            StatusCode::FORBIDDEN
        );
    }

    #[tokio::test]
    async fn admin_reaches_every_group() {
        let (router, storage) = build();
        let admin = storage
            .get_user_by_email("admin@marketgate.dev")
            .unwrap()
            .unwrap();
        assert!(admin.role.is_admin());
        let token = token::issue(&admin.id, SECRET, Duration::hours(1)).unwrap();

        for uri in [
            "/v1/me",
            "/v1/market/forecasts",
            "/v1/portfolio",
            "/v1/admin/users",
            "/v1/admin/logs",
        ] {
            assert_eq!(
                status_of(router.clone(), uri, Some(&token)).await,
                StatusCode::OK,
                "{uri}"
            );
        }
    }

    #[tokio::test]
    async fn canceled_pro_is_locked_out_of_features() {
        let (router, storage) = build();
        let user = storage
            .create_user(NewUser {
                email: "lapsed@example.com".into(),
                role: Some(Role::User),
                tier: Some(crate::models::Tier::Pro),
            })
            .unwrap();
        storage
            .update_user(
                &user.id,
                UserPatch {
                    subscription_status: Some(SubscriptionStatus::Canceled),
                    ..Default::default()
                },
            )
            .unwrap();
        let token = token::issue(&user.id, SECRET, Duration::hours(1)).unwrap();

        assert_eq!(
            status_of(router.clone(), "/v1/signals", Some(&token)).await,
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(router, "/v1/portfolio", Some(&token)).await,
            StatusCode::PAYMENT_REQUIRED
        );
    }
}
