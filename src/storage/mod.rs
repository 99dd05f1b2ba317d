// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! # Storage Abstraction
//!
//! One capability-complete interface over every persisted entity, with two
//! interchangeable implementations:
//!
//! - [`DurableStorage`] — embedded redb database (pure Rust, ACID)
//! - [`MemoryStorage`] — in-process substitute, seeded with demo content
//!
//! Both backends must behave observably identically (same fields, same
//! absent/present semantics) apart from id formats. The shared contract:
//!
//! 1. Creating an entity with unspecified optional fields populates the
//!    documented defaults.
//! 2. `update_*` on a missing key returns `Ok(None)`; it never errors and
//!    never creates. `delete_*` on a missing key returns `Ok(false)`.
//! 3. The composite-key upserts (`upsert_portfolio_position`,
//!    `upsert_trading_settings`) are atomic from the caller's point of view:
//!    no duplicate rows, no observable intermediate state.
//! 4. Timestamps are assigned by the storage layer; only signal and
//!    admin-log event times may be caller-supplied (default "now").
//! 5. Durable reads against optional tables that do not exist yet (webhook
//!    secrets, achievements, user subscriptions, OHLC cache) return empty
//!    results; write failures always propagate.
//!
//! Backend selection happens once at process start via [`select_backend`];
//! the chosen handle is injected explicitly into `AppState`. There is no
//! mid-request fallback from durable to in-memory.

pub mod durable;
pub mod memory;

pub use durable::DurableStorage;
pub use memory::MemoryStorage;

use std::sync::Arc;

use crate::config::Config;
use crate::models::*;

// =============================================================================
// Error Type
// =============================================================================

/// Storage-layer failure. Surfaces to the request gate as a 500-class
/// outcome, distinct from the 401/402/403 authorization outcomes.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("email already in use: {0}")]
    DuplicateEmail(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Storage Trait
// =============================================================================

/// The seam between the entitlement core (and the rest of the platform) and
/// persistence. Methods are synchronous: the workload is low-volume
/// administrative/CRUD traffic, and redb round trips are bounded local I/O.
pub trait Storage: Send + Sync {
    // -------------------------------------------------------------------------
    // Identities
    // -------------------------------------------------------------------------

    fn get_user(&self, id: &str) -> StorageResult<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>>;
    /// Assigns id and timestamps; defaults role = user, tier = free,
    /// active = true. Emails are unique: a taken address is
    /// [`StorageError::DuplicateEmail`].
    fn create_user(&self, new: NewUser) -> StorageResult<User>;
    /// Merges set fields and refreshes the updated timestamp. Changing the
    /// email to another user's address is [`StorageError::DuplicateEmail`].
    fn update_user(&self, id: &str, patch: UserPatch) -> StorageResult<Option<User>>;
    /// Most-recent-first.
    fn list_users(&self, limit: Option<usize>) -> StorageResult<Vec<User>>;

    // -------------------------------------------------------------------------
    // User Settings
    // -------------------------------------------------------------------------

    fn get_user_settings(&self, user_id: &str) -> StorageResult<Option<UserSettings>>;
    fn create_user_settings(&self, new: NewUserSettings) -> StorageResult<UserSettings>;
    fn update_user_settings(
        &self,
        user_id: &str,
        patch: UserSettingsPatch,
    ) -> StorageResult<Option<UserSettings>>;

    // -------------------------------------------------------------------------
    // Tickers
    // -------------------------------------------------------------------------

    /// Alphabetical by symbol.
    fn list_tickers(&self) -> StorageResult<Vec<AvailableTicker>>;
    fn get_ticker(&self, symbol: &str) -> StorageResult<Option<AvailableTicker>>;
    fn create_ticker(&self, new: NewTicker) -> StorageResult<AvailableTicker>;
    fn update_ticker(
        &self,
        symbol: &str,
        patch: TickerPatch,
    ) -> StorageResult<Option<AvailableTicker>>;

    // -------------------------------------------------------------------------
    // Alert Signals
    // -------------------------------------------------------------------------

    fn create_signal(&self, new: NewAlertSignal) -> StorageResult<AlertSignal>;
    /// Most-recent-first by event time.
    fn list_signals(&self, limit: Option<usize>) -> StorageResult<Vec<AlertSignal>>;

    // -------------------------------------------------------------------------
    // OHLC Cache (lenient read)
    // -------------------------------------------------------------------------

    fn save_ohlc(&self, batch: Vec<NewOhlcCandle>) -> StorageResult<()>;
    /// Most-recent-first for one (symbol, interval) series.
    fn get_ohlc(
        &self,
        symbol: &str,
        interval: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<OhlcCandle>>;

    // -------------------------------------------------------------------------
    // Chart Layers
    // -------------------------------------------------------------------------

    /// Replaces the whole heatmap layer.
    fn save_heatmap(&self, points: Vec<NewHeatmapPoint>) -> StorageResult<()>;
    fn get_heatmap(&self) -> StorageResult<Vec<HeatmapPoint>>;
    /// Replaces the whole cycle overlay.
    fn save_cycle_data(&self, points: Vec<NewCycleDataPoint>) -> StorageResult<()>;
    fn get_cycle_data(&self) -> StorageResult<Vec<CycleDataPoint>>;
    /// Replaces the whole forecast overlay.
    fn save_forecasts(&self, points: Vec<NewForecastPoint>) -> StorageResult<()>;
    fn get_forecasts(&self) -> StorageResult<Vec<ForecastPoint>>;

    // -------------------------------------------------------------------------
    // Admin Log
    // -------------------------------------------------------------------------

    fn log_admin_action(&self, new: NewAdminLogEntry) -> StorageResult<AdminLogEntry>;
    /// Most-recent-first by event time.
    fn list_admin_log(&self, limit: Option<usize>) -> StorageResult<Vec<AdminLogEntry>>;

    // -------------------------------------------------------------------------
    // Subscription Plans
    // -------------------------------------------------------------------------

    fn list_plans(&self) -> StorageResult<Vec<SubscriptionPlan>>;
    fn get_plan(&self, id: &str) -> StorageResult<Option<SubscriptionPlan>>;
    fn create_plan(&self, new: NewSubscriptionPlan) -> StorageResult<SubscriptionPlan>;
    fn update_plan(
        &self,
        id: &str,
        patch: SubscriptionPlanPatch,
    ) -> StorageResult<Option<SubscriptionPlan>>;

    // -------------------------------------------------------------------------
    // Ticker Subscriptions (lenient read)
    // -------------------------------------------------------------------------

    /// Defaults: max_alerts_per_day = 50, active = true. Does not dedupe
    /// on (user, ticker); repeated creates yield separate rows.
    fn create_user_subscription(&self, new: NewUserSubscription)
        -> StorageResult<UserSubscription>;
    fn list_user_subscriptions(&self, user_id: &str) -> StorageResult<Vec<UserSubscription>>;
    fn update_user_subscription(
        &self,
        id: &str,
        patch: UserSubscriptionPatch,
    ) -> StorageResult<Option<UserSubscription>>;
    fn delete_user_subscription(&self, id: &str) -> StorageResult<bool>;

    // -------------------------------------------------------------------------
    // Trades
    // -------------------------------------------------------------------------

    fn create_trade(&self, new: NewUserTrade) -> StorageResult<UserTrade>;
    /// Most-recent-first by execution time.
    fn list_trades(&self, user_id: &str, limit: Option<usize>) -> StorageResult<Vec<UserTrade>>;
    fn delete_trade(&self, id: &str) -> StorageResult<bool>;

    // -------------------------------------------------------------------------
    // Portfolio
    // -------------------------------------------------------------------------

    fn list_portfolio(&self, user_id: &str) -> StorageResult<Vec<UserPortfolioPosition>>;
    /// Atomic get-or-create keyed by (user, ticker): updates the existing
    /// row, or creates one seeded with the patch merged onto zero-value
    /// defaults. Exactly one row per composite key, always.
    fn upsert_portfolio_position(
        &self,
        user_id: &str,
        ticker_symbol: &str,
        patch: PortfolioPositionPatch,
    ) -> StorageResult<UserPortfolioPosition>;
    fn delete_portfolio_position(&self, user_id: &str, ticker_symbol: &str)
        -> StorageResult<bool>;

    // -------------------------------------------------------------------------
    // Trading Settings
    // -------------------------------------------------------------------------

    fn get_trading_settings(&self, user_id: &str) -> StorageResult<Option<TradingSettings>>;
    /// Atomic get-or-create keyed by user.
    fn upsert_trading_settings(
        &self,
        user_id: &str,
        patch: TradingSettingsPatch,
    ) -> StorageResult<TradingSettings>;

    // -------------------------------------------------------------------------
    // User Alerts
    // -------------------------------------------------------------------------

    fn create_alert(&self, new: NewUserAlert) -> StorageResult<UserAlert>;
    /// Most-recent-first.
    fn list_alerts(&self, user_id: &str) -> StorageResult<Vec<UserAlert>>;
    fn update_alert(&self, id: &str, patch: UserAlertPatch) -> StorageResult<Option<UserAlert>>;
    fn delete_alert(&self, id: &str) -> StorageResult<bool>;

    // -------------------------------------------------------------------------
    // Dashboard Layout
    // -------------------------------------------------------------------------

    fn get_dashboard_layout(&self, user_id: &str) -> StorageResult<Option<DashboardLayout>>;
    /// Per-user upsert of the whole layout document.
    fn save_dashboard_layout(
        &self,
        user_id: &str,
        layout: serde_json::Value,
    ) -> StorageResult<DashboardLayout>;

    // -------------------------------------------------------------------------
    // Webhook Secrets (lenient read)
    // -------------------------------------------------------------------------

    fn get_webhook_secret(&self, provider: &str) -> StorageResult<Option<WebhookSecret>>;
    /// Per-provider upsert.
    fn set_webhook_secret(&self, provider: &str, secret: &str) -> StorageResult<WebhookSecret>;

    // -------------------------------------------------------------------------
    // Achievements (lenient reads)
    // -------------------------------------------------------------------------

    fn list_achievements(&self) -> StorageResult<Vec<Achievement>>;
    fn create_achievement(&self, new: NewAchievement) -> StorageResult<Achievement>;
    fn list_user_achievements(&self, user_id: &str) -> StorageResult<Vec<UserAchievement>>;
    fn create_user_achievement(&self, new: NewUserAchievement) -> StorageResult<UserAchievement>;
    fn update_user_achievement(
        &self,
        id: &str,
        patch: UserAchievementPatch,
    ) -> StorageResult<Option<UserAchievement>>;

    // -------------------------------------------------------------------------
    // User Stats
    // -------------------------------------------------------------------------

    fn get_user_stats(&self, user_id: &str) -> StorageResult<Option<UserStats>>;
    fn create_user_stats(&self, user_id: &str) -> StorageResult<UserStats>;
    fn update_user_stats(
        &self,
        user_id: &str,
        patch: UserStatsPatch,
    ) -> StorageResult<Option<UserStats>>;
}

// =============================================================================
// Backend Selection
// =============================================================================

/// Pick the storage backend, once, at process start.
///
/// `DATABASE_PATH` set and openable selects the durable backend; otherwise
/// (unset, or the open fails) the in-memory backend is used, seeded with
/// demo content so the system is usable without a durable store attached.
pub fn select_backend(config: &Config) -> Arc<dyn Storage> {
    match &config.database_path {
        Some(path) => match DurableStorage::open(path) {
            Ok(db) => {
                tracing::info!(path = %path.display(), "Using durable storage backend");
                Arc::new(db)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to open durable storage, falling back to in-memory backend"
                );
                Arc::new(MemoryStorage::seeded())
            }
        },
        None => {
            tracing::info!("DATABASE_PATH not set, using in-memory storage backend");
            Arc::new(MemoryStorage::seeded())
        }
    }
}

// =============================================================================
// Parity Suite
// =============================================================================

// The same operation sequences must produce observably identical results on
// both backends. Each case below runs once against MemoryStorage and once
// against DurableStorage on a temp file.
#[cfg(test)]
mod parity_tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn backends() -> Vec<(&'static str, Box<dyn Storage>, Option<tempfile::TempDir>)> {
        let dir = tempfile::tempdir().expect("temp dir");
        let durable = DurableStorage::open(&dir.path().join("parity.redb")).expect("open redb");
        vec![
            ("memory", Box::new(MemoryStorage::new()), None),
            ("durable", Box::new(durable), Some(dir)),
        ]
    }

    fn for_each_backend(check: impl Fn(&str, &dyn Storage)) {
        for (name, storage, _guard) in backends() {
            check(name, storage.as_ref());
        }
    }

    #[test]
    fn create_user_applies_defaults() {
        for_each_backend(|name, s| {
            let user = s
                .create_user(NewUser {
                    email: "alice@example.com".into(),
                    role: None,
                    tier: None,
                })
                .unwrap();
            assert_eq!(user.role, Role::User, "{name}");
            assert_eq!(user.tier, Tier::Free, "{name}");
            assert!(user.is_active, "{name}");
            assert!(user.subscription_status.is_none(), "{name}");

            let by_id = s.get_user(&user.id).unwrap().unwrap();
            let by_email = s.get_user_by_email("alice@example.com").unwrap().unwrap();
            assert_eq!(by_id, user, "{name}");
            assert_eq!(by_email, user, "{name}");
        });
    }

    #[test]
    fn update_user_merges_and_refreshes_timestamp() {
        for_each_backend(|name, s| {
            let user = s
                .create_user(NewUser {
                    email: "bob@example.com".into(),
                    role: None,
                    tier: None,
                })
                .unwrap();

            let updated = s
                .update_user(
                    &user.id,
                    UserPatch {
                        tier: Some(Tier::Premium),
                        subscription_status: Some(SubscriptionStatus::Active),
                        ..Default::default()
                    },
                )
                .unwrap()
                .unwrap();

            assert_eq!(updated.tier, Tier::Premium, "{name}");
            assert_eq!(
                updated.subscription_status,
                Some(SubscriptionStatus::Active),
                "{name}"
            );
            // untouched fields survive the merge
            assert_eq!(updated.email, "bob@example.com", "{name}");
            assert_eq!(updated.role, Role::User, "{name}");
            assert!(updated.updated_at >= user.updated_at, "{name}");
        });
    }

    #[test]
    fn duplicate_email_rejected_on_create_and_patch() {
        for_each_backend(|name, s| {
            let first = s
                .create_user(NewUser {
                    email: "taken@example.com".into(),
                    role: None,
                    tier: None,
                })
                .unwrap();
            let second = s
                .create_user(NewUser {
                    email: "other@example.com".into(),
                    role: None,
                    tier: None,
                })
                .unwrap();

            let duplicate = s.create_user(NewUser {
                email: "taken@example.com".into(),
                role: None,
                tier: None,
            });
            assert!(
                matches!(duplicate, Err(StorageError::DuplicateEmail(_))),
                "{name}"
            );

            let stolen = s.update_user(
                &second.id,
                UserPatch {
                    email: Some("taken@example.com".into()),
                    ..Default::default()
                },
            );
            assert!(
                matches!(stolen, Err(StorageError::DuplicateEmail(_))),
                "{name}"
            );

            // the address still resolves to its original holder
            let holder = s.get_user_by_email("taken@example.com").unwrap().unwrap();
            assert_eq!(holder.id, first.id, "{name}");
            // the rejected patch left the second user untouched
            let untouched = s.get_user(&second.id).unwrap().unwrap();
            assert_eq!(untouched.email, "other@example.com", "{name}");

            // re-asserting your own address is not a conflict
            let unchanged = s
                .update_user(
                    &first.id,
                    UserPatch {
                        email: Some("taken@example.com".into()),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert!(unchanged.is_some(), "{name}");
        });
    }

    #[test]
    fn update_missing_user_returns_absent() {
        for_each_backend(|name, s| {
            let result = s
                .update_user(
                    "no-such-id",
                    UserPatch {
                        tier: Some(Tier::Pro),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert!(result.is_none(), "{name}");
            // and it did not silently create anything
            assert!(s.get_user("no-such-id").unwrap().is_none(), "{name}");
        });
    }

    #[test]
    fn tickers_list_alphabetically() {
        for_each_backend(|name, s| {
            for symbol in ["ETHUSDT", "BTCUSDT", "SOLUSDT"] {
                s.create_ticker(NewTicker {
                    symbol: symbol.into(),
                    name: symbol.into(),
                    exchange: None,
                    is_enabled: None,
                })
                .unwrap();
            }
            let symbols: Vec<String> = s
                .list_tickers()
                .unwrap()
                .into_iter()
                .map(|t| t.symbol)
                .collect();
            assert_eq!(symbols, vec!["BTCUSDT", "ETHUSDT", "SOLUSDT"], "{name}");
        });
    }

    #[test]
    fn signals_honor_caller_timestamp_and_order_by_recency() {
        for_each_backend(|name, s| {
            let backdated = Utc::now() - Duration::hours(6);
            s.create_signal(NewAlertSignal {
                ticker_symbol: "BTCUSDT".into(),
                signal_type: "buy".into(),
                price: 64000.0,
                note: None,
                timestamp: Some(backdated),
            })
            .unwrap();
            s.create_signal(NewAlertSignal {
                ticker_symbol: "ETHUSDT".into(),
                signal_type: "sell".into(),
                price: 3400.0,
                note: None,
                timestamp: None,
            })
            .unwrap();

            let signals = s.list_signals(None).unwrap();
            assert_eq!(signals.len(), 2, "{name}");
            // the backdated event sorts behind the fresh one
            assert_eq!(signals[0].ticker_symbol, "ETHUSDT", "{name}");
            assert_eq!(signals[1].timestamp, backdated, "{name}");

            let limited = s.list_signals(Some(1)).unwrap();
            assert_eq!(limited.len(), 1, "{name}");
            assert_eq!(limited[0].ticker_symbol, "ETHUSDT", "{name}");
        });
    }

    #[test]
    fn user_subscription_defaults_and_duplicates() {
        for_each_backend(|name, s| {
            // Two creates with no delete between them yield two distinct rows.
            let first = s
                .create_user_subscription(NewUserSubscription {
                    user_id: "u1".into(),
                    ticker_symbol: "BTCUSDT".into(),
                    max_alerts_per_day: None,
                    is_active: None,
                    delivery_channel: None,
                })
                .unwrap();
            let second = s
                .create_user_subscription(NewUserSubscription {
                    user_id: "u1".into(),
                    ticker_symbol: "BTCUSDT".into(),
                    max_alerts_per_day: Some(10),
                    is_active: None,
                    delivery_channel: Some("email".into()),
                })
                .unwrap();

            assert_eq!(first.max_alerts_per_day, 50, "{name}");
            assert!(first.is_active, "{name}");
            assert_ne!(first.id, second.id, "{name}");

            let subs = s.list_user_subscriptions("u1").unwrap();
            assert_eq!(subs.len(), 2, "{name}");
        });
    }

    #[test]
    fn user_subscription_update_and_delete_absent_semantics() {
        for_each_backend(|name, s| {
            let sub = s
                .create_user_subscription(NewUserSubscription {
                    user_id: "u2".into(),
                    ticker_symbol: "ETHUSDT".into(),
                    max_alerts_per_day: None,
                    is_active: None,
                    delivery_channel: None,
                })
                .unwrap();

            let updated = s
                .update_user_subscription(
                    &sub.id,
                    UserSubscriptionPatch {
                        max_alerts_per_day: Some(5),
                        ..Default::default()
                    },
                )
                .unwrap()
                .unwrap();
            assert_eq!(updated.max_alerts_per_day, 5, "{name}");
            assert!(updated.is_active, "{name}");

            assert!(
                s.update_user_subscription(
                    "missing",
                    UserSubscriptionPatch::default()
                )
                .unwrap()
                .is_none(),
                "{name}"
            );
            assert!(s.delete_user_subscription(&sub.id).unwrap(), "{name}");
            assert!(!s.delete_user_subscription(&sub.id).unwrap(), "{name}");
        });
    }

    #[test]
    fn portfolio_upsert_creates_then_merges() {
        for_each_backend(|name, s| {
            // first upsert against a missing composite key creates with
            // zero-value defaults plus the patch
            let created = s
                .upsert_portfolio_position(
                    "u1",
                    "BTCUSDT",
                    PortfolioPositionPatch {
                        quantity: Some(0.5),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(created.quantity, 0.5, "{name}");
            assert_eq!(created.avg_entry_price, 0.0, "{name}");
            assert_eq!(created.realized_pnl, 0.0, "{name}");

            // second upsert merges onto the existing row
            let merged = s
                .upsert_portfolio_position(
                    "u1",
                    "BTCUSDT",
                    PortfolioPositionPatch {
                        avg_entry_price: Some(61000.0),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(merged.id, created.id, "{name}");
            assert_eq!(merged.quantity, 0.5, "{name}");
            assert_eq!(merged.avg_entry_price, 61000.0, "{name}");

            let positions = s.list_portfolio("u1").unwrap();
            assert_eq!(positions.len(), 1, "{name}");

            assert!(s.delete_portfolio_position("u1", "BTCUSDT").unwrap(), "{name}");
            assert!(
                !s.delete_portfolio_position("u1", "BTCUSDT").unwrap(),
                "{name}"
            );
        });
    }

    #[test]
    fn trading_settings_upsert_defaults() {
        for_each_backend(|name, s| {
            assert!(s.get_trading_settings("u1").unwrap().is_none(), "{name}");

            let created = s
                .upsert_trading_settings(
                    "u1",
                    TradingSettingsPatch {
                        risk_per_trade_pct: Some(1.5),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(created.max_position_size, 0.0, "{name}");
            assert_eq!(created.risk_per_trade_pct, 1.5, "{name}");
            assert!(!created.auto_trading_enabled, "{name}");

            let merged = s
                .upsert_trading_settings(
                    "u1",
                    TradingSettingsPatch {
                        auto_trading_enabled: Some(true),
                        ..Default::default()
                    },
                )
                .unwrap();
            assert_eq!(merged.id, created.id, "{name}");
            assert_eq!(merged.risk_per_trade_pct, 1.5, "{name}");
            assert!(merged.auto_trading_enabled, "{name}");
        });
    }

    #[test]
    fn trades_order_by_execution_time() {
        for_each_backend(|name, s| {
            let older = Utc::now() - Duration::days(1);
            s.create_trade(NewUserTrade {
                user_id: "u1".into(),
                ticker_symbol: "BTCUSDT".into(),
                side: "buy".into(),
                quantity: 1.0,
                price: 60000.0,
                executed_at: Some(older),
            })
            .unwrap();
            s.create_trade(NewUserTrade {
                user_id: "u1".into(),
                ticker_symbol: "ETHUSDT".into(),
                side: "sell".into(),
                quantity: 2.0,
                price: 3300.0,
                executed_at: None,
            })
            .unwrap();

            let trades = s.list_trades("u1", None).unwrap();
            assert_eq!(trades.len(), 2, "{name}");
            assert_eq!(trades[0].ticker_symbol, "ETHUSDT", "{name}");
            assert_eq!(trades[1].executed_at, older, "{name}");
        });
    }

    #[test]
    fn alerts_crud_round() {
        for_each_backend(|name, s| {
            let alert = s
                .create_alert(NewUserAlert {
                    user_id: "u1".into(),
                    ticker_symbol: "BTCUSDT".into(),
                    condition: "above".into(),
                    threshold: 70000.0,
                    is_active: None,
                })
                .unwrap();
            assert!(alert.is_active, "{name}");
            assert!(alert.triggered_at.is_none(), "{name}");

            let updated = s
                .update_alert(
                    &alert.id,
                    UserAlertPatch {
                        threshold: Some(72000.0),
                        ..Default::default()
                    },
                )
                .unwrap()
                .unwrap();
            assert_eq!(updated.threshold, 72000.0, "{name}");
            assert_eq!(updated.condition, "above", "{name}");

            assert!(s.update_alert("missing", UserAlertPatch::default()).unwrap().is_none());
            assert_eq!(s.list_alerts("u1").unwrap().len(), 1, "{name}");
            assert!(s.delete_alert(&alert.id).unwrap(), "{name}");
            assert!(!s.delete_alert(&alert.id).unwrap(), "{name}");
        });
    }

    #[test]
    fn dashboard_layout_upserts_per_user() {
        for_each_backend(|name, s| {
            assert!(s.get_dashboard_layout("u1").unwrap().is_none(), "{name}");

            let v1 = s
                .save_dashboard_layout("u1", serde_json::json!({"widgets": ["chart"]}))
                .unwrap();
            let v2 = s
                .save_dashboard_layout("u1", serde_json::json!({"widgets": ["chart", "heatmap"]}))
                .unwrap();
            assert_eq!(v1.id, v2.id, "{name}");
            assert_eq!(
                s.get_dashboard_layout("u1").unwrap().unwrap().layout["widgets"]
                    .as_array()
                    .unwrap()
                    .len(),
                2,
                "{name}"
            );
        });
    }

    #[test]
    fn webhook_secret_set_overwrites() {
        for_each_backend(|name, s| {
            assert!(s.get_webhook_secret("stripe").unwrap().is_none(), "{name}");
            s.set_webhook_secret("stripe", "whsec_1").unwrap();
            let rotated = s.set_webhook_secret("stripe", "whsec_2").unwrap();
            assert_eq!(rotated.secret, "whsec_2", "{name}");
            assert_eq!(
                s.get_webhook_secret("stripe").unwrap().unwrap().secret,
                "whsec_2",
                "{name}"
            );
        });
    }

    #[test]
    fn achievements_and_progress() {
        for_each_backend(|name, s| {
            let achievement = s
                .create_achievement(NewAchievement {
                    code: "first-trade".into(),
                    title: "First Trade".into(),
                    description: "Log your first trade".into(),
                    threshold: 1,
                })
                .unwrap();
            assert_eq!(s.list_achievements().unwrap().len(), 1, "{name}");

            let progress = s
                .create_user_achievement(NewUserAchievement {
                    user_id: "u1".into(),
                    achievement_id: achievement.id.clone(),
                    progress: None,
                })
                .unwrap();
            assert_eq!(progress.progress, 0, "{name}");
            assert!(!progress.completed, "{name}");

            let done = s
                .update_user_achievement(
                    &progress.id,
                    UserAchievementPatch {
                        progress: Some(1),
                        completed: Some(true),
                        completed_at: Some(Utc::now()),
                    },
                )
                .unwrap()
                .unwrap();
            assert!(done.completed, "{name}");
            assert_eq!(s.list_user_achievements("u1").unwrap().len(), 1, "{name}");
        });
    }

    #[test]
    fn user_stats_counters() {
        for_each_backend(|name, s| {
            assert!(s.get_user_stats("u1").unwrap().is_none(), "{name}");
            let stats = s.create_user_stats("u1").unwrap();
            assert_eq!(stats.alerts_created, 0, "{name}");

            let updated = s
                .update_user_stats(
                    "u1",
                    UserStatsPatch {
                        logins: Some(3),
                        ..Default::default()
                    },
                )
                .unwrap()
                .unwrap();
            assert_eq!(updated.logins, 3, "{name}");
            assert_eq!(updated.trades_logged, 0, "{name}");

            assert!(
                s.update_user_stats("ghost", UserStatsPatch::default())
                    .unwrap()
                    .is_none(),
                "{name}"
            );
        });
    }

    #[test]
    fn ohlc_cache_round_trip() {
        for_each_backend(|name, s| {
            let base = Utc::now();
            let batch = (0..3)
                .map(|i| NewOhlcCandle {
                    symbol: "BTCUSDT".into(),
                    interval: "1h".into(),
                    open: 100.0 + i as f64,
                    high: 110.0,
                    low: 90.0,
                    close: 105.0,
                    volume: 12.0,
                    timestamp: base - Duration::hours(i),
                })
                .collect();
            s.save_ohlc(batch).unwrap();

            let candles = s.get_ohlc("BTCUSDT", "1h", Some(2)).unwrap();
            assert_eq!(candles.len(), 2, "{name}");
            assert!(candles[0].timestamp > candles[1].timestamp, "{name}");
            assert!(s.get_ohlc("BTCUSDT", "4h", None).unwrap().is_empty(), "{name}");
        });
    }

    #[test]
    fn chart_layers_replace_wholesale() {
        for_each_backend(|name, s| {
            let now = Utc::now();
            s.save_heatmap(vec![NewHeatmapPoint {
                symbol: "BTCUSDT".into(),
                score: 0.9,
                timestamp: now,
            }])
            .unwrap();
            s.save_heatmap(vec![
                NewHeatmapPoint {
                    symbol: "ETHUSDT".into(),
                    score: 0.4,
                    timestamp: now,
                },
                NewHeatmapPoint {
                    symbol: "SOLUSDT".into(),
                    score: 0.2,
                    timestamp: now,
                },
            ])
            .unwrap();
            let heatmap = s.get_heatmap().unwrap();
            assert_eq!(heatmap.len(), 2, "{name}");
            assert!(heatmap.iter().all(|p| p.symbol != "BTCUSDT"), "{name}");

            s.save_cycle_data(vec![NewCycleDataPoint {
                symbol: "BTCUSDT".into(),
                phase: "accumulation".into(),
                value: 0.3,
                timestamp: now,
            }])
            .unwrap();
            assert_eq!(s.get_cycle_data().unwrap().len(), 1, "{name}");

            s.save_forecasts(vec![NewForecastPoint {
                symbol: "BTCUSDT".into(),
                predicted_price: 72000.0,
                confidence: 0.65,
                model: "cycle-v2".into(),
                timestamp: now,
            }])
            .unwrap();
            assert_eq!(s.get_forecasts().unwrap().len(), 1, "{name}");
        });
    }

    #[test]
    fn admin_log_appends_with_recency_order() {
        for_each_backend(|name, s| {
            let backdated = Utc::now() - Duration::hours(2);
            s.log_admin_action(NewAdminLogEntry {
                admin_user_id: "admin1".into(),
                action: "user.update".into(),
                target: Some("u1".into()),
                detail: None,
                timestamp: Some(backdated),
            })
            .unwrap();
            s.log_admin_action(NewAdminLogEntry {
                admin_user_id: "admin1".into(),
                action: "ticker.create".into(),
                target: Some("BTCUSDT".into()),
                detail: None,
                timestamp: None,
            })
            .unwrap();

            let log = s.list_admin_log(None).unwrap();
            assert_eq!(log.len(), 2, "{name}");
            assert_eq!(log[0].action, "ticker.create", "{name}");
            assert_eq!(log[1].timestamp, backdated, "{name}");

            assert_eq!(s.list_admin_log(Some(1)).unwrap().len(), 1, "{name}");
        });
    }

    #[test]
    fn plans_crud_round() {
        for_each_backend(|name, s| {
            let plan = s
                .create_plan(NewSubscriptionPlan {
                    name: "Premium Monthly".into(),
                    tier: Tier::Premium,
                    price_cents: 2900,
                    billing_interval: None,
                    description: None,
                    is_active: None,
                })
                .unwrap();
            assert_eq!(plan.billing_interval, "month", "{name}");
            assert!(plan.is_active, "{name}");

            let updated = s
                .update_plan(
                    &plan.id,
                    SubscriptionPlanPatch {
                        price_cents: Some(3400),
                        ..Default::default()
                    },
                )
                .unwrap()
                .unwrap();
            assert_eq!(updated.price_cents, 3400, "{name}");
            assert_eq!(updated.tier, Tier::Premium, "{name}");

            assert!(s.get_plan(&plan.id).unwrap().is_some(), "{name}");
            assert!(s.get_plan("missing").unwrap().is_none(), "{name}");
            assert_eq!(s.list_plans().unwrap().len(), 1, "{name}");
        });
    }

    #[test]
    fn settings_absent_update_and_merge() {
        for_each_backend(|name, s| {
            assert!(
                s.update_user_settings("ghost", UserSettingsPatch::default())
                    .unwrap()
                    .is_none(),
                "{name}"
            );

            let settings = s
                .create_user_settings(NewUserSettings {
                    user_id: "u1".into(),
                    theme: None,
                    default_ticker: None,
                    chart_interval: None,
                    notifications_enabled: None,
                })
                .unwrap();
            assert_eq!(settings.theme, "dark", "{name}");
            assert_eq!(settings.default_ticker, "BTCUSDT", "{name}");
            assert_eq!(settings.chart_interval, "1d", "{name}");
            assert!(settings.notifications_enabled, "{name}");

            let updated = s
                .update_user_settings(
                    "u1",
                    UserSettingsPatch {
                        theme: Some("light".into()),
                        ..Default::default()
                    },
                )
                .unwrap()
                .unwrap();
            assert_eq!(updated.theme, "light", "{name}");
            assert_eq!(updated.default_ticker, "BTCUSDT", "{name}");
        });
    }
}
