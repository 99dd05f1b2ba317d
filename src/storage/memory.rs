// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! In-memory storage backend.
//!
//! A first-class, fully contract-conformant implementation, not a mock: the
//! whole test suite (and a dev process started without `DATABASE_PATH`) runs
//! against it. Each entity collection sits behind its own mutex; the
//! workload is low-volume CRUD, and a per-collection mutex is what the
//! atomic get-or-create contract needs.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use uuid::Uuid;

use super::{Storage, StorageError, StorageResult};
use crate::models::*;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().expect("storage collection mutex poisoned")
}

fn position_key(user_id: &str, ticker_symbol: &str) -> String {
    format!("{user_id}|{ticker_symbol}")
}

/// In-process substitute for the durable backend.
#[derive(Default)]
pub struct MemoryStorage {
    users: Mutex<HashMap<String, User>>,
    settings: Mutex<HashMap<String, UserSettings>>, // keyed by user_id
    tickers: Mutex<HashMap<String, AvailableTicker>>, // keyed by symbol
    signals: Mutex<Vec<AlertSignal>>,
    ohlc: Mutex<Vec<OhlcCandle>>,
    heatmap: Mutex<Vec<HeatmapPoint>>,
    cycles: Mutex<Vec<CycleDataPoint>>,
    forecasts: Mutex<Vec<ForecastPoint>>,
    admin_log: Mutex<Vec<AdminLogEntry>>,
    plans: Mutex<HashMap<String, SubscriptionPlan>>,
    subscriptions: Mutex<HashMap<String, UserSubscription>>,
    trades: Mutex<HashMap<String, UserTrade>>,
    positions: Mutex<HashMap<String, UserPortfolioPosition>>, // keyed by user|ticker
    trading_settings: Mutex<HashMap<String, TradingSettings>>, // keyed by user_id
    alerts: Mutex<HashMap<String, UserAlert>>,
    layouts: Mutex<HashMap<String, DashboardLayout>>, // keyed by user_id
    webhook_secrets: Mutex<HashMap<String, WebhookSecret>>, // keyed by provider
    achievements: Mutex<HashMap<String, Achievement>>,
    user_achievements: Mutex<HashMap<String, UserAchievement>>,
    user_stats: Mutex<HashMap<String, UserStats>>, // keyed by user_id
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// An instance pre-populated with demo identities and content, so the
    /// system is usable without a durable store attached.
    pub fn seeded() -> Self {
        let storage = Self::new();

        let admin = storage
            .create_user(NewUser {
                email: "admin@marketgate.dev".into(),
                role: Some(Role::Admin),
                tier: None,
            })
            .expect("seed admin");
        let _ = storage.create_user(NewUser {
            email: "demo@marketgate.dev".into(),
            role: None,
            tier: None,
        });
        let pro = storage
            .create_user(NewUser {
                email: "pro@marketgate.dev".into(),
                role: None,
                tier: Some(Tier::Pro),
            })
            .expect("seed pro user");
        let _ = storage.update_user(
            &pro.id,
            UserPatch {
                subscription_status: Some(SubscriptionStatus::Active),
                ..Default::default()
            },
        );

        for (symbol, name) in [
            ("BTCUSDT", "Bitcoin / Tether"),
            ("ETHUSDT", "Ethereum / Tether"),
            ("SOLUSDT", "Solana / Tether"),
        ] {
            let _ = storage.create_ticker(NewTicker {
                symbol: symbol.into(),
                name: name.into(),
                exchange: Some("binance".into()),
                is_enabled: Some(true),
            });
        }

        for (name, tier, price_cents) in [
            ("Basic Monthly", Tier::Basic, 900_i64),
            ("Premium Monthly", Tier::Premium, 2900),
            ("Pro Monthly", Tier::Pro, 9900),
        ] {
            let _ = storage.create_plan(NewSubscriptionPlan {
                name: name.into(),
                tier,
                price_cents,
                billing_interval: None,
                description: None,
                is_active: None,
            });
        }

        tracing::debug!(admin_id = %admin.id, "Seeded in-memory storage with demo content");
        storage
    }
}

impl Storage for MemoryStorage {
    // -------------------------------------------------------------------------
    // Identities
    // -------------------------------------------------------------------------

    fn get_user(&self, id: &str) -> StorageResult<Option<User>> {
        Ok(lock(&self.users).get(id).cloned())
    }

    fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        Ok(lock(&self.users)
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    fn create_user(&self, new: NewUser) -> StorageResult<User> {
        let mut users = lock(&self.users);
        if users.values().any(|u| u.email == new.email) {
            return Err(StorageError::DuplicateEmail(new.email));
        }
        let now = Utc::now();
        let user = User {
            id: new_id(),
            email: new.email,
            role: new.role.unwrap_or_default(),
            tier: new.tier.unwrap_or_default(),
            subscription_status: None,
            subscription_expires_at: None,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn update_user(&self, id: &str, patch: UserPatch) -> StorageResult<Option<User>> {
        let mut users = lock(&self.users);
        if let Some(email) = &patch.email {
            if users.values().any(|u| u.email == *email && u.id != id) {
                return Err(StorageError::DuplicateEmail(email.clone()));
            }
        }
        let Some(user) = users.get_mut(id) else {
            return Ok(None);
        };
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        if let Some(tier) = patch.tier {
            user.tier = tier;
        }
        if let Some(status) = patch.subscription_status {
            user.subscription_status = Some(status);
        }
        if let Some(expires) = patch.subscription_expires_at {
            user.subscription_expires_at = Some(expires);
        }
        if let Some(active) = patch.is_active {
            user.is_active = active;
        }
        if let Some(login) = patch.last_login_at {
            user.last_login_at = Some(login);
        }
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    fn list_users(&self, limit: Option<usize>) -> StorageResult<Vec<User>> {
        let mut users: Vec<User> = lock(&self.users).values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            users.truncate(limit);
        }
        Ok(users)
    }

    // -------------------------------------------------------------------------
    // User Settings
    // -------------------------------------------------------------------------

    fn get_user_settings(&self, user_id: &str) -> StorageResult<Option<UserSettings>> {
        Ok(lock(&self.settings).get(user_id).cloned())
    }

    fn create_user_settings(&self, new: NewUserSettings) -> StorageResult<UserSettings> {
        let now = Utc::now();
        let settings = UserSettings {
            id: new_id(),
            user_id: new.user_id.clone(),
            theme: new.theme.unwrap_or_else(|| "dark".into()),
            default_ticker: new.default_ticker.unwrap_or_else(|| "BTCUSDT".into()),
            chart_interval: new.chart_interval.unwrap_or_else(|| "1d".into()),
            notifications_enabled: new.notifications_enabled.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        lock(&self.settings).insert(new.user_id, settings.clone());
        Ok(settings)
    }

    fn update_user_settings(
        &self,
        user_id: &str,
        patch: UserSettingsPatch,
    ) -> StorageResult<Option<UserSettings>> {
        let mut all = lock(&self.settings);
        let Some(settings) = all.get_mut(user_id) else {
            return Ok(None);
        };
        if let Some(theme) = patch.theme {
            settings.theme = theme;
        }
        if let Some(ticker) = patch.default_ticker {
            settings.default_ticker = ticker;
        }
        if let Some(interval) = patch.chart_interval {
            settings.chart_interval = interval;
        }
        if let Some(enabled) = patch.notifications_enabled {
            settings.notifications_enabled = enabled;
        }
        settings.updated_at = Utc::now();
        Ok(Some(settings.clone()))
    }

    // -------------------------------------------------------------------------
    // Tickers
    // -------------------------------------------------------------------------

    fn list_tickers(&self) -> StorageResult<Vec<AvailableTicker>> {
        let mut tickers: Vec<AvailableTicker> = lock(&self.tickers).values().cloned().collect();
        tickers.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(tickers)
    }

    fn get_ticker(&self, symbol: &str) -> StorageResult<Option<AvailableTicker>> {
        Ok(lock(&self.tickers).get(symbol).cloned())
    }

    fn create_ticker(&self, new: NewTicker) -> StorageResult<AvailableTicker> {
        let now = Utc::now();
        let ticker = AvailableTicker {
            id: new_id(),
            symbol: new.symbol.clone(),
            name: new.name,
            exchange: new.exchange.unwrap_or_else(|| "binance".into()),
            is_enabled: new.is_enabled.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        lock(&self.tickers).insert(new.symbol, ticker.clone());
        Ok(ticker)
    }

    fn update_ticker(
        &self,
        symbol: &str,
        patch: TickerPatch,
    ) -> StorageResult<Option<AvailableTicker>> {
        let mut tickers = lock(&self.tickers);
        let Some(ticker) = tickers.get_mut(symbol) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            ticker.name = name;
        }
        if let Some(exchange) = patch.exchange {
            ticker.exchange = exchange;
        }
        if let Some(enabled) = patch.is_enabled {
            ticker.is_enabled = enabled;
        }
        ticker.updated_at = Utc::now();
        Ok(Some(ticker.clone()))
    }

    // -------------------------------------------------------------------------
    // Alert Signals
    // -------------------------------------------------------------------------

    fn create_signal(&self, new: NewAlertSignal) -> StorageResult<AlertSignal> {
        let now = Utc::now();
        let signal = AlertSignal {
            id: new_id(),
            ticker_symbol: new.ticker_symbol,
            signal_type: new.signal_type,
            price: new.price,
            note: new.note,
            timestamp: new.timestamp.unwrap_or(now),
            created_at: now,
        };
        lock(&self.signals).push(signal.clone());
        Ok(signal)
    }

    fn list_signals(&self, limit: Option<usize>) -> StorageResult<Vec<AlertSignal>> {
        let mut signals = lock(&self.signals).clone();
        signals.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = limit {
            signals.truncate(limit);
        }
        Ok(signals)
    }

    // -------------------------------------------------------------------------
    // OHLC Cache
    // -------------------------------------------------------------------------

    fn save_ohlc(&self, batch: Vec<NewOhlcCandle>) -> StorageResult<()> {
        let now = Utc::now();
        let mut ohlc = lock(&self.ohlc);
        for candle in batch {
            ohlc.push(OhlcCandle {
                id: new_id(),
                symbol: candle.symbol,
                interval: candle.interval,
                open: candle.open,
                high: candle.high,
                low: candle.low,
                close: candle.close,
                volume: candle.volume,
                timestamp: candle.timestamp,
                created_at: now,
            });
        }
        Ok(())
    }

    fn get_ohlc(
        &self,
        symbol: &str,
        interval: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<OhlcCandle>> {
        let mut candles: Vec<OhlcCandle> = lock(&self.ohlc)
            .iter()
            .filter(|c| c.symbol == symbol && c.interval == interval)
            .cloned()
            .collect();
        candles.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = limit {
            candles.truncate(limit);
        }
        Ok(candles)
    }

    // -------------------------------------------------------------------------
    // Chart Layers
    // -------------------------------------------------------------------------

    fn save_heatmap(&self, points: Vec<NewHeatmapPoint>) -> StorageResult<()> {
        let now = Utc::now();
        let mut heatmap = lock(&self.heatmap);
        *heatmap = points
            .into_iter()
            .map(|p| HeatmapPoint {
                id: new_id(),
                symbol: p.symbol,
                score: p.score,
                timestamp: p.timestamp,
                created_at: now,
            })
            .collect();
        Ok(())
    }

    fn get_heatmap(&self) -> StorageResult<Vec<HeatmapPoint>> {
        Ok(lock(&self.heatmap).clone())
    }

    fn save_cycle_data(&self, points: Vec<NewCycleDataPoint>) -> StorageResult<()> {
        let now = Utc::now();
        let mut cycles = lock(&self.cycles);
        *cycles = points
            .into_iter()
            .map(|p| CycleDataPoint {
                id: new_id(),
                symbol: p.symbol,
                phase: p.phase,
                value: p.value,
                timestamp: p.timestamp,
                created_at: now,
            })
            .collect();
        Ok(())
    }

    fn get_cycle_data(&self) -> StorageResult<Vec<CycleDataPoint>> {
        Ok(lock(&self.cycles).clone())
    }

    fn save_forecasts(&self, points: Vec<NewForecastPoint>) -> StorageResult<()> {
        let now = Utc::now();
        let mut forecasts = lock(&self.forecasts);
        *forecasts = points
            .into_iter()
            .map(|p| ForecastPoint {
                id: new_id(),
                symbol: p.symbol,
                predicted_price: p.predicted_price,
                confidence: p.confidence,
                model: p.model,
                timestamp: p.timestamp,
                created_at: now,
            })
            .collect();
        Ok(())
    }

    fn get_forecasts(&self) -> StorageResult<Vec<ForecastPoint>> {
        Ok(lock(&self.forecasts).clone())
    }

    // -------------------------------------------------------------------------
    // Admin Log
    // -------------------------------------------------------------------------

    fn log_admin_action(&self, new: NewAdminLogEntry) -> StorageResult<AdminLogEntry> {
        let now = Utc::now();
        let entry = AdminLogEntry {
            id: new_id(),
            admin_user_id: new.admin_user_id,
            action: new.action,
            target: new.target,
            detail: new.detail,
            timestamp: new.timestamp.unwrap_or(now),
            created_at: now,
        };
        lock(&self.admin_log).push(entry.clone());
        Ok(entry)
    }

    fn list_admin_log(&self, limit: Option<usize>) -> StorageResult<Vec<AdminLogEntry>> {
        let mut entries = lock(&self.admin_log).clone();
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    // -------------------------------------------------------------------------
    // Subscription Plans
    // -------------------------------------------------------------------------

    fn list_plans(&self) -> StorageResult<Vec<SubscriptionPlan>> {
        let mut plans: Vec<SubscriptionPlan> = lock(&self.plans).values().cloned().collect();
        plans.sort_by(|a, b| a.tier.cmp(&b.tier));
        Ok(plans)
    }

    fn get_plan(&self, id: &str) -> StorageResult<Option<SubscriptionPlan>> {
        Ok(lock(&self.plans).get(id).cloned())
    }

    fn create_plan(&self, new: NewSubscriptionPlan) -> StorageResult<SubscriptionPlan> {
        let now = Utc::now();
        let plan = SubscriptionPlan {
            id: new_id(),
            name: new.name,
            tier: new.tier,
            price_cents: new.price_cents,
            billing_interval: new.billing_interval.unwrap_or_else(|| "month".into()),
            description: new.description,
            is_active: new.is_active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        };
        lock(&self.plans).insert(plan.id.clone(), plan.clone());
        Ok(plan)
    }

    fn update_plan(
        &self,
        id: &str,
        patch: SubscriptionPlanPatch,
    ) -> StorageResult<Option<SubscriptionPlan>> {
        let mut plans = lock(&self.plans);
        let Some(plan) = plans.get_mut(id) else {
            return Ok(None);
        };
        if let Some(name) = patch.name {
            plan.name = name;
        }
        if let Some(tier) = patch.tier {
            plan.tier = tier;
        }
        if let Some(price) = patch.price_cents {
            plan.price_cents = price;
        }
        if let Some(interval) = patch.billing_interval {
            plan.billing_interval = interval;
        }
        if let Some(description) = patch.description {
            plan.description = Some(description);
        }
        if let Some(active) = patch.is_active {
            plan.is_active = active;
        }
        plan.updated_at = Utc::now();
        Ok(Some(plan.clone()))
    }

    // -------------------------------------------------------------------------
    // Ticker Subscriptions
    // -------------------------------------------------------------------------

    fn create_user_subscription(
        &self,
        new: NewUserSubscription,
    ) -> StorageResult<UserSubscription> {
        let now = Utc::now();
        let sub = UserSubscription {
            id: new_id(),
            user_id: new.user_id,
            ticker_symbol: new.ticker_symbol,
            max_alerts_per_day: new.max_alerts_per_day.unwrap_or(50),
            is_active: new.is_active.unwrap_or(true),
            delivery_channel: new.delivery_channel,
            created_at: now,
            updated_at: now,
        };
        lock(&self.subscriptions).insert(sub.id.clone(), sub.clone());
        Ok(sub)
    }

    fn list_user_subscriptions(&self, user_id: &str) -> StorageResult<Vec<UserSubscription>> {
        let mut subs: Vec<UserSubscription> = lock(&self.subscriptions)
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        subs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(subs)
    }

    fn update_user_subscription(
        &self,
        id: &str,
        patch: UserSubscriptionPatch,
    ) -> StorageResult<Option<UserSubscription>> {
        let mut subs = lock(&self.subscriptions);
        let Some(sub) = subs.get_mut(id) else {
            return Ok(None);
        };
        if let Some(max) = patch.max_alerts_per_day {
            sub.max_alerts_per_day = max;
        }
        if let Some(active) = patch.is_active {
            sub.is_active = active;
        }
        if let Some(channel) = patch.delivery_channel {
            sub.delivery_channel = Some(channel);
        }
        sub.updated_at = Utc::now();
        Ok(Some(sub.clone()))
    }

    fn delete_user_subscription(&self, id: &str) -> StorageResult<bool> {
        Ok(lock(&self.subscriptions).remove(id).is_some())
    }

    // -------------------------------------------------------------------------
    // Trades
    // -------------------------------------------------------------------------

    fn create_trade(&self, new: NewUserTrade) -> StorageResult<UserTrade> {
        let now = Utc::now();
        let trade = UserTrade {
            id: new_id(),
            user_id: new.user_id,
            ticker_symbol: new.ticker_symbol,
            side: new.side,
            quantity: new.quantity,
            price: new.price,
            executed_at: new.executed_at.unwrap_or(now),
            created_at: now,
        };
        lock(&self.trades).insert(trade.id.clone(), trade.clone());
        Ok(trade)
    }

    fn list_trades(&self, user_id: &str, limit: Option<usize>) -> StorageResult<Vec<UserTrade>> {
        let mut trades: Vec<UserTrade> = lock(&self.trades)
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        trades.sort_by(|a, b| b.executed_at.cmp(&a.executed_at));
        if let Some(limit) = limit {
            trades.truncate(limit);
        }
        Ok(trades)
    }

    fn delete_trade(&self, id: &str) -> StorageResult<bool> {
        Ok(lock(&self.trades).remove(id).is_some())
    }

    // -------------------------------------------------------------------------
    // Portfolio
    // -------------------------------------------------------------------------

    fn list_portfolio(&self, user_id: &str) -> StorageResult<Vec<UserPortfolioPosition>> {
        let mut positions: Vec<UserPortfolioPosition> = lock(&self.positions)
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        positions.sort_by(|a, b| a.ticker_symbol.cmp(&b.ticker_symbol));
        Ok(positions)
    }

    fn upsert_portfolio_position(
        &self,
        user_id: &str,
        ticker_symbol: &str,
        patch: PortfolioPositionPatch,
    ) -> StorageResult<UserPortfolioPosition> {
        // Single lock scope makes the get-or-create atomic: concurrent
        // callers for the same composite key serialize here.
        let mut positions = lock(&self.positions);
        let key = position_key(user_id, ticker_symbol);
        let now = Utc::now();

        let position = positions.entry(key).or_insert_with(|| UserPortfolioPosition {
            id: new_id(),
            user_id: user_id.to_string(),
            ticker_symbol: ticker_symbol.to_string(),
            quantity: 0.0,
            avg_entry_price: 0.0,
            realized_pnl: 0.0,
            created_at: now,
            updated_at: now,
        });
        if let Some(quantity) = patch.quantity {
            position.quantity = quantity;
        }
        if let Some(price) = patch.avg_entry_price {
            position.avg_entry_price = price;
        }
        if let Some(pnl) = patch.realized_pnl {
            position.realized_pnl = pnl;
        }
        position.updated_at = now;
        Ok(position.clone())
    }

    fn delete_portfolio_position(
        &self,
        user_id: &str,
        ticker_symbol: &str,
    ) -> StorageResult<bool> {
        Ok(lock(&self.positions)
            .remove(&position_key(user_id, ticker_symbol))
            .is_some())
    }

    // -------------------------------------------------------------------------
    // Trading Settings
    // -------------------------------------------------------------------------

    fn get_trading_settings(&self, user_id: &str) -> StorageResult<Option<TradingSettings>> {
        Ok(lock(&self.trading_settings).get(user_id).cloned())
    }

    fn upsert_trading_settings(
        &self,
        user_id: &str,
        patch: TradingSettingsPatch,
    ) -> StorageResult<TradingSettings> {
        let mut all = lock(&self.trading_settings);
        let now = Utc::now();

        let settings = all.entry(user_id.to_string()).or_insert_with(|| TradingSettings {
            id: new_id(),
            user_id: user_id.to_string(),
            max_position_size: 0.0,
            risk_per_trade_pct: 0.0,
            stop_loss_pct: 0.0,
            take_profit_pct: 0.0,
            auto_trading_enabled: false,
            created_at: now,
            updated_at: now,
        });
        if let Some(size) = patch.max_position_size {
            settings.max_position_size = size;
        }
        if let Some(risk) = patch.risk_per_trade_pct {
            settings.risk_per_trade_pct = risk;
        }
        if let Some(stop) = patch.stop_loss_pct {
            settings.stop_loss_pct = stop;
        }
        if let Some(take) = patch.take_profit_pct {
            settings.take_profit_pct = take;
        }
        if let Some(auto) = patch.auto_trading_enabled {
            settings.auto_trading_enabled = auto;
        }
        settings.updated_at = now;
        Ok(settings.clone())
    }

    // -------------------------------------------------------------------------
    // User Alerts
    // -------------------------------------------------------------------------

    fn create_alert(&self, new: NewUserAlert) -> StorageResult<UserAlert> {
        let now = Utc::now();
        let alert = UserAlert {
            id: new_id(),
            user_id: new.user_id,
            ticker_symbol: new.ticker_symbol,
            condition: new.condition,
            threshold: new.threshold,
            is_active: new.is_active.unwrap_or(true),
            triggered_at: None,
            created_at: now,
            updated_at: now,
        };
        lock(&self.alerts).insert(alert.id.clone(), alert.clone());
        Ok(alert)
    }

    fn list_alerts(&self, user_id: &str) -> StorageResult<Vec<UserAlert>> {
        let mut alerts: Vec<UserAlert> = lock(&self.alerts)
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(alerts)
    }

    fn update_alert(&self, id: &str, patch: UserAlertPatch) -> StorageResult<Option<UserAlert>> {
        let mut alerts = lock(&self.alerts);
        let Some(alert) = alerts.get_mut(id) else {
            return Ok(None);
        };
        if let Some(condition) = patch.condition {
            alert.condition = condition;
        }
        if let Some(threshold) = patch.threshold {
            alert.threshold = threshold;
        }
        if let Some(active) = patch.is_active {
            alert.is_active = active;
        }
        if let Some(triggered) = patch.triggered_at {
            alert.triggered_at = Some(triggered);
        }
        alert.updated_at = Utc::now();
        Ok(Some(alert.clone()))
    }

    fn delete_alert(&self, id: &str) -> StorageResult<bool> {
        Ok(lock(&self.alerts).remove(id).is_some())
    }

    // -------------------------------------------------------------------------
    // Dashboard Layout
    // -------------------------------------------------------------------------

    fn get_dashboard_layout(&self, user_id: &str) -> StorageResult<Option<DashboardLayout>> {
        Ok(lock(&self.layouts).get(user_id).cloned())
    }

    fn save_dashboard_layout(
        &self,
        user_id: &str,
        layout: serde_json::Value,
    ) -> StorageResult<DashboardLayout> {
        let mut layouts = lock(&self.layouts);
        let now = Utc::now();
        let entry = layouts
            .entry(user_id.to_string())
            .or_insert_with(|| DashboardLayout {
                id: new_id(),
                user_id: user_id.to_string(),
                layout: serde_json::Value::Null,
                created_at: now,
                updated_at: now,
            });
        entry.layout = layout;
        entry.updated_at = now;
        Ok(entry.clone())
    }

    // -------------------------------------------------------------------------
    // Webhook Secrets
    // -------------------------------------------------------------------------

    fn get_webhook_secret(&self, provider: &str) -> StorageResult<Option<WebhookSecret>> {
        Ok(lock(&self.webhook_secrets).get(provider).cloned())
    }

    fn set_webhook_secret(&self, provider: &str, secret: &str) -> StorageResult<WebhookSecret> {
        let mut secrets = lock(&self.webhook_secrets);
        let now = Utc::now();
        let entry = secrets
            .entry(provider.to_string())
            .or_insert_with(|| WebhookSecret {
                id: new_id(),
                provider: provider.to_string(),
                secret: String::new(),
                created_at: now,
                updated_at: now,
            });
        entry.secret = secret.to_string();
        entry.updated_at = now;
        Ok(entry.clone())
    }

    // -------------------------------------------------------------------------
    // Achievements
    // -------------------------------------------------------------------------

    fn list_achievements(&self) -> StorageResult<Vec<Achievement>> {
        let mut achievements: Vec<Achievement> =
            lock(&self.achievements).values().cloned().collect();
        achievements.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(achievements)
    }

    fn create_achievement(&self, new: NewAchievement) -> StorageResult<Achievement> {
        let achievement = Achievement {
            id: new_id(),
            code: new.code,
            title: new.title,
            description: new.description,
            threshold: new.threshold,
            created_at: Utc::now(),
        };
        lock(&self.achievements).insert(achievement.id.clone(), achievement.clone());
        Ok(achievement)
    }

    fn list_user_achievements(&self, user_id: &str) -> StorageResult<Vec<UserAchievement>> {
        let mut progress: Vec<UserAchievement> = lock(&self.user_achievements)
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        progress.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(progress)
    }

    fn create_user_achievement(&self, new: NewUserAchievement) -> StorageResult<UserAchievement> {
        let now = Utc::now();
        let entry = UserAchievement {
            id: new_id(),
            user_id: new.user_id,
            achievement_id: new.achievement_id,
            progress: new.progress.unwrap_or(0),
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        lock(&self.user_achievements).insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    fn update_user_achievement(
        &self,
        id: &str,
        patch: UserAchievementPatch,
    ) -> StorageResult<Option<UserAchievement>> {
        let mut all = lock(&self.user_achievements);
        let Some(entry) = all.get_mut(id) else {
            return Ok(None);
        };
        if let Some(progress) = patch.progress {
            entry.progress = progress;
        }
        if let Some(completed) = patch.completed {
            entry.completed = completed;
        }
        if let Some(completed_at) = patch.completed_at {
            entry.completed_at = Some(completed_at);
        }
        entry.updated_at = Utc::now();
        Ok(Some(entry.clone()))
    }

    // -------------------------------------------------------------------------
    // User Stats
    // -------------------------------------------------------------------------

    fn get_user_stats(&self, user_id: &str) -> StorageResult<Option<UserStats>> {
        Ok(lock(&self.user_stats).get(user_id).cloned())
    }

    fn create_user_stats(&self, user_id: &str) -> StorageResult<UserStats> {
        let now = Utc::now();
        let stats = UserStats {
            id: new_id(),
            user_id: user_id.to_string(),
            alerts_created: 0,
            trades_logged: 0,
            logins: 0,
            achievements_completed: 0,
            created_at: now,
            updated_at: now,
        };
        lock(&self.user_stats).insert(user_id.to_string(), stats.clone());
        Ok(stats)
    }

    fn update_user_stats(
        &self,
        user_id: &str,
        patch: UserStatsPatch,
    ) -> StorageResult<Option<UserStats>> {
        let mut all = lock(&self.user_stats);
        let Some(stats) = all.get_mut(user_id) else {
            return Ok(None);
        };
        if let Some(alerts) = patch.alerts_created {
            stats.alerts_created = alerts;
        }
        if let Some(trades) = patch.trades_logged {
            stats.trades_logged = trades;
        }
        if let Some(logins) = patch.logins {
            stats.logins = logins;
        }
        if let Some(completed) = patch.achievements_completed {
            stats.achievements_completed = completed;
        }
        stats.updated_at = Utc::now();
        Ok(Some(stats.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn seeded_storage_contains_demo_content() {
        let storage = MemoryStorage::seeded();
        let admin = storage
            .get_user_by_email("admin@marketgate.dev")
            .unwrap()
            .unwrap();
        assert!(admin.role.is_admin());

        let pro = storage
            .get_user_by_email("pro@marketgate.dev")
            .unwrap()
            .unwrap();
        assert_eq!(pro.tier, Tier::Pro);
        assert_eq!(pro.subscription_status, Some(SubscriptionStatus::Active));

        assert_eq!(storage.list_tickers().unwrap().len(), 3);
        assert_eq!(storage.list_plans().unwrap().len(), 3);
    }

    #[test]
    fn concurrent_upserts_never_duplicate_a_position() {
        let storage = Arc::new(MemoryStorage::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let storage = Arc::clone(&storage);
                std::thread::spawn(move || {
                    storage
                        .upsert_portfolio_position(
                            "u1",
                            "BTCUSDT",
                            PortfolioPositionPatch {
                                quantity: Some(i as f64),
                                ..Default::default()
                            },
                        )
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<UserPortfolioPosition> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        // exactly one row survives, and every caller saw the same row id
        let positions = storage.list_portfolio("u1").unwrap();
        assert_eq!(positions.len(), 1);
        assert!(results.iter().all(|p| p.id == positions[0].id));
        // last writer's quantity merged onto defaults
        assert!(results.iter().any(|p| p.quantity == positions[0].quantity));
        assert_eq!(positions[0].avg_entry_price, 0.0);
    }

    #[test]
    fn concurrent_trading_settings_upserts_share_one_row() {
        let storage = Arc::new(MemoryStorage::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let storage = Arc::clone(&storage);
                std::thread::spawn(move || {
                    storage
                        .upsert_trading_settings(
                            "u1",
                            TradingSettingsPatch {
                                risk_per_trade_pct: Some(2.0),
                                ..Default::default()
                            },
                        )
                        .unwrap()
                })
            })
            .collect();

        let ids: Vec<String> = handles
            .into_iter()
            .map(|h| h.join().unwrap().id)
            .collect();
        assert!(ids.windows(2).all(|w| w[0] == w[1]));
    }
}
