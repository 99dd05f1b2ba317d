// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! Durable storage backend backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - one table per entity, JSON bytes keyed by id (or by the natural key:
//!   ticker symbol, user id for 1:1 rows, provider for webhook secrets,
//!   `user|ticker` for portfolio positions)
//! - `user_email_idx`: email → user id
//! - `ohlc_cache`: composite key `symbol|interval|!timestamp_be|id` → JSON,
//!   so a forward range scan yields newest-first candles
//!
//! Required tables are pre-created at open so later read transactions cannot
//! fail on them. Optional tables (webhook secrets, achievements, user
//! achievements, user subscriptions, OHLC cache) are *not* pre-created:
//! reads against a table that does not exist yet return empty results,
//! which is how schema-evolution gaps stay non-fatal. Write paths get no
//! such leniency; a write transaction creates its table or propagates the
//! failure.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use super::{Storage, StorageError, StorageResult};
use crate::models::*;

// =============================================================================
// Table Definitions
// =============================================================================

const USERS: TableDefinition<&str, &[u8]> = TableDefinition::new("users");
const USER_EMAIL_IDX: TableDefinition<&str, &str> = TableDefinition::new("user_email_idx");
const USER_SETTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_settings");
const TICKERS: TableDefinition<&str, &[u8]> = TableDefinition::new("tickers");
const SIGNALS: TableDefinition<&str, &[u8]> = TableDefinition::new("signals");
const HEATMAP: TableDefinition<&str, &[u8]> = TableDefinition::new("heatmap");
const CYCLES: TableDefinition<&str, &[u8]> = TableDefinition::new("cycle_data");
const FORECASTS: TableDefinition<&str, &[u8]> = TableDefinition::new("forecasts");
const ADMIN_LOG: TableDefinition<&str, &[u8]> = TableDefinition::new("admin_log");
const PLANS: TableDefinition<&str, &[u8]> = TableDefinition::new("subscription_plans");
const TRADES: TableDefinition<&str, &[u8]> = TableDefinition::new("trades");
const POSITIONS: TableDefinition<&str, &[u8]> = TableDefinition::new("portfolio_positions");
const TRADING_SETTINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("trading_settings");
const ALERTS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_alerts");
const LAYOUTS: TableDefinition<&str, &[u8]> = TableDefinition::new("dashboard_layouts");

// Optional tables: never pre-created, lenient on read.
const WEBHOOK_SECRETS: TableDefinition<&str, &[u8]> = TableDefinition::new("webhook_secrets");
const ACHIEVEMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("achievements");
const USER_ACHIEVEMENTS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("user_achievements");
const USER_SUBSCRIPTIONS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("user_subscriptions");
const OHLC_CACHE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("ohlc_cache");
const USER_STATS: TableDefinition<&str, &[u8]> = TableDefinition::new("user_stats");

// =============================================================================
// Key Helpers
// =============================================================================

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn position_key(user_id: &str, ticker_symbol: &str) -> String {
    format!("{user_id}|{ticker_symbol}")
}

/// Composite key for the OHLC cache: `symbol|interval|!ts_be|id`.
///
/// The inverted timestamp gives newest-first ordering on a forward scan.
fn ohlc_key(symbol: &str, interval: &str, timestamp_ms: i64, id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(symbol.len() + interval.len() + id.len() + 11);
    key.extend_from_slice(symbol.as_bytes());
    key.push(b'|');
    key.extend_from_slice(interval.as_bytes());
    key.push(b'|');
    key.extend_from_slice(&(!timestamp_ms as u64).to_be_bytes());
    key.push(b'|');
    key.extend_from_slice(id.as_bytes());
    key
}

fn ohlc_prefix(symbol: &str, interval: &str) -> Vec<u8> {
    let mut prefix = Vec::with_capacity(symbol.len() + interval.len() + 2);
    prefix.extend_from_slice(symbol.as_bytes());
    prefix.push(b'|');
    prefix.extend_from_slice(interval.as_bytes());
    prefix.push(b'|');
    prefix
}

fn ohlc_prefix_end(symbol: &str, interval: &str) -> Vec<u8> {
    let mut end = ohlc_prefix(symbol, interval);
    end.extend_from_slice(&[0xFF; 16]);
    end
}

// =============================================================================
// DurableStorage
// =============================================================================

/// Embedded ACID backend. One instance per process, selected at startup.
pub struct DurableStorage {
    db: Database,
}

impl DurableStorage {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the required tables so read transactions against an
        // empty database succeed. Optional tables are deliberately left out.
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(USERS)?;
            let _ = write_txn.open_table(USER_EMAIL_IDX)?;
            let _ = write_txn.open_table(USER_SETTINGS)?;
            let _ = write_txn.open_table(TICKERS)?;
            let _ = write_txn.open_table(SIGNALS)?;
            let _ = write_txn.open_table(HEATMAP)?;
            let _ = write_txn.open_table(CYCLES)?;
            let _ = write_txn.open_table(FORECASTS)?;
            let _ = write_txn.open_table(ADMIN_LOG)?;
            let _ = write_txn.open_table(PLANS)?;
            let _ = write_txn.open_table(TRADES)?;
            let _ = write_txn.open_table(POSITIONS)?;
            let _ = write_txn.open_table(TRADING_SETTINGS)?;
            let _ = write_txn.open_table(ALERTS)?;
            let _ = write_txn.open_table(LAYOUTS)?;
            let _ = write_txn.open_table(USER_STATS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // -------------------------------------------------------------------------
    // JSON record helpers
    // -------------------------------------------------------------------------

    fn read_one<T: DeserializeOwned>(
        &self,
        def: TableDefinition<&str, &[u8]>,
        key: &str,
    ) -> StorageResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(def)?;
        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Like [`Self::read_one`], but a missing table reads as absent.
    fn read_one_lenient<T: DeserializeOwned>(
        &self,
        def: TableDefinition<&str, &[u8]>,
        key: &str,
    ) -> StorageResult<Option<T>> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(def) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn read_all<T: DeserializeOwned>(
        &self,
        def: TableDefinition<&str, &[u8]>,
    ) -> StorageResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(def)?;
        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }

    /// Like [`Self::read_all`], but a missing table reads as empty.
    fn read_all_lenient<T: DeserializeOwned>(
        &self,
        def: TableDefinition<&str, &[u8]>,
    ) -> StorageResult<Vec<T>> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(def) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::new();
        for entry in table.iter()? {
            let (_, value) = entry?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }

    fn write_one<T: Serialize>(
        &self,
        def: TableDefinition<&str, &[u8]>,
        key: &str,
        value: &T,
    ) -> StorageResult<()> {
        let json = serde_json::to_vec(value)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(def)?;
            table.insert(key, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Read-modify-write inside one write transaction. Returns `Ok(None)`
    /// when the key is absent; the mutation is then not applied.
    fn update_one<T: Serialize + DeserializeOwned>(
        &self,
        def: TableDefinition<&str, &[u8]>,
        key: &str,
        mutate: impl FnOnce(&mut T),
    ) -> StorageResult<Option<T>> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(def)?;
            let existing_bytes = match table.get(key)? {
                Some(value) => value.value().to_vec(),
                None => return Ok(None),
            };
            let mut record: T = serde_json::from_slice(&existing_bytes)?;
            mutate(&mut record);
            let json = serde_json::to_vec(&record)?;
            table.insert(key, json.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(Some(updated))
    }

    /// Get-or-create inside one write transaction. redb serializes write
    /// transactions process-wide, so this is atomic: no duplicate rows, no
    /// observable intermediate state.
    fn upsert_one<T: Serialize + DeserializeOwned>(
        &self,
        def: TableDefinition<&str, &[u8]>,
        key: &str,
        create: impl FnOnce() -> T,
        mutate: impl FnOnce(&mut T),
    ) -> StorageResult<T> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut table = write_txn.open_table(def)?;
            let mut record: T = match table.get(key)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => create(),
            };
            mutate(&mut record);
            let json = serde_json::to_vec(&record)?;
            table.insert(key, json.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    fn delete_one(&self, def: TableDefinition<&str, &[u8]>, key: &str) -> StorageResult<bool> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(def)?;
            let removed = table.remove(key)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Replace the full contents of a table with the given records.
    fn replace_all<T: Serialize>(
        &self,
        def: TableDefinition<&str, &[u8]>,
        records: &[(String, T)],
    ) -> StorageResult<()> {
        let write_txn = self.db.begin_write()?;
        write_txn.delete_table(def)?;
        {
            let mut table = write_txn.open_table(def)?;
            for (key, record) in records {
                let json = serde_json::to_vec(record)?;
                table.insert(key.as_str(), json.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

fn sort_desc_by<T, K: Ord>(records: &mut [T], key: impl Fn(&T) -> K) {
    records.sort_by(|a, b| key(b).cmp(&key(a)));
}

impl Storage for DurableStorage {
    // -------------------------------------------------------------------------
    // Identities
    // -------------------------------------------------------------------------

    fn get_user(&self, id: &str) -> StorageResult<Option<User>> {
        self.read_one(USERS, id)
    }

    fn get_user_by_email(&self, email: &str) -> StorageResult<Option<User>> {
        let read_txn = self.db.begin_read()?;
        let idx = read_txn.open_table(USER_EMAIL_IDX)?;
        let Some(id) = idx.get(email)?.map(|v| v.value().to_string()) else {
            return Ok(None);
        };
        let users = read_txn.open_table(USERS)?;
        match users.get(id.as_str())? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    fn create_user(&self, new: NewUser) -> StorageResult<User> {
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
        let json = serde_json::to_vec(&user)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut idx = write_txn.open_table(USER_EMAIL_IDX)?;
            if idx.get(user.email.as_str())?.is_some() {
                return Err(StorageError::DuplicateEmail(user.email));
            }
            idx.insert(user.email.as_str(), user.id.as_str())?;
            let mut users = write_txn.open_table(USERS)?;
            users.insert(user.id.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(user)
    }

    fn update_user(&self, id: &str, patch: UserPatch) -> StorageResult<Option<User>> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut users = write_txn.open_table(USERS)?;
            let existing_bytes = match users.get(id)? {
                Some(value) => value.value().to_vec(),
                None => return Ok(None),
            };
            let mut user: User = serde_json::from_slice(&existing_bytes)?;
            let old_email = user.email.clone();

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

            let json = serde_json::to_vec(&user)?;
            users.insert(id, json.as_slice())?;

            if user.email != old_email {
                let mut idx = write_txn.open_table(USER_EMAIL_IDX)?;
                match idx.get(user.email.as_str())?.map(|v| v.value().to_string()) {
                    Some(holder) if holder != id => {
                        return Err(StorageError::DuplicateEmail(user.email));
                    }
                    _ => {}
                }
                idx.remove(old_email.as_str())?;
                idx.insert(user.email.as_str(), id)?;
            }
            user
        };
        write_txn.commit()?;
        Ok(Some(updated))
    }

    fn list_users(&self, limit: Option<usize>) -> StorageResult<Vec<User>> {
        let mut users: Vec<User> = self.read_all(USERS)?;
        sort_desc_by(&mut users, |u| u.created_at);
        if let Some(limit) = limit {
            users.truncate(limit);
        }
        Ok(users)
    }

    // -------------------------------------------------------------------------
    // User Settings
    // -------------------------------------------------------------------------

    fn get_user_settings(&self, user_id: &str) -> StorageResult<Option<UserSettings>> {
        self.read_one(USER_SETTINGS, user_id)
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
        self.write_one(USER_SETTINGS, &new.user_id, &settings)?;
        Ok(settings)
    }

    fn update_user_settings(
        &self,
        user_id: &str,
        patch: UserSettingsPatch,
    ) -> StorageResult<Option<UserSettings>> {
        self.update_one(USER_SETTINGS, user_id, |settings: &mut UserSettings| {
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
        })
    }

    // -------------------------------------------------------------------------
    // Tickers
    // -------------------------------------------------------------------------

    fn list_tickers(&self) -> StorageResult<Vec<AvailableTicker>> {
        let mut tickers: Vec<AvailableTicker> = self.read_all(TICKERS)?;
        tickers.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        Ok(tickers)
    }

    fn get_ticker(&self, symbol: &str) -> StorageResult<Option<AvailableTicker>> {
        self.read_one(TICKERS, symbol)
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
        self.write_one(TICKERS, &new.symbol, &ticker)?;
        Ok(ticker)
    }

    fn update_ticker(
        &self,
        symbol: &str,
        patch: TickerPatch,
    ) -> StorageResult<Option<AvailableTicker>> {
        self.update_one(TICKERS, symbol, |ticker: &mut AvailableTicker| {
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
        })
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
        self.write_one(SIGNALS, &signal.id, &signal)?;
        Ok(signal)
    }

    fn list_signals(&self, limit: Option<usize>) -> StorageResult<Vec<AlertSignal>> {
        let mut signals: Vec<AlertSignal> = self.read_all(SIGNALS)?;
        sort_desc_by(&mut signals, |s| s.timestamp);
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
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(OHLC_CACHE)?;
            for new in batch {
                let candle = OhlcCandle {
                    id: new_id(),
                    symbol: new.symbol,
                    interval: new.interval,
                    open: new.open,
                    high: new.high,
                    low: new.low,
                    close: new.close,
                    volume: new.volume,
                    timestamp: new.timestamp,
                    created_at: now,
                };
                let key = ohlc_key(
                    &candle.symbol,
                    &candle.interval,
                    candle.timestamp.timestamp_millis(),
                    &candle.id,
                );
                let json = serde_json::to_vec(&candle)?;
                table.insert(key.as_slice(), json.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_ohlc(
        &self,
        symbol: &str,
        interval: &str,
        limit: Option<usize>,
    ) -> StorageResult<Vec<OhlcCandle>> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(OHLC_CACHE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let prefix = ohlc_prefix(symbol, interval);
        let prefix_end = ohlc_prefix_end(symbol, interval);
        let mut candles = Vec::new();
        for entry in table.range(prefix.as_slice()..prefix_end.as_slice())? {
            let (_, value) = entry?;
            candles.push(serde_json::from_slice(value.value())?);
            if let Some(limit) = limit {
                if candles.len() >= limit {
                    break;
                }
            }
        }
        Ok(candles)
    }

    // -------------------------------------------------------------------------
    // Chart Layers
    // -------------------------------------------------------------------------

    fn save_heatmap(&self, points: Vec<NewHeatmapPoint>) -> StorageResult<()> {
        let now = Utc::now();
        let records: Vec<(String, HeatmapPoint)> = points
            .into_iter()
            .map(|p| {
                let point = HeatmapPoint {
                    id: new_id(),
                    symbol: p.symbol,
                    score: p.score,
                    timestamp: p.timestamp,
                    created_at: now,
                };
                (point.id.clone(), point)
            })
            .collect();
        self.replace_all(HEATMAP, &records)
    }

    fn get_heatmap(&self) -> StorageResult<Vec<HeatmapPoint>> {
        self.read_all(HEATMAP)
    }

    fn save_cycle_data(&self, points: Vec<NewCycleDataPoint>) -> StorageResult<()> {
        let now = Utc::now();
        let records: Vec<(String, CycleDataPoint)> = points
            .into_iter()
            .map(|p| {
                let point = CycleDataPoint {
                    id: new_id(),
                    symbol: p.symbol,
                    phase: p.phase,
                    value: p.value,
                    timestamp: p.timestamp,
                    created_at: now,
                };
                (point.id.clone(), point)
            })
            .collect();
        self.replace_all(CYCLES, &records)
    }

    fn get_cycle_data(&self) -> StorageResult<Vec<CycleDataPoint>> {
        self.read_all(CYCLES)
    }

    fn save_forecasts(&self, points: Vec<NewForecastPoint>) -> StorageResult<()> {
        let now = Utc::now();
        let records: Vec<(String, ForecastPoint)> = points
            .into_iter()
            .map(|p| {
                let point = ForecastPoint {
                    id: new_id(),
                    symbol: p.symbol,
                    predicted_price: p.predicted_price,
                    confidence: p.confidence,
                    model: p.model,
                    timestamp: p.timestamp,
                    created_at: now,
                };
                (point.id.clone(), point)
            })
            .collect();
        self.replace_all(FORECASTS, &records)
    }

    fn get_forecasts(&self) -> StorageResult<Vec<ForecastPoint>> {
        self.read_all(FORECASTS)
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
        self.write_one(ADMIN_LOG, &entry.id, &entry)?;
        Ok(entry)
    }

    fn list_admin_log(&self, limit: Option<usize>) -> StorageResult<Vec<AdminLogEntry>> {
        let mut entries: Vec<AdminLogEntry> = self.read_all(ADMIN_LOG)?;
        sort_desc_by(&mut entries, |e| e.timestamp);
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    // -------------------------------------------------------------------------
    // Subscription Plans
    // -------------------------------------------------------------------------

    fn list_plans(&self) -> StorageResult<Vec<SubscriptionPlan>> {
        let mut plans: Vec<SubscriptionPlan> = self.read_all(PLANS)?;
        plans.sort_by(|a, b| a.tier.cmp(&b.tier));
        Ok(plans)
    }

    fn get_plan(&self, id: &str) -> StorageResult<Option<SubscriptionPlan>> {
        self.read_one(PLANS, id)
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
        self.write_one(PLANS, &plan.id, &plan)?;
        Ok(plan)
    }

    fn update_plan(
        &self,
        id: &str,
        patch: SubscriptionPlanPatch,
    ) -> StorageResult<Option<SubscriptionPlan>> {
        self.update_one(PLANS, id, |plan: &mut SubscriptionPlan| {
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
        })
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
        self.write_one(USER_SUBSCRIPTIONS, &sub.id, &sub)?;
        Ok(sub)
    }

    fn list_user_subscriptions(&self, user_id: &str) -> StorageResult<Vec<UserSubscription>> {
        let mut subs: Vec<UserSubscription> = self.read_all_lenient(USER_SUBSCRIPTIONS)?;
        subs.retain(|s| s.user_id == user_id);
        sort_desc_by(&mut subs, |s| s.created_at);
        Ok(subs)
    }

    fn update_user_subscription(
        &self,
        id: &str,
        patch: UserSubscriptionPatch,
    ) -> StorageResult<Option<UserSubscription>> {
        // The table may not exist yet; an update against it is then an
        // update against a missing key.
        if self
            .read_one_lenient::<UserSubscription>(USER_SUBSCRIPTIONS, id)?
            .is_none()
        {
            return Ok(None);
        }
        self.update_one(USER_SUBSCRIPTIONS, id, |sub: &mut UserSubscription| {
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
        })
    }

    fn delete_user_subscription(&self, id: &str) -> StorageResult<bool> {
        if self
            .read_one_lenient::<UserSubscription>(USER_SUBSCRIPTIONS, id)?
            .is_none()
        {
            return Ok(false);
        }
        self.delete_one(USER_SUBSCRIPTIONS, id)
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
        self.write_one(TRADES, &trade.id, &trade)?;
        Ok(trade)
    }

    fn list_trades(&self, user_id: &str, limit: Option<usize>) -> StorageResult<Vec<UserTrade>> {
        let mut trades: Vec<UserTrade> = self.read_all(TRADES)?;
        trades.retain(|t| t.user_id == user_id);
        sort_desc_by(&mut trades, |t| t.executed_at);
        if let Some(limit) = limit {
            trades.truncate(limit);
        }
        Ok(trades)
    }

    fn delete_trade(&self, id: &str) -> StorageResult<bool> {
        self.delete_one(TRADES, id)
    }

    // -------------------------------------------------------------------------
    // Portfolio
    // -------------------------------------------------------------------------

    fn list_portfolio(&self, user_id: &str) -> StorageResult<Vec<UserPortfolioPosition>> {
        let mut positions: Vec<UserPortfolioPosition> = self.read_all(POSITIONS)?;
        positions.retain(|p| p.user_id == user_id);
        positions.sort_by(|a, b| a.ticker_symbol.cmp(&b.ticker_symbol));
        Ok(positions)
    }

    fn upsert_portfolio_position(
        &self,
        user_id: &str,
        ticker_symbol: &str,
        patch: PortfolioPositionPatch,
    ) -> StorageResult<UserPortfolioPosition> {
        let key = position_key(user_id, ticker_symbol);
        let now = Utc::now();
        self.upsert_one(
            POSITIONS,
            &key,
            || UserPortfolioPosition {
                id: new_id(),
                user_id: user_id.to_string(),
                ticker_symbol: ticker_symbol.to_string(),
                quantity: 0.0,
                avg_entry_price: 0.0,
                realized_pnl: 0.0,
                created_at: now,
                updated_at: now,
            },
            |position| {
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
            },
        )
    }

    fn delete_portfolio_position(
        &self,
        user_id: &str,
        ticker_symbol: &str,
    ) -> StorageResult<bool> {
        self.delete_one(POSITIONS, &position_key(user_id, ticker_symbol))
    }

    // -------------------------------------------------------------------------
    // Trading Settings
    // -------------------------------------------------------------------------

    fn get_trading_settings(&self, user_id: &str) -> StorageResult<Option<TradingSettings>> {
        self.read_one(TRADING_SETTINGS, user_id)
    }

    fn upsert_trading_settings(
        &self,
        user_id: &str,
        patch: TradingSettingsPatch,
    ) -> StorageResult<TradingSettings> {
        let now = Utc::now();
        self.upsert_one(
            TRADING_SETTINGS,
            user_id,
            || TradingSettings {
                id: new_id(),
                user_id: user_id.to_string(),
                max_position_size: 0.0,
                risk_per_trade_pct: 0.0,
                stop_loss_pct: 0.0,
                take_profit_pct: 0.0,
                auto_trading_enabled: false,
                created_at: now,
                updated_at: now,
            },
            |settings| {
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
            },
        )
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
        self.write_one(ALERTS, &alert.id, &alert)?;
        Ok(alert)
    }

    fn list_alerts(&self, user_id: &str) -> StorageResult<Vec<UserAlert>> {
        let mut alerts: Vec<UserAlert> = self.read_all(ALERTS)?;
        alerts.retain(|a| a.user_id == user_id);
        sort_desc_by(&mut alerts, |a| a.created_at);
        Ok(alerts)
    }

    fn update_alert(&self, id: &str, patch: UserAlertPatch) -> StorageResult<Option<UserAlert>> {
        self.update_one(ALERTS, id, |alert: &mut UserAlert| {
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
        })
    }

    fn delete_alert(&self, id: &str) -> StorageResult<bool> {
        self.delete_one(ALERTS, id)
    }

    // -------------------------------------------------------------------------
    // Dashboard Layout
    // -------------------------------------------------------------------------

    fn get_dashboard_layout(&self, user_id: &str) -> StorageResult<Option<DashboardLayout>> {
        self.read_one(LAYOUTS, user_id)
    }

    fn save_dashboard_layout(
        &self,
        user_id: &str,
        layout: serde_json::Value,
    ) -> StorageResult<DashboardLayout> {
        let now = Utc::now();
        self.upsert_one(
            LAYOUTS,
            user_id,
            || DashboardLayout {
                id: new_id(),
                user_id: user_id.to_string(),
                layout: serde_json::Value::Null,
                created_at: now,
                updated_at: now,
            },
            |entry| {
                entry.layout = layout;
                entry.updated_at = now;
            },
        )
    }

    // -------------------------------------------------------------------------
    // Webhook Secrets
    // -------------------------------------------------------------------------

    fn get_webhook_secret(&self, provider: &str) -> StorageResult<Option<WebhookSecret>> {
        self.read_one_lenient(WEBHOOK_SECRETS, provider)
    }

    fn set_webhook_secret(&self, provider: &str, secret: &str) -> StorageResult<WebhookSecret> {
        let now = Utc::now();
        self.upsert_one(
            WEBHOOK_SECRETS,
            provider,
            || WebhookSecret {
                id: new_id(),
                provider: provider.to_string(),
                secret: String::new(),
                created_at: now,
                updated_at: now,
            },
            |entry| {
                entry.secret = secret.to_string();
                entry.updated_at = now;
            },
        )
    }

    // -------------------------------------------------------------------------
    // Achievements
    // -------------------------------------------------------------------------

    fn list_achievements(&self) -> StorageResult<Vec<Achievement>> {
        let mut achievements: Vec<Achievement> = self.read_all_lenient(ACHIEVEMENTS)?;
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
        self.write_one(ACHIEVEMENTS, &achievement.id, &achievement)?;
        Ok(achievement)
    }

    fn list_user_achievements(&self, user_id: &str) -> StorageResult<Vec<UserAchievement>> {
        let mut progress: Vec<UserAchievement> = self.read_all_lenient(USER_ACHIEVEMENTS)?;
        progress.retain(|a| a.user_id == user_id);
        sort_desc_by(&mut progress, |a| a.created_at);
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
        self.write_one(USER_ACHIEVEMENTS, &entry.id, &entry)?;
        Ok(entry)
    }

    fn update_user_achievement(
        &self,
        id: &str,
        patch: UserAchievementPatch,
    ) -> StorageResult<Option<UserAchievement>> {
        if self
            .read_one_lenient::<UserAchievement>(USER_ACHIEVEMENTS, id)?
            .is_none()
        {
            return Ok(None);
        }
        self.update_one(USER_ACHIEVEMENTS, id, |entry: &mut UserAchievement| {
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
        })
    }

    // -------------------------------------------------------------------------
    // User Stats
    // -------------------------------------------------------------------------

    fn get_user_stats(&self, user_id: &str) -> StorageResult<Option<UserStats>> {
        self.read_one(USER_STATS, user_id)
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
        self.write_one(USER_STATS, user_id, &stats)?;
        Ok(stats)
    }

    fn update_user_stats(
        &self,
        user_id: &str,
        patch: UserStatsPatch,
    ) -> StorageResult<Option<UserStats>> {
        self.update_one(USER_STATS, user_id, |stats: &mut UserStats| {
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
        })
    }
}
