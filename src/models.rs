// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! # Data Models
//!
//! Entity records persisted through the [`crate::storage::Storage`]
//! abstraction, plus the closed enumerations that drive entitlement:
//! [`Role`], [`Tier`], and [`SubscriptionStatus`].
//!
//! ## Conventions
//!
//! - Ids are UUID strings assigned by the storage layer.
//! - `created_at` / `updated_at` are assigned by the storage layer, never
//!   trusted from caller input. The only exceptions are append-only signal
//!   and admin-log timestamps, which may be caller-supplied (backdated
//!   webhook events) and default to "now" when absent.
//! - `New*` structs carry caller-supplied creation fields; `*Patch` structs
//!   carry optional partial updates merged field-by-field on update.
//! - All wire payloads are camelCase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Role
// =============================================================================

/// Identity roles.
///
/// `Admin` and `Superuser` are equivalent for authorization purposes: both
/// receive the total entitlement bypass. `Superuser` exists so that operator
/// accounts can be distinguished from promoted admins in audit trails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Normal end user
    User,
    /// Administrator (full access)
    Admin,
    /// Operator account (full access)
    Superuser,
}

impl Role {
    /// Whether this role carries administrative privileges.
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Superuser)
    }

    /// Parse a role from its wire name (case-insensitive).
    pub fn from_name(s: &str) -> Option<Role> {
        match s.to_lowercase().as_str() {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            "superuser" => Some(Role::Superuser),
            _ => None,
        }
    }
}

impl Default for Role {
    /// Default role is User (least privilege).
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Admin => write!(f, "admin"),
            Role::Superuser => write!(f, "superuser"),
        }
    }
}

// =============================================================================
// Tier
// =============================================================================

/// Ordered subscription tiers gating paid features.
///
/// The ordering is total: `free < basic < premium < pro`. Administrators do
/// not participate in this ordinal space; they bypass tier checks entirely.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Basic,
    Premium,
    Pro,
}

impl Tier {
    /// Ordinal position in the tier hierarchy (free = 0).
    pub fn rank(&self) -> u8 {
        match self {
            Tier::Free => 0,
            Tier::Basic => 1,
            Tier::Premium => 2,
            Tier::Pro => 3,
        }
    }

    /// Whether this tier is a paid tier.
    pub fn is_paid(&self) -> bool {
        self.rank() > 0
    }

    /// Parse a tier from its wire name (case-insensitive).
    pub fn from_name(s: &str) -> Option<Tier> {
        match s.to_lowercase().as_str() {
            "free" => Some(Tier::Free),
            "basic" => Some(Tier::Basic),
            "premium" => Some(Tier::Premium),
            "pro" => Some(Tier::Pro),
            _ => None,
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Free
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Free => write!(f, "free"),
            Tier::Basic => write!(f, "basic"),
            Tier::Premium => write!(f, "premium"),
            Tier::Pro => write!(f, "pro"),
        }
    }
}

// =============================================================================
// Subscription Status
// =============================================================================

/// Billing lifecycle state of a subscription, independent of tier.
///
/// Absence of a status (a user who never checked out) is modeled as
/// `Option::<SubscriptionStatus>::None` on the identity record. Any state
/// other than `Active` degrades paid-tier entitlement to free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    PastDue,
    Trialing,
    Incomplete,
}

impl SubscriptionStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubscriptionStatus::Active => write!(f, "active"),
            SubscriptionStatus::Canceled => write!(f, "canceled"),
            SubscriptionStatus::PastDue => write!(f, "past_due"),
            SubscriptionStatus::Trialing => write!(f, "trialing"),
            SubscriptionStatus::Incomplete => write!(f, "incomplete"),
        }
    }
}

// =============================================================================
// Identity (User)
// =============================================================================

/// An authenticated principal.
///
/// Created on registration with tier = free; tier and status are mutated by
/// payment-provider webhooks or admin actions, which this core only reads.
/// Users are never hard-deleted: deactivation flips `is_active` and the
/// identity then resolves as absent for authentication purposes.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub tier: Tier,
    /// Billing status; `None` for users who never started a checkout.
    pub subscription_status: Option<SubscriptionStatus>,
    pub subscription_expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a user. Unspecified fields take the documented
/// defaults: role = user, tier = free, active = true, no status.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub email: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub tier: Option<Tier>,
}

/// Partial update for a user record. `None` fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(default)]
    pub subscription_expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

// =============================================================================
// User Settings (1:1 with User)
// =============================================================================

/// Per-user presentation preferences.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub id: String,
    pub user_id: String,
    pub theme: String,
    pub default_ticker: String,
    pub chart_interval: String,
    pub notifications_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewUserSettings {
    pub user_id: String,
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub default_ticker: Option<String>,
    #[serde(default)]
    pub chart_interval: Option<String>,
    #[serde(default)]
    pub notifications_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserSettingsPatch {
    #[serde(default)]
    pub theme: Option<String>,
    #[serde(default)]
    pub default_ticker: Option<String>,
    #[serde(default)]
    pub chart_interval: Option<String>,
    #[serde(default)]
    pub notifications_enabled: Option<bool>,
}

// =============================================================================
// Tickers
// =============================================================================

/// A tradable instrument available on the platform. Listed alphabetically
/// by symbol, unlike the recency ordering used elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTicker {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub exchange: String,
    pub is_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewTicker {
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct TickerPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub is_enabled: Option<bool>,
}

// =============================================================================
// Alert Signals
// =============================================================================

/// A platform-generated buy/sell signal, append-only.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertSignal {
    pub id: String,
    pub ticker_symbol: String,
    pub signal_type: String,
    pub price: f64,
    pub note: Option<String>,
    /// Event time. Caller-supplied timestamps are honored so that backdated
    /// webhook events land at the right position in the feed.
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAlertSignal {
    pub ticker_symbol: String,
    pub signal_type: String,
    pub price: f64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

// =============================================================================
// OHLC Cache
// =============================================================================

/// A cached OHLC candle for one (symbol, interval) series.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OhlcCandle {
    pub id: String,
    pub symbol: String,
    pub interval: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewOhlcCandle {
    pub symbol: String,
    pub interval: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Chart Layers (heatmap / cycles / forecasts)
// =============================================================================

/// One cell of the market heatmap layer. The whole layer is replaced on
/// each refresh rather than patched row-by-row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapPoint {
    pub id: String,
    pub symbol: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewHeatmapPoint {
    pub symbol: String,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

/// One point of the cycle-analysis overlay.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleDataPoint {
    pub id: String,
    pub symbol: String,
    pub phase: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewCycleDataPoint {
    pub symbol: String,
    pub phase: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// One point of the price-forecast overlay.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub id: String,
    pub symbol: String,
    pub predicted_price: f64,
    pub confidence: f64,
    pub model: String,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewForecastPoint {
    pub symbol: String,
    pub predicted_price: f64,
    pub confidence: f64,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

// =============================================================================
// Admin Log
// =============================================================================

/// Append-only audit log entry for admin actions.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminLogEntry {
    pub id: String,
    pub admin_user_id: String,
    pub action: String,
    pub target: Option<String>,
    pub detail: Option<String>,
    /// Event time; caller-supplied timestamps are honored, default "now".
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAdminLogEntry {
    pub admin_user_id: String,
    pub action: String,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

// =============================================================================
// Subscription Plans
// =============================================================================

/// A purchasable billing plan mapped onto a tier.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlan {
    pub id: String,
    pub name: String,
    pub tier: Tier,
    pub price_cents: i64,
    pub billing_interval: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewSubscriptionPlan {
    pub name: String,
    pub tier: Tier,
    pub price_cents: i64,
    #[serde(default)]
    pub billing_interval: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPlanPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub tier: Option<Tier>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub billing_interval: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

// =============================================================================
// Ticker Subscriptions (notification subscriptions, not billing)
// =============================================================================

/// A per-ticker notification subscription, distinct from the identity's
/// billing tier. Duplicates per (user, ticker) are permitted: each row can
/// carry its own delivery-channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSubscription {
    pub id: String,
    pub user_id: String,
    pub ticker_symbol: String,
    /// Defaults to 50.
    pub max_alerts_per_day: i64,
    /// Defaults to true.
    pub is_active: bool,
    pub delivery_channel: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUserSubscription {
    pub user_id: String,
    pub ticker_symbol: String,
    #[serde(default)]
    pub max_alerts_per_day: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub delivery_channel: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserSubscriptionPatch {
    #[serde(default)]
    pub max_alerts_per_day: Option<i64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub delivery_channel: Option<String>,
}

// =============================================================================
// Trades & Portfolio
// =============================================================================

/// A logged trade, append-only from the core's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserTrade {
    pub id: String,
    pub user_id: String,
    pub ticker_symbol: String,
    pub side: String,
    pub quantity: f64,
    pub price: f64,
    pub executed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUserTrade {
    pub user_id: String,
    pub ticker_symbol: String,
    pub side: String,
    pub quantity: f64,
    pub price: f64,
    #[serde(default)]
    pub executed_at: Option<DateTime<Utc>>,
}

/// A portfolio position, unique per (user, ticker). Created on first upsert
/// with zero-value defaults and the requested patch merged on top.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserPortfolioPosition {
    pub id: String,
    pub user_id: String,
    pub ticker_symbol: String,
    pub quantity: f64,
    pub avg_entry_price: f64,
    pub realized_pnl: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioPositionPatch {
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub avg_entry_price: Option<f64>,
    #[serde(default)]
    pub realized_pnl: Option<f64>,
}

// =============================================================================
// Trading Settings (1:1 with User)
// =============================================================================

/// Per-user trading configuration, unique per user. Created on first upsert
/// with zero-value defaults.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TradingSettings {
    pub id: String,
    pub user_id: String,
    pub max_position_size: f64,
    pub risk_per_trade_pct: f64,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub auto_trading_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct TradingSettingsPatch {
    #[serde(default)]
    pub max_position_size: Option<f64>,
    #[serde(default)]
    pub risk_per_trade_pct: Option<f64>,
    #[serde(default)]
    pub stop_loss_pct: Option<f64>,
    #[serde(default)]
    pub take_profit_pct: Option<f64>,
    #[serde(default)]
    pub auto_trading_enabled: Option<bool>,
}

// =============================================================================
// User Alerts
// =============================================================================

/// A user-configured price alert.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserAlert {
    pub id: String,
    pub user_id: String,
    pub ticker_symbol: String,
    pub condition: String,
    pub threshold: f64,
    pub is_active: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUserAlert {
    pub user_id: String,
    pub ticker_symbol: String,
    pub condition: String,
    pub threshold: f64,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserAlertPatch {
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub triggered_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Dashboard Layout
// =============================================================================

/// Saved dashboard widget layout, one per user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardLayout {
    pub id: String,
    pub user_id: String,
    #[schema(value_type = Object)]
    pub layout: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Webhook Secrets
// =============================================================================

/// Shared secret for verifying an external provider's webhook signatures.
/// The core only stores these; signature verification lives with the
/// payment-provider webhook handler.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSecret {
    pub id: String,
    pub provider: String,
    pub secret: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Achievements
// =============================================================================

/// A gamification achievement definition.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub code: String,
    pub title: String,
    pub description: String,
    pub threshold: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewAchievement {
    pub code: String,
    pub title: String,
    pub description: String,
    pub threshold: i64,
}

/// A user's progress against one achievement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievement {
    pub id: String,
    pub user_id: String,
    pub achievement_id: String,
    pub progress: i64,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUserAchievement {
    pub user_id: String,
    pub achievement_id: String,
    #[serde(default)]
    pub progress: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserAchievementPatch {
    #[serde(default)]
    pub progress: Option<i64>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

// =============================================================================
// User Stats
// =============================================================================

/// Per-user activity counters, one row per user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub id: String,
    pub user_id: String,
    pub alerts_created: i64,
    pub trades_logged: i64,
    pub logins: i64,
    pub achievements_completed: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsPatch {
    #[serde(default)]
    pub alerts_created: Option<i64>,
    #[serde(default)]
    pub trades_logged: Option<i64>,
    #[serde(default)]
    pub logins: Option<i64>,
    #[serde(default)]
    pub achievements_completed: Option<i64>,
}
