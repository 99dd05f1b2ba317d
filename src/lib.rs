// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! Marketgate - Subscription-Gated Market Data Platform Core
//!
//! Authorization and entitlement core for a market-data platform: every
//! request carries a bearer token, the token maps to an identity, and the
//! identity's role, tier, and subscription status decide which routes and
//! features it may use.
//!
//! ## Modules
//!
//! - `auth` - Token verification (HS256 JWT) and identity resolution
//! - `entitlement` - The pure access-decision evaluator and feature catalog
//! - `gate` - Axum middleware wiring auth + entitlement in front of routes
//! - `storage` - Storage trait with redb-durable and in-memory backends
//! - `api` - HTTP handlers and the gated router

pub mod api;
pub mod auth;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod gate;
pub mod models;
pub mod state;
pub mod storage;
