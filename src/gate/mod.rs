// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! # Request Gate
//!
//! The middleware that chains verifier → resolver → evaluator for every
//! protected request. It is configured per route group with one
//! [`Requirement`] and attached with `middleware::from_fn_with_state`:
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/v1/signals", get(list_signals))
//!     .layer(middleware::from_fn_with_state(
//!         GateState::new(app.clone(), Requirement::feature("trading-signals")),
//!         gate,
//!     ))
//! ```
//!
//! Outcomes: a verifier failure is a 401 with the auth code; a storage
//! failure during resolution is a 500 `STORAGE_ERROR`, fatal for the
//! request only; a denial maps through the fixed 401/402/403 table; an
//! allow attaches the resolved [`User`] to the request extensions, where
//! handlers read it back through the [`CurrentUser`] extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::auth::{resolver, token, AuthError};
use crate::entitlement::{evaluate, Decision, Requirement};
use crate::error::ApiError;
use crate::models::User;
use crate::state::AppState;

/// Per-route-group gate configuration: the shared application state plus
/// the one requirement this group demands.
#[derive(Clone)]
pub struct GateState {
    pub app: AppState,
    pub requirement: Requirement,
}

impl GateState {
    pub fn new(app: AppState, requirement: Requirement) -> Self {
        Self { app, requirement }
    }
}

/// The gate middleware. One pass per request: bearer token → verifier →
/// resolver → evaluator, then either reject or continue with the identity
/// attached.
pub async fn gate(State(state): State<GateState>, mut request: Request, next: Next) -> Response {
    let token = match bearer_token(request.headers().get(AUTHORIZATION)) {
        Ok(token) => token,
        Err(e) => return e.into_response(),
    };

    let claims = match token::verify(token, &state.app.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => return e.into_response(),
    };

    let identity = match resolver::resolve(state.app.storage.as_ref(), &claims.sub) {
        Ok(identity) => identity,
        Err(e) => return ApiError::from(e).into_response(),
    };

    match evaluate(identity.as_ref(), &state.requirement) {
        Decision::Allow => {
            if let Some(user) = identity {
                request.extensions_mut().insert(user);
            }
            next.run(request).await
        }
        Decision::Deny(denial) => ApiError::from(denial).into_response(),
    }
}

fn bearer_token(header: Option<&axum::http::HeaderValue>) -> Result<&str, AuthError> {
    let value = header
        .ok_or(AuthError::TokenMissing)?
        .to_str()
        .map_err(|_| AuthError::TokenInvalid)?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or(AuthError::TokenInvalid)
}

/// Handler-side extractor for the identity the gate attached.
///
/// ```rust,ignore
/// async fn me(CurrentUser(user): CurrentUser) -> Json<User> { ... }
/// ```
pub struct CurrentUser(pub User);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                // reachable only when a handler using the extractor is
                // mounted without the gate in front of it
                ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    "NOT_AUTHENTICATED",
                    "No authenticated identity on this request",
                )
            })
    }
}
