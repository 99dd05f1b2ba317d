// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Credential verification failure. All variants map to 401: the caller
/// has not proven who they are, which is distinct from the 402/403
/// entitlement denials produced further down the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer token on the request.
    TokenMissing,
    /// Malformed token, bad signature, unparseable claims.
    TokenInvalid,
    /// Signature fine, `exp` in the past (beyond leeway).
    TokenExpired,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    code: String,
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::TokenMissing => "TOKEN_MISSING",
            AuthError::TokenInvalid => "TOKEN_INVALID",
            AuthError::TokenExpired => "TOKEN_EXPIRED",
        }
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::TokenMissing => {
                write!(f, "Authorization header with a bearer token is required")
            }
            AuthError::TokenInvalid => write!(f, "Token is invalid"),
            AuthError::TokenExpired => write!(f, "Token has expired"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = Json(AuthErrorBody {
            error: self.to_string(),
            code: self.code().to_string(),
        });
        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn every_variant_returns_401_with_its_code() {
        for (err, code) in [
            (AuthError::TokenMissing, "TOKEN_MISSING"),
            (AuthError::TokenInvalid, "TOKEN_INVALID"),
            (AuthError::TokenExpired, "TOKEN_EXPIRED"),
        ] {
            let response = err.into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
            assert_eq!(body["code"], code);
        }
    }
}
