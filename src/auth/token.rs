// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! HS256 token verification and issuance.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AuthError;

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Typed token claims. No loose claim maps; anything the platform needs
/// from a token is a named field here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the identity id.
    pub sub: String,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expiration (Unix seconds).
    pub exp: i64,
}

/// Verify an HS256 token against the process-wide secret.
pub fn verify(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let mut validation = Validation::default();
    validation.leeway = CLOCK_SKEW_LEEWAY;

    let key = DecodingKey::from_secret(secret.as_bytes());
    let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::TokenInvalid,
    })?;
    Ok(data.claims)
}

/// Mint a token for a subject, valid for `ttl`. Used by the demo login
/// surface and by tests.
pub fn issue(subject: &str, secret: &str, ttl: Duration) -> Result<String, AuthError> {
    let now = Utc::now();
    let claims = Claims {
        sub: subject.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
    };
    let key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|_| AuthError::TokenInvalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issue_then_verify_round_trips_the_subject() {
        let token = issue("user-1", SECRET, Duration::hours(1)).unwrap();
        let claims = verify(&token, SECRET).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn wrong_secret_is_invalid_not_expired() {
        let token = issue("user-1", SECRET, Duration::hours(1)).unwrap();
        assert_eq!(verify(&token, "other-secret"), Err(AuthError::TokenInvalid));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        // well past the 60s leeway
        let token = issue("user-1", SECRET, Duration::hours(-2)).unwrap();
        assert_eq!(verify(&token, SECRET), Err(AuthError::TokenExpired));
    }

    #[test]
    fn garbage_is_invalid() {
        assert_eq!(verify("not-a-token", SECRET), Err(AuthError::TokenInvalid));
    }
}
