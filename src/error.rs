// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! API error responses.
//!
//! One response shape for every failure the platform produces:
//! `{ error, code, requiredTier?, currentTier?, subscriptionStatus?,
//! currentRole?, message? }`, camelCase, with absent fields omitted.
//! Entitlement denials convert via `From<Denial>` with the fixed status
//! mapping (401/402/403); storage failures convert to 500 `STORAGE_ERROR`,
//! except the email-uniqueness conflict, which is a 409 `EMAIL_TAKEN`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::entitlement::{Denial, ReasonCode};
use crate::models::{Role, SubscriptionStatus, Tier};
use crate::storage::StorageError;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

/// The wire payload. `error` is a short machine-oriented summary, `message`
/// (when present) is suitable for direct display to the end user.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_tier: Option<Tier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<SubscriptionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                error: error.into(),
                code: code.into(),
                required_tier: None,
                current_tier: None,
                subscription_status: None,
                current_role: None,
                message: None,
            },
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }
}

/// Fixed status mapping for denial reasons.
fn denial_status(reason: ReasonCode) -> StatusCode {
    match reason {
        ReasonCode::NotAuthenticated => StatusCode::UNAUTHORIZED,
        ReasonCode::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
        ReasonCode::TierInsufficient
        | ReasonCode::SubscriptionInactive
        | ReasonCode::AdminRequired => StatusCode::FORBIDDEN,
    }
}

impl From<Denial> for ApiError {
    fn from(denial: Denial) -> Self {
        let error = match &denial.feature {
            Some(feature) => format!("Access denied for feature '{feature}'"),
            None => "Access denied".to_string(),
        };
        Self {
            status: denial_status(denial.reason),
            body: ErrorBody {
                error,
                code: denial.reason.code().to_string(),
                required_tier: denial.required_tier,
                current_tier: denial.current_tier,
                subscription_status: denial.subscription_status,
                current_role: denial.current_role,
                message: Some(denial.message),
            },
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::DuplicateEmail(_) => Self::new(
                StatusCode::CONFLICT,
                "EMAIL_TAKEN",
                "Email address is already in use",
            ),
            e => {
                tracing::error!(error = %e, "Storage operation failed");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "Storage operation failed",
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}
