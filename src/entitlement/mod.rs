// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! # Entitlement Evaluator
//!
//! The pure decision core: given a resolved identity (or none) and one
//! [`Requirement`], produce a [`Decision`]. Deterministic, no I/O, no
//! locking; everything the decision needs arrives as arguments.
//!
//! The algorithm is ordered and short-circuiting:
//!
//! 1. no identity → deny `NOT_AUTHENTICATED`;
//! 2. admin/superuser → allow, for every requirement shape (the bypass is
//!    total, including payment and admin checks);
//! 3. minimum-tier: a paid threshold with a non-active subscription status
//!    denies `SUBSCRIPTION_INACTIVE`; a rank below the threshold denies
//!    `TIER_INSUFFICIENT`;
//! 4. named feature: resolved against the closed [`Feature`] catalog, then
//!    treated as its minimum tier. An unknown name allows (fail-open) and
//!    logs a warning — see [`evaluate`];
//! 5. payment: allow iff tier is paid and status is active;
//! 6. admin-only: allow iff the role is administrative.
//!
//! Every denial carries the requirement that was not met plus the
//! identity's current tier/status/role, so callers can render an upgrade
//! prompt without a second query.

pub mod features;

pub use features::Feature;

use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Role, SubscriptionStatus, Tier, User};

// =============================================================================
// Requirement
// =============================================================================

/// What a protected route demands. Configured once per route group and
/// handed to the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// Identity must hold at least this tier.
    MinTier(Tier),
    /// Identity must hold the feature's minimum tier. The name is kept as
    /// a string so that an unmapped name reaches the fail-open branch
    /// instead of being rejected at configuration time.
    Feature(String),
    /// Any paid plan at all: tier above free and an active subscription.
    PaymentRequired,
    /// Administrative role required.
    AdminOnly,
}

impl Requirement {
    pub fn feature(name: impl Into<String>) -> Self {
        Requirement::Feature(name.into())
    }
}

// =============================================================================
// Decision
// =============================================================================

/// Machine-readable denial reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReasonCode {
    NotAuthenticated,
    TierInsufficient,
    SubscriptionInactive,
    PaymentRequired,
    AdminRequired,
}

impl ReasonCode {
    pub fn code(&self) -> &'static str {
        match self {
            ReasonCode::NotAuthenticated => "NOT_AUTHENTICATED",
            ReasonCode::TierInsufficient => "TIER_INSUFFICIENT",
            ReasonCode::SubscriptionInactive => "SUBSCRIPTION_INACTIVE",
            ReasonCode::PaymentRequired => "PAYMENT_REQUIRED",
            ReasonCode::AdminRequired => "ADMIN_REQUIRED",
        }
    }
}

/// A denial with enough structure for a self-service upgrade path.
#[derive(Debug, Clone, PartialEq)]
pub struct Denial {
    pub reason: ReasonCode,
    /// The tier the requirement demanded, when tier-shaped.
    pub required_tier: Option<Tier>,
    /// The feature name, when the requirement was feature-shaped.
    pub feature: Option<String>,
    pub current_tier: Option<Tier>,
    pub subscription_status: Option<SubscriptionStatus>,
    pub current_role: Option<Role>,
    /// Human-readable, suitable for direct display.
    pub message: String,
}

/// Outcome of one entitlement evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allow,
    Deny(Denial),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

// =============================================================================
// Evaluation
// =============================================================================

/// Evaluate one requirement against an optionally-present identity.
pub fn evaluate(identity: Option<&User>, requirement: &Requirement) -> Decision {
    let Some(user) = identity else {
        return Decision::Deny(Denial {
            reason: ReasonCode::NotAuthenticated,
            required_tier: None,
            feature: None,
            current_tier: None,
            subscription_status: None,
            current_role: None,
            message: "Authentication is required".to_string(),
        });
    };

    // Total bypass, including payment-required and admin-only shapes.
    if user.role.is_admin() {
        return Decision::Allow;
    }

    match requirement {
        Requirement::MinTier(required) => check_min_tier(user, *required, None),

        Requirement::Feature(name) => match Feature::from_name(name) {
            Some(feature) => check_min_tier(user, feature.min_tier(), Some(name.clone())),
            None => {
                // Fail-open policy: an unmapped feature name allows rather
                // than denies. Kept intentionally pending a product
                // decision; the warning is the paper trail.
                tracing::warn!(feature = %name, "Unknown feature name in requirement, allowing");
                Decision::Allow
            }
        },

        Requirement::PaymentRequired => {
            let paid_and_active = user.tier.is_paid()
                && user
                    .subscription_status
                    .is_some_and(|status| status.is_active());
            if paid_and_active {
                Decision::Allow
            } else {
                Decision::Deny(Denial {
                    reason: ReasonCode::PaymentRequired,
                    required_tier: None,
                    feature: None,
                    current_tier: Some(user.tier),
                    subscription_status: user.subscription_status,
                    current_role: Some(user.role),
                    message: "An active paid subscription is required".to_string(),
                })
            }
        }

        Requirement::AdminOnly => Decision::Deny(Denial {
            reason: ReasonCode::AdminRequired,
            required_tier: None,
            feature: None,
            current_tier: Some(user.tier),
            subscription_status: user.subscription_status,
            current_role: Some(user.role),
            message: "Administrator access is required".to_string(),
        }),
    }
}

/// Minimum-tier check shared by tier- and feature-shaped requirements.
///
/// The status check precedes the rank comparison: any paid threshold with a
/// non-active subscription denies `SUBSCRIPTION_INACTIVE`, so an inactive
/// pro identity is entitlement-equivalent to free.
fn check_min_tier(user: &User, required: Tier, feature: Option<String>) -> Decision {
    if !required.is_paid() {
        return Decision::Allow;
    }

    let status_active = user
        .subscription_status
        .is_some_and(|status| status.is_active());
    if !status_active {
        return Decision::Deny(Denial {
            reason: ReasonCode::SubscriptionInactive,
            required_tier: Some(required),
            feature,
            current_tier: Some(user.tier),
            subscription_status: user.subscription_status,
            current_role: Some(user.role),
            message: format!("This feature requires an active {required} subscription"),
        });
    }

    if user.tier.rank() < required.rank() {
        return Decision::Deny(Denial {
            reason: ReasonCode::TierInsufficient,
            required_tier: Some(required),
            feature,
            current_tier: Some(user.tier),
            subscription_status: user.subscription_status,
            current_role: Some(user.role),
            message: format!("This feature requires {required} subscription or higher"),
        });
    }

    Decision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn identity(role: Role, tier: Tier, status: Option<SubscriptionStatus>) -> User {
        let now = Utc::now();
        User {
            id: "test-user".to_string(),
            email: "test@example.com".to_string(),
            role,
            tier,
            subscription_status: status,
            subscription_expires_at: None,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn deny_reason(decision: Decision) -> ReasonCode {
        match decision {
            Decision::Deny(denial) => denial.reason,
            Decision::Allow => panic!("expected a denial"),
        }
    }

    const ALL_TIERS: [Tier; 4] = [Tier::Free, Tier::Basic, Tier::Premium, Tier::Pro];

    fn all_shapes() -> Vec<Requirement> {
        vec![
            Requirement::MinTier(Tier::Free),
            Requirement::MinTier(Tier::Pro),
            Requirement::feature("advanced-charts"),
            Requirement::feature("ai-forecasts"),
            Requirement::PaymentRequired,
            Requirement::AdminOnly,
        ]
    }

    #[test]
    fn absent_identity_is_not_authenticated_for_every_shape() {
        for requirement in all_shapes() {
            assert_eq!(
                deny_reason(evaluate(None, &requirement)),
                ReasonCode::NotAuthenticated,
                "{requirement:?}"
            );
        }
    }

    #[test]
    fn admin_bypass_is_total() {
        // free-tier admin with no subscription at all, and a superuser:
        // both pass every requirement shape including payment and admin
        for role in [Role::Admin, Role::Superuser] {
            let user = identity(role, Tier::Free, None);
            for requirement in all_shapes() {
                assert!(
                    evaluate(Some(&user), &requirement).is_allow(),
                    "{role:?} {requirement:?}"
                );
            }
        }
    }

    #[test]
    fn tier_ordering_over_the_full_matrix() {
        for holder in ALL_TIERS {
            let user = identity(Role::User, holder, Some(SubscriptionStatus::Active));
            for required in ALL_TIERS {
                let decision = evaluate(Some(&user), &Requirement::MinTier(required));
                if holder.rank() >= required.rank() {
                    assert!(decision.is_allow(), "{holder} vs {required}");
                } else {
                    assert_eq!(
                        deny_reason(decision),
                        ReasonCode::TierInsufficient,
                        "{holder} vs {required}"
                    );
                }
            }
        }
    }

    #[test]
    fn inactive_paid_tier_degrades_to_free() {
        // a pro identity with any non-active status is denied every paid
        // threshold, same as a free identity would be
        for status in [
            None,
            Some(SubscriptionStatus::Canceled),
            Some(SubscriptionStatus::PastDue),
            Some(SubscriptionStatus::Trialing),
            Some(SubscriptionStatus::Incomplete),
        ] {
            let user = identity(Role::User, Tier::Pro, status);
            for required in [Tier::Basic, Tier::Premium, Tier::Pro] {
                assert_eq!(
                    deny_reason(evaluate(Some(&user), &Requirement::MinTier(required))),
                    ReasonCode::SubscriptionInactive,
                    "{status:?} vs {required}"
                );
            }
            // a free threshold still passes
            assert!(evaluate(Some(&user), &Requirement::MinTier(Tier::Free)).is_allow());
        }
    }

    #[test]
    fn unknown_feature_fails_open_for_every_identity() {
        let requirement = Requirement::feature("quantum-charts");
        for tier in ALL_TIERS {
            let user = identity(Role::User, tier, None);
            assert!(evaluate(Some(&user), &requirement).is_allow(), "{tier}");
        }
    }

    #[test]
    fn free_user_denied_basic_feature_with_upgrade_detail() {
        let user = identity(Role::User, Tier::Free, Some(SubscriptionStatus::Active));
        let decision = evaluate(Some(&user), &Requirement::feature("advanced-charts"));
        let Decision::Deny(denial) = decision else {
            panic!("expected a denial");
        };
        assert_eq!(denial.reason, ReasonCode::TierInsufficient);
        assert_eq!(denial.required_tier, Some(Tier::Basic));
        assert_eq!(denial.current_tier, Some(Tier::Free));
        assert_eq!(denial.feature.as_deref(), Some("advanced-charts"));
        assert!(denial.message.contains("basic"));
    }

    #[test]
    fn canceled_pro_denied_basic_feature_as_inactive() {
        let user = identity(Role::User, Tier::Pro, Some(SubscriptionStatus::Canceled));
        let decision = evaluate(Some(&user), &Requirement::feature("advanced-charts"));
        assert_eq!(deny_reason(decision), ReasonCode::SubscriptionInactive);
    }

    #[test]
    fn free_admin_allowed_admin_only() {
        let user = identity(Role::Admin, Tier::Free, None);
        assert!(evaluate(Some(&user), &Requirement::AdminOnly).is_allow());
    }

    #[test]
    fn plain_user_denied_admin_only() {
        let user = identity(Role::User, Tier::Pro, Some(SubscriptionStatus::Active));
        assert_eq!(
            deny_reason(evaluate(Some(&user), &Requirement::AdminOnly)),
            ReasonCode::AdminRequired
        );
    }

    #[test]
    fn payment_gate_needs_paid_tier_and_active_status() {
        let paid = identity(Role::User, Tier::Basic, Some(SubscriptionStatus::Active));
        assert!(evaluate(Some(&paid), &Requirement::PaymentRequired).is_allow());

        let free = identity(Role::User, Tier::Free, Some(SubscriptionStatus::Active));
        assert_eq!(
            deny_reason(evaluate(Some(&free), &Requirement::PaymentRequired)),
            ReasonCode::PaymentRequired
        );

        let lapsed = identity(Role::User, Tier::Pro, Some(SubscriptionStatus::PastDue));
        assert_eq!(
            deny_reason(evaluate(Some(&lapsed), &Requirement::PaymentRequired)),
            ReasonCode::PaymentRequired
        );
    }
}
