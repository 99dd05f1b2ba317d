// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! Authentication: credential verification and identity resolution.
//!
//! Two steps, separated so each is testable on its own:
//!
//! 1. [`token::verify`] checks the bearer token cryptographically and
//!    yields typed [`Claims`]. No storage involved.
//! 2. [`resolver::resolve`] loads the identity behind `claims.sub` from
//!    storage. A soft-deactivated identity resolves as absent.
//!
//! The request gate chains both and hands the outcome to the entitlement
//! evaluator.

pub mod error;
pub mod resolver;
pub mod token;

pub use error::AuthError;
pub use token::Claims;
