// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

use std::sync::Arc;

use crate::storage::Storage;

/// Shared application state, handed to every handler and to the gate.
///
/// The storage backend is selected once at startup and injected here
/// explicitly; nothing in the platform reaches for a global handle.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub jwt_secret: Arc<str>,
}

impl AppState {
    pub fn new(storage: Arc<dyn Storage>, jwt_secret: impl Into<Arc<str>>) -> Self {
        Self {
            storage,
            jwt_secret: jwt_secret.into(),
        }
    }
}
