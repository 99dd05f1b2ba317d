// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Marketgate

//! # Runtime Configuration
//!
//! Configuration is loaded from the environment once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `JWT_SECRET` | HS256 token signing secret | **Required** — startup-fatal if missing |
//! | `DATABASE_PATH` | Path to the redb database file | Unset selects the in-memory backend |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info` |

use std::env;
use std::path::PathBuf;

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const DATABASE_PATH_ENV: &str = "DATABASE_PATH";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{JWT_SECRET_ENV} must be set")]
    MissingSecret,
}

/// Resolved process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HS256 signing secret shared with the token issuer.
    pub jwt_secret: String,
    /// Durable store location; `None` selects the in-memory backend.
    pub database_path: Option<PathBuf>,
    pub host: String,
    pub port: u16,
    /// `json` or `pretty`.
    pub log_format: String,
}

impl Config {
    /// Load configuration from the environment. A missing signing secret is
    /// a startup-fatal misconfiguration, never a per-request error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env::var(JWT_SECRET_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingSecret)?;

        Ok(Self {
            jwt_secret,
            database_path: env::var(DATABASE_PATH_ENV).ok().map(PathBuf::from),
            host: env::var(HOST_ENV).unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var(PORT_ENV)
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            log_format: env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "pretty".to_string()),
        })
    }
}
