//! Environment-driven configuration
//!
//! Values are read from the process environment after `.env` has been
//! loaded by the binary.

use axum::http::HeaderName;
use std::env;
use thiserror::Error;

use crate::identity::HeaderIdentity;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATABASE_URL: &str = "data.db";
pub const DEFAULT_IDENTITY_HEADER: &str = "x-user-id";
pub const DEFAULT_LOGOUT_URL: &str = "/logout";
pub const DEFAULT_LOG_FILTER: &str = "blogsteps=debug,tower_http=debug";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid PORT value {0:?}")]
    InvalidPort(String),

    #[error("invalid IDENTITY_HEADER value {0:?}")]
    InvalidIdentityHeader(String),
}

/// Runtime settings
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `DATABASE_URL` - Path to database file (default: "data.db")
/// - `IDENTITY_HEADER` - Header carrying the signed-in user id (default: "x-user-id")
/// - `LOGOUT_URL` - Sign-out endpoint of the identity provider (default: "/logout")
/// - `RUST_LOG` - Tracing filter directives
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub identity_header: HeaderName,
    pub logout_url: String,
    pub log_filter: String,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(raw) if !raw.is_empty() => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            _ => DEFAULT_PORT,
        };

        let header = var_or("IDENTITY_HEADER", DEFAULT_IDENTITY_HEADER).to_lowercase();
        let identity_header = HeaderName::from_bytes(header.as_bytes())
            .map_err(|_| ConfigError::InvalidIdentityHeader(header.clone()))?;

        Ok(Self {
            port,
            database_url: var_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            identity_header,
            logout_url: var_or("LOGOUT_URL", DEFAULT_LOGOUT_URL),
            log_filter: var_or("RUST_LOG", DEFAULT_LOG_FILTER),
        })
    }

    pub fn identity_provider(&self) -> HeaderIdentity {
        HeaderIdentity::new(self.identity_header.clone(), self.logout_url.clone())
    }
}
