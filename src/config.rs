//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to deserialize environment variables into a type-safe struct.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `TOKEN_SYMMETRIC_KEY` (required): HMAC key for access and refresh tokens,
///   at least 32 characters
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `ACCESS_TOKEN_MINUTES` (optional): access token lifetime, defaults to 15
/// - `REFRESH_TOKEN_HOURS` (optional): refresh token and session lifetime, defaults to 24
/// - `REQUEST_TIMEOUT_SECS` (optional): per-request timeout, defaults to 30
/// - `DB_MAX_CONNECTIONS` (optional): pool size, defaults to 10
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    pub token_symmetric_key: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,

    #[serde(default = "default_refresh_token_hours")]
    pub refresh_token_hours: i64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,
}

fn default_port() -> u16 {
    3000
}

fn default_access_token_minutes() -> i64 {
    15
}

fn default_refresh_token_hours() -> i64 {
    24
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_db_max_connections() -> u32 {
    10
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file is loaded first if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();

        // Field names map to upper case: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    pub fn access_token_duration(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_minutes)
    }

    pub fn refresh_token_duration(&self) -> chrono::Duration {
        chrono::Duration::hours(self.refresh_token_hours)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
