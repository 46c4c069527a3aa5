//! Login session model.
//!
//! A session is created on every login and is keyed by the id embedded in
//! the refresh token. Renewing an access token requires a live, unblocked
//! session whose stored fingerprint matches the presented refresh token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a session record from the database.
///
/// # Database Table
///
/// Maps to the `sessions` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    /// Same value as the refresh token's id claim
    pub id: Uuid,

    pub username: String,

    /// SHA-256 fingerprint (hex) of the refresh token, never the token itself
    pub refresh_token: String,

    pub user_agent: String,

    pub client_ip: String,

    /// Blocked sessions cannot renew access tokens
    pub is_blocked: bool,

    pub expires_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

/// Arguments for inserting a session.
#[derive(Debug, Clone)]
pub struct CreateSessionParams {
    pub id: Uuid,
    pub username: String,
    pub refresh_token: String,
    pub user_agent: String,
    pub client_ip: String,
    pub is_blocked: bool,
    pub expires_at: DateTime<Utc>,
}

/// Request body for `POST /tokens/renew_access`.
#[derive(Debug, Deserialize)]
pub struct RenewAccessTokenRequest {
    pub refresh_token: String,
}

/// Response body for `POST /tokens/renew_access`.
#[derive(Debug, Serialize)]
pub struct RenewAccessTokenResponse {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
}
