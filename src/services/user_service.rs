//! User service - registration, login sessions and access-token renewal.
//!
//! Logging in issues a short-lived access token and a longer-lived refresh
//! token. The refresh token's id becomes the id of a stored session row, which
//! keeps the token's fingerprint so a session can be checked (or blocked)
//! server-side.

use chrono::{Duration, Utc};

use crate::{
    error::AppError,
    models::{
        session::{CreateSessionParams, RenewAccessTokenRequest, RenewAccessTokenResponse},
        user::{
            CreateUserParams, CreateUserRequest, LoginUserRequest, LoginUserResponse, UserResponse,
        },
    },
    services::{
        password::{check_password, hash_password},
        token::{TokenKind, TokenMaker, fingerprint},
    },
    store::{Store, StoreError},
};

/// Token lifetimes used when logging in and renewing.
#[derive(Debug, Clone, Copy)]
pub struct TokenDurations {
    pub access: Duration,
    pub refresh: Duration,
}

/// Client details recorded on the session.
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub user_agent: String,
    pub client_ip: String,
}

/// Register a user.
///
/// # Errors
///
/// - `InvalidRequest`: malformed username, password, name or email
/// - `Store(Persistence)`: username or email already taken (HTTP 403)
pub async fn create_user(
    store: &dyn Store,
    req: CreateUserRequest,
) -> Result<UserResponse, AppError> {
    req.validate().map_err(AppError::InvalidRequest)?;

    let hashed_password = hash_password(&req.password)?;
    let user = store
        .create_user(CreateUserParams {
            username: req.username,
            hashed_password,
            full_name: req.full_name,
            email: req.email,
        })
        .await?;

    tracing::info!(username = %user.username, "user created");
    Ok(user.into())
}

/// Check credentials and open a session.
///
/// # Process
///
/// 1. Load the user and verify the password
/// 2. Issue an access token and a refresh token
/// 3. Store a session keyed by the refresh token id
///
/// # Errors
///
/// - `NotFound`: no such user
/// - `Unauthorized`: wrong password
pub async fn login_user(
    store: &dyn Store,
    tokens: &TokenMaker,
    durations: TokenDurations,
    client: ClientInfo,
    req: LoginUserRequest,
) -> Result<LoginUserResponse, AppError> {
    req.validate().map_err(AppError::InvalidRequest)?;

    let user = store.get_user(&req.username).await.map_err(|e| match e {
        StoreError::NotFound(_) => AppError::NotFound(format!("user {}", req.username)),
        other => AppError::Store(other),
    })?;
    check_password(&req.password, &user.hashed_password)?;

    let (access_token, access_payload) =
        tokens.create_token(&user.username, TokenKind::Access, durations.access)?;
    let (refresh_token, refresh_payload) =
        tokens.create_token(&user.username, TokenKind::Refresh, durations.refresh)?;

    let session = store
        .create_session(CreateSessionParams {
            id: refresh_payload.id,
            username: user.username.clone(),
            refresh_token: fingerprint(&refresh_token),
            user_agent: client.user_agent,
            client_ip: client.client_ip,
            is_blocked: false,
            expires_at: refresh_payload.expired_at,
        })
        .await?;

    tracing::info!(username = %user.username, session_id = %session.id, "user logged in");

    Ok(LoginUserResponse {
        session_id: session.id,
        access_token,
        access_token_expires_at: access_payload.expired_at,
        refresh_token,
        refresh_token_expires_at: refresh_payload.expired_at,
        user: user.into(),
    })
}

/// Exchange a refresh token for a new access token.
///
/// # Errors
///
/// - `Unauthorized`: the token is invalid, expired or not a refresh token, or its session
///   is blocked, expired or belongs to another token
/// - `NotFound`: the session no longer exists
pub async fn renew_access_token(
    store: &dyn Store,
    tokens: &TokenMaker,
    access_duration: Duration,
    req: RenewAccessTokenRequest,
) -> Result<RenewAccessTokenResponse, AppError> {
    let payload = tokens.verify_token(&req.refresh_token, TokenKind::Refresh)?;

    let session = store.get_session(payload.id).await.map_err(|e| match e {
        StoreError::NotFound(_) => AppError::NotFound(format!("session {}", payload.id)),
        other => AppError::Store(other),
    })?;

    if session.is_blocked {
        return Err(AppError::Unauthorized("blocked session".to_string()));
    }
    if session.username != payload.username {
        return Err(AppError::Unauthorized("incorrect session user".to_string()));
    }
    if session.refresh_token != fingerprint(&req.refresh_token) {
        return Err(AppError::Unauthorized("mismatched session token".to_string()));
    }
    if Utc::now() > session.expires_at {
        return Err(AppError::Unauthorized("expired session".to_string()));
    }

    let (access_token, access_payload) =
        tokens.create_token(&payload.username, TokenKind::Access, access_duration)?;

    Ok(RenewAccessTokenResponse {
        access_token,
        access_token_expires_at: access_payload.expired_at,
    })
}
