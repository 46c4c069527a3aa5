//! User and session HTTP handlers.
//!
//! - POST /users - Register
//! - POST /users/login - Open a session, get access and refresh tokens
//! - POST /tokens/renew_access - New access token from a refresh token

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, header::USER_AGENT},
};

use crate::{
    app::AppState,
    error::AppError,
    models::{
        session::{RenewAccessTokenRequest, RenewAccessTokenResponse},
        user::{CreateUserRequest, LoginUserRequest, LoginUserResponse, UserResponse},
    },
    services::user_service::{self, ClientInfo},
};

/// Register a user. The response never includes the password hash.
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = user_service::create_user(state.store.as_ref(), request).await?;
    Ok(Json(user))
}

/// Log in with username and password.
///
/// The session records the caller's `User-Agent` and the first address in
/// `X-Forwarded-For` (or `X-Real-IP`).
pub async fn login_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<LoginUserRequest>,
) -> Result<Json<LoginUserResponse>, AppError> {
    let response = user_service::login_user(
        state.store.as_ref(),
        &state.tokens,
        state.durations,
        client_info(&headers),
        request,
    )
    .await?;
    Ok(Json(response))
}

pub async fn renew_access_token(
    State(state): State<AppState>,
    Json(request): Json<RenewAccessTokenRequest>,
) -> Result<Json<RenewAccessTokenResponse>, AppError> {
    let response = user_service::renew_access_token(
        state.store.as_ref(),
        &state.tokens,
        state.durations.access,
        request,
    )
    .await?;
    Ok(Json(response))
}

fn client_info(headers: &HeaderMap) -> ClientInfo {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());

    let client_ip = header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .or_else(|| header("x-real-ip"))
        .unwrap_or_default()
        .trim()
        .to_string();

    ClientInfo {
        user_agent: headers
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string(),
        client_ip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_info_prefers_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.2"));
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        headers.insert(USER_AGENT, HeaderValue::from_static("curl/8.4"));

        let info = client_info(&headers);
        assert_eq!(info.client_ip, "203.0.113.7");
        assert_eq!(info.user_agent, "curl/8.4");
    }

    #[test]
    fn client_info_defaults_to_empty() {
        let info = client_info(&HeaderMap::new());
        assert_eq!(info.client_ip, "");
        assert_eq!(info.user_agent, "");
    }
}
