//! Bearer token authentication middleware.
//!
//! This middleware intercepts every protected request to:
//! 1. Extract the access token from the Authorization header
//! 2. Verify its signature, expiry and that it is an access token
//! 3. Inject the token payload into the request
//! 4. Reject unauthorized requests with HTTP 401

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{app::AppState, error::AppError, services::token::TokenKind};

const AUTHORIZATION_TYPE_BEARER: &str = "bearer";

/// Access token authentication middleware function.
///
/// # Headers
///
/// Expected header format:
/// ```text
/// Authorization: Bearer <access token>
/// ```
///
/// # Returns
///
/// - `Ok(Response)` if authenticated; handlers read the caller from
///   `Extension<Payload>`
/// - `Err(AppError::Unauthorized)` if the header is missing or malformed, or
///   the token is invalid or expired
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("authorization header is not provided".to_string()))?;

    let mut fields = auth_header.split_whitespace();
    let (Some(auth_type), Some(token), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(AppError::Unauthorized(
            "invalid authorization header format".to_string(),
        ));
    };

    if !auth_type.eq_ignore_ascii_case(AUTHORIZATION_TYPE_BEARER) {
        return Err(AppError::Unauthorized(format!(
            "unsupported authorization type {auth_type}"
        )));
    }

    let payload = state.tokens.verify_token(token, TokenKind::Access)?;

    request.extensions_mut().insert(payload);

    Ok(next.run(request).await)
}
