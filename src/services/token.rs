//! Access and refresh tokens.
//!
//! Tokens are HS256 JWTs signed with `TOKEN_SYMMETRIC_KEY`. Both kinds share
//! one format; a `typ` claim records which kind a token is, and verification
//! rejects a token of the other kind. A refresh token is additionally bound to
//! a stored session through its SHA-256 fingerprint.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::AppError;

/// HMAC keys shorter than this are rejected at startup.
pub const MIN_SECRET_KEY_SIZE: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("invalid key size: must be at least {MIN_SECRET_KEY_SIZE} characters")]
    InvalidKeySize,

    #[error("token has expired")]
    Expired,

    #[error("token is invalid")]
    Invalid,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired | TokenError::Invalid => AppError::Unauthorized(err.to_string()),
            TokenError::InvalidKeySize | TokenError::Signing(_) => {
                AppError::Internal(err.to_string())
            }
        }
    }
}

/// Which purpose a token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// What a verified token says about its bearer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub id: Uuid,
    pub username: String,
    pub issued_at: DateTime<Utc>,
    pub expired_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    jti: Uuid,
    sub: String,
    typ: TokenKind,
    iat: i64,
    exp: i64,
}

/// Signs and verifies tokens.
pub struct TokenMaker {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenMaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenMaker").finish_non_exhaustive()
    }
}

impl TokenMaker {
    /// # Errors
    ///
    /// `TokenError::InvalidKeySize` if `secret_key` is shorter than
    /// `MIN_SECRET_KEY_SIZE` characters.
    pub fn new(secret_key: &str) -> Result<Self, TokenError> {
        if secret_key.chars().count() < MIN_SECRET_KEY_SIZE {
            return Err(TokenError::InvalidKeySize);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret_key.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret_key.as_bytes()),
            validation,
        })
    }

    /// Issue a `kind` token for `username` valid for `duration`.
    pub fn create_token(
        &self,
        username: &str,
        kind: TokenKind,
        duration: Duration,
    ) -> Result<(String, Payload), TokenError> {
        // JWT timestamps have second resolution
        let issued_at = DateTime::from_timestamp(Utc::now().timestamp(), 0).unwrap_or_default();
        let payload = Payload {
            id: Uuid::new_v4(),
            username: username.to_string(),
            issued_at,
            expired_at: issued_at + duration,
        };

        let claims = Claims {
            jti: payload.id,
            sub: payload.username.clone(),
            typ: kind,
            iat: payload.issued_at.timestamp(),
            exp: payload.expired_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok((token, payload))
    }

    /// Check the signature, expiry and kind of `token`.
    pub fn verify_token(&self, token: &str, kind: TokenKind) -> Result<Payload, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        let claims = data.claims;
        if claims.typ != kind {
            return Err(TokenError::Invalid);
        }
        let issued_at = DateTime::from_timestamp(claims.iat, 0).ok_or(TokenError::Invalid)?;
        let expired_at = DateTime::from_timestamp(claims.exp, 0).ok_or(TokenError::Invalid)?;

        Ok(Payload {
            id: claims.jti,
            username: claims.sub,
            issued_at,
            expired_at,
        })
    }
}

/// SHA-256 hex digest of a refresh token, as stored on its session.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
