//! User model and the request/response types of the user endpoints.
//!
//! Users own accounts and authenticate with a password. Passwords are stored
//! as argon2 PHC strings and never leave the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. `username` is the primary key and is
/// referenced by `accounts.owner` and `sessions.username`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub username: String,

    /// argon2 hash in PHC string format
    pub hashed_password: String,

    pub full_name: String,

    /// Unique across users
    pub email: String,

    pub password_changed_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

/// Arguments for inserting a user.
#[derive(Debug, Clone)]
pub struct CreateUserParams {
    pub username: String,
    pub hashed_password: String,
    pub full_name: String,
    pub email: String,
}

/// Request body for `POST /users`.
///
/// # JSON Example
///
/// ```json
/// {
///   "username": "alice",
///   "password": "secret123",
///   "full_name": "Alice Liddell",
///   "email": "alice@example.com"
/// }
/// ```
///
/// # Validation
///
/// - `username`: non-empty, ASCII alphanumeric
/// - `password`: at least 6 characters
/// - `full_name`: non-empty
/// - `email`: looks like `local@domain`
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub full_name: String,
    pub email: String,
}

impl CreateUserRequest {
    pub const MIN_PASSWORD_LEN: usize = 6;

    pub fn validate(&self) -> Result<(), String> {
        validate_username(&self.username)?;
        validate_password(&self.password)?;
        if self.full_name.trim().is_empty() {
            return Err("full_name is required".to_string());
        }
        match self.email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err("email is invalid".to_string()),
        }
    }
}

/// Request body for `POST /users/login`.
#[derive(Debug, Deserialize)]
pub struct LoginUserRequest {
    pub username: String,
    pub password: String,
}

impl LoginUserRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_username(&self.username)?;
        validate_password(&self.password)
    }
}

fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() || !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("username must be non-empty and alphanumeric".to_string());
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < CreateUserRequest::MIN_PASSWORD_LEN {
        return Err(format!(
            "password must be at least {} characters",
            CreateUserRequest::MIN_PASSWORD_LEN
        ));
    }
    Ok(())
}

/// Public view of a user (no password hash).
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub username: String,
    pub full_name: String,
    pub email: String,
    pub password_changed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            full_name: user.full_name,
            email: user.email,
            password_changed_at: user.password_changed_at,
            created_at: user.created_at,
        }
    }
}

/// Response body for a successful login.
#[derive(Debug, Serialize)]
pub struct LoginUserResponse {
    pub session_id: Uuid,
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request(username: &str, password: &str, email: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            password: password.to_string(),
            full_name: "Test User".to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn accepts_well_formed_user() {
        assert!(request("alice1", "secret", "alice@example.com").validate().is_ok());
    }

    #[rstest]
    #[case::empty_username("", "secret", "a@example.com")]
    #[case::symbol_in_username("al-ice", "secret", "a@example.com")]
    #[case::short_password("alice", "12345", "a@example.com")]
    #[case::missing_at("alice", "secret", "example.com")]
    #[case::missing_domain_dot("alice", "secret", "alice@localhost")]
    fn rejects_malformed_user(#[case] username: &str, #[case] password: &str, #[case] email: &str) {
        assert!(request(username, password, email).validate().is_err());
    }
}
