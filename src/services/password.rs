//! Password hashing with Argon2id.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::AppError;

/// Hash `password` into a PHC string with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
}

/// Check `password` against a stored PHC string.
///
/// # Errors
///
/// - `AppError::Unauthorized` if the password does not match
/// - `AppError::Internal` if the stored hash cannot be parsed
pub fn check_password(password: &str, hashed_password: &str) -> Result<(), AppError> {
    let parsed = PasswordHash::new(hashed_password)
        .map_err(|e| AppError::Internal(format!("invalid password hash: {e}")))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::Unauthorized("incorrect password".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_check() {
        let hashed = hash_password("secret123").unwrap();
        assert!(hashed.starts_with("$argon2"));
        check_password("secret123", &hashed).unwrap();
    }

    #[test]
    fn wrong_password_is_unauthorized() {
        let hashed = hash_password("secret123").unwrap();
        assert!(matches!(
            check_password("secret124", &hashed),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        assert_ne!(
            hash_password("secret123").unwrap(),
            hash_password("secret123").unwrap()
        );
    }
}
