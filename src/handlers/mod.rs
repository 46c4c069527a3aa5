//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, the token payload)
//! 2. Calls the store or a service
//! 3. Returns HTTP response (JSON, status code)

/// Account management endpoints
pub mod accounts;
pub mod health;
/// Transfer endpoints
pub mod transfers;
/// Registration, login and token renewal
pub mod users;
