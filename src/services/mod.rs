//! Business logic services.
//!
//! Services contain the checks and orchestration that sit between HTTP
//! handlers and the ledger store.

pub mod password;
pub mod token;
pub mod transfer_service;
pub mod user_service;
