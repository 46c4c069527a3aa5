//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! plus the request/response bodies built around them.

/// Ledger account model
pub mod account;
/// Ledger entry model
pub mod entry;
/// Login session model
pub mod session;
/// Transfer model and engine input/output
pub mod transfer;
/// User model
pub mod user;
