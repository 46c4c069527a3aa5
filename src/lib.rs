//! Bank ledger service.
//!
//! Accounts hold balances in minor currency units. Money moves only through
//! transfers, each recorded as a transfer row plus one debit and one credit
//! entry, all committed in a single store transaction.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;
