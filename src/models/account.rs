//! Account data models and API request/response types.
//!
//! This module defines:
//! - `Currency`: The closed set of currencies an account can hold
//! - `Account`: Database entity representing a ledger account
//! - `CreateAccountParams` / `ListAccountsParams`: Store-level arguments
//! - `CreateAccountRequest` / `PageQuery`: Request body and paging query for the HTTP layer

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Currencies supported by the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[serde(rename = "INR")]
    Inr,
}

/// Returned when a currency code is not one of `USD`, `EUR`, `INR`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported currency: {0}")]
pub struct UnsupportedCurrency(pub String);

impl Currency {
    /// ISO 4217 code as stored in the `accounts.currency` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Inr => "INR",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = UnsupportedCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "INR" => Ok(Currency::Inr),
            other => Err(UnsupportedCurrency(other.to_string())),
        }
    }
}

/// Lets `sqlx::FromRow` decode the `VARCHAR` column straight into the enum.
impl TryFrom<String> for Currency {
    type Error = UnsupportedCurrency;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Represents an account record from the database.
///
/// # Database Table
///
/// Maps to the `accounts` table. Each account:
/// - Belongs to one user (via `owner`)
/// - Holds a single currency; a user has at most one account per currency
/// - Has a balance stored in minor units (cents, paise)
///
/// # Balance Mutation
///
/// The balance is never written directly. It only changes through the
/// atomic delta applied by a transfer, see `store::transfer::add_money`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow, Serialize)]
pub struct Account {
    /// Unique identifier, also the lock-ordering key for transfers
    pub id: i64,

    /// Username of the owning user
    pub owner: String,

    /// Current balance in minor units
    ///
    /// Not constrained to be non-negative at this layer.
    pub balance: i64,

    /// Currency of the balance
    #[sqlx(try_from = "String")]
    pub currency: Currency,

    /// Timestamp when account was created
    pub created_at: DateTime<Utc>,
}

/// Arguments for inserting a new account.
#[derive(Debug, Clone)]
pub struct CreateAccountParams {
    pub owner: String,
    pub currency: Currency,
    pub balance: i64,
}

/// Arguments for paging through one owner's accounts.
#[derive(Debug, Clone)]
pub struct ListAccountsParams {
    pub owner: String,
    pub limit: i64,
    pub offset: i64,
}

/// Request body for creating a new account.
///
/// # JSON Example
///
/// ```json
/// {
///   "currency": "USD"
/// }
/// ```
///
/// The owner is always the authenticated user and the balance starts at 0.
#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub currency: String,
}

/// Query string for paginated listings (`?page_id=1&page_size=5`).
///
/// # Validation
///
/// - `page_id`: at least 1
/// - `page_size`: between 5 and 10 inclusive
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page_id: i64,
    pub page_size: i64,
}

impl PageQuery {
    pub const MIN_PAGE_SIZE: i64 = 5;
    pub const MAX_PAGE_SIZE: i64 = 10;

    /// Check bounds and convert to `(limit, offset)`.
    pub fn limit_offset(&self) -> Result<(i64, i64), String> {
        if self.page_id < 1 {
            return Err("page_id must be at least 1".to_string());
        }
        if !(Self::MIN_PAGE_SIZE..=Self::MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(format!(
                "page_size must be between {} and {}",
                Self::MIN_PAGE_SIZE,
                Self::MAX_PAGE_SIZE
            ));
        }
        let offset = (self.page_id - 1)
            .checked_mul(self.page_size)
            .ok_or_else(|| "page_id out of range".to_string())?;
        Ok((self.page_size, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("USD", Currency::Usd)]
    #[case("EUR", Currency::Eur)]
    #[case("INR", Currency::Inr)]
    fn parses_supported_currencies(#[case] code: &str, #[case] expected: Currency) {
        assert_eq!(code.parse::<Currency>().unwrap(), expected);
        assert_eq!(expected.to_string(), code);
    }

    #[rstest]
    #[case("usd")]
    #[case("GBP")]
    #[case("")]
    fn rejects_unsupported_currencies(#[case] code: &str) {
        assert_eq!(
            code.parse::<Currency>(),
            Err(UnsupportedCurrency(code.to_string()))
        );
    }

    #[test]
    fn currency_serializes_as_code() {
        assert_eq!(serde_json::to_string(&Currency::Inr).unwrap(), "\"INR\"");
        let parsed: Currency = serde_json::from_str("\"EUR\"").unwrap();
        assert_eq!(parsed, Currency::Eur);
    }

    #[rstest]
    #[case(1, 5, (5, 0))]
    #[case(3, 10, (10, 20))]
    fn page_query_converts_to_limit_offset(
        #[case] page_id: i64,
        #[case] page_size: i64,
        #[case] expected: (i64, i64),
    ) {
        let query = PageQuery { page_id, page_size };
        assert_eq!(query.limit_offset().unwrap(), expected);
    }

    #[rstest]
    #[case(0, 5)]
    #[case(1, 4)]
    #[case(1, 11)]
    #[case::offset_overflow(i64::MAX, 10)]
    fn page_query_rejects_out_of_range(#[case] page_id: i64, #[case] page_size: i64) {
        assert!(PageQuery { page_id, page_size }.limit_offset().is_err());
    }
}
