//! Bank data from the Plaid aggregator.
//!
//! [Aggregator] is the seam between the HTTP layer and Plaid. [client::PlaidClient] talks to the
//! real API; tests substitute scripted implementations.

use actix_web::web::{self, ServiceConfig};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod client;
mod handlers;
pub mod sync;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LinkToken {
    pub link_token: String,
    pub expiration: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Balances {
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub available: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub current: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub limit: Option<Decimal>,
    #[serde(default)]
    pub iso_currency_code: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Account {
    pub account_id: String,
    pub name: String,
    #[serde(default)]
    pub official_name: Option<String>,
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(rename = "type")]
    pub account_type: String,
    #[serde(default)]
    pub subtype: Option<String>,
    pub balances: Balances,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AchNumbers {
    pub account_id: String,
    pub account: String,
    pub routing: String,
    #[serde(default)]
    pub wire_routing: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AccountNumbers {
    #[serde(default)]
    pub ach: Vec<AchNumbers>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AccountDetails {
    pub accounts: Vec<Account>,
    pub numbers: AccountNumbers,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PersonalFinanceCategory {
    pub primary: String,
    pub detailed: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Transaction {
    pub transaction_id: String,
    pub account_id: String,
    pub date: NaiveDate,
    pub name: String,
    #[serde(default)]
    pub merchant_name: Option<String>,
    #[serde(default)]
    pub category: Option<Vec<String>>,
    #[serde(default)]
    pub personal_finance_category: Option<PersonalFinanceCategory>,
    /// Positive amounts are money leaving the account.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub iso_currency_code: Option<String>,
    #[serde(default)]
    pub pending: bool,
}

/// One page of the incremental transaction sync.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SyncPage {
    #[serde(default)]
    pub added: Vec<Transaction>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

#[derive(Error, Debug)]
pub enum AggregatorError {
    #[error("Aggregator returned {status}: {error_type}/{error_code}: {message}")]
    Api {
        status: u16,
        error_type: String,
        error_code: String,
        message: String,
    },
    #[error("Aggregator request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("Aggregator response could not be decoded: {0}")]
    InvalidResponse(#[source] reqwest::Error),
}

impl AggregatorError {
    /// The aggregator's own error code, safe to show to clients.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            AggregatorError::Api { error_code, .. } => Some(error_code),
            _ => None,
        }
    }
}

#[async_trait]
pub trait Aggregator: Send + Sync {
    async fn create_link_token(&self, client_user_id: &str) -> Result<LinkToken, AggregatorError>;

    /// Exchanges the public token from a completed bank link for a long lived access token.
    async fn exchange_public_token(&self, public_token: &str) -> Result<String, AggregatorError>;

    async fn get_balances(&self, access_token: &str) -> Result<Vec<Account>, AggregatorError>;

    async fn get_account_details(
        &self,
        access_token: &str,
    ) -> Result<AccountDetails, AggregatorError>;

    async fn sync_transactions(
        &self,
        access_token: &str,
        cursor: Option<&str>,
    ) -> Result<SyncPage, AggregatorError>;
}

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(handlers::create_link_token)
        .service(handlers::exchange_public_token)
        .service(
            web::scope("/accounts")
                .service(handlers::get_balances)
                .service(handlers::get_account_details),
        )
        .service(
            web::scope("/transactions")
                .service(handlers::get_transactions)
                .service(handlers::get_transaction_summary),
        );
}
